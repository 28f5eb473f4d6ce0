use serde::{Deserialize, Serialize};

use super::RecordId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CourseStatus {
    Ongoing,
    Upcoming,
    Completed,
    Other(String),
}

impl CourseStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CourseStatus::Ongoing => "ongoing",
            CourseStatus::Upcoming => "upcoming",
            CourseStatus::Completed => "completed",
            CourseStatus::Other(s) => s.as_str(),
        }
    }
}

impl Default for CourseStatus {
    fn default() -> Self {
        CourseStatus::Other(String::new())
    }
}

impl From<String> for CourseStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "ongoing" => CourseStatus::Ongoing,
            "upcoming" => CourseStatus::Upcoming,
            "completed" => CourseStatus::Completed,
            _ => CourseStatus::Other(raw),
        }
    }
}

impl From<CourseStatus> for String {
    fn from(status: CourseStatus) -> Self {
        match status {
            CourseStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub status: CourseStatus,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub sessions: u32,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub instructor_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instructor {
    pub id: RecordId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: RecordId,
    pub course_id: RecordId,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub title: String,
}

impl Session {
    pub fn is_completed(&self) -> bool {
        self.status.eq_ignore_ascii_case("completed")
    }

    /// Calendar date of the session; accepts `YYYY-MM-DD` with or without a time part.
    pub fn day(&self) -> Option<chrono::NaiveDate> {
        let date = self.date.get(..10).unwrap_or(self.date.as_str());
        chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub id: RecordId,
    pub session_id: RecordId,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub file: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        let course: Course = serde_json::from_str(
            r#"{"id":3,"title":"Rust","field":"CS","status":"Ongoing","instructor_id":"2"}"#,
        )
        .unwrap();
        assert_eq!(course.status, CourseStatus::Ongoing);
        assert_eq!(course.instructor_id, Some(RecordId::Number(2)));
    }

    #[test]
    fn unknown_status_is_preserved() {
        let status = CourseStatus::from("archived".to_string());
        assert_eq!(String::from(status), "archived");
    }

    #[test]
    fn session_day_ignores_time_suffix() {
        let session: Session = serde_json::from_str(
            r#"{"id":1,"course_id":3,"date":"2026-03-02T10:00:00"}"#,
        )
        .unwrap();
        assert_eq!(session.day(), chrono::NaiveDate::from_ymd_opt(2026, 3, 2));
    }
}
