use serde::{Deserialize, Serialize};

use super::RecordId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    /// Missing on hand-edited local entries; those never take part in keyed merges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub student_id: RecordId,
    pub course_id: RecordId,
    #[serde(default)]
    pub enrollment_date: String,
}

impl Enrollment {
    pub fn belongs_to(&self, student_id: &str) -> bool {
        self.student_id.matches(student_id)
    }

    pub fn is_for(&self, student_id: &str, course_id: &str) -> bool {
        self.student_id.matches(student_id) && self.course_id.matches(course_id)
    }
}
