use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::fixtures::{self, Fixtures};
use crate::models::{Course, CourseStatus, Instructor, Material, RecordId, Session};
use crate::services::EnrollmentStore;
use crate::storage::{self, LocalStore, keys};

/// Upcoming sessions listed on the "my courses" page.
pub const UPCOMING_LIMIT: usize = 6;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseFilter {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub instructor_id: Option<String>,
}

impl CourseFilter {
    pub fn matches(&self, course: &Course) -> bool {
        if let Some(q) = non_empty(&self.q) {
            if !course.title.to_lowercase().contains(&q.to_lowercase()) {
                return false;
            }
        }
        if let Some(field) = non_empty(&self.field) {
            if course.field != field {
                return false;
            }
        }
        if let Some(status) = non_empty(&self.status) {
            if !course.status.as_str().eq_ignore_ascii_case(status) {
                return false;
            }
        }
        if let Some(instructor) = non_empty(&self.instructor_id) {
            if !course.instructor_id.as_ref().is_some_and(|id| id.matches(instructor)) {
                return false;
            }
        }
        true
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseSummary {
    pub course: Course,
    pub instructor: Option<Instructor>,
    pub enrolled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Facets {
    pub fields: Vec<String>,
    pub statuses: Vec<String>,
    pub instructors: Vec<Instructor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    pub course: Course,
    pub instructor: Option<Instructor>,
    pub sessions: Vec<Session>,
    /// Empty while `materials_locked`.
    pub materials: Vec<Material>,
    pub materials_locked: bool,
    pub completed_sessions: usize,
    pub enrolled: bool,
    pub can_enroll: bool,
    /// Set once the course is completed and the viewer is enrolled.
    pub certificate_enrollment_id: Option<RecordId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrolledCourse {
    pub course: Course,
    pub instructor: Option<Instructor>,
    pub completed_sessions: usize,
    pub next_session: Option<Session>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpcomingSession {
    pub session: Session,
    pub course_title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MyCourses {
    pub enrolled: Vec<EnrolledCourse>,
    pub upcoming: Vec<UpcomingSession>,
}

struct CatalogData {
    courses: Vec<Course>,
    instructors: HashMap<String, Instructor>,
    sessions: Vec<Session>,
}

impl CatalogData {
    fn instructor_for(&self, course: &Course) -> Option<Instructor> {
        let id = course.instructor_id.as_ref()?;
        self.instructors.get(&*id.key()).cloned()
    }

    fn sessions_of(&self, course_id: &RecordId) -> Vec<Session> {
        self.sessions
            .iter()
            .filter(|s| &s.course_id == course_id)
            .cloned()
            .collect()
    }
}

/// Course catalog joined against instructors, sessions, materials and the
/// viewer's enrollments.
pub struct Catalog {
    store: Arc<dyn LocalStore>,
    fixtures: Fixtures,
    enrollments: Arc<EnrollmentStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn LocalStore>, fixtures: Fixtures, enrollments: Arc<EnrollmentStore>) -> Self {
        Self {
            store,
            fixtures,
            enrollments,
        }
    }

    /// Locally cached copies win over fixtures when they hold an array.
    async fn cached_or_fixture<T: DeserializeOwned>(&self, key: &str, fixture: &str) -> Vec<T> {
        match storage::read_array_opt(self.store.as_ref(), key).await {
            Some(cached) => cached,
            None => self.fixtures.load(fixture).await,
        }
    }

    async fn data(&self) -> CatalogData {
        let courses = self.cached_or_fixture(keys::COURSES, fixtures::COURSES).await;
        let instructors: Vec<Instructor> =
            self.cached_or_fixture(keys::INSTRUCTORS, fixtures::INSTRUCTORS).await;
        let sessions = self.cached_or_fixture(keys::SESSIONS, fixtures::SESSIONS).await;

        CatalogData {
            courses,
            instructors: instructors
                .into_iter()
                .map(|i| (i.id.to_string(), i))
                .collect(),
            sessions,
        }
    }

    pub async fn courses(&self) -> Vec<Course> {
        self.data().await.courses
    }

    pub async fn find_course(&self, needle: &str) -> Option<Course> {
        let courses = self.courses().await;
        courses
            .iter()
            .find(|c| c.id.matches(needle))
            .or_else(|| courses.iter().find(|c| c.title == needle))
            .cloned()
    }

    pub async fn search(&self, filter: &CourseFilter, viewer: Option<&str>) -> Vec<CourseSummary> {
        let data = self.data().await;
        let enrolled = self.enrolled_set(viewer).await;

        data.courses
            .iter()
            .filter(|c| filter.matches(c))
            .map(|c| CourseSummary {
                instructor: data.instructor_for(c),
                enrolled: enrolled.contains(&*c.id.key()),
                course: c.clone(),
            })
            .collect()
    }

    pub async fn facets(&self) -> Facets {
        let data = self.data().await;

        let mut fields: Vec<String> = data
            .courses
            .iter()
            .map(|c| c.field.clone())
            .filter(|f| !f.is_empty())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        fields.sort();

        let mut statuses: Vec<String> = data
            .courses
            .iter()
            .map(|c| c.status.as_str().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        statuses.sort();

        let mut instructors: Vec<Instructor> = data.instructors.into_values().collect();
        instructors.sort_by(|a, b| a.name.cmp(&b.name));

        Facets {
            fields,
            statuses,
            instructors,
        }
    }

    pub async fn detail(&self, course_id: &str, viewer: Option<&str>) -> Result<CourseDetail, AppError> {
        let data = self.data().await;
        let course = data
            .courses
            .iter()
            .find(|c| c.id.matches(course_id))
            .cloned()
            .ok_or(AppError::NotFound)?;

        let sessions = data.sessions_of(&course.id);
        let completed_sessions = sessions.iter().filter(|s| s.is_completed()).count();

        let enrollment = match viewer {
            Some(student_id) => self.enrollments.find_for(student_id, course_id).await,
            None => None,
        };
        let enrolled = enrollment.is_some();
        let completed = course.status == CourseStatus::Completed;

        let materials = if enrolled {
            let session_ids: HashSet<String> = sessions.iter().map(|s| s.id.to_string()).collect();
            self.fixtures
                .load::<Material>(fixtures::MATERIALS)
                .await
                .into_iter()
                .filter(|m| session_ids.contains(&*m.session_id.key()))
                .collect()
        } else {
            Vec::new()
        };

        Ok(CourseDetail {
            instructor: data.instructor_for(&course),
            sessions,
            materials,
            materials_locked: !enrolled,
            completed_sessions,
            enrolled,
            can_enroll: !enrolled && !completed,
            certificate_enrollment_id: enrollment
                .filter(|_| completed)
                .and_then(|e| e.id),
            course,
        })
    }

    pub async fn my_courses(&self, student_id: &str, today: NaiveDate) -> MyCourses {
        let data = self.data().await;
        let enrolled_ids = self.enrollments.enrolled_course_ids(student_id).await;

        let upcoming_of = |sessions: &[Session]| {
            let mut upcoming: Vec<(NaiveDate, Session)> = sessions
                .iter()
                .filter_map(|s| s.day().filter(|d| *d >= today).map(|d| (d, s.clone())))
                .collect();
            upcoming.sort_by_key(|(d, _)| *d);
            upcoming.into_iter().map(|(_, s)| s).collect::<Vec<_>>()
        };

        let enrolled: Vec<EnrolledCourse> = data
            .courses
            .iter()
            .filter(|c| enrolled_ids.contains(&*c.id.key()))
            .map(|c| {
                let sessions = data.sessions_of(&c.id);
                EnrolledCourse {
                    course: c.clone(),
                    instructor: data.instructor_for(c),
                    completed_sessions: sessions.iter().filter(|s| s.is_completed()).count(),
                    next_session: upcoming_of(&sessions).into_iter().next(),
                }
            })
            .collect();

        let enrolled_sessions: Vec<Session> = data
            .sessions
            .iter()
            .filter(|s| enrolled_ids.contains(&*s.course_id.key()))
            .cloned()
            .collect();
        let upcoming = upcoming_of(&enrolled_sessions)
            .into_iter()
            .take(UPCOMING_LIMIT)
            .map(|session| UpcomingSession {
                course_title: data
                    .courses
                    .iter()
                    .find(|c| c.id == session.course_id)
                    .map(|c| c.title.clone()),
                session,
            })
            .collect();

        MyCourses { enrolled, upcoming }
    }

    async fn enrolled_set(&self, viewer: Option<&str>) -> HashSet<String> {
        match viewer {
            Some(student_id) => self.enrollments.enrolled_course_ids(student_id).await,
            None => HashSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::StaticFixtureSource;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn source() -> StaticFixtureSource {
        StaticFixtureSource::new()
            .with(
                fixtures::COURSES,
                json!([
                    {"id": 1, "title": "Intro to Rust", "field": "Programming", "status": "ongoing", "instructor_id": 10},
                    {"id": 2, "title": "Data Analysis", "field": "Data", "status": "Upcoming", "instructor_id": 11},
                    {"id": 3, "title": "Advanced Rust", "field": "Programming", "status": "completed", "instructor_id": 10}
                ]),
            )
            .with(
                fixtures::INSTRUCTORS,
                json!([{"id": 10, "name": "Huda"}, {"id": 11, "name": "Ali"}]),
            )
            .with(
                fixtures::SESSIONS,
                json!([
                    {"id": 100, "course_id": 1, "date": "2026-10-01", "status": "completed", "title": "Basics"},
                    {"id": 101, "course_id": 1, "date": "2026-10-20", "status": "scheduled", "title": "Traits"},
                    {"id": 102, "course_id": 1, "date": "2026-10-18", "status": "scheduled", "title": "Ownership"},
                    {"id": 300, "course_id": 3, "date": "2026-01-10", "status": "completed", "title": "Async"}
                ]),
            )
            .with(
                fixtures::MATERIALS,
                json!([
                    {"id": 1, "session_id": 100, "title": "Slides", "type": "pdf", "file": "/m/1.pdf"},
                    {"id": 2, "session_id": 300, "title": "Notes", "type": "pdf", "file": "/m/2.pdf"}
                ]),
            )
            .with(
                fixtures::ENROLLMENTS,
                json!([{"id": 1, "student_id": "7", "course_id": 3, "enrollment_date": "2026-01-01"}]),
            )
    }

    fn setup(store: Arc<MemoryStore>) -> Catalog {
        let fixtures = Fixtures::new(Arc::new(source()));
        let enrollments = Arc::new(EnrollmentStore::new(store.clone(), fixtures.clone()));
        Catalog::new(store, fixtures, enrollments)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    #[tokio::test]
    async fn search_filters_and_marks_enrolled() {
        let catalog = setup(Arc::new(MemoryStore::new()));

        let filter = CourseFilter {
            q: Some("rust".to_string()),
            ..Default::default()
        };
        let found = catalog.search(&filter, Some("7")).await;
        assert_eq!(found.len(), 2);
        assert!(!found[0].enrolled);
        assert!(found[1].enrolled);
        assert_eq!(found[0].instructor.as_ref().map(|i| i.name.as_str()), Some("Huda"));

        let by_status = CourseFilter {
            status: Some("UPCOMING".to_string()),
            ..Default::default()
        };
        let found = catalog.search(&by_status, None).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].course.title, "Data Analysis");

        let by_instructor = CourseFilter {
            instructor_id: Some("11".to_string()),
            field: Some("Data".to_string()),
            ..Default::default()
        };
        assert_eq!(catalog.search(&by_instructor, None).await.len(), 1);
    }

    #[tokio::test]
    async fn facets_are_sorted_and_distinct() {
        let catalog = setup(Arc::new(MemoryStore::new()));
        let facets = catalog.facets().await;
        assert_eq!(facets.fields, vec!["Data", "Programming"]);
        assert_eq!(facets.statuses, vec!["completed", "ongoing", "upcoming"]);
        assert_eq!(facets.instructors.len(), 2);
    }

    #[tokio::test]
    async fn cached_courses_take_precedence() {
        let store = Arc::new(MemoryStore::with_entries([(
            keys::COURSES,
            r#"[{"id": 9, "title": "Cached", "status": "ongoing"}]"#,
        )]));
        let catalog = setup(store);
        let courses = catalog.courses().await;
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].title, "Cached");
    }

    #[tokio::test]
    async fn detail_locks_materials_for_outsiders() {
        let catalog = setup(Arc::new(MemoryStore::new()));

        let detail = catalog.detail("1", None).await.unwrap();
        assert!(detail.materials_locked);
        assert!(detail.materials.is_empty());
        assert!(detail.can_enroll);
        assert_eq!(detail.sessions.len(), 3);
        assert_eq!(detail.completed_sessions, 1);

        let completed = catalog.detail("3", Some("8")).await.unwrap();
        assert!(!completed.can_enroll);
        assert!(completed.certificate_enrollment_id.is_none());
    }

    #[tokio::test]
    async fn detail_for_enrolled_viewer() {
        let catalog = setup(Arc::new(MemoryStore::new()));

        let detail = catalog.detail("3", Some("7")).await.unwrap();

        assert!(detail.enrolled);
        assert!(!detail.can_enroll);
        assert_eq!(detail.materials.len(), 1);
        assert_eq!(detail.materials[0].title, "Notes");
        assert_eq!(detail.certificate_enrollment_id, Some(RecordId::Number(1)));
    }

    #[tokio::test]
    async fn detail_of_unknown_course_is_not_found() {
        let catalog = setup(Arc::new(MemoryStore::new()));
        assert!(matches!(catalog.detail("404", None).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn my_courses_lists_next_sessions() {
        let store = Arc::new(MemoryStore::new());
        let catalog = setup(store);
        catalog.enrollments.enroll_on("7", "1", today()).await.unwrap();

        let mine = catalog.my_courses("7", today()).await;

        assert_eq!(mine.enrolled.len(), 2);
        let intro = mine.enrolled.iter().find(|c| c.course.id.matches("1")).unwrap();
        assert_eq!(intro.completed_sessions, 1);
        assert_eq!(intro.next_session.as_ref().map(|s| s.title.as_str()), Some("Ownership"));

        let titles: Vec<&str> = mine.upcoming.iter().map(|u| u.session.title.as_str()).collect();
        assert_eq!(titles, vec!["Ownership", "Traits"]);
        assert_eq!(mine.upcoming[0].course_title.as_deref(), Some("Intro to Rust"));
    }
}
