use serde::{Deserialize, Serialize};

use crate::services::{Accounts, Catalog, EnrollmentStore};

pub const FALLBACK_COURSE_TITLE: &str = "Course Title";
pub const FALLBACK_STUDENT_NAME: &str = "Student Name";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CertificateQuery {
    #[serde(default)]
    pub enrollment: Option<String>,
    /// Course id or title.
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub student: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Certificate {
    pub course_title: String,
    pub student_name: String,
}

/// Resolves the names printed on a certificate. An enrollment id, when it
/// matches, decides the student and supplies the course if none was given.
pub async fn resolve_certificate(
    enrollments: &EnrollmentStore,
    catalog: &Catalog,
    accounts: &Accounts,
    query: &CertificateQuery,
) -> Certificate {
    let mut course_needle = query.course.clone().filter(|c| !c.is_empty());
    let mut student_needle = query.student.clone().filter(|s| !s.is_empty());

    if let Some(enrollment_id) = query.enrollment.as_deref().filter(|e| !e.is_empty()) {
        if let Some(enrollment) = enrollments.find(enrollment_id).await {
            student_needle = Some(enrollment.student_id.to_string());
            course_needle = course_needle.or_else(|| Some(enrollment.course_id.to_string()));
        }
    }

    let course_title = match course_needle {
        Some(needle) => match catalog.find_course(&needle).await {
            Some(course) if !course.title.is_empty() => course.title,
            _ => needle,
        },
        None => FALLBACK_COURSE_TITLE.to_string(),
    };

    let student_name = match student_needle {
        Some(needle) => accounts
            .find_student(&needle)
            .await
            .map(|s| s.name)
            .filter(|n| !n.is_empty()),
        None => None,
    }
    .unwrap_or_else(|| FALLBACK_STUDENT_NAME.to_string());

    Certificate {
        course_title,
        student_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::fixtures::{self, Fixtures, StaticFixtureSource};
    use crate::storage::MemoryStore;
    use serde_json::json;

    struct Services {
        enrollments: Arc<EnrollmentStore>,
        catalog: Arc<Catalog>,
        accounts: Accounts,
    }

    fn setup() -> Services {
        let store = Arc::new(MemoryStore::new());
        let source = StaticFixtureSource::new()
            .with(fixtures::STUDENTS, json!([{"nationalId": "1001", "name": "Sara", "email": "s@x.io"}]))
            .with(fixtures::COURSES, json!([{"id": 3, "title": "Intro to Rust", "status": "completed"}]))
            .with(
                fixtures::ENROLLMENTS,
                json!([{"id": 5, "student_id": "1001", "course_id": 3, "enrollment_date": "2026-02-01"}]),
            );
        let fixtures = Fixtures::new(Arc::new(source));
        let enrollments = Arc::new(EnrollmentStore::new(store.clone(), fixtures.clone()));
        let catalog = Arc::new(Catalog::new(store.clone(), fixtures.clone(), enrollments.clone()));
        let accounts = Accounts::new(store, fixtures, enrollments.clone(), catalog.clone());
        Services {
            enrollments,
            catalog,
            accounts,
        }
    }

    async fn resolve(services: &Services, query: CertificateQuery) -> Certificate {
        resolve_certificate(&services.enrollments, &services.catalog, &services.accounts, &query).await
    }

    #[tokio::test]
    async fn enrollment_id_resolves_both_names() {
        let services = setup();
        let query = CertificateQuery {
            enrollment: Some("5".to_string()),
            ..Default::default()
        };

        let cert = resolve(&services, query).await;

        assert_eq!(cert.course_title, "Intro to Rust");
        assert_eq!(cert.student_name, "Sara");
    }

    #[tokio::test]
    async fn course_matches_by_title_and_student_by_email() {
        let services = setup();
        let query = CertificateQuery {
            course: Some("Intro to Rust".to_string()),
            student: Some("s@x.io".to_string()),
            ..Default::default()
        };

        let cert = resolve(&services, query).await;

        assert_eq!(cert.course_title, "Intro to Rust");
        assert_eq!(cert.student_name, "Sara");
    }

    #[tokio::test]
    async fn unknown_inputs_fall_back() {
        let services = setup();

        let empty = resolve(&services, CertificateQuery::default()).await;
        assert_eq!(empty.course_title, FALLBACK_COURSE_TITLE);
        assert_eq!(empty.student_name, FALLBACK_STUDENT_NAME);

        let unknown = resolve(
            &services,
            CertificateQuery {
                enrollment: Some("999".to_string()),
                course: Some("Pottery".to_string()),
                student: Some("nobody".to_string()),
            },
        )
        .await;
        assert_eq!(unknown.course_title, "Pottery");
        assert_eq!(unknown.student_name, FALLBACK_STUDENT_NAME);
    }
}
