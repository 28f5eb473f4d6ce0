use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::fixtures::{self, Fixtures};
use crate::merge::{Merged, merge};
use crate::models::{Enrollment, RecordId};
use crate::storage::{self, LocalStore, keys};

/// Broadcast to open views after an enrollment was persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentEvent {
    Changed(Enrollment),
}

#[derive(Debug, Clone, Serialize)]
pub struct Enrolled {
    pub enrollment: Enrollment,
    /// False when the pair was already enrolled and the existing record came back.
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Fixture enrollments merged with locally appended ones.
///
/// Fixture records are never written. New enrollments go to the
/// `enrollments` key; the legacy `enrollment` key is read but left alone.
pub struct EnrollmentStore {
    store: Arc<dyn LocalStore>,
    fixtures: Fixtures,
    events: broadcast::Sender<EnrollmentEvent>,
    // Serializes read-compute-write in `enroll` for this process only.
    write_lock: Mutex<()>,
}

impl EnrollmentStore {
    pub fn new(store: Arc<dyn LocalStore>, fixtures: Fixtures) -> Self {
        let (events, _) = broadcast::channel(storage::EVENT_BUFFER);
        Self {
            store,
            fixtures,
            events,
            write_lock: Mutex::new(()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EnrollmentEvent> {
        self.events.subscribe()
    }

    async fn merged_view(&self) -> Merged<Enrollment> {
        let server: Vec<Enrollment> = self.fixtures.load(fixtures::ENROLLMENTS).await;

        let mut local: Vec<Enrollment> =
            storage::read_array(self.store.as_ref(), keys::LEGACY_ENROLLMENT).await;
        local.extend(storage::read_array::<Enrollment>(self.store.as_ref(), keys::ENROLLMENTS).await);

        debug!("merging {} fixture and {} local enrollments", server.len(), local.len());
        merge(server, local, |e| e.id.clone())
    }

    pub async fn load_merged(&self) -> Vec<Enrollment> {
        self.merged_view().await.into_all()
    }

    pub async fn is_enrolled(&self, student_id: &str, course_id: &str) -> bool {
        self.find_for(student_id, course_id).await.is_some()
    }

    pub async fn find_for(&self, student_id: &str, course_id: &str) -> Option<Enrollment> {
        self.merged_view()
            .await
            .into_all()
            .into_iter()
            .find(|e| e.is_for(student_id, course_id))
    }

    pub async fn find(&self, enrollment_id: &str) -> Option<Enrollment> {
        self.merged_view()
            .await
            .records
            .into_iter()
            .find(|e| e.id.as_ref().is_some_and(|id| id.matches(enrollment_id)))
    }

    pub async fn history(&self, student_id: &str) -> Vec<Enrollment> {
        self.load_merged()
            .await
            .into_iter()
            .filter(|e| e.belongs_to(student_id))
            .collect()
    }

    pub async fn enrolled_course_ids(&self, student_id: &str) -> HashSet<String> {
        self.history(student_id)
            .await
            .into_iter()
            .map(|e| e.course_id.to_string())
            .collect()
    }

    pub async fn enroll(&self, student_id: &str, course_id: &str) -> Result<Enrolled, AppError> {
        self.enroll_on(student_id, course_id, Utc::now().date_naive()).await
    }

    pub async fn enroll_on(
        &self,
        student_id: &str,
        course_id: &str,
        date: NaiveDate,
    ) -> Result<Enrolled, AppError> {
        let student_id = student_id.trim();
        let course_id = course_id.trim();
        if student_id.is_empty() || course_id.is_empty() {
            return Err(AppError::Validation(
                "student id and course id are required".to_string(),
            ));
        }

        let _guard = self.write_lock.lock().await;
        let merged = self.merged_view().await;

        if let Some(existing) = merged.iter().find(|e| e.is_for(student_id, course_id)) {
            debug!("student {} already enrolled in course {}", student_id, course_id);
            return Ok(Enrolled {
                enrollment: existing.clone(),
                created: false,
                warning: None,
            });
        }

        // Local entries the typed view skipped still hold their ids.
        let mut local = storage::read_raw_array(self.store.as_ref(), keys::ENROLLMENTS).await;
        let legacy = storage::read_raw_array(self.store.as_ref(), keys::LEGACY_ENROLLMENT).await;
        let stored_ids: Vec<RecordId> = raw_ids(&local).chain(raw_ids(&legacy)).collect();
        let next_id = next_enrollment_id(merged.iter().filter_map(|e| e.id.as_ref()).chain(&stored_ids))?;

        let enrollment = Enrollment {
            id: Some(RecordId::Number(next_id)),
            student_id: RecordId::loose(student_id),
            course_id: RecordId::loose(course_id),
            enrollment_date: date.format("%Y-%m-%d").to_string(),
        };
        local.push(serde_json::to_value(&enrollment)?);

        let warning = match storage::write_json(self.store.as_ref(), keys::ENROLLMENTS, &local).await {
            Ok(()) => {
                info!(
                    "enrolled student {} in course {} (enrollment {})",
                    student_id, course_id, next_id
                );
                let _ = self.events.send(EnrollmentEvent::Changed(enrollment.clone()));
                None
            }
            Err(e) => {
                warn!("failed to persist enrollment {}: {}", next_id, e);
                Some("Enrollment could not be saved locally and may be lost on reload".to_string())
            }
        };

        Ok(Enrolled {
            enrollment,
            created: true,
            warning,
        })
    }
}

fn raw_ids(items: &[Value]) -> impl Iterator<Item = RecordId> + '_ {
    items
        .iter()
        .filter_map(|item| item.get("id"))
        .filter_map(|id| serde_json::from_value(id.clone()).ok())
}

/// One past the largest numeric id, or a conflict when no larger `i64` exists.
fn next_enrollment_id<'a>(ids: impl IntoIterator<Item = &'a RecordId>) -> Result<i64, AppError> {
    let mut max = 0;
    for id in ids {
        if id.is_past_i64() {
            return Err(AppError::Conflict(format!("no enrollment id above {}", id)));
        }
        if let Some(n) = id.as_number() {
            max = max.max(n);
        }
    }
    max.checked_add(1)
        .ok_or_else(|| AppError::Conflict(format!("no enrollment id above {}", max)))
}
