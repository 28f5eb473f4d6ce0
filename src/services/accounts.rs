//! Simulated student accounts.
//!
//! Passwords are plain text in the local store and compared as-is. This
//! mirrors a demo portal and is not an authentication scheme.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::AppError;
use crate::fixtures::{self, Fixtures};
use crate::identity::Session;
use crate::merge::merge_fields;
use crate::models::{
    CurrentUser, Enrollment, ProfileUpdate, RecordId, SignupRequest, Student, decode_records,
};
use crate::services::{Catalog, EnrollmentStore};
use crate::storage::{self, LocalStore, keys};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub enrollment: Enrollment,
    pub course_title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub student: Student,
    pub enrollments: Vec<HistoryEntry>,
}

pub struct Accounts {
    store: Arc<dyn LocalStore>,
    fixtures: Fixtures,
    enrollments: Arc<EnrollmentStore>,
    catalog: Arc<Catalog>,
}

fn student_key(value: &Value) -> Option<String> {
    match value.get("nationalId")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn required(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

impl Accounts {
    pub fn new(
        store: Arc<dyn LocalStore>,
        fixtures: Fixtures,
        enrollments: Arc<EnrollmentStore>,
        catalog: Arc<Catalog>,
    ) -> Self {
        Self {
            store,
            fixtures,
            enrollments,
            catalog,
        }
    }

    /// Fixture students with local edits laid over them field by field.
    /// An override matches by nationalId, or by email when that is shared.
    pub async fn students(&self) -> Vec<Student> {
        let mut merged: Vec<Value> = self.fixtures.load(fixtures::STUDENTS).await;
        let overrides: Vec<Value> = storage::read_array(self.store.as_ref(), keys::STUDENTS).await;

        for overlay in overrides {
            let key = student_key(&overlay);
            let email = overlay.get("email").and_then(Value::as_str).filter(|e| !e.is_empty());
            let existing = merged.iter_mut().find(|s| {
                (key.is_some() && student_key(s) == key)
                    || (email.is_some() && s.get("email").and_then(Value::as_str) == email)
            });
            match existing {
                Some(base) => merge_fields(base, overlay),
                None => merged.push(overlay),
            }
        }

        decode_records(merged, keys::STUDENTS)
    }

    pub async fn find_student(&self, identifier: &str) -> Option<Student> {
        self.students()
            .await
            .into_iter()
            .find(|s| s.is_identified_by(identifier))
    }

    async fn effective_password(&self, student: &Student) -> Option<String> {
        if let Some(pass) =
            storage::read_raw(self.store.as_ref(), &keys::password_override(&student.national_id.key())).await
        {
            return Some(pass);
        }
        if !student.email.is_empty() {
            if let Some(pass) =
                storage::read_raw(self.store.as_ref(), &keys::password_override(&student.email)).await
            {
                return Some(pass);
            }
        }
        student.pass.clone().filter(|p| !p.is_empty())
    }

    pub async fn signup(&self, req: SignupRequest) -> Result<Student, AppError> {
        let (Some(name), Some(national_id), Some(email), Some(password)) = (
            required(&req.name),
            required(&req.national_id),
            required(&req.email),
            required(&req.password),
        ) else {
            return Err(AppError::Validation("Please fill in all required fields.".to_string()));
        };
        if password != req.confirm_password.trim() {
            return Err(AppError::Validation("Passwords do not match.".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters.",
                MIN_PASSWORD_LEN
            )));
        }
        if self.find_student(national_id).await.is_some() {
            return Err(AppError::Validation(
                "An account with this national id already exists.".to_string(),
            ));
        }

        let student = Student {
            national_id: RecordId::Text(national_id.to_string()),
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            pass: Some(password.to_string()),
        };

        let mut local = storage::read_raw_array(self.store.as_ref(), keys::STUDENTS).await;
        local.push(serde_json::to_value(&student)?);
        storage::write_json(self.store.as_ref(), keys::STUDENTS, &local).await?;

        info!("created local account {}", national_id);
        Ok(student.redacted())
    }

    pub async fn login(&self, identifier: &str, password: &str) -> Result<Session, AppError> {
        let Some(identifier) = required(identifier) else {
            return Err(AppError::Validation("Please enter your email or ID.".to_string()));
        };
        let Some(password) = required(password) else {
            return Err(AppError::Validation("Please enter your password.".to_string()));
        };

        let needle = identifier.to_lowercase();
        let student = self
            .students()
            .await
            .into_iter()
            .find(|s| {
                s.national_id.key().to_lowercase() == needle || s.email.to_lowercase() == needle
            })
            .ok_or_else(|| AppError::Unauthorized("Invalid email/ID or password.".to_string()))?;

        let expected = self
            .effective_password(&student)
            .await
            .ok_or_else(|| AppError::Unauthorized("This account has no password set.".to_string()))?;
        if expected != password {
            return Err(AppError::Unauthorized("Invalid email/ID or password.".to_string()));
        }

        let user = CurrentUser {
            id: student.national_id.to_string(),
            name: Some(if student.name.is_empty() {
                student.email.clone()
            } else {
                student.name.clone()
            }),
        };
        storage::write_json(self.store.as_ref(), keys::CURRENT_USER, &user).await?;
        storage::write_json(self.store.as_ref(), keys::STUDENT, &student.clone().redacted()).await?;
        self.cache_courses().await;

        info!("student {} logged in", user.id);
        Ok(Session {
            user_id: user.id,
            name: user.name,
        })
    }

    async fn cache_courses(&self) {
        let courses: Vec<Value> = self.fixtures.load(fixtures::COURSES).await;
        if courses.is_empty() {
            return;
        }
        if let Err(e) = storage::write_json(self.store.as_ref(), keys::COURSES, &courses).await {
            warn!("could not cache courses locally: {}", e);
        }
    }

    pub async fn logout(&self) -> Result<(), AppError> {
        self.store.remove(keys::CURRENT_USER).await?;
        self.store.remove(keys::STUDENT).await?;
        Ok(())
    }

    pub async fn profile(&self, user_id: &str) -> Result<Profile, AppError> {
        let student = self.find_student(user_id).await.ok_or(AppError::NotFound)?;
        let courses = self.catalog.courses().await;

        let enrollments = self
            .enrollments
            .history(&student.national_id.key())
            .await
            .into_iter()
            .map(|enrollment| HistoryEntry {
                course_title: courses
                    .iter()
                    .find(|c| c.id == enrollment.course_id)
                    .map(|c| c.title.clone()),
                enrollment,
            })
            .collect();

        Ok(Profile {
            student: student.redacted(),
            enrollments,
        })
    }

    pub async fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<Student, AppError> {
        let Some(name) = required(&update.name) else {
            return Err(AppError::Validation("Please enter your full name.".to_string()));
        };
        let mut student = self.find_student(user_id).await.ok_or(AppError::NotFound)?;
        student.name = name.to_string();
        student.email = update.email.trim().to_string();
        student.phone = required(&update.phone).map(str::to_string);

        let mut local = storage::read_raw_array(self.store.as_ref(), keys::STUDENTS).await;
        let key = student.national_id.to_string();
        let record = serde_json::to_value(&student)?;
        match local.iter_mut().find(|s| student_key(s).as_deref() == Some(key.as_str())) {
            Some(slot) => *slot = record,
            None => local.push(record),
        }
        storage::write_json(self.store.as_ref(), keys::STUDENTS, &local).await?;

        let public = student.redacted();
        storage::write_json(self.store.as_ref(), keys::STUDENT, &public).await?;
        storage::write_json(
            self.store.as_ref(),
            keys::CURRENT_USER,
            &CurrentUser {
                id: key,
                name: Some(public.name.clone()),
            },
        )
        .await?;

        info!("updated profile of student {}", public.national_id);
        Ok(public)
    }

    pub async fn change_password(&self, user_id: &str, current: &str, new: &str) -> Result<(), AppError> {
        let (Some(current), Some(new)) = (required(current), required(new)) else {
            return Err(AppError::Validation(
                "Please enter your current and new password.".to_string(),
            ));
        };
        let student = self.find_student(user_id).await.ok_or(AppError::NotFound)?;

        if self.effective_password(&student).await.as_deref() != Some(current) {
            return Err(AppError::Unauthorized("Current password is incorrect.".to_string()));
        }
        if new.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "New password must be at least {} characters.",
                MIN_PASSWORD_LEN
            )));
        }

        self.store
            .set(&keys::password_override(&student.national_id.key()), new)
            .await?;
        info!("password changed for student {}", student.national_id);
        Ok(())
    }
}
