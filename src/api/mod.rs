use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::post;
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::Utc;
use serde::Deserialize;

use crate::error::AppError;
use crate::identity::Session;
use crate::models::{Enrollment, ProfileUpdate, SignupRequest, Student};
use crate::services::{
    Certificate, CertificateQuery, CourseDetail, CourseFilter, CourseSummary, Enrolled, Facets,
    MyCourses, Profile, resolve_certificate,
};
use crate::state::AppState;
use crate::storage::keys;

#[derive(Deserialize)]
struct LoginRequest {
    identifier: String,
    password: String,
}

#[derive(Deserialize)]
struct PasswordChange {
    current_password: String,
    new_password: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses))
        .route("/courses/facets", get(course_facets))
        .route("/courses/{id}", get(course_detail))
        .route("/courses/{id}/enroll", post(enroll))
        .route("/me", get(me).patch(update_me))
        .route("/me/password", post(change_password))
        .route("/me/courses", get(my_courses))
        .route("/me/enrollments", get(my_enrollments))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/signup", post(signup))
        .route("/certificate", get(certificate))
        .with_state(state)
}

async fn current_session(state: &AppState) -> Result<Session, AppError> {
    Session::load(state.store.as_ref())
        .await
        .ok_or_else(|| AppError::Unauthorized("Please log in first.".to_string()))
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.store.get(keys::CURRENT_USER).await?;
    Ok(StatusCode::OK)
}

async fn list_courses(
    State(state): State<AppState>,
    Query(filter): Query<CourseFilter>,
) -> Json<Vec<CourseSummary>> {
    let viewer = Session::load(state.store.as_ref()).await;
    let courses = state
        .catalog
        .search(&filter, viewer.as_ref().map(|s| s.user_id.as_str()))
        .await;
    Json(courses)
}

async fn course_facets(State(state): State<AppState>) -> Json<Facets> {
    Json(state.catalog.facets().await)
}

async fn course_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CourseDetail>, AppError> {
    let viewer = Session::load(state.store.as_ref()).await;
    let detail = state
        .catalog
        .detail(&id, viewer.as_ref().map(|s| s.user_id.as_str()))
        .await?;
    Ok(Json(detail))
}

async fn enroll(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Enrolled>), AppError> {
    let session = current_session(&state).await?;
    let detail = state.catalog.detail(&id, Some(&session.user_id)).await?;
    if !detail.enrolled && !detail.can_enroll {
        return Err(AppError::Validation("This course is closed for enrollment.".to_string()));
    }

    let enrolled = state.enrollments.enroll(&session.user_id, &id).await?;
    let status = if enrolled.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(enrolled)))
}

async fn me(State(state): State<AppState>) -> Result<Json<Profile>, AppError> {
    let session = current_session(&state).await?;
    let profile = state.accounts.profile(&session.user_id).await?;
    Ok(Json(profile))
}

async fn update_me(
    State(state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Student>, AppError> {
    let session = current_session(&state).await?;
    let student = state.accounts.update_profile(&session.user_id, update).await?;
    Ok(Json(student))
}

async fn change_password(
    State(state): State<AppState>,
    Json(req): Json<PasswordChange>,
) -> Result<StatusCode, AppError> {
    let session = current_session(&state).await?;
    state
        .accounts
        .change_password(&session.user_id, &req.current_password, &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn my_courses(State(state): State<AppState>) -> Result<Json<MyCourses>, AppError> {
    let session = current_session(&state).await?;
    let today = Utc::now().date_naive();
    Ok(Json(state.catalog.my_courses(&session.user_id, today).await))
}

async fn my_enrollments(State(state): State<AppState>) -> Result<Json<Vec<Enrollment>>, AppError> {
    let session = current_session(&state).await?;
    Ok(Json(state.enrollments.history(&session.user_id).await))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Session>, AppError> {
    let session = state.accounts.login(&req.identifier, &req.password).await?;
    Ok(Json(session))
}

async fn logout(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.accounts.logout().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    let student = state.accounts.signup(req).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

async fn certificate(
    State(state): State<AppState>,
    Query(query): Query<CertificateQuery>,
) -> Json<Certificate> {
    let cert = resolve_certificate(&state.enrollments, &state.catalog, &state.accounts, &query).await;
    Json(cert)
}
