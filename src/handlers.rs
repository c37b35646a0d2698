use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    AppState,
    error::ApiError,
    models::{CLASS_MENU, CatalogView, Notice, RegistrationForm, ScheduleRequestForm},
    registration::SubmissionOutcome,
    validation::{validate_registration, validate_schedule_request},
};

#[utoipa::path(get, path = "/", tag = "booking")]
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Baking Forest Class API",
        "endpoints": {
            "/classes": "Upcoming one-day classes",
            "/registrations": "Register for a class",
            "/schedule-requests": "Request a custom class schedule",
            "/schedule-requests/menu": "Items available for custom classes"
        }
    }))
}

#[utoipa::path(get, path = "/healthz/live", tag = "booking")]
pub async fn healthz_live() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(get, path = "/healthz/ready", tag = "booking")]
pub async fn healthz_ready() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

fn outcome_response(outcome: SubmissionOutcome) -> (StatusCode, Json<Notice>) {
    match outcome {
        SubmissionOutcome::Succeeded(notice) => (StatusCode::CREATED, Json(notice)),
        SubmissionOutcome::Failed(notice) => (StatusCode::BAD_GATEWAY, Json(notice)),
    }
}

#[utoipa::path(
    get,
    path = "/classes",
    responses(
        (status = 200, description = "Catalog, populated or empty; upstream failures yield empty", body = CatalogView)
    ),
    tag = "booking"
)]
pub async fn get_classes(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.catalog.load().await)
}

#[utoipa::path(
    post,
    path = "/registrations",
    request_body = RegistrationForm,
    responses(
        (status = 201, description = "Registration stored", body = Notice),
        (status = 409, description = "Same registration already in progress"),
        (status = 422, description = "Invalid form fields"),
        (status = 502, description = "Store rejected the registration", body = Notice)
    ),
    tag = "booking"
)]
pub async fn create_registration(
    State(state): State<AppState>,
    Json(form): Json<RegistrationForm>,
) -> Result<impl IntoResponse, ApiError> {
    let registration = validate_registration(&form, state.settings.min_phone_digits)?;
    let submission = state.submitter.submit(registration).await?;
    // counter and notification keep running after the response
    Ok(outcome_response(submission.outcome))
}

#[utoipa::path(
    get,
    path = "/schedule-requests/menu",
    responses((status = 200, description = "Class types for custom schedules", body = [String])),
    tag = "booking"
)]
pub async fn get_class_menu() -> impl IntoResponse {
    Json(CLASS_MENU)
}

#[utoipa::path(
    post,
    path = "/schedule-requests",
    request_body = ScheduleRequestForm,
    responses(
        (status = 201, description = "Request sent to the operator", body = Notice),
        (status = 422, description = "Invalid form fields"),
        (status = 502, description = "Notification could not be sent", body = Notice)
    ),
    tag = "booking"
)]
pub async fn create_schedule_request(
    State(state): State<AppState>,
    Json(form): Json<ScheduleRequestForm>,
) -> Result<impl IntoResponse, ApiError> {
    let request = validate_schedule_request(&form, state.settings.min_phone_digits)?;
    Ok(outcome_response(state.submitter.request_schedule(request).await))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("No such endpoint".into())
}
