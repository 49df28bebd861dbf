use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::info;
use crate::api::dtos::requests::UpdateStatusRequest;
use crate::domain::models::appointment::AppointmentStatus;
use crate::error::AppError;
use crate::state::AppState;

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path((business_id, appointment_id)): Path<(String, String)>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status: AppointmentStatus = payload.status.parse().map_err(AppError::Validation)?;
    state.appointment_service.update_appointment_status(&appointment_id, status).await?;
    info!("Appointment {} of business {} set to {}", appointment_id, business_id, status);
    Ok(StatusCode::NO_CONTENT)
}
