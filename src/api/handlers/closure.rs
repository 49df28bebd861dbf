use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::info;
use crate::api::dtos::responses::ClosurePreviewResponse;
use crate::domain::services::{
    closure_overlap::{days_touched, impact_preview, validate_draft, ClosureDraft},
    controller::load_appointments,
    timezone::to_business_local_date,
};
use crate::error::AppError;
use crate::state::AppState;

pub async fn list_closures(
    State(state): State<Arc<AppState>>,
    Path(business_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let closures = state.closure_service.get_closures().await?;
    info!("Listing {} closures for business {}", closures.len(), business_id);
    Ok(Json(closures))
}

/// Validates a draft and reports what it would affect without submitting it.
pub async fn preview_closure(
    State(state): State<Arc<AppState>>,
    Path(business_id): Path<String>,
    Json(draft): Json<ClosureDraft>,
) -> Result<impl IntoResponse, AppError> {
    let closure = validate_draft(&draft, state.clock.now(), state.tz)?;

    let appointments = load_appointments(
        state.appointment_service.as_ref(),
        &business_id,
        closure.start_date,
        closure.end_date,
    )
    .await?;
    let impact = impact_preview(closure.start_date, closure.end_date, &appointments);

    let first = to_business_local_date(closure.start_date, state.tz);
    let last = to_business_local_date(closure.end_date, state.tz);
    let candidate = closure.clone().into_closure("preview".to_string());
    let days = days_touched(&candidate, state.tz, first, last);

    Ok(Json(ClosurePreviewResponse {
        closure,
        impact,
        days_touched: days,
    }))
}

pub async fn create_closure(
    State(state): State<Arc<AppState>>,
    Path(business_id): Path<String>,
    Json(draft): Json<ClosureDraft>,
) -> Result<impl IntoResponse, AppError> {
    let closure = validate_draft(&draft, state.clock.now(), state.tz)?;
    let created = state.closure_service.create_closure(&closure).await?;
    info!("Closure {} created for business {}", created.id, business_id);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_closure(
    State(state): State<Arc<AppState>>,
    Path((business_id, closure_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    state.closure_service.delete_closure(&closure_id).await?;
    info!("Closure {} deleted for business {}", closure_id, business_id);
    Ok(StatusCode::NO_CONTENT)
}
