use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use crate::api::dtos::{
    requests::{CalendarQuery, ExportQuery},
    responses::CalendarResponse,
};
use crate::domain::services::{
    calendar::generate_ics,
    controller::load_snapshot,
    timezone::to_business_local_date,
    views::{build_view, query_range, ViewKind},
};
use crate::error::AppError;
use crate::state::AppState;

pub async fn get_calendar(
    State(state): State<Arc<AppState>>,
    Path((business_id, view)): Path<(String, String)>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Value>, AppError> {
    let kind: ViewKind = view.parse().map_err(AppError::Validation)?;
    let now = state.clock.now();
    let date = query.date.unwrap_or_else(|| to_business_local_date(now, state.tz));
    info!("Building {} view for business {} on {}", kind, business_id, date);

    let (from, to) = query_range(kind, date, state.tz);
    let snapshot = load_snapshot(&state.collaborators(), &business_id, from, to).await?;
    let response = CalendarResponse {
        business_id,
        timezone: state.tz.name(),
        anchor_date: date,
        view: build_view(kind, date, &snapshot.view_input(state.tz, now)),
    };

    let body = serde_json::to_value(&response).map_err(|e| AppError::InternalWithMsg(e.to_string()))?;
    Ok(Json(body))
}

pub async fn export_calendar(
    State(state): State<Arc<AppState>>,
    Path(business_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let kind: ViewKind = match query.view.as_deref() {
        Some(raw) => raw.parse().map_err(AppError::Validation)?,
        None => ViewKind::Week,
    };
    let date = query.date.unwrap_or_else(|| to_business_local_date(state.clock.now(), state.tz));

    let (from, to) = query_range(kind, date, state.tz);
    let snapshot = load_snapshot(&state.collaborators(), &business_id, from, to).await?;
    let ics = generate_ics(
        &format!("Appointments {}", business_id),
        &snapshot.appointments,
        &snapshot.closures,
        state.tz,
        from,
        to,
    );
    info!("Exported {} view of business {} starting {}", kind, business_id, date);

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"calendar-{}-{}.ics\"", kind, date)),
        ],
        ics,
    ))
}
