use chrono::NaiveDate;
use serde::Serialize;
use crate::domain::models::closure::NewClosure;
use crate::domain::services::closure_overlap::ImpactPreview;
use crate::domain::services::views::CalendarView;

#[derive(Serialize)]
pub struct CalendarResponse<'a> {
    pub business_id: String,
    pub timezone: &'static str,
    pub anchor_date: NaiveDate,
    #[serde(flatten)]
    pub view: CalendarView<'a>,
}

#[derive(Serialize)]
pub struct ClosurePreviewResponse {
    pub closure: NewClosure,
    pub impact: ImpactPreview,
    pub days_touched: Vec<NaiveDate>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timezone: &'static str,
}
