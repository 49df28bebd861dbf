use crate::domain::models::appointment::{AppointmentPage, AppointmentQuery, AppointmentStatus};
use crate::domain::ports::AppointmentService;
use crate::error::AppError;
use crate::infra::rest::client::ApiClient;
use crate::infra::rest::records::AppointmentPageRecord;
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::json;
use std::sync::Arc;
use tracing::{instrument, warn};

const PAGE_SIZE: u32 = 200;

pub struct RestAppointmentService {
    client: Arc<ApiClient>,
}

impl RestAppointmentService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AppointmentService for RestAppointmentService {
    #[instrument(skip(self), fields(business_id = %query.business_id, page = query.page))]
    async fn get_appointments(&self, query: &AppointmentQuery) -> Result<AppointmentPage, AppError> {
        let params = [
            ("businessId", query.business_id.clone()),
            ("dateFrom", query.date_from.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("dateTo", query.date_to.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("page", query.page.to_string()),
            ("limit", PAGE_SIZE.to_string()),
        ];
        let record: AppointmentPageRecord = self.client.get("appointments", &params).await?;
        Ok(record.into_page(|e| warn!("Skipping {}", e)))
    }

    async fn update_appointment_status(&self, id: &str, status: AppointmentStatus) -> Result<(), AppError> {
        self.client
            .patch(&format!("appointments/{}/status", id), &json!({ "status": status.as_str() }))
            .await
    }
}
