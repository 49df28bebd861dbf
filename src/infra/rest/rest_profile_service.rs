use crate::domain::models::business_hours::BusinessHours;
use crate::domain::ports::BusinessProfileService;
use crate::error::AppError;
use crate::infra::rest::client::ApiClient;
use crate::infra::rest::records::BusinessProfileRecord;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

pub struct RestProfileService {
    client: Arc<ApiClient>,
}

impl RestProfileService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BusinessProfileService for RestProfileService {
    async fn get_business_hours(&self, business_id: &str) -> Result<Option<BusinessHours>, AppError> {
        let profile: BusinessProfileRecord = self.client
            .get(&format!("businesses/{}/profile", business_id), &[])
            .await?;

        match profile.business_hours.map(BusinessHours::try_from) {
            Some(Ok(hours)) => Ok(Some(hours)),
            Some(Err(e)) => {
                // Unreadable hours render like unconfigured ones.
                warn!("Ignoring {}", e);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
