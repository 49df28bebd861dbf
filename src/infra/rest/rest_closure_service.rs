use crate::domain::models::closure::{Closure, NewClosure};
use crate::domain::ports::ClosureService;
use crate::error::AppError;
use crate::infra::rest::client::ApiClient;
use crate::infra::rest::records::{ClosurePayload, ClosureRecord};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, warn};

pub struct RestClosureService {
    client: Arc<ApiClient>,
}

impl RestClosureService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClosureService for RestClosureService {
    async fn get_closures(&self) -> Result<Vec<Closure>, AppError> {
        let records: Vec<ClosureRecord> = self.client.get("closures", &[]).await?;
        let closures = records
            .into_iter()
            .filter_map(|r| match Closure::try_from(r) {
                Ok(closure) => Some(closure),
                Err(e) => {
                    warn!("Skipping {}", e);
                    None
                }
            })
            .collect();
        Ok(closures)
    }

    async fn create_closure(&self, closure: &NewClosure) -> Result<Closure, AppError> {
        let record: ClosureRecord = self.client.post("closures", &ClosurePayload::from(closure)).await?;
        Closure::try_from(record).map_err(|e| {
            error!("Created closure came back malformed: {}", e);
            AppError::Transport(e.to_string())
        })
    }

    async fn delete_closure(&self, id: &str) -> Result<(), AppError> {
        self.client.delete(&format!("closures/{}", id)).await
    }
}
