use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::ports::SystemClock;
use crate::domain::services::timezone::parse_timezone;
use crate::infra::rest::client::ApiClient;
use crate::infra::rest::rest_appointment_service::RestAppointmentService;
use crate::infra::rest::rest_closure_service::RestClosureService;
use crate::infra::rest::rest_profile_service::RestProfileService;
use crate::state::AppState;

pub fn bootstrap_state(config: &Config) -> AppState {
    info!("Connecting to booking API at {}", config.api_base_url);
    if config.api_token.is_empty() {
        warn!("API_TOKEN is empty; upstream calls are sent without credentials");
    }

    let client = Arc::new(ApiClient::new(
        &config.api_base_url,
        &config.api_token,
        Duration::from_secs(config.request_timeout_secs),
    ));

    AppState {
        config: config.clone(),
        tz: parse_timezone(&config.business_timezone),
        appointment_service: Arc::new(RestAppointmentService::new(client.clone())),
        closure_service: Arc::new(RestClosureService::new(client.clone())),
        profile_service: Arc::new(RestProfileService::new(client)),
        clock: Arc::new(SystemClock),
    }
}
