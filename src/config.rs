use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub api_base_url: String,
    pub api_token: String,
    pub business_timezone: String,
    pub request_timeout_secs: u64,
    pub preview_debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            api_base_url: "http://localhost:8080/api".to_string(),
            api_token: String::new(),
            business_timezone: "UTC".to_string(),
            request_timeout_secs: 15,
            preview_debounce_ms: 25,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.port),
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            api_token: env::var("API_TOKEN").unwrap_or(defaults.api_token),
            business_timezone: env::var("BUSINESS_TIMEZONE").unwrap_or(defaults.business_timezone),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.request_timeout_secs),
            preview_debounce_ms: env::var("PREVIEW_DEBOUNCE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.preview_debounce_ms),
        }
    }
}
