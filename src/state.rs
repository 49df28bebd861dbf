use std::sync::Arc;
use std::time::Duration;
use chrono_tz::Tz;
use crate::config::Config;
use crate::domain::ports::{AppointmentService, BusinessProfileService, ClosureService, Clock};
use crate::domain::services::controller::{CalendarController, Collaborators};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub tz: Tz,
    pub appointment_service: Arc<dyn AppointmentService>,
    pub closure_service: Arc<dyn ClosureService>,
    pub profile_service: Arc<dyn BusinessProfileService>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            appointments: self.appointment_service.clone(),
            closures: self.closure_service.clone(),
            profile: self.profile_service.clone(),
            clock: self.clock.clone(),
        }
    }

    /// A fresh calendar instance for one business.
    pub fn controller(&self, business_id: &str) -> CalendarController {
        CalendarController::new(
            business_id,
            self.tz,
            self.collaborators(),
            Duration::from_millis(self.config.preview_debounce_ms),
        )
    }
}
