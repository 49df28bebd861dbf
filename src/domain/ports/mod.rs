use crate::domain::models::{
    appointment::{AppointmentPage, AppointmentQuery, AppointmentStatus},
    business_hours::BusinessHours,
    closure::{Closure, NewClosure},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait AppointmentService: Send + Sync {
    async fn get_appointments(&self, query: &AppointmentQuery) -> Result<AppointmentPage, AppError>;
    async fn update_appointment_status(&self, id: &str, status: AppointmentStatus) -> Result<(), AppError>;
}

#[async_trait]
pub trait ClosureService: Send + Sync {
    /// All closures of the business, active and inactive.
    async fn get_closures(&self) -> Result<Vec<Closure>, AppError>;
    async fn create_closure(&self, closure: &NewClosure) -> Result<Closure, AppError>;
    async fn delete_closure(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait BusinessProfileService: Send + Sync {
    /// `None` when the business has never configured its hours.
    async fn get_business_hours(&self, business_id: &str) -> Result<Option<BusinessHours>, AppError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
