use booking_calendar::{
    api::router::create_router,
    config::Config,
    domain::models::{
        appointment::{Appointment, AppointmentPage, AppointmentQuery, AppointmentStatus, PartyRef},
        business_hours::{BusinessHours, DaySchedule},
        closure::{Closure, ClosureType, NewClosure},
    },
    domain::ports::{AppointmentService, BusinessProfileService, ClosureService, Clock},
    domain::services::timezone::parse_timezone,
    error::AppError,
    state::AppState,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

pub fn utc(y: i32, m: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, mi, 0).unwrap()
}

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn appointment(id: &str, start: DateTime<Utc>, minutes: u32, status: AppointmentStatus) -> Appointment {
    Appointment {
        id: id.to_string(),
        start,
        end: start + Duration::minutes(minutes as i64),
        duration_minutes: minutes,
        status,
        service: PartyRef { id: "svc-1".into(), name: "Haircut".into() },
        customer: PartyRef { id: format!("cust-{}", id), name: format!("Customer {}", id) },
        price: 30.0,
    }
}

pub fn closure(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Closure {
    Closure {
        id: id.to_string(),
        start_date: start,
        end_date: end,
        reason: "Team meeting".into(),
        closure_type: ClosureType::Other,
        is_active: true,
        recurring: None,
        notification: None,
    }
}

/// 08:00-22:00 on every weekday.
pub fn default_hours() -> BusinessHours {
    BusinessHours::uniform(DaySchedule::open(t(8, 0), t(22, 0)))
}

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

#[allow(dead_code)]
impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
pub struct InMemoryAppointments {
    pub appointments: Mutex<Vec<Appointment>>,
    /// 0 means everything on one page.
    pub page_size: Mutex<usize>,
    /// Consumed one per `get_appointments` call.
    pub delays: Mutex<VecDeque<std::time::Duration>>,
    pub next_error: Mutex<Option<AppError>>,
    pub fetches: AtomicUsize,
    pub queries: Mutex<Vec<AppointmentQuery>>,
}

#[allow(dead_code)]
impl InMemoryAppointments {
    pub fn set(&self, appointments: Vec<Appointment>) {
        *self.appointments.lock().unwrap() = appointments;
    }

    pub fn fail_next(&self, error: AppError) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AppointmentService for InMemoryAppointments {
    async fn get_appointments(&self, query: &AppointmentQuery) -> Result<AppointmentPage, AppError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        let delay = self.delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }

        let mut matching: Vec<Appointment> = self.appointments.lock().unwrap()
            .iter()
            .filter(|a| a.overlaps(query.date_from, query.date_to))
            .cloned()
            .collect();
        matching.sort_by_key(|a| a.start);

        let total = matching.len();
        let page_size = match *self.page_size.lock().unwrap() {
            0 => total.max(1),
            n => n,
        };
        let total_pages = total.div_ceil(page_size).max(1) as u32;
        let skip = (query.page.saturating_sub(1) as usize) * page_size;

        Ok(AppointmentPage {
            appointments: matching.into_iter().skip(skip).take(page_size).collect(),
            total: total as u64,
            page: query.page,
            total_pages,
        })
    }

    async fn update_appointment_status(&self, id: &str, status: AppointmentStatus) -> Result<(), AppError> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }
        let mut appointments = self.appointments.lock().unwrap();
        match appointments.iter_mut().find(|a| a.id == id) {
            Some(a) => {
                a.status = status;
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Appointment {}", id))),
        }
    }
}

#[derive(Default)]
pub struct InMemoryClosures {
    pub closures: Mutex<Vec<Closure>>,
    pub next_error: Mutex<Option<AppError>>,
    pub submissions: Mutex<Vec<NewClosure>>,
}

#[allow(dead_code)]
impl InMemoryClosures {
    pub fn set(&self, closures: Vec<Closure>) {
        *self.closures.lock().unwrap() = closures;
    }

    pub fn fail_next(&self, error: AppError) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl ClosureService for InMemoryClosures {
    async fn get_closures(&self) -> Result<Vec<Closure>, AppError> {
        Ok(self.closures.lock().unwrap().clone())
    }

    async fn create_closure(&self, closure: &NewClosure) -> Result<Closure, AppError> {
        self.submissions.lock().unwrap().push(closure.clone());
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }
        let created = closure.clone().into_closure(Uuid::new_v4().to_string());
        self.closures.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn delete_closure(&self, id: &str) -> Result<(), AppError> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }
        let mut closures = self.closures.lock().unwrap();
        let before = closures.len();
        closures.retain(|c| c.id != id);
        if closures.len() == before {
            return Err(AppError::NotFound(format!("Closure {}", id)));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticProfile {
    pub hours: Mutex<Option<BusinessHours>>,
}

#[async_trait]
impl BusinessProfileService for StaticProfile {
    async fn get_business_hours(&self, _business_id: &str) -> Result<Option<BusinessHours>, AppError> {
        Ok(self.hours.lock().unwrap().clone())
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub appointments: Arc<InMemoryAppointments>,
    pub closures: Arc<InMemoryClosures>,
    pub profile: Arc<StaticProfile>,
    pub clock: Arc<FixedClock>,
}

#[allow(dead_code)]
impl TestApp {
    /// Business in UTC, open 08:00-22:00, clock at 2025-03-09 12:00Z.
    pub fn new() -> Self {
        Self::with_timezone("UTC")
    }

    pub fn with_timezone(timezone: &str) -> Self {
        let config = Config {
            port: 0,
            business_timezone: timezone.to_string(),
            ..Config::default()
        };

        let appointments = Arc::new(InMemoryAppointments::default());
        let closures = Arc::new(InMemoryClosures::default());
        let profile = Arc::new(StaticProfile { hours: Mutex::new(Some(default_hours())) });
        let clock = Arc::new(FixedClock::new(utc(2025, 3, 9, 12, 0)));

        let state = Arc::new(AppState {
            config: config.clone(),
            tz: parse_timezone(timezone),
            appointment_service: appointments.clone(),
            closure_service: closures.clone(),
            profile_service: profile.clone(),
            clock: clock.clone(),
        });

        Self {
            router: create_router(state.clone()),
            state,
            appointments,
            closures,
            profile,
            clock,
        }
    }

    /// The scenario day: one 10:00-10:30 appointment and a 13:00-14:00 closure on 2025-03-10.
    pub fn seed_scenario(&self) {
        self.appointments.set(vec![appointment("a1", utc(2025, 3, 10, 10, 0), 30, AppointmentStatus::Confirmed)]);
        self.closures.set(vec![closure("cl1", utc(2025, 3, 10, 13, 0), utc(2025, 3, 10, 14, 0))]);
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap()
        ).await.unwrap();
        let status = response.status();
        (status, parse_body(response).await)
    }

    pub async fn send_json(&self, method: &str, uri: &str, body: &Value) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        ).await.unwrap();
        let status = response.status();
        (status, parse_body(response).await)
    }
}

pub async fn parse_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}
