//! The active calendar view instance.
//!
//! A `CalendarController` owns the selection machine and the last fetched data
//! for one calendar screen. All mutation goes through its methods; fetches are
//! tagged with a generation so only the newest request may land.

use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use crate::domain::models::appointment::{Appointment, AppointmentQuery, AppointmentStatus};
use crate::domain::models::business_hours::BusinessHours;
use crate::domain::models::closure::Closure;
use crate::domain::ports::{AppointmentService, BusinessProfileService, ClosureService, Clock};
use crate::domain::services::availability::{ClassifiedSlot, ResolverContext};
use crate::domain::services::closure_overlap::{impact_preview, validate_draft, ClosureDraft, ImpactPreview};
use crate::domain::services::selection::{
    GestureTracker, InteractionMode, SelectionEvent, SelectionMachine, SelectionOutcome, SelectionState, TouchIntent,
};
use crate::domain::services::timezone::to_business_local_date;
use crate::domain::services::views::{
    build_view, day_view, query_range, visible_days, CalendarView, ViewInput, ViewKind,
};
use crate::error::AppError;

/// Upper bound on appointment pages fetched for one view.
const MAX_APPOINTMENT_PAGES: u32 = 50;

#[derive(Clone)]
pub struct Collaborators {
    pub appointments: Arc<dyn AppointmentService>,
    pub closures: Arc<dyn ClosureService>,
    pub profile: Arc<dyn BusinessProfileService>,
    pub clock: Arc<dyn Clock>,
}

/// Data loaded for one visible range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarSnapshot {
    pub appointments: Vec<Appointment>,
    pub closures: Vec<Closure>,
    pub hours: Option<BusinessHours>,
}

impl CalendarSnapshot {
    pub fn view_input(&self, tz: Tz, now: DateTime<Utc>) -> ViewInput<'_> {
        ViewInput {
            ctx: ResolverContext {
                tz,
                now,
                appointments: &self.appointments,
                closures: &self.closures,
            },
            hours: self.hours.as_ref(),
        }
    }

    pub fn day_slots(&self, date: NaiveDate, tz: Tz, now: DateTime<Utc>) -> Vec<ClassifiedSlot<'_>> {
        day_view(date, &self.view_input(tz, now)).slots
    }
}

pub async fn load_appointments(
    service: &dyn AppointmentService,
    business_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<Appointment>, AppError> {
    let mut query = AppointmentQuery::new(business_id, from, to);
    let mut appointments = Vec::new();
    loop {
        let page = service.get_appointments(&query).await?;
        let total_pages = page.total_pages;
        appointments.extend(page.appointments);
        if query.page >= total_pages || query.page >= MAX_APPOINTMENT_PAGES {
            break;
        }
        query.page += 1;
    }
    Ok(appointments)
}

/// Fetches appointments, closures and business hours for `[from, to)` concurrently.
pub async fn load_snapshot(
    services: &Collaborators,
    business_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<CalendarSnapshot, AppError> {
    let (appointments, closures, hours) = tokio::try_join!(
        load_appointments(services.appointments.as_ref(), business_id, from, to),
        services.closures.get_closures(),
        services.profile.get_business_hours(business_id),
    )?;

    debug!(
        appointments = appointments.len(),
        closures = closures.len(),
        has_hours = hours.is_some(),
        "calendar snapshot loaded"
    );
    Ok(CalendarSnapshot { appointments, closures, hours })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// A newer fetch started (or the view was torn down) before this one finished.
    Discarded,
}

struct ControllerState {
    view: ViewKind,
    date: NaiveDate,
    machine: SelectionMachine,
    gestures: GestureTracker,
    snapshot: Option<CalendarSnapshot>,
    /// Business-local days the applied snapshot was fetched for.
    loaded_days: Option<(NaiveDate, NaiveDate)>,
    loading: bool,
    generation: u64,
    last_error: Option<String>,
    preview_task: Option<JoinHandle<()>>,
    torn_down: bool,
}

impl ControllerState {
    fn abort_preview(&mut self) {
        if let Some(task) = self.preview_task.take() {
            task.abort();
        }
    }

    fn cancel_selection(&mut self) -> SelectionOutcome {
        self.abort_preview();
        self.machine.cancel()
    }

    /// Slots on `date` can only be classified when the view shows the day and
    /// the applied snapshot was fetched for it.
    fn covers(&self, date: NaiveDate) -> bool {
        let (first, last) = visible_days(self.view, self.date);
        let visible = first <= date && date <= last;
        let loaded = matches!(self.loaded_days, Some((from, to)) if from <= date && date <= to);
        visible && loaded && self.snapshot.is_some()
    }
}

pub struct CalendarController {
    business_id: String,
    tz: Tz,
    debounce: Duration,
    services: Collaborators,
    state: Arc<Mutex<ControllerState>>,
}

impl CalendarController {
    pub fn new(business_id: &str, tz: Tz, services: Collaborators, debounce: Duration) -> Self {
        let today = to_business_local_date(services.clock.now(), tz);
        Self {
            business_id: business_id.to_string(),
            tz,
            debounce,
            services,
            state: Arc::new(Mutex::new(ControllerState {
                view: ViewKind::Day,
                date: today,
                machine: SelectionMachine::new(InteractionMode::Blocking),
                gestures: GestureTracker::default(),
                snapshot: None,
                loaded_days: None,
                loading: false,
                generation: 0,
                last_error: None,
                preview_task: None,
                torn_down: false,
            })),
        }
    }

    pub async fn current(&self) -> (ViewKind, NaiveDate) {
        let state = self.state.lock().await;
        (state.view, state.date)
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.loading
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.lock().await.last_error.clone()
    }

    pub async fn selection(&self) -> SelectionState {
        self.state.lock().await.machine.state()
    }

    pub async fn snapshot(&self) -> Option<CalendarSnapshot> {
        self.state.lock().await.snapshot.clone()
    }

    /// Re-fetches the visible range. Results of superseded fetches are dropped.
    pub async fn refresh(&self) -> Result<FetchOutcome, AppError> {
        let (generation, view, date) = {
            let mut state = self.state.lock().await;
            if state.torn_down {
                return Ok(FetchOutcome::Discarded);
            }
            state.generation += 1;
            state.loading = true;
            (state.generation, state.view, state.date)
        };

        let (from, to) = query_range(view, date, self.tz);
        info!(business_id = %self.business_id, %view, %date, generation, "fetching calendar range");
        let result = load_snapshot(&self.services, &self.business_id, from, to).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!(generation, current = state.generation, "discarding stale calendar fetch");
            return Ok(FetchOutcome::Discarded);
        }
        state.loading = false;

        match result {
            Ok(snapshot) => {
                state.snapshot = Some(snapshot);
                state.loaded_days = Some(visible_days(view, date));
                state.last_error = None;
                Ok(FetchOutcome::Applied)
            }
            Err(e) => {
                error!("Calendar fetch failed: {}", e);
                state.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Switches view; a selection in progress is cancelled, never carried over.
    pub async fn set_view(&self, view: ViewKind) -> Result<FetchOutcome, AppError> {
        {
            let mut state = self.state.lock().await;
            if state.cancel_selection() == SelectionOutcome::Cancelled {
                info!("Selection cancelled by view change");
            }
            state.view = view;
        }
        self.refresh().await
    }

    pub async fn set_date(&self, date: NaiveDate) -> Result<FetchOutcome, AppError> {
        {
            let mut state = self.state.lock().await;
            if state.cancel_selection() == SelectionOutcome::Cancelled {
                info!("Selection cancelled by date change");
            }
            state.date = date;
        }
        self.refresh().await
    }

    /// Month cell click.
    pub async fn open_day(&self, date: NaiveDate) -> Result<FetchOutcome, AppError> {
        {
            let mut state = self.state.lock().await;
            state.cancel_selection();
            state.view = ViewKind::Day;
            state.date = date;
        }
        self.refresh().await
    }

    pub async fn set_mode(&self, mode: InteractionMode) -> SelectionOutcome {
        let mut state = self.state.lock().await;
        state.abort_preview();
        state.machine.set_mode(mode)
    }

    /// Renders the active view as JSON from the last applied snapshot.
    pub async fn view_json(&self) -> Option<Value> {
        let state = self.state.lock().await;
        let snapshot = state.snapshot.as_ref()?;
        let now = self.services.clock.now();
        let view = build_view(state.view, state.date, &snapshot.view_input(self.tz, now));
        serde_json::to_value(&view).ok()
    }

    /// Runs `f` against the active view built from the last applied snapshot.
    pub async fn with_view<R>(&self, f: impl FnOnce(Option<&CalendarView<'_>>) -> R) -> R {
        let state = self.state.lock().await;
        let now = self.services.clock.now();
        match state.snapshot.as_ref() {
            Some(snapshot) => {
                let view = build_view(state.view, state.date, &snapshot.view_input(self.tz, now));
                f(Some(&view))
            }
            None => f(None),
        }
    }

    /// Press, release and cancel are applied immediately and flush any pending preview.
    pub async fn pointer(&self, event: SelectionEvent, date: NaiveDate) -> SelectionOutcome {
        let now = self.services.clock.now();
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.abort_preview();

        if event != SelectionEvent::Cancel && !state.covers(date) {
            debug!(%date, "pointer event on a day without loaded data ignored");
            return SelectionOutcome::Ignored;
        }
        let slots = state.snapshot.as_ref()
            .map(|s| s.day_slots(date, self.tz, now))
            .unwrap_or_default();
        let outcome = state.machine.handle(event, date, &slots);
        match &outcome {
            SelectionOutcome::Confirmed(range) => {
                info!(%date, start = range.start_index, end = range.end_index, "slot range confirmed");
            }
            SelectionOutcome::BookingRequested { label, .. } => {
                info!(%date, %label, "booking dialog requested");
            }
            _ => {}
        }
        outcome
    }

    /// Hover / pointer move over a slot. Coalesced: only the last move within the
    /// debounce window is applied.
    pub async fn hover(&self, index: usize, date: NaiveDate) {
        let mut state = self.state.lock().await;
        state.abort_preview();
        if !state.machine.is_selecting() || state.torn_down || !state.covers(date) {
            return;
        }

        let shared = Arc::clone(&self.state);
        let clock = Arc::clone(&self.services.clock);
        let tz = self.tz;
        let delay = self.debounce;
        state.preview_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let now = clock.now();
            let mut guard = shared.lock().await;
            let state = &mut *guard;
            state.preview_task = None;
            if !state.covers(date) {
                return;
            }
            let slots = state.snapshot.as_ref()
                .map(|s| s.day_slots(date, tz, now))
                .unwrap_or_default();
            state.machine.handle(SelectionEvent::Move(index), date, &slots);
        }));
    }

    pub async fn touch_start(&self, x: f32, y: f32) {
        self.state.lock().await.gestures.touch_start(x, y);
    }

    /// Touch move over a slot; scroll gestures never reach the selection machine.
    pub async fn touch_move(&self, x: f32, y: f32, index: usize, date: NaiveDate) -> TouchIntent {
        let intent = {
            let state = self.state.lock().await;
            state.gestures.classify(x, y, state.machine.is_selecting())
        };
        if intent == TouchIntent::Select {
            self.hover(index, date).await;
        }
        intent
    }

    pub async fn touch_end(&self, index: Option<usize>, date: NaiveDate) -> SelectionOutcome {
        self.state.lock().await.gestures.touch_end();
        self.pointer(SelectionEvent::Release(index), date).await
    }

    pub async fn impact_of(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> ImpactPreview {
        let state = self.state.lock().await;
        state.snapshot.as_ref()
            .map(|s| impact_preview(start, end, &s.appointments))
            .unwrap_or_default()
    }

    /// Validates and submits a closure. Any failure leaves the selection idle;
    /// conflict and transport failures also re-fetch the visible range.
    pub async fn submit_closure(&self, draft: &ClosureDraft) -> Result<Closure, AppError> {
        {
            let mut state = self.state.lock().await;
            state.cancel_selection();
        }

        let closure = validate_draft(draft, self.services.clock.now(), self.tz)?;
        match self.services.closures.create_closure(&closure).await {
            Ok(created) => {
                info!(closure_id = %created.id, "Closure created");
                self.refresh_quietly().await;
                Ok(created)
            }
            Err(e) => {
                warn!("Closure submission failed: {}", e);
                self.recover_from(&e).await;
                Err(e)
            }
        }
    }

    pub async fn delete_closure(&self, id: &str) -> Result<(), AppError> {
        match self.services.closures.delete_closure(id).await {
            Ok(()) => {
                info!(closure_id = %id, "Closure deleted");
                self.refresh_quietly().await;
                Ok(())
            }
            Err(e) => {
                self.recover_from(&e).await;
                Err(e)
            }
        }
    }

    pub async fn update_appointment_status(&self, id: &str, status: AppointmentStatus) -> Result<(), AppError> {
        match self.services.appointments.update_appointment_status(id, status).await {
            Ok(()) => {
                info!(appointment_id = %id, %status, "Appointment status updated");
                self.refresh_quietly().await;
                Ok(())
            }
            Err(e) => {
                self.recover_from(&e).await;
                Err(e)
            }
        }
    }

    /// Stops the instance: pending previews are aborted and in-flight fetches ignored.
    pub async fn teardown(&self) {
        let mut state = self.state.lock().await;
        state.cancel_selection();
        state.torn_down = true;
        state.generation += 1;
        state.loading = false;
        info!(business_id = %self.business_id, "Calendar view torn down");
    }

    async fn recover_from(&self, e: &AppError) {
        self.state.lock().await.cancel_selection();
        if e.requires_refetch() {
            self.refresh_quietly().await;
        }
        // Recorded after the re-fetch so a successful reload does not clear it.
        self.state.lock().await.last_error = Some(e.to_string());
    }

    async fn refresh_quietly(&self) {
        if let Err(e) = self.refresh().await {
            warn!("Re-fetch after mutation failed: {}", e);
        }
    }
}
