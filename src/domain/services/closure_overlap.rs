//! Closure geometry: which instants, slots and days a closure blocks, what a
//! proposed closure would affect, and validation of the creation form.

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use crate::domain::models::appointment::Appointment;
use crate::domain::models::closure::{
    Closure, ClosureType, Frequency, NewClosure, NotificationChannel, NotificationSettings,
    RecurringPattern, Recipients,
};
use crate::domain::services::selection::SelectedRange;
use crate::domain::services::timezone::{
    day_bounds, local_naive_to_utc, to_business_local_date, to_local_naive, to_utc_instant,
};
use crate::error::{AppError, FieldErrors};

const MAX_OCCURRENCES: usize = 100_000;

/// Largest recurrence interval accepted from the form or the closure service.
pub const MAX_RECURRENCE_INTERVAL: u32 = 1_000;

/// One concrete `[start, end)` interval of a (possibly recurring) closure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Occurrence<'a> {
    pub closure: &'a Closure,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Occurrence<'_> {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

fn advance(local: NaiveDateTime, frequency: Frequency, steps: u32) -> Option<NaiveDateTime> {
    match frequency {
        Frequency::Daily => local.checked_add_signed(Duration::days(steps as i64)),
        Frequency::Weekly => local.checked_add_signed(Duration::days(7 * steps as i64)),
        Frequency::Monthly => local.checked_add_months(Months::new(steps)),
        Frequency::Yearly => local.checked_add_months(Months::new(steps.checked_mul(12)?)),
    }
}

fn to_utc_lenient(local: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    // An occurrence starting inside a DST gap begins at the first existing minute.
    local_naive_to_utc(local, tz).or_else(|| local_naive_to_utc(local + Duration::hours(1), tz))
}

/// Occurrences of `closure` intersecting `[from, to)`, regardless of `is_active`.
///
/// Recurrence is expanded in business-local wall-clock time so a weekly closure
/// keeps its local start across DST changes.
pub fn occurrences(closure: &Closure, tz: Tz, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Occurrence<'_>> {
    let duration = closure.end_date - closure.start_date;
    // A zero-length closure contains no instant.
    if duration <= Duration::zero() {
        return Vec::new();
    }
    let Some(pattern) = &closure.recurring else {
        if closure.start_date < to && from < closure.end_date {
            return vec![Occurrence { closure, start: closure.start_date, end: closure.end_date }];
        }
        return Vec::new();
    };

    let interval = pattern.interval.max(1);
    let local_start = to_local_naive(closure.start_date, tz);

    // Day-based patterns can jump straight to the window instead of walking from the first occurrence.
    let mut step: u32 = match pattern.frequency {
        Frequency::Daily | Frequency::Weekly => {
            let days_per_step: i64 = if pattern.frequency == Frequency::Daily { 1 } else { 7 };
            let unit_days = days_per_step * interval as i64;
            let lead = to_local_naive(from, tz) - local_start - duration;
            let skipped = lead.num_days() / unit_days - 1;
            skipped.max(0) as u32
        }
        Frequency::Monthly | Frequency::Yearly => 0,
    };

    let mut found = Vec::new();
    for _ in 0..MAX_OCCURRENCES {
        let Some(steps) = step.checked_mul(interval) else { break };
        let Some(local) = advance(local_start, pattern.frequency, steps) else { break };
        if let Some(end_date) = pattern.end_date {
            if local.date() > end_date {
                break;
            }
        }
        if let Some(start) = to_utc_lenient(local, tz) {
            if start >= to {
                break;
            }
            let end = start + duration;
            if from < end {
                found.push(Occurrence { closure, start, end });
            }
        }
        let Some(next) = step.checked_add(1) else { break };
        step = next;
    }
    found
}

/// Occurrences of every active closure intersecting `[from, to)`, ordered by start.
pub fn active_occurrences(closures: &[Closure], tz: Tz, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Occurrence<'_>> {
    let mut all: Vec<Occurrence<'_>> = closures.iter()
        .filter(|c| c.is_active)
        .flat_map(|c| occurrences(c, tz, from, to))
        .collect();
    all.sort_by_key(|o| o.start);
    all
}

/// True when `closure` is active and one of its occurrences contains `instant`.
pub fn closure_blocks(closure: &Closure, instant: DateTime<Utc>, tz: Tz) -> bool {
    closure.is_active
        && occurrences(closure, tz, instant, instant + Duration::seconds(1))
            .iter()
            .any(|o| o.contains(instant))
}

/// Whether an active closure intersects the business-local `date`.
pub fn overlaps_day(closure: &Closure, date: NaiveDate, tz: Tz) -> bool {
    if !closure.is_active {
        return false;
    }
    let (start, end) = day_bounds(date, tz);
    !occurrences(closure, tz, start, end).is_empty()
}

/// Business-local days in `from..=to` that an active closure touches.
pub fn days_touched(closure: &Closure, tz: Tz, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    from.iter_days()
        .take_while(|d| *d <= to)
        .filter(|d| overlaps_day(closure, *d, tz))
        .collect()
}

/// Labels of `slots` on `date` whose instant the closure blocks.
pub fn blocked_slots(closure: &Closure, date: NaiveDate, slots: &[NaiveTime], tz: Tz) -> BTreeSet<NaiveTime> {
    if !closure.is_active {
        return BTreeSet::new();
    }
    let (day_start, day_end) = day_bounds(date, tz);
    let day_occurrences = occurrences(closure, tz, day_start, day_end);

    slots.iter()
        .copied()
        .filter(|label| {
            to_utc_instant(date, *label, tz)
                .map(|instant| day_occurrences.iter().any(|o| o.contains(instant)))
                .unwrap_or(false)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImpactPreview {
    pub affected_appointments: usize,
    pub affected_customers: usize,
}

/// Counts non-canceled appointments intersecting `[start, end)` and their distinct customers.
pub fn impact_preview(start: DateTime<Utc>, end: DateTime<Utc>, appointments: &[Appointment]) -> ImpactPreview {
    let affected: Vec<&Appointment> = appointments.iter()
        .filter(|a| a.occupies_slot() && a.overlaps(start, end))
        .collect();
    let customers: HashSet<&str> = affected.iter().map(|a| a.customer.id.as_str()).collect();

    ImpactPreview {
        affected_appointments: affected.len(),
        affected_customers: customers.len(),
    }
}

/// Closure creation form as typed by the owner, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureDraft {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reason: String,
    #[serde(rename = "type")]
    pub closure_type: ClosureType,
    #[serde(default)]
    pub notify_customers: bool,
    #[serde(default)]
    pub channels: Vec<NotificationChannel>,
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_recipients")]
    pub recipients: Recipients,
    #[serde(default)]
    pub recurring_enabled: bool,
    pub frequency: Option<Frequency>,
    pub interval: Option<u32>,
    pub recurrence_end: Option<NaiveDate>,
}

fn default_recipients() -> Recipients {
    Recipients::Upcoming
}

impl ClosureDraft {
    pub fn new(closure_type: ClosureType) -> Self {
        Self {
            start_date: None,
            end_date: None,
            reason: String::new(),
            closure_type,
            notify_customers: false,
            channels: Vec::new(),
            message: String::new(),
            recipients: default_recipients(),
            recurring_enabled: false,
            frequency: None,
            interval: None,
            recurrence_end: None,
        }
    }
}

/// Seeds a draft from a confirmed slot range.
pub fn draft_from_selection(range: &SelectedRange, closure_type: ClosureType, reason: &str) -> ClosureDraft {
    let mut draft = ClosureDraft::new(closure_type);
    draft.start_date = Some(range.start);
    draft.end_date = Some(range.end);
    draft.reason = reason.to_string();
    draft
}

/// Checks the draft field by field; nothing is defaulted silently.
pub fn validate_draft(draft: &ClosureDraft, now: DateTime<Utc>, tz: Tz) -> Result<NewClosure, AppError> {
    let mut errors = FieldErrors::new();

    match draft.start_date {
        None => errors.push("start_date", "Start date is required"),
        Some(start) if start < now => errors.push("start_date", "Start date cannot be in the past"),
        Some(_) => {}
    }
    match (draft.start_date, draft.end_date) {
        (_, None) => errors.push("end_date", "End date is required"),
        (Some(start), Some(end)) if end < start => errors.push("end_date", "End date must not be before start date"),
        _ => {}
    }

    let notification = if draft.notify_customers {
        if draft.channels.is_empty() {
            errors.push("channels", "Select at least one notification channel");
        }
        if draft.message.trim().is_empty() {
            errors.push("message", "Notification message is required");
        }
        if let Recipients::Custom(ids) = &draft.recipients {
            if ids.is_empty() {
                errors.push("recipients", "Select at least one customer");
            }
        }
        Some(NotificationSettings {
            channels: draft.channels.clone(),
            message: draft.message.trim().to_string(),
            recipients: draft.recipients.clone(),
        })
    } else {
        None
    };

    let recurring = if draft.recurring_enabled {
        if draft.frequency.is_none() {
            errors.push("frequency", "Recurrence frequency is required");
        }
        match draft.interval {
            Some(n) if n > MAX_RECURRENCE_INTERVAL => errors.push(
                "interval",
                format!("Recurrence interval must be at most {}", MAX_RECURRENCE_INTERVAL),
            ),
            Some(n) if n > 0 => {}
            _ => errors.push("interval", "Recurrence interval must be a positive number"),
        }
        if let (Some(until), Some(end)) = (draft.recurrence_end, draft.end_date) {
            if until <= to_business_local_date(end, tz) {
                errors.push("recurrence_end", "Recurrence end must be after the closure end date");
            }
        }
        match (draft.frequency, draft.interval) {
            (Some(frequency), Some(interval)) => Some(RecurringPattern {
                frequency,
                interval,
                end_date: draft.recurrence_end,
            }),
            _ => None,
        }
    } else {
        None
    };

    errors.into_result()?;

    match (draft.start_date, draft.end_date) {
        (Some(start_date), Some(end_date)) => Ok(NewClosure {
            start_date,
            end_date,
            reason: draft.reason.trim().to_string(),
            closure_type: draft.closure_type,
            recurring,
            notification,
        }),
        _ => Err(AppError::Internal),
    }
}
