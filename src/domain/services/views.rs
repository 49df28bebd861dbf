//! Day, week and month projections of the same appointment/closure data.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use crate::domain::models::appointment::{Appointment, AppointmentStatus};
use crate::domain::models::business_hours::{hhmm, BusinessHours};
use crate::domain::services::availability::{classify_day, ClassifiedSlot, ResolverContext, SlotStatus};
use crate::domain::services::closure_overlap::overlaps_day;
use crate::domain::services::slots::generate_slots_in;
use crate::domain::services::timezone::{day_bounds, range_bounds, to_business_local_date};

pub const SLOT_HEIGHT_PX: u32 = 40;
pub const MONTH_ROWS: usize = 6;
pub const MONTH_CELL_SUMMARIES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    #[default]
    Day,
    Week,
    Month,
}

impl FromStr for ViewKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "day" => Ok(ViewKind::Day),
            "week" => Ok(ViewKind::Week),
            "month" => Ok(ViewKind::Month),
            other => Err(format!("Unknown calendar view '{}'", other)),
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViewKind::Day => "day",
            ViewKind::Week => "week",
            ViewKind::Month => "month",
        };
        f.write_str(name)
    }
}

/// Inputs shared by every view.
#[derive(Debug, Clone, Copy)]
pub struct ViewInput<'a> {
    pub ctx: ResolverContext<'a>,
    pub hours: Option<&'a BusinessHours>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentBlock<'a> {
    pub appointment: &'a Appointment,
    pub slot_index: usize,
    pub span_slots: u32,
    pub top_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayView<'a> {
    pub date: NaiveDate,
    pub is_closed: bool,
    pub slots: Vec<ClassifiedSlot<'a>>,
    pub blocks: Vec<AppointmentBlock<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompactBlock {
    pub appointment_id: String,
    #[serde(with = "hhmm")]
    pub label: NaiveTime,
    pub slot_index: usize,
    pub span_slots: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekColumn<'a> {
    pub date: NaiveDate,
    pub is_closed: bool,
    pub slots: Vec<ClassifiedSlot<'a>>,
    pub blocks: Vec<CompactBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekView<'a> {
    pub week_start: NaiveDate,
    pub days: Vec<WeekColumn<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentSummary {
    pub appointment_id: String,
    #[serde(with = "hhmm")]
    pub start_label: NaiveTime,
    pub customer_name: String,
    pub service_name: String,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCell {
    pub date: NaiveDate,
    pub in_current_month: bool,
    pub is_today: bool,
    pub has_closure: bool,
    pub summaries: Vec<AppointmentSummary>,
    pub overflow: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthView {
    pub month_start: NaiveDate,
    pub weeks: Vec<Vec<MonthCell>>,
}

impl MonthView {
    /// Clicking a cell opens the day view for that date.
    pub fn drill_down(date: NaiveDate) -> (ViewKind, NaiveDate) {
        (ViewKind::Day, date)
    }

    pub fn cells(&self) -> impl Iterator<Item = &MonthCell> {
        self.weeks.iter().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum CalendarView<'a> {
    Day(DayView<'a>),
    Week(WeekView<'a>),
    Month(MonthView),
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(date.weekday().num_days_from_monday() as u64)
}

/// First cell of the six-week grid for the month containing `date`.
pub fn month_grid_start(date: NaiveDate) -> NaiveDate {
    week_start(date.with_day(1).unwrap_or(date))
}

/// Business-local days a view displays, inclusive.
pub fn visible_days(kind: ViewKind, date: NaiveDate) -> (NaiveDate, NaiveDate) {
    match kind {
        ViewKind::Day => (date, date),
        ViewKind::Week => {
            let start = week_start(date);
            (start, start + Days::new(6))
        }
        ViewKind::Month => {
            let start = month_grid_start(date);
            (start, start + Days::new((MONTH_ROWS * 7 - 1) as u64))
        }
    }
}

/// UTC range `[from, to)` to fetch for a view anchored on `date`.
pub fn query_range(kind: ViewKind, date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let (first, last) = visible_days(kind, date);
    if first == last {
        day_bounds(first, tz)
    } else {
        range_bounds(first, last, tz)
    }
}

fn classified_day<'a>(date: NaiveDate, input: &ViewInput<'a>) -> Vec<ClassifiedSlot<'a>> {
    let labels = generate_slots_in(date, input.hours, input.ctx.tz);
    classify_day(date, &labels, &input.ctx)
}

pub fn day_view<'a>(date: NaiveDate, input: &ViewInput<'a>) -> DayView<'a> {
    let slots = classified_day(date, input);
    let blocks = slots.iter()
        .enumerate()
        .filter_map(|(index, slot)| match slot.status {
            SlotStatus::AppointmentStart { appointment, span_slots } => Some(AppointmentBlock {
                appointment,
                slot_index: index,
                span_slots,
                top_px: index as u32 * SLOT_HEIGHT_PX,
                height_px: span_slots * SLOT_HEIGHT_PX,
            }),
            _ => None,
        })
        .collect();

    DayView { date, is_closed: slots.is_empty(), slots, blocks }
}

pub fn week_view<'a>(date: NaiveDate, input: &ViewInput<'a>) -> WeekView<'a> {
    let start = week_start(date);
    let days = start.iter_days()
        .take(7)
        .map(|day| {
            let slots = classified_day(day, input);
            let blocks = slots.iter()
                .enumerate()
                .filter_map(|(index, slot)| match slot.status {
                    SlotStatus::AppointmentStart { appointment, span_slots } => Some(CompactBlock {
                        appointment_id: appointment.id.clone(),
                        label: slot.label,
                        slot_index: index,
                        span_slots,
                    }),
                    _ => None,
                })
                .collect();
            WeekColumn { date: day, is_closed: slots.is_empty(), slots, blocks }
        })
        .collect();

    WeekView { week_start: start, days }
}

pub fn month_view(date: NaiveDate, input: &ViewInput<'_>) -> MonthView {
    let tz = input.ctx.tz;
    let month_start = date.with_day(1).unwrap_or(date);
    let today = to_business_local_date(input.ctx.now, tz);

    let mut by_day: BTreeMap<NaiveDate, Vec<&Appointment>> = BTreeMap::new();
    for appointment in input.ctx.appointments.iter().filter(|a| a.occupies_slot()) {
        by_day.entry(to_business_local_date(appointment.start, tz)).or_default().push(appointment);
    }
    for list in by_day.values_mut() {
        list.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
    }

    let cells: Vec<MonthCell> = month_grid_start(date).iter_days()
        .take(MONTH_ROWS * 7)
        .map(|day| {
            let appointments = by_day.get(&day).map(Vec::as_slice).unwrap_or(&[]);
            let summaries = appointments.iter()
                .take(MONTH_CELL_SUMMARIES)
                .map(|a| AppointmentSummary {
                    appointment_id: a.id.clone(),
                    start_label: a.start.with_timezone(&tz).time(),
                    customer_name: a.customer.name.clone(),
                    service_name: a.service.name.clone(),
                    status: a.status,
                })
                .collect();

            MonthCell {
                date: day,
                in_current_month: day.month() == month_start.month() && day.year() == month_start.year(),
                is_today: day == today,
                has_closure: input.ctx.closures.iter().any(|c| overlaps_day(c, day, tz)),
                summaries,
                overflow: appointments.len().saturating_sub(MONTH_CELL_SUMMARIES),
            }
        })
        .collect();

    MonthView {
        month_start,
        weeks: cells.chunks(7).map(|w| w.to_vec()).collect(),
    }
}

pub fn build_view<'a>(kind: ViewKind, date: NaiveDate, input: &ViewInput<'a>) -> CalendarView<'a> {
    match kind {
        ViewKind::Day => CalendarView::Day(day_view(date, input)),
        ViewKind::Week => CalendarView::Week(week_view(date, input)),
        ViewKind::Month => CalendarView::Month(month_view(date, input)),
    }
}
