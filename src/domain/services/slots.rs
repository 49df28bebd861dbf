use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use chrono_tz::Tz;
use crate::domain::models::business_hours::{BusinessHours, DaySchedule};
use crate::domain::services::timezone::to_utc_instant;

/// Fixed slot width in minutes.
pub const SLOT_MINUTES: u32 = 15;

const TOTAL_MINUTES: u32 = 1440;
const FALLBACK_OPEN_MIN: u32 = 8 * 60;
const FALLBACK_CLOSE_MIN: u32 = 22 * 60;

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn close_minute(time: NaiveTime) -> u32 {
    let idx = minute_of_day(time);
    // "23:59" is how schedules spell end of day.
    if idx == TOTAL_MINUTES - 1 { TOTAL_MINUTES } else { idx }
}

fn time_at(minute: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(minute / 60, minute % 60, 0)
}

fn labels_for(schedule: &DaySchedule) -> Vec<NaiveTime> {
    if !schedule.is_open {
        return Vec::new();
    }

    let open = minute_of_day(schedule.open);
    let close = close_minute(schedule.close);
    let breaks: Vec<(u32, u32)> = schedule.breaks.iter()
        .map(|b| (minute_of_day(b.start), close_minute(b.end)))
        .collect();

    let mut labels = Vec::new();
    let mut cursor = open;
    while cursor < close {
        let slot_end = cursor + SLOT_MINUTES;
        let in_break = breaks.iter().any(|&(bs, be)| cursor < be && bs < slot_end);
        if !in_break {
            if let Some(time) = time_at(cursor) {
                labels.push(time);
            }
        }
        cursor += SLOT_MINUTES;
    }
    labels
}

/// Ordered slot labels for `date`.
///
/// A closed weekday, or a weekday missing from `hours`, yields no slots. When no
/// business-hours data exists at all the calendar falls back to 08:00-22:00.
pub fn generate_slots(date: NaiveDate, hours: Option<&BusinessHours>) -> Vec<NaiveTime> {
    match hours {
        Some(hours) => match hours.for_weekday(date.weekday()) {
            Some(schedule) => labels_for(schedule),
            None => Vec::new(),
        },
        None => (FALLBACK_OPEN_MIN..FALLBACK_CLOSE_MIN)
            .step_by(SLOT_MINUTES as usize)
            .filter_map(time_at)
            .collect(),
    }
}

/// Like [`generate_slots`], dropping labels that do not exist on `date` in `tz`.
pub fn generate_slots_in(date: NaiveDate, hours: Option<&BusinessHours>, tz: Tz) -> Vec<NaiveTime> {
    generate_slots(date, hours)
        .into_iter()
        .filter(|label| to_utc_instant(date, *label, tz).is_some())
        .collect()
}
