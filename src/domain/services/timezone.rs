//! Conversions between business-local wall-clock time and UTC instants.
//!
//! Every other component goes through these functions; none of them reads the
//! host's local timezone. Ambiguous local times (autumn fall-back) resolve to the
//! earliest instant, local times inside a spring-forward gap do not exist.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

pub fn parse_timezone(name: &str) -> Tz {
    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            warn!("Unknown business timezone '{}', falling back to UTC", name);
            chrono_tz::UTC
        }
    }
}

/// Business-local calendar day of an instant.
pub fn to_business_local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

pub fn to_local_naive(instant: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}

pub fn local_naive_to_utc(local: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&local).earliest().map(|dt| dt.with_timezone(&Utc))
}

/// UTC instant of a wall-clock time on a business-local date.
pub fn to_utc_instant(date: NaiveDate, time: NaiveTime, tz: Tz) -> Option<DateTime<Utc>> {
    local_naive_to_utc(date.and_time(time), tz)
}

/// Half-open UTC bounds `[start, end)` of a business-local day.
pub fn day_bounds(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = start_of_day(date, tz);
    let end = date.succ_opt().map(|next| start_of_day(next, tz)).unwrap_or(start + Duration::days(1));
    (start, end)
}

/// Half-open UTC bounds covering the business-local days `from..=to`.
pub fn range_bounds(from: NaiveDate, to: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    (day_bounds(from, tz).0, day_bounds(to, tz).1)
}

fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    // Some zones skip midnight on DST days; the first existing minute starts the day.
    let mut probe = date.and_time(NaiveTime::MIN);
    for _ in 0..=120 {
        if let Some(instant) = local_naive_to_utc(probe, tz) {
            return instant;
        }
        probe += Duration::minutes(1);
    }
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

pub fn format_label(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

pub fn parse_label(label: &str) -> Option<NaiveTime> {
    let label = label.trim();
    NaiveTime::parse_from_str(label, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(label, "%H:%M:%S"))
        .ok()
}
