//! Wire records of the booking API and their conversion into domain types.
//!
//! Payloads are loosely typed (string enums, optional fields, `_id` vs `id`).
//! They are parsed once here; nothing past this module looks at raw fields.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::models::appointment::{Appointment, AppointmentPage, AppointmentStatus, PartyRef};
use crate::domain::models::business_hours::BusinessHours;
use crate::domain::models::closure::{
    Closure, ClosureType, Frequency, NewClosure, NotificationChannel, NotificationSettings,
    RecurringPattern, Recipients,
};
use crate::domain::services::closure_overlap::MAX_RECURRENCE_INTERVAL;
use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
#[error("malformed {kind} record {id}: {reason}")]
pub struct RecordError {
    pub kind: &'static str,
    pub id: String,
    pub reason: String,
}

impl RecordError {
    fn new(kind: &'static str, id: &str, reason: impl Into<String>) -> Self {
        Self { kind, id: id.to_string(), reason: reason.into() }
    }
}

fn parse_instant(kind: &'static str, id: &str, field: &str, raw: &str) -> Result<DateTime<Utc>, RecordError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| RecordError::new(kind, id, format!("{} '{}' is not an RFC 3339 instant", field, raw)))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyRecord {
    #[serde(alias = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl From<PartyRecord> for PartyRef {
    fn from(r: PartyRecord) -> Self {
        PartyRef { id: r.id, name: r.name }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRecord {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(alias = "startTime")]
    pub start: String,
    #[serde(alias = "endTime", default)]
    pub end: Option<String>,
    #[serde(alias = "duration", default)]
    pub duration_minutes: Option<u32>,
    pub status: String,
    #[serde(default)]
    pub service: Option<PartyRecord>,
    #[serde(default)]
    pub customer: Option<PartyRecord>,
    #[serde(default)]
    pub price: Option<f64>,
}

impl TryFrom<AppointmentRecord> for Appointment {
    type Error = RecordError;

    fn try_from(r: AppointmentRecord) -> Result<Self, Self::Error> {
        const KIND: &str = "appointment";
        let start = parse_instant(KIND, &r.id, "start", &r.start)?;
        let end = match &r.end {
            Some(raw) => Some(parse_instant(KIND, &r.id, "end", raw)?),
            None => None,
        };
        let duration_minutes = r.duration_minutes.unwrap_or(0);
        let end = match end {
            Some(end) => end,
            None if duration_minutes > 0 => start + chrono::Duration::minutes(duration_minutes as i64),
            None => return Err(RecordError::new(KIND, &r.id, "neither end nor duration present")),
        };
        if end < start {
            return Err(RecordError::new(KIND, &r.id, "end precedes start"));
        }
        let status: AppointmentStatus = r.status.parse().map_err(|e: String| RecordError::new(KIND, &r.id, e))?;

        let unnamed = || PartyRef { id: String::new(), name: String::new() };
        Ok(Appointment {
            id: r.id,
            start,
            end,
            duration_minutes,
            status,
            service: r.service.map(PartyRef::from).unwrap_or_else(unnamed),
            customer: r.customer.map(PartyRef::from).unwrap_or_else(unnamed),
            price: r.price.unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPageRecord {
    #[serde(default)]
    pub appointments: Vec<AppointmentRecord>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "first_page")]
    pub total_pages: u32,
}

fn first_page() -> u32 {
    1
}

impl AppointmentPageRecord {
    /// Converts the page, dropping malformed records through `on_error`.
    pub fn into_page(self, mut on_error: impl FnMut(RecordError)) -> AppointmentPage {
        let appointments = self.appointments
            .into_iter()
            .filter_map(|r| Appointment::try_from(r).map_err(&mut on_error).ok())
            .collect();
        AppointmentPage {
            appointments,
            total: self.total,
            page: self.page,
            total_pages: self.total_pages,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringRecord {
    pub frequency: String,
    #[serde(default)]
    pub interval: Option<u32>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub recipients: Option<String>,
    #[serde(default)]
    pub customer_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureRecord {
    #[serde(alias = "_id")]
    pub id: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(rename = "type", default)]
    pub closure_type: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub recurring: Option<RecurringRecord>,
    #[serde(alias = "notifications", default)]
    pub notification: Option<NotificationRecord>,
}

fn parse_channel(raw: &str) -> Option<NotificationChannel> {
    match raw.trim().to_lowercase().as_str() {
        "email" => Some(NotificationChannel::Email),
        "sms" => Some(NotificationChannel::Sms),
        "push" => Some(NotificationChannel::Push),
        _ => None,
    }
}

impl TryFrom<ClosureRecord> for Closure {
    type Error = RecordError;

    fn try_from(r: ClosureRecord) -> Result<Self, Self::Error> {
        const KIND: &str = "closure";
        let start_date = parse_instant(KIND, &r.id, "startDate", &r.start_date)?;
        let end_date = parse_instant(KIND, &r.id, "endDate", &r.end_date)?;
        if end_date < start_date {
            return Err(RecordError::new(KIND, &r.id, "endDate precedes startDate"));
        }

        let closure_type = match r.closure_type.as_deref() {
            Some(raw) => raw.parse().map_err(|e: String| RecordError::new(KIND, &r.id, e))?,
            None => ClosureType::Other,
        };

        let recurring = match r.recurring {
            Some(rec) => {
                let frequency: Frequency = rec.frequency.parse().map_err(|e: String| RecordError::new(KIND, &r.id, e))?;
                Some(RecurringPattern {
                    frequency,
                    interval: match rec.interval.unwrap_or(1).max(1) {
                        n if n > MAX_RECURRENCE_INTERVAL => {
                            return Err(RecordError::new(KIND, &r.id, format!("recurrence interval {} is out of range", n)));
                        }
                        n => n,
                    },
                    end_date: rec.end_date.as_deref().and_then(parse_date),
                })
            }
            None => None,
        };

        let notification = r.notification.map(|n| NotificationSettings {
            channels: n.channels.iter().filter_map(|c| parse_channel(c)).collect(),
            message: n.message.unwrap_or_default(),
            recipients: match n.recipients.as_deref() {
                Some("all") => Recipients::All,
                Some("custom") => Recipients::Custom(n.customer_ids),
                _ => Recipients::Upcoming,
            },
        });

        Ok(Closure {
            id: r.id,
            start_date,
            end_date,
            reason: r.reason.unwrap_or_default(),
            closure_type,
            is_active: r.is_active.unwrap_or(true),
            recurring,
            notification,
        })
    }
}

/// Outbound body for closure creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosurePayload {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub reason: String,
    #[serde(rename = "type")]
    pub closure_type: &'static str,
    pub notify_customers: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring: Option<RecurringPayload>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub channels: Vec<NotificationChannel>,
    pub message: String,
    pub recipients: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub customer_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringPayload {
    pub frequency: Frequency,
    pub interval: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl From<&NewClosure> for ClosurePayload {
    fn from(c: &NewClosure) -> Self {
        Self {
            start_date: c.start_date,
            end_date: c.end_date,
            reason: c.reason.clone(),
            closure_type: c.closure_type.as_str(),
            notify_customers: c.notification.is_some(),
            notification: c.notification.as_ref().map(|n| {
                let (recipients, customer_ids) = match &n.recipients {
                    Recipients::All => ("all", Vec::new()),
                    Recipients::Upcoming => ("upcoming", Vec::new()),
                    Recipients::Custom(ids) => ("custom", ids.clone()),
                };
                NotificationPayload {
                    channels: n.channels.clone(),
                    message: n.message.clone(),
                    recipients,
                    customer_ids,
                }
            }),
            recurring: c.recurring.as_ref().map(|r| RecurringPayload {
                frequency: r.frequency,
                interval: r.interval,
                end_date: r.end_date,
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProfileRecord {
    #[serde(default)]
    pub business_hours: Option<BusinessHoursRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    #[serde(default = "default_open")]
    pub is_open: bool,
    #[serde(alias = "openTime")]
    pub open: Option<String>,
    #[serde(alias = "closeTime")]
    pub close: Option<String>,
    #[serde(default)]
    pub breaks: Vec<BreakRecord>,
}

fn default_open() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct BreakRecord {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BusinessHoursRecord {
    pub monday: Option<DayRecord>,
    pub tuesday: Option<DayRecord>,
    pub wednesday: Option<DayRecord>,
    pub thursday: Option<DayRecord>,
    pub friday: Option<DayRecord>,
    pub saturday: Option<DayRecord>,
    pub sunday: Option<DayRecord>,
}

impl TryFrom<BusinessHoursRecord> for BusinessHours {
    type Error = RecordError;

    fn try_from(r: BusinessHoursRecord) -> Result<Self, Self::Error> {
        use crate::domain::models::business_hours::{BreakWindow, DaySchedule};
        use crate::domain::services::timezone::parse_label;
        use chrono::Weekday;

        let day = |name: &str, record: Option<DayRecord>| -> Result<Option<DaySchedule>, RecordError> {
            let Some(record) = record else { return Ok(None) };
            if !record.is_open {
                return Ok(Some(DaySchedule::closed()));
            }
            let time = |raw: Option<&str>, field: &str| {
                raw.and_then(parse_label)
                    .ok_or_else(|| RecordError::new("business hours", name, format!("invalid {} time", field)))
            };
            let mut schedule = DaySchedule::open(time(record.open.as_deref(), "open")?, time(record.close.as_deref(), "close")?);
            for b in &record.breaks {
                schedule.breaks.push(BreakWindow {
                    start: time(Some(b.start.as_str()), "break start")?,
                    end: time(Some(b.end.as_str()), "break end")?,
                });
            }
            Ok(Some(schedule))
        };

        let mut hours = BusinessHours::default();
        hours.set(Weekday::Mon, day("monday", r.monday)?);
        hours.set(Weekday::Tue, day("tuesday", r.tuesday)?);
        hours.set(Weekday::Wed, day("wednesday", r.wednesday)?);
        hours.set(Weekday::Thu, day("thursday", r.thursday)?);
        hours.set(Weekday::Fri, day("friday", r.friday)?);
        hours.set(Weekday::Sat, day("saturday", r.saturday)?);
        hours.set(Weekday::Sun, day("sunday", r.sunday)?);
        hours.validate().map_err(|e| match e {
            AppError::InvalidForm(fields) => RecordError::new("business hours", "profile", fields.to_string()),
            other => RecordError::new("business hours", "profile", other.to_string()),
        })?;
        Ok(hours)
    }
}
