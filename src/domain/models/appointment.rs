use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    #[serde(alias = "in_progress")]
    InProgress,
    Completed,
    #[serde(alias = "cancelled")]
    Canceled,
    #[serde(alias = "no_show")]
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::InProgress => "in-progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Canceled => "canceled",
            AppointmentStatus::NoShow => "no-show",
        }
    }

    /// Canceled appointments stay visible in lists but free their slots.
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Canceled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().replace('_', "-").as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "in-progress" => Ok(AppointmentStatus::InProgress),
            "completed" => Ok(AppointmentStatus::Completed),
            "canceled" | "cancelled" => Ok(AppointmentStatus::Canceled),
            "no-show" => Ok(AppointmentStatus::NoShow),
            other => Err(format!("Unknown appointment status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
    pub service: PartyRef,
    pub customer: PartyRef,
    pub price: f64,
}

impl Appointment {
    /// End of the occupied interval `[start, occupied_until)`.
    pub fn occupied_until(&self) -> DateTime<Utc> {
        if self.duration_minutes > 0 {
            self.start + Duration::minutes(self.duration_minutes as i64)
        } else {
            self.end
        }
    }

    pub fn occupied_minutes(&self) -> i64 {
        (self.occupied_until() - self.start).num_minutes().max(0)
    }

    pub fn occupies_slot(&self) -> bool {
        self.status.occupies_slot()
    }

    /// Half-open intersection with `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.occupied_until()
    }

    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.occupied_until()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentPage {
    pub appointments: Vec<Appointment>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentQuery {
    pub business_id: String,
    pub date_from: DateTime<Utc>,
    pub date_to: DateTime<Utc>,
    /// 1-based page number.
    pub page: u32,
}

impl AppointmentQuery {
    pub fn new(business_id: &str, date_from: DateTime<Utc>, date_to: DateTime<Utc>) -> Self {
        Self {
            business_id: business_id.to_string(),
            date_from,
            date_to,
            page: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn appointment(duration: u32) -> Appointment {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
        Appointment {
            id: "a1".into(),
            start,
            end: start + Duration::minutes(30),
            duration_minutes: duration,
            status: AppointmentStatus::Confirmed,
            service: PartyRef { id: "s1".into(), name: "Cut".into() },
            customer: PartyRef { id: "c1".into(), name: "Ada".into() },
            price: 25.0,
        }
    }

    #[test]
    fn test_occupied_interval_prefers_duration() {
        let a = appointment(50);
        assert_eq!(a.occupied_minutes(), 50);

        let fallback = appointment(0);
        assert_eq!(fallback.occupied_minutes(), 30);
    }

    #[test]
    fn test_covers_is_half_open() {
        let a = appointment(30);
        assert!(a.covers(a.start));
        assert!(a.covers(a.start + Duration::minutes(29)));
        assert!(!a.covers(a.start + Duration::minutes(30)));
    }

    #[test]
    fn test_status_parsing_accepts_variants() {
        assert_eq!("In_Progress".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::InProgress);
        assert_eq!("cancelled".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::Canceled);
        assert_eq!("no-show".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::NoShow);
        assert!("archived".parse::<AppointmentStatus>().is_err());
        assert!(!AppointmentStatus::Canceled.occupies_slot());
        assert!(AppointmentStatus::NoShow.occupies_slot());
    }
}
