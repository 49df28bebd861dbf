use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClosureType {
    Vacation,
    Maintenance,
    Emergency,
    Holiday,
    #[serde(alias = "staff_shortage")]
    StaffShortage,
    Other,
}

impl ClosureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClosureType::Vacation => "vacation",
            ClosureType::Maintenance => "maintenance",
            ClosureType::Emergency => "emergency",
            ClosureType::Holiday => "holiday",
            ClosureType::StaffShortage => "staff-shortage",
            ClosureType::Other => "other",
        }
    }
}

impl FromStr for ClosureType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().replace('_', "-").as_str() {
            "vacation" => Ok(ClosureType::Vacation),
            "maintenance" => Ok(ClosureType::Maintenance),
            "emergency" => Ok(ClosureType::Emergency),
            "holiday" => Ok(ClosureType::Holiday),
            "staff-shortage" => Ok(ClosureType::StaffShortage),
            "other" => Ok(ClosureType::Other),
            other => Err(format!("Unknown closure type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(format!("Unknown recurrence frequency '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringPattern {
    pub frequency: Frequency,
    pub interval: u32,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Email,
    Sms,
    Push,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "customer_ids", rename_all = "lowercase")]
pub enum Recipients {
    All,
    Upcoming,
    Custom(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub channels: Vec<NotificationChannel>,
    pub message: String,
    pub recipients: Recipients,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Closure {
    pub id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub reason: String,
    #[serde(rename = "type")]
    pub closure_type: ClosureType,
    pub is_active: bool,
    pub recurring: Option<RecurringPattern>,
    pub notification: Option<NotificationSettings>,
}

/// A validated closure ready to be sent to the closure service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClosure {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub reason: String,
    #[serde(rename = "type")]
    pub closure_type: ClosureType,
    pub recurring: Option<RecurringPattern>,
    pub notification: Option<NotificationSettings>,
}

impl NewClosure {
    pub fn into_closure(self, id: String) -> Closure {
        Closure {
            id,
            start_date: self.start_date,
            end_date: self.end_date,
            reason: self.reason,
            closure_type: self.closure_type,
            is_active: true,
            recurring: self.recurring,
            notification: self.notification,
        }
    }
}
