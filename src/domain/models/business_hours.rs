use crate::error::{AppError, FieldErrors};
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// `"HH:MM"` (de)serialization for wall-clock times.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S"))
            .map_err(|_| D::Error::custom(format!("invalid wall-clock time '{}', expected HH:MM", raw)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakWindow {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub is_open: bool,
    #[serde(with = "hhmm")]
    pub open: NaiveTime,
    #[serde(with = "hhmm")]
    pub close: NaiveTime,
    #[serde(default)]
    pub breaks: Vec<BreakWindow>,
}

impl DaySchedule {
    pub fn open(open: NaiveTime, close: NaiveTime) -> Self {
        Self { is_open: true, open, close, breaks: Vec::new() }
    }

    pub fn with_break(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.breaks.push(BreakWindow { start, end });
        self
    }

    pub fn closed() -> Self {
        Self {
            is_open: false,
            open: NaiveTime::MIN,
            close: NaiveTime::MIN,
            breaks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessHours {
    pub monday: Option<DaySchedule>,
    pub tuesday: Option<DaySchedule>,
    pub wednesday: Option<DaySchedule>,
    pub thursday: Option<DaySchedule>,
    pub friday: Option<DaySchedule>,
    pub saturday: Option<DaySchedule>,
    pub sunday: Option<DaySchedule>,
}

impl BusinessHours {
    /// Same schedule on all seven days.
    pub fn uniform(schedule: DaySchedule) -> Self {
        Self {
            monday: Some(schedule.clone()),
            tuesday: Some(schedule.clone()),
            wednesday: Some(schedule.clone()),
            thursday: Some(schedule.clone()),
            friday: Some(schedule.clone()),
            saturday: Some(schedule.clone()),
            sunday: Some(schedule),
        }
    }

    pub fn for_weekday(&self, weekday: Weekday) -> Option<&DaySchedule> {
        match weekday {
            Weekday::Mon => self.monday.as_ref(),
            Weekday::Tue => self.tuesday.as_ref(),
            Weekday::Wed => self.wednesday.as_ref(),
            Weekday::Thu => self.thursday.as_ref(),
            Weekday::Fri => self.friday.as_ref(),
            Weekday::Sat => self.saturday.as_ref(),
            Weekday::Sun => self.sunday.as_ref(),
        }
    }

    pub fn set(&mut self, weekday: Weekday, schedule: Option<DaySchedule>) {
        let slot = match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        };
        *slot = schedule;
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        let days = [
            ("monday", &self.monday),
            ("tuesday", &self.tuesday),
            ("wednesday", &self.wednesday),
            ("thursday", &self.thursday),
            ("friday", &self.friday),
            ("saturday", &self.saturday),
            ("sunday", &self.sunday),
        ];

        for (field, day) in days {
            let Some(day) = day else { continue };
            if !day.is_open {
                continue;
            }
            if day.open > day.close {
                errors.push(field, "Opening time must not be after closing time");
                continue;
            }

            let mut breaks = day.breaks.clone();
            breaks.sort_by_key(|b| b.start);
            for b in &breaks {
                if b.start >= b.end || b.start < day.open || b.end > day.close {
                    errors.push(field, format!(
                        "Break {}-{} must fall within opening hours",
                        b.start.format("%H:%M"),
                        b.end.format("%H:%M")
                    ));
                }
            }
            for pair in breaks.windows(2) {
                if pair[1].start < pair[0].end {
                    errors.push(field, "Break windows must not overlap");
                }
            }
        }

        errors.into_result()
    }
}
