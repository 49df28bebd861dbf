use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use crate::domain::models::appointment::Appointment;
use crate::domain::models::business_hours::hhmm;
use crate::domain::models::closure::Closure;
use crate::domain::services::closure_overlap::{active_occurrences, Occurrence};
use crate::domain::services::slots::SLOT_MINUTES;
use crate::domain::services::timezone::{day_bounds, to_utc_instant};

/// Everything the resolver needs besides the slot itself.
#[derive(Debug, Clone, Copy)]
pub struct ResolverContext<'a> {
    pub tz: Tz,
    pub now: DateTime<Utc>,
    pub appointments: &'a [Appointment],
    pub closures: &'a [Closure],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum SlotStatus<'a> {
    Empty,
    AppointmentStart { appointment: &'a Appointment, span_slots: u32 },
    AppointmentContinue { appointment: &'a Appointment },
    Closed { closure: &'a Closure },
    Past,
}

impl<'a> SlotStatus<'a> {
    /// Only empty slots can be booked or selected.
    pub fn is_selectable(&self) -> bool {
        matches!(self, SlotStatus::Empty)
    }

    pub fn appointment(&self) -> Option<&'a Appointment> {
        match self {
            SlotStatus::AppointmentStart { appointment, .. } | SlotStatus::AppointmentContinue { appointment } => Some(appointment),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SlotStatus::Empty => "empty",
            SlotStatus::AppointmentStart { .. } => "appointment-start",
            SlotStatus::AppointmentContinue { .. } => "appointment-continue",
            SlotStatus::Closed { .. } => "closed",
            SlotStatus::Past => "past",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassifiedSlot<'a> {
    #[serde(with = "hhmm")]
    pub label: NaiveTime,
    pub instant: DateTime<Utc>,
    #[serde(flatten)]
    pub status: SlotStatus<'a>,
}

/// Number of slots an appointment covers from the slot starting at `slot_start`,
/// at least one. Off-grid starts count the partial slots on both ends.
pub fn span_slots(appointment: &Appointment, slot_start: DateTime<Utc>) -> u32 {
    let minutes = (appointment.occupied_until() - slot_start).num_minutes().max(0) as u32;
    minutes.div_ceil(SLOT_MINUTES).max(1)
}

// Precedence, first match wins:
//   appointment starting in the slot > past (unless covered) > active closure
//   > appointment covering the slot > empty
fn resolve<'a>(
    instant: DateTime<Utc>,
    now: DateTime<Utc>,
    appointments: &[&'a Appointment],
    occurrences: &[Occurrence<'a>],
) -> SlotStatus<'a> {
    let slot_end = instant + Duration::minutes(SLOT_MINUTES as i64);

    if let Some(&appointment) = appointments.iter().find(|a| a.start >= instant && a.start < slot_end) {
        return SlotStatus::AppointmentStart { appointment, span_slots: span_slots(appointment, instant) };
    }

    let covering = appointments.iter().find(|a| a.overlaps(instant, slot_end)).copied();

    if instant < now {
        return match covering {
            Some(appointment) => SlotStatus::AppointmentContinue { appointment },
            None => SlotStatus::Past,
        };
    }

    if let Some(occurrence) = occurrences.iter().find(|o| o.contains(instant)) {
        return SlotStatus::Closed { closure: occurrence.closure };
    }

    match covering {
        Some(appointment) => SlotStatus::AppointmentContinue { appointment },
        None => SlotStatus::Empty,
    }
}

fn occupying_between<'a>(appointments: &'a [Appointment], from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<&'a Appointment> {
    let mut found: Vec<&Appointment> = appointments.iter()
        .filter(|a| a.occupies_slot() && a.overlaps(from, to))
        .collect();
    found.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
    found
}

/// Classifies a single slot; `None` when the label does not exist on `date` (DST gap).
pub fn classify_slot<'a>(date: NaiveDate, label: NaiveTime, ctx: &ResolverContext<'a>) -> Option<ClassifiedSlot<'a>> {
    let instant = to_utc_instant(date, label, ctx.tz)?;
    let slot_end = instant + Duration::minutes(SLOT_MINUTES as i64);
    let appointments = occupying_between(ctx.appointments, instant, slot_end);
    let occurrences = active_occurrences(ctx.closures, ctx.tz, instant, slot_end);

    Some(ClassifiedSlot {
        label,
        instant,
        status: resolve(instant, ctx.now, &appointments, &occurrences),
    })
}

/// Classifies every label of a day in order.
pub fn classify_day<'a>(date: NaiveDate, labels: &[NaiveTime], ctx: &ResolverContext<'a>) -> Vec<ClassifiedSlot<'a>> {
    let (day_start, day_end) = day_bounds(date, ctx.tz);
    let appointments = occupying_between(ctx.appointments, day_start, day_end);
    let occurrences = active_occurrences(ctx.closures, ctx.tz, day_start, day_end);

    labels.iter()
        .filter_map(|label| {
            let instant = to_utc_instant(date, *label, ctx.tz)?;
            Some(ClassifiedSlot {
                label: *label,
                instant,
                status: resolve(instant, ctx.now, &appointments, &occurrences),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::appointment::{AppointmentStatus, PartyRef};
    use crate::domain::models::business_hours::{BusinessHours, DaySchedule};
    use crate::domain::models::closure::ClosureType;
    use crate::domain::services::slots::generate_slots;
    use crate::domain::services::timezone::{format_label, parse_timezone};
    use chrono::TimeZone;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn appointment(id: &str, start: DateTime<Utc>, minutes: u32) -> Appointment {
        Appointment {
            id: id.into(),
            start,
            end: start + Duration::minutes(minutes as i64),
            duration_minutes: minutes,
            status: AppointmentStatus::Confirmed,
            service: PartyRef { id: "svc".into(), name: "Color".into() },
            customer: PartyRef { id: "cust".into(), name: "Grace".into() },
            price: 80.0,
        }
    }

    fn closure(start: DateTime<Utc>, end: DateTime<Utc>) -> Closure {
        Closure {
            id: "cl".into(),
            start_date: start,
            end_date: end,
            reason: "Inventory".into(),
            closure_type: ClosureType::Maintenance,
            is_active: true,
            recurring: None,
            notification: None,
        }
    }

    fn early_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_closure_interval_excludes_end() {
        let closures = vec![closure(utc(9, 0), utc(11, 0))];
        let ctx = ResolverContext { tz: chrono_tz::UTC, now: early_now(), appointments: &[], closures: &closures };

        assert_eq!(classify_slot(date(), t(9, 0), &ctx).unwrap().status.kind(), "closed");
        assert_eq!(classify_slot(date(), t(8, 45), &ctx).unwrap().status.kind(), "empty");
        assert_eq!(classify_slot(date(), t(11, 0), &ctx).unwrap().status.kind(), "empty");
    }

    #[test]
    fn test_inactive_closure_is_ignored() {
        let mut c = closure(utc(9, 0), utc(11, 0));
        c.is_active = false;
        let closures = vec![c];
        let ctx = ResolverContext { tz: chrono_tz::UTC, now: early_now(), appointments: &[], closures: &closures };
        assert_eq!(classify_slot(date(), t(9, 30), &ctx).unwrap().status, SlotStatus::Empty);
    }

    #[test]
    fn test_fifty_minute_appointment_spans_four_slots() {
        let appointments = vec![appointment("a1", utc(10, 0), 50)];
        let ctx = ResolverContext { tz: chrono_tz::UTC, now: early_now(), appointments: &appointments, closures: &[] };
        let labels = [t(10, 0), t(10, 15), t(10, 30), t(10, 45), t(11, 0)];
        let slots = classify_day(date(), &labels, &ctx);

        assert_eq!(slots[0].status, SlotStatus::AppointmentStart { appointment: &appointments[0], span_slots: 4 });
        for slot in &slots[1..4] {
            assert_eq!(slot.status, SlotStatus::AppointmentContinue { appointment: &appointments[0] });
        }
        assert_eq!(slots[4].status, SlotStatus::Empty);
    }

    #[test]
    fn test_off_grid_appointment_spans_every_covered_slot() {
        // 10:10-10:25 touches both the 10:00 and the 10:15 slot.
        let appointments = vec![appointment("a1", utc(10, 10), 15)];
        let ctx = ResolverContext { tz: chrono_tz::UTC, now: early_now(), appointments: &appointments, closures: &[] };
        let slots = classify_day(date(), &[t(10, 0), t(10, 15), t(10, 30)], &ctx);

        assert_eq!(slots[0].status, SlotStatus::AppointmentStart { appointment: &appointments[0], span_slots: 2 });
        assert_eq!(slots[1].status, SlotStatus::AppointmentContinue { appointment: &appointments[0] });
        assert_eq!(slots[2].status, SlotStatus::Empty);
    }

    #[test]
    fn test_past_slots_keep_appointments_visible() {
        let appointments = vec![appointment("a1", utc(9, 0), 30)];
        let now = utc(12, 0);
        let ctx = ResolverContext { tz: chrono_tz::UTC, now, appointments: &appointments, closures: &[] };
        let slots = classify_day(date(), &[t(9, 0), t(9, 15), t(9, 30), t(12, 0)], &ctx);

        assert_eq!(slots[0].status.kind(), "appointment-start");
        assert_eq!(slots[1].status.kind(), "appointment-continue");
        assert_eq!(slots[2].status, SlotStatus::Past);
        assert_eq!(slots[3].status, SlotStatus::Empty);
    }

    #[test]
    fn test_appointment_start_shows_over_closure() {
        let appointments = vec![appointment("a1", utc(13, 0), 30)];
        let closures = vec![closure(utc(12, 30), utc(14, 0))];
        let ctx = ResolverContext { tz: chrono_tz::UTC, now: early_now(), appointments: &appointments, closures: &closures };
        let slots = classify_day(date(), &[t(12, 45), t(13, 0), t(13, 15), t(13, 30)], &ctx);

        assert_eq!(slots[0].status.kind(), "closed");
        assert_eq!(slots[1].status.kind(), "appointment-start");
        assert_eq!(slots[2].status.kind(), "closed");
        assert_eq!(slots[3].status.kind(), "closed");
    }

    #[test]
    fn test_canceled_appointments_free_slots() {
        let mut a = appointment("a1", utc(10, 0), 30);
        a.status = AppointmentStatus::Canceled;
        let appointments = vec![a];
        let ctx = ResolverContext { tz: chrono_tz::UTC, now: early_now(), appointments: &appointments, closures: &[] };
        assert_eq!(classify_slot(date(), t(10, 0), &ctx).unwrap().status, SlotStatus::Empty);
    }

    #[test]
    fn test_slots_are_compared_in_business_timezone() {
        // 09:00 in New York on March 10 (EDT) is 13:00Z.
        let tz = parse_timezone("America/New_York");
        let appointments = vec![appointment("a1", utc(13, 0), 15)];
        let ctx = ResolverContext { tz, now: early_now(), appointments: &appointments, closures: &[] };

        let slot = classify_slot(date(), t(9, 0), &ctx).unwrap();
        assert_eq!(slot.instant, utc(13, 0));
        assert_eq!(slot.status.kind(), "appointment-start");
    }

    #[test]
    fn test_full_day_scenario() {
        let hours = BusinessHours::uniform(DaySchedule::open(t(8, 0), t(22, 0)));
        let appointments = vec![appointment("a1", utc(10, 0), 30)];
        let closures = vec![closure(utc(13, 0), utc(14, 0))];
        let ctx = ResolverContext { tz: chrono_tz::UTC, now: early_now(), appointments: &appointments, closures: &closures };

        let labels = generate_slots(date(), Some(&hours));
        let slots = classify_day(date(), &labels, &ctx);
        assert_eq!(slots.len(), 56);

        for slot in &slots {
            let label = format_label(slot.label);
            let expected = match label.as_str() {
                "10:00" => "appointment-start",
                "10:15" => "appointment-continue",
                l if ("13:00".."14:00").contains(&l) => "closed",
                _ => "empty",
            };
            assert_eq!(slot.status.kind(), expected, "slot {}", label);
        }
        assert_eq!(slots[8].status, SlotStatus::AppointmentStart { appointment: &appointments[0], span_slots: 2 });
    }

    #[test]
    fn test_slot_status_serialization() {
        let appointments = vec![appointment("a1", utc(10, 0), 30)];
        let ctx = ResolverContext { tz: chrono_tz::UTC, now: early_now(), appointments: &appointments, closures: &[] };
        let slot = classify_slot(date(), t(10, 0), &ctx).unwrap();
        let json = serde_json::to_value(slot).unwrap();

        assert_eq!(json["label"], "10:00");
        assert_eq!(json["status"], "appointment-start");
        assert_eq!(json["span_slots"], 2);
        assert_eq!(json["appointment"]["id"], "a1");
    }
}
