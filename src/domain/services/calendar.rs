use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use icalendar::{Calendar, Component, Event as IcalEvent, EventLike, EventStatus};
use crate::domain::models::appointment::{Appointment, AppointmentStatus};
use crate::domain::models::closure::Closure;
use crate::domain::services::closure_overlap::active_occurrences;

fn appointment_event(appointment: &Appointment) -> IcalEvent {
    let status = match appointment.status {
        AppointmentStatus::Pending => EventStatus::Tentative,
        _ => EventStatus::Confirmed,
    };

    IcalEvent::new()
        .summary(&format!("{} - {}", appointment.service.name, appointment.customer.name))
        .description(&format!("Status: {}", appointment.status))
        .starts(appointment.start)
        .ends(appointment.occupied_until())
        .uid(&appointment.id)
        .status(status)
        .add_property("CATEGORIES", "APPOINTMENT")
        .done()
}

/// Generates an iCalendar (.ics) string for the appointments and active closure
/// occurrences intersecting `[from, to)`. Canceled appointments are left out.
pub fn generate_ics(
    name: &str,
    appointments: &[Appointment],
    closures: &[Closure],
    tz: Tz,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> String {
    let mut calendar = Calendar::new();
    calendar.name(name).timezone(tz.name());

    for appointment in appointments.iter().filter(|a| a.occupies_slot() && a.overlaps(from, to)) {
        calendar.push(appointment_event(appointment));
    }

    for occurrence in active_occurrences(closures, tz, from, to) {
        let closure = occurrence.closure;
        let summary = if closure.reason.is_empty() {
            format!("Closed ({})", closure.closure_type.as_str())
        } else {
            format!("Closed: {}", closure.reason)
        };
        // Recurring closures yield one event per occurrence.
        let uid = format!("{}-{}", closure.id, occurrence.start.timestamp());

        calendar.push(
            IcalEvent::new()
                .summary(&summary)
                .starts(occurrence.start)
                .ends(occurrence.end)
                .uid(&uid)
                .add_property("CATEGORIES", "CLOSURE")
                .done(),
        );
    }

    calendar.done().to_string()
}
