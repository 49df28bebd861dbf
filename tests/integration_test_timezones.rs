mod common;

use axum::http::StatusCode;
use booking_calendar::domain::models::business_hours::{BusinessHours, DaySchedule};
use booking_calendar::domain::models::closure::{Frequency, RecurringPattern};
use common::{closure, t, utc, TestApp};
use serde_json::Value;

fn around_the_clock(app: &TestApp) {
    *app.profile.hours.lock().unwrap() = Some(BusinessHours::uniform(DaySchedule::open(t(0, 0), t(23, 59))));
}

fn labels(body: &Value) -> Vec<String> {
    body["slots"].as_array().unwrap()
        .iter()
        .map(|s| s["label"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_spring_forward_gap_labels_are_dropped() {
    let app = TestApp::with_timezone("Europe/Berlin");
    around_the_clock(&app);

    let (status, body) = app.get("/api/v1/biz-1/calendar/day?date=2025-03-30").await;
    assert_eq!(status, StatusCode::OK);

    let labels = labels(&body);
    assert_eq!(labels.len(), 92);
    assert!(labels.contains(&"01:45".to_string()));
    assert!(!labels.contains(&"02:00".to_string()));
    assert!(!labels.contains(&"02:45".to_string()));
    assert!(labels.contains(&"03:00".to_string()));

    let three = body["slots"].as_array().unwrap()
        .iter()
        .find(|s| s["label"] == "03:00")
        .unwrap()
        .clone();
    assert_eq!(three["instant"], "2025-03-30T01:00:00Z");
}

#[tokio::test]
async fn test_fall_back_labels_use_first_occurrence() {
    let app = TestApp::with_timezone("Europe/Berlin");
    around_the_clock(&app);

    let (_, body) = app.get("/api/v1/biz-1/calendar/day?date=2025-10-26").await;
    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 96);

    let two_thirty = slots.iter().find(|s| s["label"] == "02:30").unwrap();
    // 02:30 happens twice; the summer-time (earlier) instant is used.
    assert_eq!(two_thirty["instant"], "2025-10-26T00:30:00Z");
}

#[tokio::test]
async fn test_weekly_closure_keeps_local_time_across_dst() {
    let app = TestApp::with_timezone("Europe/Berlin");
    // 09:00-10:00 Berlin on Monday 24 March (winter time).
    let mut weekly = closure("weekly", utc(2025, 3, 24, 8, 0), utc(2025, 3, 24, 9, 0));
    weekly.recurring = Some(RecurringPattern { frequency: Frequency::Weekly, interval: 1, end_date: None });
    app.closures.set(vec![weekly]);

    let (_, before) = app.get("/api/v1/biz-1/calendar/day?date=2025-03-24").await;
    let (_, after) = app.get("/api/v1/biz-1/calendar/day?date=2025-03-31").await;

    for body in [&before, &after] {
        let slots = body["slots"].as_array().unwrap();
        let status_at = |label: &str| slots.iter().find(|s| s["label"] == label).unwrap()["status"].clone();
        assert_eq!(status_at("08:45"), "empty");
        assert_eq!(status_at("09:00"), "closed");
        assert_eq!(status_at("09:45"), "closed");
        assert_eq!(status_at("10:00"), "empty");
    }

    let nine = after["slots"].as_array().unwrap().iter().find(|s| s["label"] == "09:00").unwrap().clone();
    assert_eq!(nine["instant"], "2025-03-31T07:00:00Z");
}

#[tokio::test]
async fn test_appointments_bucket_by_business_local_day() {
    let app = TestApp::with_timezone("America/New_York");
    // 02:00Z on the 11th is still the 10th in New York.
    app.appointments.set(vec![common::appointment(
        "late",
        utc(2025, 3, 11, 2, 0),
        30,
        booking_calendar::domain::models::appointment::AppointmentStatus::Confirmed,
    )]);

    let (_, body) = app.get("/api/v1/biz-1/calendar/month?date=2025-03-10").await;
    let cells: Vec<&Value> = body["weeks"].as_array().unwrap()
        .iter()
        .flat_map(|w| w.as_array().unwrap().iter())
        .collect();

    let tenth = cells.iter().find(|c| c["date"] == "2025-03-10").unwrap();
    let eleventh = cells.iter().find(|c| c["date"] == "2025-03-11").unwrap();
    assert_eq!(tenth["summaries"][0]["appointment_id"], "late");
    assert_eq!(tenth["summaries"][0]["start_label"], "22:00");
    assert!(eleventh["summaries"].as_array().unwrap().is_empty());
}
