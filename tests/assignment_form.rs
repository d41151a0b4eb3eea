//! Assignment-builder flows against the mock form page: date-picker
//! rotation, period scheduling, breakpoints, statuses, and the catalog
//! scrape. Skipped when no Chrome can be launched.


use chrono::{Datelike, Local, NaiveDate};
use test_server::{launch_browser, TestServer};
use tutor_helper::assignment::problems;
use tutor_helper::{
    AssignmentFlow, AssignmentKind, AssignmentSpec, Breakpoint, ChromeSession, Credentials,
    HelperError, Status, Teacher, User, When,
};

/// `M/D/YYYY` for today shifted by whole months, matching the unpadded
/// format the mock picker writes back
fn shifted_date(months: i32, day: u32) -> String {
    let today = Local::now().date_naive();
    let total = today.year() * 12 + today.month() as i32 - 1 + months;
    let (year, month) = (total.div_euclid(12), total.rem_euclid(12) + 1);
    format!("{}/{}/{}", month, day, year)
}

async fn open_course(session: &ChromeSession, server: &TestServer) {
    session
        .goto(&format!("{}/course", server.url()))
        .await
        .expect("Should open the course page");
}

async fn flow_result(session: &ChromeSession) -> serde_json::Value {
    let raw: String = session
        .execute_script_typed("document.getElementById('flow-result').textContent")
        .await
        .expect("Should read the flow result");
    serde_json::from_str(&raw).expect("Flow result should be JSON")
}

fn event_spec(title: &str, open: When, close: When) -> AssignmentSpec {
    AssignmentSpec::new(AssignmentKind::Event, title)
        .description("Created by the mock-form test")
        .period("all", open, close)
}

#[tokio::test]
async fn test_event_with_collective_schedule_publishes() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let Some(session) = launch_browser().await else {
        return;
    };
    open_course(&session, &server).await;

    let open = shifted_date(2, 5);
    let due = shifted_date(3, 15);
    let spec = event_spec(
        "Momentum quiz",
        When::Date(open.clone()),
        When::DateTime(due.clone(), "8:00 pm".to_string()),
    )
    .status(Status::Publish);

    AssignmentFlow::new(&session)
        .add(&spec)
        .await
        .expect("Event creation should succeed");

    let result = flow_result(&session).await;
    assert_eq!(result["status"], "published");
    assert_eq!(result["title"], "Momentum quiz");
    assert_eq!(result["description"], "Created by the mock-form test");
    assert_eq!(result["collective"], true);
    assert_eq!(result["allOpenDate"], open.as_str());
    assert_eq!(result["allDueDate"], due.as_str());
    assert_eq!(result["allDueTime"], "800p");

    session.close().await.expect("Failed to close browser");
}

#[tokio::test]
async fn test_date_picker_rotates_backward_across_years() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let Some(session) = launch_browser().await else {
        return;
    };
    open_course(&session, &server).await;

    // 14 months back crosses at least one year boundary
    let open = shifted_date(-14, 3);
    let due = shifted_date(-13, 12);
    let spec = event_spec("Backdated event", When::Date(open.clone()), When::Date(due.clone()))
        .status(Status::Draft);

    AssignmentFlow::new(&session)
        .add(&spec)
        .await
        .expect("Backdated event creation should succeed");

    let result = flow_result(&session).await;
    assert_eq!(result["status"], "draft");
    assert_eq!(result["allOpenDate"], open.as_str());
    assert_eq!(result["allDueDate"], due.as_str());

    session.close().await.expect("Failed to close browser");
}

#[tokio::test]
async fn test_per_period_schedule_disables_unnamed_rows() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let Some(session) = launch_browser().await else {
        return;
    };
    open_course(&session, &server).await;

    let open = shifted_date(1, 4);
    let due = shifted_date(1, 20);
    let spec = AssignmentSpec::new(AssignmentKind::Event, "First period only")
        .period(
            "1st",
            When::Date(open.clone()),
            When::DateTime(due.clone(), "10:00 am".to_string()),
        )
        .status(Status::Draft);

    AssignmentFlow::new(&session)
        .add(&spec)
        .await
        .expect("Per-period scheduling should succeed");

    let result = flow_result(&session).await;
    assert_eq!(result["collective"], false);
    let rows = result["rows"].as_array().expect("rows array");
    assert_eq!(rows[0]["name"], "1st");
    assert_eq!(rows[0]["enabled"], true);
    assert_eq!(rows[0]["openDate"], open.as_str());
    assert_eq!(rows[0]["dueDate"], due.as_str());
    assert_eq!(rows[0]["dueTime"], "1000a");
    assert_eq!(rows[1]["name"], "2nd");
    assert_eq!(rows[1]["enabled"], false, "unnamed rows must be disabled");

    session.close().await.expect("Failed to close browser");
}

#[tokio::test]
async fn test_unmatched_period_names_raise() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let Some(session) = launch_browser().await else {
        return;
    };
    open_course(&session, &server).await;

    let spec = AssignmentSpec::new(AssignmentKind::Event, "Ghost period").period(
        "9th",
        When::Date(shifted_date(1, 4)),
        When::Date(shifted_date(1, 20)),
    );

    match AssignmentFlow::new(&session).add(&spec).await {
        Err(HelperError::NoMatchingPeriod(names)) => assert!(names.contains("9th")),
        Err(other) => panic!("Expected NoMatchingPeriod, got {}", other),
        Ok(()) => panic!("Scheduling should have failed"),
    }

    session.close().await.expect("Failed to close browser");
}

#[tokio::test]
async fn test_breakpoints_leave_later_fields_untouched() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let Some(session) = launch_browser().await else {
        return;
    };

    let spec = event_spec(
        "Halted event",
        When::Date(shifted_date(1, 4)),
        When::Date(shifted_date(1, 20)),
    );
    let flow = AssignmentFlow::new(&session);

    // Halt before the title: nothing typed at all
    open_course(&session, &server).await;
    flow.add_until(&spec, Some(Breakpoint::Title))
        .await
        .expect("Flow should halt cleanly");
    let title: String = session
        .execute_script_typed("document.getElementById('reading-title').value")
        .await
        .unwrap();
    assert_eq!(title, "");

    // Halt before the description: the title went in, nothing later did
    open_course(&session, &server).await;
    flow.add_until(&spec, Some(Breakpoint::Description))
        .await
        .expect("Flow should halt cleanly");
    let title: String = session
        .execute_script_typed("document.getElementById('reading-title').value")
        .await
        .unwrap();
    let description: String = session
        .execute_script_typed("document.getElementById('description').value")
        .await
        .unwrap();
    let open_date: String = session
        .execute_script_typed("document.getElementById('all-open-date').value")
        .await
        .unwrap();
    assert_eq!(title, "Halted event");
    assert_eq!(description, "");
    assert_eq!(open_date, "");

    session.close().await.expect("Failed to close browser");
}

#[tokio::test]
async fn test_cancel_and_delete_confirmations() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let Some(session) = launch_browser().await else {
        return;
    };
    let flow = AssignmentFlow::new(&session);

    let canceled = event_spec(
        "Changed my mind",
        When::Date(shifted_date(1, 4)),
        When::Date(shifted_date(1, 20)),
    )
    .status(Status::Cancel);
    open_course(&session, &server).await;
    flow.add(&canceled).await.expect("Cancel flow should succeed");
    assert_eq!(flow_result(&session).await["status"], "canceled");

    let deleted = event_spec(
        "Short-lived event",
        When::Date(shifted_date(1, 4)),
        When::Date(shifted_date(1, 20)),
    )
    .status(Status::Delete);
    open_course(&session, &server).await;
    flow.add(&deleted).await.expect("Delete flow should succeed");
    assert_eq!(flow_result(&session).await["status"], "deleted");

    session.close().await.expect("Failed to close browser");
}

#[tokio::test]
async fn test_reading_section_selection() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let Some(session) = launch_browser().await else {
        return;
    };
    let flow = AssignmentFlow::new(&session);

    // A single section
    let spec = AssignmentSpec::new(AssignmentKind::Reading, "Read 1.1")
        .period("all", When::Date(shifted_date(1, 4)), When::Date(shifted_date(1, 20)))
        .readings(vec!["1.1".to_string()])
        .status(Status::Publish);
    open_course(&session, &server).await;
    flow.add(&spec).await.expect("Reading creation should succeed");
    let result = flow_result(&session).await;
    assert_eq!(result["status"], "published");
    assert_eq!(result["readings"], serde_json::json!(["1.1"]));

    // A whole chapter ticks every section
    let spec = AssignmentSpec::new(AssignmentKind::Reading, "Read chapter 1")
        .period("all", When::Date(shifted_date(1, 4)), When::Date(shifted_date(1, 20)))
        .readings(vec!["ch1".to_string()])
        .status(Status::Publish);
    open_course(&session, &server).await;
    flow.add(&spec).await.expect("Chapter reading creation should succeed");
    let result = flow_result(&session).await;
    assert_eq!(result["readings"], serde_json::json!(["1.1", "1.2"]));

    session.close().await.expect("Failed to close browser");
}

#[tokio::test]
async fn test_external_assignment_url_field() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let Some(session) = launch_browser().await else {
        return;
    };
    open_course(&session, &server).await;

    let spec = AssignmentSpec::new(AssignmentKind::External, "Watch the lecture")
        .period("all", When::Date(shifted_date(1, 4)), When::Date(shifted_date(1, 20)))
        .url("https://example.com/lecture")
        .status(Status::Publish);

    AssignmentFlow::new(&session)
        .add(&spec)
        .await
        .expect("External creation should succeed");

    let result = flow_result(&session).await;
    assert_eq!(result["url"], "https://example.com/lecture");
    assert_eq!(result["status"], "published");

    session.close().await.expect("Failed to close browser");
}

#[tokio::test]
async fn test_teacher_calendar_rotation() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let Some(session) = launch_browser().await else {
        return;
    };
    open_course(&session, &server).await;

    let teacher = Teacher::new(User::with_session(
        session,
        Credentials::new("teacher01", "staxly16", &server.url()),
    ));

    let target = shifted_date(7, 1);
    teacher
        .rotate_calendar(&target)
        .await
        .expect("Rotation should land");
    let (month, year) = teacher
        .calendar_month_year()
        .await
        .expect("Should read the calendar header");
    let expected = NaiveDate::parse_from_str(&target, "%m/%d/%Y").unwrap();
    assert_eq!((month, year), (expected.month(), expected.year()));

    // And back again, across the year boundary the other way
    let target = shifted_date(-3, 1);
    teacher
        .rotate_calendar(&target)
        .await
        .expect("Rotation should land backward");
    let (month, year) = teacher.calendar_month_year().await.unwrap();
    let expected = NaiveDate::parse_from_str(&target, "%m/%d/%Y").unwrap();
    assert_eq!((month, year), (expected.month(), expected.year()));
}

#[tokio::test]
async fn test_exercise_catalog_scrape() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let Some(session) = launch_browser().await else {
        return;
    };

    session
        .goto(&format!("{}/course/exercises", server.url()))
        .await
        .expect("Should open the exercise page");

    let catalog = problems::scrape_catalog(&session)
        .await
        .expect("Scrape should succeed");

    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog["1.1"], vec!["q101@1", "q102@1", "q103@2"]);
    assert_eq!(catalog["1.2"], vec!["q201@1"]);
    assert!(catalog["2.1"].is_empty());

    session.close().await.expect("Failed to close browser");
}
