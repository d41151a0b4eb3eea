//! Login and course-picker flows against the mock pages.
//!
//! These launch a headless Chrome; they skip (with a note) when no browser
//! can be brought up.


use test_server::{launch_browser, TestServer};
use tutor_helper::{Credentials, HelperError, User};

#[tokio::test]
async fn test_login_reaches_the_dashboard() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let Some(session) = launch_browser().await else {
        return;
    };

    let user = User::with_session(session, Credentials::new("teacher01", "staxly16", &server.url()));
    user.login().await.expect("Login should succeed");

    let url = user.current_url().await.expect("Should read URL");
    assert!(url.contains("/dashboard"), "Expected the dashboard, got {}", url);

    let titles = user.course_titles().await.expect("Should list courses");
    assert_eq!(titles, vec!["College Physics", "Biology"]);

    user.close().await.expect("Failed to close browser");
}

#[tokio::test]
async fn test_login_then_course_selection() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let Some(session) = launch_browser().await else {
        return;
    };

    let user = User::with_session(session, Credentials::new("teacher01", "staxly16", &server.url()));
    user.login().await.expect("Login should succeed");
    user.select_course("College Physics")
        .await
        .expect("Course selection should succeed");

    let url = user.current_url().await.expect("Should read URL");
    assert!(url.ends_with("/course"), "Expected the course page, got {}", url);

    user.close().await.expect("Failed to close browser");
}

#[tokio::test]
async fn test_login_refuses_non_openstax_pages() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let Some(session) = launch_browser().await else {
        return;
    };

    // The exercise catalog page carries no OpenStax branding, so the login
    // flow must refuse to type credentials into it
    let wrong_site = format!("{}/course/exercises", server.url());
    let user = User::with_session(session, Credentials::new("teacher01", "staxly16", &wrong_site));

    match user.login().await {
        Err(HelperError::Login(message)) => {
            assert!(message.contains("Non-OpenStax"), "Unexpected message: {}", message)
        }
        Err(other) => panic!("Expected a login error, got {}", other),
        Ok(()) => panic!("Login should have been refused"),
    }

    user.close().await.expect("Failed to close browser");
}
