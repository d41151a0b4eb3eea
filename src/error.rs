use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HelperError {
    #[error("Failed to connect to Chrome: {0}")]
    ConnectionFailed(String),

    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Timed out after {waited:?} waiting for element: {selector}")]
    ElementTimeout { selector: String, waited: Duration },

    #[error("Login failed: {0}")]
    Login(String),

    #[error("No period matched the requested names: {0}")]
    NoMatchingPeriod(String),

    #[error("Section {section} has {available} exercises, {requested} requested")]
    NotEnoughExercises {
        section: String,
        requested: usize,
        available: usize,
    },

    #[error("Unrecognized browser kind: {0} (only the Chrome family is supported)")]
    UnknownBrowser(String),

    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid date {value:?}: expected MM/DD/YYYY")]
    InvalidDate { value: String },

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("No page available")]
    NoPage,

    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, HelperError>;
