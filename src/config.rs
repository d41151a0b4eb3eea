//! Environment-driven configuration for unattended test runs.
//!
//! Credentials are looked up per role (`TEACHER_USER`, `STUDENT_PASSWORD`,
//! ...) with the server address and test email account shared across roles.

use crate::error::{HelperError, Result};
use std::fmt;
use std::str::FromStr;

/// The user roles the target application distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Teacher,
    Student,
    Admin,
    ContentReviewer,
}

impl Role {
    /// Prefix for this role's credential environment variables
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Role::Teacher => "TEACHER",
            Role::Student => "STUDENT",
            Role::Admin => "ADMIN",
            Role::ContentReviewer => "CONTENT",
        }
    }
}

impl FromStr for Role {
    type Err = HelperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            "content" | "content-reviewer" | "content-qa" => Ok(Role::ContentReviewer),
            other => Err(HelperError::Other(format!("Unknown role: {}", other))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Admin => "admin",
            Role::ContentReviewer => "content-reviewer",
        };
        write!(f, "{}", name)
    }
}

/// Browser kinds the driver layer can actually attach to.
///
/// The remote-control protocol in use is Chrome-only; anything else is a
/// validation error rather than a silent fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowserKind {
    #[default]
    Chrome,
}

impl FromStr for BrowserKind {
    type Err = HelperError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        match normalized.as_str() {
            "chrome" | "chromium" | "googlechrome" | "google-chrome" => Ok(BrowserKind::Chrome),
            other => Err(HelperError::UnknownBrowser(other.to_string())),
        }
    }
}

/// Login credentials plus the optional test email account for a role
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub site: String,
    pub email: Option<String>,
    pub email_username: Option<String>,
    pub email_password: Option<String>,
}

impl Credentials {
    /// Load a role's credentials from the environment.
    ///
    /// `<ROLE>_USER`, `<ROLE>_PASSWORD`, and `SERVER_URL` are required;
    /// the `TEST_EMAIL_*` trio is optional.
    pub fn from_env(role: Role) -> Result<Self> {
        let prefix = role.env_prefix();
        let username = require_env(&format!("{}_USER", prefix))?;
        let password = require_env(&format!("{}_PASSWORD", prefix))?;
        let site = require_env("SERVER_URL")?;

        Ok(Self {
            username,
            password,
            site: normalize_site(&site),
            email: std::env::var("TEST_EMAIL_ACCOUNT").ok(),
            email_username: std::env::var("TEST_EMAIL_USER").ok(),
            email_password: std::env::var("TEST_EMAIL_PASSWORD").ok(),
        })
    }

    /// Build credentials directly, for tests and non-env callers
    pub fn new(username: impl Into<String>, password: impl Into<String>, site: &str) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            site: normalize_site(site),
            email: None,
            email_username: None,
            email_password: None,
        }
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| HelperError::MissingEnv(name.to_string()))
}

/// Normalize a site address: default the scheme to https and drop any
/// trailing slash so path joins stay predictable
pub fn normalize_site(site: &str) -> String {
    let trimmed = site.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    with_scheme.trim_end_matches('/').to_string()
}
