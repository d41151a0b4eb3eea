//! Content-reviewer session.
//!
//! Content reviewers use the shared [`User`] surface; the facade exists so
//! the role loads its own credentials and can grow reviewer-specific
//! shortcuts alongside the other roles.

use super::User;
use crate::config::{Credentials, Role};
use crate::error::Result;
use std::ops::{Deref, DerefMut};

pub struct ContentReviewer {
    user: User,
}

impl ContentReviewer {
    /// Launch a browser and bind the content-reviewer credentials from the
    /// environment
    pub async fn from_env() -> Result<Self> {
        let credentials = Credentials::from_env(Role::ContentReviewer)?;
        Ok(Self {
            user: User::launch(credentials).await?,
        })
    }

    pub fn new(user: User) -> Self {
        Self { user }
    }
}

impl Deref for ContentReviewer {
    type Target = User;

    fn deref(&self) -> &User {
        &self.user
    }
}

impl DerefMut for ContentReviewer {
    fn deref_mut(&mut self) -> &mut User {
        &mut self.user
    }
}
