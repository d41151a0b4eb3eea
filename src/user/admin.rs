//! Administrator session: shortcuts into the admin console pages.

use super::User;
use crate::config::{Credentials, Role};
use crate::error::Result;
use std::ops::{Deref, DerefMut};

pub struct Admin {
    user: User,
    base: String,
}

impl Admin {
    /// Launch a browser and bind the admin credentials from the environment
    pub async fn from_env() -> Result<Self> {
        let credentials = Credentials::from_env(Role::Admin)?;
        let user = User::launch(credentials).await?;
        Ok(Self::new(user))
    }

    pub fn new(user: User) -> Self {
        let base = format!("{}/admin", user.site());
        Self { user, base }
    }

    async fn get(&self, path: &str) -> Result<()> {
        self.user.session().goto(&format!("{}{}", self.base, path)).await
    }

    /// Open the admin console landing page
    pub async fn goto_admin_control(&self) -> Result<()> {
        self.get("").await
    }

    pub async fn goto_catalog_offerings(&self) -> Result<()> {
        self.get("/catalog_offerings").await
    }

    /// Course list (the admin console one, not the user course picker)
    pub async fn goto_course_list(&self) -> Result<()> {
        self.get("/courses").await
    }

    pub async fn goto_school_list(&self) -> Result<()> {
        self.get("/school").await
    }

    pub async fn goto_district_list(&self) -> Result<()> {
        self.get("/districts").await
    }

    pub async fn goto_tag_list(&self) -> Result<()> {
        self.get("/tags").await
    }

    pub async fn goto_ecosystems(&self) -> Result<()> {
        self.get("/ecosystems").await
    }

    pub async fn goto_terms_and_contracts(&self) -> Result<()> {
        self.user
            .session()
            .goto(&format!("{}/fine_print", self.user.site()))
            .await
    }

    pub async fn goto_targeted_contracts(&self) -> Result<()> {
        self.get("/targeted_contracts").await
    }

    pub async fn goto_course_stats(&self) -> Result<()> {
        self.get("/stats/courses").await
    }

    pub async fn goto_concept_coach_stats(&self) -> Result<()> {
        self.get("/stats/concept_coach").await
    }

    pub async fn goto_user_list(&self) -> Result<()> {
        self.get("/users").await
    }

    pub async fn goto_jobs(&self) -> Result<()> {
        self.get("/jobs").await
    }

    pub async fn goto_research_data(&self) -> Result<()> {
        self.get("/research_data").await
    }

    pub async fn goto_salesforce_control(&self) -> Result<()> {
        self.get("/salesforce").await
    }

    pub async fn goto_system_settings(&self) -> Result<()> {
        self.get("/settings").await
    }

    pub async fn goto_system_notifications(&self) -> Result<()> {
        self.get("/notifications").await
    }
}

impl Deref for Admin {
    type Target = User;

    fn deref(&self) -> &User {
        &self.user
    }
}

impl DerefMut for Admin {
    fn deref_mut(&mut self) -> &mut User {
        &mut self.user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_base_join() {
        let creds = Credentials::new("admin", "password", "tutor-qa.openstax.org/");
        assert_eq!(creds.site, "https://tutor-qa.openstax.org");
        assert_eq!(
            format!("{}/admin", creds.site),
            "https://tutor-qa.openstax.org/admin"
        );
    }
}
