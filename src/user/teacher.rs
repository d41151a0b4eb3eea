//! Teacher session: calendar-centric navigation plus the assignment
//! workflows.

use super::User;
use crate::assignment::{datepicker, AssignmentFlow, AssignmentSpec, Breakpoint};
use crate::browser::dom::DEFAULT_WAIT;
use crate::config::{Credentials, Role};
use crate::error::{HelperError, Result};
use std::ops::{Deref, DerefMut};
use std::time::Duration;

pub struct Teacher {
    user: User,
}

impl Teacher {
    /// Launch a browser and bind the teacher credentials from the environment
    pub async fn from_env() -> Result<Self> {
        let credentials = Credentials::from_env(Role::Teacher)?;
        Ok(Self {
            user: User::launch(credentials).await?,
        })
    }

    pub fn new(user: User) -> Self {
        Self { user }
    }

    // ===== ASSIGNMENT DISPATCH =====

    /// Create an assignment through its kind's form flow
    pub async fn add_assignment(&self, spec: &AssignmentSpec) -> Result<()> {
        AssignmentFlow::new(self.user.session()).add(spec).await
    }

    /// Create an assignment but halt at a breakpoint, for partial-form checks
    pub async fn add_assignment_until(
        &self,
        spec: &AssignmentSpec,
        breakpoint: Breakpoint,
    ) -> Result<()> {
        AssignmentFlow::new(self.user.session())
            .add_until(spec, Some(breakpoint))
            .await
    }

    /// Alter an existing assignment
    pub async fn change_assignment(&self, spec: &AssignmentSpec) -> Result<()> {
        AssignmentFlow::new(self.user.session()).edit(spec).await
    }

    /// Delete an existing assignment
    pub async fn delete_assignment(&self, spec: &AssignmentSpec) -> Result<()> {
        AssignmentFlow::new(self.user.session()).delete(spec).await
    }

    // ===== NAVIGATION =====

    /// Open a named entry from the user menu
    pub async fn goto_menu_item(&self, item: &str) -> Result<()> {
        if self.current_url().await?.contains("courses") {
            self.open_user_menu().await?;
            self.session().click_by_text("a", item).await?;
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        Ok(())
    }

    /// Return to the calendar dashboard via the brand link
    pub async fn goto_calendar(&self) -> Result<()> {
        log::debug!("Returning to the calendar");
        if self
            .session()
            .click_if_present("ul.navbar-nav a.navbar-brand")
            .await
        {
            tokio::time::sleep(Duration::from_millis(500)).await;
            return Ok(());
        }
        if self
            .session()
            .click_if_present("div.navbar-header a.navbar-brand")
            .await
        {
            tokio::time::sleep(Duration::from_millis(500)).await;
            return Ok(());
        }
        log::debug!("No brand link to click; staying put");
        Ok(())
    }

    /// Open the performance forecast and wait for the guide to render
    pub async fn goto_performance_forecast(&self) -> Result<()> {
        self.goto_menu_item("Performance Forecast").await?;
        for attempt in 1..=10 {
            log::debug!("Waiting for forecast load, try {} of 10", attempt);
            if self
                .session()
                .wait_for_with(".guide-container", Duration::from_secs(2))
                .await
                .is_ok()
            {
                break;
            }
        }
        Ok(())
    }

    pub async fn goto_student_scores(&self) -> Result<()> {
        self.goto_menu_item("Student Scores").await
    }

    pub async fn goto_course_roster(&self) -> Result<()> {
        self.goto_menu_item("Course Settings and Roster").await
    }

    pub async fn goto_course_settings(&self) -> Result<()> {
        self.goto_course_roster().await
    }

    // ===== ROSTER =====

    /// Add a section to the course roster
    pub async fn add_course_section(&self, section_name: &str) -> Result<()> {
        log::info!("Adding course section {:?}", section_name);
        if !self.current_url().await?.contains("settings") {
            self.goto_course_roster().await?;
        }
        // The add button is only identifiable by its plus icon
        self.session()
            .js_true(
                "button > i.fa-plus",
                "(() => { \
                   const btn = Array.from(document.querySelectorAll('button')) \
                     .find(b => b.querySelector('i[class*=\"fa-plus\"]')); \
                   if (!btn) return false; \
                   btn.click(); \
                   return true; \
                 })()",
                DEFAULT_WAIT,
            )
            .await?;
        self.session()
            .type_into(
                "div[class*=\"teacher-edit-period-form\"] input[type=\"text\"]",
                section_name,
            )
            .await?;
        self.session()
            .click("button[class*=\"-edit-period-confirm\"]")
            .await
    }

    /// Read the enrollment code for a class section
    pub async fn enrollment_code(&self, section_name: &str) -> Result<String> {
        if !self.current_url().await?.contains("settings") {
            self.goto_course_roster().await?;
        }
        self.session().click_by_text("a", section_name).await?;
        self.session().click(".show-enrollment-code").await?;
        tokio::time::sleep(Duration::from_secs(1)).await;
        let code = self.session().inner_text(".code").await?;
        Ok(code.trim().to_string())
    }

    // ===== BOOK CONTENT =====

    /// Scrape the list of book section numbers from a reading form's chooser
    pub async fn book_sections(&self) -> Result<Vec<String>> {
        log::info!("Retrieving the book section list");
        self.goto_calendar().await?;
        let flow = AssignmentFlow::new(self.session());
        flow.open_assignment_menu().await?;
        self.session().click_by_text("a", "Add Reading").await?;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let selector = self.session().wait_for("#reading-select").await?;
        self.session().scroll_to(&selector).await?;
        tokio::time::sleep(Duration::from_secs(1)).await;
        selector.click().await?;

        // Expand every collapsed chapter before reading the section spans
        for chapter in self.session().find_all("div.chapter-heading > a").await? {
            if chapter.attribute("aria-expanded").await?.as_deref() != Some("true") {
                self.session().scroll_to(&chapter).await?;
                tokio::time::sleep(Duration::from_millis(250)).await;
                chapter.click().await?;
            }
        }

        let mut sections = Vec::new();
        for span in self
            .session()
            .find_all("div.section span.chapter-section")
            .await?
        {
            if let Some(text) = span.inner_text().await? {
                sections.push(text.trim().to_string());
            }
        }
        log::debug!("Section options: {}", sections.join(" "));
        self.goto_calendar().await?;
        Ok(sections)
    }

    // ===== CALENDAR ROTATION =====

    /// Month and year currently shown by the calendar header
    pub async fn calendar_month_year(&self) -> Result<(u32, i32)> {
        let heading = self.session().wait_for("div.calendar-header-label").await?;
        self.session().scroll_to(&heading).await?;
        let text = heading.inner_text().await?.unwrap_or_default();
        datepicker::parse_month_year(text.trim())
    }

    /// Rotate the teacher calendar to the month holding `target`
    /// (`MM/DD/YYYY`), one caret click per month in either direction
    pub async fn rotate_calendar(&self, target: &str) -> Result<()> {
        use chrono::Datelike;

        let date = datepicker::parse_mdy(target)?;
        let (mut month, mut year) = self.calendar_month_year().await?;
        let initial = datepicker::month_delta(month, year, date.month(), date.year());
        let mut budget = initial.unsigned_abs() + 24;

        loop {
            let delta = datepicker::month_delta(month, year, date.month(), date.year());
            if delta == 0 {
                return Ok(());
            }
            if budget == 0 {
                return Err(HelperError::Other(format!(
                    "Calendar never reached {} (stuck at {}/{})",
                    target, month, year
                )));
            }
            budget -= 1;

            let caret = if delta > 0 {
                ".fa-caret-right"
            } else {
                ".fa-caret-left"
            };
            self.session().click(caret).await?;
            tokio::time::sleep(Duration::from_millis(200)).await;
            let (m, y) = self.calendar_month_year().await?;
            month = m;
            year = y;
        }
    }
}

impl Deref for Teacher {
    type Target = User;

    fn deref(&self) -> &User {
        &self.user
    }
}

impl DerefMut for Teacher {
    fn deref_mut(&mut self) -> &mut User {
        &mut self.user
    }
}
