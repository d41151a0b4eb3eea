//! Assignment create/edit/delete workflows.
//!
//! Each workflow is a fixed sequence of form-filling steps against the
//! assignment builder UI, with an optional breakpoint that halts the flow
//! right before a named step so a test can inspect partial form state.

pub mod datepicker;
pub mod periods;
pub mod problems;
pub mod sections;

use crate::browser::dom::DEFAULT_WAIT;
use crate::browser::ChromeSession;
use crate::error::{HelperError, Result};
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub use problems::{Catalog, ProblemSelector, ProblemSet};

/// Sentinel period key applying one schedule to every period
pub const ALL_PERIODS: &str = "all";

/// Reserved problem-set key for the adaptive-selection count
pub const TUTOR_KEY: &str = "tutor";

/// Deadline for an assignment form to finish rendering
const FORM_WAIT: Duration = Duration::from_secs(45);

/// The four assignment types the builder UI offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentKind {
    Reading,
    Homework,
    External,
    Event,
}

impl AssignmentKind {
    /// Label of the sidebar menu entry that opens this kind's form
    pub fn menu_label(&self) -> &'static str {
        match self {
            AssignmentKind::Reading => "Add Reading",
            AssignmentKind::Homework => "Add Homework",
            AssignmentKind::External => "Add External Assignment",
            AssignmentKind::Event => "Add Event",
        }
    }
}

/// Terminal action applied to a completed form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Publish,
    #[default]
    Draft,
    Cancel,
    Delete,
}

/// When students see homework feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Feedback {
    #[default]
    #[serde(rename = "immediate")]
    Immediate,
    #[serde(rename = "due_at")]
    OnDueDate,
}

impl Feedback {
    fn option_value(&self) -> &'static str {
        match self {
            Feedback::Immediate => "immediate",
            Feedback::OnDueDate => "due_at",
        }
    }
}

/// Named checkpoints a workflow can halt at, in flow order.
///
/// A workflow handed `Some(breakpoint)` returns right before performing the
/// tagged step, leaving every later form field untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Title,
    Description,
    Period,
    Section,
    Reading,
    Exercise,
    Url,
    Status,
}

/// One side of a period schedule: a bare `MM/DD/YYYY` date, or a date with
/// a wall-clock time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum When {
    Date(String),
    DateTime(String, String),
}

impl When {
    pub fn date(&self) -> &str {
        match self {
            When::Date(date) => date,
            When::DateTime(date, _) => date,
        }
    }

    pub fn time(&self) -> Option<&str> {
        match self {
            When::Date(_) => None,
            When::DateTime(_, time) => Some(time),
        }
    }
}

/// Period name (or `"all"`) mapped to its (open, close) schedule
pub type PeriodMap = BTreeMap<String, (When, When)>;

/// Everything needed to drive one assignment through the builder UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentSpec {
    pub kind: AssignmentKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub periods: PeriodMap,
    /// Chapter/section keys for reading assignments (`ch1`, `1.2`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub readings: Vec<String>,
    /// Problem selection for homework assignments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problems: Option<ProblemSet>,
    /// Destination for external assignments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub feedback: Feedback,
}

impl AssignmentSpec {
    pub fn new(kind: AssignmentKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            description: String::new(),
            periods: PeriodMap::new(),
            readings: Vec::new(),
            problems: None,
            url: None,
            status: Status::default(),
            feedback: Feedback::default(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn period(mut self, name: impl Into<String>, open: When, close: When) -> Self {
        self.periods.insert(name.into(), (open, close));
        self
    }

    pub fn periods(mut self, periods: PeriodMap) -> Self {
        self.periods = periods;
        self
    }

    pub fn readings(mut self, readings: Vec<String>) -> Self {
        self.readings = readings;
        self
    }

    pub fn problems(mut self, problems: ProblemSet) -> Self {
        self.problems = Some(problems);
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn feedback(mut self, feedback: Feedback) -> Self {
        self.feedback = feedback;
        self
    }

    /// Check the fields every workflow needs: a title and a parseable
    /// period schedule. Enough for edit/delete, which locate an existing
    /// assignment rather than build one.
    pub fn validate_base(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(HelperError::InvalidPlan("Assignment title is empty".into()));
        }
        if self.periods.is_empty() {
            return Err(HelperError::InvalidPlan(format!(
                "Assignment {:?} has no period schedule",
                self.title
            )));
        }
        for (open, close) in self.periods.values() {
            datepicker::parse_mdy(open.date())?;
            datepicker::parse_mdy(close.date())?;
        }
        Ok(())
    }

    /// Check the spec is internally consistent for its kind
    pub fn validate(&self) -> Result<()> {
        self.validate_base()?;
        match self.kind {
            AssignmentKind::Reading if self.readings.is_empty() => Err(HelperError::InvalidPlan(
                format!("Reading {:?} selects no chapters or sections", self.title),
            )),
            AssignmentKind::Homework if self.problems.is_none() => Err(HelperError::InvalidPlan(
                format!("Homework {:?} has no problem selection", self.title),
            )),
            AssignmentKind::External if self.url.is_none() => Err(HelperError::InvalidPlan(
                format!("External assignment {:?} has no URL", self.title),
            )),
            _ => Ok(()),
        }
    }
}

/// Drives assignment workflows over one browser session
pub struct AssignmentFlow<'a> {
    session: &'a ChromeSession,
}

impl<'a> AssignmentFlow<'a> {
    pub fn new(session: &'a ChromeSession) -> Self {
        Self { session }
    }

    /// Create an assignment, walking the full form flow for its kind
    pub async fn add(&self, spec: &AssignmentSpec) -> Result<()> {
        self.add_until(spec, None).await
    }

    /// Create an assignment, halting before the `breakpoint` step when given
    pub async fn add_until(
        &self,
        spec: &AssignmentSpec,
        breakpoint: Option<Breakpoint>,
    ) -> Result<()> {
        match spec.kind {
            AssignmentKind::Reading => self.add_reading(spec, breakpoint).await,
            AssignmentKind::Homework => self.add_homework(spec, breakpoint).await,
            AssignmentKind::External => self.add_external(spec, breakpoint).await,
            AssignmentKind::Event => self.add_event(spec, breakpoint).await,
        }
    }

    /// Re-open an existing assignment from the calendar and rewrite its
    /// common fields, then apply the requested status
    pub async fn edit(&self, spec: &AssignmentSpec) -> Result<()> {
        self.edit_until(spec, None).await
    }

    pub async fn edit_until(
        &self,
        spec: &AssignmentSpec,
        breakpoint: Option<Breakpoint>,
    ) -> Result<()> {
        log::info!("Editing assignment {:?}", spec.title);
        self.open_from_calendar(spec).await?;
        self.session
            .wait_for_with("#reading-title", FORM_WAIT)
            .await?;

        if breakpoint == Some(Breakpoint::Title) {
            return Ok(());
        }
        self.session.type_into("#reading-title", &spec.title).await?;
        if breakpoint == Some(Breakpoint::Description) {
            return Ok(());
        }
        self.session
            .type_into(DESCRIPTION_INPUT, &spec.description)
            .await?;
        if breakpoint == Some(Breakpoint::Period) {
            return Ok(());
        }
        if !spec.periods.is_empty() {
            periods::assign_periods(self.session, &spec.periods).await?;
        }
        if breakpoint == Some(Breakpoint::Status) {
            return Ok(());
        }
        self.select_status(spec.status).await
    }

    /// Delete an assignment from the calendar month that holds its due date
    pub async fn delete(&self, spec: &AssignmentSpec) -> Result<()> {
        log::info!("Deleting assignment {:?}", spec.title);
        self.open_from_calendar(spec).await?;
        self.session.click(".delete-link").await?;
        self.session
            .click_by_text("div.controls button", "Yes")
            .await?;
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(())
    }

    /// Open the Add Assignment sidebar menu if it is closed.
    ///
    /// The toggle has no open/closed attribute; the open state shows as a
    /// gray background.
    pub async fn open_assignment_menu(&self) -> Result<()> {
        log::debug!("Opening the assignment menu");
        self.session.wait_for("button.sidebar-toggle").await?;
        let state: String = self
            .session
            .execute_script_typed(
                "(() => { \
                   const btn = document.querySelector('button.sidebar-toggle'); \
                   if (!btn) return 'missing'; \
                   btn.scrollIntoView({ block: 'center' }); \
                   const color = getComputedStyle(btn).backgroundColor.replace(/\\s+/g, ''); \
                   if (color === 'rgba(153,153,153,1)' || color === 'rgb(153,153,153)') return 'open'; \
                   btn.click(); \
                   return 'opened'; \
                 })()",
            )
            .await?;
        log::debug!("Assignment menu: {}", state);
        Ok(())
    }

    // ===== PER-KIND ADD FLOWS =====

    async fn add_reading(&self, spec: &AssignmentSpec, breakpoint: Option<Breakpoint>) -> Result<()> {
        log::info!("Creating reading {:?}", spec.title);
        self.open_form(AssignmentKind::Reading).await?;
        self.session
            .wait_for_with("#reading-title", FORM_WAIT)
            .await?;

        if breakpoint == Some(Breakpoint::Title) {
            return Ok(());
        }
        self.session.type_into("#reading-title", &spec.title).await?;
        if breakpoint == Some(Breakpoint::Description) {
            return Ok(());
        }
        self.session
            .type_into(DESCRIPTION_INPUT, &spec.description)
            .await?;
        if breakpoint == Some(Breakpoint::Period) {
            return Ok(());
        }
        periods::assign_periods(self.session, &spec.periods).await?;

        log::debug!("Setting the reading section list");
        self.session.click("#reading-select").await?;
        self.session.wait_for("div[class*=\"reading-plan\"]").await?;
        if breakpoint == Some(Breakpoint::Section) {
            return Ok(());
        }
        sections::select_sections(self.session, spec.readings.iter().map(String::as_str)).await?;
        if breakpoint == Some(Breakpoint::Reading) {
            return Ok(());
        }
        self.session.click_by_text("button", "Add Readings").await?;
        self.session.wait_for("button[class*=\"-publish\"]").await?;
        if breakpoint == Some(Breakpoint::Status) {
            return Ok(());
        }
        self.select_status(spec.status).await
    }

    async fn add_homework(
        &self,
        spec: &AssignmentSpec,
        breakpoint: Option<Breakpoint>,
    ) -> Result<()> {
        log::info!("Creating homework {:?}", spec.title);
        self.open_form(AssignmentKind::Homework).await?;
        self.session
            .wait_for_with("div[class*=\"homework-plan\"]", FORM_WAIT)
            .await?;

        if breakpoint == Some(Breakpoint::Title) {
            return Ok(());
        }
        self.session.type_into("#reading-title", &spec.title).await?;
        if breakpoint == Some(Breakpoint::Description) {
            return Ok(());
        }
        self.session
            .type_into(DESCRIPTION_INPUT, &spec.description)
            .await?;
        if breakpoint == Some(Breakpoint::Period) {
            return Ok(());
        }
        periods::assign_periods(self.session, &spec.periods).await?;
        if breakpoint == Some(Breakpoint::Exercise) {
            return Ok(());
        }
        let problem_set = spec.problems.clone().unwrap_or_default();
        // StdRng keeps the flow future Send, unlike thread_rng
        let mut rng = rand::rngs::StdRng::from_entropy();
        problems::add_homework_problems(self.session, &problem_set, &mut rng).await?;

        let feedback = self.session.wait_for("#feedback-select").await?;
        self.session.scroll_to(&feedback).await?;
        feedback.click().await?;
        self.session
            .click(&format!(
                "option[value=\"{}\"]",
                spec.feedback.option_value()
            ))
            .await?;
        if breakpoint == Some(Breakpoint::Status) {
            return Ok(());
        }
        self.select_status(spec.status).await
    }

    async fn add_external(
        &self,
        spec: &AssignmentSpec,
        breakpoint: Option<Breakpoint>,
    ) -> Result<()> {
        log::info!("Creating external assignment {:?}", spec.title);
        self.open_form(AssignmentKind::External).await?;
        self.session
            .wait_for_with("#reading-title", FORM_WAIT)
            .await?;

        if breakpoint == Some(Breakpoint::Title) {
            return Ok(());
        }
        self.session.type_into("#reading-title", &spec.title).await?;
        if breakpoint == Some(Breakpoint::Description) {
            return Ok(());
        }
        self.session
            .type_into(DESCRIPTION_INPUT, &spec.description)
            .await?;
        if breakpoint == Some(Breakpoint::Period) {
            return Ok(());
        }
        periods::assign_periods(self.session, &spec.periods).await?;
        if breakpoint == Some(Breakpoint::Url) {
            return Ok(());
        }
        let url = spec.url.as_deref().unwrap_or_default();
        self.session.type_into("#external-url", url).await?;
        self.session.wait_for("button[class*=\"-publish\"]").await?;
        if breakpoint == Some(Breakpoint::Status) {
            return Ok(());
        }
        self.select_status(spec.status).await
    }

    async fn add_event(&self, spec: &AssignmentSpec, breakpoint: Option<Breakpoint>) -> Result<()> {
        log::info!("Creating event {:?}", spec.title);
        self.open_form(AssignmentKind::Event).await?;
        self.session
            .wait_for_with("#reading-title", FORM_WAIT)
            .await?;

        if breakpoint == Some(Breakpoint::Title) {
            return Ok(());
        }
        self.session.type_into("#reading-title", &spec.title).await?;
        if breakpoint == Some(Breakpoint::Description) {
            return Ok(());
        }
        self.session
            .type_into(DESCRIPTION_INPUT, &spec.description)
            .await?;
        if breakpoint == Some(Breakpoint::Period) {
            return Ok(());
        }
        periods::assign_periods(self.session, &spec.periods).await?;
        self.session.wait_for("button[class*=\"-publish\"]").await?;
        if breakpoint == Some(Breakpoint::Status) {
            return Ok(());
        }
        self.select_status(spec.status).await
    }

    // ===== SHARED STEPS =====

    async fn open_form(&self, kind: AssignmentKind) -> Result<()> {
        self.open_assignment_menu().await?;
        self.session.click_by_text("a", kind.menu_label()).await?;
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(())
    }

    /// Apply a terminal status to the open form
    async fn select_status(&self, status: Status) -> Result<()> {
        let footer = self.session.wait_for("div[class*=\"footer\"]").await?;
        self.session.scroll_to(&footer).await?;
        tokio::time::sleep(Duration::from_secs(1)).await;
        match status {
            Status::Publish => {
                log::info!("Publishing");
                self.session.click("button[class*=\"-publish\"]").await
            }
            Status::Draft => {
                log::info!("Saving draft");
                self.session.click("button[class*=\"-save\"]").await
            }
            Status::Cancel => {
                log::info!("Canceling assignment");
                self.session
                    .click_by_text("button[type=\"button\"]", "Cancel")
                    .await?;
                // The unsaved-changes dialog only appears once fields differ
                if self
                    .session
                    .wait_for_with("button[class*=\"ok\"]", DEFAULT_WAIT)
                    .await
                    .is_ok()
                {
                    let _ = self.session.click_if_present("button[class*=\"ok\"]").await;
                } else {
                    log::debug!("No confirmation dialog after cancel");
                }
                Ok(())
            }
            Status::Delete => {
                log::info!("Deleting assignment");
                self.session
                    .click_by_text_contains("button", "Delete")
                    .await?;
                self.session.wait_for("button[class*=\"ok\"]").await?;
                self.session.click("button[class*=\"ok\"]").await
            }
        }
    }

    /// Navigate to the calendar month holding the assignment's due date and
    /// open it by its calendar label
    async fn open_from_calendar(&self, spec: &AssignmentSpec) -> Result<()> {
        self.session
            .wait_for_with("ul > a[class*=\"navbar-brand\"]", Duration::from_secs(60))
            .await?
            .click()
            .await?;
        tokio::time::sleep(Duration::from_millis(500)).await;

        let due = spec
            .periods
            .values()
            .next()
            .map(|(_, close)| close.date())
            .ok_or_else(|| {
                HelperError::InvalidPlan(format!(
                    "Assignment {:?} has no periods to locate it by",
                    spec.title
                ))
            })?;
        let date = datepicker::parse_mdy(due)?;
        let month_url = format!(
            "{}/month/{}",
            self.session.current_url().await?,
            date.format("%Y-%m-%d")
        );
        self.session.goto(&month_url).await?;

        self.session.click_closest("label", &spec.title, "a").await?;
        tokio::time::sleep(Duration::from_millis(300)).await;
        // Published assignments open a summary popover with an edit control;
        // drafts go straight to the form
        let _ = self.session.click_if_present(".-edit-assignment").await;
        Ok(())
    }
}

const DESCRIPTION_INPUT: &str =
    "div[class*=\"assignment-description\"] textarea[class*=\"form-control\"]";

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> PeriodMap {
        let mut periods = PeriodMap::new();
        periods.insert(
            "1st".to_string(),
            (
                When::Date("2/12/2017".to_string()),
                When::DateTime("2/19/2017".to_string(), "8:00 pm".to_string()),
            ),
        );
        periods
    }

    #[test]
    fn test_when_sides() {
        let bare = When::Date("2/12/2017".into());
        assert_eq!(bare.date(), "2/12/2017");
        assert_eq!(bare.time(), None);

        let timed = When::DateTime("2/19/2017".into(), "8:00 pm".into());
        assert_eq!(timed.date(), "2/19/2017");
        assert_eq!(timed.time(), Some("8:00 pm"));
    }

    #[test]
    fn test_period_map_json_shapes() {
        let json = r#"{
            "1st": ["2/12/2017", "2/17/2017"],
            "2nd": [["2/14/2017", "8:00a"], ["2/19/2017", "800p"]],
            "3rd": ["2/16/2017", ["2/21/2017", "8:00 pm"]]
        }"#;
        let periods: PeriodMap = serde_json::from_str(json).unwrap();
        assert_eq!(periods.len(), 3);
        assert_eq!(periods["1st"].0.time(), None);
        assert_eq!(periods["2nd"].0.time(), Some("8:00a"));
        assert_eq!(periods["3rd"].1.time(), Some("8:00 pm"));
        assert_eq!(periods["3rd"].0.date(), "2/16/2017");
    }

    #[test]
    fn test_spec_validation_per_kind() {
        let reading = AssignmentSpec::new(AssignmentKind::Reading, "Read ch1")
            .periods(schedule())
            .readings(vec!["ch1".to_string()]);
        assert!(reading.validate().is_ok());

        let no_sections =
            AssignmentSpec::new(AssignmentKind::Reading, "Read nothing").periods(schedule());
        assert!(no_sections.validate().is_err());

        let homework = AssignmentSpec::new(AssignmentKind::Homework, "HW 1").periods(schedule());
        assert!(homework.validate().is_err());

        let external = AssignmentSpec::new(AssignmentKind::External, "Watch this")
            .periods(schedule())
            .url("https://example.com");
        assert!(external.validate().is_ok());

        let event = AssignmentSpec::new(AssignmentKind::Event, "Quiz day").periods(schedule());
        assert!(event.validate().is_ok());

        let unscheduled = AssignmentSpec::new(AssignmentKind::Event, "Quiz day");
        assert!(unscheduled.validate().is_err());

        let bad_date = AssignmentSpec::new(AssignmentKind::Event, "Quiz day").period(
            "1st",
            When::Date("2017-02-12".into()),
            When::Date("2/17/2017".into()),
        );
        assert!(matches!(
            bad_date.validate(),
            Err(HelperError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_breakpoints_follow_flow_order() {
        assert!(Breakpoint::Title < Breakpoint::Description);
        assert!(Breakpoint::Description < Breakpoint::Period);
        assert!(Breakpoint::Period < Breakpoint::Section);
        assert!(Breakpoint::Exercise < Breakpoint::Url);
        assert!(Breakpoint::Url < Breakpoint::Status);
    }

    #[test]
    fn test_spec_json_round_trip() {
        let spec = AssignmentSpec::new(AssignmentKind::Homework, "HW 2")
            .description("Chapter one practice")
            .periods(schedule())
            .problems(ProblemSet(
                [
                    ("1.1".to_string(), ProblemSelector::All),
                    ("tutor".to_string(), ProblemSelector::First(3)),
                ]
                .into_iter()
                .collect(),
            ))
            .status(Status::Publish)
            .feedback(Feedback::OnDueDate);

        let json = serde_json::to_string_pretty(&spec).unwrap();
        let back: AssignmentSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, AssignmentKind::Homework);
        assert_eq!(back.title, spec.title);
        assert_eq!(back.status, Status::Publish);
        assert_eq!(back.feedback, Feedback::OnDueDate);
        assert_eq!(back.problems, spec.problems);
        assert_eq!(back.periods, spec.periods);
    }
}
