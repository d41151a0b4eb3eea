//! JSON test plans.
//!
//! A plan file names a sequence of assignment operations to run against a
//! logged-in teacher session, so unattended runs can be driven by data
//! instead of code. Execution stops at the first failed step and the whole
//! run is summarized in a [`PlanReport`].

use crate::assignment::{AssignmentSpec, Breakpoint};
use crate::error::{HelperError, Result};
use crate::user::Teacher;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

/// A named sequence of assignment operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestPlan {
    /// Unique plan name (lowercase-hyphenated)
    pub name: String,

    /// Human-readable description of what this plan exercises
    pub description: String,

    /// Plan creation timestamp (ISO 8601)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    /// Author of the plan
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Tags for categorization
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Steps to execute, in order
    pub steps: Vec<PlanStep>,
}

/// One assignment operation within a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    /// Which workflow to run
    pub action: PlanAction,

    /// The assignment the workflow operates on
    pub assignment: AssignmentSpec,

    /// Optional: halt the workflow at this checkpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakpoint: Option<Breakpoint>,

    /// Optional: note on what this step verifies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanAction {
    Add,
    Edit,
    Delete,
}

/// Result of executing a single plan step
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    /// Step number (1-indexed)
    pub step: usize,

    /// Action that was executed
    pub action: PlanAction,

    /// Title of the assignment the step targeted
    pub title: String,

    /// Execution status
    pub status: StepStatus,

    /// How long the step took
    pub duration: Duration,

    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failed,
    Skipped,
}

/// Complete report of a plan run
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    /// Name of the plan that was executed
    pub plan_name: String,

    /// Total number of steps in the plan
    pub total_steps: usize,

    /// Number of successful steps
    pub successful: usize,

    /// Number of failed steps
    pub failed: usize,

    /// Number of skipped steps
    pub skipped: usize,

    /// Total execution time
    pub total_duration: Duration,

    /// Individual step results
    pub results: Vec<StepResult>,
}

impl TestPlan {
    /// Load a plan from a JSON file
    pub async fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let plan: TestPlan = serde_json::from_str(&content)?;
        Ok(plan)
    }

    /// Save this plan to a JSON file
    pub async fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate plan structure before running anything
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(HelperError::InvalidPlan("Plan name cannot be empty".into()));
        }
        if self.steps.is_empty() {
            return Err(HelperError::InvalidPlan(
                "Plan must contain at least one step".into(),
            ));
        }
        for (i, step) in self.steps.iter().enumerate() {
            let check = match step.action {
                // Adds build the full form, so the spec must be complete;
                // edits and deletes only locate an existing assignment
                PlanAction::Add => step.assignment.validate(),
                PlanAction::Edit | PlanAction::Delete => step.assignment.validate_base(),
            };
            check.map_err(|e| {
                HelperError::InvalidPlan(format!("Step {}: {}", i + 1, e))
            })?;
        }
        Ok(())
    }
}

impl PlanReport {
    pub fn new(plan_name: String, total_steps: usize) -> Self {
        Self {
            plan_name,
            total_steps,
            successful: 0,
            failed: 0,
            skipped: 0,
            total_duration: Duration::from_secs(0),
            results: Vec::with_capacity(total_steps),
        }
    }

    /// Add a step result and update counters
    pub fn add_result(&mut self, result: StepResult) {
        self.total_duration += result.duration;

        match result.status {
            StepStatus::Success => self.successful += 1,
            StepStatus::Failed => self.failed += 1,
            StepStatus::Skipped => self.skipped += 1,
        }

        self.results.push(result);
    }

    /// Whether every step ran and succeeded
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.successful == self.total_steps
    }

    /// Success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        (self.successful as f64 / self.total_steps as f64) * 100.0
    }
}

/// Runs a plan's steps against a logged-in teacher session
pub struct PlanRunner<'a> {
    teacher: &'a Teacher,
}

impl<'a> PlanRunner<'a> {
    pub fn new(teacher: &'a Teacher) -> Self {
        Self { teacher }
    }

    /// Execute every step in order, stopping at the first failure
    pub async fn run(&self, plan: &TestPlan) -> Result<PlanReport> {
        plan.validate()?;

        let mut report = PlanReport::new(plan.name.clone(), plan.steps.len());

        for (i, step) in plan.steps.iter().enumerate() {
            let number = i + 1;
            log::info!(
                "Step {}/{}: {:?} {:?}",
                number,
                plan.steps.len(),
                step.action,
                step.assignment.title
            );
            let start = Instant::now();

            match self.run_step(step).await {
                Ok(()) => report.add_result(StepResult {
                    step: number,
                    action: step.action,
                    title: step.assignment.title.clone(),
                    status: StepStatus::Success,
                    duration: start.elapsed(),
                    error: None,
                }),
                Err(e) => {
                    report.add_result(StepResult {
                        step: number,
                        action: step.action,
                        title: step.assignment.title.clone(),
                        status: StepStatus::Failed,
                        duration: start.elapsed(),
                        error: Some(e.to_string()),
                    });

                    // A failed step leaves the UI in an unknown state, so
                    // later steps would only cascade
                    break;
                }
            }
        }

        Ok(report)
    }

    async fn run_step(&self, step: &PlanStep) -> Result<()> {
        match (step.action, step.breakpoint) {
            (PlanAction::Add, None) => self.teacher.add_assignment(&step.assignment).await,
            (PlanAction::Add, Some(tag)) => {
                self.teacher
                    .add_assignment_until(&step.assignment, tag)
                    .await
            }
            (PlanAction::Edit, _) => self.teacher.change_assignment(&step.assignment).await,
            (PlanAction::Delete, _) => self.teacher.delete_assignment(&step.assignment).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::{AssignmentKind, When};

    fn event_spec(title: &str) -> AssignmentSpec {
        AssignmentSpec::new(AssignmentKind::Event, title).period(
            "1st",
            When::Date("2/12/2017".into()),
            When::Date("2/17/2017".into()),
        )
    }

    #[test]
    fn test_plan_validation() {
        let mut plan = TestPlan {
            name: "smoke".to_string(),
            description: "Calendar smoke test".to_string(),
            created: None,
            author: None,
            tags: vec![],
            steps: vec![],
        };

        // Empty steps should fail
        assert!(plan.validate().is_err());

        plan.steps.push(PlanStep {
            action: PlanAction::Add,
            assignment: event_spec("Quiz day"),
            breakpoint: None,
            note: None,
        });
        assert!(plan.validate().is_ok());

        // An incomplete add (homework with no problems) should fail...
        plan.steps.push(PlanStep {
            action: PlanAction::Add,
            assignment: AssignmentSpec::new(AssignmentKind::Homework, "HW").period(
                "1st",
                When::Date("2/12/2017".into()),
                When::Date("2/17/2017".into()),
            ),
            breakpoint: None,
            note: None,
        });
        assert!(plan.validate().is_err());

        // ...but the same spec is enough to delete by
        plan.steps.last_mut().unwrap().action = PlanAction::Delete;
        assert!(plan.validate().is_ok());

        plan.name.clear();
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_plan_report_counters() {
        let mut report = PlanReport::new("smoke".to_string(), 3);

        report.add_result(StepResult {
            step: 1,
            action: PlanAction::Add,
            title: "Quiz day".to_string(),
            status: StepStatus::Success,
            duration: Duration::from_millis(100),
            error: None,
        });

        report.add_result(StepResult {
            step: 2,
            action: PlanAction::Delete,
            title: "Quiz day".to_string(),
            status: StepStatus::Failed,
            duration: Duration::from_millis(50),
            error: Some("Element not found".to_string()),
        });

        assert_eq!(report.successful, 1);
        assert_eq!(report.failed, 1);
        assert!(!report.is_success());
        assert_eq!(report.total_duration, Duration::from_millis(150));

        let success_rate = report.success_rate();
        assert!((success_rate - 33.333333333333336).abs() < 0.0001);
    }

    #[test]
    fn test_plan_json_round_trip() {
        let plan = TestPlan {
            name: "breakpoints".to_string(),
            description: "Halt a reading flow at the period step".to_string(),
            created: Some("2017-02-10T00:00:00Z".to_string()),
            author: None,
            tags: vec!["reading".to_string()],
            steps: vec![PlanStep {
                action: PlanAction::Add,
                assignment: event_spec("Checkpoint"),
                breakpoint: Some(Breakpoint::Period),
                note: Some("title and description only".to_string()),
            }],
        };

        let json = serde_json::to_string_pretty(&plan).unwrap();
        let back: TestPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, plan.name);
        assert_eq!(back.steps.len(), 1);
        assert_eq!(back.steps[0].breakpoint, Some(Breakpoint::Period));
        assert_eq!(back.steps[0].action, PlanAction::Add);
    }
}
