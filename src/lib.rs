pub mod assignment;
pub mod browser;
pub mod config;
pub mod error;
pub mod plan;
pub mod user;

//  Re-export commonly used items
pub use assignment::{
    AssignmentFlow, AssignmentKind, AssignmentSpec, Breakpoint, Catalog, Feedback, PeriodMap,
    ProblemSelector, ProblemSet, Status, When,
};
pub use browser::{ChromeSession, ConnectionMode};
pub use config::{BrowserKind, Credentials, Role};
pub use error::HelperError;
pub use plan::{PlanAction, PlanReport, PlanRunner, PlanStep, StepResult, StepStatus, TestPlan};
pub use user::{Admin, ContentReviewer, Student, Teacher, User};
