use clap::Parser;
use std::path::PathBuf;
use tutor_helper::{
    Admin, BrowserKind, ChromeSession, ConnectionMode, ContentReviewer, Credentials, PlanRunner,
    Role, Student, Teacher, TestPlan, User,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Role whose credentials to load from the environment
    #[arg(short, long, default_value = "teacher")]
    role: String,

    /// Browser kind (only the Chrome family is supported)
    #[arg(long, default_value = "chrome")]
    browser: String,

    /// Run headless
    #[arg(long)]
    headless: bool,

    /// Pass --no-sandbox to Chrome (Linux sandbox workaround; implied by --headless)
    #[arg(long)]
    no_sandbox: bool,

    /// Path to a Chrome binary, instead of auto-detection
    #[arg(long)]
    chrome_path: Option<String>,

    /// Attach to an existing Chrome on this debug port instead of launching
    #[arg(long)]
    debug_port: Option<u16>,

    /// Course to open after login, by its dashboard title
    #[arg(long)]
    course: Option<String>,

    /// JSON assignment plan to execute (teacher role only)
    #[arg(long)]
    plan: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Reject unsupported browsers before touching credentials
    let _kind: BrowserKind = args.browser.parse()?;
    let role: Role = args.role.parse()?;

    if args.plan.is_some() && role != Role::Teacher {
        anyhow::bail!("Assignment plans require the teacher role");
    }

    let session = build_session(&args).await?;
    let credentials = Credentials::from_env(role)?;
    let user = User::with_session(session, credentials);

    match role {
        Role::Teacher => run_teacher(Teacher::new(user), &args).await,
        Role::Student => {
            let student = Student::new(user);
            student.login().await?;
            log::info!("Student login OK at {}", student.current_url().await?);
            student.logout().await?;
            Ok(())
        }
        Role::Admin => {
            let admin = Admin::new(user);
            admin.login().await?;
            admin.goto_admin_control().await?;
            log::info!("Admin console reachable at {}", admin.current_url().await?);
            admin.logout().await?;
            Ok(())
        }
        Role::ContentReviewer => {
            let reviewer = ContentReviewer::new(user);
            reviewer.login().await?;
            log::info!("Content login OK at {}", reviewer.current_url().await?);
            reviewer.logout().await?;
            Ok(())
        }
    }
}

async fn build_session(args: &Args) -> anyhow::Result<ChromeSession> {
    let session = if let Some(port) = args.debug_port {
        ChromeSession::connect_debug_port(port).await?
    } else if args.headless || args.no_sandbox || args.chrome_path.is_some() {
        ChromeSession::new(ConnectionMode::Launch {
            chrome_path: args.chrome_path.clone(),
            no_sandbox: args.no_sandbox || args.headless,
            headless: args.headless,
        })
        .await?
    } else {
        ChromeSession::launch_auto().await?
    };
    Ok(session)
}

async fn run_teacher(teacher: Teacher, args: &Args) -> anyhow::Result<()> {
    teacher.login().await?;
    if let Some(course) = &args.course {
        teacher.select_course(course).await?;
    }

    let Some(plan_path) = &args.plan else {
        log::info!("Teacher login OK at {}", teacher.current_url().await?);
        teacher.logout().await?;
        return Ok(());
    };

    let plan = TestPlan::from_file(plan_path).await?;
    log::info!("Running plan {:?} ({} steps)", plan.name, plan.steps.len());

    let report = PlanRunner::new(&teacher).run(&plan).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_success() {
        log::error!(
            "Plan {:?} failed: {}/{} steps succeeded",
            plan.name,
            report.successful,
            report.total_steps
        );
        std::process::exit(1);
    }
    Ok(())
}
