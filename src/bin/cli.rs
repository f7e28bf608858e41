use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use backoffice::auth::{self, AuthCoordinator, LoggingNavigator};
use backoffice::config::{ClientConfig, HOME_ROUTE, LOGIN_ROUTE};
use backoffice::health::{check_backend_health, wait_for_backend};
use backoffice::manager::{AssumeYes, Manager, Prompter, StatusFilter};
use backoffice::models::{
    ClientDraft, ClientProjects, ClientStatus, Clients, ProjectDraft, ProjectStatus,
    TestimonialDraft, TestimonialStatus, Testimonials,
};
use backoffice::{ApiError, CrudService, FileTokenStore, HttpClient, Resource, ResourceService};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "backoffice")]
#[command(about = "Admin console for testimonials, clients and client projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend URL; overrides BACKOFFICE_BACKEND_URL
    #[arg(long, global = true)]
    url: Option<String>,

    /// Origin relative backend URLs resolve against; overrides BACKOFFICE_ORIGIN
    #[arg(long, global = true)]
    origin: Option<String>,

    #[arg(long, global = true)]
    token_file: Option<PathBuf>,

    /// Answer yes to every confirmation
    #[arg(short, long, global = true)]
    yes: bool,

    #[arg(long, global = true)]
    log_json: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    Login {
        #[arg(short, long)]
        username: String,
        /// Read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    Logout,
    /// Store an already issued token
    Token { token: String },
    Health {
        /// Retry up to this many times, 2s apart
        #[arg(short, long, default_value_t = 1)]
        attempts: u32,
    },
    #[command(subcommand)]
    Testimonials(TestimonialCommand),
    #[command(subcommand)]
    Clients(ClientCommand),
    #[command(subcommand)]
    Projects(ProjectCommand),
}

#[derive(Subcommand)]
enum TestimonialCommand {
    List {
        #[arg(short, long, default_value = "all")]
        status: StatusFilter<TestimonialStatus>,
    },
    Add(TestimonialFields),
    Edit {
        id: String,
        #[command(flatten)]
        fields: TestimonialFields,
    },
    Delete { id: String },
    Approve { id: String },
    Reject { id: String },
}

#[derive(Args)]
struct TestimonialFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    message: Option<String>,
    #[arg(long)]
    role: Option<String>,
    #[arg(long)]
    company: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    rating: Option<u8>,
    #[arg(long)]
    image: Option<String>,
    #[arg(long)]
    status: Option<TestimonialStatus>,
}

impl TestimonialFields {
    fn apply(self, draft: &mut TestimonialDraft) {
        set(&mut draft.name, self.name);
        set(&mut draft.message, self.message);
        set(&mut draft.role, self.role);
        set(&mut draft.company, self.company);
        set(&mut draft.email, self.email);
        set(&mut draft.rating, self.rating);
        set(&mut draft.image, self.image);
        set(&mut draft.status, self.status);
    }
}

#[derive(Subcommand)]
enum ClientCommand {
    List {
        #[arg(short, long, default_value = "all")]
        status: StatusFilter<ClientStatus>,
    },
    Add(ClientFields),
    Edit {
        id: String,
        #[command(flatten)]
        fields: ClientFields,
    },
    Delete { id: String },
    Activate { id: String },
    Deactivate { id: String },
    /// Projects assigned to a client
    Projects { id: String },
}

#[derive(Args)]
struct ClientFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    company: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    status: Option<ClientStatus>,
}

impl ClientFields {
    fn apply(self, draft: &mut ClientDraft) {
        set(&mut draft.name, self.name);
        set(&mut draft.email, self.email);
        set(&mut draft.company, self.company);
        set(&mut draft.phone, self.phone);
        set(&mut draft.status, self.status);
    }
}

#[derive(Subcommand)]
enum ProjectCommand {
    List {
        #[arg(short, long, default_value = "all")]
        status: StatusFilter<ProjectStatus>,
    },
    Add(ProjectFields),
    Edit {
        id: String,
        #[command(flatten)]
        fields: ProjectFields,
    },
    Delete { id: String },
    /// Quick status change
    Status { id: String, status: ProjectStatus },
    Progress { id: String, progress: u8 },
    Upload { id: String, file: PathBuf },
    RemoveFile { id: String, file_id: String },
}

#[derive(Args)]
struct ProjectFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long = "client")]
    client_id: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    status: Option<ProjectStatus>,
    #[arg(long)]
    progress: Option<u8>,
    /// Expected delivery, YYYY-MM-DD
    #[arg(long)]
    due: Option<NaiveDate>,
    #[arg(long)]
    notes: Option<String>,
}

impl ProjectFields {
    fn apply(self, draft: &mut ProjectDraft) {
        set(&mut draft.name, self.name);
        set(&mut draft.client_id, self.client_id);
        set(&mut draft.description, self.description);
        set(&mut draft.status, self.status);
        if let Some(progress) = self.progress {
            draft.set_progress(progress);
        }
        if self.due.is_some() {
            draft.expected_delivery = self.due;
        }
        set(&mut draft.notes, self.notes);
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// Asks on stdin, prints outcomes on stdout.
struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn confirm(&self, message: &str) -> bool {
        print!("{} [y/N] ", message);
        let _ = io::stdout().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }

    fn acknowledge(&self, message: &str) {
        println!("{}", message);
    }
}

fn init_tracing(json: bool, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (writer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("backoffice.log"));
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(io::stderr), None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    guard
}

/// `id  status  label` line for any resource.
fn row<R: Resource>(record: &R::Record) -> String {
    format!("{:<26} {:<12} {}", R::id(record), R::status(record), R::label(record))
}

async fn list<R, S>(
    manager: &mut Manager<R, S>,
    filter: StatusFilter<R::Status>,
) -> Result<(), ApiError>
where
    R: Resource,
    S: CrudService<R>,
{
    manager.mount().await?;
    manager.set_filter(filter);
    for record in manager.visible() {
        println!("{}", row::<R>(record));
    }
    println!("{}", manager.counts());
    Ok(())
}

/// Create (no id) or edit (id) through the manager's modal draft.
async fn save<R, S>(
    manager: &mut Manager<R, S>,
    id: Option<&str>,
    edit: impl FnOnce(&mut R::Draft),
) -> Result<(), ApiError>
where
    R: Resource,
    S: CrudService<R>,
{
    manager.mount().await?;
    match id {
        Some(id) => {
            if !manager.open_edit(id) {
                return Err(not_found::<R>(id));
            }
        }
        None => manager.open_create(),
    }
    if let Some(draft) = manager.draft_mut() {
        edit(draft);
    }
    manager.submit().await?;
    Ok(())
}

async fn delete<R, S>(manager: &mut Manager<R, S>, id: &str) -> Result<(), ApiError>
where
    R: Resource,
    S: CrudService<R>,
{
    manager.mount().await?;
    manager.request_delete(id).await?;
    Ok(())
}

async fn transition<R, S>(
    manager: &mut Manager<R, S>,
    id: &str,
    status: R::Status,
) -> Result<(), ApiError>
where
    R: Resource,
    S: CrudService<R>,
{
    manager.mount().await?;
    if manager.find(id).is_none() {
        return Err(not_found::<R>(id));
    }
    manager.transition(id, status).await?;
    Ok(())
}

fn not_found<R: Resource>(id: &str) -> ApiError {
    ApiError::Http {
        status: 404,
        body: format!("{} {} not found", R::NAME, id),
    }
}

fn read_password() -> Result<String, ApiError> {
    print!("Password: ");
    let _ = io::stdout().flush();
    let mut password = String::new();
    io::stdin()
        .lock()
        .read_line(&mut password)
        .map_err(|e| ApiError::config(format!("failed to read password: {}", e)))?;
    Ok(password.trim_end_matches(['\r', '\n']).to_string())
}

async fn run(cli: Cli, http: Arc<HttpClient>, prompter: Arc<dyn Prompter>) -> Result<(), ApiError> {
    match cli.command {
        Commands::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => read_password()?,
            };
            auth::login(&http, &username, &password).await?;
            println!("Logged in as {}", username);
        }
        Commands::Logout => {
            http.auth().logout()?;
            println!("Logged out (token removed).");
        }
        Commands::Token { token } => {
            http.auth().sign_in(&token)?;
            println!("Token stored.");
        }
        Commands::Health { attempts } => {
            let healthy = if attempts > 1 {
                wait_for_backend(&http, attempts, Duration::from_secs(2)).await
            } else {
                check_backend_health(&http).await
            };
            if !healthy {
                return Err(ApiError::network());
            }
            println!("Backend at {} is healthy", http.base_url());
        }
        Commands::Testimonials(command) => {
            let service = ResourceService::<Testimonials>::new(http.clone());
            let mut manager = Manager::new(service, prompter);
            match command {
                TestimonialCommand::List { status } => list(&mut manager, status).await?,
                TestimonialCommand::Add(fields) => {
                    save(&mut manager, None, |d| fields.apply(d)).await?
                }
                TestimonialCommand::Edit { id, fields } => {
                    save(&mut manager, Some(&id), |d| fields.apply(d)).await?
                }
                TestimonialCommand::Delete { id } => delete(&mut manager, &id).await?,
                TestimonialCommand::Approve { id } => {
                    transition(&mut manager, &id, TestimonialStatus::Approved).await?
                }
                TestimonialCommand::Reject { id } => {
                    transition(&mut manager, &id, TestimonialStatus::Rejected).await?
                }
            }
        }
        Commands::Clients(command) => {
            let service = ResourceService::<Clients>::new(http.clone());
            let mut manager = Manager::new(service, prompter);
            match command {
                ClientCommand::List { status } => list(&mut manager, status).await?,
                ClientCommand::Add(fields) => save(&mut manager, None, |d| fields.apply(d)).await?,
                ClientCommand::Edit { id, fields } => {
                    save(&mut manager, Some(&id), |d| fields.apply(d)).await?
                }
                ClientCommand::Delete { id } => delete(&mut manager, &id).await?,
                ClientCommand::Activate { id } => {
                    transition(&mut manager, &id, ClientStatus::Active).await?
                }
                ClientCommand::Deactivate { id } => {
                    transition(&mut manager, &id, ClientStatus::Inactive).await?
                }
                ClientCommand::Projects { id } => {
                    let projects = manager.service().projects(&id).await?;
                    for project in &projects {
                        println!("{}  {}%", row::<ClientProjects>(project), project.progress);
                    }
                    println!("{} projects", projects.len());
                }
            }
        }
        Commands::Projects(command) => {
            let service = ResourceService::<ClientProjects>::new(http.clone());
            let mut manager = Manager::new(service, prompter);
            match command {
                ProjectCommand::List { status } => list(&mut manager, status).await?,
                ProjectCommand::Add(fields) => save(&mut manager, None, |d| fields.apply(d)).await?,
                ProjectCommand::Edit { id, fields } => {
                    save(&mut manager, Some(&id), |d| fields.apply(d)).await?
                }
                ProjectCommand::Delete { id } => delete(&mut manager, &id).await?,
                ProjectCommand::Status { id, status } => {
                    transition(&mut manager, &id, status).await?
                }
                ProjectCommand::Progress { id, progress } => {
                    save(&mut manager, Some(&id), |d| d.set_progress(progress)).await?
                }
                ProjectCommand::Upload { id, file } => {
                    let bytes = tokio::fs::read(&file).await.map_err(|e| {
                        ApiError::config(format!("failed to read {}: {}", file.display(), e))
                    })?;
                    let name = file
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "upload".to_string());
                    let uploaded = manager.service().upload_file(&id, &name, bytes).await?;
                    println!("{} ({})", uploaded.message, uploaded.id);
                }
                ProjectCommand::RemoveFile { id, file_id } => {
                    manager.service().delete_file(&id, &file_id).await?;
                    println!("File {} removed", file_id);
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let guard = init_tracing(cli.log_json, cli.log_file.as_deref());

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.url.clone() {
        config.backend_url = Some(url);
    }
    if let Some(origin) = cli.origin.clone() {
        config.origin = origin;
    }
    if let Some(path) = cli.token_file.clone() {
        config.token_file = path;
    }

    // A failed login must not trigger the session-expired redirect
    let route = match cli.command {
        Commands::Login { .. } => LOGIN_ROUTE,
        _ => HOME_ROUTE,
    };
    let navigator = Arc::new(LoggingNavigator::new(route));
    let store = Arc::new(FileTokenStore::new(config.token_file.clone()));
    let auth = AuthCoordinator::new(store, navigator.clone())
        .with_login_route(config.login_route.clone())
        .with_redirect_delay(config.redirect_delay);
    let http = Arc::new(HttpClient::new(&config, Arc::new(auth))?);

    let prompter: Arc<dyn Prompter> = if cli.yes {
        Arc::new(AssumeYes)
    } else {
        Arc::new(StdinPrompter)
    };

    let result = run(cli, http, prompter).await;
    if !navigator.redirects().is_empty() {
        println!("Session expired. Run `backoffice login` to sign in again.");
    }
    if let Err(err) = result {
        error!("{}", err);
        drop(guard);
        std::process::exit(1);
    }
    Ok(())
}
