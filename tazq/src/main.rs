//! `tazq`: task manager command line.
//!
//! Tasks live in a local SQLite file; accounts live in a `tazq-identity`
//! service. Configuration via CLI flags, environment variables, or config
//! file (`~/.config/tazq/config.toml`).
//!
//! ```bash
//! cargo run --bin tazq -- signup --name Ann --email ann@example.com --password secret1
//! cargo run --bin tazq -- add "Buy milk" --priority high --category Personal
//! cargo run --bin tazq -- list --sort priority
//! cargo run --bin tazq -- toggle 1
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use tazq::app::App;
use tazq::config::{CliArgs, ClientConfig, Command};
use tazq::identity::{IdentityError, IdentityStore, RemoteIdentity};
use tazq::store::{SqliteTaskStore, StoreError};
use tazq::tasks::{SortOption, TaskListController};
use tazq_proto::task::{
    Priority, Task, TaskId, ValidationError, description_error, title_error,
};
use tazq_proto::user::AuthState;

type TazqApp = App<SqliteTaskStore, RemoteIdentity, RemoteIdentity>;

/// Failures that end a command.
#[derive(Debug, thiserror::Error)]
enum RunError {
    /// The task store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The identity service or session cache failed.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Edited fields do not pass validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// No task has the given id.
    #[error("no task with id {0}")]
    NoSuchTask(TaskId),

    /// A controller reported this message.
    #[error("{0}")]
    Rejected(String),

    /// A spawned intent panicked or was cancelled.
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::info!(database = %config.database_path.display(), "tazq starting");

    let result = match build_app(&config) {
        Ok(app) => {
            let command = cli.command.unwrap_or(Command::List {
                search: None,
                sort: None,
            });
            run(&app, command).await
        }
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Logs are written to a file so stdout only carries command output.
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("tazq.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

fn build_app(config: &ClientConfig) -> Result<TazqApp, RunError> {
    let store = Arc::new(SqliteTaskStore::open(&config.database_path)?);
    let remote = Arc::new(
        RemoteIdentity::new(&config.identity_url)?.with_session_file(&config.session_file)?,
    );
    let identity = Arc::new(IdentityStore::new(Arc::clone(&remote), remote));
    Ok(App::new(store, identity).with_categories(config.categories.clone()))
}

async fn run(app: &TazqApp, command: Command) -> Result<(), RunError> {
    match command {
        Command::Signup {
            name,
            email,
            password,
        } => {
            let auth = app.auth();
            auth.sign_up(&name, &email, &password).await?;
            report_auth(auth.state(), "Signed up")
        }
        Command::Signin { email, password } => {
            let auth = app.auth();
            auth.sign_in(&email, &password).await?;
            report_auth(auth.state(), "Signed in")
        }
        Command::Signout => {
            app.auth().sign_out();
            println!("Signed out");
            Ok(())
        }
        Command::Whoami => {
            match app.identity().current_user() {
                Some(user) if user.email.is_empty() => println!("{}", user.uid),
                Some(user) => println!("{} ({})", user.email, user.uid),
                None => println!("Not signed in"),
            }
            Ok(())
        }
        Command::Add {
            title,
            description,
            priority,
            category,
        } => {
            add_task(app, &title, &description, priority, category.as_deref()).await
        }
        Command::List { search, sort } => list_tasks(app, search.as_deref(), sort).await,
        Command::Toggle { id } => {
            let list = app.task_list().await?;
            let task = find_task(&list, id)?;
            list.update_task_status(&task).await?;
            finish(list).await?;
            let mark = if task.is_done { "not done" } else { "done" };
            println!("Task {id} marked {mark}");
            Ok(())
        }
        Command::Edit {
            id,
            title,
            description,
            priority,
            category,
        } => {
            let list = app.task_list().await?;
            let mut task = find_task(&list, id)?;
            if let Some(title) = title {
                task.title = title;
            }
            if let Some(description) = description {
                task.description = description;
            }
            if let Some(priority) = priority {
                task.priority = priority;
            }
            if let Some(category) = category {
                check_category(app, &category)?;
                task.category = category;
            }
            if let Some(e) =
                title_error(&task.title).or_else(|| description_error(&task.description))
            {
                return Err(e.into());
            }
            list.update_task(&task).await?;
            finish(list).await?;
            println!("Task {id} updated");
            Ok(())
        }
        Command::Delete { id } => {
            let list = app.task_list().await?;
            let task = find_task(&list, id)?;
            list.delete_task(&task).await?;
            finish(list).await?;
            println!("Task {id} deleted");
            Ok(())
        }
        Command::Categories => {
            let categories = app.categories().await?;
            let counts = categories.category_counts();
            for name in categories.categories() {
                println!("{name:<16}{}", counts.get(name).copied().unwrap_or_default());
            }
            categories.close().await;
            Ok(())
        }
    }
}

fn report_auth(state: AuthState, verb: &str) -> Result<(), RunError> {
    match state {
        AuthState::Success(user) if user.name.is_empty() => {
            println!("{verb} as {}", user.email);
            Ok(())
        }
        AuthState::Success(user) => {
            println!("{verb} as {} <{}>", user.name, user.email);
            Ok(())
        }
        AuthState::Error(message) => Err(RunError::Rejected(message)),
        AuthState::Loading | AuthState::SignedOut => Err(RunError::Rejected(
            "no answer from identity service".into(),
        )),
    }
}

async fn add_task(
    app: &TazqApp,
    title: &str,
    description: &str,
    priority: Priority,
    category: Option<&str>,
) -> Result<(), RunError> {
    let form = app.task_form();
    form.update_title(title);
    form.update_description(description);
    form.update_priority(priority);
    if let Some(category) = category {
        check_category(app, category)?;
        form.update_category(category);
    }

    let Some(submission) = form.add_task() else {
        for reason in [form.title_error_message(), form.description_error_message()]
            .into_iter()
            .flatten()
        {
            eprintln!("{reason}");
        }
        return Err(RunError::Rejected(form.state().error_message.unwrap_or_default()));
    };
    submission.await?;

    let state = form.state();
    if let Some(message) = state.error_message {
        return Err(RunError::Rejected(message));
    }
    if state.show_confirmation {
        println!("Task added");
        form.hide_confirmation();
    }
    Ok(())
}

/// Rejects categories the categories view does not know about.
fn check_category(app: &TazqApp, category: &str) -> Result<(), RunError> {
    if app.is_known_category(category) {
        return Ok(());
    }
    Err(RunError::Rejected(format!(
        "unknown category {category} (known: {})",
        app.category_names().join(", ")
    )))
}

async fn list_tasks(
    app: &TazqApp,
    search: Option<&str>,
    sort: Option<SortOption>,
) -> Result<(), RunError> {
    let list = app.task_list().await?;
    if let Some(query) = search {
        list.search_tasks(query).await;
    }
    if let Some(option) = sort {
        list.sort_tasks(option);
    }
    let state = list.state();
    list.close().await;
    if let Some(message) = state.error_message {
        return Err(RunError::Rejected(message));
    }

    if state.tasks.is_empty() {
        println!("No tasks");
        return Ok(());
    }
    for task in &state.tasks {
        println!("{}", format_task(task));
    }
    Ok(())
}

fn format_task(task: &Task) -> String {
    let created = chrono::DateTime::from_timestamp_millis(task.date_created)
        .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let mark = if task.is_done { "x" } else { " " };
    let mut line = format!(
        "{:>4} [{mark}] {:<6} {:<10} {created}  {}",
        task.id, task.priority, task.category, task.title
    );
    if !task.description.is_empty() {
        line.push_str(" - ");
        line.push_str(&task.description);
    }
    line
}

fn find_task(list: &TaskListController<SqliteTaskStore>, id: TaskId) -> Result<Task, RunError> {
    list.tasks()
        .into_iter()
        .find(|t| t.id == id)
        .ok_or(RunError::NoSuchTask(id))
}

/// Releases the list's subscription and surfaces any failed intent.
async fn finish(list: TaskListController<SqliteTaskStore>) -> Result<(), RunError> {
    let error = list.state().error_message;
    list.close().await;
    error.map_or(Ok(()), |message| Err(RunError::Rejected(message)))
}
