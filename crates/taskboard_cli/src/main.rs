//! Command-line entry point for operating a task board database.
//!
//! # Responsibility
//! - Create or migrate a database and report its schema version.
//! - Print a user's daily habit digest.
//! - Dry-run the reminder dispatch to stdout.
//! - Keep `ping`/`version` probes for checking core wiring.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use taskboard_core::db::migrations::current_user_version;
use taskboard_core::logging::LoggingError;
use taskboard_core::repo::repeating_repo::SqliteRepeatingTaskRepository;
use taskboard_core::repo::user_repo::SqliteUserRepository;
use taskboard_core::service::habit_service::HabitService;
use taskboard_core::service::user_service::UserService;
use taskboard_core::{
    core_version, dispatch_reminders, init_logging_from_config, open_db, ping, ConfigError,
    CoreConfig, DbError, DispatchError, Reminder, ReminderDispatcher, RepeatingScope, RepoError,
};

#[derive(Parser, Debug)]
#[command(name = "taskboard")]
#[command(version, about = "Task board maintenance commands", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// TOML config file (defaults are used when omitted)
    #[arg(long, global = true, env = "TASKBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Database path, overriding config and environment
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or migrate the database and print its schema version
    Init,

    /// Print a user's repeating tasks for one day
    Digest {
        /// User id
        #[arg(long)]
        user: i64,

        /// Day to evaluate as YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Print the reminders that would be sent, without sending them
    Reminders {
        /// Day to evaluate as YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Check that the core library is linked
    Ping,

    /// Print the core library version
    Version,
}

#[derive(Debug)]
enum CliError {
    Config(ConfigError),
    Logging(LoggingError),
    Db(DbError),
    Repo(RepoError),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "database error: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Prints reminders instead of sending them.
struct StdoutDispatcher;

impl ReminderDispatcher for StdoutDispatcher {
    fn deliver(&mut self, reminder: &Reminder) -> Result<(), DispatchError> {
        println!("to chat {}:", reminder.chat_id);
        println!("{}", reminder.render_text());
        println!();
        Ok(())
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Ping => {
            println!("taskboard_core ping={}", ping());
            return Ok(());
        }
        Commands::Version => {
            println!("taskboard_core version={}", core_version());
            return Ok(());
        }
        _ => {}
    }

    let mut config = CoreConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database.path = db;
        config.validate()?;
    }
    init_logging_from_config(&config.logging)?;

    let conn = open_db(&config.database.path)?;
    match cli.command {
        Commands::Init => {
            let version = current_user_version(&conn)?;
            println!(
                "database={} schema_version={version}",
                config.database.path.display()
            );
        }
        Commands::Digest { user, date } => {
            let date = date.unwrap_or_else(today);
            let owner = UserService::new(SqliteUserRepository::try_new(&conn)?).get_user(user)?;
            let habits = HabitService::new(SqliteRepeatingTaskRepository::try_new(&conn)?);
            let overview = habits.day_overview(RepeatingScope::User(owner.id), date)?;

            println!("{} {}", owner.username, date.format("%Y-%m-%d"));
            if overview.is_empty() {
                println!("  no repeating tasks");
            }
            for status in overview {
                let marker = match (status.due, status.completed) {
                    (_, true) => "[x]",
                    (true, false) => "[ ]",
                    (false, false) => " - ",
                };
                println!("  {marker} {}", status.task.title);
            }
        }
        Commands::Reminders { date } => {
            if !config.notifications.enabled {
                println!("notifications disabled in config");
                return Ok(());
            }
            let date = date.unwrap_or_else(today);
            let users = SqliteUserRepository::try_new(&conn)?;
            let habits = SqliteRepeatingTaskRepository::try_new(&conn)?;
            let report = dispatch_reminders(&users, &habits, &mut StdoutDispatcher, date)?;
            info!(
                "event=cli_reminders module=cli status=ok sent={} failed={}",
                report.sent, report.failed
            );
            println!("sent={} failed={}", report.sent, report.failed);
        }
        Commands::Ping | Commands::Version => {}
    }
    Ok(())
}

/// The operator's local calendar day.
///
/// Habits are checked against the day people live in, while `created_at`
/// stays naive UTC. Near midnight, users far from UTC may therefore see an
/// interval habit shift by one day; pass `--date` to pin the day.
fn today() -> NaiveDate {
    Local::now().date_naive()
}
