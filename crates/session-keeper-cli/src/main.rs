//! session-keeper - a terminal front end for the session manager.
//!
//! Signs in or up against the configured identity provider, shows the
//! current session, and can watch it until the token expires.

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use session_keeper_core::auth::{ChannelNavigator, Session, SessionManager};
use session_keeper_core::config::Config;
use session_keeper_core::storage::{self, SessionPersistence};
use session_keeper_core::IdentityClient;

// ============================================================================
// Constants
// ============================================================================

/// Log file written into the cache directory
const LOG_FILE: &str = "session-keeper.log";

/// Password source for non-interactive use
const ENV_PASSWORD: &str = "SESSION_KEEPER_PASSWORD";

const USAGE: &str = "\
Usage: session-keeper <command>

Commands:
  signup <email>   Create an account and start a session
  signin <email>   Sign in and start a session
  status           Show the current session
  logout           End the current session
  watch            Print session changes until the session ends";

enum Command {
    SignUp(String),
    SignIn(String),
    Status,
    Logout,
    Watch,
}

impl Command {
    fn parse(args: &[String]) -> Option<Self> {
        match args {
            [cmd, email] if cmd == "signup" => Some(Command::SignUp(email.clone())),
            [cmd, email] if cmd == "signin" => Some(Command::SignIn(email.clone())),
            [cmd] if cmd == "status" => Some(Command::Status),
            [cmd] if cmd == "logout" => Some(Command::Logout),
            [cmd] if cmd == "watch" => Some(Command::Watch),
            _ => None,
        }
    }
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer and must outlive `main`'s work.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = Command::parse(&args) else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let mut config = Config::load()?;
    config.apply_env()?;

    let cache_dir = config.cache_dir()?;
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("Failed to create {}", cache_dir.display()))?;
    let _log_guard = init_tracing(&cache_dir);
    info!(storage = ?config.storage, "session-keeper starting");

    let client = IdentityClient::new(&config)?;
    let persistence = SessionPersistence::new(storage::open(&config)?);
    let (navigator, mut routes) = ChannelNavigator::new();
    let manager = SessionManager::new(client, persistence, Arc::new(navigator));

    let restored = manager.auto_login();
    debug!(restored, "Startup rehydration finished");

    match command {
        Command::SignUp(email) => {
            let password = read_password()?;
            let session = manager.sign_up(&email, &password).await?;
            println!("Account created. {}", describe(&session));
        }
        Command::SignIn(email) => {
            let password = read_password()?;
            let session = manager.sign_in(&email, &password).await?;
            println!("Signed in. {}", describe(&session));
        }
        Command::Status => match manager.current() {
            Some(session) => println!("{}", describe(&session)),
            None => println!("Not signed in."),
        },
        Command::Logout => {
            manager.logout();
            println!("Signed out.");
        }
        Command::Watch => watch(&manager, &mut routes).await,
    }

    info!("session-keeper shutting down");
    Ok(())
}

/// Print every session change until the manager asks for the login view.
async fn watch(
    manager: &SessionManager<IdentityClient>,
    routes: &mut mpsc::UnboundedReceiver<String>,
) {
    if manager.current().is_none() {
        println!("Not signed in.");
        return;
    }

    let _subscription = manager.subscribe(|session| match session {
        Some(session) => println!("Session: {}", describe(session)),
        None => println!("Session ended."),
    });

    if let Some(route) = routes.recv().await {
        println!("Sign in again ({}).", route);
    }
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(ENV_PASSWORD) {
        return Ok(password);
    }
    rpassword::prompt_password("Password: ").context("Failed to read password")
}

fn describe(session: &Session) -> String {
    format!(
        "{} ({}), expires {} ({} minutes left)",
        session.email(),
        session.user_id(),
        session.expires_at().format("%Y-%m-%d %H:%M:%S UTC"),
        session.minutes_until_expiry()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert!(matches!(
            Command::parse(&args(&["signin", "a@b.com"])),
            Some(Command::SignIn(email)) if email == "a@b.com"
        ));
        assert!(matches!(
            Command::parse(&args(&["signup", "a@b.com"])),
            Some(Command::SignUp(_))
        ));
        assert!(matches!(Command::parse(&args(&["status"])), Some(Command::Status)));
        assert!(matches!(Command::parse(&args(&["logout"])), Some(Command::Logout)));
        assert!(matches!(Command::parse(&args(&["watch"])), Some(Command::Watch)));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Command::parse(&args(&[])).is_none());
        assert!(Command::parse(&args(&["signin"])).is_none());
        assert!(Command::parse(&args(&["status", "extra"])).is_none());
        assert!(Command::parse(&args(&["dance"])).is_none());
    }
}
