mod driver;
mod terminal;

use std::rc::Rc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use sketchsync::{
    CoordinatorConfig, DisplayName, Effects, LocalChannel, RoomCoordinator, Screen, SessionContext, SessionOutcome,
};
use tokio_tungstenite::connect_async;
use tracing_subscriber::EnvFilter;

use crate::driver::Wire;
use crate::terminal::Terminal;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("invalid server URL: {0}")]
    InvalidUrl(String),
    #[error("websocket failed: {0}")]
    Ws(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("coordinator rejected request: {0}")]
    Coordinator(#[from] sketchsync::CoordinatorError),
    #[error("room not found: {0}")]
    RoomNotFound(String),
    #[error("room does not exist: {0}")]
    RoomMissing(String),
    #[error("timed out waiting for the server")]
    Timeout,
}

#[derive(Parser, Debug)]
#[command(name = "sketchsync-cli", about = "Create, join, or check SketchSync rooms")]
struct Cli {
    #[arg(long, env = "SKETCHSYNC_URL", default_value = "ws://127.0.0.1:3000/ws")]
    url: String,

    /// Reply deadline in milliseconds; 0 waits forever.
    #[arg(long, env = "SKETCHSYNC_REPLY_TIMEOUT_MS", default_value_t = 10_000)]
    timeout_ms: u64,

    /// Send JSON text frames instead of protobuf binary frames.
    #[arg(long, default_value_t = false)]
    text: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new room from the entry screen.
    Create(NameArgs),
    /// Join a room by id from the entry screen.
    Join(RoomArgs),
    /// Open a room link: check the room exists, then join it.
    Visit(RoomArgs),
    /// Check whether a room exists.
    Check { room_id: String },
}

#[derive(Args, Debug)]
struct NameArgs {
    #[arg(long, default_value = "")]
    name: String,
}

#[derive(Args, Debug)]
struct RoomArgs {
    room_id: String,
    #[arg(long, default_value = "")]
    name: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = coordinator_config(&cli);
    let wire = if cli.text { Wire::Text } else { Wire::Binary };

    let url = validate_url(&cli.url)?;
    let (mut stream, _) = connect_async(url)
        .await
        .map_err(|error| CliError::Ws(Box::new(error)))?;
    tracing::info!(url = %cli.url, "connected");

    let channel = LocalChannel::new();
    let terminal = Rc::new(Terminal::new());
    let session = SessionContext::new();
    let screen = match cli.command {
        Command::Create(_) | Command::Join(_) => Screen::Entry,
        Command::Visit(_) | Command::Check { .. } => Screen::Join,
    };
    let effects = Effects { session: session.clone(), navigator: terminal.clone(), presenter: terminal.clone() };
    let coordinator = RoomCoordinator::new(screen, Rc::new(channel.clone()), effects, config);

    match &cli.command {
        Command::Create(args) => {
            coordinator.enter(None)?;
            coordinator.request_create_room(DisplayName::new(&args.name))?;
        }
        Command::Join(args) => {
            coordinator.enter(None)?;
            coordinator.request_join_room(&args.room_id, DisplayName::new(&args.name))?;
        }
        Command::Visit(args) => {
            coordinator.enter(Some(&args.room_id))?;
            coordinator.request_join_room(&args.room_id, DisplayName::new(&args.name))?;
        }
        Command::Check { room_id } => {
            coordinator.enter(Some(room_id))?;
        }
    }

    driver::run(&mut stream, &channel, &coordinator, &terminal, wire).await?;
    tracing::info!(
        route = ?terminal.last_route(),
        notices = terminal.notices().len(),
        "session settled"
    );
    report(&cli.command, coordinator.last_outcome(), &session)
}

fn coordinator_config(cli: &Cli) -> CoordinatorConfig {
    let config = CoordinatorConfig::from_env();
    if cli.timeout_ms == 0 {
        CoordinatorConfig { reply_timeout: None, ..config }
    } else {
        config.with_reply_timeout(Duration::from_millis(cli.timeout_ms))
    }
}

fn validate_url(url: &str) -> Result<&str, CliError> {
    if url.starts_with("ws://") || url.starts_with("wss://") {
        return Ok(url);
    }
    Err(CliError::InvalidUrl(url.to_owned()))
}

fn report(command: &Command, outcome: Option<SessionOutcome>, session: &SessionContext) -> Result<(), CliError> {
    match outcome {
        Some(SessionOutcome::CreatedAndAssigned(room_id) | SessionOutcome::JoinedConfirmed(room_id)) => {
            let confirmed = session.current().unwrap_or(room_id);
            println!("room {confirmed}");
            Ok(())
        }
        Some(SessionOutcome::JoinFailed(room_id)) => Err(CliError::RoomNotFound(room_id.to_string())),
        Some(SessionOutcome::ExistenceConfirmed(true)) => {
            println!("room exists");
            Ok(())
        }
        Some(SessionOutcome::ExistenceConfirmed(false)) => {
            let room_id = match command {
                Command::Visit(args) => args.room_id.clone(),
                Command::Check { room_id } => room_id.clone(),
                Command::Create(_) | Command::Join(_) => String::new(),
            };
            Err(CliError::RoomMissing(room_id))
        }
        Some(SessionOutcome::TimedOut(_)) => Err(CliError::Timeout),
        None => Ok(()),
    }
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
