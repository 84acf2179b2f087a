use std::fmt;
use std::sync::Arc;

use api::AppState;
use services::AppServices;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::EnvVars;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidPort { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidPort { raw } => write!(f, "invalid --port value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

#[derive(Debug, PartialEq, Eq)]
enum Parsed {
    Run(EnvVars),
    Help,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--db <sqlite_url>|memory] [--port <port>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {}", config::DEFAULT_DB_URL);
    eprintln!("  --port {}", config::DEFAULT_PORT);
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PROGRESS_DB_URL, PORT, REQUEST_TIMEOUT_IN_MS, REQUEST_BODY_SIZE_LIMIT, RUST_LOG");
}

/// Apply command-line flags on top of the environment settings.
fn parse_args(
    mut env: EnvVars,
    args: &mut impl Iterator<Item = String>,
) -> Result<Parsed, ArgsError> {
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => {
                let value = require_value(args, "--db")?;
                if value.trim().is_empty() {
                    return Err(ArgsError::InvalidDbUrl { raw: value });
                }
                env.db_url = value;
            }
            "--port" => {
                let value = require_value(args, "--port")?;
                env.port = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidPort { raw: value.clone() })?;
            }
            "--help" | "-h" => return Ok(Parsed::Help),
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    Ok(Parsed::Run(env))
}

fn is_memory_url(db_url: &str) -> bool {
    matches!(db_url, "memory" | "sqlite::memory:")
}

fn normalize_sqlite_url(raw: String) -> String {
    if is_memory_url(&raw) || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    // The pool creates the file itself, but not missing directories.
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    Ok(())
}

async fn build_services(db_url: &str) -> Result<AppServices, Box<dyn std::error::Error>> {
    if is_memory_url(db_url) {
        warn!("Using in-memory event store; events are lost on shutdown");
        return Ok(AppServices::in_memory());
    }

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(db_url)?;
    Ok(AppServices::new_sqlite(db_url).await?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let env = EnvVars::from_env()?;
    let mut argv = std::env::args().skip(1);
    let mut env = match parse_args(env, &mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })? {
        Parsed::Help => {
            print_usage();
            return Ok(());
        }
        Parsed::Run(env) => env,
    };
    env.db_url = normalize_sqlite_url(env.db_url);

    info!("Starting server...");
    let services = build_services(&env.db_url).await?;
    let state = AppState {
        progress: services.progress(),
    };
    let app = api::app(state, env.http_limits());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", env.port)).await?;
    info!(db = %env.db_url, "Listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "{}=debug,api=debug,services=debug,tower_http=info",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        error!("{err}");
        std::process::exit(2);
    }
}
