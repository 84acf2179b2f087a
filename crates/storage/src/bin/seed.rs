use std::fmt;

use chrono::{DateTime, Duration, Utc};
use progress_core::model::{EventDraft, EventType};
use storage::repository::Storage;
use storage::sqlite::DEFAULT_DB_URL;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    course_id: String,
    users: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidCourse { raw: String },
    InvalidUsers { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidCourse { raw } => write!(f, "invalid --course value: {raw:?}"),
            ArgsError::InvalidUsers { raw } => write!(f, "invalid --users value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("PROGRESS_DB_URL").unwrap_or_else(|_| DEFAULT_DB_URL.into());
        let mut course_id =
            std::env::var("PROGRESS_SEED_COURSE").unwrap_or_else(|_| "course1".into());
        let mut users = std::env::var("PROGRESS_SEED_USERS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(4);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--course" => {
                    let value = require_value(&mut args, "--course")?;
                    if value.is_empty() {
                        return Err(ArgsError::InvalidCourse { raw: value });
                    }
                    course_id = value;
                }
                "--users" => {
                    let value = require_value(&mut args, "--users")?;
                    users = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidUsers { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            course_id,
            users,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: {DEFAULT_DB_URL})");
    eprintln!("  --course <id>             Course to seed (default: course1)");
    eprintln!("  --users <n>               Number of participants (default: 4)");
    eprintln!("  --now <rfc3339>           Timestamp of the first event (default: now)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Every participant starts the course; even-numbered ones pass, odd ones fail.");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  PROGRESS_DB_URL, PROGRESS_SEED_COURSE, PROGRESS_SEED_USERS");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let mut at = args.now.unwrap_or_else(Utc::now);

    let mut written = 0_u32;
    for i in 0..args.users {
        let user_id = format!("user{}", i + 1);
        let outcome = if i % 2 == 0 {
            EventType::Passed
        } else {
            EventType::Failed
        };

        for kind in [EventType::Started, outcome] {
            let event =
                EventDraft::new(user_id.clone(), args.course_id.clone(), at, kind).validate()?;
            storage.events.create(event).await?;
            at += Duration::minutes(5);
            written += 1;
        }
    }

    println!(
        "Seeded {written} events for {} participants of {} into {}",
        args.users, args.course_id, args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
