use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use exam_core::model::{CompetitionId, HANDOFF_KEY};
use services::export::leaderboard_csv;
use services::{ApiConfig, AppServices, Clock, QueueNotifier, ServicesConfig};
use storage::repository::KeyValueStore;

mod drive;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidApiUrl { raw: String },
    InvalidCompetition { raw: String },
    MissingCompetition,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidApiUrl { raw } => write!(f, "invalid --api value: {raw}"),
            ArgsError::InvalidCompetition { raw } => write!(f, "invalid --competition value: {raw}"),
            ArgsError::MissingCompetition => write!(f, "leaderboard requires --competition <id>"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- take        [--db <sqlite_url>] [--api <base_url>]");
    eprintln!("                                  [--handoff-file <json>] [--export <csv>]");
    eprintln!("  cargo run -p app -- pending     [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- leaderboard --competition <id> [--api <base_url>] [--export <csv>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://exam.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_DB_URL, EXAM_API_BASE_URL, EXAM_API_TOKEN, EXAM_SUBMIT_POLICY, EXAM_SHUFFLE");
    eprintln!("  RUST_LOG (log filter, default warn)");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Take,
    Pending,
    Leaderboard,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "take" => Some(Self::Take),
            "pending" => Some(Self::Pending),
            "leaderboard" => Some(Self::Leaderboard),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    config: ServicesConfig,
    handoff_file: Option<PathBuf>,
    export: Option<PathBuf>,
    competition: Option<CompetitionId>,
}

impl Args {
    fn parse(
        cmd: Command,
        mut config: ServicesConfig,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        config.db_url = normalize_sqlite_url(config.db_url);
        let mut handoff_file = None;
        let mut export = None;
        let mut competition = None;

        while let Some(arg) = args.next() {
            match (cmd, arg.as_str()) {
                (_, "--db") => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    config.db_url = normalize_sqlite_url(value);
                }
                (Command::Take | Command::Leaderboard, "--api") => {
                    let value = require_value(args, "--api")?;
                    let token = config.api.take().and_then(|api| api.token);
                    let base = value.trim().trim_end_matches('/');
                    if base.is_empty() {
                        return Err(ArgsError::InvalidApiUrl { raw: value });
                    }
                    config.api = Some(ApiConfig {
                        base_url: base.to_owned(),
                        token,
                    });
                }
                (Command::Take, "--handoff-file") => {
                    handoff_file = Some(PathBuf::from(require_value(args, "--handoff-file")?));
                }
                (Command::Take | Command::Leaderboard, "--export") => {
                    export = Some(PathBuf::from(require_value(args, "--export")?));
                }
                (Command::Leaderboard, "--competition") => {
                    let value = require_value(args, "--competition")?;
                    match value.parse() {
                        Ok(id) => competition = Some(id),
                        Err(_) => return Err(ArgsError::InvalidCompetition { raw: value }),
                    }
                }
                (_, "--help" | "-h") => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if cmd == Command::Leaderboard && competition.is_none() {
            return Err(ArgsError::MissingCompetition);
        }

        Ok(Self {
            config,
            handoff_file,
            export,
            competition,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:") {
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
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means take the exam.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Take,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Take,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(cmd, ServicesConfig::from_env(), &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.config.db_url)?;
    let notifier = QueueNotifier::new();
    let app = AppServices::new_sqlite(&parsed.config, Clock::system(), Arc::new(notifier.clone()))
        .await?;

    match cmd {
        Command::Take => {
            if let Some(path) = &parsed.handoff_file {
                let raw = std::fs::read_to_string(path)?;
                app.store().put(HANDOFF_KEY, &raw).await?;
            }
            let sessions = app.sessions();
            let exam = sessions.launch().await?;
            drive::run(&sessions, exam, &notifier, parsed.export.as_deref()).await
        }
        Command::Pending => {
            let store = app.store();
            let mut keys = store.keys_with_prefix("study_").await?;
            keys.extend(store.keys_with_prefix("mock_").await?);
            if keys.is_empty() {
                println!("no unfinished sessions");
            }
            for key in keys {
                println!("{key}");
            }
            Ok(())
        }
        Command::Leaderboard => {
            let Some(competition) = &parsed.competition else {
                return Err(ArgsError::MissingCompetition.into());
            };
            let board = app.leaderboards().leaderboard(competition).await?;
            for ranked in board.entries() {
                println!(
                    "{:>3}. {:<24} {:>3}/{:<3} {:>5}s",
                    ranked.rank,
                    ranked.entry.participant,
                    ranked.entry.score,
                    ranked.entry.total,
                    ranked.entry.duration_secs
                );
            }
            if let Some(path) = &parsed.export {
                std::fs::write(path, leaderboard_csv(&board)?)?;
                println!("wrote {}", path.display());
            }
            Ok(())
        }
    }
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

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

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
