use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{GameRecord, StatsSnapshot};
use services::{
    Clock, ControllerEvent, ControllerPhase, JsonMoviesLoader, MovieQuestionSource,
    QuestionStep, RoundConfig, RoundController, RoundObserver, RoundReport, StatisticsStore,
};
use storage::repository::Storage;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
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

fn parse_number<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>      statistics database (default: sqlite:quiz.sqlite3)");
    eprintln!("  --movies <path>        movie catalog JSON (default: demos/movies.json)");
    eprintln!("  --questions <n>        questions per round (default: 10)");
    eprintln!("  --pacing-ms <ms>       pause before the next question (default: 1000)");
    eprintln!("  --reset-stats          forget saved statistics before playing");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_MOVIES_PATH, QUIZ_QUESTION_COUNT, QUIZ_PACING_MS, RUST_LOG");
}

struct Args {
    db_url: String,
    movies_path: String,
    question_count: u32,
    pacing: Duration,
    reset_stats: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("sqlite:quiz.sqlite3".into()), normalize_sqlite_url);
        let mut movies_path =
            std::env::var("QUIZ_MOVIES_PATH").unwrap_or_else(|_| "demos/movies.json".into());
        let mut question_count = match std::env::var("QUIZ_QUESTION_COUNT") {
            Ok(raw) => parse_number("QUIZ_QUESTION_COUNT", raw)?,
            Err(_) => services::rounds::DEFAULT_QUESTION_COUNT,
        };
        let mut pacing = match std::env::var("QUIZ_PACING_MS") {
            Ok(raw) => Duration::from_millis(parse_number("QUIZ_PACING_MS", raw)?),
            Err(_) => services::rounds::DEFAULT_PACING,
        };
        let mut reset_stats = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--movies" => movies_path = require_value(args, "--movies")?,
                "--questions" => {
                    question_count = parse_number("--questions", require_value(args, "--questions")?)?;
                }
                "--pacing-ms" => {
                    let ms = parse_number("--pacing-ms", require_value(args, "--pacing-ms")?)?;
                    pacing = Duration::from_millis(ms);
                }
                "--reset-stats" => reset_stats = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            movies_path,
            question_count,
            pacing,
            reset_stats,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
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
    if db_url == "sqlite::memory:" {
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

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

//
// ─── TERMINAL ──────────────────────────────────────────────────────────────────
//

/// Prints round progress to stdout.
struct TerminalObserver;

impl RoundObserver for TerminalObserver {
    fn on_question_available(&self, step: &QuestionStep) {
        println!();
        println!("Question {}", step.display);
        if step.question.image().is_empty() {
            println!("[no poster]");
        } else {
            println!("[poster: {} bytes]", step.question.image().bytes().len());
        }
        println!("{}  (y/n)", step.question.prompt());
    }

    fn on_answer_feedback(&self, is_correct: bool) {
        println!("{}", if is_correct { "Correct!" } else { "Wrong." });
    }

    fn on_round_finished(&self, record: &GameRecord, stats: Option<&StatsSnapshot>) {
        let report = RoundReport::new(record, stats);
        println!();
        println!("{}", report.title());
        println!("{}", report.message());
    }

    fn on_load_failed(&self, reason: &str) {
        println!("Error: {reason}");
    }

    fn on_loading(&self, is_loading: bool) {
        if is_loading {
            println!("Loading...");
        }
    }
}

type Input = Lines<BufReader<Stdin>>;

fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Reads until the player types yes or no. `None` on end of input.
async fn read_answer(input: &mut Input) -> std::io::Result<Option<bool>> {
    while let Some(line) = input.next_line().await? {
        if let Some(answer) = parse_answer(&line) {
            return Ok(Some(answer));
        }
        println!("Please answer y or n.");
    }
    Ok(None)
}

/// Drives one round until it finishes, fails, or input ends.
///
/// Returns `false` when input ended.
async fn play_round(
    controller: &mut RoundController,
    input: &mut Input,
) -> Result<bool, Box<dyn std::error::Error>> {
    while let Some(event) = controller.process_next().await {
        if !matches!(event, ControllerEvent::QuestionShown(_)) {
            continue;
        }
        let Some(tap) = read_answer(input).await? else {
            return Ok(false);
        };
        controller.answer(tap).await?;
        if controller.phase() == ControllerPhase::Finished {
            break;
        }
    }
    Ok(true)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();
    info!(
        db = %args.db_url,
        movies = %args.movies_path,
        questions = args.question_count,
        pacing_ms = u64::try_from(args.pacing.as_millis()).unwrap_or(u64::MAX),
        "starting quiz"
    );

    // Open + migrate SQLite here so services only see the key-value contract.
    prepare_sqlite_file(&args.db_url)?;
    let storage = Storage::sqlite(&args.db_url).await?;
    debug!("statistics storage ready");
    let statistics = Arc::new(StatisticsStore::new(Arc::clone(&storage.key_values)));
    if args.reset_stats {
        statistics.reset().await?;
        info!("saved statistics cleared");
    }

    let loader = Arc::new(JsonMoviesLoader::new(&args.movies_path));
    let source = Arc::new(MovieQuestionSource::new(loader));
    let config = RoundConfig::new(args.question_count, args.pacing)?;
    let mut controller = RoundController::new(
        config,
        Clock::system(),
        source,
        statistics,
        Arc::new(TerminalObserver),
    );

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        controller.start_round()?;
        if !play_round(&mut controller, &mut input).await? {
            return Ok(());
        }

        let prompt = match controller.phase() {
            ControllerPhase::Finished if controller.last_result().is_some() => "Play again?",
            _ => "Try again?",
        };
        println!("{prompt}  (y/n)");
        if read_answer(&mut input).await? != Some(true) {
            debug!("player quit");
            return Ok(());
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
