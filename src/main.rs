//! Cadence - spaced-repetition scheduling for karaoke phrase decks
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cadence::cli::decks::{DecksCommand, DecksOptions};
use cadence::cli::init::{InitCommand, InitOptions};
use cadence::cli::plan::{PlanCommand, PlanOptions};
use cadence::cli::review::{ReviewCommand, ReviewOptions};
use cadence::cli::status::{StatusCommand, StatusOptions};
use cadence::cli::{open_scheduler, FileScheduler};
use cadence::config::{crash_log_path, Config};
use cadence::core::{Grade, ItemId, UserId};
use cadence::error::{exit_codes, CadenceError};

// =============================================================================
// CLI Definition
// =============================================================================

/// Cadence - spaced-repetition scheduling for karaoke phrase decks
#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every command.
#[derive(Args)]
struct Common {
    /// Learner id
    #[arg(long, short, env = "CADENCE_USER")]
    user: String,
    /// Output as JSON
    #[arg(long, short)]
    json: bool,
    /// Suppress output
    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed progress for every phrase of a deck and add it to your decks
    Init {
        /// Deck (song) id
        deck: String,
        #[command(flatten)]
        common: Common,
    },

    /// Show new, learning and due counts for a deck
    Status {
        /// Deck (song) id
        deck: String,
        #[command(flatten)]
        common: Common,
    },

    /// List the phrases of the next study session
    Plan {
        /// Deck (song) id
        deck: String,
        /// Maximum session length
        #[arg(long)]
        total: Option<usize>,
        /// Maximum number of new phrases
        #[arg(long)]
        max_new: Option<usize>,
        /// Re-drill phrases already studied today
        #[arg(long)]
        again: bool,
        #[command(flatten)]
        common: Common,
    },

    /// Grade a phrase
    Review {
        /// Deck (song) id
        deck: String,
        /// Phrase id
        phrase: String,
        /// How the phrase went
        #[arg(value_enum, required_unless_present = "drill")]
        grade: Option<GradeArg>,
        /// Record a same-day drill that keeps the schedule
        #[arg(long, conflicts_with = "grade")]
        drill: bool,
        #[command(flatten)]
        common: Common,
    },

    /// List your decks, most recently practiced first
    Decks {
        #[command(flatten)]
        common: Common,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GradeArg {
    Again,
    Good,
}

impl From<GradeArg> for Grade {
    fn from(arg: GradeArg) -> Self {
        match arg {
            GradeArg::Again => Grade::Again,
            GradeArg::Good => Grade::Good,
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    init_tracing();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("cadence error: {}", e);
            if is_retryable(e.as_ref()) {
                eprintln!("This may be temporary; try the command again.");
            }
            ExitCode::from(exit_codes::ERROR as u8)
        }
    }
}

fn is_retryable(err: &(dyn std::error::Error + 'static)) -> bool {
    err.downcast_ref::<CadenceError>()
        .is_some_and(CadenceError::is_retryable)
}

/// Set up the global panic handler.
///
/// On panic, logs to ~/.cadence/crash.log and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("cadence panic: {}", info);

        if let Some(crash_log) = crash_log_path() {
            if let Some(parent) = crash_log.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Log to stderr, filtered by `CADENCE_LOG` (default `cadence=warn`).
fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("CADENCE_LOG").unwrap_or_else(|_| EnvFilter::new("cadence=warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load();
    let scheduler = open_scheduler(&config)?;

    match cli.command {
        Commands::Init { deck, common } => run_init(&scheduler, &deck, common),
        Commands::Status { deck, common } => run_status(&scheduler, &deck, common),
        Commands::Plan {
            deck,
            total,
            max_new,
            again,
            common,
        } => run_plan(&scheduler, &deck, total, max_new, again, common),
        Commands::Review {
            deck,
            phrase,
            grade,
            drill,
            common,
        } => run_review(
            &scheduler,
            &ItemId::new(deck, phrase),
            grade.map(Grade::from),
            drill,
            common,
        ),
        Commands::Decks { common } => run_decks(&scheduler, common),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::ERROR as u8)
    }
}

fn print_formatted(formatted: &str) {
    if !formatted.is_empty() {
        print!("{}", formatted);
        if !formatted.ends_with('\n') {
            println!();
        }
    }
}

fn run_init(
    scheduler: &FileScheduler,
    deck: &str,
    common: Common,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let user = UserId::new(common.user)?;
    let cmd = InitCommand::new(scheduler);
    let options = InitOptions {
        json: common.json,
        quiet: common.quiet,
    };

    let output = cmd.run(deck, &user, &options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_status(
    scheduler: &FileScheduler,
    deck: &str,
    common: Common,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let user = UserId::new(common.user)?;
    let cmd = StatusCommand::new(scheduler);
    let options = StatusOptions {
        json: common.json,
        quiet: common.quiet,
    };

    let output = cmd.run(deck, &user, &options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_plan(
    scheduler: &FileScheduler,
    deck: &str,
    total: Option<usize>,
    max_new: Option<usize>,
    again: bool,
    common: Common,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let user = UserId::new(common.user)?;
    let cmd = PlanCommand::new(scheduler);
    let options = PlanOptions {
        json: common.json,
        quiet: common.quiet,
        total,
        max_new,
        again,
    };

    let output = cmd.run(deck, &user, &options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_review(
    scheduler: &FileScheduler,
    item_id: &ItemId,
    grade: Option<Grade>,
    drill: bool,
    common: Common,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let user = UserId::new(common.user)?;
    let cmd = ReviewCommand::new(scheduler);
    let options = ReviewOptions {
        json: common.json,
        quiet: common.quiet,
        drill,
    };

    let output = cmd.run(item_id, &user, grade, &options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_decks(
    scheduler: &FileScheduler,
    common: Common,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let user = UserId::new(common.user)?;
    let cmd = DecksCommand::new(scheduler);
    let options = DecksOptions {
        json: common.json,
        quiet: common.quiet,
    };

    let output = cmd.run(&user, &options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}
