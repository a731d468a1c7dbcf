use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quizforge::types::{Difficulty, TypeCounts};

/// Parse difficulty from string
fn parse_difficulty(s: &str) -> Result<Difficulty, String> {
    s.parse()
}

#[derive(Parser)]
#[command(name = "quizforge")]
#[command(
    version,
    about = "Budget-aware quiz generator and grader backed by LLM failover dispatch"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a quiz from a learning material file
    Generate {
        #[arg(help = "Plain-text file with the learning material")]
        source: PathBuf,

        #[arg(long, default_value_t = 5, help = "Multiple choice questions")]
        mcq: u32,
        #[arg(long = "short-answer", default_value_t = 0, help = "Short answer questions")]
        short_answer: u32,
        #[arg(long = "true-false", default_value_t = 0, help = "True/false questions")]
        true_false: u32,
        #[arg(long, default_value_t = 0, help = "Identification questions")]
        identification: u32,
        #[arg(long, default_value_t = 0, help = "Essay questions")]
        essay: u32,

        #[arg(
            long,
            short,
            default_value = "intermediate",
            value_parser = parse_difficulty,
            help = "Difficulty: easy, intermediate, difficult"
        )]
        difficulty: Difficulty,

        #[arg(
            long,
            env = "GROQ_MODEL",
            help = "Preferred model (configured models remain as fallbacks)"
        )]
        model: Option<String>,

        #[arg(long, short, help = "Write the quiz as JSON to this file")]
        output: Option<PathBuf>,

        #[arg(long, short, default_value = "text", help = "Output format: text, json")]
        format: String,
    },

    /// Grade student answers against a generated quiz
    Grade {
        #[arg(help = "Quiz JSON file produced by 'quizforge generate --output'")]
        quiz: PathBuf,

        #[arg(help = "JSON array of student answers, one per question")]
        answers: PathBuf,

        #[arg(long, short, default_value = "text", help = "Output format: text, json")]
        format: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        // Extract panic message
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mquizforge encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }

        eprintln!("\n\x1b[33mPlease report this issue at:\x1b[0m");
        eprintln!("  https://github.com/junyeong-ai/quizforge/issues");
        eprintln!();

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    // Install panic handler first
    setup_panic_handler();

    // Run the actual CLI
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            if let Some(quiz_error) = e.downcast_ref::<quizforge::types::QuizError>()
                && quiz_error.is_recoverable()
            {
                eprintln!("  {}", quiz_error.user_message());
            }
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Generate {
            source,
            mcq,
            short_answer,
            true_false,
            identification,
            essay,
            difficulty,
            model,
            output,
            format,
        } => {
            use quizforge::cli::commands::generate::GenerateOptions;

            let options = GenerateOptions {
                source,
                counts: TypeCounts {
                    mcq,
                    short_answer,
                    true_false,
                    identification,
                    essay,
                },
                difficulty,
                model,
                output,
                format,
            };

            let rt = Runtime::new()?;
            rt.block_on(quizforge::cli::commands::generate::run(options))?;
        }
        Commands::Grade {
            quiz,
            answers,
            format,
        } => {
            use quizforge::cli::commands::grade::GradeOptions;

            let options = GradeOptions {
                quiz,
                answers,
                format,
            };

            let rt = Runtime::new()?;
            rt.block_on(quizforge::cli::commands::grade::run(options))?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { global, format } => {
                quizforge::cli::commands::config::show(global, &format)?;
            }
            ConfigAction::Path => {
                quizforge::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                if global {
                    quizforge::cli::commands::config::init_global(force)?;
                } else {
                    quizforge::cli::commands::config::init_project(force)?;
                }
            }
        },
    }

    Ok(())
}
