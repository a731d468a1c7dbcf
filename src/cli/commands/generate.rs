//! Generate Command
//!
//! Turn a plain-text learning material file into a typed quiz.
//!
//! Usage:
//!   quizforge generate notes.txt --mcq 5 --true-false 3
//!   quizforge generate notes.txt --mcq 3 -d difficult -o quiz.json

use std::fs;
use std::path::PathBuf;

use console::style;
use tracing::info;

use crate::cli::build_engine;
use crate::config::ConfigLoader;
use crate::types::{Difficulty, GenerationOutcome, QuizItem, RequestSpec, Result, TypeCounts};

/// Generate run options (consolidated parameters)
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Learning material file
    pub source: PathBuf,
    /// How many items of each type to produce
    pub counts: TypeCounts,
    /// Quiz difficulty
    pub difficulty: Difficulty,
    /// Model override; configured models remain as fallbacks
    pub model: Option<String>,
    /// Write the quiz as JSON to this file
    pub output: Option<PathBuf>,
    /// Output format when printing: text, json
    pub format: String,
}

/// Run quiz generation with options
pub async fn run(options: GenerateOptions) -> Result<()> {
    let mut config = ConfigLoader::load()?;
    if let Some(model) = &options.model {
        let mut preference = vec![model.clone()];
        preference.extend(config.models.preference.clone());
        config.models.preference = preference;
    }
    let engine = build_engine(&config)?;

    let source_text = fs::read_to_string(&options.source)?;
    info!(
        source = %options.source.display(),
        chars = source_text.chars().count(),
        "loaded learning material"
    );

    println!(
        "\n{} Generating {} questions ({} difficulty)...\n",
        style("▶").cyan(),
        options.counts.total(),
        options.difficulty
    );

    let spec = RequestSpec {
        source_text,
        counts: options.counts,
        difficulty: options.difficulty,
    };
    let outcome = engine.generate(&spec).await?;

    if let Some(path) = &options.output {
        fs::write(path, serde_json::to_string_pretty(&outcome)?)?;
        println!(
            "{} Wrote {} questions to {}",
            style("✓").green(),
            outcome.items.len(),
            path.display()
        );
    } else if options.format == "json" {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_quiz(&outcome);
    }

    Ok(())
}

fn print_quiz(outcome: &GenerationOutcome) {
    println!(
        "{}",
        style(format!(
            "Quiz — {} questions (model: {})",
            outcome.items.len(),
            outcome.model_used
        ))
        .bold()
    );

    for (index, item) in outcome.items.iter().enumerate() {
        println!();
        match item {
            QuizItem::Mcq {
                question,
                choices,
                answer,
            } => {
                println!("{}. [MCQ] {}", index + 1, question);
                for (position, choice) in choices.iter().enumerate() {
                    let letter = (b'a' + position as u8) as char;
                    println!("     {}) {}", letter, choice);
                }
                println!("     {} {}", style("Answer:").dim(), answer);
            }
            QuizItem::ShortAnswer { question, answer } => {
                println!("{}. [Short answer] {}", index + 1, question);
                println!("     {} {}", style("Answer:").dim(), answer);
            }
            QuizItem::TrueFalse { question, answer } => {
                println!("{}. [True/False] {}", index + 1, question);
                let shown = match answer.as_bool() {
                    Some(true) => "true",
                    Some(false) => "false",
                    None => "?",
                };
                println!("     {} {}", style("Answer:").dim(), shown);
            }
            QuizItem::Identification { question, answer } => {
                println!("{}. [Identification] {}", index + 1, question);
                println!("     {} {}", style("Answer:").dim(), answer);
            }
            QuizItem::Essay { question, answer } => {
                println!("{}. [Essay] {}", index + 1, question);
                println!("     {} {}", style("Model answer:").dim(), answer);
            }
        }
    }

    println!(
        "\n  {} {}",
        style("Tokens reported:").dim(),
        outcome.total_tokens_reported
    );
}
