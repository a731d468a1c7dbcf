//! Grade Command
//!
//! Grade student answers against a generated quiz file.
//!
//! The quiz file is the JSON written by `quizforge generate --output`;
//! the answers file is a JSON array of strings, one per question, in
//! question order.
//!
//! Usage:
//!   quizforge grade quiz.json answers.json
//!   quizforge grade quiz.json answers.json -f json

use std::fs;
use std::path::PathBuf;

use console::style;
use serde::{Deserialize, Serialize};

use crate::cli::build_engine;
use crate::config::ConfigLoader;
use crate::quiz::grading::{GradeSubmission, ReferenceSource, StoredQuiz};
use crate::types::{GradeMethod, QuizError, QuizItem, Result};

/// Grade run options
#[derive(Debug, Clone)]
pub struct GradeOptions {
    /// Quiz JSON file produced by `generate --output`
    pub quiz: PathBuf,
    /// JSON array of student answers
    pub answers: PathBuf,
    /// Output format: text, json
    pub format: String,
}

/// Accepts the file written by `generate --output`; extra fields
/// (model, token counts) are ignored.
#[derive(Deserialize)]
struct QuizFile {
    items: Vec<QuizItem>,
}

#[derive(Serialize)]
struct GradeReport {
    total: usize,
    correct: usize,
    results: Vec<GradeLine>,
}

#[derive(Serialize)]
struct GradeLine {
    question: String,
    student_answer: String,
    correct: bool,
    method: GradeMethod,
}

/// Run grading with options
pub async fn run(options: GradeOptions) -> Result<()> {
    let quiz: QuizFile = serde_json::from_str(&fs::read_to_string(&options.quiz)?)?;
    let answers: Vec<String> = serde_json::from_str(&fs::read_to_string(&options.answers)?)?;

    if quiz.items.is_empty() {
        return Err(QuizError::InvalidRequest(format!(
            "quiz file {} contains no items",
            options.quiz.display()
        )));
    }
    if answers.len() != quiz.items.len() {
        return Err(QuizError::InvalidRequest(format!(
            "expected {} answers (one per question), got {}",
            quiz.items.len(),
            answers.len()
        )));
    }

    let config = ConfigLoader::load()?;
    let engine = build_engine(&config)?;

    let stored = StoredQuiz::from_items(&quiz.items);
    let mut submissions = Vec::with_capacity(answers.len());
    for (index, student_answer) in answers.iter().enumerate() {
        submissions.push(GradeSubmission {
            reference: stored.reference(&index.to_string()).await?,
            student_answer: student_answer.clone(),
        });
    }

    let outcomes = engine.grade_many(&submissions).await;
    let correct = outcomes.iter().filter(|o| o.correct).count();

    if options.format == "json" {
        let report = GradeReport {
            total: outcomes.len(),
            correct,
            results: submissions
                .iter()
                .zip(&outcomes)
                .map(|(submission, outcome)| GradeLine {
                    question: submission.reference.question.clone(),
                    student_answer: submission.student_answer.clone(),
                    correct: outcome.correct,
                    method: outcome.method,
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    for (index, (submission, outcome)) in submissions.iter().zip(&outcomes).enumerate() {
        let mark = if outcome.correct {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!(
            "{} {}. {} {}",
            mark,
            index + 1,
            submission.reference.question,
            style(format!("[{}]", outcome.method)).dim()
        );
    }

    let percent = correct as f64 / outcomes.len() as f64 * 100.0;
    println!(
        "\n{} Score: {}/{} ({:.0}%)",
        style("∑").bold(),
        correct,
        outcomes.len(),
        percent
    );

    Ok(())
}
