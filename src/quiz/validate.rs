//! Item Validation
//!
//! Pure per-type predicates applied after normalize and repair. An item
//! that fails its predicate is dropped; only aggregate per-type counts
//! matter downstream, so there is no per-item error reporting.

use crate::constants::repair::{MCQ_CHOICE_COUNT, MIN_CHOICE_CHARS};
use crate::types::{QuizItem, TruthValue};

/// Does this (already normalized and repaired) item hold up?
pub fn is_valid(item: &QuizItem) -> bool {
    match item {
        QuizItem::Mcq {
            question,
            choices,
            answer,
        } => valid_mcq(question, choices, answer),
        QuizItem::ShortAnswer { question, answer }
        | QuizItem::Identification { question, answer }
        | QuizItem::Essay { question, answer } => valid_free_answer(question, answer),
        QuizItem::TrueFalse { question, answer } => valid_true_false(question, answer),
    }
}

/// Exactly four substantial choices, answer literally among them.
fn valid_mcq(question: &str, choices: &[String], answer: &str) -> bool {
    !question.is_empty()
        && choices.len() == MCQ_CHOICE_COUNT
        && choices
            .iter()
            .all(|choice| choice.chars().count() >= MIN_CHOICE_CHARS)
        && choices.iter().any(|choice| choice == answer)
}

fn valid_free_answer(question: &str, answer: &str) -> bool {
    !question.is_empty() && !answer.is_empty()
}

/// True/false answers must have been coerced to a real boolean by now.
fn valid_true_false(question: &str, answer: &TruthValue) -> bool {
    !question.is_empty() && matches!(answer, TruthValue::Bool(_))
}

// =============================================================================
// Tests
// =============================================================================
