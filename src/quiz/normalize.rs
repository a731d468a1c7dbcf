//! Item Normalization
//!
//! Canonical text form applied to every parsed item before repair and
//! validation: straight quotes, single-space whitespace, trimmed ends.
//! Comparisons downstream (choice matching, answer equality) all assume
//! this form.

use crate::types::{QuizItem, TruthValue};

/// Normalize one text field: curly quotes to straight, whitespace runs
/// to single spaces, ends trimmed.
pub fn normalize_text(text: &str) -> String {
    let straightened: String = text
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .collect();
    straightened.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize every text field of an item, coercing `"true"`/`"false"`
/// strings on true/false items to real booleans.
pub fn normalize_item(item: QuizItem) -> QuizItem {
    match item {
        QuizItem::Mcq {
            question,
            choices,
            answer,
        } => QuizItem::Mcq {
            question: normalize_text(&question),
            choices: choices.iter().map(|choice| normalize_text(choice)).collect(),
            answer: normalize_text(&answer),
        },
        QuizItem::ShortAnswer { question, answer } => QuizItem::ShortAnswer {
            question: normalize_text(&question),
            answer: normalize_text(&answer),
        },
        QuizItem::TrueFalse { question, answer } => QuizItem::TrueFalse {
            question: normalize_text(&question),
            answer: coerce_truth(answer),
        },
        QuizItem::Identification { question, answer } => QuizItem::Identification {
            question: normalize_text(&question),
            answer: normalize_text(&answer),
        },
        QuizItem::Essay { question, answer } => QuizItem::Essay {
            question: normalize_text(&question),
            answer: normalize_text(&answer),
        },
    }
}

fn coerce_truth(answer: TruthValue) -> TruthValue {
    match answer {
        TruthValue::Bool(_) => answer,
        TruthValue::Text(text) => {
            let normalized = normalize_text(&text);
            if normalized.eq_ignore_ascii_case("true") {
                TruthValue::Bool(true)
            } else if normalized.eq_ignore_ascii_case("false") {
                TruthValue::Bool(false)
            } else {
                TruthValue::Text(normalized)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
