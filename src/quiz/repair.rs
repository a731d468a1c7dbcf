//! MCQ Repair
//!
//! Two salvage passes for multiple-choice items, applied after
//! normalization and before validation:
//!
//! 1. **Choice pruning** — more than four choices are cut down to four,
//!    keeping the choice that equals the current answer in front so the
//!    correct option always survives truncation.
//! 2. **Answer alignment** — an answer that matches no surviving choice
//!    is snapped to the most similar choice's exact stored text when the
//!    similarity clears 0.6; otherwise the item is left for validation
//!    to drop.

use crate::constants::repair::{ANSWER_SIMILARITY_THRESHOLD, MCQ_CHOICE_COUNT};
use crate::quiz::similarity::similarity;
use crate::types::QuizItem;

/// Repair one item. Non-mcq items pass through untouched.
pub fn repair_mcq(item: QuizItem) -> QuizItem {
    let QuizItem::Mcq {
        question,
        choices,
        answer,
    } = item
    else {
        return item;
    };

    let choices = prune_choices(choices, &answer);

    if choices.iter().any(|choice| choice == &answer) {
        return QuizItem::Mcq {
            question,
            choices,
            answer,
        };
    }

    let answer = align_answer(&choices, answer);
    QuizItem::Mcq {
        question,
        choices,
        answer,
    }
}

/// Cut an oversized choice list down to four, answer-first when the
/// answer is present, original order otherwise.
fn prune_choices(choices: Vec<String>, answer: &str) -> Vec<String> {
    if choices.len() <= MCQ_CHOICE_COUNT {
        return choices;
    }

    let Some(position) = choices.iter().position(|choice| choice == answer) else {
        let mut kept = choices;
        kept.truncate(MCQ_CHOICE_COUNT);
        return kept;
    };

    let mut kept = Vec::with_capacity(MCQ_CHOICE_COUNT);
    kept.push(choices[position].clone());
    for (index, choice) in choices.into_iter().enumerate() {
        if kept.len() == MCQ_CHOICE_COUNT {
            break;
        }
        if index != position {
            kept.push(choice);
        }
    }
    kept
}

/// Snap the answer to its closest choice when the best case-folded
/// similarity clears the threshold; ties keep the earliest choice.
fn align_answer(choices: &[String], answer: String) -> String {
    let folded_answer = answer.to_lowercase();
    let mut best: Option<(usize, f64)> = None;
    for (index, choice) in choices.iter().enumerate() {
        let ratio = similarity(&folded_answer, &choice.to_lowercase());
        let better = match best {
            Some((_, best_ratio)) => ratio > best_ratio,
            None => true,
        };
        if better {
            best = Some((index, ratio));
        }
    }

    match best {
        Some((index, ratio)) if ratio >= ANSWER_SIMILARITY_THRESHOLD => choices[index].clone(),
        _ => answer,
    }
}

// =============================================================================
// Tests
// =============================================================================
