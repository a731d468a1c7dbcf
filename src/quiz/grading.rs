//! Grading Sub-dispatch
//!
//! Three grading paths, cheapest first:
//!
//! 1. **Exact match** — mcq, true/false, and identification answers are
//!    compared in a canonical form (lowercased, non-alphanumerics
//!    stripped, leading articles dropped). No model call.
//! 2. **Model judgment** — short-answer and essay answers go through the
//!    dispatch loop with a TRUE/FALSE-only prompt and a tiny output cap.
//! 3. **Lexical fallback** — when the model call fails or its verdict is
//!    ambiguous, token overlap and edit-distance similarity decide.
//!
//! Grading never surfaces provider errors: a dead provider degrades to
//! the lexical heuristic instead of failing the whole submission.

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::ai::dispatch::{DispatchRequest, Dispatcher};
use crate::constants::grading::{OUTPUT_CAP, SHARED_TOKEN_MIN, SIMILARITY_THRESHOLD, TEMPERATURE};
use crate::quiz::prompt;
use crate::quiz::sanitize;
use crate::quiz::similarity::{similarity, token_set};
use crate::types::{
    GradeMethod, GradeOutcome, QuestionKind, QuizError, QuizItem, Result, TruthValue,
};

/// Article tokens ignored by canonical comparison
const ARTICLES: [&str; 3] = ["a", "an", "the"];

// =============================================================================
// Reference Answers
// =============================================================================

/// A stored reference answer, fetched by identifier from wherever the
/// caller persists quizzes.
#[derive(Debug, Clone)]
pub struct StoredReference {
    pub kind: QuestionKind,
    pub question: String,
    pub answer: String,
}

impl StoredReference {
    /// Reference view of a generated item. True/false answers are stored
    /// in their string form.
    pub fn from_item(item: &QuizItem) -> Self {
        let (kind, question, answer) = match item {
            QuizItem::Mcq {
                question, answer, ..
            } => (QuestionKind::Mcq, question, answer.clone()),
            QuizItem::ShortAnswer { question, answer } => {
                (QuestionKind::ShortAnswer, question, answer.clone())
            }
            QuizItem::TrueFalse { question, answer } => (
                QuestionKind::TrueFalse,
                question,
                match answer {
                    TruthValue::Bool(value) => value.to_string(),
                    TruthValue::Text(text) => text.clone(),
                },
            ),
            QuizItem::Identification { question, answer } => {
                (QuestionKind::Identification, question, answer.clone())
            }
            QuizItem::Essay { question, answer } => (QuestionKind::Essay, question, answer.clone()),
        };
        Self {
            kind,
            question: question.clone(),
            answer,
        }
    }
}

/// Supplies stored reference answers by item identifier.
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn reference(&self, item_id: &str) -> Result<StoredReference>;
}

/// A quiz held in memory, addressable by zero-based item index.
#[derive(Debug, Clone, Default)]
pub struct StoredQuiz {
    references: Vec<StoredReference>,
}

impl StoredQuiz {
    pub fn from_items(items: &[QuizItem]) -> Self {
        Self {
            references: items.iter().map(StoredReference::from_item).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

#[async_trait]
impl ReferenceSource for StoredQuiz {
    async fn reference(&self, item_id: &str) -> Result<StoredReference> {
        let index: usize = item_id
            .parse()
            .map_err(|_| QuizError::InvalidRequest(format!("bad item id: {item_id}")))?;
        self.references
            .get(index)
            .cloned()
            .ok_or_else(|| QuizError::InvalidRequest(format!("no item with id {item_id}")))
    }
}

/// One student answer to grade against its reference.
#[derive(Debug, Clone)]
pub struct GradeSubmission {
    pub reference: StoredReference,
    pub student_answer: String,
}

// =============================================================================
// Grading
// =============================================================================

/// Grade one answer, choosing the path by question kind.
pub async fn grade_answer(
    dispatcher: &Dispatcher,
    stop: &[String],
    reference: &StoredReference,
    student_answer: &str,
) -> GradeOutcome {
    match reference.kind {
        QuestionKind::Mcq | QuestionKind::TrueFalse | QuestionKind::Identification => {
            GradeOutcome {
                correct: canonical_equal(student_answer, &reference.answer),
                method: GradeMethod::ExactMatch,
            }
        }
        QuestionKind::ShortAnswer | QuestionKind::Essay => {
            judge_with_model(dispatcher, stop, reference, student_answer).await
        }
    }
}

/// Grade a batch concurrently; outcomes line up with the submissions.
pub async fn grade_many(
    dispatcher: &Dispatcher,
    stop: &[String],
    submissions: &[GradeSubmission],
) -> Vec<GradeOutcome> {
    join_all(
        submissions
            .iter()
            .map(|s| grade_answer(dispatcher, stop, &s.reference, &s.student_answer)),
    )
    .await
}

async fn judge_with_model(
    dispatcher: &Dispatcher,
    stop: &[String],
    reference: &StoredReference,
    student_answer: &str,
) -> GradeOutcome {
    let request = DispatchRequest {
        prompt: prompt::grading_prompt(&reference.question, &reference.answer, student_answer),
        output_cap: OUTPUT_CAP,
        temperature: TEMPERATURE,
        stop: stop.to_vec(),
    };

    match dispatcher.dispatch(&request).await {
        Ok(success) => {
            let cleaned = sanitize::clean_model_output(&success.text);
            match parse_verdict(&cleaned) {
                Some(correct) => GradeOutcome {
                    correct,
                    method: GradeMethod::ModelJudgment,
                },
                None => {
                    debug!(verdict = %cleaned, "ambiguous grading verdict; falling back");
                    lexical_outcome(student_answer, &reference.answer)
                }
            }
        }
        Err(error) => {
            warn!(%error, "grading dispatch failed; falling back");
            lexical_outcome(student_answer, &reference.answer)
        }
    }
}

// =============================================================================
// Canonical Comparison
// =============================================================================

/// Canonical form for exact-match grading: lowercase, strip everything
/// non-alphanumeric, drop article words. `"the Mitochondria!"` and
/// `"Mitochondria"` collapse to the same form.
pub fn canonical_identification(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty() && !ARTICLES.contains(token))
        .collect()
}

fn canonical_equal(student_answer: &str, reference_answer: &str) -> bool {
    let student = canonical_identification(student_answer);
    // two answers of only articles and punctuation should not match
    !student.is_empty() && student == canonical_identification(reference_answer)
}

/// Extract a verdict from cleaned grading output; `None` when the text
/// mentions both words or neither.
fn parse_verdict(cleaned: &str) -> Option<bool> {
    let lowered = cleaned.to_lowercase();
    match (lowered.contains("true"), lowered.contains("false")) {
        (true, false) => Some(true),
        (false, true) => Some(false),
        _ => None,
    }
}

// =============================================================================
// Lexical Fallback
// =============================================================================

fn lexical_outcome(student_answer: &str, reference_answer: &str) -> GradeOutcome {
    GradeOutcome {
        correct: lexical_correct(student_answer, reference_answer),
        method: GradeMethod::LexicalFallback,
    }
}

/// Correct when the answers share enough vocabulary or read almost the
/// same: ≥3 shared distinct tokens, or shared tokens covering half the
/// reference's vocabulary, or an edit-distance similarity ≥ 0.80.
pub fn lexical_correct(student_answer: &str, reference_answer: &str) -> bool {
    let student = token_set(student_answer);
    let reference = token_set(reference_answer);
    let shared = student.intersection(&reference).count();

    if shared >= SHARED_TOKEN_MIN {
        return true;
    }
    if !reference.is_empty() && shared * 2 >= reference.len() {
        return true;
    }
    similarity(
        &student_answer.to_lowercase(),
        &reference_answer.to_lowercase(),
    ) >= SIMILARITY_THRESHOLD
}

// =============================================================================
// Tests
// =============================================================================
