//! Quiz Generation Engine
//!
//! Dispatch-backed pipeline that turns learning material into a typed
//! question set and grades student answers against stored references.
//!
//! ## Pipeline
//!
//! ```text
//! prompt → dispatch → sanitize → extract → normalize → repair → validate
//!                                                                  ↓
//!       ordered items ← trim ← (one scoped top-up if short) ← bucket
//! ```
//!
//! ## Guarantees
//!
//! - Output is all-or-nothing: exactly the requested per-type counts in
//!   the fixed type order, or an error. Never a partial set.
//! - At most one top-up call per generation, scoped to the shortfall.
//! - Grading degrades instead of failing: a dead provider falls back to
//!   a lexical heuristic.

pub mod extract;
pub mod grading;
pub mod normalize;
pub mod prompt;
pub mod reconcile;
pub mod repair;
pub mod sanitize;
pub mod similarity;
pub mod validate;

pub use grading::{GradeSubmission, ReferenceSource, StoredQuiz, StoredReference};
pub use reconcile::ItemBuckets;

use tracing::{debug, info, instrument, warn};

use crate::ai::dispatch::{DispatchRequest, DispatchSuccess, Dispatcher};
use crate::constants::generation;
use crate::types::{
    Difficulty, GenerationOutcome, GradeOutcome, QuizError, RequestSpec, Result, TypeCounts,
};

// =============================================================================
// Settings
// =============================================================================

/// Generation knobs, normally filled from configuration
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Output-token cap for the primary generation call
    pub output_token_cap: u32,
    /// Sampling temperature for generation calls
    pub temperature: f32,
    /// Stop sequences forwarded with every call
    pub stop_sequences: Vec<String>,
    /// Source material beyond this many characters is dropped
    pub max_source_chars: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            output_token_cap: generation::DEFAULT_OUTPUT_CAP,
            temperature: generation::DEFAULT_TEMPERATURE,
            stop_sequences: generation::DEFAULT_STOP_SEQUENCES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_source_chars: generation::DEFAULT_MAX_SOURCE_CHARS,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Quiz engine: a budget-tracked dispatcher plus generation settings.
///
/// Clones share the dispatcher's budget and cooldown state, so several
/// engine handles can serve concurrent requests against one quota.
#[derive(Clone)]
pub struct QuizEngine {
    dispatcher: Dispatcher,
    settings: GenerationSettings,
}

impl QuizEngine {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            settings: GenerationSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Generate a quiz: one primary call, at most one shortfall-scoped
    /// top-up, then trim to exactly the requested counts.
    ///
    /// A failed or unusable top-up merges nothing; the result is then
    /// judged on the first pass alone. Anything still missing raises
    /// [`QuizError::SchemaShortfall`] rather than returning a partial set.
    #[instrument(
        skip(self, request),
        fields(requested = %request.counts, difficulty = %request.difficulty)
    )]
    pub async fn generate(&self, request: &RequestSpec) -> Result<GenerationOutcome> {
        request.validate()?;
        let source = self.bounded_source(&request.source_text);

        let primary = self
            .generation_call(
                source,
                &request.counts,
                request.difficulty,
                self.settings.output_token_cap,
            )
            .await?;
        let model_used = primary.model.clone();
        let mut total_tokens = primary.total_tokens.unwrap_or(0);
        let mut buckets = reconcile::process_output(&primary.text)?;

        let shortfall = request.counts.shortfall(&buckets.counts());
        if !shortfall.is_empty() {
            info!(%shortfall, "first pass fell short; requesting a top-up");
            let cap = reconcile::top_up_cap(
                self.settings.output_token_cap,
                shortfall.total(),
                request.counts.total(),
            );
            match self
                .generation_call(source, &shortfall, request.difficulty, cap)
                .await
            {
                Ok(top_up) => {
                    total_tokens += top_up.total_tokens.unwrap_or(0);
                    match reconcile::process_output(&top_up.text) {
                        Ok(extra) => buckets.merge(extra),
                        Err(error) => {
                            warn!(%error, "top-up output unusable; keeping first-pass items");
                        }
                    }
                }
                Err(error) => warn!(%error, "top-up dispatch failed; keeping first-pass items"),
            }
        }

        buckets.trim_to(&request.counts);
        let produced = buckets.counts();
        if produced != request.counts {
            return Err(QuizError::SchemaShortfall {
                requested: request.counts,
                produced,
            });
        }

        debug!(snapshot = ?self.dispatcher.budget().snapshot(), "budget after generation");
        Ok(GenerationOutcome {
            items: buckets.into_ordered(),
            model_used,
            total_tokens_reported: total_tokens,
        })
    }

    /// Grade one student answer against its stored reference.
    pub async fn grade(&self, reference: &StoredReference, student_answer: &str) -> GradeOutcome {
        grading::grade_answer(
            &self.dispatcher,
            &self.settings.stop_sequences,
            reference,
            student_answer,
        )
        .await
    }

    /// Grade a batch of submissions concurrently.
    pub async fn grade_many(&self, submissions: &[GradeSubmission]) -> Vec<GradeOutcome> {
        grading::grade_many(&self.dispatcher, &self.settings.stop_sequences, submissions).await
    }

    async fn generation_call(
        &self,
        source: &str,
        counts: &TypeCounts,
        difficulty: Difficulty,
        output_cap: u32,
    ) -> Result<DispatchSuccess> {
        let request = DispatchRequest {
            prompt: prompt::generation_prompt(source, counts, difficulty),
            output_cap,
            temperature: self.settings.temperature,
            stop: self.settings.stop_sequences.clone(),
        };
        self.dispatcher.dispatch(&request).await
    }

    /// Cap the learning material at the configured character bound.
    fn bounded_source<'a>(&self, text: &'a str) -> &'a str {
        match text.char_indices().nth(self.settings.max_source_chars) {
            Some((cut, _)) => {
                warn!(
                    limit = self.settings.max_source_chars,
                    "source text truncated"
                );
                &text[..cut]
            }
            None => text,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::budget::{BudgetLimits, BudgetTracker};
    use crate::ai::clock::ManualClock;
    use crate::ai::cooldown::CooldownRegistry;
    use crate::ai::dispatch::{DispatchTuning, ModelPreference};
    use crate::ai::provider::ProviderReply;
    use crate::ai::provider::testing::MockBackend;
    use crate::types::QuestionKind;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    const SOURCE: &str = "Photosynthesis converts light energy into chemical energy. \
        Chlorophyll absorbs mostly red and blue light, which is why leaves look green.";

    fn engine_with_models(
        models: &[&str],
        replies: Vec<crate::types::Result<ProviderReply>>,
    ) -> (QuizEngine, Arc<MockBackend>) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 30).unwrap());
        let backend = MockBackend::new(replies);
        let dispatcher = Dispatcher::new(
            backend.clone(),
            BudgetTracker::shared(BudgetLimits::default(), clock.clone()),
            CooldownRegistry::shared(clock),
            ModelPreference::new(models.iter().copied()),
            DispatchTuning::default(),
        );
        (QuizEngine::new(dispatcher), backend)
    }

    fn engine(replies: Vec<crate::types::Result<ProviderReply>>) -> (QuizEngine, Arc<MockBackend>) {
        engine_with_models(&["llama-a", "llama-b"], replies)
    }

    fn request(counts: TypeCounts) -> RequestSpec {
        RequestSpec {
            source_text: SOURCE.to_string(),
            counts,
            difficulty: Difficulty::Intermediate,
        }
    }

    fn mcq_json(question: &str) -> String {
        format!(
            r#"{{"type": "mcq", "question": "{question}", "choices": ["Chlorophyll", "Cellulose", "Keratin", "Melanin"], "answer": "Chlorophyll"}}"#
        )
    }

    fn short_answer_json(question: &str) -> String {
        format!(
            r#"{{"type": "short_answer", "question": "{question}", "answer": "It absorbs red and blue light"}}"#
        )
    }

    fn true_false_json(question: &str) -> String {
        format!(r#"{{"type": "true_false", "question": "{question}", "answer": true}}"#)
    }

    fn array(items: &[String]) -> String {
        format!("[\n{}\n]", items.join(",\n"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_returns_requested_items_in_order() {
        let body = array(&[
            true_false_json("Leaves look green because chlorophyll reflects green light?"),
            mcq_json("Which pigment absorbs red and blue light?"),
        ]);
        let (engine, backend) =
            engine(vec![MockBackend::success(&format!("Sure!\n{body}"), 120)]);

        let outcome = engine
            .generate(&request(TypeCounts {
                mcq: 1,
                true_false: 1,
                ..TypeCounts::default()
            }))
            .await
            .unwrap();

        assert_eq!(backend.calls(), 1);
        assert_eq!(outcome.items.len(), 2);
        // output order is fixed by type, not by provider order
        assert_eq!(outcome.items[0].kind(), QuestionKind::Mcq);
        assert_eq!(outcome.items[1].kind(), QuestionKind::TrueFalse);
        assert_eq!(outcome.model_used, "llama-a");
        assert_eq!(outcome.total_tokens_reported, 120);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exact_first_pass_skips_top_up() {
        let body = array(&[mcq_json("Q1?"), mcq_json("Q2?")]);
        let (engine, backend) = engine(vec![MockBackend::success(&body, 90)]);

        let outcome = engine
            .generate(&request(TypeCounts {
                mcq: 2,
                ..TypeCounts::default()
            }))
            .await
            .unwrap();

        assert_eq!(backend.calls(), 1);
        assert_eq!(outcome.items.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_surplus_items_trimmed_to_request() {
        let body = array(&[mcq_json("Q1?"), mcq_json("Q2?"), mcq_json("Q3?")]);
        let (engine, _backend) = engine(vec![MockBackend::success(&body, 90)]);

        let outcome = engine
            .generate(&request(TypeCounts {
                mcq: 2,
                ..TypeCounts::default()
            }))
            .await
            .unwrap();

        assert_eq!(outcome.items.len(), 2);
        assert_eq!(outcome.items[0].question(), "Q1?");
        assert_eq!(outcome.items[1].question(), "Q2?");
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_top_up_scoped_to_shortfall() {
        let first = array(&[
            mcq_json("M1?"),
            mcq_json("M2?"),
            short_answer_json("S1?"),
            short_answer_json("S2?"),
        ]);
        // the top-up over-delivers; the surplus is trimmed
        let top_up = array(&[mcq_json("M3?"), mcq_json("M4?")]);
        let (engine, backend) = engine(vec![
            MockBackend::success(&first, 400),
            MockBackend::success(&top_up, 80),
        ]);

        let outcome = engine
            .generate(&request(TypeCounts {
                mcq: 3,
                short_answer: 2,
                ..TypeCounts::default()
            }))
            .await
            .unwrap();

        assert_eq!(backend.calls(), 2);

        let requests = backend.requests();
        let top_up_prompt = &requests[1].prompt;
        assert!(top_up_prompt.contains("a total of 1 questions"));
        assert!(top_up_prompt.contains("multiple choice"));
        assert!(!top_up_prompt.contains("short answer"));
        // proportional cap: ceil(4096 * 1 / 5) = 820
        assert_eq!(requests[1].max_tokens, 820);

        assert_eq!(outcome.items.len(), 5);
        let questions: Vec<&str> = outcome.items.iter().map(|i| i.question()).collect();
        // first-pass items outrank top-up items within a type
        assert_eq!(questions, vec!["M1?", "M2?", "M3?", "S1?", "S2?"]);
        assert_eq!(outcome.total_tokens_reported, 480);
        assert_eq!(outcome.model_used, "llama-a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unusable_top_up_reports_shortfall_not_partial() {
        let first = array(&[mcq_json("M1?"), mcq_json("M2?")]);
        let (engine, backend) = engine(vec![
            MockBackend::success(&first, 200),
            MockBackend::success("I could not find more questions to ask.", 20),
        ]);

        let error = engine
            .generate(&request(TypeCounts {
                mcq: 3,
                ..TypeCounts::default()
            }))
            .await
            .unwrap_err();

        assert_eq!(backend.calls(), 2);
        match error {
            QuizError::SchemaShortfall {
                requested,
                produced,
            } => {
                assert_eq!(requested.mcq, 3);
                assert_eq!(produced.mcq, 2);
            }
            other => panic!("expected SchemaShortfall, got {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_top_up_dispatch_degrades_to_shortfall() {
        let first = array(&[mcq_json("M1?")]);
        let (engine, backend) = engine_with_models(
            &["llama-a"],
            vec![
                MockBackend::success(&first, 150),
                MockBackend::failure(429, "rate_limit_exceeded", "Rate limit reached"),
            ],
        );

        let error = engine
            .generate(&request(TypeCounts {
                mcq: 2,
                ..TypeCounts::default()
            }))
            .await
            .unwrap_err();

        assert_eq!(backend.calls(), 2);
        assert!(matches!(error, QuizError::SchemaShortfall { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_parse_failure_propagates() {
        let (engine, _backend) =
            engine(vec![MockBackend::success("No JSON here, sorry.", 15)]);

        let error = engine
            .generate(&request(TypeCounts {
                mcq: 1,
                ..TypeCounts::default()
            }))
            .await
            .unwrap_err();

        assert!(matches!(error, QuizError::Parse { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_source_rejected_before_any_call() {
        let (engine, backend) = engine(vec![]);
        let spec = RequestSpec {
            source_text: "   ".to_string(),
            counts: TypeCounts {
                mcq: 1,
                ..TypeCounts::default()
            },
            difficulty: Difficulty::Easy,
        };

        let error = engine.generate(&spec).await.unwrap_err();
        assert!(matches!(error, QuizError::InvalidRequest(_)));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_truncated_to_configured_chars() {
        let body = array(&[mcq_json("Q1?")]);
        let (engine, backend) = engine(vec![MockBackend::success(&body, 60)]);
        let engine = engine.with_settings(GenerationSettings {
            max_source_chars: 24,
            ..GenerationSettings::default()
        });

        engine
            .generate(&request(TypeCounts {
                mcq: 1,
                ..TypeCounts::default()
            }))
            .await
            .unwrap();

        let prompt = backend.requests()[0].prompt.clone();
        // 24 chars ends right after "converts "
        assert!(prompt.contains("Photosynthesis converts \n\"\"\""));
        assert!(!prompt.contains("light energy"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_call_carries_settings() {
        let body = array(&[mcq_json("Q1?")]);
        let (engine, backend) = engine(vec![MockBackend::success(&body, 60)]);

        engine
            .generate(&request(TypeCounts {
                mcq: 1,
                ..TypeCounts::default()
            }))
            .await
            .unwrap();

        let sent = backend.requests().remove(0);
        assert_eq!(sent.max_tokens, generation::DEFAULT_OUTPUT_CAP);
        assert_eq!(sent.temperature, generation::DEFAULT_TEMPERATURE);
        assert_eq!(sent.stop, vec!["```".to_string(), "<think>".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grade_uses_engine_stop_sequences() {
        let (engine, backend) = engine(vec![MockBackend::success("TRUE", 3)]);
        let reference = StoredReference {
            kind: QuestionKind::ShortAnswer,
            question: "Why do leaves look green?".to_string(),
            answer: "Chlorophyll reflects green light".to_string(),
        };

        let outcome = engine.grade(&reference, "Green light is reflected").await;
        assert!(outcome.correct);
        let sent = backend.requests().remove(0);
        assert_eq!(sent.stop, vec!["```".to_string(), "<think>".to_string()]);
    }
}
