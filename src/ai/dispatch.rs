//! Model Dispatch Loop
//!
//! Walks the preference-ordered model list for each completion: budget
//! re-check, token reservation, one provider call, failure
//! classification. Rate-limited models are parked on cooldown and the
//! loop moves on; transient server errors retry the same model with a
//! short backoff before falling through.
//!
//! ## Candidate order
//!
//! The first model that is both affordable and off cooldown is promoted
//! to the front; the rest follow in preference order. If no model passes
//! that pre-check, the call fails with a budget-exhaustion error before
//! any network traffic.
//!
//! ## Reservation settlement
//!
//! Every attempt reserves its token estimate up front. A success settles
//! to the usage the provider reported (the estimate stands when usage is
//! absent); any failure settles to prompt tokens only, returning the
//! reserved output allowance to the pool.

use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ai::budget::SharedBudget;
use crate::ai::cooldown::{CooldownKind, SharedCooldowns};
use crate::ai::estimate;
use crate::ai::provider::{CompletionRequest, ProviderReply, SharedBackend};
use crate::constants::dispatch as defaults;
use crate::types::{ProviderFailure, QuizError, Result};

// =============================================================================
// Classification Signatures
// =============================================================================

/// Body fragments that mark a model as permanently gone
const DECOMMISSION_SIGNATURES: [&str; 4] = [
    "decommissioned",
    "model_not_found",
    "model not found",
    "no longer supported",
];

/// Body fragments that mark a non-429/403 status as a rate problem
const RATE_BODY_HINTS: [&str; 8] = [
    "rate limit",
    "rate_limit",
    "too many requests",
    "quota",
    "tpm",
    "rpm",
    "tpd",
    "rpd",
];

/// Fragments that indicate a daily/quota window (long quarantine)
const LONG_COOLDOWN_HINTS: [&str; 6] = ["daily", "per day", "rpd", "tpd", "quota", "insufficient"];

/// Fragments that indicate a per-minute window (short quarantine)
const SHORT_COOLDOWN_HINTS: [&str; 4] = ["per minute", "tpm", "rpm", "rate"];

// =============================================================================
// Preference & Tuning
// =============================================================================

/// Ordered, deduplicated model preference list
#[derive(Debug, Clone)]
pub struct ModelPreference {
    models: Vec<String>,
}

impl ModelPreference {
    /// Build from an ordered iterable, dropping blanks and duplicates
    /// while keeping first-occurrence order.
    pub fn new<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut kept: Vec<String> = Vec::new();
        for model in models {
            let model = model.into();
            let trimmed = model.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !kept.iter().any(|existing| existing == trimmed) {
                kept.push(trimmed.to_string());
            }
        }
        Self { models: kept }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Retry and cooldown knobs for one dispatcher
#[derive(Debug, Clone)]
pub struct DispatchTuning {
    /// Same-model retries after a transient failure
    pub transient_retries: usize,
    /// First transient backoff delay; doubles per retry
    pub backoff_base: Duration,
    /// Quarantine length for per-minute rate signals
    pub short_cooldown_secs: u64,
    /// Quarantine length for daily/quota signals
    pub long_cooldown_secs: u64,
}

impl Default for DispatchTuning {
    fn default() -> Self {
        Self {
            transient_retries: defaults::TRANSIENT_RETRIES,
            backoff_base: Duration::from_millis(defaults::BACKOFF_BASE_MS),
            short_cooldown_secs: defaults::SHORT_COOLDOWN_SECS,
            long_cooldown_secs: defaults::LONG_COOLDOWN_SECS,
        }
    }
}

// =============================================================================
// Request / Success
// =============================================================================

/// One completion to route through the model list
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub prompt: String,
    pub output_cap: u32,
    pub temperature: f32,
    pub stop: Vec<String>,
}

/// A delivered completion and the model that produced it
#[derive(Debug, Clone)]
pub struct DispatchSuccess {
    pub text: String,
    pub model: String,
    /// Real usage when the provider reported it
    pub total_tokens: Option<u64>,
}

// =============================================================================
// Failure Classification
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// Model is gone; skip it for this call
    Decommissioned,
    /// Rate or quota signal; quarantine and move on
    RateLimited(CooldownKind),
    /// Server-side hiccup; worth retrying the same model
    Transient,
    /// Ledger denied the reservation at re-check time
    BudgetBlocked,
    /// Anything else; log and move on
    Unknown,
}

#[derive(Debug, Clone)]
struct AttemptFailure {
    disposition: Disposition,
    status: Option<u16>,
    detail: String,
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "status {}: {}", status, self.detail),
            None => write!(f, "{}", self.detail),
        }
    }
}

impl std::error::Error for AttemptFailure {}

/// Map a delivered error status and body onto a dispatch decision.
///
/// Decommission signatures win over everything else: a 400 whose body
/// says the model is gone must not be mistaken for a quota problem even
/// when the same body mentions limits.
fn classify_failure(status: u16, code: &str, message: &str) -> Disposition {
    let haystack = format!("{code} {message}").to_lowercase();
    if DECOMMISSION_SIGNATURES
        .iter()
        .any(|sig| haystack.contains(sig))
    {
        return Disposition::Decommissioned;
    }
    let rate_body = RATE_BODY_HINTS.iter().any(|hint| haystack.contains(hint));
    if status == 429 || status == 403 || rate_body {
        return Disposition::RateLimited(cooldown_kind(&haystack));
    }
    if matches!(status, 500 | 502 | 503) {
        return Disposition::Transient;
    }
    Disposition::Unknown
}

/// Pick the quarantine length from the error text.
///
/// Daily/quota wording wins over per-minute wording; a bare "exceeded"
/// with no window hint is treated as the long kind, since mistaking a
/// daily exhaustion for a one-minute wait burns requests for hours.
fn cooldown_kind(haystack: &str) -> CooldownKind {
    if LONG_COOLDOWN_HINTS.iter().any(|hint| haystack.contains(hint)) {
        return CooldownKind::Long;
    }
    if SHORT_COOLDOWN_HINTS
        .iter()
        .any(|hint| haystack.contains(hint))
    {
        return CooldownKind::Short;
    }
    if haystack.contains("exceeded") {
        return CooldownKind::Long;
    }
    CooldownKind::Short
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Routes completions across the model preference list under one shared
/// budget ledger and cooldown registry.
#[derive(Clone)]
pub struct Dispatcher {
    backend: SharedBackend,
    budget: SharedBudget,
    cooldowns: SharedCooldowns,
    preference: ModelPreference,
    tuning: DispatchTuning,
}

impl Dispatcher {
    pub fn new(
        backend: SharedBackend,
        budget: SharedBudget,
        cooldowns: SharedCooldowns,
        preference: ModelPreference,
        tuning: DispatchTuning,
    ) -> Self {
        Self {
            backend,
            budget,
            cooldowns,
            preference,
            tuning,
        }
    }

    pub fn budget(&self) -> &SharedBudget {
        &self.budget
    }

    pub fn cooldowns(&self) -> &SharedCooldowns {
        &self.cooldowns
    }

    pub fn preference(&self) -> &ModelPreference {
        &self.preference
    }

    /// Route one completion through the candidate list.
    ///
    /// Fails with [`QuizError::BudgetExhausted`] before any network call
    /// when no model is both affordable and off cooldown, and with
    /// [`QuizError::ProvidersExhausted`] carrying the last observed
    /// failure when every candidate was skipped or failed.
    pub async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchSuccess> {
        let estimate = estimate::reserve_estimate(&request.prompt, request.output_cap);
        let candidates = self.candidate_order(estimate)?;
        let call_id = Uuid::new_v4();
        debug!(
            %call_id,
            candidates = ?candidates,
            estimate,
            output_cap = request.output_cap,
            "dispatching completion"
        );

        let mut last_failure: Option<(String, AttemptFailure)> = None;

        for model in &candidates {
            if self.cooldowns.is_on_cooldown(model) {
                debug!(%call_id, model, "skipping model on cooldown");
                continue;
            }

            match self.call_with_retries(model, request, estimate).await {
                Ok(success) => {
                    info!(
                        %call_id,
                        model,
                        tokens = ?success.total_tokens,
                        "completion delivered"
                    );
                    return Ok(success);
                }
                Err(failure) => {
                    match failure.disposition {
                        Disposition::RateLimited(kind) => {
                            let secs = self.cooldown_secs(kind);
                            warn!(
                                %call_id,
                                model,
                                kind = %kind,
                                cooldown_secs = secs,
                                error = %failure,
                                "rate limited; quarantining model"
                            );
                            self.cooldowns.set_cooldown(model, secs);
                        }
                        Disposition::Decommissioned => {
                            warn!(%call_id, model, error = %failure, "model unavailable; skipping");
                        }
                        Disposition::BudgetBlocked => {
                            // a skip, not a provider failure: leaves last_failure alone
                            debug!(%call_id, model, reason = %failure, "budget denied at re-check");
                            continue;
                        }
                        Disposition::Transient | Disposition::Unknown => {
                            warn!(%call_id, model, error = %failure, "model attempt failed");
                        }
                    }
                    last_failure = Some((model.clone(), failure));
                }
            }
        }

        let last = match last_failure {
            Some((model, failure)) => ProviderFailure {
                status: failure.status,
                model: Some(model),
                detail: failure.detail,
            },
            None => ProviderFailure::all_skipped(),
        };
        Err(QuizError::ProvidersExhausted { last })
    }

    /// Candidate list: first affordable, non-cooled model promoted to the
    /// front, then the remaining preference order.
    fn candidate_order(&self, estimate: u64) -> Result<Vec<String>> {
        let models = self.preference.models();
        if models.is_empty() {
            return Err(QuizError::config("no models configured"));
        }

        // The ledger is model-independent, so affordability is one check.
        let affordable = self.budget.can_afford(estimate);
        let promoted = match &affordable {
            Ok(()) => models
                .iter()
                .position(|model| !self.cooldowns.is_on_cooldown(model)),
            Err(_) => None,
        };

        let Some(first) = promoted else {
            let reason = match affordable {
                Err(denial) => denial.to_string(),
                Ok(()) => format!("all {} configured models are on cooldown", models.len()),
            };
            return Err(QuizError::BudgetExhausted { reason });
        };

        let mut order = Vec::with_capacity(models.len());
        order.push(models[first].clone());
        for (index, model) in models.iter().enumerate() {
            if index != first {
                order.push(model.clone());
            }
        }
        Ok(order)
    }

    /// One model's attempt, with bounded same-model retries on transient
    /// failures (300ms then 600ms by default).
    async fn call_with_retries(
        &self,
        model: &str,
        request: &DispatchRequest,
        estimate: u64,
    ) -> std::result::Result<DispatchSuccess, AttemptFailure> {
        (|| self.attempt_once(model, request, estimate))
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(self.tuning.backoff_base)
                    .with_factor(defaults::BACKOFF_FACTOR)
                    .with_max_times(self.tuning.transient_retries),
            )
            .when(|failure: &AttemptFailure| failure.disposition == Disposition::Transient)
            .notify(|failure: &AttemptFailure, delay: Duration| {
                warn!(
                    model,
                    delay_ms = delay.as_millis() as u64,
                    error = %failure,
                    "transient provider failure; backing off"
                );
            })
            .await
    }

    /// Reserve, call, settle. Failures settle to prompt tokens only.
    async fn attempt_once(
        &self,
        model: &str,
        request: &DispatchRequest,
        estimate: u64,
    ) -> std::result::Result<DispatchSuccess, AttemptFailure> {
        if let Err(denial) = self.budget.try_reserve(estimate) {
            return Err(AttemptFailure {
                disposition: Disposition::BudgetBlocked,
                status: None,
                detail: denial.to_string(),
            });
        }

        let completion = CompletionRequest {
            model: model.to_string(),
            prompt: request.prompt.clone(),
            temperature: request.temperature,
            max_tokens: request.output_cap,
            stop: request.stop.clone(),
        };
        let prompt_tokens = estimate::prompt_tokens(&request.prompt);

        match self.backend.complete(&completion).await {
            Ok(ProviderReply::Success { text, total_tokens }) => {
                // absent usage leaves the pessimistic reservation standing
                let actual = total_tokens.unwrap_or(estimate);
                self.budget.adjust_after_response(estimate, actual);
                Ok(DispatchSuccess {
                    text,
                    model: model.to_string(),
                    total_tokens,
                })
            }
            Ok(ProviderReply::Failure {
                status,
                code,
                message,
            }) => {
                self.budget.adjust_after_response(estimate, prompt_tokens);
                Err(AttemptFailure {
                    disposition: classify_failure(status, &code, &message),
                    status: Some(status),
                    detail: format!("{code}: {message}"),
                })
            }
            Err(transport) => {
                self.budget.adjust_after_response(estimate, prompt_tokens);
                Err(AttemptFailure {
                    disposition: Disposition::Transient,
                    status: None,
                    detail: transport.to_string(),
                })
            }
        }
    }

    fn cooldown_secs(&self, kind: CooldownKind) -> u64 {
        match kind {
            CooldownKind::Short => self.tuning.short_cooldown_secs,
            CooldownKind::Long => self.tuning.long_cooldown_secs,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
