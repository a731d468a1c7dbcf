//! Error Types
//!
//! Unified error handling for quizforge.
//!
//! ## Taxonomy
//!
//! Terminal errors the caller sees:
//! - [`QuizError::BudgetExhausted`] — no eligible model under current
//!   budgets/cooldowns; raised without a network call; retry later.
//! - [`QuizError::ProvidersExhausted`] — every candidate model was
//!   skipped or failed; carries the last observed status/body.
//! - [`QuizError::Parse`] — sanitized provider text is not a well-formed
//!   JSON question array.
//! - [`QuizError::SchemaShortfall`] — valid items after one top-up still
//!   short of the requested counts; reduce counts or retry.
//!
//! Provider-level dispositions (decommissioned, rate-limited, transient,
//! unknown) stay internal to the dispatch loop; they drive skip, cooldown,
//! and bounded-retry decisions and never surface as distinct variants.

use crate::types::TypeCounts;
use thiserror::Error;

/// Top-level error type for all quizforge operations
#[derive(Error, Debug)]
pub enum QuizError {
    // -------------------------------------------------------------------------
    // Dispatch Errors
    // -------------------------------------------------------------------------
    /// No model was eligible before any network call was made
    #[error("budget exhausted: {reason}")]
    BudgetExhausted { reason: String },

    /// Every candidate model was skipped or failed
    #[error("all candidate models failed ({last})")]
    ProvidersExhausted { last: ProviderFailure },

    // -------------------------------------------------------------------------
    // Reconciliation Errors
    // -------------------------------------------------------------------------
    /// Sanitized provider output did not contain a decodable JSON array
    #[error("provider output is not a JSON question array: {detail}")]
    Parse { detail: String },

    /// One top-up round still left the result short of the request
    #[error("generation fell short after top-up: requested [{requested}], produced [{produced}]")]
    SchemaShortfall {
        requested: TypeCounts,
        produced: TypeCounts,
    },

    // -------------------------------------------------------------------------
    // Request / Configuration Errors
    // -------------------------------------------------------------------------
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("config error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Ambient Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Last observed provider failure, attached to [`QuizError::ProvidersExhausted`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    /// HTTP status if the failure came from a response; `None` for
    /// transport-level failures and for loops where every candidate was
    /// skipped before a call
    pub status: Option<u16>,
    /// Model that produced the failure, when one was attempted
    pub model: Option<String>,
    /// Error body or transport message
    pub detail: String,
}

impl ProviderFailure {
    /// Marker failure for loops where every candidate was skipped at
    /// re-check time and no network call was made.
    pub fn all_skipped() -> Self {
        Self {
            status: None,
            model: None,
            detail: "every candidate was skipped by budget or cooldown re-check".to_string(),
        }
    }
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.status, self.model.as_deref()) {
            (Some(status), Some(model)) => {
                write!(f, "last: {} from {}: {}", status, model, self.detail)
            }
            (Some(status), None) => write!(f, "last: {}: {}", status, self.detail),
            (None, Some(model)) => write!(f, "last: {}: {}", model, self.detail),
            (None, None) => write!(f, "last: {}", self.detail),
        }
    }
}

pub type Result<T> = std::result::Result<T, QuizError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl QuizError {
    /// Create a parse failure
    pub fn parse(detail: impl Into<String>) -> Self {
        Self::Parse {
            detail: detail.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether retrying the same request later may succeed.
    ///
    /// Budget and provider exhaustion clear with time; parse failures and
    /// shortfalls can clear on a fresh sample from a non-deterministic
    /// provider. Config and request errors need caller intervention.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::BudgetExhausted { .. }
            | Self::ProvidersExhausted { .. }
            | Self::Parse { .. }
            | Self::SchemaShortfall { .. }
            | Self::Http(_) => true,
            Self::InvalidRequest(_) | Self::Config(_) | Self::Io(_) | Self::Json(_) => false,
        }
    }

    /// Short advice string for CLI display
    pub fn user_message(&self) -> String {
        match self {
            Self::BudgetExhausted { .. } => {
                "Request and token budgets are exhausted; wait for the window to roll over".into()
            }
            Self::ProvidersExhausted { .. } => {
                "All configured models failed; check provider status and model names".into()
            }
            Self::Parse { .. } => {
                "The model returned unusable output; retrying usually resolves this".into()
            }
            Self::SchemaShortfall { .. } => {
                "The model produced fewer valid items than requested; retry or lower the counts"
                    .into()
            }
            Self::Config(message) => format!("Configuration problem: {}", message),
            other => other.to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
