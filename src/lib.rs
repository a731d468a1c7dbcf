//! QuizForge - Budget-Aware Quiz Generation Engine
//!
//! Turns plain-text learning material into typed quizzes through a
//! budget-tracked LLM dispatch loop with model failover, then reconciles
//! the provider's output into exactly the requested question set.
//!
//! ## Core Features
//!
//! - **Failover Dispatch**: Ordered model preference with cooldowns,
//!   bounded transient retries, and decommission handling
//! - **Advisory Budgets**: Per-minute and per-day request/token windows
//!   checked before any network call
//! - **Tolerant Reconciliation**: Sanitizes, repairs, and validates
//!   model output; one shortfall-scoped top-up call, never a partial set
//! - **Three-Path Grading**: Canonical exact match, TRUE/FALSE model
//!   judgment, and a lexical fallback when the provider is down
//!
//! ## Quick Start
//!
//! ```ignore
//! use quizforge::cli::build_engine;
//! use quizforge::config::ConfigLoader;
//! use quizforge::types::{Difficulty, RequestSpec, TypeCounts};
//!
//! let config = ConfigLoader::load()?;
//! let engine = build_engine(&config)?;
//! let outcome = engine
//!     .generate(&RequestSpec {
//!         source_text: material,
//!         counts: TypeCounts { mcq: 5, ..TypeCounts::default() },
//!         difficulty: Difficulty::Intermediate,
//!     })
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: dispatch loop, budget tracker, cooldowns, provider backend
//! - [`quiz`]: generation engine, output reconciliation, grading
//! - [`config`]: layered configuration (defaults, files, env)
//! - [`cli`]: command implementations
//! - [`types`]: domain model and error types

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod quiz;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::{QuizError, Result};

// Engine
pub use quiz::{GenerationSettings, QuizEngine};

// =============================================================================
// Dispatch Re-exports
// =============================================================================

pub use ai::{
    BudgetLimits,
    BudgetTracker,
    CompletionBackend,
    CooldownRegistry,
    DispatchRequest,
    Dispatcher,
    HttpBackend,
    ModelPreference,
};

// =============================================================================
// Domain Re-exports
// =============================================================================

pub use types::{
    Difficulty, GenerationOutcome, GradeMethod, GradeOutcome, QuestionKind, QuizItem, RequestSpec,
    TypeCounts,
};
