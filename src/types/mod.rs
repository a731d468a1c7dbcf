//! Core Types
//!
//! Domain model and error types shared across the crate.

pub mod error;
pub mod item;

pub use error::{ProviderFailure, QuizError, Result};
pub use item::{
    Difficulty, GenerationOutcome, GradeMethod, GradeOutcome, QuestionKind, QuizItem, RequestSpec,
    TruthValue, TypeCounts,
};
