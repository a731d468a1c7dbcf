//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/quizforge/config.toml)
//! 3. Project config (./quizforge.toml)
//! 4. Environment variables (QUIZFORGE_*, GROQ_API_KEY)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
