//! Command-Line Interface
//!
//! Thin glue between configuration and the quiz engine. Each command
//! lives in its own module and returns the crate's `Result`.

pub mod commands;

use std::sync::Arc;

use crate::ai::budget::BudgetTracker;
use crate::ai::clock::system_clock;
use crate::ai::cooldown::CooldownRegistry;
use crate::ai::dispatch::Dispatcher;
use crate::ai::provider::{HttpBackend, SharedBackend};
use crate::config::Config;
use crate::quiz::QuizEngine;
use crate::types::Result;

/// Assemble a ready-to-use engine from resolved configuration.
pub fn build_engine(config: &Config) -> Result<QuizEngine> {
    let backend: SharedBackend = Arc::new(HttpBackend::new(
        &config.provider.api_base,
        config.api_key()?,
        config.timeout(),
    )?);

    let clock = system_clock();
    let dispatcher = Dispatcher::new(
        backend,
        BudgetTracker::shared(config.budget_limits(), clock.clone()),
        CooldownRegistry::shared(clock),
        config.model_preference(),
        config.dispatch_tuning(),
    );

    Ok(QuizEngine::new(dispatcher).with_settings(config.generation_settings()))
}
