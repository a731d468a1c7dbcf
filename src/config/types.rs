//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/quizforge/) and project (./quizforge.toml)
//! level configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use secrecy::SecretString;

use crate::ai::budget::BudgetLimits;
use crate::ai::dispatch::{DispatchTuning, ModelPreference};
use crate::constants::{budget, dispatch, generation};
use crate::quiz::GenerationSettings;
use crate::types::QuizError;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Provider endpoint settings
    pub provider: ProviderConfig,

    /// Model failover preference
    pub models: ModelsConfig,

    /// Advisory request/token budget ceilings
    pub budget: BudgetConfig,

    /// Quiz generation settings
    pub generation: GenerationConfig,

    /// Dispatch loop tuning
    pub dispatch: DispatchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            provider: ProviderConfig::default(),
            models: ModelsConfig::default(),
            budget: BudgetConfig::default(),
            generation: GenerationConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `QuizError::Config` on validation failure.
    pub fn validate(&self) -> crate::types::Result<()> {
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(QuizError::Config(format!(
                "generation temperature must be between 0.0 and 2.0, got {}",
                self.generation.temperature
            )));
        }

        if self.provider.timeout_secs == 0 {
            return Err(QuizError::Config(
                "provider timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.model_preference().is_empty() {
            return Err(QuizError::Config(
                "models.preference must list at least one model".to_string(),
            ));
        }

        if self.generation.output_token_cap == 0 {
            return Err(QuizError::Config(
                "generation output_token_cap must be greater than 0".to_string(),
            ));
        }

        if self.generation.max_source_chars == 0 {
            return Err(QuizError::Config(
                "generation max_source_chars must be greater than 0".to_string(),
            ));
        }

        if self.budget.rpm == 0
            || self.budget.rpd == 0
            || self.budget.tpm == 0
            || self.budget.tpd == 0
        {
            return Err(QuizError::Config(
                "budget ceilings (rpm, rpd, tpm, tpd) must all be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolved API key, with guidance when unset
    pub fn api_key(&self) -> crate::types::Result<SecretString> {
        self.provider
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(|key| SecretString::from(key.to_string()))
            .ok_or_else(|| {
                QuizError::config(
                    "no API key configured; set GROQ_API_KEY or provider.api_key in config",
                )
            })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.provider.timeout_secs)
    }

    pub fn budget_limits(&self) -> BudgetLimits {
        BudgetLimits {
            rpm: self.budget.rpm,
            rpd: self.budget.rpd,
            tpm: self.budget.tpm,
            tpd: self.budget.tpd,
        }
    }

    pub fn model_preference(&self) -> ModelPreference {
        ModelPreference::new(self.models.preference.iter().cloned())
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            output_token_cap: self.generation.output_token_cap,
            temperature: self.generation.temperature,
            stop_sequences: self.generation.stop_sequences.clone(),
            max_source_chars: self.generation.max_source_chars,
        }
    }

    pub fn dispatch_tuning(&self) -> DispatchTuning {
        DispatchTuning {
            transient_retries: self.dispatch.transient_retries,
            backoff_base: Duration::from_millis(self.dispatch.backoff_base_ms),
            short_cooldown_secs: self.dispatch.short_cooldown_secs,
            long_cooldown_secs: self.dispatch.long_cooldown_secs,
        }
    }

    /// Copy with the API key masked, for display
    pub fn redacted(&self) -> Config {
        let mut shown = self.clone();
        if shown.provider.api_key.is_some() {
            shown.provider.api_key = Some("[REDACTED]".to_string());
        }
        shown
    }
}

// =============================================================================
// Provider Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of an OpenAI-compatible chat completions API
    pub api_base: String,

    /// API key; prefer the GROQ_API_KEY environment variable
    pub api_key: Option<String>,

    /// Per-call request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.groq.com/openai/v1".to_string(),
            api_key: None,
            timeout_secs: dispatch::DEFAULT_TIMEOUT_SECS,
        }
    }
}

// =============================================================================
// Model Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Failover order: the first entry is the preferred model
    pub preference: Vec<String>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            preference: vec![
                "llama-3.3-70b-versatile".to_string(),
                "llama-3.1-8b-instant".to_string(),
            ],
        }
    }
}

// =============================================================================
// Budget Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Requests per minute
    pub rpm: u32,

    /// Requests per day
    pub rpd: u32,

    /// Tokens per minute
    pub tpm: u64,

    /// Tokens per day
    pub tpd: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            rpm: budget::DEFAULT_RPM,
            rpd: budget::DEFAULT_RPD,
            tpm: budget::DEFAULT_TPM,
            tpd: budget::DEFAULT_TPD,
        }
    }
}

// =============================================================================
// Generation Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Output-token cap for a generation call
    pub output_token_cap: u32,

    /// Sampling temperature (0.0 = deterministic)
    pub temperature: f32,

    /// Stop sequences forwarded with every call
    pub stop_sequences: Vec<String>,

    /// Source material beyond this many characters is dropped
    pub max_source_chars: usize,
}

impl Default for GenerationConfig {
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
// Dispatch Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Retries against the same model after a transient failure
    pub transient_retries: usize,

    /// Base delay before the first transient retry, in milliseconds
    pub backoff_base_ms: u64,

    /// Quarantine after per-minute rate signals, in seconds
    pub short_cooldown_secs: u64,

    /// Quarantine after daily/quota signals, in seconds
    pub long_cooldown_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            transient_retries: dispatch::TRANSIENT_RETRIES,
            backoff_base_ms: dispatch::BACKOFF_BASE_MS,
            short_cooldown_secs: dispatch::SHORT_COOLDOWN_SECS,
            long_cooldown_secs: dispatch::LONG_COOLDOWN_SECS,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.provider.api_base, "https://api.groq.com/openai/v1");
        assert_eq!(config.models.preference.len(), 2);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let mut config = Config::default();
        config.generation.temperature = 9.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.provider.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_model_list() {
        let mut config = Config::default();
        config.models.preference = vec!["   ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_budget_ceiling() {
        let mut config = Config::default();
        config.budget.tpm = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_requires_a_value() {
        let mut config = Config::default();
        assert!(config.api_key().is_err());

        config.provider.api_key = Some("  ".to_string());
        assert!(config.api_key().is_err());

        config.provider.api_key = Some("gsk-test".to_string());
        assert!(config.api_key().is_ok());
    }

    #[test]
    fn test_redacted_masks_api_key() {
        let mut config = Config::default();
        config.provider.api_key = Some("gsk-secret".to_string());
        let shown = config.redacted();
        assert_eq!(shown.provider.api_key.as_deref(), Some("[REDACTED]"));
        // original untouched
        assert_eq!(config.provider.api_key.as_deref(), Some("gsk-secret"));
    }

    #[test]
    fn test_conversions_mirror_sections() {
        let config = Config::default();
        let limits = config.budget_limits();
        assert_eq!(limits.rpm, 30);
        assert_eq!(limits.tpm, 6_000);

        let tuning = config.dispatch_tuning();
        assert_eq!(tuning.transient_retries, 2);
        assert_eq!(tuning.backoff_base.as_millis(), 300);

        let settings = config.generation_settings();
        assert_eq!(settings.output_token_cap, 4_096);
        assert_eq!(settings.stop_sequences, vec!["```", "<think>"]);
    }
}
