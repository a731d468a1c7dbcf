//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/quizforge/config.toml)
//! 3. Project config (./quizforge.toml)
//! 4. Environment variables (QUIZFORGE_* prefix, plus GROQ_API_KEY)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{QuizError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Merge global config
        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        // Merge project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // Sections nest on "__": QUIZFORGE_PROVIDER__TIMEOUT_SECS ->
        // provider.timeout_secs. GROQ_API_KEY is honored directly.
        figment = figment
            .merge(Env::prefixed("QUIZFORGE_").split("__").lowercase(true))
            .merge(
                Env::raw()
                    .only(&["GROQ_API_KEY"])
                    .map(|_| "provider.api_key".into()),
            );

        let config: Config = figment
            .extract()
            .map_err(|e| QuizError::Config(format!("Configuration error: {}", e)))?;

        // Validate configuration after loading
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| QuizError::Config(format!("Configuration error: {}", e)))
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/quizforge/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("quizforge"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from("quizforge.toml")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        // Global config
        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        // Project config
        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration, API key masked
    pub fn show_config(as_json: bool) -> Result<()> {
        let config = Self::load()?.redacted();

        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config).map_err(|e| QuizError::Config(e.to_string()))?
            );
        }

        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            QuizError::Config("Cannot determine global config directory".to_string())
        })?;

        fs::create_dir_all(&global_dir)?;

        let config_path = global_dir.join("config.toml");
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_global_config())?;
            info!("Created global config: {}", config_path.display());
        } else {
            info!("Global config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    /// Initialize project configuration in the current directory
    pub fn init_project(force: bool) -> Result<PathBuf> {
        let config_path = Self::project_config_path();

        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_project_config())?;
            info!("Created project config: {}", config_path.display());
        } else {
            info!("Project config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Generate default global config content (TOML)
    fn default_global_config() -> String {
        r#"# QuizForge Global Configuration
# User-wide defaults. Settings in ./quizforge.toml override these.

version = "1.0"

# Provider endpoint (OpenAI-compatible chat completions)
[provider]
api_base = "https://api.groq.com/openai/v1"
timeout_secs = 75
# api_key = "gsk-..."   # prefer the GROQ_API_KEY environment variable

# Failover order: the first entry is the preferred model
[models]
preference = ["llama-3.3-70b-versatile", "llama-3.1-8b-instant"]

# Advisory request/token ceilings (free-tier shaped)
[budget]
rpm = 30
rpd = 14400
tpm = 6000
tpd = 500000
"#
        .to_string()
    }

    /// Generate default project config content (TOML)
    fn default_project_config() -> String {
        r#"# QuizForge Project Configuration
# Overrides global defaults for runs from this directory.

version = "1.0"

[generation]
output_token_cap = 4096
temperature = 0.3
max_source_chars = 20000
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_default_config() {
        figment::Jail::expect_with(|_jail| {
            let config = ConfigLoader::load().unwrap();
            assert_eq!(config.version, "1.0");
            assert_eq!(config.provider.api_base, "https://api.groq.com/openai/v1");
            Ok(())
        });
    }

    #[test]
    fn test_project_file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "quizforge.toml",
                r#"
                    [generation]
                    temperature = 0.7

                    [models]
                    preference = ["llama-guard-4-12b"]
                "#,
            )?;

            let config = ConfigLoader::load().unwrap();
            assert_eq!(config.generation.temperature, 0.7);
            assert_eq!(config.models.preference, vec!["llama-guard-4-12b"]);
            // untouched sections keep their defaults
            assert_eq!(config.budget.rpm, 30);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_files() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("quizforge.toml", "[provider]\ntimeout_secs = 10\n")?;
            jail.set_env("QUIZFORGE_PROVIDER__TIMEOUT_SECS", "20");
            jail.set_env("GROQ_API_KEY", "gsk-test-key");

            let config = ConfigLoader::load().unwrap();
            assert_eq!(config.provider.timeout_secs, 20);
            assert_eq!(config.provider.api_key.as_deref(), Some("gsk-test-key"));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_values_rejected_at_load() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("quizforge.toml", "[generation]\ntemperature = 9.0\n")?;
            assert!(ConfigLoader::load().is_err());
            Ok(())
        });
    }

    #[test]
    fn test_init_project_writes_loadable_template() {
        figment::Jail::expect_with(|_jail| {
            let path = ConfigLoader::init_project(false).unwrap();
            assert!(path.exists());
            let config = ConfigLoader::load().unwrap();
            config.validate().unwrap();
            Ok(())
        });
    }
}
