//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Token estimation constants
pub mod estimate {
    /// Characters per token for prompt-side estimation
    pub const PROMPT_CHARS_PER_TOKEN: u64 = 4;

    /// Fraction of the output-token cap reserved for an in-flight call.
    ///
    /// 0.5 keeps the advisory budget from starving later candidates; a
    /// 0.7 variant is equally valid if reservations prove too optimistic.
    pub const OUTPUT_RESERVE_RATIO: f64 = 0.5;
}

/// Budget window defaults (provider free-tier shaped)
pub mod budget {
    /// Default requests-per-minute ceiling
    pub const DEFAULT_RPM: u32 = 30;

    /// Default requests-per-day ceiling
    pub const DEFAULT_RPD: u32 = 14_400;

    /// Default tokens-per-minute ceiling
    pub const DEFAULT_TPM: u64 = 6_000;

    /// Default tokens-per-day ceiling
    pub const DEFAULT_TPD: u64 = 500_000;
}

/// Dispatch loop constants
pub mod dispatch {
    /// Per-call timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 75;

    /// Retries against the same model after a transient failure
    pub const TRANSIENT_RETRIES: usize = 2;

    /// Base delay before the first transient retry (milliseconds).
    ///
    /// Doubles per retry: 300ms, then 600ms.
    pub const BACKOFF_BASE_MS: u64 = 300;

    /// Backoff multiplier between transient retries
    pub const BACKOFF_FACTOR: f32 = 2.0;

    /// Quarantine after per-minute rate signals (seconds)
    pub const SHORT_COOLDOWN_SECS: u64 = 60;

    /// Quarantine after daily/quota signals (seconds)
    pub const LONG_COOLDOWN_SECS: u64 = 6 * 60 * 60;
}

/// Generation constants
pub mod generation {
    /// Default output-token cap for a generation call
    pub const DEFAULT_OUTPUT_CAP: u32 = 4_096;

    /// Default sampling temperature
    pub const DEFAULT_TEMPERATURE: f32 = 0.3;

    /// Source material is truncated to this many characters
    pub const DEFAULT_MAX_SOURCE_CHARS: usize = 20_000;

    /// Default stop sequences: cut fenced prose and reasoning preambles
    pub const DEFAULT_STOP_SEQUENCES: [&str; 2] = ["```", "<think>"];

    /// Floor for the proportional top-up output cap
    pub const MIN_TOP_UP_CAP: u32 = 256;
}

/// MCQ repair constants
pub mod repair {
    /// Required number of choices for a multiple-choice item
    pub const MCQ_CHOICE_COUNT: usize = 4;

    /// Minimum normalized choice length accepted by validation
    pub const MIN_CHOICE_CHARS: usize = 3;

    /// Similarity floor for aligning an answer to its closest choice
    pub const ANSWER_SIMILARITY_THRESHOLD: f64 = 0.6;
}

/// Grading constants
pub mod grading {
    /// Output-token cap for TRUE/FALSE judgment calls
    pub const OUTPUT_CAP: u32 = 16;

    /// Temperature for judgment calls (deterministic verdicts)
    pub const TEMPERATURE: f32 = 0.0;

    /// Key-point coverage percentage a correct answer must reach
    pub const COVERAGE_THRESHOLD_PCT: u8 = 40;

    /// Lexical fallback: shared distinct tokens that alone mean correct
    pub const SHARED_TOKEN_MIN: usize = 3;

    /// Lexical fallback: similarity ratio that alone means correct
    pub const SIMILARITY_THRESHOLD: f64 = 0.80;
}
