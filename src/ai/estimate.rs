//! Token Estimation
//!
//! Character-based token estimates for budget reservations. Intentionally
//! rough: roughly 4 characters per token holds well enough for English
//! prose, and the budget is advisory — the provider's own enforcement is
//! the backstop.

use crate::constants::estimate::{OUTPUT_RESERVE_RATIO, PROMPT_CHARS_PER_TOKEN};

/// Estimated prompt-side tokens: `ceil(chars / 4)`.
///
/// Also the "actual" usage charged when a call fails before producing
/// output, since the prompt was still transmitted.
pub fn prompt_tokens(prompt: &str) -> u64 {
    (prompt.chars().count() as u64).div_ceil(PROMPT_CHARS_PER_TOKEN)
}

/// Pessimistic reservation for an in-flight call: prompt tokens plus a
/// fraction of the output cap.
pub fn reserve_estimate(prompt: &str, output_cap: u32) -> u64 {
    prompt_tokens(prompt) + (f64::from(output_cap) * OUTPUT_RESERVE_RATIO).ceil() as u64
}
