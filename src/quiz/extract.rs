//! JSON Array Extraction
//!
//! Providers regularly wrap the requested array in prose despite every
//! instruction not to. Extraction is deliberately tolerant: everything
//! outside the first `[` and the last `]` is ignored, and only the
//! bracketed span must decode.

use serde_json::Value;
use tracing::debug;

use crate::types::{QuizError, QuizItem, Result};

/// Locate and decode the JSON array embedded in sanitized text.
pub fn extract_array(text: &str) -> Result<Vec<Value>> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Err(QuizError::parse("no JSON array found in output"));
    };
    if end <= start {
        return Err(QuizError::parse("no JSON array found in output"));
    }
    serde_json::from_str(&text[start..=end])
        .map_err(|e| QuizError::parse(format!("failed to decode JSON array: {e}")))
}

/// Convert raw array elements into typed items.
///
/// Elements that do not fit any question shape are dropped here; count
/// reconciliation detects the loss downstream.
pub fn parse_items(values: Vec<Value>) -> Vec<QuizItem> {
    let mut items = Vec::with_capacity(values.len());
    for value in values {
        match serde_json::from_value::<QuizItem>(value) {
            Ok(item) => items.push(item),
            Err(error) => debug!(%error, "dropping malformed quiz item"),
        }
    }
    items
}

// =============================================================================
// Tests
// =============================================================================
