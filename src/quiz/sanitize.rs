//! Output Sanitizer
//!
//! Strips the wrapper artifacts chat models emit around JSON payloads:
//! reasoning blocks, code fences, byte-order marks, stray backticks.
//!
//! ## Guarantees
//!
//! - Reasoning blocks (`<think>…</think>`, case-insensitive, spanning
//!   newlines) are removed to a fixpoint, so splicing the surrounding
//!   text can never leave a newly-formed block behind.
//! - If a complete fenced code block is present, only the first one's
//!   inner content survives.
//! - Sanitizing already-sanitized text is a no-op.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static THINK_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>.*?</think>").unwrap());

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```(?:json)?(.*?)```").unwrap());

/// Characters trimmed from both ends of the final text
const TRIM_SET: &[char] = &['`', ' ', '\n', '\r', '\t'];

/// Clean raw provider output down to parseable text.
pub fn clean_model_output(raw: &str) -> String {
    // byte-order marks go first: one embedded mid-marker would otherwise
    // reassemble into a live marker after removal
    let text = raw.replace('\u{feff}', "");
    let text = strip_think_blocks(&text);
    let text = text.trim();

    let text = match FENCE_RE.captures(text) {
        Some(captures) => captures.get(1).map_or("", |m| m.as_str()).trim(),
        None => text,
    };

    text.trim_matches(TRIM_SET).to_string()
}

/// Remove `<think>` blocks until none remain.
///
/// A single pass is not enough: deleting an inner block can join the
/// halves of an outer one.
fn strip_think_blocks(raw: &str) -> Cow<'_, str> {
    let mut text = match THINK_BLOCK_RE.replace_all(raw, "") {
        Cow::Borrowed(unchanged) => return Cow::Borrowed(unchanged),
        Cow::Owned(changed) => changed,
    };
    loop {
        match THINK_BLOCK_RE.replace_all(&text, "") {
            Cow::Borrowed(_) => return Cow::Owned(text),
            Cow::Owned(changed) => text = changed,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_array_passes_through() {
        assert_eq!(clean_model_output(r#"[{"type":"mcq"}]"#), r#"[{"type":"mcq"}]"#);
    }

    #[test]
    fn test_think_block_removed() {
        let raw = "<think>Let me reason about this.</think>[1, 2]";
        assert_eq!(clean_model_output(raw), "[1, 2]");
    }

    #[test]
    fn test_think_block_case_insensitive_multiline() {
        let raw = "<THINK>line one\nline two</Think>\n[1]";
        assert_eq!(clean_model_output(raw), "[1]");
    }

    #[test]
    fn test_nested_think_blocks_removed_to_fixpoint() {
        let raw = "<th<think>inner</think>ink>outer</think>[1]";
        assert_eq!(clean_model_output(raw), "[1]");
    }

    #[test]
    fn test_fenced_block_inner_extracted() {
        let raw = "Here is your quiz:\n```json\n[{\"type\":\"mcq\"}]\n```\nEnjoy!";
        assert_eq!(clean_model_output(raw), "[{\"type\":\"mcq\"}]");
    }

    #[test]
    fn test_bare_fence_without_tag() {
        let raw = "```\n[1, 2, 3]\n```";
        assert_eq!(clean_model_output(raw), "[1, 2, 3]");
    }

    #[test]
    fn test_only_first_fence_kept() {
        let raw = "```json\n[1]\n```\nand also\n```json\n[2]\n```";
        assert_eq!(clean_model_output(raw), "[1]");
    }

    #[test]
    fn test_unclosed_fence_backticks_trimmed() {
        // stop sequences routinely cut the closing fence off
        let raw = "```json\n[1, 2]";
        assert_eq!(clean_model_output(raw), "json\n[1, 2]");
    }

    #[test]
    fn test_bom_and_whitespace_stripped() {
        let raw = "\u{feff}  [1]  \n";
        assert_eq!(clean_model_output(raw), "[1]");
    }

    #[test]
    fn test_think_inside_fence_removed_first() {
        let raw = "```json\n<think>hmm</think>[1]\n```";
        assert_eq!(clean_model_output(raw), "[1]");
    }

    #[test]
    fn test_bom_split_marker_still_removed() {
        let raw = "<thi\u{feff}nk>hidden</think>[1]";
        assert_eq!(clean_model_output(raw), "[1]");
    }

    #[test]
    fn test_idempotent_on_wrapped_input() {
        let raw = "<think>reasoning</think>```json\n[{\"a\":1}]\n```";
        let once = clean_model_output(raw);
        assert_eq!(clean_model_output(&once), once);
    }

    proptest! {
        #[test]
        fn prop_sanitize_is_idempotent(raw in "\\PC{0,120}") {
            let once = clean_model_output(&raw);
            prop_assert_eq!(clean_model_output(&once), once.clone());
        }

        #[test]
        fn prop_sanitize_is_idempotent_on_markerful_text(
            raw in "(<think>|</think>|```|json|\\[1\\]|\u{feff}|`| |\n){0,12}"
        ) {
            let once = clean_model_output(&raw);
            prop_assert_eq!(clean_model_output(&once), once.clone());
        }
    }
}
