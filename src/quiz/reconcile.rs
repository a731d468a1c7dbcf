//! Bucket Reconciliation
//!
//! Holds validated items partitioned by question kind and the math for
//! bringing them to the exact requested counts: trimming surpluses,
//! merging top-up results, and sizing the top-up's output cap. The
//! engine drives the single top-up round; everything here is pure.

use tracing::debug;

use crate::constants::generation::MIN_TOP_UP_CAP;
use crate::quiz::{extract, normalize, repair, sanitize, validate};
use crate::types::{QuestionKind, QuizItem, Result, TypeCounts};

// =============================================================================
// Buckets
// =============================================================================

/// Valid items partitioned by kind, original order preserved per bucket.
#[derive(Debug, Default, Clone)]
pub struct ItemBuckets {
    mcq: Vec<QuizItem>,
    short_answer: Vec<QuizItem>,
    true_false: Vec<QuizItem>,
    identification: Vec<QuizItem>,
    essay: Vec<QuizItem>,
}

impl ItemBuckets {
    pub fn push(&mut self, item: QuizItem) {
        self.bucket_mut(item.kind()).push(item);
    }

    pub fn counts(&self) -> TypeCounts {
        TypeCounts {
            mcq: self.mcq.len() as u32,
            short_answer: self.short_answer.len() as u32,
            true_false: self.true_false.len() as u32,
            identification: self.identification.len() as u32,
            essay: self.essay.len() as u32,
        }
    }

    /// Append another round's items behind the existing ones, so
    /// first-pass items always outrank top-up items when trimming.
    pub fn merge(&mut self, other: ItemBuckets) {
        self.mcq.extend(other.mcq);
        self.short_answer.extend(other.short_answer);
        self.true_false.extend(other.true_false);
        self.identification.extend(other.identification);
        self.essay.extend(other.essay);
    }

    /// Truncate every bucket to its requested count.
    pub fn trim_to(&mut self, counts: &TypeCounts) {
        self.mcq.truncate(counts.mcq as usize);
        self.short_answer.truncate(counts.short_answer as usize);
        self.true_false.truncate(counts.true_false as usize);
        self.identification.truncate(counts.identification as usize);
        self.essay.truncate(counts.essay as usize);
    }

    /// Concatenate in the fixed output order: mcq, short_answer,
    /// true_false, identification, essay.
    pub fn into_ordered(self) -> Vec<QuizItem> {
        let mut items = self.mcq;
        items.extend(self.short_answer);
        items.extend(self.true_false);
        items.extend(self.identification);
        items.extend(self.essay);
        items
    }

    fn bucket_mut(&mut self, kind: QuestionKind) -> &mut Vec<QuizItem> {
        match kind {
            QuestionKind::Mcq => &mut self.mcq,
            QuestionKind::ShortAnswer => &mut self.short_answer,
            QuestionKind::TrueFalse => &mut self.true_false,
            QuestionKind::Identification => &mut self.identification,
            QuestionKind::Essay => &mut self.essay,
        }
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Run one raw provider output through sanitize → extract → normalize →
/// repair → validate, partitioning the survivors.
pub fn process_output(raw: &str) -> Result<ItemBuckets> {
    let cleaned = sanitize::clean_model_output(raw);
    let values = extract::extract_array(&cleaned)?;
    let parsed_count = values.len();
    let items = extract::parse_items(values);

    let mut buckets = ItemBuckets::default();
    let mut invalid = 0usize;
    for item in items {
        let item = repair::repair_mcq(normalize::normalize_item(item));
        if validate::is_valid(&item) {
            buckets.push(item);
        } else {
            invalid += 1;
        }
    }

    let kept = buckets.counts().total();
    if kept as usize != parsed_count {
        debug!(
            parsed = parsed_count,
            kept,
            invalid,
            "dropped items during processing"
        );
    }
    Ok(buckets)
}

/// Output-token cap for the supplementary call: the default cap scaled
/// to the shortfall's share of the original request, floored so a
/// one-item top-up still has room to finish its JSON.
pub fn top_up_cap(default_cap: u32, shortfall_total: u32, requested_total: u32) -> u32 {
    if default_cap <= MIN_TOP_UP_CAP || requested_total == 0 {
        return default_cap;
    }
    let scaled = (u64::from(default_cap) * u64::from(shortfall_total))
        .div_ceil(u64::from(requested_total)) as u32;
    scaled.clamp(MIN_TOP_UP_CAP, default_cap)
}

// =============================================================================
// Tests
// =============================================================================
