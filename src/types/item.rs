//! Quiz Domain Model
//!
//! The item tagged union, per-type counts, and the request/outcome types
//! forming the engine's inbound and outbound surface.
//!
//! ## Item lifecycle
//!
//! A [`QuizItem`] is created by parsing provider output (lenient: the
//! true/false answer admits both a JSON boolean and a string), mutated in
//! place by the normalizer and the MCQ repairer, and consumed once by the
//! validator. It is never persisted by this crate.

use serde::{Deserialize, Serialize};

/// Question type tag, in the fixed output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Mcq,
    ShortAnswer,
    TrueFalse,
    Identification,
    Essay,
}

impl QuestionKind {
    /// All kinds in the fixed output order: mcq, short_answer, true_false,
    /// identification, essay.
    pub const ALL: [QuestionKind; 5] = [
        QuestionKind::Mcq,
        QuestionKind::ShortAnswer,
        QuestionKind::TrueFalse,
        QuestionKind::Identification,
        QuestionKind::Essay,
    ];

    /// Human-facing description used in prompts
    pub fn prompt_label(&self) -> &'static str {
        match self {
            QuestionKind::Mcq => "multiple choice questions with exactly 4 choices each",
            QuestionKind::ShortAnswer => "short answer questions",
            QuestionKind::TrueFalse => "true/false questions",
            QuestionKind::Identification => "identification questions",
            QuestionKind::Essay => "essay questions",
        }
    }
}

impl std::fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuestionKind::Mcq => write!(f, "mcq"),
            QuestionKind::ShortAnswer => write!(f, "short_answer"),
            QuestionKind::TrueFalse => write!(f, "true_false"),
            QuestionKind::Identification => write!(f, "identification"),
            QuestionKind::Essay => write!(f, "essay"),
        }
    }
}

impl std::str::FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mcq" => Ok(QuestionKind::Mcq),
            "short_answer" => Ok(QuestionKind::ShortAnswer),
            "true_false" => Ok(QuestionKind::TrueFalse),
            "identification" => Ok(QuestionKind::Identification),
            "essay" => Ok(QuestionKind::Essay),
            _ => Err(format!(
                "Unknown question type: {}. Valid values: mcq, short_answer, true_false, identification, essay",
                s
            )),
        }
    }
}

/// Requested quiz difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Intermediate,
    Difficult,
}

impl Difficulty {
    /// Directive injected into the generation prompt
    pub fn prompt_directive(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy: test basic recall of facts stated directly in the material",
            Difficulty::Intermediate => {
                "intermediate: test understanding and application of the material"
            }
            Difficulty::Difficult => {
                "difficult: test analysis and synthesis across different parts of the material"
            }
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Intermediate => write!(f, "intermediate"),
            Difficulty::Difficult => write!(f, "difficult"),
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "intermediate" => Ok(Difficulty::Intermediate),
            "difficult" => Ok(Difficulty::Difficult),
            _ => Err(format!(
                "Unknown difficulty: {}. Valid values: easy, intermediate, difficult",
                s
            )),
        }
    }
}

/// A true/false answer as the provider may emit it.
///
/// Providers frequently return `"True"` instead of `true`; the normalizer
/// collapses case-insensitive "true"/"false" strings to [`TruthValue::Bool`],
/// and the validator accepts only the boolean form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TruthValue {
    Bool(bool),
    Text(String),
}

impl TruthValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TruthValue::Bool(value) => Some(*value),
            TruthValue::Text(_) => None,
        }
    }
}

/// One quiz question, tagged by type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuizItem {
    Mcq {
        question: String,
        #[serde(default)]
        choices: Vec<String>,
        answer: String,
    },
    ShortAnswer {
        question: String,
        answer: String,
    },
    TrueFalse {
        question: String,
        answer: TruthValue,
    },
    Identification {
        question: String,
        answer: String,
    },
    Essay {
        question: String,
        answer: String,
    },
}

impl QuizItem {
    pub fn kind(&self) -> QuestionKind {
        match self {
            QuizItem::Mcq { .. } => QuestionKind::Mcq,
            QuizItem::ShortAnswer { .. } => QuestionKind::ShortAnswer,
            QuizItem::TrueFalse { .. } => QuestionKind::TrueFalse,
            QuizItem::Identification { .. } => QuestionKind::Identification,
            QuizItem::Essay { .. } => QuestionKind::Essay,
        }
    }

    pub fn question(&self) -> &str {
        match self {
            QuizItem::Mcq { question, .. }
            | QuizItem::ShortAnswer { question, .. }
            | QuizItem::TrueFalse { question, .. }
            | QuizItem::Identification { question, .. }
            | QuizItem::Essay { question, .. } => question,
        }
    }
}

/// Per-type item counts, used for requests, shortfalls, and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeCounts {
    #[serde(default)]
    pub mcq: u32,
    #[serde(default)]
    pub short_answer: u32,
    #[serde(default)]
    pub true_false: u32,
    #[serde(default)]
    pub identification: u32,
    #[serde(default)]
    pub essay: u32,
}

impl TypeCounts {
    pub fn get(&self, kind: QuestionKind) -> u32 {
        match kind {
            QuestionKind::Mcq => self.mcq,
            QuestionKind::ShortAnswer => self.short_answer,
            QuestionKind::TrueFalse => self.true_false,
            QuestionKind::Identification => self.identification,
            QuestionKind::Essay => self.essay,
        }
    }

    pub fn set(&mut self, kind: QuestionKind, count: u32) {
        match kind {
            QuestionKind::Mcq => self.mcq = count,
            QuestionKind::ShortAnswer => self.short_answer = count,
            QuestionKind::TrueFalse => self.true_false = count,
            QuestionKind::Identification => self.identification = count,
            QuestionKind::Essay => self.essay = count,
        }
    }

    pub fn total(&self) -> u32 {
        self.mcq + self.short_answer + self.true_false + self.identification + self.essay
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Per-type `self - other`, floored at zero. `requested.shortfall(produced)`
    /// yields how many items of each type are still missing.
    pub fn shortfall(&self, other: &TypeCounts) -> TypeCounts {
        let mut result = TypeCounts::default();
        for kind in QuestionKind::ALL {
            result.set(kind, self.get(kind).saturating_sub(other.get(kind)));
        }
        result
    }

    /// Iterate `(kind, count)` pairs in the fixed output order
    pub fn iter(&self) -> impl Iterator<Item = (QuestionKind, u32)> + '_ {
        QuestionKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }
}

impl std::fmt::Display for TypeCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (kind, count) in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", kind, count)?;
            first = false;
        }
        Ok(())
    }
}

/// A quiz generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSpec {
    /// Already-extracted plain text of the learning material
    pub source_text: String,
    /// How many items of each type to produce
    pub counts: TypeCounts,
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl RequestSpec {
    pub fn validate(&self) -> crate::types::Result<()> {
        if self.source_text.trim().is_empty() {
            return Err(crate::types::QuizError::InvalidRequest(
                "source text is empty".to_string(),
            ));
        }
        if self.counts.is_empty() {
            return Err(crate::types::QuizError::InvalidRequest(
                "all per-type counts are zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Successful generation result: exactly the requested counts, in the
/// fixed type order
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub items: Vec<QuizItem>,
    /// Model that served the primary call (a top-up may have used another)
    pub model_used: String,
    /// Token usage summed across the primary call and any top-up
    pub total_tokens_reported: u64,
}

/// How a grading verdict was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeMethod {
    /// Canonicalized exact match, no model call
    ExactMatch,
    /// TRUE/FALSE judgment from the model
    ModelJudgment,
    /// Lexical heuristic after a failed or ambiguous model call
    LexicalFallback,
}

impl std::fmt::Display for GradeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradeMethod::ExactMatch => write!(f, "exact_match"),
            GradeMethod::ModelJudgment => write!(f, "model_judgment"),
            GradeMethod::LexicalFallback => write!(f, "lexical_fallback"),
        }
    }
}

/// A grading verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GradeOutcome {
    pub correct: bool,
    pub method: GradeMethod,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_parses_from_tagged_json() {
        let raw = r#"{
            "type": "mcq",
            "question": "What is the capital of France?",
            "choices": ["Paris", "London", "Berlin", "Rome"],
            "answer": "Paris"
        }"#;
        let item: QuizItem = serde_json::from_str(raw).unwrap();
        assert_eq!(item.kind(), QuestionKind::Mcq);
        assert_eq!(item.question(), "What is the capital of France?");
    }

    #[test]
    fn test_true_false_accepts_bool_and_string() {
        let as_bool: QuizItem =
            serde_json::from_str(r#"{"type":"true_false","question":"Q","answer":true}"#).unwrap();
        let QuizItem::TrueFalse { answer, .. } = &as_bool else {
            panic!("expected true_false variant");
        };
        assert_eq!(answer.as_bool(), Some(true));

        let as_text: QuizItem =
            serde_json::from_str(r#"{"type":"true_false","question":"Q","answer":"True"}"#)
                .unwrap();
        let QuizItem::TrueFalse { answer, .. } = &as_text else {
            panic!("expected true_false variant");
        };
        assert_eq!(answer.as_bool(), None);
        assert_eq!(answer, &TruthValue::Text("True".to_string()));
    }

    #[test]
    fn test_unknown_type_tag_is_rejected() {
        let result: Result<QuizItem, _> =
            serde_json::from_str(r#"{"type":"matching","question":"Q","answer":"A"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_answer_is_rejected() {
        let result: Result<QuizItem, _> =
            serde_json::from_str(r#"{"type":"essay","question":"Q"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_mcq_without_choices_defaults_empty() {
        let item: QuizItem =
            serde_json::from_str(r#"{"type":"mcq","question":"Q","answer":"A"}"#).unwrap();
        let QuizItem::Mcq { choices, .. } = &item else {
            panic!("expected mcq variant");
        };
        assert!(choices.is_empty());
    }

    #[test]
    fn test_counts_iteration_order_is_fixed() {
        let counts = TypeCounts {
            mcq: 1,
            short_answer: 2,
            true_false: 3,
            identification: 4,
            essay: 5,
        };
        let kinds: Vec<QuestionKind> = counts.iter().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, QuestionKind::ALL.to_vec());
        assert_eq!(counts.total(), 15);
    }

    #[test]
    fn test_shortfall_floors_at_zero() {
        let requested = TypeCounts {
            mcq: 3,
            short_answer: 2,
            ..TypeCounts::default()
        };
        let produced = TypeCounts {
            mcq: 2,
            short_answer: 5,
            ..TypeCounts::default()
        };
        let missing = requested.shortfall(&produced);
        assert_eq!(missing.mcq, 1);
        assert_eq!(missing.short_answer, 0);
        assert_eq!(missing.total(), 1);
    }

    #[test]
    fn test_counts_display() {
        let counts = TypeCounts {
            mcq: 3,
            ..TypeCounts::default()
        };
        let rendered = counts.to_string();
        assert!(rendered.starts_with("mcq=3"));
        assert!(rendered.contains("essay=0"));
    }

    #[test]
    fn test_request_validation() {
        let empty_text = RequestSpec {
            source_text: "   ".to_string(),
            counts: TypeCounts {
                mcq: 1,
                ..TypeCounts::default()
            },
            difficulty: Difficulty::Easy,
        };
        assert!(empty_text.validate().is_err());

        let zero_counts = RequestSpec {
            source_text: "material".to_string(),
            counts: TypeCounts::default(),
            difficulty: Difficulty::Easy,
        };
        assert!(zero_counts.validate().is_err());
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in QuestionKind::ALL {
            let parsed: QuestionKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("matching".parse::<QuestionKind>().is_err());
    }

    #[test]
    fn test_difficulty_parse_is_case_insensitive() {
        assert_eq!("Easy".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert_eq!(
            "DIFFICULT".parse::<Difficulty>().unwrap(),
            Difficulty::Difficult
        );
        assert!("extreme".parse::<Difficulty>().is_err());
    }
}
