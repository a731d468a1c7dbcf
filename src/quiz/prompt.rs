//! Prompt Construction
//!
//! Templates for the two provider-facing prompts: quiz generation and
//! short-answer/essay grading. Generation asks for a bare JSON array and
//! nothing else; the sanitizer and extractor still assume the model will
//! disobey.

use std::fmt::Write;

use crate::constants::grading::COVERAGE_THRESHOLD_PCT;
use crate::types::{Difficulty, QuestionKind, TypeCounts};

/// Build the generation prompt for one request.
///
/// Only requested (non-zero) types get a count bullet and a schema
/// example, so the model is never shown shapes it must not produce.
pub fn generation_prompt(source_text: &str, counts: &TypeCounts, difficulty: Difficulty) -> String {
    let mut bullets = String::new();
    let mut examples = String::new();
    for (kind, count) in counts.iter() {
        if count == 0 {
            continue;
        }
        let _ = writeln!(bullets, "- {} {}.", count, kind.prompt_label());
        if !examples.is_empty() {
            examples.push_str(",\n");
        }
        examples.push_str(schema_example(kind));
    }

    format!(
        "From the following learning material, generate a quiz with a total of {total} questions.\n\
        \n\
        {bullets}\
        \n\
        Difficulty is {difficulty}: {directive}.\n\
        \n\
        Keep every question and answer concise. MCQ choices must be short phrases (1 to 5 words).\n\
        Do NOT include numbering or extra text (except a question mark at the end of every question for MCQ and Short answers). Only return the JSON array.\n\
        \n\
        Respond ONLY with a JSON array in this format, without adding any explanation or preamble:\n\
        [\n\
        {examples}\n\
        ]\n\
        \n\
        Learning Material:\n\
        \"\"\"\n\
        {source_text}\n\
        \"\"\"",
        total = counts.total(),
        directive = difficulty.prompt_directive(),
    )
}

/// Build the TRUE/FALSE grading prompt for a free-text answer.
pub fn grading_prompt(question: &str, reference_answer: &str, student_answer: &str) -> String {
    format!(
        "You are grading one quiz answer. Compare the student's answer with the reference answer.\n\
        Respond with the single word TRUE if the student's answer covers at least {COVERAGE_THRESHOLD_PCT}% of the key points of the reference answer, otherwise respond with the single word FALSE.\n\
        Do not explain. Do not output anything except TRUE or FALSE.\n\
        \n\
        Question: {question}\n\
        Reference answer: {reference_answer}\n\
        Student answer: {student_answer}"
    )
}

fn schema_example(kind: QuestionKind) -> &'static str {
    match kind {
        QuestionKind::Mcq => {
            "  {\n    \"type\": \"mcq\",\n    \"question\": \"...?\",\n    \"choices\": [\"A\", \"B\", \"C\", \"D\"],\n    \"answer\": \"B\"\n  }"
        }
        QuestionKind::ShortAnswer => {
            "  {\n    \"type\": \"short_answer\",\n    \"question\": \"...?\",\n    \"answer\": \"...\"\n  }"
        }
        QuestionKind::TrueFalse => {
            "  {\n    \"type\": \"true_false\",\n    \"question\": \"...\",\n    \"answer\": true\n  }"
        }
        QuestionKind::Identification => {
            "  {\n    \"type\": \"identification\",\n    \"question\": \"...\",\n    \"answer\": \"...\"\n  }"
        }
        QuestionKind::Essay => {
            "  {\n    \"type\": \"essay\",\n    \"question\": \"...\",\n    \"answer\": \"...\"\n  }"
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(mcq: u32, short_answer: u32, true_false: u32) -> TypeCounts {
        TypeCounts {
            mcq,
            short_answer,
            true_false,
            ..TypeCounts::default()
        }
    }

    #[test]
    fn test_generation_prompt_totals_and_bullets() {
        let prompt = generation_prompt("Cells are small.", &counts(3, 2, 4), Difficulty::Easy);
        assert!(prompt.contains("a total of 9 questions"));
        assert!(prompt.contains("- 3 multiple choice questions"));
        assert!(prompt.contains("- 2 short answer questions"));
        assert!(prompt.contains("- 4 true/false questions"));
        assert!(prompt.contains("Cells are small."));
    }

    #[test]
    fn test_generation_prompt_skips_zero_types() {
        let prompt = generation_prompt("Material.", &counts(3, 0, 0), Difficulty::Intermediate);
        assert!(!prompt.contains("short answer"));
        assert!(!prompt.contains("\"type\": \"short_answer\""));
        assert!(!prompt.contains("true/false"));
        assert!(prompt.contains("\"type\": \"mcq\""));
    }

    #[test]
    fn test_generation_prompt_carries_difficulty_directive() {
        let prompt = generation_prompt("Material.", &counts(1, 0, 0), Difficulty::Difficult);
        assert!(prompt.contains("Difficulty is difficult"));
        assert!(prompt.contains("analysis and synthesis"));
    }

    #[test]
    fn test_generation_prompt_examples_for_all_five_types() {
        let all = TypeCounts {
            mcq: 1,
            short_answer: 1,
            true_false: 1,
            identification: 1,
            essay: 1,
        };
        let prompt = generation_prompt("Material.", &all, Difficulty::Intermediate);
        for tag in [
            "\"mcq\"",
            "\"short_answer\"",
            "\"true_false\"",
            "\"identification\"",
            "\"essay\"",
        ] {
            assert!(prompt.contains(tag), "missing schema example for {tag}");
        }
        // true/false example demonstrates the boolean form
        assert!(prompt.contains("\"answer\": true"));
    }

    #[test]
    fn test_grading_prompt_demands_bare_verdict() {
        let prompt = grading_prompt(
            "Why is the sky blue?",
            "Rayleigh scattering of sunlight",
            "Because light scatters",
        );
        assert!(prompt.contains("TRUE"));
        assert!(prompt.contains("FALSE"));
        assert!(prompt.contains("40%"));
        assert!(prompt.contains("Reference answer: Rayleigh scattering of sunlight"));
        assert!(prompt.contains("Student answer: Because light scatters"));
    }
}
