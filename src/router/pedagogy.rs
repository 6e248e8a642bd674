//! Prompt construction and educational post-processing.
//!
//! The prompt folds in trailing conversation context, subject and grade
//! framing, and Socratic teaching guidelines; the post-processing side
//! caps answer length and scores a heuristic confidence.

use crate::traits::Generation;
use crate::types::{AskRequest, Subject};

/// Conversation turns included in the prompt.
const PROMPT_HISTORY_TURNS: usize = 5;

/// Answers longer than this are truncated.
const MAX_ANSWER_CHARS: usize = 2000;

/// Build a pedagogically framed prompt for a request.
pub fn build_prompt(request: &AskRequest) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !request.conversation_history.is_empty() {
        parts.push("Previous conversation:".to_owned());
        let skip = request
            .conversation_history
            .len()
            .saturating_sub(PROMPT_HISTORY_TURNS);
        for turn in &request.conversation_history[skip..] {
            parts.push(format!("{}: {}", title_case(&turn.role), turn.content));
        }
        parts.push(String::new());
    }

    parts.push(format!("Subject: {}", title_case(request.subject.as_str())));
    parts.push(format!(
        "Grade Level: {}",
        title_case(request.grade_level.as_str())
    ));
    parts.push(String::new());

    parts.push("Teaching Guidelines:".to_owned());
    parts.push("- Use Socratic questioning to guide learning".to_owned());
    parts.push("- Encourage critical thinking and problem-solving".to_owned());
    parts.push("- Provide clear explanations with examples".to_owned());
    parts.push("- Adapt language to the student's grade level".to_owned());
    parts.push("- Be encouraging and supportive".to_owned());
    parts.push(String::new());

    parts.push(format!("Student Question: {}", request.question));
    parts.push(String::new());
    parts.push("Please provide a helpful, educational response:".to_owned());

    parts.join("\n")
}

/// Trim and length-cap a raw backend answer.
pub fn post_process(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.chars().count() > MAX_ANSWER_CHARS {
        let capped: String = trimmed.chars().take(MAX_ANSWER_CHARS).collect();
        format!("{capped}...")
    } else {
        trimmed.to_owned()
    }
}

/// Heuristic confidence score for an answer, in [0.0, 1.0].
///
/// Very short answers lose confidence; detailed ones gain a little.
pub fn confidence(generation: &Generation) -> f64 {
    let mut confidence: f64 = 0.7;
    let length = generation.text.chars().count();
    if length < 50 {
        confidence -= 0.2;
    } else if length > 200 {
        confidence += 0.1;
    }
    confidence.clamp(0.0, 1.0)
}

/// Subject-aware follow-up question suggestions (at most three).
pub fn follow_up_suggestions(subject: Subject) -> Vec<String> {
    let mut suggestions: Vec<String> = match subject {
        Subject::Math => vec![
            "Can you show me another example?".to_owned(),
            "How would this apply to a real-world problem?".to_owned(),
        ],
        Subject::Science | Subject::Physics | Subject::Chemistry | Subject::Biology => vec![
            "Can you explain the underlying principle?".to_owned(),
            "What are some real-world applications?".to_owned(),
        ],
        Subject::History | Subject::Literature => vec![
            "What was the historical context?".to_owned(),
            "How does this relate to other events?".to_owned(),
        ],
        _ => Vec::new(),
    };
    suggestions.push("Can you explain this in simpler terms?".to_owned());
    suggestions.truncate(3);
    suggestions
}

/// Subject-aware learning resource pointers.
pub fn learning_resources(subject: Subject) -> Vec<String> {
    match subject {
        Subject::Math => vec![
            "Khan Academy - Math".to_owned(),
            "Brilliant.org - Interactive Math".to_owned(),
        ],
        Subject::Science | Subject::Physics => vec![
            "PhET Interactive Simulations".to_owned(),
            "Khan Academy - Physics".to_owned(),
        ],
        _ => Vec::new(),
    }
}

/// "middle_school" -> "Middle School"
fn title_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConversationTurn, GradeLevel};

    #[test]
    fn prompt_contains_subject_grade_and_question() {
        let request = AskRequest::new(
            "s1",
            "What is photosynthesis?",
            Subject::Biology,
            GradeLevel::MiddleSchool,
        );
        let prompt = build_prompt(&request);
        assert!(prompt.contains("Subject: Biology"));
        assert!(prompt.contains("Grade Level: Middle School"));
        assert!(prompt.contains("Student Question: What is photosynthesis?"));
        assert!(prompt.contains("Socratic questioning"));
    }

    #[test]
    fn prompt_includes_only_last_five_turns() {
        let history: Vec<_> = (0..8)
            .map(|i| ConversationTurn::new("user", format!("turn {i}")))
            .collect();
        let request = AskRequest::new("s1", "q", Subject::Math, GradeLevel::HighSchool)
            .with_history(history);
        let prompt = build_prompt(&request);
        assert!(!prompt.contains("turn 2"));
        assert!(prompt.contains("turn 3"));
        assert!(prompt.contains("turn 7"));
    }

    #[test]
    fn post_process_trims_and_caps() {
        assert_eq!(post_process("  hi  "), "hi");
        let long = "a".repeat(3000);
        let processed = post_process(&long);
        assert_eq!(processed.chars().count(), 2003);
        assert!(processed.ends_with("..."));
    }

    #[test]
    fn confidence_rewards_detail() {
        let short = Generation {
            text: "Yes.".to_owned(),
            tokens_used: 2,
        };
        let detailed = Generation {
            text: "d".repeat(300),
            tokens_used: 100,
        };
        assert!(confidence(&short) < confidence(&detailed));
        assert!((confidence(&detailed) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn follow_ups_capped_at_three() {
        for subject in [Subject::Math, Subject::Physics, Subject::History, Subject::Other] {
            let suggestions = follow_up_suggestions(subject);
            assert!(!suggestions.is_empty());
            assert!(suggestions.len() <= 3);
        }
    }
}
