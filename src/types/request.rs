//! Inbound request types: subjects, grade levels, and the ask request.

use serde::{Deserialize, Serialize};

use super::model::ComplexityTier;

/// Maximum conversation turns retained on a request.
const MAX_HISTORY_TURNS: usize = 20;

/// Academic subject of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Math,
    Science,
    Physics,
    Chemistry,
    Biology,
    History,
    Literature,
    English,
    ComputerScience,
    Other,
}

impl Subject {
    /// Stable wire name, used in cache fingerprints and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::Science => "science",
            Subject::Physics => "physics",
            Subject::Chemistry => "chemistry",
            Subject::Biology => "biology",
            Subject::History => "history",
            Subject::Literature => "literature",
            Subject::English => "english",
            Subject::ComputerScience => "computer_science",
            Subject::Other => "other",
        }
    }

    /// Subjects that tend to need more capable models.
    pub fn is_advanced(&self) -> bool {
        matches!(
            self,
            Subject::Physics | Subject::Chemistry | Subject::ComputerScience
        )
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Student grade level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeLevel {
    Elementary,
    MiddleSchool,
    HighSchool,
    College,
}

impl GradeLevel {
    /// Stable wire name, used in cache fingerprints.
    pub fn as_str(&self) -> &'static str {
        match self {
            GradeLevel::Elementary => "elementary",
            GradeLevel::MiddleSchool => "middle_school",
            GradeLevel::HighSchool => "high_school",
            GradeLevel::College => "college",
        }
    }
}

impl std::fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity tier for rate limiting. Quota and window are configured
/// per tier, not hard-coded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Anonymous,
    #[default]
    Authenticated,
}

/// A single prior message in the student's conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// A teaching request: one question from one student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub student_id: String,
    pub question: String,
    pub subject: Subject,
    pub grade_level: GradeLevel,
    /// Trailing conversation context, capped at the last 20 turns.
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
    /// Explicit model choice; ignored if unknown or retired.
    #[serde(default)]
    pub model_preference: Option<String>,
    /// Rate-limiting tier of the requesting identity.
    #[serde(default)]
    pub tier: Tier,
}

impl AskRequest {
    pub fn new(
        student_id: impl Into<String>,
        question: impl Into<String>,
        subject: Subject,
        grade_level: GradeLevel,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            question: question.into(),
            subject,
            grade_level,
            conversation_history: Vec::new(),
            model_preference: None,
            tier: Tier::default(),
        }
    }

    /// Attach conversation history, keeping only the last 20 turns.
    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        let skip = history.len().saturating_sub(MAX_HISTORY_TURNS);
        self.conversation_history = history.into_iter().skip(skip).collect();
        self
    }

    /// Request a specific model by id.
    pub fn with_model_preference(mut self, model: impl Into<String>) -> Self {
        self.model_preference = Some(model.into());
        self
    }

    /// Set the rate-limiting tier.
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    /// Estimate the complexity of the question for model ranking.
    ///
    /// College-level or long questions lean complex; advanced subjects
    /// and mid-length questions lean moderate.
    pub fn complexity_hint(&self) -> ComplexityTier {
        let question_length = self.question.chars().count();
        if self.grade_level == GradeLevel::College || question_length > 500 {
            ComplexityTier::Complex
        } else if self.subject.is_advanced()
            || question_length > 150
            || !self.conversation_history.is_empty()
        {
            ComplexityTier::Moderate
        } else {
            ComplexityTier::Simple
        }
    }
}
