//! Feedback on adjudicators, and the scores derived from it.

pub mod aggregate;
pub mod forms;
pub mod manage;
pub mod progress;
pub mod public;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{
    adjudicator_feedback, adjudicator_test_score_history, feedback_answers,
    feedback_questions,
};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    Score,
    Text,
    Bool,
}

impl AnswerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerType::Score => "score",
            AnswerType::Text => "text",
            AnswerType::Bool => "bool",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "score" => Some(AnswerType::Score),
            "text" => Some(AnswerType::Text),
            "bool" => Some(AnswerType::Bool),
            _ => None,
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize)]
#[diesel(table_name = feedback_questions)]
pub struct FeedbackQuestion {
    pub id: String,
    pub tournament_id: String,
    pub seq: i64,
    pub text: String,
    pub answer_type: String,
    pub required: bool,
    pub for_teams: bool,
    pub for_adjudicators: bool,
}

impl FeedbackQuestion {
    pub fn kind(&self) -> AnswerType {
        AnswerType::parse(&self.answer_type).unwrap_or(AnswerType::Text)
    }

    pub fn applies_to(&self, source: &FeedbackSource) -> bool {
        match source {
            FeedbackSource::Team(_) => self.for_teams,
            FeedbackSource::Adjudicator(_) => self.for_adjudicators,
        }
    }
}

/// Who gave a piece of feedback. A piece of feedback comes from exactly one
/// team or exactly one adjudicator, never both.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FeedbackSource {
    Team(String),
    Adjudicator(String),
}

impl FeedbackSource {
    /// The `(source_team_id, source_adjudicator_id)` column values.
    pub fn columns(&self) -> (Option<&str>, Option<&str>) {
        match self {
            FeedbackSource::Team(id) => (Some(id), None),
            FeedbackSource::Adjudicator(id) => (None, Some(id)),
        }
    }

    /// Parses the `:kind/:id` segments of a URL.
    pub fn from_path(kind: &str, id: String) -> Option<Self> {
        match kind {
            "team" => Some(FeedbackSource::Team(id)),
            "adjudicator" => Some(FeedbackSource::Adjudicator(id)),
            _ => None,
        }
    }

    pub fn path_kind(&self) -> &'static str {
        match self {
            FeedbackSource::Team(_) => "team",
            FeedbackSource::Adjudicator(_) => "adjudicator",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            FeedbackSource::Team(id) | FeedbackSource::Adjudicator(id) => id,
        }
    }

    pub fn from_columns(
        team: Option<&str>,
        adjudicator: Option<&str>,
    ) -> Option<Self> {
        match (team, adjudicator) {
            (Some(team), None) => Some(FeedbackSource::Team(team.to_string())),
            (None, Some(adj)) => {
                Some(FeedbackSource::Adjudicator(adj.to_string()))
            }
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitterKind {
    Public,
    Tabroom,
}

impl SubmitterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitterKind::Public => "public",
            SubmitterKind::Tabroom => "tabroom",
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize)]
#[diesel(table_name = adjudicator_feedback)]
pub struct AdjudicatorFeedback {
    pub id: String,
    pub tournament_id: String,
    pub adjudicator_id: String,
    pub debate_id: String,
    source_team_id: Option<String>,
    source_adjudicator_id: Option<String>,
    pub version: i64,
    pub score: f64,
    pub confirmed: bool,
    pub submitter_kind: String,
    pub submitter_id: Option<String>,
    pub ip_address: Option<String>,
    pub timestamp: NaiveDateTime,
}

impl AdjudicatorFeedback {
    pub fn source(&self) -> FeedbackSource {
        match FeedbackSource::from_columns(
            self.source_team_id.as_deref(),
            self.source_adjudicator_id.as_deref(),
        ) {
            Some(source) => source,
            None => unreachable!(
                "feedback {} violates the single-source constraint",
                self.id
            ),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize)]
#[diesel(table_name = feedback_answers)]
pub struct FeedbackAnswer {
    pub id: String,
    pub feedback_id: String,
    pub question_id: String,
    pub answer: String,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize)]
#[diesel(table_name = adjudicator_test_score_history)]
pub struct TestScoreHistory {
    pub id: String,
    pub adjudicator_id: String,
    pub round_id: Option<String>,
    pub score: f64,
    pub timestamp: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_columns_are_exclusive() {
        let team = FeedbackSource::Team("t1".to_string());
        assert_eq!(team.columns(), (Some("t1"), None));

        let adj = FeedbackSource::Adjudicator("a1".to_string());
        assert_eq!(adj.columns(), (None, Some("a1")));

        assert_eq!(FeedbackSource::from_columns(Some("t1"), None), Some(team));
        assert_eq!(FeedbackSource::from_columns(None, Some("a1")), Some(adj));
        assert_eq!(FeedbackSource::from_columns(Some("t1"), Some("a1")), None);
        assert_eq!(FeedbackSource::from_columns(None, None), None);
    }
}
