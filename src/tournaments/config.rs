//! Per-tournament preferences which affect adjudicator feedback.
//!
//! These are stored as columns on the `tournaments` table, and edited by
//! superusers as a TOML document (see [`super::manage::config`]).

use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::{
    schema::tournaments, tournaments::feedback::aggregate::FeedbackWeighting,
};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeightingKind {
    /// Every piece of confirmed feedback counts equally.
    Uniform,
    /// Each round counts equally, however many pieces of feedback were
    /// received in it.
    PerRound,
    /// Feedback from later rounds counts for more; a round `k` rounds
    /// before the latest is scaled by `feedback_recency_decay^k`.
    Recency,
}

impl WeightingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightingKind::Uniform => "uniform",
            WeightingKind::PerRound => "per_round",
            WeightingKind::Recency => "recency",
        }
    }

    pub fn from_column(value: &str) -> Self {
        match value {
            "per_round" => WeightingKind::PerRound,
            "recency" => WeightingKind::Recency,
            _ => WeightingKind::Uniform,
        }
    }
}

/// Who is expected to give feedback on whom.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackPaths {
    /// Teams on the chair, and panellists and trainees on the chair.
    Minimal,
    /// As [`FeedbackPaths::Minimal`], and chairs also on each panellist and
    /// trainee.
    WithChairOnWings,
}

impl FeedbackPaths {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackPaths::Minimal => "minimal",
            FeedbackPaths::WithChairOnWings => "with_chair_on_wings",
        }
    }

    pub fn from_column(value: &str) -> Self {
        match value {
            "with_chair_on_wings" => FeedbackPaths::WithChairOnWings,
            _ => FeedbackPaths::Minimal,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TournamentPreferences {
    /// Whether adjudicators which do not belong to any tournament can be
    /// used (and scored) in this one.
    pub share_adjs: bool,
    pub show_unaccredited: bool,
    pub enable_adj_notes: bool,
    pub adj_min_score: f64,
    pub adj_max_score: f64,
    /// How much the feedback score counts towards an adjudicator's overall
    /// score (the rest comes from their test score).
    pub feedback_weight: f64,
    pub feedback_weighting: WeightingKind,
    pub feedback_recency_decay: f64,
    pub feedback_paths: FeedbackPaths,
    pub public_feedback: bool,
    pub public_feedback_randomised: bool,
    pub feedback_progress_public: bool,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PreferencesError {
    #[error(
        "`adj_min_score` ({min}) must be smaller than `adj_max_score` ({max})"
    )]
    ScoreRange { min: f64, max: f64 },
    #[error("`feedback_weight` must be between 0 and 1 (you supplied {0})")]
    Weight(f64),
    #[error(
        "`feedback_recency_decay` must be greater than 0 and at most 1 (you supplied {0})"
    )]
    Decay(f64),
}

impl TournamentPreferences {
    pub fn validate(&self) -> Result<(), PreferencesError> {
        if !(self.adj_min_score < self.adj_max_score) {
            return Err(PreferencesError::ScoreRange {
                min: self.adj_min_score,
                max: self.adj_max_score,
            });
        }
        if !(0.0..=1.0).contains(&self.feedback_weight) {
            return Err(PreferencesError::Weight(self.feedback_weight));
        }
        if !(self.feedback_recency_decay > 0.0
            && self.feedback_recency_decay <= 1.0)
        {
            return Err(PreferencesError::Decay(self.feedback_recency_decay));
        }
        Ok(())
    }

    pub fn weighting(&self) -> FeedbackWeighting {
        match self.feedback_weighting {
            WeightingKind::Uniform => FeedbackWeighting::Uniform,
            WeightingKind::PerRound => FeedbackWeighting::PerRound,
            WeightingKind::Recency => FeedbackWeighting::Recency {
                decay: self.feedback_recency_decay,
            },
        }
    }

    pub fn save(
        &self,
        tournament_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<usize> {
        diesel::update(tournaments::table.find(tournament_id))
            .set((
                tournaments::share_adjs.eq(self.share_adjs),
                tournaments::show_unaccredited.eq(self.show_unaccredited),
                tournaments::enable_adj_notes.eq(self.enable_adj_notes),
                tournaments::adj_min_score.eq(self.adj_min_score),
                tournaments::adj_max_score.eq(self.adj_max_score),
                tournaments::feedback_weight.eq(self.feedback_weight),
                tournaments::feedback_weighting
                    .eq(self.feedback_weighting.as_str()),
                tournaments::feedback_recency_decay
                    .eq(self.feedback_recency_decay),
                tournaments::feedback_paths.eq(self.feedback_paths.as_str()),
                tournaments::public_feedback.eq(self.public_feedback),
                tournaments::public_feedback_randomised
                    .eq(self.public_feedback_randomised),
                tournaments::feedback_progress_public
                    .eq(self.feedback_progress_public),
            ))
            .execute(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"
share_adjs = true
show_unaccredited = false
enable_adj_notes = true
adj_min_score = 1.0
adj_max_score = 5.0
feedback_weight = 0.5
feedback_weighting = "recency"
feedback_recency_decay = 0.5
feedback_paths = "with_chair_on_wings"
public_feedback = false
public_feedback_randomised = true
feedback_progress_public = false
"#;

    #[test]
    fn parses_toml_document() {
        let prefs: TournamentPreferences = toml::from_str(DOCUMENT).unwrap();
        assert!(prefs.share_adjs);
        assert_eq!(prefs.feedback_paths, FeedbackPaths::WithChairOnWings);
        assert_eq!(
            prefs.weighting(),
            FeedbackWeighting::Recency { decay: 0.5 }
        );
        assert!(prefs.validate().is_ok());

        let again: TournamentPreferences =
            toml::from_str(&toml::to_string(&prefs).unwrap()).unwrap();
        assert_eq!(again, prefs);
    }

    #[test]
    fn rejects_inverted_score_range() {
        let mut prefs: TournamentPreferences =
            toml::from_str(DOCUMENT).unwrap();
        prefs.adj_min_score = 5.0;
        prefs.adj_max_score = 5.0;
        assert!(matches!(
            prefs.validate(),
            Err(PreferencesError::ScoreRange { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_weight_and_decay() {
        let mut prefs: TournamentPreferences =
            toml::from_str(DOCUMENT).unwrap();
        prefs.feedback_weight = 1.5;
        assert_eq!(prefs.validate(), Err(PreferencesError::Weight(1.5)));

        prefs.feedback_weight = 1.0;
        prefs.feedback_recency_decay = 0.0;
        assert_eq!(prefs.validate(), Err(PreferencesError::Decay(0.0)));
    }

    #[test]
    fn rejects_unknown_weighting() {
        let doc = DOCUMENT.replace("\"recency\"", "\"by_vibes\"");
        assert!(toml::from_str::<TournamentPreferences>(&doc).is_err());
    }
}
