use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};

use crate::{
    schema::tournaments,
    tournaments::config::{
        FeedbackPaths, TournamentPreferences, WeightingKind,
    },
    util_resp::FailureResponse,
};

pub mod config;
pub mod create;
pub mod debates;
pub mod feedback;
pub mod manage;
pub mod participants;
pub mod privateurls;
pub mod rounds;
pub mod view;

#[derive(Queryable, Clone, Debug)]
pub struct Tournament {
    pub id: String,
    pub name: String,
    pub abbrv: String,
    pub slug: String,
    pub created_at: chrono::NaiveDateTime,
    pub share_adjs: bool,
    pub show_unaccredited: bool,
    pub enable_adj_notes: bool,
    pub adj_min_score: f64,
    pub adj_max_score: f64,
    pub feedback_weight: f64,
    pub feedback_weighting: String,
    pub feedback_recency_decay: f64,
    pub feedback_paths: String,
    pub public_feedback: bool,
    pub public_feedback_randomised: bool,
    pub feedback_progress_public: bool,
}

impl Tournament {
    pub fn fetch(
        id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Self, FailureResponse> {
        Ok(tournaments::table
            .filter(tournaments::id.eq(id))
            .first::<Tournament>(conn)?)
    }

    pub fn fetch_by_slug(
        slug: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Option<Self>> {
        tournaments::table
            .filter(tournaments::slug.eq(slug))
            .first::<Tournament>(conn)
            .optional()
    }

    /// The typed view of the preference columns.
    pub fn preferences(&self) -> TournamentPreferences {
        TournamentPreferences {
            share_adjs: self.share_adjs,
            show_unaccredited: self.show_unaccredited,
            enable_adj_notes: self.enable_adj_notes,
            adj_min_score: self.adj_min_score,
            adj_max_score: self.adj_max_score,
            feedback_weight: self.feedback_weight,
            feedback_weighting: WeightingKind::from_column(
                &self.feedback_weighting,
            ),
            feedback_recency_decay: self.feedback_recency_decay,
            feedback_paths: FeedbackPaths::from_column(&self.feedback_paths),
            public_feedback: self.public_feedback,
            public_feedback_randomised: self.public_feedback_randomised,
            feedback_progress_public: self.feedback_progress_public,
        }
    }
}
