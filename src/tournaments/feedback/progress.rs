//! Tracks how much of the feedback which is owed has been submitted.

use std::collections::HashSet;

use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::Serialize;

use crate::{
    schema::adjudicator_feedback,
    tournaments::{
        Tournament,
        config::FeedbackPaths,
        debates::{AdjudicatorRole, DebateInfo, TournamentDebates},
        feedback::FeedbackSource,
        participants::{Adjudicator, Team, TournamentParticipants},
        rounds::Round,
    },
    widgets::table::{TableCell, TableHeader},
};

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeedbackProgress {
    pub expected: usize,
    pub submitted: usize,
}

impl FeedbackProgress {
    pub fn owed(&self) -> usize {
        self.expected.saturating_sub(self.submitted)
    }

    /// The fraction of expected feedback which was submitted, or `None` when
    /// nothing is expected.
    pub fn coverage(&self) -> Option<f64> {
        (self.expected > 0)
            .then(|| self.submitted as f64 / self.expected as f64)
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct TeamProgress {
    pub team: Team,
    pub progress: FeedbackProgress,
}

#[derive(Serialize, Clone, Debug)]
pub struct AdjudicatorProgress {
    pub adjudicator: Adjudicator,
    pub progress: FeedbackProgress,
}

/// The adjudicators the given source is expected to give feedback on in this
/// debate.
pub fn expected_targets(
    info: &DebateInfo,
    source: &FeedbackSource,
    paths: FeedbackPaths,
) -> Vec<String> {
    let chair = info.chair().map(|chair| chair.adjudicator_id.clone());

    match source {
        FeedbackSource::Team(team_id) => {
            if info.has_team(team_id) {
                chair.into_iter().collect()
            } else {
                Vec::new()
            }
        }
        FeedbackSource::Adjudicator(adj_id) => match info.role_of(adj_id) {
            Some(AdjudicatorRole::Chair) => match paths {
                FeedbackPaths::WithChairOnWings => info
                    .wings()
                    .map(|wing| wing.adjudicator_id.clone())
                    .collect(),
                FeedbackPaths::Minimal => Vec::new(),
            },
            Some(_) => chair.into_iter().collect(),
            None => Vec::new(),
        },
    }
}

/// Counts expected and submitted feedback for one source over the given
/// debates. Only confirmed feedback counts, and each expected target counts
/// at most once per debate.
pub fn progress_of<'a>(
    source: &FeedbackSource,
    debates: impl Iterator<Item = &'a DebateInfo>,
    paths: FeedbackPaths,
    submitted: &HashSet<(String, FeedbackSource, String)>,
) -> FeedbackProgress {
    let mut progress = FeedbackProgress::default();
    for info in debates {
        for target in expected_targets(info, source, paths) {
            progress.expected += 1;
            if submitted.contains(&(
                info.debate.id.clone(),
                source.clone(),
                target,
            )) {
                progress.submitted += 1;
            }
        }
    }
    progress
}

#[tracing::instrument(skip(tournament, conn), fields(tournament = %tournament.id))]
pub fn get_feedback_progress(
    tournament: &Tournament,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<(Vec<TeamProgress>, Vec<AdjudicatorProgress>)> {
    let paths = tournament.preferences().feedback_paths;
    let participants = TournamentParticipants::load(tournament, conn)?;
    let debates = TournamentDebates::load(&tournament.id, conn)?;
    let current_seq = Round::current(&tournament.id, conn)?
        .map(|round| round.seq)
        .unwrap_or(i64::MIN);

    let submitted: HashSet<(String, FeedbackSource, String)> =
        adjudicator_feedback::table
            .filter(adjudicator_feedback::tournament_id.eq(&tournament.id))
            .filter(adjudicator_feedback::confirmed.eq(true))
            .select((
                adjudicator_feedback::debate_id,
                adjudicator_feedback::source_team_id,
                adjudicator_feedback::source_adjudicator_id,
                adjudicator_feedback::adjudicator_id,
            ))
            .load::<(String, Option<String>, Option<String>, String)>(conn)?
            .into_iter()
            .filter_map(|(debate, team, adj, target)| {
                let source = FeedbackSource::from_columns(
                    team.as_deref(),
                    adj.as_deref(),
                )?;
                Some((debate, source, target))
            })
            .collect();

    let teams = participants
        .teams
        .into_values()
        .map(|team| {
            let source = FeedbackSource::Team(team.id.clone());
            let progress = progress_of(
                &source,
                debates.up_to(current_seq),
                paths,
                &submitted,
            );
            TeamProgress { team, progress }
        })
        .collect();

    let adjudicators = participants
        .adjudicators
        .into_values()
        .map(|adjudicator| {
            let source = FeedbackSource::Adjudicator(adjudicator.id.clone());
            let progress = progress_of(
                &source,
                debates.up_to(current_seq),
                paths,
                &submitted,
            );
            AdjudicatorProgress {
                adjudicator,
                progress,
            }
        })
        .collect();

    Ok((teams, adjudicators))
}

pub fn progress_headers() -> Vec<TableHeader> {
    vec![
        TableHeader::new("submitted", "Submitted")
            .tooltip("Feedback submitted"),
        TableHeader::new("owed", "Owed").tooltip("Feedback still missing"),
        TableHeader::new("coverage", "Coverage")
            .tooltip("Percentage of expected feedback submitted"),
    ]
}

pub fn progress_cells(progress: &FeedbackProgress) -> Vec<TableCell> {
    let coverage = match progress.coverage() {
        Some(coverage) => TableCell::text(format!("{:.0}%", coverage * 100.0))
            .sort(coverage),
        None => TableCell::text("N/A").sort(-1.0),
    };

    vec![
        TableCell::text(progress.submitted).sort(progress.submitted),
        TableCell::text(progress.owed()).sort(progress.owed()),
        coverage,
    ]
}
