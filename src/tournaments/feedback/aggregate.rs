//! Scores adjudicators from their test score and the feedback they received.
//!
//! An adjudicator's overall score is
//! `test_score * (1 - feedback_weight) + feedback_score * feedback_weight`,
//! where `feedback_score` is a weighted mean of their confirmed feedback. An
//! adjudicator without confirmed feedback is scored on their test score
//! alone.

use std::collections::{BTreeMap, HashMap};

use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use itertools::Itertools;
use serde::Serialize;

use crate::{
    schema::{
        adjudicator_feedback, adjudicator_test_score_history, adjudicators,
        tournament_debates, tournament_rounds,
    },
    tournaments::{
        Tournament,
        debates::{AdjudicatorRole, TournamentDebates},
        participants::Adjudicator,
        rounds::Round,
    },
};

/// How pieces of feedback are combined into a feedback score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FeedbackWeighting {
    Uniform,
    PerRound,
    Recency { decay: f64 },
}

/// The parts of a piece of feedback which the score depends on.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredFeedback {
    pub score: f64,
    pub confirmed: bool,
    pub round_seq: i64,
}

/// Combines the confirmed feedback into a single score. `reference_seq` is
/// the round that recency is measured from (usually the current round).
///
/// Returns `None` if there is no confirmed feedback.
pub fn weighted_feedback_score(
    feedback: &[ScoredFeedback],
    weighting: FeedbackWeighting,
    reference_seq: i64,
) -> Option<f64> {
    let confirmed = feedback.iter().filter(|f| f.confirmed);

    match weighting {
        FeedbackWeighting::Uniform => {
            let (sum, n) = confirmed
                .fold((0.0, 0usize), |(sum, n), f| (sum + f.score, n + 1));
            (n > 0).then(|| sum / n as f64)
        }
        FeedbackWeighting::PerRound | FeedbackWeighting::Recency { .. } => {
            let mut by_round: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
            for f in confirmed {
                let entry = by_round.entry(f.round_seq).or_insert((0.0, 0));
                entry.0 += f.score;
                entry.1 += 1;
            }

            let mut total = 0.0;
            let mut total_weight = 0.0;
            for (seq, (sum, n)) in by_round {
                let weight = match weighting {
                    FeedbackWeighting::Recency { decay } => {
                        let age = (reference_seq - seq).max(0);
                        decay.powi(age.min(i32::MAX as i64) as i32)
                    }
                    _ => 1.0,
                };
                total += weight * (sum / n as f64);
                total_weight += weight;
            }

            (total_weight > 0.0).then(|| total / total_weight)
        }
    }
}

pub fn combined_score(
    test_score: f64,
    feedback_score: Option<f64>,
    feedback_weight: f64,
) -> f64 {
    match feedback_score {
        Some(feedback) => {
            test_score * (1.0 - feedback_weight) + feedback * feedback_weight
        }
        None => test_score,
    }
}

/// Average confirmed feedback score per round, split by the role the
/// adjudicator had in the debate the feedback was about.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct FeedbackTrend {
    pub chair: BTreeMap<i64, f64>,
    pub panellist: BTreeMap<i64, f64>,
    pub trainee: BTreeMap<i64, f64>,
}

impl FeedbackTrend {
    pub fn from_feedback(
        feedback: impl IntoIterator<Item = (AdjudicatorRole, ScoredFeedback)>,
    ) -> Self {
        let mut sums: HashMap<(AdjudicatorRole, i64), (f64, usize)> =
            HashMap::new();
        for (role, f) in feedback {
            if !f.confirmed {
                continue;
            }
            let entry = sums.entry((role, f.round_seq)).or_insert((0.0, 0));
            entry.0 += f.score;
            entry.1 += 1;
        }

        let mut trend = FeedbackTrend::default();
        for ((role, seq), (sum, n)) in sums {
            trend.role_mut(role).insert(seq, sum / n as f64);
        }
        trend
    }

    fn role_mut(&mut self, role: AdjudicatorRole) -> &mut BTreeMap<i64, f64> {
        match role {
            AdjudicatorRole::Chair => &mut self.chair,
            AdjudicatorRole::Panellist => &mut self.panellist,
            AdjudicatorRole::Trainee => &mut self.trainee,
        }
    }

    pub fn role(&self, role: AdjudicatorRole) -> &BTreeMap<i64, f64> {
        match role {
            AdjudicatorRole::Chair => &self.chair,
            AdjudicatorRole::Panellist => &self.panellist,
            AdjudicatorRole::Trainee => &self.trainee,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chair.is_empty()
            && self.panellist.is_empty()
            && self.trainee.is_empty()
    }

    /// A compact description, e.g. `Chair: R1 3.5, R2 4.0`.
    pub fn describe(&self, round_abbrevs: &HashMap<i64, String>) -> String {
        AdjudicatorRole::ALL
            .iter()
            .filter(|role| !self.role(**role).is_empty())
            .map(|role| {
                let rounds = self
                    .role(*role)
                    .iter()
                    .map(|(seq, avg)| {
                        let abbrev = round_abbrevs
                            .get(seq)
                            .cloned()
                            .unwrap_or_else(|| format!("R{seq}"));
                        format!("{abbrev} {avg:.1}")
                    })
                    .join(", ");
                format!("{}: {rounds}", role.display())
            })
            .join("; ")
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct AdjudicatorSummary {
    pub adjudicator: Adjudicator,
    pub feedback_score: Option<f64>,
    /// The latest test score on record (falling back to the adjudicator's
    /// stored test score when there is no history).
    pub test_score: f64,
    pub score: f64,
    pub debates: usize,
    pub avg_margin: Option<f64>,
    pub avg_score: Option<f64>,
    pub feedback_data: FeedbackTrend,
}

/// The adjudicators which can be used in (and are scored for) the
/// tournament: its own adjudicators, plus the shared pool if `share_adjs` is
/// set.
pub fn adjudicator_pool_query(
    tournament: &Tournament,
) -> adjudicators::BoxedQuery<'static, Sqlite> {
    let query = adjudicators::table.into_boxed();
    if tournament.share_adjs {
        query.filter(
            adjudicators::tournament_id
                .eq(tournament.id.clone())
                .or(adjudicators::tournament_id.is_null()),
        )
    } else {
        query.filter(adjudicators::tournament_id.eq(tournament.id.clone()))
    }
}

pub fn adjudicator_pool(
    tournament: &Tournament,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<Vec<Adjudicator>> {
    adjudicator_pool_query(tournament)
        .order_by(adjudicators::name.asc())
        .load::<Adjudicator>(conn)
}

/// Computes a summary for each of the given adjudicators. Each summary only
/// depends on that adjudicator's data.
#[tracing::instrument(skip(tournament, adjudicators, conn), fields(tournament = %tournament.id))]
pub fn get_feedback_overview(
    tournament: &Tournament,
    adjudicators: Vec<Adjudicator>,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<Vec<AdjudicatorSummary>> {
    let prefs = tournament.preferences();
    let ids: Vec<String> = adjudicators.iter().map(|a| a.id.clone()).collect();

    let current_seq = Round::current(&tournament.id, conn)?.map(|r| r.seq);

    let feedback = adjudicator_feedback::table
        .inner_join(
            tournament_debates::table.inner_join(tournament_rounds::table),
        )
        .filter(adjudicator_feedback::tournament_id.eq(&tournament.id))
        .filter(adjudicator_feedback::adjudicator_id.eq_any(&ids))
        .filter(adjudicator_feedback::confirmed.eq(true))
        .select((
            adjudicator_feedback::adjudicator_id,
            adjudicator_feedback::debate_id,
            adjudicator_feedback::score,
            tournament_rounds::seq,
        ))
        .load::<(String, String, f64, i64)>(conn)?;

    let mut feedback_of: HashMap<String, Vec<(String, ScoredFeedback)>> =
        HashMap::new();
    for (adj_id, debate_id, score, round_seq) in feedback {
        feedback_of.entry(adj_id).or_default().push((
            debate_id,
            ScoredFeedback {
                score,
                confirmed: true,
                round_seq,
            },
        ));
    }

    let mut latest_test_score: HashMap<String, f64> = HashMap::new();
    for (adj_id, score) in adjudicator_test_score_history::table
        .filter(adjudicator_test_score_history::adjudicator_id.eq_any(&ids))
        .order_by(adjudicator_test_score_history::timestamp.asc())
        .select((
            adjudicator_test_score_history::adjudicator_id,
            adjudicator_test_score_history::score,
        ))
        .load::<(String, f64)>(conn)?
    {
        latest_test_score.insert(adj_id, score);
    }

    let debates = TournamentDebates::load(&tournament.id, conn)?;
    let reference_seq = current_seq.unwrap_or(i64::MAX);

    let summaries = adjudicators
        .into_iter()
        .map(|adjudicator| {
            let received = feedback_of.remove(&adjudicator.id).unwrap_or_default();

            let scored: Vec<ScoredFeedback> =
                received.iter().map(|(_, f)| f.clone()).collect();
            let recency_reference = match current_seq {
                Some(seq) => seq,
                None => scored.iter().map(|f| f.round_seq).max().unwrap_or(0),
            };
            let feedback_score = weighted_feedback_score(
                &scored,
                prefs.weighting(),
                recency_reference,
            );

            let feedback_data = FeedbackTrend::from_feedback(
                received.iter().filter_map(|(debate_id, f)| {
                    let role = debates.get(debate_id)?.role_of(&adjudicator.id)?;
                    Some((role, f.clone()))
                }),
            );

            let test_score = latest_test_score
                .get(&adjudicator.id)
                .copied()
                .unwrap_or(adjudicator.test_score);

            let adjudicated: Vec<_> = debates
                .of_adjudicator(&adjudicator.id)
                .filter(|info| info.round.seq <= reference_seq)
                .collect();
            let margins: Vec<f64> =
                adjudicated.iter().filter_map(|info| info.margin()).collect();
            let scores: Vec<f64> = adjudicated
                .iter()
                .filter_map(|info| info.average_score())
                .collect();
            let debates_adjudicated = adjudicated.len();

            AdjudicatorSummary {
                score: combined_score(
                    test_score,
                    feedback_score,
                    prefs.feedback_weight,
                ),
                feedback_score,
                test_score,
                debates: debates_adjudicated,
                avg_margin: mean(&margins),
                avg_score: mean(&scores),
                feedback_data,
                adjudicator,
            }
        })
        .collect();

    Ok(summaries)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// The overall score of every adjudicator in the tournament's pool.
pub fn adjudicator_scores(
    tournament: &Tournament,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<BTreeMap<String, f64>> {
    let pool = adjudicator_pool(tournament, conn)?;
    Ok(get_feedback_overview(tournament, pool, conn)?
        .into_iter()
        .map(|summary| (summary.adjudicator.id, summary.score))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fb(score: f64, confirmed: bool, round_seq: i64) -> ScoredFeedback {
        ScoredFeedback {
            score,
            confirmed,
            round_seq,
        }
    }

    #[test]
    fn no_confirmed_feedback_has_no_score() {
        assert_eq!(
            weighted_feedback_score(&[], FeedbackWeighting::Uniform, 1),
            None
        );
        assert_eq!(
            weighted_feedback_score(
                &[fb(4.0, false, 1), fb(2.0, false, 2)],
                FeedbackWeighting::PerRound,
                2
            ),
            None
        );
    }

    #[test]
    fn unconfirmed_feedback_is_ignored() {
        let feedback = [fb(4.0, true, 1), fb(1.0, false, 1)];
        assert_eq!(
            weighted_feedback_score(&feedback, FeedbackWeighting::Uniform, 1),
            Some(4.0)
        );
    }

    #[test]
    fn uniform_and_per_round_differ() {
        // Three pieces in round 1 and one in round 2.
        let feedback = [
            fb(2.0, true, 1),
            fb(2.0, true, 1),
            fb(2.0, true, 1),
            fb(4.0, true, 2),
        ];
        assert_eq!(
            weighted_feedback_score(&feedback, FeedbackWeighting::Uniform, 2),
            Some(2.5)
        );
        assert_eq!(
            weighted_feedback_score(&feedback, FeedbackWeighting::PerRound, 2),
            Some(3.0)
        );
    }

    #[test]
    fn recency_favours_later_rounds() {
        let feedback = [fb(2.0, true, 1), fb(4.0, true, 2)];
        // weights: round 2 -> 1, round 1 -> 0.5
        let score = weighted_feedback_score(
            &feedback,
            FeedbackWeighting::Recency { decay: 0.5 },
            2,
        )
        .unwrap();
        assert!((score - (0.5 * 2.0 + 4.0) / 1.5).abs() < 1e-9);

        // a decay of one is the same as weighting rounds equally
        assert_eq!(
            weighted_feedback_score(
                &feedback,
                FeedbackWeighting::Recency { decay: 1.0 },
                2
            ),
            weighted_feedback_score(&feedback, FeedbackWeighting::PerRound, 2)
        );
    }

    #[test]
    fn combined_score_uses_weight() {
        assert_eq!(combined_score(3.0, None, 0.7), 3.0);
        assert_eq!(combined_score(2.0, Some(4.0), 0.5), 3.0);
        assert_eq!(combined_score(2.0, Some(4.0), 0.0), 2.0);
        assert_eq!(combined_score(2.0, Some(4.0), 1.0), 4.0);
    }

    #[test]
    fn trend_groups_by_role_and_round() {
        let trend = FeedbackTrend::from_feedback([
            (AdjudicatorRole::Chair, fb(3.0, true, 1)),
            (AdjudicatorRole::Chair, fb(5.0, true, 1)),
            (AdjudicatorRole::Panellist, fb(2.0, true, 2)),
            (AdjudicatorRole::Trainee, fb(1.0, false, 3)),
        ]);
        assert_eq!(trend.chair.get(&1), Some(&4.0));
        assert_eq!(trend.panellist.get(&2), Some(&2.0));
        assert!(trend.trainee.is_empty());

        let abbrevs = HashMap::from([(1, "R1".to_string())]);
        assert_eq!(trend.describe(&abbrevs), "Chair: R1 4.0; Panellist: R2 2.0");
    }
}
