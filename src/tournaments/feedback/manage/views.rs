//! Pages for browsing the feedback which has been received.

use std::collections::HashMap;

use axum::extract::Path;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use hypertext::prelude::*;

use crate::{
    auth::User,
    schema::{adjudicator_feedback, feedback_answers, feedback_questions},
    state::Conn,
    template::Page,
    tournaments::{
        Tournament,
        config::TournamentPreferences,
        debates::TournamentDebates,
        feedback::{
            AdjudicatorFeedback, FeedbackQuestion, FeedbackSource,
            manage::overview::{matchup, source_annotation, source_name},
        },
        manage::sidebar::SidebarWrapper,
        participants::TournamentParticipants,
    },
    util_resp::{StandardResponse, err_not_found, success},
    widgets::table::{Table, TableCell, TableHeader},
};

const LATEST_FEEDBACK_COUNT: i64 = 50;

/// Scores at or below `low` (or `medium`) and at or above `high` are
/// highlighted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl ScoreThresholds {
    pub fn from_prefs(prefs: &TournamentPreferences) -> Self {
        let range = prefs.adj_max_score - prefs.adj_min_score;
        Self {
            low: prefs.adj_min_score + range / 10.0,
            medium: prefs.adj_min_score + range / 5.0,
            high: prefs.adj_max_score - range / 10.0,
        }
    }

    pub fn class(&self, score: f64) -> &'static str {
        if score <= self.low {
            "text-danger"
        } else if score <= self.medium {
            "text-warning"
        } else if score >= self.high {
            "text-success"
        } else {
            ""
        }
    }
}

/// Which feedback to show.
#[derive(Clone, Debug)]
pub enum FeedbackFilter {
    Latest,
    On(String),
    From(FeedbackSource),
}

pub struct FeedbackCard {
    pub feedback: AdjudicatorFeedback,
    pub target: String,
    pub source: String,
    pub round: String,
    pub matchup: String,
    /// `(question, answer)`, in question order.
    pub answers: Vec<(String, String)>,
}

/// Loads feedback (newest first) along with everything needed to display
/// it.
pub fn load_cards(
    tournament: &Tournament,
    filter: &FeedbackFilter,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<Vec<FeedbackCard>> {
    let mut query = adjudicator_feedback::table
        .select(AdjudicatorFeedback::as_select())
        .filter(adjudicator_feedback::tournament_id.eq(tournament.id.clone()))
        .order_by(adjudicator_feedback::timestamp.desc())
        .into_boxed();
    query = match filter {
        FeedbackFilter::Latest => query.limit(LATEST_FEEDBACK_COUNT),
        FeedbackFilter::On(adj_id) => {
            query.filter(adjudicator_feedback::adjudicator_id.eq(adj_id.clone()))
        }
        FeedbackFilter::From(FeedbackSource::Team(team_id)) => query.filter(
            adjudicator_feedback::source_team_id.eq(team_id.clone()),
        ),
        FeedbackFilter::From(FeedbackSource::Adjudicator(adj_id)) => query
            .filter(
                adjudicator_feedback::source_adjudicator_id.eq(adj_id.clone()),
            ),
    };
    let feedback = query.load::<AdjudicatorFeedback>(conn)?;

    let questions: HashMap<String, FeedbackQuestion> =
        feedback_questions::table
            .filter(feedback_questions::tournament_id.eq(&tournament.id))
            .select(FeedbackQuestion::as_select())
            .load::<FeedbackQuestion>(conn)?
            .into_iter()
            .map(|question| (question.id.clone(), question))
            .collect();

    let ids: Vec<String> = feedback.iter().map(|f| f.id.clone()).collect();
    let mut answers: HashMap<String, Vec<(i64, String, String)>> =
        HashMap::new();
    for (feedback_id, question_id, answer) in feedback_answers::table
        .filter(feedback_answers::feedback_id.eq_any(ids))
        .select((
            feedback_answers::feedback_id,
            feedback_answers::question_id,
            feedback_answers::answer,
        ))
        .load::<(String, String, String)>(conn)?
    {
        if let Some(question) = questions.get(&question_id) {
            answers.entry(feedback_id).or_default().push((
                question.seq,
                question.text.clone(),
                answer,
            ));
        }
    }

    let participants = TournamentParticipants::load(tournament, conn)?;
    let debates = TournamentDebates::load(&tournament.id, conn)?;

    Ok(feedback
        .into_iter()
        .map(|feedback| {
            let source = feedback.source();
            let (round, teams, annotation) =
                match debates.get(&feedback.debate_id) {
                    Some(info) => (
                        info.round.abbreviation.clone(),
                        matchup(&participants, info),
                        source_annotation(info, &source),
                    ),
                    None => Default::default(),
                };
            let mut card_answers =
                answers.remove(&feedback.id).unwrap_or_default();
            card_answers.sort_by_key(|(seq, _, _)| *seq);

            FeedbackCard {
                target: participants
                    .adjudicator_name(&feedback.adjudicator_id)
                    .to_string(),
                source: format!(
                    "{} ({annotation})",
                    source_name(&participants, &source)
                ),
                round,
                matchup: teams,
                answers: card_answers
                    .into_iter()
                    .map(|(_, question, answer)| (question, answer))
                    .collect(),
                feedback,
            }
        })
        .collect())
}

pub struct FeedbackCards<'r> {
    pub cards: &'r [FeedbackCard],
    pub thresholds: ScoreThresholds,
}

impl Renderable for FeedbackCards<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            @if self.cards.is_empty() {
                p class="text-muted" { "No feedback has been received." }
            }
            @for card in self.cards {
                div class="card mb-3" {
                    div class="card-header d-flex justify-content-between" {
                        span {
                            strong { (card.source) } " on " strong { (card.target) }
                        }
                        span class="text-muted" {
                            (card.round) " · " (card.matchup)
                        }
                    }
                    div class="card-body" {
                        p class=(format!("fs-4 {}", self.thresholds.class(card.feedback.score))) {
                            (format!("{:.1}", card.feedback.score))
                        }
                        @if !card.answers.is_empty() {
                            dl {
                                @for (question, answer) in &card.answers {
                                    dt { (question) }
                                    dd { (answer) }
                                }
                            }
                        }
                    }
                    div class="card-footer small text-muted" {
                        "Version " (card.feedback.version)
                        @if card.feedback.confirmed {
                            span class="badge bg-success ms-2" { "Confirmed" }
                        } @else {
                            span class="badge bg-secondary ms-2" { "Unconfirmed" }
                        }
                        " · " (card.feedback.submitter_kind)
                        " · " (card.feedback.timestamp.format("%Y-%m-%d %H:%M").to_string())
                    }
                }
            }
        }
        .render_to(buffer);
    }
}

fn cards_page(
    tournament: Tournament,
    user: User,
    title: String,
    filter: FeedbackFilter,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> StandardResponse {
    let cards = load_cards(&tournament, &filter, conn)?;
    let thresholds = ScoreThresholds::from_prefs(&tournament.preferences());

    success(
        Page::new()
            .user(user)
            .tournament(tournament.clone())
            .body(maud! {
                SidebarWrapper tournament=(&tournament) {
                    h1 { (title) }
                    FeedbackCards cards=(&cards) thresholds=(thresholds);
                }
            })
            .render(),
    )
}

pub async fn latest_feedback_page(
    Path(tid): Path<String>,
    user: User,
    mut conn: Conn,
) -> StandardResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_member(&user.id, &mut *conn)?;

    cards_page(
        tournament,
        user,
        "Latest feedback".to_string(),
        FeedbackFilter::Latest,
        &mut *conn,
    )
}

pub async fn feedback_on_adjudicator_page(
    Path((tid, adj_id)): Path<(String, String)>,
    user: User,
    mut conn: Conn,
) -> StandardResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_member(&user.id, &mut *conn)?;

    let participants = TournamentParticipants::load(&tournament, &mut *conn)?;
    let Some(adjudicator) = participants.adjudicators.get(&adj_id) else {
        return err_not_found();
    };

    cards_page(
        tournament,
        user,
        format!("Feedback on {}", adjudicator.name),
        FeedbackFilter::On(adj_id),
        &mut *conn,
    )
}

pub async fn feedback_from_team_page(
    Path((tid, team_id)): Path<(String, String)>,
    user: User,
    mut conn: Conn,
) -> StandardResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_member(&user.id, &mut *conn)?;

    let participants = TournamentParticipants::load(&tournament, &mut *conn)?;
    let Some(team) = participants.teams.get(&team_id) else {
        return err_not_found();
    };

    cards_page(
        tournament,
        user,
        format!("Feedback from {}", team.name),
        FeedbackFilter::From(FeedbackSource::Team(team_id)),
        &mut *conn,
    )
}

pub async fn feedback_from_adjudicator_page(
    Path((tid, adj_id)): Path<(String, String)>,
    user: User,
    mut conn: Conn,
) -> StandardResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_member(&user.id, &mut *conn)?;

    let participants = TournamentParticipants::load(&tournament, &mut *conn)?;
    let Some(adjudicator) = participants.adjudicators.get(&adj_id) else {
        return err_not_found();
    };

    cards_page(
        tournament,
        user,
        format!("Feedback from {}", adjudicator.name),
        FeedbackFilter::From(FeedbackSource::Adjudicator(adj_id)),
        &mut *conn,
    )
}

/// Counts of confirmed feedback, by target and by source.
#[derive(Default)]
struct FeedbackCounts {
    on: HashMap<String, usize>,
    from: HashMap<FeedbackSource, usize>,
}

fn feedback_counts(
    tournament: &Tournament,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<FeedbackCounts> {
    let mut counts = FeedbackCounts::default();
    for feedback in adjudicator_feedback::table
        .filter(adjudicator_feedback::tournament_id.eq(&tournament.id))
        .filter(adjudicator_feedback::confirmed.eq(true))
        .select(AdjudicatorFeedback::as_select())
        .load::<AdjudicatorFeedback>(conn)?
    {
        *counts.on.entry(feedback.adjudicator_id.clone()).or_default() += 1;
        *counts.from.entry(feedback.source()).or_default() += 1;
    }
    Ok(counts)
}

pub async fn feedback_by_target_page(
    Path(tid): Path<String>,
    user: User,
    mut conn: Conn,
) -> StandardResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_member(&user.id, &mut *conn)?;

    let participants = TournamentParticipants::load(&tournament, &mut *conn)?;
    let counts = feedback_counts(&tournament, &mut *conn)?;

    let mut table = Table::new(
        None,
        vec![
            TableHeader::new("name", "Adjudicator"),
            TableHeader::new("institution", "Institution"),
            TableHeader::new("count", "Feedback received"),
        ],
    );
    for adj in participants.adjudicators.values() {
        let count = counts.on.get(&adj.id).copied().unwrap_or(0);
        table.push_row(vec![
            TableCell::text(&adj.name).link(format!(
                "/tournaments/{tid}/feedback/on/adjudicator/{}",
                adj.id
            )),
            TableCell::text(
                participants.institution_code(adj.institution_id.as_deref()),
            ),
            TableCell::text(count).sort(count),
        ]);
    }

    success(
        Page::new()
            .user(user)
            .tournament(tournament.clone())
            .body(maud! {
                SidebarWrapper tournament=(&tournament) {
                    h1 { "Feedback by target" }
                    (table)
                }
            })
            .render(),
    )
}

pub async fn feedback_by_source_page(
    Path(tid): Path<String>,
    user: User,
    mut conn: Conn,
) -> StandardResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_member(&user.id, &mut *conn)?;

    let participants = TournamentParticipants::load(&tournament, &mut *conn)?;
    let counts = feedback_counts(&tournament, &mut *conn)?;

    let headers = || {
        vec![
            TableHeader::new("name", "Name"),
            TableHeader::new("institution", "Institution"),
            TableHeader::new("count", "Feedback submitted"),
        ]
    };

    let mut teams = Table::new(Some("From teams"), headers());
    for team in participants.teams.values() {
        let count = counts
            .from
            .get(&FeedbackSource::Team(team.id.clone()))
            .copied()
            .unwrap_or(0);
        teams.push_row(vec![
            TableCell::text(&team.name).link(format!(
                "/tournaments/{tid}/feedback/from/team/{}",
                team.id
            )),
            TableCell::text(
                participants.institution_code(team.institution_id.as_deref()),
            ),
            TableCell::text(count).sort(count),
        ]);
    }

    let mut adjudicators = Table::new(Some("From adjudicators"), headers());
    for adj in participants.adjudicators.values() {
        let count = counts
            .from
            .get(&FeedbackSource::Adjudicator(adj.id.clone()))
            .copied()
            .unwrap_or(0);
        adjudicators.push_row(vec![
            TableCell::text(&adj.name).link(format!(
                "/tournaments/{tid}/feedback/from/adjudicator/{}",
                adj.id
            )),
            TableCell::text(
                participants.institution_code(adj.institution_id.as_deref()),
            ),
            TableCell::text(count).sort(count),
        ]);
    }

    success(
        Page::new()
            .user(user)
            .tournament(tournament.clone())
            .body(maud! {
                SidebarWrapper tournament=(&tournament) {
                    h1 { "Feedback by source" }
                    (teams)
                    (adjudicators)
                }
            })
            .render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournaments::config::{FeedbackPaths, WeightingKind};

    #[test]
    fn thresholds_follow_score_range() {
        let prefs = TournamentPreferences {
            share_adjs: false,
            show_unaccredited: false,
            enable_adj_notes: false,
            adj_min_score: 0.0,
            adj_max_score: 10.0,
            feedback_weight: 0.5,
            feedback_weighting: WeightingKind::Uniform,
            feedback_recency_decay: 0.9,
            feedback_paths: FeedbackPaths::Minimal,
            public_feedback: false,
            public_feedback_randomised: false,
            feedback_progress_public: false,
        };
        let thresholds = ScoreThresholds::from_prefs(&prefs);
        assert_eq!(
            thresholds,
            ScoreThresholds {
                low: 1.0,
                medium: 2.0,
                high: 9.0
            }
        );
        assert_eq!(thresholds.class(0.5), "text-danger");
        assert_eq!(thresholds.class(1.5), "text-warning");
        assert_eq!(thresholds.class(5.0), "");
        assert_eq!(thresholds.class(9.5), "text-success");
    }
}
