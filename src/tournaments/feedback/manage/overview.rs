use std::collections::HashMap;

use axum::extract::Path;
use axum_extra::extract::PrivateCookieJar;
use diesel::prelude::*;
use hypertext::prelude::*;
use serde_json::{Value, json};

use crate::{
    auth::User,
    flash,
    schema::{adjudicator_feedback, feedback_answers, feedback_questions},
    state::Conn,
    template::Page,
    tournaments::{
        Tournament,
        config::TournamentPreferences,
        debates::{DebateInfo, TournamentDebates},
        feedback::{
            AdjudicatorFeedback, FeedbackQuestion, FeedbackSource,
            aggregate::{
                AdjudicatorSummary, adjudicator_pool, adjudicator_scores,
                get_feedback_overview,
            },
            manage::adj_actions::resolve_adjudicator,
        },
        manage::sidebar::SidebarWrapper,
        participants::TournamentParticipants,
        rounds::Round,
    },
    util_resp::{
        FailureResponse, FlashResponse, StandardResponse, SuccessResponse,
        json,
    },
    widgets::table::{CellWidget, Table, TableCell, TableHeader},
};

fn format_score(score: Option<f64>) -> String {
    match score {
        Some(score) => format!("{score:.2}"),
        None => "N/A".to_string(),
    }
}

/// The round abbreviation of each round, by sequence number.
pub fn round_abbreviations(rounds: &[Round]) -> HashMap<i64, String> {
    rounds
        .iter()
        .map(|round| (round.seq, round.abbreviation.clone()))
        .collect()
}

pub fn overview_table(
    tid: &str,
    prefs: &TournamentPreferences,
    summaries: &[AdjudicatorSummary],
    participants: &TournamentParticipants,
    round_abbrevs: &HashMap<i64, String>,
) -> Table {
    let actions = format!("/tournaments/{tid}/feedback/adjudicators");

    let mut headers = vec![
        TableHeader::new("name", "Name"),
        TableHeader::new("institution", "Institution"),
    ];
    if prefs.show_unaccredited {
        headers.push(TableHeader::new("novice", "Novice"));
    }
    headers.extend([
        TableHeader::new("breaking", "Breaking"),
        TableHeader::new("score", "Score")
            .tooltip("Overall score, combining the test and feedback scores"),
        TableHeader::new("feedback_score", "Feedback")
            .tooltip("Weighted average of confirmed feedback"),
        TableHeader::new("test_score", "Test"),
        TableHeader::new("trend", "Trend")
            .tooltip("Average feedback per round, by position"),
        TableHeader::new("feedback", "Feedback received"),
    ]);
    if prefs.enable_adj_notes {
        headers.push(TableHeader::new("note", "Note"));
    }
    headers.extend([
        TableHeader::new("debates", "Debates")
            .tooltip("Debates adjudicated up to the current round"),
        TableHeader::new("avg_margin", "Avg. margin"),
        TableHeader::new("avg_score", "Avg. score"),
    ]);

    let mut table = Table::new(None, headers);

    for summary in summaries {
        let adj = &summary.adjudicator;
        let hidden = vec![("adj_id".to_string(), adj.id.clone())];

        let mut row = vec![
            TableCell::text(&adj.name),
            TableCell::text(
                participants.institution_code(adj.institution_id.as_deref()),
            ),
        ];
        if prefs.show_unaccredited {
            row.push(
                TableCell::text(if adj.novice { "Novice" } else { "" })
                    .sort(adj.novice),
            );
        }
        row.extend([
            TableCell::text(adj.breaking).sort(adj.breaking).widget(
                CellWidget::Toggle {
                    action: format!("{actions}/breaking"),
                    name: "adj_breaking_status".to_string(),
                    checked: adj.breaking,
                    hidden: hidden.clone(),
                },
            ),
            TableCell::text(format!("{:.2}", summary.score)).sort(summary.score),
            TableCell::text(format_score(summary.feedback_score))
                .sort(summary.feedback_score.unwrap_or(f64::NEG_INFINITY)),
            TableCell::text(format!("{:.2}", summary.test_score))
                .sort(summary.test_score)
                .widget(CellWidget::Input {
                    action: format!("{actions}/test-score"),
                    name: "test_score".to_string(),
                    value: summary.test_score.to_string(),
                    hidden: hidden.clone(),
                }),
            TableCell::text(summary.feedback_data.describe(round_abbrevs))
                .data(json!(summary.feedback_data)),
            TableCell::text("View feedback").link(format!(
                "/tournaments/{tid}/feedback/on/adjudicator/{}",
                adj.id
            )),
        ]);
        if prefs.enable_adj_notes {
            let note = adj.notes.clone().unwrap_or_default();
            row.push(TableCell::text(&note).widget(CellWidget::Input {
                action: format!("{actions}/note"),
                name: "note".to_string(),
                value: note,
                hidden,
            }));
        }
        row.extend([
            TableCell::text(summary.debates).sort(summary.debates),
            TableCell::text(format_score(summary.avg_margin))
                .sort(summary.avg_margin.unwrap_or(f64::NEG_INFINITY)),
            TableCell::text(format_score(summary.avg_score))
                .sort(summary.avg_score.unwrap_or(f64::NEG_INFINITY)),
        ]);

        table.push_row(row);
    }

    table.sort_by_key("score", true);
    table
}

pub async fn feedback_overview_page(
    Path(tid): Path<String>,
    user: User,
    jar: PrivateCookieJar,
    mut conn: Conn,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_member(&user.id, &mut *conn)?;

    let prefs = tournament.preferences();
    let participants = TournamentParticipants::load(&tournament, &mut *conn)?;
    let pool = adjudicator_pool(&tournament, &mut *conn)?;
    let summaries = get_feedback_overview(&tournament, pool, &mut *conn)?;
    let rounds = Round::all(&tid, &mut *conn)?;

    let breaking = summaries
        .iter()
        .filter(|summary| summary.adjudicator.breaking)
        .count();
    let table = overview_table(
        &tid,
        &prefs,
        &summaries,
        &participants,
        &round_abbreviations(&rounds),
    );

    let (jar, messages) = flash::take(jar);
    let page = Page::new()
        .user(user)
        .tournament(tournament.clone())
        .flash(messages)
        .body(maud! {
            SidebarWrapper tournament=(&tournament) {
                h1 { "Adjudicator feedback" }
                p {
                    (breaking) " of " (summaries.len()) " adjudicators are marked as breaking. "
                    a href=(format!("/tournaments/{tid}/feedback/scores.json")) { "Scores as JSON" }
                }
                (table)
            }
        })
        .render();

    Ok((jar, SuccessResponse::Success(page)))
}

pub async fn adjudicator_scores_json(
    Path(tid): Path<String>,
    user: User,
    mut conn: Conn,
) -> StandardResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_member(&user.id, &mut *conn)?;

    let scores = adjudicator_scores(&tournament, &mut *conn)?;
    json(json!(scores))
}

/// How the source of a piece of feedback was involved in the debate: a
/// team's result, or an adjudicator's position.
pub fn source_annotation(info: &DebateInfo, source: &FeedbackSource) -> String {
    match source {
        FeedbackSource::Team(team_id) => info.result_of(team_id),
        FeedbackSource::Adjudicator(adj_id) => info
            .role_of(adj_id)
            .map(|role| role.display().to_string())
            .unwrap_or_else(|| "not in debate".to_string()),
    }
}

pub fn source_name(
    participants: &TournamentParticipants,
    source: &FeedbackSource,
) -> String {
    match source {
        FeedbackSource::Team(id) => participants.team_name(id).to_string(),
        FeedbackSource::Adjudicator(id) => {
            participants.adjudicator_name(id).to_string()
        }
    }
}

pub fn matchup(
    participants: &TournamentParticipants,
    info: &DebateInfo,
) -> String {
    info.teams
        .iter()
        .map(|team| participants.team_name(&team.team_id))
        .collect::<Vec<_>>()
        .join(" vs ")
}

/// One row of an adjudicator's feedback data: round, version (starred when
/// confirmed), bracket, matchup, source, score, one column per question and
/// whether the feedback is confirmed.
pub fn feedback_data_row(
    feedback: &AdjudicatorFeedback,
    info: &DebateInfo,
    participants: &TournamentParticipants,
    questions: &[FeedbackQuestion],
    answers: &HashMap<(String, String), String>,
) -> Vec<Value> {
    let source = feedback.source();
    let version = if feedback.confirmed {
        format!("{}*", feedback.version)
    } else {
        feedback.version.to_string()
    };

    let mut row = vec![
        json!(info.round.abbreviation),
        json!(version),
        json!(info.debate.bracket),
        json!(matchup(participants, info)),
        json!(format!(
            "{} ({})",
            source_name(participants, &source),
            source_annotation(info, &source)
        )),
        json!(feedback.score),
    ];
    for question in questions {
        let answer = answers
            .get(&(feedback.id.clone(), question.id.clone()))
            .map(String::as_str)
            .unwrap_or("-");
        row.push(json!(answer));
    }
    row.push(json!(feedback.confirmed));
    row
}

pub async fn adjudicator_feedback_data(
    Path((tid, aid)): Path<(String, String)>,
    user: User,
    mut conn: Conn,
) -> StandardResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_member(&user.id, &mut *conn)?;

    let adjudicator = resolve_adjudicator(&tournament, &aid, &mut *conn)
        .map_err(|_| FailureResponse::NotFound(()))?;

    let feedback = adjudicator_feedback::table
        .filter(adjudicator_feedback::tournament_id.eq(&tid))
        .filter(adjudicator_feedback::adjudicator_id.eq(&adjudicator.id))
        .filter(adjudicator_feedback::confirmed.eq(true))
        .order_by(adjudicator_feedback::timestamp.asc())
        .select(AdjudicatorFeedback::as_select())
        .load::<AdjudicatorFeedback>(&mut *conn)?;

    let questions = feedback_questions::table
        .filter(feedback_questions::tournament_id.eq(&tid))
        .order_by(feedback_questions::seq.asc())
        .select(FeedbackQuestion::as_select())
        .load::<FeedbackQuestion>(&mut *conn)?;

    let ids: Vec<String> = feedback.iter().map(|f| f.id.clone()).collect();
    let answers: HashMap<(String, String), String> = feedback_answers::table
        .filter(feedback_answers::feedback_id.eq_any(ids))
        .select((
            feedback_answers::feedback_id,
            feedback_answers::question_id,
            feedback_answers::answer,
        ))
        .load::<(String, String, String)>(&mut *conn)?
        .into_iter()
        .map(|(feedback_id, question_id, answer)| {
            ((feedback_id, question_id), answer)
        })
        .collect();

    let participants = TournamentParticipants::load(&tournament, &mut *conn)?;
    let debates = TournamentDebates::load(&tid, &mut *conn)?;

    let rows: Vec<Vec<Value>> = feedback
        .iter()
        .filter_map(|f| {
            let info = debates.get(&f.debate_id)?;
            Some(feedback_data_row(f, info, &participants, &questions, &answers))
        })
        .collect();

    json(json!({ "aaData": rows }))
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::tournaments::{
        config::{FeedbackPaths, WeightingKind},
        feedback::aggregate::FeedbackTrend,
        participants::Adjudicator,
    };

    fn prefs(show_unaccredited: bool, enable_adj_notes: bool) -> TournamentPreferences {
        TournamentPreferences {
            share_adjs: false,
            show_unaccredited,
            enable_adj_notes,
            adj_min_score: 1.0,
            adj_max_score: 5.0,
            feedback_weight: 0.5,
            feedback_weighting: WeightingKind::Uniform,
            feedback_recency_decay: 0.9,
            feedback_paths: FeedbackPaths::Minimal,
            public_feedback: false,
            public_feedback_randomised: false,
            feedback_progress_public: false,
        }
    }

    fn summary(id: &str, score: f64, feedback: Option<f64>) -> AdjudicatorSummary {
        AdjudicatorSummary {
            adjudicator: Adjudicator {
                id: id.to_string(),
                tournament_id: Some("t".to_string()),
                name: id.to_uppercase(),
                institution_id: None,
                test_score: score,
                breaking: false,
                novice: false,
                independent: false,
                notes: None,
                url_key: None,
            },
            feedback_score: feedback,
            test_score: score,
            score,
            debates: 0,
            avg_margin: None,
            avg_score: None,
            feedback_data: FeedbackTrend::default(),
        }
    }

    fn participants() -> TournamentParticipants {
        TournamentParticipants {
            teams: IndexMap::new(),
            adjudicators: IndexMap::new(),
            institutions: IndexMap::new(),
        }
    }

    #[test]
    fn adjudicators_without_feedback_show_na() {
        let table = overview_table(
            "t",
            &prefs(false, false),
            &[summary("a", 3.0, None), summary("b", 4.0, Some(4.0))],
            &participants(),
            &HashMap::new(),
        );

        let feedback_col = table
            .headers
            .iter()
            .position(|h| h.key == "feedback_score")
            .unwrap();
        // sorted by score, best first
        assert_eq!(table.rows[0][0].text, "B");
        assert_eq!(table.rows[0][feedback_col].text, "4.00");
        assert_eq!(table.rows[1][feedback_col].text, "N/A");
    }

    #[test]
    fn optional_columns_follow_preferences() {
        let without = overview_table(
            "t",
            &prefs(false, false),
            &[],
            &participants(),
            &HashMap::new(),
        );
        assert!(!without.headers.iter().any(|h| h.key == "novice"));
        assert!(!without.headers.iter().any(|h| h.key == "note"));

        let with = overview_table(
            "t",
            &prefs(true, true),
            &[summary("a", 3.0, None)],
            &participants(),
            &HashMap::new(),
        );
        assert!(with.headers.iter().any(|h| h.key == "novice"));
        assert!(with.headers.iter().any(|h| h.key == "note"));
        assert_eq!(with.rows[0].len(), with.headers.len());
    }
}
