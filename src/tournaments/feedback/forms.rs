//! Feedback forms, shared by the tabroom and the public.

use std::collections::HashMap;

use chrono::Utc;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use hypertext::prelude::*;
use uuid::Uuid;

use crate::{
    actionlog::{ActionLogType, EntityKind, EntityRef, LogAction},
    schema::{adjudicator_feedback, feedback_answers, feedback_questions},
    tournaments::{
        Tournament,
        config::{FeedbackPaths, TournamentPreferences},
        debates::TournamentDebates,
        feedback::{
            AdjudicatorFeedback, AnswerType, FeedbackQuestion, FeedbackSource,
            SubmitterKind, progress::expected_targets,
        },
        participants::TournamentParticipants,
    },
    util_resp::FailureResponse,
    validation::parse_score,
};

/// Differences between the tabroom and the public forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeedbackFormOptions {
    /// Whether submitted feedback is confirmed straight away (which
    /// unconfirms earlier versions).
    pub confirm_on_submit: bool,
    pub enforce_required: bool,
    pub include_unreleased_draws: bool,
}

impl FeedbackFormOptions {
    pub fn tabroom() -> Self {
        Self {
            confirm_on_submit: true,
            enforce_required: false,
            include_unreleased_draws: true,
        }
    }

    pub fn public() -> Self {
        Self {
            confirm_on_submit: true,
            enforce_required: true,
            include_unreleased_draws: false,
        }
    }
}

/// An adjudicator (in a given debate) that feedback can be given on.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedbackTarget {
    pub debate_id: String,
    pub round_id: String,
    pub adjudicator_id: String,
    pub adjudicator_name: String,
    pub label: String,
}

impl FeedbackTarget {
    /// The value submitted by the form's `target` field.
    pub fn value(&self) -> String {
        format!("{}:{}", self.debate_id, self.adjudicator_id)
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FeedbackFormError {
    #[error("Please select one of the adjudicators listed.")]
    UnknownTarget,
    #[error("The score must be a number between {min} and {max}.")]
    InvalidScore { min: f64, max: f64 },
    #[error("Please answer the question \"{0}\".")]
    MissingAnswer(String),
    #[error("The answer to \"{0}\" isn't valid.")]
    InvalidAnswer(String),
}

/// Everything needed to show (or check) a feedback form for one source.
pub struct FeedbackFormContext {
    pub source: FeedbackSource,
    pub source_name: String,
    pub targets: Vec<FeedbackTarget>,
    pub questions: Vec<FeedbackQuestion>,
}

impl FeedbackFormContext {
    pub fn load(
        tournament: &Tournament,
        source: FeedbackSource,
        options: FeedbackFormOptions,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Self, FailureResponse> {
        let participants = TournamentParticipants::load(tournament, conn)?;
        let source_name = match &source {
            FeedbackSource::Team(id) => participants.teams.get(id).map(|t| &t.name),
            FeedbackSource::Adjudicator(id) => {
                participants.adjudicators.get(id).map(|a| &a.name)
            }
        }
        .ok_or(FailureResponse::NotFound(()))?
        .clone();

        let debates = TournamentDebates::load(&tournament.id, conn)?;
        let targets = feedback_targets(
            &source,
            &debates,
            &participants,
            tournament.preferences().feedback_paths,
            options,
        );

        let questions = feedback_questions::table
            .filter(feedback_questions::tournament_id.eq(&tournament.id))
            .order_by(feedback_questions::seq.asc())
            .select(FeedbackQuestion::as_select())
            .load::<FeedbackQuestion>(conn)?
            .into_iter()
            .filter(|question| question.applies_to(&source))
            .collect();

        Ok(Self {
            source,
            source_name,
            targets,
            questions,
        })
    }
}

/// The adjudicators the source can give feedback on, most recent round
/// first.
pub fn feedback_targets(
    source: &FeedbackSource,
    debates: &TournamentDebates,
    participants: &TournamentParticipants,
    paths: FeedbackPaths,
    options: FeedbackFormOptions,
) -> Vec<FeedbackTarget> {
    let mut targets = Vec::new();
    for info in debates.iter().rev() {
        if !(info.round.draw_released || options.include_unreleased_draws) {
            continue;
        }
        for adj_id in expected_targets(info, source, paths) {
            let role = info
                .role_of(&adj_id)
                .map(|role| role.display())
                .unwrap_or("");
            targets.push(FeedbackTarget {
                debate_id: info.debate.id.clone(),
                round_id: info.round.id.clone(),
                adjudicator_name: participants
                    .adjudicator_name(&adj_id)
                    .to_string(),
                label: format!(
                    "{} ({}, {})",
                    participants.adjudicator_name(&adj_id),
                    info.round.abbreviation,
                    role.to_lowercase()
                ),
                adjudicator_id: adj_id,
            });
        }
    }
    targets
}

/// A submission which passed validation.
#[derive(Debug, PartialEq)]
pub struct ValidFeedback {
    pub target: FeedbackTarget,
    pub score: f64,
    /// `(question id, answer)` for each answered question.
    pub answers: Vec<(String, String)>,
}

pub fn answer_field(question: &FeedbackQuestion) -> String {
    format!("q_{}", question.id)
}

/// Checks a submitted form. `form` holds the raw form fields: `target`,
/// `score` and one `q_<question id>` field per answered question.
pub fn validate_feedback(
    form: &HashMap<String, String>,
    context: &FeedbackFormContext,
    prefs: &TournamentPreferences,
    options: FeedbackFormOptions,
) -> Result<ValidFeedback, FeedbackFormError> {
    let target = form
        .get("target")
        .and_then(|value| {
            context.targets.iter().find(|target| &target.value() == value)
        })
        .ok_or(FeedbackFormError::UnknownTarget)?
        .clone();

    let score = form
        .get("score")
        .and_then(|score| parse_score(score))
        .filter(|score| {
            (prefs.adj_min_score..=prefs.adj_max_score).contains(score)
        })
        .ok_or(FeedbackFormError::InvalidScore {
            min: prefs.adj_min_score,
            max: prefs.adj_max_score,
        })?;

    let mut answers = Vec::new();
    for question in &context.questions {
        let answer = form
            .get(&answer_field(question))
            .map(|answer| answer.trim())
            .filter(|answer| !answer.is_empty());

        let Some(answer) = answer else {
            if question.required && options.enforce_required {
                return Err(FeedbackFormError::MissingAnswer(
                    question.text.clone(),
                ));
            }
            continue;
        };

        let well_formed = match question.kind() {
            AnswerType::Score => parse_score(answer).is_some(),
            AnswerType::Bool => matches!(answer, "true" | "false"),
            AnswerType::Text => true,
        };
        if !well_formed {
            return Err(FeedbackFormError::InvalidAnswer(question.text.clone()));
        }

        answers.push((question.id.clone(), answer.to_string()));
    }

    Ok(ValidFeedback {
        target,
        score,
        answers,
    })
}

/// Who entered a piece of feedback.
#[derive(Clone, Debug)]
pub struct Submitter {
    pub kind: SubmitterKind,
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
}

/// Saves feedback as a new version for its (source, target, debate), along
/// with its answers and an action log entry.
#[tracing::instrument(skip(tournament, feedback, conn), fields(tournament = %tournament.id))]
pub fn save_feedback(
    tournament: &Tournament,
    source: &FeedbackSource,
    feedback: ValidFeedback,
    submitter: Submitter,
    options: FeedbackFormOptions,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<AdjudicatorFeedback> {
    conn.transaction(|conn| {
        let mut previous = adjudicator_feedback::table
            .select((adjudicator_feedback::id, adjudicator_feedback::version))
            .filter(
                adjudicator_feedback::adjudicator_id
                    .eq(feedback.target.adjudicator_id.clone()),
            )
            .filter(
                adjudicator_feedback::debate_id
                    .eq(feedback.target.debate_id.clone()),
            )
            .into_boxed();
        previous = match source {
            FeedbackSource::Team(id) => previous
                .filter(adjudicator_feedback::source_team_id.eq(id.clone())),
            FeedbackSource::Adjudicator(id) => previous.filter(
                adjudicator_feedback::source_adjudicator_id.eq(id.clone()),
            ),
        };
        let previous = previous.load::<(String, i64)>(conn)?;

        let version =
            previous.iter().map(|(_, version)| *version).max().unwrap_or(0)
                + 1;

        if options.confirm_on_submit && !previous.is_empty() {
            let ids: Vec<String> =
                previous.iter().map(|(id, _)| id.clone()).collect();
            diesel::update(
                adjudicator_feedback::table
                    .filter(adjudicator_feedback::id.eq_any(ids)),
            )
            .set(adjudicator_feedback::confirmed.eq(false))
            .execute(conn)?;
        }

        let (source_team_id, source_adjudicator_id) = source.columns();
        let saved = AdjudicatorFeedback {
            id: Uuid::now_v7().to_string(),
            tournament_id: tournament.id.clone(),
            adjudicator_id: feedback.target.adjudicator_id.clone(),
            debate_id: feedback.target.debate_id.clone(),
            source_team_id: source_team_id.map(str::to_string),
            source_adjudicator_id: source_adjudicator_id.map(str::to_string),
            version,
            score: feedback.score,
            confirmed: options.confirm_on_submit,
            submitter_kind: submitter.kind.as_str().to_string(),
            submitter_id: submitter.user_id.clone(),
            ip_address: submitter.ip_address.clone(),
            timestamp: Utc::now().naive_utc(),
        };

        diesel::insert_into(adjudicator_feedback::table)
            .values((
                adjudicator_feedback::id.eq(&saved.id),
                adjudicator_feedback::tournament_id.eq(&saved.tournament_id),
                adjudicator_feedback::adjudicator_id.eq(&saved.adjudicator_id),
                adjudicator_feedback::debate_id.eq(&saved.debate_id),
                adjudicator_feedback::source_team_id.eq(&saved.source_team_id),
                adjudicator_feedback::source_adjudicator_id
                    .eq(&saved.source_adjudicator_id),
                adjudicator_feedback::version.eq(saved.version),
                adjudicator_feedback::score.eq(saved.score),
                adjudicator_feedback::confirmed.eq(saved.confirmed),
                adjudicator_feedback::submitter_kind.eq(&saved.submitter_kind),
                adjudicator_feedback::submitter_id.eq(&saved.submitter_id),
                adjudicator_feedback::ip_address.eq(&saved.ip_address),
                adjudicator_feedback::timestamp.eq(saved.timestamp),
            ))
            .execute(conn)?;

        for (question_id, answer) in &feedback.answers {
            diesel::insert_into(feedback_answers::table)
                .values((
                    feedback_answers::id.eq(Uuid::now_v7().to_string()),
                    feedback_answers::feedback_id.eq(&saved.id),
                    feedback_answers::question_id.eq(question_id),
                    feedback_answers::answer.eq(answer),
                ))
                .execute(conn)?;
        }

        let action = match submitter.kind {
            SubmitterKind::Tabroom => ActionLogType::FeedbackSave,
            SubmitterKind::Public => ActionLogType::FeedbackSubmit,
        };
        LogAction::new(action)
            .user_opt(submitter.user_id)
            .tournament(&tournament.id)
            .round(Some(&feedback.target.round_id))
            .ip(submitter.ip_address)
            .entity(EntityRef::new(EntityKind::AdjudicatorFeedback, &saved.id))
            .record(conn)?;

        tracing::info!(
            feedback = %saved.id,
            version = saved.version,
            "saved feedback"
        );

        Ok(saved)
    })
}

/// The feedback form itself. Posts back to the page it is shown on.
pub struct FeedbackForm<'r> {
    pub context: &'r FeedbackFormContext,
    pub prefs: &'r TournamentPreferences,
}

impl Renderable for FeedbackForm<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let min = self.prefs.adj_min_score.to_string();
        let max = self.prefs.adj_max_score.to_string();

        maud! {
            @if self.context.targets.is_empty() {
                p class="text-muted" {
                    "There is nobody to give feedback on yet."
                }
            } @else {
                form method="post" {
                    div class="mb-3" {
                        label for="target" class="form-label" { "Adjudicator" }
                        select class="form-select" name="target" id="target" required {
                            option value="" disabled selected { "Select an adjudicator" }
                            @for target in &self.context.targets {
                                option value=(target.value()) { (target.label) }
                            }
                        }
                    }
                    div class="mb-3" {
                        label for="score" class="form-label" {
                            "Overall score (" (min) " to " (max) ")"
                        }
                        input type="number" class="form-control" name="score" id="score" step="any" min=(min) max=(max) required;
                    }
                    @for question in &self.context.questions {
                        @let field = answer_field(question);
                        div class="mb-3" {
                            label for=(field) class="form-label" {
                                (question.text)
                                @if question.required { " *" }
                            }
                            @match question.kind() {
                                AnswerType::Score => {
                                    input type="number" class="form-control" step="any" name=(field) id=(field);
                                }
                                AnswerType::Text => {
                                    textarea class="form-control" name=(field) id=(field) rows="3" {}
                                }
                                AnswerType::Bool => {
                                    select class="form-select" name=(field) id=(field) {
                                        option value="" { "-" }
                                        option value="true" { "Yes" }
                                        option value="false" { "No" }
                                    }
                                }
                            }
                        }
                    }
                    button type="submit" class="btn btn-primary" { "Submit feedback" }
                }
            }
        }
        .render_to(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournaments::config::WeightingKind;

    fn prefs() -> TournamentPreferences {
        TournamentPreferences {
            share_adjs: false,
            show_unaccredited: false,
            enable_adj_notes: false,
            adj_min_score: 1.0,
            adj_max_score: 5.0,
            feedback_weight: 0.5,
            feedback_weighting: WeightingKind::Uniform,
            feedback_recency_decay: 0.9,
            feedback_paths: FeedbackPaths::Minimal,
            public_feedback: true,
            public_feedback_randomised: false,
            feedback_progress_public: false,
        }
    }

    fn question(id: &str, answer_type: &str, required: bool) -> FeedbackQuestion {
        FeedbackQuestion {
            id: id.to_string(),
            tournament_id: "t".to_string(),
            seq: 0,
            text: format!("Question {id}"),
            answer_type: answer_type.to_string(),
            required,
            for_teams: true,
            for_adjudicators: true,
        }
    }

    fn context() -> FeedbackFormContext {
        FeedbackFormContext {
            source: FeedbackSource::Team("team".to_string()),
            source_name: "Team".to_string(),
            targets: vec![FeedbackTarget {
                debate_id: "d1".to_string(),
                round_id: "r1".to_string(),
                adjudicator_id: "chair".to_string(),
                adjudicator_name: "Chair".to_string(),
                label: "Chair (R1, chair)".to_string(),
            }],
            questions: vec![
                question("agree", "bool", true),
                question("comments", "text", false),
            ],
        }
    }

    fn form(fields: &[(&str, &str)]) -> HashMap<String, String> {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn accepts_valid_feedback() {
        let valid = validate_feedback(
            &form(&[("target", "d1:chair"), ("score", " 4.5 "), ("q_agree", "true")]),
            &context(),
            &prefs(),
            FeedbackFormOptions::public(),
        )
        .unwrap();
        assert_eq!(valid.score, 4.5);
        assert_eq!(valid.target.adjudicator_id, "chair");
        assert_eq!(
            valid.answers,
            vec![("agree".to_string(), "true".to_string())]
        );
    }

    #[test]
    fn rejects_targets_not_offered() {
        assert_eq!(
            validate_feedback(
                &form(&[("target", "d1:someone"), ("score", "3")]),
                &context(),
                &prefs(),
                FeedbackFormOptions::tabroom(),
            ),
            Err(FeedbackFormError::UnknownTarget)
        );
    }

    #[test]
    fn rejects_scores_out_of_range() {
        for score in ["0", "5.5", "abc", "NaN"] {
            assert_eq!(
                validate_feedback(
                    &form(&[("target", "d1:chair"), ("score", score)]),
                    &context(),
                    &prefs(),
                    FeedbackFormOptions::tabroom(),
                ),
                Err(FeedbackFormError::InvalidScore { min: 1.0, max: 5.0 })
            );
        }
    }

    #[test]
    fn required_answers_only_enforced_for_public() {
        let fields = form(&[("target", "d1:chair"), ("score", "3")]);
        assert_eq!(
            validate_feedback(
                &fields,
                &context(),
                &prefs(),
                FeedbackFormOptions::public()
            ),
            Err(FeedbackFormError::MissingAnswer("Question agree".to_string()))
        );
        assert!(
            validate_feedback(
                &fields,
                &context(),
                &prefs(),
                FeedbackFormOptions::tabroom()
            )
            .is_ok()
        );
    }

    #[test]
    fn rejects_malformed_bool() {
        assert_eq!(
            validate_feedback(
                &form(&[
                    ("target", "d1:chair"),
                    ("score", "3"),
                    ("q_agree", "maybe")
                ]),
                &context(),
                &prefs(),
                FeedbackFormOptions::tabroom(),
            ),
            Err(FeedbackFormError::InvalidAnswer("Question agree".to_string()))
        );
    }
}
