//! Edits that the tab director makes to adjudicators from the feedback
//! overview.
//!
//! Each edit runs in its own (nested) transaction together with its action
//! log entry, so that either both are written or neither is. Mistakes on the
//! part of the user (an adjudicator which cannot be identified, a test score
//! which is not a number) are reported as flash messages.

use axum::{Form, extract::Path, response::Redirect};
use axum_extra::extract::PrivateCookieJar;
use chrono::Utc;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    actionlog::{ActionLogType, ClientIp, EntityKind, EntityRef, LogAction},
    auth::User,
    flash,
    schema::{adjudicator_test_score_history, adjudicators},
    state::Conn,
    tournaments::{
        Tournament,
        feedback::{TestScoreHistory, aggregate::adjudicator_pool_query},
        participants::Adjudicator,
        rounds::Round,
    },
    util_resp::{FlashResponse, SuccessResponse},
    validation::parse_score,
};

#[derive(thiserror::Error, Debug)]
pub enum AdjudicatorActionError {
    #[error("Whoops! I didn't recognise that adjudicator: {0}")]
    UnknownAdjudicator(String),
    #[error("Whoops! The value isn't a valid test score.")]
    InvalidTestScore,
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

/// The user making an edit, for the action log.
#[derive(Clone, Debug)]
pub struct Actor {
    pub user_id: String,
    pub ip_address: Option<String>,
}

/// Finds the adjudicator with the given id in the tournament's pool. Exactly
/// one adjudicator has to match.
pub fn resolve_adjudicator(
    tournament: &Tournament,
    raw_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Adjudicator, AdjudicatorActionError> {
    let id = raw_id.trim();
    let mut matches = adjudicator_pool_query(tournament)
        .filter(adjudicators::id.eq(id.to_string()))
        .load::<Adjudicator>(conn)?;

    if matches.len() == 1 {
        Ok(matches.remove(0))
    } else {
        Err(AdjudicatorActionError::UnknownAdjudicator(raw_id.to_string()))
    }
}

/// Sets an adjudicator's test score, and appends it to their test score
/// history (tagged with the current round).
#[tracing::instrument(skip(tournament, conn), fields(tournament = %tournament.id))]
pub fn set_test_score(
    tournament: &Tournament,
    adj_id: &str,
    raw_score: &str,
    actor: &Actor,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<(Adjudicator, TestScoreHistory), AdjudicatorActionError> {
    conn.transaction(|conn| {
        let adjudicator = resolve_adjudicator(tournament, adj_id, conn)?;
        let score = parse_score(raw_score)
            .ok_or(AdjudicatorActionError::InvalidTestScore)?;

        diesel::update(adjudicators::table.find(&adjudicator.id))
            .set(adjudicators::test_score.eq(score))
            .execute(conn)?;

        let round = Round::current(&tournament.id, conn)?;
        let history = TestScoreHistory {
            id: Uuid::now_v7().to_string(),
            adjudicator_id: adjudicator.id.clone(),
            round_id: round.map(|round| round.id),
            score,
            timestamp: Utc::now().naive_utc(),
        };
        diesel::insert_into(adjudicator_test_score_history::table)
            .values((
                adjudicator_test_score_history::id.eq(&history.id),
                adjudicator_test_score_history::adjudicator_id
                    .eq(&history.adjudicator_id),
                adjudicator_test_score_history::round_id.eq(&history.round_id),
                adjudicator_test_score_history::score.eq(history.score),
                adjudicator_test_score_history::timestamp.eq(history.timestamp),
            ))
            .execute(conn)?;

        LogAction::new(ActionLogType::TestScoreEdit)
            .user(&actor.user_id)
            .tournament(&tournament.id)
            .round(history.round_id.as_ref())
            .ip(actor.ip_address.as_ref())
            .entity(EntityRef::new(
                EntityKind::AdjudicatorTestScoreHistory,
                &history.id,
            ))
            .record(conn)?;

        tracing::info!(adjudicator = %adjudicator.id, score, "set test score");

        Ok((
            Adjudicator {
                test_score: score,
                ..adjudicator
            },
            history,
        ))
    })
}

pub fn set_breaking(
    tournament: &Tournament,
    adj_id: &str,
    breaking: bool,
    actor: &Actor,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Adjudicator, AdjudicatorActionError> {
    conn.transaction(|conn| {
        let adjudicator = resolve_adjudicator(tournament, adj_id, conn)?;

        diesel::update(adjudicators::table.find(&adjudicator.id))
            .set(adjudicators::breaking.eq(breaking))
            .execute(conn)?;

        LogAction::new(ActionLogType::AdjudicatorBreakSet)
            .user(&actor.user_id)
            .tournament(&tournament.id)
            .ip(actor.ip_address.as_ref())
            .entity(EntityRef::new(EntityKind::Adjudicator, &adjudicator.id))
            .record(conn)?;

        Ok(Adjudicator {
            breaking,
            ..adjudicator
        })
    })
}

pub fn set_note(
    tournament: &Tournament,
    adj_id: &str,
    note: &str,
    actor: &Actor,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Adjudicator, AdjudicatorActionError> {
    conn.transaction(|conn| {
        let adjudicator = resolve_adjudicator(tournament, adj_id, conn)?;
        let note = Some(note.to_string());

        diesel::update(adjudicators::table.find(&adjudicator.id))
            .set(adjudicators::notes.eq(&note))
            .execute(conn)?;

        LogAction::new(ActionLogType::AdjudicatorNoteSet)
            .user(&actor.user_id)
            .tournament(&tournament.id)
            .ip(actor.ip_address.as_ref())
            .entity(EntityRef::new(EntityKind::Adjudicator, &adjudicator.id))
            .record(conn)?;

        Ok(Adjudicator {
            notes: note,
            ..adjudicator
        })
    })
}

fn overview_redirect(tid: &str) -> SuccessResponse {
    SuccessResponse::SeeOther(Box::new(Redirect::to(&format!(
        "/tournaments/{tid}/feedback/overview"
    ))))
}

/// Turns a failed edit into a flash message. Database failures fail the
/// whole request instead.
fn report(
    jar: PrivateCookieJar,
    tid: &str,
    error: AdjudicatorActionError,
) -> FlashResponse {
    match error {
        AdjudicatorActionError::Database(e) => Err(e.into()),
        error => {
            tracing::warn!("rejected adjudicator edit: {error}");
            Ok((flash::error(jar, error.to_string()), overview_redirect(tid)))
        }
    }
}

#[derive(Deserialize)]
pub struct TestScoreForm {
    adj_id: String,
    test_score: String,
}

pub async fn do_set_test_score(
    Path(tid): Path<String>,
    user: User,
    ClientIp(ip): ClientIp,
    jar: PrivateCookieJar,
    mut conn: Conn,
    Form(form): Form<TestScoreForm>,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_superuser(&user.id, &mut *conn)?;

    let actor = Actor {
        user_id: user.id,
        ip_address: ip,
    };
    match set_test_score(
        &tournament,
        &form.adj_id,
        &form.test_score,
        &actor,
        &mut *conn,
    ) {
        Ok((adjudicator, history)) => Ok((
            flash::success(
                jar,
                format!(
                    "Test score for {} set to {}.",
                    adjudicator.name, history.score
                ),
            ),
            overview_redirect(&tid),
        )),
        Err(e) => report(jar, &tid, e),
    }
}

#[derive(Deserialize)]
pub struct BreakingForm {
    adj_id: String,
    /// Unticked checkboxes are not submitted at all.
    adj_breaking_status: Option<String>,
}

pub async fn do_set_breaking(
    Path(tid): Path<String>,
    user: User,
    ClientIp(ip): ClientIp,
    jar: PrivateCookieJar,
    mut conn: Conn,
    Form(form): Form<BreakingForm>,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_superuser(&user.id, &mut *conn)?;

    let breaking = form.adj_breaking_status.as_deref() == Some("true");
    let actor = Actor {
        user_id: user.id,
        ip_address: ip,
    };
    // Always a plain acknowledgement; errors are left as flash messages.
    let jar =
        match set_breaking(&tournament, &form.adj_id, breaking, &actor, &mut *conn)
        {
            Ok(_) => jar,
            Err(AdjudicatorActionError::Database(e)) => return Err(e.into()),
            Err(error) => {
                tracing::warn!("rejected adjudicator edit: {error}");
                flash::error(jar, error.to_string())
            }
        };
    Ok((jar, SuccessResponse::Plain("ok")))
}

#[derive(Deserialize)]
pub struct NoteForm {
    adj_id: String,
    #[serde(default)]
    note: String,
}

pub async fn do_set_note(
    Path(tid): Path<String>,
    user: User,
    ClientIp(ip): ClientIp,
    jar: PrivateCookieJar,
    mut conn: Conn,
    Form(form): Form<NoteForm>,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_superuser(&user.id, &mut *conn)?;

    let actor = Actor {
        user_id: user.id,
        ip_address: ip,
    };
    match set_note(&tournament, &form.adj_id, &form.note, &actor, &mut *conn) {
        Ok(adjudicator) => Ok((
            flash::success(jar, format!("Note for {} saved.", adjudicator.name)),
            overview_redirect(&tid),
        )),
        Err(e) => report(jar, &tid, e),
    }
}
