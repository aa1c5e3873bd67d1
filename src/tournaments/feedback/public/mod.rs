//! Feedback submitted by participants, either from the public feedback pages
//! (when `public_feedback` is set) or from their private URL (when
//! `public_feedback_randomised` is set).

use std::collections::HashMap;

use axum::{Form, extract::Path, response::Redirect};
use axum_extra::extract::PrivateCookieJar;
use diesel::{connection::LoadConnection, sqlite::Sqlite};
use hypertext::prelude::*;

use crate::{
    actionlog::ClientIp,
    auth::User,
    flash::{self, FlashMessage},
    state::Conn,
    template::Page,
    tournaments::{
        Tournament,
        feedback::{
            FeedbackSource, SubmitterKind,
            forms::{
                FeedbackForm, FeedbackFormContext, FeedbackFormOptions,
                Submitter, save_feedback, validate_feedback,
            },
        },
        participants::{Participant, TournamentParticipants},
    },
    util_resp::{FailureResponse, FlashResponse, SuccessResponse},
};

pub const THANKS: &str = "Thanks, your feedback has been recorded.";

fn form_page(
    tournament: Tournament,
    user: Option<User>,
    messages: Vec<FlashMessage>,
    context: &FeedbackFormContext,
) -> SuccessResponse {
    let prefs = tournament.preferences();
    SuccessResponse::Success(
        Page::new()
            .user_opt(user)
            .tournament(tournament)
            .flash(messages)
            .body(maud! {
                div class="container py-3" {
                    h1 { "Feedback from " (context.source_name) }
                    FeedbackForm context=(context) prefs=(&prefs);
                }
            })
            .render(),
    )
}

/// Checks and saves a public submission, redirecting to `back` either way.
#[allow(clippy::too_many_arguments)]
fn submit(
    tournament: &Tournament,
    context: &FeedbackFormContext,
    form: &HashMap<String, String>,
    user: Option<User>,
    ip: Option<String>,
    jar: PrivateCookieJar,
    back: String,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> FlashResponse {
    let options = FeedbackFormOptions::public();
    let back = SuccessResponse::SeeOther(Box::new(Redirect::to(&back)));

    let feedback = match validate_feedback(
        form,
        context,
        &tournament.preferences(),
        options,
    ) {
        Ok(feedback) => feedback,
        Err(e) => return Ok((flash::error(jar, e.to_string()), back)),
    };

    save_feedback(
        tournament,
        &context.source,
        feedback,
        Submitter {
            kind: SubmitterKind::Public,
            user_id: user.map(|user| user.id),
            ip_address: ip,
        },
        options,
        conn,
    )?;

    Ok((flash::success(jar, THANKS), back))
}

fn require_public_feedback(
    tournament: &Tournament,
) -> Result<(), FailureResponse> {
    if tournament.public_feedback {
        Ok(())
    } else {
        Err(FailureResponse::NotFound(()))
    }
}

pub async fn public_feedback_index(
    Path(tid): Path<String>,
    user: Option<User>,
    jar: PrivateCookieJar,
    mut conn: Conn,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    require_public_feedback(&tournament)?;

    let participants = TournamentParticipants::load(&tournament, &mut *conn)?;

    let (jar, messages) = flash::take(jar);
    let page = Page::new()
        .user_opt(user)
        .tournament(tournament.clone())
        .flash(messages)
        .body(maud! {
            div class="container py-3" {
                h1 { "Submit feedback" }
                p { "Choose who you are submitting feedback as." }
                div class="row" {
                    div class="col-md-6" {
                        h3 { "Teams" }
                        div class="list-group" {
                            @for team in participants.teams.values() {
                                a class="list-group-item list-group-item-action"
                                    href=(format!("/tournaments/{tid}/feedback/public/team/{}", team.id)) {
                                    (team.name)
                                }
                            }
                        }
                    }
                    div class="col-md-6" {
                        h3 { "Adjudicators" }
                        div class="list-group" {
                            @for adj in participants.adjudicators.values() {
                                a class="list-group-item list-group-item-action"
                                    href=(format!("/tournaments/{tid}/feedback/public/adjudicator/{}", adj.id)) {
                                    (adj.name)
                                }
                            }
                        }
                    }
                }
            }
        })
        .render();

    Ok((jar, SuccessResponse::Success(page)))
}

pub async fn public_feedback_page(
    Path((tid, kind, id)): Path<(String, String, String)>,
    user: Option<User>,
    jar: PrivateCookieJar,
    mut conn: Conn,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    require_public_feedback(&tournament)?;

    let source = FeedbackSource::from_path(&kind, id)
        .ok_or(FailureResponse::NotFound(()))?;
    let context = FeedbackFormContext::load(
        &tournament,
        source,
        FeedbackFormOptions::public(),
        &mut *conn,
    )?;

    let (jar, messages) = flash::take(jar);
    Ok((jar, form_page(tournament, user, messages, &context)))
}

pub async fn do_public_feedback(
    Path((tid, kind, id)): Path<(String, String, String)>,
    user: Option<User>,
    ClientIp(ip): ClientIp,
    jar: PrivateCookieJar,
    mut conn: Conn,
    Form(form): Form<HashMap<String, String>>,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    require_public_feedback(&tournament)?;

    let source = FeedbackSource::from_path(&kind, id)
        .ok_or(FailureResponse::NotFound(()))?;
    let context = FeedbackFormContext::load(
        &tournament,
        source,
        FeedbackFormOptions::public(),
        &mut *conn,
    )?;

    let back = format!(
        "/tournaments/{tid}/feedback/public/{}/{}",
        context.source.path_kind(),
        context.source.id()
    );
    submit(&tournament, &context, &form, user, ip, jar, back, &mut *conn)
}

fn private_url_source(
    tournament: &Tournament,
    url_key: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<FeedbackSource, FailureResponse> {
    if !tournament.public_feedback_randomised {
        return Err(FailureResponse::NotFound(()));
    }

    Ok(match Participant::of_url_key(tournament, url_key, conn)? {
        Participant::Team(team) => FeedbackSource::Team(team.id),
        Participant::Adjudicator(adj) => FeedbackSource::Adjudicator(adj.id),
    })
}

pub async fn private_url_feedback_page(
    Path((tid, url_key)): Path<(String, String)>,
    user: Option<User>,
    jar: PrivateCookieJar,
    mut conn: Conn,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    let source = private_url_source(&tournament, &url_key, &mut *conn)?;
    let context = FeedbackFormContext::load(
        &tournament,
        source,
        FeedbackFormOptions::public(),
        &mut *conn,
    )?;

    let (jar, messages) = flash::take(jar);
    Ok((jar, form_page(tournament, user, messages, &context)))
}

pub async fn do_private_url_feedback(
    Path((tid, url_key)): Path<(String, String)>,
    user: Option<User>,
    ClientIp(ip): ClientIp,
    jar: PrivateCookieJar,
    mut conn: Conn,
    Form(form): Form<HashMap<String, String>>,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    let source = private_url_source(&tournament, &url_key, &mut *conn)?;
    let context = FeedbackFormContext::load(
        &tournament,
        source,
        FeedbackFormOptions::public(),
        &mut *conn,
    )?;

    let back = format!("/tournaments/{tid}/privateurls/{url_key}/feedback");
    submit(&tournament, &context, &form, user, ip, jar, back, &mut *conn)
}
