//! Feedback entered by the tabroom (usually from paper forms).

use std::collections::HashMap;

use axum::{Form, extract::Path, response::Redirect};
use axum_extra::extract::PrivateCookieJar;
use hypertext::prelude::*;

use crate::{
    actionlog::ClientIp,
    auth::User,
    flash,
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
        manage::sidebar::SidebarWrapper,
        participants::TournamentParticipants,
    },
    util_resp::{FailureResponse, FlashResponse, SuccessResponse},
};

pub async fn add_feedback_index(
    Path(tid): Path<String>,
    user: User,
    jar: PrivateCookieJar,
    mut conn: Conn,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_member(&user.id, &mut *conn)?;

    let participants = TournamentParticipants::load(&tournament, &mut *conn)?;

    let (jar, messages) = flash::take(jar);
    let page = Page::new()
        .user(user)
        .tournament(tournament.clone())
        .flash(messages)
        .body(maud! {
            SidebarWrapper tournament=(&tournament) {
                h1 { "Add feedback" }
                div class="row" {
                    div class="col-md-6" {
                        h3 { "From a team" }
                        div class="list-group" {
                            @for team in participants.teams.values() {
                                a class="list-group-item list-group-item-action"
                                    href=(format!("/tournaments/{tid}/feedback/add/team/{}", team.id)) {
                                    (team.name)
                                }
                            }
                        }
                    }
                    div class="col-md-6" {
                        h3 { "From an adjudicator" }
                        div class="list-group" {
                            @for adj in participants.adjudicators.values() {
                                a class="list-group-item list-group-item-action"
                                    href=(format!("/tournaments/{tid}/feedback/add/adjudicator/{}", adj.id)) {
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

pub async fn add_feedback_page(
    Path((tid, kind, id)): Path<(String, String, String)>,
    user: User,
    jar: PrivateCookieJar,
    mut conn: Conn,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_member(&user.id, &mut *conn)?;

    let source = FeedbackSource::from_path(&kind, id)
        .ok_or(FailureResponse::NotFound(()))?;
    let context = FeedbackFormContext::load(
        &tournament,
        source,
        FeedbackFormOptions::tabroom(),
        &mut *conn,
    )?;
    let prefs = tournament.preferences();

    let (jar, messages) = flash::take(jar);
    let page = Page::new()
        .user(user)
        .tournament(tournament.clone())
        .flash(messages)
        .body(maud! {
            SidebarWrapper tournament=(&tournament) {
                h1 { "Add feedback from " (context.source_name) }
                FeedbackForm context=(&context) prefs=(&prefs);
            }
        })
        .render();

    Ok((jar, SuccessResponse::Success(page)))
}

pub async fn do_add_feedback(
    Path((tid, kind, id)): Path<(String, String, String)>,
    user: User,
    ClientIp(ip): ClientIp,
    jar: PrivateCookieJar,
    mut conn: Conn,
    Form(form): Form<HashMap<String, String>>,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_member(&user.id, &mut *conn)?;

    let options = FeedbackFormOptions::tabroom();
    let source = FeedbackSource::from_path(&kind, id)
        .ok_or(FailureResponse::NotFound(()))?;
    let context =
        FeedbackFormContext::load(&tournament, source, options, &mut *conn)?;

    let back = Redirect::to(&format!(
        "/tournaments/{tid}/feedback/add/{kind}/{}",
        context.source.id()
    ));
    let feedback = match validate_feedback(
        &form,
        &context,
        &tournament.preferences(),
        options,
    ) {
        Ok(feedback) => feedback,
        Err(e) => {
            return Ok((
                flash::error(jar, e.to_string()),
                SuccessResponse::SeeOther(Box::new(back)),
            ));
        }
    };

    let target = feedback.target.adjudicator_name.clone();
    save_feedback(
        &tournament,
        &context.source,
        feedback,
        Submitter {
            kind: SubmitterKind::Tabroom,
            user_id: Some(user.id),
            ip_address: ip,
        },
        options,
        &mut *conn,
    )?;

    Ok((
        flash::success(
            jar,
            format!(
                "Feedback from {} on {} added.",
                context.source_name, target
            ),
        ),
        SuccessResponse::SeeOther(Box::new(Redirect::to(&format!(
            "/tournaments/{tid}/feedback/add"
        )))),
    ))
}
