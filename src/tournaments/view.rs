use axum::extract::Path;
use axum_extra::extract::PrivateCookieJar;
use hypertext::prelude::*;

use crate::{
    auth::User,
    flash,
    state::Conn,
    template::Page,
    tournaments::{
        Tournament, manage::sidebar::SidebarWrapper, rounds::Round,
    },
    util_resp::{FlashResponse, SuccessResponse},
};

/// Members get the tabroom overview; everyone else gets whichever public
/// pages the tournament has switched on.
pub async fn view_tournament_page(
    Path(tid): Path<String>,
    user: Option<User>,
    jar: PrivateCookieJar,
    mut conn: Conn,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;

    let is_member = match &user {
        Some(user) => tournament
            .check_user_is_member(&user.id, &mut *conn)
            .is_ok(),
        None => false,
    };

    let (jar, messages) = flash::take(jar);

    let page = if is_member {
        let current = Round::current(&tid, &mut *conn)?;
        Page::new()
            .user_opt(user)
            .tournament(tournament.clone())
            .flash(messages)
            .body(maud! {
                SidebarWrapper tournament=(&tournament) {
                    h1 { (tournament.name) }
                    p {
                        @if let Some(round) = &current {
                            "Current round: " (round.name)
                        } @else {
                            "No rounds have been created yet."
                        }
                    }
                    ul {
                        li {
                            a href=(format!("/tournaments/{tid}/feedback/overview")) {
                                "Adjudicator feedback"
                            }
                        }
                        li {
                            a href=(format!("/tournaments/{tid}/feedback/progress")) {
                                "Feedback progress"
                            }
                        }
                        li {
                            a href=(format!("/tournaments/{tid}/privateurls")) {
                                "Private URLs"
                            }
                        }
                    }
                }
            })
            .render()
    } else {
        Page::new()
            .user_opt(user)
            .tournament(tournament.clone())
            .flash(messages)
            .body(maud! {
                div class="container py-3" {
                    h1 { (tournament.name) }
                    ul {
                        @if tournament.public_feedback {
                            li {
                                a href=(format!("/tournaments/{tid}/feedback/public")) {
                                    "Submit feedback"
                                }
                            }
                        }
                        @if tournament.feedback_progress_public {
                            li {
                                a href=(format!("/tournaments/{tid}/feedback/progress/public")) {
                                    "Feedback progress"
                                }
                            }
                        }
                    }
                }
            })
            .render()
    };

    Ok((jar, SuccessResponse::Success(page)))
}
