use axum::{extract::Path, response::Redirect};
use axum_extra::extract::PrivateCookieJar;
use hypertext::prelude::*;

use crate::{
    auth::User,
    flash,
    state::Conn,
    template::Page,
    tournaments::{
        Tournament,
        manage::sidebar::SidebarWrapper,
        privateurls::{
            UrlKeyError, generate_tournament_url_keys, url_key_owners,
        },
    },
    util_resp::{FlashResponse, SuccessResponse},
};

pub const GENERATED: &str =
    "Randomised URLs were generated for all teams and adjudicators.";

pub async fn private_urls_page(
    Path(tid): Path<String>,
    user: User,
    jar: PrivateCookieJar,
    mut conn: Conn,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_superuser(&user.id, &mut *conn)?;

    let owners = url_key_owners(&tournament, &mut *conn)?;
    let any_keys = owners.iter().any(|owner| owner.url_key.is_some());

    let (jar, messages) = flash::take(jar);
    let page = Page::new()
        .user(user)
        .tournament(tournament.clone())
        .flash(messages)
        .body(maud! {
            SidebarWrapper tournament=(&tournament) {
                div class="d-flex justify-content-between flex-wrap flex-md-nowrap align-items-center pt-3 pb-2 mb-3 border-bottom" {
                    h1 class="h2" { "Private URLs" }
                    @if !any_keys {
                        form method="post" action=(format!("/tournaments/{tid}/privateurls/generate")) {
                            button type="submit" class="btn btn-primary" {
                                "Generate private URLs"
                            }
                        }
                    }
                }
                @if !any_keys {
                    p class="text-muted" {
                        "No private URLs have been generated yet."
                    }
                }
                table class="table table-sm" {
                    thead {
                        tr {
                            th scope="col" { "Name" }
                            th scope="col" { "Role" }
                            th scope="col" { "Private URL" }
                        }
                    }
                    tbody {
                        @for owner in &owners {
                            tr {
                                th scope="row" { (owner.name) }
                                td { (owner.kind.label()) }
                                td {
                                    @if let Some(key) = &owner.url_key {
                                        a href=(format!("/tournaments/{tid}/privateurls/{key}/feedback")) {
                                            (key)
                                        }
                                    } @else {
                                        span class="text-muted" { "None" }
                                    }
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

pub async fn generate_private_urls(
    Path(tid): Path<String>,
    user: User,
    jar: PrivateCookieJar,
    mut conn: Conn,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_superuser(&user.id, &mut *conn)?;

    let jar = match generate_tournament_url_keys(&tournament, &mut *conn) {
        Ok(_) => flash::success(jar, GENERATED),
        Err(e @ UrlKeyError::AlreadyExist) => flash::error(jar, e.to_string()),
        Err(UrlKeyError::Database(e)) => return Err(e.into()),
    };

    Ok((
        jar,
        SuccessResponse::SeeOther(Box::new(Redirect::to(&format!(
            "/tournaments/{tid}/privateurls"
        )))),
    ))
}
