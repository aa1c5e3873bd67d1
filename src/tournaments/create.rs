use axum::{extract::Form, response::Redirect};
use chrono::Utc;
use diesel::prelude::*;
use hypertext::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::User,
    schema::{tournament_members, tournaments},
    state::Conn,
    template::Page,
    tournaments::Tournament,
    util_resp::{StandardResponse, SuccessResponse, bad_request, see_other_ok},
    validation::is_valid_slug,
};

pub async fn create_tournament_page(user: User) -> SuccessResponse {
    SuccessResponse::Success(
        Page::new()
            .user(user)
            .body(maud! {
                div class="container py-3" {
                    h1 { "Create a tournament" }
                    form method="post" {
                        div class="mb-3" {
                            label for="tournamentName" class="form-label" {
                                "Tournament name"
                            }
                            input type="text"
                                  class="form-control"
                                  id="tournamentName"
                                  aria-describedby="tournamentNameHelp"
                                  minlength="4"
                                  maxlength="32"
                                  required
                                  name="name";
                            div id="tournamentNameHelp" class="form-text" {
                                "The full name of the tournament."
                            }
                        }
                        div class="mb-3" {
                            label for="tournamentAbbrv" class="form-label" {
                                "Tournament abbreviation"
                            }
                            input type="text"
                                  minlength="2"
                                  maxlength="8"
                                  class="form-control"
                                  id="tournamentAbbrv"
                                  required
                                  name="abbrv";
                        }
                        div class="mb-3" {
                            label for="tournamentSlug" class="form-label" {
                                "Tournament slug"
                            }
                            input type="text"
                                  class="form-control"
                                  id="tournamentSlug"
                                  aria-describedby="tournamentSlugHelp"
                                  required
                                  pattern="[a-zA-Z0-9_]+"
                                  name="slug";
                            div id="tournamentSlugHelp" class="form-text" {
                                "A unique identifier for the tournament, used by the `urlkeys` command."
                            }
                        }
                        button type="submit" class="btn btn-primary" {
                            "Submit"
                        }
                    }
                }
            })
            .render(),
    )
}

#[derive(Deserialize)]
pub struct CreateTournamentForm {
    name: String,
    abbrv: String,
    slug: String,
}

/// Creates a tournament with the default preferences. The creator becomes
/// its first superuser.
pub async fn do_create_tournament(
    user: User,
    mut conn: Conn,
    Form(form): Form<CreateTournamentForm>,
) -> StandardResponse {
    if !(4..=32).contains(&form.name.len()) {
        return bad_request(
            maud! {p {"Tournament name must be between 4 and 32 characters."}}
                .render(),
        );
    }
    if !(2..=8).contains(&form.abbrv.len()) {
        return bad_request(maud! {p {"Tournament abbreviation must be between 2 and 8 characters."}}.render());
    }
    if let Err(e) = is_valid_slug(&form.slug) {
        return bad_request(maud! {p {(e)}}.render());
    }
    if Tournament::fetch_by_slug(&form.slug, &mut *conn)?.is_some() {
        return bad_request(
            maud! {p {"A tournament with that slug already exists."}}.render(),
        );
    }

    let tid = Uuid::now_v7().to_string();

    diesel::insert_into(tournaments::table)
        .values((
            tournaments::id.eq(&tid),
            tournaments::name.eq(&form.name),
            tournaments::abbrv.eq(&form.abbrv),
            tournaments::slug.eq(&form.slug),
            tournaments::created_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut *conn)?;

    diesel::insert_into(tournament_members::table)
        .values((
            tournament_members::id.eq(Uuid::now_v7().to_string()),
            tournament_members::user_id.eq(&user.id),
            tournament_members::tournament_id.eq(&tid),
            tournament_members::is_superuser.eq(true),
        ))
        .execute(&mut *conn)?;

    tracing::info!(tournament = %tid, user = %user.id, "created tournament");

    see_other_ok(Redirect::to(&format!("/tournaments/{tid}")))
}
