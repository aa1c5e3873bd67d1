use axum::{
    extract::{Form, Path},
    response::Redirect,
};
use axum_extra::extract::PrivateCookieJar;
use diesel::prelude::*;
use hypertext::prelude::*;
use serde::Deserialize;

use crate::{
    actionlog::{ActionLogType, ClientIp, EntityKind, EntityRef, LogAction},
    auth::User,
    flash,
    state::Conn,
    template::Page,
    tournaments::{
        Tournament, config::TournamentPreferences,
        manage::sidebar::SidebarWrapper,
    },
    util_resp::{FailureResponse, FlashResponse, SuccessResponse},
};

fn preferences_redirect(tid: &str) -> SuccessResponse {
    SuccessResponse::SeeOther(Box::new(Redirect::to(&format!(
        "/tournaments/{tid}/preferences"
    ))))
}

pub async fn view_tournament_preferences(
    Path(tid): Path<String>,
    user: User,
    jar: PrivateCookieJar,
    mut conn: Conn,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_superuser(&user.id, &mut *conn)?;

    let document =
        toml::to_string(&tournament.preferences()).map_err(|e| {
            tracing::error!("could not serialize preferences: {e}");
            FailureResponse::ServerError(())
        })?;

    let (jar, messages) = flash::take(jar);
    let page = Page::new()
        .user(user)
        .tournament(tournament.clone())
        .flash(messages)
        .body(maud! {
            SidebarWrapper tournament=(&tournament) {
                h1 {
                    "Preferences for " (tournament.name)
                }

                form method="post" {
                    div class="mb-3" {
                        textarea name="config" style="resize: both;" rows="16" cols="80" {
                            (document)
                        }
                    }
                    button type="submit" class="btn btn-primary" {
                        "Save"
                    }
                }
            }
        })
        .render();

    Ok((jar, SuccessResponse::Success(page)))
}

#[derive(Deserialize)]
pub struct UpdatePreferencesForm {
    config: String,
}

pub async fn update_tournament_preferences(
    Path(tid): Path<String>,
    user: User,
    ClientIp(ip): ClientIp,
    jar: PrivateCookieJar,
    mut conn: Conn,
    Form(form): Form<UpdatePreferencesForm>,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_superuser(&user.id, &mut *conn)?;

    let prefs = match toml::from_str::<TournamentPreferences>(&form.config) {
        Ok(prefs) => prefs,
        Err(e) => {
            return Ok((
                flash::error(
                    jar,
                    format!("Those preferences could not be read: {}", e.message()),
                ),
                preferences_redirect(&tid),
            ));
        }
    };
    if let Err(e) = prefs.validate() {
        return Ok((flash::error(jar, e.to_string()), preferences_redirect(&tid)));
    }

    conn.transaction(|conn| -> QueryResult<()> {
        prefs.save(&tid, conn)?;
        LogAction::new(ActionLogType::OptionsEdit)
            .user(&user.id)
            .tournament(&tid)
            .ip(ip)
            .entity(EntityRef::new(EntityKind::Tournament, &tid))
            .record(conn)?;
        Ok(())
    })?;

    tracing::info!(tournament = %tid, "preferences updated");

    Ok((flash::success(jar, "Preferences saved."), preferences_redirect(&tid)))
}
