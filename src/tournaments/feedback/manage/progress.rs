use axum::extract::Path;
use hypertext::prelude::*;

use crate::{
    auth::User,
    state::Conn,
    template::Page,
    tournaments::{
        Tournament,
        feedback::progress::{
            AdjudicatorProgress, TeamProgress, get_feedback_progress,
            progress_cells, progress_headers,
        },
        manage::sidebar::SidebarWrapper,
    },
    util_resp::{StandardResponse, err_not_found, success},
    widgets::table::{Table, TableCell, TableHeader},
};

/// One table for teams and one for adjudicators, least complete first.
pub fn progress_tables(
    teams: &[TeamProgress],
    adjudicators: &[AdjudicatorProgress],
) -> (Table, Table) {
    let headers = |name: &str| {
        let mut headers = vec![TableHeader::new("name", name)];
        headers.extend(progress_headers());
        headers
    };

    let mut team_table = Table::new(Some("Teams"), headers("Team"));
    for team in teams {
        let mut row = vec![TableCell::text(&team.team.name)];
        row.extend(progress_cells(&team.progress));
        team_table.push_row(row);
    }
    team_table.sort_by_key("coverage", false);

    let mut adj_table = Table::new(Some("Adjudicators"), headers("Adjudicator"));
    for adj in adjudicators {
        let mut row = vec![TableCell::text(&adj.adjudicator.name)];
        row.extend(progress_cells(&adj.progress));
        adj_table.push_row(row);
    }
    adj_table.sort_by_key("coverage", false);

    (team_table, adj_table)
}

pub async fn feedback_progress_page(
    Path(tid): Path<String>,
    user: User,
    mut conn: Conn,
) -> StandardResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_superuser(&user.id, &mut *conn)?;

    let (teams, adjudicators) =
        get_feedback_progress(&tournament, &mut *conn)?;
    let (team_table, adj_table) = progress_tables(&teams, &adjudicators);

    success(
        Page::new()
            .user(user)
            .tournament(tournament.clone())
            .body(maud! {
                SidebarWrapper tournament=(&tournament) {
                    h1 { "Feedback progress" }
                    (team_table)
                    (adj_table)
                }
            })
            .render(),
    )
}

pub async fn public_feedback_progress_page(
    Path(tid): Path<String>,
    user: Option<User>,
    mut conn: Conn,
) -> StandardResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    if !tournament.feedback_progress_public {
        return err_not_found();
    }

    let (teams, adjudicators) =
        get_feedback_progress(&tournament, &mut *conn)?;
    let (team_table, adj_table) = progress_tables(&teams, &adjudicators);

    success(
        Page::new()
            .user_opt(user)
            .tournament(tournament.clone())
            .body(maud! {
                div class="container py-3" {
                    h1 { "Feedback progress" }
                    p class="text-muted" {
                        "Feedback still to be submitted at " (tournament.name) "."
                    }
                    (team_table)
                    (adj_table)
                }
            })
            .render(),
    )
}
