use axum::extract::Path;
use diesel::prelude::*;
use hypertext::prelude::*;

use crate::{
    actionlog::ActionLogEntry,
    auth::User,
    schema::{action_log_entries, tournament_rounds, users},
    state::Conn,
    template::Page,
    tournaments::{Tournament, manage::sidebar::SidebarWrapper},
    util_resp::{StandardResponse, success},
    widgets::table::{Table, TableCell, TableHeader},
};

const ACTION_LOG_PAGE_SIZE: i64 = 100;

pub async fn action_log_page(
    Path(tid): Path<String>,
    user: User,
    mut conn: Conn,
) -> StandardResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_member(&user.id, &mut *conn)?;

    let entries = action_log_entries::table
        .left_join(users::table)
        .left_join(tournament_rounds::table)
        .filter(action_log_entries::tournament_id.eq(&tid))
        .order_by(action_log_entries::timestamp.desc())
        .limit(ACTION_LOG_PAGE_SIZE)
        .select((
            action_log_entries::all_columns,
            users::username.nullable(),
            tournament_rounds::abbreviation.nullable(),
        ))
        .load::<(ActionLogEntry, Option<String>, Option<String>)>(&mut *conn)?;

    let mut table = Table::new(
        None,
        vec![
            TableHeader::new("time", "Time"),
            TableHeader::new("user", "User"),
            TableHeader::new("action", "Action"),
            TableHeader::new("round", "Round"),
            TableHeader::new("entity", "Object"),
            TableHeader::new("ip", "IP address"),
        ],
    );

    for (entry, username, round) in entries {
        let action = match entry.action_type() {
            Ok(action) => action.label().to_string(),
            Err(e) => {
                tracing::warn!("action log entry {} has {e}", entry.id);
                entry.type_.clone()
            }
        };
        let entity = match entry.entity() {
            Some(entity) => entity
                .describe(&mut *conn)?
                .unwrap_or_else(|| "<deleted>".to_string()),
            None => String::new(),
        };

        table.push_row(vec![
            TableCell::text(entry.timestamp.format("%Y-%m-%d %H:%M:%S")),
            TableCell::text(username.unwrap_or_default()),
            TableCell::text(action),
            TableCell::text(round.unwrap_or_default()),
            TableCell::text(entity),
            TableCell::text(entry.ip_address.unwrap_or_default()),
        ]);
    }

    success(
        Page::new()
            .user(user)
            .tournament(tournament.clone())
            .body(maud! {
                SidebarWrapper tournament=(&tournament) {
                    h1 { "Action log" }
                    (table)
                }
            })
            .render(),
    )
}
