//! Tests which drive the whole application through its HTTP interface,
//! against an in-memory database.

use axum::http::StatusCode;
use axum_extra::extract::cookie::Key;
use axum_test::{TestServer, TestServerConfig};
use chrono::Utc;
use diesel::{
    SqliteConnection,
    prelude::*,
    r2d2::{ConnectionManager, Pool, PooledConnection},
};
use uuid::Uuid;

use crate::{
    config::{create_app, run_migrations},
    schema::{
        adjudicator_feedback, adjudicators, tournament_debate_adjudicators,
        tournament_debate_teams, tournament_debates, tournament_members,
        tournament_rounds, tournament_teams, tournaments, users,
    },
    state::DbPool,
    tournaments::feedback::FeedbackSource,
};

mod feedback_scores;
mod integrity;
mod preferences;
mod privateurls;
mod public_feedback;

pub const PASSWORD: &str = "correct horse battery";

pub struct TestApp {
    pub pool: DbPool,
    pub server: TestServer,
}

impl TestApp {
    pub fn new() -> Self {
        // A single connection, as every connection to `:memory:` opens a
        // fresh database.
        let pool = Pool::builder()
            .max_size(1)
            .build(ConnectionManager::<SqliteConnection>::new(":memory:"))
            .unwrap();
        run_migrations(&pool).unwrap();

        let server = TestServerConfig::builder()
            .save_cookies()
            .build_server(create_app(pool.clone(), Key::generate()))
            .unwrap();

        Self { pool, server }
    }

    /// Checks out the only connection. It must be dropped before the next
    /// request is made.
    pub fn conn(
        &self,
    ) -> PooledConnection<ConnectionManager<SqliteConnection>> {
        self.pool.get().unwrap()
    }

    /// Registers a user and logs in as them, returning their id.
    pub async fn login_as(&mut self, username: &str) -> String {
        let email = format!("{username}@example.com");
        let res = self
            .server
            .post("/register")
            .form(&[
                ("username", username),
                ("email", email.as_str()),
                ("password", PASSWORD),
                ("password2", PASSWORD),
            ])
            .await;
        assert_eq!(res.status_code(), StatusCode::SEE_OTHER, "{}", res.text());

        let res = self
            .server
            .post("/login")
            .form(&[("id", username), ("password", PASSWORD)])
            .await;
        assert_eq!(res.status_code(), StatusCode::SEE_OTHER, "{}", res.text());

        let mut conn = self.conn();
        users::table
            .filter(users::username.eq(username))
            .select(users::id)
            .first::<String>(&mut *conn)
            .unwrap()
    }
}

pub fn seed_tournament(conn: &mut SqliteConnection, id: &str, share_adjs: bool) {
    diesel::insert_into(tournaments::table)
        .values((
            tournaments::id.eq(id),
            tournaments::name.eq(format!("Tournament {id}")),
            tournaments::abbrv.eq(id),
            tournaments::slug.eq(id),
            tournaments::created_at.eq(Utc::now().naive_utc()),
            tournaments::share_adjs.eq(share_adjs),
        ))
        .execute(conn)
        .unwrap();
}

pub fn add_member(
    conn: &mut SqliteConnection,
    tid: &str,
    user_id: &str,
    superuser: bool,
) {
    diesel::insert_into(tournament_members::table)
        .values((
            tournament_members::id.eq(Uuid::now_v7().to_string()),
            tournament_members::user_id.eq(user_id),
            tournament_members::tournament_id.eq(tid),
            tournament_members::is_superuser.eq(superuser),
        ))
        .execute(conn)
        .unwrap();
}

pub fn add_round(
    conn: &mut SqliteConnection,
    tid: &str,
    id: &str,
    seq: i64,
    completed: bool,
) {
    diesel::insert_into(tournament_rounds::table)
        .values((
            tournament_rounds::id.eq(id),
            tournament_rounds::tournament_id.eq(tid),
            tournament_rounds::seq.eq(seq),
            tournament_rounds::name.eq(format!("Round {seq}")),
            tournament_rounds::abbreviation.eq(format!("R{seq}")),
            tournament_rounds::completed.eq(completed),
            tournament_rounds::draw_released.eq(true),
        ))
        .execute(conn)
        .unwrap();
}

pub fn add_team(conn: &mut SqliteConnection, tid: &str, id: &str) {
    diesel::insert_into(tournament_teams::table)
        .values((
            tournament_teams::id.eq(id),
            tournament_teams::tournament_id.eq(tid),
            tournament_teams::name.eq(format!("Team {id}")),
        ))
        .execute(conn)
        .unwrap();
}

pub fn add_adjudicator(
    conn: &mut SqliteConnection,
    tid: Option<&str>,
    id: &str,
    test_score: f64,
) {
    diesel::insert_into(adjudicators::table)
        .values((
            adjudicators::id.eq(id),
            adjudicators::tournament_id.eq(tid),
            adjudicators::name.eq(format!("Adjudicator {id}")),
            adjudicators::test_score.eq(test_score),
        ))
        .execute(conn)
        .unwrap();
}

/// A debate between `teams` (in side order) judged by `adjudicators`, each
/// given as `(id, role)`.
pub fn add_debate(
    conn: &mut SqliteConnection,
    tid: &str,
    round_id: &str,
    id: &str,
    teams: &[&str],
    adjudicators: &[(&str, &str)],
) {
    diesel::insert_into(tournament_debates::table)
        .values((
            tournament_debates::id.eq(id),
            tournament_debates::tournament_id.eq(tid),
            tournament_debates::round_id.eq(round_id),
            tournament_debates::number.eq(1),
        ))
        .execute(conn)
        .unwrap();

    for (side, team) in teams.iter().enumerate() {
        diesel::insert_into(tournament_debate_teams::table)
            .values((
                tournament_debate_teams::id.eq(Uuid::now_v7().to_string()),
                tournament_debate_teams::debate_id.eq(id),
                tournament_debate_teams::team_id.eq(*team),
                tournament_debate_teams::side.eq(side as i64),
            ))
            .execute(conn)
            .unwrap();
    }

    for (adj, role) in adjudicators {
        diesel::insert_into(tournament_debate_adjudicators::table)
            .values((
                tournament_debate_adjudicators::id
                    .eq(Uuid::now_v7().to_string()),
                tournament_debate_adjudicators::debate_id.eq(id),
                tournament_debate_adjudicators::adjudicator_id.eq(*adj),
                tournament_debate_adjudicators::role.eq(*role),
            ))
            .execute(conn)
            .unwrap();
    }
}

pub fn add_feedback(
    conn: &mut SqliteConnection,
    tid: &str,
    debate_id: &str,
    target: &str,
    source: &FeedbackSource,
    score: f64,
    confirmed: bool,
) {
    let (team, adjudicator) = source.columns();
    diesel::insert_into(adjudicator_feedback::table)
        .values((
            adjudicator_feedback::id.eq(Uuid::now_v7().to_string()),
            adjudicator_feedback::tournament_id.eq(tid),
            adjudicator_feedback::adjudicator_id.eq(target),
            adjudicator_feedback::debate_id.eq(debate_id),
            adjudicator_feedback::source_team_id.eq(team),
            adjudicator_feedback::source_adjudicator_id.eq(adjudicator),
            adjudicator_feedback::version.eq(1),
            adjudicator_feedback::score.eq(score),
            adjudicator_feedback::confirmed.eq(confirmed),
            adjudicator_feedback::submitter_kind.eq("tabroom"),
            adjudicator_feedback::timestamp.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)
        .unwrap();
}

/// One round, two teams and a chair (`chair`, test score 3) with a panellist
/// (`wing`, test score 2).
pub fn seed_single_debate(conn: &mut SqliteConnection, tid: &str) {
    seed_tournament(conn, tid, false);
    add_round(conn, tid, "r1", 1, false);
    add_team(conn, tid, "gov");
    add_team(conn, tid, "opp");
    add_adjudicator(conn, Some(tid), "chair", 3.0);
    add_adjudicator(conn, Some(tid), "wing", 2.0);
    add_debate(
        conn,
        tid,
        "r1",
        "d1",
        &["gov", "opp"],
        &[("chair", "c"), ("wing", "p")],
    );
}
