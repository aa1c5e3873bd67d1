use std::panic::{AssertUnwindSafe, catch_unwind};

use chrono::Utc;
use diesel::{SqliteConnection, prelude::*};

use crate::{
    actionlog::{EntityKind, EntityRef, record_code},
    schema::{action_log_entries, adjudicator_feedback},
    test::{TestApp, seed_single_debate},
};

fn insert_feedback(
    conn: &mut SqliteConnection,
    id: &str,
    team: Option<&str>,
    adjudicator: Option<&str>,
) -> QueryResult<usize> {
    diesel::insert_into(adjudicator_feedback::table)
        .values((
            adjudicator_feedback::id.eq(id),
            adjudicator_feedback::tournament_id.eq("t1"),
            adjudicator_feedback::adjudicator_id.eq("chair"),
            adjudicator_feedback::debate_id.eq("d1"),
            adjudicator_feedback::source_team_id.eq(team),
            adjudicator_feedback::source_adjudicator_id.eq(adjudicator),
            adjudicator_feedback::version.eq(1),
            adjudicator_feedback::score.eq(3.0),
            adjudicator_feedback::confirmed.eq(true),
            adjudicator_feedback::submitter_kind.eq("tabroom"),
            adjudicator_feedback::timestamp.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)
}

#[test]
fn feedback_has_exactly_one_source() {
    let app = TestApp::new();
    let mut conn = app.conn();
    seed_single_debate(&mut conn, "t1");

    assert!(
        insert_feedback(&mut conn, "both", Some("gov"), Some("wing")).is_err()
    );
    assert!(insert_feedback(&mut conn, "neither", None, None).is_err());
    assert!(insert_feedback(&mut conn, "team", Some("gov"), None).is_ok());
    assert!(insert_feedback(&mut conn, "adj", None, Some("wing")).is_ok());

    let count = adjudicator_feedback::table
        .count()
        .get_result::<i64>(&mut *conn)
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn unknown_action_code_writes_nothing() {
    let app = TestApp::new();
    let mut conn = app.conn();
    seed_single_debate(&mut conn, "t1");

    let result = catch_unwind(AssertUnwindSafe(|| {
        record_code("zz.bad", |action| action.tournament("t1"), &mut *conn)
    }));
    assert!(result.is_err());

    let entry = record_code(
        "ts.edit",
        |action| {
            action
                .tournament("t1")
                .entity(EntityRef::new(EntityKind::Adjudicator, "chair"))
        },
        &mut *conn,
    )
    .unwrap();
    assert_eq!(entry.type_, "ts.edit");

    let codes = action_log_entries::table
        .select(action_log_entries::type_)
        .load::<String>(&mut *conn)
        .unwrap();
    assert_eq!(codes, vec!["ts.edit".to_string()]);
}

#[test]
fn log_rejects_codes_outside_the_known_set() {
    let app = TestApp::new();
    let mut conn = app.conn();

    let result = diesel::insert_into(action_log_entries::table)
        .values((
            action_log_entries::id.eq("raw"),
            action_log_entries::type_.eq("zz.bad"),
            action_log_entries::timestamp.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut *conn);
    assert!(result.is_err());
}
