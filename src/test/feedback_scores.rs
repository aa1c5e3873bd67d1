use axum::http::StatusCode;
use diesel::prelude::*;
use serde_json::json;

use crate::{
    schema::tournaments,
    test::{
        TestApp, add_adjudicator, add_debate, add_feedback, add_member,
        add_team, seed_single_debate,
    },
    tournaments::{
        Tournament,
        feedback::{
            FeedbackSource,
            aggregate::{adjudicator_pool, get_feedback_overview},
            progress::get_feedback_progress,
        },
        participants::TournamentParticipants,
    },
};

#[tokio::test]
async fn adjudicator_without_confirmed_feedback_has_no_feedback_score() {
    let mut app = TestApp::new();
    let uid = app.login_as("director").await;

    let mut conn = app.conn();
    seed_single_debate(&mut conn, "t1");
    add_member(&mut conn, "t1", &uid, false);
    add_feedback(
        &mut conn,
        "t1",
        "d1",
        "chair",
        &FeedbackSource::Team("gov".to_string()),
        5.0,
        false,
    );

    let tournament = Tournament::fetch("t1", &mut *conn).unwrap();
    let pool = adjudicator_pool(&tournament, &mut *conn).unwrap();
    let summaries = get_feedback_overview(&tournament, pool, &mut *conn).unwrap();
    let chair = summaries
        .iter()
        .find(|summary| summary.adjudicator.id == "chair")
        .unwrap();
    assert_eq!(chair.feedback_score, None);
    assert_eq!(chair.score, 3.0);
    drop(conn);

    let res = app.server.get("/tournaments/t1/feedback/overview").await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert!(res.text().contains("N/A"));

    let res = app.server.get("/tournaments/t1/feedback/scores.json").await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(
        res.json::<serde_json::Value>(),
        json!({ "chair": 3.0, "wing": 2.0 })
    );
}

#[tokio::test]
async fn unconfirmed_feedback_counts_for_nothing() {
    let mut app = TestApp::new();
    let uid = app.login_as("director").await;

    let mut conn = app.conn();
    seed_single_debate(&mut conn, "t1");
    add_member(&mut conn, "t1", &uid, true);
    add_feedback(
        &mut conn,
        "t1",
        "d1",
        "chair",
        &FeedbackSource::Team("gov".to_string()),
        5.0,
        true,
    );
    add_feedback(
        &mut conn,
        "t1",
        "d1",
        "chair",
        &FeedbackSource::Team("opp".to_string()),
        1.0,
        false,
    );
    add_feedback(
        &mut conn,
        "t1",
        "d1",
        "chair",
        &FeedbackSource::Adjudicator("wing".to_string()),
        1.0,
        false,
    );

    let tournament = Tournament::fetch("t1", &mut *conn).unwrap();
    let pool = adjudicator_pool(&tournament, &mut *conn).unwrap();
    let summaries = get_feedback_overview(&tournament, pool, &mut *conn).unwrap();
    let chair = summaries
        .iter()
        .find(|summary| summary.adjudicator.id == "chair")
        .unwrap();
    assert_eq!(chair.feedback_score, Some(5.0));
    // Half test score, half feedback.
    assert_eq!(chair.score, 4.0);

    let (teams, adjudicators) =
        get_feedback_progress(&tournament, &mut *conn).unwrap();
    let team = |id: &str| {
        teams
            .iter()
            .find(|progress| progress.team.id == id)
            .unwrap()
            .progress
    };
    assert_eq!((team("gov").expected, team("gov").submitted), (1, 1));
    assert_eq!((team("opp").expected, team("opp").submitted), (1, 0));
    assert_eq!(team("opp").coverage(), Some(0.0));

    let wing = adjudicators
        .iter()
        .find(|progress| progress.adjudicator.id == "wing")
        .unwrap()
        .progress;
    assert_eq!((wing.expected, wing.submitted), (1, 0));

    let chair = adjudicators
        .iter()
        .find(|progress| progress.adjudicator.id == "chair")
        .unwrap()
        .progress;
    assert_eq!(chair.coverage(), None);
    drop(conn);

    let res = app.server.get("/tournaments/t1/feedback/scores.json").await;
    assert_eq!(
        res.json::<serde_json::Value>(),
        json!({ "chair": 4.0, "wing": 2.0 })
    );

    let res = app.server.get("/tournaments/t1/feedback/progress").await;
    assert_eq!(res.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn feedback_pages_require_membership() {
    let mut app = TestApp::new();

    let mut conn = app.conn();
    seed_single_debate(&mut conn, "t1");
    drop(conn);

    let res = app.server.get("/tournaments/t1/feedback/overview").await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);

    app.login_as("outsider").await;
    let res = app.server.get("/tournaments/t1/feedback/overview").await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);

    // Progress is superuser-only, and not public by default.
    let res = app.server.get("/tournaments/t1/feedback/progress").await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    let res = app
        .server
        .get("/tournaments/t1/feedback/progress/public")
        .await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn shared_pool_is_scored_only_when_shared() {
    let mut app = TestApp::new();
    let uid = app.login_as("director").await;

    let mut conn = app.conn();
    seed_single_debate(&mut conn, "t1");
    add_member(&mut conn, "t1", &uid, false);
    add_adjudicator(&mut conn, None, "pooled", 4.0);
    add_team(&mut conn, "t1", "left");
    add_team(&mut conn, "t1", "right");
    add_debate(
        &mut conn,
        "t1",
        "r1",
        "d2",
        &["left", "right"],
        &[("pooled", "c")],
    );
    add_feedback(
        &mut conn,
        "t1",
        "d2",
        "pooled",
        &FeedbackSource::Team("left".to_string()),
        5.0,
        true,
    );

    let tournament = Tournament::fetch("t1", &mut *conn).unwrap();
    let participants =
        TournamentParticipants::load(&tournament, &mut *conn).unwrap();
    assert!(!participants.adjudicators.contains_key("pooled"));
    let (_, adjudicators) =
        get_feedback_progress(&tournament, &mut *conn).unwrap();
    assert!(
        adjudicators
            .iter()
            .all(|progress| progress.adjudicator.id != "pooled")
    );
    drop(conn);

    let res = app.server.get("/tournaments/t1/feedback/scores.json").await;
    assert_eq!(
        res.json::<serde_json::Value>(),
        json!({ "chair": 3.0, "wing": 2.0 })
    );

    let mut conn = app.conn();
    diesel::update(tournaments::table.find("t1"))
        .set(tournaments::share_adjs.eq(true))
        .execute(&mut *conn)
        .unwrap();

    let tournament = Tournament::fetch("t1", &mut *conn).unwrap();
    let participants =
        TournamentParticipants::load(&tournament, &mut *conn).unwrap();
    assert!(participants.adjudicators.contains_key("pooled"));

    let (teams, adjudicators) =
        get_feedback_progress(&tournament, &mut *conn).unwrap();
    assert!(
        adjudicators
            .iter()
            .any(|progress| progress.adjudicator.id == "pooled")
    );
    let left = teams
        .iter()
        .find(|progress| progress.team.id == "left")
        .unwrap()
        .progress;
    assert_eq!((left.expected, left.submitted), (1, 1));

    let pool = adjudicator_pool(&tournament, &mut *conn).unwrap();
    let summaries = get_feedback_overview(&tournament, pool, &mut *conn).unwrap();
    let pooled = summaries
        .iter()
        .find(|summary| summary.adjudicator.id == "pooled")
        .unwrap();
    assert_eq!(pooled.feedback_score, Some(5.0));
    assert_eq!(pooled.score, 4.5);
    drop(conn);

    let res = app.server.get("/tournaments/t1/feedback/scores.json").await;
    assert_eq!(
        res.json::<serde_json::Value>(),
        json!({ "chair": 3.0, "pooled": 4.5, "wing": 2.0 })
    );
}
