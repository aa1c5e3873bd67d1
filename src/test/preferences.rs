use axum::http::StatusCode;
use diesel::prelude::*;

use crate::{
    schema::action_log_entries,
    test::{TestApp, add_member, seed_single_debate},
    tournaments::{
        Tournament,
        config::{TournamentPreferences, WeightingKind},
    },
};

async fn superuser_app() -> TestApp {
    let mut app = TestApp::new();
    let uid = app.login_as("director").await;

    let mut conn = app.conn();
    seed_single_debate(&mut conn, "t1");
    add_member(&mut conn, "t1", &uid, true);
    drop(conn);

    app
}

fn stored_preferences(app: &TestApp) -> TournamentPreferences {
    let mut conn = app.conn();
    Tournament::fetch("t1", &mut *conn).unwrap().preferences()
}

fn log_count(app: &TestApp) -> i64 {
    let mut conn = app.conn();
    action_log_entries::table
        .filter(action_log_entries::type_.eq("op.edit"))
        .count()
        .get_result(&mut *conn)
        .unwrap()
}

#[tokio::test]
async fn preferences_are_saved_and_logged() {
    let app = superuser_app().await;

    let res = app.server.get("/tournaments/t1/preferences").await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert!(res.text().contains("feedback_weighting"));

    let mut prefs = stored_preferences(&app);
    prefs.feedback_weight = 0.25;
    prefs.feedback_weighting = WeightingKind::PerRound;
    prefs.public_feedback = true;

    let res = app
        .server
        .post("/tournaments/t1/preferences")
        .form(&[("config", toml::to_string(&prefs).unwrap())])
        .await;
    assert_eq!(res.status_code(), StatusCode::SEE_OTHER);

    assert_eq!(stored_preferences(&app), prefs);
    assert_eq!(log_count(&app), 1);

    let res = app.server.get("/tournaments/t1/preferences").await;
    assert!(res.text().contains("Preferences saved."));
}

#[tokio::test]
async fn invalid_preferences_are_not_saved() {
    let app = superuser_app().await;
    let before = stored_preferences(&app);

    let mut prefs = before.clone();
    prefs.feedback_weight = 2.0;
    let res = app
        .server
        .post("/tournaments/t1/preferences")
        .form(&[("config", toml::to_string(&prefs).unwrap())])
        .await;
    assert_eq!(res.status_code(), StatusCode::SEE_OTHER);

    let res = app
        .server
        .post("/tournaments/t1/preferences")
        .form(&[("config", "feedback_weight = ")])
        .await;
    assert_eq!(res.status_code(), StatusCode::SEE_OTHER);

    assert_eq!(stored_preferences(&app), before);
    assert_eq!(log_count(&app), 0);

    let res = app.server.get("/tournaments/t1/preferences").await;
    let text = res.text();
    assert!(text.contains("must be between 0 and 1"));
    assert!(text.contains("Those preferences could not be read"));
}

#[tokio::test]
async fn only_superusers_edit_preferences() {
    let mut app = TestApp::new();
    let uid = app.login_as("assistant").await;

    let mut conn = app.conn();
    seed_single_debate(&mut conn, "t1");
    add_member(&mut conn, "t1", &uid, false);
    drop(conn);

    let res = app.server.get("/tournaments/t1/preferences").await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);

    let res = app
        .server
        .post("/tournaments/t1/preferences")
        .form(&[("config", "public_feedback = true")])
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(log_count(&app), 0);
}
