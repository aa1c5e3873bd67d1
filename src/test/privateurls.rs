use std::collections::HashSet;

use axum::http::StatusCode;
use diesel::prelude::*;

use crate::{
    schema::{adjudicators, tournament_teams},
    test::{TestApp, add_member, seed_single_debate},
    tournaments::privateurls::{URL_KEY_LENGTH, view::GENERATED},
};

const GENERATE: &str = "/tournaments/t1/privateurls/generate";

fn all_keys(app: &TestApp) -> Vec<Option<String>> {
    let mut conn = app.conn();
    let mut keys = tournament_teams::table
        .order_by(tournament_teams::id)
        .select(tournament_teams::url_key)
        .load::<Option<String>>(&mut *conn)
        .unwrap();
    keys.extend(
        adjudicators::table
            .order_by(adjudicators::id)
            .select(adjudicators::url_key)
            .load::<Option<String>>(&mut *conn)
            .unwrap(),
    );
    keys
}

#[tokio::test]
async fn generating_twice_keeps_the_first_keys() {
    let mut app = TestApp::new();
    let uid = app.login_as("director").await;

    let mut conn = app.conn();
    seed_single_debate(&mut conn, "t1");
    add_member(&mut conn, "t1", &uid, true);
    drop(conn);

    let res = app.server.get("/tournaments/t1/privateurls").await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert!(res.text().contains("Generate private URLs"));

    let res = app.server.post(GENERATE).await;
    assert_eq!(res.status_code(), StatusCode::SEE_OTHER);

    let first = all_keys(&app);
    assert_eq!(first.len(), 4);
    let distinct: HashSet<_> = first
        .iter()
        .map(|key| key.clone().expect("every participant has a key"))
        .collect();
    assert_eq!(distinct.len(), 4);
    assert!(distinct.iter().all(|key| key.len() == URL_KEY_LENGTH));

    let res = app.server.get("/tournaments/t1/privateurls").await;
    let text = res.text();
    assert!(text.contains(GENERATED));
    assert!(!text.contains("Generate private URLs"));

    let res = app.server.post(GENERATE).await;
    assert_eq!(res.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(all_keys(&app), first);

    let res = app.server.get("/tournaments/t1/privateurls").await;
    assert!(res.text().contains("There are already randomised URLs."));
}

#[tokio::test]
async fn only_superusers_generate_keys() {
    let mut app = TestApp::new();
    let uid = app.login_as("assistant").await;

    let mut conn = app.conn();
    seed_single_debate(&mut conn, "t1");
    add_member(&mut conn, "t1", &uid, false);
    drop(conn);

    let res = app.server.post(GENERATE).await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    assert!(all_keys(&app).iter().all(Option::is_none));

    let res = app.server.get("/tournaments/t1/privateurls").await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
}
