use axum::http::StatusCode;
use diesel::prelude::*;

use crate::{
    schema::{action_log_entries, adjudicator_feedback, adjudicators, tournaments},
    test::{TestApp, seed_single_debate},
    tournaments::feedback::public::THANKS,
};

const GOV_FORM: &str = "/tournaments/t1/feedback/public/team/gov";

fn enable(app: &TestApp, public: bool, randomised: bool) {
    let mut conn = app.conn();
    diesel::update(tournaments::table.find("t1"))
        .set((
            tournaments::public_feedback.eq(public),
            tournaments::public_feedback_randomised.eq(randomised),
        ))
        .execute(&mut *conn)
        .unwrap();
}

/// `(score, confirmed, version, submitter_kind)` of each stored piece of
/// feedback, oldest first.
fn stored_feedback(app: &TestApp) -> Vec<(f64, bool, i64, String)> {
    let mut conn = app.conn();
    adjudicator_feedback::table
        .order_by(adjudicator_feedback::version.asc())
        .select((
            adjudicator_feedback::score,
            adjudicator_feedback::confirmed,
            adjudicator_feedback::version,
            adjudicator_feedback::submitter_kind,
        ))
        .load(&mut *conn)
        .unwrap()
}

#[tokio::test]
async fn public_forms_are_hidden_unless_enabled() {
    let app = TestApp::new();
    let mut conn = app.conn();
    seed_single_debate(&mut conn, "t1");
    drop(conn);

    let res = app.server.get("/tournaments/t1/feedback/public").await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    let res = app.server.get(GOV_FORM).await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    let res = app
        .server
        .post(GOV_FORM)
        .form(&[("target", "d1:chair"), ("score", "4")])
        .await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);

    assert!(stored_feedback(&app).is_empty());
}

#[tokio::test]
async fn teams_submit_feedback_on_their_chair() {
    let app = TestApp::new();
    let mut conn = app.conn();
    seed_single_debate(&mut conn, "t1");
    drop(conn);
    enable(&app, true, false);

    let res = app.server.get("/tournaments/t1/feedback/public").await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert!(res.text().contains("Team gov"));

    let res = app.server.get(GOV_FORM).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert!(res.text().contains("d1:chair"));

    let res = app
        .server
        .post(GOV_FORM)
        .form(&[("target", "d1:chair"), ("score", "4")])
        .await;
    assert_eq!(res.status_code(), StatusCode::SEE_OTHER);

    // A resubmission replaces the earlier version.
    let res = app
        .server
        .post(GOV_FORM)
        .form(&[("target", "d1:chair"), ("score", "2.5")])
        .await;
    assert_eq!(res.status_code(), StatusCode::SEE_OTHER);

    assert_eq!(
        stored_feedback(&app),
        vec![
            (4.0, false, 1, "public".to_string()),
            (2.5, true, 2, "public".to_string()),
        ]
    );

    let mut conn = app.conn();
    let codes = action_log_entries::table
        .select(action_log_entries::type_)
        .load::<String>(&mut *conn)
        .unwrap();
    assert_eq!(codes, vec!["fb.subm".to_string(), "fb.subm".to_string()]);
    drop(conn);

    let res = app.server.get(GOV_FORM).await;
    assert!(res.text().contains(THANKS));
}

#[tokio::test]
async fn invalid_public_submissions_are_rejected() {
    let app = TestApp::new();
    let mut conn = app.conn();
    seed_single_debate(&mut conn, "t1");
    drop(conn);
    enable(&app, true, false);

    for (target, score) in
        [("d1:wing", "4"), ("d1:chair", "9"), ("d1:chair", "good")]
    {
        let res = app
            .server
            .post(GOV_FORM)
            .form(&[("target", target), ("score", score)])
            .await;
        assert_eq!(res.status_code(), StatusCode::SEE_OTHER);
    }

    assert!(stored_feedback(&app).is_empty());

    let res = app.server.get(GOV_FORM).await;
    let text = res.text();
    assert!(text.contains("Please select one of the adjudicators listed."));
    assert!(text.contains("The score must be a number between 1 and 5."));
}

#[tokio::test]
async fn private_urls_identify_the_submitter() {
    let app = TestApp::new();
    let mut conn = app.conn();
    seed_single_debate(&mut conn, "t1");
    diesel::update(adjudicators::table.find("wing"))
        .set(adjudicators::url_key.eq("wingkey123456789"))
        .execute(&mut *conn)
        .unwrap();
    drop(conn);

    let url = "/tournaments/t1/privateurls/wingkey123456789/feedback";

    let res = app.server.get(url).await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);

    enable(&app, false, true);

    let res = app.server.get(url).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert!(res.text().contains("Adjudicator wing"));

    let res = app
        .server
        .get("/tournaments/t1/privateurls/nosuchkey/feedback")
        .await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);

    let res = app
        .server
        .post(url)
        .form(&[("target", "d1:chair"), ("score", "5")])
        .await;
    assert_eq!(res.status_code(), StatusCode::SEE_OTHER);

    let mut conn = app.conn();
    let (source_team, source_adj) = adjudicator_feedback::table
        .select((
            adjudicator_feedback::source_team_id,
            adjudicator_feedback::source_adjudicator_id,
        ))
        .first::<(Option<String>, Option<String>)>(&mut *conn)
        .unwrap();
    assert_eq!(source_team, None);
    assert_eq!(source_adj.as_deref(), Some("wing"));
    drop(conn);

    // The public pages stay closed.
    let res = app
        .server
        .get("/tournaments/t1/feedback/public/adjudicator/wing")
        .await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
}
