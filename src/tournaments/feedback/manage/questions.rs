use axum::{extract::Path, response::Redirect};
use axum_extra::extract::{Form, PrivateCookieJar};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use hypertext::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::User,
    flash,
    schema::{feedback_answers, feedback_questions},
    state::Conn,
    template::Page,
    tournaments::{
        Tournament,
        feedback::{AnswerType, FeedbackQuestion},
        manage::sidebar::SidebarWrapper,
    },
    util_resp::{FlashResponse, StandardResponse, SuccessResponse},
};

fn questions_redirect(tid: &str) -> SuccessResponse {
    SuccessResponse::SeeOther(Box::new(Redirect::to(&format!(
        "/tournaments/{tid}/feedback/questions"
    ))))
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

pub async fn feedback_questions_page(
    Path(tid): Path<String>,
    user: User,
    jar: PrivateCookieJar,
    mut conn: Conn,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_superuser(&user.id, &mut *conn)?;

    let questions = feedback_questions::table
        .filter(feedback_questions::tournament_id.eq(&tid))
        .order_by(feedback_questions::seq.asc())
        .select(FeedbackQuestion::as_select())
        .load::<FeedbackQuestion>(&mut *conn)?;

    let (jar, messages) = flash::take(jar);
    let page = Page::new()
        .user(user)
        .tournament(tournament.clone())
        .flash(messages)
        .body(maud! {
            SidebarWrapper tournament=(&tournament) {
                div class="d-flex justify-content-between flex-wrap flex-md-nowrap align-items-center pt-3 pb-2 mb-3 border-bottom" {
                    h1 class="h2" { "Feedback questions" }
                }

                div class="table-responsive" {
                    table class="table table-striped table-sm" {
                        thead {
                            tr {
                                th scope="col" { "#" }
                                th scope="col" { "Question" }
                                th scope="col" { "Type" }
                                th scope="col" { "Required" }
                                th scope="col" { "Teams" }
                                th scope="col" { "Adjudicators" }
                                th scope="col" { "Actions" }
                            }
                        }
                        tbody {
                            @for (i, question) in questions.iter().enumerate() {
                                tr {
                                    td { (question.seq) }
                                    td { (question.text) }
                                    td { (question.kind().as_str()) }
                                    td { (yes_no(question.required)) }
                                    td { (yes_no(question.for_teams)) }
                                    td { (yes_no(question.for_adjudicators)) }
                                    td {
                                        div class="btn-group" role="group" {
                                            form method="post" action=(format!("/tournaments/{tid}/feedback/questions/delete")) class="d-inline" {
                                                input type="hidden" name="question_id" value=(question.id);
                                                button type="submit" class="btn btn-sm btn-outline-danger" onclick="return confirm('Are you sure?')" { "Delete" }
                                            }
                                            @if i > 0 {
                                                form method="post" action=(format!("/tournaments/{tid}/feedback/questions/up")) class="d-inline" {
                                                    input type="hidden" name="question_id" value=(question.id);
                                                    button type="submit" class="btn btn-sm btn-outline-secondary" { "Up" }
                                                }
                                            }
                                            @if i + 1 < questions.len() {
                                                form method="post" action=(format!("/tournaments/{tid}/feedback/questions/down")) class="d-inline" {
                                                    input type="hidden" name="question_id" value=(question.id);
                                                    button type="submit" class="btn btn-sm btn-outline-secondary" { "Down" }
                                                }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }

                h3 { "Add a question" }
                form method="post" action=(format!("/tournaments/{tid}/feedback/questions/add")) {
                    div class="mb-3" {
                        label for="text" class="form-label" { "Question" }
                        input type="text" class="form-control" id="text" name="text" required;
                    }
                    div class="mb-3" {
                        label for="answer_type" class="form-label" { "Type" }
                        select class="form-select" id="answer_type" name="answer_type" required {
                            option value="score" { "Score" }
                            option value="text" { "Text" }
                            option value="bool" { "Yes/No" }
                        }
                    }
                    div class="mb-3 form-check" {
                        input type="checkbox" class="form-check-input" id="required" name="required" value="true";
                        label for="required" class="form-check-label" { "Required" }
                    }
                    div class="mb-3 form-check" {
                        input type="checkbox" class="form-check-input" id="for_teams" name="for_teams" value="true";
                        label for="for_teams" class="form-check-label" { "Asked of teams" }
                    }
                    div class="mb-3 form-check" {
                        input type="checkbox" class="form-check-input" id="for_adjudicators" name="for_adjudicators" value="true";
                        label for="for_adjudicators" class="form-check-label" { "Asked of adjudicators" }
                    }
                    button type="submit" class="btn btn-primary" { "Add question" }
                }
            }
        })
        .render();

    Ok((jar, SuccessResponse::Success(page)))
}

#[derive(Deserialize)]
pub struct AddQuestionForm {
    text: String,
    answer_type: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    for_teams: bool,
    #[serde(default)]
    for_adjudicators: bool,
}

pub async fn add_feedback_question(
    Path(tid): Path<String>,
    user: User,
    jar: PrivateCookieJar,
    mut conn: Conn,
    Form(form): Form<AddQuestionForm>,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_superuser(&user.id, &mut *conn)?;

    let Some(answer_type) = AnswerType::parse(&form.answer_type) else {
        return Ok((
            flash::error(jar, "That isn't a valid type of question."),
            questions_redirect(&tid),
        ));
    };
    let text = form.text.trim();
    if text.is_empty() {
        return Ok((
            flash::error(jar, "The question can't be empty."),
            questions_redirect(&tid),
        ));
    }

    let max_seq = feedback_questions::table
        .filter(feedback_questions::tournament_id.eq(&tid))
        .select(diesel::dsl::max(feedback_questions::seq))
        .first::<Option<i64>>(&mut *conn)?
        .unwrap_or(0);

    diesel::insert_into(feedback_questions::table)
        .values((
            feedback_questions::id.eq(Uuid::now_v7().to_string()),
            feedback_questions::tournament_id.eq(&tid),
            feedback_questions::seq.eq(max_seq + 1),
            feedback_questions::text.eq(text),
            feedback_questions::answer_type.eq(answer_type.as_str()),
            feedback_questions::required.eq(form.required),
            feedback_questions::for_teams.eq(form.for_teams),
            feedback_questions::for_adjudicators.eq(form.for_adjudicators),
        ))
        .execute(&mut *conn)?;

    Ok((
        flash::success(jar, "Question added."),
        questions_redirect(&tid),
    ))
}

#[derive(Deserialize)]
pub struct QuestionForm {
    question_id: String,
}

pub async fn delete_feedback_question(
    Path(tid): Path<String>,
    user: User,
    jar: PrivateCookieJar,
    mut conn: Conn,
    Form(form): Form<QuestionForm>,
) -> FlashResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_superuser(&user.id, &mut *conn)?;

    let question = feedback_questions::table
        .filter(feedback_questions::id.eq(&form.question_id))
        .filter(feedback_questions::tournament_id.eq(&tid))
        .select(FeedbackQuestion::as_select())
        .first::<FeedbackQuestion>(&mut *conn)?;

    diesel::delete(
        feedback_answers::table
            .filter(feedback_answers::question_id.eq(&question.id)),
    )
    .execute(&mut *conn)?;
    diesel::delete(feedback_questions::table.find(&question.id))
        .execute(&mut *conn)?;

    Ok((
        flash::success(jar, format!("Deleted \"{}\".", question.text)),
        questions_redirect(&tid),
    ))
}

/// Swaps a question with its neighbour above (`up`) or below.
fn move_question(
    tid: &str,
    question_id: &str,
    up: bool,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<()> {
    let current = feedback_questions::table
        .filter(feedback_questions::id.eq(question_id))
        .filter(feedback_questions::tournament_id.eq(tid))
        .select(FeedbackQuestion::as_select())
        .first::<FeedbackQuestion>(conn)?;

    let neighbour = if up {
        feedback_questions::table
            .filter(feedback_questions::tournament_id.eq(tid))
            .filter(feedback_questions::seq.lt(current.seq))
            .order_by(feedback_questions::seq.desc())
            .select(FeedbackQuestion::as_select())
            .first::<FeedbackQuestion>(conn)
            .optional()?
    } else {
        feedback_questions::table
            .filter(feedback_questions::tournament_id.eq(tid))
            .filter(feedback_questions::seq.gt(current.seq))
            .order_by(feedback_questions::seq.asc())
            .select(FeedbackQuestion::as_select())
            .first::<FeedbackQuestion>(conn)
            .optional()?
    };

    if let Some(neighbour) = neighbour {
        diesel::update(feedback_questions::table.find(&current.id))
            .set(feedback_questions::seq.eq(neighbour.seq))
            .execute(conn)?;
        diesel::update(feedback_questions::table.find(&neighbour.id))
            .set(feedback_questions::seq.eq(current.seq))
            .execute(conn)?;
    }

    Ok(())
}

pub async fn move_feedback_question_up(
    Path(tid): Path<String>,
    user: User,
    mut conn: Conn,
    Form(form): Form<QuestionForm>,
) -> StandardResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_superuser(&user.id, &mut *conn)?;

    move_question(&tid, &form.question_id, true, &mut *conn)?;
    Ok(questions_redirect(&tid))
}

pub async fn move_feedback_question_down(
    Path(tid): Path<String>,
    user: User,
    mut conn: Conn,
    Form(form): Form<QuestionForm>,
) -> StandardResponse {
    let tournament = Tournament::fetch(&tid, &mut *conn)?;
    tournament.check_user_is_superuser(&user.id, &mut *conn)?;

    move_question(&tid, &form.question_id, false, &mut *conn)?;
    Ok(questions_redirect(&tid))
}
