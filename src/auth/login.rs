use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
    extract::{Form, Query},
    response::Redirect,
};
use axum_extra::extract::PrivateCookieJar;
use diesel::prelude::*;
use hypertext::prelude::*;
use serde::Deserialize;
use url::Url;

use crate::{
    auth::{User, set_login_cookie},
    schema::users,
    state::Conn,
    template::Page,
    util_resp::{FailureResponse, FlashResponse, StandardResponse, SuccessResponse, bad_request, success},
    widgets::alert::ErrorAlert,
};

pub async fn login_page(user: Option<User>) -> StandardResponse {
    if user.is_some() {
        return bad_request(
            Page::new()
                .user_opt(user)
                .body(maud! {
                    ErrorAlert
                        msg = "You are already logged in, so cannot log in!";
                })
                .render(),
        );
    }

    success(Page::new().user_opt(user).body(maud! {
        form method="post" {
            div class="form-group" {
                label for="id" { "Username or email address" }
                input type="text" class="form-control" id="id" name="id" placeholder="Enter username or email";
            }
            div class="form-group" {
                label for="password" { "Password" }
                input type="password" class="form-control" id="password" name="password" placeholder="Password";
            }
            button type="submit" class="btn btn-primary" { "Submit" }
        }
    }).render())
}

#[derive(Deserialize)]
pub struct LoginForm {
    id: String,
    password: String,
}

#[derive(Deserialize)]
pub struct LoginQuery {
    next: Option<String>,
}

pub async fn do_login(
    user: Option<User>,
    Query(query): Query<LoginQuery>,
    jar: PrivateCookieJar,
    mut conn: Conn,
    Form(form): Form<LoginForm>,
) -> FlashResponse {
    let user1 = match users::table
        .filter(users::email.eq(&form.id).or(users::username.eq(&form.id)))
        .first::<User>(&mut *conn)
        .optional()?
    {
        Some(user) => user,
        None => {
            return Err(FailureResponse::BadRequest(
                Page::new()
                    .user_opt(user)
                    .body(maud! {
                        ErrorAlert
                            msg =  "No such user exists. Please return to the
                                    previous page and try again.";
                    })
                    .render(),
            ));
        }
    };

    let password_ok = PasswordHash::new(&user1.password_hash)
        .map(|parsed_hash| {
            Argon2::default()
                .verify_password(form.password.as_bytes(), &parsed_hash)
                .is_ok()
        })
        .unwrap_or(false);

    if !password_ok {
        return Err(FailureResponse::BadRequest(
            Page::new()
                .user_opt(user)
                .body(maud! {
                    ErrorAlert msg =
                        "Incorrect password. Please return to the previous page
                         and try again.";
                })
                .render(),
        ));
    }

    tracing::info!(user = %user1.id, "user logged in");

    let redirect_to = match query
        .next
        .as_deref()
        .and_then(|next| Url::parse("http://localhost").ok()?.join(next).ok())
    {
        Some(url) => url.path().to_string(),
        None => "/".to_string(),
    };

    Ok((
        set_login_cookie(user1.id, jar),
        SuccessResponse::SeeOther(Box::new(Redirect::to(&redirect_to))),
    ))
}
