use argon2::Argon2;
use argon2::PasswordHasher;
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use axum::{extract::Form, response::Redirect};
use chrono::Utc;
use diesel::{insert_into, prelude::*};
use hypertext::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::*;
use crate::{
    auth::User,
    schema::users,
    state::Conn,
    template::Page,
    util_resp::{
        FailureResponse, StandardResponse, bad_request, see_other_ok, success,
    },
};

pub async fn register_page(user: Option<User>) -> StandardResponse {
    if user.is_some() {
        return see_other_ok(Redirect::to("/"));
    }

    success(
        Page::new()
            .body(maud! {
                h1 {"Register"}
                form method="post" class="mt-4" {
                    div class="mb-3" {
                        label for="username" class="form-label" { "Username" }
                        input type="text" class="form-control" id="username" name="username";
                    }
                    div class="mb-3" {
                        label for="email" class="form-label" { "Email" }
                        input type="email" class="form-control" id="email" name="email";
                    }
                    div class="mb-3" {
                        label for="password" class="form-label" { "Password" }
                        input type="password" class="form-control" id="password" name="password";
                    }
                    div class="mb-3" {
                        label for="password2" class="form-label" { "Confirm Password" }
                        input type="password" class="form-control" id="password2" name="password2";
                    }
                    button type="submit" class="btn btn-primary" { "Register" }
                }
            })
            .render(),
    )
}

#[derive(Deserialize, Serialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
}

impl RegisterForm {
    fn validate(&self) -> Result<(), String> {
        is_ascii_no_spaces(&self.username)?;
        if !User::validate_username(&self.username) {
            return Err("usernames should be at least four letters or digits"
                .to_string());
        }
        is_valid_email(&self.email)?;
        if !User::validate_password(&self.password) {
            return Err("passwords should be longer than six characters"
                .to_string());
        }
        if self.password != self.password2 {
            return Err("the two passwords do not match".to_string());
        }
        Ok(())
    }
}

pub async fn do_register(
    user: Option<User>,
    mut conn: Conn,
    Form(form): Form<RegisterForm>,
) -> StandardResponse {
    if user.is_some() {
        return see_other_ok(Redirect::to("/"));
    }

    if let Err(e) = form.validate() {
        return bad_request(
            Page::new()
                .body(maud! {
                    div class="alert alert-danger" role="alert" {
                        "Error: " (e) ". Please return to the previous page and try again."
                    }
                })
                .render(),
        );
    }

    let existing = users::table
        .filter(
            users::username
                .eq(&form.username)
                .or(users::email.eq(&form.email)),
        )
        .first::<User>(&mut *conn)
        .optional()?;

    if let Some(user) = existing {
        let is_email_problem = user.email == form.email;

        return bad_request(
            Page::new()
                .body(maud! {
                    div class="alert alert-danger" role="alert" {
                        @if is_email_problem {
                            "That email is already taken"
                        } @else {
                            "That username is already taken"
                        }

                        ". Please return to the previous page and try again."
                    }
                })
                .render(),
        );
    }

    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(form.password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!("could not hash password: {e}");
            FailureResponse::ServerError(())
        })?
        .to_string();

    insert_into(users::table)
        .values((
            users::id.eq(Uuid::now_v7().to_string()),
            users::email.eq(&form.email),
            users::username.eq(&form.username),
            users::password_hash.eq(password_hash),
            users::created_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut *conn)?;

    tracing::info!(username = %form.username, "registered new user");

    see_other_ok(Redirect::to("/login"))
}
