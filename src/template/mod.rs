//! Templating code.
//!
//! This defines the [`Page`] item, which is used in most of the other parts of
//! this crate.

use hypertext::prelude::*;

use crate::{
    auth::User,
    flash::{FlashMessage, FlashMessages},
    tournaments::Tournament,
};

pub struct Page<R1: Renderable, R2: Renderable> {
    body: Option<R1>,
    user: Option<User>,
    extra_head: Option<R2>,
    tournament: Option<Tournament>,
    flash: Vec<FlashMessage>,
}

// unfortunate generic argument shenanigans
impl<R1: Renderable> Page<R1, String> {
    pub fn new() -> Self {
        Default::default()
    }
}

impl<R1: Renderable, R2: Renderable> Page<R1, R2> {
    pub fn new_full() -> Self {
        Default::default()
    }
}

impl<R1: Renderable, R2: Renderable> Page<R1, R2> {
    pub fn tournament(mut self, tournament: Tournament) -> Self {
        self.tournament = Some(tournament);
        self
    }

    pub fn body(mut self, body: R1) -> Self {
        self.body = Some(body);
        self
    }

    pub fn user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    pub fn extra_head(mut self, content: R2) -> Page<R1, R2> {
        self.extra_head = Some(content);
        self
    }

    pub fn user_opt(mut self, user: Option<User>) -> Self {
        self.user = user;
        self
    }

    /// Messages left by the previous request (see [`crate::flash`]).
    pub fn flash(mut self, messages: Vec<FlashMessage>) -> Self {
        self.flash = messages;
        self
    }
}

impl<R1: Renderable, R2: Renderable> Renderable for Page<R1, R2> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            html {
                head {
                    title { "Tabroom" }
                    script src="https://cdn.jsdelivr.net/npm/htmx.org@2.0.7/dist/htmx.min.js" integrity="sha384-ZBXiYtYQ6hJ2Y0ZNoYuI+Nq5MqWBr+chMrS/RkXpNzQCApHEhOt2aY8EJgqwHLkJ" crossorigin="anonymous" {
                    }
                    link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet";
                    link href="https://fonts.googleapis.com/icon?family=Material+Icons" rel="stylesheet";
                    meta
                        name="viewport"
                        content="width=device-width, initial-scale=1";
                    @if let Some(extra) = &self.extra_head {
                        (extra)
                    }
                }
                body class="d-flex flex-column vh-100" {
                    nav class="navbar navbar-expand"
                        style="background-color: #452859; display: flex; justify-content: space-between; align-items: center;"
                        data-bs-theme="dark" {
                        div class="container-fluid" style="display: flex; justify-content: space-between; align-items: center;" {
                            @if let Some(tournament) = &self.tournament {
                                a class="navbar-brand text-white"
                                  href=(format!("/tournaments/{}", tournament.id)) {
                                    (tournament.abbrv)
                                }
                            } @else {
                                a class="navbar-brand text-white" href="/" {
                                    "Home"
                                }
                            }
                            @if let Some(tournament) = &self.tournament {
                                ul class="navbar-nav" style="display: flex; gap: 1rem;" data-bs-theme="dark" {
                                    @if tournament.public_feedback {
                                        li class="nav-item" {
                                            a class="nav-link text-white" href=(format!("/tournaments/{}/feedback/public", tournament.id)) {
                                                "Submit feedback"
                                            }
                                        }
                                    }
                                    @if tournament.feedback_progress_public {
                                        li class="nav-item" {
                                            a class="nav-link text-white" href=(format!("/tournaments/{}/feedback/progress/public", tournament.id)) {
                                                "Feedback progress"
                                            }
                                        }
                                    }
                                }
                            }
                            div {
                                ul class="navbar-nav" style="display: flex; gap: 1rem;" data-bs-theme="dark" {
                                    @if let Some(user) = &self.user {
                                        li class="nav-item" {
                                            span class="nav-link text-white" {
                                                (user.username)
                                            }
                                        }
                                    } @else {
                                        li class="nav-item" {
                                            a class="nav-link text-white" href="/login" {
                                                "Login"
                                            }
                                        }
                                        li class="nav-item" {
                                            a class="nav-link text-white" href="/register" {
                                                "Register"
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                    div class="flex-grow-1" {
                        @if !self.flash.is_empty() {
                            div class="container mt-3" {
                                FlashMessages messages=(&self.flash);
                            }
                        }
                        @if let Some(body) = &self.body {
                            (body)
                        }
                    }
                }
            }
        }.render_to(buffer)
    }
}

impl<R1: Renderable, R2: Renderable> Default for Page<R1, R2> {
    fn default() -> Self {
        Self {
            body: Default::default(),
            user: Default::default(),
            tournament: Default::default(),
            extra_head: Default::default(),
            flash: Default::default(),
        }
    }
}
