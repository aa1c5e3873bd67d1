use hypertext::prelude::*;
use hypertext::{Renderable, maud};

use crate::tournaments::Tournament;

pub struct SidebarWrapper<'r, R: Renderable> {
    pub tournament: &'r Tournament,
    pub children: R,
}

impl<R: Renderable> Renderable for SidebarWrapper<'_, R> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            div class="container-fluid h-100" {
                div class="row h-100" {
                    Sidebar tournament=(&self.tournament);
                    div class="col-12 col-md-9 col-lg-10" {
                        div class="p-3" {
                            (self.children)
                        }
                    }
                }
            }
        }
        .render_to(buffer);
    }
}

pub struct Sidebar<'r> {
    pub tournament: &'r Tournament,
}

impl<'r> Renderable for Sidebar<'r> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let tid = &self.tournament.id;

        let feedback_links = [
            (format!("/tournaments/{tid}/feedback/overview"), "Overview"),
            (format!("/tournaments/{tid}/feedback/progress"), "Progress"),
            (format!("/tournaments/{tid}/feedback/add"), "Add feedback"),
            (format!("/tournaments/{tid}/feedback/latest"), "Latest"),
            (format!("/tournaments/{tid}/feedback/by-target"), "By target"),
            (format!("/tournaments/{tid}/feedback/by-source"), "By source"),
            (format!("/tournaments/{tid}/feedback/questions"), "Questions"),
        ];

        let setup_links = [
            (format!("/tournaments/{tid}/privateurls"), "Private URLs"),
            (format!("/tournaments/{tid}/preferences"), "Preferences"),
            (format!("/tournaments/{tid}/actionlog"), "Action log"),
        ];

        maud! {
            div class="col-12 col-md-3 col-lg-2 order-last order-md-first p-0" {
                div class="p-3 text-white flex-shrink-0 h-100" style="background-color: #3b224c;" {
                    a href=(format!("/tournaments/{tid}")) class="d-flex align-items-center pb-3 mb-3 link-dark text-decoration-none border-bottom" {
                        span class="fs-5 fw-semibold text-white" {
                            "Navigation"
                        }
                    }
                    ul class="list-unstyled ps-0" {
                        li class="list-unstyled mb-1" {
                            strong class="mb-1" { "Feedback" }
                            ul class="list-unstyled fw-normal pb-1 small" {
                                @for (href, text) in &feedback_links {
                                    li {
                                        a class="link-light" href=(href) { (text) }
                                    }
                                }
                            }
                        }
                        li class="list-unstyled mb-1" {
                            strong class="mb-1" { "Setup" }
                            ul class="list-unstyled fw-normal pb-1 small" {
                                @for (href, text) in &setup_links {
                                    li {
                                        a class="link-light" href=(href) { (text) }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }.render_to(buffer);
    }
}
