//! One-line messages which are shown on the page following a request.
//!
//! User-facing failures (an unparseable test score, an adjudicator which
//! cannot be identified, URL keys which already exist) do not fail the
//! request. Instead the handler pushes a message here and redirects; the
//! messages are stored in an encrypted cookie until the next page is rendered.

use axum_extra::extract::{PrivateCookieJar, cookie::Cookie};
use hypertext::prelude::*;
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE: &str = "flash";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

impl Level {
    fn alert_class(self) -> &'static str {
        match self {
            Level::Success => "alert alert-success",
            Level::Error => "alert alert-danger",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FlashMessage {
    pub level: Level,
    pub text: String,
}

fn read(jar: &PrivateCookieJar) -> Vec<FlashMessage> {
    jar.get(FLASH_COOKIE)
        .and_then(|cookie| serde_json::from_str(cookie.value()).ok())
        .unwrap_or_default()
}

pub fn push(
    jar: PrivateCookieJar,
    level: Level,
    text: impl Into<String>,
) -> PrivateCookieJar {
    let mut messages = read(&jar);
    messages.push(FlashMessage {
        level,
        text: text.into(),
    });

    match serde_json::to_string(&messages) {
        Ok(value) => {
            jar.add(Cookie::build((FLASH_COOKIE, value)).path("/").build())
        }
        Err(e) => {
            tracing::error!("could not serialize flash messages: {e}");
            jar
        }
    }
}

pub fn error(jar: PrivateCookieJar, text: impl Into<String>) -> PrivateCookieJar {
    push(jar, Level::Error, text)
}

pub fn success(
    jar: PrivateCookieJar,
    text: impl Into<String>,
) -> PrivateCookieJar {
    push(jar, Level::Success, text)
}

/// Removes all pending messages, returning them for display.
pub fn take(jar: PrivateCookieJar) -> (PrivateCookieJar, Vec<FlashMessage>) {
    let messages = read(&jar);
    if messages.is_empty() {
        return (jar, messages);
    }
    (
        jar.remove(Cookie::build(FLASH_COOKIE).path("/").build()),
        messages,
    )
}

pub struct FlashMessages<'r> {
    pub messages: &'r [FlashMessage],
}

impl Renderable for FlashMessages<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            @for message in self.messages {
                div class=(message.level.alert_class()) role="alert" {
                    (message.text)
                }
            }
        }
        .render_to(buffer);
    }
}
