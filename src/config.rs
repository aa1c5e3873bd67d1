//! Process settings, database setup and the application router.

use std::path::Path;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use diesel::{
    SqliteConnection,
    r2d2::{ConnectionManager, Pool, PoolError},
};
use diesel_migrations::MigrationHarness;
use hypertext::prelude::*;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::{
    MIGRATIONS,
    actionlog::view::action_log_page,
    auth::{
        User,
        login::{do_login, login_page},
        register::{do_register, register_page},
    },
    state::{AppState, DbPool, tx_commit},
    template::Page,
    tournaments::{
        create::{create_tournament_page, do_create_tournament},
        feedback::{
            manage::{
                add::{add_feedback_index, add_feedback_page, do_add_feedback},
                adj_actions::{do_set_breaking, do_set_note, do_set_test_score},
                overview::{
                    adjudicator_feedback_data, adjudicator_scores_json,
                    feedback_overview_page,
                },
                progress::{
                    feedback_progress_page, public_feedback_progress_page,
                },
                questions::{
                    add_feedback_question, delete_feedback_question,
                    feedback_questions_page, move_feedback_question_down,
                    move_feedback_question_up,
                },
                views::{
                    feedback_by_source_page, feedback_by_target_page,
                    feedback_from_adjudicator_page, feedback_from_team_page,
                    feedback_on_adjudicator_page, latest_feedback_page,
                },
            },
            public::{
                do_private_url_feedback, do_public_feedback,
                private_url_feedback_page, public_feedback_index,
                public_feedback_page,
            },
        },
        manage::config::{
            update_tournament_preferences, view_tournament_preferences,
        },
        privateurls::view::{generate_private_urls, private_urls_page},
        view::view_tournament_page,
    },
    util_resp::{StandardResponse, success},
};

pub const DEFAULT_DATABASE_URL: &str = ":memory:";
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("could not read the configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("the configuration file is not valid: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("`secret_key` must be at least 64 bytes long")]
    ShortSecret,
    #[error("could not open the database: {0}")]
    Pool(#[from] PoolError),
    #[error("could not run migrations: {0}")]
    Migrations(String),
}

/// Settings for the server process. Every field may be given in the TOML
/// configuration file and overridden by an environment variable.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// `DATABASE_URL`
    pub database_url: String,
    /// `SECRET_KEY`; used to encrypt the login and flash cookies.
    pub secret_key: Option<String>,
    /// `BIND_ADDR`
    pub bind: String,
    /// `LOG_LEVEL`
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            secret_key: None,
            bind: DEFAULT_BIND.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let settings = match path {
            Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
            None => Settings::default(),
        };
        Ok(settings.with_overrides(|name| std::env::var(name).ok()))
    }

    /// Applies overrides looked up by environment variable name.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(key) = lookup("SECRET_KEY") {
            self.secret_key = Some(key);
        }
        if let Some(bind) = lookup("BIND_ADDR") {
            self.bind = bind;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level;
        }
        self
    }

    pub fn cookie_key(&self) -> Result<Key, SettingsError> {
        match &self.secret_key {
            Some(secret) => Key::try_from(secret.as_bytes())
                .map_err(|_| SettingsError::ShortSecret),
            None => {
                tracing::warn!(
                    "no secret key configured; sessions will not survive a restart"
                );
                Ok(Key::generate())
            }
        }
    }
}

pub fn make_pool(database_url: &str) -> Result<DbPool, SettingsError> {
    // Every connection to `:memory:` opens a separate database.
    let max_size = if database_url == DEFAULT_DATABASE_URL {
        1
    } else {
        10
    };

    Ok(Pool::builder()
        .max_size(max_size)
        .build(ConnectionManager::<SqliteConnection>::new(database_url))?)
}

pub fn run_migrations(pool: &DbPool) -> Result<(), SettingsError> {
    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| SettingsError::Migrations(e.to_string()))?;
    tracing::info!(count = applied.len(), "applied migrations");
    Ok(())
}

pub async fn home(user: Option<User>) -> StandardResponse {
    success(
        Page::new()
            .user_opt(user)
            .body(maud! {
                div class="container py-3" {
                    ul {
                        li {
                            a href="/tournaments/create" {
                                "Create new tournament"
                            }
                        }
                    }
                }
            })
            .render(),
    )
}

fn feedback_routes() -> Router<AppState> {
    Router::new()
        .route("/overview", get(feedback_overview_page))
        .route("/scores.json", get(adjudicator_scores_json))
        .route("/adjudicators/test-score", post(do_set_test_score))
        .route("/adjudicators/breaking", post(do_set_breaking))
        .route("/adjudicators/note", post(do_set_note))
        .route("/adjudicators/:aid/data", get(adjudicator_feedback_data))
        .route("/latest", get(latest_feedback_page))
        .route("/by-target", get(feedback_by_target_page))
        .route("/by-source", get(feedback_by_source_page))
        .route("/on/adjudicator/:aid", get(feedback_on_adjudicator_page))
        .route("/from/team/:id", get(feedback_from_team_page))
        .route("/from/adjudicator/:id", get(feedback_from_adjudicator_page))
        .route("/add", get(add_feedback_index))
        .route(
            "/add/:kind/:id",
            get(add_feedback_page).post(do_add_feedback),
        )
        .route("/questions", get(feedback_questions_page))
        .route("/questions/add", post(add_feedback_question))
        .route("/questions/delete", post(delete_feedback_question))
        .route("/questions/up", post(move_feedback_question_up))
        .route("/questions/down", post(move_feedback_question_down))
        .route("/progress", get(feedback_progress_page))
        .route("/progress/public", get(public_feedback_progress_page))
        .route("/public", get(public_feedback_index))
        .route(
            "/public/:kind/:id",
            get(public_feedback_page).post(do_public_feedback),
        )
}

pub fn create_app(pool: DbPool, key: Key) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login_page).post(do_login))
        .route("/register", get(register_page).post(do_register))
        .route(
            "/tournaments/create",
            get(create_tournament_page).post(do_create_tournament),
        )
        .route("/tournaments/:tid", get(view_tournament_page))
        .route(
            "/tournaments/:tid/preferences",
            get(view_tournament_preferences).post(update_tournament_preferences),
        )
        .route("/tournaments/:tid/actionlog", get(action_log_page))
        .route("/tournaments/:tid/privateurls", get(private_urls_page))
        .route(
            "/tournaments/:tid/privateurls/generate",
            post(generate_private_urls),
        )
        .route(
            "/tournaments/:tid/privateurls/:key/feedback",
            get(private_url_feedback_page).post(do_private_url_feedback),
        )
        .nest("/tournaments/:tid/feedback", feedback_routes())
        .layer(middleware::from_fn(tx_commit))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { pool, key })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_overrides_file() {
        let file: Settings = toml::from_str(
            r#"
database_url = "tab.db"
bind = "0.0.0.0:80"
"#,
        )
        .unwrap();
        assert_eq!(file.log_level, DEFAULT_LOG_LEVEL);

        let settings = file.with_overrides(|name| match name {
            "DATABASE_URL" => Some("other.db".to_string()),
            "LOG_LEVEL" => Some("debug".to_string()),
            _ => None,
        });
        assert_eq!(settings.database_url, "other.db");
        assert_eq!(settings.bind, "0.0.0.0:80");
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(toml::from_str::<Settings>("port = 80").is_err());
    }

    #[test]
    fn short_secrets_are_rejected() {
        let settings = Settings {
            secret_key: Some("hunter2".to_string()),
            ..Settings::default()
        };
        assert!(matches!(
            settings.cookie_key(),
            Err(SettingsError::ShortSecret)
        ));

        let settings = Settings {
            secret_key: Some("0".repeat(64)),
            ..Settings::default()
        };
        assert!(settings.cookie_key().is_ok());
    }
}
