//! Tabroom: adjudicator feedback, scoring and audit logging for debate
//! tournaments.

use diesel_migrations::{EmbeddedMigrations, embed_migrations};

pub mod actionlog;
pub mod auth;
pub mod config;
pub mod flash;
pub mod permission;
pub mod schema;
pub mod state;
pub mod template;
pub mod tournaments;
pub mod util_resp;
pub mod validation;
pub mod widgets;

#[cfg(test)]
mod test;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
