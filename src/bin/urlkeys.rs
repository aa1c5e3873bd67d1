//! Populates or deletes the private URL keys of a tournament's teams and
//! adjudicators.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use diesel::{Connection, SqliteConnection};
use diesel_migrations::MigrationHarness;
use tabroom::{
    MIGRATIONS,
    tournaments::{
        Tournament,
        privateurls::{
            delete_tournament_url_keys, populate_url_keys, url_key_owners,
        },
    },
};

#[derive(Parser)]
struct UrlKeys {
    /// Falls back to `DATABASE_URL`.
    #[clap(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Gives a key to every team and adjudicator which does not have one.
    Populate { slug: String },
    /// Removes every key.
    Delete { slug: String },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().init();

    let args = UrlKeys::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: UrlKeys) -> Result<(), Box<dyn std::error::Error>> {
    let db_url = match args.database_url {
        Some(url) => url,
        None => std::env::var("DATABASE_URL").map_err(|_| {
            "please either set `DATABASE_URL` or pass the `--database-url` flag"
        })?,
    };

    let mut conn = SqliteConnection::establish(&db_url)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| e.to_string())?;

    let slug = match &args.command {
        Command::Populate { slug } | Command::Delete { slug } => slug,
    };
    let tournament = Tournament::fetch_by_slug(slug, &mut conn)?
        .ok_or_else(|| format!("no tournament has the slug `{slug}`"))?;

    match args.command {
        Command::Populate { .. } => {
            let assigned = conn.transaction(|conn| {
                let owners = url_key_owners(&tournament, conn)?;
                populate_url_keys(&owners, conn)
            })?;
            println!("Assigned {assigned} URL keys in {}.", tournament.name);
        }
        Command::Delete { .. } => {
            let removed = delete_tournament_url_keys(&tournament, &mut conn)?;
            println!(
                "Removed the URL keys of {removed} participants in {}.",
                tournament.name
            );
        }
    }

    Ok(())
}
