use std::{net::SocketAddr, path::PathBuf, process::ExitCode};

use clap::Parser;
use tabroom::config::{Settings, create_app, make_pool, run_migrations};

#[derive(Parser, Debug)]
#[command(about = "Adjudicator feedback and scoring for debate tournaments")]
struct Args {
    /// TOML file with the server settings. Environment variables take
    /// precedence over its values.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let settings = match Settings::load(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let level = settings
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    match run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let key = settings.cookie_key()?;
    let pool = make_pool(&settings.database_url)?;
    run_migrations(&pool)?;

    let app = create_app(pool, key);

    let listener = tokio::net::TcpListener::bind(&settings.bind).await?;
    tracing::info!(
        bind = %settings.bind,
        database = %settings.database_url,
        "listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
