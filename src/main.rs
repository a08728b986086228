use clap::{Parser, Subcommand};
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;
use std::{error::Error, sync::Arc};

use viewcrate::{
    config::Settings,
    logging::LogRegistry,
    sample::{self, AppState, migration::Migrator},
};

#[derive(Parser)]
#[command(version, about = "Sample HR service built from view sets")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (the default)
    Run {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut settings = Settings::from_env()?;
    if let Some(Command::Run { host, port }) = cli.command {
        if let Some(host) = host {
            settings.host = host;
        }
        if let Some(port) = port {
            settings.port = port;
        }
    }

    let logs = Arc::new(LogRegistry::init(&settings.log)?);

    let mut options = ConnectOptions::new(settings.database_url.clone());
    if !settings.database_url.contains(":memory:") {
        options.max_connections(settings.database_max_connections);
    }
    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;

    let addr = settings.listen_addr();
    let state = AppState {
        db: db.clone(),
        logs: logs.clone(),
        settings: Arc::new(settings),
    };
    let app = sample::router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for shutdown signal");
            }
        })
        .await?;

    tracing::info!("shutting down");
    db.close().await?;
    logs.shutdown()?;
    Ok(())
}
