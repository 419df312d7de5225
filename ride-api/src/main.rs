//! Ride API Entry Point
//!
//! Usage:
//!   ride-api init    - Apply the cancellation schema (requires DATABASE_URL)
//!   ride-api serve   - Start the HTTP server
//!
//! Configuration comes from flags, the environment and an optional .env file.

use clap::Parser;
use ride_api::cli::{Cli, Commands};
use ride_api::server::{run_server, BoxError};
use ride_db::PgDatastore;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    match &cli.command {
        Commands::Init => {
            let url = cli
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL is required for init")?;
            let store = PgDatastore::connect(url, 1).await?;
            store.init_schema().await?;
            info!("Schema applied");
            Ok(())
        }
        Commands::Serve(_) => {
            let config = cli.server_config().ok_or("invalid serve arguments")?;
            run_server(config).await
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "ride_api=debug,ride_db=debug,tower_http=debug"
    } else {
        "ride_api=info,ride_db=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
