mod api;
mod database;
mod directory;
mod outbound;
mod settings;
mod web;

use std::process::exit;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    database::Database,
    settings::{Args, Settings},
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(error) = run().await {
        error!("{error:#}");
        exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::from_file(&args.config)
        .with_context(|| format!("Problem while loading {}", args.config.display()))?;

    let database = Database::connect(&settings.database.path).with_context(|| {
        format!(
            "Problem while opening database at {}",
            settings.database.path.display()
        )
    })?;

    if let Some(seed) = &settings.directory.seed {
        if let Err(error) = outbound::import_seed(seed, &database).await {
            warn!("Problem while loading seed. {error:#}");
        }
    }

    if let Some(upstream) = settings.upstream {
        info!("Mirroring directory from {}", upstream.url);
        tokio::spawn(outbound::fetch_periodically(
            upstream.url,
            upstream.period,
            upstream.retry,
            database.clone(),
        ));
    } else {
        info!("No upstream configured; serving the local directory only");
    }

    let tls = args.cert.zip(args.key);
    let schema = api::schema(database.clone());
    web::serve(schema, database, settings.web.address, tls).await;
    Ok(())
}
