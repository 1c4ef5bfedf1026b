//! synctab - imports downloaded sync records into the local store.
//!
//! Reads newline-delimited wire records from stdin and prints the import
//! report as JSON.

use std::io;
use synctab_store::{Config, SyncStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "synctab=info,synctab_store=info,synctab_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let store = SyncStore::open(&config)?;

    tracing::info!("Importing records from stdin");
    let report = store.import(io::stdin().lock())?;

    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}
