//! Signet - signature-token service for claim document signing

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use signet::notify::{CompletionNotifier, HttpMailer, NoopMailer};
use signet::{config::Args, db::MongoClient, server, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("signet={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Signet - claim signing service");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Storage root: {}", args.storage_root.display());
    info!("Public URL: {}", args.public_url);
    info!("Token TTL: {}h", args.token_ttl_hours);
    info!(
        "Email: {}",
        args.email_api_url.as_deref().unwrap_or("disabled")
    );
    info!("======================================");

    // Connect to MongoDB; the service cannot run without its store
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => client,
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    // Make sure the artifact directory exists before the first submission
    if let Err(e) = tokio::fs::create_dir_all(&args.storage_root).await {
        error!(
            "Cannot create storage root {}: {}",
            args.storage_root.display(),
            e
        );
        std::process::exit(1);
    }

    // Completion emails go out over an HTTP email API when configured
    let notifier: Arc<dyn CompletionNotifier> = match args.email_api_url {
        Some(ref url) => Arc::new(HttpMailer::new(
            url.clone(),
            args.email_api_key.clone(),
            args.email_from.clone(),
        )),
        None => Arc::new(NoopMailer),
    };

    let state = Arc::new(AppState::new(args, mongo, notifier).await?);

    server::run(state).await?;

    Ok(())
}
