//! Stockledger document poster.
//!
//! Posts one approved document against the configured database and prints the
//! outcome as JSON.

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockledger_core::posting::PostError;
use stockledger_db::{PostingRepository, connect_with, create_schema};
use stockledger_shared::{AppConfig, AppError};
use stockledger_shared::types::{DocumentId, UserId};

/// Post an inventory document.
#[derive(Debug, Parser)]
#[command(name = "post-doc", version, about)]
struct Args {
    /// Document to post.
    #[arg(long)]
    document: DocumentId,

    /// User recorded as the poster.
    #[arg(long)]
    user: UserId,

    /// Create missing tables before posting.
    #[arg(long)]
    init_schema: bool,

    /// Emit logs as JSON.
    #[arg(long, env = "STOCKLEDGER_LOG_JSON")]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stockledger=info,post_doc=info,sea_orm=warn".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.log_json);

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect_with(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    if args.init_schema {
        create_schema(&db).await.context("Failed to create schema")?;
    }

    let repository = PostingRepository::new(db);
    match repository.post_document(args.document, args.user).await {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Err(err) => Err(report_failure(err).into()),
    }
}

fn report_failure(err: PostError) -> AppError {
    let retryable = err.is_retryable();
    let code = err.error_code();
    let app = AppError::from(err);
    error!(
        code,
        kind = app.error_code(),
        status = app.status_code(),
        retryable,
        "Posting failed: {app}"
    );
    app
}
