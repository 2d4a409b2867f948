//! # community-board
//!
//! The entry point that assembles the application from settings and
//! compile-time features.

use std::sync::Arc;

use anyhow::Context;
use api_adapters::{router, AppState};
use configs::{LogSettings, Settings};
use domains::{FileStore, PostRepository};
use services::{AttachmentLayout, PostService, ReconcileLimits};
use storage_adapters::{LocalFileStore, MemoryPostRepository};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let registry = tracing_subscriber::registry().with(filter);
    if log.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[cfg(feature = "db-postgres")]
async fn connect_database(settings: &Settings) -> anyhow::Result<Option<Arc<dyn PostRepository>>> {
    use secrecy::ExposeSecret;

    let Some(url) = &settings.database.url else {
        return Ok(None);
    };
    let repo = storage_adapters::PgPostRepository::connect(url.expose_secret())
        .await
        .context("connecting to postgres")?;
    info!("posts are stored in postgres");
    Ok(Some(Arc::new(repo)))
}

#[cfg(not(feature = "db-postgres"))]
async fn connect_database(settings: &Settings) -> anyhow::Result<Option<Arc<dyn PostRepository>>> {
    if settings.database.url.is_some() {
        warn!("database.url is set but this build has no postgres support");
    }
    Ok(None)
}

async fn build_repository(settings: &Settings) -> anyhow::Result<Arc<dyn PostRepository>> {
    if let Some(repo) = connect_database(settings).await? {
        return Ok(repo);
    }
    info!("posts are kept in memory");
    Ok(Arc::new(MemoryPostRepository::new()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = configs::load_dotenv();
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings.log);
    if let Err(e) = dotenv {
        warn!(error = %e, "ignoring unreadable .env file");
    }

    let repo = build_repository(&settings).await?;

    let files = Arc::new(LocalFileStore::new());
    files
        .ensure_dir(&settings.storage.root)
        .await
        .context("creating attachment storage root")?;

    let service = PostService::new(
        repo,
        files,
        AttachmentLayout::new(&settings.storage.root),
        ReconcileLimits {
            max_attachments: settings.storage.max_attachments,
        },
    );
    let app = router(
        AppState {
            service: Arc::new(service),
        },
        settings.server.body_limit_bytes,
    );

    let address = settings.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(%address, storage_root = %settings.storage.root.display(), "community-board listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;
    Ok(())
}
