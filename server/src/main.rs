//! Folio Server - admin API for schema-driven content collections.
//!
//! Loads the collection catalog, connects the document and blob stores named
//! in the environment (or in-memory stand-ins) and serves the admin API.

use folio_engine::{BlobStore, DocumentStore, MemoryBlobStore, MemoryStore};
use folio_server::catalog::Catalog;
use folio_server::config::Config;
use folio_server::registry::CollectionRegistry;
use folio_server::rest::{RestBlobStore, RestStore};
use folio_server::{app, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio_server=debug,folio_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Folio Server on {}:{}", config.host, config.port);

    // Load the catalog
    let catalog = Catalog::load(&config.catalog_path)?;
    tracing::info!(
        path = %config.catalog_path.display(),
        collections = catalog.collections.len(),
        "Catalog loaded"
    );

    // Connect stores
    let store: Arc<dyn DocumentStore> = match &config.store_url {
        Some(url) => {
            tracing::info!(url = %url, "Using remote document store");
            Arc::new(RestStore::new(
                url.clone(),
                config.store_auth.clone(),
                config.request_timeout,
            )?)
        }
        None => {
            tracing::warn!("FOLIO_STORE_URL not set, records are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };
    let blobs: Arc<dyn BlobStore> = match &config.blob_url {
        Some(url) => Arc::new(RestBlobStore::new(url.clone(), config.request_timeout)?),
        None => {
            tracing::warn!("FOLIO_BLOB_URL not set, uploads are kept in memory");
            Arc::new(MemoryBlobStore::new())
        }
    };

    // Build application state
    let state = AppState {
        registry: CollectionRegistry::new_shared(&catalog, store),
        blobs,
    };

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
