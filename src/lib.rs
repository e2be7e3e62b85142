pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

use anyhow::Context;
use axum::Router;
use std::sync::Arc;

use crate::api::{create_router, AppContext};
use crate::config::{AppConfig, StoreBackend};

// Export API types
pub use api::handlers;
pub use api::routes;

pub use error::{OdmError, OdmResult, SchemaValidationError, ValidationError, ValidationErrorType};

pub use logic::{
    Created, DanglingPolicy, Odm, Populator, ReferenceResolver, SchemaValidator, SectionResolver,
};

// Export all model types
pub use model::*;

pub use seed::{load_seed_data, SeedSummary};

// Export store types
pub use store::{DocumentStore, MemoryStore, PostgresStore};

/// Open the configured store backend. The memory backend is a fresh,
/// empty instance for the lifetime of the process.
pub async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            log::info!("using ephemeral in-memory document store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let database_url = config.database_url()?;
            let store = PostgresStore::new(&database_url, config.store.max_connections).await?;
            store.migrate().await?;
            log::info!("using PostgreSQL document store");
            Ok(Arc::new(store))
        }
    }
}

/// Seed `store` (unless disabled) and build the router over it.
pub async fn build_app<S: DocumentStore + ?Sized + 'static>(
    store: Arc<S>,
    config: &AppConfig,
) -> anyhow::Result<Router> {
    let odm = Odm::new(store).with_dangling_policy(config.populate.dangling);

    let sample_article = if config.seed.enabled {
        let summary = load_seed_data(&odm, config.seed.rng_seed)
            .await
            .context("Failed to seed sample data")?;
        Some(summary.sample_article)
    } else {
        log::info!("seeding disabled");
        None
    };

    let state = Arc::new(AppContext { odm, sample_article });
    Ok(create_router::<S>().with_state(state))
}

// Function for integration testing
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    use axum::serve;
    use tokio::net::TcpListener;

    let store = open_store(&config).await?;
    let app = build_app(store, &config).await?;

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    log::info!("listening on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
