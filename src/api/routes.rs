use axum::{routing::get, Router};

use crate::api::handlers::{self, AppState};
use crate::store::traits::DocumentStore;

pub fn create_router<S: DocumentStore + ?Sized + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Showcase article, fully populated
        .route("/", get(handlers::get_sample_article::<S>))
        // Collections
        .route(
            "/collections/:collection",
            get(handlers::list_documents::<S>).post(handlers::create_documents::<S>),
        )
        .route("/collections/:collection/:id", get(handlers::get_document::<S>))
}
