use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::{OdmError, ValidationError};
use crate::logic::{Created, Odm};
use crate::model::{Collection, Document, DocumentFilter, Id, PopulateSpec};
use crate::store::traits::DocumentStore;

/// Shared request state: the ODM plus whatever seeding produced.
pub struct AppContext<S: ?Sized> {
    pub odm: Odm<S>,
    /// Showcase article served at `/`, when seeding ran.
    pub sample_article: Option<Id>,
}

pub type AppState<S> = Arc<AppContext<S>>;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationError>>,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
            details: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PopulateQuery {
    pub populate: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub populate: Option<String>,
    pub limit: Option<usize>,
    /// Comma separated identifiers.
    pub ids: Option<String>,
}

impl ListQuery {
    fn filter(&self) -> DocumentFilter {
        let mut filter = match &self.ids {
            Some(ids) => DocumentFilter::by_ids(
                ids.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string),
            ),
            None => DocumentFilter::all(),
        };
        if let Some(limit) = self.limit {
            filter = filter.limit(limit);
        }
        filter
    }
}

fn populate_spec(raw: Option<&str>) -> Option<PopulateSpec> {
    raw.map(PopulateSpec::parse).filter(|spec| !spec.is_empty())
}

fn parse_collection(name: &str) -> Result<Collection, ApiError> {
    name.parse::<Collection>().map_err(|e| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(&e.to_string())),
        )
    })
}

fn internal_error(err: OdmError) -> ApiError {
    log::error!("request failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(&err.to_string())),
    )
}

fn error_response(err: OdmError) -> ApiError {
    match err {
        OdmError::SchemaValidation(e) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
                details: Some(e.errors),
            }),
        ),
        OdmError::InvalidPopulatePath { .. } => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(&err.to_string())),
        ),
        other => internal_error(other),
    }
}

/// The seeded showcase article with its author and every embed resolved.
pub async fn get_sample_article<S: DocumentStore + ?Sized + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Json<Document>, ApiError> {
    let Some(id) = state.sample_article.as_ref() else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("No sample article has been seeded")),
        ));
    };

    let spec = PopulateSpec::parse("author sections.embeds");
    match state.odm.find_by_id(Collection::Article, id, Some(&spec)).await {
        Ok(Some(article)) => Ok(Json(article)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Sample article not found")),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn list_documents<S: DocumentStore + ?Sized + 'static>(
    State(state): State<AppState<S>>,
    Path(collection): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let collection = parse_collection(&collection)?;
    let spec = populate_spec(query.populate.as_deref());

    state
        .odm
        .find_many(collection, &query.filter(), spec.as_ref())
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn get_document<S: DocumentStore + ?Sized + 'static>(
    State(state): State<AppState<S>>,
    Path((collection, id)): Path<(String, Id)>,
    Query(query): Query<PopulateQuery>,
) -> Result<Json<Document>, ApiError> {
    let collection = parse_collection(&collection)?;
    let spec = populate_spec(query.populate.as_deref());

    match state.odm.find_by_id(collection, &id, spec.as_ref()).await {
        Ok(Some(document)) => Ok(Json(document)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(&format!("{} '{}' not found", collection, id))),
        )),
        Err(e) => Err(error_response(e)),
    }
}

/// Create one record from an object body, or many from an array body.
pub async fn create_documents<S: DocumentStore + ?Sized + 'static>(
    State(state): State<AppState<S>>,
    Path(collection): Path<String>,
    RequestJson(payload): RequestJson<Value>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let collection = parse_collection(&collection)?;

    match state.odm.create_payload(collection, &payload).await {
        Ok(created) => {
            log::info!("created {} {} record(s) over HTTP", created.len(), collection);
            Ok((StatusCode::CREATED, Json(created)))
        }
        Err(e) => Err(error_response(e)),
    }
}
