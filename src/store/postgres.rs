use anyhow::{anyhow, Context, Result};
use itertools::Itertools;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder, Row};

use crate::model::{generate_id, DocumentFilter, Id, JsonObject, ID_FIELD};
use crate::store::traits::DocumentStore;

/// Document store on PostgreSQL: one `documents` table, bodies as JSONB.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Create the documents table if it does not exist yet
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                seq BIGSERIAL PRIMARY KEY,
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create documents table")?;

        log::info!("documents table ready");
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn body_from_row(row: &sqlx::postgres::PgRow) -> Result<JsonObject> {
    let body: serde_json::Value = row.try_get("body").context("Failed to read document body")?;
    match body {
        serde_json::Value::Object(document) => Ok(document),
        other => Err(anyhow!("stored document body is not an object: {}", other)),
    }
}

#[async_trait::async_trait]
impl DocumentStore for PostgresStore {
    async fn insert_many(&self, collection: &str, documents: Vec<JsonObject>) -> Result<Vec<JsonObject>> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let mut stored = Vec::with_capacity(documents.len());

        for mut document in documents {
            let id = match document.get(ID_FIELD) {
                Some(serde_json::Value::String(id)) => id.clone(),
                Some(other) => return Err(anyhow!("{} must be a string, found {}", ID_FIELD, other)),
                None => {
                    let id = generate_id();
                    document.insert(ID_FIELD.to_string(), serde_json::Value::String(id.clone()));
                    id
                }
            };

            sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
                .bind(collection)
                .bind(&id)
                .bind(serde_json::Value::Object(document.clone()))
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to insert {} document {}", collection, id))?;

            stored.push(document);
        }

        tx.commit().await.context("Failed to commit inserts")?;
        Ok(stored)
    }

    async fn find_by_id(&self, collection: &str, id: &Id) -> Result<Option<JsonObject>> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch document")?;

        row.as_ref().map(body_from_row).transpose()
    }

    async fn find_by_ids(&self, collection: &str, ids: &[Id]) -> Result<Vec<JsonObject>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let unique: Vec<Id> = ids.iter().unique().cloned().collect();

        let rows = sqlx::query("SELECT body FROM documents WHERE collection = $1 AND id = ANY($2)")
            .bind(collection)
            .bind(&unique)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch documents by id")?;

        rows.iter().map(body_from_row).collect()
    }

    async fn find_many(&self, collection: &str, filter: &DocumentFilter) -> Result<Vec<JsonObject>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT body FROM documents WHERE collection = ");
        query.push_bind(collection);

        if let Some(ids) = &filter.ids {
            query.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
        }
        // Whole-value equality on each top-level field, as MemoryStore does.
        // Containment (`@>`) would also match supersets of arrays and objects.
        for (field, value) in &filter.equals {
            query
                .push(" AND body -> ")
                .push_bind(field.clone())
                .push(" = ")
                .push_bind(value.clone());
        }

        query.push(" ORDER BY seq");
        if let Some(limit) = filter.limit {
            query
                .push(" LIMIT ")
                .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list documents")?;

        rows.iter().map(body_from_row).collect()
    }
}
