//! PostgreSQL document store
//!
//! Stores each document as JSONB in the `documents` table and evaluates filters,
//! sorting and windows in SQL. Projection runs after the fetch so both backends
//! share one implementation of it.

use super::document::{document_id, project};
use super::queries::{
    SqlBuilder, CREATE_DOCUMENTS_TABLE, CREATE_LOOKUP_INDEXES, CREATE_UNIQUE_INDEXES,
    DELETE_BY_ID, FIND_BY_ID, INSERT_DOCUMENT, REPLACE_DOCUMENT,
};
use super::{Collection, DocumentStore, FindOptions, StoreError, StoreResult};
use crate::config::DatabaseConfig;
use crate::query::Filter;
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use serde_json::Value;
use tokio_postgres::error::SqlState;
use tokio_postgres::NoTls;
use tracing::{debug, info};
use uuid::Uuid;

pub struct PgStore {
    pool: Pool,
}

/// Unique-index violations become `Duplicate`; everything else stays opaque.
fn map_pg_error(e: tokio_postgres::Error) -> StoreError {
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        let constraint = e
            .as_db_error()
            .and_then(|db| db.constraint())
            .unwrap_or("documents")
            .to_string();
        StoreError::Duplicate(constraint)
    } else {
        StoreError::Database(e)
    }
}

impl PgStore {
    /// Build the pool and verify a connection can be made
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let mut cfg = Config::new();
        cfg.host = Some(config.host.clone());
        cfg.port = Some(config.port);
        cfg.user = Some(config.user.clone());
        cfg.password = Some(config.password.clone());
        cfg.dbname = Some(config.database.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(PoolConfig::new(config.max_pool_size));

        let pool = if config.require_tls {
            let certs = rustls_native_certs::load_native_certs();
            let mut root_store = rustls::RootCertStore::empty();
            for cert in certs.certs {
                root_store.add(cert).ok();
            }

            let tls_config = rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth();

            let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
            cfg.create_pool(Some(Runtime::Tokio1), tls)
        } else {
            cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        }
        .map_err(|e| StoreError::Backend(format!("Failed to create pool: {}", e)))?;

        let client = pool.get().await?;
        client.query_one("SELECT 1", &[]).await?;
        drop(client);

        info!(
            "Database connection established ({}:{}/{}, TLS: {})",
            config.host, config.port, config.database, config.require_tls
        );

        Ok(Self { pool })
    }

    /// Create the documents table and its indexes if they don't exist
    pub async fn migrate(&self) -> StoreResult<()> {
        let client = self.pool.get().await?;

        client.execute(CREATE_DOCUMENTS_TABLE, &[]).await?;
        for statement in CREATE_UNIQUE_INDEXES.iter().chain(CREATE_LOOKUP_INDEXES.iter()) {
            client.execute(*statement, &[]).await?;
        }

        info!("Document tables initialized");
        Ok(())
    }

    fn require_id(doc: &Value) -> StoreResult<Uuid> {
        document_id(doc)
            .ok_or_else(|| StoreError::Backend("document is missing a valid id".to_string()))
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn find(&self, collection: Collection, options: &FindOptions) -> StoreResult<Vec<Value>> {
        let (sql, builder) = SqlBuilder::select(
            collection,
            &options.filter,
            &options.sort,
            options.skip,
            options.limit,
        );
        debug!("find {}: {}", collection, sql);

        let client = self.pool.get().await?;
        let rows = client.query(&sql, &builder.params()).await.map_err(map_pg_error)?;

        Ok(rows
            .iter()
            .map(|row| {
                let body: Value = row.get("body");
                match &options.projection {
                    Some(fields) => project(&body, fields),
                    None => body,
                }
            })
            .collect())
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<u64> {
        let (sql, builder) = SqlBuilder::count(collection, filter);
        let client = self.pool.get().await?;
        let row = client.query_one(&sql, &builder.params()).await.map_err(map_pg_error)?;
        let count: i64 = row.get(0);
        Ok(count.max(0) as u64)
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> StoreResult<Option<Value>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(FIND_BY_ID, &[&collection.as_str(), &id])
            .await
            .map_err(map_pg_error)?;
        Ok(row.map(|r| r.get("body")))
    }

    async fn find_one(&self, collection: Collection, filter: &Filter) -> StoreResult<Option<Value>> {
        let options = FindOptions::new(filter.clone()).window(0, 1);
        Ok(self.find(collection, &options).await?.into_iter().next())
    }

    async fn insert(&self, collection: Collection, doc: Value) -> StoreResult<Value> {
        let id = Self::require_id(&doc)?;
        let client = self.pool.get().await?;
        let row = client
            .query_one(INSERT_DOCUMENT, &[&collection.as_str(), &id, &doc])
            .await
            .map_err(map_pg_error)?;
        Ok(row.get("body"))
    }

    async fn replace(&self, collection: Collection, doc: Value) -> StoreResult<Option<Value>> {
        let id = Self::require_id(&doc)?;
        let client = self.pool.get().await?;
        let row = client
            .query_opt(REPLACE_DOCUMENT, &[&collection.as_str(), &id, &doc])
            .await
            .map_err(map_pg_error)?;
        Ok(row.map(|r| r.get("body")))
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> StoreResult<bool> {
        let client = self.pool.get().await?;
        let affected = client
            .execute(DELETE_BY_ID, &[&collection.as_str(), &id])
            .await
            .map_err(map_pg_error)?;
        Ok(affected > 0)
    }

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> StoreResult<u64> {
        let (sql, builder) = SqlBuilder::delete(collection, filter);
        let client = self.pool.get().await?;
        let affected = client.execute(&sql, &builder.params()).await.map_err(map_pg_error)?;
        Ok(affected)
    }
}
