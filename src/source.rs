use std::path::Path;

use pagination_core::{HydrateMode, NativeQuery, NativeQueryExecutor, QuerySource};
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::debug;

use crate::Result;
use crate::builders::{QueryParts, SqliteQueryBuilder, fetch_all, single_scalar};
use crate::config::SqliteSourceConfig;
use crate::decode::hydrate_rows;

/// Query source over a SQLite connection pool.
///
/// Entities are table names. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct SqliteQuerySource {
   pool: Pool<Sqlite>,
}

impl SqliteQuerySource {
   /// Use an existing pool.
   pub fn new(pool: Pool<Sqlite>) -> Self {
      Self { pool }
   }

   /// Open (creating if missing) the database file at `path`.
   pub async fn connect(
      path: impl AsRef<Path>,
      custom_config: Option<SqliteSourceConfig>,
   ) -> Result<Self> {
      let path = path.as_ref();
      let config = custom_config.unwrap_or_default();

      if let Some(parent) = path.parent()
         && !parent.as_os_str().is_empty()
      {
         tokio::fs::create_dir_all(parent).await?;
      }

      let options = SqliteConnectOptions::new().filename(path).create_if_missing(true);
      let pool = SqlitePoolOptions::new()
         .max_connections(config.max_connections)
         .idle_timeout(config.idle_timeout)
         .connect_with(options)
         .await?;

      debug!(
         path = %path.display(),
         max_connections = config.max_connections,
         "Opened SQLite query source"
      );

      Ok(Self { pool })
   }

   pub fn pool(&self) -> &Pool<Sqlite> {
      &self.pool
   }

   /// Close every pooled connection.
   pub async fn close(&self) {
      self.pool.close().await;
   }
}

impl QuerySource for SqliteQuerySource {
   type Builder = SqliteQueryBuilder;

   fn create_query_builder(
      &self,
      entity: &str,
      alias: &str,
      index_by: Option<&str>,
   ) -> SqliteQueryBuilder {
      SqliteQueryBuilder::new(self.pool.clone(), QueryParts::new(entity, alias, index_by))
   }
}

impl NativeQueryExecutor for SqliteQuerySource {
   async fn fetch_array(&self, query: &NativeQuery) -> pagination_core::Result<Vec<JsonValue>> {
      let rows = fetch_all(&self.pool, query.sql(), query.parameters().to_vec()).await?;
      Ok(hydrate_rows(&rows, HydrateMode::Array)?)
   }

   async fn fetch_single_scalar(&self, query: &NativeQuery) -> pagination_core::Result<i64> {
      let rows = fetch_all(&self.pool, query.sql(), query.parameters().to_vec()).await?;
      single_scalar(&rows)
   }
}
