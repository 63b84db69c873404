//! Offset pagination for SQLite tables.
//!
//! This crate plugs a sqlx SQLite pool into the storage-agnostic
//! [`pagination_core`]: [`SqliteQuerySource`] scopes query builders to tables
//! and runs native queries, and [`SqliteRepository`] pages over one table.
//!
//! # Example
//!
//! ```no_run
//! use paginated_repository::{
//!    Paginatable, ParamsNormalizer, SqliteQuerySource, SqliteRepository,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let source = SqliteQuerySource::connect("app.db", None).await?;
//! let users = SqliteRepository::new(source, "users");
//!
//! let params = ParamsNormalizer::default()
//!    .normalize_query("?page=2&limit=10&search=al&searchfield=name")?;
//! let page = users.find_page_by(params).await?;
//!
//! println!("{}", serde_json::to_string(&page)?);
//! # Ok(())
//! # }
//! ```

mod builders;
mod config;
mod decode;
mod error;
mod source;

pub use builders::{QueryParts, SqliteQueryBuilder};
pub use config::SqliteSourceConfig;
pub use error::{Error, Result};
pub use source::SqliteQuerySource;

pub use pagination_core;
pub use pagination_core::{
   Criteria, Criterion, DEFAULT_PAGE, DEFAULT_PER_PAGE, DEFAULT_SORT, DefaultCriteriaCompiler,
   ExecutableQuery, FilterCriteria, Filterable, FindByPaginatable, HydrateMode, NativeQuery,
   NativeQueryExecutor, NormalizerConfig, PER_PAGE_UNLIMITED, Paginatable, PaginatedRepository,
   PaginatedResult, Parameters, ParametersBuilder, ParamsNormalizer, Predicate, QueryBuilder,
   QuerySource, SortDirection, entity_alias,
};

/// A paginated repository over one SQLite table.
pub type SqliteRepository = PaginatedRepository<SqliteQuerySource>;
