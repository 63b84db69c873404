//! Offset pagination over a generic query builder.
//!
//! The crate turns untrusted request parameters into a bounded, ordered and
//! filtered query and packages the rows it returns into a page with
//! next/previous links that carry the request's filters and ordering.
//!
//! - [`ParamsNormalizer`] maps a raw string mapping into [`Parameters`]
//! - [`criteria::compile`] turns [`Criteria`] into builder predicates
//! - [`PaginatedRepository`] assembles and runs the page and count queries
//! - [`PaginatedResult`] holds a page and its derived links
//!
//! The query engine is supplied through the [`QuerySource`],
//! [`ExecutableQuery`] and [`NativeQueryExecutor`] traits.

pub mod criteria;
mod error;
pub mod native;
pub mod params;
pub mod query;
pub mod repository;
pub mod result;

pub use criteria::{Criteria, Criterion, DefaultCriteriaCompiler, FilterCriteria};
pub use error::{Error, Result};
pub use native::{NativeQuery, NativeQueryExecutor};
pub use params::{
   DEFAULT_PAGE, DEFAULT_PER_PAGE, DEFAULT_SORT, NormalizerConfig, PER_PAGE_UNLIMITED, Parameters,
   ParametersBuilder, ParamsNormalizer,
};
pub use query::{
   ExecutableQuery, HydrateMode, MAX_WINDOW, Predicate, QueryBuilder, QuerySource, SortDirection,
   page_offset,
};
pub use repository::{Filterable, FindByPaginatable, Paginatable, PaginatedRepository, entity_alias};
pub use result::PaginatedResult;
