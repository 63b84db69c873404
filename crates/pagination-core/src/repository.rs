//! The query assembler: a repository that turns [`Parameters`] into a
//! [`PaginatedResult`].
//!
//! [`PaginatedRepository`] composes a [`QuerySource`], the entity it pages
//! over, and the criteria strategy. Its capabilities are split across
//! [`Filterable`], [`Paginatable`] and [`FindByPaginatable`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::Result;
use crate::criteria::{Criteria, DefaultCriteriaCompiler, FilterCriteria};
use crate::native::{NativeQuery, NativeQueryExecutor};
use crate::params::{PER_PAGE_UNLIMITED, Parameters};
use crate::query::{
   ExecutableQuery, QueryBuilder, QuerySource, SortDirection, add_order, page_offset,
};
use crate::result::PaginatedResult;

/// Applies criteria to a query builder.
pub trait Filterable {
   fn process_criteria(&self, builder: &mut dyn QueryBuilder, criteria: &Criteria);
}

/// Page and count queries over one entity.
pub trait Paginatable: Send + Sync {
   type Row: Send;

   /// Fetch the page described by `params`.
   fn find_page_by(
      &self,
      params: Parameters<Self::Row>,
   ) -> impl Future<Output = Result<PaginatedResult<Self::Row>>> + Send;

   /// Same as [`find_page_by`](Self::find_page_by), for callers holding
   /// parameters mapped from a request.
   fn find_page_with_params(
      &self,
      params: Parameters<Self::Row>,
   ) -> impl Future<Output = Result<PaginatedResult<Self::Row>>> + Send {
      self.find_page_by(params)
   }

   /// Count rows matching `criteria`.
   ///
   /// A count query that yields no row or several rows counts as 0.
   fn count_by(&self, criteria: &Criteria) -> impl Future<Output = Result<i64>> + Send;
}

/// Finder taking a limit and offset instead of a page number.
pub trait FindByPaginatable: Paginatable {
   /// Fetch rows by criteria with an optional ordering and window.
   ///
   /// The page is `ceil(offset / limit) + 1` when both are given and `limit`
   /// is positive, otherwise 1. Without a positive `limit` every row is
   /// returned.
   fn find_by_paginate(
      &self,
      criteria: Criteria,
      order_by: Option<(String, SortDirection)>,
      limit: Option<i64>,
      offset: Option<u64>,
   ) -> impl Future<Output = Result<PaginatedResult<Self::Row>>> + Send {
      let (page, per_page) = match (limit, offset) {
         (Some(limit), Some(offset)) if limit > 0 => (offset.div_ceil(limit as u64) + 1, limit),
         (Some(limit), None) if limit > 0 => (1, limit),
         _ => (1, PER_PAGE_UNLIMITED),
      };

      let mut builder = Parameters::builder().page(page).per_page(per_page).criteria(criteria);
      if let Some((field, direction)) = order_by {
         builder = builder.order(field).sort(direction.as_sql());
      }

      self.find_page_by(builder.build())
   }
}

/// Alias for an entity: the lower-cased first letter of its simple name.
///
/// The simple name follows the last `\`, `:` or `.`. Names that do not start
/// with an ASCII letter use `e`.
pub fn entity_alias(entity: &str) -> String {
   let simple = entity.rsplit(['\\', ':', '.']).next().unwrap_or(entity);
   match simple.chars().next() {
      Some(first) if first.is_ascii_alphabetic() => first.to_ascii_lowercase().to_string(),
      _ => "e".to_string(),
   }
}

/// Paginated access to one entity of a [`QuerySource`].
///
/// # Example
///
/// ```ignore
/// let users = PaginatedRepository::new(source, "users");
/// let params = ParamsNormalizer::default().normalize_query("?page=2&limit=10")?;
/// let page = users.find_page_by(params).await?;
/// ```
pub struct PaginatedRepository<S> {
   source: S,
   entity: String,
   alias: String,
   index_by: Option<String>,
   raw_order_expressions: Vec<String>,
   filter: Arc<dyn FilterCriteria>,
}

impl<S: QuerySource> PaginatedRepository<S> {
   /// Page over `entity` with the default criteria rules.
   pub fn new(source: S, entity: impl Into<String>) -> Self {
      let entity = entity.into();
      Self {
         source,
         alias: entity_alias(&entity),
         entity,
         index_by: None,
         raw_order_expressions: Vec::new(),
         filter: Arc::new(DefaultCriteriaCompiler),
      }
   }

   /// Replace the criteria rules with a custom strategy.
   pub fn with_filter(mut self, filter: impl FilterCriteria + 'static) -> Self {
      self.filter = Arc::new(filter);
      self
   }

   /// Column uniquely identifying rows of the entity.
   pub fn with_index_by(mut self, column: impl Into<String>) -> Self {
      self.index_by = Some(column.into());
      self
   }

   /// Accept these exact order values as raw SQL expressions.
   ///
   /// Order values that are neither plain nor dotted identifiers are dropped
   /// unless registered here, e.g. `LOWER(u.name)`.
   pub fn with_raw_order_expressions<I, E>(mut self, expressions: I) -> Self
   where
      I: IntoIterator<Item = E>,
      E: Into<String>,
   {
      self.raw_order_expressions.extend(expressions.into_iter().map(Into::into));
      self
   }

   pub fn source(&self) -> &S {
      &self.source
   }

   pub fn entity(&self) -> &str {
      &self.entity
   }

   pub fn alias(&self) -> &str {
      &self.alias
   }

   pub fn index_by(&self) -> Option<&str> {
      self.index_by.as_deref()
   }

   /// A builder scoped to the entity with `order_by` and `criteria` applied.
   pub fn create_paginated_query_builder(
      &self,
      criteria: &Criteria,
      order_by: &[(String, SortDirection)],
   ) -> S::Builder {
      let mut builder = self
         .source
         .create_query_builder(&self.entity, &self.alias, self.index_by.as_deref());

      add_order(&mut builder, order_by, &self.raw_order_expressions);
      self.process_criteria(&mut builder, criteria);
      builder
   }
}

impl<S: QuerySource + NativeQueryExecutor> PaginatedRepository<S> {
   /// Count the rows of a native query.
   ///
   /// Unlike [`Paginatable::count_by`], count anomalies are returned as errors.
   pub async fn count_sql(&self, query: &NativeQuery) -> Result<i64> {
      self.source.fetch_single_scalar(&query.count_query()).await
   }

   /// Fetch one page of a native query as array rows.
   pub async fn manage_sql_params(
      &self,
      query: &NativeQuery,
      page: u64,
      per_page: i64,
   ) -> Result<Vec<JsonValue>> {
      self.source.fetch_array(&query.paginated(page, per_page)).await
   }
}

impl<S: QuerySource> Filterable for PaginatedRepository<S> {
   fn process_criteria(&self, builder: &mut dyn QueryBuilder, criteria: &Criteria) {
      self.filter.build_filter_criteria(builder, criteria);
   }
}

impl<S: QuerySource> Paginatable for PaginatedRepository<S> {
   type Row = <S::Builder as ExecutableQuery>::Row;

   async fn find_page_by(
      &self,
      mut params: Parameters<Self::Row>,
   ) -> Result<PaginatedResult<Self::Row>> {
      let criteria = params.criteria();
      let order_by = params.order_by();
      let page = params.page();
      let per_page = params.per_page();

      let rows = match params.take_result_override() {
         Some(rows) => rows,
         None => {
            let mut builder = self.create_paginated_query_builder(&criteria, &order_by);
            if per_page > 0 {
               let limit = per_page as u64;
               builder.set_first_result(page_offset(page, limit));
               builder.set_max_results(limit);
            }
            builder.get_result(params.hydrate_mode()).await?
         }
      };

      let fetched = i64::try_from(rows.len()).unwrap_or(i64::MAX);
      let total = match params.count_override() {
         Some(total) => total,
         None if per_page <= 0 => -1,
         None if page == 1 && fetched < per_page => {
            debug!(
               entity = %self.entity,
               total = fetched,
               "Partial first page, skipping count query"
            );
            fetched
         }
         None => self.count_by(&criteria).await?,
      };

      PaginatedResult::new(Some(rows), page, per_page, total, &criteria, &order_by)
   }

   async fn count_by(&self, criteria: &Criteria) -> Result<i64> {
      let builder = self.create_paginated_query_builder(criteria, &[]);

      match builder.get_single_scalar_result().await {
         Ok(total) => Ok(total),
         Err(err) if err.is_scalar_anomaly() => {
            warn!(entity = %self.entity, error = %err, "Count query anomaly, using 0");
            Ok(0)
         }
         Err(err) => Err(err),
      }
   }
}

impl<S: QuerySource> FindByPaginatable for PaginatedRepository<S> {}

impl<S: Clone> Clone for PaginatedRepository<S> {
   fn clone(&self) -> Self {
      Self {
         source: self.source.clone(),
         entity: self.entity.clone(),
         alias: self.alias.clone(),
         index_by: self.index_by.clone(),
         raw_order_expressions: self.raw_order_expressions.clone(),
         filter: Arc::clone(&self.filter),
      }
   }
}

impl<S> fmt::Debug for PaginatedRepository<S> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("PaginatedRepository")
         .field("entity", &self.entity)
         .field("alias", &self.alias)
         .field("index_by", &self.index_by)
         .finish_non_exhaustive()
   }
}
