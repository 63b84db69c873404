//! Raw SQL queries that bypass the query builder.
//!
//! Results of a native query can be fed back into the assembler through
//! [`Parameters`](crate::Parameters)' result and count overrides.

use std::future::Future;

use serde_json::Value as JsonValue;

use crate::Result;
use crate::query::page_offset;

/// Caller-provided SQL text with its positional bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeQuery {
   sql: String,
   parameters: Vec<JsonValue>,
}

impl NativeQuery {
   pub fn new(sql: impl Into<String>, parameters: Vec<JsonValue>) -> Self {
      Self {
         sql: sql.into(),
         parameters,
      }
   }

   pub fn sql(&self) -> &str {
      &self.sql
   }

   pub fn parameters(&self) -> &[JsonValue] {
      &self.parameters
   }

   /// The same query restricted to one page.
   ///
   /// A non-positive `per_page` leaves the query unbounded.
   pub fn paginated(&self, page: u64, per_page: i64) -> NativeQuery {
      if per_page <= 0 {
         return self.clone();
      }

      let limit = per_page as u64;
      let offset = page_offset(page, limit);
      NativeQuery {
         sql: format!("{} LIMIT {limit} OFFSET {offset}", self.body()),
         parameters: self.parameters.clone(),
      }
   }

   /// `COUNT(*)` over the query wrapped as a subquery, reusing its parameters.
   pub fn count_query(&self) -> NativeQuery {
      NativeQuery {
         sql: format!("SELECT COUNT(*) AS count FROM ({}) AS item", self.body()),
         parameters: self.parameters.clone(),
      }
   }

   fn body(&self) -> &str {
      self.sql.trim().trim_end_matches(';').trim_end()
   }
}

/// Executes [`NativeQuery`] values.
pub trait NativeQueryExecutor: Send + Sync {
   /// Rows as JSON arrays of column values, in select order.
   fn fetch_array(
      &self,
      query: &NativeQuery,
   ) -> impl Future<Output = Result<Vec<JsonValue>>> + Send;

   /// The first column of the only row.
   ///
   /// Reports [`Error::NoResult`](crate::Error::NoResult) or
   /// [`Error::NonUniqueResult`](crate::Error::NonUniqueResult) otherwise.
   fn fetch_single_scalar(&self, query: &NativeQuery) -> impl Future<Output = Result<i64>> + Send;
}
