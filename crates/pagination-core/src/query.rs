//! Query-builder capability consumed by the assembler and the criteria
//! compiler.
//!
//! The traits here describe the narrow surface this crate needs from a query
//! engine: scoping a builder to an entity, adding AND-connected predicates and
//! ORDER BY clauses, bounding the result window, and executing either for rows
//! or for a single scalar count.
//!
//! [`QueryBuilder`] is object-safe so that custom filter strategies can work
//! against `&mut dyn QueryBuilder` without knowing the backend.

use std::fmt;
use std::future::Future;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::Result;

/// Sort direction for an ORDER BY clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
   /// Ascending order (smallest first)
   #[default]
   Asc,
   /// Descending order (largest first)
   Desc,
}

impl SortDirection {
   /// Interpret a `sort` request value. Only `DESC`, in any case, sorts
   /// descending.
   pub fn from_param(value: &str) -> Self {
      if value.trim().eq_ignore_ascii_case("DESC") {
         SortDirection::Desc
      } else {
         SortDirection::Asc
      }
   }

   /// SQL keyword for this direction.
   pub fn as_sql(self) -> &'static str {
      match self {
         SortDirection::Asc => "ASC",
         SortDirection::Desc => "DESC",
      }
   }
}

impl fmt::Display for SortDirection {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_sql())
   }
}

/// Shape in which the query executor returns result rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HydrateMode {
   /// One object per row, keyed by column name in select order
   #[default]
   Object,
   /// One array per row holding the column values in select order
   Array,
   /// The first column of each row
   Scalar,
}

/// A single AND-connected condition.
///
/// `field` is always qualified with the builder's alias (e.g. `u.name`).
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
   /// `field IS NULL`
   IsNull { field: String },
   /// Case-insensitive `LIKE` of the lower-cased field against `pattern`,
   /// which is already lower-cased and carries its trailing `%`.
   ///
   /// Only ASCII letters are folded, matching SQL `LOWER()` on engines such
   /// as SQLite. Non-ASCII letters compare case-sensitively.
   ILikePrefix { field: String, pattern: String },
   /// `field IN (values...)`
   In {
      field: String,
      values: Vec<JsonValue>,
   },
   /// `field = :parameter`, with `value` bound under `parameter`
   Eq {
      field: String,
      parameter: String,
      value: JsonValue,
   },
}

/// Builder-style access to a query scoped to one entity.
pub trait QueryBuilder {
   /// Alias qualifying field references of the scoped entity.
   fn alias(&self) -> &str;

   /// Add an AND-connected predicate.
   fn and_where(&mut self, predicate: Predicate);

   /// Append an ORDER BY clause. `expression` is emitted verbatim.
   fn add_order_by(&mut self, expression: String, direction: SortDirection);

   /// Number of rows to skip.
   fn set_first_result(&mut self, offset: u64);

   /// Maximum number of rows to return.
   fn set_max_results(&mut self, limit: u64);
}

/// A query builder that can be executed.
pub trait ExecutableQuery: QueryBuilder + Send {
   /// Row type produced by [`ExecutableQuery::get_result`].
   type Row: Send;

   /// Execute the query and return its rows in the given hydration mode.
   fn get_result(self, mode: HydrateMode) -> impl Future<Output = Result<Vec<Self::Row>>> + Send;

   /// Execute `COUNT(*)` over the same predicates, ignoring ordering and the
   /// result window.
   ///
   /// Reports [`Error::NoResult`](crate::Error::NoResult) or
   /// [`Error::NonUniqueResult`](crate::Error::NonUniqueResult) when the
   /// engine does not produce exactly one row.
   fn get_single_scalar_result(self) -> impl Future<Output = Result<i64>> + Send;
}

/// Entry point of a query engine: creates builders scoped to an entity.
pub trait QuerySource: Send + Sync {
   type Builder: ExecutableQuery;

   /// Create a builder selecting from `entity` under `alias`.
   ///
   /// `index_by` names a column that uniquely identifies rows.
   fn create_query_builder(
      &self,
      entity: &str,
      alias: &str,
      index_by: Option<&str>,
   ) -> Self::Builder;
}

fn plain_field_pattern() -> &'static Regex {
   static RE: OnceLock<Regex> = OnceLock::new();
   RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("invalid regex"))
}

fn qualified_path_pattern() -> &'static Regex {
   static RE: OnceLock<Regex> = OnceLock::new();
   RE.get_or_init(|| {
      Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)+$").expect("invalid regex")
   })
}

/// Largest offset or limit an engine accepts as a signed 64-bit literal.
pub const MAX_WINDOW: u64 = i64::MAX as u64;

/// Rows to skip before `page`, capped at [`MAX_WINDOW`].
pub fn page_offset(page: u64, per_page: u64) -> u64 {
   page.saturating_sub(1).saturating_mul(per_page).min(MAX_WINDOW)
}

/// Resolve an order field into the expression handed to the builder.
///
/// Plain names are qualified with `alias`. Dotted identifier paths are taken
/// as already qualified and passed through. A field equal to one of
/// `raw_expressions` is passed through verbatim. Anything else yields `None`.
pub fn order_expression(field: &str, alias: &str, raw_expressions: &[String]) -> Option<String> {
   if plain_field_pattern().is_match(field) {
      Some(format!("{alias}.{field}"))
   } else if qualified_path_pattern().is_match(field)
      || raw_expressions.iter().any(|raw| raw == field)
   {
      Some(field.to_string())
   } else {
      None
   }
}

/// Apply every `(field, direction)` pair to the builder, in order.
pub fn add_order(
   builder: &mut dyn QueryBuilder,
   order_by: &[(String, SortDirection)],
   raw_expressions: &[String],
) {
   let alias = builder.alias().to_string();
   for (field, direction) in order_by {
      match order_expression(field, &alias, raw_expressions) {
         Some(expression) => builder.add_order_by(expression, *direction),
         None => warn!(field = %field, "Skipping order field that is not a valid identifier"),
      }
   }
}
