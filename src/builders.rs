//! SQL rendering and execution for builder queries.

use indexmap::IndexMap;
use pagination_core::criteria::is_valid_field_name;
use pagination_core::{
   ExecutableQuery, HydrateMode, MAX_WINDOW, Predicate, QueryBuilder, SortDirection,
};
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Executor, Pool, Row, Sqlite};
use tracing::trace;

use crate::Result;
use crate::decode::hydrate_rows;

/// The pieces of a single-table SELECT, rendered with `$N` placeholders.
///
/// Bound values are keyed by name. An equality condition reuses a slot only
/// when both the parameter name and the value match; a name already bound to
/// another value gets a fresh slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParts {
   table: String,
   alias: String,
   index_by: Option<String>,
   conditions: Vec<String>,
   binds: IndexMap<String, JsonValue>,
   orders: Vec<(String, SortDirection)>,
   offset: u64,
   limit: Option<u64>,
}

impl QueryParts {
   pub fn new(table: &str, alias: &str, index_by: Option<&str>) -> Self {
      Self {
         table: table.to_string(),
         alias: alias.to_string(),
         index_by: index_by.filter(|column| is_valid_field_name(column)).map(str::to_string),
         ..Default::default()
      }
   }

   pub fn alias(&self) -> &str {
      &self.alias
   }

   /// Render and record a predicate.
   pub fn push_predicate(&mut self, predicate: Predicate) {
      let condition = match predicate {
         Predicate::IsNull { field } => format!("{field} IS NULL"),
         Predicate::ILikePrefix { field, pattern } => {
            let placeholder = self.bind_anonymous(JsonValue::String(pattern));
            format!("LOWER({field}) LIKE {placeholder}")
         }
         Predicate::In { values, .. } if values.is_empty() => "0 = 1".to_string(),
         Predicate::In { field, values } => {
            let placeholders: Vec<String> =
               values.into_iter().map(|value| self.bind_anonymous(value)).collect();
            format!("{field} IN ({})", placeholders.join(", "))
         }
         Predicate::Eq { field, parameter, value } => {
            let placeholder = self.bind(parameter, value);
            format!("{field} = {placeholder}")
         }
      };
      self.conditions.push(condition);
   }

   pub fn push_order(&mut self, expression: String, direction: SortDirection) {
      self.orders.push((expression, direction));
   }

   /// Capped at `i64::MAX`, the largest literal SQLite accepts.
   pub fn set_offset(&mut self, offset: u64) {
      self.offset = offset.min(MAX_WINDOW);
   }

   /// Capped at `i64::MAX`.
   pub fn set_limit(&mut self, limit: u64) {
      self.limit = Some(limit.min(MAX_WINDOW));
   }

   /// Values for the `$N` placeholders, in order.
   pub fn bind_values(&self) -> Vec<JsonValue> {
      self.binds.values().cloned().collect()
   }

   /// The page query.
   pub fn select_sql(&self) -> String {
      let mut sql = format!("SELECT {}.* FROM {}", self.alias, self.from_clause());
      self.push_where(&mut sql);

      let mut orders: Vec<String> = self
         .orders
         .iter()
         .map(|(expression, direction)| format!("{expression} {direction}"))
         .collect();
      if let Some(column) = &self.index_by {
         orders.push(format!("{}.{column} ASC", self.alias));
      }
      if !orders.is_empty() {
         sql.push_str(" ORDER BY ");
         sql.push_str(&orders.join(", "));
      }

      match (self.limit, self.offset) {
         (Some(limit), 0) => sql.push_str(&format!(" LIMIT {limit}")),
         (Some(limit), offset) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
         // SQLite needs a LIMIT before OFFSET; -1 means no limit
         (None, 0) => {}
         (None, offset) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
      }

      sql
   }

   /// `COUNT(*)` over the same conditions, without order or window.
   pub fn count_sql(&self) -> String {
      let mut sql = format!("SELECT COUNT(*) AS count FROM {}", self.from_clause());
      self.push_where(&mut sql);
      sql
   }

   fn from_clause(&self) -> String {
      let table = self
         .table
         .split('.')
         .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
         .collect::<Vec<_>>()
         .join(".");
      format!("{table} AS {}", self.alias)
   }

   fn push_where(&self, sql: &mut String) {
      if !self.conditions.is_empty() {
         sql.push_str(" WHERE ");
         sql.push_str(&self.conditions.join(" AND "));
      }
   }

   fn bind(&mut self, name: String, value: JsonValue) -> String {
      if let Some((index, _, bound)) = self.binds.get_full(&name)
         && *bound == value
      {
         return format!("${}", index + 1);
      }

      let name = if self.binds.contains_key(&name) {
         format!("{name}_{}", self.binds.len())
      } else {
         name
      };
      let (index, _) = self.binds.insert_full(name, value);
      format!("${}", index + 1)
   }

   fn bind_anonymous(&mut self, value: JsonValue) -> String {
      let name = format!("_{}", self.binds.len());
      self.bind(name, value)
   }
}

/// A query against one SQLite table.
#[derive(Debug, Clone)]
pub struct SqliteQueryBuilder {
   pool: Pool<Sqlite>,
   parts: QueryParts,
}

impl SqliteQueryBuilder {
   pub(crate) fn new(pool: Pool<Sqlite>, parts: QueryParts) -> Self {
      Self { pool, parts }
   }

   pub fn parts(&self) -> &QueryParts {
      &self.parts
   }
}

impl QueryBuilder for SqliteQueryBuilder {
   fn alias(&self) -> &str {
      self.parts.alias()
   }

   fn and_where(&mut self, predicate: Predicate) {
      self.parts.push_predicate(predicate);
   }

   fn add_order_by(&mut self, expression: String, direction: SortDirection) {
      self.parts.push_order(expression, direction);
   }

   fn set_first_result(&mut self, offset: u64) {
      self.parts.set_offset(offset);
   }

   fn set_max_results(&mut self, limit: u64) {
      self.parts.set_limit(limit);
   }
}

impl ExecutableQuery for SqliteQueryBuilder {
   type Row = JsonValue;

   async fn get_result(self, mode: HydrateMode) -> pagination_core::Result<Vec<JsonValue>> {
      let sql = self.parts.select_sql();
      let rows = fetch_all(&self.pool, &sql, self.parts.bind_values()).await?;
      Ok(hydrate_rows(&rows, mode)?)
   }

   async fn get_single_scalar_result(self) -> pagination_core::Result<i64> {
      let sql = self.parts.count_sql();
      let rows = fetch_all(&self.pool, &sql, self.parts.bind_values()).await?;
      single_scalar(&rows)
   }
}

/// The first column of the only row, as an integer.
pub(crate) fn single_scalar(rows: &[SqliteRow]) -> pagination_core::Result<i64> {
   match rows {
      [] => Err(pagination_core::Error::NoResult),
      [row] => Ok(row.try_get::<i64, _>(0).map_err(crate::Error::from)?),
      rows => Err(pagination_core::Error::NonUniqueResult(rows.len())),
   }
}

/// Run `sql` with `values` bound in order.
pub(crate) async fn fetch_all(
   pool: &Pool<Sqlite>,
   sql: &str,
   values: Vec<JsonValue>,
) -> Result<Vec<SqliteRow>> {
   trace!(sql = %sql, binds = values.len(), "Executing query");

   let mut query = sqlx::query(sql);
   for value in values {
      query = bind_value(query, value);
   }

   Ok(pool.fetch_all(query).await?)
}

/// Bind a JSON value to a SQLx query
fn bind_value<'a>(
   query: sqlx::query::Query<'a, Sqlite, SqliteArguments<'a>>,
   value: JsonValue,
) -> sqlx::query::Query<'a, Sqlite, SqliteArguments<'a>> {
   match value {
      JsonValue::Null => query.bind(None::<JsonValue>),
      JsonValue::String(text) => query.bind(text),
      JsonValue::Bool(flag) => query.bind(flag),
      JsonValue::Number(number) => {
         // Preserve integer precision by binding as i64 when possible
         match number.as_i64() {
            Some(int_val) => query.bind(int_val),
            // Beyond i64 or fractional: bind as f64 (may lose precision)
            None => query.bind(number.as_f64().unwrap_or_default()),
         }
      }
      other => query.bind(other),
   }
}
