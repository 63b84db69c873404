//! Request parameter normalization.
//!
//! [`ParamsNormalizer`] turns an untrusted string mapping (typically a decoded
//! query string) into a [`Parameters`] value with safe bounds. Malformed input
//! never fails: unparsable or out-of-range values resolve to the configured
//! defaults.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::criteria::{Criteria, Criterion};
use crate::query::{HydrateMode, SortDirection};
use crate::{Error, Result};

/// Page used when the request names none, or an invalid one.
pub const DEFAULT_PAGE: u64 = 1;

/// Page size used when the request names none, or an invalid one.
pub const DEFAULT_PER_PAGE: i64 = 20;

/// Sort direction used when the request names none.
pub const DEFAULT_SORT: &str = "ASC";

/// Page size meaning "return every row".
pub const PER_PAGE_UNLIMITED: i64 = -1;

/// Value a client sends for a parameter it has no value for.
const UNDEFINED: &str = "undefined";

/// Pagination, ordering and filter intent for one request.
///
/// `R` is the row type of a caller-supplied [`result_override`](Self::result_override).
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters<R = serde_json::Value> {
   page: u64,
   per_page: i64,
   sort: String,
   order: String,
   search: String,
   search_field: String,
   criteria: Criteria,
   count_override: Option<i64>,
   result_override: Option<Vec<R>>,
   hydrate_mode: HydrateMode,
   raw: IndexMap<String, String>,
}

impl<R> Default for Parameters<R> {
   fn default() -> Self {
      Self {
         page: DEFAULT_PAGE,
         per_page: DEFAULT_PER_PAGE,
         sort: DEFAULT_SORT.to_string(),
         order: String::new(),
         search: String::new(),
         search_field: String::new(),
         criteria: Criteria::default(),
         count_override: None,
         result_override: None,
         hydrate_mode: HydrateMode::default(),
         raw: IndexMap::new(),
      }
   }
}

impl<R> Parameters<R> {
   /// Start building parameters from the defaults.
   pub fn builder() -> ParametersBuilder<R> {
      ParametersBuilder {
         params: Self::default(),
      }
   }

   /// Continue building from these parameters.
   pub fn into_builder(self) -> ParametersBuilder<R> {
      ParametersBuilder { params: self }
   }

   pub fn page(&self) -> u64 {
      self.page
   }

   pub fn per_page(&self) -> i64 {
      self.per_page
   }

   pub fn sort(&self) -> &str {
      &self.sort
   }

   pub fn order(&self) -> &str {
      &self.order
   }

   pub fn search(&self) -> &str {
      &self.search
   }

   pub fn search_field(&self) -> &str {
      &self.search_field
   }

   pub fn count_override(&self) -> Option<i64> {
      self.count_override
   }

   pub fn result_override(&self) -> Option<&[R]> {
      self.result_override.as_deref()
   }

   pub fn hydrate_mode(&self) -> HydrateMode {
      self.hydrate_mode
   }

   /// The raw request mapping these parameters were normalized from, in
   /// request order. Empty for parameters built directly.
   pub fn raw(&self) -> &IndexMap<String, String> {
      &self.raw
   }

   /// Criteria exactly as stored, without the search fold.
   pub fn stored_criteria(&self) -> &Criteria {
      &self.criteria
   }

   /// Effective criteria.
   ///
   /// When both `search` and `search_field` are non-empty, a case-insensitive
   /// prefix match of `search` on `search_field` is folded in. An existing
   /// entry for that field is replaced in place. The stored criteria are left
   /// untouched.
   pub fn criteria(&self) -> Criteria {
      let mut criteria = self.criteria.clone();
      if !self.search.is_empty() && !self.search_field.is_empty() {
         criteria.insert(self.search_field.clone(), Criterion::Like(self.search.clone()));
      }
      criteria
   }

   /// Requested ordering: one entry when both `order` (the field) and `sort`
   /// (the direction) are non-empty.
   pub fn order_by(&self) -> Vec<(String, SortDirection)> {
      if self.order.is_empty() || self.sort.is_empty() {
         return Vec::new();
      }
      vec![(self.order.clone(), SortDirection::from_param(&self.sort))]
   }

   /// Remove and return the materialized result, if any.
   pub fn take_result_override(&mut self) -> Option<Vec<R>> {
      self.result_override.take()
   }
}

/// Builder for [`Parameters`].
///
/// # Example
///
/// ```
/// use pagination_core::{Criteria, Parameters};
///
/// let params: Parameters = Parameters::builder()
///    .page(2)
///    .per_page(50)
///    .order("created_at")
///    .sort("DESC")
///    .criteria(Criteria::new().eq("status", "active"))
///    .build();
///
/// assert_eq!(params.page(), 2);
/// assert_eq!(params.order_by().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ParametersBuilder<R = serde_json::Value> {
   params: Parameters<R>,
}

impl<R> ParametersBuilder<R> {
   /// Page number, starting at 1. Zero is raised to 1.
   pub fn page(mut self, page: u64) -> Self {
      self.params.page = page.max(1);
      self
   }

   /// Rows per page, or [`PER_PAGE_UNLIMITED`].
   pub fn per_page(mut self, per_page: i64) -> Self {
      self.params.per_page = per_page;
      self
   }

   /// Sort direction, `ASC` or `DESC`.
   pub fn sort(mut self, sort: impl Into<String>) -> Self {
      self.params.sort = sort.into();
      self
   }

   /// Field to order by.
   pub fn order(mut self, order: impl Into<String>) -> Self {
      self.params.order = order.into();
      self
   }

   pub fn search(mut self, search: impl Into<String>) -> Self {
      self.params.search = search.into();
      self
   }

   pub fn search_field(mut self, search_field: impl Into<String>) -> Self {
      self.params.search_field = search_field.into();
      self
   }

   pub fn criteria(mut self, criteria: Criteria) -> Self {
      self.params.criteria = criteria;
      self
   }

   /// Use this total instead of issuing a COUNT query.
   pub fn count_override(mut self, total: i64) -> Self {
      self.params.count_override = Some(total);
      self
   }

   /// Use these rows instead of executing the select.
   pub fn result_override(mut self, rows: Vec<R>) -> Self {
      self.params.result_override = Some(rows);
      self
   }

   pub fn hydrate_mode(mut self, mode: HydrateMode) -> Self {
      self.params.hydrate_mode = mode;
      self
   }

   pub fn build(self) -> Parameters<R> {
      self.params
   }
}

/// Defaults and allow-list applied by [`ParamsNormalizer`].
///
/// # Example
///
/// ```
/// use pagination_core::NormalizerConfig;
///
/// let config = NormalizerConfig {
///    default_per_page: 50,
///    criteria_fields: vec!["status".into()],
///    ..Default::default()
/// };
/// assert_eq!(config.default_page, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
   /// Page used for missing or invalid `page` values (must be at least 1)
   pub default_page: u64,
   /// Page size used for missing or invalid `limit` values (must be at least 1)
   pub default_per_page: i64,
   /// Direction used when the request has no `sort`
   pub default_sort: String,
   /// Raw keys accepted as equality criteria
   pub criteria_fields: Vec<String>,
}

impl Default for NormalizerConfig {
   fn default() -> Self {
      Self {
         default_page: DEFAULT_PAGE,
         default_per_page: DEFAULT_PER_PAGE,
         default_sort: DEFAULT_SORT.to_string(),
         criteria_fields: Vec::new(),
      }
   }
}

/// Request keys with a dedicated meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKey {
   Page,
   Limit,
   SearchField,
   Search,
   Order,
   Sort,
}

impl RequestKey {
   fn parse(key: &str) -> Option<Self> {
      match key {
         "page" => Some(RequestKey::Page),
         "limit" => Some(RequestKey::Limit),
         "searchfield" => Some(RequestKey::SearchField),
         "search" => Some(RequestKey::Search),
         "order" => Some(RequestKey::Order),
         "sort" => Some(RequestKey::Sort),
         _ => None,
      }
   }
}

/// Converts raw request mappings into [`Parameters`].
#[derive(Debug, Clone, Default)]
pub struct ParamsNormalizer {
   config: NormalizerConfig,
}

impl ParamsNormalizer {
   pub fn new(config: NormalizerConfig) -> Self {
      Self { config }
   }

   pub fn config(&self) -> &NormalizerConfig {
      &self.config
   }

   /// Normalize a raw string mapping.
   ///
   /// Keys and values are trimmed. A value of `"undefined"` counts as absent.
   /// `page` and `limit` are read with integer-prefix parsing, so `"3abc"` is 3
   /// and `"abc"` is 0; a page below 1 falls back to the default page and a
   /// limit below 1 falls back to the default page size. Unrecognized keys are
   /// ignored unless listed in [`NormalizerConfig::criteria_fields`].
   ///
   /// Fails only with [`Error::ParameterMapping`], when the configuration
   /// itself is unusable.
   pub fn normalize<R, I, K, V>(&self, raw: I) -> Result<Parameters<R>>
   where
      I: IntoIterator<Item = (K, V)>,
      K: AsRef<str>,
      V: AsRef<str>,
   {
      if self.config.default_page < 1 || self.config.default_per_page < 1 {
         return Err(Error::ParameterMapping);
      }

      let mut params = Parameters::<R> {
         page: self.config.default_page,
         per_page: self.config.default_per_page,
         sort: self.config.default_sort.clone(),
         ..Default::default()
      };

      for (key, value) in raw {
         let (key, value) = (key.as_ref(), value.as_ref());
         params.raw.insert(key.to_string(), value.to_string());

         let (key, value) = (key.trim(), value.trim());
         if value == UNDEFINED {
            continue;
         }

         match RequestKey::parse(key) {
            Some(RequestKey::Page) => params.page = self.page_from(value),
            Some(RequestKey::Limit) => params.per_page = self.per_page_from(value),
            Some(RequestKey::SearchField) => params.search_field = value.to_string(),
            Some(RequestKey::Search) => params.search = value.to_string(),
            Some(RequestKey::Order) => params.order = value.to_string(),
            Some(RequestKey::Sort) => params.sort = value.to_string(),
            None if self.config.criteria_fields.iter().any(|field| field == key) => {
               let criterion = if value.is_empty() {
                  Criterion::IsNull
               } else {
                  Criterion::Eq(value.into())
               };
               params.criteria.insert(key, criterion);
            }
            None => {}
         }
      }

      debug!(
         page = params.page,
         per_page = params.per_page,
         order = %params.order,
         sort = %params.sort,
         criteria = params.criteria.len(),
         "Normalized pagination parameters"
      );

      Ok(params)
   }

   /// Normalize an `application/x-www-form-urlencoded` query string.
   ///
   /// A leading `?` is ignored. When a key repeats, the last value wins.
   pub fn normalize_query<R>(&self, query: &str) -> Result<Parameters<R>> {
      let query = query.strip_prefix('?').unwrap_or(query);
      self.normalize(url::form_urlencoded::parse(query.as_bytes()))
   }

   fn page_from(&self, value: &str) -> u64 {
      match parse_int_prefix(value) {
         page if page >= 1 => page as u64,
         _ => self.config.default_page,
      }
   }

   fn per_page_from(&self, value: &str) -> i64 {
      match parse_int_prefix(value) {
         per_page if per_page >= 1 => per_page,
         _ => self.config.default_per_page,
      }
   }
}

/// Parse the leading integer of `value`: optional sign, then digits.
///
/// Anything without a leading number parses as 0. Values out of range
/// saturate.
fn parse_int_prefix(value: &str) -> i64 {
   let value = value.trim_start();
   let (negative, digits) = match value.as_bytes().first() {
      Some(b'-') => (true, &value[1..]),
      Some(b'+') => (false, &value[1..]),
      _ => (false, value),
   };

   let mut parsed: i64 = 0;
   for byte in digits.bytes().take_while(u8::is_ascii_digit) {
      let digit = i64::from(byte - b'0');
      parsed = parsed.saturating_mul(10).saturating_add(digit);
   }

   if negative { -parsed } else { parsed }
}
