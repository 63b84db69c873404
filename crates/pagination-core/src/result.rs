//! The paginated result page and its next/previous link synthesis.

use serde::{Deserialize, Serialize};

use crate::criteria::{Criteria, Criterion, value_text};
use crate::query::SortDirection;
use crate::{Error, Result};

/// One page of rows plus pagination metadata.
///
/// The criteria and ordering a page was produced with are only used to build
/// [`next_page_url`](Self::next_page_url) and
/// [`prev_page_url`](Self::prev_page_url) at construction and are not kept.
///
/// # Example
///
/// ```
/// use pagination_core::{Criteria, PaginatedResult};
///
/// let criteria = Criteria::new().like("name", "al");
/// let page = PaginatedResult::new(Some(vec![1, 2]), 1, 20, 25, &criteria, &[]).unwrap();
///
/// assert_eq!(page.last_page(), 2);
/// assert_eq!(page.prev_page_url(), None);
/// assert_eq!(page.next_page_url(), Some("?page=2&limit=20&search=al&searchfield=name"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult<T> {
   data: Option<Vec<T>>,
   total: i64,
   per_page: i64,
   current_page: u64,
   last_page: u64,
   next_page_url: Option<String>,
   prev_page_url: Option<String>,
}

impl<T> PaginatedResult<T> {
   /// Build a page and derive its last page and links.
   ///
   /// `total` is -1 when unknown. Fails with [`Error::PerPageNotSet`] when
   /// `per_page` is zero.
   pub fn new(
      data: Option<Vec<T>>,
      current_page: u64,
      per_page: i64,
      total: i64,
      criteria: &Criteria,
      order_by: &[(String, SortDirection)],
   ) -> Result<Self> {
      let last_page = last_page(total, per_page)?;

      let next_page_url = if total <= 0 || current_page == last_page {
         None
      } else {
         Some(page_url(current_page.saturating_add(1), per_page, total, criteria, order_by))
      };

      let prev_page_url = if total <= 0 || current_page == 1 {
         None
      } else {
         Some(page_url(current_page.saturating_sub(1), per_page, total, criteria, order_by))
      };

      Ok(Self {
         data,
         total,
         per_page,
         current_page,
         last_page,
         next_page_url,
         prev_page_url,
      })
   }

   pub fn data(&self) -> Option<&[T]> {
      self.data.as_deref()
   }

   /// Total matching rows, or -1 when not counted.
   pub fn total(&self) -> i64 {
      self.total
   }

   pub fn per_page(&self) -> i64 {
      self.per_page
   }

   pub fn current_page(&self) -> u64 {
      self.current_page
   }

   pub fn last_page(&self) -> u64 {
      self.last_page
   }

   pub fn next_page_url(&self) -> Option<&str> {
      self.next_page_url.as_deref()
   }

   pub fn prev_page_url(&self) -> Option<&str> {
      self.prev_page_url.as_deref()
   }

   /// Consume the page, returning its rows.
   pub fn into_data(self) -> Option<Vec<T>> {
      self.data
   }

   /// Drop the rows, keeping only the metadata.
   pub fn data_pagination(&mut self) -> &mut Self {
      self.data = None;
      self
   }

   /// Convert the rows, keeping the metadata.
   pub fn map_data<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
      PaginatedResult {
         data: self.data.map(|rows| rows.into_iter().map(f).collect()),
         total: self.total,
         per_page: self.per_page,
         current_page: self.current_page,
         last_page: self.last_page,
         next_page_url: self.next_page_url,
         prev_page_url: self.prev_page_url,
      }
   }
}

/// Number of the last page: `ceil(total / per_page)`.
///
/// Zero when `total` is zero or unknown, and 1 for an unlimited page size with
/// a known total.
pub fn last_page(total: i64, per_page: i64) -> Result<u64> {
   if per_page == 0 {
      return Err(Error::PerPageNotSet);
   }
   if total <= 0 {
      return Ok(0);
   }
   if per_page < 0 {
      return Ok(1);
   }
   Ok((total as u64).div_ceil(per_page as u64))
}

/// Query string for `page`, clamped to `[1, total]`.
///
/// Ordering is written as `&sort=<direction>&order=<field>`, the keys
/// [`ParamsNormalizer`](crate::ParamsNormalizer) reads the direction and the
/// field from, instead of the field-first `sort=<field>&order=<direction>`
/// layout, which would swap them when the link is normalized again.
fn page_url(
   page: u64,
   per_page: i64,
   total: i64,
   criteria: &Criteria,
   order_by: &[(String, SortDirection)],
) -> String {
   let page = page.clamp(1, total.max(1) as u64);
   let mut url = format!("?page={page}&limit={per_page}");

   for (field, direction) in order_by {
      push_pair(&mut url, "sort", direction.as_sql());
      push_pair(&mut url, "order", field);
   }

   for (field, criterion) in criteria {
      match criterion {
         Criterion::Eq(value) => push_pair(&mut url, field, &value_text(value)),
         Criterion::IsNull => push_pair(&mut url, field, ""),
         Criterion::Like(prefix) => push_search(&mut url, field, prefix),
         Criterion::In(values) => {
            let search = match values.get(1) {
               Some(value) => value_text(value),
               None => values.iter().map(value_text).collect::<Vec<_>>().join(","),
            };
            push_search(&mut url, field, &search);
         }
      }
   }

   url
}

fn push_search(url: &mut String, field: &str, search: &str) {
   push_pair(url, "search", search);
   push_pair(url, "searchfield", field);
}

fn push_pair(url: &mut String, key: &str, value: &str) {
   url.push('&');
   url.extend(url::form_urlencoded::byte_serialize(key.as_bytes()));
   url.push('=');
   url.extend(url::form_urlencoded::byte_serialize(value.as_bytes()));
}

#[cfg(test)]
mod tests {
   use super::*;
   use serde_json::json;

   fn page(current_page: u64, per_page: i64, total: i64) -> PaginatedResult<i32> {
      PaginatedResult::new(Some(vec![]), current_page, per_page, total, &Criteria::new(), &[]).unwrap()
   }

   // ─── last_page ───

   #[test]
   fn last_page_is_ceiling() {
      assert_eq!(last_page(25, 20).unwrap(), 2);
      assert_eq!(last_page(40, 20).unwrap(), 2);
      assert_eq!(last_page(41, 20).unwrap(), 3);
      assert_eq!(last_page(1, 20).unwrap(), 1);
   }

   #[test]
   fn last_page_is_zero_without_rows() {
      assert_eq!(last_page(0, 20).unwrap(), 0);
      assert_eq!(last_page(-1, 20).unwrap(), 0);
      assert_eq!(last_page(-1, -1).unwrap(), 0);
   }

   #[test]
   fn unlimited_page_size_has_one_page() {
      assert_eq!(last_page(57, -1).unwrap(), 1);
   }

   #[test]
   fn zero_page_size_is_a_usage_error() {
      let err = last_page(10, 0).unwrap_err();
      assert!(matches!(err, Error::PerPageNotSet));

      let result = PaginatedResult::<i32>::new(None, 1, 0, 10, &Criteria::new(), &[]);
      assert!(matches!(result, Err(Error::PerPageNotSet)));
   }

   // ─── links ───

   #[test]
   fn middle_page_has_both_links() {
      let result = page(2, 10, 35);
      assert_eq!(result.last_page(), 4);
      assert_eq!(result.next_page_url(), Some("?page=3&limit=10"));
      assert_eq!(result.prev_page_url(), Some("?page=1&limit=10"));
   }

   #[test]
   fn first_page_has_no_prev() {
      let result = page(1, 10, 35);
      assert_eq!(result.prev_page_url(), None);
      assert_eq!(result.next_page_url(), Some("?page=2&limit=10"));
   }

   #[test]
   fn last_page_has_no_next() {
      let result = page(4, 10, 35);
      assert_eq!(result.next_page_url(), None);
      assert_eq!(result.prev_page_url(), Some("?page=3&limit=10"));
   }

   #[test]
   fn empty_or_unknown_total_has_no_links() {
      for total in [0, -1] {
         let result = page(2, 10, total);
         assert_eq!(result.next_page_url(), None);
         assert_eq!(result.prev_page_url(), None);
      }
   }

   #[test]
   fn page_beyond_last_still_links_back() {
      let result = page(9, 10, 35);
      assert_eq!(result.next_page_url(), Some("?page=10&limit=10"));
      assert_eq!(result.prev_page_url(), Some("?page=8&limit=10"));
   }

   #[test]
   fn target_page_is_clamped_to_total() {
      let result = page(5, 1, 3);
      assert_eq!(result.next_page_url(), Some("?page=3&limit=1"));
   }

   #[test]
   fn highest_page_number_does_not_overflow() {
      let result = page(u64::MAX, 10, 5);
      assert_eq!(result.next_page_url(), Some("?page=5&limit=10"));
      assert_eq!(result.prev_page_url(), Some("?page=5&limit=10"));
   }

   #[test]
   fn links_carry_order_then_criteria() {
      let criteria: Criteria = serde_json::from_value(json!({
         "status": "active",
         "deleted_at": null,
         "name": ["ILIKE", "al"],
         "id": [1, 2, 3],
         "role": ["admin"],
      }))
      .unwrap();
      let order_by = vec![("name".to_string(), SortDirection::Desc)];

      let result = PaginatedResult::new(Some(vec![1]), 1, 10, 30, &criteria, &order_by).unwrap();

      assert_eq!(
         result.next_page_url(),
         Some(
            "?page=2&limit=10&sort=DESC&order=name&status=active&deleted_at=\
             &search=al&searchfield=name&search=2&searchfield=id&search=admin&searchfield=role"
         )
      );
   }

   #[test]
   fn link_values_are_percent_encoded() {
      let criteria = Criteria::new().eq("city", "São Paulo & co").eq("n", 5);
      let result = PaginatedResult::new(Some(vec![1]), 1, 10, 30, &criteria, &[]).unwrap();

      assert_eq!(
         result.next_page_url(),
         Some("?page=2&limit=10&city=S%C3%A3o+Paulo+%26+co&n=5")
      );
   }

   // ─── data and serialization ───

   #[test]
   fn data_pagination_clears_rows_in_place() {
      let mut result = PaginatedResult::new(Some(vec![1, 2]), 1, 10, 2, &Criteria::new(), &[]).unwrap();
      result.data_pagination();

      assert_eq!(result.data(), None);
      assert_eq!(result.total(), 2);
   }

   #[test]
   fn serializes_metadata_without_criteria() {
      let criteria = Criteria::new().like("name", "al");
      let mut result = PaginatedResult::new(Some(vec![json!({"id": 1})]), 1, 20, 25, &criteria, &[]).unwrap();

      assert_eq!(
         serde_json::to_value(&result).unwrap(),
         json!({
            "data": [{"id": 1}],
            "total": 25,
            "perPage": 20,
            "currentPage": 1,
            "lastPage": 2,
            "nextPageUrl": "?page=2&limit=20&search=al&searchfield=name",
            "prevPageUrl": null,
         })
      );

      let metadata = serde_json::to_value(result.data_pagination()).unwrap();
      assert_eq!(metadata["data"], json!(null));
      assert!(metadata.get("criteria").is_none());
   }

   #[test]
   fn map_data_keeps_metadata() {
      let result = page(2, 10, 35);
      let mapped = result.clone().map_data(|n| n.to_string());

      assert_eq!(mapped.next_page_url(), result.next_page_url());
      assert_eq!(mapped.last_page(), 4);
      assert_eq!(mapped.into_data(), Some(Vec::<String>::new()));
   }
}
