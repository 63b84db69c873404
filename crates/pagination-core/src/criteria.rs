//! Flat AND-of-conditions criteria and their compilation into builder
//! predicates.
//!
//! A criteria mapping associates a field name with either a scalar (equality),
//! `null` (IS NULL), a list (IN), or a `["LIKE" | "ILIKE", value]` pair
//! (case-insensitive prefix match). Entries are compiled in mapping order.
//!
//! # Example
//!
//! ```
//! use pagination_core::criteria::{Criteria, Criterion};
//! use serde_json::json;
//!
//! let criteria: Criteria = serde_json::from_value(json!({
//!    "status": "active",
//!    "deleted_at": null,
//!    "name": ["ILIKE", "ann"],
//!    "id": [1, 2, 3],
//! }))
//! .unwrap();
//!
//! assert_eq!(criteria.get("name"), Some(&Criterion::Like("ann".into())));
//! assert_eq!(criteria.get("deleted_at"), Some(&Criterion::IsNull));
//! ```

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::query::{Predicate, QueryBuilder};

/// Condition on a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "JsonValue", into = "JsonValue")]
pub enum Criterion {
   /// Field is NULL
   IsNull,
   /// Field equals the bound value
   Eq(JsonValue),
   /// Field starts with the value, ignoring case
   Like(String),
   /// Field is one of the values
   In(Vec<JsonValue>),
}

impl From<JsonValue> for Criterion {
   fn from(value: JsonValue) -> Self {
      match value {
         JsonValue::Null => Criterion::IsNull,
         JsonValue::Array(items) if is_like_pair(&items) => Criterion::Like(value_text(&items[1])),
         JsonValue::Array(items) => Criterion::In(items),
         other => Criterion::Eq(other),
      }
   }
}

impl From<Criterion> for JsonValue {
   fn from(criterion: Criterion) -> Self {
      match criterion {
         Criterion::IsNull => JsonValue::Null,
         Criterion::Eq(value) => value,
         Criterion::Like(prefix) => JsonValue::Array(vec!["ILIKE".into(), prefix.into()]),
         Criterion::In(values) => JsonValue::Array(values),
      }
   }
}

fn is_like_pair(items: &[JsonValue]) -> bool {
   items.len() == 2
      && items[0]
         .as_str()
         .is_some_and(|op| op.eq_ignore_ascii_case("LIKE") || op.eq_ignore_ascii_case("ILIKE"))
}

/// Text form of a criteria value as it appears in SQL patterns and URLs.
pub(crate) fn value_text(value: &JsonValue) -> String {
   match value {
      JsonValue::Null => String::new(),
      JsonValue::String(s) => s.clone(),
      other => other.to_string(),
   }
}

/// Ordered mapping of field name to [`Criterion`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Criteria(IndexMap<String, Criterion>);

impl Criteria {
   pub fn new() -> Self {
      Self::default()
   }

   /// Add an equality condition.
   pub fn eq(mut self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
      self.0.insert(field.into(), Criterion::Eq(value.into()));
      self
   }

   /// Add an IS NULL condition.
   pub fn is_null(mut self, field: impl Into<String>) -> Self {
      self.0.insert(field.into(), Criterion::IsNull);
      self
   }

   /// Add a case-insensitive prefix match.
   pub fn like(mut self, field: impl Into<String>, prefix: impl Into<String>) -> Self {
      self.0.insert(field.into(), Criterion::Like(prefix.into()));
      self
   }

   /// Add a set-membership condition.
   pub fn is_in<I, V>(mut self, field: impl Into<String>, values: I) -> Self
   where
      I: IntoIterator<Item = V>,
      V: Into<JsonValue>,
   {
      let values = values.into_iter().map(Into::into).collect();
      self.0.insert(field.into(), Criterion::In(values));
      self
   }

   /// Insert or replace the condition for `field`.
   ///
   /// A replaced entry keeps its position.
   pub fn insert(&mut self, field: impl Into<String>, criterion: Criterion) -> Option<Criterion> {
      self.0.insert(field.into(), criterion)
   }

   pub fn get(&self, field: &str) -> Option<&Criterion> {
      self.0.get(field)
   }

   pub fn len(&self) -> usize {
      self.0.len()
   }

   pub fn is_empty(&self) -> bool {
      self.0.is_empty()
   }

   pub fn iter(&self) -> indexmap::map::Iter<'_, String, Criterion> {
      self.0.iter()
   }
}

impl<K, V> FromIterator<(K, V)> for Criteria
where
   K: Into<String>,
   V: Into<Criterion>,
{
   fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
      Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
   }
}

impl<'a> IntoIterator for &'a Criteria {
   type Item = (&'a String, &'a Criterion);
   type IntoIter = indexmap::map::Iter<'a, String, Criterion>;

   fn into_iter(self) -> Self::IntoIter {
      self.0.iter()
   }
}

/// Deterministic bound-parameter name for an equality condition on `field`.
///
/// `f` followed by the first five hex digits of the SHA-256 of the field name,
/// so distinct fields do not collide within one query.
pub fn parameter_name(field: &str) -> String {
   let digest = hex::encode(Sha256::digest(field.as_bytes()));
   format!("f{}", &digest[..5])
}

/// Whether `field` may be interpolated into a predicate.
pub fn is_valid_field_name(field: &str) -> bool {
   static RE: OnceLock<Regex> = OnceLock::new();
   let re = RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("invalid regex"));
   re.is_match(field)
}

/// Strategy applying criteria to a query builder.
///
/// Repositories use [`DefaultCriteriaCompiler`] unless a custom strategy is
/// injected, in which case the custom strategy receives the raw criteria and
/// the default rules are not applied at all.
pub trait FilterCriteria: Send + Sync {
   fn build_filter_criteria(&self, builder: &mut dyn QueryBuilder, criteria: &Criteria);
}

impl<F> FilterCriteria for F
where
   F: Fn(&mut dyn QueryBuilder, &Criteria) + Send + Sync,
{
   fn build_filter_criteria(&self, builder: &mut dyn QueryBuilder, criteria: &Criteria) {
      self(builder, criteria)
   }
}

/// The built-in criteria rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCriteriaCompiler;

impl FilterCriteria for DefaultCriteriaCompiler {
   fn build_filter_criteria(&self, builder: &mut dyn QueryBuilder, criteria: &Criteria) {
      compile(builder, criteria);
   }
}

/// Add one AND-connected predicate per criteria entry, in mapping order.
///
/// Field names that are not plain identifiers are skipped.
pub fn compile(builder: &mut dyn QueryBuilder, criteria: &Criteria) {
   let alias = builder.alias().to_string();

   for (field, criterion) in criteria {
      if !is_valid_field_name(field) {
         warn!(field = %field, "Skipping criteria entry with invalid field name");
         continue;
      }

      let qualified = format!("{alias}.{field}");
      let predicate = match criterion {
         Criterion::IsNull => Predicate::IsNull { field: qualified },
         Criterion::Like(prefix) => Predicate::ILikePrefix {
            field: qualified,
            pattern: format!("{}%", prefix.to_ascii_lowercase()),
         },
         Criterion::In(values) => Predicate::In {
            field: qualified,
            values: values.clone(),
         },
         Criterion::Eq(value) => Predicate::Eq {
            field: qualified,
            parameter: parameter_name(field),
            value: value.clone(),
         },
      };

      builder.and_where(predicate);
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::query::SortDirection;
   use serde_json::json;

   #[derive(Default)]
   struct PredicateRecorder {
      predicates: Vec<Predicate>,
   }

   impl QueryBuilder for PredicateRecorder {
      fn alias(&self) -> &str {
         "u"
      }
      fn and_where(&mut self, predicate: Predicate) {
         self.predicates.push(predicate);
      }
      fn add_order_by(&mut self, _expression: String, _direction: SortDirection) {}
      fn set_first_result(&mut self, _offset: u64) {}
      fn set_max_results(&mut self, _limit: u64) {}
   }

   fn compiled(criteria: &Criteria) -> Vec<Predicate> {
      let mut recorder = PredicateRecorder::default();
      compile(&mut recorder, criteria);
      recorder.predicates
   }

   // ─── Criterion classification ───

   #[test]
   fn null_classifies_as_is_null() {
      assert_eq!(Criterion::from(JsonValue::Null), Criterion::IsNull);
   }

   #[test]
   fn like_pair_classifies_case_insensitively() {
      assert_eq!(Criterion::from(json!(["ILIKE", "ann"])), Criterion::Like("ann".into()));
      assert_eq!(Criterion::from(json!(["like", "ann"])), Criterion::Like("ann".into()));
      assert_eq!(Criterion::from(json!(["Like", 42])), Criterion::Like("42".into()));
   }

   #[test]
   fn other_arrays_classify_as_in() {
      assert_eq!(
         Criterion::from(json!([1, 2, 3])),
         Criterion::In(vec![json!(1), json!(2), json!(3)])
      );
      assert_eq!(
         Criterion::from(json!(["LIKE", "a", "b"])),
         Criterion::In(vec![json!("LIKE"), json!("a"), json!("b")])
      );
      assert_eq!(Criterion::from(json!(["LIKE"])), Criterion::In(vec![json!("LIKE")]));
   }

   #[test]
   fn scalars_classify_as_eq() {
      assert_eq!(Criterion::from(json!("active")), Criterion::Eq(json!("active")));
      assert_eq!(Criterion::from(json!(7)), Criterion::Eq(json!(7)));
      assert_eq!(Criterion::from(json!(true)), Criterion::Eq(json!(true)));
   }

   #[test]
   fn criteria_deserialize_in_mapping_order() {
      let criteria: Criteria =
         serde_json::from_value(json!({"b": 1, "a": null, "c": ["ilike", "x"]})).unwrap();

      let fields: Vec<&String> = criteria.iter().map(|(field, _)| field).collect();
      assert_eq!(fields, vec!["b", "a", "c"]);
      assert_eq!(criteria.get("c"), Some(&Criterion::Like("x".into())));
   }

   #[test]
   fn criteria_serialize_back_to_json_shapes() {
      let criteria = Criteria::new()
         .eq("status", "active")
         .is_null("deleted_at")
         .like("name", "al")
         .is_in("id", [1, 2]);

      assert_eq!(
         serde_json::to_value(&criteria).unwrap(),
         json!({
            "status": "active",
            "deleted_at": null,
            "name": ["ILIKE", "al"],
            "id": [1, 2],
         })
      );
   }

   #[test]
   fn insert_replaces_in_place() {
      let mut criteria = Criteria::new().eq("a", 1).eq("b", 2);
      let previous = criteria.insert("a", Criterion::IsNull);

      assert_eq!(previous, Some(Criterion::Eq(json!(1))));
      let fields: Vec<&String> = criteria.iter().map(|(field, _)| field).collect();
      assert_eq!(fields, vec!["a", "b"]);
   }

   // ─── parameter_name ───

   #[test]
   fn parameter_name_is_deterministic() {
      assert_eq!(parameter_name("status"), parameter_name("status"));
      assert_ne!(parameter_name("status"), parameter_name("name"));
   }

   #[test]
   fn parameter_name_shape() {
      let name = parameter_name("status");
      assert_eq!(name.len(), 6);
      assert!(name.starts_with('f'));
      assert!(name[1..].chars().all(|c| c.is_ascii_hexdigit()));
   }

   // ─── compile ───

   #[test]
   fn compiles_null_to_is_null() {
      let predicates = compiled(&Criteria::from_iter([("status", JsonValue::Null)]));
      assert_eq!(predicates, vec![Predicate::IsNull { field: "u.status".into() }]);
   }

   #[test]
   fn compiles_ilike_to_lowercase_prefix() {
      let predicates = compiled(&Criteria::from_iter([("name", json!(["ILIKE", "Ann"]))]));
      assert_eq!(
         predicates,
         vec![Predicate::ILikePrefix {
            field: "u.name".into(),
            pattern: "ann%".into(),
         }]
      );
   }

   #[test]
   fn ilike_pattern_folds_ascii_letters_only() {
      let predicates = compiled(&Criteria::new().like("name", "ÁLva"));
      assert_eq!(
         predicates,
         vec![Predicate::ILikePrefix {
            field: "u.name".into(),
            pattern: "Álva%".into(),
         }]
      );
   }

   #[test]
   fn compiles_like_as_case_insensitive_too() {
      let predicates = compiled(&Criteria::from_iter([("name", json!(["LIKE", "ANN"]))]));
      assert_eq!(
         predicates,
         vec![Predicate::ILikePrefix {
            field: "u.name".into(),
            pattern: "ann%".into(),
         }]
      );
   }

   #[test]
   fn compiles_array_to_in() {
      let predicates = compiled(&Criteria::from_iter([("id", json!([1, 2, 3]))]));
      assert_eq!(
         predicates,
         vec![Predicate::In {
            field: "u.id".into(),
            values: vec![json!(1), json!(2), json!(3)],
         }]
      );
   }

   #[test]
   fn compiles_scalar_to_bound_equality() {
      let predicates = compiled(&Criteria::from_iter([("status", json!("active"))]));
      assert_eq!(
         predicates,
         vec![Predicate::Eq {
            field: "u.status".into(),
            parameter: parameter_name("status"),
            value: json!("active"),
         }]
      );
   }

   #[test]
   fn compiles_entries_in_mapping_order() {
      let criteria = Criteria::new().eq("b", 1).is_null("a");
      let predicates = compiled(&criteria);

      assert!(matches!(&predicates[0], Predicate::Eq { field, .. } if field == "u.b"));
      assert!(matches!(&predicates[1], Predicate::IsNull { field } if field == "u.a"));
   }

   #[test]
   fn skips_invalid_field_names() {
      let criteria = Criteria::new()
         .eq("status = 1 OR 1", 1)
         .eq("u.status", 1)
         .eq("ok", 1);
      let predicates = compiled(&criteria);

      assert_eq!(predicates.len(), 1);
      assert!(matches!(&predicates[0], Predicate::Eq { field, .. } if field == "u.ok"));
   }

   #[test]
   fn closures_are_filter_strategies() {
      let only_active = |builder: &mut dyn QueryBuilder, _criteria: &Criteria| {
         builder.and_where(Predicate::Eq {
            field: format!("{}.active", builder.alias()),
            parameter: "active".into(),
            value: json!(1),
         });
      };

      let mut recorder = PredicateRecorder::default();
      only_active.build_filter_criteria(&mut recorder, &Criteria::new().eq("ignored", 1));

      assert_eq!(recorder.predicates.len(), 1);
      assert!(matches!(&recorder.predicates[0], Predicate::Eq { field, .. } if field == "u.active"));
   }
}
