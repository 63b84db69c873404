//! Decoding SQLite values and rows to JSON.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pagination_core::HydrateMode;
use serde_json::{Map, Value as JsonValue};
use sqlx::sqlite::{SqliteRow, SqliteValueRef};
use sqlx::{Column, Decode, Row, Sqlite, TypeInfo, ValueRef};

use crate::{Error, Result};

/// Convert one SQLite value to JSON.
///
/// Integers (and booleans, which SQLite stores as integers) keep full `i64`
/// precision. Blobs become base64 strings.
pub(crate) fn to_json(value: SqliteValueRef<'_>) -> Result<JsonValue> {
   if value.is_null() {
      return Ok(JsonValue::Null);
   }

   let type_name = value.type_info().name().to_string();
   let json = match type_name.as_str() {
      "INTEGER" | "BOOLEAN" | "INT8" => JsonValue::from(decode::<i64>(value)?),
      "REAL" | "NUMERIC" => JsonValue::from(decode::<f64>(value)?),
      "TEXT" | "DATE" | "TIME" | "DATETIME" => JsonValue::String(decode::<String>(value)?),
      "BLOB" => JsonValue::String(STANDARD.encode(decode::<Vec<u8>>(value)?)),
      "NULL" => JsonValue::Null,
      _ => return Err(Error::UnsupportedDatatype(type_name)),
   };

   Ok(json)
}

fn decode<'r, T: Decode<'r, Sqlite>>(value: SqliteValueRef<'r>) -> Result<T> {
   T::decode(value).map_err(|e| Error::Sqlx(sqlx::Error::Decode(e)))
}

/// Shape each row according to `mode`.
pub(crate) fn hydrate_rows(rows: &[SqliteRow], mode: HydrateMode) -> Result<Vec<JsonValue>> {
   rows.iter().map(|row| hydrate_row(row, mode)).collect()
}

fn hydrate_row(row: &SqliteRow, mode: HydrateMode) -> Result<JsonValue> {
   match mode {
      HydrateMode::Object => {
         let mut object = Map::new();
         for (i, column) in row.columns().iter().enumerate() {
            object.insert(column.name().to_string(), to_json(row.try_get_raw(i)?)?);
         }
         Ok(JsonValue::Object(object))
      }
      HydrateMode::Array => {
         let values = (0..row.len())
            .map(|i| to_json(row.try_get_raw(i)?))
            .collect::<Result<Vec<_>>>()?;
         Ok(JsonValue::Array(values))
      }
      HydrateMode::Scalar => {
         if row.is_empty() {
            return Ok(JsonValue::Null);
         }
         to_json(row.try_get_raw(0)?)
      }
   }
}
