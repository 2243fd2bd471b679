//! Decoding of list payloads.
//!
//! The generation-2 API returns lists as arrays of objects. Generation-1 returns
//! column tables, `{"fields": [...], "data": [[...], ...]}`, which are zipped
//! row by row into objects before being deserialized.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use crate::errors::{ApiError, ApiResult};

/// Zips one data row with the column names into an object.
pub fn zip_row(fields: &[String], row: &[Value]) -> ApiResult<Map<String, Value>> {
    if fields.len() != row.len() {
        return Err(ApiError::Shape(format!(
            "row has {} values but there are {} fields",
            row.len(),
            fields.len()
        )));
    }
    Ok(fields.iter().cloned().zip(row.iter().cloned()).collect())
}

/// Maps a list payload of either generation into typed rows.
pub fn decode_rows<T: DeserializeOwned>(value: &Value) -> ApiResult<Vec<T>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| serde_json::from_value(item.clone()).map_err(ApiError::from))
            .collect(),
        Value::Object(table) if table.contains_key("fields") => {
            let fields: Vec<String> = serde_json::from_value(
                table.get("fields").cloned().unwrap_or(Value::Null),
            )?;
            let data: Vec<Vec<Value>> = match table.get("data") {
                Some(Value::Null) | None => Vec::new(),
                Some(data) => serde_json::from_value(data.clone())?,
            };
            data.iter()
                .map(|row| {
                    let object = zip_row(&fields, row)?;
                    serde_json::from_value(Value::Object(object)).map_err(ApiError::from)
                })
                .collect()
        }
        Value::Null => Ok(Vec::new()),
        other => Err(ApiError::Shape(format!("expected a list, found {}", other))),
    }
}
