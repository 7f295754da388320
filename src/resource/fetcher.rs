//! Response extraction
//!
//! Turns raw list responses into [`Page`]s and reads fields out of the opaque
//! JSON records.

use crate::engine::Page;
use serde_json::Value;

/// Cursor field of a GCP list response
pub const GCP_CURSOR_FIELD: &str = "nextPageToken";

/// Cursor field of an Azure Resource Manager list response
pub const AZURE_CURSOR_FIELD: &str = "nextLink";

/// Build a page from a list response
pub fn page_from_response(
    response: &Value,
    response_path: &str,
    cursor_field: &str,
) -> Page<Value> {
    let items = extract_items(response, response_path);
    let next = response
        .get(cursor_field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    Page::new(items, next)
}

/// Extract items from response using a dot-notation response path
pub fn extract_items(response: &Value, path: &str) -> Vec<Value> {
    if path.is_empty() {
        return response.as_array().cloned().unwrap_or_default();
    }

    let mut current = response;
    for part in path.split('.') {
        current = match current.get(part) {
            Some(v) => v,
            None => return vec![],
        };
    }

    current.as_array().cloned().unwrap_or_default()
}

/// Extract short name from a resource URL
/// e.g., ".../compute/v1/projects/my-project/zones/us-central1-a" -> "us-central1-a"
pub fn extract_short_name(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

/// Extract a scalar from JSON using a dot-notation path; numeric parts index arrays
pub fn extract_json_value(item: &Value, path: &str) -> Option<String> {
    let mut current = item;

    for part in path.split('.') {
        current = match part.parse::<usize>() {
            Ok(idx) => current.get(idx)?,
            Err(_) => current.get(part)?,
        };
    }

    match current {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
