// src/normalize.rs
//
// Best-effort normalization of whatever document the prober found into the
// stable consumer-facing mission shape. Upstream attribute names vary by
// tenant and API version, so every field is resolved through a fixed
// priority list of known aliases and missing values become nulls.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

/// Stable output record. Every field is nullable on purpose: the consumer
/// contract is the shape, not the presence of any single attribute.
#[derive(Debug, Default, Clone, Serialize)]
pub struct NormalizedMission {
    pub opportunity_id: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub status: Option<Value>,
    pub updated: Option<String>,
}

const TITLE_KEYS: &[&str] = &["title", "name"];
const START_KEYS: &[&str] = &["startDate", "beginDate", "start_date"];
const END_KEYS: &[&str] = &["endDate", "closingDate", "end_date"];
const STATUS_KEYS: &[&str] = &["state", "status", "opportunityState"];
const UPDATED_KEYS: &[&str] = &["updateDate", "updatedAt", "update_date"];

/// Normalize an upstream document.
///
/// JSON:API envelopes (`data` array, optional `included` array) become an
/// array of [`NormalizedMission`] values; anything else passes through
/// unmodified. Never fails: unknown shapes are the caller's problem to
/// interpret, not ours to reject.
pub fn normalize(doc: &Value) -> Value {
    let Some(items) = doc.get("data").and_then(Value::as_array) else {
        return doc.clone();
    };

    let index = included_index(doc);
    let missions: Vec<NormalizedMission> = items
        .iter()
        .map(|item| normalize_item(item, &index))
        .collect();
    serde_json::to_value(missions).unwrap_or_else(|_| doc.clone())
}

/// Index `included` entities by (type, id) for relationship resolution.
fn included_index(doc: &Value) -> HashMap<(String, String), &Value> {
    let mut index = HashMap::new();
    if let Some(included) = doc.get("included").and_then(Value::as_array) {
        for entity in included {
            if let (Some(ty), Some(id)) = (str_of(entity, "type"), str_of(entity, "id")) {
                index.insert((ty, id), entity);
            }
        }
    }
    index
}

fn normalize_item(item: &Value, index: &HashMap<(String, String), &Value>) -> NormalizedMission {
    let attrs = item.get("attributes").unwrap_or(&Value::Null);
    NormalizedMission {
        opportunity_id: str_of(item, "id"),
        title: first_string(attrs, TITLE_KEYS),
        company: resolve_company(item, index),
        start: first_string(attrs, START_KEYS),
        end: first_string(attrs, END_KEYS),
        status: first_value(attrs, STATUS_KEYS),
        updated: first_string(attrs, UPDATED_KEYS),
    }
}

/// Follow `relationships.company.data` into the included index; absent when
/// the relationship or the included entity is missing.
fn resolve_company(item: &Value, index: &HashMap<(String, String), &Value>) -> Option<String> {
    let rel = item
        .get("relationships")?
        .get("company")?
        .get("data")?;
    let key = (str_of(rel, "type")?, str_of(rel, "id")?);
    let entity = index.get(&key)?;
    first_string(entity.get("attributes")?, TITLE_KEYS)
}

fn str_of(v: &Value, key: &str) -> Option<String> {
    match v.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First non-null string among the alias keys, in priority order.
fn first_string(attrs: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| str_of(attrs, k))
}

/// Like `first_string` but keeps the raw value (states can be numeric codes).
fn first_value(attrs: &Value, keys: &[&str]) -> Option<Value> {
    keys.iter()
        .find_map(|k| attrs.get(*k))
        .filter(|v| !v.is_null())
        .cloned()
}
