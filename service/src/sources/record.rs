//! The normalized lawmaker shape and the mapping from raw source records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::descriptor::FieldMap;
use super::path::PayloadPath;

/// A lawmaker as every consumer sees it, regardless of source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LawmakerRecord {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub party: String,
    /// State or district, depending on the source.
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Result of normalizing one extracted record list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub records: Vec<LawmakerRecord>,
    pub dropped: usize,
}

/// Normalize every raw record, dropping the ones missing a required field.
#[must_use]
pub fn normalize_all(source: &str, raw: &[Value], fields: &FieldMap) -> Normalized {
    let mut records = Vec::with_capacity(raw.len());
    let mut dropped = 0;

    for (index, item) in raw.iter().enumerate() {
        if let Some(record) = normalize(item, fields) {
            records.push(record);
        } else {
            dropped += 1;
            tracing::debug!(source, index, "dropping record missing a required field");
        }
    }

    Normalized { records, dropped }
}

/// Map one raw record into a [`LawmakerRecord`].
///
/// Returns `None` if the record is not an object or any of `id`,
/// `first_name`, `last_name`, `party`, `region` is absent after coercion.
#[must_use]
pub fn normalize(raw: &Value, fields: &FieldMap) -> Option<LawmakerRecord> {
    if !raw.is_object() {
        return None;
    }

    let optional = |path: Option<&PayloadPath>| path.and_then(|p| read_text(raw, p));

    Some(LawmakerRecord {
        id: read_text(raw, &fields.id)?,
        first_name: read_text(raw, &fields.first_name)?,
        last_name: read_text(raw, &fields.last_name)?,
        party: read_text(raw, &fields.party)?,
        region: read_text(raw, &fields.region)?,
        contact_url: optional(fields.contact_url.as_ref()),
        phone: optional(fields.phone.as_ref()),
        email: optional(fields.email.as_ref()),
    })
}

/// Strings are trimmed (blank counts as absent) and numbers are rendered in
/// decimal; anything else is absent.
fn read_text(raw: &Value, path: &PayloadPath) -> Option<String> {
    match path.resolve(raw)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
