//! Legacy project document normalization
//!
//! Project files written by older designer versions differ from the canonical model in a
//! few places. They are rewritten here, on the raw JSON document, before typed
//! deserialization:
//! - timestamps in naive ISO, RFC 2822 or `Mon, 01 Jan 2024 10:00:00 GMT` form
//! - type parameters stored as strings (`"10,2"`, `"255"`, `"STRING, INT"`)
//! - parameterized data types such as `decimal(10,2)` or `ARRAY<STRING>`
//! - foreign keys stored as a `"table.field"` string
//! - tags stored as a list of strings
//! - tables and fields without ids

use crate::models::tag::tags_from_legacy_list;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use uuid::Uuid;

const TIMESTAMP_KEYS: [&str; 2] = ["created_at", "updated_at"];

/// Collections of the project document whose entries carry timestamps
const TIMESTAMPED_COLLECTIONS: [&str; 5] = [
    "tables",
    "relationships",
    "metric_views",
    "traditional_views",
    "metric_relationships",
];

/// Naive forms tried after RFC 3339, read as UTC
const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%a, %d %b %Y %H:%M:%S GMT",
];

/// Parse a timestamp in any of the forms project files have used.
///
/// # Example
///
/// ```rust
/// use schema_graph_sdk::model::normalize::parse_timestamp;
///
/// let a = parse_timestamp("Mon, 01 Jan 2024 10:00:00 GMT").unwrap();
/// let b = parse_timestamp("2024-01-01T10:00:00").unwrap();
/// assert_eq!(a, b);
/// ```
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

/// Canonical text form of a timestamp
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Convert a legacy string encoding of type parameters to its structured form.
///
/// Returns `None` when the text does not fit the data type.
///
/// # Example
///
/// ```rust
/// use schema_graph_sdk::model::normalize::legacy_type_parameters;
/// use serde_json::json;
///
/// assert_eq!(
///     legacy_type_parameters("DECIMAL", "10,2"),
///     Some(json!({"precision": 10, "scale": 2}))
/// );
/// assert_eq!(
///     legacy_type_parameters("MAP", "STRING, INT"),
///     Some(json!({"key_type": "STRING", "value_type": "INT"}))
/// );
/// ```
pub fn legacy_type_parameters(data_type: &str, raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match data_type {
        "DECIMAL" | "DEC" | "NUMERIC" => {
            let parts = split_top_level(raw);
            let precision: u32 = parts.first()?.parse().ok()?;
            let scale: u32 = match parts.get(1) {
                Some(scale) => scale.parse().ok()?,
                None => 0,
            };
            (parts.len() <= 2).then(|| json!({"precision": precision, "scale": scale}))
        }
        "VARCHAR" | "CHAR" => raw.parse::<u32>().ok().map(|length| json!({"length": length})),
        "ARRAY" => Some(json!({"element_type": raw.to_uppercase()})),
        "MAP" => match split_top_level(raw).as_slice() {
            [key, value] => Some(json!({
                "key_type": key.to_uppercase(),
                "value_type": value.to_uppercase(),
            })),
            _ => None,
        },
        "STRUCT" => {
            let members: Option<Vec<Value>> = split_top_level(raw)
                .into_iter()
                .map(|member| {
                    let (name, member_type) = member
                        .split_once(':')
                        .or_else(|| member.split_once(char::is_whitespace))?;
                    let (name, member_type) = (name.trim(), member_type.trim());
                    (!name.is_empty() && !member_type.is_empty()).then(|| {
                        json!({"name": name, "data_type": member_type.to_uppercase()})
                    })
                })
                .collect();
            members.map(|fields| json!({ "fields": fields }))
        }
        "INTERVAL" => Some(json!({"qualifier": raw.to_uppercase()})),
        "GEOGRAPHY" | "GEOMETRY" => raw.parse::<u32>().ok().map(|srid| json!({"srid": srid})),
        _ => None,
    }
}

/// Split `DECIMAL(10,2)` or `ARRAY<STRING>` into the base type and the parameter text
fn split_parameterized(data_type: &str) -> Option<(String, String)> {
    let data_type = data_type.trim();
    let open = data_type.find(['(', '<'])?;
    let close = if data_type[open..].starts_with('(') { ')' } else { '>' };
    let inner = data_type[open + 1..].strip_suffix(close)?;
    Some((data_type[..open].trim().to_uppercase(), inner.trim().to_string()))
}

/// Split on commas that are not nested inside parentheses or angle brackets
fn split_top_level(raw: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in raw.chars() {
        match c {
            '(' | '<' => depth += 1,
            ')' | '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    parts.push(current.trim().to_string());
    parts
}

/// Table and field ids by lowercase name, used to resolve `"table.field"` strings
struct NameIndex {
    tables: HashMap<String, (String, HashMap<String, String>)>,
}

impl NameIndex {
    fn build(tables: &[Value]) -> Self {
        let mut index = HashMap::new();
        for table in tables {
            let (Some(id), Some(name)) = (str_field(table, "id"), str_field(table, "name")) else {
                continue;
            };
            let fields: HashMap<String, String> = table
                .get("fields")
                .and_then(Value::as_array)
                .map(|fields| {
                    fields
                        .iter()
                        .filter_map(|f| {
                            let name = str_field(f, "name")?.to_lowercase();
                            Some((name, str_field(f, "id")?.to_string()))
                        })
                        .collect()
                })
                .unwrap_or_default();
            index
                .entry(name.to_lowercase())
                .or_insert_with(|| (id.to_string(), fields));
        }
        Self { tables: index }
    }

    /// Resolve `table.field`; longer dotted names use their last two parts
    fn resolve(&self, dotted: &str) -> Option<(String, String)> {
        let (table, field) = dotted.trim().rsplit_once('.')?;
        let table = table.rsplit('.').next()?.trim_matches('`');
        let (table_id, fields) = self.tables.get(&table.to_lowercase())?;
        let field_id = fields.get(&field.trim_matches('`').to_lowercase())?;
        Some((table_id.clone(), field_id.clone()))
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Rewrite a raw project document into canonical shape.
///
/// Returns a warning for every value that could not be carried over. Missing or unreadable
/// timestamps are set to `now`.
pub fn normalize_document(document: &mut Value, now: DateTime<Utc>) -> Vec<String> {
    let mut warnings = Vec::new();
    let Some(root) = document.as_object_mut() else {
        warnings.push("project document is not an object".to_string());
        return warnings;
    };

    normalize_timestamps(root, "project", now, &mut warnings);

    if let Some(tables) = root.get_mut("tables").and_then(Value::as_array_mut) {
        for table in tables.iter_mut() {
            assign_ids(table);
        }
        let index = NameIndex::build(tables);
        for table in tables.iter_mut() {
            normalize_table(table, &index, &mut warnings);
        }
    }

    for key in ["metric_views", "traditional_views"] {
        if let Some(views) = root.get_mut(key).and_then(Value::as_array_mut) {
            for view in views.iter_mut().filter_map(Value::as_object_mut) {
                normalize_tags(view);
            }
        }
    }

    for key in TIMESTAMPED_COLLECTIONS {
        if let Some(entries) = root.get_mut(key).and_then(Value::as_array_mut) {
            for entry in entries.iter_mut().filter_map(Value::as_object_mut) {
                let label = entry
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or("?")
                    .to_string();
                normalize_timestamps(entry, &label, now, &mut warnings);
            }
        }
    }

    warnings
}

fn assign_ids(table: &mut Value) {
    let Some(table) = table.as_object_mut() else {
        return;
    };
    table
        .entry("id")
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    if let Some(fields) = table.get_mut("fields").and_then(Value::as_array_mut) {
        for field in fields.iter_mut().filter_map(Value::as_object_mut) {
            field
                .entry("id")
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        }
    }
}

fn normalize_table(table: &mut Value, index: &NameIndex, warnings: &mut Vec<String>) {
    let Some(table) = table.as_object_mut() else {
        return;
    };
    normalize_tags(table);
    let table_name = table
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if let Some(fields) = table.get_mut("fields").and_then(Value::as_array_mut) {
        for field in fields.iter_mut().filter_map(Value::as_object_mut) {
            normalize_field(field, &table_name, index, warnings);
        }
    }
}

fn normalize_field(
    field: &mut Map<String, Value>,
    table_name: &str,
    index: &NameIndex,
    warnings: &mut Vec<String>,
) {
    normalize_tags(field);
    let field_name = field
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut legacy_parameters = match field.get("type_parameters") {
        Some(Value::String(raw)) => Some(raw.clone()),
        _ => None,
    };
    if let Some(Value::String(data_type)) = field.get("data_type") {
        let data_type = match split_parameterized(data_type) {
            Some((base, inner)) => {
                legacy_parameters.get_or_insert(inner);
                base
            }
            None => {
                let upper = data_type.trim().to_uppercase();
                match upper.strip_prefix("INTERVAL ") {
                    Some(qualifier) => {
                        legacy_parameters.get_or_insert(qualifier.trim().to_string());
                        "INTERVAL".to_string()
                    }
                    None => upper,
                }
            }
        };
        field.insert("data_type".to_string(), Value::String(data_type));
    }

    if let Some(raw) = legacy_parameters {
        let data_type = field
            .get("data_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        match legacy_type_parameters(&data_type, &raw) {
            Some(parameters) => {
                field.insert("type_parameters".to_string(), parameters);
            }
            None => {
                field.remove("type_parameters");
                if !raw.trim().is_empty() {
                    warnings.push(format!(
                        "{}.{}: dropped type parameters '{}' not valid for {}",
                        table_name, field_name, raw, data_type
                    ));
                }
            }
        }
    }

    if let Some(Value::String(dotted)) = field.get("foreign_key_reference") {
        let dotted = dotted.clone();
        match index.resolve(&dotted) {
            Some((table_id, field_id)) => {
                field.insert(
                    "foreign_key_reference".to_string(),
                    json!({
                        "referenced_table_id": table_id,
                        "referenced_field_id": field_id,
                    }),
                );
                field.insert("is_foreign_key".to_string(), Value::Bool(true));
            }
            None => {
                field.remove("foreign_key_reference");
                field.insert("is_foreign_key".to_string(), Value::Bool(false));
                warnings.push(format!(
                    "{}.{}: foreign key '{}' does not resolve and was dropped",
                    table_name, field_name, dotted
                ));
            }
        }
    }
}

fn normalize_tags(entity: &mut Map<String, Value>) {
    match entity.get("tags") {
        Some(Value::Array(entries)) => {
            let map = tags_from_legacy_list(entries.iter().filter_map(Value::as_str));
            let map: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            entity.insert("tags".to_string(), Value::Object(map));
        }
        Some(Value::Null) => {
            entity.remove("tags");
        }
        _ => {}
    }
}

fn normalize_timestamps(
    entity: &mut Map<String, Value>,
    label: &str,
    now: DateTime<Utc>,
    warnings: &mut Vec<String>,
) {
    for key in TIMESTAMP_KEYS {
        let parsed = match entity.get(key) {
            Some(Value::String(raw)) => {
                let parsed = parse_timestamp(raw);
                if parsed.is_none() {
                    warnings.push(format!("{}: unreadable {} '{}' replaced", label, key, raw));
                }
                parsed
            }
            _ => None,
        };
        let timestamp = parsed.unwrap_or(now);
        entity.insert(key.to_string(), Value::String(format_timestamp(&timestamp)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T10:00:00.000"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("Mon, 01 Jan 2024 10:00:00 GMT"), Some(expected));
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn legacy_parameters_by_type() {
        assert_eq!(
            legacy_type_parameters("DECIMAL", "18"),
            Some(json!({"precision": 18, "scale": 0}))
        );
        assert_eq!(legacy_type_parameters("VARCHAR", "255"), Some(json!({"length": 255})));
        assert_eq!(
            legacy_type_parameters("ARRAY", "string"),
            Some(json!({"element_type": "STRING"}))
        );
        assert_eq!(
            legacy_type_parameters("MAP", "STRING, DECIMAL(10,2)"),
            Some(json!({"key_type": "STRING", "value_type": "DECIMAL(10,2)"}))
        );
        assert_eq!(
            legacy_type_parameters("INTERVAL", "day to second"),
            Some(json!({"qualifier": "DAY TO SECOND"}))
        );
        assert_eq!(legacy_type_parameters("GEOGRAPHY", "4326"), Some(json!({"srid": 4326})));
        assert_eq!(
            legacy_type_parameters("STRUCT", "street STRING, zip:INT"),
            Some(json!({"fields": [
                {"name": "street", "data_type": "STRING"},
                {"name": "zip", "data_type": "INT"}
            ]}))
        );
        assert_eq!(legacy_type_parameters("VARCHAR", "wide"), None);
        assert_eq!(legacy_type_parameters("INT", "4"), None);
    }

    #[test]
    fn parameterized_type_names_are_split() {
        let mut document = json!({
            "tables": [{
                "id": "T1",
                "name": "orders",
                "fields": [
                    {"id": "F1", "name": "total", "data_type": "decimal(10,2)"},
                    {"id": "F2", "name": "labels", "data_type": "array<string>"}
                ]
            }]
        });
        let warnings = normalize_document(&mut document, now());
        assert!(warnings.is_empty());
        let fields = &document["tables"][0]["fields"];
        assert_eq!(fields[0]["data_type"], "DECIMAL");
        assert_eq!(fields[0]["type_parameters"], json!({"precision": 10, "scale": 2}));
        assert_eq!(fields[1]["data_type"], "ARRAY");
        assert_eq!(fields[1]["type_parameters"], json!({"element_type": "STRING"}));
    }

    #[test]
    fn dotted_foreign_keys_resolve_by_name() {
        let mut document = json!({
            "tables": [
                {"id": "T1", "name": "Orders", "fields": [{"id": "F1", "name": "Order_ID", "data_type": "INT"}]},
                {"id": "T2", "name": "items", "fields": [
                    {"id": "F2", "name": "order_id", "data_type": "INT", "foreign_key_reference": "orders.order_id"},
                    {"id": "F3", "name": "ghost", "data_type": "INT", "is_foreign_key": true, "foreign_key_reference": "nowhere.id"}
                ]}
            ]
        });
        let warnings = normalize_document(&mut document, now());
        let fields = &document["tables"][1]["fields"];
        assert_eq!(
            fields[0]["foreign_key_reference"],
            json!({"referenced_table_id": "T1", "referenced_field_id": "F1"})
        );
        assert_eq!(fields[0]["is_foreign_key"], true);
        assert!(fields[1].get("foreign_key_reference").is_none());
        assert_eq!(fields[1]["is_foreign_key"], false);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("nowhere.id"));
    }

    #[test]
    fn tag_lists_and_missing_timestamps() {
        let mut document = json!({
            "created_at": "Mon, 01 Jan 2024 10:00:00 GMT",
            "tables": [{"name": "orders", "tags": ["pii", "owner:data-team"], "fields": [{"name": "id", "data_type": "int"}]}]
        });
        normalize_document(&mut document, now());
        assert_eq!(document["created_at"], "2024-01-01T10:00:00Z");
        assert_eq!(document["updated_at"], "2025-06-01T12:00:00Z");

        let table = &document["tables"][0];
        assert_eq!(table["tags"], json!({"pii": "", "owner": "data-team"}));
        assert!(table["id"].is_string());
        assert!(table["fields"][0]["id"].is_string());
        assert_eq!(table["fields"][0]["data_type"], "INT");
        assert_eq!(table["created_at"], "2025-06-01T12:00:00Z");
    }
}
