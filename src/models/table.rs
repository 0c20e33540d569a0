//! Table model for the SDK

use super::enums::{StorageFormat, TableKind};
use super::field::Field;
use super::tag::TagMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canvas position of a node (presentation only)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Default for Position {
    fn default() -> Self {
        Self { x: 100.0, y: 100.0 }
    }
}

/// Canvas size of a node (presentation only)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Default for Size {
    fn default() -> Self {
        Self {
            width: 200.0,
            height: 150.0,
        }
    }
}

/// Table model with an ordered list of fields
///
/// Field order is significant: it is the column order of the generated `CREATE TABLE`
/// and the order in which foreign key constraints of the table are emitted.
///
/// # Example
///
/// ```rust
/// use schema_graph_sdk::models::{DataType, Field, Table};
///
/// let table = Table::new("orders")
///     .with_id("T1")
///     .with_field(Field::new("order_id", DataType::Int).with_id("F1").primary_key());
///
/// assert_eq!(table.primary_key_fields().count(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Table {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub table_kind: TableKind,
    #[serde(default)]
    pub storage_format: StorageFormat,
    /// Storage path for EXTERNAL tables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,
    #[serde(default)]
    pub tags: TagMap,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub size: Size,
    #[serde(default)]
    pub fields: Vec<Field>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Table {
    /// Create an empty managed Delta table with a fresh id and current timestamps
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            logical_name: None,
            comment: None,
            table_kind: TableKind::Managed,
            storage_format: StorageFormat::Delta,
            storage_location: None,
            tags: TagMap::new(),
            position: Position::default(),
            size: Size::default(),
            fields: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, field_id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == field_id)
    }

    pub fn field_mut(&mut self, field_id: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.id == field_id)
    }

    /// Look up a field by name, ignoring ASCII case
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn primary_key_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_primary_key)
    }

    /// Refresh `updated_at`
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
