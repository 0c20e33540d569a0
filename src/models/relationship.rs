//! Relationship models for the SDK

use super::enums::RelationshipType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Waypoint of a relationship connector on the canvas
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ConnectionPoint {
    pub x: f64,
    pub y: f64,
}

/// Edge connecting a primary-key field to its dependent foreign-key field
///
/// The source side is always the referenced primary key. The dependent field lives at
/// `fk_table_id`/`fk_field_id` when both are set; `target_table_id`/`target_field_id`
/// are the fallback location kept for older project files.
///
/// # Example
///
/// ```rust
/// use schema_graph_sdk::models::Relationship;
///
/// let mut rel = Relationship::new("T1", "F1", "T2", "F2");
/// assert_eq!(rel.dependent_location(), ("T2", "F2"));
///
/// rel.fk_table_id = Some("T9".to_string());
/// rel.fk_field_id = Some("F9".to_string());
/// assert_eq!(rel.dependent_location(), ("T9", "F9"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    pub id: String,
    pub source_table_id: String,
    pub source_field_id: String,
    pub target_table_id: String,
    pub target_field_id: String,
    #[serde(default)]
    pub relationship_type: RelationshipType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fk_table_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fk_field_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_points: Vec<ConnectionPoint>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Relationship {
    /// Create a relationship with an explicit dependent location on both the fallback and
    /// authoritative endpoints.
    pub fn new(
        source_table_id: impl Into<String>,
        source_field_id: impl Into<String>,
        fk_table_id: impl Into<String>,
        fk_field_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let fk_table_id = fk_table_id.into();
        let fk_field_id = fk_field_id.into();
        Self {
            id: Uuid::new_v4().to_string(),
            source_table_id: source_table_id.into(),
            source_field_id: source_field_id.into(),
            target_table_id: fk_table_id.clone(),
            target_field_id: fk_field_id.clone(),
            relationship_type: RelationshipType::default(),
            constraint_name: None,
            fk_table_id: Some(fk_table_id),
            fk_field_id: Some(fk_field_id),
            line_points: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Location `(table_id, field_id)` of the dependent foreign-key field
    pub fn dependent_location(&self) -> (&str, &str) {
        match (&self.fk_table_id, &self.fk_field_id) {
            (Some(table), Some(field)) if !table.is_empty() && !field.is_empty() => {
                (table.as_str(), field.as_str())
            }
            _ => (self.target_table_id.as_str(), self.target_field_id.as_str()),
        }
    }

    /// Location `(table_id, field_id)` of the referenced primary-key field
    pub fn source_location(&self) -> (&str, &str) {
        (self.source_table_id.as_str(), self.source_field_id.as_str())
    }

    /// Whether any endpoint (source, fallback target or dependent) sits in `table_id`
    pub fn touches_table(&self, table_id: &str) -> bool {
        self.source_table_id == table_id
            || self.target_table_id == table_id
            || self.dependent_location().0 == table_id
    }

    /// Whether any endpoint field equals `(table_id, field_id)`
    pub fn touches_field(&self, table_id: &str, field_id: &str) -> bool {
        (self.source_table_id == table_id && self.source_field_id == field_id)
            || (self.target_table_id == table_id && self.target_field_id == field_id)
            || self.dependent_location() == (table_id, field_id)
    }
}

/// Visual link from a source table to a metric view built on it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRelationship {
    pub id: String,
    pub source_table_id: String,
    pub metric_view_id: String,
    #[serde(default = "default_metric_relationship_type")]
    pub relationship_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_mappings: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_points: Vec<ConnectionPoint>,
    pub created_at: DateTime<Utc>,
}

fn default_metric_relationship_type() -> String {
    "source_to_metric".to_string()
}

impl MetricRelationship {
    pub fn new(source_table_id: impl Into<String>, metric_view_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_table_id: source_table_id.into(),
            metric_view_id: metric_view_id.into(),
            relationship_type: default_metric_relationship_type(),
            field_mappings: Vec::new(),
            line_points: Vec::new(),
            created_at: Utc::now(),
        }
    }
}
