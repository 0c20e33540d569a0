//! Project aggregate
//!
//! The project is the single root of an editing session. Everything the store mutates and
//! the compiler reads hangs off it.

use super::relationship::{MetricRelationship, Relationship};
use super::table::Table;
use super::view::{MetricView, TraditionalView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_version() -> String {
    "1.0".to_string()
}

/// Canonical project representation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub catalog_name: String,
    pub schema_name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// Opaque canvas state owned by the designer UI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_settings: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub metric_views: Vec<MetricView>,
    #[serde(default)]
    pub traditional_views: Vec<TraditionalView>,
    #[serde(default)]
    pub metric_relationships: Vec<MetricRelationship>,
}

impl Project {
    /// Create an empty project targeting `catalog.schema`
    pub fn new(
        name: impl Into<String>,
        catalog_name: impl Into<String>,
        schema_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            catalog_name: catalog_name.into(),
            schema_name: schema_name.into(),
            version: default_version(),
            description: None,
            created_by: None,
            canvas_settings: None,
            created_at: now,
            updated_at: now,
            tables: Vec::new(),
            relationships: Vec::new(),
            metric_views: Vec::new(),
            traditional_views: Vec::new(),
            metric_relationships: Vec::new(),
        }
    }

    pub fn table(&self, table_id: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == table_id)
    }

    pub fn table_mut(&mut self, table_id: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.id == table_id)
    }

    /// Look up a table by name, ignoring ASCII case
    pub fn table_by_name(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn relationship(&self, relationship_id: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.id == relationship_id)
    }

    pub fn metric_view(&self, view_id: &str) -> Option<&MetricView> {
        self.metric_views.iter().find(|v| v.id == view_id)
    }

    pub fn traditional_view(&self, view_id: &str) -> Option<&TraditionalView> {
        self.traditional_views.iter().find(|v| v.id == view_id)
    }

    /// Three-part name of a table in the project's target schema
    pub fn qualified_name(&self, table_name: &str) -> String {
        format!("{}.{}.{}", self.catalog_name, self.schema_name, table_name)
    }
}
