//! Project loading
//!
//! Reads a project document (JSON or YAML), normalizes legacy shapes and deserializes it
//! into the canonical [`Project`]. The loaded project is made referentially consistent:
//! relationships whose endpoints do not resolve are removed and reported as orphaned, and
//! foreign key references to missing fields are dropped with a warning.

use super::ProjectFormat;
use super::normalize::normalize_document;
use crate::models::{MetricRelationship, Project, Relationship};
use chrono::Utc;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Error raised while loading a project document
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Outcome of loading a project
#[derive(Debug, Clone)]
pub struct ProjectLoadResult {
    pub project: Project,
    /// Relationships removed because an endpoint does not exist
    pub orphaned_relationships: Vec<Relationship>,
    /// Metric relationships removed because their table or view does not exist
    pub orphaned_metric_relationships: Vec<MetricRelationship>,
    /// Values that were dropped or replaced while normalizing
    pub warnings: Vec<String>,
}

/// Loads project documents
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectLoader;

impl ProjectLoader {
    pub fn new() -> Self {
        Self
    }

    pub fn from_json_str(&self, content: &str) -> Result<ProjectLoadResult, LoadError> {
        let value: Value = serde_json::from_str(content)?;
        self.from_value(value)
    }

    pub fn from_yaml_str(&self, content: &str) -> Result<ProjectLoadResult, LoadError> {
        let value: Value = serde_yaml::from_str(content)?;
        self.from_value(value)
    }

    pub fn parse(
        &self,
        content: &str,
        format: ProjectFormat,
    ) -> Result<ProjectLoadResult, LoadError> {
        match format {
            ProjectFormat::Json => self.from_json_str(content),
            ProjectFormat::Yaml => self.from_yaml_str(content),
        }
    }

    /// Load a project file; `.yaml` and `.yml` files are read as YAML, anything else as JSON.
    pub fn load_file(&self, path: &Path) -> Result<ProjectLoadResult, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loading project from {}", path.display());
        self.parse(&content, ProjectFormat::from_path(path))
    }

    /// Normalize and deserialize a raw project document
    pub fn from_value(&self, mut document: Value) -> Result<ProjectLoadResult, LoadError> {
        let mut warnings = normalize_document(&mut document, Utc::now());
        let mut project: Project = serde_json::from_value(document)?;

        repair_references(&mut project, &mut warnings);
        let orphaned_relationships = remove_orphaned_relationships(&mut project);
        let orphaned_metric_relationships = remove_orphaned_metric_relationships(&mut project);

        for warning in &warnings {
            warn!("{}", warning);
        }
        info!(
            "Loaded project '{}': {} tables, {} relationships, {} orphaned",
            project.name,
            project.tables.len(),
            project.relationships.len(),
            orphaned_relationships.len() + orphaned_metric_relationships.len()
        );

        Ok(ProjectLoadResult {
            project,
            orphaned_relationships,
            orphaned_metric_relationships,
            warnings,
        })
    }
}

/// Field ids per table id
fn field_index(project: &Project) -> HashMap<String, HashSet<String>> {
    project
        .tables
        .iter()
        .map(|t| (t.id.clone(), t.fields.iter().map(|f| f.id.clone()).collect()))
        .collect()
}

/// Drop references to missing fields and keep the foreign key flag in line with the reference
fn repair_references(project: &mut Project, warnings: &mut Vec<String>) {
    let index = field_index(project);
    for table in project.tables.iter_mut() {
        for field in table.fields.iter_mut() {
            let Some(reference) = &field.foreign_key_reference else {
                continue;
            };
            let resolves = index
                .get(&reference.referenced_table_id)
                .is_some_and(|fields| fields.contains(&reference.referenced_field_id));
            if resolves {
                field.is_foreign_key = true;
            } else {
                warnings.push(format!(
                    "{}.{}: foreign key to missing field {}.{} was dropped",
                    table.name,
                    field.name,
                    reference.referenced_table_id,
                    reference.referenced_field_id
                ));
                field.detach_reference();
            }
        }
    }
}

fn remove_orphaned_relationships(project: &mut Project) -> Vec<Relationship> {
    let index = field_index(project);
    let exists = |(table_id, field_id): (&str, &str)| {
        index
            .get(table_id)
            .is_some_and(|fields| fields.contains(field_id))
    };

    let (kept, orphaned): (Vec<Relationship>, Vec<Relationship>) =
        std::mem::take(&mut project.relationships)
            .into_iter()
            .partition(|r| {
                exists(r.source_location())
                    && exists((r.target_table_id.as_str(), r.target_field_id.as_str()))
                    && exists(r.dependent_location())
            });
    for relationship in &orphaned {
        warn!(
            "Relationship {} references a missing table or field and was removed",
            relationship.id
        );
    }
    project.relationships = kept;
    orphaned
}

fn remove_orphaned_metric_relationships(project: &mut Project) -> Vec<MetricRelationship> {
    let tables: HashSet<&str> = project.tables.iter().map(|t| t.id.as_str()).collect();
    let views: HashSet<&str> = project.metric_views.iter().map(|v| v.id.as_str()).collect();

    let (kept, orphaned): (Vec<MetricRelationship>, Vec<MetricRelationship>) = project
        .metric_relationships
        .iter()
        .cloned()
        .partition(|m| {
            tables.contains(m.source_table_id.as_str())
                && views.contains(m.metric_view_id.as_str())
        });
    for link in &orphaned {
        warn!("Metric relationship {} is orphaned and was removed", link.id);
    }
    project.metric_relationships = kept;
    orphaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataType, TypeParameters};
    use serde_json::json;

    fn document() -> Value {
        json!({
            "id": "P1",
            "name": "shop",
            "catalog_name": "main",
            "schema_name": "sales",
            "created_at": "2024-01-01T10:00:00",
            "updated_at": "Mon, 01 Jan 2024 10:00:00 GMT",
            "tables": [
                {"id": "T1", "name": "orders", "fields": [
                    {"id": "F1", "name": "order_id", "data_type": "integer", "is_primary_key": true, "nullable": false},
                    {"id": "F2", "name": "total", "data_type": "DECIMAL", "type_parameters": "10,2"}
                ]},
                {"id": "T2", "name": "line_items", "tags": ["pii"], "fields": [
                    {"id": "F3", "name": "order_id", "data_type": "INT", "foreign_key_reference": "orders.order_id"},
                    {"id": "F4", "name": "product_id", "data_type": "INT", "is_foreign_key": true,
                     "foreign_key_reference": {"referenced_table_id": "T9", "referenced_field_id": "F9"}}
                ]}
            ],
            "relationships": [
                {"id": "R1", "source_table_id": "T1", "source_field_id": "F1",
                 "target_table_id": "T2", "target_field_id": "F3"},
                {"id": "R2", "source_table_id": "T9", "source_field_id": "F9",
                 "target_table_id": "T2", "target_field_id": "F4"}
            ]
        })
    }

    #[test]
    fn normalizes_and_removes_orphans() {
        let result = ProjectLoader::new().from_value(document()).unwrap();
        let project = &result.project;

        let orders = project.table("T1").unwrap();
        assert_eq!(orders.fields[0].data_type, DataType::Int);
        assert_eq!(
            orders.fields[1].type_parameters,
            Some(TypeParameters::decimal(10, 2))
        );

        let items = project.table("T2").unwrap();
        assert!(items.fields[0].references_field("T1", "F1"));
        assert!(items.fields[0].is_foreign_key);
        assert!(!items.fields[1].is_foreign_key);
        assert_eq!(items.tags.get("pii").map(String::as_str), Some(""));

        assert_eq!(project.relationships.len(), 1);
        assert_eq!(result.orphaned_relationships.len(), 1);
        assert_eq!(result.orphaned_relationships[0].id, "R2");
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(project.created_at, project.updated_at);
    }

    #[test]
    fn yaml_and_json_agree() {
        let mut document = document();
        for key in ["tables", "relationships"] {
            for entry in document[key].as_array_mut().unwrap() {
                entry["created_at"] = json!("2024-01-01T10:00:00Z");
                entry["updated_at"] = json!("2024-01-01T10:00:00Z");
            }
        }
        let json_text = serde_json::to_string(&document).unwrap();
        let yaml_text = serde_yaml::to_string(&document).unwrap();
        let loader = ProjectLoader::new();
        let from_json = loader.from_json_str(&json_text).unwrap();
        let from_yaml = loader.from_yaml_str(&yaml_text).unwrap();
        assert_eq!(from_json.project, from_yaml.project);
    }

    #[test]
    fn rejects_unknown_data_type() {
        let mut document = document();
        document["tables"][0]["fields"][0]["data_type"] = json!("HYPERLOGLOG");
        assert!(matches!(
            ProjectLoader::new().from_value(document),
            Err(LoadError::Json(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ProjectLoader::new()
            .load_file(Path::new("/nonexistent/project.json"))
            .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
