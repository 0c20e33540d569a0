//! Referential integrity checks
//!
//! These checks define a consistent project: unique ids, relationships whose endpoints
//! resolve, foreign-key references that resolve and keep `is_foreign_key` set, and metric
//! relationships between existing entities. The store runs them before committing any
//! mutation; the compiler runs them as part of its aggregated validation.

use crate::error::SchemaError;
use crate::models::{Project, Table};
use std::collections::{HashMap, HashSet};

/// Referential integrity validator
#[derive(Default)]
pub struct IntegrityValidator;

impl IntegrityValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check every graph invariant and report all violations.
    ///
    /// # Example
    ///
    /// ```rust
    /// use schema_graph_sdk::models::{DataType, Field, Project, Table};
    /// use schema_graph_sdk::validation::integrity::IntegrityValidator;
    ///
    /// let mut project = Project::new("p", "main", "sales");
    /// project.tables.push(
    ///     Table::new("line_items")
    ///         .with_field(Field::new("order_id", DataType::Int).references("missing", "F1")),
    /// );
    ///
    /// assert_eq!(IntegrityValidator::new().check_project(&project).len(), 1);
    /// ```
    pub fn check_project(&self, project: &Project) -> Vec<SchemaError> {
        let mut errors = Vec::new();
        let tables = index_tables(project, &mut errors);

        let field_exists = |table_id: &str, field_id: &str| {
            tables
                .get(table_id)
                .is_some_and(|t| t.field(field_id).is_some())
        };

        for table in &project.tables {
            for field in &table.fields {
                let Some(reference) = &field.foreign_key_reference else {
                    continue;
                };
                if !field.is_foreign_key {
                    errors.push(SchemaError::validation(
                        &field.id,
                        format!(
                            "field '{}.{}' has a foreign key reference but is not flagged as a foreign key",
                            table.name, field.name
                        ),
                    ));
                }
                if !field_exists(&reference.referenced_table_id, &reference.referenced_field_id) {
                    errors.push(SchemaError::integrity(
                        &field.id,
                        format!(
                            "field '{}.{}' references missing field {}.{}",
                            table.name,
                            field.name,
                            reference.referenced_table_id,
                            reference.referenced_field_id
                        ),
                    ));
                }
            }
        }

        let mut relationship_ids = HashSet::new();
        for relationship in &project.relationships {
            if !relationship_ids.insert(relationship.id.as_str()) {
                errors.push(SchemaError::duplicate(
                    &relationship.id,
                    "relationship id appears twice",
                ));
            }

            let mut endpoints = vec![
                ("source", relationship.source_location()),
                (
                    "target",
                    (
                        relationship.target_table_id.as_str(),
                        relationship.target_field_id.as_str(),
                    ),
                ),
            ];
            if relationship.fk_table_id.is_some() || relationship.fk_field_id.is_some() {
                endpoints.push(("foreign key", relationship.dependent_location()));
            }
            for (label, (table_id, field_id)) in endpoints {
                if !field_exists(table_id, field_id) {
                    errors.push(SchemaError::integrity(
                        &relationship.id,
                        format!("{} endpoint {}.{} does not exist", label, table_id, field_id),
                    ));
                }
            }
        }

        let metric_view_ids: HashSet<&str> =
            project.metric_views.iter().map(|v| v.id.as_str()).collect();
        for link in &project.metric_relationships {
            if !tables.contains_key(link.source_table_id.as_str()) {
                errors.push(SchemaError::integrity(
                    &link.id,
                    format!("source table {} does not exist", link.source_table_id),
                ));
            }
            if !metric_view_ids.contains(link.metric_view_id.as_str()) {
                errors.push(SchemaError::integrity(
                    &link.id,
                    format!("metric view {} does not exist", link.metric_view_id),
                ));
            }
        }

        errors
    }

    /// Check that views only read tables of the project.
    ///
    /// Views may outlive the tables they read while a project is being edited, so this is a
    /// compile-time check rather than a store invariant.
    pub fn check_view_sources(&self, project: &Project) -> Vec<SchemaError> {
        let table_ids: HashSet<&str> = project.tables.iter().map(|t| t.id.as_str()).collect();
        let mut errors = Vec::new();
        let mut view_ids = HashSet::new();

        for view in &project.metric_views {
            if !view_ids.insert(view.id.as_str()) {
                errors.push(SchemaError::duplicate(&view.id, "view id appears twice"));
            }
            for table_id in view.dependency_table_ids() {
                if !table_ids.contains(table_id) {
                    errors.push(SchemaError::integrity(
                        &view.id,
                        format!("metric view '{}' reads missing table {}", view.name, table_id),
                    ));
                }
            }
        }

        for view in &project.traditional_views {
            if !view_ids.insert(view.id.as_str()) {
                errors.push(SchemaError::duplicate(&view.id, "view id appears twice"));
            }
            for table_id in &view.referenced_table_ids {
                if !table_ids.contains(table_id.as_str()) {
                    errors.push(SchemaError::integrity(
                        &view.id,
                        format!("view '{}' reads missing table {}", view.name, table_id),
                    ));
                }
            }
        }

        errors
    }
}

fn index_tables<'a>(project: &'a Project, errors: &mut Vec<SchemaError>) -> HashMap<&'a str, &'a Table> {
    let mut tables = HashMap::with_capacity(project.tables.len());
    for table in &project.tables {
        if tables.insert(table.id.as_str(), table).is_some() {
            errors.push(SchemaError::duplicate(&table.id, "table id appears twice"));
        }
        let mut field_ids = HashSet::new();
        for field in &table.fields {
            if !field_ids.insert(field.id.as_str()) {
                errors.push(SchemaError::duplicate(
                    &field.id,
                    format!("field id appears twice in table '{}'", table.name),
                ));
            }
        }
    }
    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataType, Field, MetricRelationship, MetricView, Relationship};

    fn project() -> Project {
        let mut project = Project::new("p", "main", "sales");
        project.tables.push(
            Table::new("orders")
                .with_id("T1")
                .with_field(Field::new("order_id", DataType::Int).with_id("F1").primary_key()),
        );
        project.tables.push(
            Table::new("line_items")
                .with_id("T2")
                .with_field(
                    Field::new("order_id", DataType::Int)
                        .with_id("F2")
                        .references("T1", "F1"),
                ),
        );
        project
            .relationships
            .push(Relationship::new("T1", "F1", "T2", "F2").with_id("R1"));
        project
    }

    #[test]
    fn consistent_project_passes() {
        assert!(IntegrityValidator::new().check_project(&project()).is_empty());
    }

    #[test]
    fn flags_reference_without_flag() {
        let mut project = project();
        project.tables[1].fields[0].is_foreign_key = false;
        let errors = IntegrityValidator::new().check_project(&project);
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], SchemaError::Validation { entity_id, .. } if entity_id == "F2"));
    }

    #[test]
    fn flags_dangling_relationship_endpoints() {
        let mut project = project();
        project.relationships[0].fk_field_id = Some("F9".into());
        let errors = IntegrityValidator::new().check_project(&project);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            SchemaError::ReferentialIntegrity { entity_id, .. } if entity_id == "R1"
        ));
    }

    #[test]
    fn flags_duplicate_ids_and_metric_links() {
        let mut project = project();
        let copy = project.tables[0].clone();
        project.tables.push(copy);
        project
            .metric_relationships
            .push(MetricRelationship::new("T1", "MV404"));
        let errors = IntegrityValidator::new().check_project(&project);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn view_sources_must_exist() {
        let mut project = project();
        project.metric_views.push(MetricView::new("sales", "T404").with_id("MV1"));
        let errors = IntegrityValidator::new().check_view_sources(&project);
        assert_eq!(errors.len(), 1);
    }
}
