//! Relationship validation functionality
//!
//! Checks the endpoints of a relationship before it is created and previews whether it
//! would close a dependency cycle.

use crate::compiler::graph::DependencyGraph;
use crate::error::{SchemaError, SchemaResult};
use crate::models::Project;

/// Relationship validator
#[derive(Default)]
pub struct RelationshipValidator;

impl RelationshipValidator {
    /// Create a new relationship validator
    ///
    /// # Example
    ///
    /// ```rust
    /// use schema_graph_sdk::validation::relationships::RelationshipValidator;
    ///
    /// let validator = RelationshipValidator::new();
    /// ```
    pub fn new() -> Self {
        Self
    }

    /// Check that both ends of a prospective relationship exist.
    ///
    /// # Arguments
    ///
    /// * `relationship_id` - Id reported in the error
    /// * `source` - `(table_id, field_id)` of the referenced primary key
    /// * `dependent` - `(table_id, field_id)` of the foreign-key field
    pub fn check_endpoints(
        &self,
        project: &Project,
        relationship_id: &str,
        source: (&str, &str),
        dependent: (&str, &str),
    ) -> SchemaResult<()> {
        for (label, (table_id, field_id)) in [("source", source), ("foreign key", dependent)] {
            let Some(table) = project.table(table_id) else {
                return Err(SchemaError::integrity(
                    relationship_id,
                    format!("{} table {} does not exist", label, table_id),
                ));
            };
            if table.field(field_id).is_none() {
                return Err(SchemaError::integrity(
                    relationship_id,
                    format!(
                        "{} field {} does not exist in table '{}'",
                        label, field_id, table.name
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Check whether making `dependent_table_id` depend on `source_table_id` closes a cycle
    ///
    /// # Returns
    ///
    /// The existing dependency path from the source table back to the dependent table, or
    /// `None` when the new edge keeps the graph acyclic. Self references never count.
    ///
    /// # Example
    ///
    /// ```rust
    /// use schema_graph_sdk::models::{DataType, Field, Project, Table};
    /// use schema_graph_sdk::validation::relationships::RelationshipValidator;
    ///
    /// let mut project = Project::new("p", "main", "sales");
    /// project.tables.push(Table::new("a").with_id("A").with_field(Field::new("id", DataType::Int).with_id("FA")));
    /// project.tables.push(
    ///     Table::new("b")
    ///         .with_id("B")
    ///         .with_field(Field::new("a_id", DataType::Int).with_id("FB").references("A", "FA")),
    /// );
    ///
    /// // A -> B would close A -> B -> A
    /// let path = RelationshipValidator::new().check_circular_dependency(&project, "A", "B");
    /// assert_eq!(path, Some(vec!["B".to_string(), "A".to_string()]));
    /// ```
    pub fn check_circular_dependency(
        &self,
        project: &Project,
        dependent_table_id: &str,
        source_table_id: &str,
    ) -> Option<Vec<String>> {
        if dependent_table_id == source_table_id {
            return None;
        }
        DependencyGraph::build(project).find_path(source_table_id, dependent_table_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataType, Field, Table};

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
                .with_field(Field::new("order_id", DataType::Int).with_id("F2")),
        );
        project
    }

    #[test]
    fn accepts_existing_endpoints() {
        let result =
            RelationshipValidator::new().check_endpoints(&project(), "R1", ("T1", "F1"), ("T2", "F2"));
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_missing_field() {
        let err = RelationshipValidator::new()
            .check_endpoints(&project(), "R1", ("T1", "F1"), ("T2", "F9"))
            .unwrap_err();
        assert!(matches!(err, SchemaError::ReferentialIntegrity { entity_id, .. } if entity_id == "R1"));
    }

    #[test]
    fn no_cycle_for_fresh_edge() {
        let validator = RelationshipValidator::new();
        assert_eq!(validator.check_circular_dependency(&project(), "T2", "T1"), None);
        assert_eq!(validator.check_circular_dependency(&project(), "T1", "T1"), None);
    }
}
