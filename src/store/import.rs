//! Merging tables imported from a catalog

use super::SchemaGraph;
use crate::error::{SchemaError, SchemaResult};
use crate::models::{ForeignKeyOrigin, ForeignKeyReference, Relationship, Table};
use crate::validation::TableValidator;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

/// Tables and relationships returned by a catalog import, already in model shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogImport {
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// Ids of the entities added by a merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub tables_added: Vec<String>,
    pub relationships_added: Vec<String>,
}

impl SchemaGraph {
    /// Merge imported tables and relationships into the project.
    ///
    /// All or nothing: any imported table whose id is already taken, or whose name matches
    /// another table ignoring case (in the project or earlier in the batch), rejects the
    /// whole import with `DuplicateEntity`. Relationships must resolve against the merged
    /// project; their dependent fields gain the matching foreign key reference when they
    /// lack one.
    pub fn merge_import(&mut self, import: CatalogImport) -> SchemaResult<ImportSummary> {
        self.apply(|project, now| {
            let conflicts =
                TableValidator::new().detect_naming_conflicts(&project.tables, &import.tables);
            if let Some(conflict) = conflicts.into_iter().next() {
                return Err(conflict.into_error());
            }

            let mut relationship_ids: HashSet<String> =
                project.relationships.iter().map(|r| r.id.clone()).collect();
            for relationship in &import.relationships {
                if !relationship_ids.insert(relationship.id.clone()) {
                    return Err(SchemaError::duplicate(
                        &relationship.id,
                        "relationship id already exists",
                    ));
                }
            }

            let mut summary = ImportSummary::default();
            for mut table in import.tables {
                table.touch(now);
                summary.tables_added.push(table.id.clone());
                project.tables.push(table);
            }

            for relationship in import.relationships {
                let (pk_table_id, pk_field_id) = relationship.source_location();
                let pk_name = project
                    .table(pk_table_id)
                    .and_then(|t| t.field(pk_field_id))
                    .map(|f| f.name.clone());
                let (fk_table_id, fk_field_id) = relationship.dependent_location();
                if let Some(table) = project.table_mut(fk_table_id)
                    && let Some(field) = table.field_mut(fk_field_id)
                    && field.foreign_key_reference.is_none()
                {
                    let origin = if pk_name.as_deref() == Some(field.name.as_str()) {
                        ForeignKeyOrigin::Linked
                    } else {
                        ForeignKeyOrigin::Independent
                    };
                    let mut reference = ForeignKeyReference::new(pk_table_id, pk_field_id);
                    reference.constraint_name = relationship.constraint_name.clone();
                    field.attach_reference(reference, origin);
                }
                summary.relationships_added.push(relationship.id.clone());
                project.relationships.push(relationship);
            }

            info!(
                "Merged import: {} table(s), {} relationship(s)",
                summary.tables_added.len(),
                summary.relationships_added.len()
            );
            Ok(summary)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataType, Field};
    use crate::store::TableSpec;

    fn graph() -> SchemaGraph {
        let mut graph = SchemaGraph::empty("p", "main", "sales");
        graph
            .add_table(
                TableSpec::new("Orders")
                    .with_id("T1")
                    .with_field(Field::new("order_id", DataType::Int).with_id("F1").primary_key()),
            )
            .unwrap();
        graph
    }

    #[test]
    fn name_collision_rejects_whole_batch() {
        let mut graph = graph();
        let import = CatalogImport {
            tables: vec![Table::new("customers").with_id("T2"), Table::new("orders").with_id("T3")],
            relationships: Vec::new(),
        };
        let err = graph.merge_import(import).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateEntity { entity_id, .. } if entity_id == "T3"));
        assert_eq!(graph.project().tables.len(), 1);
    }

    #[test]
    fn relationships_attach_references() {
        let mut graph = graph();
        let import = CatalogImport {
            tables: vec![Table::new("line_items")
                .with_id("T2")
                .with_field(Field::new("order_id", DataType::Int).with_id("F2"))],
            relationships: vec![Relationship::new("T1", "F1", "T2", "F2").with_id("R1")],
        };
        let summary = graph.merge_import(import).unwrap();
        assert_eq!(summary.tables_added, vec!["T2"]);
        assert_eq!(summary.relationships_added, vec!["R1"]);

        let field = graph.project().tables[1].field("F2").unwrap();
        assert!(field.references_field("T1", "F1"));
        assert_eq!(field.foreign_key_origin, Some(ForeignKeyOrigin::Linked));
    }

    #[test]
    fn dangling_relationship_rejects_import() {
        let mut graph = graph();
        let import = CatalogImport {
            tables: Vec::new(),
            relationships: vec![Relationship::new("T1", "F1", "T9", "F9")],
        };
        assert!(matches!(
            graph.merge_import(import),
            Err(SchemaError::ReferentialIntegrity { .. })
        ));
    }
}
