//! Relationship lifecycle
//!
//! Deleting a relationship reconciles the dependent foreign-key field: a linked field is
//! removed from its table, an independent one is kept as a plain column. Deleting a table
//! applies the same reconciliation to every relationship that touches it.
//!
//! Functions here mutate the project they are given. The store hands them a working copy
//! and only commits it once they succeed.

use crate::error::{EntityKind, SchemaError, SchemaResult};
use crate::models::{ForeignKeyOrigin, Project, Relationship, Table};
use crate::sync::{OriginPolicy, classify_foreign_key};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// What happened to the dependent field of a deleted relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reconciliation {
    /// Linked foreign key removed from its table
    Removed,
    /// Independent foreign key turned back into a plain field
    Detached,
    /// Field now references another key and was left alone
    Untouched,
    /// Field was already gone (bulk deletion only)
    Missing,
    /// Field lived in the table being deleted
    Skipped,
}

/// Outcome of removing a table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use = "the outcome lists the relationships and fields affected by the deletion"]
pub struct TableDeletion {
    pub table: Table,
    pub removed_relationships: Vec<String>,
    pub reconciled: Vec<(String, Reconciliation)>,
}

/// Delete a relationship and reconcile its dependent field.
///
/// Fails with `NotFound` for an unknown id and with `ReferentialIntegrity` when the
/// dependent field cannot be located.
pub fn delete_relationship(
    project: &mut Project,
    relationship_id: &str,
    policy: OriginPolicy,
    now: DateTime<Utc>,
) -> SchemaResult<(Relationship, Reconciliation)> {
    let relationship = project
        .relationship(relationship_id)
        .cloned()
        .ok_or_else(|| SchemaError::not_found(EntityKind::Relationship, relationship_id))?;

    let outcome = reconcile_dependent(project, &relationship, policy, true, now)?;
    project.relationships.retain(|r| r.id != relationship.id);

    info!(
        "Deleted relationship {} (dependent field {:?})",
        relationship.id, outcome
    );
    Ok((relationship, outcome))
}

/// Delete a table together with every relationship that touches it.
///
/// Relationships whose dependent field lives in another table reconcile that field exactly
/// as [`delete_relationship`] would. Foreign keys referencing the table without a
/// relationship record are detached, and metric relationships from the table are dropped.
pub fn delete_table(
    project: &mut Project,
    table_id: &str,
    policy: OriginPolicy,
    now: DateTime<Utc>,
) -> SchemaResult<TableDeletion> {
    if project.table(table_id).is_none() {
        return Err(SchemaError::not_found(EntityKind::Table, table_id));
    }

    let collected: Vec<Relationship> = project
        .relationships
        .iter()
        .filter(|r| r.touches_table(table_id))
        .cloned()
        .collect();

    let mut reconciled = Vec::with_capacity(collected.len());
    for relationship in &collected {
        let outcome = if relationship.dependent_location().0 == table_id {
            Reconciliation::Skipped
        } else {
            reconcile_dependent(project, relationship, policy, false, now)?
        };
        reconciled.push((relationship.id.clone(), outcome));
    }

    let position = project
        .tables
        .iter()
        .position(|t| t.id == table_id)
        .ok_or_else(|| SchemaError::not_found(EntityKind::Table, table_id))?;
    let table = project.tables.remove(position);

    let collected_ids: HashSet<&str> = collected.iter().map(|r| r.id.as_str()).collect();
    project
        .relationships
        .retain(|r| !collected_ids.contains(r.id.as_str()) && !r.touches_table(table_id));

    for other in project.tables.iter_mut() {
        let mut touched = false;
        for field in other.fields.iter_mut().filter(|f| f.references_table(table_id)) {
            debug!(
                "Detaching foreign key {}.{} from deleted table {}",
                other.id, field.id, table_id
            );
            field.detach_reference();
            touched = true;
        }
        if touched {
            other.touch(now);
        }
    }

    project
        .metric_relationships
        .retain(|m| m.source_table_id != table_id);

    info!(
        "Deleted table {} ({}) with {} relationship(s)",
        table.id,
        table.name,
        collected.len()
    );

    Ok(TableDeletion {
        table,
        removed_relationships: collected.into_iter().map(|r| r.id).collect(),
        reconciled,
    })
}

/// Remove a field and everything that pointed at it.
///
/// Relationships with an endpoint on the field are dropped and foreign keys referencing it
/// are detached. Returns the ids of the dropped relationships.
pub(crate) fn purge_field(
    project: &mut Project,
    table_id: &str,
    field_id: &str,
    now: DateTime<Utc>,
) -> Vec<String> {
    if let Some(table) = project.table_mut(table_id) {
        table.fields.retain(|f| f.id != field_id);
        table.touch(now);
    }
    cascade_field_removal(project, table_id, field_id, now)
}

/// Drop relationships and detach references left dangling by a removed field.
pub(crate) fn cascade_field_removal(
    project: &mut Project,
    table_id: &str,
    field_id: &str,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut removed = Vec::new();
    project.relationships.retain(|r| {
        if r.touches_field(table_id, field_id) {
            removed.push(r.id.clone());
            false
        } else {
            true
        }
    });

    for table in project.tables.iter_mut() {
        let mut touched = false;
        for field in table
            .fields
            .iter_mut()
            .filter(|f| f.references_field(table_id, field_id))
        {
            field.detach_reference();
            touched = true;
        }
        if touched {
            table.touch(now);
        }
    }

    removed
}

fn reconcile_dependent(
    project: &mut Project,
    relationship: &Relationship,
    policy: OriginPolicy,
    strict: bool,
    now: DateTime<Utc>,
) -> SchemaResult<Reconciliation> {
    let (fk_table_id, fk_field_id) = relationship.dependent_location();
    let (pk_table_id, pk_field_id) = relationship.source_location();

    let Some(fk_field) = project
        .table(fk_table_id)
        .and_then(|t| t.field(fk_field_id))
    else {
        if strict {
            return Err(SchemaError::integrity(
                &relationship.id,
                format!(
                    "dependent field {}.{} does not exist",
                    fk_table_id, fk_field_id
                ),
            ));
        }
        return Ok(Reconciliation::Missing);
    };

    if let Some(reference) = &fk_field.foreign_key_reference
        && !reference.points_to(pk_table_id, pk_field_id)
    {
        return Ok(Reconciliation::Untouched);
    }

    let pk_name = project
        .table(pk_table_id)
        .and_then(|t| t.field(pk_field_id))
        .map(|f| f.name.clone());
    let origin = classify_foreign_key(fk_field, pk_name.as_deref(), policy);

    let fk_table_id = fk_table_id.to_string();
    let fk_field_id = fk_field_id.to_string();
    match origin {
        ForeignKeyOrigin::Linked => {
            // also drops the relationship being deleted
            purge_field(project, &fk_table_id, &fk_field_id, now);
            Ok(Reconciliation::Removed)
        }
        ForeignKeyOrigin::Independent => {
            if let Some(table) = project.table_mut(&fk_table_id) {
                if let Some(field) = table.field_mut(&fk_field_id) {
                    field.detach_reference();
                }
                table.touch(now);
            }
            Ok(Reconciliation::Detached)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataType, Field};

    fn project() -> Project {
        let mut project = Project::new("test", "main", "sales");
        project.tables.push(
            Table::new("customers")
                .with_id("T3")
                .with_field(Field::new("id", DataType::Int).with_id("F3").primary_key()),
        );
        project.tables.push(
            Table::new("invoices")
                .with_id("T4")
                .with_field(Field::new("invoice_id", DataType::Int).with_id("F5").primary_key())
                .with_field(
                    Field::new("customer_ref", DataType::Int)
                        .with_id("F4")
                        .references("T3", "F3"),
                )
                .with_field(Field::new("id", DataType::Int).with_id("F6").references("T3", "F3")),
        );
        project
            .relationships
            .push(Relationship::new("T3", "F3", "T4", "F4").with_id("R1"));
        project
            .relationships
            .push(Relationship::new("T3", "F3", "T4", "F6").with_id("R2"));
        project
    }

    #[test]
    fn unknown_relationship_is_not_found() {
        let mut project = project();
        let err = delete_relationship(&mut project, "nope", OriginPolicy::Explicit, Utc::now())
            .unwrap_err();
        assert_eq!(err, SchemaError::not_found(EntityKind::Relationship, "nope"));
    }

    #[test]
    fn independent_field_is_detached() {
        let mut project = project();
        let (_, outcome) =
            delete_relationship(&mut project, "R1", OriginPolicy::Explicit, Utc::now()).unwrap();
        assert_eq!(outcome, Reconciliation::Detached);
        let field = project.tables[1].field("F4").unwrap();
        assert!(!field.is_foreign_key);
        assert_eq!(field.name, "customer_ref");
        assert_eq!(project.relationships.len(), 1);
    }

    #[test]
    fn linked_field_is_removed() {
        let mut project = project();
        let (_, outcome) =
            delete_relationship(&mut project, "R2", OriginPolicy::Explicit, Utc::now()).unwrap();
        assert_eq!(outcome, Reconciliation::Removed);
        assert!(project.tables[1].field("F6").is_none());
        assert_eq!(project.relationships.len(), 1);
        assert_eq!(project.relationships[0].id, "R1");
    }

    #[test]
    fn deleting_referenced_table_reconciles_dependents() {
        let mut project = project();
        let deletion = delete_table(&mut project, "T3", OriginPolicy::Explicit, Utc::now()).unwrap();
        assert_eq!(deletion.removed_relationships, vec!["R1", "R2"]);
        assert!(project.relationships.is_empty());

        let invoices = &project.tables[0];
        assert_eq!(invoices.fields.len(), 2);
        assert!(!invoices.field("F4").unwrap().is_foreign_key);
        assert!(invoices.field("F6").is_none());
    }

    #[test]
    fn deleting_dependent_table_skips_reconciliation() {
        let mut project = project();
        let deletion = delete_table(&mut project, "T4", OriginPolicy::Explicit, Utc::now()).unwrap();
        assert!(
            deletion
                .reconciled
                .iter()
                .all(|(_, outcome)| *outcome == Reconciliation::Skipped)
        );
        assert_eq!(project.tables.len(), 1);
        assert_eq!(project.tables[0].fields.len(), 1);
    }
}
