//! Table and field mutations

use super::SchemaGraph;
use super::patch::{FieldPatch, TablePatch, TableSpec};
use crate::error::{EntityKind, SchemaError, SchemaResult};
use crate::lifecycle::{self, TableDeletion};
use crate::models::{Field, Project, Table};
use crate::sync::{ForeignKeySynchronizer, OriginPolicy, SyncedField};
use crate::validation::input::{validate_field_name, validate_table_name};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info};

impl SchemaGraph {
    /// Add a table.
    ///
    /// A missing id is generated. Fails with `DuplicateEntity` when the id is taken and with
    /// `Validation` for an unusable name.
    pub fn add_table(&mut self, spec: TableSpec) -> SchemaResult<Table> {
        self.apply(|project, now| {
            let table = spec.into_table(now);
            validate_table_name(&table.name).map_err(|e| e.for_entity(&table.id))?;
            for field in &table.fields {
                validate_field_name(&field.name).map_err(|e| e.for_entity(&field.id))?;
            }
            if project.table(&table.id).is_some() {
                return Err(SchemaError::duplicate(&table.id, "table id already exists"));
            }

            info!("Adding table {} ({})", table.name, table.id);
            project.tables.push(table.clone());
            Ok(table)
        })
    }

    /// Update a table.
    ///
    /// When the patch replaces the field list, removed fields take their relationships
    /// with them and primary keys whose shape changed are synchronised onto every foreign
    /// key that references them, all within this one mutation.
    pub fn update_table(&mut self, table_id: &str, patch: TablePatch) -> SchemaResult<Table> {
        let policy = self.policy();
        self.apply(|project, now| patch_table(project, table_id, &patch, policy, now))
    }

    /// Delete a table and reconcile every relationship touching it.
    pub fn delete_table(&mut self, table_id: &str) -> SchemaResult<TableDeletion> {
        let policy = self.policy();
        self.apply(|project, now| lifecycle::delete_table(project, table_id, policy, now))
    }

    /// Append a field to a table.
    pub fn add_field(&mut self, table_id: &str, field: Field) -> SchemaResult<Field> {
        let policy = self.policy();
        self.apply(|project, now| {
            let table = project
                .table(table_id)
                .ok_or_else(|| SchemaError::not_found(EntityKind::Table, table_id))?;
            validate_field_name(&field.name).map_err(|e| e.for_entity(&field.id))?;
            if table.field(&field.id).is_some() {
                return Err(SchemaError::duplicate(
                    &field.id,
                    format!("field id already exists in table '{}'", table.name),
                ));
            }

            let mut fields = table.fields.clone();
            fields.push(field.clone());
            patch_table(project, table_id, &TablePatch::fields(fields), policy, now)?;
            Ok(field)
        })
    }

    /// Update one field of a table.
    ///
    /// Goes through the same path as [`SchemaGraph::update_table`], so primary key changes
    /// reach their foreign keys.
    pub fn update_field(
        &mut self,
        table_id: &str,
        field_id: &str,
        patch: FieldPatch,
    ) -> SchemaResult<Field> {
        let policy = self.policy();
        self.apply(|project, now| {
            let mut fields = project
                .table(table_id)
                .ok_or_else(|| SchemaError::not_found(EntityKind::Table, table_id))?
                .fields
                .clone();
            let field = fields
                .iter_mut()
                .find(|f| f.id == field_id)
                .ok_or_else(|| SchemaError::not_found(EntityKind::Field, field_id))?;
            patch.apply(field);
            validate_field_name(&field.name).map_err(|e| e.for_entity(field_id))?;

            let table = patch_table(project, table_id, &TablePatch::fields(fields), policy, now)?;
            table
                .field(field_id)
                .cloned()
                .ok_or_else(|| SchemaError::not_found(EntityKind::Field, field_id))
        })
    }

    /// Remove a field.
    ///
    /// Relationships with an endpoint on the field are removed and foreign keys that
    /// referenced it become plain fields.
    pub fn delete_field(&mut self, table_id: &str, field_id: &str) -> SchemaResult<Field> {
        let policy = self.policy();
        self.apply(|project, now| {
            let table = project
                .table(table_id)
                .ok_or_else(|| SchemaError::not_found(EntityKind::Table, table_id))?;
            let removed = table
                .field(field_id)
                .cloned()
                .ok_or_else(|| SchemaError::not_found(EntityKind::Field, field_id))?;
            let fields: Vec<Field> = table
                .fields
                .iter()
                .filter(|f| f.id != field_id)
                .cloned()
                .collect();

            patch_table(project, table_id, &TablePatch::fields(fields), policy, now)?;
            info!("Deleted field {}.{} ({})", table_id, field_id, removed.name);
            Ok(removed)
        })
    }
}

/// Apply a table patch inside a mutation, cascading field removals and primary key changes
fn patch_table(
    project: &mut Project,
    table_id: &str,
    patch: &TablePatch,
    policy: OriginPolicy,
    now: DateTime<Utc>,
) -> SchemaResult<Table> {
    let prior = project
        .table(table_id)
        .cloned()
        .ok_or_else(|| SchemaError::not_found(EntityKind::Table, table_id))?;

    let mut next = prior.clone();
    patch.apply_scalars(&mut next);
    if patch.name.is_some() {
        validate_table_name(&next.name).map_err(|e| e.for_entity(table_id))?;
    }

    let mut removed_fields = Vec::new();
    let mut changed_keys = Vec::new();
    if let Some(fields) = &patch.fields {
        let kept: HashSet<&str> = fields.iter().map(|f| f.id.as_str()).collect();
        removed_fields = prior
            .fields
            .iter()
            .filter(|f| !kept.contains(f.id.as_str()))
            .map(|f| f.id.clone())
            .collect();

        for field in fields.iter().filter(|f| f.is_primary_key) {
            if let Some(before) = prior.field(&field.id)
                && ForeignKeySynchronizer::shape_changed(before, field)
            {
                changed_keys.push((before.clone(), field.clone()));
            }
        }
        next.fields = fields.clone();
    }
    next.touch(now);

    if let Some(slot) = project.table_mut(table_id) {
        *slot = next;
    }

    for field_id in &removed_fields {
        let dropped = lifecycle::cascade_field_removal(project, table_id, field_id, now);
        if !dropped.is_empty() {
            debug!(
                "Removing field {}.{} dropped relationships {:?}",
                table_id, field_id, dropped
            );
        }
    }

    let synchronizer = ForeignKeySynchronizer::new(policy);
    for (before, after) in &changed_keys {
        let synced = synchronizer.propagate(project, table_id, before, after, now);
        for entry in synced.iter().filter(|s| s.renamed) {
            reject_name_collision(project, entry)?;
        }
        if !synced.is_empty() {
            info!(
                "Primary key {}.{} change synchronized onto {} foreign key(s)",
                table_id,
                after.id,
                synced.len()
            );
        }
    }

    project
        .table(table_id)
        .cloned()
        .ok_or_else(|| SchemaError::not_found(EntityKind::Table, table_id))
}

/// A linked foreign key renamed onto a name its table already uses fails the mutation
fn reject_name_collision(project: &Project, synced: &SyncedField) -> SchemaResult<()> {
    let Some(table) = project.table(&synced.table_id) else {
        return Ok(());
    };
    let Some(field) = table.field(&synced.field_id) else {
        return Ok(());
    };
    if table
        .fields
        .iter()
        .any(|f| f.id != field.id && f.name.eq_ignore_ascii_case(&field.name))
    {
        return Err(SchemaError::validation(
            &field.id,
            format!(
                "renaming foreign key to '{}' collides with another field of table '{}'",
                field.name, table.name
            ),
        ));
    }
    Ok(())
}
