//! Relationship mutations

use super::SchemaGraph;
use super::patch::{RelationshipPatch, RelationshipSpec};
use crate::error::{EntityKind, SchemaError, SchemaResult};
use crate::lifecycle::{self, Reconciliation};
use crate::models::{
    Field, ForeignKeyOrigin, ForeignKeyReference, Project, Relationship, merge_tags,
};
use crate::validation::RelationshipValidator;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

impl SchemaGraph {
    /// Create a relationship and attach the foreign key reference to the dependent field.
    ///
    /// When `spec.origin` is unset, the foreign key is linked when its name
    /// equals the primary key's name and independent otherwise. The origin is recorded on
    /// the field and drives later synchronisation and deletion.
    pub fn add_relationship(&mut self, spec: RelationshipSpec) -> SchemaResult<Relationship> {
        self.apply(|project, now| link(project, &spec, now))
    }

    /// Update relationship metadata.
    ///
    /// Constraint name and referential actions are mirrored onto the dependent field's
    /// reference so the compiled constraint matches the relationship.
    pub fn update_relationship(
        &mut self,
        relationship_id: &str,
        patch: RelationshipPatch,
    ) -> SchemaResult<Relationship> {
        self.apply(|project, now| {
            let relationship = project
                .relationships
                .iter_mut()
                .find(|r| r.id == relationship_id)
                .ok_or_else(|| SchemaError::not_found(EntityKind::Relationship, relationship_id))?;

            if let Some(relationship_type) = patch.relationship_type {
                relationship.relationship_type = relationship_type;
            }
            if let Some(constraint_name) = &patch.constraint_name {
                relationship.constraint_name = constraint_name.clone();
            }
            if let Some(line_points) = &patch.line_points {
                relationship.line_points = line_points.clone();
            }
            relationship.updated_at = now;
            let relationship = relationship.clone();

            let (fk_table_id, fk_field_id) = relationship.dependent_location();
            let (pk_table_id, pk_field_id) = relationship.source_location();
            if let Some(table) = project.table_mut(fk_table_id)
                && let Some(reference) = table
                    .field_mut(fk_field_id)
                    .and_then(|f| f.foreign_key_reference.as_mut())
                    .filter(|r| r.points_to(pk_table_id, pk_field_id))
            {
                if let Some(constraint_name) = &patch.constraint_name {
                    reference.constraint_name = constraint_name.clone();
                }
                if let Some(on_delete) = patch.on_delete {
                    reference.on_delete = on_delete;
                }
                if let Some(on_update) = patch.on_update {
                    reference.on_update = on_update;
                }
                table.touch(now);
            }

            Ok(relationship)
        })
    }

    /// Delete a relationship, removing a linked foreign key field or detaching an
    /// independent one.
    pub fn delete_relationship(
        &mut self,
        relationship_id: &str,
    ) -> SchemaResult<(Relationship, Reconciliation)> {
        let policy = self.policy();
        self.apply(|project, now| {
            lifecycle::delete_relationship(project, relationship_id, policy, now)
        })
    }

    /// Remove only the relationship record; field flags and references are left as they are.
    pub fn remove_relationship_line(&mut self, relationship_id: &str) -> SchemaResult<Relationship> {
        self.apply(|project, _| {
            let position = project
                .relationships
                .iter()
                .position(|r| r.id == relationship_id)
                .ok_or_else(|| SchemaError::not_found(EntityKind::Relationship, relationship_id))?;
            info!("Removed relationship line {}", relationship_id);
            Ok(project.relationships.remove(position))
        })
    }

    /// Connect a primary key to another table, as when dragging a key onto a table.
    ///
    /// Reuses a field of the dependent table with the primary key's name (ignoring case) or
    /// appends a new field mirroring the key's shape. The foreign key is recorded as
    /// linked.
    pub fn connect_primary_key(
        &mut self,
        pk_table_id: &str,
        pk_field_id: &str,
        fk_table_id: &str,
    ) -> SchemaResult<Relationship> {
        self.apply(|project, now| {
            let pk_field = project
                .table(pk_table_id)
                .ok_or_else(|| SchemaError::not_found(EntityKind::Table, pk_table_id))?
                .field(pk_field_id)
                .cloned()
                .ok_or_else(|| SchemaError::not_found(EntityKind::Field, pk_field_id))?;
            if pk_table_id == fk_table_id {
                return Err(SchemaError::validation(
                    pk_field_id,
                    "a key cannot be connected to its own table by name",
                ));
            }
            let fk_table = project
                .table_mut(fk_table_id)
                .ok_or_else(|| SchemaError::not_found(EntityKind::Table, fk_table_id))?;

            let existing = fk_table.field_by_name(&pk_field.name).map(|f| f.id.clone());
            let fk_field_id = match existing.and_then(|id| fk_table.field_mut(&id)) {
                Some(existing) => {
                    adopt_shape(existing, &pk_field);
                    existing.id.clone()
                }
                None => {
                    let field = mirror_field(&pk_field);
                    let id = field.id.clone();
                    fk_table.fields.push(field);
                    id
                }
            };

            let mut spec = RelationshipSpec::new(pk_table_id, pk_field_id, fk_table_id, fk_field_id);
            spec.origin = Some(ForeignKeyOrigin::Linked);
            link(project, &spec, now)
        })
    }
}

/// New field carrying the shape of `pk`
fn mirror_field(pk: &Field) -> Field {
    let mut field = Field::new(pk.name.clone(), pk.data_type);
    field.type_parameters = pk.type_parameters.clone();
    field.nullable = pk.nullable;
    field.comment = pk.comment.clone();
    field.logical_name = pk.logical_name.clone();
    field.tags = pk.tags.clone();
    field
}

/// Bring an existing field in line with `pk`, keeping its own logical name and tag values
fn adopt_shape(field: &mut Field, pk: &Field) {
    field.data_type = pk.data_type;
    field.type_parameters = pk.type_parameters.clone();
    field.nullable = pk.nullable;
    field.comment = pk.comment.clone();
    if field.logical_name.is_none() {
        field.logical_name = pk.logical_name.clone();
    }
    field.tags = merge_tags(&pk.tags, &field.tags);
}

fn link(project: &mut Project, spec: &RelationshipSpec, now: DateTime<Utc>) -> SchemaResult<Relationship> {
    let id = spec.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
    if project.relationship(&id).is_some() {
        return Err(SchemaError::duplicate(&id, "relationship id already exists"));
    }

    let validator = RelationshipValidator::new();
    let source = (spec.source_table_id.as_str(), spec.source_field_id.as_str());
    let dependent = (spec.fk_table_id.as_str(), spec.fk_field_id.as_str());
    validator.check_endpoints(project, &id, source, dependent)?;
    if source == dependent {
        return Err(SchemaError::validation(&id, "a field cannot reference itself"));
    }
    if let Some(path) =
        validator.check_circular_dependency(project, &spec.fk_table_id, &spec.source_table_id)
    {
        warn!(
            "Relationship {} closes a dependency cycle through {}; compilation will fail until it is broken",
            id,
            path.join(" -> ")
        );
    }

    let pk_name = project
        .table(&spec.source_table_id)
        .and_then(|t| t.field(&spec.source_field_id))
        .map(|f| f.name.clone())
        .unwrap_or_default();
    let table = project
        .table_mut(&spec.fk_table_id)
        .ok_or_else(|| SchemaError::not_found(EntityKind::Table, &spec.fk_table_id))?;
    let field = table
        .field_mut(&spec.fk_field_id)
        .ok_or_else(|| SchemaError::not_found(EntityKind::Field, &spec.fk_field_id))?;

    let origin = spec.origin.unwrap_or(if field.name == pk_name {
        ForeignKeyOrigin::Linked
    } else {
        ForeignKeyOrigin::Independent
    });
    let mut reference = ForeignKeyReference::new(&spec.source_table_id, &spec.source_field_id);
    reference.constraint_name = spec.constraint_name.clone();
    reference.on_delete = spec.on_delete;
    reference.on_update = spec.on_update;
    field.attach_reference(reference, origin);
    table.touch(now);

    let mut relationship = Relationship::new(
        &spec.source_table_id,
        &spec.source_field_id,
        &spec.fk_table_id,
        &spec.fk_field_id,
    )
    .with_id(id);
    relationship.relationship_type = spec.relationship_type;
    relationship.constraint_name = spec.constraint_name.clone();
    relationship.created_at = now;
    relationship.updated_at = now;

    info!(
        "Added relationship {} from {}.{} to {}.{} ({:?})",
        relationship.id,
        spec.source_table_id,
        spec.source_field_id,
        spec.fk_table_id,
        spec.fk_field_id,
        origin
    );
    project.relationships.push(relationship.clone());
    Ok(relationship)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataType, ReferentialAction};
    use crate::store::TableSpec;

    fn graph() -> SchemaGraph {
        let mut graph = SchemaGraph::empty("p", "main", "sales");
        graph
            .add_table(
                TableSpec::new("orders")
                    .with_id("T1")
                    .with_field(Field::new("order_id", DataType::Bigint).with_id("F1").primary_key()),
            )
            .unwrap();
        graph
            .add_table(
                TableSpec::new("line_items")
                    .with_id("T2")
                    .with_field(Field::new("line_id", DataType::Int).with_id("F2").primary_key())
                    .with_field(Field::new("parent", DataType::Int).with_id("F3")),
            )
            .unwrap();
        graph
    }

    #[test]
    fn add_relationship_attaches_reference() {
        let mut graph = graph();
        let relationship = graph
            .add_relationship(RelationshipSpec::new("T1", "F1", "T2", "F3").with_id("R1"))
            .unwrap();
        assert_eq!(relationship.dependent_location(), ("T2", "F3"));

        let field = graph.project().tables[1].field("F3").unwrap();
        assert!(field.is_foreign_key);
        assert!(field.references_field("T1", "F1"));
        assert_eq!(field.foreign_key_origin, Some(ForeignKeyOrigin::Independent));
    }

    #[test]
    fn missing_endpoint_leaves_project_unchanged() {
        let mut graph = graph();
        let before = graph.project().clone();
        let err = graph
            .add_relationship(RelationshipSpec::new("T1", "F1", "T2", "F404"))
            .unwrap_err();
        assert!(matches!(err, SchemaError::ReferentialIntegrity { .. }));
        assert_eq!(graph.project(), &before);
    }

    #[test]
    fn connect_creates_linked_mirror() {
        let mut graph = graph();
        let relationship = graph.connect_primary_key("T1", "F1", "T2").unwrap();
        let (_, fk_field_id) = relationship.dependent_location();
        let field = graph.project().tables[1].field(fk_field_id).unwrap();
        assert_eq!(field.name, "order_id");
        assert_eq!(field.data_type, DataType::Bigint);
        assert_eq!(field.foreign_key_origin, Some(ForeignKeyOrigin::Linked));
        assert_eq!(graph.project().tables[1].fields.len(), 3);
    }

    #[test]
    fn connect_reuses_same_named_field_with_key_shape() {
        let mut graph = graph();
        graph
            .add_field(
                "T2",
                Field::new("Order_ID", DataType::Int)
                    .with_id("F4")
                    .with_tag("owner", "ops"),
            )
            .unwrap();

        let relationship = graph.connect_primary_key("T1", "F1", "T2").unwrap();
        assert_eq!(relationship.dependent_location(), ("T2", "F4"));

        let field = graph.project().tables[1].field("F4").unwrap();
        assert_eq!(field.name, "Order_ID");
        assert_eq!(field.data_type, DataType::Bigint);
        assert!(!field.nullable);
        assert_eq!(field.tags.get("owner").map(String::as_str), Some("ops"));
        assert!(field.references_field("T1", "F1"));
        assert_eq!(graph.project().tables[1].fields.len(), 3);
    }

    #[test]
    fn update_mirrors_actions_onto_reference() {
        let mut graph = graph();
        graph
            .add_relationship(RelationshipSpec::new("T1", "F1", "T2", "F3").with_id("R1"))
            .unwrap();
        graph
            .update_relationship(
                "R1",
                RelationshipPatch {
                    constraint_name: Some(Some("fk_items_orders".into())),
                    on_delete: Some(ReferentialAction::Cascade),
                    ..RelationshipPatch::default()
                },
            )
            .unwrap();

        let reference = graph.project().tables[1]
            .field("F3")
            .and_then(|f| f.foreign_key_reference.clone())
            .unwrap();
        assert_eq!(reference.constraint_name.as_deref(), Some("fk_items_orders"));
        assert_eq!(reference.on_delete, ReferentialAction::Cascade);
    }

    #[test]
    fn removing_line_keeps_field_flags() {
        let mut graph = graph();
        graph
            .add_relationship(RelationshipSpec::new("T1", "F1", "T2", "F3").with_id("R1"))
            .unwrap();
        graph.remove_relationship_line("R1").unwrap();
        assert!(graph.project().relationships.is_empty());
        assert!(graph.project().tables[1].field("F3").unwrap().is_foreign_key);
    }
}
