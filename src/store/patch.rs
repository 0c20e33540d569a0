//! Inputs of store mutations
//!
//! Specs describe new entities; patches describe partial updates. A `None` patch field
//! leaves the value alone. Clearable values use `Option<Option<T>>`, where `Some(None)`
//! clears.

use crate::models::{
    ConnectionPoint, DataType, Dimension, Field, ForeignKeyOrigin, Measure, MetricView,
    MetricViewJoin, Position, ReferentialAction, RelationshipType, Size, StorageFormat, Table,
    TableKind, TagMap, TraditionalView, TypeParameters,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// New table; unset values take the table defaults (managed Delta table, no fields)
#[derive(Debug, Clone, Default)]
pub struct TableSpec {
    pub id: Option<String>,
    pub name: String,
    pub logical_name: Option<String>,
    pub comment: Option<String>,
    pub table_kind: Option<TableKind>,
    pub storage_format: Option<StorageFormat>,
    pub storage_location: Option<String>,
    pub tags: TagMap,
    pub position: Option<Position>,
    pub fields: Vec<Field>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub(crate) fn into_table(self, now: DateTime<Utc>) -> Table {
        Table {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: self.name,
            logical_name: self.logical_name,
            comment: self.comment,
            table_kind: self.table_kind.unwrap_or_default(),
            storage_format: self.storage_format.unwrap_or_default(),
            storage_location: self.storage_location,
            tags: self.tags,
            position: self.position.unwrap_or_default(),
            size: Size::default(),
            fields: self.fields,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a table
///
/// `fields`, when present, replaces the whole field list. Fields missing from the new
/// list are removed together with whatever pointed at them, and primary keys whose shape
/// changed are propagated to their foreign keys.
#[derive(Debug, Clone, Default)]
pub struct TablePatch {
    pub name: Option<String>,
    pub logical_name: Option<Option<String>>,
    pub comment: Option<Option<String>>,
    pub table_kind: Option<TableKind>,
    pub storage_format: Option<StorageFormat>,
    pub storage_location: Option<Option<String>>,
    pub tags: Option<TagMap>,
    pub position: Option<Position>,
    pub size: Option<Size>,
    pub fields: Option<Vec<Field>>,
}

impl TablePatch {
    /// Patch that only replaces the field list
    pub fn fields(fields: Vec<Field>) -> Self {
        Self {
            fields: Some(fields),
            ..Self::default()
        }
    }

    /// Apply every value except `fields`
    pub(crate) fn apply_scalars(&self, table: &mut Table) {
        if let Some(name) = &self.name {
            table.name = name.clone();
        }
        if let Some(logical_name) = &self.logical_name {
            table.logical_name = logical_name.clone();
        }
        if let Some(comment) = &self.comment {
            table.comment = comment.clone();
        }
        if let Some(kind) = self.table_kind {
            table.table_kind = kind;
        }
        if let Some(format) = self.storage_format {
            table.storage_format = format;
        }
        if let Some(location) = &self.storage_location {
            table.storage_location = location.clone();
        }
        if let Some(tags) = &self.tags {
            table.tags = tags.clone();
        }
        if let Some(position) = self.position {
            table.position = position;
        }
        if let Some(size) = self.size {
            table.size = size;
        }
    }
}

/// Partial update of a field
///
/// Foreign key references are not patched here; they belong to relationships.
#[derive(Debug, Clone, Default)]
pub struct FieldPatch {
    pub name: Option<String>,
    pub data_type: Option<DataType>,
    pub type_parameters: Option<Option<TypeParameters>>,
    pub nullable: Option<bool>,
    pub default_value: Option<Option<String>>,
    pub comment: Option<Option<String>>,
    pub logical_name: Option<Option<String>>,
    pub tags: Option<TagMap>,
    pub is_primary_key: Option<bool>,
}

impl FieldPatch {
    pub(crate) fn apply(&self, field: &mut Field) {
        if let Some(name) = &self.name {
            field.name = name.clone();
        }
        if let Some(data_type) = self.data_type {
            field.data_type = data_type;
        }
        if let Some(parameters) = &self.type_parameters {
            field.type_parameters = parameters.clone();
        }
        if let Some(nullable) = self.nullable {
            field.nullable = nullable;
        }
        if let Some(default_value) = &self.default_value {
            field.default_value = default_value.clone();
        }
        if let Some(comment) = &self.comment {
            field.comment = comment.clone();
        }
        if let Some(logical_name) = &self.logical_name {
            field.logical_name = logical_name.clone();
        }
        if let Some(tags) = &self.tags {
            field.tags = tags.clone();
        }
        if let Some(is_primary_key) = self.is_primary_key {
            field.is_primary_key = is_primary_key;
        }
    }
}

/// New relationship from a primary key to the field that references it
#[derive(Debug, Clone)]
pub struct RelationshipSpec {
    pub id: Option<String>,
    pub source_table_id: String,
    pub source_field_id: String,
    pub fk_table_id: String,
    pub fk_field_id: String,
    pub relationship_type: RelationshipType,
    pub constraint_name: Option<String>,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
    /// Recorded origin; derived from the field names when unset
    pub origin: Option<ForeignKeyOrigin>,
}

impl RelationshipSpec {
    pub fn new(
        source_table_id: impl Into<String>,
        source_field_id: impl Into<String>,
        fk_table_id: impl Into<String>,
        fk_field_id: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            source_table_id: source_table_id.into(),
            source_field_id: source_field_id.into(),
            fk_table_id: fk_table_id.into(),
            fk_field_id: fk_field_id.into(),
            relationship_type: RelationshipType::default(),
            constraint_name: None,
            on_delete: ReferentialAction::NoAction,
            on_update: ReferentialAction::NoAction,
            origin: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Partial update of a relationship
#[derive(Debug, Clone, Default)]
pub struct RelationshipPatch {
    pub relationship_type: Option<RelationshipType>,
    pub constraint_name: Option<Option<String>>,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
    pub line_points: Option<Vec<ConnectionPoint>>,
}

/// Partial update of a metric view
#[derive(Debug, Clone, Default)]
pub struct MetricViewPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub source_table_id: Option<Option<String>>,
    pub source_sql: Option<Option<String>>,
    pub filter: Option<Option<String>>,
    pub dimensions: Option<Vec<Dimension>>,
    pub measures: Option<Vec<Measure>>,
    pub joins: Option<Vec<MetricViewJoin>>,
    pub tags: Option<TagMap>,
    pub position: Option<Position>,
}

impl MetricViewPatch {
    pub(crate) fn apply(&self, view: &mut MetricView) {
        if let Some(name) = &self.name {
            view.name = name.clone();
        }
        if let Some(description) = &self.description {
            view.description = description.clone();
        }
        if let Some(source_table_id) = &self.source_table_id {
            view.source_table_id = source_table_id.clone();
        }
        if let Some(source_sql) = &self.source_sql {
            view.source_sql = source_sql.clone();
        }
        if let Some(filter) = &self.filter {
            view.filter = filter.clone();
        }
        if let Some(dimensions) = &self.dimensions {
            view.dimensions = dimensions.clone();
        }
        if let Some(measures) = &self.measures {
            view.measures = measures.clone();
        }
        if let Some(joins) = &self.joins {
            view.joins = joins.clone();
        }
        if let Some(tags) = &self.tags {
            view.tags = tags.clone();
        }
        if let Some(position) = self.position {
            view.position = position;
        }
    }
}

/// Partial update of a traditional view
///
/// Changing the query without listing `referenced_table_ids` re-detects the tables it
/// reads.
#[derive(Debug, Clone, Default)]
pub struct TraditionalViewPatch {
    pub name: Option<String>,
    pub sql_query: Option<String>,
    pub description: Option<Option<String>>,
    pub logical_name: Option<Option<String>>,
    pub referenced_table_ids: Option<Vec<String>>,
    pub tags: Option<TagMap>,
    pub position: Option<Position>,
}

impl TraditionalViewPatch {
    pub(crate) fn apply(&self, view: &mut TraditionalView) {
        if let Some(name) = &self.name {
            view.name = name.clone();
        }
        if let Some(sql_query) = &self.sql_query {
            view.sql_query = sql_query.clone();
        }
        if let Some(description) = &self.description {
            view.description = description.clone();
        }
        if let Some(logical_name) = &self.logical_name {
            view.logical_name = logical_name.clone();
        }
        if let Some(referenced) = &self.referenced_table_ids {
            view.referenced_table_ids = referenced.clone();
        }
        if let Some(tags) = &self.tags {
            view.tags = tags.clone();
        }
        if let Some(position) = self.position {
            view.position = position;
        }
    }
}
