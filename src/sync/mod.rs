//! Foreign-key synchronisation
//!
//! When a primary-key field changes shape, every field that references it is brought back
//! in line: type, type parameters, nullability and comment are always copied, the logical
//! name only fills a gap, tags are merged with the foreign key's own values winning, and
//! linked foreign keys follow the rename.

use crate::models::{ForeignKeyOrigin, Field, Project, merge_tags};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// How linked and independent foreign keys are told apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginPolicy {
    /// Trust the origin recorded on the field; fall back to name comparison only for
    /// fields that carry none
    #[default]
    Explicit,
    /// Always compare the foreign key's name with the primary key's name
    NameMatch,
}

impl FromStr for OriginPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "explicit" => Ok(OriginPolicy::Explicit),
            "name_match" | "name" => Ok(OriginPolicy::NameMatch),
            _ => Err(format!(
                "Unknown origin policy: {}. Use 'explicit' or 'name_match'.",
                s
            )),
        }
    }
}

impl fmt::Display for OriginPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginPolicy::Explicit => write!(f, "explicit"),
            OriginPolicy::NameMatch => write!(f, "name_match"),
        }
    }
}

/// Classify a foreign-key field relative to the primary key it references.
///
/// `pk_name` is the primary key name to compare against when the policy (or a missing
/// recorded origin) requires a name comparison. A missing primary key classifies as
/// independent.
///
/// # Example
///
/// ```rust
/// use schema_graph_sdk::models::{DataType, Field, ForeignKeyOrigin};
/// use schema_graph_sdk::sync::{OriginPolicy, classify_foreign_key};
///
/// let fk = Field::new("order_id", DataType::Int).references("T1", "F1");
/// assert_eq!(
///     classify_foreign_key(&fk, Some("order_id"), OriginPolicy::Explicit),
///     ForeignKeyOrigin::Linked
/// );
/// ```
pub fn classify_foreign_key(
    field: &Field,
    pk_name: Option<&str>,
    policy: OriginPolicy,
) -> ForeignKeyOrigin {
    if policy == OriginPolicy::Explicit
        && let Some(origin) = field.foreign_key_origin
    {
        return origin;
    }
    match pk_name {
        Some(name) if name == field.name => ForeignKeyOrigin::Linked,
        _ => ForeignKeyOrigin::Independent,
    }
}

/// A foreign-key field rewritten by a propagation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedField {
    pub table_id: String,
    pub field_id: String,
    pub origin: ForeignKeyOrigin,
    pub renamed: bool,
}

/// Propagates primary-key shape changes onto referencing fields
#[derive(Debug, Clone, Copy, Default)]
pub struct ForeignKeySynchronizer {
    policy: OriginPolicy,
}

impl ForeignKeySynchronizer {
    pub fn new(policy: OriginPolicy) -> Self {
        Self { policy }
    }

    /// Whether the change from `prior` to `next` needs to reach foreign keys
    ///
    /// Compares name, data type, type parameters, nullability, comment and tags.
    pub fn shape_changed(prior: &Field, next: &Field) -> bool {
        prior.name != next.name
            || prior.data_type != next.data_type
            || prior.type_parameters != next.type_parameters
            || prior.nullable != next.nullable
            || prior.comment != next.comment
            || prior.tags != next.tags
    }

    /// Rewrite every field in `project` that references `(table_id, next.id)`.
    ///
    /// The owning table must already hold `next`. `prior` is the field as it was before the
    /// edit and drives the linked/independent decision. Returns the rewritten fields; an
    /// unchanged shape rewrites nothing.
    pub fn propagate(
        &self,
        project: &mut Project,
        table_id: &str,
        prior: &Field,
        next: &Field,
        now: DateTime<Utc>,
    ) -> Vec<SyncedField> {
        let mut synced = Vec::new();
        if !Self::shape_changed(prior, next) {
            return synced;
        }

        for table in project.tables.iter_mut() {
            let mut touched = false;
            for field in table.fields.iter_mut() {
                if field.id == next.id && table.id == table_id {
                    continue;
                }
                if !field.references_field(table_id, &next.id) {
                    continue;
                }

                let origin = classify_foreign_key(field, Some(&prior.name), self.policy);
                field.data_type = next.data_type;
                field.type_parameters = next.type_parameters.clone();
                field.nullable = next.nullable;
                field.comment = next.comment.clone();
                if field.logical_name.is_none() {
                    field.logical_name = next.logical_name.clone();
                }
                field.tags = merge_tags(&next.tags, &field.tags);

                let renamed = origin == ForeignKeyOrigin::Linked && field.name != next.name;
                if origin == ForeignKeyOrigin::Linked {
                    field.name = next.name.clone();
                }

                debug!(
                    "Synchronized foreign key {}.{} ({:?}) from primary key {}.{}",
                    table.id, field.id, origin, table_id, next.id
                );
                synced.push(SyncedField {
                    table_id: table.id.clone(),
                    field_id: field.id.clone(),
                    origin,
                    renamed,
                });
                touched = true;
            }
            if touched {
                table.touch(now);
            }
        }

        synced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataType, Table, TypeParameters};

    fn project() -> Project {
        let mut project = Project::new("test", "main", "sales");
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
                        .references("T1", "F1")
                        .with_tag("pii", "no"),
                )
                .with_field(
                    Field::new("parent_order", DataType::Int)
                        .with_id("F3")
                        .references("T1", "F1"),
                ),
        );
        project
    }

    #[test]
    fn unchanged_shape_is_a_no_op() {
        let mut project = project();
        let pk = project.tables[0].fields[0].clone();
        let synced = ForeignKeySynchronizer::default().propagate(
            &mut project,
            "T1",
            &pk,
            &pk,
            Utc::now(),
        );
        assert!(synced.is_empty());
    }

    #[test]
    fn linked_follows_rename_and_independent_keeps_name() {
        let mut project = project();
        let prior = project.tables[0].fields[0].clone();
        let mut next = prior.clone();
        next.name = "order_number".into();
        next.data_type = DataType::Decimal;
        next.type_parameters = Some(TypeParameters::decimal(18, 0));
        next.tags.insert("pii".into(), "yes".into());
        next.tags.insert("domain".into(), "sales".into());
        next.logical_name = Some("Order Number".into());
        project.tables[0].fields[0] = next.clone();

        let synced = ForeignKeySynchronizer::new(OriginPolicy::NameMatch).propagate(
            &mut project,
            "T1",
            &prior,
            &next,
            Utc::now(),
        );
        assert_eq!(synced.len(), 2);

        let linked = &project.tables[1].fields[0];
        assert_eq!(linked.name, "order_number");
        assert_eq!(linked.data_type, DataType::Decimal);
        assert_eq!(linked.tags["pii"], "no");
        assert_eq!(linked.tags["domain"], "sales");
        assert_eq!(linked.logical_name.as_deref(), Some("Order Number"));
        assert!(linked.references_field("T1", "F1"));

        let independent = &project.tables[1].fields[1];
        assert_eq!(independent.name, "parent_order");
        assert_eq!(independent.type_parameters, Some(TypeParameters::decimal(18, 0)));
    }

    #[test]
    fn explicit_origin_overrides_names() {
        let mut field = Field::new("order_id", DataType::Int).references("T1", "F1");
        field.foreign_key_origin = Some(ForeignKeyOrigin::Independent);
        assert_eq!(
            classify_foreign_key(&field, Some("order_id"), OriginPolicy::Explicit),
            ForeignKeyOrigin::Independent
        );
        assert_eq!(
            classify_foreign_key(&field, Some("order_id"), OriginPolicy::NameMatch),
            ForeignKeyOrigin::Linked
        );
    }

    #[test]
    fn policy_parses() {
        assert_eq!("name-match".parse::<OriginPolicy>().unwrap(), OriginPolicy::NameMatch);
        assert!("sometimes".parse::<OriginPolicy>().is_err());
    }
}
