//! Schema graph store
//!
//! [`SchemaGraph`] owns one project for the length of an editing session. Every mutation
//! works on a copy of the project, runs its cascades (foreign key synchronisation,
//! relationship reconciliation), checks referential integrity and only then replaces the
//! committed project. A failed mutation leaves the project exactly as it was.
//!
//! Mutations are split by entity:
//! - [`tables`]: tables and fields
//! - [`relationships`]: relationships and the drag-to-connect gesture
//! - [`views`]: metric views, traditional views and metric relationships
//! - [`import`]: merging tables imported from a catalog

pub mod import;
pub mod patch;
pub mod relationships;
pub mod tables;
pub mod views;

use crate::error::SchemaResult;
use crate::models::{ForeignKeyOrigin, Project};
use crate::sync::OriginPolicy;
use crate::validation::IntegrityValidator;
use chrono::{DateTime, Utc};
use tracing::debug;

pub use import::{CatalogImport, ImportSummary};
pub use patch::{
    FieldPatch, MetricViewPatch, RelationshipPatch, RelationshipSpec, TablePatch, TableSpec,
    TraditionalViewPatch,
};

/// Editing session over one project
///
/// # Example
///
/// ```rust
/// use schema_graph_sdk::models::{DataType, Field};
/// use schema_graph_sdk::store::{SchemaGraph, TableSpec};
///
/// let mut graph = SchemaGraph::empty("shop", "main", "sales");
/// let orders = graph
///     .add_table(TableSpec::new("orders").with_field(Field::new("order_id", DataType::Int).primary_key()))
///     .unwrap();
///
/// assert_eq!(graph.project().tables.len(), 1);
/// assert_eq!(graph.project().tables[0].id, orders.id);
/// ```
#[derive(Debug, Clone)]
pub struct SchemaGraph {
    project: Project,
    policy: OriginPolicy,
}

impl SchemaGraph {
    /// Open a session over an existing project with the default origin policy.
    ///
    /// Fails with the first integrity problem found in the project.
    pub fn new(project: Project) -> SchemaResult<Self> {
        Self::with_policy(project, OriginPolicy::default())
    }

    /// Open a session with an explicit origin policy.
    ///
    /// Under [`OriginPolicy::Explicit`], foreign keys without a recorded origin get one
    /// now, derived from the names they have at this point.
    pub fn with_policy(mut project: Project, policy: OriginPolicy) -> SchemaResult<Self> {
        if let Some(error) = IntegrityValidator::new().check_project(&project).into_iter().next() {
            return Err(error);
        }
        if policy == OriginPolicy::Explicit {
            record_origins(&mut project);
        }
        debug!(
            "Opened schema graph for project '{}' ({} tables, {} relationships)",
            project.name,
            project.tables.len(),
            project.relationships.len()
        );
        Ok(Self { project, policy })
    }

    /// Session over a new, empty project
    pub fn empty(
        name: impl Into<String>,
        catalog_name: impl Into<String>,
        schema_name: impl Into<String>,
    ) -> Self {
        Self {
            project: Project::new(name, catalog_name, schema_name),
            policy: OriginPolicy::default(),
        }
    }

    /// Replace the session's project, keeping the policy
    pub fn reset(&mut self, project: Project) -> SchemaResult<()> {
        *self = Self::with_policy(project, self.policy)?;
        Ok(())
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn into_project(self) -> Project {
        self.project
    }

    pub fn policy(&self) -> OriginPolicy {
        self.policy
    }

    /// Run `op` on a copy of the project and commit the copy if it stays consistent.
    pub(crate) fn apply<T>(
        &mut self,
        op: impl FnOnce(&mut Project, DateTime<Utc>) -> SchemaResult<T>,
    ) -> SchemaResult<T> {
        let now = Utc::now();
        let mut candidate = self.project.clone();
        let value = op(&mut candidate, now)?;

        if let Some(error) = IntegrityValidator::new()
            .check_project(&candidate)
            .into_iter()
            .next()
        {
            debug!("Rejected mutation: {}", error);
            return Err(error);
        }
        if self.policy == OriginPolicy::Explicit {
            record_origins(&mut candidate);
        }

        candidate.updated_at = now;
        self.project = candidate;
        Ok(value)
    }
}

/// Give every foreign key without a recorded origin the one its current name implies
fn record_origins(project: &mut Project) {
    let pk_names: Vec<((String, String), String)> = project
        .tables
        .iter()
        .flat_map(|t| {
            t.fields
                .iter()
                .map(move |f| ((t.id.clone(), f.id.clone()), f.name.clone()))
        })
        .collect();

    for table in project.tables.iter_mut() {
        for field in table.fields.iter_mut() {
            if field.foreign_key_origin.is_some() {
                continue;
            }
            let Some(reference) = &field.foreign_key_reference else {
                continue;
            };
            let linked = pk_names.iter().any(|((t, f), name)| {
                reference.points_to(t, f) && *name == field.name
            });
            field.foreign_key_origin = Some(if linked {
                ForeignKeyOrigin::Linked
            } else {
                ForeignKeyOrigin::Independent
            });
        }
    }
}
