//! Error taxonomy shared by the store, the lifecycle manager and the compiler
//!
//! Every variant carries the ids needed to pinpoint the offending entity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of entity an error or statement refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Table,
    Field,
    Relationship,
    MetricView,
    TraditionalView,
    MetricRelationship,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Project => "Project",
            EntityKind::Table => "Table",
            EntityKind::Field => "Field",
            EntityKind::Relationship => "Relationship",
            EntityKind::MetricView => "Metric view",
            EntityKind::TraditionalView => "View",
            EntityKind::MetricRelationship => "Metric relationship",
        };
        f.write_str(name)
    }
}

/// Error raised by schema graph operations
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaError {
    #[error("Validation error on {entity_id}: {message}")]
    Validation { entity_id: String, message: String },

    #[error("Referential integrity error on {entity_id}: {message}")]
    ReferentialIntegrity { entity_id: String, message: String },

    #[error("Cyclic dependency between tables: {}", table_ids.join(", "))]
    CyclicDependency { table_ids: Vec<String> },

    #[error("Duplicate entity {entity_id}: {message}")]
    DuplicateEntity { entity_id: String, message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },
}

impl SchemaError {
    pub fn validation(entity_id: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::Validation {
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }

    pub fn integrity(entity_id: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::ReferentialIntegrity {
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }

    pub fn duplicate(entity_id: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::DuplicateEntity {
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        SchemaError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Result type for schema graph operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Every problem found while compiling a project
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub struct CompileErrors {
    pub errors: Vec<SchemaError>,
}

impl CompileErrors {
    pub fn new(errors: Vec<SchemaError>) -> Self {
        Self { errors }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Table id lists of every cycle found
    pub fn cycles(&self) -> impl Iterator<Item = &[String]> {
        self.errors.iter().filter_map(|e| match e {
            SchemaError::CyclicDependency { table_ids } => Some(table_ids.as_slice()),
            _ => None,
        })
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Compilation failed with {} error(s)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_error_lists_table_ids() {
        let err = SchemaError::CyclicDependency {
            table_ids: vec!["A".into(), "B".into()],
        };
        assert_eq!(err.to_string(), "Cyclic dependency between tables: A, B");
    }

    #[test]
    fn compile_errors_render_every_entry() {
        let errors = CompileErrors::new(vec![
            SchemaError::validation("T1", "table has no fields"),
            SchemaError::not_found(EntityKind::Field, "F9"),
        ]);
        let text = errors.to_string();
        assert!(text.starts_with("Compilation failed with 2 error(s)"));
        assert!(text.contains("Field not found: F9"));
        assert_eq!(errors.cycles().count(), 0);
    }
}
