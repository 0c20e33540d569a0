//! Collaborator services
//!
//! The core never performs I/O itself. Catalog browsing, DDL execution and project
//! persistence are delegated to the async traits defined here; embedders supply the
//! implementations. [`ProjectRepository`] and [`CatalogImporter`] bridge those services to
//! the loader, the saver and the store.

pub mod memory;
pub mod repository;

pub use crate::model::ProjectFormat;
pub use crate::store::{CatalogImport, ImportSummary};
pub use memory::MemoryPersistence;
pub use repository::{CatalogImporter, ProjectRepository};

use crate::compiler::OrderedStatement;
use crate::error::SchemaError;
use crate::model::{LoadError, SaveError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error type for collaborator services
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Requested project or catalog object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A project with this name exists and overwrite was not requested
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The service itself failed (connection, permissions, remote error)
    #[error("Service failure: {0}")]
    Backend(String),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Save error: {0}")]
    Save(#[from] SaveError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// A project document as held by the persistence service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProject {
    pub name: String,
    pub format: ProjectFormat,
    /// Canonical project document
    pub document: serde_json::Value,
    pub saved_at: DateTime<Utc>,
}

/// Outcome of executing one compiled statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementResult {
    pub sequence: usize,
    pub entity_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatementResult {
    pub fn succeeded(statement: &OrderedStatement) -> Self {
        Self {
            sequence: statement.sequence,
            entity_id: statement.entity_id.clone(),
            success: true,
            message: None,
        }
    }

    pub fn failed(statement: &OrderedStatement, message: impl Into<String>) -> Self {
        Self {
            sequence: statement.sequence,
            entity_id: statement.entity_id.clone(),
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Catalog access: browse catalogs and fetch table definitions in model shape
#[async_trait(?Send)]
pub trait CatalogService {
    async fn list_catalogs(&self) -> ServiceResult<Vec<String>>;

    async fn list_schemas(&self, catalog: &str) -> ServiceResult<Vec<String>>;

    async fn list_tables(&self, catalog: &str, schema: &str) -> ServiceResult<Vec<String>>;

    /// Fetch the named tables, with the relationships between them, ready to merge
    async fn import_tables(
        &self,
        catalog: &str,
        schema: &str,
        table_names: &[String],
    ) -> ServiceResult<CatalogImport>;
}

/// Runs compiled statements against the warehouse
#[async_trait(?Send)]
pub trait ExecutionService {
    /// Execute statements in sequence order, reporting one result per statement
    async fn execute(&self, statements: &[OrderedStatement]) -> ServiceResult<Vec<StatementResult>>;
}

/// Stores project documents by name
#[async_trait(?Send)]
pub trait PersistenceService {
    async fn save(
        &self,
        project_name: &str,
        format: ProjectFormat,
        document: serde_json::Value,
        overwrite: bool,
    ) -> ServiceResult<StoredProject>;

    async fn load(&self, project_name: &str) -> ServiceResult<StoredProject>;
}
