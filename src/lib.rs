//! Schema Graph SDK - schema design core for lakehouse catalogs
//!
//! Provides:
//! - An editing session over a project of tables, relationships and views
//!   ([`store::SchemaGraph`]) where every mutation is atomic
//! - Foreign key synchronisation when a primary key changes shape
//! - Relationship reconciliation when relationships or tables are deleted
//! - Dependency-ordered DDL compilation for Databricks (tables, tags, constraints,
//!   metric views and views)
//! - Project loading with legacy normalization, and canonical saving
//! - Async collaborator traits for catalog access, execution and persistence
//!
//! # Example
//!
//! ```rust
//! use schema_graph_sdk::compiler::DdlCompiler;
//! use schema_graph_sdk::models::{DataType, Field};
//! use schema_graph_sdk::store::{SchemaGraph, TableSpec};
//!
//! let mut graph = SchemaGraph::empty("shop", "main", "sales");
//! let customers = graph
//!     .add_table(TableSpec::new("customers").with_field(Field::new("customer_id", DataType::Int).primary_key()))
//!     .unwrap();
//! let orders = graph
//!     .add_table(TableSpec::new("orders").with_field(Field::new("order_id", DataType::Int).primary_key()))
//!     .unwrap();
//! graph
//!     .connect_primary_key(&customers.id, &customers.fields[0].id, &orders.id)
//!     .unwrap();
//!
//! let statements = DdlCompiler::default().compile(graph.project()).unwrap();
//! assert!(statements[0].sql.starts_with("CREATE OR REPLACE TABLE main.sales.customers"));
//! assert!(statements.last().unwrap().sql.contains("FOREIGN KEY (customer_id)"));
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod compiler;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod models;
pub mod services;
pub mod store;
pub mod sync;
pub mod validation;

// Re-export commonly used types
pub use compiler::{
    CompileOptions, CreateMode, DdlCompiler, DependencyGraph, OrderedStatement, StatementKind,
};
pub use config::SdkConfig;
pub use error::{CompileErrors, EntityKind, SchemaError, SchemaResult};
pub use lifecycle::{Reconciliation, TableDeletion};
pub use model::{ProjectFormat, ProjectLoadResult, ProjectLoader, ProjectSaver};
pub use store::{CatalogImport, SchemaGraph};
pub use sync::{ForeignKeySynchronizer, OriginPolicy};

// Re-export models
pub use models::enums::*;
pub use models::{
    Field, ForeignKeyReference, MetricRelationship, MetricView, Project, Relationship, Table,
    TraditionalView, TypeParameters,
};
