//! Validation functionality
//!
//! Provides validation logic for:
//! - Input validation and SQL identifier quoting
//! - Table validation (naming conflicts, type parameters)
//! - Referential integrity of the whole project graph
//! - Relationship validation (endpoints, circular dependencies)
//! - View queries and the tables they read

pub mod input;
pub mod integrity;
pub mod relationships;
pub mod tables;
pub mod views;

pub use input::{
    ValidationError, ValidationResult, is_sql_reserved_word, quote_identifier, quote_qualified,
    sanitize_description, sql_string_literal, validate_comment, validate_field_name,
    validate_table_name,
};
pub use integrity::IntegrityValidator;
pub use relationships::RelationshipValidator;
pub use tables::{ConflictReason, NamingConflict, TableValidator, validate_type_parameters};
pub use views::{extract_table_references, resolve_referenced_tables, validate_view_query};
