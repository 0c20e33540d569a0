//! Identifier checks and SQL text helpers.
//!
//! Names entered in the designer end up inside generated DDL. Checks here reject names the
//! compiler could not render safely, and the quoting helpers make every accepted name
//! injection-safe when it is written into a statement.

use crate::error::SchemaError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length for table and view names
pub const MAX_TABLE_NAME_LENGTH: usize = 255;

/// Maximum length for field names
pub const MAX_FIELD_NAME_LENGTH: usize = 255;

/// Maximum length for comments and descriptions
pub const MAX_COMMENT_LENGTH: usize = 10000;

/// Maximum length for project names used as storage keys
pub const MAX_PROJECT_NAME_LENGTH: usize = 255;

static SIMPLE_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid regex"));

/// Errors that can occur during input validation.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    /// Input is empty when a value is required
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    /// Input exceeds maximum allowed length
    #[error("{field} exceeds maximum length (max: {max}, got: {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    /// Input contains invalid characters
    #[error("{field} contains invalid characters: {reason}")]
    InvalidCharacters { field: &'static str, reason: String },
}

impl ValidationError {
    /// Attach the offending entity id
    pub fn for_entity(self, entity_id: impl Into<String>) -> SchemaError {
        SchemaError::validation(entity_id, self.to_string())
    }
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

fn validate_name(name: &str, field: &'static str, max: usize) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }

    if name.len() > max {
        return Err(ValidationError::TooLong {
            field,
            max,
            actual: name.len(),
        });
    }

    if let Some(c) = name.chars().find(|c| c.is_control() || *c == '`') {
        return Err(ValidationError::InvalidCharacters {
            field,
            reason: format!("invalid character: {:?}", c),
        });
    }

    Ok(())
}

/// Validate a table or view name.
///
/// # Rules
///
/// - Must not be empty or blank
/// - Must not exceed 255 bytes
/// - Must not contain control characters, backticks or dots (names are qualified by the
///   compiler, never by the user)
///
/// Reserved words are accepted; the compiler quotes them.
///
/// # Examples
///
/// ```
/// use schema_graph_sdk::validation::input::validate_table_name;
///
/// assert!(validate_table_name("orders").is_ok());
/// assert!(validate_table_name("order").is_ok());
/// assert!(validate_table_name("").is_err());
/// assert!(validate_table_name("sales.orders").is_err());
/// ```
pub fn validate_table_name(name: &str) -> ValidationResult<()> {
    validate_name(name, "table name", MAX_TABLE_NAME_LENGTH)?;
    if name.contains('.') {
        return Err(ValidationError::InvalidCharacters {
            field: "table name",
            reason: "names must not be qualified".to_string(),
        });
    }
    Ok(())
}

/// Validate a field name.
///
/// # Examples
///
/// ```
/// use schema_graph_sdk::validation::input::validate_field_name;
///
/// assert!(validate_field_name("order_id").is_ok());
/// assert!(validate_field_name("Order Date").is_ok());
/// assert!(validate_field_name("  ").is_err());
/// ```
pub fn validate_field_name(name: &str) -> ValidationResult<()> {
    validate_name(name, "field name", MAX_FIELD_NAME_LENGTH)
}

/// Validate a comment or description length.
pub fn validate_comment(comment: &str) -> ValidationResult<()> {
    if comment.len() > MAX_COMMENT_LENGTH {
        return Err(ValidationError::TooLong {
            field: "comment",
            max: MAX_COMMENT_LENGTH,
            actual: comment.len(),
        });
    }
    Ok(())
}

/// Quote an identifier with backticks when it is not a plain identifier.
///
/// Plain identifiers (letters, digits, underscores, not starting with a digit, not a
/// reserved word) are returned unchanged. Everything else is wrapped in backticks with
/// embedded backticks doubled.
///
/// # Examples
///
/// ```
/// use schema_graph_sdk::validation::input::quote_identifier;
///
/// assert_eq!(quote_identifier("orders"), "orders");
/// assert_eq!(quote_identifier("order"), "`order`");
/// assert_eq!(quote_identifier("line items"), "`line items`");
/// ```
pub fn quote_identifier(name: &str) -> String {
    if SIMPLE_IDENTIFIER.is_match(name) && !is_sql_reserved_word(name) {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

/// Quote every part of a dotted name (e.g., `catalog.schema.table`).
pub fn quote_qualified(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| quote_identifier(p))
        .collect::<Vec<_>>()
        .join(".")
}

/// Render a single-quoted SQL string literal.
///
/// Control characters other than whitespace are dropped; backslashes and quotes are
/// escaped.
///
/// # Examples
///
/// ```
/// use schema_graph_sdk::validation::input::sql_string_literal;
///
/// assert_eq!(sql_string_literal("it's"), r"'it\'s'");
/// ```
pub fn sql_string_literal(text: &str) -> String {
    let cleaned = sanitize_description(text);
    format!("'{}'", cleaned.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Remove control characters except newlines and tabs.
pub fn sanitize_description(desc: &str) -> String {
    desc.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
        .collect()
}

/// Check if a word is reserved in the target SQL dialect.
pub fn is_sql_reserved_word(word: &str) -> bool {
    const RESERVED_WORDS: &[&str] = &[
        "all", "alter", "and", "any", "array", "as", "asc", "between", "both", "by", "case",
        "cast", "check", "collate", "column", "constraint", "create", "cross", "current",
        "current_date", "current_timestamp", "current_user", "date", "default", "delete",
        "desc", "distinct", "drop", "else", "end", "except", "exists", "false", "fetch",
        "for", "foreign", "from", "full", "grant", "group", "having", "in", "inner",
        "insert", "intersect", "interval", "into", "is", "join", "key", "lateral", "leading",
        "left", "like", "limit", "map", "natural", "not", "null", "of", "offset", "on", "or",
        "order", "outer", "overlaps", "primary", "references", "revoke", "right", "rollback",
        "select", "set", "some", "struct", "table", "then", "time", "timestamp", "to",
        "trailing", "true", "union", "unique", "update", "user", "using", "values", "view",
        "when", "where", "window", "with",
    ];

    let lower = word.to_lowercase();
    RESERVED_WORDS.contains(&lower.as_str())
}

/// Sanitize a project name for use as a storage key.
///
/// # Examples
///
/// ```
/// use schema_graph_sdk::validation::input::sanitize_project_name;
///
/// assert_eq!(sanitize_project_name("sales-model"), "sales-model");
/// assert_eq!(sanitize_project_name("sales/model"), "sales_model");
/// assert_eq!(sanitize_project_name("sales..model"), "sales.model");
/// assert_eq!(sanitize_project_name("///"), "project");
/// ```
pub fn sanitize_project_name(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    let mut last_was_dot = false;

    for ch in name.chars() {
        match ch {
            ch if ch.is_alphanumeric() || ch == '-' || ch == '_' => {
                sanitized.push(ch);
                last_was_dot = false;
            }
            '.' if !last_was_dot => {
                sanitized.push('.');
                last_was_dot = true;
            }
            '.' => {}
            _ => {
                if !sanitized.ends_with('_') {
                    sanitized.push('_');
                }
                last_was_dot = false;
            }
        }

        if sanitized.len() >= MAX_PROJECT_NAME_LENGTH {
            break;
        }
    }

    let trimmed = sanitized.trim_matches(['.', '_']);
    if trimmed.is_empty() {
        "project".to_string()
    } else {
        trimmed.to_string()
    }
}
