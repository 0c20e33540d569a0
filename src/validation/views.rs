//! View validation and table reference extraction
//!
//! Traditional views are plain SELECT statements. The checks here keep anything other than
//! a single read-only query out of generated DDL, and the reference extractor finds the
//! tables a query reads so the dependency graph can order the view after them.

use crate::models::Project;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static LINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"--[^\n]*").expect("Invalid regex"));
static BLOCK_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("Invalid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex"));
static TABLE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:FROM|JOIN)\s+((?:`[^`]+`|[A-Za-z_][A-Za-z0-9_]*)(?:\.(?:`[^`]+`|[A-Za-z_][A-Za-z0-9_]*)){0,2})",
    )
    .expect("Invalid regex")
});
static STARTS_WITH_QUERY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\(?\s*(SELECT|WITH)\b").expect("Invalid regex"));
static PROHIBITED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(INSERT|UPDATE|DELETE|MERGE|TRUNCATE|DROP|ALTER|CREATE|GRANT|REVOKE|CALL|EXEC|EXECUTE|COPY|OPTIMIZE|VACUUM)\b",
    )
    .expect("Invalid regex")
});

fn strip_comments(sql: &str) -> String {
    let without_blocks = BLOCK_COMMENT.replace_all(sql, " ");
    let without_lines = LINE_COMMENT.replace_all(&without_blocks, " ");
    WHITESPACE.replace_all(&without_lines, " ").trim().to_string()
}

/// Check that a view query is a single read-only SELECT.
///
/// # Example
///
/// ```rust
/// use schema_graph_sdk::validation::views::validate_view_query;
///
/// assert!(validate_view_query("SELECT id FROM orders -- all orders").is_ok());
/// assert!(validate_view_query("WITH o AS (SELECT * FROM orders) SELECT * FROM o").is_ok());
/// assert!(validate_view_query("DROP TABLE orders").is_err());
/// assert!(validate_view_query("SELECT 1; SELECT 2").is_err());
/// ```
pub fn validate_view_query(sql: &str) -> Result<(), String> {
    let cleaned = strip_comments(sql);
    if cleaned.is_empty() {
        return Err("view query cannot be empty".to_string());
    }

    let body = cleaned.trim_end_matches(';').trim_end();
    if body.contains(';') {
        return Err("view query must be a single statement".to_string());
    }
    if !STARTS_WITH_QUERY.is_match(body) {
        return Err("view query must start with SELECT or WITH".to_string());
    }
    if let Some(keyword) = PROHIBITED.find(body) {
        return Err(format!(
            "view query contains prohibited keyword {}",
            keyword.as_str().to_uppercase()
        ));
    }
    Ok(())
}

/// Table references found after FROM and JOIN, in order of appearance, without duplicates.
///
/// # Example
///
/// ```rust
/// use schema_graph_sdk::validation::views::extract_table_references;
///
/// let refs = extract_table_references(
///     "SELECT * FROM main.sales.orders o LEFT JOIN customers c ON o.cid = c.id",
/// );
/// assert_eq!(refs, vec!["main.sales.orders", "customers"]);
/// ```
pub fn extract_table_references(sql: &str) -> Vec<String> {
    let cleaned = strip_comments(sql);
    let mut references: Vec<String> = Vec::new();
    for captures in TABLE_REFERENCE.captures_iter(&cleaned) {
        if let Some(reference) = captures.get(1) {
            let reference = reference.as_str().to_string();
            if !references.contains(&reference) {
                references.push(reference);
            }
        }
    }
    references
}

/// Rewrite FROM and JOIN references to project tables with `qualify`.
///
/// `table` and `schema.table` are retargeted whenever the name is a project table.
/// Three-part references are retargeted only when they name the project's own catalog and
/// schema; anything else is left as written.
///
/// # Example
///
/// ```rust
/// use schema_graph_sdk::models::{Project, Table};
/// use schema_graph_sdk::validation::views::qualify_table_references;
///
/// let mut project = Project::new("p", "main", "sales");
/// project.tables.push(Table::new("orders"));
/// let sql = qualify_table_references(
///     &project,
///     "SELECT * FROM orders o JOIN other.thing t ON o.id = t.id",
///     |name| format!("dev.sales.{}", name),
/// );
/// assert_eq!(sql, "SELECT * FROM dev.sales.orders o JOIN other.thing t ON o.id = t.id");
/// ```
pub fn qualify_table_references(
    project: &Project,
    sql: &str,
    qualify: impl Fn(&str) -> String,
) -> String {
    TABLE_REFERENCE
        .replace_all(sql, |captures: &Captures| {
            let whole = &captures[0];
            let reference = &captures[1];
            match project_table_name(project, reference) {
                Some(name) => format!(
                    "{}{}",
                    &whole[..whole.len() - reference.len()],
                    qualify(name)
                ),
                None => whole.to_string(),
            }
        })
        .into_owned()
}

fn project_table_name<'a>(project: &'a Project, reference: &str) -> Option<&'a str> {
    let parts = reference_parts(reference);
    let (table, prefix) = parts.split_last()?;
    if let [catalog, schema] = prefix
        && !(catalog.eq_ignore_ascii_case(&project.catalog_name)
            && schema.eq_ignore_ascii_case(&project.schema_name))
    {
        return None;
    }
    project.table_by_name(table).map(|t| t.name.as_str())
}

/// Dotted parts of a reference with backticks removed; dots inside backticks stay put
fn reference_parts(reference: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (index, ch) in reference.char_indices() {
        match ch {
            '`' => quoted = !quoted,
            '.' if !quoted => {
                parts.push(reference[start..index].trim_matches('`'));
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(reference[start..].trim_matches('`'));
    parts
}

/// Resolve the tables a query reads to project table ids.
///
/// The last part of each reference is matched case-insensitively against table names.
/// References to tables outside the project are ignored.
pub fn resolve_referenced_tables(project: &Project, sql: &str) -> Vec<String> {
    let mut ids = Vec::new();
    for reference in extract_table_references(sql) {
        if let Some(table) = project.table_by_name(unqualified(&reference))
            && !ids.contains(&table.id)
        {
            ids.push(table.id.clone());
        }
    }
    ids
}

/// Whether a query reads a table with the given name, ignoring catalog and schema parts.
pub fn references_table(sql: &str, table_name: &str) -> bool {
    extract_table_references(sql)
        .iter()
        .any(|reference| unqualified(reference).eq_ignore_ascii_case(table_name))
}

fn unqualified(reference: &str) -> &str {
    reference_parts(reference).last().copied().unwrap_or(reference)
}
