//! SQL rendering for tables, tags, foreign keys and plain views.
//!
//! Every identifier goes through [`quote_identifier`] and every free text through
//! [`sql_string_literal`]; nothing user supplied is spliced into a statement raw except
//! column default expressions and view queries.

use super::CreateMode;
use crate::models::{
    DataType, Field, ForeignKeyReference, Project, ReferentialAction, StorageFormat, Table,
    TagMap, TraditionalView, TypeParameters,
};
use crate::validation::input::{quote_identifier, quote_qualified, sql_string_literal};
use crate::validation::views::qualify_table_references;

/// Tag key used to carry a logical (business) name into the catalog
pub const LOGICAL_NAME_TAG: &str = "logical_name";

/// Renders statements for one target catalog and schema
#[derive(Debug, Clone)]
pub struct DdlRenderer {
    catalog: String,
    schema: String,
    create_mode: CreateMode,
}

impl DdlRenderer {
    pub fn new(catalog: impl Into<String>, schema: impl Into<String>, create_mode: CreateMode) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
            create_mode,
        }
    }

    /// Quoted three-part name of an object in the target schema
    pub fn qualified(&self, name: &str) -> String {
        quote_qualified(&[&self.catalog, &self.schema, name])
    }

    fn create_prefix(&self, object: &str) -> String {
        match self.create_mode {
            CreateMode::Create => format!("CREATE {}", object),
            CreateMode::CreateOrReplace => format!("CREATE OR REPLACE {}", object),
            CreateMode::IfNotExists => format!("CREATE {} IF NOT EXISTS", object),
        }
    }

    /// `CREATE TABLE` with inline primary key constraint
    ///
    /// # Example
    ///
    /// ```rust
    /// use schema_graph_sdk::compiler::{CreateMode, ddl::DdlRenderer};
    /// use schema_graph_sdk::models::{DataType, Field, Table};
    ///
    /// let table = Table::new("orders")
    ///     .with_field(Field::new("order_id", DataType::Bigint).primary_key())
    ///     .with_field(Field::new("note", DataType::String).with_comment("free text"));
    ///
    /// let sql = DdlRenderer::new("main", "sales", CreateMode::CreateOrReplace).create_table(&table);
    /// assert_eq!(
    ///     sql,
    ///     "CREATE OR REPLACE TABLE main.sales.orders (\n  order_id BIGINT NOT NULL,\n  note STRING COMMENT 'free text',\n  CONSTRAINT pk_orders PRIMARY KEY (order_id)\n)"
    /// );
    /// ```
    pub fn create_table(&self, table: &Table) -> String {
        let mut lines: Vec<String> = table.fields.iter().map(column_definition).collect();

        let pk_columns: Vec<String> = table
            .primary_key_fields()
            .map(|f| quote_identifier(&f.name))
            .collect();
        if !pk_columns.is_empty() {
            lines.push(format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                quote_identifier(&constraint_identifier(&["pk", &table.name])),
                pk_columns.join(", ")
            ));
        }

        let mut sql = format!(
            "{} {} (\n  {}\n)",
            self.create_prefix("TABLE"),
            self.qualified(&table.name),
            lines.join(",\n  ")
        );
        if table.storage_format != StorageFormat::Delta {
            sql.push_str(&format!("\nUSING {}", table.storage_format.sql_name()));
        }
        if let Some(location) = non_blank(table.storage_location.as_deref()) {
            sql.push_str(&format!("\nLOCATION {}", sql_string_literal(location)));
        }
        if let Some(comment) = non_blank(table.comment.as_deref()) {
            sql.push_str(&format!("\nCOMMENT {}", sql_string_literal(comment)));
        }
        sql
    }

    /// Table-level tag statement followed by one statement per tagged column
    pub fn table_tags(&self, table: &Table) -> Vec<String> {
        let mut statements = Vec::new();
        let target = self.qualified(&table.name);

        let tags = with_logical_name(&table.tags, table.logical_name.as_deref());
        if !tags.is_empty() {
            statements.push(format!("ALTER TABLE {} SET TAGS ({})", target, tag_list(&tags)));
        }

        for field in &table.fields {
            let tags = with_logical_name(&field.tags, field.logical_name.as_deref());
            if !tags.is_empty() {
                statements.push(format!(
                    "ALTER TABLE {} ALTER COLUMN {} SET TAGS ({})",
                    target,
                    quote_identifier(&field.name),
                    tag_list(&tags)
                ));
            }
        }
        statements
    }

    /// Tag statement for a view, if it carries any tags
    pub fn view_tags(&self, name: &str, tags: &TagMap, logical_name: Option<&str>) -> Option<String> {
        let tags = with_logical_name(tags, logical_name);
        (!tags.is_empty()).then(|| {
            format!(
                "ALTER VIEW {} SET TAGS ({})",
                self.qualified(name),
                tag_list(&tags)
            )
        })
    }

    /// `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY`
    ///
    /// The constraint name comes from the reference, then `fallback_name`, then
    /// `fk_{table}_{field}`.
    pub fn foreign_key(
        &self,
        table: &Table,
        field: &Field,
        reference: &ForeignKeyReference,
        referenced: (&Table, &Field),
        fallback_name: Option<&str>,
    ) -> String {
        let (referenced_table, referenced_field) = referenced;
        let name = non_blank(reference.constraint_name.as_deref())
            .or(non_blank(fallback_name))
            .map(str::to_string)
            .unwrap_or_else(|| constraint_identifier(&["fk", &table.name, &field.name]));

        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.qualified(&table.name),
            quote_identifier(&name),
            quote_identifier(&field.name),
            self.qualified(&referenced_table.name),
            quote_identifier(&referenced_field.name)
        );
        if reference.on_delete != ReferentialAction::NoAction {
            sql.push_str(&format!(" ON DELETE {}", reference.on_delete.sql_name()));
        }
        if reference.on_update != ReferentialAction::NoAction {
            sql.push_str(&format!(" ON UPDATE {}", reference.on_update.sql_name()));
        }
        sql
    }

    /// `CREATE VIEW ... AS <query>`; the trailing semicolon of the query is dropped and
    /// references to tables of `project` are qualified with the target catalog and schema
    pub fn create_view(&self, view: &TraditionalView, project: &Project) -> String {
        let mut sql = format!("{} {}", self.create_prefix("VIEW"), self.qualified(&view.name));
        if let Some(description) = non_blank(view.description.as_deref()) {
            sql.push_str(&format!("\nCOMMENT {}", sql_string_literal(description)));
        }
        let query = view.sql_query.trim().trim_end_matches(';').trim_end();
        let query = qualify_table_references(project, query, |name| self.qualified(name));
        sql.push_str(&format!("\nAS {}", query));
        sql
    }

    /// Header of a metric view statement up to and including `AS`
    pub fn metric_view_header(&self, name: &str) -> String {
        format!(
            "{} {}\nWITH METRICS\nLANGUAGE YAML\nAS",
            self.create_prefix("VIEW"),
            self.qualified(name)
        )
    }
}

/// `name TYPE [NOT NULL] [DEFAULT v] [COMMENT '...']`
pub fn column_definition(field: &Field) -> String {
    let mut definition = format!("{} {}", quote_identifier(&field.name), column_type(field));
    if !field.nullable {
        definition.push_str(" NOT NULL");
    }
    if let Some(default) = non_blank(field.default_value.as_deref()) {
        definition.push_str(&format!(" DEFAULT {}", default.trim()));
    }
    if let Some(comment) = non_blank(field.comment.as_deref()) {
        definition.push_str(&format!(" COMMENT {}", sql_string_literal(comment)));
    }
    definition
}

/// Full type text of a column including its parameters
///
/// # Example
///
/// ```rust
/// use schema_graph_sdk::compiler::ddl::column_type;
/// use schema_graph_sdk::models::{DataType, Field, TypeParameters};
///
/// let amount = Field::new("amount", DataType::Decimal).with_type_parameters(TypeParameters::decimal(10, 2));
/// assert_eq!(column_type(&amount), "DECIMAL(10,2)");
///
/// let tags = Field::new("tags", DataType::Array)
///     .with_type_parameters(TypeParameters::Element { element_type: "string".into() });
/// assert_eq!(column_type(&tags), "ARRAY<STRING>");
/// ```
pub fn column_type(field: &Field) -> String {
    let base = field.data_type.sql_name();
    match (field.data_type, field.type_parameters.as_ref()) {
        (DataType::Decimal, Some(TypeParameters::Decimal { precision, scale })) => {
            format!("{}({},{})", base, precision, scale)
        }
        (DataType::Varchar | DataType::Char, Some(TypeParameters::Length { length })) => {
            format!("{}({})", base, length)
        }
        (DataType::Array, Some(TypeParameters::Element { element_type })) => {
            format!("ARRAY<{}>", nested_type(element_type))
        }
        (DataType::Map, Some(TypeParameters::KeyValue { key_type, value_type })) => {
            format!("MAP<{}, {}>", nested_type(key_type), nested_type(value_type))
        }
        (DataType::Struct, Some(TypeParameters::Struct { fields })) => {
            let members: Vec<String> = fields
                .iter()
                .map(|m| format!("{}: {}", quote_identifier(&m.name), nested_type(&m.data_type)))
                .collect();
            format!("STRUCT<{}>", members.join(", "))
        }
        (DataType::Interval, Some(TypeParameters::Qualifier { qualifier })) => {
            format!("INTERVAL {}", qualifier.trim().to_uppercase())
        }
        (DataType::Geography | DataType::Geometry, Some(TypeParameters::Srid { srid })) => {
            format!("{}({})", base, srid)
        }
        _ => base.to_string(),
    }
}

// Nested type text keeps its parameters but is upper-cased for consistency
fn nested_type(text: &str) -> String {
    text.trim().to_uppercase()
}

/// Constraint name from parts: lower-cased, non-alphanumerics collapsed to `_`
pub fn constraint_identifier(parts: &[&str]) -> String {
    let mut name = String::new();
    for part in parts {
        for ch in part.chars() {
            let ch = if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '_'
            };
            if ch == '_' && (name.is_empty() || name.ends_with('_')) {
                continue;
            }
            name.push(ch);
        }
        if !name.is_empty() && !name.ends_with('_') {
            name.push('_');
        }
    }
    name.trim_end_matches('_').to_string()
}

fn with_logical_name(tags: &TagMap, logical_name: Option<&str>) -> TagMap {
    let mut tags = tags.clone();
    if let Some(logical_name) = non_blank(logical_name) {
        tags.entry(LOGICAL_NAME_TAG.to_string())
            .or_insert_with(|| logical_name.to_string());
    }
    tags
}

fn tag_list(tags: &TagMap) -> String {
    tags.iter()
        .map(|(k, v)| format!("{} = {}", sql_string_literal(k), sql_string_literal(v)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
