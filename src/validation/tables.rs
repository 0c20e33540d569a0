//! Table validation functionality
//!
//! Validates table structure, column type parameters and naming conflicts. Name
//! comparisons are case-insensitive because the catalog resolves identifiers that way.

use super::input::{validate_comment, validate_field_name, validate_table_name};
use crate::error::SchemaError;
use crate::models::{DataType, Field, Project, Table, TypeParameters};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Largest VARCHAR/CHAR length accepted by the target dialect
pub const MAX_CHAR_LENGTH: u32 = 65535;

/// Largest DECIMAL precision accepted by the target dialect
pub const MAX_DECIMAL_PRECISION: u32 = 38;

/// Why two tables conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    SameId,
    SameName,
}

/// Naming conflict between an incoming table and one already known
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConflict {
    pub new_table_id: String,
    pub new_table_name: String,
    pub existing_table_id: String,
    pub existing_table_name: String,
    pub reason: ConflictReason,
}

impl NamingConflict {
    pub fn into_error(self) -> SchemaError {
        let message = match self.reason {
            ConflictReason::SameId => format!(
                "table id already used by '{}'",
                self.existing_table_name
            ),
            ConflictReason::SameName => format!(
                "table name '{}' collides with existing table {} ('{}')",
                self.new_table_name, self.existing_table_id, self.existing_table_name
            ),
        };
        SchemaError::duplicate(self.new_table_id, message)
    }
}

/// Table validator
#[derive(Default)]
pub struct TableValidator;

impl TableValidator {
    /// Create a new table validator
    ///
    /// # Example
    ///
    /// ```rust
    /// use schema_graph_sdk::validation::tables::TableValidator;
    ///
    /// let validator = TableValidator::new();
    /// ```
    pub fn new() -> Self {
        Self
    }

    /// Detect conflicts between incoming tables and existing ones
    ///
    /// A conflict is a shared id or a case-insensitive name match. Incoming tables are also
    /// checked against each other, in order.
    ///
    /// # Example
    ///
    /// ```rust
    /// use schema_graph_sdk::validation::tables::TableValidator;
    /// use schema_graph_sdk::models::Table;
    ///
    /// let existing = vec![Table::new("Users")];
    /// let incoming = vec![Table::new("users")];
    ///
    /// let conflicts = TableValidator::new().detect_naming_conflicts(&existing, &incoming);
    /// assert_eq!(conflicts.len(), 1);
    /// ```
    pub fn detect_naming_conflicts(
        &self,
        existing_tables: &[Table],
        new_tables: &[Table],
    ) -> Vec<NamingConflict> {
        let mut by_id: HashMap<&str, &Table> = HashMap::new();
        let mut by_name: HashMap<String, &Table> = HashMap::new();
        for table in existing_tables {
            by_id.insert(table.id.as_str(), table);
            by_name.insert(table.name.to_lowercase(), table);
        }

        let mut conflicts = Vec::new();
        for new_table in new_tables {
            let conflict = if let Some(existing) = by_id.get(new_table.id.as_str()) {
                Some((*existing, ConflictReason::SameId))
            } else {
                by_name
                    .get(&new_table.name.to_lowercase())
                    .map(|existing| (*existing, ConflictReason::SameName))
            };

            match conflict {
                Some((existing, reason)) => conflicts.push(NamingConflict {
                    new_table_id: new_table.id.clone(),
                    new_table_name: new_table.name.clone(),
                    existing_table_id: existing.id.clone(),
                    existing_table_name: existing.name.clone(),
                    reason,
                }),
                None => {
                    by_id.insert(new_table.id.as_str(), new_table);
                    by_name.insert(new_table.name.to_lowercase(), new_table);
                }
            }
        }

        conflicts
    }

    /// Structural checks on one table: names, non-empty field list, unique field ids and
    /// names, and type parameters. Every problem is reported.
    pub fn validate_table(&self, table: &Table) -> Vec<SchemaError> {
        let mut errors = Vec::new();

        if let Err(e) = validate_table_name(&table.name) {
            errors.push(e.for_entity(&table.id));
        }
        if let Some(comment) = &table.comment
            && let Err(e) = validate_comment(comment)
        {
            errors.push(e.for_entity(&table.id));
        }
        if table.fields.is_empty() {
            errors.push(SchemaError::validation(
                &table.id,
                format!("table '{}' has no fields", table.name),
            ));
        }

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for field in &table.fields {
            if !ids.insert(field.id.as_str()) {
                errors.push(SchemaError::duplicate(
                    &field.id,
                    format!("field id appears twice in table '{}'", table.name),
                ));
            }
            if let Err(e) = validate_field_name(&field.name) {
                errors.push(e.for_entity(&field.id));
            } else if !names.insert(field.name.to_lowercase()) {
                errors.push(SchemaError::duplicate(
                    &field.id,
                    format!(
                        "field name '{}' appears twice in table '{}'",
                        field.name, table.name
                    ),
                ));
            }
            if let Err(message) = validate_type_parameters(field) {
                errors.push(SchemaError::validation(&field.id, message));
            }
        }

        errors
    }

    /// Case-insensitive duplicate names across tables and views of a project
    pub fn detect_duplicate_names(&self, project: &Project) -> Vec<SchemaError> {
        let entries = project
            .tables
            .iter()
            .map(|t| (t.id.as_str(), t.name.as_str()))
            .chain(
                project
                    .metric_views
                    .iter()
                    .map(|v| (v.id.as_str(), v.name.as_str())),
            )
            .chain(
                project
                    .traditional_views
                    .iter()
                    .map(|v| (v.id.as_str(), v.name.as_str())),
            );

        let mut seen: HashMap<String, &str> = HashMap::new();
        let mut errors = Vec::new();
        for (id, name) in entries {
            if let Some(first) = seen.get(&name.to_lowercase()) {
                errors.push(SchemaError::duplicate(
                    id,
                    format!("name '{}' is already used by {}", name, first),
                ));
            } else {
                seen.insert(name.to_lowercase(), id);
            }
        }
        errors
    }
}

/// Check that a field's type parameters fit its data type.
///
/// # Rules
///
/// - VARCHAR/CHAR need a length in 1..=65535
/// - DECIMAL precision must be in 1..=38 and scale in 0..=precision (parameters optional)
/// - ARRAY needs an element type, MAP a key and value type, STRUCT at least one member
/// - Other types ignore free-form parameters but reject mismatched structured ones
///
/// # Example
///
/// ```rust
/// use schema_graph_sdk::models::{DataType, Field, TypeParameters};
/// use schema_graph_sdk::validation::tables::validate_type_parameters;
///
/// let ok = Field::new("amount", DataType::Decimal).with_type_parameters(TypeParameters::decimal(10, 2));
/// assert!(validate_type_parameters(&ok).is_ok());
///
/// let bad = Field::new("code", DataType::Varchar);
/// assert!(validate_type_parameters(&bad).is_err());
/// ```
pub fn validate_type_parameters(field: &Field) -> Result<(), String> {
    let params = field.type_parameters.as_ref();
    let data_type = field.data_type;
    let mismatch = || {
        format!(
            "type parameters of '{}' do not match {}",
            field.name, data_type
        )
    };

    match (data_type, params) {
        (DataType::Varchar | DataType::Char, Some(TypeParameters::Length { length })) => {
            if *length == 0 || *length > MAX_CHAR_LENGTH {
                return Err(format!(
                    "{} length of '{}' must be between 1 and {} (got {})",
                    data_type, field.name, MAX_CHAR_LENGTH, length
                ));
            }
        }
        (DataType::Varchar | DataType::Char, _) => {
            return Err(format!("{} field '{}' requires a length", data_type, field.name));
        }
        (DataType::Decimal, Some(TypeParameters::Decimal { precision, scale })) => {
            if *precision == 0 || *precision > MAX_DECIMAL_PRECISION {
                return Err(format!(
                    "DECIMAL precision of '{}' must be between 1 and {} (got {})",
                    field.name, MAX_DECIMAL_PRECISION, precision
                ));
            }
            if scale > precision {
                return Err(format!(
                    "DECIMAL scale of '{}' must not exceed precision ({} > {})",
                    field.name, scale, precision
                ));
            }
        }
        (DataType::Decimal, None | Some(TypeParameters::Other(_))) => {}
        (DataType::Array, Some(TypeParameters::Element { element_type }))
            if !element_type.trim().is_empty() => {}
        (DataType::Array, _) => {
            return Err(format!("ARRAY field '{}' requires an element type", field.name));
        }
        (DataType::Map, Some(TypeParameters::KeyValue { key_type, value_type }))
            if !key_type.trim().is_empty() && !value_type.trim().is_empty() => {}
        (DataType::Map, _) => {
            return Err(format!(
                "MAP field '{}' requires key and value types",
                field.name
            ));
        }
        (DataType::Struct, Some(TypeParameters::Struct { fields })) if !fields.is_empty() => {}
        (DataType::Struct, _) => {
            return Err(format!("STRUCT field '{}' requires members", field.name));
        }
        (DataType::Interval, Some(TypeParameters::Qualifier { .. }))
        | (DataType::Geography | DataType::Geometry, Some(TypeParameters::Srid { .. })) => {}
        (_, None | Some(TypeParameters::Other(_))) => {}
        (_, Some(_)) => return Err(mismatch()),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_id_and_name_conflicts() {
        let existing = vec![Table::new("Orders").with_id("T1")];
        let incoming = vec![
            Table::new("customers").with_id("T1"),
            Table::new("ORDERS").with_id("T2"),
            Table::new("products").with_id("T3"),
            Table::new("Products").with_id("T4"),
        ];
        let conflicts = TableValidator::new().detect_naming_conflicts(&existing, &incoming);
        let reasons: Vec<_> = conflicts
            .iter()
            .map(|c| (c.new_table_id.as_str(), c.reason))
            .collect();
        assert_eq!(
            reasons,
            vec![
                ("T1", ConflictReason::SameId),
                ("T2", ConflictReason::SameName),
                ("T4", ConflictReason::SameName),
            ]
        );
    }

    #[test]
    fn reports_every_table_problem() {
        let table = Table::new("")
            .with_id("T1")
            .with_field(Field::new("code", DataType::Varchar).with_id("F1"))
            .with_field(Field::new("CODE", DataType::Int).with_id("F2"));
        let errors = TableValidator::new().validate_table(&table);
        assert_eq!(errors.len(), 3);
        assert!(matches!(&errors[0], SchemaError::Validation { entity_id, .. } if entity_id == "T1"));
        assert!(matches!(&errors[1], SchemaError::Validation { entity_id, .. } if entity_id == "F1"));
        assert!(matches!(&errors[2], SchemaError::DuplicateEntity { entity_id, .. } if entity_id == "F2"));
    }

    #[test]
    fn decimal_ranges() {
        let field = |p, s| {
            Field::new("amount", DataType::Decimal)
                .with_type_parameters(TypeParameters::decimal(p, s))
        };
        assert!(validate_type_parameters(&field(38, 38)).is_ok());
        assert!(validate_type_parameters(&field(39, 0)).is_err());
        assert!(validate_type_parameters(&field(5, 6)).is_err());
        assert!(validate_type_parameters(&Field::new("amount", DataType::Decimal)).is_ok());
    }

    #[test]
    fn mismatched_parameters_are_rejected() {
        let field = Field::new("id", DataType::Int).with_type_parameters(TypeParameters::length(10));
        assert!(validate_type_parameters(&field).is_err());
    }

    #[test]
    fn duplicate_names_across_tables_and_views() {
        let mut project = Project::new("p", "main", "sales");
        project.tables.push(Table::new("orders").with_id("T1"));
        project
            .traditional_views
            .push(crate::models::TraditionalView::new("Orders", "SELECT 1").with_id("V1"));
        let errors = TableValidator::new().detect_duplicate_names(&project);
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], SchemaError::DuplicateEntity { entity_id, .. } if entity_id == "V1"));
    }
}
