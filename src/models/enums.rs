//! Enums for schema modeling
//!
//! # Serde Casing Conventions
//!
//! - `SCREAMING_SNAKE_CASE`: SQL keywords and catalog constants (DataType, TableKind,
//!   StorageFormat, JoinType)
//! - `snake_case`: designer-level vocabulary (RelationshipType, ForeignKeyOrigin, WindowType)
//! - Explicit renames where the SQL keyword contains a space (ReferentialAction)
//!
//! The casing matches the canonical project representation consumed by the persistence
//! and catalog collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// SQL column types supported by the target dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    #[serde(alias = "LONG")]
    Bigint,
    #[serde(alias = "INTEGER")]
    Int,
    #[serde(alias = "SHORT")]
    Smallint,
    #[serde(alias = "BYTE")]
    Tinyint,
    #[serde(alias = "REAL")]
    Float,
    Double,
    #[serde(alias = "DEC", alias = "NUMERIC")]
    Decimal,
    String,
    Varchar,
    Char,
    Date,
    Timestamp,
    TimestampNtz,
    Interval,
    Boolean,
    Binary,
    Geography,
    Geometry,
    Variant,
    Object,
    Array,
    Map,
    Struct,
}

impl DataType {
    /// SQL keyword for this type, without parameters
    pub fn sql_name(&self) -> &'static str {
        match self {
            DataType::Bigint => "BIGINT",
            DataType::Int => "INT",
            DataType::Smallint => "SMALLINT",
            DataType::Tinyint => "TINYINT",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::Decimal => "DECIMAL",
            DataType::String => "STRING",
            DataType::Varchar => "VARCHAR",
            DataType::Char => "CHAR",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMP",
            DataType::TimestampNtz => "TIMESTAMP_NTZ",
            DataType::Interval => "INTERVAL",
            DataType::Boolean => "BOOLEAN",
            DataType::Binary => "BINARY",
            DataType::Geography => "GEOGRAPHY",
            DataType::Geometry => "GEOMETRY",
            DataType::Variant => "VARIANT",
            DataType::Object => "OBJECT",
            DataType::Array => "ARRAY",
            DataType::Map => "MAP",
            DataType::Struct => "STRUCT",
        }
    }

    /// Types whose parameters are a single character length
    pub fn takes_length(&self) -> bool {
        matches!(self, DataType::Varchar | DataType::Char)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        serde_json::from_value(serde_json::Value::String(normalized))
            .map_err(|_| format!("Unsupported data type: {}", s))
    }
}

/// Whether the catalog owns the table's storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableKind {
    #[default]
    Managed,
    External,
}

/// Physical storage format of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageFormat {
    #[default]
    Delta,
    Parquet,
    Csv,
    Json,
    Avro,
    Orc,
    Text,
}

impl StorageFormat {
    pub fn sql_name(&self) -> &'static str {
        match self {
            StorageFormat::Delta => "DELTA",
            StorageFormat::Parquet => "PARQUET",
            StorageFormat::Csv => "CSV",
            StorageFormat::Json => "JSON",
            StorageFormat::Avro => "AVRO",
            StorageFormat::Orc => "ORC",
            StorageFormat::Text => "TEXT",
        }
    }
}

/// Cardinality of a table relationship as drawn in the designer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    OneToOne,
    #[default]
    OneToMany,
    ManyToOne,
    ManyToMany,
}

/// Referential action attached to a foreign key constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReferentialAction {
    #[default]
    #[serde(rename = "NO ACTION", alias = "NO_ACTION")]
    NoAction,
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "SET NULL", alias = "SET_NULL")]
    SetNull,
    #[serde(rename = "SET DEFAULT", alias = "SET_DEFAULT")]
    SetDefault,
    #[serde(rename = "RESTRICT")]
    Restrict,
}

impl ReferentialAction {
    pub fn sql_name(&self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::Restrict => "RESTRICT",
        }
    }
}

/// How a foreign-key field came into existence
///
/// Linked fields mirror their primary key (drag-and-drop creation) and follow renames.
/// Independent fields keep their own name and only track the key's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyOrigin {
    Linked,
    Independent,
}

/// Join type used inside a metric view definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinType {
    #[default]
    Left,
    Inner,
    Right,
    Full,
    Cross,
}

impl JoinType {
    pub fn as_lowercase(&self) -> &'static str {
        match self {
            JoinType::Left => "left",
            JoinType::Inner => "inner",
            JoinType::Right => "right",
            JoinType::Full => "full",
            JoinType::Cross => "cross",
        }
    }
}

/// Window calculation applied by a metric view measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    MovingAverage,
    RunningTotal,
    PeriodOverPeriod,
    Rank,
    RowNumber,
    PercentOfTotal,
    CumulativeSum,
    Custom,
}
