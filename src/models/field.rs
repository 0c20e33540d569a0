//! Field model for the SDK

use super::enums::{DataType, ForeignKeyOrigin, ReferentialAction};
use super::tag::TagMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Member of a STRUCT column type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructMember {
    pub name: String,
    /// Rendered type text of the member (e.g., `STRING`, `DECIMAL(10,2)`)
    pub data_type: String,
}

/// Structured type parameters of a column
///
/// The model only ever holds this canonical form. Legacy string encodings such as
/// `"10,2"` are converted at the load boundary (see [`crate::model::normalize`]).
/// Unknown objects are kept verbatim in `Other`; an object only takes a canonical shape
/// when its keys are exactly that shape's keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypeParameters {
    /// DECIMAL precision and scale
    Decimal {
        precision: u32,
        #[serde(default)]
        scale: u32,
    },
    /// VARCHAR/CHAR length
    Length { length: u32 },
    /// ARRAY element type
    Element { element_type: String },
    /// MAP key and value types
    KeyValue { key_type: String, value_type: String },
    /// STRUCT members
    Struct { fields: Vec<StructMember> },
    /// INTERVAL qualifier (e.g., `DAY TO SECOND`)
    Qualifier { qualifier: String },
    /// Spatial reference id for GEOGRAPHY/GEOMETRY
    Srid { srid: u32 },
    Other(serde_json::Map<String, serde_json::Value>),
}

/// Strict mirrors of the canonical shapes, used to pick a variant on the way in
#[derive(Deserialize)]
#[serde(untagged)]
enum CanonicalParameters {
    Decimal(DecimalShape),
    Length(LengthShape),
    Element(ElementShape),
    KeyValue(KeyValueShape),
    Struct(StructShape),
    Qualifier(QualifierShape),
    Srid(SridShape),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DecimalShape {
    precision: u32,
    #[serde(default)]
    scale: u32,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LengthShape {
    length: u32,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ElementShape {
    element_type: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct KeyValueShape {
    key_type: String,
    value_type: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StructShape {
    fields: Vec<StructMember>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct QualifierShape {
    qualifier: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SridShape {
    srid: u32,
}

impl From<CanonicalParameters> for TypeParameters {
    fn from(shape: CanonicalParameters) -> Self {
        match shape {
            CanonicalParameters::Decimal(DecimalShape { precision, scale }) => {
                TypeParameters::Decimal { precision, scale }
            }
            CanonicalParameters::Length(LengthShape { length }) => TypeParameters::Length { length },
            CanonicalParameters::Element(ElementShape { element_type }) => {
                TypeParameters::Element { element_type }
            }
            CanonicalParameters::KeyValue(KeyValueShape {
                key_type,
                value_type,
            }) => TypeParameters::KeyValue {
                key_type,
                value_type,
            },
            CanonicalParameters::Struct(StructShape { fields }) => TypeParameters::Struct { fields },
            CanonicalParameters::Qualifier(QualifierShape { qualifier }) => {
                TypeParameters::Qualifier { qualifier }
            }
            CanonicalParameters::Srid(SridShape { srid }) => TypeParameters::Srid { srid },
        }
    }
}

impl<'de> Deserialize<'de> for TypeParameters {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let object = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        match serde_json::from_value::<CanonicalParameters>(serde_json::Value::Object(object.clone())) {
            Ok(shape) => Ok(shape.into()),
            Err(_) => Ok(TypeParameters::Other(object)),
        }
    }
}

impl TypeParameters {
    pub fn decimal(precision: u32, scale: u32) -> Self {
        TypeParameters::Decimal { precision, scale }
    }

    pub fn length(length: u32) -> Self {
        TypeParameters::Length { length }
    }
}

/// Structured foreign key reference held by the dependent field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyReference {
    pub referenced_table_id: String,
    pub referenced_field_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_name: Option<String>,
    #[serde(default)]
    pub on_delete: ReferentialAction,
    #[serde(default)]
    pub on_update: ReferentialAction,
}

impl ForeignKeyReference {
    pub fn new(referenced_table_id: impl Into<String>, referenced_field_id: impl Into<String>) -> Self {
        Self {
            referenced_table_id: referenced_table_id.into(),
            referenced_field_id: referenced_field_id.into(),
            constraint_name: None,
            on_delete: ReferentialAction::NoAction,
            on_update: ReferentialAction::NoAction,
        }
    }

    /// Whether this reference targets the given primary-key location
    pub fn points_to(&self, table_id: &str, field_id: &str) -> bool {
        self.referenced_table_id == table_id && self.referenced_field_id == field_id
    }
}

/// Column of a table
///
/// # Example
///
/// ```rust
/// use schema_graph_sdk::models::{DataType, Field};
///
/// let field = Field::new("order_id", DataType::Bigint).with_id("F1").primary_key();
/// assert!(field.is_primary_key);
/// assert!(!field.nullable);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub name: String,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_parameters: Option<TypeParameters>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_name: Option<String>,
    #[serde(default)]
    pub tags: TagMap,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_foreign_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key_reference: Option<ForeignKeyReference>,
    /// Set when the foreign key is created through the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key_origin: Option<ForeignKeyOrigin>,
}

fn default_nullable() -> bool {
    true
}

impl Field {
    /// Create a nullable field with a fresh id
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            data_type,
            type_parameters: None,
            nullable: true,
            default_value: None,
            comment: None,
            logical_name: None,
            tags: TagMap::new(),
            is_primary_key: false,
            is_foreign_key: false,
            foreign_key_reference: None,
            foreign_key_origin: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_type_parameters(mut self, parameters: TypeParameters) -> Self {
        self.type_parameters = Some(parameters);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Flag as primary key; primary keys are not nullable
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    /// Attach a foreign key reference without recording an origin
    pub fn references(mut self, table_id: impl Into<String>, field_id: impl Into<String>) -> Self {
        self.is_foreign_key = true;
        self.foreign_key_reference = Some(ForeignKeyReference::new(table_id, field_id));
        self
    }

    /// Attach a reference, keeping `is_foreign_key` consistent with it
    pub fn attach_reference(&mut self, reference: ForeignKeyReference, origin: ForeignKeyOrigin) {
        self.is_foreign_key = true;
        self.foreign_key_reference = Some(reference);
        self.foreign_key_origin = Some(origin);
    }

    /// Turn the field back into a plain column
    pub fn detach_reference(&mut self) {
        self.is_foreign_key = false;
        self.foreign_key_reference = None;
        self.foreign_key_origin = None;
    }

    /// Whether this field holds a reference to the given primary-key location
    pub fn references_field(&self, table_id: &str, field_id: &str) -> bool {
        self.foreign_key_reference
            .as_ref()
            .is_some_and(|r| r.points_to(table_id, field_id))
    }

    /// Whether this field holds a reference into the given table
    pub fn references_table(&self, table_id: &str) -> bool {
        self.foreign_key_reference
            .as_ref()
            .is_some_and(|r| r.referenced_table_id == table_id)
    }
}
