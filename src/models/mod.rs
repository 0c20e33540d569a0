//! Models module for the SDK
//!
//! Defines the value types of a schema project. Mutation rules live in [`crate::store`];
//! these types only carry data and small lookup helpers.

pub mod enums;
pub mod field;
pub mod project;
pub mod relationship;
pub mod table;
pub mod tag;
pub mod view;

pub use enums::*;
pub use field::{Field, ForeignKeyReference, StructMember, TypeParameters};
pub use project::Project;
pub use relationship::{ConnectionPoint, MetricRelationship, Relationship};
pub use table::{Position, Size, Table};
pub use tag::{Tag, TagMap, merge_tags};
pub use view::{Dimension, Measure, MetricView, MetricViewJoin, TraditionalView};
