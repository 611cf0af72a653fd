//! Entity, column and relation metadata.
//!
//! Metadata is declared once during bootstrap through [`MetadataRegistry::entity`]
//! and read by every other component afterwards.

mod builder;
mod registry;

pub use builder::{Column, EntityBuilder};
pub use registry::MetadataRegistry;

use crate::prelude::*;
use core::fmt;
use serde_json::Value;

/// Identity of an entity class.
///
/// Wraps the class name; two classes are the same entity when their names match.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityClass(&'static str);

impl EntityClass {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityClass({})", self.0)
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Resolves the related side of a relation at call time, so relations may
/// point at classes registered later.
pub type EntityFactory = fn() -> EntityClass;

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    Real,
    Text,
    Boolean,
    Blob,
    Json,
}

impl DataType {
    /// SQLite storage class used in generated DDL.
    pub const fn sql_type(&self) -> &'static str {
        match self {
            DataType::Integer | DataType::Boolean => "INTEGER",
            DataType::Real => "REAL",
            DataType::Text | DataType::Json => "TEXT",
            DataType::Blob => "BLOB",
        }
    }

    /// Converts an entity value into a statement parameter.
    ///
    /// Returns `None` when the value cannot be stored in a column of this type.
    pub fn encode(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (DataType::Json, Value::Null) => Some(Value::Null),
            (DataType::Json, other) => Some(Value::String(other.to_string())),
            (DataType::Blob, Value::Array(bytes)) => bytes
                .iter()
                .all(|b| b.as_u64().is_some_and(|b| b <= u64::from(u8::MAX)))
                .then(|| value.clone()),
            (_, Value::Array(_) | Value::Object(_)) => None,
            (_, scalar) => Some(scalar.clone()),
        }
    }

    /// Converts a value read from a row back into its entity representation.
    pub fn decode(&self, value: Value) -> Value {
        match (self, value) {
            (DataType::Boolean, Value::Number(n)) => Value::Bool(n.as_i64().is_some_and(|n| n != 0)),
            (DataType::Json, Value::String(text)) => {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            }
            (_, other) => other,
        }
    }
}

/// Kind of navigation between two entity classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    OneToMany,
    ManyToOne,
    OneToOne,
    ManyToMany,
}

impl RelationKind {
    /// Whether the relation holds a collection of related instances.
    pub const fn is_collection(&self) -> bool {
        matches!(self, RelationKind::OneToMany | RelationKind::ManyToMany)
    }

    /// Kind the inverse side is expected to declare.
    pub const fn mirrored(&self) -> RelationKind {
        match self {
            RelationKind::OneToMany => RelationKind::ManyToOne,
            RelationKind::ManyToOne => RelationKind::OneToMany,
            RelationKind::OneToOne => RelationKind::OneToOne,
            RelationKind::ManyToMany => RelationKind::ManyToMany,
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RelationKind::OneToMany => "one-to-many",
            RelationKind::ManyToOne => "many-to-one",
            RelationKind::OneToOne => "one-to-one",
            RelationKind::ManyToMany => "many-to-many",
        })
    }
}

/// Table mapping of a registered entity class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMeta {
    pub entity: EntityClass,
    pub table_name: String,
}

/// Metadata of a scalar property stored in a column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    pub entity: EntityClass,
    pub property_name: String,
    pub column_name: String,
    /// Name the column is selected as; unique across joined tables.
    pub alias: String,
    pub data_type: DataType,
    pub primary_key: bool,
    pub unique: bool,
    pub not_null: bool,
    pub default: Option<Value>,
    /// Static value of a scope key, used as a filter when a read omits it.
    pub scope: Option<Value>,
    pub(crate) declared_alias: bool,
}

impl ColumnMeta {
    pub fn is_scope_key(&self) -> bool {
        self.scope.is_some()
    }

    /// Primary and scope keys are the only properties that filter reads.
    pub fn is_filter_key(&self) -> bool {
        self.primary_key || self.is_scope_key()
    }
}

/// Metadata of a navigation property.
#[derive(Debug, Clone)]
pub struct RelationMeta {
    pub entity: EntityClass,
    pub property_name: String,
    pub kind: RelationKind,
    pub related: EntityFactory,
    /// Property on the related class pointing back at this one.
    pub inverse_side: Option<String>,
    /// Foreign key column held by this side's table.
    pub join_column: Option<String>,
}

impl RelationMeta {
    pub fn related_entity(&self) -> EntityClass {
        (self.related)()
    }
}

/// Borrowed view over one declared property.
///
/// A property name may carry both variants, e.g. a foreign key scalar and its
/// navigation property.
#[derive(Debug, Clone, Copy)]
pub enum PropertyMeta<'r> {
    Column(&'r ColumnMeta),
    Relation(&'r RelationMeta),
}

impl<'r> PropertyMeta<'r> {
    pub fn property_name(&self) -> &'r str {
        match self {
            PropertyMeta::Column(column) => &column.property_name,
            PropertyMeta::Relation(relation) => &relation.property_name,
        }
    }

    pub fn entity(&self) -> EntityClass {
        match self {
            PropertyMeta::Column(column) => column.entity,
            PropertyMeta::Relation(relation) => relation.entity,
        }
    }

    pub fn as_column(&self) -> Option<&'r ColumnMeta> {
        match self {
            PropertyMeta::Column(column) => Some(column),
            PropertyMeta::Relation(_) => None,
        }
    }

    pub fn as_relation(&self) -> Option<&'r RelationMeta> {
        match self {
            PropertyMeta::Relation(relation) => Some(relation),
            PropertyMeta::Column(_) => None,
        }
    }
}

pub(crate) fn default_alias(table: &str, column: &str) -> String {
    format!("{}.{}", table, column)
}
