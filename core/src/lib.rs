//! Core of the tessel ORM
//!
//! Metadata registry, entity relation graph, relation resolver, SQL builders
//! for reads and writes, row-to-instance reconstruction and the [`Store`] seam
//! that database drivers implement.

#[allow(unused_imports)]
pub(crate) mod prelude {
    pub use std::{
        borrow::Cow,
        boxed::Box,
        format,
        string::{String, ToString},
        vec,
        vec::Vec,
    };
}

pub mod dialect;
pub mod entity;
pub mod error;
pub mod factory;
pub mod graph;
pub mod meta;
pub mod options;
pub mod orm;
pub mod query;
pub mod relations;
pub mod resolver;
pub mod sql;
pub mod store;
mod trace;

// Re-export key types and traits
pub use dialect::Dialect;
pub use entity::Entity;
pub use error::{Result, TesselError};
pub use graph::{EntityRelationGraph, GraphNode, NodeId};
pub use meta::{
    ClassMeta, Column, ColumnMeta, DataType, EntityBuilder, EntityClass, MetadataRegistry,
    PropertyMeta, RelationKind, RelationMeta,
};
pub use options::OrmOptions;
pub use orm::Orm;
pub use relations::{Include, Relations};
pub use resolver::{JoinSide, ResolvedQueryRelation, resolve_query_relations};
pub use sql::{SQL, SQLChunk, Token};
pub use store::{BatchIds, Row, StatementOutcome, Store, WriteResult};
