//! # Tessel
//!
//! A metadata-driven ORM: entity classes, columns and relations are registered
//! once, then value trees are written and read back through SQL built from the
//! relation graph between them.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use tessel::sqlite::{SqliteStore, create_tables};
//! use tessel::{Column, DataType, EntityClass, MetadataRegistry, Orm, Relations};
//!
//! const AUTHOR: EntityClass = EntityClass::new("Author");
//! const BOOK: EntityClass = EntityClass::new("Book");
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tessel::Result<()> {
//! let mut registry = MetadataRegistry::new();
//! registry
//!     .entity(AUTHOR, "author")
//!     .column("id", Column::new("id", DataType::Integer).primary_key())
//!     .column("name", Column::new("name", DataType::Text))
//!     .one_to_many("books", || BOOK, "author")
//!     .finish()?;
//! registry
//!     .entity(BOOK, "book")
//!     .column("id", Column::new("id", DataType::Integer).primary_key())
//!     .column("title", Column::new("title", DataType::Text))
//!     .many_to_one("author", || AUTHOR, "books", "author_id")
//!     .finish()?;
//!
//! let store = SqliteStore::open_in_memory()?;
//! create_tables(store.connection(), &registry)?;
//! let orm = Orm::new(&registry, store);
//!
//! let author = orm
//!     .insert(AUTHOR, &json!({"name": "Le Guin", "books": [{"title": "The Dispossessed"}]}))
//!     .await?;
//! let loaded = orm
//!     .retrieve(AUTHOR, &author["id"], &Relations::new().with("books"))
//!     .await?;
//! assert_eq!(loaded["books"][0]["title"], json!("The Dispossessed"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Database Support
//!
//! | Database | Driver   | Feature Flag | Status |
//! |----------|----------|--------------|--------|
//! | SQLite   | rusqlite | `rusqlite`   | ✅     |
//!
//! Other databases plug in through the [`Store`] trait.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;

// =============================================================================
// Root-level exports
// =============================================================================

/// Result type for tessel operations
pub use tessel_core::error::Result;

/// Error types
pub mod error {
    pub use tessel_core::error::TesselError;
}

pub use tessel_core::{
    Column, DataType, Dialect, Entity, EntityClass, Include, MetadataRegistry, Orm, OrmOptions,
    Relations, Store, TesselError,
};

pub use config::TesselConfig;

// =============================================================================
// Core module - shared functionality
// =============================================================================

/// Building blocks below [`Orm`]: metadata, graphs, relation resolution, SQL
/// rendering and row reconstruction.
///
/// ```rust,ignore
/// use tessel::core::query::build_read;
///
/// let query = build_read(&registry, AUTHOR, &json!(1), &Relations::new().with("books"))?;
/// println!("{}", query.sql.sql());
/// ```
pub mod core {
    // ==========================================================================
    // Metadata
    // ==========================================================================

    pub use tessel_core::meta::{
        ClassMeta, ColumnMeta, EntityBuilder, EntityFactory, PropertyMeta, RelationKind,
        RelationMeta,
    };

    // ==========================================================================
    // Graphs and relations
    // ==========================================================================

    pub use tessel_core::graph::{EntityRelationGraph, GraphNode, NodeId};
    pub use tessel_core::resolver::{JoinSide, ResolvedQueryRelation, resolve_query_relations};

    // ==========================================================================
    // SQL
    // ==========================================================================

    pub use tessel_core::{SQL, SQLChunk, Token};

    /// Read, insert, update and remove planning.
    pub use tessel_core::query;

    // ==========================================================================
    // Rows and stores
    // ==========================================================================

    pub use tessel_core::factory::EntityInstanceFactory;
    pub use tessel_core::store::{BatchIds, Row, StatementOutcome, WriteResult};
}

// =============================================================================
// SQLite module
// =============================================================================

/// SQLite store, value conversions and table creation.
#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub mod sqlite {
    pub use crate::config::SqliteOptions;
    pub use tessel_sqlite::{SQLiteTransactionType, SQLiteValue, create_table_sql};

    #[cfg(feature = "rusqlite")]
    #[cfg_attr(docsrs, doc(cfg(feature = "rusqlite")))]
    pub use tessel_sqlite::{SqliteStore, create_tables};

    pub use tessel_sqlite::{connection, schema, values};
}
