use thiserror::Error;

use crate::meta::{EntityClass, RelationKind};

#[derive(Debug, Error)]
pub enum TesselError {
    /// Error executing a statement against the store
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// No rows returned when at least one was expected
    #[error("No rows found")]
    NotFound,

    /// Error with transaction
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Error mapping data between rows, values and typed entities
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Error in statement
    #[error("Statement error: {0}")]
    Statement(String),

    /// Error in query
    #[error("Query error: {0}")]
    Query(String),

    /// Error converting parameters
    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    /// Entity class was never registered
    #[error("entity `{0}` is not registered")]
    UnknownEntity(EntityClass),

    /// Entity declares no primary key column
    #[error("entity `{0}` declares no primary key")]
    NoPrimaryKey(EntityClass),

    /// Requested relation is not declared on the entity
    #[error("entity `{entity}` has no relation `{property}`")]
    UnknownRelation {
        entity: EntityClass,
        property: String,
    },

    /// Relation type cannot be used by the requested operation
    #[error("{kind} relation `{entity}.{property}` is not supported for {operation}")]
    UnsupportedRelation {
        entity: EntityClass,
        property: String,
        kind: RelationKind,
        operation: &'static str,
    },

    /// Metadata needed to resolve a relation or property is missing
    #[error("cannot resolve `{entity}.{property}`: {reason}")]
    MetadataResolution {
        entity: EntityClass,
        property: String,
        reason: String,
    },

    /// Two registrations disagree about the same property
    #[error("conflicting metadata for `{entity}.{property}`: {reason}")]
    ConflictingMetadata {
        entity: EntityClass,
        property: String,
        reason: String,
    },

    /// Relation inclusion requests contradict each other
    #[error("relation conflict: {0}")]
    RelationConflict(String),

    /// Value tree or inclusion shape does not match the declared metadata
    #[error("data shape error: {0}")]
    DataShape(String),

    /// A node of the value tree lacks its primary key where one is required
    #[error("`{0}` value is missing its primary key")]
    MissingIdentifier(EntityClass),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("Database error: {0}")]
    Other(String),

    /// Rusqlite specific errors
    #[cfg(feature = "rusqlite")]
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

/// Result type for ORM operations
pub type Result<T> = std::result::Result<T, TesselError>;
