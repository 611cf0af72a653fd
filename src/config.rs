//! Runtime configuration loaded from TOML.
//!
//! ```toml
//! [orm]
//! batch_inserts = true
//! transactional_writes = true
//!
//! [sqlite]
//! transaction_type = "immediate"
//! assume_contiguous_ids = false
//! ```

use std::path::Path;

use serde::Deserialize;
use tessel_core::{OrmOptions, Result, TesselError};

#[cfg(feature = "sqlite")]
pub use sqlite_options::SqliteOptions;

/// Main configuration struct for `tessel.toml`
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TesselConfig {
    /// Options applied to every [`Orm`](crate::Orm) session
    pub orm: OrmOptions,
    /// SQLite store settings
    #[cfg(feature = "sqlite")]
    pub sqlite: SqliteOptions,
}

impl TesselConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TesselError::Config(format!("reading {}: {}", path.display(), e)))?;
        from_toml_str(&contents)
    }
}

/// Parse configuration from a TOML string. Missing tables and keys keep their defaults.
pub fn from_toml_str(s: &str) -> Result<TesselConfig> {
    tessel_core::tessel_profile_scope!("config", "parse");
    toml::from_str(s).map_err(|e| {
        tessel_core::tessel_warn!(error = %e, "rejecting configuration");
        TesselError::Config(e.to_string())
    })
}

#[cfg(feature = "sqlite")]
mod sqlite_options {
    use serde::Deserialize;
    use tessel_sqlite::SQLiteTransactionType;

    #[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
    #[serde(default, deny_unknown_fields)]
    pub struct SqliteOptions {
        pub transaction_type: SQLiteTransactionType,
        /// See [`SqliteStore::assume_contiguous_ids`](tessel_sqlite::SqliteStore::assume_contiguous_ids).
        pub assume_contiguous_ids: bool,
    }

    #[cfg(feature = "rusqlite")]
    impl SqliteOptions {
        /// Wraps `conn` in a store using these settings.
        pub fn open(&self, conn: rusqlite::Connection) -> tessel_sqlite::SqliteStore {
            tessel_sqlite::SqliteStore::new(conn)
                .with_transaction_type(self.transaction_type)
                .assume_contiguous_ids(self.assume_contiguous_ids)
        }
    }
}
