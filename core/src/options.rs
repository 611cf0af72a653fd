//! Runtime behaviour of an [`Orm`](crate::orm::Orm) session.

use serde::Deserialize;

/// Options controlling how writes are issued.
///
/// ```
/// use tessel_core::OrmOptions;
///
/// let options = OrmOptions::default().batch_inserts(false);
/// assert!(!options.batch_inserts);
/// assert!(options.transactional_writes);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrmOptions {
    /// Group same-table rows of a tier into multi-row inserts when the store
    /// reports contiguous identifiers.
    pub batch_inserts: bool,
    /// Wrap every insert, update and remove in one transaction.
    pub transactional_writes: bool,
}

impl Default for OrmOptions {
    fn default() -> Self {
        Self {
            batch_inserts: true,
            transactional_writes: true,
        }
    }
}

impl OrmOptions {
    pub fn batch_inserts(mut self, enabled: bool) -> Self {
        self.batch_inserts = enabled;
        self
    }

    pub fn transactional_writes(mut self, enabled: bool) -> Self {
        self.transactional_writes = enabled;
        self
    }
}
