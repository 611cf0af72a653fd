//! SQL dialects and their placeholder syntax.

/// Database dialect a [`Store`](crate::store::Store) speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    #[default]
    SQLite,
    PostgreSQL,
    MySQL,
}

/// Writes a placeholder straight into `buf` without an intermediate allocation.
pub(crate) fn write_placeholder(dialect: Dialect, index: usize, buf: &mut impl core::fmt::Write) {
    match dialect {
        Dialect::PostgreSQL => {
            let _ = write!(buf, "${}", index);
        }
        Dialect::SQLite | Dialect::MySQL => {
            let _ = buf.write_char('?');
        }
    }
}
