use serde_json::Value;

use crate::prelude::*;
use crate::sql::tokens::Token;

/// A SQL chunk represents a part of an SQL statement.
///
/// - `Token` - SQL keywords and operators (SELECT, FROM, =, etc.)
/// - `Ident` - Quoted identifiers ("table_name", "column_name")
/// - `Raw` - Unquoted raw SQL text
/// - `Param` - Bound parameter value
/// - `Column` - Fully qualified column reference
#[derive(Debug, Clone, PartialEq)]
pub enum SQLChunk<'a> {
    /// SQL keywords and operators: SELECT, FROM, WHERE, =, AND, etc.
    Token(Token),

    /// Quoted identifier, renders as `"name"`
    Ident(Cow<'a, str>),

    /// Raw SQL text, rendered as-is
    Raw(Cow<'a, str>),

    /// Parameter value, rendered as the dialect's placeholder
    Param(Cow<'a, Value>),

    /// Column reference, renders as `"table"."column"`
    Column {
        table: Cow<'a, str>,
        column: Cow<'a, str>,
    },
}

impl<'a> SQLChunk<'a> {
    /// Creates a token chunk - const
    #[inline]
    pub const fn token(t: Token) -> Self {
        Self::Token(t)
    }

    /// Creates a qualified column reference
    #[inline]
    pub fn column(table: impl Into<Cow<'a, str>>, column: impl Into<Cow<'a, str>>) -> Self {
        Self::Column {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Write chunk content to buffer. Parameters are written by the caller,
    /// which owns the placeholder numbering.
    pub(crate) fn write(&self, buf: &mut impl core::fmt::Write) {
        match self {
            SQLChunk::Token(token) => {
                let _ = buf.write_str(token.as_str());
            }
            SQLChunk::Ident(name) => write_quoted(buf, name),
            SQLChunk::Raw(text) => {
                let _ = buf.write_str(text);
            }
            SQLChunk::Param(_) => {
                let _ = buf.write_char('?');
            }
            SQLChunk::Column { table, column } => {
                write_quoted(buf, table);
                let _ = buf.write_char('.');
                write_quoted(buf, column);
            }
        }
    }

    /// Check if this chunk is "word-like" (needs space separation from other word-like chunks)
    #[inline]
    pub(crate) const fn is_word_like(&self) -> bool {
        match self {
            SQLChunk::Token(t) => !matches!(
                t,
                Token::LPAREN | Token::RPAREN | Token::COMMA | Token::EQ
            ),
            SQLChunk::Ident(_) | SQLChunk::Raw(_) | SQLChunk::Param(_) | SQLChunk::Column { .. } => {
                true
            }
        }
    }
}

/// Writes `"name"`, doubling embedded quotes.
fn write_quoted(buf: &mut impl core::fmt::Write, name: &str) {
    let _ = buf.write_char('"');
    if name.contains('"') {
        let _ = buf.write_str(&name.replace('"', "\"\""));
    } else {
        let _ = buf.write_str(name);
    }
    let _ = buf.write_char('"');
}

// ==================== From implementations ====================

impl<'a> From<Token> for SQLChunk<'a> {
    #[inline]
    fn from(value: Token) -> Self {
        Self::Token(value)
    }
}

impl<'a> From<Value> for SQLChunk<'a> {
    #[inline]
    fn from(value: Value) -> Self {
        Self::Param(Cow::Owned(value))
    }
}
