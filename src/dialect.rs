//! The supported SQL dialects and their syntactic differences.

use std::fmt::Write;

/**
Representation of the SQL dialects statements can be generated for.
*/
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DBImpl {
    /// SQLite dialect
    SQLite,
    /// MySQL / MariaDB dialect
    MySQL,
    /// Postgres dialect
    Postgres,
}

impl DBImpl {
    /**
    Quote an identifier for use in a statement.

    Every table and column name spliced into generated SQL must pass
    through this method.
    */
    pub fn quote_name(&self, name: &str) -> String {
        match self {
            DBImpl::SQLite | DBImpl::Postgres => format!("\"{}\"", name),
            DBImpl::MySQL => format!("`{}`", name),
        }
    }

    /**
    Write the bind parameter placeholder with the given 1 based index.

    SQLite and MySQL use `?`, Postgres uses `$1`, `$2`, ...
    */
    pub(crate) fn write_placeholder(&self, s: &mut String, index: usize) {
        match self {
            DBImpl::SQLite | DBImpl::MySQL => s.push('?'),
            DBImpl::Postgres => write!(s, "${}", index).unwrap(),
        }
    }
}
