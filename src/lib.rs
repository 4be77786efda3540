/*!
Aggregation over generic references.

A generic reference is a pair of columns, a type tag and a row id, that
lets one table point at rows of arbitrary other tables. This crate
computes aggregates (count, sum, average) across such references:
annotating every pointed-at row with an aggregate over the rows pointing
at it, collapsing them to a single scalar, or filtering the pointing
rows down to those targeting a given set.

Operations compose lazily on [RowSet]s and pick between two execution
strategies on their own: a physically joined query when the schema
declares a matching reverse relation and the column types line up, and a
correlated subquery with an explicit CAST otherwise. SQLite, MySQL and
Postgres are supported through one connection API.
*/
#![warn(missing_docs)]

pub mod aggregate;
mod cast;
pub mod conditional;
mod correlated;
pub mod database;
pub mod dialect;
pub mod error;
mod joined;
mod ops;
pub mod row;
pub mod rows;
pub mod schema;
mod stmt;
pub mod tag;
pub mod transaction;
mod utils;
pub mod value;

pub use crate::aggregate::{AggregateValue, Aggregation, SelectAggregator};
pub use crate::conditional::{BinaryOperator, Condition};
pub use crate::database::{Database, DatabaseConfiguration, DatabaseDriver};
pub use crate::dialect::DBImpl;
pub use crate::error::Error;
pub use crate::ops::{
    generic_aggregate, generic_annotate, generic_annotate_ordered, generic_filter,
};
pub use crate::row::Row;
pub use crate::rows::{Ordering, RowSet};
pub use crate::schema::{
    locate_reference, ColumnDef, DbType, Entity, EntityType, GenericReference, ReverseRelation,
};
pub use crate::tag::TagRegistry;
pub use crate::transaction::Transaction;
pub use crate::value::Value;
