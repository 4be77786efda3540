/*!
Decides whether the primary key of a target entity and the reference id
column of a linking entity share a storage type, and produces the cast
expression unifying them when they do not.
*/

use crate::dialect::DBImpl;
use crate::error::Error;
use crate::schema::{EntityType, GenericReference};

/// Type spellings that collapse into the canonical integer category.
const INTEGER_TYPES: [&str; 6] = ["serial", "int", "integer", "unsigned", "bigint", "smallint"];

/**
Map a backend reported type spelling to its canonical category.

The first whitespace separated token is matched, lowercased, against the
known integer family. Unrecognized spellings pass through unchanged and
form their own category, so two unknown but textually different types are
always judged incompatible.
*/
pub fn canonical_type(raw_type: &str) -> String {
    let first = raw_type.split_whitespace().next().unwrap_or(raw_type);
    if INTEGER_TYPES.contains(&first.to_lowercase().as_str()) {
        "integer".to_string()
    } else {
        raw_type.to_string()
    }
}

/**
Whether two backend reported type spellings are storage compatible.
*/
pub fn fields_compatible(primary_key_type: &str, reference_type: &str) -> bool {
    canonical_type(primary_key_type) == canonical_type(reference_type)
}

/**
The type to cast a reference id column to so it compares against the
given primary key.

The general rule is the primary key's canonical type. MySQL is a policy
exception: it stores auto increment primary keys unsigned, and a CAST to
plain integer there is signed and can silently truncate values outside
signed range, so the cast target must be the unsigned spelling whenever
the primary key's canonical type is integer.
*/
pub(crate) fn cast_target(dialect: DBImpl, primary_key_type: &str) -> String {
    let canonical = canonical_type(primary_key_type);
    if dialect == DBImpl::MySQL && canonical == "integer" {
        "UNSIGNED".to_string()
    } else {
        canonical
    }
}

/**
The expression comparing the reference id column of `linked` against the
primary key of `primary`.

**Returns** the quoted, table qualified column verbatim when the storage
types match, and a CAST wrapping it otherwise. Never fails on type
grounds; unknown types are handled by the canonicalization pass through
rule.
*/
pub(crate) fn reference_expression(
    dialect: DBImpl,
    primary: &EntityType,
    linked: &EntityType,
    reference: &GenericReference,
) -> Result<String, Error> {
    let primary_key_type = primary.primary_key.db_type.raw_type(dialect);
    let reference_type = linked.column_raw_type(&reference.id_column, dialect)?;

    let column = format!(
        "{}.{}",
        dialect.quote_name(&linked.table),
        dialect.quote_name(&reference.id_column)
    );

    if fields_compatible(primary_key_type, reference_type) {
        Ok(column)
    } else {
        Ok(format!(
            "CAST({} AS {})",
            column,
            cast_target(dialect, primary_key_type)
        ))
    }
}
