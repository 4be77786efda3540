/*!
The aggregation operations tying everything together.

Each operation resolves the type tag of the entity being pointed at,
checks whether the joined composition strategy applies and otherwise
falls back to the correlated subquery strategy. Callers never pick a
strategy themselves.
*/

use crate::aggregate::{AggregateValue, Aggregation};
use crate::correlated;
use crate::database::Database;
use crate::error::Error;
use crate::joined::{self, FastPath};
use crate::rows::{Ordering, RowSet};
use crate::schema::{locate_reference, GenericReference};
use crate::stmt::SqlBuilder;
use crate::tag::TagRegistry;

/// Alias the aggregate is exposed under unless the caller picks one.
const DEFAULT_ALIAS: &str = "score";

/// Execute an aggregate statement and decode the scalar, falling back
/// to the function's natural empty value if no row comes back at all.
async fn fetch_scalar(
    db: &Database,
    builder: SqlBuilder,
    aggregation: &Aggregation,
) -> Result<AggregateValue, Error> {
    let (query_string, bind_params) = builder.finish();
    let rows = db.raw_sql(&query_string, Some(&bind_params), None).await?;
    match rows.first() {
        Some(row) => AggregateValue::decode(row),
        None => Ok(aggregation.function.empty_value()),
    }
}

fn resolve_reference(
    linked: &RowSet,
    reference: Option<&GenericReference>,
) -> Result<GenericReference, Error> {
    match reference {
        Some(reference) => Ok(reference.clone()),
        None => locate_reference(linked.entity()).map(Clone::clone),
    }
}

/**
Annotate every primary row with an aggregate over the linked rows
pointing at it.

Rows without any matching linked row stay in the result, carrying the
aggregate's empty group value. The returned set is lazy and unordered;
order it through [RowSet::order_by] or use [generic_annotate_ordered].

**Parameter**:
- `db`: Reference to the database.
- `tags`: Registry resolving the primary entity's type tag.
- `primary_rows`: Rows to annotate.
- `linked_rows`: Rows carrying the reference, optionally filtered.
- `aggregation`: Function and column to aggregate, optionally routed
  through a declared reverse relation.
- `reference`: The reference to follow. May be omitted when the linked
  entity declares exactly one.
- `alias`: Name the aggregate is exposed under, `"score"` if omitted.
*/
pub async fn generic_annotate(
    db: &Database,
    tags: &TagRegistry,
    primary_rows: impl Into<RowSet>,
    linked_rows: impl Into<RowSet>,
    aggregation: &Aggregation,
    reference: Option<&GenericReference>,
    alias: Option<&str>,
) -> Result<RowSet, Error> {
    let primary_rows = primary_rows.into();
    let linked_rows = linked_rows.into();
    let dialect = db.get_sql_dialect();
    let reference = resolve_reference(&linked_rows, reference)?;
    let alias = alias.unwrap_or(DEFAULT_ALIAS);
    let tag = tags.tag_for(db, primary_rows.entity()).await?;

    let relation = match joined::fast_path(
        dialect,
        primary_rows.entity(),
        linked_rows.entity(),
        aggregation,
        &reference,
    )? {
        FastPath::Eligible(relation) => Some(relation.clone()),
        FastPath::NotEligible => None,
    };

    match relation {
        Some(relation) => Ok(joined::annotate(
            dialect,
            tag,
            primary_rows,
            &linked_rows,
            aggregation,
            &reference,
            &relation,
            alias,
        )),
        None => correlated::annotate(
            dialect,
            tag,
            primary_rows,
            &linked_rows,
            aggregation,
            &reference,
            alias,
        ),
    }
}

/**
[generic_annotate], ordered by the aggregate.

Orders descending unless `ascending` is set, matching the common
"highest score first" use.
*/
pub async fn generic_annotate_ordered(
    db: &Database,
    tags: &TagRegistry,
    primary_rows: impl Into<RowSet>,
    linked_rows: impl Into<RowSet>,
    aggregation: &Aggregation,
    reference: Option<&GenericReference>,
    alias: Option<&str>,
    ascending: bool,
) -> Result<RowSet, Error> {
    let alias = alias.unwrap_or(DEFAULT_ALIAS);
    let rows = generic_annotate(
        db,
        tags,
        primary_rows,
        linked_rows,
        aggregation,
        reference,
        Some(alias),
    )
    .await?;
    let ordering = if ascending {
        Ordering::Asc
    } else {
        Ordering::Desc
    };
    Ok(rows.order_by(alias, ordering))
}

/**
Compute one scalar aggregate over all linked rows pointing into the
primary set.

**Returns** the aggregate value, or the function's natural empty value
when no linked row matches at all.
*/
pub async fn generic_aggregate(
    db: &Database,
    tags: &TagRegistry,
    primary_rows: impl Into<RowSet>,
    linked_rows: impl Into<RowSet>,
    aggregation: &Aggregation,
    reference: Option<&GenericReference>,
) -> Result<AggregateValue, Error> {
    let primary_rows = primary_rows.into();
    let linked_rows = linked_rows.into();
    let dialect = db.get_sql_dialect();
    let reference = resolve_reference(&linked_rows, reference)?;
    let tag = tags.tag_for(db, primary_rows.entity()).await?;

    let builder = match joined::fast_path(
        dialect,
        primary_rows.entity(),
        linked_rows.entity(),
        aggregation,
        &reference,
    )? {
        FastPath::Eligible(relation) => {
            let relation = relation.clone();
            joined::aggregate_query(
                dialect,
                tag,
                &primary_rows,
                &linked_rows,
                aggregation,
                &reference,
                &relation,
            )
        }
        FastPath::NotEligible => correlated::aggregate_query(
            dialect,
            tag,
            &primary_rows,
            &linked_rows,
            aggregation,
            &reference,
        )?,
    };

    fetch_scalar(db, builder, aggregation).await
}

/**
Restrict the linked rows to those pointing at a row of the filter set.

The result is a plain lazy set of the linked entity; applying the same
filter twice narrows nothing further but stays correct.
*/
pub async fn generic_filter(
    db: &Database,
    tags: &TagRegistry,
    linked_rows: impl Into<RowSet>,
    filter_rows: impl Into<RowSet>,
    reference: Option<&GenericReference>,
) -> Result<RowSet, Error> {
    let linked_rows = linked_rows.into();
    let filter_rows = filter_rows.into();
    let reference = resolve_reference(&linked_rows, reference)?;
    let tag = tags.tag_for(db, filter_rows.entity()).await?;

    correlated::filter(
        db.get_sql_dialect(),
        tag,
        linked_rows,
        &filter_rows,
        &reference,
    )
}
