/*!
The correlated subquery composition strategy.

Used whenever the joined strategy is not eligible, notably when the
primary key and the reference id column differ in storage type and the
comparison needs an explicit cast. Correct in all cases at the price of
one correlated scalar subquery per row when annotating.
*/

use crate::aggregate::Aggregation;
use crate::cast::reference_expression;
use crate::conditional::Condition;
use crate::dialect::DBImpl;
use crate::error::Error;
use crate::rows::{Annotation, RowSet};
use crate::schema::{EntityType, GenericReference};
use crate::stmt::SqlBuilder;
use crate::value::Value;

/**
The correlated scalar subquery computing the aggregate for one outer
primary row, without the wrapping parentheses.

When the linked set carries a filter it is rendered as a nested
inclusion subquery over the linked primary keys; otherwise that clause
is omitted entirely for a cheaper, equivalent plan.
*/
pub(crate) fn annotation_query(
    dialect: DBImpl,
    tag: i64,
    primary: &EntityType,
    linked_rows: &RowSet,
    aggregation: &Aggregation,
    reference: &GenericReference,
) -> Result<SqlBuilder, Error> {
    let linked = linked_rows.entity();

    let mut builder = SqlBuilder::new(dialect);
    builder.push("SELECT ");
    builder.push(aggregation.function.sql_name());
    builder.push("(");
    builder.push_column(&linked.table, &aggregation.column);
    builder.push(") FROM ");
    builder.push_ident(&linked.table);
    builder.push(" WHERE ");
    builder.push_column(&linked.table, &reference.tag_column);
    builder.push(" = ");
    builder.push_param(Value::I64(tag));
    builder.push(" AND ");
    builder.push(&reference_expression(dialect, primary, linked, reference)?);
    builder.push(" = ");
    builder.push_column(&primary.table, &primary.primary_key.name);

    if linked_rows.is_filtered() {
        builder.push(" AND ");
        builder.push_column(&linked.table, &linked.primary_key.name);
        builder.push(" IN (");
        builder.append(linked_rows.pk_subquery(dialect));
        builder.push(")");
    }

    Ok(builder)
}

/**
Attach the aggregate as a computed column to every primary row.

Rows without any matching linked row stay in the set; the aggregate's
own empty group behavior supplies their value. No ordering is imposed.
*/
pub(crate) fn annotate(
    dialect: DBImpl,
    tag: i64,
    primary_rows: RowSet,
    linked_rows: &RowSet,
    aggregation: &Aggregation,
    reference: &GenericReference,
    alias: &str,
) -> Result<RowSet, Error> {
    let query = annotation_query(
        dialect,
        tag,
        primary_rows.entity(),
        linked_rows,
        aggregation,
        reference,
    )?;

    Ok(primary_rows.set_annotation(Annotation::Subquery {
        alias: alias.to_string(),
        query,
    }))
}

/**
The statement computing one scalar aggregate over all linked rows
pointing into the primary set.
*/
pub(crate) fn aggregate_query(
    dialect: DBImpl,
    tag: i64,
    primary_rows: &RowSet,
    linked_rows: &RowSet,
    aggregation: &Aggregation,
    reference: &GenericReference,
) -> Result<SqlBuilder, Error> {
    let primary = primary_rows.entity();
    let linked = linked_rows.entity();

    let mut builder = SqlBuilder::new(dialect);
    builder.push("SELECT ");
    builder.push(aggregation.function.sql_name());
    builder.push("(");
    builder.push_column(&linked.table, &aggregation.column);
    builder.push(") FROM ");
    builder.push_ident(&linked.table);
    builder.push(" WHERE ");
    builder.push_column(&linked.table, &reference.tag_column);
    builder.push(" = ");
    builder.push_param(Value::I64(tag));
    builder.push(" AND ");
    builder.push(&reference_expression(dialect, primary, linked, reference)?);
    builder.push(" IN (");
    builder.append(primary_rows.pk_subquery(dialect));
    builder.push(")");

    if linked_rows.is_filtered() {
        builder.push(" AND ");
        builder.push_column(&linked.table, &linked.primary_key.name);
        builder.push(" IN (");
        builder.append(linked_rows.pk_subquery(dialect));
        builder.push(")");
    }

    Ok(builder)
}

/**
Restrict the linked rows to those whose reference resolves to a row of
the filter set: tag equality plus membership of the reference id, cast
as needed, in the filter set's primary key projection.
*/
pub(crate) fn filter(
    dialect: DBImpl,
    tag: i64,
    linked_rows: RowSet,
    filter_rows: &RowSet,
    reference: &GenericReference,
) -> Result<RowSet, Error> {
    let linked = linked_rows.entity().clone();
    let filter_entity = filter_rows.entity();

    let mut membership = SqlBuilder::new(dialect);
    membership.push(&reference_expression(
        dialect,
        filter_entity,
        &linked,
        reference,
    )?);
    membership.push(" IN (");
    membership.append(filter_rows.pk_subquery(dialect));
    membership.push(")");

    Ok(linked_rows
        .filter(Condition::equals(&reference.tag_column, tag))
        .filter(Condition::Raw(membership)))
}
