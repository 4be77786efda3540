/*!
The joined composition strategy.

When the aggregation names a declared reverse relation matching the
linked rows and the column types line up, the whole operation can be
expressed as one physically joined query: a LEFT JOIN with a grouped
aggregate for annotation, an inner join for the scalar aggregate. This
yields a single query plan with proper GROUP BY semantics; rows without
any match still appear, carrying the aggregate's empty group value.
*/

use crate::aggregate::Aggregation;
use crate::cast::fields_compatible;
use crate::dialect::DBImpl;
use crate::error::Error;
use crate::rows::{Annotation, RowSet};
use crate::schema::{EntityType, GenericReference, ReverseRelation};
use crate::stmt::SqlBuilder;
use crate::value::Value;

/**
Outcome of the eligibility check.

Ineligibility is an expected, frequent outcome selecting the correlated
strategy, not an error.
*/
pub(crate) enum FastPath<'a> {
    /// The operation can be composed through this declared relation.
    Eligible(&'a ReverseRelation),
    /// Fall back to the correlated subquery strategy.
    NotEligible,
}

/**
Check whether the operation can be composed as a joined query.

Eligible when the aggregation names a reverse relation declared on the
primary entity, that relation targets the linked entity and the primary
key and reference id columns share a canonical type.

**Fails** with [Error::RelationMismatch] when the named relation exists
but targets a different entity than the supplied linked rows.
*/
pub(crate) fn fast_path<'a>(
    dialect: DBImpl,
    primary: &'a EntityType,
    linked: &EntityType,
    aggregation: &Aggregation,
    reference: &GenericReference,
) -> Result<FastPath<'a>, Error> {
    let Some(relation_name) = &aggregation.relation else {
        return Ok(FastPath::NotEligible);
    };
    let Some(relation) = primary.get_relation(relation_name) else {
        return Ok(FastPath::NotEligible);
    };

    if relation.target != linked.name {
        return Err(Error::RelationMismatch {
            relation: relation.name.clone(),
            entity: primary.name.clone(),
            target: relation.target.clone(),
            linked: linked.name.clone(),
        });
    }

    let primary_key_type = primary.primary_key.db_type.raw_type(dialect);
    let reference_type = linked.column_raw_type(&reference.id_column, dialect)?;
    if !fields_compatible(primary_key_type, reference_type) {
        return Ok(FastPath::NotEligible);
    }

    Ok(FastPath::Eligible(relation))
}

/// The ON clause joining the linked table, aliased to the relation name,
/// against the primary table.
fn join_condition(
    dialect: DBImpl,
    tag: i64,
    primary: &EntityType,
    linked_rows: &RowSet,
    reference: &GenericReference,
    relation: &ReverseRelation,
) -> SqlBuilder {
    let linked = linked_rows.entity();
    let mut on = SqlBuilder::new(dialect);

    on.push_column(&relation.name, &reference.tag_column);
    on.push(" = ");
    on.push_param(Value::I64(tag));
    on.push(" AND ");
    on.push_column(&relation.name, &reference.id_column);
    on.push(" = ");
    on.push_column(&primary.table, &primary.primary_key.name);

    if linked_rows.is_filtered() {
        on.push(" AND ");
        on.push_column(&relation.name, &linked.primary_key.name);
        on.push(" IN (");
        on.append(linked_rows.pk_subquery(dialect));
        on.push(")");
    }

    on
}

/**
Annotate every primary row with the aggregate over its linked rows.

The LEFT JOIN keeps rows without any linked match; the grouped aggregate
then produces its natural empty group value for them.
*/
pub(crate) fn annotate(
    dialect: DBImpl,
    tag: i64,
    primary_rows: RowSet,
    linked_rows: &RowSet,
    aggregation: &Aggregation,
    reference: &GenericReference,
    relation: &ReverseRelation,
    alias: &str,
) -> RowSet {
    let linked = linked_rows.entity().clone();
    let on = join_condition(
        dialect,
        tag,
        primary_rows.entity(),
        linked_rows,
        reference,
        relation,
    );

    primary_rows.set_annotation(Annotation::Joined {
        alias: alias.to_string(),
        table: linked.table.clone(),
        join_alias: relation.name.clone(),
        on,
        function: aggregation.function,
        column: aggregation.column.clone(),
    })
}

/**
The single scalar aggregate over the linked rows of all primary rows,
as one inner joined statement.
*/
pub(crate) fn aggregate_query(
    dialect: DBImpl,
    tag: i64,
    primary_rows: &RowSet,
    linked_rows: &RowSet,
    aggregation: &Aggregation,
    reference: &GenericReference,
    relation: &ReverseRelation,
) -> SqlBuilder {
    let primary = primary_rows.entity();
    let on = join_condition(dialect, tag, primary, linked_rows, reference, relation);

    let mut builder = SqlBuilder::new(dialect);
    builder.push("SELECT ");
    builder.push(aggregation.function.sql_name());
    builder.push("(");
    builder.push_column(&relation.name, &aggregation.column);
    builder.push(") FROM ");
    builder.push_ident(&primary.table);
    builder.push(" JOIN ");
    builder.push_ident(&linked_rows.entity().table);
    builder.push(" AS ");
    builder.push_ident(&relation.name);
    builder.push(" ON ");
    builder.append(on);
    primary_rows.push_where(&mut builder);

    builder
}

#[cfg(test)]
mod tests {
    use super::{aggregate_query, annotate, fast_path, FastPath};
    use crate::aggregate::Aggregation;
    use crate::conditional::Condition;
    use crate::dialect::DBImpl;
    use crate::error::Error;
    use crate::rows::RowSet;
    use crate::schema::{locate_reference, DbType, Entity, EntityType};
    use crate::value::Value;

    fn food() -> Entity {
        EntityType::new("food", "food")
            .add_column("name", DbType::VarChar)
            .add_relation("ratings", "rating")
            .add_relation("char_gfk", "char_gfk")
            .build()
    }

    fn rating() -> Entity {
        EntityType::new("rating", "rating")
            .add_column("rating", DbType::Int32)
            .add_column("created", DbType::DateTime)
            .add_column("content_type_id", DbType::Int64)
            .add_column("object_id", DbType::Int32)
            .add_generic_reference("content_object", "content_type_id", "object_id")
            .build()
    }

    fn char_gfk() -> Entity {
        EntityType::new("char_gfk", "char_gfk")
            .add_column("name", DbType::VarChar)
            .add_column("content_type_id", DbType::Int64)
            .add_column("object_id", DbType::Text)
            .add_generic_reference("content_object", "content_type_id", "object_id")
            .build()
    }

    #[test]
    fn eligible_with_declared_relation() {
        let primary = food();
        let linked = rating();
        let reference = locate_reference(&linked).unwrap().clone();
        let aggregation = Aggregation::count("rating").via("ratings");
        assert!(matches!(
            fast_path(DBImpl::SQLite, &primary, &linked, &aggregation, &reference),
            Ok(FastPath::Eligible(_))
        ));
    }

    #[test]
    fn not_eligible_without_relation() {
        let primary = food();
        let linked = rating();
        let reference = locate_reference(&linked).unwrap().clone();
        let aggregation = Aggregation::count("rating");
        assert!(matches!(
            fast_path(DBImpl::SQLite, &primary, &linked, &aggregation, &reference),
            Ok(FastPath::NotEligible)
        ));
    }

    #[test]
    fn not_eligible_on_type_mismatch() {
        let primary = food();
        let linked = char_gfk();
        let reference = locate_reference(&linked).unwrap().clone();
        let aggregation = Aggregation::count("name").via("char_gfk");
        assert!(matches!(
            fast_path(DBImpl::SQLite, &primary, &linked, &aggregation, &reference),
            Ok(FastPath::NotEligible)
        ));
    }

    #[test]
    fn mismatched_relation_target_fails() {
        let primary = food();
        let linked = char_gfk();
        let reference = locate_reference(&linked).unwrap().clone();
        // "ratings" targets the rating entity, not char_gfk
        let aggregation = Aggregation::count("name").via("ratings");
        assert!(matches!(
            fast_path(DBImpl::SQLite, &primary, &linked, &aggregation, &reference),
            Err(Error::RelationMismatch { .. })
        ));
    }

    #[test]
    fn annotate_builds_a_grouped_left_join() {
        let primary = food();
        let linked = rating();
        let reference = locate_reference(&linked).unwrap().clone();
        let aggregation = Aggregation::count("rating").via("ratings");
        let relation = primary.get_relation("ratings").unwrap().clone();

        let rows = annotate(
            DBImpl::SQLite,
            7,
            RowSet::all(&primary),
            &RowSet::all(&linked),
            &aggregation,
            &reference,
            &relation,
            "score",
        );
        let (query, params) = rows.build(DBImpl::SQLite).unwrap();
        assert_eq!(
            query,
            "SELECT \"food\".\"id\", \"food\".\"name\", COUNT(\"ratings\".\"rating\") AS \"score\" \
             FROM \"food\" LEFT JOIN \"rating\" AS \"ratings\" ON \
             \"ratings\".\"content_type_id\" = ? AND \"ratings\".\"object_id\" = \"food\".\"id\" \
             GROUP BY \"food\".\"id\""
        );
        assert_eq!(params, vec![Value::I64(7)]);
    }

    #[test]
    fn aggregate_includes_the_linked_subset() {
        let primary = food();
        let linked = rating();
        let reference = locate_reference(&linked).unwrap().clone();
        let aggregation = Aggregation::sum("rating").via("ratings");
        let relation = primary.get_relation("ratings").unwrap().clone();

        let linked_rows = RowSet::all(&linked)
            .filter(Condition::greater_or_equals("created", "2026-01-01 00:00:00"));
        let builder = aggregate_query(
            DBImpl::SQLite,
            7,
            &RowSet::all(&primary),
            &linked_rows,
            &aggregation,
            &reference,
            &relation,
        );
        let (query, params) = builder.finish();
        assert_eq!(
            query,
            "SELECT SUM(\"ratings\".\"rating\") FROM \"food\" JOIN \"rating\" AS \"ratings\" ON \
             \"ratings\".\"content_type_id\" = ? AND \"ratings\".\"object_id\" = \"food\".\"id\" \
             AND \"ratings\".\"id\" IN (SELECT \"rating\".\"id\" FROM \"rating\" \
             WHERE \"rating\".\"created\" >= ?)"
        );
        assert_eq!(
            params,
            vec![
                Value::I64(7),
                Value::String("2026-01-01 00:00:00".to_string())
            ]
        );
    }
}
