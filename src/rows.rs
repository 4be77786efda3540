/*!
Lazily evaluated row collections.

A [RowSet] is a description of rows to retrieve: a base entity plus the
filters and orderings applied to it, and at most one annotation attached
by an aggregation operation. It never touches the store until it is
fetched or counted, and re-fetching a held set reflects the store state
at fetch time.
*/

use crate::aggregate::SelectAggregator;
use crate::conditional::Condition;
use crate::database::Database;
use crate::dialect::DBImpl;
use crate::error::Error;
use crate::row::Row;
use crate::schema::Entity;
use crate::stmt::SqlBuilder;

/**
All supported orderings
 */
#[derive(Debug, Copy, Clone)]
pub enum Ordering {
    /// Ascending ordering
    Asc,
    /// Descending ordering
    Desc,
}

impl Ordering {
    fn sql(&self) -> &'static str {
        match self {
            Ordering::Asc => "ASC",
            Ordering::Desc => "DESC",
        }
    }
}

/**
Representation of an entry in a ORDER BY expression
*/
#[derive(Debug, Clone)]
pub struct OrderByEntry {
    /// Ordering to apply
    pub ordering: Ordering,
    /// Column or select alias to apply the ordering to
    pub column_name: String,
}

/// The computed column attached to an annotated row set.
#[derive(Debug, Clone)]
pub(crate) enum Annotation {
    /// A correlated scalar subquery in the select list.
    Subquery {
        /// Attribute name the aggregate is exposed under
        alias: String,
        /// The subquery, without the wrapping parentheses
        query: SqlBuilder,
    },
    /// A LEFT JOIN with a grouped aggregate over the joined rows.
    Joined {
        /// Attribute name the aggregate is exposed under
        alias: String,
        /// Table to join
        table: String,
        /// Alias the joined table is selected under
        join_alias: String,
        /// The join condition, fully rendered
        on: SqlBuilder,
        /// Aggregation function applied to the joined column
        function: SelectAggregator,
        /// Joined column the function reads
        column: String,
    },
}

impl Annotation {
    pub(crate) fn alias(&self) -> &str {
        match self {
            Annotation::Subquery { alias, .. } => alias,
            Annotation::Joined { alias, .. } => alias,
        }
    }

    /// The dialect the contained fragment was rendered for.
    pub(crate) fn dialect(&self) -> DBImpl {
        match self {
            Annotation::Subquery { query, .. } => query.dialect(),
            Annotation::Joined { on, .. } => on.dialect(),
        }
    }
}

/**
A lazily evaluated description of rows to retrieve.
*/
#[derive(Debug, Clone)]
pub struct RowSet {
    entity: Entity,
    conditions: Vec<Condition>,
    order: Vec<OrderByEntry>,
    annotation: Option<Annotation>,
}

impl RowSet {
    /**
    All rows of an entity.
    */
    pub fn all(entity: &Entity) -> Self {
        RowSet {
            entity: entity.clone(),
            conditions: vec![],
            order: vec![],
            annotation: None,
        }
    }

    /// The entity this set selects from.
    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /**
    Restrict the set by a condition.
    */
    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /**
    Append an ordering on a column or on an annotation alias.
    */
    pub fn order_by(mut self, column_name: &str, ordering: Ordering) -> Self {
        self.order.push(OrderByEntry {
            ordering,
            column_name: column_name.to_string(),
        });
        self
    }

    /**
    Whether the set carries any filter beyond "all rows of its entity".
    */
    pub fn is_filtered(&self) -> bool {
        !self.conditions.is_empty()
    }

    /// The alias of the attached annotation, if any.
    pub fn annotation_alias(&self) -> Option<&str> {
        self.annotation.as_ref().map(Annotation::alias)
    }

    pub(crate) fn set_annotation(mut self, annotation: Annotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// Append this set's WHERE clause, if any, to a statement under construction.
    pub(crate) fn push_where(&self, builder: &mut SqlBuilder) {
        for (i, condition) in self.conditions.iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            condition.build(&self.entity.table, builder);
        }
    }

    /**
    Render the set as a nested subquery projecting only its primary key.
    */
    pub(crate) fn pk_subquery(&self, dialect: DBImpl) -> SqlBuilder {
        let mut builder = SqlBuilder::new(dialect);
        builder.push("SELECT ");
        builder.push_column(&self.entity.table, &self.entity.primary_key.name);
        builder.push(" FROM ");
        builder.push_ident(&self.entity.table);
        self.push_where(&mut builder);
        builder
    }

    fn select_builder(&self, dialect: DBImpl) -> SqlBuilder {
        let table = &self.entity.table;
        let mut builder = SqlBuilder::new(dialect);

        builder.push("SELECT ");
        builder.push_column(table, &self.entity.primary_key.name);
        for column in &self.entity.columns {
            builder.push(", ");
            builder.push_column(table, &column.name);
        }

        match &self.annotation {
            None => {}
            Some(Annotation::Subquery { alias, query }) => {
                builder.push(", (");
                builder.append(query.clone());
                builder.push(") AS ");
                builder.push_ident(alias);
            }
            Some(Annotation::Joined {
                alias,
                join_alias,
                function,
                column,
                ..
            }) => {
                builder.push(", ");
                builder.push(function.sql_name());
                builder.push("(");
                builder.push_column(join_alias, column);
                builder.push(") AS ");
                builder.push_ident(alias);
            }
        }

        builder.push(" FROM ");
        builder.push_ident(table);

        if let Some(Annotation::Joined {
            table: join_table,
            join_alias,
            on,
            ..
        }) = &self.annotation
        {
            builder.push(" LEFT JOIN ");
            builder.push_ident(join_table);
            builder.push(" AS ");
            builder.push_ident(join_alias);
            builder.push(" ON ");
            builder.append(on.clone());
        }

        self.push_where(&mut builder);

        if matches!(&self.annotation, Some(Annotation::Joined { .. })) {
            builder.push(" GROUP BY ");
            builder.push_column(table, &self.entity.primary_key.name);
        }

        for (i, entry) in self.order.iter().enumerate() {
            builder.push(if i == 0 { " ORDER BY " } else { ", " });
            builder.push_ident(&entry.column_name);
            builder.push(" ");
            builder.push(entry.ordering.sql());
        }

        builder
    }

    /**
    Render the select statement this set describes.

    **Returns** the statement text and the values to bind.

    **Fails** with [Error::ConfigurationError] when the set holds
    annotation or filter fragments rendered for a different dialect.
    Such fragments carry already quoted identifiers, so mixing dialects
    would produce unparseable SQL.
    */
    pub fn build(&self, dialect: DBImpl) -> Result<(String, Vec<crate::value::Value>), Error> {
        let rendered_for = self
            .annotation
            .as_ref()
            .map(Annotation::dialect)
            .or_else(|| self.conditions.iter().find_map(Condition::fragment_dialect));
        if let Some(fragment_dialect) = rendered_for {
            if fragment_dialect != dialect {
                return Err(Error::ConfigurationError(format!(
                    "the set contains fragments rendered for {:?} and cannot be built for {:?}",
                    fragment_dialect, dialect
                )));
            }
        }
        Ok(self.select_builder(dialect).finish())
    }

    /**
    Fetch all rows of the set, reflecting the current store state.
    */
    pub async fn fetch_all(&self, db: &Database) -> Result<Vec<Row>, Error> {
        let (query_string, bind_params) = self.build(db.get_sql_dialect())?;
        db.raw_sql(&query_string, Some(&bind_params), None).await
    }

    /**
    Count the rows of the set without fetching them.

    Annotations never change cardinality, so they are left out of the
    counting statement.
    */
    pub async fn count(&self, db: &Database) -> Result<u64, Error> {
        let mut builder = SqlBuilder::new(db.get_sql_dialect());
        builder.push("SELECT COUNT(*) FROM ");
        builder.push_ident(&self.entity.table);
        self.push_where(&mut builder);

        let (query_string, bind_params) = builder.finish();
        let rows = db.raw_sql(&query_string, Some(&bind_params), None).await?;
        let row = rows
            .first()
            .ok_or_else(|| Error::ConfigurationError(String::from("count returned no rows")))?;
        Ok(row.get::<i64, usize>(0)? as u64)
    }
}

impl From<&Entity> for RowSet {
    fn from(entity: &Entity) -> Self {
        RowSet::all(entity)
    }
}
