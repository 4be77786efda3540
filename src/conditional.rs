//! Condition trees for filtering row sets.

use crate::dialect::DBImpl;
use crate::stmt::SqlBuilder;
use crate::value::Value;

/**
This enum represents all available binary comparison operators.
*/
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinaryOperator {
    /// Representation of "{} = {}" in SQL
    Equals,
    /// Representation of "{} <> {}" in SQL
    NotEquals,
    /// Representation of "{} > {}" in SQL
    Greater,
    /// Representation of "{} >= {}" in SQL
    GreaterOrEquals,
    /// Representation of "{} < {}" in SQL
    Less,
    /// Representation of "{} <= {}" in SQL
    LessOrEquals,
    /// Representation of "{} LIKE {}" in SQL
    Like,
}

impl BinaryOperator {
    fn sql(&self) -> &'static str {
        match self {
            BinaryOperator::Equals => "=",
            BinaryOperator::NotEquals => "<>",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterOrEquals => ">=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessOrEquals => "<=",
            BinaryOperator::Like => "LIKE",
        }
    }
}

/**
This enum represents a condition tree.

Columns are resolved against the entity of the row set the condition is
applied to.
*/
#[derive(Debug, Clone)]
pub enum Condition {
    /// A list of [Condition]s, that get expanded to "{} AND {} ..."
    Conjunction(Vec<Condition>),
    /// A list of [Condition]s, that get expanded to "{} OR {} ..."
    Disjunction(Vec<Condition>),
    /// Comparison of a column against a bound value.
    Binary {
        /// Operator to compare with
        operator: BinaryOperator,
        /// Name of the column
        column: String,
        /// Value to bind
        value: Value,
    },
    /// A pre-rendered fragment, including its bind parameters.
    ///
    /// Used for membership subqueries whose text is assembled elsewhere.
    Raw(SqlBuilder),
}

macro_rules! impl_binary {
    ($name:ident, $operator:ident) => {
        #[doc = concat!("Shorthand to construct a [BinaryOperator::", stringify!($operator), "] condition.")]
        pub fn $name(column: &str, value: impl Into<Value>) -> Self {
            Condition::Binary {
                operator: BinaryOperator::$operator,
                column: column.to_string(),
                value: value.into(),
            }
        }
    };
}

impl Condition {
    impl_binary!(equals, Equals);
    impl_binary!(not_equals, NotEquals);
    impl_binary!(greater, Greater);
    impl_binary!(greater_or_equals, GreaterOrEquals);
    impl_binary!(less, Less);
    impl_binary!(less_or_equals, LessOrEquals);
    impl_binary!(like, Like);

    /// The dialect a contained pre-rendered fragment was built for, if any.
    pub(crate) fn fragment_dialect(&self) -> Option<DBImpl> {
        match self {
            Condition::Conjunction(conditions) | Condition::Disjunction(conditions) => {
                conditions.iter().find_map(Condition::fragment_dialect)
            }
            Condition::Binary { .. } => None,
            Condition::Raw(fragment) => Some(fragment.dialect()),
        }
    }

    /**
    This method is used to convert the condition into SQL.

    `table` is the quoted-on-demand table name the columns belong to.
    */
    pub(crate) fn build(&self, table: &str, builder: &mut SqlBuilder) {
        match self {
            Condition::Conjunction(conditions) => {
                builder.push("(");
                for (i, condition) in conditions.iter().enumerate() {
                    if i > 0 {
                        builder.push(" AND ");
                    }
                    condition.build(table, builder);
                }
                builder.push(")");
            }
            Condition::Disjunction(conditions) => {
                builder.push("(");
                for (i, condition) in conditions.iter().enumerate() {
                    if i > 0 {
                        builder.push(" OR ");
                    }
                    condition.build(table, builder);
                }
                builder.push(")");
            }
            Condition::Binary {
                operator,
                column,
                value,
            } => {
                builder.push_column(table, column);
                builder.push(" ");
                builder.push(operator.sql());
                builder.push(" ");
                builder.push_param(value.clone());
            }
            Condition::Raw(fragment) => {
                builder.append(fragment.clone());
            }
        }
    }
}
