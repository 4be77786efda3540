//! Aggregation functions

use crate::error::Error;
use crate::row::Row;

/**
The aggregation functions usable over a polymorphic reference.
*/
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SelectAggregator {
    /// Returns the average of all non-null values, or null for an empty group.
    Avg,
    /// Returns the number of non-null values, 0 for an empty group.
    Count,
    /// Returns the sum of all non-null values, or null for an empty group.
    Sum,
}

impl SelectAggregator {
    /// The SQL function name.
    pub(crate) fn sql_name(&self) -> &'static str {
        match self {
            SelectAggregator::Avg => "AVG",
            SelectAggregator::Count => "COUNT",
            SelectAggregator::Sum => "SUM",
        }
    }

    /**
    The function's natural value over an empty group.
    */
    pub fn empty_value(&self) -> AggregateValue {
        match self {
            SelectAggregator::Count => AggregateValue::Integer(0),
            SelectAggregator::Avg | SelectAggregator::Sum => AggregateValue::Null,
        }
    }
}

/**
An aggregation operator: a function bound to the source column it reads.

`relation` optionally names a reverse relation declared on the primary
entity; when it matches the supplied linked rows and no cast is needed,
the operation is composed as a single joined query instead of a
correlated subquery.

```
use generic_aggregation::Aggregation;

let total = Aggregation::sum("rating").via("ratings");
```
*/
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// Function doing the aggregation
    pub function: SelectAggregator,
    /// Column the function reads
    pub column: String,
    /// Optional reverse relation to compose the query through
    pub relation: Option<String>,
}

impl Aggregation {
    /// An average over `column`.
    pub fn avg(column: &str) -> Self {
        Aggregation {
            function: SelectAggregator::Avg,
            column: column.to_string(),
            relation: None,
        }
    }

    /// A count over `column`.
    pub fn count(column: &str) -> Self {
        Aggregation {
            function: SelectAggregator::Count,
            column: column.to_string(),
            relation: None,
        }
    }

    /// A sum over `column`.
    pub fn sum(column: &str) -> Self {
        Aggregation {
            function: SelectAggregator::Sum,
            column: column.to_string(),
            relation: None,
        }
    }

    /// Name the declared reverse relation to compose the query through.
    pub fn via(mut self, relation: &str) -> Self {
        self.relation = Some(relation.to_string());
        self
    }
}

/**
A computed scalar aggregate.
*/
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum AggregateValue {
    /// Integer result, e.g. a count or an integer sum
    Integer(i64),
    /// Floating point result, e.g. an average
    Float(f64),
    /// Null result of an aggregate over an empty group
    Null,
}

impl AggregateValue {
    /// The value as integer, if it is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AggregateValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// The value as float, converting an integer result.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AggregateValue::Integer(value) => Some(*value as f64),
            AggregateValue::Float(value) => Some(*value),
            AggregateValue::Null => None,
        }
    }

    /// Whether the aggregate is null.
    pub fn is_null(&self) -> bool {
        matches!(self, AggregateValue::Null)
    }

    /**
    Decode the first column of a result row.

    Integer results are tried first since SUM over an integer column
    stays integral on all three backends.
    */
    pub(crate) fn decode(row: &Row) -> Result<Self, Error> {
        if let Ok(value) = row.get::<Option<i64>, usize>(0) {
            return Ok(match value {
                Some(value) => AggregateValue::Integer(value),
                None => AggregateValue::Null,
            });
        }
        match row.get::<Option<f64>, usize>(0)? {
            Some(value) => Ok(AggregateValue::Float(value)),
            None => Ok(AggregateValue::Null),
        }
    }
}
