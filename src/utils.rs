use sqlx::database::HasArguments;
use sqlx::query::Query;

use crate::value::Value;

type AnyQuery<'q> = Query<'q, sqlx::Any, <sqlx::Any as HasArguments<'q>>::Arguments>;

/**
This helper method is used to bind [Value]s to the query.
*/
pub(crate) fn bind_param<'query>(query: AnyQuery<'query>, param: Value) -> AnyQuery<'query> {
    match param {
        Value::String(x) => query.bind(x),
        Value::I64(x) => query.bind(x),
        Value::I32(x) => query.bind(x),
        Value::I16(x) => query.bind(x),
        Value::Bool(x) => query.bind(x),
        Value::F32(x) => query.bind(x),
        Value::F64(x) => query.bind(x),
        Value::Null => {
            static NULL: Option<bool> = None;
            query.bind(NULL)
        }
    }
}
