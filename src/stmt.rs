use crate::dialect::DBImpl;
use crate::value::Value;

/**
A single token of a statement under construction.
*/
#[derive(Debug, Clone)]
pub enum Token {
    /// Literal SQL text. Never contains user data.
    Text(String),
    /// A bind parameter. Rendered as the dialect's placeholder.
    Param(Value),
}

/**
Builder assembling a statement from an ordered list of text and
parameter tokens.

Placeholders are only emitted by [SqlBuilder::finish], which walks the
tokens once and collects the parameter list in the same pass. This keeps
the bind parameter order equal to the placeholder order by construction,
also when nested subqueries are spliced into an outer statement.
*/
#[derive(Debug, Clone)]
pub struct SqlBuilder {
    dialect: DBImpl,
    tokens: Vec<Token>,
}

impl SqlBuilder {
    /**
    Start a new statement for the given dialect.
    */
    pub fn new(dialect: DBImpl) -> Self {
        SqlBuilder {
            dialect,
            tokens: vec![],
        }
    }

    /**
    The dialect this statement is generated for.
    */
    pub fn dialect(&self) -> DBImpl {
        self.dialect
    }

    /**
    Append literal SQL text.
    */
    pub fn push(&mut self, sql: &str) {
        if let Some(Token::Text(last)) = self.tokens.last_mut() {
            last.push_str(sql);
        } else {
            self.tokens.push(Token::Text(sql.to_string()));
        }
    }

    /**
    Append a quoted identifier.
    */
    pub fn push_ident(&mut self, name: &str) {
        let quoted = self.dialect.quote_name(name);
        self.push(&quoted);
    }

    /**
    Append a quoted column qualified with its quoted table.
    */
    pub fn push_column(&mut self, table: &str, column: &str) {
        self.push_ident(table);
        self.push(".");
        self.push_ident(column);
    }

    /**
    Append a bind parameter.
    */
    pub fn push_param(&mut self, value: Value) {
        self.tokens.push(Token::Param(value));
    }

    /**
    Splice another statement's tokens into this one.

    Used to embed a nested subquery including its parameters at the
    current position.
    */
    pub fn append(&mut self, other: SqlBuilder) {
        for token in other.tokens {
            match token {
                Token::Text(text) => self.push(&text),
                Token::Param(value) => self.push_param(value),
            }
        }
    }

    /**
    Render the statement.

    **Returns** the statement text and the values to bind, in
    placeholder order.
    */
    pub fn finish(self) -> (String, Vec<Value>) {
        let mut query_string = String::new();
        let mut bind_params = vec![];

        for token in self.tokens {
            match token {
                Token::Text(text) => query_string.push_str(&text),
                Token::Param(value) => {
                    bind_params.push(value);
                    self.dialect
                        .write_placeholder(&mut query_string, bind_params.len());
                }
            }
        }

        (query_string, bind_params)
    }
}

#[cfg(test)]
mod tests {
    use super::SqlBuilder;
    use crate::dialect::DBImpl;
    use crate::value::Value;

    #[test]
    fn sqlite_placeholders() {
        let mut b = SqlBuilder::new(DBImpl::SQLite);
        b.push("SELECT * FROM ");
        b.push_ident("rating");
        b.push(" WHERE ");
        b.push_column("rating", "rating");
        b.push(" > ");
        b.push_param(Value::I64(3));
        let (query, params) = b.finish();
        assert_eq!(
            query,
            "SELECT * FROM \"rating\" WHERE \"rating\".\"rating\" > ?"
        );
        assert_eq!(params, vec![Value::I64(3)]);
    }

    #[test]
    fn postgres_placeholders_are_numbered() {
        let mut b = SqlBuilder::new(DBImpl::Postgres);
        b.push("SELECT * FROM ");
        b.push_ident("rating");
        b.push(" WHERE ");
        b.push_ident("rating");
        b.push(" > ");
        b.push_param(Value::I64(3));
        b.push(" AND ");
        b.push_ident("created");
        b.push(" >= ");
        b.push_param(Value::String("2010-01-01".to_string()));
        let (query, params) = b.finish();
        assert_eq!(
            query,
            "SELECT * FROM \"rating\" WHERE \"rating\" > $1 AND \"created\" >= $2"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn splicing_keeps_parameter_order() {
        let mut inner = SqlBuilder::new(DBImpl::Postgres);
        inner.push("SELECT ");
        inner.push_ident("id");
        inner.push(" FROM ");
        inner.push_ident("food");
        inner.push(" WHERE ");
        inner.push_ident("name");
        inner.push(" = ");
        inner.push_param(Value::String("apple".to_string()));

        let mut outer = SqlBuilder::new(DBImpl::Postgres);
        outer.push("SELECT COUNT(*) FROM ");
        outer.push_ident("rating");
        outer.push(" WHERE ");
        outer.push_ident("content_type_id");
        outer.push(" = ");
        outer.push_param(Value::I64(7));
        outer.push(" AND ");
        outer.push_ident("object_id");
        outer.push(" IN (");
        outer.append(inner);
        outer.push(")");

        let (query, params) = outer.finish();
        assert_eq!(
            query,
            "SELECT COUNT(*) FROM \"rating\" WHERE \"content_type_id\" = $1 \
             AND \"object_id\" IN (SELECT \"id\" FROM \"food\" WHERE \"name\" = $2)"
        );
        assert_eq!(
            params,
            vec![Value::I64(7), Value::String("apple".to_string())]
        );
    }
}
