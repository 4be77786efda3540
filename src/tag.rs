/*!
The process wide registry mapping entities to their type tags.
*/

use std::collections::HashMap;
use std::sync::RwLock;

use log::debug;

use crate::database::Database;
use crate::dialect::DBImpl;
use crate::error::Error;
use crate::row::Row;
use crate::schema::EntityType;
use crate::stmt::SqlBuilder;
use crate::transaction::Transaction;
use crate::value::Value;

/// Table the tags are stored in unless overridden.
const DEFAULT_TABLE: &str = "entity_tag";

/**
Registry resolving the stable type tag of an entity.

Tags live in a database table so they are stable across processes; the
registry caches them for the process lifetime after the first lookup.
Two concurrent lookups racing to populate the same entry are harmless
since the stored value is the same for both.

The registry is plain state to be constructed once at startup and handed
to the aggregation operations explicitly.
*/
pub struct TagRegistry {
    table: String,
    cache: RwLock<HashMap<String, i64>>,
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TagRegistry {
    /**
    A registry backed by the default `entity_tag` table.
    */
    pub fn new() -> Self {
        Self::with_table(DEFAULT_TABLE)
    }

    /**
    A registry backed by a custom table.

    The table must have an auto incrementing integer `id` and a unique
    string column `entity`.
    */
    pub fn with_table(table: &str) -> Self {
        TagRegistry {
            table: table.to_string(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /**
    Create the backing table if it does not exist yet.
    */
    pub async fn create_table(&self, db: &Database) -> Result<(), Error> {
        let dialect = db.get_sql_dialect();
        let table = dialect.quote_name(&self.table);
        let id = dialect.quote_name("id");
        let entity = dialect.quote_name("entity");

        let statement = match dialect {
            DBImpl::SQLite => format!(
                "CREATE TABLE IF NOT EXISTS {} ({} INTEGER PRIMARY KEY AUTOINCREMENT, {} VARCHAR(255) NOT NULL UNIQUE)",
                table, id, entity
            ),
            DBImpl::MySQL => format!(
                "CREATE TABLE IF NOT EXISTS {} ({} integer UNSIGNED AUTO_INCREMENT PRIMARY KEY, {} varchar(255) NOT NULL UNIQUE)",
                table, id, entity
            ),
            DBImpl::Postgres => format!(
                "CREATE TABLE IF NOT EXISTS {} ({} serial PRIMARY KEY, {} character varying(255) NOT NULL UNIQUE)",
                table, id, entity
            ),
        };

        db.raw_sql(&statement, None, None).await?;
        Ok(())
    }

    /**
    The type tag of `entity`.

    Cached for the process lifetime; the first lookup per entity selects
    from the backing table and registers the entity there if it has never
    been seen before.
    */
    pub async fn tag_for(&self, db: &Database, entity: &EntityType) -> Result<i64, Error> {
        {
            let cache = self
                .cache
                .read()
                .expect("tag cache poisoned");
            if let Some(tag) = cache.get(&entity.name) {
                return Ok(*tag);
            }
        }

        let tag = match self.select_tag(db, &entity.name, None).await? {
            Some(tag) => tag,
            None => {
                debug!("registering tag for entity {}", entity.name);
                match self.register_tag(db, &entity.name).await {
                    Ok(tag) => tag,
                    // A concurrent writer may have won the insert race,
                    // the re-select settles it either way.
                    Err(register_error) => {
                        match self.select_tag(db, &entity.name, None).await? {
                            Some(tag) => tag,
                            None => return Err(register_error),
                        }
                    }
                }
            }
        };

        let mut cache = self
            .cache
            .write()
            .expect("tag cache poisoned");
        cache.insert(entity.name.clone(), tag);
        Ok(tag)
    }

    async fn select_tag(
        &self,
        db: &Database,
        name: &str,
        transaction: Option<&mut Transaction<'_>>,
    ) -> Result<Option<i64>, Error> {
        let mut builder = SqlBuilder::new(db.get_sql_dialect());
        builder.push("SELECT ");
        builder.push_ident("id");
        builder.push(" FROM ");
        builder.push_ident(&self.table);
        builder.push(" WHERE ");
        builder.push_ident("entity");
        builder.push(" = ");
        builder.push_param(Value::String(name.to_string()));

        let (query_string, bind_params) = builder.finish();
        let rows = db
            .raw_sql(&query_string, Some(&bind_params), transaction)
            .await?;
        rows.first().map(decode_tag).transpose()
    }

    /// Insert the tag and read it back inside one transaction, so a
    /// half-registered entity is never observable.
    async fn register_tag(&self, db: &Database, name: &str) -> Result<i64, Error> {
        let mut transaction = db.start_transaction().await?;

        let mut builder = SqlBuilder::new(db.get_sql_dialect());
        builder.push("INSERT INTO ");
        builder.push_ident(&self.table);
        builder.push(" (");
        builder.push_ident("entity");
        builder.push(") VALUES (");
        builder.push_param(Value::String(name.to_string()));
        builder.push(")");

        let (query_string, bind_params) = builder.finish();
        db.raw_sql(&query_string, Some(&bind_params), Some(&mut transaction))
            .await?;

        let tag = self
            .select_tag(db, name, Some(&mut transaction))
            .await?
            .ok_or_else(|| {
                Error::ConfigurationError(format!("failed to register a tag for entity {}", name))
            })?;
        transaction.commit().await?;
        Ok(tag)
    }
}

// Postgres reports serial columns as 32 bit, the other backends as 64 bit.
fn decode_tag(row: &Row) -> Result<i64, Error> {
    if let Ok(tag) = row.get::<i64, usize>(0) {
        return Ok(tag);
    }
    Ok(row.get::<i32, usize>(0)? as i64)
}
