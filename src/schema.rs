/*!
Entity descriptors the aggregation operations work against.

Entities are declared once at startup and treated as immutable schema
information afterwards.
*/

use std::sync::Arc;

use crate::dialect::DBImpl;
use crate::error::Error;

/**
All column types the crate knows how to reason about.

The variants map to the type spelling the backend reports for such a
column, which is what cast decisions are based on.
*/
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DbType {
    /// Auto incrementing integer primary key
    Auto,
    /// 64 bit integer
    Int64,
    /// 32 bit integer
    Int32,
    /// Double precision float
    Double,
    /// Bounded string
    VarChar,
    /// Unbounded string
    Text,
    /// Date and time
    DateTime,
    /// Boolean
    Boolean,
}

impl DbType {
    /**
    The backend native type spelling of this column type.
    */
    pub fn raw_type(&self, dialect: DBImpl) -> &'static str {
        match dialect {
            DBImpl::SQLite => match self {
                DbType::Auto => "INTEGER",
                DbType::Int64 => "BIGINT",
                DbType::Int32 => "INTEGER",
                DbType::Double => "REAL",
                DbType::VarChar => "VARCHAR(255)",
                DbType::Text => "TEXT",
                DbType::DateTime => "datetime",
                DbType::Boolean => "BOOLEAN",
            },
            DBImpl::MySQL => match self {
                DbType::Auto => "integer UNSIGNED AUTO_INCREMENT",
                DbType::Int64 => "bigint",
                DbType::Int32 => "integer",
                DbType::Double => "double precision",
                DbType::VarChar => "varchar(255)",
                DbType::Text => "longtext",
                DbType::DateTime => "datetime(6)",
                DbType::Boolean => "bool",
            },
            DBImpl::Postgres => match self {
                DbType::Auto => "serial",
                DbType::Int64 => "bigint",
                DbType::Int32 => "integer",
                DbType::Double => "double precision",
                DbType::VarChar => "character varying(255)",
                DbType::Text => "text",
                DbType::DateTime => "timestamp with time zone",
                DbType::Boolean => "boolean",
            },
        }
    }
}

/**
A declared column.
*/
#[derive(Debug, Clone)]
pub struct ColumnDef {
    /// Name of the column
    pub name: String,
    /// Type of the column
    pub db_type: DbType,
}

/**
A declared reverse relation from one entity to the linking entity
pointing back at it.
*/
#[derive(Debug, Clone)]
pub struct ReverseRelation {
    /// Name of the relation
    pub name: String,
    /// Name of the entity the relation points at
    pub target: String,
}

/**
A polymorphic reference declared on a linking entity.

The pair of a type tag column, identifying which entity a row points at,
and a reference id column, holding the primary key value within that
entity.
*/
#[derive(Debug, Clone)]
pub struct GenericReference {
    /// Name of the reference
    pub name: String,
    /// Column holding the type tag
    pub tag_column: String,
    /// Column holding the referenced primary key value
    pub id_column: String,
}

/**
A named relational row shape.

Constructed with the builder methods and frozen into an [Entity] handle
with [EntityType::build]:

```
use generic_aggregation::{DbType, EntityType};

let food = EntityType::new("food", "food")
    .add_column("name", DbType::VarChar)
    .add_relation("ratings", "rating")
    .build();
```
*/
#[derive(Debug, Clone)]
pub struct EntityType {
    /// Name the entity is registered under
    pub name: String,
    /// Name of the backing table
    pub table: String,
    /// The primary key column
    pub primary_key: ColumnDef,
    /// All declared non primary key columns
    pub columns: Vec<ColumnDef>,
    /// Declared reverse relations
    pub relations: Vec<ReverseRelation>,
    /// Declared polymorphic references
    pub generic_references: Vec<GenericReference>,
}

/**
Shared handle to a declared entity.

Entities outlive every single query, so they are passed around as
reference counted handles.
*/
pub type Entity = Arc<EntityType>;

impl EntityType {
    /**
    Start declaring an entity.

    The primary key defaults to an auto incrementing `id` column and can
    be overridden with [EntityType::primary_key].
    */
    pub fn new(name: &str, table: &str) -> Self {
        EntityType {
            name: name.to_string(),
            table: table.to_string(),
            primary_key: ColumnDef {
                name: "id".to_string(),
                db_type: DbType::Auto,
            },
            columns: vec![],
            relations: vec![],
            generic_references: vec![],
        }
    }

    /**
    Override the primary key column.
    */
    pub fn primary_key(mut self, name: &str, db_type: DbType) -> Self {
        self.primary_key = ColumnDef {
            name: name.to_string(),
            db_type,
        };
        self
    }

    /**
    Declare a column.
    */
    pub fn add_column(mut self, name: &str, db_type: DbType) -> Self {
        self.columns.push(ColumnDef {
            name: name.to_string(),
            db_type,
        });
        self
    }

    /**
    Declare a reverse relation to the linking entity `target`.
    */
    pub fn add_relation(mut self, name: &str, target: &str) -> Self {
        self.relations.push(ReverseRelation {
            name: name.to_string(),
            target: target.to_string(),
        });
        self
    }

    /**
    Declare a polymorphic reference.

    `tag_column` and `id_column` must also be declared as columns.
    */
    pub fn add_generic_reference(mut self, name: &str, tag_column: &str, id_column: &str) -> Self {
        self.generic_references.push(GenericReference {
            name: name.to_string(),
            tag_column: tag_column.to_string(),
            id_column: id_column.to_string(),
        });
        self
    }

    /**
    Freeze the declaration into a shared handle.
    */
    pub fn build(self) -> Entity {
        Arc::new(self)
    }

    /**
    Look up a declared column, including the primary key.
    */
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        if self.primary_key.name == name {
            return Some(&self.primary_key);
        }
        self.columns.iter().find(|column| column.name == name)
    }

    /**
    Look up a declared reverse relation.
    */
    pub fn get_relation(&self, name: &str) -> Option<&ReverseRelation> {
        self.relations.iter().find(|relation| relation.name == name)
    }

    /**
    The backend native type spelling of a declared column.
    */
    pub fn column_raw_type(&self, name: &str, dialect: DBImpl) -> Result<&'static str, Error> {
        self.get_column(name)
            .map(|column| column.db_type.raw_type(dialect))
            .ok_or_else(|| {
                Error::ConfigurationError(format!(
                    "column {} is not declared on entity {}",
                    name, self.name
                ))
            })
    }
}

/**
Scan an entity's declared polymorphic references for the one to use.

**Returns** the single declared reference. Zero declared references or
more than one fail with [Error::ReferenceNotFound]; entities with several
references must supply the one to use explicitly at every entry point.
*/
pub fn locate_reference(entity: &EntityType) -> Result<&GenericReference, Error> {
    match entity.generic_references.as_slice() {
        [reference] => Ok(reference),
        [] => Err(Error::ReferenceNotFound {
            entity: entity.name.clone(),
            detail: "no polymorphic reference is declared",
        }),
        _ => Err(Error::ReferenceNotFound {
            entity: entity.name.clone(),
            detail: "more than one polymorphic reference is declared, supply one explicitly",
        }),
    }
}
