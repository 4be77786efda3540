/*!
This module defines the main API wrapper around the connection pool.
*/

use std::time::Duration;

use log::{debug, LevelFilter};
use sqlx::any::AnyPoolOptions;
#[cfg(feature = "mysql")]
use sqlx::mysql::MySqlConnectOptions;
#[cfg(feature = "postgres")]
use sqlx::postgres::PgConnectOptions;
#[cfg(feature = "sqlite")]
use sqlx::sqlite::SqliteConnectOptions;
#[allow(unused_imports)]
use sqlx::ConnectOptions;

use crate::dialect::DBImpl;
use crate::error::Error;
use crate::row::Row;
use crate::transaction::Transaction;
use crate::utils;
use crate::value::Value;

/**
The representation of all supported DB drivers
 */
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[serde(tag = "Driver")]
pub enum DatabaseDriver {
    /// Representation of the SQLite driver
    #[serde(rename_all = "PascalCase")]
    SQLite {
        /// The filename of the sqlite database
        filename: String,
    },
    /// Representation of the Postgres driver
    #[serde(rename_all = "PascalCase")]
    Postgres {
        /// Name of the database
        name: String,
        /// Host of the database
        host: String,
        /// Port of the database
        port: u16,
        /// User to connect to the database
        user: String,
        /// Password to connect to the database
        password: String,
    },
    /// Representation of the MySQL / MariaDB driver
    #[serde(rename_all = "PascalCase")]
    MySQL {
        /// Name of the database
        name: String,
        /// Host of the database
        host: String,
        /// Port of the database
        port: u16,
        /// User to connect to the database
        user: String,
        /// Password to connect to the database
        password: String,
    },
}

/**
Configuration to create a database connection.

`min_connections` and `max_connections` must be greater than 0
and `max_connections` must be greater or equals `min_connections`.
 */
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct DatabaseConfiguration {
    /// The driver and its corresponding settings
    pub driver: DatabaseDriver,
    /// Minimal connections to initialize upfront.
    pub min_connections: u32,
    /// Maximum connections that allowed to be created.
    pub max_connections: u32,
    /// If set to true, logging will be completely disabled.
    ///
    /// In case of None, false will be used.
    pub disable_logging: Option<bool>,
    /// Set the log level of SQL statements
    ///
    /// In case of None, [LevelFilter::Debug] will be used.
    pub statement_log_level: Option<LevelFilter>,
    /// Log level in case of slow statements (>300 ms)
    ///
    /// In case of None, [LevelFilter::Warn] will be used.
    pub slow_statement_log_level: Option<LevelFilter>,
}

impl DatabaseConfiguration {
    /**
    Create a new database configuration with some defaults set.

    **Defaults**:
    - `min_connections`: 1
    - `max_connections`: 10
    - `disable_logging`: None
    - `statement_log_level`: [Some] of [LevelFilter::Debug]
    - `slow_statement_log_level`: [Some] of [LevelFilter::Warn]

    **Parameter**:
    - `driver`: [DatabaseDriver]: Configuration of the database driver.
    */
    pub fn new(driver: DatabaseDriver) -> Self {
        DatabaseConfiguration {
            driver,
            min_connections: 1,
            max_connections: 10,
            disable_logging: None,
            statement_log_level: Some(LevelFilter::Debug),
            slow_statement_log_level: Some(LevelFilter::Warn),
        }
    }
}

/**
Main API wrapper.

All store access of this crate goes through this struct.
 */
#[derive(Clone)]
pub struct Database {
    pool: sqlx::Pool<sqlx::Any>,
    db_impl: DBImpl,
}

/**
All statements that take longer to execute than this value are considered
as slow statements.
*/
const SLOW_STATEMENTS: Duration = Duration::from_millis(300);

impl Database {
    /**
    Access the used driver at runtime.

    This can be used to generate SQL statements for the chosen dialect.
    */
    pub fn get_sql_dialect(&self) -> DBImpl {
        self.db_impl
    }

    /**
    Connect to the database using `configuration`.
     */
    pub async fn connect(configuration: DatabaseConfiguration) -> Result<Self, Error> {
        if configuration.max_connections < configuration.min_connections {
            return Err(Error::ConfigurationError(String::from(
                "max_connections must not be less than min_connections",
            )));
        }

        if configuration.min_connections == 0 {
            return Err(Error::ConfigurationError(String::from(
                "min_connections must not be 0",
            )));
        }

        match &configuration.driver {
            DatabaseDriver::SQLite { filename, .. } => {
                if filename.is_empty() {
                    return Err(Error::ConfigurationError(String::from(
                        "filename must not be empty",
                    )));
                }
            }
            DatabaseDriver::Postgres { name, .. } => {
                if name.is_empty() {
                    return Err(Error::ConfigurationError(String::from(
                        "name must not be empty",
                    )));
                }
            }
            DatabaseDriver::MySQL { name, .. } => {
                if name.is_empty() {
                    return Err(Error::ConfigurationError(String::from(
                        "name must not be empty",
                    )));
                }
            }
        };

        let pool_options = AnyPoolOptions::new()
            .min_connections(configuration.min_connections)
            .max_connections(configuration.max_connections);

        let slow_log_level = configuration
            .slow_statement_log_level
            .unwrap_or(LevelFilter::Warn);
        let log_level = configuration
            .statement_log_level
            .unwrap_or(LevelFilter::Debug);
        let disabled_logging = configuration.disable_logging.unwrap_or(false);

        let pool: sqlx::Pool<sqlx::Any> = match &configuration.driver {
            #[cfg(feature = "sqlite")]
            DatabaseDriver::SQLite { filename } => {
                let mut connect_options = SqliteConnectOptions::new()
                    .create_if_missing(true)
                    .filename(filename);

                if disabled_logging {
                    connect_options.disable_statement_logging();
                } else {
                    connect_options.log_statements(log_level);
                    connect_options.log_slow_statements(slow_log_level, SLOW_STATEMENTS);
                }

                pool_options.connect_with(connect_options.into()).await?
            }
            #[cfg(feature = "postgres")]
            DatabaseDriver::Postgres {
                host,
                port,
                name,
                user,
                password,
            } => {
                let mut connect_options = PgConnectOptions::new()
                    .host(host.as_str())
                    .port(*port)
                    .username(user.as_str())
                    .password(password.as_str())
                    .database(name.as_str());

                if disabled_logging {
                    connect_options.disable_statement_logging();
                } else {
                    connect_options.log_statements(log_level);
                    connect_options.log_slow_statements(slow_log_level, SLOW_STATEMENTS);
                }

                pool_options.connect_with(connect_options.into()).await?
            }
            #[cfg(feature = "mysql")]
            DatabaseDriver::MySQL {
                name,
                host,
                port,
                user,
                password,
            } => {
                let mut connect_options = MySqlConnectOptions::new()
                    .host(host.as_str())
                    .port(*port)
                    .username(user.as_str())
                    .password(password.as_str())
                    .database(name.as_str());

                if disabled_logging {
                    connect_options.disable_statement_logging();
                } else {
                    connect_options.log_statements(log_level);
                    connect_options.log_slow_statements(slow_log_level, SLOW_STATEMENTS);
                }

                pool_options.connect_with(connect_options.into()).await?
            }
            #[allow(unreachable_patterns)]
            _ => {
                return Err(Error::ConfigurationError(String::from(
                    "support for the configured driver is not compiled in",
                )))
            }
        };

        Ok(Database {
            pool,
            db_impl: match &configuration.driver {
                DatabaseDriver::SQLite { .. } => DBImpl::SQLite,
                DatabaseDriver::Postgres { .. } => DBImpl::Postgres,
                DatabaseDriver::MySQL { .. } => DBImpl::MySQL,
            },
        })
    }

    /**
    Execute raw SQL statements on the database.

    If possible, the statement is executed as prepared statement.

    To bind parameter, use ? as placeholder in SQLite and MySQL
    and $1, $2, $n in Postgres.

    **Parameter**:
    - `query_string`: Reference to a valid SQL query.
    - `bind_params`: Optional list of values to bind in the query.
    - `transaction`: Optional transaction to execute the query on.

    **Returns** a list of rows. If there are no values to retrieve, an empty
    list is returned.
    */
    pub async fn raw_sql(
        &self,
        query_string: &str,
        bind_params: Option<&[Value]>,
        transaction: Option<&mut Transaction<'_>>,
    ) -> Result<Vec<Row>, Error> {
        debug!("SQL: {}", query_string);

        let mut q = sqlx::query(query_string);
        if let Some(params) = bind_params {
            for x in params {
                q = utils::bind_param(q, x.clone());
            }
        }

        match transaction {
            None => q
                .fetch_all(&self.pool)
                .await
                .map(|vector| vector.into_iter().map(Row::from).collect())
                .map_err(Error::SqlxError),
            Some(transaction) => q
                .fetch_all(&mut transaction.tx)
                .await
                .map(|vector| vector.into_iter().map(Row::from).collect())
                .map_err(Error::SqlxError),
        }
    }

    /**
    Entry point for a [Transaction].
    */
    pub async fn start_transaction(&self) -> Result<Transaction<'_>, Error> {
        let tx = self.pool.begin().await.map_err(Error::SqlxError)?;

        Ok(Transaction { tx })
    }
}
