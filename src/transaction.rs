//! Transactions over the connection pool.

use sqlx::Any;

use crate::error::Error;

/**
A database transaction.

Statements are run on it by passing it to [crate::Database::raw_sql].
Nothing becomes visible to other connections before [Transaction::commit]
returns; dropping the transaction without committing rolls it back.

Obtained from [crate::Database::start_transaction].
*/
pub struct Transaction<'db> {
    pub(crate) tx: sqlx::Transaction<'db, Any>,
}

impl<'db> Transaction<'db> {
    /// Make all statements run on this transaction permanent.
    pub async fn commit(self) -> Result<(), Error> {
        self.tx.commit().await.map_err(Error::SqlxError)
    }

    /// Discard all statements run on this transaction.
    pub async fn rollback(self) -> Result<(), Error> {
        self.tx.rollback().await.map_err(Error::SqlxError)
    }
}
