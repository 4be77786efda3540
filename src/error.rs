//! Error type of this crate

/**
Error type to simplify propagating different error types.
 */
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error returned from Sqlx
    #[error("sqlx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    /// Error for pointing to configuration errors.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// No usable polymorphic reference could be located on an entity and
    /// none was supplied explicitly.
    #[error("unable to locate a polymorphic reference on entity {entity}: {detail}")]
    ReferenceNotFound {
        /// Name of the entity that was scanned.
        entity: String,
        /// Why the lookup failed.
        detail: &'static str,
    },

    /// A reverse relation named by an aggregation points at a different
    /// entity than the supplied linked row set.
    #[error("relation {relation} on entity {entity} targets {target}, not {linked}")]
    RelationMismatch {
        /// Name of the reverse relation.
        relation: String,
        /// Entity declaring the relation.
        entity: String,
        /// Entity the relation is declared to target.
        target: String,
        /// Entity of the supplied linked rows.
        linked: String,
    },
}
