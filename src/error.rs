//! Error taxonomy for the decomposition engine

use thiserror::Error;

use crate::models::ItemId;

/// Failures a single decomposition run can surface.
///
/// All of these are unrecoverable for the invocation: the caller gets a
/// distinguishable kind, fixes its input or its reference data, and retries.
#[derive(Debug, Error)]
pub enum CalcError {
    #[error("unknown item: {0}")]
    UnknownItem(String),

    #[error("item {item} references unknown activity id {activity}")]
    UnknownActivity { item: ItemId, activity: i64 },

    #[error("decomposition exceeded depth {0} - recipe graph likely contains a cycle")]
    MaxDepthExceeded(usize),

    #[error("requested quantity must be positive and finite, got {0}")]
    InvalidQuantity(f64),

    #[error("item {item} is produced by more than one recipe")]
    DuplicateProducer { item: ItemId },

    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}
