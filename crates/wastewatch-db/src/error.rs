use thiserror::Error;

/// Store-level failure taxonomy. Callers decide the HTTP mapping; an empty
/// list is never used to signal one of these.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(&'static str),

    #[error("illegal status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("insufficient points: have {have}, need {need}")]
    InsufficientPoints { have: i64, need: i64 },

    #[error("transaction amount must be a positive integer, got {0}")]
    InvalidAmount(i64),

    #[error("store failure: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("DB lock poisoned")]
    LockPoisoned,
}
