use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("invalid tier: {0}")]
    InvalidTier(i64),
}
