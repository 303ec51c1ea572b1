use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

/// Error taxonomy for the settlement core.
///
/// Lost claim races are deliberately absent: a caller that loses the
/// completion claim gets a successful no-op, not an error.
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },
    #[error("gateway error: {0}")]
    GatewayError(String),
    #[error("download token expired")]
    TokenExpired,
    #[error("download token already used")]
    TokenAlreadyUsed,
    #[error("storage error: {0}")]
    StorageError(String),
}
