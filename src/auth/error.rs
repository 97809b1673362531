use thiserror::Error;

/// Failures raised by the credential and token service for conditions that are
/// not ordinary "wrong password" / "bad token" outcomes.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("signing secret must not be empty")]
    EmptySecret,
}
