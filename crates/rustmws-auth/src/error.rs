//! Error types for request signing.

/// Errors that can occur while signing a request.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// The algorithm name is neither `HmacSHA1` nor `HmacSHA256`.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The secret key could not be used as an HMAC key.
    #[error("Invalid signing key")]
    InvalidKey,
}
