use thiserror::Error;

/// Outcome of a credential renewal exchange. Cloneable because one
/// driver's failure is broadcast to every queued waiter.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("no renewal credential available")]
    MissingRefreshToken,

    #[error("credential renewal rejected: {0}")]
    Rejected(String),

    #[error("transport failure during renewal: {0}")]
    Transport(String),
}
