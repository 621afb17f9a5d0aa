mod error;
pub use error::ClientError;

pub mod auth;
pub use auth::{AuthError, AuthSession, CredentialStore, MemoryStore, RefreshGate, TokenRenewer};

mod backoff;
pub use backoff::Backoff;

mod routes;
pub use routes::RoutePolicy;

mod http;
pub use http::{HttpRenewer, HttpTransport};
