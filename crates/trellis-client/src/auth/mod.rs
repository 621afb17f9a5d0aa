//! Credential storage, the single-flight refresh gate, and the session
//! policy that wires them around requests.

mod error;
pub use error::AuthError;

mod store;
pub use store::{ACCESS_TOKEN_KEY, CredentialStore, MemoryStore, REFRESH_TOKEN_KEY};

mod refresh;
pub use refresh::RefreshGate;

mod session;
pub use session::{AuthSession, TokenRenewer};
