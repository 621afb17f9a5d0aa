use std::collections::HashMap;
use std::sync::RwLock;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Persistent key-value storage for the credential pair.
///
/// Exactly two keys are ever used: [`ACCESS_TOKEN_KEY`] and
/// [`REFRESH_TOKEN_KEY`]. Implementations are expected to survive client
/// restarts; the in-memory default covers tests and short-lived tools.
pub trait CredentialStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.read().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.inner.write().unwrap().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.inner.write().unwrap().remove(key);
    }
}
