//! Core trait for secret storage

use thiserror::Error;

/// Errors that can occur during secret store operations
#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("Store is read-only")]
    ReadOnly,

    #[error("Store configuration error: {0}")]
    Invalid(String),
}

pub type SecretStoreResult<T> = Result<T, SecretStoreError>;

/// Source of provider credentials
///
/// Keys are provider ids (`"openai"`, `"anthropic"`, ...) or direct names
/// such as `OPENAI_API_KEY`; each store decides how to map them.
pub trait SecretStore: Send + Sync {
    /// Human-readable name of this store
    fn name(&self) -> &str;

    /// Retrieve a secret by key
    fn get(&self, key: &str) -> Option<String>;

    /// Store a secret
    fn store(&self, _key: &str, _value: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }

    /// Check if a secret exists
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}
