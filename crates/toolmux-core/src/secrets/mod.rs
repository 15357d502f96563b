//! Credential lookup for provider backends
//!
//! - `SecretStore` trait for pluggable stores
//! - `EnvSecretStore`, `MemorySecretStore`, `ChainSecretStore`

mod chain_store;
mod env_store;
mod memory_store;
mod traits;

pub use chain_store::ChainSecretStore;
pub use env_store::EnvSecretStore;
pub use memory_store::MemorySecretStore;
pub use traits::{SecretStore, SecretStoreError, SecretStoreResult};
