//! Completion backends and provider routing
//!
//! ## Architecture
//!
//! Every backend implements `CompletionBackend` (chat, response, embedding):
//! - `NativeBackend`: the native OpenAI-compatible HTTP API (reqwest)
//! - `RoutedBackend`: every other provider through the `genai` crate, with
//!   providers genai has no adapter for spoken to over the OpenAI protocol
//! - `MockBackend`: scripted replies for tests
//!
//! `ProviderRouter` decides per call which of the first two serves a model.

mod error;
mod genai_adapter;
mod genai_provider;
pub mod mock;
mod native;
mod router;
mod traits;

pub use error::{ProviderError, ProviderResult};
pub use genai_adapter::{adapter_kind_for, embeddings_api_base, is_genai_supported, ProviderConfig};
pub use genai_provider::RoutedBackend;
pub use mock::{MockBackend, MockMode};
pub use native::{NativeBackend, OPENAI_API_BASE};
pub use router::{infer_provider, BackendKind, ProviderRouter, Route};
pub use traits::{ChatRequest, CompletionBackend, EmbeddingRequest, ResponseRequest};
