//! Tool-augmented completion orchestration
//!
//! `ToolClient` is one client session: it owns the tool server connection
//! cache and wires the merger, dispatcher and drivers to the backends picked
//! by the provider router.

mod call;
mod chat_loop;
mod client;
mod follow_up;

pub use call::{clean_options, ChatCall, EmbeddingCall, ResponseCall, RESERVED_KEYS};
pub use client::{ToolClient, ToolClientBuilder};
