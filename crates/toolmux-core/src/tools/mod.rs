//! Tool merging and execution
//!
//! ```text
//!  caller declarations ─┐
//!  server tools ────────┼─> SchemaMerger ─> MergedTools ─> ToolDispatcher
//!  FunctionRegistry ────┘        ▲                            │
//!                                │                            ├─> ToolServer::call_tool
//!                         ConnectionCache                     └─> LocalFunction::invoke
//! ```

mod cache;
mod dispatch;
mod merge;
mod registry;

pub use cache::ConnectionCache;
pub use dispatch::{Dispatch, RequestedCall, ToolDispatcher};
pub use merge::{strict_schema, MergedTools, SchemaMerger};
pub use registry::{FunctionRegistry, LocalFunction, ToolFnError, ToolFnResult};
