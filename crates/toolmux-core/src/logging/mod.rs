//! Logging abstractions for runtime-agnostic logging

mod console;
mod memory;
mod noop;
mod traits;

pub use console::ConsoleLogger;
pub use memory::{LogEntry, LogLevel, MemoryLogger};
pub use noop::NoOpLogger;
pub use traits::Logger;
