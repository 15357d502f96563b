//! Logger trait definition

/// Sink for the orchestrator's diagnostics
///
/// Messages carry a bracketed component prefix such as `[ChatLoop]`.
///
/// Implementations:
/// - `NoOpLogger`: Silent logger
/// - `ConsoleLogger`: Logs to stderr
/// - `MemoryLogger`: Records entries for inspection in tests
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);

    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    fn error(&self, message: &str);
}
