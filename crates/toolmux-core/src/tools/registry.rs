//! Registry of locally callable tools
//!
//! Holds the declared schema and the backing function for every local tool,
//! in registration order. Registering a name twice replaces the earlier
//! entry in place.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value;

use crate::types::{ToolArguments, ToolSchema};

/// Error a local tool may return
pub type ToolFnError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a local tool
pub type ToolFnResult = Result<Value, ToolFnError>;

type SyncFn = dyn Fn(ToolArguments) -> ToolFnResult + Send + Sync;
type AsyncFn = dyn Fn(ToolArguments) -> BoxFuture<'static, ToolFnResult> + Send + Sync;

/// A local tool's backing function
#[derive(Clone)]
pub enum LocalFunction {
    /// Returns its value directly
    Sync(Arc<SyncFn>),
    /// Returns a unit of work that has to be awaited
    Async(Arc<AsyncFn>),
}

impl LocalFunction {
    /// Call the function, awaiting it when it is asynchronous
    pub async fn invoke(&self, arguments: ToolArguments) -> ToolFnResult {
        match self {
            LocalFunction::Sync(f) => f(arguments),
            LocalFunction::Async(f) => f(arguments).await,
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self, LocalFunction::Async(_))
    }
}

impl std::fmt::Debug for LocalFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocalFunction::Sync(_) => f.write_str("LocalFunction::Sync"),
            LocalFunction::Async(_) => f.write_str("LocalFunction::Async"),
        }
    }
}

#[derive(Default)]
struct Entries {
    schemas: Vec<ToolSchema>,
    functions: Vec<LocalFunction>,
    index: HashMap<String, usize>,
}

/// Name -> schema and name -> function mappings for local tools
#[derive(Default)]
pub struct FunctionRegistry {
    entries: RwLock<Entries>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, schema: ToolSchema, function: LocalFunction) {
        let mut entries = self.entries.write();
        match entries.index.get(&schema.name).copied() {
            Some(i) => {
                entries.schemas[i] = schema;
                entries.functions[i] = function;
            }
            None => {
                let i = entries.schemas.len();
                entries.index.insert(schema.name.clone(), i);
                entries.schemas.push(schema);
                entries.functions.push(function);
            }
        }
    }

    /// Register a synchronous tool
    pub fn register<F>(&self, schema: ToolSchema, function: F)
    where
        F: Fn(ToolArguments) -> ToolFnResult + Send + Sync + 'static,
    {
        self.insert(schema, LocalFunction::Sync(Arc::new(function)));
    }

    /// Register an asynchronous tool
    pub fn register_async<F, Fut>(&self, schema: ToolSchema, function: F)
    where
        F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolFnResult> + Send + 'static,
    {
        let boxed: Arc<AsyncFn> = Arc::new(move |args| Box::pin(function(args)));
        self.insert(schema, LocalFunction::Async(boxed));
    }

    /// Declared schemas, in registration order
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.entries.read().schemas.clone()
    }

    /// Declared schema for `name`
    pub fn schema(&self, name: &str) -> Option<ToolSchema> {
        let entries = self.entries.read();
        entries.index.get(name).map(|&i| entries.schemas[i].clone())
    }

    /// Backing function for `name`
    pub fn get(&self, name: &str) -> Option<LocalFunction> {
        let entries = self.entries.read();
        entries.index.get(name).map(|&i| entries.functions[i].clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.read().schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn add_schema() -> ToolSchema {
        ToolSchema::new("add", "Add two numbers").with_parameters(json!({
            "type": "object",
            "properties": { "a": {"type": "number"}, "b": {"type": "number"} },
            "required": ["a", "b"]
        }))
    }

    fn add(args: ToolArguments) -> ToolFnResult {
        let a = args.get_f64("a").ok_or("a is required")?;
        let b = args.get_f64("b").ok_or("b is required")?;
        Ok(json!(a + b))
    }

    #[tokio::test]
    async fn test_sync_and_async_functions() {
        let registry = FunctionRegistry::new();
        registry.register(add_schema(), add);
        registry.register_async(ToolSchema::new("shout", "Uppercase"), |args: ToolArguments| async move {
            let text = args.get_str("text").unwrap_or_default().to_uppercase();
            Ok(Value::String(text))
        });

        let args = ToolArguments::parse(&json!({"a": 2, "b": 3})).unwrap();
        let sum = registry.get("add").unwrap().invoke(args).await.unwrap();
        assert_eq!(sum, json!(5.0));

        let shout = registry.get("shout").unwrap();
        assert!(shout.is_async());
        let out = shout
            .invoke(ToolArguments::parse(&json!({"text": "hey"})).unwrap())
            .await
            .unwrap();
        assert_eq!(out, json!("HEY"));
    }

    #[test]
    fn test_order_and_replacement() {
        let registry = FunctionRegistry::new();
        registry.register(ToolSchema::new("first", "1"), |_| Ok(Value::Null));
        registry.register(ToolSchema::new("second", "2"), |_| Ok(Value::Null));
        registry.register(ToolSchema::new("first", "replaced"), |_| Ok(Value::Null));

        let names: Vec<_> = registry.schemas().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(
            registry.schema("first").unwrap().description.as_deref(),
            Some("replaced")
        );
        assert_eq!(registry.len(), 2);
        assert!(!registry.contains("third"));
    }

    #[tokio::test]
    async fn test_function_error() {
        let registry = FunctionRegistry::new();
        registry.register(add_schema(), add);
        let err = registry
            .get("add")
            .unwrap()
            .invoke(ToolArguments::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "a is required");
    }
}
