//! Tool declaration merging
//!
//! Caller declarations come first, then tools advertised by connected
//! servers, then the registry. The first declaration of a name wins.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::registry::FunctionRegistry;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::logging::Logger;
use crate::mcp::ToolServer;
use crate::types::{ToolSchema, ToolStyle};

/// Result of merging the three declaration sources for one call
#[derive(Debug, Default)]
pub struct MergedTools {
    /// Deduplicated declarations in priority order
    schemas: Vec<ToolSchema>,
    /// Tool name -> first server advertising it
    servers: HashMap<String, Arc<dyn ToolServer>>,
    /// Names declared by the caller
    caller_names: HashSet<String>,
}

impl MergedTools {
    pub fn schemas(&self) -> &[ToolSchema] {
        &self.schemas
    }

    pub fn schema(&self, name: &str) -> Option<&ToolSchema> {
        self.schemas.iter().find(|s| s.name == name)
    }

    /// Server that serves `name`, if any
    pub fn server_for(&self, name: &str) -> Option<&Arc<dyn ToolServer>> {
        self.servers.get(name)
    }

    pub fn declared_by_caller(&self, name: &str) -> bool {
        self.caller_names.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Declarations in the wire shape `style` expects
    pub fn to_wire(&self, style: ToolStyle) -> Vec<Value> {
        self.schemas.iter().map(|s| s.to_wire(style)).collect()
    }
}

/// Builds the per-call tool list
pub struct SchemaMerger<'a> {
    registry: &'a FunctionRegistry,
    logger: &'a Arc<dyn Logger>,
    strict: bool,
}

impl<'a> SchemaMerger<'a> {
    pub fn new(registry: &'a FunctionRegistry, logger: &'a Arc<dyn Logger>) -> Self {
        Self {
            registry,
            logger,
            strict: false,
        }
    }

    /// Rewrite server-advertised parameter schemas into strict form
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Merge caller declarations, the tools of already connected `servers`
    /// and the registry's declarations.
    pub async fn merge(
        &self,
        caller: &[Value],
        servers: &[Arc<dyn ToolServer>],
    ) -> OrchestratorResult<MergedTools> {
        let mut merged = MergedTools::default();
        let mut seen = HashSet::new();

        for declaration in caller {
            match ToolSchema::normalize(declaration) {
                Some(schema) => {
                    merged.caller_names.insert(schema.name.clone());
                    push_unique(&mut merged.schemas, &mut seen, schema);
                }
                None => self
                    .logger
                    .warn("[SchemaMerger] Dropping tool declaration without a name"),
            }
        }

        for server in servers {
            let tools = server
                .list_tools()
                .await
                .map_err(|source| OrchestratorError::Listing {
                    server: server.name().to_string(),
                    source,
                })?;
            self.logger.debug(&format!(
                "[SchemaMerger] Server '{}' advertises {} tools",
                server.name(),
                tools.len()
            ));

            for mut schema in tools {
                if schema.name.trim().is_empty() {
                    continue;
                }
                merged
                    .servers
                    .entry(schema.name.clone())
                    .or_insert_with(|| Arc::clone(server));
                if self.strict {
                    schema.parameters = schema.parameters.map(strict_schema);
                }
                push_unique(&mut merged.schemas, &mut seen, schema);
            }
        }

        for schema in self.registry.schemas() {
            if schema.name.trim().is_empty() {
                self.logger
                    .warn("[SchemaMerger] Dropping registered tool without a name");
                continue;
            }
            push_unique(&mut merged.schemas, &mut seen, schema);
        }

        Ok(merged)
    }
}

fn push_unique(schemas: &mut Vec<ToolSchema>, seen: &mut HashSet<String>, schema: ToolSchema) {
    if seen.insert(schema.name.clone()) {
        schemas.push(schema);
    }
}

/// Close every object level of a JSON schema: no additional properties and
/// every declared property required.
pub fn strict_schema(schema: Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(strict_object(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(strict_schema).collect()),
        other => other,
    }
}

fn strict_object(mut map: Map<String, Value>) -> Map<String, Value> {
    if let Some(Value::Object(properties)) = map.remove("properties") {
        let required: Vec<Value> = properties.keys().cloned().map(Value::String).collect();
        let properties: Map<String, Value> = properties
            .into_iter()
            .map(|(k, v)| (k, strict_schema(v)))
            .collect();
        map.insert("properties".into(), Value::Object(properties));
        map.insert("required".into(), Value::Array(required));
        map.insert("additionalProperties".into(), Value::Bool(false));
    } else if map.get("type").and_then(Value::as_str) == Some("object") {
        map.insert("additionalProperties".into(), Value::Bool(false));
    }

    for key in ["items", "anyOf", "oneOf", "allOf"] {
        if let Some(inner) = map.remove(key) {
            map.insert(key.into(), strict_schema(inner));
        }
    }
    for key in ["$defs", "definitions"] {
        if let Some(Value::Object(defs)) = map.remove(key) {
            let defs: Map<String, Value> =
                defs.into_iter().map(|(k, v)| (k, strict_schema(v))).collect();
            map.insert(key.into(), Value::Object(defs));
        }
    }
    map
}
