//! Per-client tool server connection cache

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::logging::Logger;
use crate::mcp::ToolServer;

/// Server name -> connected handle, owned by one client session
///
/// The lock is never held across a connect. Two calls racing on the same
/// unseen name may both connect; the later insert overwrites the earlier.
pub struct ConnectionCache {
    servers: RwLock<HashMap<String, Arc<dyn ToolServer>>>,
    logger: Arc<dyn Logger>,
}

impl ConnectionCache {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            servers: RwLock::new(HashMap::new()),
            logger,
        }
    }

    /// Return the cached handle for `server.name()`, connecting and caching
    /// `server` first if the name has not been seen.
    ///
    /// A failed connect is not cached and aborts the caller.
    pub async fn ensure_connected(
        &self,
        server: &Arc<dyn ToolServer>,
    ) -> OrchestratorResult<Arc<dyn ToolServer>> {
        let name = server.name().to_string();
        if let Some(cached) = self.get(&name) {
            return Ok(cached);
        }

        self.logger
            .info(&format!("[ConnectionCache] Connecting tool server '{}'", name));
        server
            .connect()
            .await
            .map_err(|source| OrchestratorError::Connection {
                server: name.clone(),
                source,
            })?;

        self.servers.write().insert(name, Arc::clone(server));
        Ok(Arc::clone(server))
    }

    /// Connect every server in order; the first failure aborts
    pub async fn ensure_all(
        &self,
        servers: &[Arc<dyn ToolServer>],
    ) -> OrchestratorResult<Vec<Arc<dyn ToolServer>>> {
        let mut connected = Vec::with_capacity(servers.len());
        for server in servers {
            connected.push(self.ensure_connected(server).await?);
        }
        Ok(connected)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolServer>> {
        self.servers.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.servers.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.servers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::mcp::MemoryToolServer;

    fn cache() -> ConnectionCache {
        ConnectionCache::new(Arc::new(NoOpLogger))
    }

    #[tokio::test]
    async fn test_connects_once_per_name() {
        let cache = cache();
        let first = Arc::new(MemoryToolServer::new("fs"));
        let second = Arc::new(MemoryToolServer::new("fs"));
        let first_dyn: Arc<dyn ToolServer> = first.clone();
        let second_dyn: Arc<dyn ToolServer> = second.clone();

        cache.ensure_connected(&first_dyn).await.unwrap();
        let cached = cache.ensure_connected(&second_dyn).await.unwrap();

        assert_eq!(first.connect_count(), 1);
        assert_eq!(second.connect_count(), 0);
        assert!(Arc::ptr_eq(&cached, &first_dyn));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_connect_is_not_cached() {
        let cache = cache();
        let server: Arc<dyn ToolServer> =
            Arc::new(MemoryToolServer::new("broken").failing_connect("refused"));

        let err = cache.ensure_connected(&server).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Connection { ref server, .. } if server == "broken"
        ));
        assert!(!cache.contains("broken"));
    }

    #[tokio::test]
    async fn test_ensure_all_stops_at_first_failure() {
        let cache = cache();
        let ok = Arc::new(MemoryToolServer::new("ok"));
        let later = Arc::new(MemoryToolServer::new("later"));
        let servers: Vec<Arc<dyn ToolServer>> = vec![
            ok.clone(),
            Arc::new(MemoryToolServer::new("bad").failing_connect("down")),
            later.clone(),
        ];

        assert!(cache.ensure_all(&servers).await.is_err());
        assert_eq!(ok.connect_count(), 1);
        assert_eq!(later.connect_count(), 0);
    }
}
