use crate::domain::ports::ProcessHandleRef;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};
use uuid::Uuid;

/// Identifies one payment attempt for as long as its embedded process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptId(Uuid);

impl AttemptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Running embedded processes, keyed by the attempt that started them.
///
/// Cloning shares the underlying map, so the registry can be handed to several
/// tasks of the same host.
#[derive(Default, Clone)]
pub struct AttemptRegistry {
    handles: Arc<RwLock<HashMap<AttemptId, ProcessHandleRef>>>,
}

impl AttemptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, id: AttemptId, handle: ProcessHandleRef) {
        let mut handles = self.handles.write().await;
        handles.insert(id, handle);
        debug!(attempt = %id, running = handles.len(), "attempt registered");
    }

    pub async fn get(&self, id: AttemptId) -> Option<ProcessHandleRef> {
        self.handles.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: AttemptId) -> Option<ProcessHandleRef> {
        self.handles.write().await.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.handles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.handles.read().await.is_empty()
    }

    /// Removes an attempt and shuts its process down.
    pub async fn release(&self, id: AttemptId) -> Result<()> {
        match self.remove(id).await {
            Some(handle) => handle.shutdown().await,
            None => Ok(()),
        }
    }

    /// Shuts down every registered process.
    ///
    /// All handles are attempted; the first failure is returned afterwards.
    pub async fn shutdown(&self) -> Result<()> {
        let drained: Vec<_> = self.handles.write().await.drain().collect();
        let mut first_error = None;

        for (id, handle) in drained {
            if let Err(e) = handle.shutdown().await {
                error!(attempt = %id, error = %e, "failed to shut down embedded process");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ProcessHandle;
    use crate::error::BridgeError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingHandle {
        shutdowns: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ProcessHandle for CountingHandle {
        async fn shutdown(&self) -> Result<()> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(BridgeError::Channel("already gone".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_register_get_remove() {
        let registry = AttemptRegistry::new();
        let id = AttemptId::new();
        registry.register(id, Arc::new(CountingHandle::default())).await;

        assert_eq!(registry.len().await, 1);
        assert!(registry.get(id).await.is_some());
        assert!(registry.get(AttemptId::new()).await.is_none());

        assert!(registry.remove(id).await.is_some());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_release_shuts_down_handle() {
        let registry = AttemptRegistry::new();
        let handle = Arc::new(CountingHandle::default());
        let id = AttemptId::new();
        registry.register(id, handle.clone()).await;

        registry.release(id).await.unwrap();
        assert_eq!(handle.shutdowns.load(Ordering::SeqCst), 1);

        // Releasing an unknown attempt is a no-op
        registry.release(id).await.unwrap();
        assert_eq!(handle.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_attempts_every_handle() {
        let registry = AttemptRegistry::new();
        let failing = Arc::new(CountingHandle {
            fail: true,
            ..Default::default()
        });
        let healthy = Arc::new(CountingHandle::default());
        registry.register(AttemptId::new(), failing.clone()).await;
        registry.register(AttemptId::new(), healthy.clone()).await;

        assert!(registry.shutdown().await.is_err());
        assert_eq!(failing.shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.shutdowns.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty().await);
    }
}
