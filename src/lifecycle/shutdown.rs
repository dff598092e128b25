//! Shutdown coordination.

use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

use crate::store::MemoryStore;

/// Coordinator for graceful shutdown.
///
/// Every long-running task (edge server, admin server, reload loop)
/// subscribes and stops when the signal is broadcast.
#[derive(Debug)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Broadcast the signal. Later calls are no-ops.
    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(());
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Write the store snapshot once the edge listener has stopped, cleanly or
/// not. A listener error takes precedence over a save error.
pub fn save_on_exit(served: Result<(), Box<dyn Error>>, store: &MemoryStore) -> Result<(), Box<dyn Error>> {
    let saved = store.save();
    if let Err(e) = &saved {
        tracing::error!(error = %e, "Failed to save store snapshot");
    }
    served?;
    saved?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::store::KvStore;

    #[tokio::test]
    async fn test_trigger_reaches_all_subscribers() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 2);

        shutdown.trigger();
        shutdown.trigger();
        assert!(shutdown.is_triggered());
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
        assert!(b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_snapshot_saved_when_listener_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            persistence_path: Some(dir.path().join("store.json").to_string_lossy().into_owned()),
            ..StoreConfig::default()
        };
        let store = MemoryStore::from_config(&config).unwrap();
        store.put("router:routes", "[]".into()).await.unwrap();

        let result = save_on_exit(Err("address in use".into()), &store);
        assert_eq!(result.unwrap_err().to_string(), "address in use");

        let reloaded = MemoryStore::from_config(&config).unwrap();
        assert_eq!(reloaded.get("router:routes").await.unwrap().as_deref(), Some("[]"));
    }
}
