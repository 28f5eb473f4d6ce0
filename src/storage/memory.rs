use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use super::{EVENT_BUFFER, LocalStore, StorageEvent};
use crate::error::AppError;

/// In-process store. Lost on exit.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            entries: RwLock::new(HashMap::new()),
            events,
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut store = Self::new();
        store.entries = RwLock::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        store
    }

    /// Makes every following write fail, the way a full quota does.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self, key: &str) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Storage(format!("quota exceeded writing {}", key)));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.check_writable(key)?;
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        let _ = self.events.send(StorageEvent { key: key.to_string() });
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        self.check_writable(key)?;
        self.entries.write().await.remove(key);
        let _ = self.events.send(StorageEvent { key: key.to_string() });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}
