//! Connector session storage
//!
//! Connectors persist their session state through a caller-supplied
//! handle. The adapter never reads it; it only passes it along.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::ConnectResult;

/// Async key/value storage handed to connectors
#[async_trait]
pub trait WalletStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> ConnectResult<Option<String>>;
    async fn set_item(&self, key: &str, value: &str) -> ConnectResult<()>;
    async fn remove_item(&self, key: &str) -> ConnectResult<()>;
}

/// In-memory storage, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl WalletStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> ConnectResult<Option<String>> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> ConnectResult<()> {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> ConnectResult<()> {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.remove(key);
        Ok(())
    }
}
