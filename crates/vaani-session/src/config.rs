use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::memory::{HttpMemoryStore, LongTermMemoryStore, NoopMemoryStore};

fn default_memory_base_url() -> String {
    "http://127.0.0.1:8321".to_string()
}

/// Connection settings for the external long-term memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_memory_base_url")]
    pub base_url: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            base_url: default_memory_base_url(),
        }
    }
}

impl MemoryConfig {
    /// Read settings from the environment. The store is enabled exactly
    /// when `VAANI_MEMORY_URL` is set.
    pub fn from_env() -> Self {
        let base_url = std::env::var("VAANI_MEMORY_URL").ok();
        Self {
            enabled: base_url.is_some(),
            api_key: std::env::var("VAANI_MEMORY_API_KEY").unwrap_or_default(),
            base_url: base_url.unwrap_or_else(default_memory_base_url),
        }
    }

    pub fn build_store(&self) -> Arc<dyn LongTermMemoryStore> {
        if self.enabled {
            Arc::new(HttpMemoryStore::new(
                self.base_url.clone(),
                self.api_key.clone(),
            ))
        } else {
            Arc::new(NoopMemoryStore)
        }
    }
}
