//! `window.localStorage` backend.
//! Persistent across reloads; values are stored as UTF-8 strings.

use async_trait::async_trait;
use gloo_utils::errors::JsError;
use wasm_bindgen::JsValue;

use archive_core::ports::StoragePort;
use archive_types::{ArchiveError, Result};

const PROBE_KEY: &str = "archive:probe";

pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    /// Open `localStorage` and check that it accepts writes (private
    /// browsing modes may expose it read-only).
    pub fn open() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| ArchiveError::Storage("No window object".to_string()))?;

        let storage = window
            .local_storage()
            .map_err(|e| js_error("localStorage unavailable", e))?
            .ok_or_else(|| ArchiveError::Storage("localStorage not available".to_string()))?;

        storage
            .set_item(PROBE_KEY, "1")
            .map_err(|e| js_error("localStorage is read-only", e))?;
        let _ = storage.remove_item(PROBE_KEY);

        Ok(Self { storage })
    }
}

#[async_trait(?Send)]
impl StoragePort for LocalStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.storage
            .get_item(key)
            .map(|value| value.map(String::into_bytes))
            .map_err(|e| js_error("read failed", e))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let text = std::str::from_utf8(value)
            .map_err(|e| ArchiveError::Storage(format!("value for {} is not UTF-8: {}", key, e)))?;
        self.storage
            .set_item(key, text)
            .map_err(|e| js_error("write failed", e))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.storage
            .remove_item(key)
            .map_err(|e| js_error("delete failed", e))
    }

    fn backend_name(&self) -> &str {
        "localStorage"
    }
}

fn js_error(context: &str, value: JsValue) -> ArchiveError {
    let detail = JsError::try_from(value.clone())
        .map(|e| e.to_string())
        .unwrap_or_else(|_| format!("{:?}", value));
    ArchiveError::Storage(format!("{}: {}", context, detail))
}
