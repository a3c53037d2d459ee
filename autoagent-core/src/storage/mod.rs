//! Key/value persistence for client state
//!
//! Every value is an opaque blob stored under its own key and replaced
//! wholesale on each write. There are no field-level updates and no
//! transaction spanning several keys.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use serde::{de::DeserializeOwned, Serialize};

/// Key holding the conversation collection
pub const CHATS_KEY: &str = "llm_agent_chats";
/// Key holding the settings record
pub const SETTINGS_KEY: &str = "llm_agent_settings";
/// Key holding the id of the selected conversation
pub const CURRENT_CHAT_KEY: &str = "llm_agent_current_chat";

/// A synchronous key/value store
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> crate::Result<Option<String>>;

    /// Replace the value stored under `key`
    fn set(&self, key: &str, value: &str) -> crate::Result<()>;

    /// Remove `key`, returning whether it existed
    fn remove(&self, key: &str) -> crate::Result<bool>;
}

/// Deserialize the JSON blob under `key`
///
/// A blob that no longer parses is treated as absent so a corrupted entry
/// falls back to defaults instead of locking the user out.
pub fn load_json<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> crate::Result<Option<T>> {
    let Some(raw) = storage.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!("Discarding unreadable value under {}: {}", key, e);
            Ok(None)
        }
    }
}

/// Serialize `value` as JSON and store it under `key`
pub fn save_json<T: Serialize + ?Sized>(
    storage: &dyn Storage,
    key: &str,
    value: &T,
) -> crate::Result<()> {
    let raw = serde_json::to_string(value)?;
    storage.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_json_missing_key() {
        let storage = MemoryStorage::new();
        let value: Option<Vec<u32>> = load_json(&storage, "absent").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_load_json_discards_garbage() {
        let storage = MemoryStorage::new();
        storage.set(CHATS_KEY, "{not json").unwrap();
        let value: Option<Vec<u32>> = load_json(&storage, CHATS_KEY).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_save_then_load_json() {
        let storage = MemoryStorage::new();
        save_json(&storage, "numbers", &vec![1u32, 2, 3]).unwrap();
        let value: Option<Vec<u32>> = load_json(&storage, "numbers").unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
    }
}
