//! Key-value settings capability and the chat settings stored through it.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Key under which the generation-service API key is kept.
pub const API_KEY: &str = "gemini_api_key";
/// Key under which the user's free-text personal context is kept.
pub const PERSONAL_CONTEXT: &str = "chat_context";

/// Minimal string storage the settings are persisted through.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-process store, mostly for tests and one-shot runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    values: HashMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Configuration the chat-context builder and the generation client need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSettings {
    pub api_key: Option<String>,
    pub personal_context: Option<String>,
}

impl ChatSettings {
    /// Blank values load as `None`.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Self> {
        Ok(Self {
            api_key: non_blank(store.get(API_KEY)?),
            personal_context: non_blank(store.get(PERSONAL_CONTEXT)?),
        })
    }

    pub fn save_api_key<S: KeyValueStore + ?Sized>(&mut self, store: &mut S, key: &str) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::EmptyApiKey);
        }
        store.set(API_KEY, key)?;
        self.api_key = Some(key.to_string());
        Ok(())
    }

    /// An empty context clears it.
    pub fn save_personal_context<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &mut S,
        context: &str,
    ) -> Result<()> {
        store.set(PERSONAL_CONTEXT, context)?;
        self.personal_context = non_blank(Some(context.to_string()));
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
