//! Evaluation context for stat conditions.
//!
//! A `StatContext` describes the situation a bonus is computed for (the
//! equipment slot, the item type, whether the holder is in combat). The
//! engine never reads it; it is handed to [`StatCondition`]s by upstream
//! bonus logic.
//!
//! [`StatCondition`]: crate::condition::StatCondition

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key-value bag passed to stat conditions.
///
/// # Examples
///
/// ```rust
/// use statcore::StatContext;
///
/// let context = StatContext::new()
///     .with("slot", "main_hand")
///     .with("in_combat", true);
///
/// let slot: Option<String> = context.get("slot");
/// assert_eq!(slot.as_deref(), Some("main_hand"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatContext {
    data: HashMap<String, serde_json::Value>,
}

impl StatContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a context value.
    ///
    /// Values that fail to serialize are not stored.
    pub fn set(&mut self, key: impl Into<String>, value: impl Serialize) {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.data.insert(key.into(), json_value);
        }
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.set(key, value);
        self
    }

    /// Get a context value, or `None` if missing or of another type.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Borrow the raw JSON value stored under `key`.
    pub fn raw(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }
}
