//! Identifier types.
//!
//! Provides `StatId`, the identifier of a stat type, and `StatSourceId`,
//! the hierarchical identifier of a contributor. Both use `Arc<str>` for
//! cheap cloning and fast comparison.

use crate::error::StatError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Separator between segments of a [`StatSourceId`].
pub const SOURCE_SEPARATOR: char = ':';

/// Interned string identifier for stats.
///
/// Clones share the same allocation. Use
/// [`StatRegistry::stat_id`](crate::registry::StatRegistry::stat_id) to get
/// the registry's canonical instance of a known stat.
///
/// # Examples
///
/// ```rust
/// use statcore::StatId;
///
/// let armor = StatId::new("armor").unwrap();
/// let armor2: StatId = "armor".parse().unwrap();
///
/// assert_eq!(armor, armor2);
/// assert!(StatId::new("   ").is_err());
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct StatId(Arc<str>);

impl StatId {
    /// Create a new `StatId`.
    ///
    /// Fails with [`StatError::BlankIdentifier`] when `id` is empty or
    /// whitespace only.
    pub fn new(id: impl AsRef<str>) -> Result<Self, StatError> {
        let id = id.as_ref();
        if id.trim().is_empty() {
            return Err(StatError::BlankIdentifier { kind: "stat" });
        }
        Ok(Self(Arc::from(id)))
    }

    /// Id from a crate-owned literal that is known to be non-blank.
    pub(crate) fn from_static(id: &'static str) -> Self {
        debug_assert!(!id.trim().is_empty(), "blank stat id literal");
        Self(Arc::from(id))
    }

    /// Get the string representation of this `StatId`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Serialize for StatId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StatId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        StatId::new(s).map_err(serde::de::Error::custom)
    }
}

impl FromStr for StatId {
    type Err = StatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for StatId {
    type Error = StatError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<String> for StatId {
    type Error = StatError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

// Lets maps keyed by `StatId` be queried with a plain `&str`.
impl Borrow<str> for StatId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a modifier contributor.
///
/// Source ids are colon-delimited paths such as
/// `item:main_hand:fulcrum:sword:enchant:sharpness`, so that every
/// modifier an item contributes can be found under one prefix.
///
/// # Examples
///
/// ```rust
/// use statcore::StatSourceId;
///
/// let slot = StatSourceId::new("item:main_hand").unwrap();
/// let enchant = slot.child("fulcrum").unwrap().child("sharpness").unwrap();
///
/// assert_eq!(enchant.as_str(), "item:main_hand:fulcrum:sharpness");
/// assert!(enchant.is_under(&slot));
/// assert!(StatSourceId::new("item::sword").is_err());
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct StatSourceId(Arc<str>);

impl StatSourceId {
    /// Create a new `StatSourceId`.
    ///
    /// Fails when `id` is blank or contains an empty segment
    /// (`"a::b"`, `":a"`, `"a:"`).
    pub fn new(id: impl AsRef<str>) -> Result<Self, StatError> {
        let id = id.as_ref();
        if id.trim().is_empty() {
            return Err(StatError::BlankIdentifier { kind: "source" });
        }
        if id.split(SOURCE_SEPARATOR).any(|segment| segment.trim().is_empty()) {
            return Err(StatError::InvalidSourceId(id.to_string()));
        }
        Ok(Self(Arc::from(id)))
    }

    /// Get the string representation of this source id.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SOURCE_SEPARATOR)
    }

    /// Append a segment, producing a nested source id.
    pub fn child(&self, segment: &str) -> Result<Self, StatError> {
        Self::new(format!("{}{}{}", self.0, SOURCE_SEPARATOR, segment))
    }

    /// The enclosing path, or `None` for a single-segment id.
    pub fn parent(&self) -> Option<Self> {
        self.0
            .rfind(SOURCE_SEPARATOR)
            .map(|idx| Self(Arc::from(&self.0[..idx])))
    }

    /// Whether this id equals `prefix` or is nested below it.
    ///
    /// Matching is segment-aware: `item:main` is not a prefix of
    /// `item:main_hand`.
    pub fn is_under(&self, prefix: &StatSourceId) -> bool {
        match self.0.strip_prefix(prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with(SOURCE_SEPARATOR),
            None => false,
        }
    }

    /// Raw string prefix test, without segment awareness.
    pub fn starts_with_str(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl Serialize for StatSourceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StatSourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        StatSourceId::new(s).map_err(serde::de::Error::custom)
    }
}

impl FromStr for StatSourceId {
    type Err = StatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for StatSourceId {
    type Error = StatError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl fmt::Display for StatSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_id_creation() {
        let id1 = StatId::new("max_health").unwrap();
        let id2 = StatId::new("max_health").unwrap();
        assert_eq!(id1, id2);
        assert_eq!(id1.as_str(), "max_health");
    }

    #[test]
    fn test_stat_id_rejects_blank() {
        assert_eq!(
            StatId::new(""),
            Err(StatError::BlankIdentifier { kind: "stat" })
        );
        assert!(StatId::new(" \t").is_err());
    }

    #[test]
    fn test_stat_id_ordering() {
        let armor = StatId::new("armor").unwrap();
        let luck = StatId::new("luck").unwrap();
        assert!(armor < luck);
    }

    #[test]
    fn test_source_id_rejects_empty_segments() {
        assert!(StatSourceId::new("item::sword").is_err());
        assert!(StatSourceId::new(":item").is_err());
        assert!(StatSourceId::new("item:").is_err());
        assert_eq!(
            StatSourceId::new(""),
            Err(StatError::BlankIdentifier { kind: "source" })
        );
    }

    #[test]
    fn test_source_id_segments_and_parent() {
        let id = StatSourceId::new("item:main_hand:fulcrum:sword").unwrap();
        let segments: Vec<_> = id.segments().collect();
        assert_eq!(segments, vec!["item", "main_hand", "fulcrum", "sword"]);

        let parent = id.parent().unwrap();
        assert_eq!(parent.as_str(), "item:main_hand:fulcrum");
        assert!(StatSourceId::new("buff").unwrap().parent().is_none());
    }

    #[test]
    fn test_source_id_is_under_is_segment_aware() {
        let id = StatSourceId::new("item:main_hand:sword").unwrap();
        let slot = StatSourceId::new("item:main_hand").unwrap();
        let partial = StatSourceId::new("item:main").unwrap();

        assert!(id.is_under(&slot));
        assert!(id.is_under(&id));
        assert!(!id.is_under(&partial));
        assert!(id.starts_with_str("item:main"));
        assert!(!slot.is_under(&id));
    }

    #[test]
    fn test_source_id_serde_validates() {
        let ok: StatSourceId = serde_json::from_str("\"buff:regen\"").unwrap();
        assert_eq!(ok.as_str(), "buff:regen");
        assert!(serde_json::from_str::<StatSourceId>("\"buff::regen\"").is_err());
    }
}
