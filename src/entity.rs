//! Entity identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque key of a stat-bearing entity.
///
/// Built from the entity's stable external identity. Keys are ordered so
/// diagnostics can iterate entities deterministically.
///
/// # Examples
///
/// ```rust
/// use statcore::EntityKey;
/// use uuid::Uuid;
///
/// let uuid = Uuid::new_v4();
/// let key = EntityKey::new(uuid);
/// assert_eq!(key.uuid(), uuid);
/// assert_eq!(key, EntityKey::from(uuid));
/// ```
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(Uuid);

impl EntityKey {
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// A key backed by a fresh random (v4) UUID.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for EntityKey {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
