//! Change records.
//!
//! A container produces a [`StatValueChange`] when a recomputation moves a
//! stat by more than [`CHANGE_EPSILON`]; the service attaches the entity
//! and delivers it to listeners as a [`StatChange`].

use crate::entity::EntityKey;
use crate::stat_id::StatId;
use serde::{Deserialize, Serialize};

/// Smallest absolute difference reported as a change.
pub const CHANGE_EPSILON: f64 = 1e-9;

/// Old and new value of one stat, before the entity is known.
#[derive(Debug, Clone, PartialEq)]
pub struct StatValueChange {
    pub stat_id: StatId,
    pub old_value: f64,
    pub new_value: f64,
}

impl StatValueChange {
    pub fn new(stat_id: StatId, old_value: f64, new_value: f64) -> Self {
        Self {
            stat_id,
            old_value,
            new_value,
        }
    }

    /// Whether the values differ by strictly more than `epsilon`.
    pub fn has_changed(&self, epsilon: f64) -> bool {
        (self.new_value - self.old_value).abs() > epsilon
    }

    /// Bind this change to `entity`.
    pub fn attach(self, entity: EntityKey) -> StatChange {
        StatChange {
            entity,
            stat_id: self.stat_id,
            old_value: self.old_value,
            new_value: self.new_value,
        }
    }
}

/// A detected change of one stat on one entity.
///
/// # Examples
///
/// ```rust
/// use statcore::{EntityKey, StatValueChange};
///
/// let entity = EntityKey::random();
/// let change = StatValueChange::new("max_health".parse().unwrap(), 20.0, 24.0).attach(entity);
///
/// assert_eq!(change.entity, entity);
/// assert_eq!(change.delta(), 4.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatChange {
    pub entity: EntityKey,
    pub stat_id: StatId,
    pub old_value: f64,
    pub new_value: f64,
}

impl StatChange {
    pub fn delta(&self) -> f64 {
        self.new_value - self.old_value
    }
}
