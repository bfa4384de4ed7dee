//! Diagnostic snapshots.
//!
//! Contains the `StatSnapshot` type, a read-only view of one stat in a
//! container with its full modifier breakdown.

use crate::modifier::ModifierOp;
use crate::stat_id::{StatId, StatSourceId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A point-in-time view of one stat and every modifier on it.
///
/// Modifiers are grouped by operation (tier order) and then by source
/// (sorted), so two snapshots of the same state compare equal.
///
/// # Examples
///
/// ```rust
/// use statcore::{ModifierOp, StatSnapshot};
///
/// let mut snapshot = StatSnapshot::new("armor".parse().unwrap(), 0.0, 7.0);
/// snapshot.insert(ModifierOp::Flat, "item:chest:plate".parse().unwrap(), 6.0);
/// snapshot.insert(ModifierOp::Flat, "item:head:helmet".parse().unwrap(), 1.0);
///
/// assert_eq!(snapshot.modifier_count(), 2);
/// assert_eq!(snapshot.value_of(ModifierOp::Flat, &"item:head:helmet".parse().unwrap()), Some(1.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatSnapshot {
    /// The stat identifier.
    pub stat_id: StatId,

    /// Base value the composition started from.
    pub base: f64,

    /// The computed final value.
    pub final_value: f64,

    /// Modifier values keyed by operation, then by source.
    pub modifiers: BTreeMap<ModifierOp, BTreeMap<StatSourceId, f64>>,
}

impl StatSnapshot {
    pub fn new(stat_id: StatId, base: f64, final_value: f64) -> Self {
        Self {
            stat_id,
            base,
            final_value,
            modifiers: BTreeMap::new(),
        }
    }

    /// Record one modifier in the breakdown.
    pub fn insert(&mut self, op: ModifierOp, source_id: StatSourceId, value: f64) {
        self.modifiers.entry(op).or_default().insert(source_id, value);
    }

    pub fn modifier_count(&self) -> usize {
        self.modifiers.values().map(BTreeMap::len).sum()
    }

    /// Every source contributing to this stat.
    pub fn sources(&self) -> BTreeSet<StatSourceId> {
        self.modifiers
            .values()
            .flat_map(|by_source| by_source.keys().cloned())
            .collect()
    }

    pub fn value_of(&self, op: ModifierOp, source_id: &StatSourceId) -> Option<f64> {
        self.modifiers
            .get(&op)
            .and_then(|by_source| by_source.get(source_id))
            .copied()
    }
}
