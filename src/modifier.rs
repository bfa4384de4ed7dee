//! Stat modifiers.
//!
//! A modifier is one contribution to one stat from one source. Modifiers
//! are grouped into operation tiers which are combined in a fixed order:
//!
//! ```text
//! final = (base + Σ FLAT) × (1 + Σ PERCENT_ADD) × Π (1 + PERCENT_MULT)
//! ```

use crate::error::StatError;
use crate::stat_id::{StatId, StatSourceId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a modifier combines with the others on the same stat.
///
/// Declaration order is tier order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModifierOp {
    /// Added to the base value.
    Flat,
    /// Summed, then applied once as `× (1 + sum)` to the flat-adjusted value.
    PercentAdd,
    /// Each instance applied as an independent `× (1 + value)` factor.
    PercentMult,
}

impl ModifierOp {
    /// All operations, in tier order.
    pub const ALL: [ModifierOp; 3] = [
        ModifierOp::Flat,
        ModifierOp::PercentAdd,
        ModifierOp::PercentMult,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModifierOp::Flat => "FLAT",
            ModifierOp::PercentAdd => "PERCENT_ADD",
            ModifierOp::PercentMult => "PERCENT_MULT",
        }
    }
}

impl fmt::Display for ModifierOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single contribution to a stat.
///
/// Within one container, `(stat_id, op, source_id)` identifies a modifier;
/// adding another with the same triple replaces the earlier value.
///
/// # Examples
///
/// ```rust
/// use statcore::{ModifierOp, StatModifier};
///
/// let chestplate = StatModifier::flat(
///     "max_health".parse().unwrap(),
///     "item:chest:plate".parse().unwrap(),
///     4.0,
/// )
/// .unwrap();
///
/// assert_eq!(chestplate.op, ModifierOp::Flat);
/// assert!(StatModifier::flat(
///     "max_health".parse().unwrap(),
///     "item:chest:plate".parse().unwrap(),
///     f64::NAN,
/// )
/// .is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    pub stat_id: StatId,
    pub source_id: StatSourceId,
    pub op: ModifierOp,
    pub value: f64,
}

impl StatModifier {
    /// Create a modifier. Fails with [`StatError::NonFiniteValue`] for NaN
    /// or infinite values.
    pub fn new(
        stat_id: StatId,
        source_id: StatSourceId,
        op: ModifierOp,
        value: f64,
    ) -> Result<Self, StatError> {
        if !value.is_finite() {
            return Err(StatError::NonFiniteValue {
                stat: stat_id,
                value,
            });
        }
        Ok(Self {
            stat_id,
            source_id,
            op,
            value,
        })
    }

    pub fn flat(stat_id: StatId, source_id: StatSourceId, value: f64) -> Result<Self, StatError> {
        Self::new(stat_id, source_id, ModifierOp::Flat, value)
    }

    /// `value` is a fraction: `0.10` means +10%.
    pub fn percent_add(
        stat_id: StatId,
        source_id: StatSourceId,
        value: f64,
    ) -> Result<Self, StatError> {
        Self::new(stat_id, source_id, ModifierOp::PercentAdd, value)
    }

    /// `value` is a fraction: `0.20` multiplies by `1.20`.
    pub fn percent_mult(
        stat_id: StatId,
        source_id: StatSourceId,
        value: f64,
    ) -> Result<Self, StatError> {
        Self::new(stat_id, source_id, ModifierOp::PercentMult, value)
    }
}
