//! Per-stat applicability conditions.
//!
//! A condition decides whether a stat is relevant in a given
//! [`StatContext`], e.g. "sharpness damage only applies to swords".
//! Conditions are attached to stat definitions in the
//! [`StatRegistry`](crate::registry::StatRegistry) and evaluated by
//! bonus-computation code before it produces modifiers.

use crate::context::StatContext;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Predicate over a [`StatContext`].
pub trait StatCondition: Send + Sync + Debug {
    /// Whether the stat applies in `context`.
    fn applies(&self, context: &StatContext) -> bool;
}

/// Adapter turning a closure into a [`StatCondition`].
///
/// # Examples
///
/// ```rust
/// use statcore::condition::{FnCondition, StatCondition};
/// use statcore::StatContext;
///
/// let in_combat = FnCondition(|ctx: &StatContext| ctx.get::<bool>("in_combat") == Some(true));
/// assert!(in_combat.applies(&StatContext::new().with("in_combat", true)));
/// assert!(!in_combat.applies(&StatContext::new()));
/// ```
pub struct FnCondition<F>(pub F);

impl<F> Debug for FnCondition<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnCondition(<closure>)")
    }
}

impl<F> StatCondition for FnCondition<F>
where
    F: Fn(&StatContext) -> bool + Send + Sync,
{
    fn applies(&self, context: &StatContext) -> bool {
        (self.0)(context)
    }
}

/// Declarative condition, loadable from registry configuration.
///
/// # Examples
///
/// ```rust
/// use statcore::condition::{ContextCondition, StatCondition};
/// use statcore::StatContext;
///
/// let swords_only: ContextCondition =
///     serde_json::from_str(r#"{"equals": {"key": "item_type", "value": "sword"}}"#).unwrap();
///
/// assert!(swords_only.applies(&StatContext::new().with("item_type", "sword")));
/// assert!(!swords_only.applies(&StatContext::new().with("item_type", "axe")));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextCondition {
    /// Always applies.
    Always,
    /// Applies when `key` holds boolean `true`.
    Flag { key: String },
    /// Applies when `key` holds exactly `value`.
    Equals { key: String, value: serde_json::Value },
    /// Applies when `key` holds any of `values`.
    OneOf {
        key: String,
        values: Vec<serde_json::Value>,
    },
    /// Applies when every inner condition applies.
    All(Vec<ContextCondition>),
    /// Applies when at least one inner condition applies.
    Any(Vec<ContextCondition>),
}

impl StatCondition for ContextCondition {
    fn applies(&self, context: &StatContext) -> bool {
        match self {
            ContextCondition::Always => true,
            ContextCondition::Flag { key } => {
                matches!(context.raw(key), Some(serde_json::Value::Bool(true)))
            }
            ContextCondition::Equals { key, value } => context.raw(key) == Some(value),
            ContextCondition::OneOf { key, values } => context
                .raw(key)
                .is_some_and(|actual| values.contains(actual)),
            ContextCondition::All(inner) => inner.iter().all(|c| c.applies(context)),
            ContextCondition::Any(inner) => inner.iter().any(|c| c.applies(context)),
        }
    }
}
