//! Stat registry module.
//!
//! The registry is the catalog of known stats and their default base
//! values. It is built once at startup, handed to a
//! [`StatService`](crate::service::StatService) behind an `Arc`, and never
//! mutated afterwards, so concurrent reads need no locking.

use crate::condition::{ContextCondition, StatCondition};
use crate::context::StatContext;
use crate::error::StatError;
use crate::stat_id::StatId;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Definition of a single stat.
#[derive(Debug, Clone)]
pub struct StatDefinition {
    /// The stat identifier.
    pub id: StatId,
    /// Base value used when a container has no explicit base.
    pub default_base: f64,
    /// Optional applicability predicate for upstream bonus logic.
    pub condition: Option<Arc<dyn StatCondition>>,
}

/// Immutable catalog of known stats.
///
/// Stats that were never registered are still usable everywhere; they
/// simply default to a base value of `0.0`.
///
/// # Examples
///
/// ```rust
/// use statcore::StatRegistry;
///
/// let registry = StatRegistry::with_defaults();
/// let max_health = registry.stat_id("max_health").unwrap();
///
/// assert_eq!(registry.default_base_value(&max_health), 20.0);
/// assert_eq!(registry.default_base_value(&"mana".parse().unwrap()), 0.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StatRegistry {
    stats: BTreeMap<StatId, StatDefinition>,
}

/// Standard attributes of the host runtime and their base values.
const DEFAULT_STATS: &[(&str, f64)] = &[
    ("max_health", 20.0),
    ("armor", 0.0),
    ("armor_toughness", 0.0),
    ("attack_damage", 1.0),
    ("attack_speed", 4.0),
    ("movement_speed", 0.1),
    ("knockback_resistance", 0.0),
    ("luck", 0.0),
];

impl StatRegistry {
    /// Start building a registry.
    pub fn builder() -> StatRegistryBuilder {
        StatRegistryBuilder::default()
    }

    /// A registry with the host's standard attributes.
    pub fn with_defaults() -> Self {
        let stats: BTreeMap<StatId, StatDefinition> = DEFAULT_STATS
            .iter()
            .map(|&(id, default_base)| {
                let id = StatId::from_static(id);
                let definition = StatDefinition {
                    id: id.clone(),
                    default_base,
                    condition: None,
                };
                (id, definition)
            })
            .collect();
        debug!(stats = stats.len(), "stat registry built");
        Self { stats }
    }

    /// Load a registry from a JSON document.
    ///
    /// ```json
    /// { "stats": [
    ///     { "id": "max_health", "default": 20.0 },
    ///     { "id": "sharpness_damage", "default": 0.0,
    ///       "condition": { "equals": { "key": "item_type", "value": "sword" } } }
    /// ] }
    /// ```
    ///
    /// A missing `default` means `0.0`.
    pub fn from_json(json: &str) -> Result<Self, StatError> {
        let config: RegistryConfig = serde_json::from_str(json)?;
        let mut builder = Self::builder();
        for entry in config.stats {
            let id = StatId::new(&entry.id).map_err(|e| StatError::Config(e.to_string()))?;
            if !entry.default.is_finite() {
                return Err(StatError::Config(format!(
                    "default for {} is not finite",
                    entry.id
                )));
            }
            builder = match entry.condition {
                Some(condition) => builder.conditional_stat(id, entry.default, condition),
                None => builder.stat(id, entry.default),
            };
        }
        builder.build()
    }

    /// All registered stat ids, in sorted order.
    pub fn stat_ids(&self) -> impl Iterator<Item = &StatId> {
        self.stats.keys()
    }

    /// Default base value of `stat_id`, or `0.0` if it is not registered.
    pub fn default_base_value(&self, stat_id: &StatId) -> f64 {
        self.stats
            .get(stat_id)
            .map(|def| def.default_base)
            .unwrap_or(0.0)
    }

    pub fn definition(&self, stat_id: &StatId) -> Option<&StatDefinition> {
        self.stats.get(stat_id)
    }

    /// The registry's own instance of a registered id.
    ///
    /// Reusing it avoids a fresh allocation per lookup.
    pub fn stat_id(&self, id: &str) -> Option<StatId> {
        self.stats
            .get_key_value(id)
            .map(|(stat_id, _)| stat_id.clone())
    }

    pub fn condition(&self, stat_id: &StatId) -> Option<&Arc<dyn StatCondition>> {
        self.stats.get(stat_id).and_then(|def| def.condition.as_ref())
    }

    /// Whether `stat_id` applies in `context`.
    ///
    /// Stats without a condition, and unregistered stats, always apply.
    pub fn applies(&self, stat_id: &StatId, context: &StatContext) -> bool {
        self.condition(stat_id)
            .map_or(true, |condition| condition.applies(context))
    }

    pub fn contains(&self, stat_id: &StatId) -> bool {
        self.stats.contains_key(stat_id)
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

/// Builder for [`StatRegistry`].
///
/// Registering an id twice keeps the last definition. A non-finite default
/// makes [`build`](Self::build) fail.
///
/// # Examples
///
/// ```rust
/// use statcore::condition::ContextCondition;
/// use statcore::{StatContext, StatId, StatRegistry};
///
/// let sharpness = StatId::new("sharpness_damage").unwrap();
/// let registry = StatRegistry::builder()
///     .stat(StatId::new("armor").unwrap(), 0.0)
///     .conditional_stat(
///         sharpness.clone(),
///         0.0,
///         ContextCondition::Equals { key: "item_type".into(), value: "sword".into() },
///     )
///     .build()
///     .unwrap();
///
/// assert!(registry.applies(&sharpness, &StatContext::new().with("item_type", "sword")));
/// assert!(!registry.applies(&sharpness, &StatContext::new().with("item_type", "bow")));
/// ```
#[derive(Debug, Default)]
pub struct StatRegistryBuilder {
    stats: BTreeMap<StatId, StatDefinition>,
    error: Option<StatError>,
}

impl StatRegistryBuilder {
    /// Register an unconditional stat.
    pub fn stat(self, id: StatId, default_base: f64) -> Self {
        self.define(id, default_base, None)
    }

    /// Register a stat with an applicability condition.
    pub fn conditional_stat(
        self,
        id: StatId,
        default_base: f64,
        condition: impl StatCondition + 'static,
    ) -> Self {
        self.define(id, default_base, Some(Arc::new(condition)))
    }

    fn define(
        mut self,
        id: StatId,
        default_base: f64,
        condition: Option<Arc<dyn StatCondition>>,
    ) -> Self {
        if !default_base.is_finite() {
            self.error.get_or_insert(StatError::NonFiniteValue {
                stat: id,
                value: default_base,
            });
            return self;
        }
        self.stats.insert(
            id.clone(),
            StatDefinition {
                id,
                default_base,
                condition,
            },
        );
        self
    }

    /// Finish the registry, failing with the first invalid definition.
    pub fn build(self) -> Result<StatRegistry, StatError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        debug!(stats = self.stats.len(), "stat registry built");
        Ok(StatRegistry { stats: self.stats })
    }
}

#[derive(Debug, Deserialize)]
struct RegistryConfig {
    #[serde(default)]
    stats: Vec<StatEntryConfig>,
}

#[derive(Debug, Deserialize)]
struct StatEntryConfig {
    id: String,
    #[serde(default)]
    default: f64,
    #[serde(default)]
    condition: Option<ContextCondition>,
}
