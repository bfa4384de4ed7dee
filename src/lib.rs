//! # statcore - Stat Aggregation and Change Notification
//!
//! Keeps, for every tracked entity, a set of named numeric stats whose
//! final values are derived from a base value plus contributions from many
//! independent sources (equipment, enchantments, temporary effects), and
//! tells interested observers when a final value changes.
//!
//! - **Deterministic** composition: the same set of modifiers always
//!   yields the same value, regardless of insertion order
//! - **Source-scoped** bulk removal ("unequip this item")
//! - **Quiet** change detection: differences within `1e-9` are not reported
//! - **Thread-safe**: one lock per entity, never held while listeners run
//!
//! ## Data Flow
//!
//! ```text
//! contributor ──add_modifier / clear_source──▶ StatContainer
//!                                                   │ StatValueChange
//!                                                   ▼
//!                        StatService ──StatChange──▶ listeners ──▶ StatBindingManager ──▶ StatBinding
//! ```
//!
//! ## Composition
//!
//! ```text
//! final = (base + Σ FLAT) × (1 + Σ PERCENT_ADD) × Π (1 + PERCENT_MULT)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use statcore::*;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(StatRegistry::with_defaults());
//! let service = StatService::new(registry.clone());
//!
//! let player = EntityKey::random();
//! let max_health = registry.stat_id("max_health").unwrap();
//! let chestplate: StatSourceId = "item:chest:plate".parse()?;
//!
//! let container = service.get_container(player);
//! container.add_modifier(StatModifier::flat(max_health.clone(), chestplate.clone(), 4.0)?)?;
//! assert_eq!(container.final_value(&max_health), 24.0);
//!
//! container.clear_source(&chestplate)?;
//! assert_eq!(container.final_value(&max_health), 20.0);
//! # Ok::<(), StatError>(())
//! ```
//!
//! ## Modules
//!
//! - [`stat_id`] - Stat and source identifiers
//! - [`entity`] - Entity keys
//! - [`registry`] - Catalog of known stats and defaults
//! - [`condition`] / [`context`] - Applicability predicates for bonus logic
//! - [`modifier`] - Modifiers and operation tiers
//! - [`container`] - Per-entity aggregation and change detection
//! - [`service`] - Container ownership and listener fan-out
//! - [`binding`] - Per-stat change handlers
//! - [`snapshot`] / [`change`] - Diagnostic views and change records
//! - [`error`] - Error types

pub mod binding;
pub mod change;
pub mod condition;
pub mod container;
pub mod context;
pub mod entity;
pub mod error;
pub mod listener;
pub mod modifier;
pub mod registry;
pub mod service;
pub mod snapshot;
pub mod stat_id;

// Re-export main types for convenience
pub use binding::{AttributeBinding, AttributeSink, StatBinding, StatBindingManager};
pub use change::{StatChange, StatValueChange, CHANGE_EPSILON};
pub use condition::{ContextCondition, StatCondition};
pub use container::StatContainer;
pub use context::StatContext;
pub use entity::EntityKey;
pub use error::StatError;
pub use listener::StatChangeListener;
pub use modifier::{ModifierOp, StatModifier};
pub use registry::{StatDefinition, StatRegistry, StatRegistryBuilder};
pub use service::StatService;
pub use snapshot::StatSnapshot;
pub use stat_id::{StatId, StatSourceId};
