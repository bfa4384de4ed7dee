//! Stat bindings.
//!
//! A binding reacts to changes of exactly one stat, typically by pushing
//! the new value into the host runtime. [`StatBindingManager`] routes
//! changes to the bindings registered for their stat and is itself just a
//! [`StatChangeListener`].

use crate::change::StatChange;
use crate::entity::EntityKey;
use crate::error::StatError;
use crate::listener::{same_handle, StatChangeListener};
use crate::stat_id::StatId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Handler for changes of one stat.
pub trait StatBinding: Send + Sync {
    /// The stat this binding handles.
    fn stat_id(&self) -> &StatId;

    fn on_stat_changed(&self, change: &StatChange) -> Result<(), StatError>;
}

/// Routes changes to per-stat bindings.
///
/// # Examples
///
/// ```rust
/// use statcore::*;
/// use std::sync::Arc;
///
/// struct LogSpeed(StatId);
///
/// impl StatBinding for LogSpeed {
///     fn stat_id(&self) -> &StatId {
///         &self.0
///     }
///
///     fn on_stat_changed(&self, change: &StatChange) -> Result<(), StatError> {
///         println!("{} attack speed -> {}", change.entity, change.new_value);
///         Ok(())
///     }
/// }
///
/// let registry = Arc::new(StatRegistry::with_defaults());
/// let service = StatService::new(registry.clone());
/// let bindings = Arc::new(StatBindingManager::new());
/// service.add_listener(bindings.clone());
///
/// let speed = registry.stat_id("attack_speed").unwrap();
/// bindings.register(Arc::new(LogSpeed(speed.clone())));
/// assert_eq!(bindings.bound_stats(), vec![speed]);
/// ```
#[derive(Default)]
pub struct StatBindingManager {
    bindings: RwLock<HashMap<StatId, Vec<Arc<dyn StatBinding>>>>,
}

impl StatBindingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `binding` under its stat id.
    ///
    /// Returns `false` if this exact binding was already registered.
    pub fn register(&self, binding: Arc<dyn StatBinding>) -> bool {
        let stat_id = binding.stat_id().clone();
        let mut bindings = self.bindings.write();
        let entry = bindings.entry(stat_id.clone()).or_default();
        if entry.iter().any(|b| same_handle(b, &binding)) {
            return false;
        }
        entry.push(binding);
        debug!(stat = %stat_id, bindings = entry.len(), "stat binding registered");
        true
    }

    /// Remove `binding`. The stat's entry is dropped with its last binding.
    pub fn unregister(&self, binding: &Arc<dyn StatBinding>) -> bool {
        let stat_id = binding.stat_id();
        let mut bindings = self.bindings.write();
        let Some(entry) = bindings.get_mut(stat_id) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|b| !same_handle(b, binding));
        let removed = entry.len() != before;
        if entry.is_empty() {
            bindings.remove(stat_id);
        }
        if removed {
            debug!(stat = %stat_id, "stat binding unregistered");
        }
        removed
    }

    /// Bindings for `stat_id`, in registration order.
    pub fn bindings_for(&self, stat_id: &StatId) -> Vec<Arc<dyn StatBinding>> {
        self.bindings
            .read()
            .get(stat_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Stats with at least one binding, sorted.
    pub fn bound_stats(&self) -> Vec<StatId> {
        let mut stats: Vec<StatId> = self.bindings.read().keys().cloned().collect();
        stats.sort();
        stats
    }

    /// Total number of registered bindings.
    pub fn len(&self) -> usize {
        self.bindings.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }
}

impl StatChangeListener for StatBindingManager {
    fn on_stat_changed(&self, change: &StatChange) -> Result<(), StatError> {
        for binding in self.bindings_for(&change.stat_id) {
            binding.on_stat_changed(change)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for StatBindingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatBindingManager")
            .field("stats", &self.bound_stats())
            .field("bindings", &self.len())
            .finish()
    }
}

/// A live attribute in the host runtime, e.g. an entity's max health.
///
/// Implementations translate host failures (entity gone, API rejected the
/// value) into `Err(message)`.
pub trait AttributeSink: Send + Sync {
    /// Set the attribute's base value.
    fn set_base(&self, entity: EntityKey, value: f64) -> Result<(), String>;

    /// The dependent current value (e.g. current health), if the attribute
    /// has one.
    fn current(&self, entity: EntityKey) -> Option<f64>;

    fn set_current(&self, entity: EntityKey, value: f64) -> Result<(), String>;
}

impl<S: AttributeSink + ?Sized> AttributeSink for Arc<S> {
    fn set_base(&self, entity: EntityKey, value: f64) -> Result<(), String> {
        (**self).set_base(entity, value)
    }

    fn current(&self, entity: EntityKey) -> Option<f64> {
        (**self).current(entity)
    }

    fn set_current(&self, entity: EntityKey, value: f64) -> Result<(), String> {
        (**self).set_current(entity, value)
    }
}

/// Binding that syncs a stat into an [`AttributeSink`].
///
/// With [`clamp_current`](Self::clamp_current) enabled, a current value
/// above the new maximum is lowered to it.
pub struct AttributeBinding<S> {
    stat_id: StatId,
    sink: S,
    clamp_current: bool,
}

impl<S: AttributeSink> AttributeBinding<S> {
    pub fn new(stat_id: StatId, sink: S) -> Self {
        Self {
            stat_id,
            sink,
            clamp_current: false,
        }
    }

    pub fn clamp_current(mut self, clamp: bool) -> Self {
        self.clamp_current = clamp;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn fail(&self, message: String) -> StatError {
        StatError::Binding {
            stat: self.stat_id.clone(),
            message,
        }
    }
}

impl<S: AttributeSink> StatBinding for AttributeBinding<S> {
    fn stat_id(&self) -> &StatId {
        &self.stat_id
    }

    fn on_stat_changed(&self, change: &StatChange) -> Result<(), StatError> {
        self.sink
            .set_base(change.entity, change.new_value)
            .map_err(|e| self.fail(e))?;
        if !self.clamp_current {
            return Ok(());
        }
        match self.sink.current(change.entity) {
            Some(current) if current > change.new_value => self
                .sink
                .set_current(change.entity, change.new_value)
                .map_err(|e| self.fail(e)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::StatValueChange;

    struct Fixed(StatId);

    impl StatBinding for Fixed {
        fn stat_id(&self) -> &StatId {
            &self.0
        }

        fn on_stat_changed(&self, _change: &StatChange) -> Result<(), StatError> {
            Ok(())
        }
    }

    fn id(s: &str) -> StatId {
        StatId::new(s).unwrap()
    }

    #[test]
    fn test_register_twice_is_noop() {
        let manager = StatBindingManager::new();
        let binding: Arc<dyn StatBinding> = Arc::new(Fixed(id("armor")));
        assert!(manager.register(binding.clone()));
        assert!(!manager.register(binding.clone()));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_unregister_last_frees_entry() {
        let manager = StatBindingManager::new();
        let first: Arc<dyn StatBinding> = Arc::new(Fixed(id("armor")));
        let second: Arc<dyn StatBinding> = Arc::new(Fixed(id("armor")));
        manager.register(first.clone());
        manager.register(second.clone());
        assert_eq!(manager.bindings_for(&id("armor")).len(), 2);

        assert!(manager.unregister(&first));
        assert_eq!(manager.bound_stats(), vec![id("armor")]);
        assert!(manager.unregister(&second));
        assert!(manager.is_empty());
        assert!(!manager.unregister(&second));
    }

    #[test]
    fn test_unbound_stat_is_ignored() {
        let manager = StatBindingManager::new();
        let change = StatValueChange::new(id("luck"), 0.0, 1.0).attach(EntityKey::random());
        assert!(manager.on_stat_changed(&change).is_ok());
    }
}
