//! Stat service module.
//!
//! Provides the `StatService` type, the entry point of the engine. It owns
//! the entity → container map and fans out every detected change to the
//! registered listeners.

use crate::change::StatValueChange;
use crate::container::StatContainer;
use crate::entity::EntityKey;
use crate::error::StatError;
use crate::listener::{ListenerList, StatChangeListener};
use crate::registry::StatRegistry;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Owner of every entity's [`StatContainer`].
///
/// Containers are created lazily on first access and live until
/// [`remove_container`](Self::remove_container) is called; nothing expires
/// on its own.
///
/// # Examples
///
/// ```rust
/// use statcore::*;
/// use std::sync::{Arc, Mutex};
///
/// let registry = Arc::new(StatRegistry::with_defaults());
/// let service = StatService::new(registry.clone());
///
/// let changes = Arc::new(Mutex::new(Vec::new()));
/// let sink = changes.clone();
/// service.add_listener(Arc::new(move |change: &StatChange| -> Result<(), StatError> {
///     sink.lock().unwrap().push(change.clone());
///     Ok(())
/// }));
///
/// let player = EntityKey::random();
/// let max_health = registry.stat_id("max_health").unwrap();
/// service.get_container(player).add_modifier(StatModifier::flat(
///     max_health.clone(),
///     "item:chest:plate".parse()?,
///     4.0,
/// )?)?;
///
/// let changes = changes.lock().unwrap();
/// assert_eq!(changes.len(), 1);
/// assert_eq!((changes[0].old_value, changes[0].new_value), (20.0, 24.0));
/// # Ok::<(), StatError>(())
/// ```
pub struct StatService {
    registry: Arc<StatRegistry>,
    containers: RwLock<HashMap<EntityKey, Arc<StatContainer>>>,
    listeners: Arc<ListenerList>,
}

impl StatService {
    pub fn new(registry: Arc<StatRegistry>) -> Self {
        Self {
            registry,
            containers: RwLock::new(HashMap::new()),
            listeners: Arc::new(ListenerList::default()),
        }
    }

    pub fn registry(&self) -> &Arc<StatRegistry> {
        &self.registry
    }

    /// Get the container of `entity`, creating it on first access.
    ///
    /// Concurrent callers asking for the same entity all receive the same
    /// container.
    pub fn get_container(&self, entity: EntityKey) -> Arc<StatContainer> {
        if let Some(container) = self.containers.read().get(&entity) {
            return container.clone();
        }
        let mut containers = self.containers.write();
        containers
            .entry(entity)
            .or_insert_with(|| {
                debug!(%entity, "creating stat container");
                Arc::new(self.create_container(entity))
            })
            .clone()
    }

    /// The container of `entity`, if one exists. Never creates.
    pub fn container(&self, entity: &EntityKey) -> Option<Arc<StatContainer>> {
        self.containers.read().get(entity).cloned()
    }

    /// Drop the container of `entity`.
    ///
    /// The next [`get_container`](Self::get_container) for this key starts
    /// from defaults. Handles still held elsewhere keep working but are no
    /// longer reachable through the service.
    pub fn remove_container(&self, entity: &EntityKey) -> Option<Arc<StatContainer>> {
        let removed = self.containers.write().remove(entity);
        if removed.is_some() {
            debug!(%entity, "removed stat container");
        }
        removed
    }

    pub fn contains(&self, entity: &EntityKey) -> bool {
        self.containers.read().contains_key(entity)
    }

    pub fn container_count(&self) -> usize {
        self.containers.read().len()
    }

    /// Keys of every live container, sorted.
    pub fn entity_keys(&self) -> Vec<EntityKey> {
        let mut keys: Vec<EntityKey> = self.containers.read().keys().copied().collect();
        keys.sort();
        keys
    }

    /// Subscribe to every change on every entity.
    ///
    /// Registering the same `Arc` twice is a no-op.
    pub fn add_listener(&self, listener: Arc<dyn StatChangeListener>) {
        if self.listeners.add(listener) {
            debug!(listeners = self.listeners.len(), "stat listener added");
        }
    }

    /// Unsubscribe `listener`. Returns whether it was registered.
    pub fn remove_listener(&self, listener: &Arc<dyn StatChangeListener>) -> bool {
        let removed = self.listeners.remove(listener);
        if removed {
            debug!(listeners = self.listeners.len(), "stat listener removed");
        }
        removed
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn create_container(&self, entity: EntityKey) -> StatContainer {
        let listeners = Arc::clone(&self.listeners);
        StatContainer::with_callback(
            Arc::clone(&self.registry),
            Box::new(move |change: StatValueChange| -> Result<(), StatError> {
                listeners.dispatch(&change.attach(entity))
            }),
        )
    }
}

impl std::fmt::Debug for StatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatService")
            .field("stats", &self.registry.len())
            .field("containers", &self.container_count())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
