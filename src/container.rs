//! Per-entity stat container.
//!
//! A `StatContainer` holds one entity's base values and active modifiers,
//! computes final values and reports changes. Every mutation recomputes
//! only the stats it touched.
//!
//! # Composition
//!
//! For each stat:
//!
//! 1. start from the explicit base, or the registry default;
//! 2. add the sum of all `FLAT` modifiers;
//! 3. multiply by `1 + Σ PERCENT_ADD`;
//! 4. multiply by `1 + v` for every `PERCENT_MULT` modifier.
//!
//! The container never clamps. Modifiers are kept in a sorted map, so the
//! same multiset of modifiers always folds in the same order and yields a
//! bit-identical result.
//!
//! # Locking
//!
//! State sits behind one mutex per container and every mutation, including
//! a multi-stat one, is applied under a single acquisition, so other
//! threads never see a half-applied mutation. Changes are queued in
//! mutation order before the state lock is released, then delivered with
//! no state lock held. Whichever caller finds the queue idle delivers
//! everything queued, so notifications from one container stay totally
//! ordered while listeners remain free to read or mutate any container,
//! including this one.

use crate::change::{StatValueChange, CHANGE_EPSILON};
use crate::error::StatError;
use crate::modifier::{ModifierOp, StatModifier};
use crate::registry::StatRegistry;
use crate::snapshot::StatSnapshot;
use crate::stat_id::{StatId, StatSourceId};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};

/// Callback a container invokes for every detected change.
pub(crate) type ChangeCallback =
    Box<dyn Fn(StatValueChange) -> Result<(), StatError> + Send + Sync>;

type ModifierKey = (ModifierOp, StatSourceId);

#[derive(Debug, Default)]
struct ContainerState {
    base: HashMap<StatId, f64>,
    modifiers: HashMap<StatId, BTreeMap<ModifierKey, f64>>,
    finals: HashMap<StatId, f64>,
}

impl ContainerState {
    fn base_value(&self, registry: &StatRegistry, stat_id: &StatId) -> f64 {
        self.base
            .get(stat_id)
            .copied()
            .unwrap_or_else(|| registry.default_base_value(stat_id))
    }

    fn compute(&self, registry: &StatRegistry, stat_id: &StatId) -> f64 {
        let base = self.base_value(registry, stat_id);
        match self.modifiers.get(stat_id) {
            Some(modifiers) => compose(base, modifiers),
            None => base,
        }
    }

    fn final_value(&self, registry: &StatRegistry, stat_id: &StatId) -> f64 {
        self.finals
            .get(stat_id)
            .copied()
            .unwrap_or_else(|| self.compute(registry, stat_id))
    }

    /// Recompute `stat_id`, cache it and report whether it moved.
    fn refresh(
        &mut self,
        registry: &StatRegistry,
        stat_id: &StatId,
        old_value: f64,
    ) -> Option<StatValueChange> {
        let new_value = self.compute(registry, stat_id);
        self.finals.insert(stat_id.clone(), new_value);
        let change = StatValueChange::new(stat_id.clone(), old_value, new_value);
        change.has_changed(CHANGE_EPSILON).then_some(change)
    }

    fn snapshot(&self, registry: &StatRegistry, stat_id: &StatId) -> Option<StatSnapshot> {
        let modifiers = self.modifiers.get(stat_id)?;
        let mut snapshot = StatSnapshot::new(
            stat_id.clone(),
            self.base_value(registry, stat_id),
            self.final_value(registry, stat_id),
        );
        for ((op, source), value) in modifiers {
            snapshot.insert(*op, source.clone(), *value);
        }
        Some(snapshot)
    }

    /// Remove every modifier whose source matches and recompute the touched
    /// stats in sorted order.
    fn clear_sources<F>(&mut self, registry: &StatRegistry, matches: F) -> Vec<StatValueChange>
    where
        F: Fn(&StatSourceId) -> bool,
    {
        let mut touched: Vec<StatId> = self
            .modifiers
            .iter()
            .filter(|(_, mods)| mods.keys().any(|(_, source)| matches(source)))
            .map(|(stat_id, _)| stat_id.clone())
            .collect();
        touched.sort();

        let mut changes = Vec::new();
        for stat_id in touched {
            let old_value = self.final_value(registry, &stat_id);
            if let Some(mods) = self.modifiers.get_mut(&stat_id) {
                mods.retain(|(_, source), _| !matches(source));
                if mods.is_empty() {
                    self.modifiers.remove(&stat_id);
                }
            }
            changes.extend(self.refresh(registry, &stat_id, old_value));
        }
        changes
    }
}

/// Changes waiting for delivery, and whether some caller is delivering.
#[derive(Debug, Default)]
struct DispatchQueue {
    pending: VecDeque<StatValueChange>,
    draining: bool,
}

/// Fold a stat's modifiers onto `base`.
fn compose(base: f64, modifiers: &BTreeMap<ModifierKey, f64>) -> f64 {
    let mut flat = 0.0;
    let mut percent_add = 0.0;
    let mut multiplier = 1.0;
    for ((op, _), value) in modifiers {
        match op {
            ModifierOp::Flat => flat += value,
            ModifierOp::PercentAdd => percent_add += value,
            ModifierOp::PercentMult => multiplier *= 1.0 + value,
        }
    }
    (base + flat) * (1.0 + percent_add) * multiplier
}

/// One entity's stats.
///
/// Obtained from [`StatService::get_container`](crate::service::StatService::get_container),
/// or created detached with [`StatContainer::new`] when no notifications are
/// needed.
///
/// # Examples
///
/// ```rust
/// use statcore::{StatContainer, StatModifier, StatRegistry};
/// use std::sync::Arc;
///
/// let registry = Arc::new(StatRegistry::with_defaults());
/// let container = StatContainer::new(registry.clone());
/// let max_health = registry.stat_id("max_health").unwrap();
///
/// container.add_modifier(StatModifier::flat(
///     max_health.clone(),
///     "item:chest:plate".parse().unwrap(),
///     4.0,
/// )?)?;
/// container.add_modifier(StatModifier::percent_add(
///     max_health.clone(),
///     "buff:regen".parse().unwrap(),
///     0.10,
/// )?)?;
///
/// assert!((container.final_value(&max_health) - 26.4).abs() < 1e-9);
/// # Ok::<(), statcore::StatError>(())
/// ```
pub struct StatContainer {
    registry: Arc<StatRegistry>,
    state: Mutex<ContainerState>,
    queue: Mutex<DispatchQueue>,
    on_change: Option<ChangeCallback>,
}

impl StatContainer {
    /// Create a detached container that reports changes to nobody.
    pub fn new(registry: Arc<StatRegistry>) -> Self {
        Self {
            registry,
            state: Mutex::new(ContainerState::default()),
            queue: Mutex::new(DispatchQueue::default()),
            on_change: None,
        }
    }

    pub(crate) fn with_callback(registry: Arc<StatRegistry>, on_change: ChangeCallback) -> Self {
        Self {
            on_change: Some(on_change),
            ..Self::new(registry)
        }
    }

    /// Overwrite the base value of `stat_id`.
    pub fn set_base(&self, stat_id: StatId, value: f64) -> Result<(), StatError> {
        ensure_finite(&stat_id, value)?;
        self.commit(|state, registry| {
            let old_value = state.final_value(registry, &stat_id);
            state.base.insert(stat_id.clone(), value);
            state.refresh(registry, &stat_id, old_value).into_iter().collect()
        })
    }

    /// Insert `modifier`, replacing any modifier with the same
    /// `(stat, op, source)`.
    pub fn add_modifier(&self, modifier: StatModifier) -> Result<(), StatError> {
        self.add_modifiers([modifier])
    }

    /// Insert several modifiers as one mutation.
    ///
    /// Readers see either none or all of them. Touched stats are recomputed
    /// once each and reported in sorted order. If any value is not finite
    /// nothing is applied.
    pub fn add_modifiers<I>(&self, modifiers: I) -> Result<(), StatError>
    where
        I: IntoIterator<Item = StatModifier>,
    {
        let modifiers: Vec<StatModifier> = modifiers.into_iter().collect();
        for modifier in &modifiers {
            ensure_finite(&modifier.stat_id, modifier.value)?;
        }
        self.commit(|state, registry| {
            let touched: BTreeSet<StatId> =
                modifiers.iter().map(|m| m.stat_id.clone()).collect();
            let previous: Vec<(StatId, f64)> = touched
                .into_iter()
                .map(|stat_id| {
                    let old_value = state.final_value(registry, &stat_id);
                    (stat_id, old_value)
                })
                .collect();
            for StatModifier {
                stat_id,
                source_id,
                op,
                value,
            } in modifiers
            {
                state
                    .modifiers
                    .entry(stat_id)
                    .or_default()
                    .insert((op, source_id), value);
            }
            previous
                .into_iter()
                .filter_map(|(stat_id, old_value)| state.refresh(registry, &stat_id, old_value))
                .collect()
        })
    }

    /// Remove one modifier. Returns whether it existed.
    pub fn remove_modifier(
        &self,
        stat_id: &StatId,
        op: ModifierOp,
        source_id: &StatSourceId,
    ) -> Result<bool, StatError> {
        let mut existed = false;
        self.commit(|state, registry| {
            let old_value = state.final_value(registry, stat_id);
            let Some(mods) = state.modifiers.get_mut(stat_id) else {
                return Vec::new();
            };
            existed = mods.remove(&(op, source_id.clone())).is_some();
            if mods.is_empty() {
                state.modifiers.remove(stat_id);
            }
            if !existed {
                return Vec::new();
            }
            state.refresh(registry, stat_id, old_value).into_iter().collect()
        })?;
        Ok(existed)
    }

    /// Remove every modifier carrying exactly `source_id`, on every stat
    /// and operation.
    pub fn clear_source(&self, source_id: &StatSourceId) -> Result<(), StatError> {
        self.commit(|state, registry| state.clear_sources(registry, |source| source == source_id))?;
        trace!(source = %source_id, "cleared source");
        Ok(())
    }

    /// Remove every modifier whose source is `prefix` or nested below it.
    ///
    /// Returns the distinct source ids that were removed.
    pub fn clear_source_prefix(
        &self,
        prefix: &StatSourceId,
    ) -> Result<Vec<StatSourceId>, StatError> {
        let mut removed = BTreeSet::new();
        self.commit(|state, registry| {
            removed = state
                .modifiers
                .values()
                .flat_map(|mods| mods.keys().map(|(_, source)| source))
                .filter(|source| source.is_under(prefix))
                .cloned()
                .collect();
            state.clear_sources(registry, |source| source.is_under(prefix))
        })?;
        if !removed.is_empty() {
            trace!(prefix = %prefix, sources = removed.len(), "cleared source prefix");
        }
        Ok(removed.into_iter().collect())
    }

    /// The current final value of `stat_id`.
    ///
    /// Stats that were never touched report their default base value.
    pub fn final_value(&self, stat_id: &StatId) -> f64 {
        self.state.lock().final_value(&self.registry, stat_id)
    }

    /// The base value of `stat_id`, explicit or default.
    pub fn base_value(&self, stat_id: &StatId) -> f64 {
        self.state.lock().base_value(&self.registry, stat_id)
    }

    /// Snapshot of one stat, or `None` if it has no modifiers.
    pub fn snapshot(&self, stat_id: &StatId) -> Option<StatSnapshot> {
        self.state.lock().snapshot(&self.registry, stat_id)
    }

    /// Consistent snapshot of every stat that has modifiers, sorted by stat.
    pub fn debug_view(&self) -> Vec<StatSnapshot> {
        let state = self.state.lock();
        let mut stat_ids: Vec<&StatId> = state.modifiers.keys().collect();
        stat_ids.sort();
        stat_ids
            .into_iter()
            .filter_map(|stat_id| state.snapshot(&self.registry, stat_id))
            .collect()
    }

    /// Every source id with at least one active modifier.
    pub fn source_ids(&self) -> BTreeSet<StatSourceId> {
        self.state
            .lock()
            .modifiers
            .values()
            .flat_map(|mods| mods.keys().map(|(_, source)| source.clone()))
            .collect()
    }

    /// Number of active modifiers across all stats.
    pub fn modifier_count(&self) -> usize {
        self.state.lock().modifiers.values().map(BTreeMap::len).sum()
    }

    /// The registry this container reads defaults from.
    pub fn registry(&self) -> &Arc<StatRegistry> {
        &self.registry
    }

    /// Apply `mutate` under the state lock, queue the changes it reports in
    /// order, then deliver with the state lock released.
    fn commit<F>(&self, mutate: F) -> Result<(), StatError>
    where
        F: FnOnce(&mut ContainerState, &StatRegistry) -> Vec<StatValueChange>,
    {
        {
            let mut state = self.state.lock();
            let changes = mutate(&mut *state, &*self.registry);
            if changes.is_empty() || self.on_change.is_none() {
                return Ok(());
            }
            self.queue.lock().pending.extend(changes);
        }
        self.drain()
    }

    /// Deliver queued changes unless another caller already is.
    ///
    /// The first callback error stops delivery and discards whatever is
    /// still queued.
    fn drain(&self) -> Result<(), StatError> {
        let Some(on_change) = &self.on_change else {
            return Ok(());
        };
        {
            let mut queue = self.queue.lock();
            if queue.draining {
                return Ok(());
            }
            queue.draining = true;
        }
        let _reset = ResetOnPanic(&self.queue);
        loop {
            let change = {
                let mut queue = self.queue.lock();
                match queue.pending.pop_front() {
                    Some(change) => change,
                    None => {
                        queue.draining = false;
                        return Ok(());
                    }
                }
            };
            trace!(
                stat = %change.stat_id,
                old = change.old_value,
                new = change.new_value,
                "stat changed"
            );
            if let Err(err) = on_change(change) {
                let mut queue = self.queue.lock();
                let dropped = queue.pending.len();
                queue.pending.clear();
                queue.draining = false;
                if dropped > 0 {
                    warn!(dropped, error = %err, "change delivery aborted");
                }
                return Err(err);
            }
        }
    }
}

/// Releases the dispatch queue if a callback panics mid-delivery.
struct ResetOnPanic<'a>(&'a Mutex<DispatchQueue>);

impl Drop for ResetOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut queue = self.0.lock();
            queue.pending.clear();
            queue.draining = false;
        }
    }
}

fn ensure_finite(stat_id: &StatId, value: f64) -> Result<(), StatError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(StatError::NonFiniteValue {
            stat: stat_id.clone(),
            value,
        })
    }
}

impl fmt::Debug for StatContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatContainer")
            .field("modifiers", &self.modifier_count())
            .field("notifies", &self.on_change.is_some())
            .finish()
    }
}
