//! The in-memory host world.
//!
//! Entities are ordered maps from component type name to a live
//! [`ObjectRef`]. Chunks are archetype groupings over the current entity
//! set, matching how the host runtime iterates its store. The reference
//! index of an entity within its chunk doubles as the entity id.
//!
//! All reads and writes are expected to happen on the world thread (see
//! [`crate::executor`]); the internal lock exists so handles held by the
//! inspector stay memory-safe even if the host misbehaves.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::clock::GameClock;
use crate::introspect::{ObjectRef, ReflectedValue, Scalar};

/// The host's stable entity id for a UUID: the 32-bit string hash widened
/// to `i64`. Chunk reference indices and lifecycle surrogate ids agree
/// because both derive from this.
#[must_use]
pub fn uuid_ref_index(uuid: &str) -> i64 {
    let mut hash: i32 = 0;
    for unit in uuid.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(i32::from(unit));
    }
    i64::from(hash)
}

/// Lifecycle and tick callbacks registered with the host world.
///
/// `entity_added` / `entity_removed` fire for every entity; observers
/// filter by the components they care about. `tick` fires once per world
/// tick, on the world thread.
pub trait WorldObserver: Send + Sync {
    fn entity_added(&self, _handle: &EntityHandle) {}
    fn entity_removed(&self, _handle: &EntityHandle) {}
    fn tick(&self, _world: &HostWorld) {}
}

struct EntityRecord {
    components: IndexMap<String, ObjectRef>,
}

struct WorldState {
    next_ref: i64,
    entities: IndexMap<i64, EntityRecord>,
}

/// The host world: entity storage, archetype chunk views, observers, and
/// the attached game clock.
pub struct HostWorld {
    id: String,
    name: String,
    clock: Arc<dyn GameClock>,
    state: RwLock<WorldState>,
    observers: RwLock<Vec<Arc<dyn WorldObserver>>>,
    tick_count: AtomicU64,
    self_ref: RwLock<Weak<HostWorld>>,
}

impl HostWorld {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        clock: Arc<dyn GameClock>,
    ) -> Arc<Self> {
        let world = Arc::new(Self {
            id: id.into(),
            name: name.into(),
            clock,
            state: RwLock::new(WorldState {
                next_ref: 1,
                entities: IndexMap::new(),
            }),
            observers: RwLock::new(Vec::new()),
            tick_count: AtomicU64::new(0),
            self_ref: RwLock::new(Weak::new()),
        });
        *world.self_ref.write() = Arc::downgrade(&world);
        world
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<dyn GameClock> {
        &self.clock
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }

    fn handle(&self, ref_index: i64) -> EntityHandle {
        EntityHandle {
            world: self.self_ref.read().clone(),
            ref_index,
        }
    }

    pub fn register_observer(&self, observer: Arc<dyn WorldObserver>) {
        self.observers.write().push(observer);
    }

    // -- Entity lifecycle --

    /// Spawn a new entity with the given components, keyed by their simple
    /// type names. Observers are notified after the entity is stored.
    ///
    /// Entities carrying a `UuidComponent` get their reference index from
    /// [`uuid_ref_index`]; others get a sequential index.
    pub fn spawn(&self, components: Vec<ObjectRef>) -> EntityHandle {
        let ref_index = {
            let mut state = self.state.write();

            let mut map = IndexMap::new();
            for component in components {
                map.insert(component.type_name().to_string(), component);
            }

            let uuid = map.get("UuidComponent").and_then(|c| {
                match c.reflect().field("uuid") {
                    Some(ReflectedValue::Scalar(Scalar::Uuid(value))) => Some(value.clone()),
                    _ => None,
                }
            });
            let ref_index = match uuid {
                Some(uuid) => {
                    let candidate = uuid_ref_index(&uuid);
                    if state.entities.contains_key(&candidate) {
                        let fallback = state.next_ref;
                        state.next_ref += 1;
                        fallback
                    } else {
                        candidate
                    }
                }
                None => {
                    let fallback = state.next_ref;
                    state.next_ref += 1;
                    fallback
                }
            };

            state.entities.insert(ref_index, EntityRecord { components: map });
            ref_index
        };

        let handle = self.handle(ref_index);
        debug!(ref_index, "entity spawned");
        let observers: Vec<_> = self.observers.read().clone();
        for observer in observers {
            observer.entity_added(&handle);
        }
        handle
    }

    /// Despawn an entity. Observers are notified *before* removal so they
    /// can still read identifying components.
    pub fn despawn(&self, ref_index: i64) -> bool {
        if !self.state.read().entities.contains_key(&ref_index) {
            return false;
        }

        let handle = self.handle(ref_index);
        let observers: Vec<_> = self.observers.read().clone();
        for observer in observers {
            observer.entity_removed(&handle);
        }

        let removed = self.state.write().entities.shift_remove(&ref_index).is_some();
        debug!(ref_index, "entity despawned");
        removed
    }

    #[must_use]
    pub fn entity(&self, ref_index: i64) -> Option<EntityHandle> {
        self.state
            .read()
            .entities
            .contains_key(&ref_index)
            .then(|| self.handle(ref_index))
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.state.read().entities.len()
    }

    // -- Component operations --

    /// Attach (or replace) a component on an entity.
    pub fn add_component(&self, ref_index: i64, component: ObjectRef) -> bool {
        let mut state = self.state.write();
        match state.entities.get_mut(&ref_index) {
            Some(record) => {
                record
                    .components
                    .insert(component.type_name().to_string(), component);
                true
            }
            None => false,
        }
    }

    pub fn remove_component(&self, ref_index: i64, type_name: &str) -> bool {
        let mut state = self.state.write();
        state
            .entities
            .get_mut(&ref_index)
            .map(|record| record.components.shift_remove(type_name).is_some())
            .unwrap_or(false)
    }

    // -- Lookup --

    /// Find an entity by the UUID carried in its `UuidComponent`.
    #[must_use]
    pub fn find_by_uuid(&self, uuid: &str) -> Option<EntityHandle> {
        let found = {
            let state = self.state.read();
            let mut found = None;
            for (&ref_index, record) in &state.entities {
                if let Some(component) = record.components.get("UuidComponent") {
                    if let Some(ReflectedValue::Scalar(Scalar::Uuid(value))) =
                        component.reflect().field("uuid")
                    {
                        if value.as_str() == uuid {
                            found = Some(ref_index);
                            break;
                        }
                    }
                }
            }
            found
        };
        found.map(|ref_index| self.handle(ref_index))
    }

    /// Handles for every connected player (entities carrying a `Player`
    /// component).
    #[must_use]
    pub fn players(&self) -> Vec<EntityHandle> {
        let refs: Vec<i64> = {
            let state = self.state.read();
            state
                .entities
                .iter()
                .filter(|(_, record)| record.components.contains_key("Player"))
                .map(|(&ref_index, _)| ref_index)
                .collect()
        };
        refs.into_iter().map(|r| self.handle(r)).collect()
    }

    // -- Chunk views --

    /// Group the current entity set by archetype.
    ///
    /// The returned chunks are a point-in-time view; handles inside them
    /// stay valid for as long as their entities live.
    #[must_use]
    pub fn chunks(&self) -> Vec<Chunk> {
        let groups: Vec<(Vec<String>, Vec<i64>)> = {
            let state = self.state.read();
            let mut by_archetype: IndexMap<BTreeSet<String>, Vec<i64>> = IndexMap::new();
            for (&ref_index, record) in &state.entities {
                let archetype: BTreeSet<String> =
                    record.components.keys().cloned().collect();
                by_archetype.entry(archetype).or_default().push(ref_index);
            }
            by_archetype
                .into_iter()
                .map(|(types, refs)| (types.into_iter().collect(), refs))
                .collect()
        };

        groups
            .into_iter()
            .map(|(component_types, refs)| Chunk {
                component_types,
                slots: refs.into_iter().map(|r| self.handle(r)).collect(),
            })
            .collect()
    }

    // -- Tick --

    /// Advance the world by one tick and notify tick observers.
    pub fn tick(&self) {
        self.tick_count.fetch_add(1, Ordering::Relaxed);
        let observers: Vec<_> = self.observers.read().clone();
        for observer in observers {
            observer.tick(self);
        }
    }
}

// ---------------------------------------------------------------------------
// Entity handles
// ---------------------------------------------------------------------------

/// A direct handle to one entity.
///
/// Handles hold a weak world reference; every access is best-effort and
/// returns `None` once the entity (or the world) is gone.
#[derive(Clone)]
pub struct EntityHandle {
    world: Weak<HostWorld>,
    ref_index: i64,
}

impl EntityHandle {
    /// The entity's reference index — its id in snapshots.
    #[must_use]
    pub fn ref_index(&self) -> i64 {
        self.ref_index
    }

    /// Fetch a component by simple type name.
    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<ObjectRef> {
        let world = self.world.upgrade()?;
        let state = world.state.read();
        state
            .entities
            .get(&self.ref_index)
            .and_then(|record| record.components.get(type_name).cloned())
    }

    /// All components in insertion order.
    #[must_use]
    pub fn components(&self) -> Vec<(String, ObjectRef)> {
        let Some(world) = self.world.upgrade() else {
            return Vec::new();
        };
        let state = world.state.read();
        state
            .entities
            .get(&self.ref_index)
            .map(|record| {
                record
                    .components
                    .iter()
                    .map(|(name, obj)| (name.clone(), obj.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The entity's component type names, in insertion order.
    #[must_use]
    pub fn component_types(&self) -> Vec<String> {
        self.components().into_iter().map(|(name, _)| name).collect()
    }

    /// The UUID from the entity's `UuidComponent`, if present.
    #[must_use]
    pub fn uuid(&self) -> Option<String> {
        let component = self.get("UuidComponent")?;
        match component.reflect().field("uuid") {
            Some(ReflectedValue::Scalar(Scalar::Uuid(value))) => Some(value.clone()),
            _ => None,
        }
    }

    /// Attach a component to this entity.
    pub fn attach(&self, component: ObjectRef) -> bool {
        self.world
            .upgrade()
            .map(|world| world.add_component(self.ref_index, component))
            .unwrap_or(false)
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.world
            .upgrade()
            .map(|world| world.state.read().entities.contains_key(&self.ref_index))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EntityHandle({})", self.ref_index)
    }
}

/// A contiguous archetype grouping of entities.
pub struct Chunk {
    component_types: Vec<String>,
    slots: Vec<EntityHandle>,
}

impl Chunk {
    /// The component type names shared by every entity in this chunk.
    #[must_use]
    pub fn component_types(&self) -> &[String] {
        &self.component_types
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The entity handle at a chunk slot.
    #[must_use]
    pub fn handle(&self, index: usize) -> Option<&EntityHandle> {
        self.slots.get(index)
    }

    /// The reference index (entity id) at a chunk slot.
    #[must_use]
    pub fn ref_index(&self, index: usize) -> Option<i64> {
        self.slots.get(index).map(EntityHandle::ref_index)
    }

    pub fn handles(&self) -> impl Iterator<Item = &EntityHandle> {
        self.slots.iter()
    }
}
