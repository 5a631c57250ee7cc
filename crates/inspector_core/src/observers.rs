//! The two host-ECS observers: lifecycle (spawn/despawn) and the per-tick
//! position scan with throttled full refreshes.
//!
//! Both run on the world thread. The tick observer keeps a per-entity
//! tracked position; an axis delta above [`POSITION_EPSILON`] queues a
//! batched position update, and every tenth processed interval entities
//! that have not been fully refreshed for a second are re-collected.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use inspector_host::introspect::{ReflectedValue, Scalar};
use inspector_host::world::{uuid_ref_index, EntityHandle, HostWorld, WorldObserver};

use crate::model::PositionUpdate;
use crate::service::Inspector;

/// Minimum axis movement that counts as a position change.
const POSITION_EPSILON: f64 = 0.01;

/// Every Nth processed interval, consider full refreshes.
const FULL_UPDATE_EVERY_INTERVALS: u64 = 10;

/// Minimum wall-clock gap between full refreshes of one entity.
const FULL_UPDATE_MIN_MILLIS: i64 = 1_000;

/// Spawn/despawn observer. Only entities with a transform are observed.
pub struct LifecycleObserver {
    inspector: Arc<Inspector>,
}

impl LifecycleObserver {
    #[must_use]
    pub fn new(inspector: Arc<Inspector>) -> Self {
        Self { inspector }
    }
}

impl WorldObserver for LifecycleObserver {
    fn entity_added(&self, handle: &EntityHandle) {
        if handle.get("TransformComponent").is_none() {
            return;
        }
        let config = self.inspector.config();
        if !config.enabled {
            return;
        }
        if let Some(collected) = self
            .inspector
            .collector()
            .collect_from_handle(&config, handle)
        {
            self.inspector.on_entity_spawn(collected);
        }
    }

    fn entity_removed(&self, handle: &EntityHandle) {
        if handle.get("TransformComponent").is_none() {
            return;
        }
        if !self.inspector.config().enabled {
            return;
        }
        let uuid = handle.uuid();
        // Without an identity there is nothing stable to key on; a
        // monotonic nanosecond stamp at least yields a unique removal id.
        let entity_id = uuid
            .as_deref()
            .map(uuid_ref_index)
            .unwrap_or_else(|| chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());
        self.inspector.on_entity_despawn(entity_id, uuid);
    }
}

#[derive(Debug, Clone, Copy)]
struct TrackedPosition {
    x: f64,
    y: f64,
    z: f64,
    yaw: f32,
    pitch: f32,
    last_full_update: i64,
}

#[derive(Default)]
struct TickState {
    tick_counter: u32,
    processed_intervals: u64,
    tracked: HashMap<i64, TrackedPosition>,
}

/// Per-tick observer: throttled position-delta batching plus periodic
/// full-component refresh.
pub struct TickObserver {
    inspector: Arc<Inspector>,
    state: Mutex<TickState>,
}

impl TickObserver {
    #[must_use]
    pub fn new(inspector: Arc<Inspector>) -> Self {
        Self {
            inspector,
            state: Mutex::new(TickState::default()),
        }
    }
}

impl WorldObserver for TickObserver {
    fn entity_removed(&self, handle: &EntityHandle) {
        let entity_id = handle
            .uuid()
            .as_deref()
            .map(uuid_ref_index)
            .unwrap_or_else(|| handle.ref_index());
        self.state.lock().tracked.remove(&entity_id);
    }

    fn tick(&self, world: &HostWorld) {
        let config = self.inspector.config();
        if !config.enabled {
            return;
        }

        {
            let mut state = self.state.lock();
            state.tick_counter += 1;
            if state.tick_counter < config.update_interval_ticks {
                return;
            }
            state.tick_counter = 0;
            state.processed_intervals += 1;
        }

        let consider_full_updates = {
            let state = self.state.lock();
            state.processed_intervals % FULL_UPDATE_EVERY_INTERVALS == 0
        };
        let now = chrono::Utc::now().timestamp_millis();

        for chunk in world.chunks() {
            if !chunk
                .component_types()
                .iter()
                .any(|name| name == "TransformComponent")
            {
                continue;
            }
            for handle in chunk.handles() {
                self.observe_entity(&config, handle, consider_full_updates, now);
            }
        }
    }
}

impl TickObserver {
    fn observe_entity(
        &self,
        config: &crate::config::InspectorConfig,
        handle: &EntityHandle,
        consider_full_updates: bool,
        now: i64,
    ) {
        let Some(transform) = handle.get("TransformComponent") else {
            return;
        };
        if !self.inspector.collector().included(config, handle) {
            return;
        }

        let reflection = transform.reflect();
        let Some(ReflectedValue::Scalar(Scalar::Vec3([x, y, z]))) = reflection.field("position")
        else {
            return;
        };
        let (x, y, z) = (*x, *y, *z);
        let yaw = match reflection.field("yaw") {
            Some(ReflectedValue::Scalar(Scalar::Float(v))) => *v as f32,
            _ => 0.0,
        };
        let pitch = match reflection.field("pitch") {
            Some(ReflectedValue::Scalar(Scalar::Float(v))) => *v as f32,
            _ => 0.0,
        };

        let uuid = handle.uuid();
        let entity_id = uuid
            .as_deref()
            .map(uuid_ref_index)
            .unwrap_or_else(|| handle.ref_index());

        let (moved, due_full_update) = {
            let mut state = self.state.lock();
            match state.tracked.get_mut(&entity_id) {
                Some(tracked) => {
                    let moved = (x - tracked.x).abs() > POSITION_EPSILON
                        || (y - tracked.y).abs() > POSITION_EPSILON
                        || (z - tracked.z).abs() > POSITION_EPSILON;
                    if moved {
                        tracked.x = x;
                        tracked.y = y;
                        tracked.z = z;
                        tracked.yaw = yaw;
                        tracked.pitch = pitch;
                    }
                    let due = consider_full_updates
                        && now - tracked.last_full_update >= FULL_UPDATE_MIN_MILLIS;
                    if due {
                        tracked.last_full_update = now;
                    }
                    (moved, due)
                }
                None => {
                    // First sight of this entity counts as movement so the
                    // stream picks it up immediately; the spawn event just
                    // delivered full component data.
                    state.tracked.insert(
                        entity_id,
                        TrackedPosition {
                            x,
                            y,
                            z,
                            yaw,
                            pitch,
                            last_full_update: now,
                        },
                    );
                    (true, false)
                }
            }
        };

        if moved {
            self.inspector.queue_position_update(PositionUpdate {
                entity_id,
                uuid: uuid.clone(),
                x,
                y,
                z,
                yaw,
                pitch,
            });
        }

        if due_full_update {
            if let Some(collected) = self.inspector.collector().collect_from_handle(config, handle)
            {
                self.inspector.on_entity_update(collected);
            }
        }
    }
}
