//! Entity collection: live components → value-shaped snapshots plus the
//! parallel live-reference map used later by path expansion.
//!
//! Every entry point must run on the world thread; the collector itself
//! never schedules anything.

use indexmap::IndexMap;
use std::sync::Arc;

use inspector_host::introspect::{ObjectRef, ReflectedValue, Scalar};
use inspector_host::world::{uuid_ref_index, Chunk, EntityHandle, HostWorld};
use inspector_value::ValueSerializer;
use serde_json::Value;

use crate::cache::ComponentRefs;
use crate::config::InspectorConfig;
use crate::model::{ComponentData, EntitySnapshot, Position, Rotation};

/// A freshly collected snapshot and its live component references.
pub struct CollectedEntity {
    pub snapshot: EntitySnapshot,
    pub refs: ComponentRefs,
}

/// Builds [`EntitySnapshot`]s from chunks or direct handles.
#[derive(Debug, Default)]
pub struct EntityCollector {
    serializer: ValueSerializer,
}

impl EntityCollector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            serializer: ValueSerializer::new(),
        }
    }

    /// Whether the inclusion flags admit this entity.
    ///
    /// Classification is by component presence. Note that only NPCs get an
    /// `entityType` stamped on the snapshot — list filtering by type can
    /// therefore never match players or items even when they are included
    /// here; that asymmetry is part of the observed contract.
    #[must_use]
    pub fn included(&self, config: &InspectorConfig, handle: &EntityHandle) -> bool {
        if handle.get("NPCEntity").is_some() {
            return config.include_npcs;
        }
        if handle.get("Player").is_some() {
            return config.include_players;
        }
        if handle.get("Item").is_some() {
            return config.include_items;
        }
        true
    }

    /// Collect from a chunk slot. The entity id is the slot's reference
    /// index.
    #[must_use]
    pub fn collect_from_chunk(
        &self,
        config: &InspectorConfig,
        chunk: &Chunk,
        index: usize,
    ) -> Option<CollectedEntity> {
        let handle = chunk.handle(index)?;
        let entity_id = chunk.ref_index(index)?;
        if !self.included(config, handle) {
            return None;
        }
        Some(self.build(handle, entity_id))
    }

    /// Collect from a direct handle (lifecycle adds). The entity id is the
    /// 32-bit hash of the UUID string, falling back to the handle's
    /// reference index for identity-less entities.
    #[must_use]
    pub fn collect_from_handle(
        &self,
        config: &InspectorConfig,
        handle: &EntityHandle,
    ) -> Option<CollectedEntity> {
        if !self.included(config, handle) {
            return None;
        }
        let entity_id = handle
            .uuid()
            .map(|uuid| uuid_ref_index(&uuid))
            .unwrap_or_else(|| handle.ref_index());
        Some(self.build(handle, entity_id))
    }

    /// Collect by entity id: scan chunks until a slot with a matching
    /// reference index is found, stopping early.
    #[must_use]
    pub fn collect_by_id(
        &self,
        config: &InspectorConfig,
        world: &HostWorld,
        entity_id: i64,
    ) -> Option<CollectedEntity> {
        for chunk in world.chunks() {
            for index in 0..chunk.len() {
                if chunk.ref_index(index) == Some(entity_id) {
                    return self.collect_from_chunk(config, &chunk, index);
                }
            }
        }
        None
    }

    fn build(&self, handle: &EntityHandle, entity_id: i64) -> CollectedEntity {
        let mut components: IndexMap<String, ComponentData> = IndexMap::new();
        let mut refs: ComponentRefs = IndexMap::new();

        let mut position = Position::default();
        let mut rotation = Rotation::default();
        let mut model_asset_id = None;
        let mut entity_type = None;

        // Well-known components first, in a fixed order.
        if let Some(transform) = handle.get("TransformComponent") {
            let reflection = transform.reflect();
            if let Some(ReflectedValue::Scalar(Scalar::Vec3([x, y, z]))) =
                reflection.field("position")
            {
                position = Position {
                    x: *x,
                    y: *y,
                    z: *z,
                };
            }
            if let Some(ReflectedValue::Scalar(Scalar::Float(yaw))) = reflection.field("yaw") {
                rotation.yaw = *yaw as f32;
            }
            if let Some(ReflectedValue::Scalar(Scalar::Float(pitch))) = reflection.field("pitch") {
                rotation.pitch = *pitch as f32;
            }
            self.insert(&mut components, &mut refs, "TransformComponent", &transform);
        }

        if let Some(model) = handle.get("ModelComponent") {
            if let Some(ReflectedValue::Scalar(Scalar::Str(asset))) =
                model.reflect().field("assetId")
            {
                model_asset_id = Some(asset.clone());
            }
            self.insert(&mut components, &mut refs, "ModelComponent", &model);
        }

        if let Some(npc) = handle.get("NPCEntity") {
            entity_type = Some("NPC".to_string());
            self.insert(&mut components, &mut refs, "NPCEntity", &npc);
        }

        // Remaining archetype components, host order, skipping names we
        // already serialized.
        for (name, component) in handle.components() {
            if !components.contains_key(&name) {
                self.insert(&mut components, &mut refs, &name, &component);
            }
        }

        let snapshot = EntitySnapshot {
            entity_id,
            uuid: handle.uuid().unwrap_or_default(),
            model_asset_id,
            entity_type,
            position,
            rotation,
            components,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };

        CollectedEntity { snapshot, refs }
    }

    fn insert(
        &self,
        components: &mut IndexMap<String, ComponentData>,
        refs: &mut ComponentRefs,
        name: &str,
        component: &ObjectRef,
    ) {
        let fields = self
            .serializer
            .serialize_component_fields(component.as_ref())
            .map(Value::Object)
            .unwrap_or(Value::Null);
        components.insert(
            name.to_string(),
            ComponentData {
                type_name: name.to_string(),
                fields,
            },
        );
        refs.insert(name.to_string(), Arc::downgrade(component));
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;
    use inspector_host::behavior::Role;
    use inspector_host::clock::FixedClock;
    use inspector_host::components::{
        ItemComponent, ModelComponent, NpcComponent, PlayerComponent, TransformComponent,
        UuidComponent,
    };
    use inspector_host::world::HostWorld;

    use super::*;

    fn make_world() -> std::sync::Arc<HostWorld> {
        HostWorld::new("w", "Test", Arc::new(FixedClock::new(0, 1.0)))
    }

    fn spawn_npc(world: &HostWorld, uuid: &str, name: &str) -> EntityHandle {
        world.spawn(vec![
            Arc::new(TransformComponent::new(DVec3::new(1.0, 2.0, 3.0), 90.0, 0.0)),
            Arc::new(ModelComponent::new("models/cow")),
            Arc::new(UuidComponent::new(uuid)),
            Arc::new(NpcComponent::new(name, Arc::new(Role::named("cow", "roles/cow")))),
        ])
    }

    #[test]
    fn test_collect_from_handle_builds_snapshot() {
        let world = make_world();
        let uuid = "11111111-2222-3333-4444-555555555555";
        let handle = spawn_npc(&world, uuid, "Bessie");

        let collector = EntityCollector::new();
        let config = InspectorConfig::default();
        let collected = collector.collect_from_handle(&config, &handle).unwrap();

        let snapshot = &collected.snapshot;
        assert_eq!(snapshot.entity_id, uuid_ref_index(uuid));
        assert_eq!(snapshot.uuid, uuid);
        assert_eq!(snapshot.entity_type.as_deref(), Some("NPC"));
        assert_eq!(snapshot.model_asset_id.as_deref(), Some("models/cow"));
        assert_eq!(snapshot.position, Position { x: 1.0, y: 2.0, z: 3.0 });
        assert_eq!(snapshot.rotation.yaw, 90.0);

        // Well-known components lead, in fixed order.
        let names: Vec<_> = snapshot.components.keys().cloned().collect();
        assert_eq!(names[0], "TransformComponent");
        assert_eq!(names[1], "ModelComponent");
        assert_eq!(names[2], "NPCEntity");
        assert!(names.contains(&"UuidComponent".to_string()));

        // Live refs parallel the serialized components.
        assert_eq!(collected.refs.len(), snapshot.components.len());
        assert!(collected.refs["NPCEntity"].upgrade().is_some());
    }

    #[test]
    fn test_chunk_and_handle_ids_agree_for_uuid_entities() {
        let world = make_world();
        let uuid = "99999999-8888-7777-6666-555555555555";
        let handle = spawn_npc(&world, uuid, "Clover");

        let collector = EntityCollector::new();
        let config = InspectorConfig::default();

        let from_handle = collector.collect_from_handle(&config, &handle).unwrap();
        let from_id = collector
            .collect_by_id(&config, &world, from_handle.snapshot.entity_id)
            .unwrap();
        assert_eq!(from_handle.snapshot.entity_id, from_id.snapshot.entity_id);
    }

    #[test]
    fn test_inclusion_filter() {
        let world = make_world();
        let npc = spawn_npc(&world, "aaaaaaaa-0000-0000-0000-000000000001", "Npc");
        let player = world.spawn(vec![
            Arc::new(TransformComponent::new(DVec3::ZERO, 0.0, 0.0)),
            Arc::new(PlayerComponent),
        ]);
        let item = world.spawn(vec![
            Arc::new(TransformComponent::new(DVec3::ZERO, 0.0, 0.0)),
            Arc::new(ItemComponent::new("items/sword")),
        ]);

        let collector = EntityCollector::new();
        let mut config = InspectorConfig::default();
        // Defaults: NPCs and players in, items out.
        assert!(collector.collect_from_handle(&config, &npc).is_some());
        assert!(collector.collect_from_handle(&config, &player).is_some());
        assert!(collector.collect_from_handle(&config, &item).is_none());

        config.include_npcs = false;
        config.include_items = true;
        assert!(collector.collect_from_handle(&config, &npc).is_none());
        assert!(collector.collect_from_handle(&config, &item).is_some());
    }

    #[test]
    fn test_collect_by_id_miss_returns_none() {
        let world = make_world();
        spawn_npc(&world, "aaaaaaaa-0000-0000-0000-000000000002", "Npc");
        let collector = EntityCollector::new();
        let config = InspectorConfig::default();
        assert!(collector.collect_by_id(&config, &world, 123_456).is_none());
    }

    #[test]
    fn test_empty_component_serializes_as_null() {
        let world = make_world();
        let handle = world.spawn(vec![
            Arc::new(TransformComponent::new(DVec3::ZERO, 0.0, 0.0)),
            Arc::new(PlayerComponent),
        ]);
        let collector = EntityCollector::new();
        let config = InspectorConfig::default();
        let collected = collector.collect_from_handle(&config, &handle).unwrap();
        assert_eq!(collected.snapshot.components["Player"].fields, Value::Null);
    }
}
