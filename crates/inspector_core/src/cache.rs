//! Bounded, insertion-ordered caches for entity snapshots and observed
//! packets, plus dotted-path expansion against the live reference maps.
//!
//! Each store sits behind a single lock so replacement and ordered
//! eviction are atomic. Eviction always happens on the insert path —
//! oldest first — keeping `len() ≤ max` an invariant rather than a
//! steady state.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;

use inspector_host::introspect::{ObjectRef, ReflectedValue, Reflection, WeakObjectRef};
use inspector_value::{is_redacted, ValueSerializer, REDACTED};

use crate::model::{EntitySnapshot, PacketLogEntry};

/// Live component references keyed by component type name.
///
/// References are weak: the host may drop or relocate components at any
/// time, so every dereference is best-effort.
pub type ComponentRefs = IndexMap<String, WeakObjectRef>;

/// One cached entity: the latest snapshot and its live reference map.
/// Both fields are always replaced together.
#[derive(Clone)]
pub struct CacheEntry {
    pub snapshot: EntitySnapshot,
    pub refs: ComponentRefs,
}

struct PacketEntry {
    entry: PacketLogEntry,
    /// The original live packet object, kept for deep expansion.
    object: ObjectRef,
}

/// The inspector's entity and packet stores.
pub struct InspectorCache {
    max_entities: AtomicUsize,
    max_packets: AtomicUsize,
    entities: Mutex<IndexMap<i64, CacheEntry>>,
    packets: Mutex<IndexMap<i64, PacketEntry>>,
    next_packet_id: AtomicI64,
}

impl InspectorCache {
    #[must_use]
    pub fn new(max_entities: usize, max_packets: usize) -> Self {
        Self {
            max_entities: AtomicUsize::new(max_entities.max(1)),
            max_packets: AtomicUsize::new(max_packets.max(1)),
            entities: Mutex::new(IndexMap::new()),
            packets: Mutex::new(IndexMap::new()),
            next_packet_id: AtomicI64::new(0),
        }
    }

    // -- Entities --

    /// Store a snapshot and its live refs, replacing both atomically.
    /// Evicts oldest entries past the cap.
    pub fn put_entity(&self, entity_id: i64, snapshot: EntitySnapshot, refs: ComponentRefs) {
        let max = self.max_entities.load(Ordering::Relaxed);
        let mut entities = self.entities.lock();
        entities.insert(entity_id, CacheEntry { snapshot, refs });
        while entities.len() > max {
            entities.shift_remove_index(0);
        }
    }

    pub fn remove_entity(&self, entity_id: i64) -> bool {
        self.entities.lock().shift_remove(&entity_id).is_some()
    }

    #[must_use]
    pub fn get_entity(&self, entity_id: i64) -> Option<CacheEntry> {
        self.entities.lock().get(&entity_id).cloned()
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.lock().len()
    }

    /// All cached snapshots in insertion order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<EntitySnapshot> {
        self.entities
            .lock()
            .values()
            .map(|entry| entry.snapshot.clone())
            .collect()
    }

    #[must_use]
    pub fn entity_ids(&self) -> Vec<i64> {
        self.entities.lock().keys().copied().collect()
    }

    /// Tighten (or widen) the entity cap; excess entries are evicted
    /// oldest-first immediately.
    pub fn set_max_entities(&self, max: usize) {
        let max = max.max(1);
        self.max_entities.store(max, Ordering::Relaxed);
        let mut entities = self.entities.lock();
        while entities.len() > max {
            entities.shift_remove_index(0);
        }
    }

    // -- Packets --

    /// Store a packet entry plus its live object, assigning a monotonic
    /// packet id. Returns the assigned id.
    pub fn put_packet(&self, mut entry: PacketLogEntry, object: ObjectRef) -> i64 {
        let id = self.next_packet_id.fetch_add(1, Ordering::Relaxed) + 1;
        entry.id = id;

        let max = self.max_packets.load(Ordering::Relaxed);
        let mut packets = self.packets.lock();
        packets.insert(id, PacketEntry { entry, object });
        while packets.len() > max {
            packets.shift_remove_index(0);
        }
        id
    }

    #[must_use]
    pub fn get_packet(&self, packet_id: i64) -> Option<PacketLogEntry> {
        self.packets.lock().get(&packet_id).map(|p| p.entry.clone())
    }

    #[must_use]
    pub fn packet_count(&self) -> usize {
        self.packets.lock().len()
    }

    /// Drop everything. Used at teardown.
    pub fn clear(&self) {
        self.entities.lock().clear();
        self.packets.lock().clear();
    }

    // -- Path expansion --

    /// Resolve a dotted path against an entity's live reference map and
    /// deep-serialize the terminal value.
    ///
    /// The first segment is a component type name; the rest are field
    /// names or decimal sequence indices. Any miss — unknown component,
    /// dead reference, absent field, bad index — yields `None`.
    #[must_use]
    pub fn expand_entity_path(&self, entity_id: i64, path: &str) -> Option<Value> {
        let mut segments = path.split('.');
        let component_name = segments.next().filter(|s| !s.is_empty())?;

        let weak = {
            let entities = self.entities.lock();
            entities.get(&entity_id)?.refs.get(component_name)?.clone()
        };
        let component = weak.upgrade()?;

        let value = resolve_segments(ReflectedValue::Object(component), segments)?;
        Some(ValueSerializer::new().serialize_value_deep(&value))
    }

    /// Packet analog of [`expand_entity_path`]: segments resolve against
    /// the stored live packet object. Redaction still applies.
    #[must_use]
    pub fn expand_packet_path(&self, packet_id: i64, path: &str) -> Option<Value> {
        let (object, packet_name) = {
            let packets = self.packets.lock();
            let entry = packets.get(&packet_id)?;
            (entry.object.clone(), entry.entry.packet_name.clone())
        };

        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return None;
        }
        if let Some(last) = segments.last() {
            if is_redacted(&packet_name, last) {
                return Some(Value::String(REDACTED.to_string()));
            }
        }

        let value = resolve_segments(ReflectedValue::Object(object), segments.into_iter())?;
        Some(ValueSerializer::for_packet(packet_name).serialize_value_deep(&value))
    }
}

/// Walk reflected values segment by segment.
fn resolve_segments<'a>(
    start: ReflectedValue,
    segments: impl Iterator<Item = &'a str>,
) -> Option<ReflectedValue> {
    let mut current = start;
    for segment in segments {
        current = step(&current, segment)?;
    }
    Some(current)
}

fn step(value: &ReflectedValue, segment: &str) -> Option<ReflectedValue> {
    match value {
        ReflectedValue::Scalar(_) => None,
        ReflectedValue::Sequence(items) => {
            let index: usize = segment.parse().ok()?;
            items.get(index).cloned()
        }
        ReflectedValue::Mapping(entries) => entries
            .iter()
            .find(|(key, _)| key == segment)
            .map(|(_, v)| v.clone()),
        ReflectedValue::Object(object) => match object.reflect() {
            Reflection::Scalar(_) => None,
            Reflection::Sequence(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index).cloned()
            }
            Reflection::Mapping(entries) | Reflection::Fields(entries) => entries
                .into_iter()
                .find(|(key, _)| key == segment)
                .map(|(_, v)| v),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use indexmap::IndexMap;
    use inspector_host::introspect::DynObject;
    use serde_json::json;

    use super::*;
    use crate::model::{PacketDirection, Position, Rotation};

    fn snapshot(id: i64) -> EntitySnapshot {
        EntitySnapshot {
            entity_id: id,
            uuid: format!("uuid-{id}"),
            model_asset_id: None,
            entity_type: None,
            position: Position::default(),
            rotation: Rotation::default(),
            components: IndexMap::new(),
            timestamp: 0,
        }
    }

    fn refs_for(component: &str, object: &ObjectRef) -> ComponentRefs {
        let mut refs = ComponentRefs::new();
        refs.insert(component.to_string(), Arc::downgrade(object));
        refs
    }

    #[test]
    fn test_put_replaces_snapshot_and_refs_together() {
        let cache = InspectorCache::new(10, 10);
        let first: ObjectRef = DynObject::new("Foo")
            .field("bar", ReflectedValue::int(1))
            .into_ref();
        cache.put_entity(1, snapshot(1), refs_for("Foo", &first));

        let second: ObjectRef = DynObject::new("Foo")
            .field("bar", ReflectedValue::int(2))
            .into_ref();
        let mut updated = snapshot(1);
        updated.timestamp = 99;
        cache.put_entity(1, updated.clone(), refs_for("Foo", &second));

        let entry = cache.get_entity(1).unwrap();
        assert_eq!(entry.snapshot, updated);
        let live = entry.refs["Foo"].upgrade().unwrap();
        assert!(Arc::ptr_eq(&live, &second));
    }

    #[test]
    fn test_eviction_is_oldest_first() {
        let cache = InspectorCache::new(3, 10);
        for id in 1..=5 {
            cache.put_entity(id, snapshot(id), ComponentRefs::new());
        }
        assert_eq!(cache.entity_count(), 3);
        assert_eq!(cache.entity_ids(), vec![3, 4, 5]);
    }

    #[test]
    fn test_shrinking_cap_evicts_immediately() {
        let cache = InspectorCache::new(10, 10);
        for id in 1..=6 {
            cache.put_entity(id, snapshot(id), ComponentRefs::new());
        }
        cache.set_max_entities(2);
        assert_eq!(cache.entity_ids(), vec![5, 6]);
    }

    #[test]
    fn test_expand_entity_path_indexes_sequences() {
        let cache = InspectorCache::new(10, 10);
        let foo: ObjectRef = DynObject::new("Foo")
            .field(
                "bar",
                ReflectedValue::Sequence(vec![
                    ReflectedValue::int(10),
                    ReflectedValue::int(20),
                    ReflectedValue::int(30),
                ]),
            )
            .into_ref();
        cache.put_entity(7, snapshot(7), refs_for("Foo", &foo));

        assert_eq!(cache.expand_entity_path(7, "Foo.bar.1"), Some(json!(20)));
        assert_eq!(cache.expand_entity_path(7, "Foo.bar"), Some(json!([10, 20, 30])));
        assert_eq!(cache.expand_entity_path(7, "Foo.missing"), None);
        assert_eq!(cache.expand_entity_path(7, "Foo.bar.9"), None);
        assert_eq!(cache.expand_entity_path(7, "Nope.bar"), None);
        assert_eq!(cache.expand_entity_path(8, "Foo.bar"), None);
    }

    #[test]
    fn test_expand_entity_path_dead_ref_is_swallowed() {
        let cache = InspectorCache::new(10, 10);
        let foo: ObjectRef = DynObject::new("Foo")
            .field("bar", ReflectedValue::int(1))
            .into_ref();
        cache.put_entity(7, snapshot(7), refs_for("Foo", &foo));
        drop(foo);
        assert_eq!(cache.expand_entity_path(7, "Foo.bar"), None);
    }

    #[test]
    fn test_expand_path_deep_serializes_terminal_object() {
        let cache = InspectorCache::new(10, 10);
        let engine: ObjectRef = DynObject::new("Engine")
            .field("horsepower", ReflectedValue::int(450))
            .into_ref();
        let foo: ObjectRef = DynObject::new("Foo")
            .field("engine", ReflectedValue::Object(engine))
            .into_ref();
        cache.put_entity(7, snapshot(7), refs_for("Foo", &foo));

        let value = cache.expand_entity_path(7, "Foo.engine").unwrap();
        assert_eq!(value["horsepower"], json!(450));
    }

    #[test]
    fn test_packet_ids_are_monotonic_and_bounded() {
        let cache = InspectorCache::new(10, 2);
        let object: ObjectRef = DynObject::new("Move").into_ref();
        let entry = PacketLogEntry {
            id: 0,
            direction: PacketDirection::Inbound,
            packet_name: "Move".into(),
            packet_id: 4,
            handler_name: "MoveHandler".into(),
            data: json!({}),
            timestamp: 0,
        };

        let a = cache.put_packet(entry.clone(), object.clone());
        let b = cache.put_packet(entry.clone(), object.clone());
        let c = cache.put_packet(entry, object);
        assert!(a < b && b < c);
        assert_eq!(cache.packet_count(), 2);
        assert!(cache.get_packet(a).is_none());
        assert_eq!(cache.get_packet(c).unwrap().id, c);
    }

    #[test]
    fn test_expand_packet_path_redacts_terminal_field() {
        let cache = InspectorCache::new(10, 10);
        let object: ObjectRef = DynObject::new("Connect")
            .field("identityToken", ReflectedValue::str("secret"))
            .field("username", ReflectedValue::str("steve"))
            .into_ref();
        let entry = PacketLogEntry {
            id: 0,
            direction: PacketDirection::Inbound,
            packet_name: "Connect".into(),
            packet_id: 1,
            handler_name: "ConnectHandler".into(),
            data: json!({}),
            timestamp: 0,
        };
        let id = cache.put_packet(entry, object);

        assert_eq!(
            cache.expand_packet_path(id, "identityToken"),
            Some(json!(REDACTED))
        );
        assert_eq!(cache.expand_packet_path(id, "username"), Some(json!("steve")));
    }

    #[test]
    fn test_clear_empties_both_stores() {
        let cache = InspectorCache::new(10, 10);
        cache.put_entity(1, snapshot(1), ComponentRefs::new());
        cache.clear();
        assert_eq!(cache.entity_count(), 0);
        assert_eq!(cache.packet_count(), 0);
    }
}
