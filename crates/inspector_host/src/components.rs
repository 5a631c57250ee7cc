//! Host component doubles.
//!
//! These are stand-ins for the game server's own component types: the
//! transform, model, and identity components every observable entity
//! carries, the NPC component with its role and alarm stores, timers,
//! alarms, and the handful of components the inspector's entity actions
//! write. The real host provides equivalents behind [`Introspect`]; the
//! doubles keep the same wire-visible field names.

use std::any::Any;
use std::sync::Arc;

use glam::DVec3;
use parking_lot::Mutex;

use crate::behavior::Role;
use crate::introspect::{Introspect, ObjectRef, ReflectedValue, Reflection, Scalar};

// ---------------------------------------------------------------------------
// Spatial / identity
// ---------------------------------------------------------------------------

/// World-space position and view rotation.
pub struct TransformComponent {
    position: Mutex<DVec3>,
    rotation: Mutex<(f32, f32)>,
}

impl TransformComponent {
    #[must_use]
    pub fn new(position: DVec3, yaw: f32, pitch: f32) -> Self {
        Self {
            position: Mutex::new(position),
            rotation: Mutex::new((yaw, pitch)),
        }
    }

    #[must_use]
    pub fn position(&self) -> DVec3 {
        *self.position.lock()
    }

    pub fn set_position(&self, position: DVec3) {
        *self.position.lock() = position;
    }

    /// `(yaw, pitch)` in degrees.
    #[must_use]
    pub fn rotation(&self) -> (f32, f32) {
        *self.rotation.lock()
    }

    pub fn set_rotation(&self, yaw: f32, pitch: f32) {
        *self.rotation.lock() = (yaw, pitch);
    }
}

impl Introspect for TransformComponent {
    fn type_name(&self) -> &str {
        "TransformComponent"
    }

    fn reflect(&self) -> Reflection {
        let position = self.position();
        let (yaw, pitch) = self.rotation();
        Reflection::Fields(vec![
            (
                "position".into(),
                ReflectedValue::Scalar(Scalar::Vec3([position.x, position.y, position.z])),
            ),
            ("yaw".into(), ReflectedValue::float(f64::from(yaw))),
            ("pitch".into(), ReflectedValue::float(f64::from(pitch))),
        ])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The visual model an entity renders with.
pub struct ModelComponent {
    asset_id: String,
}

impl ModelComponent {
    #[must_use]
    pub fn new(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
        }
    }

    #[must_use]
    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }
}

impl Introspect for ModelComponent {
    fn type_name(&self) -> &str {
        "ModelComponent"
    }

    fn reflect(&self) -> Reflection {
        Reflection::Fields(vec![(
            "assetId".into(),
            ReflectedValue::str(self.asset_id.clone()),
        )])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Stable entity identity.
pub struct UuidComponent {
    uuid: String,
}

impl UuidComponent {
    #[must_use]
    pub fn new(uuid: impl Into<String>) -> Self {
        Self { uuid: uuid.into() }
    }

    #[must_use]
    pub fn random() -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
        }
    }

    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }
}

impl Introspect for UuidComponent {
    fn type_name(&self) -> &str {
        "UuidComponent"
    }

    fn reflect(&self) -> Reflection {
        Reflection::Fields(vec![(
            "uuid".into(),
            ReflectedValue::Scalar(Scalar::Uuid(self.uuid.clone())),
        )])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Marker for player-controlled entities.
pub struct PlayerComponent;

impl Introspect for PlayerComponent {
    fn type_name(&self) -> &str {
        "Player"
    }

    fn reflect(&self) -> Reflection {
        Reflection::Fields(Vec::new())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A dropped or held item.
pub struct ItemComponent {
    item_id: String,
}

impl ItemComponent {
    #[must_use]
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
        }
    }
}

impl Introspect for ItemComponent {
    fn type_name(&self) -> &str {
        "Item"
    }

    fn reflect(&self) -> Reflection {
        Reflection::Fields(vec![(
            "itemId".into(),
            ReflectedValue::str(self.item_id.clone()),
        )])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Alarms
// ---------------------------------------------------------------------------

/// A scheduled game-time event.
///
/// `isSet` / `hasPassed` / `alarmInstant` are the wire names the inspector
/// probes for when it normalizes an alarm.
pub struct Alarm {
    state: Mutex<AlarmData>,
}

#[derive(Debug, Clone, Copy, Default)]
struct AlarmData {
    set: bool,
    passed: bool,
    instant: Option<i64>,
}

impl Alarm {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AlarmData::default()),
        }
    }

    /// Schedule the alarm at the given game-time epoch millisecond.
    #[must_use]
    pub fn scheduled_at(epoch_millis: i64) -> Self {
        Self {
            state: Mutex::new(AlarmData {
                set: true,
                passed: false,
                instant: Some(epoch_millis),
            }),
        }
    }

    pub fn schedule(&self, epoch_millis: i64) {
        *self.state.lock() = AlarmData {
            set: true,
            passed: false,
            instant: Some(epoch_millis),
        };
    }

    /// Clear the alarm entirely. This is the side effect sensor evaluation
    /// can trigger — and the reason the instruction serializer must never
    /// evaluate anything.
    pub fn clear(&self) {
        *self.state.lock() = AlarmData::default();
    }

    pub fn mark_passed(&self) {
        let mut state = self.state.lock();
        state.set = false;
        state.passed = true;
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.state.lock().set
    }

    #[must_use]
    pub fn has_passed(&self) -> bool {
        self.state.lock().passed
    }

    /// The scheduled instant as epoch milliseconds, if any.
    #[must_use]
    pub fn instant(&self) -> Option<i64> {
        self.state.lock().instant
    }
}

impl Default for Alarm {
    fn default() -> Self {
        Self::new()
    }
}

impl Introspect for Alarm {
    fn type_name(&self) -> &str {
        "Alarm"
    }

    fn reflect(&self) -> Reflection {
        let data = *self.state.lock();
        let instant = match data.instant {
            Some(ms) => ReflectedValue::Scalar(Scalar::Instant(ms)),
            None => ReflectedValue::null(),
        };
        Reflection::Fields(vec![
            ("isSet".into(), ReflectedValue::bool(data.set)),
            ("hasPassed".into(), ReflectedValue::bool(data.passed)),
            ("alarmInstant".into(), instant),
        ])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A named store of alarm parameters, probed by the inspector at
/// `…alarmStore.parameters.<name>`.
pub struct AlarmStore {
    parameters: Mutex<Vec<(String, Arc<Alarm>)>>,
}

impl AlarmStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parameters: Mutex::new(Vec::new()),
        }
    }

    pub fn set(&self, name: impl Into<String>, alarm: Arc<Alarm>) {
        let name = name.into();
        let mut parameters = self.parameters.lock();
        if let Some(entry) = parameters.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = alarm;
        } else {
            parameters.push((name, alarm));
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Alarm>> {
        self.parameters
            .lock()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, alarm)| alarm.clone())
    }
}

impl Default for AlarmStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Introspect for AlarmStore {
    fn type_name(&self) -> &str {
        "AlarmStore"
    }

    fn reflect(&self) -> Reflection {
        let entries = self
            .parameters
            .lock()
            .iter()
            .map(|(name, alarm)| {
                (
                    name.clone(),
                    ReflectedValue::Object(alarm.clone() as ObjectRef),
                )
            })
            .collect();
        Reflection::Fields(vec![("parameters".into(), ReflectedValue::Mapping(entries))])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The inner entity state object some host components nest their alarm
/// store under.
pub struct EntityState {
    alarm_store: Arc<AlarmStore>,
}

impl EntityState {
    #[must_use]
    pub fn new(alarm_store: Arc<AlarmStore>) -> Self {
        Self { alarm_store }
    }

    #[must_use]
    pub fn alarm_store(&self) -> &Arc<AlarmStore> {
        &self.alarm_store
    }
}

impl Introspect for EntityState {
    fn type_name(&self) -> &str {
        "Entity"
    }

    fn reflect(&self) -> Reflection {
        Reflection::Fields(vec![(
            "alarmStore".into(),
            ReflectedValue::Object(self.alarm_store.clone() as ObjectRef),
        )])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Interaction bookkeeping; nests an entity state with its own alarm store.
pub struct InteractionManager {
    entity: Arc<EntityState>,
}

impl InteractionManager {
    #[must_use]
    pub fn new(entity: Arc<EntityState>) -> Self {
        Self { entity }
    }
}

impl Introspect for InteractionManager {
    fn type_name(&self) -> &str {
        "InteractionManager"
    }

    fn reflect(&self) -> Reflection {
        Reflection::Fields(vec![(
            "entity".into(),
            ReflectedValue::Object(self.entity.clone() as ObjectRef),
        )])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Running,
    Paused,
    Stopped,
}

impl TimerState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Stopped => "STOPPED",
        }
    }
}

/// A host countdown/count-up timer.
pub struct Timer {
    state: Mutex<TimerState>,
    value: Mutex<f64>,
    max_value: f64,
    rate: f64,
    repeating: bool,
}

impl Timer {
    #[must_use]
    pub fn new(state: TimerState, value: f64, max_value: f64, rate: f64, repeating: bool) -> Self {
        Self {
            state: Mutex::new(state),
            value: Mutex::new(value),
            max_value,
            rate,
            repeating,
        }
    }

    #[must_use]
    pub fn state(&self) -> TimerState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: TimerState) {
        *self.state.lock() = state;
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        *self.value.lock()
    }

    pub fn set_value(&self, value: f64) {
        *self.value.lock() = value;
    }

    #[must_use]
    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    #[must_use]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    #[must_use]
    pub fn repeating(&self) -> bool {
        self.repeating
    }
}

impl Introspect for Timer {
    fn type_name(&self) -> &str {
        "Timer"
    }

    fn reflect(&self) -> Reflection {
        Reflection::Fields(vec![
            (
                "state".into(),
                ReflectedValue::Scalar(Scalar::Enum(self.state().as_str().to_string())),
            ),
            ("value".into(), ReflectedValue::float(self.value())),
            ("maxValue".into(), ReflectedValue::float(self.max_value)),
            ("rate".into(), ReflectedValue::float(self.rate)),
            ("repeating".into(), ReflectedValue::bool(self.repeating)),
        ])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The component bundling an entity's timers.
pub struct TimersComponent {
    timers: Vec<Arc<Timer>>,
}

impl TimersComponent {
    #[must_use]
    pub fn new(timers: Vec<Arc<Timer>>) -> Self {
        Self { timers }
    }

    #[must_use]
    pub fn timers(&self) -> &[Arc<Timer>] {
        &self.timers
    }
}

impl Introspect for TimersComponent {
    fn type_name(&self) -> &str {
        "Timers"
    }

    fn reflect(&self) -> Reflection {
        let items = self
            .timers
            .iter()
            .map(|timer| ReflectedValue::Object(timer.clone() as ObjectRef))
            .collect();
        Reflection::Fields(vec![("timers".into(), ReflectedValue::Sequence(items))])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// NPC
// ---------------------------------------------------------------------------

/// The NPC component: display name, behavior role, nested entity state and
/// a direct alarm map. Appears in snapshots as `NPCEntity`.
pub struct NpcComponent {
    name: String,
    role: Arc<Role>,
    entity: Option<Arc<EntityState>>,
    alarms: Mutex<Vec<(String, Arc<Alarm>)>>,
}

impl NpcComponent {
    #[must_use]
    pub fn new(name: impl Into<String>, role: Arc<Role>) -> Self {
        Self {
            name: name.into(),
            role,
            entity: None,
            alarms: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_entity(mut self, entity: Arc<EntityState>) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn set_alarm(&self, name: impl Into<String>, alarm: Arc<Alarm>) {
        self.alarms.lock().push((name.into(), alarm));
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn role(&self) -> &Arc<Role> {
        &self.role
    }
}

impl Introspect for NpcComponent {
    fn type_name(&self) -> &str {
        "NPCEntity"
    }

    fn reflect(&self) -> Reflection {
        let mut fields = vec![
            ("name".into(), ReflectedValue::str(self.name.clone())),
            (
                "role".into(),
                ReflectedValue::Object(self.role.clone() as ObjectRef),
            ),
        ];
        if let Some(entity) = &self.entity {
            fields.push((
                "entity".into(),
                ReflectedValue::Object(entity.clone() as ObjectRef),
            ));
        }
        let alarms: Vec<(String, ReflectedValue)> = self
            .alarms
            .lock()
            .iter()
            .map(|(name, alarm)| {
                (
                    name.clone(),
                    ReflectedValue::Object(alarm.clone() as ObjectRef),
                )
            })
            .collect();
        fields.push(("alarms".into(), ReflectedValue::Mapping(alarms)));
        Reflection::Fields(fields)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Misc host components
// ---------------------------------------------------------------------------

/// Free-form per-entity parameters persisted by the host. The inspector
/// scans these for alarm-like millisecond schedules.
pub struct PersistentParameters {
    values: Mutex<Vec<(String, Scalar)>>,
}

impl PersistentParameters {
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: Mutex::new(Vec::new()),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: Scalar) {
        let key = key.into();
        let mut values = self.values.lock();
        if let Some(entry) = values.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            values.push((key, value));
        }
    }
}

impl Default for PersistentParameters {
    fn default() -> Self {
        Self::new()
    }
}

impl Introspect for PersistentParameters {
    fn type_name(&self) -> &str {
        "PersistentParameters"
    }

    fn reflect(&self) -> Reflection {
        Reflection::Fields(
            self.values
                .lock()
                .iter()
                .map(|(key, value)| (key.clone(), ReflectedValue::Scalar(value.clone())))
                .collect(),
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The inspector-owned persistent surname component.
pub struct SurnameComponent {
    value: Mutex<String>,
}

impl SurnameComponent {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(value.into()),
        }
    }

    pub fn set(&self, value: impl Into<String>) {
        *self.value.lock() = value.into();
    }

    #[must_use]
    pub fn get(&self) -> String {
        self.value.lock().clone()
    }
}

impl Introspect for SurnameComponent {
    fn type_name(&self) -> &str {
        "Surname"
    }

    fn reflect(&self) -> Reflection {
        Reflection::Fields(vec![(
            "value".into(),
            ReflectedValue::str(self.value.lock().clone()),
        )])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The floating nameplate text above an entity.
pub struct NameplateComponent {
    text: Mutex<String>,
}

impl NameplateComponent {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Mutex::new(text.into()),
        }
    }

    pub fn set(&self, text: impl Into<String>) {
        *self.text.lock() = text.into();
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.text.lock().clone()
    }
}

impl Introspect for NameplateComponent {
    fn type_name(&self) -> &str {
        "Nameplate"
    }

    fn reflect(&self) -> Reflection {
        Reflection::Fields(vec![(
            "text".into(),
            ReflectedValue::str(self.text.lock().clone()),
        )])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A pending teleport the host consumes on its next movement pass.
pub struct TeleportComponent {
    target: DVec3,
}

impl TeleportComponent {
    #[must_use]
    pub fn new(target: DVec3) -> Self {
        Self { target }
    }

    #[must_use]
    pub fn target(&self) -> DVec3 {
        self.target
    }
}

impl Introspect for TeleportComponent {
    fn type_name(&self) -> &str {
        "Teleport"
    }

    fn reflect(&self) -> Reflection {
        Reflection::Fields(vec![(
            "target".into(),
            ReflectedValue::Scalar(Scalar::Vec3([self.target.x, self.target.y, self.target.z])),
        )])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Role;

    #[test]
    fn test_alarm_lifecycle() {
        let alarm = Alarm::new();
        assert!(!alarm.is_set());
        alarm.schedule(5_000);
        assert!(alarm.is_set());
        assert_eq!(alarm.instant(), Some(5_000));
        alarm.mark_passed();
        assert!(alarm.has_passed());
        assert!(!alarm.is_set());
        alarm.clear();
        assert!(!alarm.has_passed());
        assert_eq!(alarm.instant(), None);
    }

    #[test]
    fn test_alarm_reflection_exposes_wire_names() {
        let alarm = Alarm::scheduled_at(42);
        let reflection = alarm.reflect();
        assert!(matches!(
            reflection.field("isSet"),
            Some(ReflectedValue::Scalar(Scalar::Bool(true)))
        ));
        assert!(matches!(
            reflection.field("alarmInstant"),
            Some(ReflectedValue::Scalar(Scalar::Instant(42)))
        ));
    }

    #[test]
    fn test_alarm_store_replaces_by_name() {
        let store = AlarmStore::new();
        store.set("wake", Arc::new(Alarm::scheduled_at(1)));
        store.set("wake", Arc::new(Alarm::scheduled_at(2)));
        assert_eq!(store.get("wake").unwrap().instant(), Some(2));
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_timers_reflect_as_sequence() {
        let timers = TimersComponent::new(vec![
            Arc::new(Timer::new(TimerState::Running, 3.0, 10.0, 1.0, true)),
            Arc::new(Timer::new(TimerState::Stopped, 0.0, 5.0, 1.0, false)),
        ]);
        match timers.reflect().field("timers") {
            Some(ReflectedValue::Sequence(items)) => assert_eq!(items.len(), 2),
            other => panic!("expected sequence, got {other:?}"),
        }
    }

    #[test]
    fn test_npc_component_field_order() {
        let npc = NpcComponent::new("Guard", Arc::new(Role::named("guard", "roles/guard")));
        match npc.reflect() {
            Reflection::Fields(fields) => {
                assert_eq!(fields[0].0, "name");
                assert_eq!(fields[1].0, "role");
            }
            other => panic!("expected fields, got {other:?}"),
        }
    }
}
