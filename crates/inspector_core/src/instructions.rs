//! Read-only serialization of an NPC's behavior tree.
//!
//! The walk uses only field reflection and pure accessors (`get_role_name`,
//! `get_weight`, `is_continue_after`, `get_sensor`, …). Sensor and action
//! evaluation entry points are never touched: evaluating an alarm sensor
//! can clear the alarm out from under the entity.

use serde_json::{Map, Value};

use inspector_host::behavior::{
    Action, Instruction, NullSensor, Role, Sensor, SensorAlarm, SensorAnd, SensorNot, SensorOr,
    SensorTimer,
};
use inspector_host::clock::GameClock;
use inspector_host::components::NpcComponent;
use inspector_host::introspect::{ObjectRef, ReflectedValue, Reflection};
use inspector_value::ValueSerializer;

use crate::model::{ActionInfo, InstructionNode, InstructionTree, SensorInfo, StateMachineInfo};

/// Fields excluded from generic property extraction: base-sensor state is
/// captured explicitly, the rest are noisy internal wiring.
const PROPERTY_DENYLIST: &[&str] = &[
    "once",
    "triggered",
    "entity",
    "owner",
    "world",
    "parent",
    "random",
    "sensor",
    "sensors",
    "timer",
    "alarm",
    "instruction",
    "cachedTarget",
];

/// Serialize the instruction tree behind a live `NPCEntity` reference.
///
/// Returns `None` when the reference is not an NPC component.
#[must_use]
pub fn instruction_tree(npc: &ObjectRef, clock: &dyn GameClock) -> Option<InstructionTree> {
    let npc = npc.as_any().downcast_ref::<NpcComponent>()?;
    let role = npc.role();
    Some(serialize_role(role, clock))
}

fn serialize_role(role: &Role, clock: &dyn GameClock) -> InstructionTree {
    let machine = role.state_machine();
    InstructionTree {
        role_name: role.get_role_name().to_string(),
        state_machine: StateMachineInfo {
            state: machine.state_index(),
            sub_state: machine.sub_state_index(),
            state_name: machine.state_name(),
        },
        root_instructions: serialize_list(role.root_instruction().instruction_list(), clock),
        interaction_instructions: serialize_list(
            role.interaction_instruction().instruction_list(),
            clock,
        ),
        death_instructions: serialize_list(role.death_instruction().instruction_list(), clock),
    }
}

fn serialize_list(
    instructions: &[std::sync::Arc<Instruction>],
    clock: &dyn GameClock,
) -> Vec<InstructionNode> {
    instructions
        .iter()
        .enumerate()
        .map(|(index, instruction)| serialize_instruction(instruction, index, clock))
        .collect()
}

fn serialize_instruction(
    instruction: &Instruction,
    index: usize,
    clock: &dyn GameClock,
) -> InstructionNode {
    InstructionNode {
        index,
        name: instruction.name().map(str::to_string),
        tag: instruction.tag().map(str::to_string),
        continue_after: instruction.is_continue_after(),
        tree_mode: instruction.get_tree_mode().as_str().to_string(),
        weight: instruction.get_weight(),
        sensor: serialize_sensor(instruction.get_sensor().as_ref(), clock),
        actions: instruction
            .get_actions()
            .iter()
            .map(|action| serialize_action(action.as_ref()))
            .collect(),
        children: serialize_list(instruction.get_children(), clock),
    }
}

fn serialize_sensor(sensor: &dyn Sensor, clock: &dyn GameClock) -> SensorInfo {
    let any = sensor.as_any();

    if let Some(alarm_sensor) = any.downcast_ref::<SensorAlarm>() {
        let mut info = SensorInfo::new("Alarm", sensor.once(), sensor.triggered());
        info.alarm_name = Some(alarm_sensor.alarm_name().to_string());
        info.expected_state = Some(alarm_sensor.expected().as_str().to_string());
        // Current state is read off the alarm's instant, never by
        // evaluating the sensor.
        info.current_state = alarm_sensor.alarm().map(|alarm| {
            match alarm.instant() {
                None => "UNSET",
                Some(instant) if instant < clock.now_millis() => "PASSED",
                Some(_) => "SET",
            }
            .to_string()
        });
        return info;
    }

    if let Some(timer_sensor) = any.downcast_ref::<SensorTimer>() {
        let mut info = SensorInfo::new("Timer", sensor.once(), sensor.triggered());
        info.min_time_remaining = Some(timer_sensor.min_time_remaining());
        info.max_time_remaining = Some(timer_sensor.max_time_remaining());
        info.expected_state = Some(timer_sensor.expected().as_str().to_string());
        let timer = timer_sensor.timer();
        info.timer_state = Some(timer.state().as_str().to_string());
        info.timer_value = Some(timer.value());
        info.timer_max_value = Some(timer.max_value());
        return info;
    }

    if let Some(and) = any.downcast_ref::<SensorAnd>() {
        let mut info = SensorInfo::new("And", sensor.once(), sensor.triggered());
        info.sensors = Some(
            and.sensors()
                .iter()
                .map(|child| serialize_sensor(child.as_ref(), clock))
                .collect(),
        );
        return info;
    }

    if let Some(or) = any.downcast_ref::<SensorOr>() {
        let mut info = SensorInfo::new("Or", sensor.once(), sensor.triggered());
        info.sensors = Some(
            or.sensors()
                .iter()
                .map(|child| serialize_sensor(child.as_ref(), clock))
                .collect(),
        );
        return info;
    }

    if let Some(not) = any.downcast_ref::<SensorNot>() {
        let mut info = SensorInfo::new("Not", sensor.once(), sensor.triggered());
        info.sensor = Some(Box::new(serialize_sensor(not.sensor().as_ref(), clock)));
        return info;
    }

    if any.downcast_ref::<NullSensor>().is_some() {
        return SensorInfo::new("Any", sensor.once(), sensor.triggered());
    }

    // Unknown sensor type: surface its simple properties generically.
    let mut info = SensorInfo::new(sensor.type_name(), sensor.once(), sensor.triggered());
    info.properties = extract_properties(&sensor.reflect());
    info
}

fn serialize_action(action: &dyn Action) -> ActionInfo {
    ActionInfo {
        kind: action.type_name().to_string(),
        properties: extract_properties(&action.reflect()),
    }
}

/// Generic property extraction: only simple values survive — primitives,
/// strings, enums, timestamps, and flat collections of those. Nested
/// objects and denylisted fields are dropped.
fn extract_properties(reflection: &Reflection) -> Option<Value> {
    let Reflection::Fields(fields) = reflection else {
        return None;
    };

    let serializer = ValueSerializer::new();
    let mut map = Map::new();
    for (name, value) in fields {
        if PROPERTY_DENYLIST.contains(&name.as_str()) {
            continue;
        }
        if !is_simple(value) {
            continue;
        }
        map.insert(name.clone(), serializer.serialize_value(value));
    }

    if map.is_empty() {
        None
    } else {
        Some(Value::Object(map))
    }
}

fn is_simple(value: &ReflectedValue) -> bool {
    match value {
        ReflectedValue::Scalar(_) => true,
        ReflectedValue::Sequence(items) => items
            .iter()
            .all(|item| matches!(item, ReflectedValue::Scalar(_))),
        ReflectedValue::Mapping(_) | ReflectedValue::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use inspector_host::behavior::{
        evaluation_count, ActionSay, AlarmExpectation, GenericSensor, InstructionWrapper,
        StateMachine, TreeMode,
    };
    use inspector_host::clock::FixedClock;
    use inspector_host::components::{Alarm, Timer, TimerState};
    use serde_json::json;

    use super::*;

    fn patrol_role() -> Role {
        let alarm = Arc::new(Alarm::scheduled_at(5_000));
        let timer = Arc::new(Timer::new(TimerState::Running, 2.0, 10.0, 1.0, true));

        let leaf = Arc::new(
            Instruction::new(Arc::new(SensorTimer::new(
                0.0,
                20.0,
                TimerState::Running,
                timer,
            )))
            .named("patrol-step")
            .weighted(2.0),
        );

        let root = Instruction::new(Arc::new(SensorAlarm::new(
            "wake",
            AlarmExpectation::Set,
            true,
            Some(alarm),
        )))
        .named("patrol")
        .tagged("movement")
        .tree_mode(TreeMode::Selector)
        .continue_after(true)
        .with_actions(vec![Arc::new(ActionSay::new("moo")) as Arc<dyn Action>])
        .with_children(vec![leaf]);

        Role::named("cow", "roles/cow")
            .with_state_machine(Arc::new(StateMachine::new(2, 1, "grazing")))
            .with_root(Arc::new(InstructionWrapper::new(vec![Arc::new(root)])))
    }

    #[test]
    fn test_tree_shape() {
        let role = patrol_role();
        let clock = FixedClock::new(1_000, 1.0);
        let tree = serialize_role(&role, &clock);

        assert_eq!(tree.role_name, "cow");
        assert_eq!(tree.state_machine.state, 2);
        assert_eq!(tree.state_machine.state_name, "grazing");
        assert_eq!(tree.root_instructions.len(), 1);
        assert!(tree.interaction_instructions.is_empty());

        let root = &tree.root_instructions[0];
        assert_eq!(root.index, 0);
        assert_eq!(root.name.as_deref(), Some("patrol"));
        assert_eq!(root.tag.as_deref(), Some("movement"));
        assert!(root.continue_after);
        assert_eq!(root.tree_mode, "SELECTOR");
        assert_eq!(root.weight, 2.0);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name.as_deref(), Some("patrol-step"));
        assert_eq!(root.actions.len(), 1);
        assert_eq!(root.actions[0].kind, "ActionSay");
    }

    #[test]
    fn test_alarm_sensor_view() {
        let role = patrol_role();
        let clock = FixedClock::new(1_000, 1.0);
        let tree = serialize_role(&role, &clock);
        let sensor = &tree.root_instructions[0].sensor;

        assert_eq!(sensor.kind, "Alarm");
        assert_eq!(sensor.alarm_name.as_deref(), Some("wake"));
        assert_eq!(sensor.expected_state.as_deref(), Some("SET"));
        // Scheduled at 5000, now 1000 → still SET.
        assert_eq!(sensor.current_state.as_deref(), Some("SET"));

        let late = FixedClock::new(9_000, 1.0);
        let tree = serialize_role(&role, &late);
        assert_eq!(
            tree.root_instructions[0].sensor.current_state.as_deref(),
            Some("PASSED")
        );
    }

    #[test]
    fn test_timer_sensor_view_reads_live_timer() {
        let role = patrol_role();
        let clock = FixedClock::new(0, 1.0);
        let tree = serialize_role(&role, &clock);
        let sensor = &tree.root_instructions[0].children[0].sensor;

        assert_eq!(sensor.kind, "Timer");
        assert_eq!(sensor.min_time_remaining, Some(0.0));
        assert_eq!(sensor.max_time_remaining, Some(20.0));
        assert_eq!(sensor.timer_state.as_deref(), Some("RUNNING"));
        assert_eq!(sensor.timer_value, Some(2.0));
        assert_eq!(sensor.timer_max_value, Some(10.0));
    }

    #[test]
    fn test_compound_and_null_sensors() {
        let and: Arc<dyn Sensor> = Arc::new(SensorAnd::new(vec![
            Arc::new(NullSensor::new()) as Arc<dyn Sensor>,
            Arc::new(SensorNot::new(Arc::new(NullSensor::new()) as Arc<dyn Sensor>))
                as Arc<dyn Sensor>,
        ]));
        let clock = FixedClock::new(0, 1.0);
        let info = serialize_sensor(and.as_ref(), &clock);

        assert_eq!(info.kind, "And");
        let children = info.sensors.unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].kind, "Any");
        assert_eq!(children[1].kind, "Not");
        assert_eq!(children[1].sensor.as_ref().unwrap().kind, "Any");
    }

    #[test]
    fn test_generic_sensor_property_extraction() {
        let sensor = GenericSensor::new("SensorProximity")
            .property("radius", ReflectedValue::float(8.0))
            .property("targetTag", ReflectedValue::str("player"))
            // Denylisted and complex fields must not surface.
            .property("entity", ReflectedValue::str("noisy"))
            .property(
                "owner",
                ReflectedValue::Mapping(vec![("x".into(), ReflectedValue::int(1))]),
            );
        let clock = FixedClock::new(0, 1.0);
        let info = serialize_sensor(&sensor, &clock);

        assert_eq!(info.kind, "SensorProximity");
        let properties = info.properties.unwrap();
        assert_eq!(properties, json!({"radius": 8.0, "targetTag": "player"}));
    }

    #[test]
    fn test_walk_never_evaluates() {
        let role = patrol_role();
        let clock = FixedClock::new(9_000, 1.0);
        let before = evaluation_count();
        let _ = serialize_role(&role, &clock);
        let _ = serialize_role(&role, &clock);
        assert_eq!(evaluation_count(), before);
    }

    #[test]
    fn test_instruction_tree_requires_npc_component() {
        use inspector_host::introspect::DynObject;
        let clock = FixedClock::new(0, 1.0);
        let not_npc: ObjectRef = DynObject::new("NPCEntity").into_ref();
        assert!(instruction_tree(&not_npc, &clock).is_none());
    }
}
