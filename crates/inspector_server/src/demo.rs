//! Demo world population.
//!
//! A handful of NPCs with patrol behavior, timers and alarms, one player,
//! and one dropped item — enough live state to exercise every inspection
//! surface. A wanderer observer drifts the NPCs so the position pipeline
//! has something to report.

use std::sync::Arc;

use glam::DVec3;

use inspector_host::behavior::{
    ActionSay, ActionWander, AlarmExpectation, Instruction, InstructionWrapper, NullSensor, Role,
    Sensor, SensorAlarm, SensorTimer, StateMachine, TreeMode,
};
use inspector_host::clock::GameClock;
use inspector_host::components::{
    Alarm, AlarmStore, EntityState, InteractionManager, ItemComponent, ModelComponent,
    NpcComponent, PersistentParameters, PlayerComponent, Timer, TimersComponent, TimerState,
    TransformComponent, UuidComponent,
};
use inspector_host::introspect::Scalar;
use inspector_host::world::{HostWorld, WorldObserver};

/// Build the demo world on the given clock.
pub fn populate(world: &HostWorld) {
    let now = world.clock().now_millis();

    spawn_cow(world, "9f4c2ab1-63a5-4d38-9f57-1d2f1a6a0c01", "Bessie", DVec3::new(4.0, 0.0, 4.0), now);
    spawn_cow(world, "9f4c2ab1-63a5-4d38-9f57-1d2f1a6a0c02", "Clover", DVec3::new(-3.0, 0.0, 7.0), now);
    spawn_guard(world, "9f4c2ab1-63a5-4d38-9f57-1d2f1a6a0c03", "Aldric", DVec3::new(0.0, 0.0, -6.0), now);

    world.spawn(vec![
        Arc::new(TransformComponent::new(DVec3::new(0.5, 0.0, 0.5), 180.0, 0.0)),
        Arc::new(UuidComponent::new("9f4c2ab1-63a5-4d38-9f57-1d2f1a6a0c10")),
        Arc::new(PlayerComponent),
    ]);

    world.spawn(vec![
        Arc::new(TransformComponent::new(DVec3::new(2.0, 0.0, -1.0), 0.0, 0.0)),
        Arc::new(UuidComponent::new("9f4c2ab1-63a5-4d38-9f57-1d2f1a6a0c11")),
        Arc::new(ItemComponent::new("items/rusty_sword")),
    ]);
}

fn spawn_cow(world: &HostWorld, uuid: &str, name: &str, position: DVec3, now: i64) {
    let graze_alarm = Arc::new(Alarm::scheduled_at(now + 45_000));
    let graze_timer = Arc::new(Timer::new(TimerState::Running, 3.0, 30.0, 1.0, true));

    let wander = Arc::new(
        Instruction::new(Arc::new(NullSensor::new()) as Arc<dyn Sensor>)
            .named("wander")
            .with_actions(vec![Arc::new(ActionWander::new(6.0))]),
    );
    let graze = Arc::new(
        Instruction::new(Arc::new(SensorAlarm::new(
            "graze",
            AlarmExpectation::Passed,
            true,
            Some(graze_alarm.clone()),
        )) as Arc<dyn Sensor>)
        .named("graze")
        .tagged("idle")
        .tree_mode(TreeMode::Selector)
        .with_actions(vec![Arc::new(ActionSay::new("moo"))])
        .with_children(vec![wander]),
    );

    let role = Arc::new(
        Role::named("cow", "roles/cow")
            .with_state_machine(Arc::new(StateMachine::new(1, 0, "grazing")))
            .with_root(Arc::new(InstructionWrapper::new(vec![graze]))),
    );

    let store = Arc::new(AlarmStore::new());
    store.set("graze", graze_alarm);
    let entity_state = Arc::new(EntityState::new(store));

    let npc = NpcComponent::new(name, role).with_entity(entity_state.clone());
    npc.set_alarm("wake", Arc::new(Alarm::scheduled_at(now + 90_000)));

    let params = PersistentParameters::new();
    params.set("lastAlarmMs", Scalar::Int(now - 10_000));

    world.spawn(vec![
        Arc::new(TransformComponent::new(position, 0.0, 0.0)),
        Arc::new(ModelComponent::new("models/creatures/cow")),
        Arc::new(UuidComponent::new(uuid)),
        Arc::new(npc),
        Arc::new(TimersComponent::new(vec![graze_timer])),
        Arc::new(InteractionManager::new(entity_state)),
        Arc::new(params),
    ]);
}

fn spawn_guard(world: &HostWorld, uuid: &str, name: &str, position: DVec3, now: i64) {
    let patrol_timer = Arc::new(Timer::new(TimerState::Running, 0.0, 60.0, 1.0, true));
    let rest_alarm = Arc::new(Alarm::scheduled_at(now + 120_000));

    let patrol = Arc::new(
        Instruction::new(Arc::new(SensorTimer::new(
            0.0,
            60.0,
            TimerState::Running,
            patrol_timer.clone(),
        )) as Arc<dyn Sensor>)
        .named("patrol")
        .tagged("duty")
        .weighted(2.0)
        .with_actions(vec![Arc::new(ActionWander::new(12.0))]),
    );
    let rest = Arc::new(
        Instruction::new(Arc::new(SensorAlarm::new(
            "rest",
            AlarmExpectation::Set,
            false,
            Some(rest_alarm.clone()),
        )) as Arc<dyn Sensor>)
        .named("rest")
        .continue_after(true),
    );

    let role = Arc::new(
        Role::named("guard", "roles/guard")
            .with_state_machine(Arc::new(StateMachine::new(0, 0, "patrolling")))
            .with_root(Arc::new(InstructionWrapper::new(vec![patrol, rest]))),
    );

    let store = Arc::new(AlarmStore::new());
    store.set("rest", rest_alarm);

    let npc = NpcComponent::new(name, role)
        .with_entity(Arc::new(EntityState::new(store)));

    world.spawn(vec![
        Arc::new(TransformComponent::new(position, 90.0, 0.0)),
        Arc::new(ModelComponent::new("models/creatures/guard")),
        Arc::new(UuidComponent::new(uuid)),
        Arc::new(npc),
        Arc::new(TimersComponent::new(vec![patrol_timer])),
    ]);
}

/// Drifts every NPC in a slow circle so position tracking has real
/// deltas to batch.
pub struct Wanderer;

impl WorldObserver for Wanderer {
    fn tick(&self, world: &HostWorld) {
        let t = world.tick_count() as f64 / 30.0;
        for chunk in world.chunks() {
            if !chunk.component_types().iter().any(|n| n == "NPCEntity") {
                continue;
            }
            for (slot, handle) in chunk.handles().enumerate() {
                let Some(transform) = handle.get("TransformComponent") else {
                    continue;
                };
                let Some(transform) = transform.as_any().downcast_ref::<TransformComponent>()
                else {
                    continue;
                };
                let phase = t + slot as f64;
                let position = transform.position();
                transform.set_position(DVec3::new(
                    position.x + 0.03 * phase.cos(),
                    position.y,
                    position.z + 0.03 * phase.sin(),
                ));
                transform.set_rotation((phase.to_degrees() % 360.0) as f32, 0.0);
            }
        }
    }
}
