//! End-to-end inspection pipeline tests: host world → observers →
//! inspector → session frames.

use std::sync::Arc;

use glam::DVec3;
use serde_json::json;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio_tungstenite::tungstenite::Message;

use inspector_core::observers::{LifecycleObserver, TickObserver};
use inspector_core::{Inspector, InspectorConfig, PacketDirection};
use inspector_host::behavior::Role;
use inspector_host::clock::FixedClock;
use inspector_host::components::{
    ModelComponent, NpcComponent, PlayerComponent, Timer, TimersComponent, TimerState,
    TransformComponent, UuidComponent,
};
use inspector_host::executor::WorldThread;
use inspector_host::introspect::{DynObject, ObjectRef, ReflectedValue};
use inspector_host::world::{uuid_ref_index, EntityHandle, HostWorld};
use inspector_net::{Frame, MessageType, RequestHandler, Session};

struct Rig {
    inspector: Arc<Inspector>,
    world: Arc<HostWorld>,
    session: Arc<Session>,
    rx: UnboundedReceiver<Message>,
    _data_dir: std::path::PathBuf,
}

fn rig_with_config(tag: &str, mut configure: impl FnMut(&mut InspectorConfig)) -> Rig {
    let data_dir = std::env::temp_dir().join(format!(
        "inspector-flow-{}-{}",
        tag,
        std::process::id()
    ));
    let mut config = InspectorConfig::default();
    configure(&mut config);

    let inspector = Inspector::with_config(data_dir.clone(), config);
    let world = HostWorld::new("overworld", "Overworld", Arc::new(FixedClock::new(0, 1.0)));
    world.register_observer(Arc::new(LifecycleObserver::new(inspector.clone())));
    world.register_observer(Arc::new(TickObserver::new(inspector.clone())));

    let (tx, rx) = unbounded_channel();
    let session = inspector.registry().try_register(tx, "test-client").unwrap();
    session.mark_initialized();

    Rig {
        inspector,
        world,
        session,
        rx,
        _data_dir: data_dir,
    }
}

fn rig(tag: &str) -> Rig {
    rig_with_config(tag, |_| {})
}

fn drain(rx: &mut UnboundedReceiver<Message>) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Ok(message) = rx.try_recv() {
        if let Message::Text(text) = message {
            frames.push(Frame::decode(&text).unwrap());
        }
    }
    frames
}

fn spawn_npc(world: &HostWorld, uuid: &str, name: &str) -> EntityHandle {
    world.spawn(vec![
        Arc::new(TransformComponent::new(DVec3::ZERO, 0.0, 0.0)),
        Arc::new(ModelComponent::new("models/cow")),
        Arc::new(UuidComponent::new(uuid)),
        Arc::new(NpcComponent::new(name, Arc::new(Role::named(name, "roles/cow")))),
    ])
}

// ---------------------------------------------------------------------------
// Lifecycle ordering (spawn strictly precedes despawn for an id)
// ---------------------------------------------------------------------------

#[test]
fn spawn_then_despawn_order() {
    let mut rig = rig("lifecycle");
    let uuid = "5bd88f10-0a55-4448-8c55-0d8308a28e78";
    let handle = spawn_npc(&rig.world, uuid, "Bessie");
    rig.world.despawn(handle.ref_index());

    let frames = drain(&mut rig.rx);
    let expected_id = uuid_ref_index(uuid);

    let spawn_at = frames
        .iter()
        .position(|f| {
            f.kind == MessageType::EntitySpawn && f.data_i64("entityId") == Some(expected_id)
        })
        .expect("spawn frame");
    let despawn_at = frames
        .iter()
        .position(|f| {
            f.kind == MessageType::EntityDespawn && f.data_i64("entityId") == Some(expected_id)
        })
        .expect("despawn frame");
    assert!(spawn_at < despawn_at);
    assert_eq!(
        frames[despawn_at].data_str("uuid"),
        Some(uuid),
        "despawn carries the uuid"
    );

    // Despawn is the last event for the id.
    assert_eq!(despawn_at, frames.len() - 1);
}

// ---------------------------------------------------------------------------
// Position batch throttling
// ---------------------------------------------------------------------------

#[test]
fn position_batch_throttling() {
    let mut rig = rig_with_config("throttle", |config| {
        config.update_interval_ticks = 3;
    });
    let uuid = "11f3d3ed-96f7-4db0-b44c-a260e2d1b459";
    let handle = spawn_npc(&rig.world, uuid, "Runner");
    let transform = handle.get("TransformComponent").unwrap();
    let transform = transform
        .as_any()
        .downcast_ref::<TransformComponent>()
        .unwrap();

    // Six ticks, moving +0.05 on x before each. Only ticks 3 and 6 are
    // processed intervals.
    for step in 1..=6 {
        transform.set_position(DVec3::new(0.05 * f64::from(step), 0.0, 0.0));
        rig.world.tick();
    }
    drain(&mut rig.rx); // discard the spawn frame
    rig.inspector.flush_position_batch();

    let frames = drain(&mut rig.rx);
    let batches: Vec<&Frame> = frames
        .iter()
        .filter(|f| f.kind == MessageType::PositionBatch)
        .collect();
    assert_eq!(batches.len(), 1, "exactly one batch after one flush");

    let updates = batches[0].data.as_ref().unwrap()["updates"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(updates.len(), 2, "entries from ticks 3 and 6 only");
    let expected_id = uuid_ref_index(uuid);
    for update in &updates {
        assert_eq!(update["entityId"].as_i64(), Some(expected_id));
    }
    assert!((updates[0]["x"].as_f64().unwrap() - 0.15).abs() < 1e-9);
    assert!((updates[1]["x"].as_f64().unwrap() - 0.30).abs() < 1e-9);

    // An empty queue flushes nothing.
    rig.inspector.flush_position_batch();
    assert!(drain(&mut rig.rx).is_empty());
}

// ---------------------------------------------------------------------------
// Change detection
// ---------------------------------------------------------------------------

#[test]
fn update_reports_changed_components_only() {
    let mut rig = rig("changes");
    let uuid = "7b2660a3-07f3-47bc-9b85-2f6280cd5da5";
    let timer = Arc::new(Timer::new(TimerState::Running, 1.0, 10.0, 1.0, false));
    let handle = rig.world.spawn(vec![
        Arc::new(TransformComponent::new(DVec3::ZERO, 0.0, 0.0)),
        Arc::new(UuidComponent::new(uuid)),
        Arc::new(TimersComponent::new(vec![timer.clone()])),
    ]);
    drain(&mut rig.rx);

    // Mutate only the timer, then deliver a full refresh.
    timer.set_value(7.5);
    let collected = rig
        .inspector
        .collector()
        .collect_from_handle(&rig.inspector.config(), &handle)
        .unwrap();
    rig.inspector.on_entity_update(collected);

    let frames = drain(&mut rig.rx);
    let update = frames
        .iter()
        .find(|f| f.kind == MessageType::EntityUpdate)
        .expect("update frame");
    let changed: Vec<String> = update.data.as_ref().unwrap()["changedComponents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert_eq!(changed, vec!["Timers".to_string()]);

    // An identical second refresh reports nothing changed.
    let collected = rig
        .inspector
        .collector()
        .collect_from_handle(&rig.inspector.config(), &handle)
        .unwrap();
    assert!(rig.inspector.detect_changed_components(&collected.snapshot).is_empty());
}

// ---------------------------------------------------------------------------
// Packet log redaction
// ---------------------------------------------------------------------------

#[test]
fn packet_log_redacts_credentials() {
    let mut rig = rig_with_config("packets", |config| {
        config.packet_log_enabled = true;
        config.packet_log_excluded = vec!["KeepAlive".to_string()];
    });

    let connect: ObjectRef = DynObject::new("Connect")
        .field("identityToken", ReflectedValue::str("abc123"))
        .field("username", ReflectedValue::str("steve"))
        .into_ref();
    let id = rig
        .inspector
        .on_packet(PacketDirection::Inbound, "Connect", 1, "ConnectHandler", connect)
        .unwrap();
    assert!(id > 0);

    // Excluded packets never surface.
    let keep_alive: ObjectRef = DynObject::new("KeepAlive").into_ref();
    assert!(rig
        .inspector
        .on_packet(PacketDirection::Inbound, "KeepAlive", 2, "KeepAliveHandler", keep_alive)
        .is_none());

    let frames = drain(&mut rig.rx);
    let log = frames
        .iter()
        .find(|f| f.kind == MessageType::PacketLog)
        .expect("packet log frame");
    let data = log.data.as_ref().unwrap();
    assert_eq!(data["packetName"], json!("Connect"));
    assert_eq!(data["direction"], json!("inbound"));
    assert_eq!(data["data"]["identityToken"], json!("[REDACTED]"));
    assert_eq!(data["data"]["username"], json!("steve"));
}

// ---------------------------------------------------------------------------
// Expansion requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn expand_request_round_trip() {
    let mut rig = rig("expand");
    let uuid = "c0c59516-5e0c-4bd1-9ff5-0231ac9cd03c";
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
    rig.world.spawn(vec![
        Arc::new(TransformComponent::new(DVec3::ZERO, 0.0, 0.0)),
        Arc::new(UuidComponent::new(uuid)),
        foo,
    ]);
    drain(&mut rig.rx);

    let request = Frame::with_data(
        MessageType::RequestExpand,
        json!({ "entityId": uuid_ref_index(uuid), "path": "Foo.bar.1" }),
    );
    let reply = rig
        .inspector
        .handle(&rig.session, request)
        .await
        .expect("reply");
    assert_eq!(reply.kind, MessageType::ExpandResponse);
    assert_eq!(reply.data.as_ref().unwrap()["value"], json!(20));

    // Unknown paths produce the canonical error string.
    let request = Frame::with_data(
        MessageType::RequestExpand,
        json!({ "entityId": uuid_ref_index(uuid), "path": "Foo.nope" }),
    );
    let reply = rig.inspector.handle(&rig.session, request).await.unwrap();
    assert_eq!(reply.kind, MessageType::Error);
    assert_eq!(
        reply.data_str("message"),
        Some("Failed to expand path: Foo.nope")
    );

    let request = Frame::with_data(MessageType::RequestExpand, json!({ "entityId": 1 }));
    let reply = rig.inspector.handle(&rig.session, request).await.unwrap();
    assert_eq!(reply.data_str("message"), Some("Missing entityId or path"));
}

// ---------------------------------------------------------------------------
// Feature gates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disabled_lazy_expansion_gate() {
    let mut rig = rig("gate");
    let uuid = "0fb8a1ad-56ea-4ce5-ae2e-20b9f2ef32f9";
    spawn_npc(&rig.world, uuid, "Gated");
    drain(&mut rig.rx);

    // Disable the gate over the bus.
    let update = Frame::with_data(
        MessageType::ConfigUpdate,
        json!({ "debug.lazyExpansion": false }),
    );
    assert!(rig.inspector.handle(&rig.session, update).await.is_none());

    // The applied update is broadcast as CONFIG_SYNC.
    let frames = drain(&mut rig.rx);
    let sync = frames
        .iter()
        .find(|f| f.kind == MessageType::ConfigSync)
        .expect("config sync");
    assert_eq!(
        sync.data.as_ref().unwrap()["debug"]["lazyExpansion"],
        json!(false)
    );

    let request = Frame::with_data(
        MessageType::RequestExpand,
        json!({ "entityId": uuid_ref_index(uuid), "path": "NPCEntity.name" }),
    );
    let reply = rig.inspector.handle(&rig.session, request).await.unwrap();
    assert_eq!(reply.kind, MessageType::Error);
    assert_eq!(
        reply.data_str("message"),
        Some("Failed to expand path: NPCEntity.name")
    );
}

#[tokio::test]
async fn disabled_timer_gate_yields_empty_list() {
    let mut rig = rig_with_config("timer-gate", |config| {
        config.debug.timer_inspection = false;
    });
    let uuid = "e57340e8-5f07-4358-9c32-1d18b2a1a387";
    spawn_npc(&rig.world, uuid, "Gated");
    drain(&mut rig.rx);

    let request = Frame::with_data(
        MessageType::RequestEntityTimers,
        json!({ "entityId": uuid_ref_index(uuid) }),
    );
    let reply = rig.inspector.handle(&rig.session, request).await.unwrap();
    assert_eq!(reply.kind, MessageType::RequestEntityTimers);
    assert_eq!(reply.data.as_ref().unwrap()["timers"], json!([]));
}

#[tokio::test]
async fn disabled_entity_actions_gate() {
    let mut rig = rig_with_config("action-gate", |config| {
        config.debug.entity_actions = false;
    });
    let uuid = "b16b00b5-0000-4000-8000-000000000001";
    spawn_npc(&rig.world, uuid, "Gated");
    drain(&mut rig.rx);

    let request = Frame::with_data(
        MessageType::SetEntitySurname,
        json!({ "entityId": uuid_ref_index(uuid), "surname": "the Brave" }),
    );
    let reply = rig.inspector.handle(&rig.session, request).await.unwrap();
    assert_eq!(reply.kind, MessageType::Error);
    assert_eq!(
        reply.data_str("message"),
        Some("Entity actions are disabled via debug config")
    );
}

// ---------------------------------------------------------------------------
// Connect synchronization
// ---------------------------------------------------------------------------

#[test]
fn connect_sends_init_config_features_in_order() {
    let rig = rig("connect");
    let uuid = "9cf74d2a-35b9-4f4a-9f9b-e42d52c9f7ce";
    spawn_npc(&rig.world, uuid, "Greeter");

    let (tx, mut rx) = unbounded_channel();
    let session = rig.inspector.registry().try_register(tx, "late-client").unwrap();
    assert!(!session.is_initialized());
    rig.inspector.on_connect(&session);
    assert!(session.is_initialized());

    let frames = drain(&mut rx);
    let kinds: Vec<MessageType> = frames.iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![
            MessageType::Init,
            MessageType::ConfigSync,
            MessageType::FeatureInfo
        ]
    );

    let init = &frames[0];
    let data = init.data.as_ref().unwrap();
    assert_eq!(data["worldId"], json!("overworld"));
    assert_eq!(data["entities"].as_array().unwrap().len(), 1);
    assert!(data["serverVersion"].is_string());

    let features = frames[2].data.as_ref().unwrap();
    assert_eq!(features["features"]["lazyExpansion"], json!(true));
}

// ---------------------------------------------------------------------------
// On-demand refresh through the world thread
// ---------------------------------------------------------------------------

#[tokio::test]
async fn entity_detail_refreshes_through_world_thread() {
    let mut rig = rig("refresh");
    let uuid = "3f098b4a-c44d-49a6-8047-5b9c490ca3bd";
    let timer = Arc::new(Timer::new(TimerState::Running, 1.0, 10.0, 1.0, false));
    rig.world.spawn(vec![
        Arc::new(TransformComponent::new(DVec3::ZERO, 0.0, 0.0)),
        Arc::new(UuidComponent::new(uuid)),
        Arc::new(TimersComponent::new(vec![timer.clone()])),
    ]);
    drain(&mut rig.rx);

    let mut thread = WorldThread::spawn(rig.world.clone(), 100.0);
    rig.inspector.attach_world(thread.handle());

    // Mutate live state; the cached snapshot is stale until refresh.
    timer.set_value(9.0);

    let request = Frame::with_data(
        MessageType::RequestEntityDetail,
        json!({ "entityId": uuid_ref_index(uuid) }),
    );
    let reply = rig
        .inspector
        .handle(&rig.session, request)
        .await
        .expect("reply");
    assert_eq!(reply.kind, MessageType::EntityUpdate);
    let entity = &reply.data.as_ref().unwrap()["entity"];
    assert_eq!(
        entity["components"]["Timers"]["fields"]["timers"][0]["value"],
        json!(9.0)
    );

    thread.stop();
}

#[tokio::test]
async fn missing_entity_detail_reports_not_found() {
    let rig = rig("missing");
    let request = Frame::with_data(
        MessageType::RequestEntityDetail,
        json!({ "entityId": 424242 }),
    );
    let reply = rig.inspector.handle(&rig.session, request).await.unwrap();
    assert_eq!(reply.kind, MessageType::Error);
    assert_eq!(reply.data_str("message"), Some("Entity not found"));
}

// ---------------------------------------------------------------------------
// Entity actions through the world thread
// ---------------------------------------------------------------------------

#[tokio::test]
async fn surname_action_writes_components() {
    let mut rig = rig("surname");
    let uuid = "d9c1f6ab-22dc-47e3-b2a4-8f6e3d8c9f10";
    let handle = spawn_npc(&rig.world, uuid, "Bessie");
    drain(&mut rig.rx);

    let mut thread = WorldThread::spawn(rig.world.clone(), 200.0);
    rig.inspector.attach_world(thread.handle());

    let request = Frame::with_data(
        MessageType::SetEntitySurname,
        json!({ "entityId": uuid_ref_index(uuid), "surname": "the Brave" }),
    );
    // Success is a scheduled operation: no reply frame.
    assert!(rig.inspector.handle(&rig.session, request).await.is_none());

    // Wait for the queued job by scheduling a barrier job after it.
    let (tx, rx) = tokio::sync::oneshot::channel();
    thread.handle().execute(move |_| {
        let _ = tx.send(());
    });
    rx.await.unwrap();

    let surname = handle.get("Surname").expect("surname attached");
    let surname = surname
        .as_any()
        .downcast_ref::<inspector_host::components::SurnameComponent>()
        .unwrap();
    assert_eq!(surname.get(), "the Brave");
    assert!(handle.get("Nameplate").is_some());

    thread.stop();
}

#[tokio::test]
async fn teleport_action_targets_all_players() {
    let mut rig = rig("teleport");
    let uuid = "4cb3f15e-d6ba-4a08-8019-e26f2d0e7e9b";
    rig.world.spawn(vec![
        Arc::new(TransformComponent::new(DVec3::new(5.0, 1.0, 5.0), 0.0, 0.0)),
        Arc::new(UuidComponent::new(uuid)),
        Arc::new(NpcComponent::new("Target", Arc::new(Role::named("t", "roles/t")))),
    ]);
    let player = rig.world.spawn(vec![
        Arc::new(TransformComponent::new(DVec3::ZERO, 0.0, 0.0)),
        Arc::new(PlayerComponent),
    ]);
    drain(&mut rig.rx);

    let mut thread = WorldThread::spawn(rig.world.clone(), 200.0);
    rig.inspector.attach_world(thread.handle());

    let request = Frame::with_data(
        MessageType::TeleportToEntity,
        json!({ "entityId": uuid_ref_index(uuid) }),
    );
    assert!(rig.inspector.handle(&rig.session, request).await.is_none());

    let (tx, rx) = tokio::sync::oneshot::channel();
    thread.handle().execute(move |_| {
        let _ = tx.send(());
    });
    rx.await.unwrap();

    let teleport = player.get("Teleport").expect("teleport queued");
    let teleport = teleport
        .as_any()
        .downcast_ref::<inspector_host::components::TeleportComponent>()
        .unwrap();
    assert_eq!(teleport.target(), DVec3::new(5.0, 1.0, 5.0));

    thread.stop();
}

// ---------------------------------------------------------------------------
// Time sync cadence
// ---------------------------------------------------------------------------

#[test]
fn time_sync_every_sixtieth_batch() {
    let mut rig = rig("timesync");
    for i in 0..60 {
        rig.inspector
            .queue_position_update(inspector_core::PositionUpdate {
                entity_id: 1,
                uuid: None,
                x: f64::from(i),
                y: 0.0,
                z: 0.0,
                yaw: 0.0,
                pitch: 0.0,
            });
        rig.inspector.flush_position_batch();
    }

    let frames = drain(&mut rig.rx);
    let batches = frames
        .iter()
        .filter(|f| f.kind == MessageType::PositionBatch)
        .count();
    let syncs: Vec<usize> = frames
        .iter()
        .enumerate()
        .filter(|(_, f)| f.kind == MessageType::TimeSync)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(batches, 60);
    assert_eq!(syncs.len(), 1);
    // The sync rides immediately after the sixtieth batch.
    assert_eq!(syncs[0], frames.len() - 1);
}

// ---------------------------------------------------------------------------
// Malformed and unknown frames
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ping_pong_and_malformed_data() {
    let rig = rig("frames");

    let reply = rig
        .inspector
        .handle(&rig.session, Frame::new(MessageType::Ping))
        .await
        .unwrap();
    assert_eq!(reply.kind, MessageType::Pong);

    // A push type is not a valid request.
    let reply = rig
        .inspector
        .handle(&rig.session, Frame::new(MessageType::Init))
        .await
        .unwrap();
    assert_eq!(reply.kind, MessageType::Error);
    assert_eq!(reply.data_str("message"), Some("Unknown message type: INIT"));

    // Requests that need a payload say which one.
    let reply = rig
        .inspector
        .handle(&rig.session, Frame::new(MessageType::RequestEntityDetail))
        .await
        .unwrap();
    assert_eq!(
        reply.data_str("message"),
        Some("Missing data for REQUEST_ENTITY_DETAIL")
    );
}

// ---------------------------------------------------------------------------
// Snapshot requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn snapshot_request_checks_world_id() {
    let mut rig = rig("snapshot");
    spawn_npc(&rig.world, "0d7e7c2e-9d4e-4f6e-8a3e-27a9a8b7c6d5", "Solo");
    drain(&mut rig.rx);

    let mut thread = WorldThread::spawn(rig.world.clone(), 100.0);
    rig.inspector.attach_world(thread.handle());

    let reply = rig
        .inspector
        .handle(&rig.session, Frame::new(MessageType::RequestSnapshot))
        .await
        .unwrap();
    assert_eq!(reply.kind, MessageType::Init);
    assert_eq!(
        reply.data.as_ref().unwrap()["entities"]
            .as_array()
            .unwrap()
            .len(),
        1
    );

    let request = Frame::with_data(
        MessageType::RequestSnapshot,
        json!({ "worldId": "nether" }),
    );
    let reply = rig.inspector.handle(&rig.session, request).await.unwrap();
    assert_eq!(reply.data_str("message"), Some("World not found"));

    thread.stop();
}

// ---------------------------------------------------------------------------
// Paused sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn paused_session_stops_receiving_broadcasts() {
    let mut rig = rig("paused");

    let pause = Frame::with_data(MessageType::SetPaused, json!({ "paused": true }));
    assert!(rig.inspector.handle(&rig.session, pause).await.is_none());

    spawn_npc(&rig.world, "77f6a3c1-88a5-47e4-9e3d-3e64cf4b6a88", "Quiet");
    assert!(drain(&mut rig.rx).is_empty());

    let resume = Frame::with_data(MessageType::SetPaused, json!({ "paused": false }));
    assert!(rig.inspector.handle(&rig.session, resume).await.is_none());
    spawn_npc(&rig.world, "77f6a3c1-88a5-47e4-9e3d-3e64cf4b6a89", "Loud");
    assert!(!drain(&mut rig.rx).is_empty());
}
