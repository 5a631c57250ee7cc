//! The inspector orchestrator.
//!
//! Owns config, cache, and the session registry; receives observer events
//! from the world thread; answers client requests dispatched in by the
//! gateway; and performs on-demand refresh and entity actions through the
//! current world handle's cooperative queue.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Map, Value};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use inspector_assets::{
    apply_patch, generate_patch, AssetCatalog, DraftStore, HistoryOperation, SessionHistory,
};
use inspector_host::clock::{GameClock, SystemClock};
use inspector_host::components::{NameplateComponent, SurnameComponent, TeleportComponent};
use inspector_host::executor::WorldHandle;
use inspector_host::introspect::ObjectRef;
use inspector_net::{Frame, MessageType, RequestHandler, Session, SessionRegistry};
use inspector_value::ValueSerializer;

use crate::cache::InspectorCache;
use crate::collector::{CollectedEntity, EntityCollector};
use crate::config::InspectorConfig;
use crate::instructions::instruction_tree;
use crate::model::{
    EntitySnapshot, PacketDirection, PacketLogEntry, PositionUpdate, WorldSnapshot,
};
use crate::query::EntityQueryService;
use crate::SERVER_VERSION;

/// How long a transport thread waits for an on-demand refresh before
/// serving the cached snapshot. The scheduled refresh still lands later.
const REFRESH_TIMEOUT: Duration = Duration::from_secs(2);

/// Emit a TIME_SYNC frame after every Nth position batch.
const TIME_SYNC_EVERY_BATCHES: u64 = 60;

/// The inspection engine's orchestrating service.
pub struct Inspector {
    data_dir: PathBuf,
    config: RwLock<InspectorConfig>,
    cache: Arc<InspectorCache>,
    collector: EntityCollector,
    query: EntityQueryService,
    registry: Arc<SessionRegistry>,
    world: RwLock<Option<WorldHandle>>,
    previous: Mutex<IndexMap<i64, EntitySnapshot>>,
    position_batch: Mutex<Vec<PositionUpdate>>,
    batch_counter: AtomicU64,
    assets: AssetCatalog,
    drafts: DraftStore,
    history: SessionHistory,
}

impl Inspector {
    /// Build an inspector, loading config from `<data-dir>/config.json`.
    #[must_use]
    pub fn new(data_dir: PathBuf) -> Arc<Self> {
        let config = InspectorConfig::load(&data_dir);
        Self::with_config(data_dir, config)
    }

    #[must_use]
    pub fn with_config(data_dir: PathBuf, config: InspectorConfig) -> Arc<Self> {
        let cache = Arc::new(InspectorCache::new(
            config.max_cached_entities,
            config.max_cached_packets,
        ));
        let registry = Arc::new(SessionRegistry::new(config.websocket_max_clients));
        let drafts = DraftStore::new(&data_dir);
        Arc::new(Self {
            data_dir,
            config: RwLock::new(config),
            query: EntityQueryService::new(cache.clone()),
            cache,
            collector: EntityCollector::new(),
            registry,
            world: RwLock::new(None),
            previous: Mutex::new(IndexMap::new()),
            position_batch: Mutex::new(Vec::new()),
            batch_counter: AtomicU64::new(0),
            assets: AssetCatalog::new(),
            drafts,
            history: SessionHistory::new(),
        })
    }

    // -- Accessors --

    /// A copy of the current config.
    #[must_use]
    pub fn config(&self) -> InspectorConfig {
        self.config.read().clone()
    }

    #[must_use]
    pub fn collector(&self) -> &EntityCollector {
        &self.collector
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<InspectorCache> {
        &self.cache
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn assets(&self) -> &AssetCatalog {
        &self.assets
    }

    /// Swap the current world handle. All world-thread operations go
    /// through it.
    pub fn attach_world(&self, handle: WorldHandle) {
        *self.world.write() = Some(handle);
    }

    fn world_handle(&self) -> Option<WorldHandle> {
        self.world.read().clone()
    }

    fn clock(&self) -> Arc<dyn GameClock> {
        match self.world_handle() {
            Some(handle) => handle.world().clock().clone(),
            None => Arc::new(SystemClock),
        }
    }

    /// Load (or reload) the asset catalog and tell connected clients.
    pub fn load_assets(&self, root: &Path) -> usize {
        let count = self.assets.load_dir(root);
        self.registry.broadcast(&Frame::with_data(
            MessageType::AssetsRefreshed,
            json!({ "count": count }),
        ));
        count
    }

    /// Clear all captured state and drop every session. Idempotent; the
    /// gateway is stopped separately by its owner.
    pub fn teardown(&self) {
        self.cache.clear();
        self.previous.lock().clear();
        self.position_batch.lock().clear();
        self.registry.clear();
        info!("inspector torn down");
    }

    // -- Observer-side events (world thread) --

    /// A new entity appeared. The cache write strictly precedes the
    /// broadcast so SPAWN is observable before any UPDATE for the id.
    pub fn on_entity_spawn(&self, collected: CollectedEntity) {
        let entity_id = collected.snapshot.entity_id;
        self.remember_previous(entity_id, collected.snapshot.clone());
        self.cache
            .put_entity(entity_id, collected.snapshot.clone(), collected.refs);

        if self.config.read().debug.entity_lifecycle {
            if let Ok(data) = serde_json::to_value(&collected.snapshot) {
                self.registry
                    .broadcast(&Frame::with_data(MessageType::EntitySpawn, data));
            }
        }
        debug!(entity_id, "entity spawn");
    }

    /// An entity went away. DESPAWN is the last event for its id.
    pub fn on_entity_despawn(&self, entity_id: i64, uuid: Option<String>) {
        self.cache.remove_entity(entity_id);
        self.previous.lock().shift_remove(&entity_id);

        if self.config.read().debug.entity_lifecycle {
            self.registry.broadcast(&Frame::with_data(
                MessageType::EntityDespawn,
                json!({ "entityId": entity_id, "uuid": uuid }),
            ));
        }
        debug!(entity_id, "entity despawn");
    }

    /// A periodic full refresh landed: diff against the previous
    /// snapshot, replace cache state, and push the update with its
    /// changed-component list.
    pub fn on_entity_update(&self, collected: CollectedEntity) {
        let entity_id = collected.snapshot.entity_id;
        let changed = self.detect_changed_components(&collected.snapshot);
        self.remember_previous(entity_id, collected.snapshot.clone());
        self.cache
            .put_entity(entity_id, collected.snapshot.clone(), collected.refs);

        if self.config.read().debug.entity_lifecycle {
            if let Ok(entity) = serde_json::to_value(&collected.snapshot) {
                self.registry.broadcast(&Frame::with_data(
                    MessageType::EntityUpdate,
                    json!({ "entity": entity, "changedComponents": changed }),
                ));
            }
        }
    }

    /// Component names whose data differs from (or is new since) the
    /// previous snapshot. With no previous snapshot, every component is
    /// changed.
    #[must_use]
    pub fn detect_changed_components(&self, snapshot: &EntitySnapshot) -> Vec<String> {
        let previous = self.previous.lock();
        match previous.get(&snapshot.entity_id) {
            None => snapshot.components.keys().cloned().collect(),
            Some(old) => snapshot
                .components
                .iter()
                .filter(|(name, data)| old.components.get(name.as_str()) != Some(*data))
                .map(|(name, _)| name.clone())
                .collect(),
        }
    }

    fn remember_previous(&self, entity_id: i64, snapshot: EntitySnapshot) {
        let max = self.config.read().max_cached_entities;
        let mut previous = self.previous.lock();
        previous.insert(entity_id, snapshot);
        while previous.len() > max {
            previous.shift_remove_index(0);
        }
    }

    /// Queue one position delta for the next flush.
    pub fn queue_position_update(&self, update: PositionUpdate) {
        if !self.config.read().debug.position_tracking {
            return;
        }
        self.position_batch.lock().push(update);
    }

    /// Emit the accumulated position batch as one frame. Runs on the
    /// world thread via the 50 ms flush job. Every 60th non-empty flush
    /// is chased by a TIME_SYNC frame.
    pub fn flush_position_batch(&self) {
        let batch: Vec<PositionUpdate> = {
            let mut queue = self.position_batch.lock();
            if queue.is_empty() {
                return;
            }
            queue.drain(..).collect()
        };

        if let Ok(updates) = serde_json::to_value(&batch) {
            self.registry.broadcast(&Frame::with_data(
                MessageType::PositionBatch,
                json!({ "updates": updates }),
            ));
        }

        let count = self.batch_counter.fetch_add(1, Ordering::Relaxed) + 1;
        if count % TIME_SYNC_EVERY_BATCHES == 0 {
            self.broadcast_time_sync();
        }
    }

    fn broadcast_time_sync(&self) {
        let clock = self.clock();
        self.registry.broadcast(&Frame::with_data(
            MessageType::TimeSync,
            json!({
                "gameTimeEpochMilli": clock.now_millis(),
                "gameTimeRate": clock.rate(),
            }),
        ));
    }

    // -- Packet log --

    /// Record one observed packet: serialize with redaction, cache, and
    /// broadcast. Returns the assigned packet id, or `None` when packet
    /// logging is off or the packet is excluded.
    pub fn on_packet(
        &self,
        direction: PacketDirection,
        packet_name: &str,
        packet_id: i32,
        handler_name: &str,
        packet: ObjectRef,
    ) -> Option<i64> {
        {
            let config = self.config.read();
            if !config.packet_log_enabled {
                return None;
            }
            if config
                .packet_log_excluded
                .iter()
                .any(|excluded| excluded == packet_name)
            {
                return None;
            }
        }

        let serializer = ValueSerializer::for_packet(packet_name);
        let data = serializer
            .serialize_component_fields(packet.as_ref())
            .map(Value::Object)
            .unwrap_or_else(|| json!({}));

        let mut entry = PacketLogEntry {
            id: 0,
            direction,
            packet_name: packet_name.to_string(),
            packet_id,
            handler_name: handler_name.to_string(),
            data,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        let id = self.cache.put_packet(entry.clone(), packet);
        entry.id = id;

        if let Ok(data) = serde_json::to_value(&entry) {
            self.registry
                .broadcast(&Frame::with_data(MessageType::PacketLog, data));
        }
        Some(id)
    }

    // -- Snapshots and sync frames --

    /// The world view as currently cached — never a live rescan.
    #[must_use]
    pub fn world_snapshot(&self) -> WorldSnapshot {
        let (world_id, world_name, game_time, game_rate) = match self.world_handle() {
            Some(handle) => {
                let world = handle.world();
                let clock = world.clock();
                (
                    world.id().to_string(),
                    world.name().to_string(),
                    Some(clock.now_millis()),
                    Some(clock.rate()),
                )
            }
            None => ("unknown".to_string(), "unknown".to_string(), None, None),
        };

        WorldSnapshot {
            world_id,
            world_name,
            entities: self.cache.snapshots(),
            game_time_epoch_milli: game_time,
            game_time_rate: game_rate,
            server_version: SERVER_VERSION.to_string(),
        }
    }

    fn init_frame(&self) -> Frame {
        let snapshot = self.world_snapshot();
        Frame::with_data(
            MessageType::Init,
            serde_json::to_value(&snapshot).unwrap_or(Value::Null),
        )
    }

    fn config_sync_frame(&self) -> Frame {
        Frame::with_data(
            MessageType::ConfigSync,
            serde_json::to_value(&*self.config.read()).unwrap_or(Value::Null),
        )
    }

    fn feature_info_frame(&self) -> Frame {
        let gates = self.config.read().debug.clone();
        Frame::with_data(
            MessageType::FeatureInfo,
            json!({
                "features": serde_json::to_value(&gates).unwrap_or(Value::Null),
                "serverVersion": SERVER_VERSION,
            }),
        )
    }

    // -- On-demand refresh --

    /// Schedule a fresh collection of one entity on the world thread and
    /// wait for it briefly. On timeout the caller just serves the cached
    /// snapshot; the refresh still lands in the cache when it completes.
    pub async fn refresh_entity(&self, entity_id: i64) {
        if !self.config.read().debug.on_demand_refresh {
            return;
        }
        let Some(world) = self.world_handle() else {
            return;
        };

        let (tx, rx) = oneshot::channel::<bool>();
        let config = self.config();
        let cache = self.cache.clone();
        let scheduled = world.execute(move |world| {
            let collected = EntityCollector::new().collect_by_id(&config, world, entity_id);
            let found = match collected {
                Some(collected) => {
                    cache.put_entity(
                        collected.snapshot.entity_id,
                        collected.snapshot,
                        collected.refs,
                    );
                    true
                }
                None => false,
            };
            let _ = tx.send(found);
        });
        if !scheduled {
            return;
        }

        if tokio::time::timeout(REFRESH_TIMEOUT, rx).await.is_err() {
            warn!(entity_id, "on-demand refresh timed out, serving cached snapshot");
        }
    }

    // -- Entity actions --

    /// Write the inspector's persistent surname component and the
    /// nameplate. Returns `None` when the write was scheduled.
    fn set_entity_surname(&self, entity_id: i64, surname: String) -> Option<String> {
        if !self.config.read().debug.entity_actions {
            return Some("Entity actions are disabled via debug config".to_string());
        }
        let Some(entry) = self.cache.get_entity(entity_id) else {
            return Some("Entity not found".to_string());
        };
        let uuid = entry.snapshot.uuid;
        let Some(world) = self.world_handle() else {
            return Some("World not found".to_string());
        };

        world.execute(move |world| {
            let Some(handle) = world.find_by_uuid(&uuid) else {
                warn!(%uuid, "surname target vanished before the world thread ran");
                return;
            };
            match handle.get("Surname") {
                Some(existing) => {
                    if let Some(component) =
                        existing.as_any().downcast_ref::<SurnameComponent>()
                    {
                        component.set(surname.clone());
                    }
                }
                None => {
                    handle.attach(Arc::new(SurnameComponent::new(surname.clone())));
                }
            }
            match handle.get("Nameplate") {
                Some(existing) => {
                    if let Some(component) =
                        existing.as_any().downcast_ref::<NameplateComponent>()
                    {
                        component.set(surname.clone());
                    }
                }
                None => {
                    handle.attach(Arc::new(NameplateComponent::new(surname.clone())));
                }
            }
        });
        None
    }

    /// Queue a teleport of every connected player to the entity.
    fn teleport_to_entity(&self, entity_id: i64) -> Option<String> {
        if !self.config.read().debug.entity_actions {
            return Some("Entity actions are disabled via debug config".to_string());
        }
        let Some(entry) = self.cache.get_entity(entity_id) else {
            return Some("Entity not found".to_string());
        };
        let position = entry.snapshot.position;
        let Some(world) = self.world_handle() else {
            return Some("World not found".to_string());
        };

        world.execute(move |world| {
            let target = glam::DVec3::new(position.x, position.y, position.z);
            for player in world.players() {
                player.attach(Arc::new(TeleportComponent::new(target)));
            }
        });
        None
    }

    // -- Config updates --

    fn apply_config_update(&self, updates: &Map<String, Value>) -> Vec<String> {
        let (applied, config) = {
            let mut config = self.config.write();
            let applied = config.apply_update(updates);
            (applied, config.clone())
        };
        if applied.is_empty() {
            return applied;
        }

        self.cache.set_max_entities(config.max_cached_entities);
        self.registry.set_max_clients(config.websocket_max_clients);

        // The in-memory change holds even when persistence fails.
        if let Err(e) = config.save(&self.data_dir) {
            warn!(error = %e, "failed to persist config update");
        }
        self.registry.broadcast(&self.config_sync_frame());
        applied
    }
}

// ---------------------------------------------------------------------------
// Request dispatch
// ---------------------------------------------------------------------------

impl RequestHandler for Inspector {
    fn on_connect(&self, session: &Arc<Session>) {
        // Contract order: snapshot, then initialized, then config and
        // feature advertisement.
        let _ = session.send_frame(&self.init_frame());
        session.mark_initialized();
        let _ = session.send_frame(&self.config_sync_frame());
        let _ = session.send_frame(&self.feature_info_frame());
    }

    async fn handle(&self, session: &Arc<Session>, frame: Frame) -> Option<Frame> {
        let kind = frame.kind;
        match kind {
            MessageType::Ping => Some(Frame::new(MessageType::Pong)),

            MessageType::SetPaused => {
                session.set_paused(frame.data_bool("paused").unwrap_or(false));
                None
            }

            MessageType::RequestSnapshot => {
                if let Some(world_id) = frame.data_str("worldId") {
                    let current = self
                        .world_handle()
                        .map(|handle| handle.world().id().to_string());
                    if current.as_deref() != Some(world_id) {
                        return Some(Frame::error("World not found"));
                    }
                }
                Some(self.init_frame())
            }

            MessageType::RequestEntity | MessageType::RequestEntityDetail => {
                let Some(entity_id) = frame.data_i64("entityId") else {
                    return Some(Frame::error(format!("Missing data for {}", kind.as_str())));
                };
                self.refresh_entity(entity_id).await;
                match self.query.entity_detail(entity_id) {
                    Some(snapshot) => {
                        let changed: Vec<String> = snapshot.components.keys().cloned().collect();
                        Some(Frame::with_data(
                            MessageType::EntityUpdate,
                            json!({
                                "entity": serde_json::to_value(&snapshot).ok()?,
                                "changedComponents": changed,
                            }),
                        ))
                    }
                    None => Some(Frame::error("Entity not found")),
                }
            }

            MessageType::RequestEntityList => {
                let filter = frame.data_str("filter").unwrap_or("all").to_string();
                let search = frame.data_str("search").unwrap_or("").to_string();
                let limit = frame.data_i64("limit").map(|l| l.max(0) as usize);
                let offset = frame.data_i64("offset").unwrap_or(0).max(0) as usize;
                let entities = self.query.list_entities(&filter, &search, limit, offset);
                Some(Frame::with_data(
                    kind,
                    json!({
                        "entities": serde_json::to_value(&entities).ok()?,
                        "filter": filter,
                        "offset": offset,
                    }),
                ))
            }

            MessageType::RequestEntityTimers => {
                let Some(entity_id) = frame.data_i64("entityId") else {
                    return Some(Frame::error(format!("Missing data for {}", kind.as_str())));
                };
                if !self.config.read().debug.timer_inspection {
                    return Some(Frame::with_data(
                        kind,
                        json!({ "entityId": entity_id, "timers": [] }),
                    ));
                }
                self.refresh_entity(entity_id).await;
                let timers = self.query.timers(entity_id);
                Some(Frame::with_data(
                    kind,
                    json!({
                        "entityId": entity_id,
                        "timers": serde_json::to_value(&timers).ok()?,
                    }),
                ))
            }

            MessageType::RequestEntityAlarms => {
                let Some(entity_id) = frame.data_i64("entityId") else {
                    return Some(Frame::error(format!("Missing data for {}", kind.as_str())));
                };
                if !self.config.read().debug.alarm_inspection {
                    return Some(Frame::with_data(
                        kind,
                        json!({ "entityId": entity_id, "alarms": {} }),
                    ));
                }
                self.refresh_entity(entity_id).await;
                let alarms = self.query.alarms(entity_id, self.clock().as_ref());
                Some(Frame::with_data(
                    kind,
                    json!({
                        "entityId": entity_id,
                        "alarms": serde_json::to_value(&alarms).ok()?,
                    }),
                ))
            }

            MessageType::RequestEntityInstructions => {
                let Some(entity_id) = frame.data_i64("entityId") else {
                    return Some(Frame::error(format!("Missing data for {}", kind.as_str())));
                };
                if !self.config.read().debug.instruction_inspection {
                    return Some(Frame::with_data(
                        kind,
                        json!({ "entityId": entity_id, "instructions": null }),
                    ));
                }
                self.refresh_entity(entity_id).await;

                let npc = self
                    .cache
                    .get_entity(entity_id)
                    .and_then(|entry| entry.refs.get("NPCEntity").cloned())
                    .and_then(|weak| weak.upgrade());
                let tree = npc
                    .and_then(|npc| instruction_tree(&npc, self.clock().as_ref()));
                Some(Frame::with_data(
                    kind,
                    json!({
                        "entityId": entity_id,
                        "instructions": serde_json::to_value(&tree).ok()?,
                    }),
                ))
            }

            MessageType::RequestFindByTimer => {
                let state = frame.data_str("state").unwrap_or("RUNNING").to_string();
                let limit = frame.data_i64("limit").map(|l| l.max(0) as usize);
                let matches = if self.config.read().debug.timer_inspection {
                    self.query.find_by_timer_state(&state, limit)
                } else {
                    Vec::new()
                };
                Some(Frame::with_data(
                    kind,
                    json!({ "state": state, "entities": serde_json::to_value(&matches).ok()? }),
                ))
            }

            MessageType::RequestFindByAlarm => {
                let Some(name) = frame.data_str("name").map(str::to_string) else {
                    return Some(Frame::error(format!("Missing data for {}", kind.as_str())));
                };
                let state = frame.data_str("state").map(str::to_string);
                let limit = frame.data_i64("limit").map(|l| l.max(0) as usize);
                let matches = if self.config.read().debug.alarm_inspection {
                    self.query
                        .find_by_alarm(&name, state.as_deref(), limit, self.clock().as_ref())
                } else {
                    Vec::new()
                };
                Some(Frame::with_data(
                    kind,
                    json!({ "name": name, "entities": serde_json::to_value(&matches).ok()? }),
                ))
            }

            MessageType::RequestExpand => {
                let (Some(entity_id), Some(path)) = (
                    frame.data_i64("entityId"),
                    frame.data_str("path").map(str::to_string),
                ) else {
                    return Some(Frame::error("Missing entityId or path"));
                };
                if !self.config.read().debug.lazy_expansion {
                    return Some(Frame::error(format!("Failed to expand path: {path}")));
                }
                match self.cache.expand_entity_path(entity_id, &path) {
                    Some(value) => Some(Frame::with_data(
                        MessageType::ExpandResponse,
                        json!({ "entityId": entity_id, "path": path, "value": value }),
                    )),
                    None => Some(Frame::error(format!("Failed to expand path: {path}"))),
                }
            }

            MessageType::RequestPacketExpand => {
                let (Some(packet_id), Some(path)) = (
                    frame.data_i64("packetId"),
                    frame.data_str("path").map(str::to_string),
                ) else {
                    return Some(Frame::error("Missing packetId or path"));
                };
                if !self.config.read().debug.lazy_expansion {
                    return Some(Frame::error(format!("Failed to expand path: {path}")));
                }
                match self.cache.expand_packet_path(packet_id, &path) {
                    Some(value) => Some(Frame::with_data(
                        MessageType::PacketExpandResponse,
                        json!({ "packetId": packet_id, "path": path, "value": value }),
                    )),
                    None => Some(Frame::error(format!("Failed to expand path: {path}"))),
                }
            }

            MessageType::ConfigUpdate => {
                let Some(updates) = frame.data.as_ref().and_then(Value::as_object) else {
                    return Some(Frame::error(format!("Missing data for {}", kind.as_str())));
                };
                self.apply_config_update(updates);
                None
            }

            // ── Asset browsing ────────────────────────────────────────
            MessageType::RequestAssetCategories => {
                let categories = if self.config.read().debug.asset_browser {
                    self.assets.categories()
                } else {
                    Vec::new()
                };
                Some(Frame::with_data(
                    MessageType::AssetCategories,
                    json!({ "categories": serde_json::to_value(&categories).ok()? }),
                ))
            }

            MessageType::RequestAssets => {
                let category = frame.data_str("category").unwrap_or("").to_string();
                let limit = frame.data_i64("limit").unwrap_or(100).max(0) as usize;
                let offset = frame.data_i64("offset").unwrap_or(0).max(0) as usize;
                let assets = if self.config.read().debug.asset_browser {
                    self.assets.list(&category, limit, offset)
                } else {
                    Vec::new()
                };
                Some(Frame::with_data(
                    MessageType::AssetList,
                    json!({
                        "category": category,
                        "assets": serde_json::to_value(&assets).ok()?,
                    }),
                ))
            }

            MessageType::RequestAssetDetail => {
                let Some(path) = frame.data_str("path").map(str::to_string) else {
                    return Some(Frame::error(format!("Missing data for {}", kind.as_str())));
                };
                if !self.config.read().debug.asset_browser {
                    return Some(Frame::with_data(
                        MessageType::AssetDetail,
                        json!({ "path": path, "asset": null }),
                    ));
                }
                match self.assets.get(&path) {
                    Some(asset) => Some(Frame::with_data(
                        MessageType::AssetDetail,
                        json!({ "path": path, "asset": asset }),
                    )),
                    None => Some(Frame::error("Asset not found")),
                }
            }

            MessageType::RequestAssetExpand => {
                let (Some(path), Some(value_path)) = (
                    frame.data_str("path").map(str::to_string),
                    frame.data_str("valuePath").map(str::to_string),
                ) else {
                    return Some(Frame::error(format!("Missing data for {}", kind.as_str())));
                };
                if !self.config.read().debug.asset_browser {
                    return Some(Frame::with_data(
                        MessageType::AssetExpandResponse,
                        json!({ "path": path, "valuePath": value_path, "value": null }),
                    ));
                }
                match self.assets.expand(&path, &value_path) {
                    Some(value) => Some(Frame::with_data(
                        MessageType::AssetExpandResponse,
                        json!({ "path": path, "valuePath": value_path, "value": value }),
                    )),
                    None => Some(Frame::error(format!("Failed to expand path: {value_path}"))),
                }
            }

            MessageType::RequestSearchAssets => {
                let query = frame.data_str("query").unwrap_or("").to_string();
                let limit = frame.data_i64("limit").unwrap_or(50).max(0) as usize;
                let results = if self.config.read().debug.asset_browser {
                    self.assets.search(&query, limit)
                } else {
                    Vec::new()
                };
                Some(Frame::with_data(
                    MessageType::SearchResults,
                    json!({ "query": query, "results": serde_json::to_value(&results).ok()? }),
                ))
            }

            MessageType::RequestTestWildcard => {
                let pattern = frame.data_str("pattern").unwrap_or("").to_string();
                let limit = frame.data_i64("limit").unwrap_or(100).max(0) as usize;
                let matches = if self.config.read().debug.asset_browser {
                    self.assets.wildcard_matches(&pattern, limit)
                } else {
                    Vec::new()
                };
                Some(Frame::with_data(
                    MessageType::WildcardMatches,
                    json!({ "pattern": pattern, "matches": matches }),
                ))
            }

            // ── Patch management ──────────────────────────────────────
            MessageType::RequestGeneratePatch => {
                if !self.config.read().debug.patch_management {
                    return Some(Frame::error(
                        "Patch management is disabled via debug config",
                    ));
                }
                let (Some(base_path), Some(edited)) = (
                    frame.data_str("baseAssetPath").map(str::to_string),
                    frame.data.as_ref().and_then(|d| d.get("edited")).cloned(),
                ) else {
                    return Some(Frame::error(format!("Missing data for {}", kind.as_str())));
                };
                match self.assets.get(&base_path) {
                    Some(base) => {
                        let patch = generate_patch(&base_path, &base, &edited);
                        Some(Frame::with_data(
                            MessageType::PatchGenerated,
                            json!({ "patch": patch }),
                        ))
                    }
                    None => Some(Frame::error("Asset not found")),
                }
            }

            MessageType::RequestSaveDraft => {
                if !self.config.read().debug.patch_management {
                    return Some(Frame::error(
                        "Patch management is disabled via debug config",
                    ));
                }
                let Some(patch) = frame.data.as_ref().and_then(|d| d.get("patch")).cloned()
                else {
                    return Some(Frame::error(format!("Missing data for {}", kind.as_str())));
                };
                let filename = frame.data_str("filename").map(str::to_string);
                match self.drafts.save(filename.as_deref(), &patch) {
                    Ok(draft) => {
                        self.history.record(
                            draft.filename.clone(),
                            draft.base_asset_path.clone(),
                            HistoryOperation::Draft,
                        );
                        Some(Frame::with_data(
                            MessageType::DraftSaved,
                            json!({ "draft": serde_json::to_value(&draft).ok()? }),
                        ))
                    }
                    Err(e) => Some(Frame::error(e.to_string())),
                }
            }

            MessageType::RequestPublishPatch => {
                if !self.config.read().debug.patch_management {
                    return Some(Frame::error(
                        "Patch management is disabled via debug config",
                    ));
                }
                let Some(filename) = frame.data_str("filename").map(str::to_string) else {
                    return Some(Frame::error(format!("Missing data for {}", kind.as_str())));
                };
                let patch = match self.drafts.read(&filename) {
                    Ok(patch) => patch,
                    Err(e) => return Some(Frame::error(e.to_string())),
                };
                let Some(base_path) = patch
                    .get(inspector_assets::BASE_ASSET_PATH_KEY)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                else {
                    return Some(Frame::error(
                        "patch is missing required key BaseAssetPath",
                    ));
                };
                let Some(base) = self.assets.get(&base_path) else {
                    return Some(Frame::error("Asset not found"));
                };

                let patched = apply_patch(&base, &patch);
                self.assets.insert(base_path.clone(), patched);
                self.history.record(
                    filename.clone(),
                    base_path.clone(),
                    HistoryOperation::Publish,
                );
                self.registry.broadcast(&Frame::with_data(
                    MessageType::AssetsRefreshed,
                    json!({ "path": base_path }),
                ));
                Some(Frame::with_data(
                    MessageType::PatchPublished,
                    json!({ "filename": filename, "baseAssetPath": base_path }),
                ))
            }

            MessageType::RequestListDrafts => {
                let (drafts, history) = if self.config.read().debug.patch_management {
                    (self.drafts.list(), self.history.entries())
                } else {
                    (Vec::new(), Vec::new())
                };
                Some(Frame::with_data(
                    MessageType::DraftsList,
                    json!({
                        "drafts": serde_json::to_value(&drafts).ok()?,
                        "history": serde_json::to_value(&history).ok()?,
                    }),
                ))
            }

            // ── Entity actions ────────────────────────────────────────
            MessageType::SetEntitySurname => {
                let (Some(entity_id), Some(surname)) = (
                    frame.data_i64("entityId"),
                    frame.data_str("surname").map(str::to_string),
                ) else {
                    return Some(Frame::error(format!("Missing data for {}", kind.as_str())));
                };
                self.set_entity_surname(entity_id, surname).map(Frame::error)
            }

            MessageType::TeleportToEntity => {
                let Some(entity_id) = frame.data_i64("entityId") else {
                    return Some(Frame::error(format!("Missing data for {}", kind.as_str())));
                };
                self.teleport_to_entity(entity_id).map(Frame::error)
            }

            // Push/response types are never valid as requests.
            _ => Some(Frame::error(format!(
                "Unknown message type: {}",
                kind.as_str()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Packet adapter
// ---------------------------------------------------------------------------

static ADAPTER_SLOT: OnceLock<Mutex<Weak<Inspector>>> = OnceLock::new();
static ADAPTER_BOUND: AtomicBool = AtomicBool::new(false);

/// The process-wide packet tap.
///
/// The host allows adapter registration exactly once per process, so
/// re-initialization routes through a static active-instance slot: the
/// first install binds the adapter, later installs merely repoint the
/// slot at the new inspector.
pub struct PacketAdapter;

impl PacketAdapter {
    /// Point the active slot at `inspector`. Returns `true` only for the
    /// install that actually bound the process-wide adapter.
    pub fn install(inspector: &Arc<Inspector>) -> bool {
        let slot = ADAPTER_SLOT.get_or_init(|| Mutex::new(Weak::new()));
        *slot.lock() = Arc::downgrade(inspector);
        !ADAPTER_BOUND.swap(true, Ordering::SeqCst)
    }

    #[must_use]
    pub fn active() -> Option<Arc<Inspector>> {
        ADAPTER_SLOT.get()?.lock().upgrade()
    }

    /// Host callback for a packet received from a client.
    pub fn log_inbound(packet_name: &str, packet_id: i32, handler_name: &str, packet: ObjectRef) {
        if let Some(inspector) = Self::active() {
            inspector.on_packet(
                PacketDirection::Inbound,
                packet_name,
                packet_id,
                handler_name,
                packet,
            );
        }
    }

    /// Host callback for a packet sent to a client.
    pub fn log_outbound(packet_name: &str, packet_id: i32, handler_name: &str, packet: ObjectRef) {
        if let Some(inspector) = Self::active() {
            inspector.on_packet(
                PacketDirection::Outbound,
                packet_name,
                packet_id,
                handler_name,
                packet,
            );
        }
    }
}
