//! Inspector configuration.
//!
//! Persisted as camelCase JSON at `<data-dir>/config.json`. Runtime
//! updates arrive as flat key/value maps over the bus and are applied
//! through a whitelist; unknown keys are logged and skipped. Persistence
//! failure never blocks an in-memory change.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

/// Milliseconds per host tick at the nominal 30 TPS.
const MILLIS_PER_TICK: u32 = 33;

/// The ten `debug.*` feature gates. A disabled gate short-circuits its
/// whole inspection capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DebugGates {
    pub entity_lifecycle: bool,
    pub position_tracking: bool,
    pub on_demand_refresh: bool,
    pub alarm_inspection: bool,
    pub timer_inspection: bool,
    pub instruction_inspection: bool,
    pub lazy_expansion: bool,
    pub asset_browser: bool,
    pub patch_management: bool,
    pub entity_actions: bool,
}

impl Default for DebugGates {
    fn default() -> Self {
        Self {
            entity_lifecycle: true,
            position_tracking: true,
            on_demand_refresh: true,
            alarm_inspection: true,
            timer_inspection: true,
            instruction_inspection: true,
            lazy_expansion: true,
            asset_browser: true,
            patch_management: true,
            entity_actions: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InspectorConfig {
    pub enabled: bool,
    /// How many host ticks between position-delta scans (≈100 ms at 30 TPS).
    pub update_interval_ticks: u32,
    #[serde(rename = "includeNPCs")]
    pub include_npcs: bool,
    pub include_players: bool,
    pub include_items: bool,
    pub max_cached_entities: usize,
    pub max_cached_packets: usize,
    pub websocket_enabled: bool,
    pub websocket_bind: String,
    pub websocket_port: u16,
    pub websocket_max_clients: usize,
    pub packet_log_enabled: bool,
    pub packet_log_excluded: Vec<String>,
    pub debug: DebugGates,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            update_interval_ticks: 3,
            include_npcs: true,
            include_players: true,
            include_items: false,
            max_cached_entities: 1000,
            max_cached_packets: 200,
            websocket_enabled: true,
            websocket_bind: "0.0.0.0".to_string(),
            websocket_port: 8765,
            websocket_max_clients: 10,
            packet_log_enabled: false,
            packet_log_excluded: Vec::new(),
            debug: DebugGates::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl InspectorConfig {
    /// The config file location under a data directory.
    #[must_use]
    pub fn file_path(data_dir: &Path) -> PathBuf {
        data_dir.join("config.json")
    }

    /// Load from `<data-dir>/config.json`. A missing or unreadable file
    /// yields defaults — the inspector never refuses to start over config.
    #[must_use]
    pub fn load(data_dir: &Path) -> Self {
        let path = Self::file_path(data_dir);
        match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded inspector config");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist to `<data-dir>/config.json`.
    pub fn save(&self, data_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(data_dir)?;
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(Self::file_path(data_dir), text)?;
        Ok(())
    }

    /// The update interval as milliseconds (derived view).
    #[must_use]
    pub fn update_interval_ms(&self) -> u32 {
        self.update_interval_ticks * MILLIS_PER_TICK
    }

    /// Set the update interval from milliseconds, rounding up to whole
    /// ticks with a floor of one tick.
    pub fn set_update_interval_ms(&mut self, ms: u32) {
        self.update_interval_ticks = ms.div_ceil(MILLIS_PER_TICK).max(1);
    }

    /// Apply a flat key/value update map.
    ///
    /// Only whitelisted keys are honored; unknown keys (and values of the
    /// wrong type) are logged and skipped. Returns the keys that were
    /// actually applied.
    pub fn apply_update(&mut self, updates: &serde_json::Map<String, Value>) -> Vec<String> {
        let mut applied = Vec::new();

        for (key, value) in updates {
            let ok = match key.as_str() {
                "enabled" => set_bool(&mut self.enabled, value),
                "updateIntervalTicks" => set_u32(&mut self.update_interval_ticks, value),
                "includeNPCs" => set_bool(&mut self.include_npcs, value),
                "includePlayers" => set_bool(&mut self.include_players, value),
                "includeItems" => set_bool(&mut self.include_items, value),
                "maxCachedEntities" => set_usize(&mut self.max_cached_entities, value),
                "websocketEnabled" => set_bool(&mut self.websocket_enabled, value),
                "websocketMaxClients" => set_usize(&mut self.websocket_max_clients, value),
                "packetLogEnabled" => set_bool(&mut self.packet_log_enabled, value),
                "packetLogExcluded" => set_string_list(&mut self.packet_log_excluded, value),
                "debug.entityLifecycle" => set_bool(&mut self.debug.entity_lifecycle, value),
                "debug.positionTracking" => set_bool(&mut self.debug.position_tracking, value),
                "debug.onDemandRefresh" => set_bool(&mut self.debug.on_demand_refresh, value),
                "debug.alarmInspection" => set_bool(&mut self.debug.alarm_inspection, value),
                "debug.timerInspection" => set_bool(&mut self.debug.timer_inspection, value),
                "debug.instructionInspection" => {
                    set_bool(&mut self.debug.instruction_inspection, value)
                }
                "debug.lazyExpansion" => set_bool(&mut self.debug.lazy_expansion, value),
                "debug.assetBrowser" => set_bool(&mut self.debug.asset_browser, value),
                "debug.patchManagement" => set_bool(&mut self.debug.patch_management, value),
                "debug.entityActions" => set_bool(&mut self.debug.entity_actions, value),
                _ => {
                    warn!(key, "ignoring unknown config key");
                    continue;
                }
            };

            if ok {
                applied.push(key.clone());
            } else {
                warn!(key, "ignoring config value of wrong type");
            }
        }

        applied
    }
}

fn set_bool(slot: &mut bool, value: &Value) -> bool {
    match value.as_bool() {
        Some(b) => {
            *slot = b;
            true
        }
        None => false,
    }
}

fn set_u32(slot: &mut u32, value: &Value) -> bool {
    match value.as_u64() {
        Some(n) if n >= 1 && n <= u64::from(u32::MAX) => {
            *slot = n as u32;
            true
        }
        _ => false,
    }
}

fn set_usize(slot: &mut usize, value: &Value) -> bool {
    match value.as_u64() {
        Some(n) => {
            *slot = n as usize;
            true
        }
        None => false,
    }
}

fn set_string_list(slot: &mut Vec<String>, value: &Value) -> bool {
    match value.as_array() {
        Some(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(s) => out.push(s.to_string()),
                    None => return false,
                }
            }
            *slot = out;
            true
        }
        None => false,
    }
}
