//! Higher-level entity views derived from cached snapshots: the entity
//! list, timer and alarm tables, and the find-by scans.
//!
//! Everything here reads serialized snapshot data, so deeply nested alarm
//! stores may have degraded to expansion placeholders — a placeholder is
//! still evidence an alarm exists and is treated as `SET`.

use chrono::{SecondsFormat, TimeZone, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

use inspector_host::clock::GameClock;
use inspector_value::is_expansion_placeholder;

use crate::cache::InspectorCache;
use crate::model::{AlarmInfo, EntityListItem, EntitySnapshot, TimerInfo};

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 200;
const DEFAULT_FIND_LIMIT: usize = 20;
const MAX_FIND_LIMIT: usize = 100;

/// Derives interpretive views from the inspector cache.
pub struct EntityQueryService {
    cache: Arc<InspectorCache>,
}

impl EntityQueryService {
    #[must_use]
    pub fn new(cache: Arc<InspectorCache>) -> Self {
        Self { cache }
    }

    // -- Entity list --

    /// List cached entities. `filter` is one of `npc`/`player`/`item`/`all`
    /// (case-insensitive match on the snapshot's `entityType`); `search` is
    /// a case-insensitive substring test across name, role, and model
    /// asset id.
    #[must_use]
    pub fn list_entities(
        &self,
        filter: &str,
        search: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> Vec<EntityListItem> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
        let filter = filter.to_lowercase();
        let search = search.to_lowercase();

        self.cache
            .snapshots()
            .iter()
            .filter(|snapshot| matches_filter(snapshot, &filter))
            .filter(|snapshot| matches_search(snapshot, &search))
            .skip(offset)
            .take(limit)
            .map(list_item)
            .collect()
    }

    /// The cached snapshot for one entity.
    #[must_use]
    pub fn entity_detail(&self, entity_id: i64) -> Option<EntitySnapshot> {
        self.cache.get_entity(entity_id).map(|entry| entry.snapshot)
    }

    // -- Timers --

    /// Normalize the `Timers` component's `timers` sequence. Elements that
    /// degraded to placeholders keep the defaults.
    #[must_use]
    pub fn timers(&self, entity_id: i64) -> Vec<TimerInfo> {
        let Some(entry) = self.cache.get_entity(entity_id) else {
            return Vec::new();
        };
        let Some(timers) = entry
            .snapshot
            .component_field("Timers", "timers")
            .and_then(Value::as_array)
        else {
            return Vec::new();
        };

        timers
            .iter()
            .enumerate()
            .map(|(index, element)| {
                let mut info = TimerInfo {
                    index,
                    ..TimerInfo::default()
                };
                if let Some(map) = element.as_object() {
                    if let Some(state) = map.get("state").and_then(Value::as_str) {
                        info.state = state.to_string();
                    }
                    if let Some(value) = map.get("value").and_then(Value::as_f64) {
                        info.value = value;
                    }
                    if let Some(max) = map.get("maxValue").and_then(Value::as_f64) {
                        info.max_value = max;
                    }
                    if let Some(rate) = map.get("rate").and_then(Value::as_f64) {
                        info.rate = rate;
                    }
                    if let Some(repeating) = map.get("repeating").and_then(Value::as_bool) {
                        info.repeating = repeating;
                    }
                }
                info
            })
            .collect()
    }

    // -- Alarms --

    /// Merge every known alarm location into one named map.
    ///
    /// Locations are probed in a fixed order and earlier finds win:
    /// `InteractionManager.entity.alarmStore.parameters`, then
    /// `NPCEntity.entity.alarmStore.parameters`, `NPCEntity.alarms`,
    /// `Alarms.alarms`, and finally alarm-like keys in
    /// `PersistentParameters`.
    #[must_use]
    pub fn alarms(&self, entity_id: i64, clock: &dyn GameClock) -> IndexMap<String, AlarmInfo> {
        let mut result = IndexMap::new();
        let Some(entry) = self.cache.get_entity(entity_id) else {
            return result;
        };
        let snapshot = &entry.snapshot;
        let now = clock.now_millis();
        let rate = clock.rate();

        let locations: [(&str, &[&str]); 4] = [
            ("InteractionManager", &["entity", "alarmStore", "parameters"]),
            ("NPCEntity", &["entity", "alarmStore", "parameters"]),
            ("NPCEntity", &["alarms"]),
            ("Alarms", &["alarms"]),
        ];

        for (component, path) in locations {
            let Some(map) = dig(snapshot, component, path).and_then(Value::as_object) else {
                continue;
            };
            for (name, value) in map {
                if !result.contains_key(name) {
                    result.insert(name.clone(), alarm_info(name, value, now, rate));
                }
            }
        }

        // PersistentParameters: any alarm-named numeric key is a
        // millisecond schedule.
        if let Some(params) = snapshot
            .component("PersistentParameters")
            .and_then(|c| c.fields.as_object())
        {
            for (key, value) in params {
                if !key.to_lowercase().contains("alarm") {
                    continue;
                }
                let Some(scheduled) = value.as_i64() else {
                    continue;
                };
                if !result.contains_key(key) {
                    let state = if scheduled <= now { "PASSED" } else { "SET" };
                    result.insert(
                        key.clone(),
                        AlarmInfo {
                            name: key.clone(),
                            state: state.to_string(),
                            scheduled_time: Some(iso_millis(scheduled)),
                            remaining_seconds: Some(remaining_seconds(scheduled, now, rate)),
                        },
                    );
                }
            }
        }

        result
    }

    // -- Find-by scans --

    /// Entities with at least one timer in `state`.
    #[must_use]
    pub fn find_by_timer_state(&self, state: &str, limit: Option<usize>) -> Vec<EntityListItem> {
        let limit = limit.unwrap_or(DEFAULT_FIND_LIMIT).min(MAX_FIND_LIMIT);
        let mut out = Vec::new();
        for snapshot in self.cache.snapshots() {
            if out.len() >= limit {
                break;
            }
            let hit = self
                .timers(snapshot.entity_id)
                .iter()
                .any(|timer| timer.state.eq_ignore_ascii_case(state));
            if hit {
                out.push(list_item(&snapshot));
            }
        }
        out
    }

    /// Entities carrying a named alarm, optionally restricted to a state.
    #[must_use]
    pub fn find_by_alarm(
        &self,
        name: &str,
        state: Option<&str>,
        limit: Option<usize>,
        clock: &dyn GameClock,
    ) -> Vec<EntityListItem> {
        let limit = limit.unwrap_or(DEFAULT_FIND_LIMIT).min(MAX_FIND_LIMIT);
        let mut out = Vec::new();
        for snapshot in self.cache.snapshots() {
            if out.len() >= limit {
                break;
            }
            let alarms = self.alarms(snapshot.entity_id, clock);
            let hit = alarms.get(name).is_some_and(|alarm| {
                state.is_none_or(|wanted| alarm.state.eq_ignore_ascii_case(wanted))
            });
            if hit {
                out.push(list_item(&snapshot));
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn matches_filter(snapshot: &EntitySnapshot, filter: &str) -> bool {
    if filter.is_empty() || filter == "all" {
        return true;
    }
    snapshot
        .entity_type
        .as_deref()
        .is_some_and(|ty| ty.eq_ignore_ascii_case(filter))
}

fn matches_search(snapshot: &EntitySnapshot, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    let item = list_item(snapshot);
    let haystacks = [item.name, item.role, item.model_asset_id];
    haystacks
        .iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(search))
}

fn list_item(snapshot: &EntitySnapshot) -> EntityListItem {
    let name = snapshot
        .component_field("NPCEntity", "name")
        .and_then(Value::as_str)
        .map(str::to_string);
    let role = snapshot
        .component_field("NPCEntity", "role")
        .and_then(role_name);

    EntityListItem {
        entity_id: snapshot.entity_id,
        uuid: snapshot.uuid.clone(),
        name,
        role,
        entity_type: snapshot.entity_type.clone(),
        model_asset_id: snapshot.model_asset_id.clone(),
        position: snapshot.position,
    }
}

/// A role is either a bare string or a nested map with a `path` key.
fn role_name(role: &Value) -> Option<String> {
    match role {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("path").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Navigate `component.fields[path[0]][path[1]]…`.
fn dig<'a>(snapshot: &'a EntitySnapshot, component: &str, path: &[&str]) -> Option<&'a Value> {
    let mut current = &snapshot.component(component)?.fields;
    for segment in path {
        current = current.get(segment)?;
    }
    Some(current)
}

fn alarm_info(name: &str, value: &Value, now: i64, rate: f64) -> AlarmInfo {
    // A placeholder still proves the alarm exists.
    if is_expansion_placeholder(value) {
        return AlarmInfo {
            name: name.to_string(),
            state: "SET".to_string(),
            scheduled_time: None,
            remaining_seconds: None,
        };
    }

    let Some(map) = value.as_object() else {
        return AlarmInfo {
            name: name.to_string(),
            state: "SET".to_string(),
            scheduled_time: None,
            remaining_seconds: None,
        };
    };

    let is_set = map.get("isSet").and_then(Value::as_bool);
    let has_passed = map.get("hasPassed").and_then(Value::as_bool);

    let state = if has_passed == Some(true) {
        "PASSED"
    } else if is_set == Some(true) {
        "SET"
    } else if is_set.is_some() || has_passed.is_some() {
        "UNSET"
    } else {
        "SET"
    };

    let scheduled = map
        .get("alarmInstant")
        .and_then(|instant| instant.get("epochMilli"))
        .and_then(Value::as_i64);

    let scheduled_time = scheduled.map(|ms| {
        map.get("alarmInstant")
            .and_then(|instant| instant.get("iso"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| iso_millis(ms))
    });
    let remaining_seconds = scheduled.map(|ms| remaining_seconds(ms, now, rate));

    AlarmInfo {
        name: name.to_string(),
        state: state.to_string(),
        scheduled_time,
        remaining_seconds,
    }
}

/// Game-time delta to real-world seconds, clamped at zero.
fn remaining_seconds(scheduled_ms: i64, now_ms: i64, rate: f64) -> f64 {
    let rate = if rate > 0.0 { rate } else { 1.0 };
    let game_seconds = (scheduled_ms - now_ms) as f64 / 1000.0;
    (game_seconds / rate).max(0.0)
}

fn iso_millis(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}
