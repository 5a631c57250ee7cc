//! Value-shaped inspection data.
//!
//! Everything here crosses the bus boundary, so field names are camelCase
//! and object ordering is preserved end to end (`serde_json` is built with
//! `preserve_order`).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Entity snapshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub yaw: f32,
    pub pitch: f32,
}

/// One component's serialized state.
///
/// Equality is field-wise — change detection compares these directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentData {
    pub type_name: String,
    /// An ordered map of field name → serialized value, or `null` for a
    /// component with no serializable fields.
    pub fields: Value,
}

/// A value-shaped copy of one entity at a point in time.
///
/// The insertion order of `components` is observable: well-known components
/// first, then the rest of the archetype in host order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySnapshot {
    pub entity_id: i64,
    pub uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    pub position: Position,
    pub rotation: Rotation,
    pub components: IndexMap<String, ComponentData>,
    pub timestamp: i64,
}

impl EntitySnapshot {
    #[must_use]
    pub fn component(&self, type_name: &str) -> Option<&ComponentData> {
        self.components.get(type_name)
    }

    /// A field value inside a named component, if the component was
    /// serialized with fields.
    #[must_use]
    pub fn component_field(&self, type_name: &str, field: &str) -> Option<&Value> {
        self.components.get(type_name)?.fields.get(field)
    }
}

/// One entry of a position batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    pub entity_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

/// The full world view sent on connect and on snapshot requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub world_id: String,
    pub world_name: String,
    pub entities: Vec<EntitySnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_time_epoch_milli: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_time_rate: Option<f64>,
    pub server_version: String,
}

// ---------------------------------------------------------------------------
// Packet log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketDirection {
    Inbound,
    Outbound,
}

/// One observed network packet, serialized with credential redaction
/// already applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketLogEntry {
    pub id: i64,
    pub direction: PacketDirection,
    pub packet_name: String,
    pub packet_id: i32,
    pub handler_name: String,
    pub data: Value,
    pub timestamp: i64,
}

// ---------------------------------------------------------------------------
// Derived views
// ---------------------------------------------------------------------------

/// A normalized timer row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerInfo {
    pub index: usize,
    pub state: String,
    pub value: f64,
    pub max_value: f64,
    pub rate: f64,
    pub repeating: bool,
}

impl Default for TimerInfo {
    fn default() -> Self {
        Self {
            index: 0,
            state: "STOPPED".to_string(),
            value: 0.0,
            max_value: 0.0,
            rate: 1.0,
            repeating: false,
        }
    }
}

/// A normalized alarm row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmInfo {
    pub name: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<f64>,
}

/// A row of the entity list view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityListItem {
    pub entity_id: i64,
    pub uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_asset_id: Option<String>,
    pub position: Position,
}

// ---------------------------------------------------------------------------
// Instruction tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMachineInfo {
    pub state: i32,
    pub sub_state: i32,
    pub state_name: String,
}

/// A read-only view of one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub once: bool,
    pub triggered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    // Alarm sensors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_state: Option<String>,
    // Timer sensors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_time_remaining: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_time_remaining: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_max_value: Option<f64>,
    // Compound sensors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensors: Option<Vec<SensorInfo>>,
    // Negation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor: Option<Box<SensorInfo>>,
}

impl SensorInfo {
    #[must_use]
    pub fn new(kind: impl Into<String>, once: bool, triggered: bool) -> Self {
        Self {
            kind: kind.into(),
            once,
            triggered,
            properties: None,
            alarm_name: None,
            expected_state: None,
            current_state: None,
            min_time_remaining: None,
            max_time_remaining: None,
            timer_state: None,
            timer_value: None,
            timer_max_value: None,
            sensors: None,
            sensor: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInfo {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionNode {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub continue_after: bool,
    pub tree_mode: String,
    pub weight: f64,
    pub sensor: SensorInfo,
    pub actions: Vec<ActionInfo>,
    pub children: Vec<InstructionNode>,
}

/// The full interpretive view of an NPC's behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionTree {
    pub role_name: String,
    pub state_machine: StateMachineInfo,
    pub root_instructions: Vec<InstructionNode>,
    pub interaction_instructions: Vec<InstructionNode>,
    pub death_instructions: Vec<InstructionNode>,
}
