//! Every message that crosses the bus boundary.
//!
//! Frames are JSON text: `{"type": <string>, "data": <object|null>,
//! "timestamp": <int64>}`. The type string is the SCREAMING_SNAKE form of
//! [`MessageType`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The complete message-type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    // ── Server → client push ────────────────────────────────────────────
    Init,
    EntitySpawn,
    EntityDespawn,
    EntityUpdate,
    PositionBatch,
    PacketLog,
    ConfigSync,
    TimeSync,
    FeatureInfo,
    AssetsRefreshed,
    Error,
    Pong,

    // ── Client → server requests ────────────────────────────────────────
    Ping,
    RequestSnapshot,
    RequestEntity,
    RequestExpand,
    RequestPacketExpand,
    ConfigUpdate,
    SetPaused,
    RequestEntityList,
    RequestEntityDetail,
    RequestEntityTimers,
    RequestEntityAlarms,
    RequestEntityInstructions,
    RequestFindByTimer,
    RequestFindByAlarm,
    RequestAssetCategories,
    RequestAssets,
    RequestAssetDetail,
    RequestAssetExpand,
    RequestSearchAssets,
    RequestTestWildcard,
    RequestGeneratePatch,
    RequestSaveDraft,
    RequestPublishPatch,
    RequestListDrafts,
    SetEntitySurname,
    TeleportToEntity,

    // ── Server → client responses ───────────────────────────────────────
    ExpandResponse,
    PacketExpandResponse,
    AssetCategories,
    AssetList,
    AssetDetail,
    AssetExpandResponse,
    SearchResults,
    WildcardMatches,
    PatchGenerated,
    DraftSaved,
    PatchPublished,
    DraftsList,
}

impl MessageType {
    /// The wire form of this type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        WIRE_NAMES
            .iter()
            .find(|(ty, _)| *ty == self)
            .map(|(_, name)| *name)
            .expect("every message type has a wire name")
    }
}

/// Wire names, kept in sync with the serde renames by a round-trip test.
const WIRE_NAMES: &[(MessageType, &str)] = &[
    (MessageType::Init, "INIT"),
    (MessageType::EntitySpawn, "ENTITY_SPAWN"),
    (MessageType::EntityDespawn, "ENTITY_DESPAWN"),
    (MessageType::EntityUpdate, "ENTITY_UPDATE"),
    (MessageType::PositionBatch, "POSITION_BATCH"),
    (MessageType::PacketLog, "PACKET_LOG"),
    (MessageType::ConfigSync, "CONFIG_SYNC"),
    (MessageType::TimeSync, "TIME_SYNC"),
    (MessageType::FeatureInfo, "FEATURE_INFO"),
    (MessageType::AssetsRefreshed, "ASSETS_REFRESHED"),
    (MessageType::Error, "ERROR"),
    (MessageType::Pong, "PONG"),
    (MessageType::Ping, "PING"),
    (MessageType::RequestSnapshot, "REQUEST_SNAPSHOT"),
    (MessageType::RequestEntity, "REQUEST_ENTITY"),
    (MessageType::RequestExpand, "REQUEST_EXPAND"),
    (MessageType::RequestPacketExpand, "REQUEST_PACKET_EXPAND"),
    (MessageType::ConfigUpdate, "CONFIG_UPDATE"),
    (MessageType::SetPaused, "SET_PAUSED"),
    (MessageType::RequestEntityList, "REQUEST_ENTITY_LIST"),
    (MessageType::RequestEntityDetail, "REQUEST_ENTITY_DETAIL"),
    (MessageType::RequestEntityTimers, "REQUEST_ENTITY_TIMERS"),
    (MessageType::RequestEntityAlarms, "REQUEST_ENTITY_ALARMS"),
    (
        MessageType::RequestEntityInstructions,
        "REQUEST_ENTITY_INSTRUCTIONS",
    ),
    (MessageType::RequestFindByTimer, "REQUEST_FIND_BY_TIMER"),
    (MessageType::RequestFindByAlarm, "REQUEST_FIND_BY_ALARM"),
    (MessageType::RequestAssetCategories, "REQUEST_ASSET_CATEGORIES"),
    (MessageType::RequestAssets, "REQUEST_ASSETS"),
    (MessageType::RequestAssetDetail, "REQUEST_ASSET_DETAIL"),
    (MessageType::RequestAssetExpand, "REQUEST_ASSET_EXPAND"),
    (MessageType::RequestSearchAssets, "REQUEST_SEARCH_ASSETS"),
    (MessageType::RequestTestWildcard, "REQUEST_TEST_WILDCARD"),
    (MessageType::RequestGeneratePatch, "REQUEST_GENERATE_PATCH"),
    (MessageType::RequestSaveDraft, "REQUEST_SAVE_DRAFT"),
    (MessageType::RequestPublishPatch, "REQUEST_PUBLISH_PATCH"),
    (MessageType::RequestListDrafts, "REQUEST_LIST_DRAFTS"),
    (MessageType::SetEntitySurname, "SET_ENTITY_SURNAME"),
    (MessageType::TeleportToEntity, "TELEPORT_TO_ENTITY"),
    (MessageType::ExpandResponse, "EXPAND_RESPONSE"),
    (MessageType::PacketExpandResponse, "PACKET_EXPAND_RESPONSE"),
    (MessageType::AssetCategories, "ASSET_CATEGORIES"),
    (MessageType::AssetList, "ASSET_LIST"),
    (MessageType::AssetDetail, "ASSET_DETAIL"),
    (MessageType::AssetExpandResponse, "ASSET_EXPAND_RESPONSE"),
    (MessageType::SearchResults, "SEARCH_RESULTS"),
    (MessageType::WildcardMatches, "WILDCARD_MATCHES"),
    (MessageType::PatchGenerated, "PATCH_GENERATED"),
    (MessageType::DraftSaved, "DRAFT_SAVED"),
    (MessageType::PatchPublished, "PATCH_PUBLISHED"),
    (MessageType::DraftsList, "DRAFTS_LIST"),
];

/// Frame parse failures, worded exactly as clients see them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("Missing message type")]
    MissingType,

    #[error("Unknown message type: {0}")]
    UnknownType(String),

    #[error("Invalid message format")]
    Invalid,
}

/// The envelope every bus message travels in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub timestamp: i64,
}

impl Frame {
    /// A frame with no payload, stamped with the current time.
    #[must_use]
    pub fn new(kind: MessageType) -> Self {
        Self {
            kind,
            data: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// A frame carrying a payload.
    #[must_use]
    pub fn with_data(kind: MessageType, data: Value) -> Self {
        Self {
            kind,
            data: Some(data),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// An `ERROR` frame with a single `message` string.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_data(
            MessageType::Error,
            serde_json::json!({ "message": message.into() }),
        )
    }

    /// Serialize for the wire.
    #[must_use]
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Parse an inbound text frame, distinguishing the §7 failure modes.
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(text).map_err(|_| FrameError::Invalid)?;
        let object = value.as_object().ok_or(FrameError::Invalid)?;

        let type_value = object.get("type").ok_or(FrameError::MissingType)?;
        let type_str = type_value.as_str().ok_or(FrameError::MissingType)?;
        let kind: MessageType = serde_json::from_value(Value::String(type_str.to_string()))
            .map_err(|_| FrameError::UnknownType(type_str.to_string()))?;

        let data = match object.get("data") {
            None | Some(Value::Null) => None,
            Some(data) => Some(data.clone()),
        };
        let timestamp = object
            .get("timestamp")
            .and_then(Value::as_i64)
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

        Ok(Self {
            kind,
            data,
            timestamp,
        })
    }

    /// A required string field of the payload.
    #[must_use]
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.as_ref()?.get(key)?.as_str()
    }

    /// A required integer field of the payload.
    #[must_use]
    pub fn data_i64(&self, key: &str) -> Option<i64> {
        self.data.as_ref()?.get(key)?.as_i64()
    }

    /// A boolean field of the payload.
    #[must_use]
    pub fn data_bool(&self, key: &str) -> Option<bool> {
        self.data.as_ref()?.get(key)?.as_bool()
    }
}
