//! JSON patch authoring: diff generation, overlay application, and the
//! draft store.
//!
//! A patch is a JSON document overlaying a base asset, keyed by the
//! required `BaseAssetPath` field — the presence of that key is the only
//! schema-level validation performed. Inside arrays, elements carry
//! `_op`/`_index`/`_find` directives.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

/// The key every patch document must carry.
pub const BASE_ASSET_PATH_KEY: &str = "BaseAssetPath";

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Asset not found")]
    NotFound,

    #[error("patch is missing required key {BASE_ASSET_PATH_KEY}")]
    MissingBaseAssetPath,

    #[error("draft I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("draft is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Patch generation and application
// ---------------------------------------------------------------------------

/// Diff an edited document against its base asset, producing a patch
/// keyed by `BaseAssetPath`.
///
/// Object fields that changed (or are new) appear in the patch; array
/// changes are expressed per element with `_op`/`_index`, additions with
/// `_op: "append"`.
#[must_use]
pub fn generate_patch(base_asset_path: &str, base: &Value, edited: &Value) -> Value {
    let mut patch = Map::new();
    patch.insert(
        BASE_ASSET_PATH_KEY.to_string(),
        Value::String(base_asset_path.to_string()),
    );
    if let Some(diff) = diff_value(base, edited) {
        if let Value::Object(fields) = diff {
            for (key, value) in fields {
                patch.insert(key, value);
            }
        }
    }
    Value::Object(patch)
}

fn diff_value(base: &Value, edited: &Value) -> Option<Value> {
    if base == edited {
        return None;
    }
    match (base, edited) {
        (Value::Object(base_map), Value::Object(edited_map)) => {
            let mut out = Map::new();
            for (key, edited_value) in edited_map {
                match base_map.get(key) {
                    Some(base_value) => {
                        if let Some(diff) = diff_value(base_value, edited_value) {
                            out.insert(key.clone(), diff);
                        }
                    }
                    None => {
                        out.insert(key.clone(), edited_value.clone());
                    }
                }
            }
            if out.is_empty() {
                None
            } else {
                Some(Value::Object(out))
            }
        }
        (Value::Array(base_items), Value::Array(edited_items)) => {
            let mut ops = Vec::new();
            for (index, edited_item) in edited_items.iter().enumerate() {
                match base_items.get(index) {
                    Some(base_item) if base_item == edited_item => {}
                    Some(_) => {
                        let mut op = Map::new();
                        op.insert("_op".to_string(), json!("replace"));
                        op.insert("_index".to_string(), json!(index));
                        op.insert("value".to_string(), edited_item.clone());
                        ops.push(Value::Object(op));
                    }
                    None => {
                        let mut op = Map::new();
                        op.insert("_op".to_string(), json!("append"));
                        op.insert("value".to_string(), edited_item.clone());
                        ops.push(Value::Object(op));
                    }
                }
            }
            if ops.is_empty() {
                None
            } else {
                Some(Value::Array(ops))
            }
        }
        _ => Some(edited.clone()),
    }
}

/// Apply a patch overlay to a base document.
///
/// Objects merge recursively; arrays interpret `_op` directives
/// (`replace` by `_index`, `replace` by `_find` match, `append`); every
/// other value replaces wholesale. The `BaseAssetPath` key itself is not
/// part of the overlay.
#[must_use]
pub fn apply_patch(base: &Value, patch: &Value) -> Value {
    let Value::Object(patch_map) = patch else {
        return patch.clone();
    };
    let mut overlay = Map::new();
    for (key, value) in patch_map {
        if key != BASE_ASSET_PATH_KEY {
            overlay.insert(key.clone(), value.clone());
        }
    }
    merge_value(base, &Value::Object(overlay))
}

fn merge_value(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut out = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.get(key) {
                    Some(base_value) => merge_value(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                out.insert(key.clone(), merged);
            }
            Value::Object(out)
        }
        (Value::Array(base_items), Value::Array(ops)) if ops.iter().any(is_array_op) => {
            let mut out = base_items.clone();
            for op in ops {
                apply_array_op(&mut out, op);
            }
            Value::Array(out)
        }
        _ => overlay.clone(),
    }
}

fn is_array_op(value: &Value) -> bool {
    value.get("_op").is_some()
}

fn apply_array_op(items: &mut Vec<Value>, op: &Value) {
    let Some(op_map) = op.as_object() else {
        return;
    };
    let value = op_map.get("value").cloned().unwrap_or(Value::Null);
    match op_map.get("_op").and_then(Value::as_str) {
        Some("append") | None => items.push(value),
        Some("replace") => {
            if let Some(index) = op_map.get("_index").and_then(Value::as_u64) {
                let index = index as usize;
                if index < items.len() {
                    items[index] = value;
                }
            } else if let Some(finder) = op_map.get("_find") {
                if let Some(slot) = items.iter_mut().find(|item| element_matches(item, finder)) {
                    *slot = value;
                }
            }
        }
        Some("remove") => {
            if let Some(index) = op_map.get("_index").and_then(Value::as_u64) {
                let index = index as usize;
                if index < items.len() {
                    items.remove(index);
                }
            } else if let Some(finder) = op_map.get("_find") {
                items.retain(|item| !element_matches(item, finder));
            }
        }
        Some(_) => {}
    }
}

/// An element matches a `_find` object when every finder field equals the
/// element's field.
fn element_matches(element: &Value, finder: &Value) -> bool {
    match (element.as_object(), finder.as_object()) {
        (Some(element_map), Some(finder_map)) => finder_map
            .iter()
            .all(|(key, expected)| element_map.get(key) == Some(expected)),
        _ => element == finder,
    }
}

// ---------------------------------------------------------------------------
// Draft store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftInfo {
    pub filename: String,
    pub base_asset_path: String,
    pub modified: i64,
}

/// Patch drafts on disk under `<data-dir>/drafts`.
#[derive(Debug)]
pub struct DraftStore {
    dir: PathBuf,
}

impl DraftStore {
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join("drafts"),
        }
    }

    /// Save a patch draft. The patch must carry `BaseAssetPath`; a missing
    /// filename gets a generated one.
    pub fn save(&self, filename: Option<&str>, patch: &Value) -> Result<DraftInfo, AssetError> {
        let base_asset_path = patch
            .get(BASE_ASSET_PATH_KEY)
            .and_then(Value::as_str)
            .ok_or(AssetError::MissingBaseAssetPath)?
            .to_string();

        let filename = match filename {
            Some(name) if !name.is_empty() => sanitize(name),
            _ => format!("draft-{}.json", uuid::Uuid::new_v4()),
        };

        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&filename);
        std::fs::write(&path, serde_json::to_string_pretty(patch)?)?;
        debug!(filename, base_asset_path, "draft saved");

        Ok(DraftInfo {
            filename,
            base_asset_path,
            modified: chrono::Utc::now().timestamp_millis(),
        })
    }

    /// Read one draft back.
    pub fn read(&self, filename: &str) -> Result<Value, AssetError> {
        let path = self.dir.join(sanitize(filename));
        let text = std::fs::read_to_string(path).map_err(|_| AssetError::NotFound)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Every draft on disk, newest first.
    #[must_use]
    pub fn list(&self) -> Vec<DraftInfo> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut drafts: Vec<DraftInfo> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    return None;
                }
                let filename = path.file_name()?.to_string_lossy().to_string();
                let text = std::fs::read_to_string(&path).ok()?;
                let patch: Value = serde_json::from_str(&text).ok()?;
                let base_asset_path = patch
                    .get(BASE_ASSET_PATH_KEY)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let modified = entry
                    .metadata()
                    .ok()
                    .and_then(|meta| meta.modified().ok())
                    .and_then(|time| time.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|duration| duration.as_millis() as i64)
                    .unwrap_or_default();
                Some(DraftInfo {
                    filename,
                    base_asset_path,
                    modified,
                })
            })
            .collect();
        drafts.sort_by(|a, b| b.modified.cmp(&a.modified));
        drafts
    }

    /// Remove a draft (after publishing).
    pub fn remove(&self, filename: &str) -> Result<(), AssetError> {
        std::fs::remove_file(self.dir.join(sanitize(filename)))?;
        Ok(())
    }
}

/// Keep drafts inside the drafts directory.
fn sanitize(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_patch_diffs_objects() {
        let base = json!({"speed": 1.0, "health": 10, "name": "cow"});
        let edited = json!({"speed": 2.5, "health": 10, "name": "cow", "armor": 3});
        let patch = generate_patch("npc/roles/cow", &base, &edited);

        assert_eq!(patch[BASE_ASSET_PATH_KEY], json!("npc/roles/cow"));
        assert_eq!(patch["speed"], json!(2.5));
        assert_eq!(patch["armor"], json!(3));
        assert!(patch.get("health").is_none());
        assert!(patch.get("name").is_none());
    }

    #[test]
    fn test_generate_patch_array_ops() {
        let base = json!({"drops": [{"item": "leather"}, {"item": "beef"}]});
        let edited = json!({"drops": [{"item": "leather"}, {"item": "steak"}, {"item": "hide"}]});
        let patch = generate_patch("npc/roles/cow", &base, &edited);

        let ops = patch["drops"].as_array().unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0]["_op"], json!("replace"));
        assert_eq!(ops[0]["_index"], json!(1));
        assert_eq!(ops[0]["value"], json!({"item": "steak"}));
        assert_eq!(ops[1]["_op"], json!("append"));
    }

    #[test]
    fn test_apply_patch_round_trips_generated_diff() {
        let base = json!({
            "speed": 1.0,
            "drops": [{"item": "leather"}, {"item": "beef"}],
            "sound": {"pitch": 1.0, "volume": 0.8}
        });
        let edited = json!({
            "speed": 2.0,
            "drops": [{"item": "leather"}, {"item": "steak"}],
            "sound": {"pitch": 1.4, "volume": 0.8}
        });
        let patch = generate_patch("npc/roles/cow", &base, &edited);
        assert_eq!(apply_patch(&base, &patch), edited);
    }

    #[test]
    fn test_apply_patch_find_directive() {
        let base = json!({"drops": [{"item": "leather", "count": 1}, {"item": "beef", "count": 2}]});
        let patch = json!({
            "BaseAssetPath": "npc/roles/cow",
            "drops": [
                {"_op": "replace", "_find": {"item": "beef"}, "value": {"item": "steak", "count": 5}}
            ]
        });
        let patched = apply_patch(&base, &patch);
        assert_eq!(patched["drops"][1], json!({"item": "steak", "count": 5}));
        assert_eq!(patched["drops"][0]["item"], json!("leather"));
    }

    #[test]
    fn test_draft_store_requires_base_asset_path() {
        let dir = std::env::temp_dir().join(format!("inspector-drafts-{}", std::process::id()));
        let store = DraftStore::new(&dir);
        let bad = json!({"speed": 2.0});
        assert!(matches!(
            store.save(None, &bad),
            Err(AssetError::MissingBaseAssetPath)
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_draft_store_save_list_read_remove() {
        let dir = std::env::temp_dir().join(format!(
            "inspector-drafts-rt-{}",
            std::process::id()
        ));
        let store = DraftStore::new(&dir);
        let patch = json!({"BaseAssetPath": "npc/roles/cow", "speed": 2.0});

        let info = store.save(Some("cow-speed.json"), &patch).unwrap();
        assert_eq!(info.filename, "cow-speed.json");
        assert_eq!(info.base_asset_path, "npc/roles/cow");

        let listed = store.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].filename, "cow-speed.json");

        assert_eq!(store.read("cow-speed.json").unwrap(), patch);

        store.remove("cow-speed.json").unwrap();
        assert!(store.list().is_empty());
        assert!(matches!(
            store.read("cow-speed.json"),
            Err(AssetError::NotFound)
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
