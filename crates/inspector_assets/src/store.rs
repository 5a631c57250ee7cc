//! The asset catalog wrapper.
//!
//! Assets are JSON documents keyed by slash-separated paths (the `.json`
//! extension is stripped); the first path segment is the category. The
//! whole catalog sits in a concurrent map so transport threads can browse
//! without touching the world thread.

use std::path::Path;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInfo {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSummary {
    pub path: String,
    pub name: String,
}

/// A browsable snapshot of the host's static asset tree.
#[derive(Debug, Default)]
pub struct AssetCatalog {
    assets: DashMap<String, Value>,
}

impl AssetCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            assets: DashMap::new(),
        }
    }

    /// Load (or reload) every `*.json` under `root`. Returns how many
    /// assets are now cached. Unreadable files are skipped with a warning.
    pub fn load_dir(&self, root: &Path) -> usize {
        self.assets.clear();
        self.load_dir_inner(root, root);
        debug!(count = self.assets.len(), "asset catalog loaded");
        self.assets.len()
    }

    fn load_dir_inner(&self, root: &Path, dir: &Path) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                self.load_dir_inner(root, &path);
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let key = relative
                .with_extension("")
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join("/");
            match std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()))
            {
                Ok(value) => {
                    self.assets.insert(key, value);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable asset"),
            }
        }
    }

    /// Insert or replace one asset.
    pub fn insert(&self, path: impl Into<String>, value: Value) {
        self.assets.insert(path.into(), value);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Top-level categories with asset counts, sorted by name.
    #[must_use]
    pub fn categories(&self) -> Vec<CategoryInfo> {
        let mut counts: std::collections::BTreeMap<String, usize> = std::collections::BTreeMap::new();
        for entry in self.assets.iter() {
            let category = entry
                .key()
                .split('/')
                .next()
                .unwrap_or_default()
                .to_string();
            *counts.entry(category).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(name, count)| CategoryInfo { name, count })
            .collect()
    }

    /// Paged listing of one category, sorted by path.
    #[must_use]
    pub fn list(&self, category: &str, limit: usize, offset: usize) -> Vec<AssetSummary> {
        let mut paths: Vec<String> = self
            .assets
            .iter()
            .filter(|entry| {
                entry.key().split('/').next().unwrap_or_default() == category
            })
            .map(|entry| entry.key().clone())
            .collect();
        paths.sort();
        paths
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(summary)
            .collect()
    }

    /// Full document for one asset.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Value> {
        self.assets.get(path).map(|entry| entry.value().clone())
    }

    /// Case-insensitive substring search over asset paths.
    #[must_use]
    pub fn search(&self, query: &str, limit: usize) -> Vec<AssetSummary> {
        let query = query.to_lowercase();
        let mut paths: Vec<String> = self
            .assets
            .iter()
            .filter(|entry| entry.key().to_lowercase().contains(&query))
            .map(|entry| entry.key().clone())
            .collect();
        paths.sort();
        paths.into_iter().take(limit).map(summary).collect()
    }

    /// Paths matching a `*` wildcard pattern (a `*` spans path
    /// separators).
    #[must_use]
    pub fn wildcard_matches(&self, pattern: &str, limit: usize) -> Vec<String> {
        let mut paths: Vec<String> = self
            .assets
            .iter()
            .filter(|entry| wildcard_match(pattern, entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        paths.sort();
        paths.truncate(limit);
        paths
    }

    /// Resolve a dotted path inside one asset document (field names or
    /// decimal indices), like entity expansion but over plain JSON.
    #[must_use]
    pub fn expand(&self, path: &str, value_path: &str) -> Option<Value> {
        let document = self.get(path)?;
        let mut current = &document;
        for segment in value_path.split('.').filter(|s| !s.is_empty()) {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }
}

fn summary(path: String) -> AssetSummary {
    let name = path.rsplit('/').next().unwrap_or(&path).to_string();
    AssetSummary { path, name }
}

/// Greedy `*` glob over a full path string.
fn wildcard_match(pattern: &str, candidate: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == candidate;
    }

    let mut remainder = candidate;
    for (index, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        match remainder.find(part) {
            Some(found) => {
                // The first part must anchor at the start.
                if index == 0 && found != 0 {
                    return false;
                }
                remainder = &remainder[found + part.len()..];
            }
            None => return false,
        }
    }
    // The last part must anchor at the end.
    parts
        .last()
        .map(|last| last.is_empty() || candidate.ends_with(last))
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn catalog() -> AssetCatalog {
        let catalog = AssetCatalog::new();
        catalog.insert("npc/roles/cow", json!({"name": "cow", "speed": 1.2}));
        catalog.insert("npc/roles/guard", json!({"name": "guard", "speed": 2.0}));
        catalog.insert("items/sword", json!({"damage": [1, 2, 3]}));
        catalog
    }

    #[test]
    fn test_categories() {
        let catalog = catalog();
        let categories = catalog.categories();
        assert_eq!(
            categories,
            vec![
                CategoryInfo { name: "items".into(), count: 1 },
                CategoryInfo { name: "npc".into(), count: 2 },
            ]
        );
    }

    #[test]
    fn test_list_paging() {
        let catalog = catalog();
        let all = catalog.list("npc", 10, 0);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].path, "npc/roles/cow");
        assert_eq!(all[0].name, "cow");

        let page = catalog.list("npc", 1, 1);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].path, "npc/roles/guard");
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let catalog = catalog();
        assert_eq!(catalog.search("GUARD", 10).len(), 1);
        assert_eq!(catalog.search("roles", 10).len(), 2);
        assert!(catalog.search("dragon", 10).is_empty());
    }

    #[test]
    fn test_wildcard_matching() {
        let catalog = catalog();
        assert_eq!(catalog.wildcard_matches("npc/*", 10).len(), 2);
        assert_eq!(catalog.wildcard_matches("*/sword", 10), vec!["items/sword"]);
        assert_eq!(catalog.wildcard_matches("npc/roles/cow", 10).len(), 1);
        assert!(catalog.wildcard_matches("npc/items/*", 10).is_empty());
        assert_eq!(catalog.wildcard_matches("*roles*", 10).len(), 2);
    }

    #[test]
    fn test_expand_digs_into_documents() {
        let catalog = catalog();
        assert_eq!(catalog.expand("items/sword", "damage.1"), Some(json!(2)));
        assert_eq!(catalog.expand("npc/roles/cow", "name"), Some(json!("cow")));
        assert_eq!(catalog.expand("npc/roles/cow", "missing"), None);
        assert_eq!(catalog.expand("nope", "name"), None);
    }

    #[test]
    fn test_load_dir_round_trip() {
        let dir = std::env::temp_dir().join(format!("inspector-assets-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("npc")).unwrap();
        std::fs::write(dir.join("npc/cow.json"), r#"{"name": "cow"}"#).unwrap();
        std::fs::write(dir.join("npc/bad.json"), "not json").unwrap();

        let catalog = AssetCatalog::new();
        assert_eq!(catalog.load_dir(&dir), 1);
        assert_eq!(catalog.get("npc/cow"), Some(json!({"name": "cow"})));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
