//! # inspector_assets
//!
//! Thin wrappers around the host's static asset catalog and its JSON
//! patch engine:
//!
//! - [`store`] — browse the catalog: categories, listings, detail,
//!   substring search, and wildcard testing.
//! - [`patch`] — author patches: diff an edited document against its base
//!   asset, save drafts, publish, and apply overlays.
//! - [`history`] — the bounded in-memory session history of draft and
//!   publish operations.
//!
//! The catalog here is directory-backed with a concurrent in-memory
//! cache; a real deployment points it at the host's asset root.

pub mod history;
pub mod patch;
pub mod store;

pub use history::{HistoryEntry, HistoryOperation, SessionHistory};
pub use patch::{
    apply_patch, generate_patch, AssetError, DraftInfo, DraftStore, BASE_ASSET_PATH_KEY,
};
pub use store::{AssetCatalog, AssetSummary, CategoryInfo};
