//! # inspector_core
//!
//! The inspection engine: watches the host world through lifecycle and
//! tick observers, collects value-shaped entity snapshots, caches them
//! alongside live component references, derives interpretive views
//! (timers, alarms, instruction trees), and answers client requests routed
//! in by the transport.
//!
//! Data flow:
//!
//! ```text
//! host ECS → (lifecycle + tick observers) → collector → Inspector
//!          → cache + broadcast
//! client → gateway → Inspector → (cache | query service | world-thread
//!          refresh | asset wrappers) → response frame
//! ```

pub mod cache;
pub mod collector;
pub mod config;
pub mod instructions;
pub mod model;
pub mod observers;
pub mod query;
pub mod service;

pub use cache::{CacheEntry, ComponentRefs, InspectorCache};
pub use collector::{CollectedEntity, EntityCollector};
pub use config::{DebugGates, InspectorConfig};
pub use model::{
    AlarmInfo, ComponentData, EntityListItem, EntitySnapshot, PacketDirection, PacketLogEntry,
    Position, PositionUpdate, Rotation, TimerInfo, WorldSnapshot,
};
pub use instructions::instruction_tree;
pub use observers::{LifecycleObserver, TickObserver};
pub use query::EntityQueryService;
pub use service::{Inspector, PacketAdapter};

/// The version advertised in snapshots and feature frames.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
