//! # inspector_host
//!
//! The seam between the inspector and the host game server's ECS runtime.
//!
//! This crate provides:
//!
//! - [`introspect`] — the [`Introspect`] trait and the [`Reflection`] shape
//!   model through which the inspector discovers the structure of opaque
//!   host objects at runtime.
//! - [`clock`] — the game-time supplier used by alarm and timer math.
//! - [`world`] — the in-memory host world: entities, archetype chunks,
//!   handles, and lifecycle/tick observers.
//! - [`executor`] — the cooperative world thread; the only context in which
//!   ECS state may be read.
//! - [`components`] — host component doubles (transform, model, NPC, timers,
//!   alarms, …).
//! - [`behavior`] — the NPC behavior-tree primitives (roles, instructions,
//!   sensors, actions).
//!
//! A real game server would hand the inspector its own implementations of
//! these types; the in-memory world is the seam's reference implementation
//! and the host used by tests and the demo binary.

pub mod behavior;
pub mod clock;
pub mod components;
pub mod executor;
pub mod introspect;
pub mod world;

pub use clock::{FixedClock, GameClock, SystemClock};
pub use executor::{WorldHandle, WorldJob, WorldThread};
pub use introspect::{Introspect, ObjectRef, ReflectedValue, Reflection, Scalar, WeakObjectRef};
pub use world::{uuid_ref_index, Chunk, EntityHandle, HostWorld, WorldObserver};
