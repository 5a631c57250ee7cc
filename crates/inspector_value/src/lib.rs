//! # inspector_value
//!
//! Converts live host objects into JSON-safe value trees for transport.
//!
//! Two modes exist:
//!
//! - **default** — depth-bounded; complex objects at depth ≥ 2 are replaced
//!   by expansion placeholders a client can lazily resolve.
//! - **deep** — used exclusively by path expansion; recurses complex
//!   objects to the hard depth limit and never emits placeholders.
//!
//! Both modes cap collections at 50 elements and byte arrays at 100 bytes,
//! and recognise the special shapes (vectors, instants, UUIDs, byte arrays,
//! enumerations, alarms) before any generic field walking. Packet
//! serialization additionally redacts a fixed set of credential fields.

pub mod redact;
pub mod serializer;

pub use redact::{is_redacted, REDACTED};
pub use serializer::{
    expansion_placeholder, is_expansion_placeholder, ValueSerializer, MAX_BYTES, MAX_COLLECTION,
    MAX_DEPTH, PLACEHOLDER_DEPTH,
};
