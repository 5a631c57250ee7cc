//! # inspector_net
//!
//! The inspector's framed message bus.
//!
//! - [`messages`] — the [`MessageType`] enumeration and the [`Frame`]
//!   envelope every bus message travels in.
//! - [`session`] — per-connection state and the broadcast registry.
//! - [`server`] — the WebSocket gateway: accept loop, capacity cap,
//!   connect synchronization, and request dispatch into a
//!   [`RequestHandler`].
//! - [`error`] — transport-layer error types.

pub mod error;
pub mod messages;
pub mod server;
pub mod session;

pub use error::NetError;
pub use messages::{Frame, FrameError, MessageType};
pub use server::{InspectorGateway, RequestHandler};
pub use session::{Session, SessionRegistry};
