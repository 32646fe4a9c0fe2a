//! Minimal Matrix client-server API support for the reaction relay.
//!
//! Covers password login, the `/sync` long-poll, logout, and the small slice
//! of room state needed to name rooms. Only `m.reaction` annotations are
//! surfaced as typed events.

pub mod client;
pub mod error;
pub mod events;
pub mod rooms;
pub mod session;
pub mod sync;

pub use {
    client::{LoggedInClient, MatrixClient, SyncApi},
    error::{Error, Result},
    events::{InvalidReaction, RawEvent, ReactionEvent},
    rooms::{Room, RoomDirectory},
    session::Session,
    sync::{JoinedRoom, SyncResponse},
};
