//! Process configuration for the reaction relay.
//!
//! Everything is read once from the environment at startup and handed to the
//! rest of the process as an immutable [`RelayConfig`].

pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{load_from_env, load_with},
    schema::RelayConfig,
};
