//! Reaction relay pipeline.
//!
//! The [`consumer`] drives the `/sync` loop and hands every reaction to the
//! [`filter`]; eligible reactions become a [`payload`] that the
//! [`dispatcher`] POSTs to the webhook exactly once.

pub mod consumer;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod payload;

pub use {
    consumer::{Disposition, EventStreamConsumer, RelayStats},
    dispatcher::{NotificationSink, WebhookDispatcher},
    error::{Error, Result},
    filter::{ReactionFilter, RejectReason, Verdict},
    payload::NotificationPayload,
};
