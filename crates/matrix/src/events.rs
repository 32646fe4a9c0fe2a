use serde::Deserialize;

pub const REACTION: &str = "m.reaction";
pub const ROOM_NAME: &str = "m.room.name";
pub const ROOM_CANONICAL_ALIAS: &str = "m.room.canonical_alias";
pub const ROOM_MEMBER: &str = "m.room.member";

const ANNOTATION: &str = "m.annotation";

/// Event types requested from `/sync`. Reactions first, then the state
/// events used for room naming.
pub const SYNC_EVENT_TYPES: &[&str] = &[REACTION, ROOM_NAME, ROOM_CANONICAL_ALIAS, ROOM_MEMBER];

/// A room event as delivered in a sync batch, with the content left untyped.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub origin_server_ts: Option<i64>,
    /// Present only on state events.
    #[serde(default)]
    pub state_key: Option<String>,
    #[serde(default)]
    pub content: serde_json::Value,
}

impl RawEvent {
    pub fn is_state(&self) -> bool {
        self.state_key.is_some()
    }

    pub fn is_reaction(&self) -> bool {
        self.event_type == REACTION && !self.is_state()
    }

    fn content_str(&self, key: &str) -> Option<&str> {
        self.content.get(key).and_then(serde_json::Value::as_str)
    }
}

/// Why an `m.reaction` event could not be turned into a [`ReactionEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidReaction {
    #[error("not an m.reaction event")]
    WrongType,
    #[error("missing event_id")]
    MissingEventId,
    #[error("missing sender")]
    MissingSender,
    #[error("missing origin_server_ts")]
    MissingTimestamp,
    /// Redacted reactions arrive with an empty content object.
    #[error("missing m.relates_to")]
    MissingRelation,
    #[error("relation is not an annotation")]
    NotAnnotation,
    #[error("annotation has no target event_id")]
    MissingTarget,
    #[error("annotation has no key")]
    MissingKey,
}

/// A reaction (`m.annotation`) attached to an earlier event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    /// ID of the reaction event itself.
    pub event_id: String,
    /// ID of the event that was reacted to.
    pub relates_to: String,
    pub sender: String,
    /// The reaction symbol, usually an emoji.
    pub key: String,
    /// Milliseconds since the epoch, as stamped by the origin server.
    pub server_timestamp: i64,
    pub room_id: String,
}

impl ReactionEvent {
    pub fn from_raw(room_id: &str, raw: &RawEvent) -> Result<Self, InvalidReaction> {
        if !raw.is_reaction() {
            return Err(InvalidReaction::WrongType);
        }
        let event_id = raw.event_id.clone().ok_or(InvalidReaction::MissingEventId)?;
        let sender = raw.sender.clone().ok_or(InvalidReaction::MissingSender)?;
        let server_timestamp = raw.origin_server_ts.ok_or(InvalidReaction::MissingTimestamp)?;

        let relation = raw
            .content
            .get("m.relates_to")
            .filter(|v| v.is_object())
            .ok_or(InvalidReaction::MissingRelation)?;
        if relation.get("rel_type").and_then(serde_json::Value::as_str) != Some(ANNOTATION) {
            return Err(InvalidReaction::NotAnnotation);
        }
        let relates_to = relation
            .get("event_id")
            .and_then(serde_json::Value::as_str)
            .ok_or(InvalidReaction::MissingTarget)?
            .to_string();
        let key = relation
            .get("key")
            .and_then(serde_json::Value::as_str)
            .ok_or(InvalidReaction::MissingKey)?
            .to_string();

        Ok(Self {
            event_id,
            relates_to,
            sender,
            key,
            server_timestamp,
            room_id: room_id.to_string(),
        })
    }
}

/// `m.room.name` content, empty names treated as absent.
pub(crate) fn room_name(raw: &RawEvent) -> Option<String> {
    raw.content_str("name")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `m.room.canonical_alias` content.
pub(crate) fn canonical_alias(raw: &RawEvent) -> Option<String> {
    raw.content_str("alias")
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Membership and display name from `m.room.member` content.
pub(crate) fn member(raw: &RawEvent) -> (Option<&str>, Option<&str>) {
    (
        raw.content_str("membership"),
        raw.content_str("displayname").filter(|s| !s.is_empty()),
    )
}
