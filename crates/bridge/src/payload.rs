use {
    reaction_relay_matrix::{ReactionEvent, Room},
    serde::Serialize,
};

/// Body POSTed to the webhook. These six keys are the whole payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub room_id: String,
    pub room_name: String,
    pub sender: String,
    pub reaction_event_id: String,
    pub reacted_event_id: String,
    pub reaction: String,
}

impl NotificationPayload {
    pub fn new(room: &Room, event: &ReactionEvent) -> Self {
        Self {
            room_id: room.room_id.clone(),
            room_name: room.display_name.clone(),
            sender: event.sender.clone(),
            reaction_event_id: event.event_id.clone(),
            reacted_event_id: event.relates_to.clone(),
            reaction: event.key.clone(),
        }
    }
}
