use std::collections::HashMap;

use crate::{
    events::{self, RawEvent},
    sync::RoomSummary,
};

/// A room as reported in notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub room_id: String,
    pub display_name: String,
}

#[derive(Debug, Default)]
struct RoomState {
    name: Option<String>,
    canonical_alias: Option<String>,
    heroes: Vec<String>,
    joined_member_count: u64,
    invited_member_count: u64,
    /// Display names of members seen in state, keyed by user ID.
    member_names: HashMap<String, String>,
}

/// In-memory view of the room state needed to compute display names.
///
/// Fed exclusively from sync batches; nothing here is ever written back to
/// the server.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<String, RoomState>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Apply a room summary. Fields the server omitted are left unchanged.
    pub fn apply_summary(&mut self, room_id: &str, summary: &RoomSummary) {
        let state = self.rooms.entry(room_id.to_string()).or_default();
        if let Some(heroes) = &summary.heroes {
            state.heroes.clone_from(heroes);
        }
        if let Some(joined) = summary.joined_member_count {
            state.joined_member_count = joined;
        }
        if let Some(invited) = summary.invited_member_count {
            state.invited_member_count = invited;
        }
    }

    /// Apply one state event. Non-state and unrelated events are ignored.
    pub fn apply_state_event(&mut self, room_id: &str, event: &RawEvent) {
        let Some(state_key) = event.state_key.as_deref() else {
            return;
        };
        let state = self.rooms.entry(room_id.to_string()).or_default();
        match event.event_type.as_str() {
            events::ROOM_NAME => state.name = events::room_name(event),
            events::ROOM_CANONICAL_ALIAS => state.canonical_alias = events::canonical_alias(event),
            events::ROOM_MEMBER => match events::member(event) {
                (Some("join" | "invite"), Some(name)) => {
                    state
                        .member_names
                        .insert(state_key.to_string(), name.to_string());
                },
                _ => {
                    state.member_names.remove(state_key);
                },
            },
            _ => {},
        }
    }

    /// Drop everything known about a room the account has left.
    pub fn forget(&mut self, room_id: &str) {
        self.rooms.remove(room_id);
    }

    /// Resolve the room's current display name.
    ///
    /// Order: explicit name, canonical alias, hero members, then
    /// `Empty Room`. Unknown rooms fall through to `Empty Room` as well.
    pub fn room(&self, room_id: &str) -> Room {
        let display_name = match self.rooms.get(room_id) {
            Some(state) => display_name(state),
            None => EMPTY_ROOM.to_string(),
        };
        Room {
            room_id: room_id.to_string(),
            display_name,
        }
    }
}

const EMPTY_ROOM: &str = "Empty Room";

fn display_name(state: &RoomState) -> String {
    if let Some(name) = &state.name {
        return name.clone();
    }
    if let Some(alias) = &state.canonical_alias {
        return alias.clone();
    }

    let names: Vec<&str> = state
        .heroes
        .iter()
        .map(|user_id| {
            state
                .member_names
                .get(user_id)
                .map(String::as_str)
                .unwrap_or(user_id.as_str())
        })
        .collect();

    // The summary counts include the relay's own account.
    let total = state.joined_member_count + state.invited_member_count;
    let others = total.saturating_sub(1 + names.len() as u64);

    match (names.as_slice(), others) {
        ([], _) => EMPTY_ROOM.to_string(),
        ([only], 0) => (*only).to_string(),
        ([first, second], 0) => format!("{first} and {second}"),
        (listed, 0) => {
            let (last, head) = listed.split_last().unwrap_or((&"", &[]));
            format!("{} and {last}", head.join(", "))
        },
        (listed, others) => {
            let suffix = if others == 1 { "other" } else { "others" };
            format!("{} and {others} {suffix}", listed.join(", "))
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, rstest::rstest, serde_json::json};

    fn state_event(event_type: &str, state_key: &str, content: serde_json::Value) -> RawEvent {
        serde_json::from_value(json!({
            "type": event_type,
            "state_key": state_key,
            "content": content,
        }))
        .unwrap()
    }

    fn summary(heroes: &[&str], joined: u64, invited: u64) -> RoomSummary {
        RoomSummary {
            heroes: Some(heroes.iter().map(|h| h.to_string()).collect()),
            joined_member_count: Some(joined),
            invited_member_count: Some(invited),
        }
    }

    #[test]
    fn explicit_name_wins() {
        let mut dir = RoomDirectory::new();
        dir.apply_state_event(
            "!abc:server",
            &state_event("m.room.canonical_alias", "", json!({ "alias": "#gen:server" })),
        );
        dir.apply_state_event(
            "!abc:server",
            &state_event("m.room.name", "", json!({ "name": "general" })),
        );
        assert_eq!(dir.room("!abc:server"), Room {
            room_id: "!abc:server".into(),
            display_name: "general".into(),
        });
    }

    #[test]
    fn alias_used_when_name_removed() {
        let mut dir = RoomDirectory::new();
        dir.apply_state_event(
            "!abc:server",
            &state_event("m.room.name", "", json!({ "name": "general" })),
        );
        dir.apply_state_event(
            "!abc:server",
            &state_event("m.room.canonical_alias", "", json!({ "alias": "#gen:server" })),
        );
        dir.apply_state_event("!abc:server", &state_event("m.room.name", "", json!({})));
        assert_eq!(dir.room("!abc:server").display_name, "#gen:server");
    }

    #[rstest]
    #[case(&[], 1, 0, "Empty Room")]
    #[case(&["@alice:server"], 2, 0, "Alice")]
    #[case(&["@alice:server", "@bob:server"], 3, 0, "Alice and @bob:server")]
    #[case(&["@alice:server", "@bob:server", "@carol:server"], 4, 0, "Alice, @bob:server and @carol:server")]
    #[case(&["@alice:server", "@bob:server"], 5, 1, "Alice, @bob:server and 3 others")]
    #[case(&["@alice:server"], 3, 0, "Alice and 1 other")]
    fn hero_names(
        #[case] heroes: &[&str],
        #[case] joined: u64,
        #[case] invited: u64,
        #[case] expected: &str,
    ) {
        let mut dir = RoomDirectory::new();
        dir.apply_summary("!dm:server", &summary(heroes, joined, invited));
        dir.apply_state_event(
            "!dm:server",
            &state_event(
                "m.room.member",
                "@alice:server",
                json!({ "membership": "join", "displayname": "Alice" }),
            ),
        );
        assert_eq!(dir.room("!dm:server").display_name, expected);
    }

    #[test]
    fn departed_member_loses_display_name() {
        let mut dir = RoomDirectory::new();
        dir.apply_summary("!dm:server", &summary(&["@alice:server"], 2, 0));
        dir.apply_state_event(
            "!dm:server",
            &state_event(
                "m.room.member",
                "@alice:server",
                json!({ "membership": "join", "displayname": "Alice" }),
            ),
        );
        dir.apply_state_event(
            "!dm:server",
            &state_event("m.room.member", "@alice:server", json!({ "membership": "leave" })),
        );
        assert_eq!(dir.room("!dm:server").display_name, "@alice:server");
    }

    #[test]
    fn partial_summary_keeps_previous_counts() {
        let mut dir = RoomDirectory::new();
        dir.apply_summary("!r:server", &summary(&["@alice:server"], 3, 0));
        dir.apply_summary("!r:server", &RoomSummary::default());
        assert_eq!(dir.room("!r:server").display_name, "@alice:server and 1 other");
    }

    #[test]
    fn unknown_and_forgotten_rooms_are_empty() {
        let mut dir = RoomDirectory::new();
        assert_eq!(dir.room("!nope:server").display_name, "Empty Room");
        dir.apply_state_event(
            "!abc:server",
            &state_event("m.room.name", "", json!({ "name": "general" })),
        );
        assert_eq!(dir.len(), 1);
        dir.forget("!abc:server");
        assert!(dir.is_empty());
        assert_eq!(dir.room("!abc:server").display_name, "Empty Room");
    }
}
