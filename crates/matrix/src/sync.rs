use std::fmt;

use serde::{
    Deserialize, Deserializer,
    de::{IgnoredAny, MapAccess, Visitor},
};

use crate::events::{RawEvent, SYNC_EVENT_TYPES};

/// One `/sync` response, reduced to what the relay consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncResponse {
    /// Cursor to pass as `since` on the next call.
    pub next_batch: String,
    #[serde(default)]
    pub rooms: Rooms,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rooms {
    /// Joined rooms, in the order the server listed them.
    #[serde(default, deserialize_with = "ordered_map")]
    pub join: Vec<(String, JoinedRoom)>,
    /// Rooms the account left since the last batch; only the IDs matter.
    #[serde(default, deserialize_with = "ordered_map")]
    pub leave: Vec<(String, IgnoredAny)>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinedRoom {
    #[serde(default)]
    pub summary: RoomSummary,
    #[serde(default)]
    pub state: EventList,
    #[serde(default)]
    pub timeline: Timeline,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomSummary {
    #[serde(default, rename = "m.heroes")]
    pub heroes: Option<Vec<String>>,
    #[serde(default, rename = "m.joined_member_count")]
    pub joined_member_count: Option<u64>,
    #[serde(default, rename = "m.invited_member_count")]
    pub invited_member_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventList {
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub events: Vec<RawEvent>,
    #[serde(default)]
    pub limited: bool,
    #[serde(default)]
    pub prev_batch: Option<String>,
}

impl SyncResponse {
    /// Number of reaction events across all joined rooms.
    pub fn reaction_count(&self) -> usize {
        self.rooms
            .join
            .iter()
            .flat_map(|(_, room)| room.timeline.events.iter())
            .filter(|e| e.is_reaction())
            .count()
    }
}

/// Inline filter sent with every `/sync` call.
///
/// Timeline events are limited to reactions plus the state needed to name
/// rooms; presence and account data are switched off.
pub fn sync_filter() -> serde_json::Value {
    serde_json::json!({
        "presence": { "types": [] },
        "account_data": { "types": [] },
        "room": {
            "account_data": { "types": [] },
            "ephemeral": { "types": [] },
            "state": {
                "types": &SYNC_EVENT_TYPES[1..],
                "lazy_load_members": true
            },
            "timeline": {
                "types": SYNC_EVENT_TYPES,
                "lazy_load_members": true
            }
        }
    })
}

fn ordered_map<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct OrderedMap<V>(std::marker::PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMap<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map keyed by room ID")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, V>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(OrderedMap(std::marker::PhantomData))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn keeps_room_order() {
        let body = json!({
            "next_batch": "s2",
            "rooms": {
                "join": {
                    "!zeta:server": {},
                    "!alpha:server": {},
                    "!mid:server": {}
                }
            }
        });
        let resp: SyncResponse = serde_json::from_str(&body.to_string()).unwrap();
        let ids: Vec<&str> = resp.rooms.join.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["!zeta:server", "!alpha:server", "!mid:server"]);
    }

    #[test]
    fn parses_joined_room_sections() {
        let body = json!({
            "next_batch": "s9",
            "rooms": {
                "join": {
                    "!abc:server": {
                        "summary": {
                            "m.heroes": ["@alice:server"],
                            "m.joined_member_count": 2
                        },
                        "state": { "events": [
                            { "type": "m.room.name", "state_key": "", "content": { "name": "general" } }
                        ]},
                        "timeline": {
                            "limited": true,
                            "prev_batch": "p1",
                            "events": [{
                                "type": "m.reaction",
                                "event_id": "$r1",
                                "sender": "@alice:server",
                                "origin_server_ts": 3000,
                                "content": { "m.relates_to": {
                                    "rel_type": "m.annotation", "event_id": "$m1", "key": "👍"
                                }}
                            }]
                        }
                    }
                },
                "leave": { "!old:server": { "timeline": { "events": [] } } }
            }
        });
        let resp: SyncResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.next_batch, "s9");
        assert_eq!(resp.reaction_count(), 1);
        let (room_id, room) = &resp.rooms.join[0];
        assert_eq!(room_id, "!abc:server");
        assert_eq!(room.summary.joined_member_count, Some(2));
        assert_eq!(room.state.events.len(), 1);
        assert!(room.timeline.limited);
        assert_eq!(resp.rooms.leave[0].0, "!old:server");
    }

    #[test]
    fn empty_batch_has_no_rooms() {
        let resp: SyncResponse = serde_json::from_str(r#"{"next_batch":"s1"}"#).unwrap();
        assert!(resp.rooms.join.is_empty());
        assert_eq!(resp.reaction_count(), 0);
    }

    #[test]
    fn filter_limits_timeline_to_reactions_and_naming_state() {
        let filter = sync_filter();
        let timeline = filter["room"]["timeline"]["types"].as_array().unwrap();
        assert_eq!(timeline[0], "m.reaction");
        assert!(timeline.contains(&json!("m.room.name")));
        let state = filter["room"]["state"]["types"].as_array().unwrap();
        assert!(!state.contains(&json!("m.reaction")));
        assert_eq!(filter["presence"]["types"], json!([]));
    }
}
