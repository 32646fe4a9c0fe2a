use {reaction_relay_matrix::ReactionEvent, tracing::debug};

/// Why a reaction was not forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// The relay's own account reacted.
    SelfReaction,
    /// The reaction is older than the configured cutoff.
    BeforeCutoff,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelfReaction => "self_reaction",
            Self::BeforeCutoff => "before_cutoff",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(RejectReason),
}

impl Verdict {
    pub fn is_eligible(self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Decides which reactions are forwarded.
///
/// Only the sender and the timestamp are consulted; the reaction key, room
/// and target never cause a rejection.
#[derive(Debug, Clone)]
pub struct ReactionFilter {
    own_user_id: String,
    cutoff_timestamp: Option<i64>,
}

impl ReactionFilter {
    pub fn new(own_user_id: impl Into<String>, cutoff_timestamp: Option<i64>) -> Self {
        Self {
            own_user_id: own_user_id.into(),
            cutoff_timestamp,
        }
    }

    pub fn evaluate(&self, event: &ReactionEvent) -> Verdict {
        if event.sender == self.own_user_id {
            debug!(
                event_id = %event.event_id,
                sender = %event.sender,
                "ignoring own reaction"
            );
            return Verdict::Reject(RejectReason::SelfReaction);
        }

        if let Some(cutoff) = self.cutoff_timestamp
            && event.server_timestamp < cutoff
        {
            debug!(
                event_id = %event.event_id,
                sender = %event.sender,
                server_timestamp = event.server_timestamp,
                cutoff,
                "ignoring reaction from before the cutoff timestamp"
            );
            return Verdict::Reject(RejectReason::BeforeCutoff);
        }

        Verdict::Accept
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn reaction(sender: &str, ts: i64) -> ReactionEvent {
        ReactionEvent {
            event_id: "$r1".into(),
            relates_to: "$m1".into(),
            sender: sender.into(),
            key: "👍".into(),
            server_timestamp: ts,
            room_id: "!abc:server".into(),
        }
    }

    #[rstest]
    #[case("@bot:server", 3000, Some(2000), Verdict::Reject(RejectReason::SelfReaction))]
    #[case("@bot:server", 1000, Some(2000), Verdict::Reject(RejectReason::SelfReaction))]
    #[case("@alice:server", 1000, Some(2000), Verdict::Reject(RejectReason::BeforeCutoff))]
    #[case("@alice:server", 1999, Some(2000), Verdict::Reject(RejectReason::BeforeCutoff))]
    #[case("@alice:server", 2000, Some(2000), Verdict::Accept)]
    #[case("@alice:server", 3000, Some(2000), Verdict::Accept)]
    #[case("@alice:server", 0, None, Verdict::Accept)]
    #[case("@alice:server", -5, None, Verdict::Accept)]
    fn evaluates_rules_in_order(
        #[case] sender: &str,
        #[case] ts: i64,
        #[case] cutoff: Option<i64>,
        #[case] expected: Verdict,
    ) {
        let filter = ReactionFilter::new("@bot:server", cutoff);
        assert_eq!(filter.evaluate(&reaction(sender, ts)), expected);
    }

    #[test]
    fn self_check_is_exact_match() {
        let filter = ReactionFilter::new("@bot:server", None);
        assert!(filter.evaluate(&reaction("@bot:other", 1)).is_eligible());
        assert!(filter.evaluate(&reaction("@Bot:server", 1)).is_eligible());
    }

    #[test]
    fn content_never_rejects() {
        let filter = ReactionFilter::new("@bot:server", None);
        let mut event = reaction("@alice:server", 1);
        event.key = String::new();
        event.room_id = String::new();
        event.relates_to = String::new();
        assert_eq!(filter.evaluate(&event), Verdict::Accept);
    }

    #[test]
    fn reason_codes() {
        assert_eq!(RejectReason::SelfReaction.to_string(), "self_reaction");
        assert_eq!(RejectReason::BeforeCutoff.as_str(), "before_cutoff");
    }
}
