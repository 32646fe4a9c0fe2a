use std::time::Duration;

use {
    reaction_relay_matrix::{JoinedRoom, ReactionEvent, RoomDirectory, SyncApi, SyncResponse},
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{
    dispatcher::NotificationSink,
    error::{Error, Result},
    filter::{ReactionFilter, RejectReason, Verdict},
    payload::NotificationPayload,
};

/// What happened to a single reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The webhook accepted the notification.
    Delivered,
    /// The single delivery attempt failed; the reaction is dropped.
    DeliveryFailed,
    /// A filter rule rejected the reaction; nothing was sent.
    Dropped(RejectReason),
}

/// Running totals, one bucket per [`Disposition`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub batches: u64,
    pub delivered: u64,
    pub delivery_failed: u64,
    pub dropped_self: u64,
    pub dropped_before_cutoff: u64,
    pub malformed: u64,
    pub sync_errors: u64,
}

impl RelayStats {
    fn record(&mut self, disposition: Disposition) {
        match disposition {
            Disposition::Delivered => self.delivered += 1,
            Disposition::DeliveryFailed => self.delivery_failed += 1,
            Disposition::Dropped(RejectReason::SelfReaction) => self.dropped_self += 1,
            Disposition::Dropped(RejectReason::BeforeCutoff) => self.dropped_before_cutoff += 1,
        }
    }

    /// Reactions that reached a final disposition.
    pub fn reactions(&self) -> u64 {
        self.delivered + self.delivery_failed + self.dropped_self + self.dropped_before_cutoff
    }
}

/// Drives the `/sync` long-poll and feeds every reaction through the filter
/// and the sink, strictly one at a time.
pub struct EventStreamConsumer<S, N> {
    source: S,
    sink: N,
    filter: ReactionFilter,
    rooms: RoomDirectory,
    since: Option<String>,
    retry_delay: Duration,
    stats: RelayStats,
}

impl<S: SyncApi, N: NotificationSink> EventStreamConsumer<S, N> {
    pub fn new(source: S, sink: N, filter: ReactionFilter) -> Self {
        Self {
            source,
            sink,
            filter,
            rooms: RoomDirectory::new(),
            since: None,
            retry_delay: Duration::ZERO,
            stats: RelayStats::default(),
        }
    }

    /// Pause applied after a recoverable sync error, unless the server asked
    /// for a specific wait.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn since(&self) -> Option<&str> {
        self.since.as_deref()
    }

    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    /// Poll until `cancel` fires or a fatal error occurs.
    ///
    /// Cancellation is only observed while waiting on the homeserver; a batch
    /// that is already being processed always runs to completion.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        info!("starting sync loop");
        loop {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!(stats = ?self.stats, "sync loop stopped");
                    return Ok(());
                },
                result = self.source.sync(self.since.as_deref()) => result,
            };

            match result {
                Ok(batch) => self.process_batch(batch).await,
                Err(e) if e.is_fatal() => {
                    error!(
                        error = %e,
                        errcode = ?e.errcode(),
                        stats = ?self.stats,
                        "fatal sync error, stopping"
                    );
                    return Err(Error::Sync(e));
                },
                Err(e) => {
                    self.stats.sync_errors += 1;
                    let delay = e.retry_after().unwrap_or(self.retry_delay);
                    warn!(
                        error = %e,
                        since = ?self.since,
                        retry_in_ms = delay.as_millis() as u64,
                        "sync failed, polling again"
                    );
                    if !delay.is_zero() {
                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => {},
                            () = tokio::time::sleep(delay) => {},
                        }
                    }
                },
            }
        }
    }

    /// Handle one batch, then advance the cursor.
    pub async fn process_batch(&mut self, batch: SyncResponse) {
        self.stats.batches += 1;
        let SyncResponse { next_batch, rooms } = batch;

        for (room_id, _) in &rooms.leave {
            debug!(room_id, "left room");
            self.rooms.forget(room_id);
        }

        for (room_id, room) in rooms.join {
            self.process_room(&room_id, room).await;
        }

        self.since = Some(next_batch);
    }

    async fn process_room(&mut self, room_id: &str, room: JoinedRoom) {
        self.rooms.apply_summary(room_id, &room.summary);
        for event in &room.state.events {
            self.rooms.apply_state_event(room_id, event);
        }

        if room.timeline.limited {
            debug!(
                room_id,
                prev_batch = ?room.timeline.prev_batch,
                "timeline limited, older events in this gap are not fetched"
            );
        }

        for event in &room.timeline.events {
            if event.is_state() {
                self.rooms.apply_state_event(room_id, event);
                continue;
            }
            if !event.is_reaction() {
                continue;
            }
            match ReactionEvent::from_raw(room_id, event) {
                Ok(reaction) => {
                    self.handle_reaction(&reaction).await;
                },
                Err(reason) => {
                    self.stats.malformed += 1;
                    debug!(
                        room_id,
                        event_id = ?event.event_id,
                        %reason,
                        "skipping malformed reaction"
                    );
                },
            }
        }
    }

    /// Run one reaction through the filter and, if eligible, the sink.
    pub async fn handle_reaction(&mut self, event: &ReactionEvent) -> Disposition {
        let disposition = match self.filter.evaluate(event) {
            Verdict::Reject(reason) => Disposition::Dropped(reason),
            Verdict::Accept => {
                let room = self.rooms.room(&event.room_id);
                info!(
                    room_id = %room.room_id,
                    room_name = %room.display_name,
                    sender = %event.sender,
                    "reaction detected"
                );
                debug!(
                    reaction_event_id = %event.event_id,
                    reacted_event_id = %event.relates_to,
                    reaction = %event.key,
                    "reaction details"
                );
                let payload = NotificationPayload::new(&room, event);
                self.sink.dispatch(&payload).await
            },
        };
        self.stats.record(disposition);
        disposition
    }
}
