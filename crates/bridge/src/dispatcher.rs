use std::time::Duration;

use {
    async_trait::async_trait,
    tracing::{debug, error, info},
    url::Url,
};

use crate::{
    consumer::Disposition,
    error::{Error, Result},
    payload::NotificationPayload,
};

const MAX_ERROR_BODY: usize = 256;

/// Destination for eligible reactions.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Make one delivery attempt.
    async fn deliver(&self, payload: &NotificationPayload) -> Result<()>;

    /// Deliver once and log the outcome. Failures are never retried.
    async fn dispatch(&self, payload: &NotificationPayload) -> Disposition {
        match self.deliver(payload).await {
            Ok(()) => {
                info!(
                    reaction_event_id = %payload.reaction_event_id,
                    "webhook request sent successfully"
                );
                Disposition::Delivered
            },
            Err(e) => {
                error!(
                    reaction_event_id = %payload.reaction_event_id,
                    room_id = %payload.room_id,
                    error = %e,
                    "failed to send webhook request"
                );
                Disposition::DeliveryFailed
            },
        }
    }
}

/// POSTs notifications as JSON to a fixed URL.
pub struct WebhookDispatcher {
    http: reqwest::Client,
    url: Url,
}

impl WebhookDispatcher {
    pub fn new(url: Url, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl NotificationSink for WebhookDispatcher {
    async fn deliver(&self, payload: &NotificationPayload) -> Result<()> {
        debug!(
            reaction_event_id = %payload.reaction_event_id,
            reacted_event_id = %payload.reacted_event_id,
            reaction = %payload.reaction,
            "posting reaction to webhook"
        );
        let resp = self
            .http
            .post(self.url.clone())
            .json(payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(Error::WebhookStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
