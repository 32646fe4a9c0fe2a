use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The sync loop hit an error it cannot recover from.
    #[error("fatal sync error: {0}")]
    Sync(#[from] reaction_relay_matrix::Error),

    /// The webhook request could not be completed.
    #[error("webhook request failed: {0}")]
    Webhook(#[from] reqwest::Error),

    /// The webhook answered with a non-2xx status.
    #[error("webhook returned {status}: {body}")]
    WebhookStatus { status: u16, body: String },
}

pub type Result<T> = std::result::Result<T, Error>;
