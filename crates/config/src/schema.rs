use std::time::Duration;

use {secrecy::Secret, url::Url};

/// Default long-poll timeout for `/sync`.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Default upper bound on a single webhook request.
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Device name registered with the homeserver at login.
pub const DEFAULT_DEVICE_DISPLAY_NAME: &str = "reaction-relay";

/// Immutable process configuration.
#[derive(Clone)]
pub struct RelayConfig {
    /// Homeserver base URL (`HOMESERVER_URL`).
    pub homeserver_url: Url,

    /// Account to log in as (`BOT_USERNAME`), localpart or full MXID.
    pub username: String,

    /// Account password (`BOT_PASSWORD`).
    pub password: Secret<String>,

    /// Where notifications are POSTed (`WEBHOOK_URL`).
    pub webhook_url: Url,

    /// Reactions with a server timestamp strictly below this (epoch ms) are
    /// ignored (`CUTOFF_TIMESTAMP`).
    pub cutoff_timestamp: Option<i64>,

    /// Long-poll timeout handed to `/sync` (`SYNC_TIMEOUT_MS`).
    pub sync_timeout: Duration,

    /// Pause after a recoverable sync error (`SYNC_RETRY_DELAY_MS`).
    /// Zero re-polls immediately.
    pub sync_retry_delay: Duration,

    /// Request timeout for webhook calls (`WEBHOOK_TIMEOUT_SECS`).
    pub webhook_timeout: Duration,

    /// `initial_device_display_name` sent at login (`DEVICE_DISPLAY_NAME`).
    pub device_display_name: String,

    /// Invalidate the session on graceful shutdown (`LOGOUT_ON_SHUTDOWN`).
    pub logout_on_shutdown: bool,
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("homeserver_url", &self.homeserver_url.as_str())
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("webhook_url", &"[REDACTED]")
            .field("cutoff_timestamp", &self.cutoff_timestamp)
            .field("sync_timeout", &self.sync_timeout)
            .field("sync_retry_delay", &self.sync_retry_delay)
            .field("webhook_timeout", &self.webhook_timeout)
            .field("device_display_name", &self.device_display_name)
            .field("logout_on_shutdown", &self.logout_on_shutdown)
            .finish()
    }
}

impl RelayConfig {
    /// Build a config with every optional setting at its default.
    pub fn new(
        homeserver_url: Url,
        username: impl Into<String>,
        password: Secret<String>,
        webhook_url: Url,
    ) -> Self {
        Self {
            homeserver_url,
            username: username.into(),
            password,
            webhook_url,
            cutoff_timestamp: None,
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
            sync_retry_delay: Duration::ZERO,
            webhook_timeout: DEFAULT_WEBHOOK_TIMEOUT,
            device_display_name: DEFAULT_DEVICE_DISPLAY_NAME.into(),
            logout_on_shutdown: false,
        }
    }
}
