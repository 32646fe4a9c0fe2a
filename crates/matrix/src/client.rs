use std::time::Duration;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::de::DeserializeOwned,
    tracing::{debug, info},
    url::Url,
};

use crate::{
    error::{Error, Result},
    session::{LoginRequest, LoginResponse, Session},
    sync::{SyncResponse, sync_filter},
};

/// Headroom on top of the long-poll timeout so the HTTP client does not
/// abort a request the homeserver is still legitimately holding open.
const LONG_POLL_GRACE: Duration = Duration::from_secs(15);

/// Source of sync batches. Implemented by [`LoggedInClient`].
#[async_trait]
pub trait SyncApi: Send + Sync {
    /// Fetch the next batch, continuing from `since` when given.
    async fn sync(&self, since: Option<&str>) -> Result<SyncResponse>;
}

/// Unauthenticated handle on a homeserver.
#[derive(Clone)]
pub struct MatrixClient {
    http: reqwest::Client,
    homeserver: Url,
    sync_timeout: Duration,
    filter: String,
}

impl MatrixClient {
    pub fn new(homeserver: Url, sync_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(sync_timeout + LONG_POLL_GRACE)
            .build()?;
        Ok(Self {
            http,
            homeserver,
            sync_timeout,
            filter: sync_filter().to_string(),
        })
    }

    pub fn homeserver(&self) -> &Url {
        &self.homeserver
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/_matrix/client/v3/{path}",
            self.homeserver.as_str().trim_end_matches('/')
        )
    }

    /// Perform a single password login. There is no retry: any failure is
    /// returned to the caller as-is.
    pub async fn login(
        self,
        username: &str,
        password: &Secret<String>,
        device_display_name: &str,
    ) -> Result<LoggedInClient> {
        debug!(homeserver = %self.homeserver, username, "logging in");
        let resp = self
            .http
            .post(self.endpoint("login"))
            .json(&LoginRequest::password(
                username,
                password,
                device_display_name,
            ))
            .send()
            .await?;
        let session: Session = read_json::<LoginResponse>(resp).await?.into();
        info!(
            user_id = %session.user_id,
            device_id = %session.device_id,
            "logged in successfully"
        );
        Ok(LoggedInClient {
            client: self,
            session,
        })
    }
}

/// A homeserver handle bound to one session.
pub struct LoggedInClient {
    client: MatrixClient,
    session: Session,
}

impl LoggedInClient {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn user_id(&self) -> &str {
        &self.session.user_id
    }

    /// Invalidate the access token server-side.
    pub async fn logout(&self) -> Result<()> {
        let resp = self
            .client
            .http
            .post(self.client.endpoint("logout"))
            .bearer_auth(self.session.access_token.expose_secret())
            .json(&serde_json::json!({}))
            .send()
            .await?;
        read_json::<serde_json::Value>(resp).await?;
        info!(
            user_id = %self.session.user_id,
            device_id = %self.session.device_id,
            "logged out"
        );
        Ok(())
    }
}

#[async_trait]
impl SyncApi for LoggedInClient {
    async fn sync(&self, since: Option<&str>) -> Result<SyncResponse> {
        let timeout_ms = self.client.sync_timeout.as_millis().to_string();
        let mut query = vec![
            ("timeout", timeout_ms.as_str()),
            ("filter", self.client.filter.as_str()),
        ];
        if let Some(since) = since {
            query.push(("since", since));
        }

        let resp = self
            .client
            .http
            .get(self.client.endpoint("sync"))
            .bearer_auth(self.session.access_token.expose_secret())
            .query(&query)
            .send()
            .await?;
        let batch: SyncResponse = read_json(resp).await?;
        debug!(
            next_batch = %batch.next_batch,
            rooms = batch.rooms.join.len(),
            reactions = batch.reaction_count(),
            "sync batch received"
        );
        Ok(batch)
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp.bytes().await?;
    if !status.is_success() {
        return Err(Error::from_response(status, &body));
    }
    serde_json::from_slice(&body).map_err(|source| Error::InvalidResponse { source })
}
