use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Credentials issued by the homeserver at login.
///
/// Created once and only read afterwards.
#[derive(Clone)]
pub struct Session {
    /// Fully qualified MXID, as returned by the server.
    pub user_id: String,
    pub device_id: String,
    pub access_token: Secret<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("device_id", &self.device_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    #[serde(rename = "type")]
    pub login_type: &'static str,
    pub identifier: UserIdentifier<'a>,
    pub password: &'a str,
    pub initial_device_display_name: &'a str,
}

#[derive(Serialize)]
pub(crate) struct UserIdentifier<'a> {
    #[serde(rename = "type")]
    pub id_type: &'static str,
    pub user: &'a str,
}

impl<'a> LoginRequest<'a> {
    pub(crate) fn password(user: &'a str, password: &'a Secret<String>, device: &'a str) -> Self {
        Self {
            login_type: "m.login.password",
            identifier: UserIdentifier {
                id_type: "m.id.user",
                user,
            },
            password: password.expose_secret(),
            initial_device_display_name: device,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct LoginResponse {
    pub user_id: String,
    pub access_token: String,
    pub device_id: String,
}

impl From<LoginResponse> for Session {
    fn from(resp: LoginResponse) -> Self {
        Self {
            user_id: resp.user_id,
            device_id: resp.device_id,
            access_token: Secret::new(resp.access_token),
        }
    }
}
