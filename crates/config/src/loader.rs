use std::time::Duration;

use {
    secrecy::Secret,
    tracing::{debug, info},
    url::Url,
};

use crate::{
    error::{Error, Result},
    schema::RelayConfig,
};

pub const HOMESERVER_URL: &str = "HOMESERVER_URL";
pub const BOT_USERNAME: &str = "BOT_USERNAME";
pub const BOT_PASSWORD: &str = "BOT_PASSWORD";
pub const WEBHOOK_URL: &str = "WEBHOOK_URL";
pub const CUTOFF_TIMESTAMP: &str = "CUTOFF_TIMESTAMP";
pub const SYNC_TIMEOUT_MS: &str = "SYNC_TIMEOUT_MS";
pub const SYNC_RETRY_DELAY_MS: &str = "SYNC_RETRY_DELAY_MS";
pub const WEBHOOK_TIMEOUT_SECS: &str = "WEBHOOK_TIMEOUT_SECS";
pub const DEVICE_DISPLAY_NAME: &str = "DEVICE_DISPLAY_NAME";
pub const LOGOUT_ON_SHUTDOWN: &str = "LOGOUT_ON_SHUTDOWN";

/// Load the configuration from the process environment.
pub fn load_from_env() -> Result<RelayConfig> {
    load_with(|name| std::env::var(name).ok())
}

/// Load the configuration using a custom variable lookup.
///
/// Blank values are treated as unset. All missing required variables are
/// reported in a single error.
pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<RelayConfig> {
    let get = |name: &str| {
        lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let homeserver = get(HOMESERVER_URL);
    let username = get(BOT_USERNAME);
    // Passwords are taken verbatim; only a fully blank value counts as unset.
    let password = lookup(BOT_PASSWORD).filter(|v| !v.trim().is_empty());
    let webhook = get(WEBHOOK_URL);

    let missing: Vec<&'static str> = [
        (HOMESERVER_URL, homeserver.is_none()),
        (BOT_USERNAME, username.is_none()),
        (BOT_PASSWORD, password.is_none()),
        (WEBHOOK_URL, webhook.is_none()),
    ]
    .into_iter()
    .filter_map(|(name, absent)| absent.then_some(name))
    .collect();

    let (Some(homeserver), Some(username), Some(password), Some(webhook)) =
        (homeserver, username, password, webhook)
    else {
        return Err(Error::Missing { names: missing });
    };

    let mut config = RelayConfig::new(
        parse_url(HOMESERVER_URL, &homeserver)?,
        username,
        Secret::new(password),
        parse_url(WEBHOOK_URL, &webhook)?,
    );

    config.cutoff_timestamp = match get(CUTOFF_TIMESTAMP) {
        Some(raw) => {
            let cutoff = raw.parse::<i64>().map_err(|_| {
                Error::invalid(
                    CUTOFF_TIMESTAMP,
                    &raw,
                    "must be an integer representing milliseconds since epoch",
                )
            })?;
            info!(cutoff, "using cutoff timestamp");
            Some(cutoff)
        },
        None => {
            info!("no cutoff timestamp provided, processing all events");
            None
        },
    };

    if let Some(raw) = get(SYNC_TIMEOUT_MS) {
        config.sync_timeout = Duration::from_millis(parse_u64(SYNC_TIMEOUT_MS, &raw)?);
    }
    if let Some(raw) = get(SYNC_RETRY_DELAY_MS) {
        config.sync_retry_delay = Duration::from_millis(parse_u64(SYNC_RETRY_DELAY_MS, &raw)?);
    }
    if let Some(raw) = get(WEBHOOK_TIMEOUT_SECS) {
        let secs = parse_u64(WEBHOOK_TIMEOUT_SECS, &raw)?;
        if secs == 0 {
            return Err(Error::invalid(
                WEBHOOK_TIMEOUT_SECS,
                raw,
                "must be at least 1 second",
            ));
        }
        config.webhook_timeout = Duration::from_secs(secs);
    }
    if let Some(name) = get(DEVICE_DISPLAY_NAME) {
        config.device_display_name = name;
    }
    if let Some(raw) = get(LOGOUT_ON_SHUTDOWN) {
        config.logout_on_shutdown = parse_bool(LOGOUT_ON_SHUTDOWN, &raw)?;
    }

    debug!(?config, "configuration loaded");
    Ok(config)
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|source| Error::InvalidUrl { name, source })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::invalid(
            name,
            raw,
            format!("must use http or https, not {other}"),
        )),
    }
}

fn parse_u64(name: &'static str, raw: &str) -> Result<u64> {
    raw.parse::<u64>()
        .map_err(|_| Error::invalid(name, raw, "must be a non-negative integer"))
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::invalid(name, raw, "must be true or false")),
    }
}
