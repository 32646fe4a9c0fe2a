use std::process::ExitCode;

use {
    anyhow::Context,
    clap::Parser,
    reaction_relay_bridge::{EventStreamConsumer, ReactionFilter, WebhookDispatcher},
    reaction_relay_config::RelayConfig,
    reaction_relay_matrix::{LoggedInClient, MatrixClient},
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "reaction-relay",
    version,
    about = "Relay Matrix reactions to an HTTP webhook",
    long_about = "Logs in to a Matrix homeserver, follows /sync and POSTs every eligible \
                  m.reaction event as JSON to WEBHOOK_URL. All connection settings are read \
                  from the environment (or a .env file)."
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

/// Where startup or the relay loop gave up. Each stage has its own exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Config,
    Login,
    Sync,
}

impl Stage {
    fn exit_code(self) -> u8 {
        match self {
            Self::Config => 2,
            Self::Login => 3,
            Self::Sync => 4,
        }
    }
}

struct Failure {
    stage: Stage,
    error: anyhow::Error,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, Failure>;
}

impl<T, E: Into<anyhow::Error>> AtStage<T> for Result<T, E> {
    fn at(self, stage: Stage) -> Result<T, Failure> {
        self.map_err(|e| Failure {
            stage,
            error: e.into(),
        })
    }
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

async fn login(config: &RelayConfig) -> anyhow::Result<LoggedInClient> {
    let client = MatrixClient::new(config.homeserver_url.clone(), config.sync_timeout)
        .context("building homeserver client")?;
    let logged_in = client
        .login(
            &config.username,
            &config.password,
            &config.device_display_name,
        )
        .await
        .with_context(|| format!("logging in to {}", config.homeserver_url))?;
    Ok(logged_in)
}

async fn run() -> Result<(), Failure> {
    let config = reaction_relay_config::load_from_env()
        .context("loading configuration from the environment")
        .at(Stage::Config)?;
    info!(
        homeserver = %config.homeserver_url,
        username = %config.username,
        sync_timeout_ms = config.sync_timeout.as_millis() as u64,
        "configuration loaded"
    );

    let dispatcher = WebhookDispatcher::new(config.webhook_url.clone(), config.webhook_timeout)
        .context("building webhook client")
        .at(Stage::Config)?;

    let session = login(&config).await.at(Stage::Login)?;
    let filter = ReactionFilter::new(session.user_id(), config.cutoff_timestamp);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received, stopping after the current batch");
        signal_cancel.cancel();
    });

    let mut consumer =
        EventStreamConsumer::new(session, dispatcher, filter).with_retry_delay(config.sync_retry_delay);
    let outcome = consumer.run(&cancel).await;
    let stats = consumer.stats().clone();

    if outcome.is_ok()
        && config.logout_on_shutdown
        && let Err(e) = consumer.source().logout().await
    {
        warn!(error = %e, "logout failed");
    }

    info!(
        batches = stats.batches,
        delivered = stats.delivered,
        delivery_failed = stats.delivery_failed,
        dropped_self = stats.dropped_self,
        dropped_before_cutoff = stats.dropped_before_cutoff,
        malformed = stats.malformed,
        sync_errors = stats.sync_errors,
        "relay stopped"
    );

    outcome.context("following /sync").at(Stage::Sync)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "reaction-relay starting");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure { stage, error }) => {
            let message = format!("{error:#}");
            error!(stage = ?stage, error = %message, "reaction-relay exiting");
            ExitCode::from(stage.exit_code())
        },
    }
}
