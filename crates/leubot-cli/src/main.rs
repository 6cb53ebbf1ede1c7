//! `leubot` – serves the arm over HTTP.
//!
//! 1. Loads the configuration (`--config` or `~/.leubot/config.toml`, then
//!    `LEUBOT_*` overrides) and initialises logging.
//! 2. Opens the ArmLink device, or falls back to a logging dry-run transport.
//! 3. Starts the notification relay, then the arbitrator (which parks the arm
//!    before taking requests), then the HTTP cockpit.
//! 4. On Ctrl-C puts the arm to sleep and exits.  If the arbitrator task dies
//!    on its own the process exits non-zero instead of serving errors.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use leubot_cockpit::{AppState, CockpitServer};
use leubot_hal::{ArmLinkTransport, ArmTransport};
use leubot_middleware::{EventBus, LightSwitch, NotificationRelay, SlackWebhook};
use leubot_runtime::{Arbitrator, init_tracing};
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use zeroize::Zeroizing;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "leubot")]
#[command(about = "HTTP control surface for a PhantomX reactor arm", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    ///
    /// Default: ~/.leubot/config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log the frames instead of writing them to the configured device.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let telemetry = init_tracing("leubot");

    let cfg = match config::load(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "cannot load configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(config = ?cfg, otlp = telemetry.is_exporting(), "configuration loaded");

    let bus = EventBus::default();
    // Subscribe the relay first so it sees the startup park.
    let relay = build_relay(&cfg);
    let relay_task = (!relay.is_empty()).then(|| relay.spawn(&bus));

    let transport = open_transport(&cfg, args.dry_run).await;
    let (arm, mut arbitrator) = match Arbitrator::spawn(cfg.arbitrator(), transport, bus.clone()) {
        Ok(spawned) => spawned,
        Err(e) => {
            error!(error = %e, "invalid arbitrator settings");
            return ExitCode::FAILURE;
        }
    };

    let state = AppState {
        arm: arm.clone(),
        bus,
        api: Arc::new(cfg.api()),
    };
    let (stop_http, http_stopped) = oneshot::channel::<()>();
    let mut server = tokio::spawn(
        CockpitServer::new(state)
            .with_addr(cfg.listen_addr())
            .run(async {
                let _ = http_stopped.await;
            }),
    );

    let code = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, putting the arm to sleep");
            if let Err(e) = arm.shutdown().await {
                warn!(error = %e, "arbitrator already stopped");
            }
            ExitCode::SUCCESS
        }
        result = &mut arbitrator => {
            error!(?result, "arbitrator stopped unexpectedly");
            ExitCode::FAILURE
        }
        result = &mut server => {
            match result {
                Ok(Ok(())) => error!("cockpit stopped unexpectedly"),
                Ok(Err(e)) => error!(error = %e, "cockpit failed"),
                Err(e) => error!(error = %e, "cockpit task panicked"),
            }
            let _ = arm.shutdown().await;
            ExitCode::FAILURE
        }
    };

    let _ = stop_http.send(());
    if !server.is_finished() {
        server.abort();
    }
    if let Some(task) = relay_task {
        task.abort();
    }
    code
}

async fn open_transport(cfg: &Config, dry_run: bool) -> Box<dyn ArmTransport> {
    let device = match (&cfg.serial_device, dry_run) {
        (Some(device), false) => device,
        _ => return Box::new(ArmLinkTransport::dry_run()),
    };
    match ArmLinkTransport::open(device).await {
        Ok(transport) => Box::new(transport),
        Err(e) => {
            warn!(device = %device.display(), error = %e, "cannot open ArmLink device, falling back to dry run");
            Box::new(ArmLinkTransport::dry_run())
        }
    }
}

fn build_relay(cfg: &Config) -> NotificationRelay {
    let mut relay = NotificationRelay::new();
    if let Some(url) = &cfg.slack_webhook_url {
        relay = relay.with_notifier(SlackWebhook::new(Zeroizing::new(url.clone())));
    }
    if let Some(light) = &cfg.light {
        relay = relay.with_notifier(LightSwitch::new(
            light.cli_path.clone(),
            light.ip.clone(),
            Zeroizing::new(light.token.clone()),
        ));
    }
    relay
}
