//! car-teleop - remote control panel for a differential-drive vehicle
//!
//! Drives the vehicle over MQTT from the keyboard, a virtual joystick pad,
//! a gamepad or a button bank, and shows the telemetry it reports back.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use car_teleop::cli::{self, ReplCommand};
use car_teleop::config::{AppConfig, ConfigWatcher};
use car_teleop::input::gamepad::{self, StickTick};
use car_teleop::panel::{ControlPanel, PanelEvent};
use car_teleop::transport::{ConsoleTransport, MqttTransport, Transport, TransportEvent};

/// How long the broker session gets to flush the final stop
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Remote control panel for a differential-drive vehicle over MQTT
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long)]
    log_dir: Option<String>,

    /// Broker address, overrides broker.url from the config file
    #[arg(short, long)]
    broker: Option<String>,

    /// Log traffic locally instead of connecting to a broker
    #[arg(long)]
    dry_run: bool,

    /// List connected gamepads and exit
    #[arg(long)]
    list_gamepads: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let _log_guard = init_logging(&args.log_level, args.log_dir.as_deref())?;

    info!("Starting car-teleop v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = AppConfig::load_or_default(&args.config).await?;
    if let Some(url) = &args.broker {
        config.broker.url = url.clone();
    }
    config.apply_env_overrides();
    config.validate().context("Invalid configuration")?;

    if args.list_gamepads {
        gamepad::print_gamepad_diagnostics(config.control.deadzone);
        return Ok(());
    }

    let (transport_tx, transport_rx) = mpsc::unbounded_channel::<TransportEvent>();
    let transport: Box<dyn Transport> = if args.dry_run {
        info!("Dry run: commands are logged, nothing is sent");
        Box::new(ConsoleTransport::new(transport_tx))
    } else {
        Box::new(MqttTransport::new(transport_tx))
    };

    let (stick_tx, stick_rx) = mpsc::unbounded_channel::<StickTick>();
    let _gamepad = gamepad::init(&config.gamepad, stick_tx);

    // Hot reload only applies when there is a file to watch
    let config_watcher = if std::path::Path::new(&args.config).exists() {
        match ConfigWatcher::new(args.config.clone()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("Config hot-reload disabled: {:#}", e);
                None
            },
        }
    } else {
        None
    };

    let (repl_tx, repl_rx) = mpsc::unbounded_channel::<ReplCommand>();
    cli::spawn_repl(repl_tx)?;

    let panel = ControlPanel::new(transport, config).with_echo(true);

    println!("{}", "car-teleop ready. Type 'help' for commands.".bold().cyan());

    run_app(panel, transport_rx, stick_rx, repl_rx, config_watcher, shutdown_signal()).await;

    info!("car-teleop shutdown complete");
    Ok(())
}

async fn run_app<T: Transport>(
    mut panel: ControlPanel<T>,
    mut transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    mut stick_rx: mpsc::UnboundedReceiver<StickTick>,
    mut repl_rx: mpsc::UnboundedReceiver<ReplCommand>,
    mut config_watcher: Option<ConfigWatcher>,
    shutdown: impl std::future::Future<Output = ()>,
) {
    info!("Starting main loop...");

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = transport_rx.recv() => {
                panel.handle(PanelEvent::Transport(event));
            }

            Some(tick) = stick_rx.recv() => {
                panel.handle(PanelEvent::GamepadTick(tick));
            }

            command = repl_rx.recv() => {
                match command {
                    Some(ReplCommand::Panel(event)) => panel.handle(event),
                    Some(ReplCommand::ShowStatus) => println!("{}", cli::render_status(&panel)),
                    Some(ReplCommand::ShowLog(n)) => println!("{}", cli::render_log(&panel, n)),
                    Some(ReplCommand::Help) => cli::print_help(),
                    Some(ReplCommand::Empty) => {},
                    Some(ReplCommand::Quit) | None => {
                        info!("Operator console closed");
                        break;
                    },
                }
            }

            Some(new_config) = next_config(&mut config_watcher) => {
                if new_config.topics != panel.config().topics || new_config.gamepad != panel.config().gamepad {
                    warn!("Topic and gamepad changes take effect after a restart");
                }
                debug!("Applying reloaded control settings: {:?}", new_config.control);
                panel.handle(PanelEvent::Reconfigure(new_config.control));
            }

            _ = &mut shutdown => {
                break;
            }
        }
    }

    if let Some(closing) = panel.shutdown() {
        if tokio::time::timeout(CLOSE_TIMEOUT, closing).await.is_err() {
            warn!("Broker session did not close in time, stop command may be lost");
        }
    }
}

async fn next_config(watcher: &mut Option<ConfigWatcher>) -> Option<AppConfig> {
    match watcher {
        Some(watcher) => watcher.next_config().await,
        None => std::future::pending().await,
    }
}

fn init_logging(level: &str, log_dir: Option<&str>) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "car-teleop.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
