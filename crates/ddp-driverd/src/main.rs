mod bitmaps;
mod ui_socket;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use ddp_can::{SocketCanBus, CAN_ID_RECV};
use ddp_config::Config;
use ddp_presentation::{BitmapTable, PresentationService};
use ddp_protocol::Session;

/// Host-side driver for the DDP cluster protocol: opens a session with the
/// dashboard cluster, claims the DIS, and renders UI draw commands to it.
#[derive(Debug, Parser)]
#[clap(version, verbatim_doc_comment)]
struct Args {
    #[clap(short, long, default_value_t = tracing::Level::INFO)]
    log_level: tracing::Level,

    /// Path to the driver's TOML config file. Defaults baked in if absent.
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Optional bitmap asset table (JSON, spec §6). No bitmaps are drawable
    /// if omitted - `draw_bitmap` commands are dropped as Application errors.
    #[clap(short, long)]
    bitmaps: Option<PathBuf>,
}

fn main() -> eyre::Result<()> {
    let use_color = std::io::stderr().is_terminal();
    if use_color {
        color_eyre::install()?;
    }

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(args.log_level.into())
        .with_env_var("DDP_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(use_color)
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    tracing::info!(?config, "loaded configuration");

    let bitmap_table = match &args.bitmaps {
        Some(path) => bitmaps::load(path)?,
        None => BitmapTable::new(),
    };

    let bus = SocketCanBus::open(&config.can_channel, CAN_ID_RECV)
        .map_err(|e| eyre::eyre!("failed to bind CAN interface {}: {e}", config.can_channel))?;
    let session = Session::new(bus);
    let mut service = PresentationService::new(session, bitmap_table, config.enable_inactivity_release);

    let (tx, rx) = mpsc::channel();
    let ui_path = PathBuf::from(&config.ui_endpoint);
    ui_socket::spawn(&ui_path, tx)
        .map_err(|e| eyre::eyre!("failed to bind UI command-stream endpoint {}: {e}", ui_path.display()))?;

    run(&mut service, &rx)
}

/// The single-threaded cooperative main loop (spec §5): drain inbound CAN
/// events (pre-emption, keep-alive) before each outbound command batch so a
/// busy UI never starves them.
fn run(
    service: &mut PresentationService<SocketCanBus>,
    rx: &mpsc::Receiver<ddp_presentation::DrawCommand>,
) -> eyre::Result<()> {
    loop {
        if service.session_state() == ddp_protocol::SessionState::Disconnected {
            tracing::info!("(re)connecting to cluster");
            if let Err(e) = service.connect() {
                tracing::warn!(error = %e, "connect failed, retrying");
                std::thread::sleep(Duration::from_millis(500));
                continue;
            }
        }

        if let Err(e) = service.tick() {
            tracing::warn!(error = %e, "tick failed");
        }

        while let Ok(command) = rx.try_recv() {
            if let Err(e) = service.submit(command) {
                tracing::warn!(error = %e, "dropping draw command");
            }
        }

        std::thread::sleep(Duration::from_millis(5));
    }
}
