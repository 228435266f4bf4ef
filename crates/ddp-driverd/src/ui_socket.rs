//! The UI draw-command stream endpoint (spec §6): a line-delimited JSON
//! [`DrawCommand`] stream read from a Unix domain socket.
//!
//! The UI layer is assumed to serialize its own submissions (spec §5
//! "Shared resources"), so this accepts one connection at a time and hands
//! parsed commands to the main loop over a channel - a single-producer,
//! single-consumer queue, per spec's cyclic-coupling redesign note (§9).

use std::io::{BufRead, BufReader};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::mpsc::Sender;

use ddp_presentation::DrawCommand;

/// Bind `path` and spawn a background thread that forwards every parsed
/// command to `tx`. Unparseable lines are logged and dropped (spec §7
/// "Protocol" errors - never change driver state).
pub fn spawn(path: &Path, tx: Sender<DrawCommand>) -> eyre::Result<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let listener = UnixListener::bind(path)?;
    tracing::info!(?path, "listening for UI draw commands");

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => serve_connection(stream, &tx),
                Err(e) => tracing::warn!(error = %e, "UI socket accept failed"),
            }
        }
    });
    Ok(())
}

fn serve_connection(stream: UnixStream, tx: &Sender<DrawCommand>) {
    tracing::info!("UI client connected");
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "UI socket read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<DrawCommand>(&line) {
            Ok(command) => {
                if tx.send(command).is_err() {
                    return;
                }
            }
            Err(e) => tracing::warn!(error = %e, line, "dropping unparseable UI command"),
        }
    }
    tracing::info!("UI client disconnected");
}
