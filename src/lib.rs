mod background;
pub mod config;
pub mod host;
pub mod license;
pub mod models;
pub mod panel;
mod preferences;
pub mod router;
pub mod storage;
pub mod tabs;
mod utils;
pub mod variants;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

pub use background::Background;
pub use config::Config;
use host::stdio::{HostCommand, HostEvent, StdioHost};
use license::HttpRemoteApi;
pub use preferences::PreferencesStore;
use router::{Action, Envelope, Response};
use storage::SqliteStore;

/// Runs the background core against the stdio host until stdin closes or the
/// process is interrupted.
pub fn run() {
    // Reads RUST_LOG; PROMPTBRIDGE_DEBUG raises the default level.
    let level = if Config::debug_enabled() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    info!("promptbridge starting up...");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start async runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(serve()) {
        error!("promptbridge stopped: {err:#}");
        std::process::exit(1);
    }
}

async fn serve() -> Result<()> {
    let data_dir = Config::data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let config = Config::load(&data_dir)?;
    let store = SqliteStore::new(config.database_path(&data_dir))?;
    let remote = HttpRemoteApi::from_config(&config)?;
    let host = Arc::new(StdioHost::stdout());

    let background = Arc::new(Background::new(
        Arc::new(store),
        Arc::new(remote),
        host.clone(),
        config.variants_ttl(),
    ));

    let shutdown = CancellationToken::new();
    {
        let token = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, shutting down");
                token.cancel();
            }
        });
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line.context("failed to read host events")?,
        };

        let Some(line) = line else {
            info!("Host closed the event stream; shutting down");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let event: HostEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(err) => {
                warn!("Skipping unparsable host event: {err}");
                continue;
            }
        };

        host.track(&event);
        handle_event(&background, &host, event).await;
    }

    Ok(())
}

/// Lifecycle events and panel/tab messages run in arrival order on the loop.
/// Messages that wait on storage or the network run as their own tasks and
/// may interleave at those awaits.
async fn handle_event(background: &Arc<Background>, host: &Arc<StdioHost>, event: HostEvent) {
    match event {
        HostEvent::IconActivated { window_id, .. } => {
            background.on_icon_activated(window_id).await;
        }
        HostEvent::TabRemoved { tab_id } => background.on_tab_removed(tab_id),
        HostEvent::TabUpdated {
            tab_id,
            status,
            url,
        } => {
            background
                .on_tab_updated(tab_id, status.as_deref(), url.as_deref())
                .await;
        }
        HostEvent::WindowRemoved { window_id } => background.on_window_removed(window_id),
        HostEvent::Message {
            id,
            action,
            payload,
            sender,
        } => {
            let inline = Action::from_name(&action).map_or(true, Action::runs_inline);
            let envelope = Envelope::new(action, payload, sender);

            if inline {
                respond(host, id, background.on_message(envelope).await);
                return;
            }

            let background = background.clone();
            let host = host.clone();
            tokio::spawn(async move {
                let response = background.on_message(envelope).await;
                respond(&host, id, response);
            });
        }
        HostEvent::TabsSnapshot { .. } => {}
    }
}

fn respond(host: &StdioHost, id: Option<u64>, response: Option<Response>) {
    let Some(response) = response else {
        return;
    };
    if let Err(err) = host.write_command(&HostCommand::Respond { id, response }) {
        error!("Failed to send response: {err:#}");
    }
}
