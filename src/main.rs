use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use color_eyre::{Result, eyre::Context};
use tracing::{info, warn};

use crate::audio::Pipeline;
use crate::broadcast::{Channel, Fabric};
use crate::cli::{Cli, Config};
use crate::db::Catalog;
use crate::dispatch::State;
use crate::download::DownloadWorkers;
use crate::identity::IdentityCache;
use crate::policy::{AddCooldown, PendingShareCache, PlayBurst};
use crate::transport::Transport;

mod audio;
mod broadcast;
mod cli;
mod db;
mod dispatch;
mod download;
mod error;
mod identity;
mod menu;
mod policy;
mod quick_command;
mod transport;
mod wire;

const IDLE_TIMEOUT: Duration = Duration::from_secs(300);
const TICK_PERIOD: Duration = Duration::from_millis(20);

#[tokio::main(flavor = "local")]
async fn main() -> Result<()> {
    color_eyre::install().unwrap();
    setup_tracing();

    let options = Cli::parse();
    let config = Config::from_env()?;

    let catalog =
        Catalog::connect(config.database_url, config.asset_dir.clone()).wrap_err("opening catalog")?;
    catalog.log_orphaned_files().wrap_err("startup orphan sweep")?;

    let transport = Transport::bind(options.port).await?;
    info!(port = options.port, "voxrelay listening");

    let mut state = State {
        catalog,
        identities: IdentityCache::new(IDLE_TIMEOUT),
        pipeline: Pipeline::new(),
        fabric: Fabric::new(),
        add_cooldown: AddCooldown::default(),
        play_burst: PlayBurst::default(),
        pending_shares: PendingShareCache::default(),
        downloads: DownloadWorkers::new(),
        asset_dir: config.asset_dir,
    };

    let mut tick = tokio::time::interval(TICK_PERIOD);
    let mut buf = [0u8; 2048];

    loop {
        tokio::select! {
            result = transport.recv(&mut buf) => {
                let (addr, n) = result?;
                handle_datagram(&transport, &mut state, addr, &buf[..n]).await;
            }
            _ = tick.tick() => {
                on_tick(&transport, &mut state).await;
            }
        }
    }
}

async fn handle_datagram(transport: &Transport, state: &mut State, addr: SocketAddr, datagram: &[u8]) {
    let envelope = match wire::packet::split(datagram) {
        Ok(Some(envelope)) => envelope,
        Ok(None) => return, // unknown opcode: not ours to demux
        Err(e) => {
            warn!(%addr, error = %e, "dropping malformed datagram");
            return;
        }
    };
    let slot = envelope.slot;
    let req = match wire::Request::decode(envelope.op, envelope.body) {
        Ok(req) => req,
        Err(e) => {
            warn!(%addr, slot, error = %e, "dropping undecodable request");
            let bytes = wire::Response::Error(e).encode(slot);
            transport.send_to(addr, &bytes).await;
            return;
        }
    };

    let response = dispatch::handle(state, slot, addr, req).await;
    let bytes = response.encode(slot);
    transport.send_to(addr, &bytes).await;
}

/// Once per 20ms: advance the playback pipeline and relay any frame it
/// produced, drain finished downloads, and sweep expired caches.
async fn on_tick(transport: &Transport, state: &mut State) {
    // `active_stream` must be read before `tick`, since a tick that drains
    // the final frame also flips the pipeline back to idle before returning.
    let active = state.pipeline.active_stream().map(|(slot, _, channel)| (slot, channel));
    if let Some(frame) = state.pipeline.tick()
        && let Some((from_slot, channel)) = active
    {
        let roster = state.fabric.roster_for(&state.identities, channel);
        state
            .fabric
            .relay(transport, &roster, from_slot as u8, frame.sequence, channel, frame.opus)
            .await;
    }

    for result in state.downloads.poll_completed() {
        apply_download_result(transport, state, result).await;
    }

    state.identities.sweep_expired();
    state.pending_shares.gc();
}

/// Binds the finished download to the catalog and relays the outcome back
/// to the initiator's slot (spec §4.J "Asset download", scenario S1: the
/// client that queued the download expects a final success/error, not just
/// the initial `Progress` acknowledgement).
async fn apply_download_result(transport: &Transport, state: &mut State, result: download::DownloadResult) {
    let outcome: Result<(), crate::error::CoreError> = match result.outcome {
        Ok((path, size)) => {
            let unique_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| result.name.clone());
            state.catalog.add_binding(
                &result.identity,
                &unique_name,
                &path.to_string_lossy(),
                &result.name,
                size as i64,
                0,
                &result.name,
            )
        }
        Err(msg) => Err(crate::error::CoreError::Transient(msg)),
    };
    let response = match &outcome {
        Ok(()) => {
            info!(identity = %result.identity, name = %result.name, "download completed and bound");
            wire::Response::Success("Sound downloaded successfully!".into())
        }
        Err(e) => {
            warn!(identity = %result.identity, name = %result.name, error = %e, "download failed");
            wire::Response::Error(e.clone())
        }
    };
    if let Some(entry) = state.identities.entry(result.queue_slot) {
        let bytes = response.encode(result.queue_slot);
        transport.send_to(entry.addr, &bytes).await;
    }
}

pub fn setup_tracing() {
    use tracing_subscriber::filter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = filter::EnvFilter::builder().from_env().unwrap();
    let fmt = fmt::layer().pretty().with_line_number(true);

    let _ignore_err = tracing_subscriber::registry().with(fmt).with(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state(asset_dir: std::path::PathBuf) -> State {
        let catalog = Catalog::connect(None, asset_dir.clone()).unwrap();
        State {
            catalog,
            identities: IdentityCache::new(IDLE_TIMEOUT),
            pipeline: Pipeline::new(),
            fabric: Fabric::new(),
            add_cooldown: AddCooldown::default(),
            play_burst: PlayBurst::default(),
            pending_shares: PendingShareCache::default(),
            downloads: DownloadWorkers::new(),
            asset_dir,
        }
    }

    /// Comment (f): the initiator's slot gets the final success response,
    /// not just the earlier `Progress` acknowledgement.
    #[tokio::test]
    async fn download_completion_relays_to_the_initiators_slot() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = test_state(dir.path().to_path_buf());

        let client = tokio::net::UdpSocket::bind(("127.0.0.1", 0)).await.unwrap();
        let client_addr = client.local_addr().unwrap();
        state.identities.register(3, "player-1".into(), client_addr);

        let transport = Transport::bind(0).await.unwrap();

        let file_path = dir.path().join("laugh.bin");
        std::fs::write(&file_path, b"not really audio").unwrap();

        let result = download::DownloadResult {
            queue_slot: 3,
            identity: "player-1".into(),
            name: "laugh".into(),
            outcome: Ok((file_path, 17)),
        };
        apply_download_result(&transport, &mut state, result).await;

        let mut buf = [0u8; 2048];
        let (n, _) =
            tokio::time::timeout(Duration::from_secs(1), client.recv_from(&mut buf)).await.unwrap().unwrap();
        assert_eq!(buf[0], wire::ResponseOp::Success.byte());
        assert!(n > 5);

        assert_eq!(state.catalog.list_bindings("player-1").unwrap().len(), 1);
    }
}
