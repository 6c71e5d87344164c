//! Per-client video render worker (spec §4.6): ticks at a fixed rate,
//! snapshots peers' latest frames, composites a grid, and enqueues the
//! result on this client's outbound video queue.

use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::client::Client;
use crate::compositor::GridCompositor;
use crate::messages::encode_ascii_frame;
use crate::registry::ClientRegistry;
use crate::shutdown::ShutdownState;

pub fn spawn(
    client: Arc<Client>,
    registry: Arc<ClientRegistry>,
    compositor: Arc<GridCompositor>,
    period: Duration,
    shutdown: Arc<ShutdownState>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Burst);

        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                _ = client.local_notify.notified() => {
                    if client.should_exit() { break; }
                }
                _ = interval.tick() => {
                    if shutdown.is_set() || client.should_exit() {
                        break;
                    }
                    tick(&client, &registry, &compositor);
                }
            }
        }
        trace!(client_id = client.id, "video worker exiting");
    })
}

fn tick(client: &Client, registry: &ClientRegistry, compositor: &GridCompositor) {
    let (term_w, term_h) = client.snapshot_terminal_size();
    // Grid columns/rows are sized in terminal cells, not pixels; spec
    // treats the advertised terminal width/height as the target directly.
    if term_w == 0 || term_h == 0 {
        return;
    }

    let peers = registry.snapshot();
    let mut sources = Vec::new();
    for peer in &peers {
        if peer.id == client.id {
            continue;
        }
        let (has_video, _) = peer.snapshot_caps();
        if !has_video {
            continue;
        }

        let resolved = if let Some(frame) = peer.incoming_video.try_pop() {
            *peer.frame_cache.lock() = Some(frame.clone());
            Some(frame)
        } else {
            peer.frame_cache.lock().clone()
        };

        if let Some(frame) = resolved {
            sources.push((peer.id, Arc::new(frame)));
        }
    }
    drop(peers); // registry Arcs dropped before the CPU-heavy compose step

    let ascii_frame = if sources.is_empty() {
        compositor.empty_grid_placeholder(term_w, term_h)
    } else {
        match compositor.compose(&sources, term_w, term_h) {
            Some(frame) => frame,
            None => return, // kernel failure or degenerate layout: skip tick
        }
    };

    client.outbound_video.enqueue(encode_ascii_frame(&ascii_frame));
}
