//! Per-client audio render worker (spec §4.7): ticks at ≈172 Hz, mixes
//! every other audio-having peer's latest chunk (silence for missing
//! sources, never the stale cache), and enqueues the mix.

use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::client::Client;
use crate::frame::AudioChunk;
use crate::messages::encode_audio_mix_frame;
use crate::mixer::mix;
use crate::registry::ClientRegistry;
use crate::shutdown::ShutdownState;

/// `enabled` mirrors the global `enable_audio` config switch (spec §6).
/// When disabled the task still runs — every client always owns exactly
/// two render tasks (spec §3) — it just never mixes or emits anything,
/// which keeps client teardown's fixed four-task join order simple.
pub fn spawn(
    client: Arc<Client>,
    registry: Arc<ClientRegistry>,
    period: Duration,
    enabled: bool,
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
                    if enabled {
                        tick(&client, &registry);
                    }
                }
            }
        }
        trace!(client_id = client.id, "audio worker exiting");
    })
}

fn tick(client: &Client, registry: &ClientRegistry) {
    let peers = registry.snapshot();
    let mut chunks: Vec<AudioChunk> = Vec::new();
    for peer in &peers {
        if peer.id == client.id {
            continue;
        }
        let (_, has_audio) = peer.snapshot_caps();
        if !has_audio {
            continue;
        }
        // Missing sources contribute silence, never the cached chunk —
        // stale audio is worse than silence (spec §4.7 step 3).
        chunks.push(peer.incoming_audio.try_pop().unwrap_or_default());
    }
    drop(peers);

    let mixed = mix(&chunks);
    client.outbound_audio.enqueue(encode_audio_mix_frame(&mixed));
}
