//! Miscellaneous observability: periodically logs registry occupancy and
//! per-client drop counters (spec §2's "stats, rate limiting, timing" line
//! item). Drop counts themselves live on `RingBuffer`/`PacketQueue`; this
//! module just samples and reports them.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::registry::ClientRegistry;
use crate::shutdown::ShutdownState;

pub fn spawn_stats_task(
    registry: Arc<ClientRegistry>,
    shutdown: Arc<ShutdownState>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            if shutdown.is_set() {
                break;
            }

            let clients = registry.snapshot();
            debug!(connected = clients.len(), max = registry.max_clients(), "registry occupancy");
            for client in clients {
                let video_drops = client.incoming_video.dropped_count();
                let audio_drops = client.incoming_audio.dropped_count();
                let out_video_drops = client.outbound_video.dropped_count();
                let out_audio_drops = client.outbound_audio.dropped_count();
                if video_drops + audio_drops + out_video_drops + out_audio_drops > 0 {
                    debug!(
                        client_id = client.id,
                        incoming_video_drops = video_drops,
                        incoming_audio_drops = audio_drops,
                        outbound_video_drops = out_video_drops,
                        outbound_audio_drops = out_audio_drops,
                        "client drop counters"
                    );
                }
            }
        }
    })
}
