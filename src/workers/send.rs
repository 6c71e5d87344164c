//! Per-client send task (spec §4.5): drains outbound audio then video,
//! never blocking on an empty queue — on empty it sleeps 1 ms and retries.
//! This is the fix for the historical deadlock where a blocking dequeue on
//! the audio queue starved video-only clients.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tracing::{trace, warn};

use crate::client::Client;
use crate::codec::{write_packet, Packet};
use crate::messages::encode_ping;
use crate::shutdown::ShutdownState;

const EMPTY_QUEUE_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// How often to originate a liveness ping while the outbound queues sit
/// idle. Video-only clients with an otherwise silent peer would never
/// otherwise see a packet for several seconds; this keeps a server-to-client
/// heartbeat going regardless of traffic.
const PING_INTERVAL: Duration = Duration::from_secs(5);

pub fn spawn(
    client: Arc<Client>,
    socket_timeout: Duration,
    shutdown: Arc<ShutdownState>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(PING_INTERVAL);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ping_interval.tick().await; // first tick fires immediately; consume it

        loop {
            if shutdown.is_set() || client.should_exit() {
                break;
            }

            // Audio first: it's latency-sensitive (spec §4.5).
            let next = client
                .outbound_audio
                .try_dequeue()
                .or_else(|| client.outbound_video.try_dequeue());

            match next {
                Some(packet) => {
                    if !write_one(&client, &packet, socket_timeout).await {
                        break;
                    }
                }
                None => {
                    tokio::select! {
                        _ = shutdown.notified() => break,
                        _ = client.local_notify.notified() => {
                            if client.should_exit() { break; }
                        }
                        _ = ping_interval.tick() => {
                            if !write_one(&client, &encode_ping(), socket_timeout).await {
                                break;
                            }
                        }
                        _ = tokio::time::sleep(EMPTY_QUEUE_POLL_INTERVAL) => {}
                    }
                }
            }
        }
        client.request_exit();
        trace!(client_id = client.id, "send worker exiting");
    })
}

async fn write_one(client: &Client, packet: &Packet, socket_timeout: Duration) -> bool {
    let mut guard = client.write_half.lock().await;
    let outcome = tokio::time::timeout(socket_timeout, async {
        write_packet(&mut *guard, packet).await?;
        guard.flush().await.map_err(crate::error::CodecError::Io)
    })
    .await;

    match outcome {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(client_id = client.id, error = %e, "write failed, closing connection");
            false
        }
        Err(_elapsed) => {
            warn!(client_id = client.id, "socket write timed out");
            false
        }
    }
}
