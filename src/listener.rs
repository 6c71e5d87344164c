//! Accept loop and per-connection handshake (spec §4.8): binds the listener,
//! accepts connections, validates the handshake, inserts into the registry,
//! spawns the four worker tasks, and supervises teardown in the order the
//! spec prescribes.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use crate::client::Client;
use crate::codec::{read_packet, write_packet};
use crate::compositor::GridCompositor;
use crate::config::Config;
use crate::error::{CodecError, ConnectionError, ServerError};
use crate::messages::{HandshakeAck, HandshakeReject, HandshakeRequest, RejectReason, PROTOCOL_VERSION};
use crate::registry::ClientRegistry;
use crate::shutdown::ShutdownState;
use crate::workers;

/// Binds the listening socket. Split out from [`run`] so tests (and any
/// caller that wants to know the bound port before serving, e.g. with
/// `port = 0`) can observe `local_addr()` first.
pub async fn bind(config: &Config) -> Result<TcpListener, ServerError> {
    let addr: SocketAddr = SocketAddr::from(([0, 0, 0, 0], config.port));
    TcpListener::bind(addr).await.map_err(|source| ServerError::ListenerBind {
        addr: addr.to_string(),
        source,
    })
}

/// Runs the accept loop until shutdown is triggered. Returns once the
/// listener socket is closed; does not wait for in-flight clients to drain
/// (the caller does that separately, per spec §5).
pub async fn run(
    config: Arc<Config>,
    registry: Arc<ClientRegistry>,
    compositor: Arc<GridCompositor>,
    shutdown: Arc<ShutdownState>,
) -> Result<(), ServerError> {
    let listener = bind(&config).await?;
    serve(listener, config, registry, compositor, shutdown).await
}

/// Drives the accept loop against an already-bound listener.
pub async fn serve(
    listener: TcpListener,
    config: Arc<Config>,
    registry: Arc<ClientRegistry>,
    compositor: Arc<GridCompositor>,
    shutdown: Arc<ShutdownState>,
) -> Result<(), ServerError> {
    info!(addr = %listener.local_addr().map(|a| a.to_string()).unwrap_or_default(), "listening");

    let next_id = Arc::new(AtomicU32::new(1));

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!("listener shutting down");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer_addr)) => {
                        let config = config.clone();
                        let registry = registry.clone();
                        let compositor = compositor.clone();
                        let next_id = next_id.clone();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, peer_addr, config, registry, compositor, next_id, shutdown).await;
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                    }
                }
            }
        }
    }

    Ok(())
}

async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<Config>,
    registry: Arc<ClientRegistry>,
    compositor: Arc<GridCompositor>,
    next_id: Arc<AtomicU32>,
    shutdown: Arc<ShutdownState>,
) {
    let (mut read_half, mut write_half) = stream.into_split();
    let socket_timeout = config.socket_timeout();

    let request = match tokio::time::timeout(socket_timeout, read_packet(&mut read_half)).await {
        Ok(Ok(packet)) if packet.packet_type == crate::codec::PacketType::Handshake => {
            match HandshakeRequest::decode(&packet.payload) {
                Ok(req) => req,
                Err(e) => {
                    warn!(%peer_addr, error = %e, "malformed handshake payload");
                    return;
                }
            }
        }
        Ok(Ok(_other)) => {
            warn!(%peer_addr, "first packet was not a handshake");
            return;
        }
        Ok(Err(CodecError::Eof)) => {
            return; // client hung up before completing the handshake
        }
        Ok(Err(e)) => {
            warn!(%peer_addr, error = %e, "handshake read failed");
            return;
        }
        Err(_elapsed) => {
            warn!(%peer_addr, "handshake timed out");
            return;
        }
    };

    if request.protocol_version != PROTOCOL_VERSION {
        let reject = HandshakeReject {
            reason: RejectReason::ProtocolVersionMismatch,
            message: format!(
                "server speaks protocol {PROTOCOL_VERSION}, client sent {}",
                request.protocol_version
            ),
        };
        let _ = write_packet(&mut write_half, &reject.encode()).await;
        let _ = write_half.flush().await;
        info!(%peer_addr, client_version = request.protocol_version, "rejected: protocol mismatch");
        return;
    }

    let id = next_id.fetch_add(1, Ordering::Relaxed);
    let client = Arc::new(Client::new(
        id,
        peer_addr,
        write_half,
        request.display_name.clone(),
        request.term_width,
        request.term_height,
        request.has_video(),
        request.has_audio(),
        config.video_ring_capacity,
        config.audio_ring_capacity,
        config.video_queue_capacity,
        config.audio_queue_capacity,
    ));

    let slot = match registry.try_insert(client.clone()) {
        Ok(slot) => slot,
        Err(ConnectionError::RegistryFull(max)) => {
            let reject = HandshakeReject {
                reason: RejectReason::RegistryFull,
                message: format!("server is full ({max} clients connected)"),
            };
            let mut guard = client.write_half.lock().await;
            let _ = write_packet(&mut *guard, &reject.encode()).await;
            let _ = guard.flush().await;
            info!(%peer_addr, "rejected: registry full");
            return;
        }
    };

    {
        let ack = HandshakeAck {
            assigned_id: id,
            registry_size: registry.max_clients().min(u8::MAX as usize) as u8,
        };
        let mut guard = client.write_half.lock().await;
        if write_packet(&mut *guard, &ack.encode()).await.is_err() || guard.flush().await.is_err() {
            drop(guard);
            registry.remove(slot);
            warn!(client_id = id, "failed to send handshake ack, aborting connection");
            return;
        }
    }

    info!(client_id = id, %peer_addr, name = %request.display_name, "client connected");

    spawn_worker_tasks(&client, read_half, &config, &registry, &compositor, &shutdown);

    supervise(client, registry, slot, shutdown).await;
}

fn spawn_worker_tasks(
    client: &Arc<Client>,
    read_half: tokio::net::tcp::OwnedReadHalf,
    config: &Config,
    registry: &Arc<ClientRegistry>,
    compositor: &Arc<GridCompositor>,
    shutdown: &Arc<ShutdownState>,
) {
    let receive = workers::receive::spawn(client.clone(), read_half, config.socket_timeout(), shutdown.clone());
    let send = workers::send::spawn(client.clone(), config.socket_timeout(), shutdown.clone());
    let video_render = workers::video::spawn(
        client.clone(),
        registry.clone(),
        compositor.clone(),
        config.video_tick_period(),
        shutdown.clone(),
    );
    let audio_render = workers::audio::spawn(
        client.clone(),
        registry.clone(),
        config.audio_tick_period(),
        config.enable_audio,
        shutdown.clone(),
    );

    let mut tasks = client.tasks.lock();
    tasks.receive = Some(receive);
    tasks.send = Some(send);
    tasks.video_render = Some(video_render);
    tasks.audio_render = Some(audio_render);
}

/// Waits for whichever of the four tasks exits first, flips the client's
/// exit flag, and immediately frees the registry slot under the write lock
/// so the client disappears from everyone else's grid by their next tick
/// (spec §7) even if a task join is still stuck behind a slow peer's socket
/// timeout. Only after the slot is freed does it join all four tasks, in
/// the fixed order receive -> send -> video-render -> audio-render (spec §5
/// step 3).
async fn supervise(client: Arc<Client>, registry: Arc<ClientRegistry>, slot: usize, shutdown: Arc<ShutdownState>) {
    let (mut receive, mut send, mut video_render, mut audio_render) = {
        let mut tasks = client.tasks.lock();
        (
            tasks.receive.take().expect("receive task always spawned"),
            tasks.send.take().expect("send task always spawned"),
            tasks.video_render.take().expect("video task always spawned"),
            tasks.audio_render.take().expect("audio task always spawned"),
        )
    };

    tokio::select! {
        _ = &mut receive => {}
        _ = &mut send => {}
        _ = &mut video_render => {}
        _ = &mut audio_render => {}
        _ = shutdown.notified() => {}
    }

    client.request_exit();
    registry.remove(slot);

    let _ = receive.await;
    let _ = send.await;
    let _ = video_render.await;
    let _ = audio_render.await;

    info!(client_id = client.id, "client torn down");
}
