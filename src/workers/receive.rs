//! Per-client receive task (spec §4.4): drains the socket into the
//! appropriate incoming structure. Terminates on EOF, read error, CRC
//! error, or the client's local exit flag, and always signals exit before
//! returning so the listener's teardown can join every task.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::tcp::OwnedReadHalf;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::codec::{read_packet, Packet, PacketType};
use crate::error::CodecError;
use crate::messages::{decode_audio_frame, decode_image_frame, decode_terminal_size_update, encode_disconnect, encode_pong};
use crate::shutdown::ShutdownState;

pub fn spawn(
    client: Arc<Client>,
    mut read_half: OwnedReadHalf,
    socket_timeout: Duration,
    shutdown: Arc<ShutdownState>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                _ = client.local_notify.notified() => {
                    if client.should_exit() { break; }
                    continue;
                }
                outcome = tokio::time::timeout(socket_timeout, read_packet(&mut read_half)) => {
                    match outcome {
                        Err(_elapsed) => {
                            warn!(client_id = client.id, "socket read timed out");
                            break;
                        }
                        Ok(Err(CodecError::Eof)) => {
                            info!(client_id = client.id, "client disconnected (eof)");
                            break;
                        }
                        Ok(Err(e)) => {
                            warn!(client_id = client.id, error = %e, "closing connection after codec error");
                            break;
                        }
                        Ok(Ok(packet)) => {
                            if let Err(e) = dispatch(&client, packet) {
                                warn!(client_id = client.id, error = %e, "closing connection after malformed packet");
                                break;
                            }
                            if client.should_exit() {
                                break;
                            }
                        }
                    }
                }
            }
        }
        client.request_exit();
    })
}

fn dispatch(client: &Client, packet: Packet) -> Result<(), CodecError> {
    match packet.packet_type {
        PacketType::ImageFrame => {
            let frame = decode_image_frame(&packet.payload)?;
            client.incoming_video.try_push(frame);
            client.state.lock().has_video = true;
        }
        PacketType::AudioFrame => {
            let chunk = decode_audio_frame(&packet.payload)?;
            client.incoming_audio.try_push(chunk);
            client.state.lock().has_audio = true;
        }
        PacketType::TerminalSizeUpdate => {
            let (width, height) = decode_terminal_size_update(&packet.payload)?;
            let mut state = client.state.lock();
            state.term_width = width;
            state.term_height = height;
        }
        PacketType::Ping => {
            // Piggybacks on the send task's normal drain rather than
            // writing directly, preserving the single-writer-per-socket
            // invariant (spec §4.4, §9).
            client.outbound_video.enqueue(encode_pong());
        }
        PacketType::Disconnect => {
            // Acks the client's graceful departure before it tears down its
            // socket, same enqueue-not-direct-write path as the pong above.
            client.outbound_video.enqueue(encode_disconnect());
            client.request_exit();
        }
        PacketType::Pong => {
            debug!(client_id = client.id, "received pong");
        }
        other => {
            debug!(client_id = client.id, packet_type = ?other, "ignoring unexpected packet type from client");
        }
    }
    Ok(())
}
