//! End-to-end tests driving the listener over real loopback TCP: a full
//! handshake/visibility round trip (spec scenario "two clients see each
//! other within a couple of ticks") and a corrupted-packet isolation case
//! (spec scenario "CRC failure closes only the offending connection").

use std::sync::Arc;
use std::time::Duration;

use ascii_chat_server_core::codec::{read_packet, write_packet, Packet, PacketType};
use ascii_chat_server_core::compositor::GridCompositor;
use ascii_chat_server_core::config::Config;
use ascii_chat_server_core::kernel::BlockAsciiKernel;
use ascii_chat_server_core::listener;
use ascii_chat_server_core::messages::{
    decode_ascii_frame, encode_image_frame, CAP_AUDIO, CAP_VIDEO, PROTOCOL_VERSION,
};
use ascii_chat_server_core::registry::ClientRegistry;
use ascii_chat_server_core::shutdown::ShutdownState;
use clap::Parser;
use tokio::net::TcpStream;
use tokio::time::timeout;

struct TestServer {
    addr: std::net::SocketAddr,
    shutdown: Arc<ShutdownState>,
    handle: tokio::task::JoinHandle<()>,
}

async fn start_server() -> TestServer {
    let mut config = Config::parse_from(["ascii-chat-server"]);
    config.port = 0;
    config.video_fps = 200; // fast ticks keep the test quick
    config.audio_rate = 200;
    let config = Arc::new(config);

    let listener_socket = listener::bind(&config).await.expect("bind");
    let addr = listener_socket.local_addr().unwrap();

    let registry = Arc::new(ClientRegistry::new(config.max_clients));
    let compositor = Arc::new(GridCompositor::new(Arc::new(BlockAsciiKernel)));
    let shutdown = Arc::new(ShutdownState::new());

    let handle = {
        let config = config.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = listener::serve(listener_socket, config, registry, compositor, shutdown).await;
        })
    };

    TestServer { addr, shutdown, handle }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

fn handshake_packet(name: &str, caps: u8) -> Packet {
    ascii_chat_server_core::messages::HandshakeRequest {
        protocol_version: PROTOCOL_VERSION,
        display_name: name.to_string(),
        term_width: 80,
        term_height: 24,
        caps,
    }
    .encode()
}

async fn connect_and_handshake(addr: std::net::SocketAddr, name: &str) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    write_packet(&mut stream, &handshake_packet(name, CAP_VIDEO | CAP_AUDIO))
        .await
        .unwrap();
    let ack = timeout(Duration::from_secs(2), read_packet(&mut stream))
        .await
        .expect("ack timed out")
        .expect("ack read failed");
    assert_eq!(ack.packet_type, PacketType::HandshakeAck);
    stream
}

fn solid_image(shade: u8) -> Packet {
    let frame = ascii_chat_server_core::frame::RawImageFrame::new(4, 4, 0, vec![shade; 4 * 4 * 3]);
    encode_image_frame(&frame)
}

#[tokio::test]
async fn two_clients_see_each_other_within_a_few_ticks() {
    let server = start_server().await;

    let mut alice = connect_and_handshake(server.addr, "alice").await;
    let mut bob = connect_and_handshake(server.addr, "bob").await;

    write_packet(&mut alice, &solid_image(40)).await.unwrap();
    write_packet(&mut bob, &solid_image(220)).await.unwrap();

    // Drain packets until each side has received a non-placeholder ASCII
    // frame, proving it saw the other party's contributed video.
    let alice_saw_bob = wait_for_non_placeholder_frame(&mut alice).await;
    let bob_saw_alice = wait_for_non_placeholder_frame(&mut bob).await;

    assert!(alice_saw_bob, "alice never received a composited frame containing bob");
    assert!(bob_saw_alice, "bob never received a composited frame containing alice");

}

async fn wait_for_non_placeholder_frame(stream: &mut TcpStream) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let Ok(Ok(packet)) = timeout(remaining, read_packet(stream)).await else {
            break;
        };
        if packet.packet_type == PacketType::AsciiFrame {
            let frame = decode_ascii_frame(&packet.payload).unwrap();
            if !frame.data.is_empty() && !frame.data.starts_with(b"\x1b[2J") {
                return true;
            }
        }
    }
    false
}

#[tokio::test]
async fn corrupted_packet_closes_only_the_offending_connection() {
    let server = start_server().await;

    let mut alice = connect_and_handshake(server.addr, "alice").await;
    let mut bob = connect_and_handshake(server.addr, "bob").await;

    // Send a well-formed image frame, then corrupt one byte of its payload
    // after computing the header's CRC over the *original* bytes — this
    // reproduces a bit flip in transit rather than a legitimately-encoded
    // bad frame.
    let mut corrupted = solid_image(99).encode().to_vec();
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0xff;
    use tokio::io::AsyncWriteExt;
    alice.write_all(&corrupted).await.unwrap();

    // Alice's connection should be closed by the server (receive task sees
    // the CRC mismatch and tears the client down).
    let alice_closed = timeout(Duration::from_secs(2), async {
        loop {
            match read_packet(&mut alice).await {
                Err(_) => return true,
                Ok(_) => continue,
            }
        }
    })
    .await
    .unwrap_or(false);
    assert!(alice_closed, "server should have closed alice's connection after the CRC error");

    // Bob is unaffected: a fresh frame from bob should still flow into a
    // composited response without his connection being torn down.
    write_packet(&mut bob, &solid_image(200)).await.unwrap();
    let bob_ack = timeout(Duration::from_secs(2), read_packet(&mut bob)).await;
    assert!(bob_ack.is_ok(), "bob's connection should remain usable after alice's corrupted packet");

}

#[tokio::test]
async fn protocol_version_mismatch_is_rejected() {
    let server = start_server().await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    let bad = ascii_chat_server_core::messages::HandshakeRequest {
        protocol_version: PROTOCOL_VERSION + 1,
        display_name: "carol".to_string(),
        term_width: 80,
        term_height: 24,
        caps: CAP_VIDEO,
    }
    .encode();
    write_packet(&mut stream, &bad).await.unwrap();

    let reply = timeout(Duration::from_secs(2), read_packet(&mut stream)).await.unwrap().unwrap();
    assert_eq!(reply.packet_type, PacketType::HandshakeReject);

}

