//! The per-participant record (spec §3, `Client`). A client is
//! simultaneously a media source (its incoming ring buffers) and a sink
//! (its outbound queues); this struct owns all four and the join handles
//! for its four worker tasks.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex as PLMutex;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::frame::{AudioChunk, RawImageFrame};
use crate::packet_queue::PacketQueue;
use crate::ring_buffer::RingBuffer;

/// Mutable, frequently-read state protected by one mutex, per the lock
/// ordering in spec §5: never held across I/O or compositing.
pub struct ClientState {
    pub display_name: String,
    pub term_width: u16,
    pub term_height: u16,
    pub has_video: bool,
    pub has_audio: bool,
}

/// Join handles for a client's four tasks, filled in by the listener right
/// after spawning them. Teardown joins them in the prescribed order:
/// receive, send, video-render, audio-render (spec §5 step 3).
#[derive(Default)]
pub struct ClientTasks {
    pub receive: Option<JoinHandle<()>>,
    pub send: Option<JoinHandle<()>>,
    pub video_render: Option<JoinHandle<()>>,
    pub audio_render: Option<JoinHandle<()>>,
}

pub struct Client {
    pub id: u32,
    pub peer_addr: SocketAddr,
    pub state: PLMutex<ClientState>,
    /// Per-client socket-write mutex (spec §3). By design only the send
    /// task ever locks it — pongs are queued on `outbound_video` instead of
    /// written directly — which keeps the "single writer per socket"
    /// invariant in §9 exact rather than merely enforced by convention.
    pub write_half: AsyncMutex<OwnedWriteHalf>,
    pub incoming_video: RingBuffer<RawImageFrame>,
    pub incoming_audio: RingBuffer<AudioChunk>,
    pub outbound_video: PacketQueue,
    pub outbound_audio: PacketQueue,
    /// Last-valid-frame cache slot (spec §3/§9: exactly one per client).
    pub frame_cache: PLMutex<Option<RawImageFrame>>,
    exit_flag: AtomicBool,
    pub local_notify: Notify,
    pub tasks: PLMutex<ClientTasks>,
}

impl Client {
    pub fn new(
        id: u32,
        peer_addr: SocketAddr,
        write_half: OwnedWriteHalf,
        display_name: String,
        term_width: u16,
        term_height: u16,
        has_video: bool,
        has_audio: bool,
        video_ring_capacity: usize,
        audio_ring_capacity: usize,
        video_queue_capacity: usize,
        audio_queue_capacity: usize,
    ) -> Self {
        Self {
            id,
            peer_addr,
            state: PLMutex::new(ClientState {
                display_name,
                term_width,
                term_height,
                has_video,
                has_audio,
            }),
            write_half: AsyncMutex::new(write_half),
            incoming_video: RingBuffer::new(video_ring_capacity),
            incoming_audio: RingBuffer::new(audio_ring_capacity),
            outbound_video: PacketQueue::video(video_queue_capacity),
            outbound_audio: PacketQueue::audio(audio_queue_capacity),
            frame_cache: PLMutex::new(None),
            exit_flag: AtomicBool::new(false),
            local_notify: Notify::new(),
            tasks: PLMutex::new(ClientTasks::default()),
        }
    }

    pub fn should_exit(&self) -> bool {
        self.exit_flag.load(Ordering::Acquire)
    }

    /// Flip this client's local exit flag and wake anything waiting on its
    /// notify. Triggered by the receive task on EOF/error, the send task on
    /// write failure, or an explicit `disconnect` packet (spec §3 lifecycle).
    pub fn request_exit(&self) {
        self.exit_flag.store(true, Ordering::Release);
        self.local_notify.notify_waiters();
    }

    pub fn snapshot_terminal_size(&self) -> (u16, u16) {
        let s = self.state.lock();
        (s.term_width, s.term_height)
    }

    pub fn snapshot_caps(&self) -> (bool, bool) {
        let s = self.state.lock();
        (s.has_video, s.has_audio)
    }
}
