//! Core library for the ASCII video/audio conferencing server: wire codec,
//! client bookkeeping, grid compositing, audio mixing, and the per-client
//! worker tasks. `main.rs` is a thin binary wrapper around [`listener::run`].

pub mod client;
pub mod codec;
pub mod compositor;
pub mod config;
pub mod error;
pub mod frame;
pub mod grid;
pub mod kernel;
pub mod listener;
pub mod messages;
pub mod mixer;
pub mod packet_queue;
pub mod registry;
pub mod ring_buffer;
pub mod shutdown;
pub mod stats;
pub mod workers;
