//! The four per-client tasks (spec §2 items 7-8): receive, send,
//! video-render, audio-render.

pub mod audio;
pub mod receive;
pub mod send;
pub mod video;
