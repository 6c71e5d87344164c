//! Process configuration: CLI flags with matching environment variable
//! fallbacks via `clap`'s derive API, covering every option in spec §6.

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "ascii-chat-server", about = "Real-time multi-party ASCII video/audio streaming server")]
pub struct Config {
    /// TCP port to listen on.
    #[arg(short, long, default_value_t = 27224, env = "ASCII_CHAT_PORT")]
    pub port: u16,

    /// Maximum number of concurrently connected clients (registry slot count).
    #[arg(long, default_value_t = 9, env = "ASCII_CHAT_MAX_CLIENTS")]
    pub max_clients: usize,

    /// Per-client video render rate, in frames per second.
    #[arg(long, default_value_t = 60, env = "ASCII_CHAT_VIDEO_FPS")]
    pub video_fps: u32,

    /// Per-client audio mix rate, in ticks per second.
    #[arg(long, default_value_t = 172, env = "ASCII_CHAT_AUDIO_RATE")]
    pub audio_rate: u32,

    /// One of: error, warn, info, debug.
    #[arg(long, default_value = "info", env = "ASCII_CHAT_LOG_LEVEL")]
    pub log_level: String,

    /// Global on/off switch for audio mixing; when disabled, audio workers
    /// are not spawned and audio-frame packets are dropped on receipt.
    #[arg(
        long,
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = false,
        env = "ASCII_CHAT_ENABLE_AUDIO"
    )]
    pub enable_audio: bool,

    /// Capacity of each client's incoming video ring buffer.
    #[arg(long, default_value_t = 5, env = "ASCII_CHAT_VIDEO_RING_CAPACITY")]
    pub video_ring_capacity: usize,

    /// Capacity of each client's incoming audio ring buffer.
    #[arg(long, default_value_t = 10, env = "ASCII_CHAT_AUDIO_RING_CAPACITY")]
    pub audio_ring_capacity: usize,

    /// Capacity of each client's outbound video packet queue.
    #[arg(long, default_value_t = 10, env = "ASCII_CHAT_VIDEO_QUEUE_CAPACITY")]
    pub video_queue_capacity: usize,

    /// Capacity of each client's outbound audio packet queue.
    #[arg(long, default_value_t = 30, env = "ASCII_CHAT_AUDIO_QUEUE_CAPACITY")]
    pub audio_queue_capacity: usize,

    /// Socket read/write timeout, in seconds, before a connection is
    /// considered dead (spec §5).
    #[arg(long, default_value_t = 10, env = "ASCII_CHAT_SOCKET_TIMEOUT_SECS")]
    pub socket_timeout_secs: u64,
}

impl Config {
    pub fn tracing_level(&self) -> tracing::Level {
        match self.log_level.to_ascii_lowercase().as_str() {
            "error" => tracing::Level::ERROR,
            "warn" => tracing::Level::WARN,
            "debug" => tracing::Level::DEBUG,
            _ => tracing::Level::INFO,
        }
    }

    pub fn video_tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.video_fps.max(1) as f64)
    }

    pub fn audio_tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.audio_rate.max(1) as f64)
    }

    pub fn socket_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.socket_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::parse_from(["ascii-chat-server"]);
        assert_eq!(cfg.port, 27224);
        assert_eq!(cfg.max_clients, 9);
        assert_eq!(cfg.video_fps, 60);
        assert_eq!(cfg.audio_rate, 172);
        assert!(cfg.enable_audio);
    }

    #[test]
    fn log_level_maps_onto_tracing() {
        let mut cfg = Config::parse_from(["ascii-chat-server"]);
        cfg.log_level = "debug".to_string();
        assert_eq!(cfg.tracing_level(), tracing::Level::DEBUG);
    }
}
