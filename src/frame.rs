//! The data model shared across the pipeline: raw camera frames, rendered
//! ASCII frames, and fixed-size audio chunks. See spec §3.

/// Number of samples in one [`AudioChunk`] — 256 samples at 44.1 kHz is
/// ≈5.8 ms, chosen to match the ≈172 Hz audio tick rate in spec §4.7.
pub const AUDIO_CHUNK_SAMPLES: usize = 256;

/// Canonical sample rate shared by every chunk in the system (spec §3:
/// "All chunks in the system share one sample rate").
pub const AUDIO_SAMPLE_RATE: u32 = 44_100;

/// A decoded camera frame, always RGB24 internally regardless of what the
/// client captured it as. Owned exclusively by whichever ring buffer slot
/// holds it; a compositor only ever borrows it for the duration of one mix.
#[derive(Debug, Clone)]
pub struct RawImageFrame {
    pub width: u32,
    pub height: u32,
    /// Capture timestamp in milliseconds, as reported by the client.
    pub timestamp_ms: u64,
    /// RGB24 pixels, row-major, length `width * height * 3`.
    pub pixels: Vec<u8>,
}

impl RawImageFrame {
    pub fn new(width: u32, height: u32, timestamp_ms: u64, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 3);
        Self {
            width,
            height,
            timestamp_ms,
            pixels,
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// A fully composited screen of pre-formatted characters plus inline color
/// escapes, ready for the client's terminal. Moves from kernel → outbound
/// queue → send task, exclusively owned at each hop.
#[derive(Debug, Clone)]
pub struct AsciiFrame {
    pub cols: u16,
    pub rows: u16,
    pub data: Vec<u8>,
}

/// One fixed-size block of mono audio, the unit the mixer and ring buffers
/// operate on. Internally always f32 in `[-1.0, 1.0]`; wire encoding may use
/// int16 (see `messages.rs`).
#[derive(Debug, Clone, Copy)]
pub struct AudioChunk {
    pub samples: [f32; AUDIO_CHUNK_SAMPLES],
}

impl AudioChunk {
    pub fn silence() -> Self {
        Self {
            samples: [0.0; AUDIO_CHUNK_SAMPLES],
        }
    }

    pub fn from_i16(raw: &[i16]) -> Self {
        let mut samples = [0.0f32; AUDIO_CHUNK_SAMPLES];
        for (dst, &src) in samples.iter_mut().zip(raw.iter()) {
            *dst = src as f32 / i16::MAX as f32;
        }
        Self { samples }
    }

    pub fn to_i16(&self) -> [i16; AUDIO_CHUNK_SAMPLES] {
        let mut out = [0i16; AUDIO_CHUNK_SAMPLES];
        for (dst, &src) in out.iter_mut().zip(self.samples.iter()) {
            *dst = (src.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        }
        out
    }
}

impl Default for AudioChunk {
    fn default() -> Self {
        Self::silence()
    }
}
