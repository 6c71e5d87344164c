use thiserror::Error;

/// Errors raised while framing or parsing a packet on the wire.
///
/// [`CodecError::is_fatal`] distinguishes the two kinds called out in the
/// wire codec design: bad magic and CRC mismatch close the connection,
/// everything else is recoverable at a higher layer.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("bad magic bytes")]
    BadMagic,

    #[error("unknown packet type {0}")]
    UnknownType(u8),

    #[error("payload length {0} exceeds maximum of {1} bytes")]
    PayloadTooLarge(u32, u32),

    #[error("CRC32 mismatch: header says {expected:#010x}, computed {actual:#010x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("malformed payload for {0:?}: {1}")]
    MalformedPayload(crate::codec::PacketType, &'static str),

    #[error("connection closed")]
    Eof,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Bad magic and CRC mismatch indicate a corrupted or hostile stream;
    /// every other kind is a per-message problem that does not necessarily
    /// poison the rest of the connection, but this server still treats
    /// every codec error as connection-fatal (see §4.1 / §7).
    pub fn is_fatal(&self) -> bool {
        matches!(self, CodecError::BadMagic | CodecError::CrcMismatch { .. })
    }
}

/// Errors that can abort the whole process, as opposed to a single client.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind listener on {addr}: {source}")]
    ListenerBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("handshake failed: {0}")]
    Handshake(String),
}

/// Errors that abort a single connection attempt without affecting the rest
/// of the process. Per spec §7, a full registry is a non-fatal, per-accept
/// condition: the handshake is rejected with a reason and logged at `info`.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("registry is full ({0} slots in use)")]
    RegistryFull(usize),
}

/// Error returned by an [`crate::kernel::AsciiKernel`] implementation.
/// Per §4.6 and §7, a kernel failure is never fatal: callers log it at
/// `warn` and skip the tick.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("ascii kernel failure: {0}")]
    RenderFailed(String),
}
