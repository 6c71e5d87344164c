//! Wire codec: `MAGIC(4) | TYPE(1) | FLAGS(1) | RESERVED(2) | SRC_ID(4) |
//! LEN(4) | CRC32(4) | PAYLOAD(LEN)`, all multi-byte fields big-endian,
//! CRC32 over the payload only. See spec §4.1.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::CodecError;

pub const MAGIC: u32 = u32::from_be_bytes(*b"ASCI");
pub const HEADER_LEN: usize = 20;
pub const MAX_PAYLOAD_LEN: u32 = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Handshake = 0,
    HandshakeAck = 1,
    HandshakeReject = 2,
    TerminalSizeUpdate = 3,
    ImageFrame = 4,
    AudioFrame = 5,
    AsciiFrame = 6,
    AudioMixFrame = 7,
    Ping = 8,
    Pong = 9,
    Disconnect = 10,
}

impl PacketType {
    fn from_u8(v: u8) -> Result<Self, CodecError> {
        use PacketType::*;
        Ok(match v {
            0 => Handshake,
            1 => HandshakeAck,
            2 => HandshakeReject,
            3 => TerminalSizeUpdate,
            4 => ImageFrame,
            5 => AudioFrame,
            6 => AsciiFrame,
            7 => AudioMixFrame,
            8 => Ping,
            9 => Pong,
            10 => Disconnect,
            other => return Err(CodecError::UnknownType(other)),
        })
    }
}

/// One framed message, fully parsed down to the envelope level. Payload
/// interpretation (handshake fields, pixel data, ...) lives in
/// `messages.rs`, kept separate from envelope framing.
#[derive(Debug, Clone)]
pub struct Packet {
    pub packet_type: PacketType,
    pub flags: u8,
    pub source_id: u32,
    pub payload: Bytes,
}

impl Packet {
    pub fn new(packet_type: PacketType, source_id: u32, payload: Bytes) -> Self {
        Self {
            packet_type,
            flags: 0,
            source_id,
            payload,
        }
    }

    pub fn encode(&self) -> Bytes {
        let len = self.payload.len() as u32;
        let crc = crc32fast::hash(&self.payload);

        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        buf.put_u32(MAGIC);
        buf.put_u8(self.packet_type as u8);
        buf.put_u8(self.flags);
        buf.put_u16(0); // reserved
        buf.put_u32(self.source_id);
        buf.put_u32(len);
        buf.put_u32(crc);
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }
}

struct Header {
    packet_type: PacketType,
    flags: u8,
    source_id: u32,
    len: u32,
    crc32: u32,
}

fn parse_header(raw: &[u8; HEADER_LEN]) -> Result<Header, CodecError> {
    let magic = u32::from_be_bytes(raw[0..4].try_into().unwrap());
    if magic != MAGIC {
        return Err(CodecError::BadMagic);
    }
    let packet_type = PacketType::from_u8(raw[4])?;
    let flags = raw[5];
    // raw[6..8] reserved, ignored
    let source_id = u32::from_be_bytes(raw[8..12].try_into().unwrap());
    let len = u32::from_be_bytes(raw[12..16].try_into().unwrap());
    let crc32 = u32::from_be_bytes(raw[16..20].try_into().unwrap());
    if len > MAX_PAYLOAD_LEN {
        return Err(CodecError::PayloadTooLarge(len, MAX_PAYLOAD_LEN));
    }
    Ok(Header {
        packet_type,
        flags,
        source_id,
        len,
        crc32,
    })
}

/// Read exactly one packet off an async byte stream: 20-byte header first,
/// then exactly `LEN` payload bytes, then CRC validation. Per §4.1, bad
/// magic and CRC mismatch are unrecoverable for the connection; the caller
/// (the receive task) is expected to close the socket on those kinds.
pub async fn read_packet<R>(stream: &mut R) -> Result<Packet, CodecError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut header_buf = [0u8; HEADER_LEN];
    match stream.read_exact(&mut header_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(CodecError::Eof),
        Err(e) => return Err(CodecError::Io(e)),
    }
    let header = parse_header(&header_buf)?;

    let mut payload = vec![0u8; header.len as usize];
    if header.len > 0 {
        stream.read_exact(&mut payload).await?;
    }

    let actual_crc = crc32fast::hash(&payload);
    if actual_crc != header.crc32 {
        return Err(CodecError::CrcMismatch {
            expected: header.crc32,
            actual: actual_crc,
        });
    }

    Ok(Packet {
        packet_type: header.packet_type,
        flags: header.flags,
        source_id: header.source_id,
        payload: Bytes::from(payload),
    })
}

/// Write one packet as a single `write_all` call. This does not by itself
/// prevent interleaving on a socket with multiple writers — that's the
/// per-client socket-write mutex's job (spec §5) — but keeping the whole
/// frame in one buffer minimizes the window in which interleaving could
/// occur even if that invariant were ever violated.
pub async fn write_packet<W>(stream: &mut W, packet: &Packet) -> Result<(), CodecError>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let encoded = packet.encode();
    stream.write_all(&encoded).await?;
    Ok(())
}
