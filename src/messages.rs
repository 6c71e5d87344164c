//! Application-level payload encoding/decoding for each [`PacketType`].
//! Kept separate from `codec.rs` so the envelope framing stays a pure
//! function of bytes, independent of what any particular message means.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{Packet, PacketType};
use crate::error::CodecError;
use crate::frame::{AudioChunk, RawImageFrame, AUDIO_CHUNK_SAMPLES};

pub const PROTOCOL_VERSION: u16 = 1;

pub const CAP_VIDEO: u8 = 0b01;
pub const CAP_AUDIO: u8 = 0b10;

#[derive(Debug, Clone)]
pub struct HandshakeRequest {
    pub protocol_version: u16,
    pub display_name: String,
    pub term_width: u16,
    pub term_height: u16,
    pub caps: u8,
}

impl HandshakeRequest {
    pub fn has_video(&self) -> bool {
        self.caps & CAP_VIDEO != 0
    }

    pub fn has_audio(&self) -> bool {
        self.caps & CAP_AUDIO != 0
    }

    pub fn encode(&self) -> Packet {
        let name_bytes = self.display_name.as_bytes();
        let name_len = name_bytes.len().min(255) as u8;
        let mut buf = BytesMut::with_capacity(8 + name_len as usize);
        buf.put_u16(self.protocol_version);
        buf.put_u8(name_len);
        buf.extend_from_slice(&name_bytes[..name_len as usize]);
        buf.put_u16(self.term_width);
        buf.put_u16(self.term_height);
        buf.put_u8(self.caps);
        Packet::new(PacketType::Handshake, 0, buf.freeze())
    }

    pub fn decode(payload: &Bytes) -> Result<Self, CodecError> {
        let mut buf = payload.clone();
        if buf.remaining() < 3 {
            return Err(CodecError::MalformedPayload(
                PacketType::Handshake,
                "truncated before name length",
            ));
        }
        let protocol_version = buf.get_u16();
        let name_len = buf.get_u8() as usize;
        if buf.remaining() < name_len + 5 {
            return Err(CodecError::MalformedPayload(
                PacketType::Handshake,
                "truncated name or trailer",
            ));
        }
        let mut name_bytes = vec![0u8; name_len];
        buf.copy_to_slice(&mut name_bytes);
        let display_name = String::from_utf8_lossy(&name_bytes).into_owned();
        let term_width = buf.get_u16();
        let term_height = buf.get_u16();
        let caps = buf.get_u8();
        Ok(Self {
            protocol_version,
            display_name,
            term_width,
            term_height,
            caps,
        })
    }
}

#[derive(Debug, Clone)]
pub struct HandshakeAck {
    pub assigned_id: u32,
    pub registry_size: u8,
}

impl HandshakeAck {
    pub fn encode(&self) -> Packet {
        let mut buf = BytesMut::with_capacity(5);
        buf.put_u32(self.assigned_id);
        buf.put_u8(self.registry_size);
        Packet::new(PacketType::HandshakeAck, 0, buf.freeze())
    }

    pub fn decode(payload: &Bytes) -> Result<Self, CodecError> {
        if payload.len() < 5 {
            return Err(CodecError::MalformedPayload(
                PacketType::HandshakeAck,
                "expected 5 bytes",
            ));
        }
        let mut buf = payload.clone();
        Ok(Self {
            assigned_id: buf.get_u32(),
            registry_size: buf.get_u8(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    RegistryFull = 0,
    ProtocolVersionMismatch = 1,
    InvalidTerminalSize = 2,
}

#[derive(Debug, Clone)]
pub struct HandshakeReject {
    pub reason: RejectReason,
    pub message: String,
}

impl HandshakeReject {
    pub fn encode(&self) -> Packet {
        let msg_bytes = self.message.as_bytes();
        let msg_len = msg_bytes.len().min(u16::MAX as usize) as u16;
        let mut buf = BytesMut::with_capacity(3 + msg_len as usize);
        buf.put_u8(self.reason as u8);
        buf.put_u16(msg_len);
        buf.extend_from_slice(&msg_bytes[..msg_len as usize]);
        Packet::new(PacketType::HandshakeReject, 0, buf.freeze())
    }
}

pub fn encode_terminal_size_update(width: u16, height: u16) -> Packet {
    let mut buf = BytesMut::with_capacity(4);
    buf.put_u16(width);
    buf.put_u16(height);
    Packet::new(PacketType::TerminalSizeUpdate, 0, buf.freeze())
}

pub fn decode_terminal_size_update(payload: &Bytes) -> Result<(u16, u16), CodecError> {
    if payload.len() < 4 {
        return Err(CodecError::MalformedPayload(
            PacketType::TerminalSizeUpdate,
            "expected 4 bytes",
        ));
    }
    let mut buf = payload.clone();
    Ok((buf.get_u16(), buf.get_u16()))
}

pub fn encode_image_frame(frame: &RawImageFrame) -> Packet {
    let mut buf = BytesMut::with_capacity(16 + frame.pixels.len());
    buf.put_u32(frame.width);
    buf.put_u32(frame.height);
    buf.put_u64(frame.timestamp_ms);
    buf.extend_from_slice(&frame.pixels);
    Packet::new(PacketType::ImageFrame, 0, buf.freeze())
}

pub fn decode_image_frame(payload: &Bytes) -> Result<RawImageFrame, CodecError> {
    if payload.len() < 16 {
        return Err(CodecError::MalformedPayload(
            PacketType::ImageFrame,
            "truncated header",
        ));
    }
    let mut buf = payload.clone();
    let width = buf.get_u32();
    let height = buf.get_u32();
    let timestamp_ms = buf.get_u64();
    let expected_len = width as usize * height as usize * 3;
    if buf.remaining() != expected_len {
        return Err(CodecError::MalformedPayload(
            PacketType::ImageFrame,
            "pixel buffer length does not match width*height*3",
        ));
    }
    Ok(RawImageFrame::new(width, height, timestamp_ms, buf.to_vec()))
}

pub fn encode_audio_frame(chunk: &AudioChunk) -> Packet {
    let samples = chunk.to_i16();
    let mut buf = BytesMut::with_capacity(2 + samples.len() * 2);
    buf.put_u16(samples.len() as u16);
    for s in samples {
        buf.put_i16(s);
    }
    Packet::new(PacketType::AudioFrame, 0, buf.freeze())
}

pub fn decode_audio_frame(payload: &Bytes) -> Result<AudioChunk, CodecError> {
    if payload.len() < 2 {
        return Err(CodecError::MalformedPayload(
            PacketType::AudioFrame,
            "truncated sample count",
        ));
    }
    let mut buf = payload.clone();
    let count = buf.get_u16() as usize;
    if count != AUDIO_CHUNK_SAMPLES || buf.remaining() != count * 2 {
        return Err(CodecError::MalformedPayload(
            PacketType::AudioFrame,
            "sample count does not match fixed chunk size",
        ));
    }
    let mut samples = [0i16; AUDIO_CHUNK_SAMPLES];
    for s in samples.iter_mut() {
        *s = buf.get_i16();
    }
    Ok(AudioChunk::from_i16(&samples))
}

pub fn encode_audio_mix_frame(chunk: &AudioChunk) -> Packet {
    let samples = chunk.to_i16();
    let mut buf = BytesMut::with_capacity(samples.len() * 2);
    for s in samples {
        buf.put_i16(s);
    }
    Packet::new(PacketType::AudioMixFrame, 0, buf.freeze())
}

pub fn encode_ascii_frame(frame: &crate::frame::AsciiFrame) -> Packet {
    let mut buf = BytesMut::with_capacity(4 + frame.data.len());
    buf.put_u16(frame.cols);
    buf.put_u16(frame.rows);
    buf.extend_from_slice(&frame.data);
    Packet::new(PacketType::AsciiFrame, 0, buf.freeze())
}

pub fn decode_ascii_frame(payload: &Bytes) -> Result<crate::frame::AsciiFrame, CodecError> {
    if payload.len() < 4 {
        return Err(CodecError::MalformedPayload(PacketType::AsciiFrame, "truncated header"));
    }
    let mut buf = payload.clone();
    let cols = buf.get_u16();
    let rows = buf.get_u16();
    Ok(crate::frame::AsciiFrame {
        cols,
        rows,
        data: buf.to_vec(),
    })
}

pub fn encode_ping() -> Packet {
    Packet::new(PacketType::Ping, 0, Bytes::new())
}

pub fn encode_pong() -> Packet {
    Packet::new(PacketType::Pong, 0, Bytes::new())
}

pub fn encode_disconnect() -> Packet {
    Packet::new(PacketType::Disconnect, 0, Bytes::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_round_trips() {
        let req = HandshakeRequest {
            protocol_version: PROTOCOL_VERSION,
            display_name: "alice".to_string(),
            term_width: 80,
            term_height: 24,
            caps: CAP_VIDEO | CAP_AUDIO,
        };
        let pkt = req.encode();
        let decoded = HandshakeRequest::decode(&pkt.payload).unwrap();
        assert_eq!(decoded.protocol_version, PROTOCOL_VERSION);
        assert_eq!(decoded.display_name, "alice");
        assert_eq!(decoded.term_width, 80);
        assert_eq!(decoded.term_height, 24);
        assert!(decoded.has_video());
        assert!(decoded.has_audio());
    }

    #[test]
    fn image_frame_round_trips() {
        let pixels = vec![128u8; 4 * 2 * 3];
        let frame = RawImageFrame::new(4, 2, 12345, pixels.clone());
        let pkt = encode_image_frame(&frame);
        let decoded = decode_image_frame(&pkt.payload).unwrap();
        assert_eq!(decoded.width, 4);
        assert_eq!(decoded.height, 2);
        assert_eq!(decoded.timestamp_ms, 12345);
        assert_eq!(decoded.pixels, pixels);
    }

    #[test]
    fn audio_frame_round_trips_within_i16_precision() {
        let mut chunk = AudioChunk::silence();
        chunk.samples[0] = 0.5;
        chunk.samples[1] = -1.0;
        let pkt = encode_audio_frame(&chunk);
        let decoded = decode_audio_frame(&pkt.payload).unwrap();
        assert!((decoded.samples[0] - 0.5).abs() < 0.001);
        assert!((decoded.samples[1] - (-1.0)).abs() < 0.001);
    }

    #[test]
    fn malformed_image_frame_length_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32(4);
        buf.put_u32(4);
        buf.put_u64(0);
        buf.extend_from_slice(&[0u8; 10]); // wrong length for 4x4 RGB24
        let err = decode_image_frame(&buf.freeze()).unwrap_err();
        assert!(matches!(err, CodecError::MalformedPayload(PacketType::ImageFrame, _)));
    }
}
