//! `tokio_util` codec for legacy frames.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::RemoteError;
use crate::legacy::frame::LegacyFrame;

/// kind (1) + origin length (2)
const PREFIX_LEN: usize = 3;
const LEN_FIELD: usize = 2;

/// Frames legacy traffic over any byte stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyCodec;

impl Decoder for LegacyCodec {
    type Item = LegacyFrame;
    type Error = RemoteError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < PREFIX_LEN {
            return Ok(None);
        }
        let origin_len = u16::from_le_bytes([src[1], src[2]]) as usize;

        let payload_len_at = PREFIX_LEN + origin_len;
        if src.len() < payload_len_at + LEN_FIELD {
            src.reserve(payload_len_at + LEN_FIELD - src.len());
            return Ok(None);
        }
        let payload_len =
            u16::from_le_bytes([src[payload_len_at], src[payload_len_at + 1]]) as usize;

        let total = payload_len_at + LEN_FIELD + payload_len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(total);
        let kind = frame.get_u8();
        frame.advance(LEN_FIELD);
        let origin = frame.split_to(origin_len).freeze();
        frame.advance(LEN_FIELD);
        let payload = frame.freeze();

        Ok(Some(LegacyFrame {
            kind,
            origin,
            payload,
        }))
    }

    /// A TV hanging up mid-frame is a dropped connection, not an I/O fault.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(RemoteError::ConnectionClosed),
        }
    }
}

impl Encoder<LegacyFrame> for LegacyCodec {
    type Error = RemoteError;

    fn encode(&mut self, item: LegacyFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let origin_len = field_len(&item.origin)?;
        let payload_len = field_len(&item.payload)?;

        dst.reserve(PREFIX_LEN + item.origin.len() + LEN_FIELD + item.payload.len());
        dst.put_u8(item.kind);
        dst.put_u16_le(origin_len);
        dst.put_slice(&item.origin);
        dst.put_u16_le(payload_len);
        dst.put_slice(&item.payload);
        Ok(())
    }
}

fn field_len(field: &Bytes) -> Result<u16, RemoteError> {
    u16::try_from(field.len()).map_err(|_| {
        RemoteError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("legacy field of {} bytes exceeds u16 length prefix", field.len()),
        ))
    })
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(origin: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut v = vec![0x01];
        v.extend_from_slice(&(origin.len() as u16).to_le_bytes());
        v.extend_from_slice(origin);
        v.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        v.extend_from_slice(payload);
        v
    }

    #[test]
    fn encode_outgoing_has_fixed_prefix() {
        let mut dst = BytesMut::new();
        LegacyCodec
            .encode(LegacyFrame::outgoing(Bytes::from_static(b"\x64\x00")), &mut dst)
            .unwrap();
        assert_eq!(dst.as_ref(), &[0x00, 0x00, 0x00, 0x02, 0x00, 0x64, 0x00]);
    }

    #[test]
    fn decode_full_reply() {
        let mut src = BytesMut::from(reply(b"iapp.samsung", &[0x64, 0x00, 0x01, 0x00]).as_slice());
        let frame = LegacyCodec.decode(&mut src).unwrap().unwrap();
        assert_eq!(frame.kind, 0x01);
        assert_eq!(frame.origin_lossy(), "iapp.samsung");
        assert_eq!(frame.payload.as_ref(), &[0x64, 0x00, 0x01, 0x00]);
        assert!(src.is_empty());
    }

    #[test]
    fn decode_waits_for_partial_input() {
        let bytes = reply(b"tv", &[0x00, 0x00, 0x00, 0x00]);
        for cut in [0, 2, 4, 6, bytes.len() - 1] {
            let mut src = BytesMut::from(&bytes[..cut]);
            assert!(LegacyCodec.decode(&mut src).unwrap().is_none(), "cut at {cut}");
        }
    }

    #[test]
    fn decode_leaves_following_frame_in_buffer() {
        let mut bytes = reply(b"tv", &[0x0a, 0x00]);
        bytes.extend(reply(b"tv", &[0x64, 0x00, 0x01, 0x00]));
        let mut src = BytesMut::from(bytes.as_slice());

        let first = LegacyCodec.decode(&mut src).unwrap().unwrap();
        assert_eq!(first.payload.as_ref(), &[0x0a, 0x00]);
        let second = LegacyCodec.decode(&mut src).unwrap().unwrap();
        assert_eq!(second.payload.as_ref(), &[0x64, 0x00, 0x01, 0x00]);
        assert!(src.is_empty());
    }

    #[test]
    fn decode_zero_length_payload() {
        let mut src = BytesMut::from(reply(b"", b"").as_slice());
        let frame = LegacyCodec.decode(&mut src).unwrap().unwrap();
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn eof_inside_frame_is_connection_closed() {
        let bytes = reply(b"tv", &[0x64, 0x00, 0x01, 0x00]);
        let mut src = BytesMut::from(&bytes[..bytes.len() - 2]);
        let err = LegacyCodec.decode_eof(&mut src).unwrap_err();
        assert!(matches!(err, RemoteError::ConnectionClosed));
    }

    #[test]
    fn eof_on_frame_boundary_is_clean() {
        let mut src = BytesMut::from(reply(b"tv", &[0x0a, 0x00]).as_slice());
        assert!(LegacyCodec.decode_eof(&mut src).unwrap().is_some());
        assert!(LegacyCodec.decode_eof(&mut src).unwrap().is_none());
    }

    #[test]
    fn encode_rejects_oversized_field() {
        let mut dst = BytesMut::new();
        let huge = Bytes::from(vec![0u8; u16::MAX as usize + 1]);
        assert!(LegacyCodec.encode(LegacyFrame::outgoing(huge), &mut dst).is_err());
    }
}
