//! HTTP/2 frame codec (RFC 7540 §4).
//!
//! Two tiers, as spec'd: a *safe* tier of typed constructors that reject
//! trivially invalid arguments, and a *raw* tier that writes whatever
//! header + payload bytes it is handed, bypassing every invariant. The
//! raw tier is what lets a case emit the malformed stimuli this harness
//! exists to send; keeping the two as distinct entry points (rather than
//! one constructor with an "unsafe: bool" flag) makes the boundary
//! visible at the call site.

use crate::flags::{ContinuationFlags, DataFlags, HeadersFlags, PingFlags, PushPromiseFlags, SettingsFlags};
use crate::types::{CodecError, ErrorType, FrameDecodeError, FrameType, StreamId, U31_MAX};
use num_traits::{FromPrimitive, ToPrimitive};
use std::io::{self, Read, Write};

/// A decoded or about-to-be-sent HTTP/2 frame.
///
/// `type_byte` is always populated; `typ` is `None` when the byte does not
/// map to a known [`FrameType`] — callers that must ignore unknown frame
/// types (RFC 7540 §4.1) match on `typ` rather than rejecting the frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub type_byte: u8,
    pub typ: Option<FrameType>,
    pub flags: u8,
    pub stream_id: u32,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Raw tier: write whatever is given, with no validation at all.
    ///
    /// `declared_length` overrides the length field independently of
    /// `payload.len()`, so cases that deliberately test a length/payload
    /// mismatch can do so.
    pub fn raw(type_byte: u8, flags: u8, stream_id: u32, payload: Vec<u8>) -> Self {
        Self {
            type_byte,
            typ: FrameType::from_u8(type_byte),
            flags,
            stream_id,
            payload,
        }
    }

    pub fn write_raw(&self, out: &mut (impl Write + ?Sized)) -> io::Result<()> {
        self.write_raw_with_length(out, self.payload.len())
    }

    /// Writes with an explicitly chosen declared length, which may not
    /// match `self.payload.len()`. Only the raw tier exposes this.
    pub fn write_raw_with_length(
        &self,
        out: &mut (impl Write + ?Sized),
        declared_length: usize,
    ) -> io::Result<()> {
        let mut header = [0u8; 9];
        header[0..3].copy_from_slice(&(declared_length as u32).to_be_bytes()[1..]);
        header[3] = self.type_byte;
        header[4] = self.flags;
        header[5..9].copy_from_slice(&(self.stream_id & U31_MAX).to_be_bytes());
        out.write_all(&header)?;
        out.write_all(&self.payload)?;
        log::trace!(
            "wrote frame type={:#x} typ={:?} flags={:#x} stream={} declared_len={} actual_len={}",
            self.type_byte,
            self.typ,
            self.flags,
            self.stream_id,
            declared_length,
            self.payload.len()
        );
        Ok(())
    }

    pub fn read_from(input: &mut (impl Read + ?Sized)) -> Result<Self, FrameDecodeError> {
        let mut header = [0u8; 9];
        input.read_exact(&mut header)?;
        let length = u32::from_be_bytes([0, header[0], header[1], header[2]]) as usize;
        let type_byte = header[3];
        let flags = header[4];
        let stream_id = u32::from_be_bytes(header[5..9].try_into().unwrap()) & U31_MAX;
        let mut payload = vec![0u8; length];
        input.read_exact(&mut payload)?;
        let typ = FrameType::from_u8(type_byte);
        log::trace!(
            "read frame type={type_byte:#x} typ={typ:?} flags={flags:#x} stream={stream_id} len={length}"
        );
        Ok(Self {
            type_byte,
            typ,
            flags,
            stream_id,
            payload,
        })
    }

    fn expect_type(&self, want: FrameType) -> Result<(), FrameDecodeError> {
        match self.typ {
            Some(t) if t == want => Ok(()),
            _ => {
                log::trace!("frame type mismatch: wanted {want:?}, got {:?}", self.typ);
                Err(FrameDecodeError::UnknownType(self.type_byte))
            }
        }
    }

    // ---- Safe tier ----------------------------------------------------

    pub fn write_settings(
        ack: bool,
        settings: &[(crate::types::SettingsParameter, u32)],
    ) -> Result<Self, CodecError> {
        if ack && !settings.is_empty() {
            return Err(CodecError::InvalidArgument(
                "a SETTINGS ACK must carry an empty payload",
            ));
        }
        let mut payload = Vec::with_capacity(settings.len() * 6);
        for (id, value) in settings {
            payload.extend_from_slice(&(id.to_u16().unwrap()).to_be_bytes());
            payload.extend_from_slice(&value.to_be_bytes());
        }
        let flags = if ack { SettingsFlags::ACK } else { SettingsFlags::empty() };
        Ok(Self::raw(
            FrameType::Settings.to_u8().unwrap(),
            flags.bits(),
            0,
            payload,
        ))
    }

    pub fn write_ping(ack: bool, payload: [u8; 8]) -> Self {
        let flags = if ack { PingFlags::ACK } else { PingFlags::empty() };
        Self::raw(
            FrameType::Ping.to_u8().unwrap(),
            flags.bits(),
            0,
            payload.to_vec(),
        )
    }

    pub fn write_window_update(stream: StreamId, increment: u32) -> Result<Self, CodecError> {
        if increment == 0 {
            return Err(CodecError::InvalidArgument(
                "WINDOW_UPDATE increment must be non-zero",
            ));
        }
        if increment > U31_MAX {
            return Err(CodecError::InvalidArgument(
                "WINDOW_UPDATE increment must fit in 31 bits",
            ));
        }
        let mut payload = Vec::with_capacity(4);
        payload.extend_from_slice(&increment.to_be_bytes());
        Ok(Self::raw(
            FrameType::WindowUpdate.to_u8().unwrap(),
            0,
            stream,
            payload,
        ))
    }

    pub fn write_headers(
        stream: StreamId,
        block: Vec<u8>,
        end_stream: bool,
        end_headers: bool,
        priority: Option<(StreamId, bool, u8)>,
    ) -> Result<Self, CodecError> {
        if stream == 0 || stream > U31_MAX {
            return Err(CodecError::InvalidArgument(
                "HEADERS requires a non-zero 31-bit stream id",
            ));
        }
        let mut flags = HeadersFlags::empty();
        if end_stream {
            flags |= HeadersFlags::END_STREAM;
        }
        if end_headers {
            flags |= HeadersFlags::END_HEADERS;
        }
        let mut payload = Vec::with_capacity(block.len() + 5);
        if let Some((dep, exclusive, weight)) = priority {
            flags |= HeadersFlags::PRIORITY;
            let mut dep_word = dep & U31_MAX;
            if exclusive {
                dep_word |= 1 << 31;
            }
            payload.extend_from_slice(&dep_word.to_be_bytes());
            payload.push(weight);
        }
        payload.extend_from_slice(&block);
        Ok(Self::raw(
            FrameType::Headers.to_u8().unwrap(),
            flags.bits(),
            stream,
            payload,
        ))
    }

    pub fn write_continuation(
        stream: StreamId,
        block: Vec<u8>,
        end_headers: bool,
    ) -> Result<Self, CodecError> {
        if stream == 0 {
            return Err(CodecError::InvalidArgument(
                "CONTINUATION requires a non-zero stream id",
            ));
        }
        let flags = if end_headers {
            ContinuationFlags::END_HEADERS
        } else {
            ContinuationFlags::empty()
        };
        Ok(Self::raw(
            FrameType::Continuation.to_u8().unwrap(),
            flags.bits(),
            stream,
            block,
        ))
    }

    pub fn write_data(
        stream: StreamId,
        payload: Vec<u8>,
        end_stream: bool,
        padding: Option<u8>,
    ) -> Result<Self, CodecError> {
        if stream == 0 {
            return Err(CodecError::InvalidArgument(
                "DATA requires a non-zero stream id",
            ));
        }
        let mut flags = DataFlags::empty();
        if end_stream {
            flags |= DataFlags::END_STREAM;
        }
        let mut body = Vec::with_capacity(payload.len() + 1);
        if let Some(pad_len) = padding {
            flags |= DataFlags::PADDED;
            body.push(pad_len);
            body.extend_from_slice(&payload);
            body.extend(std::iter::repeat(0u8).take(pad_len as usize));
        } else {
            body.extend_from_slice(&payload);
        }
        Ok(Self::raw(
            FrameType::Data.to_u8().unwrap(),
            flags.bits(),
            stream,
            body,
        ))
    }

    pub fn write_rst_stream(stream: StreamId, code: ErrorType) -> Result<Self, CodecError> {
        if stream == 0 {
            return Err(CodecError::InvalidArgument(
                "RST_STREAM requires a non-zero stream id",
            ));
        }
        Ok(Self::raw(
            FrameType::ResetStream.to_u8().unwrap(),
            0,
            stream,
            code.to_u32().unwrap().to_be_bytes().to_vec(),
        ))
    }

    pub fn write_goaway(last_stream: StreamId, code: ErrorType, debug: Vec<u8>) -> Result<Self, CodecError> {
        if last_stream > U31_MAX {
            return Err(CodecError::InvalidArgument(
                "GOAWAY last_stream_id must fit in 31 bits",
            ));
        }
        let mut payload = Vec::with_capacity(8 + debug.len());
        payload.extend_from_slice(&(last_stream & U31_MAX).to_be_bytes());
        payload.extend_from_slice(&code.to_u32().unwrap().to_be_bytes());
        payload.extend_from_slice(&debug);
        Ok(Self::raw(FrameType::GoAway.to_u8().unwrap(), 0, 0, payload))
    }

    pub fn write_priority(
        stream: StreamId,
        dep: StreamId,
        weight: u8,
        exclusive: bool,
    ) -> Result<Self, CodecError> {
        if stream == 0 {
            return Err(CodecError::InvalidArgument(
                "PRIORITY requires a non-zero stream id",
            ));
        }
        let mut dep_word = dep & U31_MAX;
        if exclusive {
            dep_word |= 1 << 31;
        }
        let mut payload = Vec::with_capacity(5);
        payload.extend_from_slice(&dep_word.to_be_bytes());
        payload.push(weight);
        Ok(Self::raw(FrameType::Priority.to_u8().unwrap(), 0, stream, payload))
    }

    pub fn write_push_promise(
        stream: StreamId,
        promised: StreamId,
        block: Vec<u8>,
        end_headers: bool,
    ) -> Result<Self, CodecError> {
        if stream == 0 {
            return Err(CodecError::InvalidArgument(
                "PUSH_PROMISE requires a non-zero stream id",
            ));
        }
        let mut payload = Vec::with_capacity(4 + block.len());
        payload.extend_from_slice(&(promised & U31_MAX).to_be_bytes());
        payload.extend_from_slice(&block);
        let flags = if end_headers {
            PushPromiseFlags::END_HEADERS
        } else {
            PushPromiseFlags::empty()
        };
        Ok(Self::raw(
            FrameType::PushPromise.to_u8().unwrap(),
            flags.bits(),
            stream,
            payload,
        ))
    }

    // ---- Parsing helpers for the verifier/case runner ------------------

    /// Parses this frame's payload as a SETTINGS payload, ignoring
    /// unrecognized parameter identifiers per RFC 7540 §6.5.2.
    pub fn as_settings(&self) -> Result<Vec<(crate::types::SettingsParameter, u32)>, FrameDecodeError> {
        self.expect_type(FrameType::Settings)?;
        if self.payload.len() % 6 != 0 {
            return Err(FrameDecodeError::PayloadTooShort);
        }
        let mut out = Vec::with_capacity(self.payload.len() / 6);
        for chunk in self.payload.chunks(6) {
            let id = u16::from_be_bytes([chunk[0], chunk[1]]);
            if let Some(param) = crate::types::SettingsParameter::from_u16(id) {
                let value = u32::from_be_bytes(chunk[2..6].try_into().unwrap());
                out.push((param, value));
            }
        }
        Ok(out)
    }

    pub fn is_settings_ack(&self) -> bool {
        matches!(self.typ, Some(FrameType::Settings))
            && SettingsFlags::from_bits_truncate(self.flags).contains(SettingsFlags::ACK)
    }

    pub fn as_ping_payload(&self) -> Result<[u8; 8], FrameDecodeError> {
        self.expect_type(FrameType::Ping)?;
        self.payload
            .as_slice()
            .try_into()
            .map_err(|_| FrameDecodeError::PayloadTooShort)
    }

    pub fn is_ping_ack(&self) -> bool {
        matches!(self.typ, Some(FrameType::Ping))
            && PingFlags::from_bits_truncate(self.flags).contains(PingFlags::ACK)
    }

    pub fn as_goaway(&self) -> Result<(StreamId, ErrorType, Vec<u8>), FrameDecodeError> {
        self.expect_type(FrameType::GoAway)?;
        if self.payload.len() < 8 {
            return Err(FrameDecodeError::PayloadTooShort);
        }
        let last_stream = u32::from_be_bytes(self.payload[0..4].try_into().unwrap()) & U31_MAX;
        let code = u32::from_be_bytes(self.payload[4..8].try_into().unwrap());
        let error = ErrorType::from_u32(code).ok_or(FrameDecodeError::UnknownErrorType(code))?;
        Ok((last_stream, error, self.payload[8..].to_vec()))
    }

    pub fn as_rst_stream(&self) -> Result<ErrorType, FrameDecodeError> {
        self.expect_type(FrameType::ResetStream)?;
        if self.payload.len() != 4 {
            return Err(FrameDecodeError::PayloadTooShort);
        }
        let code = u32::from_be_bytes(self.payload[0..4].try_into().unwrap());
        ErrorType::from_u32(code).ok_or(FrameDecodeError::UnknownErrorType(code))
    }

    pub fn as_window_update(&self) -> Result<u32, FrameDecodeError> {
        self.expect_type(FrameType::WindowUpdate)?;
        if self.payload.len() != 4 {
            return Err(FrameDecodeError::PayloadTooShort);
        }
        let increment = u32::from_be_bytes(self.payload[0..4].try_into().unwrap()) & U31_MAX;
        if increment == 0 {
            return Err(FrameDecodeError::ZeroWindowIncrement);
        }
        Ok(increment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SettingsParameter;

    #[test]
    fn settings_ack_round_trips_empty() {
        let frame = Frame::write_settings(true, &[]).unwrap();
        let mut buf = Vec::new();
        frame.write_raw(&mut buf).unwrap();
        assert_eq!(buf, vec![0, 0, 0, 4, 1, 0, 0, 0, 0]);

        let decoded = Frame::read_from(&mut buf.as_slice()).unwrap();
        assert!(decoded.is_settings_ack());
        assert!(decoded.as_settings().unwrap().is_empty());
    }

    #[test]
    fn settings_ack_with_payload_is_rejected_by_safe_layer() {
        let err = Frame::write_settings(true, &[(SettingsParameter::EnablePush, 0)]);
        assert!(err.is_err());
    }

    #[test]
    fn raw_layer_can_emit_the_forbidden_ack_payload() {
        // A SETTINGS ACK (flags=0x01) carrying a forbidden non-empty
        // payload — RFC 7540 §6.5 requires a FRAME_SIZE_ERROR here.
        let frame = Frame::raw(0x04, 0x01, 0, vec![0xFF]);
        let mut buf = Vec::new();
        frame.write_raw(&mut buf).unwrap();
        assert_eq!(buf, vec![0x00, 0x00, 0x01, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0xFF]);
    }

    #[test]
    fn declared_length_can_be_forged_independently_of_payload() {
        let frame = Frame::raw(0x06, 0, 0, vec![1, 2, 3, 4]);
        let mut buf = Vec::new();
        frame.write_raw_with_length(&mut buf, 8).unwrap();
        assert_eq!(&buf[0..3], &[0, 0, 8]);
        assert_eq!(buf.len(), 9 + 4);
    }

    #[test]
    fn window_update_rejects_zero_increment() {
        assert!(Frame::write_window_update(0, 0).is_err());
    }

    #[test]
    fn unknown_frame_type_decodes_with_typ_none() {
        let frame = Frame::raw(0xEE, 0, 0, vec![]);
        let mut buf = Vec::new();
        frame.write_raw(&mut buf).unwrap();
        let decoded = Frame::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded.typ, None);
        assert_eq!(decoded.type_byte, 0xEE);
    }

    #[test]
    fn reserved_bit_is_masked_out_of_stream_id() {
        let mut header = [0u8; 9];
        header[5] = 0x80; // reserved bit set
        header[8] = 0x01; // stream 1
        let decoded = Frame::read_from(&mut header.as_slice()).unwrap();
        assert_eq!(decoded.stream_id, 1);
    }
}
