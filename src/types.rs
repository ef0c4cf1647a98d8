//! Shared wire-level vocabulary: frame types, error codes, settings
//! identifiers, and the stream id newtype. Consolidated into one module
//! rather than split across separate enum/flag/type files that each
//! redefine the same vocabulary.

use num_derive::{FromPrimitive, ToPrimitive};
use std::num::NonZeroU32;

pub type StreamId = u32;
pub type NonZeroStreamId = NonZeroU32;

/// Largest value a 31-bit stream identifier / window increment can hold.
pub const U31_MAX: u32 = u32::MAX >> 1;

/// https://httpwg.org/specs/rfc7540.html#FrameTypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum FrameType {
    Data = 0x0,
    Headers = 0x1,
    Priority = 0x2,
    ResetStream = 0x3,
    Settings = 0x4,
    PushPromise = 0x5,
    Ping = 0x6,
    GoAway = 0x7,
    WindowUpdate = 0x8,
    Continuation = 0x9,
}

/// https://httpwg.org/specs/rfc7540.html#ErrorCodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum ErrorType {
    NoError = 0x0,
    ProtocolError = 0x1,
    InternalError = 0x2,
    FlowControlError = 0x3,
    SettingsTimeout = 0x4,
    StreamClosed = 0x5,
    FrameSizeError = 0x6,
    RefusedStream = 0x7,
    Cancel = 0x8,
    CompressionError = 0x9,
    ConnectError = 0xa,
    EnhanceYourCalm = 0xb,
    InadequateSecurity = 0xc,
    Http11Required = 0xd,
}

/// https://httpwg.org/specs/rfc7540.html#SettingValues
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, FromPrimitive, ToPrimitive)]
#[repr(u16)]
pub enum SettingsParameter {
    HeaderTableSize = 0x1,
    EnablePush = 0x2,
    MaxConcurrentStreams = 0x3,
    InitialWindowSize = 0x4,
    MaxFrameSize = 0x5,
    MaxHeaderListSize = 0x6,
}

#[derive(thiserror::Error, Debug)]
pub enum FrameDecodeError {
    #[error("unknown frame type: {0}")]
    UnknownType(u8),
    #[error("payload shorter than required for this frame type")]
    PayloadTooShort,
    #[error("unexpected zero stream id")]
    ZeroStreamId,
    #[error("unexpected zero window increment")]
    ZeroWindowIncrement,
    #[error("unknown error code: {0}")]
    UnknownErrorType(u32),
    #[error("transport failure: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}
