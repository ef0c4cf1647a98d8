use bitflags::bitflags;

bitflags! {
    /// https://httpwg.org/specs/rfc7540.html#DATA
    #[repr(transparent)]
    pub struct DataFlags: u8 {
        /// Bit 0: this frame is the last the sender will send for this stream.
        const END_STREAM = 0x1;
        /// Bit 3: the Pad Length field and trailing padding are present.
        const PADDED = 0x8;
    }

    /// https://httpwg.org/specs/rfc7540.html#HEADERS
    #[repr(transparent)]
    pub struct HeadersFlags: u8 {
        const END_STREAM = 0x1;
        /// Bit 2: this frame contains the whole header block, no CONTINUATION follows.
        const END_HEADERS = 0x4;
        const PADDED = 0x8;
        /// Bit 5: Exclusive/Stream Dependency/Weight fields are present.
        const PRIORITY = 0x20;
    }

    /// https://httpwg.org/specs/rfc7540.html#SETTINGS
    #[repr(transparent)]
    pub struct SettingsFlags: u8 {
        /// Bit 0: this frame acknowledges the peer's SETTINGS. MUST carry an empty payload.
        const ACK = 0x1;
    }

    /// https://httpwg.org/specs/rfc7540.html#PUSH_PROMISE
    #[repr(transparent)]
    pub struct PushPromiseFlags: u8 {
        const END_HEADERS = 0x4;
        const PADDED = 0x8;
    }

    /// https://httpwg.org/specs/rfc7540.html#PING
    #[repr(transparent)]
    pub struct PingFlags: u8 {
        const ACK = 0x1;
    }

    /// https://httpwg.org/specs/rfc7540.html#CONTINUATION
    #[repr(transparent)]
    pub struct ContinuationFlags: u8 {
        const END_HEADERS = 0x4;
    }
}
