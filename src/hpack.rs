//! HPACK (RFC 7541) encoder and decoder.
//!
//! Grounded on the teacher's `src/hpack.rs`: same `TableEntry`/`Table`
//! shape, same static-table macro, same `Encoder`/`Decoder` split, and
//! the same round-trip test against the external `their_hpack` crate.
//! The difference is that this version actually implements the bodies
//! the teacher left as stubs (`encode` returning `Bytes::new()`,
//! `encode_integer` with no return, `decode` returning `Vec::new()`),
//! and adds a handful of adversarial knobs the default `encode` path
//! never reaches — those exist so case routines can emit HPACK the RFC
//! forbids without the encoder's normal invariants getting in the way.

use bytes::{Bytes, BytesMut};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
struct TableEntry {
    pub size: usize,
    pub name: Bytes,
    pub value: Bytes,
}

impl TableEntry {
    pub fn new(name: Bytes, value: Bytes) -> Self {
        Self {
            size: name.len() + value.len() + 32,
            name,
            value,
        }
    }
}

macro_rules! static_table {
    ( $( $name:expr => $value:expr ),+ $(,)? ) => {
        [
            $(
                TableEntry {
                    size: $name.len() + $value.len() + 32,
                    name: Bytes::from_static($name),
                    value: Bytes::from_static($value),
                }
            ),+
        ]
    };
}

/// https://httpwg.org/specs/rfc7541.html#static.table.definition
static STATIC_TABLE: [TableEntry; 61] = static_table![
    b":authority" => b"",
    b":method" => b"GET",
    b":method" => b"POST",
    b":path" => b"/",
    b":path" => b"/index.html",
    b":scheme" => b"http",
    b":scheme" => b"https",
    b":status" => b"200",
    b":status" => b"204",
    b":status" => b"206",
    b":status" => b"304",
    b":status" => b"400",
    b":status" => b"404",
    b":status" => b"500",
    b"accept-charset" => b"",
    b"accept-encoding" => b"gzip, deflate",
    b"accept-language" => b"",
    b"accept-ranges" => b"",
    b"accept" => b"",
    b"access-control-allow-origin" => b"",
    b"age" => b"",
    b"allow" => b"",
    b"authorization" => b"",
    b"cache-control" => b"",
    b"content-disposition" => b"",
    b"content-encoding" => b"",
    b"content-language" => b"",
    b"content-length" => b"",
    b"content-location" => b"",
    b"content-range" => b"",
    b"content-type" => b"",
    b"cookie" => b"",
    b"date" => b"",
    b"etag" => b"",
    b"expect" => b"",
    b"expires" => b"",
    b"from" => b"",
    b"host" => b"",
    b"if-match" => b"",
    b"if-modified-since" => b"",
    b"if-none-match" => b"",
    b"if-range" => b"",
    b"if-unmodified-since" => b"",
    b"last-modified" => b"",
    b"link" => b"",
    b"location" => b"",
    b"max-forwards" => b"",
    b"proxy-authenticate" => b"",
    b"proxy-authorization" => b"",
    b"range" => b"",
    b"referer" => b"",
    b"refresh" => b"",
    b"retry-after" => b"",
    b"server" => b"",
    b"set-cookie" => b"",
    b"strict-transport-security" => b"",
    b"transfer-encoding" => b"",
    b"user-agent" => b"",
    b"vary" => b"",
    b"via" => b"",
    b"www-authenticate" => b"",
];

#[derive(Debug, Clone)]
struct Table {
    max_size: usize,
    current_size: usize,
    table: VecDeque<TableEntry>,
}

impl Table {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            current_size: 0,
            table: VecDeque::new(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&TableEntry> {
        STATIC_TABLE
            .get(index - 1)
            .or_else(|| self.table.get(index - STATIC_TABLE.len() - 1))
    }

    pub fn push(&mut self, name: Bytes, value: Bytes) {
        let entry = TableEntry::new(name, value);
        self.current_size += entry.size;
        self.table.push_front(entry);
        self.resize(self.max_size);
    }

    pub fn resize(&mut self, size: usize) {
        self.max_size = size;
        while self.current_size > self.max_size {
            if let Some(popped) = self.table.pop_back() {
                self.current_size -= popped.size;
            } else {
                break;
            }
        }
    }
}

/// Appends `value`'s low `prefix_bits` into the last byte of `out` (or a
/// fresh byte) per RFC 7541 §5.1's integer representation, continuing
/// into as many following bytes as required.
fn encode_integer(out: &mut BytesMut, prefix_bits: u8, prefix_value: u8, mut value: usize) {
    let max_prefix = (1usize << prefix_bits) - 1;
    if value < max_prefix {
        out.extend_from_slice(&[prefix_value | value as u8]);
        return;
    }
    out.extend_from_slice(&[prefix_value | max_prefix as u8]);
    value -= max_prefix;
    while value >= 128 {
        out.extend_from_slice(&[((value % 128) | 0x80) as u8]);
        value /= 128;
    }
    out.extend_from_slice(&[value as u8]);
}

fn decode_integer(data: &[u8], prefix_bits: u8) -> Option<(usize, usize)> {
    let max_prefix = (1usize << prefix_bits) - 1;
    let first = *data.first()? as usize & max_prefix;
    if first < max_prefix {
        return Some((first, 1));
    }
    let mut value = max_prefix;
    let mut m = 0u32;
    let mut consumed = 1;
    loop {
        let byte = *data.get(consumed)? as usize;
        consumed += 1;
        value += (byte & 0x7f) << m;
        m += 7;
        if byte & 0x80 == 0 {
            break;
        }
    }
    Some((value, consumed))
}

/// Encodes a string literal. `huffman` selects the H-bit; callers that
/// want the adversarial "pretend Huffman but send raw octets" stimulus
/// should not reach for this function (see `encode_literal_bad_huffman_padding`).
fn encode_string(out: &mut BytesMut, data: &[u8], huffman: bool) {
    if huffman {
        let encoded = huffman::encode(data);
        encode_integer(out, 7, 0x80, encoded.len());
        out.extend_from_slice(&encoded);
    } else {
        encode_integer(out, 7, 0x00, data.len());
        out.extend_from_slice(data);
    }
}

fn decode_string(data: &[u8]) -> Option<(Bytes, usize)> {
    let huffman = data.first()? & 0x80 != 0;
    let (len, prefix_len) = decode_integer(data, 7)?;
    let body = data.get(prefix_len..prefix_len + len)?;
    let value = if huffman {
        huffman::decode(body)?
    } else {
        Bytes::copy_from_slice(body)
    };
    Some((value, prefix_len + len))
}

#[derive(Debug, Clone)]
pub struct Encoder {
    table: Table,
}

impl Encoder {
    pub fn with_size(dynamic_table_size: usize) -> Self {
        Self {
            table: Table::new(dynamic_table_size),
        }
    }

    /// Well-formed encoding: literal-with-incremental-indexing for every
    /// header, Huffman-coded. Does not attempt to find static-table
    /// matches — a harness that never takes the indexed-name shortcut
    /// is simpler to reason about and still produces a block any
    /// compliant decoder must accept.
    pub fn encode<K, V>(&mut self, headers: impl IntoIterator<Item = (K, V)>) -> Bytes
    where
        K: Into<Bytes>,
        V: Into<Bytes>,
    {
        let mut out = BytesMut::new();
        let mut count = 0usize;
        for (name, value) in headers {
            let name: Bytes = name.into();
            let value: Bytes = value.into();
            out.extend_from_slice(&[0x40]);
            encode_string(&mut out, &name, true);
            encode_string(&mut out, &value, true);
            self.table.push(name, value);
            count += 1;
        }
        log::trace!("encoded {count} header(s) into {} byte(s)", out.len());
        out.freeze()
    }

    /// Adversarial: an indexed header field representation with index 0,
    /// which RFC 7541 §6.1 forbids (index 0 is not a valid table index).
    pub fn encode_indexed_zero(&self) -> Bytes {
        Bytes::copy_from_slice(&[0x80])
    }

    /// Adversarial: a dynamic table size update with no ceiling check
    /// against the negotiated SETTINGS_HEADER_TABLE_SIZE. RFC 7541 §6.3
    /// requires this representation to fit at the start of a header
    /// block; the encoder happily emits one announcing an oversized table.
    pub fn encode_dynamic_size_update(&self, new_size: usize) -> Bytes {
        let mut out = BytesMut::new();
        encode_integer(&mut out, 5, 0x20, new_size);
        out.freeze()
    }

    /// Adversarial: a literal whose H-bit claims Huffman coding but whose
    /// body is raw octets padded with more than 7 one-bits, which RFC
    /// 7541 §5.2 forbids ("padding strictly greater than 7 bits MUST be
    /// treated as a decoding error").
    pub fn encode_literal_bad_huffman_padding(&self, name: &[u8], value: &[u8]) -> Bytes {
        let mut out = BytesMut::new();
        out.extend_from_slice(&[0x40]);
        encode_integer(&mut out, 7, 0x80, name.len() + 2);
        out.extend_from_slice(name);
        out.extend_from_slice(&[0xff, 0xff]);
        encode_integer(&mut out, 7, 0x00, value.len());
        out.extend_from_slice(value);
        out.freeze()
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::with_size(4096)
    }
}

#[derive(Debug, Clone)]
pub struct Decoder {
    table: Table,
}

#[derive(thiserror::Error, Debug)]
pub enum HpackDecodeError {
    #[error("indexed representation with index 0, which is not a valid table index")]
    IndexedZero,
    #[error("table index {0} is out of range")]
    IndexOutOfRange(usize),
    #[error("truncated header block")]
    Truncated,
    #[error("huffman-coded string has invalid padding")]
    BadHuffmanPadding,
}

impl Decoder {
    pub fn with_size(dynamic_table_size: usize) -> Self {
        Self {
            table: Table::new(dynamic_table_size),
        }
    }

    /// Decodes a full header block, returning every field in order.
    /// Unlike the teacher's stub this validates against the RFC and
    /// returns `Err` rather than silently skipping malformed input —
    /// case routines and the verifier need to tell "client sent garbage"
    /// from "client sent nothing".
    pub fn decode(&mut self, data: impl Into<Bytes>) -> Result<Vec<(Bytes, Bytes)>, HpackDecodeError> {
        let data = data.into();
        let mut pos = 0;
        let mut out = Vec::new();
        while pos < data.len() {
            let byte = data[pos];
            if byte & 0x80 != 0 {
                let (index, used) = decode_integer(&data[pos..], 7).ok_or(HpackDecodeError::Truncated)?;
                if index == 0 {
                    log::debug!("header block carries indexed representation with index 0");
                    return Err(HpackDecodeError::IndexedZero);
                }
                let entry = self.table.get(index).ok_or_else(|| {
                    log::debug!("header block references out-of-range table index {index}");
                    HpackDecodeError::IndexOutOfRange(index)
                })?;
                out.push((entry.name.clone(), entry.value.clone()));
                pos += used;
            } else if byte & 0x40 != 0 {
                pos += self.decode_literal(&data[pos..], 6, true, &mut out)?;
            } else if byte & 0x20 != 0 {
                let (size, used) = decode_integer(&data[pos..], 5).ok_or(HpackDecodeError::Truncated)?;
                self.table.resize(size);
                pos += used;
            } else {
                // Literal without indexing (0x00) and never-indexed (0x10)
                // share the same 4-bit prefix and differ only in the
                // dynamic-table side effect, which this decoder doesn't need
                // to distinguish since it never re-encodes what it reads.
                pos += self.decode_literal(&data[pos..], 4, false, &mut out)?;
            }
        }
        log::trace!("decoded {} header(s) from {} byte(s)", out.len(), data.len());
        Ok(out)
    }

    fn decode_literal(
        &mut self,
        data: &[u8],
        prefix_bits: u8,
        index: bool,
        out: &mut Vec<(Bytes, Bytes)>,
    ) -> Result<usize, HpackDecodeError> {
        let (name_index, mut consumed) =
            decode_integer(data, prefix_bits).ok_or(HpackDecodeError::Truncated)?;
        let name = if name_index == 0 {
            let (value, used) = decode_string(&data[consumed..]).ok_or(HpackDecodeError::BadHuffmanPadding)?;
            consumed += used;
            value
        } else {
            self.table
                .get(name_index)
                .ok_or(HpackDecodeError::IndexOutOfRange(name_index))?
                .name
                .clone()
        };
        let (value, used) = decode_string(&data[consumed..]).ok_or(HpackDecodeError::BadHuffmanPadding)?;
        consumed += used;
        if index {
            self.table.push(name.clone(), value.clone());
        }
        out.push((name, value));
        Ok(consumed)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::with_size(4096)
    }
}

/// RFC 7541 Appendix B static Huffman code, used for header name/value
/// compression. Kept as a private submodule since nothing outside this
/// file needs the raw code table.
mod huffman {
    use bytes::Bytes;

    /// (code, bit length) for symbols 0..=255; index 256 is EOS.
    static CODES: [(u32, u8); 257] = include!("hpack_huffman_table.rs.inc");

    pub fn encode(data: &[u8]) -> Bytes {
        let mut bits: u64 = 0;
        let mut nbits: u32 = 0;
        let mut out = Vec::with_capacity(data.len());
        for &byte in data {
            let (code, len) = CODES[byte as usize];
            bits = (bits << len) | code as u64;
            nbits += len as u32;
            while nbits >= 8 {
                nbits -= 8;
                out.push((bits >> nbits) as u8);
            }
        }
        if nbits > 0 {
            let (eos_code, _eos_len) = CODES[256];
            let pad = (eos_code >> (30 - (8 - nbits))) as u8 & ((1 << (8 - nbits)) - 1);
            let last = ((bits << (8 - nbits)) as u8) | pad;
            out.push(last);
        }
        Bytes::from(out)
    }

    pub fn decode(data: &[u8]) -> Option<Bytes> {
        let mut out = Vec::new();
        let mut bits: u64 = 0;
        let mut nbits: u32 = 0;
        for &byte in data {
            bits = (bits << 8) | byte as u64;
            nbits += 8;
            loop {
                let mut matched = false;
                for sym in 0..256u32 {
                    let (code, len) = CODES[sym as usize];
                    if nbits >= len as u32 {
                        let candidate = ((bits >> (nbits - len as u32)) & ((1u64 << len) - 1)) as u32;
                        if candidate == code {
                            out.push(sym as u8);
                            nbits -= len as u32;
                            matched = true;
                            break;
                        }
                    }
                }
                if !matched {
                    break;
                }
            }
        }
        // Remaining bits must be an EOS padding prefix of all ones.
        if nbits > 7 {
            return None;
        }
        if nbits > 0 {
            let remaining_mask = (1u64 << nbits) - 1;
            if (bits & remaining_mask) != remaining_mask {
                return None;
            }
        }
        Some(Bytes::from(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::hpack as their_hpack;

    #[test]
    fn encode_integer_matches_rfc_example() {
        // https://httpwg.org/specs/rfc7541.html#integer.representation.example1
        let mut out = BytesMut::new();
        encode_integer(&mut out, 8, 0, 10);
        assert_eq!(out.as_ref(), &[0b00001010_u8]);
    }

    #[test]
    fn encode_integer_with_continuation_matches_rfc_example() {
        // https://httpwg.org/specs/rfc7541.html#integer.representation.example3
        let mut out = BytesMut::new();
        encode_integer(&mut out, 5, 0, 1337);
        assert_eq!(out.as_ref(), &[0x1f, 0x9a, 0x0a]);
    }

    #[test]
    fn round_trips_against_external_decoder() {
        let mut encoder = Encoder::default();
        let mut decoder = their_hpack::Decoder::new();

        let headers = vec![(":method", "GET"), (":path", "/")];
        let encoded = encoder.encode(headers.clone());
        let decoded = decoder.decode(&encoded).unwrap();
        assert_eq!(
            decoded,
            headers
                .into_iter()
                .map(|(k, v)| (k.as_bytes().into(), v.as_bytes().into()))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn decodes_blocks_from_external_encoder() {
        let mut decoder = Decoder::default();
        let mut encoder = their_hpack::Encoder::new();

        let headers = vec![(&b":method"[..], &b"GET"[..]), (&b":path"[..], &b"/"[..])];
        let encoded = encoder.encode(headers.clone());
        let decoded = decoder.decode(encoded).unwrap();
        assert_eq!(
            decoded,
            headers
                .into_iter()
                .map(|(k, v)| (Bytes::copy_from_slice(k), Bytes::copy_from_slice(v)))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn indexed_zero_is_rejected_by_the_decoder() {
        let mut decoder = Decoder::default();
        let err = decoder.decode(Bytes::from_static(&[0x80])).unwrap_err();
        assert!(matches!(err, HpackDecodeError::IndexedZero));
    }

    #[test]
    fn encoder_can_emit_the_forbidden_indexed_zero_byte() {
        let encoder = Encoder::default();
        assert_eq!(encoder.encode_indexed_zero().as_ref(), &[0x80]);
    }

    #[test]
    fn dynamic_size_update_has_no_ceiling() {
        let encoder = Encoder::default();
        let encoded = encoder.encode_dynamic_size_update(1 << 20);
        assert_eq!(encoded[0] & 0xe0, 0x20);
    }
}
