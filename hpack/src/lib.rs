// Copyright (C) 2019, Cloudflare, Inc.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//
//     * Redistributions in binary form must reproduce the above copyright
//       notice, this list of conditions and the following disclaimer in the
//       documentation and/or other materials provided with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS
// IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO,
// THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR
// PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! 🗜️ HPACK header decompression for HTTP/2.
//!
//! This crate implements the decoding side of HPACK as specified by [RFC
//! 7541], reconstructing a stream of name/value header pairs from the
//! compressed octet sequence carried by HTTP/2 HEADERS and CONTINUATION
//! frames, along with a parser for the non-compressed prefix of a HEADERS
//! frame payload (pad length and stream priority fields).
//!
//! [RFC 7541]: https://www.rfc-editor.org/rfc/rfc7541
//!
//! ## Decoding header blocks
//!
//! A [`Decoder`] holds the per-connection HPACK state (most notably the
//! dynamic table), so a single instance must be used for all header blocks
//! arriving on one connection, in the order they arrive:
//!
//! ```
//! let mut decoder = hpack::Decoder::new(4096);
//! let mut headers = hpack::HeaderList::new();
//!
//! // `:method: GET`, `:scheme: http`, `:path: /` from the static table.
//! let block = [0x82, 0x86, 0x84];
//!
//! decoder.decode(&block, false, &mut headers)?;
//!
//! for h in headers.fields() {
//!     println!("{:?}: {:?}", h.name(), h.value());
//! }
//! # Ok::<(), hpack::Error>(())
//! ```
//!
//! ## Partial header blocks
//!
//! A header block may arrive split across arbitrary buffer boundaries. As
//! long as more data is expected for the current block, [`Decoder::decode()`]
//! returns the number of octets it fully consumed; the caller keeps the
//! unconsumed tail and re-invokes `decode()` once more octets have arrived:
//!
//! ```
//! let mut decoder = hpack::Decoder::new(4096);
//! let mut headers = hpack::HeaderList::new();
//!
//! let block = [0x82, 0x86, 0x84, 0x41, 0x03, 0x66, 0x6f, 0x6f];
//! let (first, rest) = block.split_at(5);
//!
//! // The literal's value string is still in flight, so the instruction
//! // is held back until the final chunk arrives.
//! let consumed = decoder.decode(first, true, &mut headers)?;
//!
//! let mut pending = first[consumed..].to_vec();
//! pending.extend_from_slice(rest);
//! decoder.decode(&pending, false, &mut headers)?;
//!
//! assert_eq!(headers.fields().len(), 4);
//! # Ok::<(), hpack::Error>(())
//! ```
//!
//! Decoding for a single connection must be strictly sequential: table
//! indices are defined relative to the cumulative effect of all prior
//! instructions, so calls for one connection may never be reordered or
//! interleaved. Separate connections own separate [`Decoder`]s and are free
//! to decode in parallel.

#[macro_use]
extern crate log;

/// The default maximum size of the dynamic table (RFC 7541 §4.2).
pub const DEFAULT_HEADER_TABLE_SIZE: usize = 4096;

// Leading-bit patterns of the five header field representations (RFC 7541
// §6). Together they partition the whole octet space, so dispatch on them
// is total.
const INDEXED: u8 = 0b1000_0000;
const LITERAL_WITH_INDEXING: u8 = 0b0100_0000;
const SIZE_UPDATE: u8 = 0b0010_0000;
const LITERAL_NEVER_INDEXED: u8 = 0b0001_0000;

/// A specialized [`Result`] type for HPACK operations.
///
/// [`Result`]: https://doc.rust-lang.org/std/result/enum.Result.html
pub type Result<T> = std::result::Result<T, Error>;

/// An HPACK decoding error.
///
/// With the exception of [`BufferTooShort`], every variant is fatal for the
/// connection it occurred on: HPACK has no self-delimiting recovery point, so
/// once the decoder's state is suspect the connection must be torn down.
///
/// [`BufferTooShort`]: Error::BufferTooShort
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The provided buffer ended before a full instruction could be read.
    ///
    /// This is the resumption signal, not a failure: the caller retries with
    /// the unconsumed octets once more data has arrived. It only escapes to
    /// the caller from [`frame::parse_headers_prefix()`]; `Decoder::decode()`
    /// translates it into its consumed-octets return value.
    BufferTooShort,

    /// A header block ended mid-instruction on its final chunk.
    TruncatedHeaderBlock,

    /// A prefixed integer's continuation octets overflowed the decoder.
    IntegerOverflow,

    /// A table index was zero or beyond the live table range.
    InvalidTableIndex,

    /// A dynamic table size update exceeded the connection's ceiling, or
    /// appeared after another representation in the same header block.
    InvalidSizeUpdate,

    /// A literal header name decoded to the empty string.
    InvalidHeaderName,

    /// The header block's huffman encoding is invalid.
    InvalidHuffmanEncoding,

    /// The decoded header list exceeded the byte size limit.
    HeaderListTooLarge,

    /// The decoded header list exceeded the header count limit.
    ExcessiveHeaders,
}

impl Error {
    /// Returns the HTTP/2 error code to signal on the connection for this
    /// error (RFC 7540 §7).
    pub fn to_wire(self) -> u64 {
        match self {
            Error::BufferTooShort => frame::ERROR_INTERNAL_ERROR,

            Error::InvalidSizeUpdate => frame::ERROR_PROTOCOL_ERROR,

            Error::HeaderListTooLarge | Error::ExcessiveHeaders =>
                frame::ERROR_ENHANCE_YOUR_CALM,

            _ => frame::ERROR_COMPRESSION_ERROR,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl std::convert::From<octets::BufferTooShortError> for Error {
    fn from(_err: octets::BufferTooShortError) -> Self {
        Error::BufferTooShort
    }
}

/// A decoded header field.
///
/// Names are case-insensitive tokens; HPACK transports them in lowercase and
/// comparisons should use [`slice::eq_ignore_ascii_case`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header(Vec<u8>, Vec<u8>, bool);

impl Header {
    /// Creates a new header from owned name and value octets.
    pub fn new<N: Into<Vec<u8>>, V: Into<Vec<u8>>>(
        name: N, value: V, never_indexed: bool,
    ) -> Header {
        Header(name.into(), value.into(), never_indexed)
    }

    /// Returns the header's name.
    pub fn name(&self) -> &[u8] {
        &self.0
    }

    /// Returns the header's value.
    pub fn value(&self) -> &[u8] {
        &self.1
    }

    /// Returns true if the header was encoded as "literal never indexed".
    ///
    /// Such a header must not be cached or re-indexed by intermediaries when
    /// it is forwarded or retransmitted.
    pub fn never_indexed(&self) -> bool {
        self.2
    }
}

/// The receiving end of a [`Decoder`].
///
/// One call per fully decoded representation, synchronously and in wire
/// order, before the dynamic table mutation (if any) for that representation
/// is applied. An implementation may be invoked zero or many times per
/// [`Decoder::decode()`] call.
pub trait HeaderEmitter {
    /// Receives a single decoded header field.
    ///
    /// Returning an error aborts the decode; the error is fatal for the
    /// connection.
    fn emit_header(
        &mut self, name: &[u8], value: &[u8], never_indexed: bool,
    ) -> Result<()>;
}

/// A [`HeaderEmitter`] that collects fields into a list, in wire order.
///
/// Optionally enforces the per-request limits on total header count and
/// total header list byte size that HTTP/2 endpoints advertise via
/// `SETTINGS_MAX_HEADER_LIST_SIZE`, counted as name length plus value length
/// plus a 32 octet overhead per field (RFC 7540 §10.5.1).
#[derive(Clone, Debug, Default)]
pub struct HeaderList {
    fields: Vec<Header>,
    list_size: usize,
    max_list_size: Option<usize>,
    max_fields: Option<usize>,
}

impl HeaderList {
    /// Creates a new unbounded header list.
    pub fn new() -> HeaderList {
        HeaderList::default()
    }

    /// Creates a new header list enforcing the given limits.
    pub fn with_limits(
        max_list_size: Option<usize>, max_fields: Option<usize>,
    ) -> HeaderList {
        HeaderList {
            max_list_size,
            max_fields,
            ..HeaderList::default()
        }
    }

    /// Returns the collected fields, in wire order.
    pub fn fields(&self) -> &[Header] {
        &self.fields
    }

    /// Returns the cumulative header list size, as defined by RFC 7540
    /// §10.5.1.
    pub fn list_size(&self) -> usize {
        self.list_size
    }

    /// Returns true if the list contains a `content-length` header with a
    /// positive decimal value.
    pub fn has_positive_content_length(&self) -> bool {
        self.fields
            .iter()
            .find(|h| h.name().eq_ignore_ascii_case(b"content-length"))
            .and_then(|h| std::str::from_utf8(h.value()).ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .is_some_and(|len| len > 0)
    }

    /// Consumes the list, returning the collected fields.
    pub fn into_fields(self) -> Vec<Header> {
        self.fields
    }
}

impl HeaderEmitter for HeaderList {
    fn emit_header(
        &mut self, name: &[u8], value: &[u8], never_indexed: bool,
    ) -> Result<()> {
        if let Some(max) = self.max_fields {
            if self.fields.len() == max {
                return Err(Error::ExcessiveHeaders);
            }
        }

        self.list_size += name.len() + value.len() + table::ENTRY_OVERHEAD;

        if let Some(max) = self.max_list_size {
            if self.list_size > max {
                return Err(Error::HeaderListTooLarge);
            }
        }

        self.fields.push(Header::new(name, value, never_indexed));

        Ok(())
    }
}

pub use crate::decoder::Decoder;
pub use crate::frame::parse_headers_prefix;
pub use crate::frame::HeadersPrefix;
pub use crate::table::DynamicTable;
pub use crate::table::HeaderField;

pub mod frame;

mod decoder;
mod huffman;
mod static_table;
mod table;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_to_wire() {
        assert_eq!(
            Error::InvalidHuffmanEncoding.to_wire(),
            frame::ERROR_COMPRESSION_ERROR
        );
        assert_eq!(
            Error::TruncatedHeaderBlock.to_wire(),
            frame::ERROR_COMPRESSION_ERROR
        );
        assert_eq!(
            Error::InvalidSizeUpdate.to_wire(),
            frame::ERROR_PROTOCOL_ERROR
        );
        assert_eq!(
            Error::HeaderListTooLarge.to_wire(),
            frame::ERROR_ENHANCE_YOUR_CALM
        );
    }

    #[test]
    fn header_list_field_limit() {
        let mut list = HeaderList::with_limits(None, Some(2));

        assert_eq!(list.emit_header(b"a", b"b", false), Ok(()));
        assert_eq!(list.emit_header(b"c", b"d", false), Ok(()));
        assert_eq!(
            list.emit_header(b"e", b"f", false),
            Err(Error::ExcessiveHeaders)
        );
    }

    #[test]
    fn header_list_size_limit() {
        // One field of size 3 + 5 + 32 = 40 fits exactly; a second one of
        // any size must trip the limit.
        let mut list = HeaderList::with_limits(Some(40), None);

        assert_eq!(list.emit_header(b"foo", b"barba", false), Ok(()));
        assert_eq!(list.list_size(), 40);
        assert_eq!(
            list.emit_header(b"", b"", false),
            Err(Error::HeaderListTooLarge)
        );
    }

    #[test]
    fn content_length_probe() {
        let mut list = HeaderList::new();

        list.emit_header(b"content-length", b"0", false).unwrap();
        assert!(!list.has_positive_content_length());

        let mut list = HeaderList::new();

        list.emit_header(b"Content-Length", b"1234", false).unwrap();
        assert!(list.has_positive_content_length());

        let mut list = HeaderList::new();

        list.emit_header(b"content-length", b"bogus", false).unwrap();
        assert!(!list.has_positive_content_length());

        assert!(!HeaderList::new().has_positive_content_length());
    }
}
