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

//! HEADERS frame plumbing: the frame's flag bits, the non-compressed prefix
//! that precedes the header block fragment, and the HTTP/2 error codes
//! decode failures map to (RFC 7540 §6.2, §7).

use crate::Result;

pub const HEADERS_FLAG_END_STREAM: u8 = 0x1;
pub const HEADERS_FLAG_END_HEADERS: u8 = 0x4;
pub const HEADERS_FLAG_PADDED: u8 = 0x8;
pub const HEADERS_FLAG_PRIORITY: u8 = 0x20;

pub const ERROR_PROTOCOL_ERROR: u64 = 0x1;
pub const ERROR_INTERNAL_ERROR: u64 = 0x2;
pub const ERROR_COMPRESSION_ERROR: u64 = 0x9;
pub const ERROR_ENHANCE_YOUR_CALM: u64 = 0xb;

/// Default priority weight for streams that carry no PRIORITY fields
/// (RFC 7540 §5.3.5; the on-wire value 15 plus one).
pub const DEFAULT_PRIORITY_WEIGHT: u8 = 16;

/// The decoded non-compressed prefix of a HEADERS frame payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeadersPrefix {
    /// Number of padding octets trailing the frame; 0 without PADDED.
    pub pad_length: u8,

    /// The stream this stream depends on, or 0 without PRIORITY.
    pub dependent_stream_id: u32,

    /// Whether the stream dependency is exclusive.
    pub exclusive: bool,

    /// The stream's priority weight, stored as the raw wire octet.
    pub weight: u8,

    /// Whether the frame carried END_STREAM.
    pub end_stream: bool,
}

/// Parses the pad length and priority fields sitting between a HEADERS
/// frame's header and its header block fragment, leaving `b` positioned at
/// the fragment's first octet.
///
/// If the flags call for more octets than `b` holds, fails with
/// [`BufferTooShort`] before consuming anything; the caller retries with a
/// fresh buffer once the rest of the frame has arrived. The padding octets
/// themselves trail the fragment and are the framing layer's to discard.
///
/// [`BufferTooShort`]: crate::Error::BufferTooShort
pub fn parse_headers_prefix(
    b: &mut octets::Octets, flags: u8,
) -> Result<HeadersPrefix> {
    let has_padding = flags & HEADERS_FLAG_PADDED != 0;
    let has_priority = flags & HEADERS_FLAG_PRIORITY != 0;

    let required =
        usize::from(has_padding) + if has_priority { 5 } else { 0 };

    if b.cap() < required {
        return Err(crate::Error::BufferTooShort);
    }

    let mut prefix = HeadersPrefix {
        pad_length: 0,
        dependent_stream_id: 0,
        exclusive: false,
        weight: DEFAULT_PRIORITY_WEIGHT,
        end_stream: flags & HEADERS_FLAG_END_STREAM != 0,
    };

    if has_padding {
        prefix.pad_length = b.get_u8()?;
    }

    if has_priority {
        let dependency = b.get_u32()?;

        prefix.exclusive = dependency & 0x8000_0000 != 0;
        prefix.dependent_stream_id = dependency & 0x7fff_ffff;
        prefix.weight = b.get_u8()?;
    }

    Ok(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags() {
        let payload = [0x82, 0x86, 0x84];
        let mut b = octets::Octets::with_slice(&payload);

        let prefix = parse_headers_prefix(&mut b, 0).unwrap();

        assert_eq!(prefix, HeadersPrefix {
            pad_length: 0,
            dependent_stream_id: 0,
            exclusive: false,
            weight: DEFAULT_PRIORITY_WEIGHT,
            end_stream: false,
        });

        // The whole payload is header block fragment.
        assert_eq!(b.off(), 0);
    }

    #[test]
    fn padded() {
        let payload = [0x05, 0x82];
        let mut b = octets::Octets::with_slice(&payload);

        let flags = HEADERS_FLAG_PADDED | HEADERS_FLAG_END_STREAM;
        let prefix = parse_headers_prefix(&mut b, flags).unwrap();

        assert_eq!(prefix.pad_length, 5);
        assert!(prefix.end_stream);
        assert_eq!(b.off(), 1);
    }

    #[test]
    fn priority() {
        // Exclusive dependency on stream 3, weight octet 219.
        let payload = [0x80, 0x00, 0x00, 0x03, 0xdb, 0x82];
        let mut b = octets::Octets::with_slice(&payload);

        let prefix =
            parse_headers_prefix(&mut b, HEADERS_FLAG_PRIORITY).unwrap();

        assert!(prefix.exclusive);
        assert_eq!(prefix.dependent_stream_id, 3);
        assert_eq!(prefix.weight, 219);
        assert_eq!(prefix.pad_length, 0);
        assert_eq!(b.off(), 5);
    }

    #[test]
    fn padded_and_priority() {
        let payload = [0x08, 0x7f, 0xff, 0xff, 0xff, 0x00, 0x82];
        let mut b = octets::Octets::with_slice(&payload);

        let flags = HEADERS_FLAG_PADDED | HEADERS_FLAG_PRIORITY;
        let prefix = parse_headers_prefix(&mut b, flags).unwrap();

        assert_eq!(prefix.pad_length, 8);

        // Top bit masked off the 31-bit stream dependency.
        assert!(!prefix.exclusive);
        assert_eq!(prefix.dependent_stream_id, 0x7fff_ffff);
        assert_eq!(prefix.weight, 0);
        assert_eq!(b.off(), 6);
    }

    #[test]
    fn short_buffer() {
        let payload = [0x08, 0x00, 0x00];
        let mut b = octets::Octets::with_slice(&payload);

        let flags = HEADERS_FLAG_PADDED | HEADERS_FLAG_PRIORITY;
        assert_eq!(
            parse_headers_prefix(&mut b, flags),
            Err(crate::Error::BufferTooShort)
        );

        // Nothing may have been consumed.
        assert_eq!(b.off(), 0);
    }
}
