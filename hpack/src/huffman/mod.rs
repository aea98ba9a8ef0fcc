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

//! Decoding of the canonical Huffman code used for HPACK string literals
//! (RFC 7541 §5.2 and Appendix B).

use crate::Error;
use crate::Result;

use self::table::CODE_TABLE;
use self::table::EOS_SYMBOL;

// No code is shorter than 5 or longer than 30 bits.
const SHORTEST_CODE: u32 = 5;
const LONGEST_CODE: u32 = 30;

/// Decodes the whole of `b` as a Huffman-coded byte string, appending the
/// decoded octets to `out`.
///
/// The caller slices `b` to exactly the string's encoded length beforehand.
/// Trailing bits after the last full symbol must be the most significant
/// bits of the EOS code (all ones) and at most 7 bits long; anything else,
/// including an explicitly coded EOS symbol, fails the decode.
pub fn decode(b: &mut octets::Octets, out: &mut Vec<u8>) -> Result<()> {
    let mut decoder = Decoder::new();

    while b.cap() > 0 {
        decoder.feed(b.get_u8()?, out)?;
    }

    decoder.finish()
}

/// Bit-level decoding state: an MSB-first accumulator of the bits that have
/// not yet formed a complete symbol.
struct Decoder {
    acc: u64,
    acc_len: u32,
}

impl Decoder {
    fn new() -> Decoder {
        Decoder { acc: 0, acc_len: 0 }
    }

    /// Shifts in one input octet and emits every symbol that completes.
    fn feed(&mut self, byte: u8, out: &mut Vec<u8>) -> Result<()> {
        self.acc = (self.acc << 8) | u64::from(byte);
        self.acc_len += 8;

        while let Some((sym, len)) = self.next_symbol()? {
            out.push(sym);

            self.acc_len -= len;
            self.acc &= (1u64 << self.acc_len) - 1;
        }

        Ok(())
    }

    /// Matches the accumulator's leading bits against the code table,
    /// shortest codes first. Prefix-freedom makes the first match the only
    /// possible one.
    fn next_symbol(&self) -> Result<Option<(u8, u32)>> {
        for len in SHORTEST_CODE..=self.acc_len.min(LONGEST_CODE) {
            let candidate = (self.acc >> (self.acc_len - len)) as u32;

            for (sym, &(code, nbits)) in CODE_TABLE.iter().enumerate() {
                if u32::from(nbits) != len || code != candidate {
                    continue;
                }

                if sym == EOS_SYMBOL {
                    // EOS is only ever implied by padding, never coded.
                    return Err(Error::InvalidHuffmanEncoding);
                }

                return Ok(Some((sym as u8, len)));
            }
        }

        if self.acc_len >= LONGEST_CODE {
            return Err(Error::InvalidHuffmanEncoding);
        }

        Ok(None)
    }

    /// Verifies the trailing padding once the input is exhausted.
    fn finish(&self) -> Result<()> {
        if self.acc_len > 7 {
            return Err(Error::InvalidHuffmanEncoding);
        }

        if self.acc_len > 0 && self.acc != (1u64 << self.acc_len) - 1 {
            return Err(Error::InvalidHuffmanEncoding);
        }

        Ok(())
    }
}

mod table;

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_vec(encoded: &[u8]) -> Result<Vec<u8>> {
        let mut b = octets::Octets::with_slice(encoded);
        let mut out = Vec::new();

        decode(&mut b, &mut out)?;

        Ok(out)
    }

    #[test]
    fn decode_empty() {
        assert_eq!(decode_vec(&[]), Ok(b"".to_vec()));
    }

    #[test]
    fn decode_rfc7541_strings() {
        // The string literals of RFC 7541 Appendix C.4 and C.6.
        let encoded = [
            0xf1, 0xe3, 0xc2, 0xe5, 0xf2, 0x3a, 0x6b, 0xa0, 0xab, 0x90, 0xf4,
            0xff,
        ];
        assert_eq!(decode_vec(&encoded), Ok(b"www.example.com".to_vec()));

        let encoded = [0xa8, 0xeb, 0x10, 0x64, 0x9c, 0xbf];
        assert_eq!(decode_vec(&encoded), Ok(b"no-cache".to_vec()));

        let encoded = [0x25, 0xa8, 0x49, 0xe9, 0x5b, 0xa9, 0x7d, 0x7f];
        assert_eq!(decode_vec(&encoded), Ok(b"custom-key".to_vec()));

        let encoded = [0x25, 0xa8, 0x49, 0xe9, 0x5b, 0xb8, 0xe8, 0xb4, 0xbf];
        assert_eq!(decode_vec(&encoded), Ok(b"custom-value".to_vec()));

        let encoded = [0x64, 0x02];
        assert_eq!(decode_vec(&encoded), Ok(b"302".to_vec()));
    }

    #[test]
    fn decode_single_symbol() {
        // '0' is the 5-bit code 00000; three padding ones follow.
        assert_eq!(decode_vec(&[0x07]), Ok(b"0".to_vec()));
    }

    #[test]
    fn eos_in_stream() {
        // 30 bits of EOS followed by two zero bits.
        let encoded = [0xff, 0xff, 0xff, 0xfc];
        assert_eq!(decode_vec(&encoded), Err(Error::InvalidHuffmanEncoding));
    }

    #[test]
    fn padding_too_long() {
        // A full octet of ones past the last symbol boundary.
        let encoded = [0xff, 0xff];
        assert_eq!(decode_vec(&encoded), Err(Error::InvalidHuffmanEncoding));
    }

    #[test]
    fn padding_not_ones() {
        // 010111 decodes '-', leaving the invalid padding 10.
        assert_eq!(decode_vec(&[0x5e]), Err(Error::InvalidHuffmanEncoding));
    }
}
