// Copyright 2017 The Gfx-rs Developers.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Size of one FITS-reserved header block.
pub const FITS_BLOCK_BYTES: usize = 2880;
/// Two reserved blocks, zero-filled, precede every averaged cube.
pub const FITS_HEADER_BYTES: usize = FITS_BLOCK_BYTES * 2;

/// The constant re-centering term in the 32-to-16-bit narrowing law.
pub const NARROW_BIAS: i32 = 0x8000;

/// Which payload width an averaged cube is written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// `out16[i] = (i16)((accum32[i] >> 16) - 0x8000)`.
    Narrow16,
    /// The unshifted 32-bit accumulation, written as-is.
    Raw32,
}

/// Narrow one 32-bit accumulated value per the spec's law.
///
/// The right shift discards the low 16 bits of the accumulation; the subtraction re-centers
/// the unsigned result so it fits a signed 16-bit output without saturating.
pub fn narrow16(value: u32) -> i16 {
    (((value >> 16) as i32) - NARROW_BIAS) as i16
}

/// Serialize a region's accumulated values as the bytes that follow the header, in the
/// configured payload format.
pub fn payload_bytes(values: &[u32], format: PayloadFormat) -> Vec<u8> {
    match format {
        PayloadFormat::Narrow16 => {
            let mut out = Vec::with_capacity(values.len() * 2);
            for &v in values {
                out.extend_from_slice(&narrow16(v).to_le_bytes());
            }
            out
        }
        PayloadFormat::Raw32 => {
            let mut out = Vec::with_capacity(values.len() * 4);
            for &v in values {
                out.extend_from_slice(&v.to_le_bytes());
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_matches_the_published_law() {
        assert_eq!(narrow16(0x0000_0000), -0x8000);
        assert_eq!(narrow16(0xFFFF_0000), 0x7FFF);
        assert_eq!(narrow16(0x8000_0000), 0);
    }

    #[test]
    fn payload_bytes_lengths_match_format() {
        let values = [1u32, 2, 3, 4];
        assert_eq!(payload_bytes(&values, PayloadFormat::Narrow16).len(), 8);
        assert_eq!(payload_bytes(&values, PayloadFormat::Raw32).len(), 16);
    }
}
