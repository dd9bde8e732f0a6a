//! HEVC CABAC arithmetic decoding engine. Tracks a 9 bit coding range and
//! refills the value register one byte at a time, matching the reference
//! decoder state-for-state after every bin.
/*
 * H.265 video codec.
 * Copyright (c) 2013-2014 struktur AG, Dirk Farin <farin@struktur.de>
 *
 * This file is part of libde265.
 *
 * libde265 is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Lesser General Public License as
 * published by the Free Software Foundation, either version 3 of
 * the License, or (at your option) any later version.
 *
 * libde265 is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Lesser General Public License for more details.
 *
 * You should have received a copy of the GNU Lesser General Public License
 * along with libde265.  If not, see <http://www.gnu.org/licenses/>.
 */
use crate::context::ContextModel;
use crate::traits::CabacReader;

/// LPS range per probability state, indexed by `[state][(range >> 6) - 4]`
/// (H.265 Table 9-46).
pub const LPS_TABLE: [[u8; 4]; 64] = [
    [128, 176, 208, 240],
    [128, 167, 197, 227],
    [128, 158, 187, 216],
    [123, 150, 178, 205],
    [116, 142, 169, 195],
    [111, 135, 160, 185],
    [105, 128, 152, 175],
    [100, 122, 144, 166],
    [95, 116, 137, 158],
    [90, 110, 130, 150],
    [85, 104, 123, 142],
    [81, 99, 117, 135],
    [77, 94, 111, 128],
    [73, 89, 105, 122],
    [69, 85, 100, 116],
    [66, 80, 95, 110],
    [62, 76, 90, 104],
    [59, 72, 86, 99],
    [56, 69, 81, 94],
    [53, 65, 77, 89],
    [51, 62, 73, 85],
    [48, 59, 69, 80],
    [46, 56, 66, 76],
    [43, 53, 63, 72],
    [41, 50, 59, 69],
    [39, 48, 56, 65],
    [37, 45, 54, 62],
    [35, 43, 51, 59],
    [33, 41, 48, 56],
    [32, 39, 46, 53],
    [30, 37, 43, 50],
    [29, 35, 41, 48],
    [27, 33, 39, 45],
    [26, 31, 37, 43],
    [24, 30, 35, 41],
    [23, 28, 33, 39],
    [22, 27, 32, 37],
    [21, 26, 30, 35],
    [20, 24, 29, 33],
    [19, 23, 27, 31],
    [18, 22, 26, 30],
    [17, 21, 25, 28],
    [16, 20, 23, 27],
    [15, 19, 22, 25],
    [14, 18, 21, 24],
    [14, 17, 20, 23],
    [13, 16, 19, 22],
    [12, 15, 18, 21],
    [12, 14, 17, 20],
    [11, 14, 16, 19],
    [11, 13, 15, 18],
    [10, 12, 15, 17],
    [10, 12, 14, 16],
    [9, 11, 13, 15],
    [9, 11, 12, 14],
    [8, 10, 12, 14],
    [8, 9, 11, 13],
    [7, 9, 11, 12],
    [7, 9, 10, 12],
    [7, 8, 10, 11],
    [6, 8, 9, 11],
    [6, 7, 9, 10],
    [6, 7, 8, 9],
    [2, 2, 2, 2],
];

/// Number of renormalization shifts after an LPS, indexed by `LPS >> 3`.
pub const RENORM_TABLE: [u8; 32] = [
    6, 5, 4, 4, 3, 3, 3, 3, 2, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
];

/// Probability state transition after decoding the MPS.
pub const NEXT_STATE_MPS: [u8; 64] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26,
    27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43, 44, 45, 46, 47, 48, 49, 50,
    51, 52, 53, 54, 55, 56, 57, 58, 59, 60, 61, 62, 62, 63,
];

/// Probability state transition after decoding the LPS.
pub const NEXT_STATE_LPS: [u8; 64] = [
    0, 0, 1, 2, 2, 4, 4, 5, 6, 7, 8, 9, 9, 11, 11, 12, 13, 13, 15, 15, 16, 16, 18, 18, 19, 19, 21,
    21, 22, 22, 23, 24, 24, 25, 26, 26, 27, 27, 28, 29, 29, 30, 30, 30, 31, 32, 32, 33, 33, 33, 34,
    34, 35, 35, 35, 36, 36, 36, 37, 37, 37, 38, 38, 63,
];

/// CABAC decoder over an in-memory sub-bitstream.
///
/// The byte span is borrowed for the lifetime of the session and consumed
/// strictly left to right. Reading past the end behaves as if the stream
/// continued with zero bytes, so truncated input never fails; it decodes
/// to whatever the trailing zeros imply.
pub struct CabacDecoder<'a> {
    data: &'a [u8],
    cursor: usize,
    range: u32,
    value: u32,
    bits_needed: i32,
}

impl<'a> CabacDecoder<'a> {
    /// Starts a decode session: `range` = 510 and up to two bytes are
    /// pulled into the value register.
    pub fn new(data: &'a [u8]) -> Self {
        let mut decoder = CabacDecoder {
            data,
            cursor: 0,
            range: 510,
            value: 0,
            bits_needed: -8,
        };

        if decoder.cursor < decoder.data.len() {
            decoder.value = u32::from(decoder.data[decoder.cursor]);
            decoder.cursor += 1;
        }
        decoder.value <<= 8;
        decoder.bits_needed = 0;
        if decoder.cursor < decoder.data.len() {
            decoder.value |= u32::from(decoder.data[decoder.cursor]);
            decoder.cursor += 1;
            decoder.bits_needed = -8;
        }

        decoder
    }

    /// Rebuilds a decoder mid-stream from a previously observed state.
    /// `data` must start at the first unread byte.
    pub(crate) fn resume(data: &'a [u8], range: u32, value: u32, bits_needed: i32) -> Self {
        CabacDecoder {
            data,
            cursor: 0,
            range,
            value,
            bits_needed,
        }
    }

    /// Snapshot of `(range, value, bits_needed)` for differential testing.
    pub fn state(&self) -> (u32, u32, i32) {
        (self.range, self.value, self.bits_needed)
    }

    /// Number of bytes read from the span so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }

    fn next_byte(&mut self) -> u32 {
        if self.cursor < self.data.len() {
            let byte = u32::from(self.data[self.cursor]);
            self.cursor += 1;
            byte
        } else {
            0
        }
    }

    /// Decodes one context-coded bin, updating `ctx` in place.
    pub fn decode_bin(&mut self, ctx: &mut ContextModel) -> u8 {
        let lps = u32::from(LPS_TABLE[usize::from(ctx.state)][((self.range >> 6) - 4) as usize]);
        self.range -= lps;

        let scaled_range = self.range << 7;

        let bit;
        if self.value < scaled_range {
            // MPS
            bit = ctx.mps;
            ctx.state = NEXT_STATE_MPS[usize::from(ctx.state)];

            if scaled_range < (256 << 7) {
                // renormalize by a single bit
                self.range = scaled_range >> 6;
                self.value <<= 1;
                self.bits_needed += 1;

                if self.bits_needed == 0 {
                    self.bits_needed = -8;
                    self.value |= self.next_byte();
                }
            }
        } else {
            // LPS
            self.value -= scaled_range;

            let num_bits = RENORM_TABLE[(lps >> 3) as usize];
            self.value <<= num_bits;
            self.range = lps << num_bits;

            bit = 1 - ctx.mps;

            if ctx.state == 0 {
                ctx.mps = 1 - ctx.mps;
            }
            ctx.state = NEXT_STATE_LPS[usize::from(ctx.state)];

            self.bits_needed += i32::from(num_bits);
            if self.bits_needed >= 0 {
                self.value |= self.next_byte() << self.bits_needed;
                self.bits_needed -= 8;
            }
        }

        bit
    }

    /// Decodes one bypass bin (fixed 50/50 probability). Leaves `range`
    /// untouched.
    pub fn decode_bypass(&mut self) -> u8 {
        self.value <<= 1;
        self.bits_needed += 1;

        if self.bits_needed >= 0 {
            self.bits_needed = -8;
            self.value |= self.next_byte();
        }

        let scaled_range = self.range << 7;
        if self.value >= scaled_range {
            self.value -= scaled_range;
            1
        } else {
            0
        }
    }

    /// Decodes the terminating bin (`end_of_slice_segment_flag` and friends).
    /// A result of 1 leaves the state unrenormalized; decoding stops there.
    pub fn decode_terminate(&mut self) -> u8 {
        self.range -= 2;

        let scaled_range = self.range << 7;
        if self.value >= scaled_range {
            1
        } else {
            if scaled_range < (256 << 7) {
                self.range = scaled_range >> 6;
                self.value <<= 1;
                self.bits_needed += 1;

                if self.bits_needed == 0 {
                    self.bits_needed = -8;
                    self.value |= self.next_byte();
                }
            }
            0
        }
    }
}

impl CabacReader<ContextModel> for CabacDecoder<'_> {
    fn get(&mut self, cur_ctx: &mut ContextModel) -> bool {
        self.decode_bin(cur_ctx) != 0
    }

    fn get_bypass(&mut self) -> bool {
        self.decode_bypass() != 0
    }
}

#[cfg(test)]
mod tests {
    use super::CabacDecoder;
    use crate::context::ContextModel;

    const TEST_DATA: [u8; 32] = [
        0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77,
        0x88, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07,
        0x08, 0x09,
    ];

    #[test]
    fn init_primes_two_bytes() {
        let decoder = CabacDecoder::new(&[0xAB, 0xCD]);
        assert_eq!(decoder.state(), (510, 0xABCD, -8));
        assert_eq!(decoder.consumed(), 2);
    }

    #[test]
    fn init_tolerates_short_input() {
        let decoder = CabacDecoder::new(&[]);
        assert_eq!(decoder.state(), (510, 0, 0));
        assert_eq!(decoder.consumed(), 0);

        let decoder = CabacDecoder::new(&[0xAB]);
        assert_eq!(decoder.state(), (510, 0xAB00, 0));
        assert_eq!(decoder.consumed(), 1);
    }

    #[test]
    fn bypass_reads_zeros_past_end() {
        let mut decoder = CabacDecoder::new(&[0xAB, 0xCD]);
        let bits: String = (0..12)
            .map(|_| char::from(b'0' + decoder.decode_bypass()))
            .collect();
        assert_eq!(bits, "101011000111");
        assert_eq!(decoder.state(), (510, 38656, -4));
        assert_eq!(decoder.consumed(), 2);
    }

    #[test]
    fn bypass_short_sequence() {
        let mut decoder = CabacDecoder::new(&[0xAB, 0xCD]);
        let bits: Vec<u8> = (0..4).map(|_| decoder.decode_bypass()).collect();
        assert_eq!(bits, [1, 0, 1, 0]);
        assert_eq!(decoder.state(), (510, 50896, -4));
        assert_eq!(decoder.consumed(), 2);
    }

    #[test]
    fn context_bins_track_reference_trace() {
        let mut decoder = CabacDecoder::new(&TEST_DATA);
        let mut ctx = ContextModel::new(139, 27);
        assert_eq!((ctx.state(), ctx.mps()), (4, 1));

        let bits: String = (0..50)
            .map(|_| char::from(b'0' + decoder.decode_bin(&mut ctx)))
            .collect();
        assert_eq!(bits, "11111100100110101011111110110110100101001100111011");
        assert_eq!(decoder.state(), (291, 20960, -7));
        assert_eq!(decoder.consumed(), 8);
        assert_eq!((ctx.state(), ctx.mps()), (4, 1));
    }

    #[test]
    fn terminate_matches_reference_trace() {
        let mut decoder = CabacDecoder::new(&TEST_DATA);
        let mut bits = String::new();
        for _ in 0..20 {
            bits.push(char::from(b'0' + decoder.decode_terminate()));
            bits.push(char::from(b'0' + decoder.decode_bypass()));
        }
        assert_eq!(bits, "0000000100000100010000010100010001010000");
        assert_eq!(decoder.state(), (470, 17280, -4));
        assert_eq!(decoder.consumed(), 4);
    }
}
