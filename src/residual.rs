//! Residual (transform coefficient) syntax element decoders.
//!
//! Every function takes the context sub-slice for its syntax element, not
//! the whole store, and is generic over the reader so that the scripted
//! debug reader can verify context selection.
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
use crate::traits::CabacReader;

/// `sig_coeff_flag` context per position of a 4x4 TU, indexed by
/// `(y << 2) + x` (H.265 Table 9-41).
pub const SIG_CTX_MAP_4X4: [u8; 16] = [0, 1, 4, 5, 2, 3, 4, 5, 6, 6, 8, 8, 7, 7, 8, 8];

/// Decodes the `last_sig_coeff_{x,y}_prefix` truncated-unary value,
/// in `0..=2 * log2_size - 1`.
pub fn decode_last_sig_coeff_prefix<C, R: CabacReader<C>>(
    reader: &mut R,
    ctx: &mut [C],
    log2_size: u8,
    c_idx: u8,
) -> u32 {
    let c_max = (u32::from(log2_size) << 1) - 1;

    let (ctx_offset, ctx_shift) = if c_idx == 0 {
        (
            3 * (usize::from(log2_size) - 2) + ((usize::from(log2_size) - 1) >> 2),
            u32::from((log2_size + 1) >> 2),
        )
    } else {
        (15, u32::from(log2_size) - 2)
    };

    let mut prefix = c_max;
    for bin_idx in 0..c_max {
        if !reader.get(&mut ctx[ctx_offset + (bin_idx >> ctx_shift) as usize]) {
            prefix = bin_idx;
            break;
        }
    }
    prefix
}

/// Decodes one last-significant-coefficient coordinate: the context-coded
/// prefix, then the bypass-coded suffix once the prefix exceeds 3.
pub fn decode_last_sig_coeff<C, R: CabacReader<C>>(
    reader: &mut R,
    ctx: &mut [C],
    log2_size: u8,
    c_idx: u8,
) -> u32 {
    let prefix = decode_last_sig_coeff_prefix(reader, ctx, log2_size, c_idx);
    if prefix > 3 {
        let n_bits = (prefix >> 1) - 1;
        ((2 + (prefix & 1)) << n_bits) + reader.get_bypass_bits(n_bits as u8)
    } else {
        prefix
    }
}

/// Decodes the last-significant-coefficient position. `x` is decoded
/// fully, then `y`; under vertical scan (`scan_idx == 2`) the coordinates
/// come swapped out of the bitstream.
pub fn decode_last_sig_coeff_xy<C, R: CabacReader<C>>(
    reader: &mut R,
    ctx_x: &mut [C],
    ctx_y: &mut [C],
    log2_size: u8,
    c_idx: u8,
    scan_idx: u8,
) -> (u32, u32) {
    let last_x = decode_last_sig_coeff(reader, ctx_x, log2_size, c_idx);
    let last_y = decode_last_sig_coeff(reader, ctx_y, log2_size, c_idx);

    if scan_idx == 2 {
        (last_y, last_x)
    } else {
        (last_x, last_y)
    }
}

/// Decodes `coded_sub_block_flag`. `csbf_neighbors` packs the right
/// neighbor's flag in bit 0 and the below neighbor's in bit 1.
pub fn decode_coded_sub_block_flag<C, R: CabacReader<C>>(
    reader: &mut R,
    ctx: &mut [C],
    c_idx: u8,
    csbf_neighbors: u8,
) -> bool {
    let csbf_ctx = usize::from(csbf_neighbors != 0);
    let ctx_idx = csbf_ctx + if c_idx != 0 { 2 } else { 0 };
    reader.get(&mut ctx[ctx_idx])
}

/// Context index of `sig_coeff_flag` within its context block
/// (H.265 9.3.4.2.5).
///
/// `prev_csbf` packs the neighbor `coded_sub_block_flag`s the same way as
/// [`decode_coded_sub_block_flag`]: bit 0 = right, bit 1 = below.
pub fn sig_coeff_flag_ctx(
    x_c: u8,
    y_c: u8,
    log2_size: u8,
    c_idx: u8,
    scan_idx: u8,
    prev_csbf: u8,
) -> usize {
    let sub_width = 1u8 << (log2_size - 2);

    let sig_ctx = if sub_width == 1 {
        usize::from(SIG_CTX_MAP_4X4[usize::from((y_c << 2) + x_c)])
    } else if x_c == 0 && y_c == 0 {
        // DC of a larger TU
        0
    } else {
        let x_s = x_c >> 2;
        let y_s = y_c >> 2;
        let x_p = x_c & 3;
        let y_p = y_c & 3;

        let mut ctx = match prev_csbf {
            0 => {
                if x_p + y_p >= 3 {
                    0
                } else if x_p + y_p > 0 {
                    1
                } else {
                    2
                }
            }
            1 => {
                // right neighbor coded
                if y_p == 0 {
                    2
                } else if y_p == 1 {
                    1
                } else {
                    0
                }
            }
            2 => {
                // below neighbor coded
                if x_p == 0 {
                    2
                } else if x_p == 1 {
                    1
                } else {
                    0
                }
            }
            _ => 2,
        };

        if c_idx == 0 {
            if x_s + y_s > 0 {
                ctx += 3;
            }
            if sub_width == 2 {
                ctx += if scan_idx == 0 { 9 } else { 15 };
            } else {
                ctx += 21;
            }
        } else if sub_width == 2 {
            ctx += 9;
        } else {
            ctx += 12;
        }

        ctx
    };

    if c_idx == 0 {
        sig_ctx
    } else {
        27 + sig_ctx
    }
}

/// Decodes one `sig_coeff_flag` at TU position `(x_c, y_c)`.
pub fn decode_sig_coeff_flag<C, R: CabacReader<C>>(
    reader: &mut R,
    ctx: &mut [C],
    x_c: u8,
    y_c: u8,
    log2_size: u8,
    c_idx: u8,
    scan_idx: u8,
    prev_csbf: u8,
) -> bool {
    let ctx_idx = sig_coeff_flag_ctx(x_c, y_c, log2_size, c_idx, scan_idx, prev_csbf);
    reader.get(&mut ctx[ctx_idx])
}

/// Decodes `coeff_abs_level_greater1_flag`. `greater1_ctx` is the
/// per-sub-block counter maintained by the caller; it is clamped to 3
/// here, not at the call site.
pub fn decode_coeff_abs_level_greater1_flag<C, R: CabacReader<C>>(
    reader: &mut R,
    ctx: &mut [C],
    c_idx: u8,
    ctx_set: u8,
    greater1_ctx: u8,
) -> bool {
    let ctx_idx = usize::from(ctx_set) * 4
        + usize::from(greater1_ctx.min(3))
        + if c_idx > 0 { 16 } else { 0 };
    reader.get(&mut ctx[ctx_idx])
}

/// Decodes `coeff_abs_level_greater2_flag`.
pub fn decode_coeff_abs_level_greater2_flag<C, R: CabacReader<C>>(
    reader: &mut R,
    ctx: &mut [C],
    c_idx: u8,
    ctx_set: u8,
) -> bool {
    let ctx_idx = usize::from(ctx_set) + if c_idx > 0 { 4 } else { 0 };
    reader.get(&mut ctx[ctx_idx])
}

/// Context set for the greater1/greater2 flags of a sub-block
/// (H.265 9.3.4.2.6). `prev_gt1` says whether the previously processed
/// sub-block had any `coeff_abs_level_greater1_flag` equal to 1.
pub fn calc_ctx_set(sb_idx: u32, c_idx: u8, prev_gt1: bool) -> u8 {
    let base = if sb_idx == 0 || c_idx != 0 { 0 } else { 2 };
    base + u8::from(prev_gt1)
}

/// Adaptive Rice parameter update after decoding one coefficient of
/// absolute level `abs_level`, saturating at 4.
pub fn next_rice_param(rice_param: u8, abs_level: u32) -> u8 {
    if abs_level > (3 << rice_param) {
        (rice_param + 1).min(4)
    } else {
        rice_param
    }
}
