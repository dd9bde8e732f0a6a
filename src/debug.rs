//! Scripted reader for verifying context selection.
//!
//! The residual decoders pick a context per bin from scan geometry,
//! component and neighbor state; passing the wrong one desynchronizes the
//! stream without any immediate failure. The reader here replays a fixed
//! bin sequence and records which context tag each bin was decoded with,
//! so tests can assert the exact selection order without arithmetic
//! decoding getting in the way.
use crate::traits::CabacReader;

/// Stand-in context carrying only an identifying tag. Give every context
/// in a block a distinct tag (its index, typically).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DebugContext {
    pub tag: u32,
}

impl DebugContext {
    /// One tagged context per index, `0..len`.
    pub fn block(len: usize) -> Vec<DebugContext> {
        (0..len).map(|tag| DebugContext { tag: tag as u32 }).collect()
    }
}

/// One decoded bin as seen by the [`DebugReader`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinRecord {
    /// context-coded bin, with the tag of the context that was used
    Ctx { tag: u32, bit: bool },
    /// bypass-coded bin
    Bypass { bit: bool },
}

/// Replays a scripted bin sequence and records every decode.
///
/// Past the end of the script it keeps returning 0-bins, mirroring how
/// the real engine treats a truncated byte span.
pub struct DebugReader {
    bits: Vec<bool>,
    pos: usize,
    trace: Vec<BinRecord>,
}

impl DebugReader {
    /// `script` uses '1' and '0' characters, one per bin.
    pub fn new(script: &str) -> Self {
        DebugReader {
            bits: script.chars().map(|c| c == '1').collect(),
            pos: 0,
            trace: Vec::new(),
        }
    }

    fn next_bit(&mut self) -> bool {
        let bit = self.bits.get(self.pos).copied().unwrap_or(false);
        self.pos += 1;
        bit
    }

    /// Everything decoded so far, in order.
    pub fn trace(&self) -> &[BinRecord] {
        &self.trace
    }

    /// Tags of the context-coded bins only, in decode order.
    pub fn ctx_tags(&self) -> Vec<u32> {
        self.trace
            .iter()
            .filter_map(|record| match record {
                BinRecord::Ctx { tag, .. } => Some(*tag),
                BinRecord::Bypass { .. } => None,
            })
            .collect()
    }
}

impl CabacReader<DebugContext> for DebugReader {
    fn get(&mut self, cur_ctx: &mut DebugContext) -> bool {
        let bit = self.next_bit();
        self.trace.push(BinRecord::Ctx {
            tag: cur_ctx.tag,
            bit,
        });
        bit
    }

    fn get_bypass(&mut self) -> bool {
        let bit = self.next_bit();
        self.trace.push(BinRecord::Bypass { bit });
        bit
    }
}

#[cfg(test)]
mod tests {
    use super::{BinRecord, DebugContext, DebugReader};
    use crate::residual::{
        decode_coded_sub_block_flag, decode_coeff_abs_level_greater1_flag,
        decode_coeff_abs_level_greater2_flag, decode_last_sig_coeff_prefix,
        decode_sig_coeff_flag,
    };

    #[test]
    fn last_sig_prefix_walks_contexts_in_order() {
        // 8x8 luma: ctxOffset 3, ctxShift 1, cMax 5
        let mut reader = DebugReader::new("11111");
        let mut ctx = DebugContext::block(18);
        let prefix = decode_last_sig_coeff_prefix(&mut reader, &mut ctx, 3, 0);
        assert_eq!(prefix, 5);
        assert_eq!(reader.ctx_tags(), [3, 3, 4, 4, 5]);
    }

    #[test]
    fn last_sig_prefix_chroma_offset() {
        // chroma: ctxOffset 15, ctxShift log2_size - 2
        let mut reader = DebugReader::new("110");
        let mut ctx = DebugContext::block(18);
        let prefix = decode_last_sig_coeff_prefix(&mut reader, &mut ctx, 3, 1);
        assert_eq!(prefix, 2);
        assert_eq!(reader.ctx_tags(), [15, 15, 16]);
    }

    #[test]
    fn csbf_context_from_neighbors_and_component() {
        for (c_idx, neighbors, expected_tag) in
            [(0, 0, 0), (0, 1, 1), (0, 2, 1), (1, 0, 2), (2, 3, 3)]
        {
            let mut reader = DebugReader::new("1");
            let mut ctx = DebugContext::block(4);
            let coded = decode_coded_sub_block_flag(&mut reader, &mut ctx, c_idx, neighbors);
            assert!(coded);
            assert_eq!(reader.ctx_tags(), [expected_tag]);
        }
    }

    #[test]
    fn sig_flag_context_tags() {
        // 4x4 luma position (2, 1) -> map entry 4
        let mut reader = DebugReader::new("1");
        let mut ctx = DebugContext::block(44);
        let _ = decode_sig_coeff_flag(&mut reader, &mut ctx, 2, 1, 2, 0, 0, 0);
        assert_eq!(reader.ctx_tags(), [4]);

        // DC of 8x8 luma -> 0
        let mut reader = DebugReader::new("0");
        let mut ctx = DebugContext::block(44);
        let _ = decode_sig_coeff_flag(&mut reader, &mut ctx, 0, 0, 3, 0, 0, 0);
        assert_eq!(reader.ctx_tags(), [0]);

        // 4x4 chroma position (3, 3) -> 27 + map entry 8
        let mut reader = DebugReader::new("1");
        let mut ctx = DebugContext::block(44);
        let _ = decode_sig_coeff_flag(&mut reader, &mut ctx, 3, 3, 2, 1, 0, 0);
        assert_eq!(reader.ctx_tags(), [35]);
    }

    #[test]
    fn greater1_clamps_counter_at_three() {
        let mut reader = DebugReader::new("11");
        let mut ctx = DebugContext::block(24);
        let _ = decode_coeff_abs_level_greater1_flag(&mut reader, &mut ctx, 0, 3, 5);
        let _ = decode_coeff_abs_level_greater1_flag(&mut reader, &mut ctx, 1, 1, 0);
        assert_eq!(reader.ctx_tags(), [15, 20]);
    }

    #[test]
    fn greater2_context_tags() {
        let mut reader = DebugReader::new("11");
        let mut ctx = DebugContext::block(6);
        let _ = decode_coeff_abs_level_greater2_flag(&mut reader, &mut ctx, 0, 3);
        let _ = decode_coeff_abs_level_greater2_flag(&mut reader, &mut ctx, 1, 1);
        assert_eq!(reader.ctx_tags(), [3, 5]);
    }

    #[test]
    fn trace_records_bin_kinds() {
        let mut reader = DebugReader::new("10");
        let mut ctx = DebugContext { tag: 7 };
        use crate::traits::CabacReader;
        let first = reader.get(&mut ctx);
        let second = reader.get_bypass();
        assert!(first);
        assert!(!second);
        assert_eq!(
            reader.trace(),
            [
                BinRecord::Ctx { tag: 7, bit: true },
                BinRecord::Bypass { bit: false }
            ]
        );
        // exhausted scripts read as zeros
        assert!(!reader.get_bypass());
    }
}
