//! Context models and their slice-QP dependent initialization.

use std::ops::{Deref, DerefMut};

/// One adaptive probability estimate: a 6 bit state index and the current
/// most probable symbol. Mutated only while decoding a context-coded bin.
#[repr(C)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ContextModel {
    pub(crate) state: u8,
    pub(crate) mps: u8,
}

impl ContextModel {
    /// Derives the initial `(state, mps)` pair from the `initValue` byte
    /// of H.265 Table 9-5ff and the slice QP (9.3.2.2).
    pub fn new(init_value: u8, slice_qp: i32) -> Self {
        let slope = i32::from(init_value >> 4) * 5 - 45;
        let offset = (i32::from(init_value & 15) << 3) - 16;

        let pre_state = (((slope * (slice_qp - 16)) >> 4) + offset).clamp(1, 126);

        if pre_state >= 64 {
            ContextModel {
                state: (pre_state - 64) as u8,
                mps: 1,
            }
        } else {
            ContextModel {
                state: (63 - pre_state) as u8,
                mps: 0,
            }
        }
    }

    /// Current probability state index, 0..=63.
    pub fn state(&self) -> u8 {
        self.state
    }

    /// Current most probable symbol, 0 or 1.
    pub fn mps(&self) -> u8 {
        self.mps
    }
}

/// Flat, fixed-order store of context models. Syntax decoders receive a
/// sub-slice starting at the offset of their context block, never the
/// whole table.
pub struct ContextTable {
    models: Vec<ContextModel>,
}

impl ContextTable {
    /// Initializes one model per `initValue` byte, in order.
    pub fn new(init_values: &[u8], slice_qp: i32) -> Self {
        ContextTable {
            models: init_values
                .iter()
                .map(|&init_value| ContextModel::new(init_value, slice_qp))
                .collect(),
        }
    }

    /// The full HEVC store in Table 9-4 order.
    pub fn hevc(slice_qp: i32) -> Self {
        Self::new(&INIT_VALUES, slice_qp)
    }
}

impl Deref for ContextTable {
    type Target = [ContextModel];

    fn deref(&self) -> &[ContextModel] {
        &self.models
    }
}

impl DerefMut for ContextTable {
    fn deref_mut(&mut self) -> &mut [ContextModel] {
        &mut self.models
    }
}

/// Offsets of each syntax element's context block within the store,
/// following the H.265 Table 9-4 assignment. The values are opaque; only
/// their order and the block sizes matter.
pub mod offsets {
    pub const SPLIT_CU_FLAG: usize = 0;
    pub const CU_TRANSQUANT_BYPASS_FLAG: usize = 3;
    pub const CU_SKIP_FLAG: usize = 4;
    pub const PALETTE_MODE_FLAG: usize = 7;
    pub const PRED_MODE_FLAG: usize = 8;
    pub const PART_MODE: usize = 9;
    pub const PREV_INTRA_LUMA_PRED_FLAG: usize = 13;
    pub const INTRA_CHROMA_PRED_MODE: usize = 14;
    pub const INTER_PRED_IDC: usize = 15;
    pub const MERGE_FLAG: usize = 20;
    pub const MERGE_IDX: usize = 21;
    pub const MVP_LX_FLAG: usize = 22;
    pub const REF_IDX: usize = 23;
    pub const ABS_MVD_GREATER0_FLAG: usize = 25;
    pub const ABS_MVD_GREATER1_FLAG: usize = 27;
    pub const SPLIT_TRANSFORM_FLAG: usize = 28;
    pub const CBF_LUMA: usize = 31;
    pub const CBF_CBCR: usize = 33;
    pub const TRANSFORM_SKIP_FLAG: usize = 38;
    pub const LAST_SIG_COEFF_X_PREFIX: usize = 40;
    pub const LAST_SIG_COEFF_Y_PREFIX: usize = 58;
    pub const CODED_SUB_BLOCK_FLAG: usize = 76;
    pub const SIG_COEFF_FLAG: usize = 80;
    pub const COEFF_ABS_LEVEL_GREATER1_FLAG: usize = 124;
    pub const COEFF_ABS_LEVEL_GREATER2_FLAG: usize = 148;
    pub const SAO_MERGE_FLAG: usize = 154;
    pub const SAO_TYPE_IDX: usize = 155;
    pub const CU_QP_DELTA_ABS: usize = 156;
    pub const CU_CHROMA_QP_OFFSET_FLAG: usize = 158;
    pub const CU_CHROMA_QP_OFFSET_IDX: usize = 159;
    pub const LOG2_RES_SCALE_ABS_PLUS1: usize = 160;
    pub const RES_SCALE_SIGN_FLAG: usize = 168;

    pub const NUM_CONTEXTS: usize = 170;
}

/// `initValue` bytes for the whole store, one per context, in the same
/// order as [`offsets`].
pub static INIT_VALUES: [u8; offsets::NUM_CONTEXTS] = [
    // SPLIT_CU_FLAG
    139, 141, 157,
    // CU_TRANSQUANT_BYPASS_FLAG
    154,
    // CU_SKIP_FLAG
    197, 185, 201,
    // PALETTE_MODE_FLAG
    154,
    // PRED_MODE_FLAG
    149,
    // PART_MODE
    154, 139, 154, 154,
    // PREV_INTRA_LUMA_PRED_FLAG
    184,
    // INTRA_CHROMA_PRED_MODE
    63,
    // INTER_PRED_IDC
    95, 79, 63, 31, 31,
    // MERGE_FLAG
    110,
    // MERGE_IDX
    122,
    // MVP_LX_FLAG
    168,
    // REF_IDX
    153, 153,
    // ABS_MVD_GREATER0_FLAG
    140, 198,
    // ABS_MVD_GREATER1_FLAG
    140,
    // SPLIT_TRANSFORM_FLAG
    153, 138, 138,
    // CBF_LUMA
    111, 141,
    // CBF_CBCR
    94, 138, 182, 154, 154,
    // TRANSFORM_SKIP_FLAG
    139, 139,
    // LAST_SIG_COEFF_X_PREFIX
    110, 110, 124, 125, 140, 153, 125, 127, 140, 109, 111, 143, 127, 111, 79, 108, 123, 63,
    // LAST_SIG_COEFF_Y_PREFIX
    110, 110, 124, 125, 140, 153, 125, 127, 140, 109, 111, 143, 127, 111, 79, 108, 123, 63,
    // CODED_SUB_BLOCK_FLAG
    91, 171, 134, 141,
    // SIG_COEFF_FLAG
    111, 111, 125, 110, 110, 94, 124, 108, 124, 107, 125, 141, 179, 153, 125, 107, 125, 141, 179,
    153, 125, 107, 125, 141, 179, 153, 125, 140, 139, 182, 182, 152, 136, 152, 136, 153, 136, 139,
    111, 136, 139, 111, 155, 154,
    // COEFF_ABS_LEVEL_GREATER1_FLAG
    140, 92, 137, 138, 140, 152, 138, 139, 153, 74, 149, 92, 139, 107, 122, 152, 140, 179, 166,
    182, 140, 227, 122, 197,
    // COEFF_ABS_LEVEL_GREATER2_FLAG
    138, 153, 136, 167, 152, 152,
    // SAO_MERGE_FLAG
    153,
    // SAO_TYPE_IDX
    200,
    // CU_QP_DELTA_ABS
    154, 154,
    // CU_CHROMA_QP_OFFSET_FLAG
    154,
    // CU_CHROMA_QP_OFFSET_IDX
    154,
    // LOG2_RES_SCALE_ABS_PLUS1
    154, 154, 154, 154, 154, 154, 154, 154,
    // RES_SCALE_SIGN_FLAG
    154, 154,
];

#[cfg(test)]
mod tests {
    use super::{offsets, ContextModel, ContextTable, INIT_VALUES};

    #[test]
    fn init_positive_pre_state() {
        // initValue 139, qp 27: slope -5, offset 72, preState 68
        let ctx = ContextModel::new(139, 27);
        assert_eq!((ctx.state(), ctx.mps()), (4, 1));
    }

    #[test]
    fn init_clamps_low_pre_state() {
        // initValue 0, qp 16: preState -16 clamps to 1
        let ctx = ContextModel::new(0, 16);
        assert_eq!((ctx.state(), ctx.mps()), (62, 0));
    }

    #[test]
    fn init_spot_checks() {
        for (init_value, slice_qp, expected) in [
            (154, 26, (0, 1)),
            (255, 51, (62, 1)),
            (63, 0, (62, 1)),
            (110, 40, (9, 1)),
        ] {
            let ctx = ContextModel::new(init_value, slice_qp);
            assert_eq!((ctx.state(), ctx.mps()), expected, "initValue {init_value} qp {slice_qp}");
        }
    }

    #[test]
    fn init_stays_in_range_for_all_inputs() {
        for init_value in 0..=255u8 {
            for slice_qp in 0..=51 {
                let ctx = ContextModel::new(init_value, slice_qp);
                assert!(ctx.state() <= 63);
                assert!(ctx.mps() <= 1);
            }
        }
    }

    #[test]
    fn table_builds_every_context() {
        let table = ContextTable::hevc(27);
        assert_eq!(table.len(), offsets::NUM_CONTEXTS);

        let by_hand = ContextModel::new(INIT_VALUES[offsets::SIG_COEFF_FLAG], 27);
        assert_eq!(table[offsets::SIG_COEFF_FLAG], by_hand);
    }

    #[test]
    fn residual_blocks_are_contiguous() {
        assert_eq!(
            offsets::LAST_SIG_COEFF_Y_PREFIX - offsets::LAST_SIG_COEFF_X_PREFIX,
            18
        );
        assert_eq!(offsets::SIG_COEFF_FLAG - offsets::CODED_SUB_BLOCK_FLAG, 4);
        assert_eq!(
            offsets::COEFF_ABS_LEVEL_GREATER1_FLAG - offsets::SIG_COEFF_FLAG,
            44
        );
        assert_eq!(
            offsets::COEFF_ABS_LEVEL_GREATER2_FLAG - offsets::COEFF_ABS_LEVEL_GREATER1_FLAG,
            24
        );
        assert_eq!(
            offsets::SAO_MERGE_FLAG - offsets::COEFF_ABS_LEVEL_GREATER2_FLAG,
            6
        );
    }
}
