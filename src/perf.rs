//! Non-inlined entry points for profiling the decoder hot paths with an
//! external sampler. Each wrapper decodes a fixed number of syntax
//! elements from a byte blob and folds the results so nothing is
//! optimized away.
use crate::context::{offsets, ContextTable};
use crate::engine::CabacDecoder;
use crate::residual;
use crate::traits::CabacReader;

#[inline(never)]
pub fn bypass_pattern(data: &[u8], count: usize) -> u32 {
    let mut decoder = CabacDecoder::new(data);
    let mut ones = 0;
    for _ in 0..count {
        ones += u32::from(decoder.decode_bypass());
    }
    ones
}

#[inline(never)]
pub fn bin_pattern(data: &[u8], count: usize) -> u32 {
    let mut decoder = CabacDecoder::new(data);
    let mut table = ContextTable::hevc(27);
    let sig = &mut table[offsets::SIG_COEFF_FLAG..offsets::SIG_COEFF_FLAG + 44];

    let mut ones = 0;
    for i in 0..count {
        ones += u32::from(decoder.decode_bin(&mut sig[i % 44]));
    }
    ones
}

#[inline(never)]
pub fn remainder_pattern(data: &[u8], rice_param: u8, count: usize) -> u64 {
    let mut decoder = CabacDecoder::new(data);
    let mut sum = 0;
    for _ in 0..count {
        sum += u64::from(decoder.get_coeff_abs_level_remaining(rice_param));
    }
    sum
}

#[inline(never)]
pub fn last_sig_pattern(data: &[u8], count: usize) -> u64 {
    let mut decoder = CabacDecoder::new(data);
    let mut table = ContextTable::hevc(27);
    let mut sum = 0;
    for i in 0..count {
        let (ctx_x, ctx_y) = table.split_at_mut(offsets::LAST_SIG_COEFF_Y_PREFIX);
        let (x, y) = residual::decode_last_sig_coeff_xy(
            &mut decoder,
            &mut ctx_x[offsets::LAST_SIG_COEFF_X_PREFIX..],
            &mut ctx_y[..18],
            5,
            0,
            (i % 3) as u8,
        );
        sum += u64::from(x) * 32 + u64::from(y);
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::{bin_pattern, bypass_pattern, last_sig_pattern, remainder_pattern};
    use rand::Rng;

    fn random_blob(len: usize) -> Vec<u8> {
        let mut rng = rand::thread_rng();
        (0..len).map(|_| rng.gen()).collect()
    }

    #[test]
    fn patterns_are_deterministic() {
        let blob = random_blob(4096);
        assert_eq!(bypass_pattern(&blob, 1000), bypass_pattern(&blob, 1000));
        assert_eq!(bin_pattern(&blob, 1000), bin_pattern(&blob, 1000));
        assert_eq!(
            remainder_pattern(&blob, 2, 100),
            remainder_pattern(&blob, 2, 100)
        );
        assert_eq!(last_sig_pattern(&blob, 20), last_sig_pattern(&blob, 20));
    }

    #[test]
    fn patterns_tolerate_short_input() {
        let blob = random_blob(4);
        assert!(bypass_pattern(&blob, 1000) <= 1000);
        assert!(bin_pattern(&blob, 1000) <= 1000);
        let _ = remainder_pattern(&blob, 0, 100);
        let _ = last_sig_pattern(&blob, 20);
    }
}
