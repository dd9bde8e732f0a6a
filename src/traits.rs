//! Reader seam between the arithmetic engine and the syntax layers.
//!
//! The standard HEVC binarizations are provided methods so that every
//! reader implementation (the real engine, the scripted debug reader)
//! consumes bins in exactly the same order.

/// A context-adaptive binary arithmetic decoder.
pub trait CabacReader<Context> {
    /// read one bin using the given context for probability
    fn get(&mut self, cur_ctx: &mut Context) -> bool;

    /// read one bin from the bypass bin (fixed 50/50 probability)
    fn get_bypass(&mut self) -> bool;

    /// read a fixed-length bypass-coded integer, MSB first
    fn get_bypass_bits(&mut self, num_bits: u8) -> u32 {
        let mut value = 0;
        for _ in 0..num_bits {
            value = (value << 1) | u32::from(self.get_bypass());
        }
        value
    }

    /// read a unary prefix of bypass bins: count 1-bins until a 0-bin or
    /// until `cap` is reached. The bin is decoded before the cap is
    /// tested, so reaching the cap still consumes one extra bin; the
    /// reference decoder does the same and the bit position depends on it.
    fn get_unary_prefix(&mut self, cap: u32) -> u32 {
        let mut value = 0;
        while self.get_bypass() && value < cap {
            value += 1;
        }
        value
    }

    /// read `coeff_abs_level_remaining`: a truncated-rice prefix
    /// concatenated with an Exp-Golomb suffix once the prefix exceeds 3
    fn get_coeff_abs_level_remaining(&mut self, rice_param: u8) -> u32 {
        // prefix cap of 32 matches the reference decoder, one above the
        // normative limit of 31
        let prefix = self.get_unary_prefix(32);

        if prefix <= 3 {
            // truncated-rice part only
            (prefix << rice_param) + self.get_bypass_bits(rice_param)
        } else {
            // Exp-Golomb part: one more suffix bit per extra prefix bin
            let k = prefix - 3;
            let suffix = self.get_bypass_bits((k + u32::from(rice_param)) as u8);
            (((1u32 << k) + 2) << rice_param) + suffix
        }
    }
}
