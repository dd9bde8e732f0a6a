use hevc_cabac::perf::{bin_pattern, bypass_pattern, last_sig_pattern, remainder_pattern};

/// Generates the next pseudo-random number.
/// Definitely non-cryptographic, just used for generating stable profiling
/// input.
const fn next_rand_u64(state: u64) -> u64 {
    // Constants for the LCG
    const A: u64 = 6364136223846793005;
    const C: u64 = 1442695040888963407;

    state.wrapping_mul(A).wrapping_add(C).rotate_left(31)
}

const RNG_SEED: u64 = 0x123456789abcdef0;

const fn gen_blob() -> [u8; 16384] {
    let mut blob = [0u8; 16384];
    let mut rng = RNG_SEED;

    let mut i = 0;
    while i < blob.len() {
        rng = next_rand_u64(rng);
        blob[i] = (rng >> 24) as u8;
        i += 1;
    }

    blob
}

static BLOB: [u8; 16384] = gen_blob();

fn main() {
    let baseline = (
        bypass_pattern(&BLOB, 100_000),
        bin_pattern(&BLOB, 100_000),
        remainder_pattern(&BLOB, 1, 20_000),
        last_sig_pattern(&BLOB, 5_000),
    );

    for _ in 0..1000 {
        let run = (
            bypass_pattern(&BLOB, 100_000),
            bin_pattern(&BLOB, 100_000),
            remainder_pattern(&BLOB, 1, 20_000),
            last_sig_pattern(&BLOB, 5_000),
        );
        assert!(run == baseline);
    }
}
