//! C-ABI surface for differential testing against libde265.
//!
//! The comparison harness links against these symbols and steps both
//! decoders through the same operation sequence, asserting the state
//! triple after every call. Names, argument orders and struct layouts
//! are load-bearing; do not reorder.
//!
//! Every function rebuilds a safe [`CabacDecoder`] over the unread tail
//! of the bitstream, runs the library implementation, and stores the
//! state back. Since the stream is consumed strictly left to right, the
//! rebuilt view is indistinguishable from a decoder that ran from the
//! start.
use std::ffi::c_int;
use std::ptr;
use std::slice;

use crate::context::ContextModel;
use crate::engine::CabacDecoder;
use crate::residual;
use crate::traits::CabacReader;

/// Arithmetic decoder state as the harness sees it.
#[repr(C)]
pub struct CabacState {
    pub range: u32,
    pub value: u32,
    pub bits_needed: c_int,
    pub bitstream_curr: *const u8,
    pub bitstream_end: *const u8,
}

/// Result block of [`decode_last_significant_coeff_xy`].
#[repr(C)]
pub struct LastSigResult {
    pub x: c_int,
    pub y: c_int,
    pub cabac_range: u32,
    pub cabac_value: u32,
    pub cabac_bits_needed: c_int,
}

unsafe fn remaining<'a>(state: &CabacState) -> &'a [u8] {
    if state.bitstream_curr.is_null() || state.bitstream_end.is_null() {
        return &[];
    }
    let len = state.bitstream_end.offset_from(state.bitstream_curr);
    if len <= 0 {
        &[]
    } else {
        slice::from_raw_parts(state.bitstream_curr, len as usize)
    }
}

unsafe fn enter<'a>(state: &CabacState) -> CabacDecoder<'a> {
    CabacDecoder::resume(
        remaining(state),
        state.range,
        state.value,
        state.bits_needed,
    )
}

fn leave(state: &mut CabacState, decoder: &CabacDecoder<'_>) {
    let (range, value, bits_needed) = decoder.state();
    state.range = range;
    state.value = value;
    state.bits_needed = bits_needed;
    if !state.bitstream_curr.is_null() {
        state.bitstream_curr = unsafe { state.bitstream_curr.add(decoder.consumed()) };
    }
}

/// Initializes `state` over `data[..length]`.
///
/// # Safety
/// `state` must be valid for writes and `data` valid for reads of
/// `length` bytes (or null with `length <= 0`).
#[no_mangle]
pub unsafe extern "C" fn cabac_init(state: *mut CabacState, data: *const u8, length: c_int) {
    let state = &mut *state;

    let len = if data.is_null() { 0 } else { length.max(0) as usize };
    let bytes = if len == 0 {
        &[]
    } else {
        slice::from_raw_parts(data, len)
    };

    let decoder = CabacDecoder::new(bytes);
    let (range, value, bits_needed) = decoder.state();
    state.range = range;
    state.value = value;
    state.bits_needed = bits_needed;
    if data.is_null() {
        state.bitstream_curr = ptr::null();
        state.bitstream_end = ptr::null();
    } else {
        state.bitstream_curr = data.add(decoder.consumed());
        state.bitstream_end = data.add(len);
    }
}

/// Decodes one bypass bin.
///
/// # Safety
/// `state` must point to a state set up by [`cabac_init`].
#[no_mangle]
pub unsafe extern "C" fn cabac_decode_bypass(state: *mut CabacState) -> c_int {
    let state = &mut *state;
    let mut decoder = enter(state);
    let bit = decoder.decode_bypass();
    leave(state, &decoder);
    c_int::from(bit)
}

/// Decodes `num_bits` bypass bins, packed MSB first.
///
/// # Safety
/// `state` must point to a state set up by [`cabac_init`].
#[no_mangle]
pub unsafe extern "C" fn cabac_decode_bypass_bits(state: *mut CabacState, num_bits: c_int) -> u32 {
    let state = &mut *state;
    let mut decoder = enter(state);
    let value = decoder.get_bypass_bits(num_bits.clamp(0, 255) as u8);
    leave(state, &decoder);
    value
}

/// Decodes `coeff_abs_level_remaining` with the given Rice parameter.
///
/// # Safety
/// `state` must point to a state set up by [`cabac_init`].
#[no_mangle]
pub unsafe extern "C" fn cabac_decode_coeff_abs_level_remaining(
    state: *mut CabacState,
    rice_param: c_int,
) -> c_int {
    let state = &mut *state;
    let mut decoder = enter(state);
    let value = decoder.get_coeff_abs_level_remaining(rice_param.clamp(0, 31) as u8);
    leave(state, &decoder);
    value as c_int
}

/// Decodes one context-coded bin, updating `ctx`.
///
/// # Safety
/// `state` as for [`cabac_init`]; `ctx` must be a valid context model.
#[no_mangle]
pub unsafe extern "C" fn cabac_decode_bin(state: *mut CabacState, ctx: *mut ContextModel) -> c_int {
    let state = &mut *state;
    let mut decoder = enter(state);
    let bit = decoder.decode_bin(&mut *ctx);
    leave(state, &decoder);
    c_int::from(bit)
}

/// Copies the state triple out for comparison.
///
/// # Safety
/// All pointers must be valid.
#[no_mangle]
pub unsafe extern "C" fn cabac_get_state(
    state: *const CabacState,
    range: *mut u32,
    value: *mut u32,
    bits_needed: *mut c_int,
) {
    let state = &*state;
    *range = state.range;
    *value = state.value;
    *bits_needed = state.bits_needed;
}

/// Initializes one context model from `init_value` and the slice QP.
///
/// # Safety
/// `ctx` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn context_init(ctx: *mut ContextModel, init_value: u8, slice_qp: c_int) {
    *ctx = ContextModel::new(init_value, slice_qp);
}

/// Copies a context model's `(state, mps)` out for comparison.
///
/// # Safety
/// All pointers must be valid.
#[no_mangle]
pub unsafe extern "C" fn context_get_state(
    ctx: *const ContextModel,
    state: *mut u8,
    mps: *mut u8,
) {
    let ctx = &*ctx;
    *state = ctx.state();
    *mps = ctx.mps();
}

/// Decodes the last-significant-coefficient position (x fully, then y;
/// swapped under vertical scan) and reports it with the state triple.
///
/// # Safety
/// `ctx_x` and `ctx_y` must each point to the 18 prefix contexts of
/// their coordinate; `state` and `result` must be valid.
#[no_mangle]
pub unsafe extern "C" fn decode_last_significant_coeff_xy(
    state: *mut CabacState,
    ctx_x: *mut ContextModel,
    ctx_y: *mut ContextModel,
    log2_size: c_int,
    c_idx: c_int,
    scan_idx: c_int,
    result: *mut LastSigResult,
) {
    let state = &mut *state;
    let ctx_x = slice::from_raw_parts_mut(ctx_x, 18);
    let ctx_y = slice::from_raw_parts_mut(ctx_y, 18);

    let mut decoder = enter(state);
    let (x, y) = residual::decode_last_sig_coeff_xy(
        &mut decoder,
        ctx_x,
        ctx_y,
        log2_size as u8,
        c_idx as u8,
        scan_idx as u8,
    );
    leave(state, &decoder);

    let result = &mut *result;
    result.x = x as c_int;
    result.y = y as c_int;
    result.cabac_range = state.range;
    result.cabac_value = state.value;
    result.cabac_bits_needed = state.bits_needed;
}

/// Decodes `coded_sub_block_flag`; `csbf_neighbors` packs right in bit 0
/// and below in bit 1.
///
/// # Safety
/// `contexts` must point to the 4 coded-sub-block-flag contexts.
#[no_mangle]
pub unsafe extern "C" fn decode_coded_sub_block_flag(
    state: *mut CabacState,
    contexts: *mut ContextModel,
    c_idx: c_int,
    csbf_neighbors: c_int,
) -> c_int {
    let state = &mut *state;
    let contexts = slice::from_raw_parts_mut(contexts, 4);
    let mut decoder = enter(state);
    let coded = residual::decode_coded_sub_block_flag(
        &mut decoder,
        contexts,
        c_idx as u8,
        csbf_neighbors as u8,
    );
    leave(state, &decoder);
    c_int::from(coded)
}

/// Decodes `sig_coeff_flag` at `(x_c, y_c)` with full context derivation.
///
/// # Safety
/// `contexts` must point to the 44 significance contexts (27 luma
/// followed by 17 chroma).
#[no_mangle]
pub unsafe extern "C" fn decode_sig_coeff_flag(
    state: *mut CabacState,
    contexts: *mut ContextModel,
    x_c: c_int,
    y_c: c_int,
    log2_size: c_int,
    c_idx: c_int,
    scan_idx: c_int,
    prev_csbf: c_int,
) -> c_int {
    let state = &mut *state;
    let contexts = slice::from_raw_parts_mut(contexts, 44);
    let mut decoder = enter(state);
    let significant = residual::decode_sig_coeff_flag(
        &mut decoder,
        contexts,
        x_c as u8,
        y_c as u8,
        log2_size as u8,
        c_idx as u8,
        scan_idx as u8,
        prev_csbf as u8,
    );
    leave(state, &decoder);
    c_int::from(significant)
}

/// Decodes `coeff_abs_level_greater1_flag`.
///
/// # Safety
/// `contexts` must point to the 24 greater1 contexts (16 luma + 8 chroma).
#[no_mangle]
pub unsafe extern "C" fn decode_coeff_abs_level_greater1_flag(
    state: *mut CabacState,
    contexts: *mut ContextModel,
    c_idx: c_int,
    ctx_set: c_int,
    greater1_ctx: c_int,
) -> c_int {
    let state = &mut *state;
    let contexts = slice::from_raw_parts_mut(contexts, 24);
    let mut decoder = enter(state);
    let greater1 = residual::decode_coeff_abs_level_greater1_flag(
        &mut decoder,
        contexts,
        c_idx as u8,
        ctx_set as u8,
        greater1_ctx.clamp(0, 255) as u8,
    );
    leave(state, &decoder);
    c_int::from(greater1)
}

/// Decodes `coeff_abs_level_greater2_flag`.
///
/// # Safety
/// `contexts` must point to the 6 greater2 contexts (4 luma + 2 chroma).
#[no_mangle]
pub unsafe extern "C" fn decode_coeff_abs_level_greater2_flag(
    state: *mut CabacState,
    contexts: *mut ContextModel,
    c_idx: c_int,
    ctx_set: c_int,
) -> c_int {
    let state = &mut *state;
    let contexts = slice::from_raw_parts_mut(contexts, 6);
    let mut decoder = enter(state);
    let greater2 = residual::decode_coeff_abs_level_greater2_flag(
        &mut decoder,
        contexts,
        c_idx as u8,
        ctx_set as u8,
    );
    leave(state, &decoder);
    c_int::from(greater2)
}

/// Context set for the greater1/greater2 flags of a sub-block.
#[no_mangle]
pub extern "C" fn calc_ctx_set(sb_idx: c_int, c_idx: c_int, prev_gt1: c_int) -> c_int {
    c_int::from(residual::calc_ctx_set(
        sb_idx.max(0) as u32,
        c_idx as u8,
        prev_gt1 != 0,
    ))
}
