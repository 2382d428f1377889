//! VM scratch layout shared by every emitted program.
//!
//! The Storage Area slots (`SAL_*`) and the runtime cells at the start
//! of the CVT (`CVTL_*`) are addressed by these constants from the
//! `fpgm`, `prep`, and glyph programs alike; keeping the whole mapping
//! here is what makes the three emitters agree.

/// Anchor twilight point of the current glyph (0xFFFF while unset).
pub const SAL_ANCHOR: i32 = 0;
/// Number of segments of the current glyph.
pub const SAL_NUM_SEGMENTS: i32 = 1;
/// Per-style scale correction, 16.16.
pub const SAL_SCALE: i32 = 2;
/// The constant 0x10000, needed to divide after a 16.16 `MUL`.
pub const SAL_0X10000: i32 = 3;
/// Function number applied by the generic loop.
pub const SAL_FUNC: i32 = 4;
/// Loop limit.
pub const SAL_LIMIT: i32 = 5;
/// Loop counter / general scratch index.
pub const SAL_I: i32 = 6;
/// Current original twilight point while building segments.
pub const SAL_J: i32 = 7;
/// Current hinted twilight point while building segments.
pub const SAL_K: i32 = 8;
pub const SAL_TEMP1: i32 = 9;
pub const SAL_TEMP2: i32 = 10;
pub const SAL_TEMP3: i32 = 11;
/// Running extrema while scanning a segment's points.
pub const SAL_POINT_MIN: i32 = 12;
pub const SAL_POINT_MAX: i32 = 13;
/// Non-zero when stems must keep their natural width.
pub const SAL_IS_EXTRA_LIGHT: i32 = 14;
/// First slot of the per-segment (first, last) pair array.
pub const SAL_SEGMENT_OFFSET: i32 = 15;

/// Storage slots needed by a glyph with `num_segments` segments.
pub fn storage_size(num_segments: usize) -> usize {
    SAL_SEGMENT_OFFSET as usize + 2 * num_segments
}

/// Runtime CVT cells, written by `prep` before any glyph runs.
///
/// 1 if stems snap to full pixels for the detected rasterizer.
pub const CVTL_STEM_MODE: u16 = 0;
/// Length of the runtime scratch area.
pub const CVTL_MAX_RUNTIME: u16 = 1;
