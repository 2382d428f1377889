//! The `fpgm` function library.
//!
//! Every function is a structured op sequence assembled on demand;
//! CVT positions determined by the CVT builder arrive through
//! [`FpgmParams`], and function numbers are assigned from the fixed
//! definition order below, so callers always agree with the emitted
//! `FDEF`s.
//!
//! Conventions shared by all functions: measurements run along y; the
//! twilight zone holds two points per segment, the hinted one at the
//! segment index and the original one `sal_num_segments` above it;
//! alignment helpers expect zp0 in the twilight zone and zp1 in the
//! normal zone.

use crate::action::{ActionKind, Bound};
use crate::bytecode::{op, Bytecode};
use crate::storage::*;

/// The functions, in definition (and numbering) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Func {
    Round = 0,
    ComputeStemWidth,
    Loop,
    CvtRescale,
    BlueRound,
    GetPointExtrema,
    CreateSegment,
    CreateSegments,
    AlignSegment,
    AlignSegments,
    ScaleContour,
    ScaleGlyph,
    IpOuterAlignPoint,
    IpOnAlignPoints,
    IpBetweenAlignPoint,
    IpBetweenAlignPoints,
    ActionIpBefore,
    ActionIpAfter,
    ActionIpOn,
    ActionIpBetween,
    ActionAdjust,
    ActionAdjustBound,
    ActionStem,
    ActionStemBound,
    ActionLink,
    ActionAnchor,
    ActionBlueAnchor,
    ActionBlue,
    ActionSerif,
    ActionSerifLowerBound,
    ActionSerifUpperBound,
    ActionSerifLowerUpperBound,
    ActionSerifAnchor,
    ActionSerifAnchorLowerBound,
    ActionSerifAnchorUpperBound,
    ActionSerifAnchorLowerUpperBound,
    ActionSerifLink1,
    ActionSerifLink1LowerBound,
    ActionSerifLink1UpperBound,
    ActionSerifLink1LowerUpperBound,
    ActionSerifLink2,
    ActionSerifLink2LowerBound,
    ActionSerifLink2UpperBound,
    ActionSerifLink2LowerUpperBound,
    HandleAction,
    HintGlyph,
}

pub const FUNC_COUNT: u16 = Func::HintGlyph as u16 + 1;

impl Func {
    pub fn id(self) -> i32 {
        self as i32
    }
}

/// Select the function realizing an action.
pub fn action_function(kind: ActionKind, bound: Bound) -> Func {
    use ActionKind::*;
    use Bound::*;
    match (kind, bound) {
        (IpBefore, None) => Func::ActionIpBefore,
        (IpAfter, None) => Func::ActionIpAfter,
        (IpOn, None) => Func::ActionIpOn,
        (IpBetween, None) => Func::ActionIpBetween,
        (Adjust, None) => Func::ActionAdjust,
        (Adjust, Lower) => Func::ActionAdjustBound,
        (Stem, None) => Func::ActionStem,
        (Stem, Lower) => Func::ActionStemBound,
        (Link, None) => Func::ActionLink,
        (Anchor, None) => Func::ActionAnchor,
        (BlueAnchor, None) => Func::ActionBlueAnchor,
        (Blue, None) => Func::ActionBlue,
        (Serif, None) => Func::ActionSerif,
        (Serif, Lower) => Func::ActionSerifLowerBound,
        (Serif, Upper) => Func::ActionSerifUpperBound,
        (Serif, LowerUpper) => Func::ActionSerifLowerUpperBound,
        (SerifAnchor, None) => Func::ActionSerifAnchor,
        (SerifAnchor, Lower) => Func::ActionSerifAnchorLowerBound,
        (SerifAnchor, Upper) => Func::ActionSerifAnchorUpperBound,
        (SerifAnchor, LowerUpper) => Func::ActionSerifAnchorLowerUpperBound,
        (SerifLink1, None) => Func::ActionSerifLink1,
        (SerifLink1, Lower) => Func::ActionSerifLink1LowerBound,
        (SerifLink1, Upper) => Func::ActionSerifLink1UpperBound,
        (SerifLink1, LowerUpper) => Func::ActionSerifLink1LowerUpperBound,
        (SerifLink2, None) => Func::ActionSerifLink2,
        (SerifLink2, Lower) => Func::ActionSerifLink2LowerBound,
        (SerifLink2, Upper) => Func::ActionSerifLink2UpperBound,
        (SerifLink2, LowerUpper) => Func::ActionSerifLink2LowerUpperBound,
        (kind, bound) => unreachable!("no function for {kind:?} with bound {bound:?}"),
    }
}

/// CVT positions patched into the function stream.
#[derive(Debug, Clone, Copy)]
pub struct FpgmParams {
    /// Cell holding the hinted style's standard vertical width.
    pub std_vwidth_cvt: u16,
    /// Distance between a blue reference cell and its shoot cell.
    pub blue_count: u16,
}

/// Assemble the whole function library.
pub fn build_fpgm(params: &FpgmParams) -> Vec<u8> {
    let mut bc = Bytecode::new();
    for index in 0..FUNC_COUNT {
        let func = FUNCTIONS[index as usize];
        bc.push1(func.id());
        bc.op(op::FDEF);
        emit_body(&mut bc, func, params);
        bc.op(op::ENDF);
    }
    bc.finish()
}

const FUNCTIONS: [Func; FUNC_COUNT as usize] = [
    Func::Round,
    Func::ComputeStemWidth,
    Func::Loop,
    Func::CvtRescale,
    Func::BlueRound,
    Func::GetPointExtrema,
    Func::CreateSegment,
    Func::CreateSegments,
    Func::AlignSegment,
    Func::AlignSegments,
    Func::ScaleContour,
    Func::ScaleGlyph,
    Func::IpOuterAlignPoint,
    Func::IpOnAlignPoints,
    Func::IpBetweenAlignPoint,
    Func::IpBetweenAlignPoints,
    Func::ActionIpBefore,
    Func::ActionIpAfter,
    Func::ActionIpOn,
    Func::ActionIpBetween,
    Func::ActionAdjust,
    Func::ActionAdjustBound,
    Func::ActionStem,
    Func::ActionStemBound,
    Func::ActionLink,
    Func::ActionAnchor,
    Func::ActionBlueAnchor,
    Func::ActionBlue,
    Func::ActionSerif,
    Func::ActionSerifLowerBound,
    Func::ActionSerifUpperBound,
    Func::ActionSerifLowerUpperBound,
    Func::ActionSerifAnchor,
    Func::ActionSerifAnchorLowerBound,
    Func::ActionSerifAnchorUpperBound,
    Func::ActionSerifAnchorLowerUpperBound,
    Func::ActionSerifLink1,
    Func::ActionSerifLink1LowerBound,
    Func::ActionSerifLink1UpperBound,
    Func::ActionSerifLink1LowerUpperBound,
    Func::ActionSerifLink2,
    Func::ActionSerifLink2LowerBound,
    Func::ActionSerifLink2UpperBound,
    Func::ActionSerifLink2LowerUpperBound,
    Func::HandleAction,
    Func::HintGlyph,
];

fn emit_body(bc: &mut Bytecode, func: Func, params: &FpgmParams) {
    match func {
        Func::Round => round(bc),
        Func::ComputeStemWidth => compute_stem_width(bc, params),
        Func::Loop => generic_loop(bc),
        Func::CvtRescale => cvt_rescale(bc),
        Func::BlueRound => blue_round(bc, params),
        Func::GetPointExtrema => get_point_extrema(bc),
        Func::CreateSegment => create_segment(bc),
        Func::CreateSegments => create_segments(bc),
        Func::AlignSegment => align_segment(bc),
        Func::AlignSegments => align_segments(bc),
        Func::ScaleContour => scale_contour(bc),
        Func::ScaleGlyph => scale_glyph(bc),
        Func::IpOuterAlignPoint => ip_outer_align_point(bc),
        Func::IpOnAlignPoints => ip_on_align_points(bc),
        Func::IpBetweenAlignPoint => ip_between_align_point(bc),
        Func::IpBetweenAlignPoints => ip_between_align_points(bc),
        Func::ActionIpBefore | Func::ActionIpAfter => action_ip_outer(bc),
        Func::ActionIpOn => action_ip_on(bc),
        Func::ActionIpBetween => action_ip_between(bc),
        Func::ActionAdjust => action_adjust(bc, false),
        Func::ActionAdjustBound => action_adjust(bc, true),
        Func::ActionStem => action_stem(bc, false),
        Func::ActionStemBound => action_stem(bc, true),
        Func::ActionLink => action_link(bc),
        Func::ActionAnchor => action_anchor(bc),
        Func::ActionBlueAnchor => action_blue_anchor(bc),
        Func::ActionBlue => action_blue(bc),
        Func::ActionSerif => action_serif(bc, Bound::None),
        Func::ActionSerifLowerBound => action_serif(bc, Bound::Lower),
        Func::ActionSerifUpperBound => action_serif(bc, Bound::Upper),
        Func::ActionSerifLowerUpperBound => action_serif(bc, Bound::LowerUpper),
        Func::ActionSerifAnchor => action_serif_anchor(bc, Bound::None),
        Func::ActionSerifAnchorLowerBound => action_serif_anchor(bc, Bound::Lower),
        Func::ActionSerifAnchorUpperBound => action_serif_anchor(bc, Bound::Upper),
        Func::ActionSerifAnchorLowerUpperBound => action_serif_anchor(bc, Bound::LowerUpper),
        Func::ActionSerifLink1 => action_serif_link1(bc, Bound::None),
        Func::ActionSerifLink1LowerBound => action_serif_link1(bc, Bound::Lower),
        Func::ActionSerifLink1UpperBound => action_serif_link1(bc, Bound::Upper),
        Func::ActionSerifLink1LowerUpperBound => action_serif_link1(bc, Bound::LowerUpper),
        Func::ActionSerifLink2 => action_serif_link2(bc, Bound::None),
        Func::ActionSerifLink2LowerBound => action_serif_link2(bc, Bound::Lower),
        Func::ActionSerifLink2UpperBound => action_serif_link2(bc, Bound::Upper),
        Func::ActionSerifLink2LowerUpperBound => action_serif_link2(bc, Bound::LowerUpper),
        Func::HandleAction => handle_action(bc),
        Func::HintGlyph => hint_glyph(bc),
    }
}

fn call(bc: &mut Bytecode, func: Func) {
    bc.push1(func.id());
    bc.op_with(op::CALL, 1, 0);
}

fn loopcall(bc: &mut Bytecode, func: Func) {
    bc.push1(func.id());
    bc.op_with(op::LOOPCALL, 2, 0);
}

/// Multiply the value on top by `sal_scale` (16.16).
fn apply_scale(bc: &mut Bytecode) {
    bc.push1(SAL_SCALE);
    bc.op(op::RS);
    bc.op(op::MUL);
    bc.push1(SAL_0X10000);
    bc.op(op::RS);
    bc.op(op::DIV);
}

/// Round a 26.6 value symmetrically, without engine compensation.
///
/// in: val / out: round(val)
fn round(bc: &mut Bytecode) {
    bc.op(op::DUP);
    bc.op(op::ABS);
    bc.push1(32);
    bc.op(op::ADD);
    bc.op(op::FLOOR);
    bc.op(op::SWAP);
    bc.push1(0);
    bc.op(op::LT);
    bc.op(op::IF);
    bc.op(op::NEG);
    bc.op(op::EIF);
}

/// Grid-fit a stem width.
///
/// in: width, stem_is_serif, base_is_round (width on top)
/// out: new width, sign preserved
fn compute_stem_width(bc: &mut Bytecode, params: &FpgmParams) {
    let std_width = params.std_vwidth_cvt as i32;

    bc.op(op::DUP);
    bc.op(op::ABS); // s: round serif width dist
    bc.op(op::DUP);
    bc.push1(3 * 64);
    bc.op(op::LT);
    bc.push1(4);
    bc.op(op::MINDEX); // s: round width dist (dist<192) serif
    bc.op(op::AND);
    bc.push1(SAL_IS_EXTRA_LIGHT);
    bc.op(op::RS);
    bc.op(op::OR);
    bc.op(op::IF); // s: round width dist
    {
        bc.op(op::POP);
        bc.op(op::SWAP);
        bc.op(op::POP); // natural width
    }
    bc.op(op::ELSE);
    {
        bc.op(op::ROLL); // s: width dist round
        bc.op(op::IF); // s: width dist
        {
            bc.op(op::DUP);
            bc.push1(80);
            bc.op(op::LT);
            bc.op(op::IF);
            bc.op(op::POP);
            bc.push1(64);
            bc.op(op::EIF);
        }
        bc.op(op::ELSE);
        {
            bc.op(op::DUP);
            bc.push1(56);
            bc.op(op::LT);
            bc.op(op::IF);
            bc.op(op::POP);
            bc.push1(56);
            bc.op(op::EIF);
        }
        bc.op(op::EIF);

        // attraction towards the standard width
        bc.op(op::DUP);
        bc.push1(std_width);
        bc.op(op::RCVT);
        bc.op(op::SUB);
        bc.op(op::ABS); // s: width dist delta
        bc.push1(40);
        bc.op(op::LT);
        bc.op(op::IF); // s: width dist
        {
            bc.op(op::POP);
            bc.push1(std_width);
            bc.op(op::RCVT);
            bc.op(op::DUP);
            bc.push1(48);
            bc.op(op::LT);
            bc.op(op::IF);
            bc.op(op::POP);
            bc.push1(48);
            bc.op(op::EIF);
        }
        bc.op(op::ELSE);
        {
            bc.op(op::DUP);
            bc.push1(3 * 64);
            bc.op(op::LT);
            bc.op(op::IF); // snap the fraction below three pixels
            {
                bc.op(op::DUP);
                bc.op(op::FLOOR);
                bc.op(op::SWAP); // s: width floor dist
                bc.push1(2);
                bc.op(op::CINDEX);
                bc.op(op::SUB); // s: width floor frac
                bc.op(op::DUP);
                bc.push1(10);
                bc.op(op::LT);
                bc.op(op::IF);
                {
                    bc.op(op::ADD);
                }
                bc.op(op::ELSE);
                {
                    bc.op(op::DUP);
                    bc.push1(32);
                    bc.op(op::LT);
                    bc.op(op::IF);
                    {
                        bc.op(op::POP);
                        bc.push1(10);
                        bc.op(op::ADD);
                    }
                    bc.op(op::ELSE);
                    {
                        bc.op(op::DUP);
                        bc.push1(54);
                        bc.op(op::LT);
                        bc.op(op::IF);
                        {
                            bc.op(op::POP);
                            bc.push1(54);
                            bc.op(op::ADD);
                        }
                        bc.op(op::ELSE);
                        {
                            bc.op(op::ADD);
                        }
                        bc.op(op::EIF);
                    }
                    bc.op(op::EIF);
                }
                bc.op(op::EIF);
            }
            bc.op(op::ELSE);
            {
                call(bc, Func::Round);
            }
            bc.op(op::EIF);
        }
        bc.op(op::EIF);

        // restore the sign of the input width
        bc.op(op::SWAP);
        bc.push1(0);
        bc.op(op::LT);
        bc.op(op::IF);
        bc.op(op::NEG);
        bc.op(op::EIF);

        // strong stem mode rounds to a full pixel when that does not
        // collapse the stem entirely
        bc.push1(CVTL_STEM_MODE as i32);
        bc.op(op::RCVT);
        bc.op(op::IF);
        {
            bc.op(op::DUP);
            call(bc, Func::Round);
            bc.op(op::DUP);
            bc.op(op::IF);
            bc.op(op::SWAP);
            bc.op(op::POP);
            bc.op(op::ELSE);
            bc.op(op::POP);
            bc.op(op::EIF);
        }
        bc.op(op::EIF);
    }
    bc.op(op::EIF);
}

/// Apply `sal_func` to every index in `sal_i..=sal_limit`.
///
/// in: start, end, func_num (func_num on top)
fn generic_loop(bc: &mut Bytecode) {
    bc.push1(SAL_FUNC);
    bc.op(op::SWAP);
    bc.op(op::WS);
    bc.push1(SAL_LIMIT);
    bc.op(op::SWAP);
    bc.op(op::WS);
    bc.push1(SAL_I);
    bc.op(op::SWAP);
    bc.op(op::WS);

    let top = bc.label();
    bc.push1(SAL_I);
    bc.op(op::RS);
    bc.push1(SAL_LIMIT);
    bc.op(op::RS);
    bc.op(op::LTEQ);
    bc.op(op::IF);
    {
        bc.push1(SAL_FUNC);
        bc.op(op::RS);
        bc.op_with(op::CALL, 1, 0);
        bc.push(&[SAL_I, 1, SAL_I]);
        bc.op(op::RS);
        bc.op(op::ADD);
        bc.op(op::WS);
        bc.jump_back(top);
    }
    bc.op(op::EIF);
}

/// Rescale CVT\[sal_i\] by `sal_scale`.
fn cvt_rescale(bc: &mut Bytecode) {
    bc.push1(SAL_I);
    bc.op(op::RS);
    bc.op(op::DUP);
    bc.op(op::RCVT);
    apply_scale(bc);
    bc.op(op::WCVTP);
}

/// Round CVT\[sal_i\] (a blue reference) and pin its shoot cell so the
/// pair stays colocated, at a third of a pixel, or at a full pixel.
fn blue_round(bc: &mut Bytecode, params: &FpgmParams) {
    bc.push1(SAL_I);
    bc.op(op::RS);
    bc.op(op::DUP);
    bc.op(op::RCVT); // s: ref_idx ref
    bc.op(op::DUP);
    call(bc, Func::Round);
    bc.op(op::SWAP); // s: ref_idx round(ref) ref

    bc.push(&[params.blue_count as i32, 4]);
    bc.op(op::CINDEX);
    bc.op(op::ADD); // s: ref_idx round(ref) ref shoot_idx
    bc.op(op::DUP);
    bc.op(op::RCVT); // s: ref_idx round(ref) ref shoot_idx shoot

    bc.op(op::ROLL);
    bc.op(op::SWAP);
    bc.op(op::SUB); // s: ref_idx round(ref) shoot_idx dist
    bc.op(op::DUP);
    bc.op(op::ABS); // s: ... dist delta

    bc.op(op::DUP);
    bc.push1(32);
    bc.op(op::LT);
    bc.op(op::IF);
    {
        bc.op(op::POP);
        bc.push1(0);
    }
    bc.op(op::ELSE);
    {
        bc.push1(48);
        bc.op(op::LT);
        bc.op(op::IF);
        bc.push1(32);
        bc.op(op::ELSE);
        bc.push1(64);
        bc.op(op::EIF);
    }
    bc.op(op::EIF);

    bc.op(op::SWAP); // s: ref_idx round(ref) shoot_idx delta dist
    bc.push1(0);
    bc.op(op::LT);
    bc.op(op::IF);
    bc.op(op::NEG); // overshoot direction
    bc.op(op::EIF);

    bc.push1(3);
    bc.op(op::CINDEX);
    bc.op(op::SWAP);
    bc.op(op::SUB); // s: ref_idx round(ref) shoot_idx (round(ref) - delta)

    bc.op(op::WCVTP);
    bc.op(op::WCVTP);
}

/// Track running extrema while walking a segment's points.
///
/// in: point-1 / out: point
fn get_point_extrema(bc: &mut Bytecode) {
    bc.push1(1);
    bc.op(op::ADD);
    bc.op(op::DUP);
    bc.op(op::DUP);

    bc.push1(SAL_POINT_MIN);
    bc.op(op::RS);
    bc.op(op::MD_ORIG);
    bc.push1(0);
    bc.op(op::LT);
    bc.op(op::IF);
    {
        bc.op(op::DUP);
        bc.push1(SAL_POINT_MIN);
        bc.op(op::SWAP);
        bc.op(op::WS);
    }
    bc.op(op::EIF);

    bc.push1(SAL_POINT_MAX);
    bc.op(op::RS);
    bc.op(op::MD_ORIG);
    bc.push1(0);
    bc.op(op::GT);
    bc.op(op::IF);
    {
        bc.op(op::DUP);
        bc.push1(SAL_POINT_MAX);
        bc.op(op::SWAP);
        bc.op(op::WS);
    }
    bc.op(op::EIF);
}

/// Store one segment's point range and build its twilight pair.
///
/// in: start, end \[, contour_last, contour_first\] (start on top);
/// the wrap form is detected by start > end.
fn create_segment(bc: &mut Bytecode) {
    bc.push1(SAL_I);
    bc.op(op::RS);
    bc.push1(2);
    bc.op(op::CINDEX);
    bc.op(op::WS); // storage[sal_i] = start

    bc.push(&[SAL_I, 1, SAL_I]);
    bc.op(op::RS);
    bc.op(op::ADD);
    bc.op(op::WS); // the loop adds one more, so the step is two

    bc.push(&[SAL_POINT_MIN, 2]);
    bc.op(op::CINDEX);
    bc.op(op::WS);
    bc.push(&[SAL_POINT_MAX, 2]);
    bc.op(op::CINDEX);
    bc.op(op::WS);

    bc.push1(1);
    bc.op(op::SZPS); // extrema scan runs in the normal zone

    bc.op(op::SWAP);
    bc.op(op::DUP);
    bc.push1(3);
    bc.op(op::CINDEX); // s: start end end start
    bc.op(op::LT); // start > end: wrap-around
    bc.op(op::IF);
    {
        // s: first last start end
        bc.push1(SAL_I);
        bc.op(op::RS);
        bc.push1(4);
        bc.op(op::CINDEX);
        bc.op(op::WS); // storage[sal_i] = contour_last

        bc.op(op::ROLL);
        bc.op(op::ROLL); // s: first end last start
        bc.op(op::DUP);
        bc.op(op::ROLL);
        bc.op(op::SWAP); // s: first end start last start
        bc.op(op::SUB); // s: first end start loop_count
        loopcall(bc, Func::GetPointExtrema);
        bc.op(op::POP);

        bc.op(op::SWAP); // s: end first
        bc.push1(1);
        bc.op(op::SUB);
        bc.op(op::DUP);
        bc.op(op::ROLL);
        bc.op(op::SWAP);
        bc.op(op::SUB); // s: (first-1) loop_count
        loopcall(bc, Func::GetPointExtrema);
        bc.op(op::POP);
    }
    bc.op(op::ELSE);
    {
        // s: start end
        bc.push1(SAL_I);
        bc.op(op::RS);
        bc.push1(2);
        bc.op(op::CINDEX);
        bc.op(op::WS); // storage[sal_i] = end

        bc.push1(2);
        bc.op(op::CINDEX);
        bc.op(op::SUB); // s: start loop_count
        loopcall(bc, Func::GetPointExtrema);
        bc.op(op::POP);
    }
    bc.op(op::EIF);

    // the twilight point sits at the middle of the extrema, scaled
    bc.push1(SAL_POINT_MIN);
    bc.op(op::RS);
    bc.op(op::GC_ORIG);
    bc.push1(SAL_POINT_MAX);
    bc.op(op::RS);
    bc.op(op::GC_ORIG);
    bc.op(op::ADD);
    bc.push1(2 * 64);
    bc.op(op::DIV);
    apply_scale(bc);

    bc.op(op::DUP);
    bc.push(&[SAL_J, 0]);
    bc.op(op::SZP2); // twilight zone
    bc.op(op::RS);
    bc.op(op::DUP);
    bc.op(op::GC_CUR);
    bc.op(op::ROLL);
    bc.op(op::SWAP);
    bc.op(op::SUB);
    bc.op(op::SHPIX); // place the original twilight point

    bc.push1(SAL_K);
    bc.op(op::RS);
    bc.op(op::DUP);
    bc.op(op::GC_CUR);
    bc.op(op::ROLL);
    bc.op(op::SWAP);
    bc.op(op::SUB);
    bc.op(op::SHPIX); // place the hinted twilight point

    bc.push(&[SAL_K, 1, SAL_K, SAL_J, 1, SAL_J]);
    bc.op(op::RS);
    bc.op(op::ADD);
    bc.op(op::WS);
    bc.op(op::RS);
    bc.op(op::ADD);
    bc.op(op::WS);
}

/// Build all segments of the current glyph.
///
/// in: per segment (reversed) start/end \[+ wrap pair\], then
/// num_segments on top.
fn create_segments(bc: &mut Bytecode) {
    bc.op(op::SVTCA_Y);

    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::SWAP);
    bc.op(op::WS);

    bc.push(&[
        SAL_SEGMENT_OFFSET,
        SAL_SEGMENT_OFFSET,
        SAL_NUM_SEGMENTS,
        SAL_K,
        0,
        SAL_J,
        SAL_NUM_SEGMENTS,
    ]);
    bc.op(op::RS);
    bc.op(op::WS); // sal_j = num_segments (original points above)
    bc.op(op::WS); // sal_k = 0 (hinted points below)
    bc.op(op::RS);
    bc.op(op::DUP);
    bc.op(op::ADD);
    bc.op(op::ADD);
    bc.push1(1);
    bc.op(op::SUB); // s: offset (offset + 2*num_segments - 1)

    bc.push(&[Func::CreateSegment.id(), Func::Loop.id()]);
    bc.op_with(op::CALL, 1, 0);
}

/// `ALIGNRP` every outline point of one segment to rp0.
///
/// in: segment_index
fn align_segment(bc: &mut Bytecode) {
    bc.op(op::DUP);
    bc.op(op::ADD);
    bc.push1(SAL_SEGMENT_OFFSET);
    bc.op(op::ADD);
    bc.op(op::DUP);
    bc.op(op::RS);
    bc.op(op::SWAP);
    bc.push1(1);
    bc.op(op::ADD);
    bc.op(op::RS); // s: first last

    let top = bc.label();
    bc.push1(2);
    bc.op(op::CINDEX);
    bc.push1(2);
    bc.op(op::CINDEX);
    bc.op(op::LTEQ); // first <= last
    bc.op(op::IF);
    {
        bc.op(op::SWAP);
        bc.op(op::DUP);
        bc.op(op::ALIGNRP);
        bc.push1(1);
        bc.op(op::ADD);
        bc.op(op::SWAP);
        bc.jump_back(top);
    }
    bc.op(op::ELSE);
    {
        bc.op(op::POP);
        bc.op(op::POP);
    }
    bc.op(op::EIF);
}

/// Align an edge's reference segment and its remaining members.
///
/// in: first_segment, loop_counter N, segment_1..N (first on top)
fn align_segments(bc: &mut Bytecode) {
    call(bc, Func::AlignSegment);
    loopcall(bc, Func::AlignSegment);
}

/// Scale a contour through its two extrema points.
///
/// in: max_point, min_point (min on top)
fn scale_contour(bc: &mut Bytecode) {
    bc.op(op::DUP);
    bc.op(op::DUP);
    bc.op(op::GC_ORIG);
    bc.op(op::DUP);
    apply_scale(bc);
    bc.op(op::SWAP);
    bc.op(op::SUB);
    bc.op(op::SHPIX);

    // a single-point contour must not scale twice
    bc.op(op::SWAP);
    bc.op(op::DUP);
    bc.op(op::ROLL);
    bc.op(op::NEQ);
    bc.op(op::IF);
    {
        bc.op(op::DUP);
        bc.op(op::GC_ORIG);
        bc.op(op::DUP);
        apply_scale(bc);
        bc.op(op::SWAP);
        bc.op(op::SUB);
        bc.op(op::SHPIX);
    }
    bc.op(op::ELSE);
    {
        bc.op(op::POP);
    }
    bc.op(op::EIF);
}

/// Scale an unhinted glyph contour by contour.
///
/// in: per contour (reversed) max/min extrema points, then
/// num_contours on top.
fn scale_glyph(bc: &mut Bytecode) {
    bc.op(op::SVTCA_Y);
    bc.push1(1);
    bc.op(op::SZPS);
    loopcall(bc, Func::ScaleContour);
    bc.op(op::IUP_Y);
}

/// Shift a point outside the edge span against rp0.
///
/// in: point; sal_i holds the edge's scaled original position.
fn ip_outer_align_point(bc: &mut Bytecode) {
    bc.op(op::DUP);
    bc.op(op::ALIGNRP);
    bc.op(op::DUP);
    bc.op(op::GC_ORIG);
    apply_scale(bc);
    bc.push1(SAL_I);
    bc.op(op::RS);
    bc.op(op::SUB);
    bc.op(op::SHPIX);
}

/// Align a run of points onto one edge.
///
/// in: edge, loop_counter N, point_1..N (edge on top)
fn ip_on_align_points(bc: &mut Bytecode) {
    bc.op(op::MDAP_NOROUND);
    bc.op(op::SLOOP);
    bc.op_with(op::ALIGNRP, 1, 0);
}

/// Stretch-interpolate one point; sal_i is the before-edge position,
/// sal_j the stretch factor.
fn ip_between_align_point(bc: &mut Bytecode) {
    bc.op(op::DUP);
    bc.op(op::ALIGNRP);
    bc.op(op::DUP);
    bc.op(op::GC_ORIG);
    apply_scale(bc);
    bc.push1(SAL_I);
    bc.op(op::RS);
    bc.op(op::SUB);
    bc.push1(SAL_J);
    bc.op(op::RS);
    bc.op(op::MUL);
    bc.op(op::SHPIX);
}

/// Interpolate a run of points between two placed edges.
///
/// in: points, loop_counter N, before_edge, after_edge (after on top)
fn ip_between_align_points(bc: &mut Bytecode) {
    bc.push(&[2, 0]);
    bc.op(op::SZPS);
    bc.op(op::CINDEX); // s: before after before
    bc.op(op::DUP);
    bc.op(op::MDAP_NOROUND);
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD); // s: before after before_orig
    bc.op(op::DUP);
    bc.op(op::GC_CUR);
    bc.push1(SAL_I);
    bc.op(op::SWAP);
    bc.op(op::WS); // sal_i = before position
    bc.push1(2);
    bc.op(op::CINDEX);
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD); // s: before after before_orig after_orig
    bc.op(op::MD_CUR); // original span
    bc.op(op::ROLL);
    bc.op(op::ROLL);
    bc.op(op::MD_CUR); // hinted span
    bc.op(op::SWAP);
    bc.op(op::DIV);
    bc.push1(SAL_J);
    bc.op(op::SWAP);
    bc.op(op::WS); // sal_j = stretch factor

    bc.push(&[Func::IpBetweenAlignPoint.id(), 1, 1]);
    bc.op(op::SZP2);
    bc.op(op::SZP1);
    bc.op_with(op::LOOPCALL, 2, 0);
}

/// `ip_before` and `ip_after` share one body: latch the boundary
/// edge's original position, then shift every point against it.
///
/// in: points, loop_counter N, edge (edge on top)
fn action_ip_outer(bc: &mut Bytecode) {
    bc.push1(0);
    bc.op(op::SZP2);
    bc.op(op::DUP);
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD);
    bc.op(op::GC_CUR);
    bc.push1(SAL_I);
    bc.op(op::SWAP);
    bc.op(op::WS);

    bc.push(&[0, 1, 1]);
    bc.op(op::SZP2);
    bc.op(op::SZP1);
    bc.op(op::SZP0);
    bc.op(op::MDAP_NOROUND);
    loopcall(bc, Func::IpOuterAlignPoint);
}

/// in: groups of (points, N, edge), loop_counter M (M on top)
fn action_ip_on(bc: &mut Bytecode) {
    bc.push(&[0, 1]);
    bc.op(op::SZP1);
    bc.op(op::SZP0);
    loopcall(bc, Func::IpOnAlignPoints);
}

/// in: groups of (points, N, before, after), loop_counter M
fn action_ip_between(bc: &mut Bytecode) {
    loopcall(bc, Func::IpBetweenAlignPoints);
}

/// Common prologue of the stem-width actions: measure the original
/// stem length and run it through `compute_stem_width`.
///
/// expects s: ... edge2 edge is_round is_serif, leaves s: ... edge2
/// edge cur_len
fn stem_width_prologue(bc: &mut Bytecode) {
    bc.push1(0);
    bc.op(op::SZPS);
    bc.push1(4);
    bc.op(op::CINDEX);
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD); // edge2_orig
    bc.push1(4);
    bc.op(op::CINDEX);
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD); // edge_orig
    bc.op(op::MD_CUR); // s: edge2 edge is_round is_serif org_len
    call(bc, Func::ComputeStemWidth);
}

/// Align an edge whose stem partner has already been placed.
///
/// in: align-data(edge), \[edge-1,\] edge2, edge, is_round, is_serif
fn action_adjust(bc: &mut Bytecode, bound: bool) {
    stem_width_prologue(bc); // s: [bound] edge2 edge cur_len
    bc.op(op::NEG);
    bc.op(op::ROLL); // s: [bound] edge -cur_len edge2
    bc.op(op::MDAP_NOROUND);
    bc.op(op::SWAP);
    bc.op(op::DUP);
    bc.op(op::DUP); // s: [bound] -cur_len edge edge edge
    bc.op(op::ALIGNRP); // align edge with edge2
    bc.op(op::ROLL);
    bc.op(op::SHPIX); // shift edge by -cur_len; s: [bound] edge

    if bound {
        // an edge below must not be overrun
        bc.op(op::SWAP); // s: edge bound
        bc.op(op::DUP);
        bc.op(op::GC_CUR);
        bc.push1(3);
        bc.op(op::CINDEX);
        bc.op(op::GC_CUR); // s: edge bound bound_pos edge_pos
        bc.op(op::GT); // bound_pos > edge_pos: overrun
        bc.op(op::IF);
        {
            bc.op(op::MDAP_NOROUND); // rp0 = bound
            bc.op(op::DUP);
            bc.op(op::ALIGNRP);
        }
        bc.op(op::ELSE);
        {
            bc.op(op::POP);
        }
        bc.op(op::EIF);
    }

    bc.op(op::MDAP_NOROUND); // rp0 = edge
    bc.push(&[Func::AlignSegments.id(), 1]);
    bc.op(op::SZP1);
    bc.op_with(op::CALL, 1, 0);
}

/// Position both sides of a stem relative to the anchor.
///
/// in: align-data(edge2), align-data(edge), \[edge-1,\] edge2, edge,
/// is_round, is_serif
fn action_stem(bc: &mut Bytecode, bound: bool) {
    // org_len is needed twice, park it in sal_temp3
    bc.push1(0);
    bc.op(op::SZPS);
    bc.push1(4);
    bc.op(op::CINDEX);
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD);
    bc.push1(4);
    bc.op(op::CINDEX);
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD);
    bc.op(op::MD_CUR);
    bc.op(op::DUP);
    bc.push1(SAL_TEMP3);
    bc.op(op::SWAP);
    bc.op(op::WS); // sal_temp3 = org_len
    call(bc, Func::ComputeStemWidth); // s: [b] edge2 edge cur_len

    bc.op(op::SWAP); // s: [b] edge2 cur_len edge
    bc.push1(2);
    bc.op(op::CINDEX); // s: [b] edge2 cur_len edge cur_len
    bc.push1(96);
    bc.op(op::LT);
    bc.op(op::IF); // s: [b] edge2 cur_len edge
    {
        // narrow stems: center between the u/d offsets
        bc.push1(2);
        bc.op(op::CINDEX);
        bc.push1(64);
        bc.op(op::LTEQ);
        bc.op(op::IF);
        bc.push(&[SAL_TEMP1, 32, SAL_TEMP2, 32]);
        bc.op(op::ELSE);
        bc.push(&[SAL_TEMP1, 38, SAL_TEMP2, 26]);
        bc.op(op::EIF);
        bc.op(op::WS);
        bc.op(op::WS);

        org_center(bc); // s: ... edge center
        bc.op(op::DUP);
        call(bc, Func::Round);
        bc.op(op::DUP);
        bc.op(op::ROLL);
        bc.op(op::ROLL);
        bc.op(op::SUB); // s: ... edge rounded (center - rounded)
        bc.op(op::DUP);
        bc.push1(SAL_TEMP1);
        bc.op(op::RS);
        bc.op(op::ADD);
        bc.op(op::ABS); // error against the upper offset
        bc.op(op::SWAP);
        bc.push1(SAL_TEMP2);
        bc.op(op::RS);
        bc.op(op::SUB);
        bc.op(op::ABS); // error against the lower offset
        bc.op(op::LT);
        bc.op(op::IF);
        bc.push1(SAL_TEMP1);
        bc.op(op::RS);
        bc.op(op::SUB);
        bc.op(op::ELSE);
        bc.push1(SAL_TEMP2);
        bc.op(op::RS);
        bc.op(op::ADD);
        bc.op(op::EIF); // s: [b] edge2 cur_len edge pos1
        bc.push1(3);
        bc.op(op::CINDEX);
        bc.push1(2 * 64);
        bc.op(op::DIV);
        bc.op(op::SUB); // target = pos1 - cur_len/2
    }
    bc.op(op::ELSE);
    {
        // wide stems: snap whichever stem side rounds better
        org_pos(bc); // s: [b] edge2 cur_len edge org_pos
        bc.op(op::DUP);
        call(bc, Func::Round);
        bc.op(op::SWAP); // s: ... p1 org_pos
        bc.op(op::DUP);
        bc.push1(SAL_TEMP3);
        bc.op(op::RS);
        bc.op(op::ADD);
        call(bc, Func::Round); // round(org_pos + org_len)
        bc.push1(5);
        bc.op(op::CINDEX);
        bc.op(op::SUB); // p2 = ... - cur_len; s: ... p1 org_pos p2
        bc.op(op::SWAP);
        bc.push1(SAL_TEMP3);
        bc.op(op::RS);
        bc.push1(2 * 64);
        bc.op(op::DIV);
        bc.op(op::ADD);
        bc.push1(5);
        bc.op(op::CINDEX);
        bc.push1(2 * 64);
        bc.op(op::DIV);
        bc.op(op::SUB); // base = org_pos + org_len/2 - cur_len/2
        // s: [b] edge2 cur_len edge p1 p2 base
        bc.op(op::DUP);
        bc.push1(4);
        bc.op(op::CINDEX);
        bc.op(op::SUB);
        bc.op(op::ABS); // |base - p1|
        bc.op(op::SWAP);
        bc.push1(3);
        bc.op(op::CINDEX);
        bc.op(op::SUB);
        bc.op(op::ABS); // |base - p2|
        bc.op(op::LT);
        bc.op(op::IF);
        bc.op(op::POP); // keep p1
        bc.op(op::ELSE);
        bc.op(op::SWAP);
        bc.op(op::POP); // keep p2
        bc.op(op::EIF); // s: [b] edge2 cur_len edge target
    }
    bc.op(op::EIF);

    // move the edge to the target
    bc.push1(2);
    bc.op(op::CINDEX);
    bc.op(op::GC_CUR);
    bc.op(op::SUB); // s: [b] edge2 cur_len edge delta
    bc.push1(2);
    bc.op(op::CINDEX);
    bc.op(op::SWAP);
    bc.op(op::SHPIX); // s: [b] edge2 cur_len edge

    if bound {
        // respect the edge below
        bc.op(op::DUP);
        bc.op(op::GC_CUR);
        bc.push1(5);
        bc.op(op::CINDEX);
        bc.op(op::GC_CUR); // s: b edge2 cur edge edge_pos bound_pos
        bc.op(op::LT); // edge_pos < bound_pos: overrun
        bc.op(op::IF);
        {
            bc.push1(4);
            bc.op(op::CINDEX);
            bc.op(op::MDAP_NOROUND);
            bc.op(op::DUP);
            bc.op(op::ALIGNRP);
        }
        bc.op(op::EIF);
        bc.push1(4);
        bc.op(op::MINDEX);
        bc.op(op::POP); // drop the bound edge; s: edge2 cur_len edge
    }

    bc.op(op::DUP);
    bc.op(op::MDAP_NOROUND); // rp0 = edge
    bc.op(op::ROLL); // s: cur_len edge edge2
    bc.op(op::DUP);
    bc.push1(SAL_TEMP3);
    bc.op(op::SWAP);
    bc.op(op::WS); // sal_temp3 = edge2 (org_len is spent)
    bc.op(op::DUP);
    bc.op(op::ALIGNRP); // edge2 follows the edge
    bc.op(op::ROLL); // s: edge edge2 cur_len
    bc.op(op::SHPIX); // edge2 = edge + cur_len; s: edge
    bc.op(op::MDAP_NOROUND);

    bc.push(&[Func::AlignSegments.id(), 1]);
    bc.op(op::SZP1);
    bc.op_with(op::CALL, 1, 0); // edge's members

    bc.push1(SAL_TEMP3);
    bc.op(op::RS);
    bc.op(op::MDAP_NOROUND); // rp0 = edge2
    bc.push1(Func::AlignSegments.id());
    bc.op_with(op::CALL, 1, 0); // edge2's members
}

/// Leave `org_pos + org_len/2` above the edge on the stack.
///
/// expects s: ... edge, leaves s: ... edge center
fn org_center(bc: &mut Bytecode) {
    org_pos(bc);
    bc.push1(SAL_TEMP3);
    bc.op(op::RS);
    bc.push1(2 * 64);
    bc.op(op::DIV);
    bc.op(op::ADD);
}

/// Leave the anchor-relative original position above the edge.
///
/// expects s: ... edge, leaves s: ... edge org_pos
fn org_pos(bc: &mut Bytecode) {
    bc.op(op::DUP);
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD);
    bc.op(op::GC_CUR); // scaled original position of the edge
    bc.push1(SAL_ANCHOR);
    bc.op(op::RS);
    bc.op(op::GC_CUR);
    bc.op(op::ADD);
    bc.push1(SAL_ANCHOR);
    bc.op(op::RS);
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD);
    bc.op(op::GC_CUR);
    bc.op(op::SUB);
}

/// Attach an edge to an already placed base by the stem distance.
///
/// in: align-data(edge), base, edge, is_round, is_serif
fn action_link(bc: &mut Bytecode) {
    stem_width_prologue(bc); // s: base edge width  (base at depth 3)
    bc.op(op::ROLL); // s: edge width base
    bc.op(op::MDAP_NOROUND);
    bc.op(op::SWAP); // s: width edge
    bc.op(op::DUP);
    bc.op(op::DUP);
    bc.op(op::ALIGNRP); // align edge with base
    bc.op(op::ROLL);
    bc.op(op::SHPIX); // shift by the stem width; s: edge
    bc.op(op::MDAP_NOROUND);
    bc.push(&[Func::AlignSegments.id(), 1]);
    bc.op(op::SZP1);
    bc.op_with(op::CALL, 1, 0);
}

/// Align a stem's lower side, round it, and declare it the anchor.
///
/// in: align-data(edge), edge2, edge, is_round, is_serif
fn action_anchor(bc: &mut Bytecode) {
    bc.push(&[SAL_ANCHOR, 4]);
    bc.op(op::CINDEX);
    bc.op(op::WS); // sal_anchor = edge

    bc.push1(0);
    bc.op(op::SZPS);
    bc.push1(4);
    bc.op(op::CINDEX);
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD);
    bc.push1(4);
    bc.op(op::CINDEX);
    bc.op(op::DUP);
    bc.op(op::MDAP_NOROUND); // rp0 = edge
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD); // s: e2 e r s e2_orig e_orig
    bc.op(op::MD_CUR);
    bc.op(op::DUP);
    bc.push1(SAL_TEMP3);
    bc.op(op::SWAP);
    bc.op(op::WS); // sal_temp3 = org_len
    call(bc, Func::ComputeStemWidth); // s: edge2 edge cur_len

    bc.op(op::DUP);
    bc.push1(96);
    bc.op(op::LT);
    bc.op(op::IF);
    {
        bc.op(op::DUP);
        bc.push1(64);
        bc.op(op::LTEQ);
        bc.op(op::IF);
        bc.push(&[SAL_TEMP1, 32, SAL_TEMP2, 32]);
        bc.op(op::ELSE);
        bc.push(&[SAL_TEMP1, 38, SAL_TEMP2, 26]);
        bc.op(op::EIF);
        bc.op(op::WS);
        bc.op(op::WS);

        bc.op(op::SWAP); // s: edge2 cur_len edge
        bc.op(op::DUP);
        bc.push1(SAL_NUM_SEGMENTS);
        bc.op(op::RS);
        bc.op(op::ADD);
        bc.op(op::GC_CUR);
        bc.push1(SAL_TEMP3);
        bc.op(op::RS);
        bc.push1(2 * 64);
        bc.op(op::DIV);
        bc.op(op::ADD); // s: edge2 cur_len edge center
        bc.op(op::DUP);
        call(bc, Func::Round);
        bc.op(op::DUP);
        bc.op(op::ROLL);
        bc.op(op::ROLL);
        bc.op(op::SUB); // s: ... rounded (center - rounded)
        bc.op(op::DUP);
        bc.push1(SAL_TEMP1);
        bc.op(op::RS);
        bc.op(op::ADD);
        bc.op(op::ABS);
        bc.op(op::SWAP);
        bc.push1(SAL_TEMP2);
        bc.op(op::RS);
        bc.op(op::SUB);
        bc.op(op::ABS);
        bc.op(op::LT);
        bc.op(op::IF);
        bc.push1(SAL_TEMP1);
        bc.op(op::RS);
        bc.op(op::SUB);
        bc.op(op::ELSE);
        bc.push1(SAL_TEMP2);
        bc.op(op::RS);
        bc.op(op::ADD);
        bc.op(op::EIF); // s: edge2 cur_len edge pos1
        bc.push1(3);
        bc.op(op::CINDEX);
        bc.push1(2 * 64);
        bc.op(op::DIV);
        bc.op(op::SUB); // pos1 - cur_len/2
        bc.push1(2);
        bc.op(op::CINDEX);
        bc.op(op::GC_CUR);
        bc.op(op::SUB);
        bc.op(op::SHPIX); // edge moved; s: edge2 cur_len

        bc.op(op::SWAP); // s: cur_len edge2
        bc.op(op::DUP);
        bc.op(op::ALIGNRP); // align edge2 with rp0 (the edge)
        bc.op(op::SWAP);
        bc.op(op::SHPIX); // edge2 = edge + cur_len
    }
    bc.op(op::ELSE);
    {
        bc.op(op::POP); // s: edge2 edge
        bc.op(op::DUP);
        bc.push1(SAL_NUM_SEGMENTS);
        bc.op(op::RS);
        bc.op(op::ADD);
        bc.op(op::MDAP_NOROUND); // rp0 = edge_orig
        bc.op(op::DUP);
        bc.op(op::ALIGNRP);
        bc.op(op::MDAP_ROUND); // round the edge into place
        bc.op(op::POP);
    }
    bc.op(op::EIF);

    bc.push(&[Func::AlignSegments.id(), 1]);
    bc.op(op::SZP1);
    bc.op_with(op::CALL, 1, 0);
}

/// Snap an edge onto a blue zone and declare it the anchor.
///
/// in: align-data(edge), edge, blue_cvt_idx, anchor_point
fn action_blue_anchor(bc: &mut Bytecode) {
    bc.push1(SAL_ANCHOR);
    bc.op(op::SWAP);
    bc.op(op::WS);
    action_blue(bc);
}

/// Snap an edge onto a blue zone.
///
/// in: align-data(edge), edge, blue_cvt_idx (cvt on top)
fn action_blue(bc: &mut Bytecode) {
    bc.push1(0);
    bc.op(op::SZP0);
    bc.op(op::MIAP_NOROUND); // move edge to the rounded blue; rp0 = edge
    bc.push(&[Func::AlignSegments.id(), 1]);
    bc.op(op::SZP1);
    bc.op_with(op::CALL, 1, 0);
}

/// Keep a serif at its original distance from the base edge.
///
/// in: align-data(serif), \[bounds,\] base, serif (serif on top)
fn action_serif(bc: &mut Bytecode, bound: Bound) {
    bc.push1(0);
    bc.op(op::SZPS);
    bc.op(op::DUP);
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD);
    bc.op(op::GC_CUR);
    bc.push1(3);
    bc.op(op::CINDEX);
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD);
    bc.op(op::GC_CUR);
    bc.op(op::SUB); // delta = serif_orig - base_orig
    bc.op(op::ROLL); // s: serif delta base
    bc.op(op::MDAP_NOROUND);
    bc.op(op::SWAP); // s: delta serif
    bc.op(op::DUP);
    bc.op(op::DUP);
    bc.op(op::ALIGNRP); // serif follows base
    bc.op(op::ROLL);
    bc.op(op::SHPIX); // offset restored; s: [bounds] serif

    emit_bound_clamps(bc, bound);
    bc.op(op::MDAP_NOROUND);
    bc.push(&[Func::AlignSegments.id(), 1]);
    bc.op(op::SZP1);
    bc.op_with(op::CALL, 1, 0);
}

/// Round a lone serif into place and declare it the anchor.
///
/// in: align-data(edge), \[bounds,\] edge
fn action_serif_anchor(bc: &mut Bytecode, bound: Bound) {
    bc.push1(0);
    bc.op(op::SZPS);
    bc.op(op::DUP);
    bc.op(op::DUP);
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD);
    bc.op(op::GC_CUR); // s: edge edge orig_pos
    bc.op(op::DUP);
    call(bc, Func::Round);
    bc.op(op::SWAP);
    bc.op(op::SUB); // s: edge edge (rounded - orig)
    bc.op(op::SHPIX); // s: [bounds] edge
    bc.op(op::DUP);
    bc.push1(SAL_ANCHOR);
    bc.op(op::SWAP);
    bc.op(op::WS);

    emit_bound_clamps(bc, bound);
    bc.op(op::MDAP_NOROUND);
    bc.push(&[Func::AlignSegments.id(), 1]);
    bc.op(op::SZP1);
    bc.op_with(op::CALL, 1, 0);
}

/// Interpolate a serif between its placed neighbors.
///
/// in: align-data(edge), \[bounds,\] after, edge, before (before on top)
fn action_serif_link1(bc: &mut Bytecode, bound: Bound) {
    bc.push1(0);
    bc.op(op::SZPS);
    // stretch = hinted span / original span, parked in sal_temp1
    bc.op(op::DUP);
    bc.op(op::GC_CUR);
    bc.push1(4);
    bc.op(op::CINDEX);
    bc.op(op::GC_CUR);
    bc.op(op::SWAP);
    bc.op(op::SUB); // after - before, hinted
    bc.push1(2);
    bc.op(op::CINDEX);
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD);
    bc.op(op::GC_CUR);
    bc.push1(5);
    bc.op(op::CINDEX);
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD);
    bc.op(op::GC_CUR);
    bc.op(op::SWAP);
    bc.op(op::SUB); // after - before, original
    bc.op(op::DIV);
    bc.push1(SAL_TEMP1);
    bc.op(op::SWAP);
    bc.op(op::WS); // s: after edge before

    // delta = (edge_orig - before_orig) * stretch
    bc.op(op::DUP);
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD);
    bc.op(op::GC_CUR);
    bc.push1(3);
    bc.op(op::CINDEX);
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD);
    bc.op(op::GC_CUR);
    bc.op(op::SWAP);
    bc.op(op::SUB);
    bc.push1(SAL_TEMP1);
    bc.op(op::RS);
    bc.op(op::MUL); // s: after edge before delta
    bc.op(op::SWAP);
    bc.op(op::MDAP_NOROUND); // rp0 = before
    bc.op(op::SWAP); // s: after delta edge
    bc.op(op::DUP);
    bc.op(op::DUP);
    bc.op(op::ALIGNRP);
    bc.op(op::ROLL);
    bc.op(op::SHPIX); // s: [bounds] after edge
    bc.op(op::SWAP);
    bc.op(op::POP); // s: [bounds] edge

    emit_bound_clamps(bc, bound);
    bc.op(op::MDAP_NOROUND);
    bc.push(&[Func::AlignSegments.id(), 1]);
    bc.op(op::SZP1);
    bc.op_with(op::CALL, 1, 0);
}

/// Move a serif by the anchor's displacement.
///
/// in: align-data(edge), \[bounds,\] edge
fn action_serif_link2(bc: &mut Bytecode, bound: Bound) {
    bc.push1(0);
    bc.op(op::SZPS);
    bc.op(op::DUP);
    bc.op(op::DUP);
    bc.op(op::DUP);
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD);
    bc.op(op::GC_CUR); // scaled original position
    bc.push1(SAL_ANCHOR);
    bc.op(op::RS);
    bc.op(op::GC_CUR);
    bc.op(op::ADD);
    bc.push1(SAL_ANCHOR);
    bc.op(op::RS);
    bc.push1(SAL_NUM_SEGMENTS);
    bc.op(op::RS);
    bc.op(op::ADD);
    bc.op(op::GC_CUR);
    bc.op(op::SUB); // s: edge edge target
    bc.op(op::SWAP);
    bc.op(op::GC_CUR);
    bc.op(op::SUB); // s: edge (target - current)
    bc.op(op::SHPIX); // s: [bounds] edge

    emit_bound_clamps(bc, bound);
    bc.op(op::MDAP_NOROUND);
    bc.push(&[Func::AlignSegments.id(), 1]);
    bc.op(op::SZP1);
    bc.op_with(op::CALL, 1, 0);
}

/// Clamp the placed edge on top of the stack against the bound edges
/// sitting directly below it (lower bound pushed first).
fn emit_bound_clamps(bc: &mut Bytecode, bound: Bound) {
    if matches!(bound, Bound::Upper | Bound::LowerUpper) {
        emit_clamp(bc, op::GT);
    }
    if matches!(bound, Bound::Lower | Bound::LowerUpper) {
        emit_clamp(bc, op::LT);
    }
}

/// s: bound edge -> s: edge, re-aligned to the bound when the
/// comparison (edge against bound) reports a violation.
fn emit_clamp(bc: &mut Bytecode, violation: u8) {
    bc.op(op::DUP);
    bc.op(op::GC_CUR);
    bc.push1(3);
    bc.op(op::CINDEX);
    bc.op(op::GC_CUR); // s: bound edge edge_pos bound_pos
    bc.op(violation);
    bc.op(op::IF);
    {
        bc.op(op::SWAP);
        bc.op(op::MDAP_NOROUND); // rp0 = bound
        bc.op(op::DUP);
        bc.op(op::ALIGNRP);
    }
    bc.op(op::ELSE);
    {
        bc.op(op::SWAP);
        bc.op(op::POP);
    }
    bc.op(op::EIF);
}

/// Pop a function index and run it.
fn handle_action(bc: &mut Bytecode) {
    bc.op_with(op::CALL, 1, 0);
}

/// The per-glyph driver: run every queued action, then interpolate the
/// untouched points.
///
/// in: action data blocks, num_actions (on top)
fn hint_glyph(bc: &mut Bytecode) {
    loopcall(bc, Func::HandleAction);
    bc.op(op::IUP_Y);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::check_structure;

    fn params() -> FpgmParams {
        FpgmParams {
            std_vwidth_cvt: 23,
            blue_count: 8,
        }
    }

    #[test]
    fn defines_every_function_once_in_order() {
        let fpgm = build_fpgm(&params());
        let stats = check_structure(&fpgm).unwrap();
        let expected: Vec<i32> = (0..FUNC_COUNT as i32).collect();
        assert_eq!(stats.defined, expected);
    }

    #[test]
    fn calls_stay_inside_the_defined_set() {
        let fpgm = build_fpgm(&params());
        let stats = check_structure(&fpgm).unwrap();
        assert!(!stats.called.is_empty());
        assert!(stats
            .called
            .iter()
            .all(|id| (0..FUNC_COUNT as i32).contains(id)));
    }

    #[test]
    fn action_function_covers_all_bound_variants() {
        use crate::action::{ActionKind, Bound};
        for bound in [Bound::None, Bound::Lower, Bound::Upper, Bound::LowerUpper] {
            for kind in [
                ActionKind::Serif,
                ActionKind::SerifAnchor,
                ActionKind::SerifLink1,
                ActionKind::SerifLink2,
            ] {
                let _ = action_function(kind, bound);
            }
        }
        assert_eq!(
            action_function(ActionKind::Stem, Bound::Lower),
            Func::ActionStemBound
        );
        assert_eq!(
            action_function(ActionKind::Blue, Bound::None),
            Func::ActionBlue
        );
    }

    #[test]
    fn patched_cvt_indices_appear_in_the_stream() {
        let a = build_fpgm(&params());
        let b = build_fpgm(&FpgmParams {
            std_vwidth_cvt: 99,
            blue_count: 3,
        });
        assert_ne!(a, b);
        assert_eq!(a.len(), b.len());
    }
}
