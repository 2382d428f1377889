//! The `prep` program.
//!
//! Runs at every size change: pins the PPEM into the hinting range,
//! disables hinting past the limit, derives the scale correction,
//! rescales the active style's CVT block, and rounds its blue zones.

use crate::bytecode::{op, Bytecode};
use crate::options::Options;
use crate::storage::*;
use crate::tables::cvt::CvtLayout;
use crate::tables::fpgm::Func;

/// Emit the control-value program for the chosen style.
pub fn build_prep(layout: &CvtLayout, options: &Options, active_style: usize) -> Vec<u8> {
    let mut bc = Bytecode::new();

    // the 16.16 unit constant, needed to divide after MUL
    bc.push(&[SAL_0X10000, 16384, 256]);
    bc.op(op::MUL);
    bc.op(op::WS);

    // hinting stops entirely above the limit
    if options.hinting_limit != 0 {
        bc.op(op::MPPEM);
        bc.push1(options.hinting_limit as i32);
        bc.op(op::GT);
        bc.op(op::IF);
        {
            bc.push(&[1, 1]);
            bc.op(op::INSTCTRL);
        }
        bc.op(op::EIF);
    }

    // scale = pinned_ppem / ppem, as 16.16
    bc.op(op::MPPEM);
    bc.op(op::DUP);
    bc.push1(options.hinting_range_min as i32);
    bc.op(op::LT);
    bc.op(op::IF);
    {
        bc.op(op::POP);
        bc.push1(options.hinting_range_min as i32);
    }
    bc.op(op::EIF);
    bc.op(op::DUP);
    bc.push1(options.hinting_range_max as i32);
    bc.op(op::GT);
    bc.op(op::IF);
    {
        bc.op(op::POP);
        bc.push1(options.hinting_range_max as i32);
    }
    bc.op(op::EIF);
    bc.push1(SAL_0X10000);
    bc.op(op::RS);
    bc.op(op::MUL);
    bc.op(op::MPPEM);
    bc.op(op::DIV);
    bc.push1(SAL_SCALE);
    bc.op(op::SWAP);
    bc.op(op::WS);

    // publish the scale in the style's runtime cell
    bc.push1(layout.scale_cell(active_style) as i32);
    bc.push1(SAL_SCALE);
    bc.op(op::RS);
    bc.op(op::WCVTP);

    // past the optimized range stems keep their natural widths
    bc.push1(SAL_IS_EXTRA_LIGHT);
    bc.op(op::MPPEM);
    bc.push1(options.hinting_range_max as i32);
    bc.op(op::GT);
    bc.op(op::WS);

    emit_stem_mode(&mut bc, options);

    // the per-style blue-data cells mirror the offset map
    let style_id = layout.style_ids[active_style];
    let blue_data = layout.blue_data_base + 2 * style_id;
    bc.push(&[
        blue_data as i32,
        layout.blue_ref_base(active_style) as i32,
    ]);
    bc.op(op::WCVTP);
    bc.push(&[
        blue_data as i32 + 1,
        layout.blue_counts[active_style] as i32,
    ]);
    bc.op(op::WCVTP);

    // rescale the whole style block
    let block_start = layout.cvt_offsets[active_style] as i32;
    let block_end = block_start + layout.style_block_len(active_style) as i32 - 1;
    bc.push(&[block_start, block_end, Func::CvtRescale.id(), Func::Loop.id()]);
    bc.op_with(op::CALL, 1, 0);

    // round the blue pairs
    let blue_count = layout.blue_counts[active_style] as i32;
    if blue_count > 0 {
        let ref_base = layout.blue_ref_base(active_style) as i32;
        bc.push(&[
            ref_base,
            ref_base + blue_count - 1,
            Func::BlueRound.id(),
            Func::Loop.id(),
        ]);
        bc.op_with(op::CALL, 1, 0);
    }

    emit_x_height_increase(&mut bc, layout, options, active_style);

    bc.finish()
}

/// Latch whether stems snap to full pixels for the rasterizer the
/// GETINFO instruction reports.
fn emit_stem_mode(bc: &mut Bytecode, options: &Options) {
    bc.push1(CVTL_STEM_MODE as i32);
    bc.push1(0);
    if options.gray_strong_stem_width {
        // no ClearType at all
        bc.push1(64);
        bc.op(op::GETINFO);
        bc.push1(0);
        bc.op(op::EQ);
        bc.op(op::OR);
    }
    if options.gdi_cleartype_strong_stem_width {
        // rasterizer 36..38 with ClearType enabled
        bc.push1(1);
        bc.op(op::GETINFO);
        bc.op(op::DUP);
        bc.push1(36);
        bc.op(op::GTEQ);
        bc.op(op::SWAP);
        bc.push1(38);
        bc.op(op::LT);
        bc.op(op::AND);
        bc.push1(64);
        bc.op(op::GETINFO);
        bc.push1(0);
        bc.op(op::NEQ);
        bc.op(op::AND);
        bc.op(op::OR);
    }
    if options.dw_cleartype_strong_stem_width {
        // rasterizer 38+ with ClearType enabled
        bc.push1(1);
        bc.op(op::GETINFO);
        bc.push1(38);
        bc.op(op::GTEQ);
        bc.push1(64);
        bc.op(op::GETINFO);
        bc.push1(0);
        bc.op(op::NEQ);
        bc.op(op::AND);
        bc.op(op::OR);
    }
    bc.op(op::WCVTP);
}

/// Round the x-height blue pair up at small sizes.
fn emit_x_height_increase(
    bc: &mut Bytecode,
    layout: &CvtLayout,
    options: &Options,
    active_style: usize,
) {
    let adjustment = layout.blue_adjustment_offsets[active_style];
    if options.increase_x_height == 0 || adjustment == crate::script::STYLE_UNUSED {
        return;
    }
    let ref_cell = (layout.blue_ref_base(active_style) + adjustment) as i32;
    let shoot_cell = (layout.blue_shoot_base(active_style) + adjustment) as i32;

    bc.op(op::MPPEM);
    bc.push1(options.increase_x_height as i32);
    bc.op(op::LTEQ);
    bc.op(op::MPPEM);
    bc.push1(6);
    bc.op(op::GTEQ);
    bc.op(op::AND);
    bc.op(op::IF);
    {
        for cell in [ref_cell, shoot_cell] {
            bc.push1(cell);
            bc.op(op::DUP);
            bc.op(op::RCVT);
            bc.op(op::CEILING);
            bc.op(op::WCVTP);
        }
    }
    bc.op(op::EIF);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::check_structure;
    use crate::error::Result;
    use crate::metrics::StyleMetrics;
    use crate::options::FallbackScript;
    use crate::script::{Coverage, StyleClass, STYLE_LATIN};
    use crate::tables::cvt::build_cvt;

    fn layout() -> CvtLayout {
        use crate::metrics::{Blue, LatinAxis};
        use crate::script::{BLUE_ADJUSTMENT, BLUE_TOP};
        let mut coverage = Coverage::new(4, FallbackScript::None);
        let resolve = |style: &'static StyleClass| -> Result<StyleMetrics> {
            match style.script {
                Some(_) => Ok(StyleMetrics {
                    style,
                    axes: [
                        LatinAxis { widths: vec![80], blues: vec![] },
                        LatinAxis {
                            widths: vec![70],
                            blues: vec![
                                Blue { ref_pos: 0, shoot_pos: 0, flags: 0 },
                                Blue {
                                    ref_pos: 520,
                                    shoot_pos: 530,
                                    flags: BLUE_TOP | BLUE_ADJUSTMENT,
                                },
                            ],
                        },
                    ],
                }),
                None => Ok(StyleMetrics::synthetic(style)),
            }
        };
        build_cvt(&mut coverage, false, 1000, resolve).unwrap().layout
    }

    #[test]
    fn prep_is_structurally_sound() {
        let prep = build_prep(&layout(), &Options::default(), STYLE_LATIN.index);
        let stats = check_structure(&prep).unwrap();
        assert!(stats.defined.is_empty());
        // rescale and blue-round loops run through the generic loop
        assert!(stats.called.iter().any(|&id| id == Func::Loop.id()));
    }

    #[test]
    fn zero_limit_emits_no_instctrl() {
        let options = Options::default().hinting_limit(0);
        let prep = build_prep(&layout(), &options, STYLE_LATIN.index);
        assert!(!prep.contains(&crate::bytecode::op::INSTCTRL));

        let with_limit = build_prep(&layout(), &Options::default(), STYLE_LATIN.index);
        assert!(with_limit.contains(&crate::bytecode::op::INSTCTRL));
    }

    #[test]
    fn stem_mode_reflects_option_bits() {
        let mut options = Options::default();
        options.gray_strong_stem_width = false;
        options.gdi_cleartype_strong_stem_width = false;
        options.dw_cleartype_strong_stem_width = false;
        let none = build_prep(&layout(), &options, STYLE_LATIN.index);
        options.gdi_cleartype_strong_stem_width = true;
        let gdi = build_prep(&layout(), &options, STYLE_LATIN.index);
        assert!(gdi.len() > none.len());
    }
}
