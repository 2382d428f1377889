//! Control-value table layout and construction.
//!
//! The image starts with the shared runtime scratch cells, then one
//! scale cell and one (blue offset, blue count) cell pair per used
//! style, then each used style's block: standard + extra widths for
//! both axes followed by the blue reference and shoot arrays.

use log::{info, warn};

use crate::error::{HintError, Result};
use crate::metrics::StyleMetrics;
use crate::script::{Coverage, StyleClass, BLUE_ADJUSTMENT, STYLE_CLASSES, STYLE_MAX, STYLE_UNUSED};
use crate::storage::CVTL_MAX_RUNTIME;

/// Cell offsets recorded while laying out the CVT; the bytecode
/// emitters index the table through this map.
#[derive(Debug, Clone)]
pub struct CvtLayout {
    /// Index assigned to each style, or [`STYLE_UNUSED`].
    pub style_ids: [u16; STYLE_MAX],
    /// Absolute cell index of each used style's data block.
    pub cvt_offsets: [u16; STYLE_MAX],
    pub horz_width_counts: [u16; STYLE_MAX],
    pub vert_width_counts: [u16; STYLE_MAX],
    /// Blue pair count per style (the synthetic zones included).
    pub blue_counts: [u16; STYLE_MAX],
    /// Index of the x-height blue within a style's blue array, or
    /// [`STYLE_UNUSED`] when the style has none.
    pub blue_adjustment_offsets: [u16; STYLE_MAX],
    pub num_used_styles: u16,
    /// First per-style scale cell.
    pub scale_base: u16,
    /// First per-style (blue offset, blue count) cell.
    pub blue_data_base: u16,
    pub len_cells: u16,
}

impl CvtLayout {
    pub fn scale_cell(&self, style: usize) -> u16 {
        self.scale_base + self.style_ids[style]
    }

    pub fn std_hwidth_cell(&self, style: usize) -> u16 {
        self.cvt_offsets[style]
    }

    pub fn std_vwidth_cell(&self, style: usize) -> u16 {
        self.cvt_offsets[style] + 1 + self.horz_width_counts[style]
    }

    pub fn blue_ref_base(&self, style: usize) -> u16 {
        self.std_vwidth_cell(style) + 1 + self.vert_width_counts[style]
    }

    pub fn blue_shoot_base(&self, style: usize) -> u16 {
        self.blue_ref_base(style) + self.blue_counts[style]
    }

    /// Cells occupied by a style's data block.
    pub fn style_block_len(&self, style: usize) -> u16 {
        2 + self.horz_width_counts[style]
            + self.vert_width_counts[style]
            + 2 * self.blue_counts[style]
    }
}

/// The finished table plus its offset map.
pub struct CvtTable {
    pub data: Vec<u8>,
    pub layout: CvtLayout,
}

/// Default standard width for styles without extracted metrics.
pub fn default_width(upem: u16) -> i32 {
    50 * upem as i32 / 2048
}

/// Build the CVT by iterating all styles in their fixed order.
///
/// `resolve` runs the metrics extractor for one style. A
/// `MissingGlyph` result is recovered: the style is marked unused and
/// its coverage claims move to the fallback style. Any other error is
/// fatal. With no usable style at all, only a symbol font proceeds.
pub fn build_cvt(
    coverage: &mut Coverage,
    symbol: bool,
    upem: u16,
    mut resolve: impl FnMut(&'static StyleClass) -> Result<StyleMetrics>,
) -> Result<CvtTable> {
    let mut layout = CvtLayout {
        style_ids: [STYLE_UNUSED; STYLE_MAX],
        cvt_offsets: [0; STYLE_MAX],
        horz_width_counts: [0; STYLE_MAX],
        vert_width_counts: [0; STYLE_MAX],
        blue_counts: [0; STYLE_MAX],
        blue_adjustment_offsets: [STYLE_UNUSED; STYLE_MAX],
        num_used_styles: 0,
        scale_base: CVTL_MAX_RUNTIME,
        blue_data_base: 0,
        len_cells: 0,
    };

    let mut resolved: [Option<StyleMetrics>; STYLE_MAX] = Default::default();
    for (index, style) in STYLE_CLASSES.iter().enumerate() {
        match resolve(style) {
            Ok(metrics) => {
                layout.style_ids[index] = layout.num_used_styles;
                layout.num_used_styles += 1;
                resolved[index] = Some(metrics);
            }
            Err(HintError::MissingGlyph) => {
                warn!(
                    "style '{}' has no standard glyph; falling back",
                    style.name
                );
                coverage.strip_style(index);
            }
            Err(err) => return Err(err),
        }
    }

    if layout.num_used_styles == 0 && !symbol {
        return Err(HintError::MissingGlyph);
    }

    layout.blue_data_base = layout.scale_base + layout.num_used_styles;
    let data_base = layout.blue_data_base + 2 * layout.num_used_styles;

    let mut cells: Vec<i32> = vec![0; data_base as usize];
    for (index, metrics) in resolved.iter().enumerate() {
        let Some(metrics) = metrics else { continue };
        layout.cvt_offsets[index] = cells.len() as u16;

        let horizontal = metrics.horizontal();
        let vertical = metrics.vertical();
        layout.horz_width_counts[index] = horizontal.widths.len() as u16;
        layout.vert_width_counts[index] = vertical.widths.len() as u16;
        layout.blue_counts[index] = vertical.blues.len() as u16;

        for axis in [horizontal, vertical] {
            cells.push(*axis.widths.first().unwrap_or(&default_width(upem)));
            cells.extend_from_slice(&axis.widths);
        }
        for blue in &vertical.blues {
            cells.push(blue.ref_pos);
        }
        for (position, blue) in vertical.blues.iter().enumerate() {
            cells.push(blue.shoot_pos);
            if blue.flags & BLUE_ADJUSTMENT != 0 {
                layout.blue_adjustment_offsets[index] = position as u16;
            }
        }
    }

    if cells.len() > STYLE_UNUSED as usize {
        return Err(HintError::HinterOverflow);
    }
    layout.len_cells = cells.len() as u16;

    let mut data = Vec::with_capacity(cells.len() * 2);
    for cell in cells {
        if !(-0x8000..=0xFFFF).contains(&cell) {
            return Err(HintError::HinterOverflow);
        }
        data.extend_from_slice(&(cell as u16).to_be_bytes());
    }

    info!(
        "cvt: {} styles used, {} cells",
        layout.num_used_styles,
        layout.len_cells
    );
    Ok(CvtTable { data, layout })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{Blue, LatinAxis};
    use crate::options::FallbackScript;
    use crate::script::{BLUE_TOP, STYLE_LATIN, STYLE_NONE};

    fn latin_metrics() -> StyleMetrics {
        StyleMetrics {
            style: &STYLE_LATIN,
            axes: [
                LatinAxis { widths: vec![80, 120], blues: vec![] },
                LatinAxis {
                    widths: vec![70],
                    blues: vec![
                        Blue { ref_pos: 700, shoot_pos: 712, flags: BLUE_TOP },
                        Blue {
                            ref_pos: 520,
                            shoot_pos: 528,
                            flags: BLUE_TOP | BLUE_ADJUSTMENT,
                        },
                        Blue { ref_pos: 0, shoot_pos: -8, flags: 0 },
                    ],
                },
            ],
        }
    }

    fn resolve_all(style: &'static StyleClass) -> Result<StyleMetrics> {
        match style.script {
            Some(_) => Ok(latin_metrics()),
            None => Ok(StyleMetrics::synthetic(style)),
        }
    }

    fn cell(data: &[u8], index: u16) -> u16 {
        let i = index as usize * 2;
        u16::from_be_bytes([data[i], data[i + 1]])
    }

    #[test]
    fn layout_matches_written_image() {
        let mut coverage = Coverage::new(8, FallbackScript::None);
        let table = build_cvt(&mut coverage, false, 2048, resolve_all).unwrap();
        let layout = &table.layout;

        assert_eq!(layout.num_used_styles, 2);
        assert_eq!(layout.style_ids[STYLE_LATIN.index], 0);
        assert_eq!(layout.style_ids[STYLE_NONE.index], 1);

        // runtime scratch + 2 scale + 4 blue-data cells, then the
        // latin block
        let latin_base = CVTL_MAX_RUNTIME + 2 + 4;
        assert_eq!(layout.cvt_offsets[STYLE_LATIN.index], latin_base);

        // latin block: (1+2) h widths, (1+1) v widths, 2*3 blues
        assert_eq!(layout.style_block_len(STYLE_LATIN.index), 11);
        assert_eq!(
            layout.cvt_offsets[STYLE_NONE.index],
            latin_base + 11
        );
        // none style: default widths only
        assert_eq!(layout.style_block_len(STYLE_NONE.index), 2);
        assert_eq!(
            layout.len_cells as usize * 2,
            table.data.len()
        );

        // re-read the image through the offset map
        assert_eq!(cell(&table.data, layout.std_hwidth_cell(STYLE_LATIN.index)), 80);
        assert_eq!(cell(&table.data, layout.std_vwidth_cell(STYLE_LATIN.index)), 70);
        assert_eq!(cell(&table.data, layout.blue_ref_base(STYLE_LATIN.index)), 700);
        assert_eq!(
            cell(&table.data, layout.blue_shoot_base(STYLE_LATIN.index)),
            712
        );
        // negative shoots wrap into the signed 16-bit pattern
        assert_eq!(
            cell(&table.data, layout.blue_shoot_base(STYLE_LATIN.index) + 2),
            (-8i16) as u16
        );
        assert_eq!(layout.blue_adjustment_offsets[STYLE_LATIN.index], 1);

        let none_base = layout.cvt_offsets[STYLE_NONE.index];
        assert_eq!(cell(&table.data, none_base), default_width(2048) as u16);
    }

    #[test]
    fn missing_glyph_strips_the_style() {
        let mut coverage = Coverage::new(4, FallbackScript::None);
        coverage.assign(2, STYLE_LATIN.index);
        let table = build_cvt(&mut coverage, false, 1000, |style| match style.script {
            Some(_) => Err(HintError::MissingGlyph),
            None => Ok(StyleMetrics::synthetic(style)),
        })
        .unwrap();
        assert_eq!(table.layout.style_ids[STYLE_LATIN.index], STYLE_UNUSED);
        assert_eq!(table.layout.num_used_styles, 1);
        assert_eq!(coverage.style_of(2), STYLE_NONE.index);
    }

    #[test]
    fn no_styles_without_symbol_fails() {
        let mut coverage = Coverage::new(4, FallbackScript::None);
        let result = build_cvt(&mut coverage, false, 1000, |_| Err(HintError::MissingGlyph));
        assert!(matches!(result, Err(HintError::MissingGlyph)));

        let mut coverage = Coverage::new(4, FallbackScript::None);
        let result = build_cvt(&mut coverage, true, 1000, |_| Err(HintError::MissingGlyph));
        assert!(result.is_ok());
    }

    #[test]
    fn oversized_cells_overflow() {
        let mut coverage = Coverage::new(4, FallbackScript::None);
        let result = build_cvt(&mut coverage, false, 2048, |style| match style.script {
            Some(_) => {
                let mut metrics = latin_metrics();
                metrics.axes[0].widths = vec![0x1_0000];
                Ok(metrics)
            }
            None => Ok(StyleMetrics::synthetic(style)),
        });
        assert!(matches!(result, Err(HintError::HinterOverflow)));
    }
}
