//! Stem-width and blue-zone extraction.
//!
//! The values computed here, in font units, become the per-style CVT
//! blocks; the emitted bytecode compares scaled distances against them
//! at render time.

use log::debug;

use crate::outline::Outline;
use crate::script::{BlueString, ScriptClass, StyleClass, BLUE_TOP};
use crate::segment::{self, Axis};

/// Synthetic zone appended after the script's blues.
pub const BLUE_ARTIFICIAL: u8 = 0x80;

/// Keep no more widths than the bytecode can reasonably consult.
const MAX_WIDTHS: usize = 16;

/// A computed blue zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blue {
    pub ref_pos: i32,
    pub shoot_pos: i32,
    pub flags: u8,
}

impl Blue {
    pub fn is_top(&self) -> bool {
        self.flags & BLUE_TOP != 0
    }
}

/// Widths (and, on the vertical axis, blues) for one analysis axis.
#[derive(Debug, Clone, Default)]
pub struct LatinAxis {
    /// Stem widths sorted ascending; the first is the standard width.
    pub widths: Vec<i32>,
    pub blues: Vec<Blue>,
}

/// Everything the CVT builder stores for one style.
#[derive(Debug, Clone)]
pub struct StyleMetrics {
    pub style: &'static StyleClass,
    /// `axes[0]` is horizontal (x analysis), `axes[1]` vertical.
    pub axes: [LatinAxis; 2],
}

impl StyleMetrics {
    /// Metrics for a style with no usable standard glyph (symbol
    /// fonts) or no script at all: default widths, no blues.
    pub fn synthetic(style: &'static StyleClass) -> Self {
        Self {
            style,
            axes: [LatinAxis::default(), LatinAxis::default()],
        }
    }

    pub fn horizontal(&self) -> &LatinAxis {
        &self.axes[0]
    }

    pub fn vertical(&self) -> &LatinAxis {
        &self.axes[1]
    }
}

/// How far the primary coordinate may drift inside one segment.
pub fn flat_threshold(upem: u16) -> i32 {
    (upem as i32 / 64).max(4)
}

/// Window for segment linking.
pub fn link_distance(upem: u16) -> i32 {
    upem as i32 / 2
}

/// Matching distance for blue zones and edge/blue comparisons.
pub fn blue_fuzz(upem: u16) -> i32 {
    (upem as i32 / 64).max(2)
}

/// Coalescing distance for edge formation.
pub fn edge_threshold(upem: u16) -> i32 {
    (upem as i32 / 50).max(4)
}

/// Derive stem widths from the standard glyph along one axis.
///
/// Every mutually linked segment pair contributes the distance between
/// its two positions; near-duplicates collapse and the result is
/// sorted ascending.
pub fn widths_from_outline(outline: &Outline, axis: Axis, upem: u16) -> Vec<i32> {
    let mut segments = segment::compute_segments(outline, axis, flat_threshold(upem));
    segment::link_segments(&mut segments, link_distance(upem));

    let mut widths = Vec::new();
    for (i, seg) in segments.iter().enumerate() {
        let Some(link) = seg.link else { continue };
        if (link as usize) < i {
            continue; // count each pair once
        }
        let width = (seg.pos - segments[link as usize].pos).abs();
        if width > 0 {
            widths.push(width);
        }
    }
    widths.sort_unstable();
    dedup_widths(&mut widths, (upem as i32 / 100).max(1));
    widths.truncate(MAX_WIDTHS);
    widths
}

fn dedup_widths(widths: &mut Vec<i32>, distance: i32) {
    widths.dedup_by(|a, b| (*a - *b).abs() <= distance);
}

/// Derive the blue zones from the script's reference characters.
///
/// `load_char` resolves a character to its outline (None when the font
/// does not cover it).
pub fn blues_from_chars(
    script: &ScriptClass,
    mut load_char: impl FnMut(char) -> Option<Outline>,
    upem: u16,
) -> Vec<Blue> {
    let fuzz = blue_fuzz(upem);
    let mut blues = Vec::new();

    for def in script.blues {
        let mut flats = Vec::new();
        let mut rounds = Vec::new();
        for ch in def.chars.chars() {
            let Some(outline) = load_char(ch) else {
                continue;
            };
            let Some((pos, round)) = extremum(&outline, def) else {
                continue;
            };
            if round {
                rounds.push(pos);
            } else {
                flats.push(pos);
            }
        }
        if flats.is_empty() && rounds.is_empty() {
            continue;
        }
        let ref_pos = mean(if flats.is_empty() { &rounds } else { &flats });
        let mut shoot_pos = mean(if rounds.is_empty() { &flats } else { &rounds });
        // the shoot overshoots the reference; never the other way round
        if def.is_top() {
            shoot_pos = shoot_pos.max(ref_pos).min(ref_pos + fuzz);
        } else {
            shoot_pos = shoot_pos.min(ref_pos).max(ref_pos - fuzz);
        }
        debug!(
            "blue zone '{}': ref {} shoot {}",
            def.chars, ref_pos, shoot_pos
        );
        blues.push(Blue {
            ref_pos,
            shoot_pos,
            flags: def.flags,
        });
    }

    // two synthetic zones replicating the reference line, kept at the
    // end of the per-style array
    let baseline = blues
        .iter()
        .find(|b| !b.is_top())
        .map(|b| b.ref_pos)
        .unwrap_or(0);
    for _ in 0..2 {
        blues.push(Blue {
            ref_pos: baseline,
            shoot_pos: baseline,
            flags: BLUE_ARTIFICIAL,
        });
    }
    blues
}

/// The outline's extremum along y for `def`'s side, plus whether the
/// extremum is formed by a curve rather than a flat.
fn extremum(outline: &Outline, def: &BlueString) -> Option<(i32, bool)> {
    let best = if def.is_top() {
        outline.points.iter().enumerate().max_by_key(|(_, p)| p.y)
    } else {
        outline.points.iter().enumerate().min_by_key(|(_, p)| p.y)
    };
    let (index, point) = best?;
    let index = index as u16;
    let prev = outline.points[outline.prev_point(index) as usize];
    let next = outline.points[outline.next_point(index) as usize];
    let round = !point.on_curve || !prev.on_curve || !next.on_curve;
    Some((point.y, round))
}

fn mean(values: &[i32]) -> i32 {
    debug_assert!(!values.is_empty());
    let sum: i64 = values.iter().map(|&v| v as i64).sum();
    (sum / values.len() as i64) as i32
}

/// Compute a style's metrics from its resolved standard glyph.
pub fn compute_style_metrics(
    style: &'static StyleClass,
    standard_glyph: &Outline,
    load_char: impl FnMut(char) -> Option<Outline>,
    upem: u16,
) -> StyleMetrics {
    let script = style
        .script
        .expect("styles without a script use synthetic metrics");
    let horizontal = LatinAxis {
        widths: widths_from_outline(standard_glyph, Axis::Horizontal, upem),
        blues: Vec::new(),
    };
    let vertical = LatinAxis {
        widths: widths_from_outline(standard_glyph, Axis::Vertical, upem),
        blues: blues_from_chars(script, load_char, upem),
    };
    debug!(
        "style '{}': {} horizontal widths, {} vertical widths, {} blues",
        style.name,
        horizontal.widths.len(),
        vertical.widths.len(),
        vertical.blues.len()
    );
    StyleMetrics {
        style,
        axes: [horizontal, vertical],
    }
}
