//! Glyph outline access for the analyzer.

use read_fonts::tables::glyf::{Glyf, Glyph as ReadGlyph};
use read_fonts::tables::loca::Loca;
use read_fonts::types::GlyphId;

use crate::error::Result;

/// One outline point in font units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
    pub on_curve: bool,
    /// Index of the contour this point belongs to.
    pub contour: u16,
}

/// A contour as a closed range of point indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contour {
    pub first: u16,
    pub last: u16,
}

/// A simple glyph's outline.
#[derive(Debug, Clone, Default)]
pub struct Outline {
    pub points: Vec<Point>,
    pub contours: Vec<Contour>,
}

impl Outline {
    /// The contour containing `point`.
    pub fn contour_of(&self, point: u16) -> Contour {
        self.contours[self.points[point as usize].contour as usize]
    }

    /// The next point along the contour, wrapping at its end.
    pub fn next_point(&self, point: u16) -> u16 {
        let contour = self.contour_of(point);
        if point == contour.last {
            contour.first
        } else {
            point + 1
        }
    }

    /// The previous point along the contour, wrapping at its start.
    pub fn prev_point(&self, point: u16) -> u16 {
        let contour = self.contour_of(point);
        if point == contour.first {
            contour.last
        } else {
            point - 1
        }
    }
}

/// A glyph as the hinter sees it.
#[derive(Debug)]
pub enum GlyphOutline {
    /// No contours; gets a minimal program.
    Empty,
    Simple(Outline),
    /// Components are hinted on their own; the composite itself is not.
    Composite,
}

/// Load a glyph's outline from the `glyf`/`loca` pair.
pub fn load_glyph(loca: &Loca, glyf: &Glyf, gid: GlyphId) -> Result<GlyphOutline> {
    let glyph = match loca.get_glyf(gid, glyf)? {
        Some(glyph) => glyph,
        None => return Ok(GlyphOutline::Empty),
    };
    match glyph {
        ReadGlyph::Simple(simple) => {
            let mut outline = Outline::default();
            let mut first = 0u16;
            for end in simple.end_pts_of_contours() {
                let last = end.get();
                outline.contours.push(Contour { first, last });
                first = last.wrapping_add(1);
            }
            let mut contour = 0u16;
            for (i, point) in simple.points().enumerate() {
                let i = i as u16;
                if i > outline.contours[contour as usize].last {
                    contour += 1;
                }
                outline.points.push(Point {
                    x: point.x as i32,
                    y: point.y as i32,
                    on_curve: point.on_curve,
                    contour,
                });
            }
            if outline.points.is_empty() {
                return Ok(GlyphOutline::Empty);
            }
            Ok(GlyphOutline::Simple(outline))
        }
        ReadGlyph::Composite(_) => Ok(GlyphOutline::Composite),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;

    #[test]
    fn contour_navigation_wraps() {
        let outline = outline_from_contours(&[&rect(0, 0, 100, 100), &rect(20, 20, 80, 80)]);
        assert_eq!(outline.contours.len(), 2);
        assert_eq!(outline.next_point(3), 0);
        assert_eq!(outline.prev_point(0), 3);
        assert_eq!(outline.next_point(7), 4);
        assert_eq!(outline.contour_of(5).first, 4);
    }
}
