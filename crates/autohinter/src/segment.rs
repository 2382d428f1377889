//! Segment construction and linking.
//!
//! A segment is a run of consecutive outline points that stays nearly
//! constant along the analyzed (primary) axis while moving
//! monotonically along the other one. Segments are the unit the edge
//! builder clusters and the unit the emitted bytecode aligns.

use crate::outline::{Outline, Point};

/// Which coordinate is analyzed (kept nearly constant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Primary coordinate x: vertical stems, horizontal widths.
    Horizontal,
    /// Primary coordinate y: horizontal edges, the hinted axis.
    Vertical,
}

impl Axis {
    pub fn primary(self, p: &Point) -> i32 {
        match self {
            Axis::Horizontal => p.x,
            Axis::Vertical => p.y,
        }
    }

    pub fn secondary(self, p: &Point) -> i32 {
        match self {
            Axis::Horizontal => p.y,
            Axis::Vertical => p.x,
        }
    }
}

/// Motion along the secondary axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Secondary coordinate increasing. With TrueType's clockwise outer
    /// contours (y up), the top side of a bar runs in this direction.
    Pos,
    Neg,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Pos => Direction::Neg,
            Direction::Neg => Direction::Pos,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Segment {
    /// First point index; for a wrap-around segment `last < first` and
    /// the span continues through the contour start.
    pub first: u16,
    pub last: u16,
    pub contour: u16,
    pub dir: Direction,
    /// Primary coordinate: midpoint of the segment's primary extrema.
    pub pos: i32,
    /// Secondary extent, for overlap tests.
    pub min_coord: i32,
    pub max_coord: i32,
    /// Whether a curve control point participates in the segment.
    pub round: bool,
    /// Mutual opposite-direction partner (a stem side).
    pub link: Option<u16>,
    /// One-way partner when the candidate chose someone else.
    pub serif: Option<u16>,
}

impl Segment {
    pub fn len(&self) -> i32 {
        self.max_coord - self.min_coord
    }

    pub fn is_wrapped(&self) -> bool {
        self.last < self.first
    }
}

/// Extract the segments of `outline` along `axis`.
///
/// `flat_threshold` bounds how far the primary coordinate may drift
/// within one segment (a small fraction of the unit square).
pub fn compute_segments(outline: &Outline, axis: Axis, flat_threshold: i32) -> Vec<Segment> {
    let mut segments = Vec::new();
    for (contour_index, contour) in outline.contours.iter().enumerate() {
        let first = contour.first as usize;
        let count = (contour.last - contour.first + 1) as usize;
        if count < 2 {
            continue;
        }
        let point = |i: usize| &outline.points[first + i % count];

        // Classify each move i -> i+1: None breaks a run; Some(ds) can
        // extend one when the direction stays consistent.
        let moves: Vec<Option<i32>> = (0..count)
            .map(|i| {
                let (a, b) = (point(i), point(i + 1));
                let dp = axis.primary(b) - axis.primary(a);
                let ds = axis.secondary(b) - axis.secondary(a);
                (dp.abs() <= flat_threshold).then_some(ds)
            })
            .collect();

        let compatible = |run_dir: Option<Direction>, ds: i32| match (run_dir, direction(ds)) {
            (_, None) => true,
            (None, Some(_)) => true,
            (Some(a), Some(b)) => a == b,
        };

        // Start scanning at a run boundary so a run crossing the
        // contour start is seen whole (as a wrap-around segment).
        let Some(start) = (0..count).find(|&i| {
            let prev = moves[(i + count - 1) % count];
            match (prev, moves[i]) {
                (None, Some(_)) => true,
                (Some(p), Some(c)) => !compatible(direction(p), c),
                _ => false,
            }
        }) else {
            // either no flat move at all, or one closed flat loop
            continue;
        };

        let mut i = 0usize;
        while i < count {
            let k = (start + i) % count;
            let Some(ds) = moves[k] else {
                i += 1;
                continue;
            };
            // open a run at move k
            let mut dir = direction(ds);
            let mut last = k + 1; // relative, may exceed count for wraps
            let mut pmin = axis.primary(point(k)).min(axis.primary(point(k + 1)));
            let mut pmax = axis.primary(point(k)).max(axis.primary(point(k + 1)));
            let mut steps = 1usize;
            while steps < count - i {
                let m = (k + steps) % count;
                let Some(ds) = moves[m] else { break };
                if !compatible(dir, ds) {
                    break;
                }
                let p = axis.primary(point(m + 1));
                if p.max(pmax) - p.min(pmin) > flat_threshold {
                    break;
                }
                if dir.is_none() {
                    dir = direction(ds);
                }
                pmin = pmin.min(p);
                pmax = pmax.max(p);
                last = m + 1;
                steps += 1;
            }
            if let Some(dir) = dir {
                let (mut smin, mut smax) = (i32::MAX, i32::MIN);
                let mut round = false;
                for j in k..=last {
                    let p = point(j);
                    smin = smin.min(axis.secondary(p));
                    smax = smax.max(axis.secondary(p));
                    round |= !p.on_curve;
                }
                segments.push(Segment {
                    first: (contour.first as usize + k % count) as u16,
                    last: (contour.first as usize + last % count) as u16,
                    contour: contour_index as u16,
                    dir,
                    pos: (pmin + pmax) / 2,
                    min_coord: smin,
                    max_coord: smax,
                    round,
                    link: None,
                    serif: None,
                });
            }
            // the breaking move may itself open the next run
            i += steps;
        }
    }
    segments
}

fn direction(ds: i32) -> Option<Direction> {
    match ds {
        0 => None,
        d if d > 0 => Some(Direction::Pos),
        _ => Some(Direction::Neg),
    }
}

/// Pair each segment with its closest opposite-direction partner.
///
/// Candidates must overlap along the secondary axis and sit within
/// `max_dist`; ties resolve toward the partner of comparable length.
/// Mutual choices become `link` (a stem), one-way choices `serif`.
pub fn link_segments(segments: &mut [Segment], max_dist: i32) {
    let mut best: Vec<Option<(usize, i32)>> = vec![None; segments.len()];
    for i in 0..segments.len() {
        for j in i + 1..segments.len() {
            let (a, b) = (&segments[i], &segments[j]);
            if a.dir != b.dir.opposite() {
                continue;
            }
            let overlap = a.max_coord.min(b.max_coord) - a.min_coord.max(b.min_coord);
            if overlap <= 0 {
                continue;
            }
            let dist = (a.pos - b.pos).abs();
            if dist > max_dist {
                continue;
            }
            let score = dist + (a.len() - b.len()).abs() / 8;
            for (this, other) in [(i, j), (j, i)] {
                if best[this].map_or(true, |(_, s)| score < s) {
                    best[this] = Some((other, score));
                }
            }
        }
    }
    for i in 0..segments.len() {
        let Some((candidate, _)) = best[i] else {
            continue;
        };
        if best[candidate].map(|(back, _)| back) == Some(i) {
            segments[i].link = Some(candidate as u16);
        } else {
            segments[i].serif = Some(candidate as u16);
        }
    }
}
