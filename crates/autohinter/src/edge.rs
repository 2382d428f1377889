//! Edge formation and classification.
//!
//! Segments whose positions nearly coincide cluster into an edge; the
//! planner then reasons about edges only. Edges are kept strictly
//! sorted by position.

use crate::metrics::Blue;
use crate::segment::{Direction, Segment};

#[derive(Debug, Clone)]
pub struct Edge {
    /// Position along the hinted axis (font units).
    pub pos: i32,
    /// Original position; `pos` starts out equal to it.
    pub opos: i32,
    /// Member segments, in cluster order.
    pub segments: Vec<u16>,
    pub dir: Direction,
    /// A curve participates in the edge.
    pub round: bool,
    /// Stem partner edge.
    pub link: Option<u16>,
    /// Base edge a serif hangs off.
    pub serif: Option<u16>,
    /// Matched blue zone (index into the style's blue array).
    pub blue: Option<usize>,
}

impl Edge {
    pub fn is_serif(&self) -> bool {
        self.link.is_none() && self.serif.is_some()
    }
}

/// Cluster segments into edges.
///
/// Returns the edges sorted by position and the segment-to-edge map.
pub fn compute_edges(segments: &[Segment], threshold: i32) -> (Vec<Edge>, Vec<u16>) {
    let mut order: Vec<usize> = (0..segments.len()).collect();
    order.sort_by_key(|&i| segments[i].pos);

    let mut edges: Vec<Edge> = Vec::new();
    let mut seg_to_edge = vec![0u16; segments.len()];
    for &seg_index in &order {
        let seg = &segments[seg_index];
        match edges.last_mut() {
            Some(edge) if (seg.pos - edge.pos).abs() <= threshold => {
                edge.segments.push(seg_index as u16);
                edge.round |= seg.round;
                seg_to_edge[seg_index] = edges.len() as u16 - 1;
            }
            _ => {
                seg_to_edge[seg_index] = edges.len() as u16;
                edges.push(Edge {
                    pos: seg.pos,
                    opos: seg.pos,
                    segments: vec![seg_index as u16],
                    dir: seg.dir,
                    round: seg.round,
                    link: None,
                    serif: None,
                    blue: None,
                });
            }
        }
    }
    (edges, seg_to_edge)
}

/// Propagate segment links to the edge level.
///
/// The first mutually linked member decides the stem partner; segments
/// that only link one way contribute a serif base instead.
pub fn compute_edge_links(edges: &mut [Edge], segments: &[Segment], seg_to_edge: &[u16]) {
    for index in 0..edges.len() {
        let mut link = None;
        let mut serif = None;
        for &seg_index in &edges[index].segments {
            let seg = &segments[seg_index as usize];
            if let Some(partner) = seg.link {
                let partner_edge = seg_to_edge[partner as usize];
                if partner_edge as usize != index {
                    link.get_or_insert(partner_edge);
                }
            } else if let Some(base) = seg.serif {
                let base_edge = seg_to_edge[base as usize];
                if base_edge as usize != index {
                    serif.get_or_insert(base_edge);
                }
            }
        }
        edges[index].link = link;
        edges[index].serif = if link.is_none() { serif } else { None };
    }
}

/// Mark edges sitting on a blue zone.
///
/// Top zones only capture edges running in the top direction; a round
/// edge compares against the shoot, a flat one against the reference.
/// The synthetic zones at the end of the array never capture edges.
pub fn compute_blue_edges(edges: &mut [Edge], blues: &[Blue], fuzz: i32) {
    for edge in edges.iter_mut() {
        let mut best: Option<(usize, i32)> = None;
        for (index, blue) in blues.iter().enumerate() {
            if blue.flags & crate::metrics::BLUE_ARTIFICIAL != 0 {
                continue;
            }
            let wanted_dir = if blue.is_top() {
                Direction::Pos
            } else {
                Direction::Neg
            };
            if edge.dir != wanted_dir {
                continue;
            }
            let target = if edge.round {
                blue.shoot_pos
            } else {
                blue.ref_pos
            };
            let dist = (edge.opos - target).abs();
            if dist <= fuzz && best.map_or(true, |(_, d)| dist < d) {
                best = Some((index, dist));
            }
        }
        edge.blue = best.map(|(index, _)| index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::blue_fuzz;
    use crate::outline::test_support::*;
    use crate::script::BLUE_TOP;
    use crate::segment::{compute_segments, link_segments, Axis};

    fn analyze(outline: &crate::outline::Outline) -> (Vec<Edge>, Vec<Segment>, Vec<u16>) {
        let mut segments = compute_segments(outline, Axis::Vertical, 10);
        link_segments(&mut segments, 500);
        let (mut edges, seg_to_edge) = compute_edges(&segments, 20);
        compute_edge_links(&mut edges, &segments, &seg_to_edge);
        (edges, segments, seg_to_edge)
    }

    #[test]
    fn edges_are_strictly_sorted() {
        let outer = rect(0, 0, 600, 500);
        let mut inner = rect(80, 80, 520, 420);
        inner.reverse();
        let outline = outline_from_contours(&[&outer, &inner]);
        let (edges, _, seg_to_edge) = analyze(&outline);
        assert_eq!(edges.len(), 4);
        assert!(edges.windows(2).all(|w| w[0].pos < w[1].pos));
        // every segment belongs to exactly one edge
        for (seg, &edge) in seg_to_edge.iter().enumerate() {
            assert!(edges[edge as usize].segments.contains(&(seg as u16)));
        }
        let member_count: usize = edges.iter().map(|e| e.segments.len()).sum();
        assert_eq!(member_count, seg_to_edge.len());
    }

    #[test]
    fn close_segments_coalesce() {
        // two bars whose tops differ by less than the threshold
        let outline = outline_from_contours(&[
            &rect(0, 0, 100, 101),
            &rect(200, 0, 300, 108),
        ]);
        let segments = compute_segments(&outline, Axis::Vertical, 10);
        let (edges, _) = compute_edges(&segments, 20);
        assert_eq!(edges.len(), 2); // both bottoms at 0, both tops near 104
    }

    #[test]
    fn stem_partners_become_edge_links() {
        let outline = outline_from_contours(&[&rect(0, 0, 100, 20)]);
        let (edges, _, _) = analyze(&outline);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].link, Some(1));
        assert_eq!(edges[1].link, Some(0));
        assert!(!edges[0].is_serif());
    }

    #[test]
    fn blue_matching_respects_direction_and_fuzz() {
        let outline = outline_from_contours(&[&rect(0, 0, 400, 700)]);
        let (mut edges, _, _) = analyze(&outline);
        let blues = [
            Blue { ref_pos: 705, shoot_pos: 715, flags: BLUE_TOP },
            Blue { ref_pos: 0, shoot_pos: -10, flags: 0 },
        ];
        compute_blue_edges(&mut edges, &blues, blue_fuzz(1000));
        let top = edges.iter().find(|e| e.pos == 700).unwrap();
        let bottom = edges.iter().find(|e| e.pos == 0).unwrap();
        assert_eq!(top.blue, Some(0));
        assert_eq!(bottom.blue, Some(1));

        // out of fuzz range: no match
        let far = [Blue { ref_pos: 800, shoot_pos: 810, flags: BLUE_TOP }];
        compute_blue_edges(&mut edges, &far, blue_fuzz(1000));
        assert!(edges.iter().all(|e| e.blue.is_none()));
    }
}
