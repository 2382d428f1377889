//! The hinting planner.
//!
//! Produces the per-glyph action list in three passes: blue-aligned
//! edges first, then stems relative to the anchor, then serifs and the
//! leftover point interpolation groups.

use log::debug;

use crate::action::Action;
use crate::edge::Edge;
use crate::outline::Outline;
use crate::segment::Segment;

pub struct PlanParams {
    /// CVT index of the active style's first blue reference cell.
    pub blue_cvt_base: u16,
    /// Below this distance a placed neighbor becomes a bound.
    pub bound_threshold: i32,
    /// Matching distance for the on-edge point classification.
    pub blue_fuzz: i32,
}

/// Plan the grid fit of one glyph.
pub fn plan_glyph(
    outline: &Outline,
    edges: &[Edge],
    segments: &[Segment],
    params: &PlanParams,
) -> Vec<Action> {
    if edges.is_empty() {
        return Vec::new();
    }

    let mut actions = Vec::new();
    let mut assigned = vec![false; edges.len()];
    let mut anchor: Option<u16> = None;

    // blue pass: edges on a blue zone anchor the glyph
    for (index, edge) in edges.iter().enumerate() {
        let Some(blue) = edge.blue else { continue };
        let blue_cvt = params.blue_cvt_base + blue as u16;
        let edge = index as u16;
        if anchor.is_none() {
            anchor = Some(edge);
            actions.push(Action::BlueAnchor { edge, blue_cvt });
        } else {
            actions.push(Action::Blue { edge, blue_cvt });
        }
        assigned[index] = true;
    }

    // stem pass
    for index in 0..edges.len() {
        if assigned[index] {
            continue;
        }
        let edge = index as u16;
        if let Some(partner) = edges[index].link {
            let partner_index = partner as usize;
            if anchor.is_none() {
                // the partner is placed by the anchor but its points
                // only follow through a later adjust
                anchor = Some(edge);
                actions.push(Action::Anchor { edge, edge2: partner });
                assigned[index] = true;
            } else if assigned[partner_index] {
                let lower = lower_bound(edges, &assigned, index, params);
                actions.push(Action::Adjust { edge, edge2: partner, lower });
                assigned[index] = true;
            } else {
                let lower = lower_bound(edges, &assigned, index, params);
                actions.push(Action::Stem { edge, edge2: partner, lower });
                assigned[index] = true;
                assigned[partner_index] = true;
            }
        } else if let Some(base) = edges[index].serif {
            if assigned[base as usize] {
                actions.push(Action::Link { edge, base });
                assigned[index] = true;
            }
        }
    }

    // serif pass: everything still unplaced
    for index in 0..edges.len() {
        if assigned[index] {
            continue;
        }
        let edge = index as u16;
        let lower = lower_bound(edges, &assigned, index, params);
        let upper = upper_bound(edges, &assigned, index, params);
        let action = match edges[index].serif {
            Some(base) if assigned[base as usize] => Action::Serif {
                serif: edge,
                base,
                lower,
                upper,
            },
            _ => {
                let before = (0..index).rev().find(|&i| assigned[i]).map(|i| i as u16);
                let after = (index + 1..edges.len()).find(|&i| assigned[i]).map(|i| i as u16);
                match (before, after) {
                    (Some(before), Some(after)) => Action::SerifLink1 {
                        edge,
                        before,
                        after,
                        lower,
                        upper,
                    },
                    _ if anchor.is_some() => Action::SerifLink2 { edge, lower, upper },
                    _ => {
                        anchor = Some(edge);
                        Action::SerifAnchor { edge, lower, upper }
                    }
                }
            }
        };
        actions.push(action);
        assigned[index] = true;
    }

    plan_strong_points(outline, edges, segments, params, &mut actions);

    debug!("planned {} actions over {} edges", actions.len(), edges.len());
    actions
}

fn lower_bound(
    edges: &[Edge],
    assigned: &[bool],
    index: usize,
    params: &PlanParams,
) -> Option<u16> {
    if index == 0 || !assigned[index - 1] {
        return None;
    }
    (edges[index].pos - edges[index - 1].pos < params.bound_threshold)
        .then_some(index as u16 - 1)
}

fn upper_bound(
    edges: &[Edge],
    assigned: &[bool],
    index: usize,
    params: &PlanParams,
) -> Option<u16> {
    if index + 1 >= edges.len() || !assigned[index + 1] {
        return None;
    }
    (edges[index + 1].pos - edges[index].pos < params.bound_threshold)
        .then_some(index as u16 + 1)
}

/// Group the strong points that belong to no segment into the four
/// interpolation actions.
fn plan_strong_points(
    outline: &Outline,
    edges: &[Edge],
    segments: &[Segment],
    params: &PlanParams,
    actions: &mut Vec<Action>,
) {
    let mut in_segment = vec![false; outline.points.len()];
    for seg in segments {
        let contour = outline.contours[seg.contour as usize];
        let mut p = seg.first;
        loop {
            in_segment[p as usize] = true;
            if p == seg.last {
                break;
            }
            p = if p == contour.last { contour.first } else { p + 1 };
        }
    }

    let mut before: Vec<u16> = Vec::new();
    let mut after: Vec<u16> = Vec::new();
    let mut on: Vec<(u16, Vec<u16>)> = Vec::new();
    let mut between: Vec<(u16, u16, Vec<u16>)> = Vec::new();

    let first_edge = 0u16;
    let last_edge = (edges.len() - 1) as u16;

    for (index, point) in outline.points.iter().enumerate() {
        if in_segment[index] || !point.on_curve {
            continue;
        }
        let prev = outline.points[outline.prev_point(index as u16) as usize];
        let next = outline.points[outline.next_point(index as u16) as usize];
        let is_extremum =
            (point.y > prev.y && point.y > next.y) || (point.y < prev.y && point.y < next.y);
        if !is_extremum {
            continue;
        }
        let index = index as u16;
        let y = point.y;

        // on an edge coordinate?
        if let Some(edge) = edges
            .iter()
            .position(|e| (e.opos - y).abs() <= params.blue_fuzz)
        {
            let edge = edge as u16;
            match on.iter_mut().find(|(e, _)| *e == edge) {
                Some((_, points)) => points.push(index),
                None => on.push((edge, vec![index])),
            }
            continue;
        }
        if y < edges[0].opos {
            before.push(index);
        } else if y > edges[last_edge as usize].opos {
            after.push(index);
        } else {
            let below = edges.iter().rposition(|e| e.opos < y).unwrap_or(0) as u16;
            let above = edges
                .iter()
                .position(|e| e.opos > y)
                .unwrap_or(edges.len() - 1) as u16;
            match between.iter_mut().find(|(b, a, _)| *b == below && *a == above) {
                Some((_, _, points)) => points.push(index),
                None => between.push((below, above, vec![index])),
            }
        }
    }

    if !before.is_empty() {
        actions.push(Action::IpBefore { edge: first_edge, points: before });
    }
    if !after.is_empty() {
        actions.push(Action::IpAfter { edge: last_edge, points: after });
    }
    if !on.is_empty() {
        actions.push(Action::IpOn { groups: on });
    }
    if !between.is_empty() {
        actions.push(Action::IpBetween { groups: between });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, Bound};
    use crate::edge;
    use crate::metrics::Blue;
    use crate::outline::test_support::*;
    use crate::script::BLUE_TOP;
    use crate::segment::{self, Axis};

    fn params() -> PlanParams {
        PlanParams {
            blue_cvt_base: 64,
            bound_threshold: 60,
            blue_fuzz: 15,
        }
    }

    fn analyze(
        outline: &Outline,
        blues: &[Blue],
    ) -> (Vec<Edge>, Vec<Segment>) {
        let mut segments = segment::compute_segments(outline, Axis::Vertical, 10);
        segment::link_segments(&mut segments, 500);
        let (mut edges, seg_to_edge) = edge::compute_edges(&segments, 20);
        edge::compute_edge_links(&mut edges, &segments, &seg_to_edge);
        edge::compute_blue_edges(&mut edges, blues, 15);
        (edges, segments)
    }

    #[test]
    fn empty_outline_plans_nothing() {
        let outline = Outline::default();
        let actions = plan_glyph(&outline, &[], &[], &params());
        assert!(actions.is_empty());
    }

    #[test]
    fn first_blue_edge_becomes_the_anchor() {
        let outline = outline_from_contours(&[&rect(0, 0, 400, 700)]);
        let blues = [
            Blue { ref_pos: 0, shoot_pos: 0, flags: 0 },
            Blue { ref_pos: 700, shoot_pos: 710, flags: BLUE_TOP },
        ];
        let (edges, segments) = analyze(&outline, &blues);
        let actions = plan_glyph(&outline, &edges, &segments, &params());
        assert_eq!(actions[0].kind(), ActionKind::BlueAnchor);
        assert!(matches!(actions[0], Action::BlueAnchor { blue_cvt: 64, .. }));
        assert_eq!(actions[1].kind(), ActionKind::Blue);
        assert!(matches!(actions[1], Action::Blue { blue_cvt: 65, .. }));
    }

    #[test]
    fn stem_without_blues_gets_an_anchor() {
        let outline = outline_from_contours(&[&rect(0, 0, 400, 80)]);
        let (edges, segments) = analyze(&outline, &[]);
        let actions = plan_glyph(&outline, &edges, &segments, &params());
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].kind(), ActionKind::Anchor);
        // the anchor's partner follows with an adjust of its own
        assert_eq!(actions[1].kind(), ActionKind::Adjust);
    }

    #[test]
    fn second_stem_follows_the_anchor() {
        // two stacked bars, far enough apart to avoid bounds
        let outline = outline_from_contours(&[
            &rect(0, 0, 400, 80),
            &rect(0, 300, 400, 380),
        ]);
        let (edges, segments) = analyze(&outline, &[]);
        let actions = plan_glyph(&outline, &edges, &segments, &params());
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0].kind(), ActionKind::Anchor);
        assert_eq!(actions[1].kind(), ActionKind::Adjust);
        assert_eq!(actions[2].kind(), ActionKind::Stem);
        assert_eq!(actions[2].bound(), Bound::None);
    }

    #[test]
    fn close_stems_pick_up_bounds() {
        let outline = outline_from_contours(&[
            &rect(0, 0, 400, 80),
            &rect(0, 120, 400, 200),
        ]);
        let (edges, segments) = analyze(&outline, &[]);
        let actions = plan_glyph(&outline, &edges, &segments, &params());
        let stem = actions.iter().find(|a| a.kind() == ActionKind::Stem).unwrap();
        assert_eq!(stem.bound(), Bound::Lower);
        // the bounding edge precedes the operand edge
        if let Action::Stem { edge, lower: Some(lower), .. } = stem {
            assert!(lower < edge);
        } else {
            panic!("expected a bounded stem");
        }
    }

    #[test]
    fn partner_of_a_blue_edge_is_adjusted() {
        let outline = outline_from_contours(&[&rect(0, 0, 400, 80)]);
        let blues = [Blue { ref_pos: 0, shoot_pos: 0, flags: 0 }];
        let (edges, segments) = analyze(&outline, &blues);
        let actions = plan_glyph(&outline, &edges, &segments, &params());
        assert_eq!(actions[0].kind(), ActionKind::BlueAnchor);
        assert_eq!(actions[1].kind(), ActionKind::Adjust);
    }

    #[test]
    fn serif_with_a_placed_base_links_to_it() {
        // a bar plus a triangular stub whose flat underside has no
        // partner of its own: its one-way candidate is the bar's top,
        // which pairs with the bar's bottom, so the stub edge ends up
        // serif-linked to an edge the stem pass has already placed
        let bar = rect(0, 0, 400, 80);
        let stub = [(150, 300, true), (200, 360, true), (250, 300, true)];
        let outline = outline_from_contours(&[&bar, &stub]);
        let (edges, segments) = analyze(&outline, &[]);

        let serif_edge = edges
            .iter()
            .position(|e| e.is_serif())
            .expect("expected a serif edge") as u16;
        assert_eq!(edges[serif_edge as usize].serif, Some(1));

        let actions = plan_glyph(&outline, &edges, &segments, &params());
        let link = actions
            .iter()
            .find(|a| a.kind() == ActionKind::Link)
            .expect("expected a link action");
        let Action::Link { edge, base } = link else {
            unreachable!()
        };
        assert_eq!(*edge, serif_edge);
        assert_eq!(*base, 1);
        // the base was placed before the link was planned
        let base_action = actions
            .iter()
            .position(|a| matches!(a, Action::Adjust { edge: 1, .. }))
            .unwrap();
        let link_action = actions.iter().position(|a| *a == *link).unwrap();
        assert!(base_action < link_action);

        // the stack image comes back to the same edges
        let args = crate::tables::glyf::encode_action(link, &edges);
        let point_to_edge = |point: i32| -> u16 {
            edges
                .iter()
                .position(|e| e.segments[0] as i32 == point)
                .unwrap() as u16
        };
        let n = args.len();
        assert_eq!(point_to_edge(args[n - 3]), *edge);
        assert_eq!(point_to_edge(args[n - 4]), *base);
        // a serif links to its base: stem_is_serif set, base not round
        assert_eq!(args[n - 1], 1);
        assert_eq!(args[n - 2], 0);
    }

    #[test]
    fn strong_points_between_edges_interpolate() {
        // a bar with a lone on-curve extremum floating between edges
        // (a separate single-segment contour keeps it out of segments)
        let bar = rect(0, 0, 400, 300);
        let spike = [(150, 100, true), (200, 160, true), (250, 100, true)];
        let outline = outline_from_contours(&[&bar, &spike]);
        let (edges, segments) = analyze(&outline, &[]);
        let actions = plan_glyph(&outline, &edges, &segments, &params());
        let ip = actions
            .iter()
            .find(|a| a.kind() == ActionKind::IpBetween)
            .expect("expected an interpolation group");
        if let Action::IpBetween { groups } = ip {
            assert_eq!(groups.len(), 1);
            let (below, above, points) = &groups[0];
            assert!(below < above);
            assert_eq!(points.len(), 1);
        }
    }
}
