//! Glyph program emission and `glyf`/`loca` reconstruction.
//!
//! Outlines pass through unchanged; only the per-glyph instruction
//! streams are replaced. A hinted glyph's program pushes its segment
//! ranges, builds the twilight representation, then funnels the action
//! list through the `fpgm` driver; unhinted glyphs just rescale.

use read_fonts::tables::glyf::Glyph as ReadGlyph;
use read_fonts::TableProvider;
use write_fonts::tables::glyf::{
    Anchor, Bbox, Component, ComponentFlags, CompositeGlyph, Contour, Glyf, GlyfLocaBuilder,
    Glyph, SimpleGlyph, Transform,
};
use write_fonts::tables::loca::{Loca, LocaFormat};

use crate::action::Action;
use crate::bytecode::{op, Bytecode};
use crate::edge::Edge;
use crate::error::Result;
use crate::font::Font;
use crate::outline::Outline;
use crate::segment::Segment;
use crate::tables::fpgm::{action_function, Func};

/// The twilight point standing in for an edge: its first segment's
/// hinted twilight index.
pub fn edge_point(edges: &[Edge], edge: u16) -> i32 {
    edges[edge as usize].segments[0] as i32
}

/// Arguments for `align_segments`, covering one edge's members.
fn align_block(edges: &[Edge], edge: u16) -> Vec<i32> {
    let segments = &edges[edge as usize].segments;
    let mut block: Vec<i32> = segments[1..].iter().rev().map(|&s| s as i32).collect();
    block.push(segments.len() as i32 - 1);
    block.push(segments[0] as i32);
    block
}

/// Serialize one action into its stack image (in push order).
pub fn encode_action(action: &Action, edges: &[Edge]) -> Vec<i32> {
    let pt = |edge: &u16| edge_point(edges, *edge);
    let mut args = Vec::new();
    match action {
        Action::IpBefore { edge, points } | Action::IpAfter { edge, points } => {
            args.extend(points.iter().map(|&p| p as i32));
            args.push(points.len() as i32);
            args.push(pt(edge));
        }
        Action::IpOn { groups } => {
            for (edge, points) in groups.iter().rev() {
                args.extend(points.iter().map(|&p| p as i32));
                args.push(points.len() as i32);
                args.push(pt(edge));
            }
            args.push(groups.len() as i32);
        }
        Action::IpBetween { groups } => {
            for (before, after, points) in groups.iter().rev() {
                args.extend(points.iter().map(|&p| p as i32));
                args.push(points.len() as i32);
                args.push(pt(before));
                args.push(pt(after));
            }
            args.push(groups.len() as i32);
        }
        Action::Adjust { edge, edge2, lower } => {
            args.extend(align_block(edges, *edge));
            args.extend(lower.iter().map(pt));
            args.push(pt(edge2));
            args.push(pt(edge));
            args.push(edges[*edge as usize].round as i32);
            args.push(edges[*edge2 as usize].is_serif() as i32);
        }
        Action::Stem { edge, edge2, lower } => {
            args.extend(align_block(edges, *edge2));
            args.extend(align_block(edges, *edge));
            args.extend(lower.iter().map(pt));
            args.push(pt(edge2));
            args.push(pt(edge));
            args.push(edges[*edge as usize].round as i32);
            args.push(edges[*edge2 as usize].is_serif() as i32);
        }
        Action::Link { edge, base } => {
            args.extend(align_block(edges, *edge));
            args.push(pt(base));
            args.push(pt(edge));
            args.push(edges[*base as usize].round as i32);
            args.push(edges[*edge as usize].is_serif() as i32);
        }
        Action::Anchor { edge, edge2 } => {
            args.extend(align_block(edges, *edge));
            args.push(pt(edge2));
            args.push(pt(edge));
            args.push(edges[*edge as usize].round as i32);
            args.push(edges[*edge2 as usize].is_serif() as i32);
        }
        Action::BlueAnchor { edge, blue_cvt } => {
            args.extend(align_block(edges, *edge));
            args.push(pt(edge));
            args.push(*blue_cvt as i32);
            args.push(pt(edge));
        }
        Action::Blue { edge, blue_cvt } => {
            args.extend(align_block(edges, *edge));
            args.push(pt(edge));
            args.push(*blue_cvt as i32);
        }
        Action::Serif { serif, base, lower, upper } => {
            args.extend(align_block(edges, *serif));
            args.extend(lower.iter().map(pt));
            args.extend(upper.iter().map(pt));
            args.push(pt(base));
            args.push(pt(serif));
        }
        Action::SerifAnchor { edge, lower, upper }
        | Action::SerifLink2 { edge, lower, upper } => {
            args.extend(align_block(edges, *edge));
            args.extend(lower.iter().map(pt));
            args.extend(upper.iter().map(pt));
            args.push(pt(edge));
        }
        Action::SerifLink1 { edge, before, after, lower, upper } => {
            args.extend(align_block(edges, *edge));
            args.extend(lower.iter().map(pt));
            args.extend(upper.iter().map(pt));
            args.push(pt(after));
            args.push(pt(edge));
            args.push(pt(before));
        }
    }
    args
}

/// Compile the program of a hinted glyph.
pub fn compile_hinted_program(
    outline: &Outline,
    segments: &[Segment],
    edges: &[Edge],
    actions: &[Action],
) -> Bytecode {
    let mut bc = Bytecode::new();
    if segments.is_empty() {
        return compile_scale_program(outline);
    }

    // segment ranges, reversed so segment 0 surfaces first
    for seg in segments.iter().rev() {
        if seg.is_wrapped() {
            let contour = outline.contours[seg.contour as usize];
            bc.push(&[
                contour.first as i32,
                contour.last as i32,
                seg.last as i32,
                seg.first as i32,
            ]);
        } else {
            bc.push(&[seg.last as i32, seg.first as i32]);
        }
    }
    bc.push1(segments.len() as i32);
    bc.push1(Func::CreateSegments.id());
    bc.op_with(op::CALL, 1, 0);

    for action in actions.iter().rev() {
        bc.push(&encode_action(action, edges));
        bc.push1(action_function(action.kind(), action.bound()).id());
    }
    bc.push1(actions.len() as i32);
    bc.push1(Func::HintGlyph.id());
    bc.op_with(op::CALL, 1, 0);
    bc
}

/// Compile the scale-only program of an unhinted glyph.
pub fn compile_scale_program(outline: &Outline) -> Bytecode {
    let mut bc = Bytecode::new();
    if outline.contours.is_empty() {
        bc.op(op::IUP_Y);
        return bc;
    }
    for contour in outline.contours.iter().rev() {
        let range = contour.first..=contour.last;
        let min = range
            .clone()
            .min_by_key(|&p| outline.points[p as usize].y)
            .unwrap_or(contour.first);
        let max = range
            .max_by_key(|&p| outline.points[p as usize].y)
            .unwrap_or(contour.first);
        bc.push(&[max as i32, min as i32]);
    }
    bc.push1(outline.contours.len() as i32);
    bc.push1(Func::ScaleGlyph.id());
    bc.op_with(op::CALL, 1, 0);
    bc
}

/// Rebuild `glyf` and `loca` with the new instruction streams.
///
/// `programs[gid]` is the instruction stream for that glyph; composite
/// glyphs keep their components and carry no instructions, since every
/// component is hinted on its own.
pub fn rebuild_glyf(font: &Font, programs: &[Vec<u8>]) -> Result<(Glyf, Loca, LocaFormat)> {
    let glyf = font.font_ref().glyf()?;
    let loca = font.font_ref().loca(None)?;
    let mut builder = GlyfLocaBuilder::new();

    for gid in 0..font.num_glyphs() {
        let instructions = programs.get(gid as usize).cloned().unwrap_or_default();
        let glyph = match loca.get_glyf(read_fonts::types::GlyphId::new(gid as u32), &glyf)? {
            None => Glyph::Empty,
            Some(ReadGlyph::Simple(simple)) => {
                let mut contours: Vec<Contour> = Vec::new();
                let end_pts = simple.end_pts_of_contours();
                let mut points = simple.points();
                let mut current = 0usize;
                for end in end_pts {
                    let end = end.get() as usize;
                    let mut contour_points = Vec::new();
                    while current <= end {
                        if let Some(point) = points.next() {
                            contour_points.push(read_fonts::tables::glyf::CurvePoint {
                                x: point.x,
                                y: point.y,
                                on_curve: point.on_curve,
                            });
                        }
                        current += 1;
                    }
                    contours.push(contour_points.into());
                }
                Glyph::Simple(SimpleGlyph {
                    bbox: Bbox {
                        x_min: simple.x_min(),
                        y_min: simple.y_min(),
                        x_max: simple.x_max(),
                        y_max: simple.y_max(),
                    },
                    contours,
                    instructions,
                    overlaps: false,
                })
            }
            Some(ReadGlyph::Composite(composite)) => {
                let bbox = Bbox {
                    x_min: composite.x_min(),
                    y_min: composite.y_min(),
                    x_max: composite.x_max(),
                    y_max: composite.y_max(),
                };
                let mut components = composite.components().map(|component| {
                    let anchor = match component.anchor {
                        read_fonts::tables::glyf::Anchor::Offset { x, y } => {
                            Anchor::Offset { x, y }
                        }
                        read_fonts::tables::glyf::Anchor::Point { base, component } => {
                            Anchor::Point { base, component }
                        }
                    };
                    Component {
                        glyph: font_types::GlyphId16::new(component.glyph.to_u16()),
                        anchor,
                        transform: Transform {
                            xx: component.transform.xx,
                            yx: component.transform.yx,
                            xy: component.transform.xy,
                            yy: component.transform.yy,
                        },
                        flags: ComponentFlags::from(component.flags),
                    }
                });
                match components.next() {
                    None => Glyph::Empty,
                    Some(first) => {
                        let mut glyph = CompositeGlyph::new(first, bbox);
                        for component in components {
                            glyph.add_component(component, bbox);
                        }
                        Glyph::Composite(glyph)
                    }
                }
            }
        };
        builder.add_glyph(&glyph)?;
    }

    let (glyf, loca, format) = builder.build();
    Ok((glyf, loca, format))
}
