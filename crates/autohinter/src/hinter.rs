//! The hinting pipeline.
//!
//! Builds CVT, FPGM, and prep once, then walks the glyphs in index
//! order, planning and emitting one program each, and finally
//! reassembles the font with the four replaced tables and refreshed
//! `maxp`/`gasp`.

use std::collections::HashSet;

use log::{debug, info, warn};
use read_fonts::types::{GlyphId, Tag};
use read_fonts::TableProvider;
use write_fonts::from_obj::ToOwnedTable;
use write_fonts::tables::gasp::{Gasp, GaspRange, GaspRangeBehavior};
use write_fonts::tables::name::{Name, NameRecord};
use write_fonts::FontBuilder;

use crate::error::{HintError, Result};
use crate::font::Font;
use crate::metrics::{self, StyleMetrics};
use crate::options::Options;
use crate::outline::{self, GlyphOutline, Outline};
use crate::planner::{plan_glyph, PlanParams};
use crate::script::{Coverage, StyleClass, STYLE_CLASSES, STYLE_MAX, STYLE_UNUSED};
use crate::segment::{self, Axis};
use crate::storage::storage_size;
use crate::edge;
use crate::tables::cvt::{build_cvt, default_width};
use crate::tables::fpgm::{build_fpgm, FpgmParams, FUNC_COUNT};
use crate::tables::glyf::{compile_hinted_program, compile_scale_program, rebuild_glyf};
use crate::tables::prep::build_prep;

/// Tables replaced or rebuilt by the hinter.
const HANDLED_TABLES: &[[u8; 4]] = &[
    *b"glyf", *b"loca", *b"cvt ", *b"fpgm", *b"prep", *b"head", *b"maxp", *b"gasp", *b"name",
];

/// A new bytecode stream invalidates any digital signature.
const REMOVED_TABLES: &[[u8; 4]] = &[*b"DSIG"];

/// Stack room for the deepest FPGM call chain on top of a glyph
/// program's own pushes.
const STACK_HEADROOM: u16 = 48;

/// Per-glyph progress report.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub glyph_index: u16,
    pub num_glyphs: u16,
    pub subfont_index: u16,
    pub num_subfonts: u16,
}

/// Identity of a `name` table record offered to the info callback.
#[derive(Debug, Clone, Copy)]
pub struct NameRecordInfo {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub language_id: u16,
    pub name_id: u16,
}

/// Return `true` to cancel the run.
pub type ProgressFn<'a> = dyn FnMut(Progress) -> bool + 'a;

/// Return a replacement string to rewrite a record, `None` to keep it.
pub type InfoFn<'a> = dyn FnMut(&NameRecordInfo, &str) -> Option<String> + 'a;

/// The auto-hinter.
pub struct Hinter<'a> {
    options: Options,
    progress: Option<Box<ProgressFn<'a>>>,
    info: Option<Box<InfoFn<'a>>>,
}

impl<'a> Hinter<'a> {
    pub fn new(options: Options) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            progress: None,
            info: None,
        })
    }

    /// Install a per-glyph progress callback.
    pub fn with_progress(mut self, callback: impl FnMut(Progress) -> bool + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Install a `name` table rewriting callback.
    pub fn with_info(
        mut self,
        callback: impl FnMut(&NameRecordInfo, &str) -> Option<String> + 'a,
    ) -> Self {
        self.info = Some(Box::new(callback));
        self
    }

    /// Hint `data` and return the rewritten font.
    pub fn hint(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let font = Font::new(data)?;
        font.check_permissions(self.options.ignore_restrictions)?;
        if self.options.pre_hinting {
            warn!("pre-hinting needs a rasterizer collaborator; continuing without");
        }

        let charmap = font.charmap(self.options.symbol)?;
        let upem = font.units_per_em();
        let num_glyphs = font.num_glyphs();

        // assign styles from the character map
        let mut coverage = Coverage::new(num_glyphs as usize, self.options.fallback_script);
        for style in STYLE_CLASSES {
            let Some(script) = style.script else { continue };
            for &(lo, hi) in script.ranges {
                for codepoint in lo..=hi {
                    if let Some(gid) = charmap.map(codepoint) {
                        coverage.assign(gid, style.index);
                    }
                }
            }
        }

        let glyf = font.font_ref().glyf()?;
        let loca = font.font_ref().loca(None)?;
        let load_gid = |gid: u16| -> Option<Outline> {
            match outline::load_glyph(&loca, &glyf, GlyphId::new(gid as u32)) {
                Ok(GlyphOutline::Simple(outline)) => Some(outline),
                _ => None,
            }
        };
        let load_char = |ch: char| charmap.glyph_for(ch).and_then(load_gid);

        // metrics per style, with MissingGlyph recovery in the CVT loop
        let fallback_style = coverage.fallback;
        let mut resolved: [Option<StyleMetrics>; STYLE_MAX] = Default::default();
        let cvt = {
            let resolved = &mut resolved;
            let options = &self.options;
            let resolve = |style: &'static StyleClass| -> Result<StyleMetrics> {
                let metrics =
                    resolve_style_metrics(style, options, fallback_style, &load_char, upem)?;
                resolved[style.index] = Some(metrics.clone());
                Ok(metrics)
            };
            build_cvt(&mut coverage, options.symbol, upem, resolve)?
        };
        let layout = &cvt.layout;

        let active_style = STYLE_CLASSES
            .iter()
            .position(|style| {
                style.script.is_some() && layout.style_ids[style.index] != STYLE_UNUSED
            })
            .or_else(|| {
                STYLE_CLASSES
                    .iter()
                    .position(|style| layout.style_ids[style.index] != STYLE_UNUSED)
            })
            .unwrap_or(crate::script::STYLE_NONE.index);

        let fpgm = build_fpgm(&FpgmParams {
            std_vwidth_cvt: layout.std_vwidth_cell(active_style),
            blue_count: layout.blue_counts[active_style],
        });
        let prep = build_prep(layout, &self.options, active_style);
        info!(
            "tables: cvt {} bytes, fpgm {} bytes, prep {} bytes",
            cvt.data.len(),
            fpgm.len(),
            prep.len()
        );

        // per-glyph programs, in ascending glyph order
        let flat_threshold = metrics::flat_threshold(upem);
        let link_distance = metrics::link_distance(upem);
        let edge_threshold = metrics::edge_threshold(upem);
        let blue_fuzz = metrics::blue_fuzz(upem);

        let mut programs: Vec<Vec<u8>> = Vec::with_capacity(num_glyphs as usize);
        let mut max_segments = 0usize;
        let mut max_stack = 0u32;
        let mut max_instructions = 0usize;
        let mut num_composites = 0usize;

        for gid in 0..num_glyphs {
            let glyph = outline::load_glyph(&loca, &glyf, GlyphId::new(gid as u32))?;
            let style = coverage.style_of(gid);
            let style_metrics = resolved[style].as_ref();

            let program = match &glyph {
                GlyphOutline::Empty => None,
                GlyphOutline::Composite => {
                    num_composites += 1;
                    None
                }
                GlyphOutline::Simple(outline) => {
                    let hinted = style_metrics
                        .filter(|_| layout.style_ids[style] != STYLE_UNUSED)
                        .and_then(|metrics| {
                            hint_simple_glyph(
                                outline,
                                metrics,
                                layout.blue_ref_base(style),
                                upem,
                                (flat_threshold, link_distance, edge_threshold, blue_fuzz),
                                &mut max_segments,
                            )
                        });
                    Some(hinted.unwrap_or_else(|| compile_scale_program(outline)))
                }
            };

            let stream = match program {
                Some(bytecode) => {
                    max_stack = max_stack.max(bytecode.max_stack());
                    let stream = bytecode.finish();
                    max_instructions = max_instructions.max(stream.len());
                    stream
                }
                None => Vec::new(),
            };
            programs.push(stream);

            if let Some(callback) = self.progress.as_mut() {
                let cancel = callback(Progress {
                    glyph_index: gid,
                    num_glyphs,
                    subfont_index: 0,
                    num_subfonts: 1,
                });
                if cancel {
                    return Err(HintError::Canceled);
                }
            }
        }

        if num_composites > 0 && self.options.hint_with_components {
            warn!(
                "hint-with-components needs the whole-composite helper glyph, which is \
                 not generated; the {num_composites} composite glyphs were hinted \
                 through their components instead"
            );
        }

        let (new_glyf, new_loca, loca_format) = rebuild_glyf(&font, &programs)?;

        // reassemble the font
        let mut head: write_fonts::tables::head::Head = font.font_ref().head()?.to_owned_table();
        head.index_to_loc_format = match loca_format {
            write_fonts::tables::loca::LocaFormat::Short => 0,
            write_fonts::tables::loca::LocaFormat::Long => 1,
        };

        let stack_need = max_stack as usize + STACK_HEADROOM as usize;
        if stack_need > u16::MAX as usize || storage_size(max_segments) > u16::MAX as usize {
            return Err(HintError::HinterOverflow);
        }
        let mut maxp: write_fonts::tables::maxp::Maxp = font.font_ref().maxp()?.to_owned_table();
        maxp.max_zones = Some(2);
        maxp.max_twilight_points = Some((2 * max_segments) as u16);
        maxp.max_storage = Some(storage_size(max_segments) as u16);
        maxp.max_function_defs = Some(FUNC_COUNT);
        maxp.max_instruction_defs = Some(0);
        maxp.max_stack_elements = Some(stack_need as u16);
        maxp.max_size_of_instructions = Some(
            u16::try_from(max_instructions).map_err(|_| HintError::HinterOverflow)?,
        );

        let gasp = Gasp {
            version: 1,
            num_ranges: 1,
            gasp_ranges: vec![GaspRange {
                range_max_ppem: 0xFFFF,
                range_gasp_behavior: GaspRangeBehavior::GASP_GRIDFIT
                    | GaspRangeBehavior::GASP_DOGRAY
                    | GaspRangeBehavior::GASP_SYMMETRIC_GRIDFIT
                    | GaspRangeBehavior::GASP_SYMMETRIC_SMOOTHING,
            }],
        };

        let mut builder = FontBuilder::new();
        builder.add_table(&head)?;
        builder.add_table(&maxp)?;
        builder.add_table(&new_glyf)?;
        builder.add_table(&new_loca)?;
        builder.add_table(&gasp)?;
        builder.add_raw(Tag::new(b"cvt "), cvt.data.clone());
        builder.add_raw(Tag::new(b"fpgm"), fpgm);
        builder.add_raw(Tag::new(b"prep"), prep);

        self.rewrite_name(&font, &mut builder)?;
        copy_other_tables(&font, &mut builder);

        debug!(
            "maxp: {} functions, {} twilight points, {} storage, stack {}",
            FUNC_COUNT,
            2 * max_segments,
            storage_size(max_segments),
            stack_need
        );
        Ok(builder.build())
    }

    /// Run the info callback over every `name` record; without a
    /// callback the original table passes through untouched.
    fn rewrite_name(&mut self, font: &Font, builder: &mut FontBuilder) -> Result<()> {
        let Some(callback) = self.info.as_mut() else {
            if let Some(data) = font.font_ref().table_data(Tag::new(b"name")) {
                builder.add_raw(Tag::new(b"name"), data.as_bytes().to_vec());
            }
            return Ok(());
        };
        let Ok(name) = font.font_ref().name() else {
            return Ok(());
        };

        let mut records = Vec::new();
        for record in name.name_record() {
            let info = NameRecordInfo {
                platform_id: record.platform_id(),
                encoding_id: record.encoding_id(),
                language_id: record.language_id(),
                name_id: record.name_id().to_u16(),
            };
            let current: String = match record.string(name.string_data()) {
                Ok(s) => s.chars().collect(),
                Err(_) => continue,
            };
            let string = match callback(&info, &current) {
                Some(replacement) if replacement.len() <= u16::MAX as usize => replacement,
                _ => current,
            };
            records.push(NameRecord::new(
                info.platform_id,
                info.encoding_id,
                info.language_id,
                record.name_id(),
                string.into(),
            ));
        }
        records.sort();
        let name = Name {
            name_record: records.into_iter().collect(),
            ..Default::default()
        };
        builder.add_table(&name)?;
        Ok(())
    }
}

/// Hint a font with default callbacks.
pub fn hint_font(data: &[u8], options: &Options) -> Result<Vec<u8>> {
    Hinter::new(options.clone())?.hint(data)
}

/// Analyze one glyph and compile its program; `None` when the outline
/// yields no segments worth hinting.
fn hint_simple_glyph(
    outline: &Outline,
    metrics: &StyleMetrics,
    blue_cvt_base: u16,
    upem: u16,
    thresholds: (i32, i32, i32, i32),
    max_segments: &mut usize,
) -> Option<crate::bytecode::Bytecode> {
    let (flat_threshold, link_distance, edge_threshold, blue_fuzz) = thresholds;
    let mut segments = segment::compute_segments(outline, Axis::Vertical, flat_threshold);
    if segments.is_empty() {
        return None;
    }
    segment::link_segments(&mut segments, link_distance);
    let (mut edges, seg_to_edge) = edge::compute_edges(&segments, edge_threshold);
    edge::compute_edge_links(&mut edges, &segments, &seg_to_edge);
    edge::compute_blue_edges(&mut edges, &metrics.vertical().blues, blue_fuzz);

    let bound_threshold = metrics
        .vertical()
        .widths
        .first()
        .copied()
        .unwrap_or_else(|| default_width(upem));
    let params = PlanParams {
        blue_cvt_base,
        bound_threshold,
        blue_fuzz,
    };
    let actions = plan_glyph(outline, &edges, &segments, &params);
    *max_segments = (*max_segments).max(segments.len());
    Some(compile_hinted_program(outline, &segments, &edges, &actions))
}

/// Resolve a style's metrics from its standard glyph.
fn resolve_style_metrics(
    style: &'static StyleClass,
    options: &Options,
    fallback_style: usize,
    load_char: &impl Fn(char) -> Option<Outline>,
    upem: u16,
) -> Result<StyleMetrics> {
    let Some(script) = style.script else {
        // the script-less style only materializes as the symbol
        // fallback; otherwise it is stripped like any failed style
        if options.symbol && style.index == fallback_style {
            return Ok(StyleMetrics::synthetic(style));
        }
        return Err(HintError::MissingGlyph);
    };

    let standard = script.standard_chars.iter().find_map(|&ch| load_char(ch));
    let Some(standard) = standard else {
        // a symbol font may proceed with defaults, but only for the
        // style every uncovered glyph falls back to
        if options.symbol && style.index == fallback_style {
            warn!(
                "style '{}': no standard glyph, using default metrics",
                style.name
            );
            return Ok(StyleMetrics::synthetic(style));
        }
        return Err(HintError::MissingGlyph);
    };

    Ok(metrics::compute_style_metrics(style, &standard, load_char, upem))
}

fn copy_other_tables(font: &Font, builder: &mut FontBuilder) {
    let handled: HashSet<Tag> = HANDLED_TABLES.iter().map(Tag::new).collect();
    let removed: HashSet<Tag> = REMOVED_TABLES.iter().map(Tag::new).collect();

    for record in font.font_ref().table_directory.table_records() {
        let tag = record.tag();
        if handled.contains(&tag) || removed.contains(&tag) || builder.contains(tag) {
            continue;
        }
        if let Some(data) = font.font_ref().table_data(tag) {
            builder.add_raw(tag, data.as_bytes().to_vec());
        }
    }
}
