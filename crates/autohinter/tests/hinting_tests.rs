//! End-to-end tests over a synthesized TrueType font.
//!
//! The fixture is built with write-fonts instead of shipping a binary:
//! a ring glyph standing in for 'o', a cap box for the capital
//! reference characters, and an empty space glyph.

use font_autohinter::{
    check_structure, hint_font, FallbackScript, HintError, Hinter, Options, FUNC_COUNT,
};
use read_fonts::types::{GlyphId, Tag};
use read_fonts::{FontRef, TableProvider};
use write_fonts::tables::glyf::{Bbox, Contour, Glyph, GlyfLocaBuilder, SimpleGlyph};
use write_fonts::tables::head::Head;
use write_fonts::tables::maxp::Maxp;
use write_fonts::tables::name::{Name, NameRecord};
use write_fonts::tables::os2::Os2;
use write_fonts::FontBuilder;

type Pt = (i16, i16, bool);

fn rect(x0: i16, y0: i16, x1: i16, y1: i16) -> Vec<Pt> {
    vec![
        (x0, y0, true),
        (x0, y1, true),
        (x1, y1, true),
        (x1, y0, true),
    ]
}

fn simple_glyph(contours: &[Vec<Pt>]) -> Glyph {
    let (mut x_min, mut y_min, mut x_max, mut y_max) = (i16::MAX, i16::MAX, i16::MIN, i16::MIN);
    let mut built: Vec<Contour> = Vec::new();
    for contour in contours {
        let points: Vec<read_fonts::tables::glyf::CurvePoint> = contour
            .iter()
            .map(|&(x, y, on_curve)| {
                x_min = x_min.min(x);
                y_min = y_min.min(y);
                x_max = x_max.max(x);
                y_max = y_max.max(y);
                read_fonts::tables::glyf::CurvePoint { x, y, on_curve }
            })
            .collect();
        built.push(points.into());
    }
    Glyph::Simple(SimpleGlyph {
        bbox: Bbox { x_min, y_min, x_max, y_max },
        contours: built,
        instructions: Vec::new(),
        overlaps: false,
    })
}

fn ring() -> Glyph {
    let outer = rect(50, -10, 450, 530);
    let mut inner = rect(130, 80, 370, 440);
    inner.reverse();
    simple_glyph(&[outer, inner])
}

fn cap_box() -> Glyph {
    simple_glyph(&[rect(0, 0, 400, 700)])
}

struct FixtureOptions {
    fs_type: u16,
    map_standard_chars: bool,
    extra_rings: u16,
    with_name: bool,
}

impl Default for FixtureOptions {
    fn default() -> Self {
        Self {
            fs_type: 0,
            map_standard_chars: true,
            extra_rings: 0,
            with_name: true,
        }
    }
}

fn build_fixture(options: FixtureOptions) -> Vec<u8> {
    let mut glyf_builder = GlyfLocaBuilder::new();
    glyf_builder.add_glyph(&Glyph::Empty).unwrap(); // .notdef
    glyf_builder.add_glyph(&ring()).unwrap();
    glyf_builder.add_glyph(&cap_box()).unwrap();
    glyf_builder.add_glyph(&Glyph::Empty).unwrap(); // space
    for _ in 0..options.extra_rings {
        glyf_builder.add_glyph(&ring()).unwrap();
    }
    let (glyf, loca, format) = glyf_builder.build();

    let mut mappings: Vec<(char, GlyphId)> = Vec::new();
    if options.map_standard_chars {
        for ch in "o0xzresc".chars() {
            mappings.push((ch, GlyphId::new(1)));
        }
        for ch in "HETZOCQSLU".chars() {
            mappings.push((ch, GlyphId::new(2)));
        }
    }
    mappings.push(('!', GlyphId::new(2)));
    mappings.push((' ', GlyphId::new(3)));
    let cmap = write_fonts::tables::cmap::Cmap::from_mappings(mappings).unwrap();

    let head = Head {
        units_per_em: 1000,
        index_to_loc_format: match format {
            write_fonts::tables::loca::LocaFormat::Short => 0,
            write_fonts::tables::loca::LocaFormat::Long => 1,
        },
        ..Default::default()
    };
    let maxp = Maxp {
        num_glyphs: 4 + options.extra_rings,
        ..Default::default()
    };
    let os2 = Os2 {
        fs_type: options.fs_type,
        ..Default::default()
    };

    let mut builder = FontBuilder::new();
    builder.add_table(&head).unwrap();
    builder.add_table(&maxp).unwrap();
    builder.add_table(&cmap).unwrap();
    builder.add_table(&os2).unwrap();
    builder.add_table(&glyf).unwrap();
    builder.add_table(&loca).unwrap();
    if options.with_name {
        let record = NameRecord::new(
            3,
            1,
            0x409,
            font_types::NameId::new(1),
            String::from("Fixture").into(),
        );
        let name = Name {
            name_record: vec![record].into_iter().collect(),
            ..Default::default()
        };
        builder.add_table(&name).unwrap();
    }
    builder.add_raw(Tag::new(b"DSIG"), vec![0, 0, 0, 1, 0, 0, 0, 0]);
    builder.build()
}

fn glyph_instructions(data: &[u8], gid: u32) -> Vec<u8> {
    let font = FontRef::new(data).unwrap();
    let glyf = font.glyf().unwrap();
    let loca = font.loca(None).unwrap();
    match loca.get_glyf(GlyphId::new(gid), &glyf).unwrap() {
        Some(read_fonts::tables::glyf::Glyph::Simple(simple)) => simple.instructions().to_vec(),
        _ => Vec::new(),
    }
}

#[test]
fn baseline_latin_replaces_the_hinting_tables() {
    let fixture = build_fixture(FixtureOptions::default());
    let hinted = hint_font(&fixture, &Options::default()).unwrap();
    let font = FontRef::new(&hinted).unwrap();

    for tag in [b"cvt ", b"fpgm", b"prep"] {
        let table = font.table_data(Tag::new(tag)).unwrap_or_else(|| {
            panic!("missing table {}", String::from_utf8_lossy(tag))
        });
        assert!(!table.as_bytes().is_empty());
    }
    assert!(font.table_data(Tag::new(b"DSIG")).is_none());

    // the fpgm must define every function, in order
    let fpgm = font.table_data(Tag::new(b"fpgm")).unwrap();
    let stats = check_structure(fpgm.as_bytes()).unwrap();
    let expected: Vec<i32> = (0..FUNC_COUNT as i32).collect();
    assert_eq!(stats.defined, expected);

    // the prep stream parses and stays inside the defined functions
    let prep = font.table_data(Tag::new(b"prep")).unwrap();
    let prep_stats = check_structure(prep.as_bytes()).unwrap();
    assert!(prep_stats
        .called
        .iter()
        .all(|id| (0..FUNC_COUNT as i32).contains(id)));

    // every outline glyph got a program whose calls resolve
    for gid in [1u32, 2] {
        let instructions = glyph_instructions(&hinted, gid);
        assert!(!instructions.is_empty(), "glyph {gid} has no program");
        let stats = check_structure(&instructions).unwrap();
        assert!(!stats.called.is_empty());
        assert!(stats
            .called
            .iter()
            .all(|id| (0..FUNC_COUNT as i32).contains(id)));
    }

    let maxp = font.maxp().unwrap();
    assert_eq!(maxp.max_function_defs(), Some(FUNC_COUNT));
    assert_eq!(maxp.max_zones(), Some(2));
    assert!(maxp.max_twilight_points().unwrap() > 0);
    assert!(maxp.max_stack_elements().unwrap() > 0);

    // gasp requests grid-fitting plus symmetric smoothing everywhere
    let gasp = font.table_data(Tag::new(b"gasp")).unwrap();
    assert_eq!(gasp.as_bytes(), &[0, 1, 0, 1, 0xFF, 0xFF, 0, 0x0F]);

    // outlines themselves are untouched
    let original = FontRef::new(&fixture).unwrap();
    let outline_of = |font: &FontRef, gid: u32| -> Vec<(i16, i16)> {
        let glyf = font.glyf().unwrap();
        let loca = font.loca(None).unwrap();
        match loca.get_glyf(GlyphId::new(gid), &glyf).unwrap() {
            Some(read_fonts::tables::glyf::Glyph::Simple(simple)) => {
                simple.points().map(|p| (p.x, p.y)).collect()
            }
            _ => Vec::new(),
        }
    };
    assert_eq!(outline_of(&original, 1), outline_of(&font, 1));
}

#[test]
fn empty_glyphs_stay_empty() {
    let fixture = build_fixture(FixtureOptions::default());
    let hinted = hint_font(&fixture, &Options::default()).unwrap();
    assert!(glyph_instructions(&hinted, 0).is_empty());
    assert!(glyph_instructions(&hinted, 3).is_empty());
}

#[test]
fn cvt_length_covers_the_computed_blocks() {
    let fixture = build_fixture(FixtureOptions::default());
    let hinted = hint_font(&fixture, &Options::default()).unwrap();
    let font = FontRef::new(&hinted).unwrap();
    let cvt = font.table_data(Tag::new(b"cvt ")).unwrap();
    let cvt = cvt.as_bytes();
    assert_eq!(cvt.len() % 2, 0);
    // runtime scratch, per-style cells, and at least one style block
    assert!(cvt.len() / 2 > 8);
}

#[test]
fn protected_fonts_are_refused() {
    let fixture = build_fixture(FixtureOptions {
        fs_type: 0x0002,
        ..Default::default()
    });
    let result = hint_font(&fixture, &Options::default());
    assert!(matches!(result, Err(HintError::MissingLegalPermission)));

    let permitted = hint_font(&fixture, &Options::default().ignore_restrictions(true));
    assert!(permitted.is_ok());
}

#[test]
fn fonts_without_key_characters_need_the_symbol_switch() {
    let fixture = build_fixture(FixtureOptions {
        map_standard_chars: false,
        ..Default::default()
    });
    let plain = hint_font(&fixture, &Options::default());
    assert!(matches!(plain, Err(HintError::MissingGlyph)));

    let options = Options::default()
        .symbol(true)
        .fallback_script(FallbackScript::Latin);
    let hinted = hint_font(&fixture, &options).unwrap();
    let font = FontRef::new(&hinted).unwrap();

    // the fallback style runs on default metrics: 50 * upem / 2048
    let cvt = font.table_data(Tag::new(b"cvt ")).unwrap();
    let cvt = cvt.as_bytes();
    let cell = |index: usize| u16::from_be_bytes([cvt[index * 2], cvt[index * 2 + 1]]);
    // runtime scratch + 1 scale + 2 blue-data cells, then the block
    assert_eq!(cell(4), 50 * 1000 / 2048);
}

#[test]
fn progress_callback_sees_every_glyph_and_can_cancel() {
    let fixture = build_fixture(FixtureOptions {
        extra_rings: 4,
        ..Default::default()
    });

    let mut seen = Vec::new();
    let mut hinter = Hinter::new(Options::default()).unwrap().with_progress(|p| {
        seen.push((p.glyph_index, p.num_glyphs, p.subfont_index, p.num_subfonts));
        false
    });
    hinter.hint(&fixture).unwrap();
    drop(hinter);
    assert_eq!(seen.len(), 8);
    assert_eq!(seen[0], (0, 8, 0, 1));
    assert_eq!(seen[7], (7, 8, 0, 1));

    let mut calls = 0;
    let mut hinter = Hinter::new(Options::default()).unwrap().with_progress(|p| {
        calls += 1;
        p.glyph_index == 5
    });
    let result = hinter.hint(&fixture);
    drop(hinter);
    assert!(matches!(result, Err(HintError::Canceled)));
    assert_eq!(calls, 6);
}

#[test]
fn rehinting_the_output_is_stable() {
    let fixture = build_fixture(FixtureOptions::default());
    let hinted = hint_font(&fixture, &Options::default()).unwrap();
    // no composites in the fixture, so a second pass must succeed
    let rehinted = hint_font(&hinted, &Options::default()).unwrap();
    let font = FontRef::new(&rehinted).unwrap();
    assert!(font.table_data(Tag::new(b"fpgm")).is_some());
}

#[test]
fn info_callback_rewrites_name_records() {
    let fixture = build_fixture(FixtureOptions::default());
    let mut hinter = Hinter::new(Options::default())
        .unwrap()
        .with_info(|info, current| {
            (info.name_id == 1).then(|| format!("{current}; autohinted"))
        });
    let hinted = hinter.hint(&fixture).unwrap();

    let font = FontRef::new(&hinted).unwrap();
    let name = font.name().unwrap();
    let record = name
        .name_record()
        .iter()
        .find(|r| r.name_id().to_u16() == 1)
        .unwrap();
    let value: String = record
        .string(name.string_data())
        .unwrap()
        .chars()
        .collect();
    assert_eq!(value, "Fixture; autohinted");
}

#[test]
fn invalid_options_are_rejected_up_front() {
    let fixture = build_fixture(FixtureOptions::default());
    let result = hint_font(&fixture, &Options::default().hinting_range(1, 50));
    assert!(matches!(result, Err(HintError::InvalidOption(_))));
}

#[test]
fn garbage_input_is_not_a_font() {
    let result = hint_font(&[0u8; 32], &Options::default());
    assert!(matches!(result, Err(HintError::InvalidFontType)));
}
