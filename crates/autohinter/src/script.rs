//! Script and style classes.
//!
//! A style bundles a script (key characters, blue-zone definitions,
//! Unicode coverage) with a presentation variant. Only the Latin
//! default style and the `none` fallback are defined; the tables are
//! shaped so another script slots in without touching the CVT layout
//! code.

use crate::options::FallbackScript;

/// Marks a blue zone definition as a top zone (reference below shoot).
pub const BLUE_TOP: u8 = 0x01;
/// The zone whose rounding is boosted by `increase-x-height`.
pub const BLUE_ADJUSTMENT: u8 = 0x02;

/// One blue zone definition: the characters whose extrema feed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlueString {
    pub chars: &'static str,
    pub flags: u8,
}

impl BlueString {
    pub fn is_top(&self) -> bool {
        self.flags & BLUE_TOP != 0
    }
}

/// Latin blue zone definitions, in CVT order.
pub const LATIN_BLUES: &[BlueString] = &[
    BlueString { chars: "THEZOCQS", flags: BLUE_TOP },
    BlueString { chars: "HEZLOCUS", flags: 0 },
    BlueString { chars: "fijkdbh", flags: BLUE_TOP },
    BlueString { chars: "xzroesc", flags: BLUE_TOP | BLUE_ADJUSTMENT },
    BlueString { chars: "xzroesc", flags: 0 },
    BlueString { chars: "pqgjy", flags: 0 },
];

/// A supported script: key characters, blues, and coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptClass {
    pub name: &'static str,
    /// Standard characters tried in order for metrics extraction.
    pub standard_chars: &'static [char],
    pub blues: &'static [BlueString],
    /// Unicode ranges assigned to this script.
    pub ranges: &'static [(u32, u32)],
}

pub const LATIN_RANGES: &[(u32, u32)] = &[
    (0x0020, 0x007F), // Basic Latin
    (0x00A0, 0x00FF), // Latin-1 Supplement
    (0x0100, 0x017F), // Latin Extended-A
    (0x0180, 0x024F), // Latin Extended-B
    (0x0250, 0x02AF), // IPA Extensions
    (0x02B0, 0x02FF), // Spacing Modifier Letters
    (0x0300, 0x036F), // Combining Diacritical Marks
    (0x1E00, 0x1EFF), // Latin Extended Additional
    (0x2000, 0x206F), // General Punctuation
    (0x20A0, 0x20CF), // Currency Symbols
    (0x2150, 0x218F), // Number Forms
    (0xFB00, 0xFB06), // Latin ligatures
];

pub const LATIN: ScriptClass = ScriptClass {
    name: "latin",
    standard_chars: &['o', 'O', '0'],
    blues: LATIN_BLUES,
    ranges: LATIN_RANGES,
};

/// A style: a script plus presentation variant, or the `none` style
/// whose glyphs are only rescaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleClass {
    pub index: usize,
    pub name: &'static str,
    pub script: Option<&'static ScriptClass>,
}

pub const STYLE_LATIN: StyleClass = StyleClass {
    index: 0,
    name: "latin",
    script: Some(&LATIN),
};

pub const STYLE_NONE: StyleClass = StyleClass {
    index: 1,
    name: "none",
    script: None,
};

/// All styles, in the fixed order the CVT builder iterates them.
pub const STYLE_CLASSES: &[&StyleClass] = &[&STYLE_LATIN, &STYLE_NONE];

pub const STYLE_MAX: usize = STYLE_CLASSES.len();

/// Style id recorded for a style the font cannot use.
pub const STYLE_UNUSED: u16 = 0xFFFF;

/// Per-glyph style assignment derived from the character map.
#[derive(Debug)]
pub struct Coverage {
    assignments: Vec<u8>,
    /// The style uncovered glyphs fall back to.
    pub fallback: usize,
}

impl Coverage {
    pub fn new(num_glyphs: usize, fallback_script: FallbackScript) -> Self {
        let fallback = match fallback_script {
            FallbackScript::None => STYLE_NONE.index,
            FallbackScript::Latin => STYLE_LATIN.index,
        };
        Self {
            assignments: vec![fallback as u8; num_glyphs],
            fallback,
        }
    }

    /// Assign `glyph` to `style` (first assignment wins).
    pub fn assign(&mut self, glyph: u16, style: usize) {
        if let Some(slot) = self.assignments.get_mut(glyph as usize) {
            if *slot as usize == self.fallback {
                *slot = style as u8;
            }
        }
    }

    pub fn style_of(&self, glyph: u16) -> usize {
        self.assignments
            .get(glyph as usize)
            .map(|&s| s as usize)
            .unwrap_or(STYLE_NONE.index)
    }

    /// Move every glyph of `style` to the fallback style.
    pub fn strip_style(&mut self, style: usize) {
        for slot in &mut self.assignments {
            if *slot as usize == style {
                *slot = self.fallback as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covers(codepoint: u32) -> bool {
        LATIN
            .ranges
            .iter()
            .any(|&(lo, hi)| lo <= codepoint && codepoint <= hi)
    }

    #[test]
    fn latin_covers_ascii_letters() {
        assert!(covers('o' as u32));
        assert!(covers('0' as u32));
        assert!(!covers(0x0531)); // Armenian
    }

    #[test]
    fn coverage_strip_moves_to_fallback() {
        let mut cov = Coverage::new(4, FallbackScript::None);
        cov.assign(1, STYLE_LATIN.index);
        cov.assign(2, STYLE_LATIN.index);
        assert_eq!(cov.style_of(1), STYLE_LATIN.index);
        cov.strip_style(STYLE_LATIN.index);
        assert_eq!(cov.style_of(1), STYLE_NONE.index);
        assert_eq!(cov.style_of(2), STYLE_NONE.index);
    }

    #[test]
    fn blue_definitions_mark_one_adjustment_zone() {
        let marked = LATIN_BLUES
            .iter()
            .filter(|b| b.flags & BLUE_ADJUSTMENT != 0)
            .count();
        assert_eq!(marked, 1);
    }
}
