//! The recognized-option set for the hinting entrypoint.

use crate::error::{HintError, Result};

pub const HINTING_RANGE_MIN: u16 = 8;
pub const HINTING_RANGE_MAX: u16 = 50;
pub const HINTING_LIMIT: u16 = 200;
pub const INCREASE_X_HEIGHT: u16 = 14;

/// Script used for glyphs outside any supported coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackScript {
    /// Uncovered glyphs are only rescaled, never grid-fitted.
    #[default]
    None,
    Latin,
}

/// PPEM values exempted from x-height snapping.
///
/// Parsed and validated, but currently without effect on the emitted
/// bytecode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapExceptions {
    ranges: Vec<(u16, u16)>,
}

impl SnapExceptions {
    /// Parse a comma-separated list of PPEM values or `lo-hi` ranges.
    pub fn parse(list: &str) -> Result<Self> {
        let mut ranges = Vec::new();
        for field in list.split(',') {
            let field = field.trim();
            if field.is_empty() {
                continue;
            }
            let (lo, hi) = match field.split_once('-') {
                Some((lo, hi)) => (parse_ppem(lo)?, parse_ppem(hi)?),
                None => {
                    let v = parse_ppem(field)?;
                    (v, v)
                }
            };
            if lo > hi {
                return Err(HintError::InvalidOption(format!(
                    "empty PPEM range '{field}'"
                )));
            }
            ranges.push((lo, hi));
        }
        Ok(Self { ranges })
    }

    pub fn contains(&self, ppem: u16) -> bool {
        self.ranges.iter().any(|&(lo, hi)| lo <= ppem && ppem <= hi)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

fn parse_ppem(s: &str) -> Result<u16> {
    s.trim()
        .parse()
        .map_err(|_| HintError::InvalidOption(format!("invalid PPEM value '{s}'")))
}

/// Options for the hinting pipeline.
#[derive(Debug, Clone)]
pub struct Options {
    /// Lowest PPEM value the hints are optimized for.
    pub hinting_range_min: u16,
    /// Highest PPEM value the hints are optimized for.
    pub hinting_range_max: u16,
    /// PPEM value above which the bytecode disables itself; 0 for no limit.
    pub hinting_limit: u16,
    /// Round the x height up more aggressively for PPEMs up to this value;
    /// 0 switches the feature off.
    pub increase_x_height: u16,
    /// Snap stems to full pixels for plain grayscale rendering.
    pub gray_strong_stem_width: bool,
    /// Snap stems to full pixels for GDI ClearType rendering.
    pub gdi_cleartype_strong_stem_width: bool,
    /// Snap stems to full pixels for DirectWrite ClearType rendering.
    pub dw_cleartype_strong_stem_width: bool,
    /// Hint composite glyphs as a whole rather than per component.
    pub hint_with_components: bool,
    /// Apply native TrueType hints before autohinting.
    pub pre_hinting: bool,
    pub fallback_script: FallbackScript,
    /// Treat the font as a symbol font and use default metrics when a
    /// style's standard character is missing.
    pub symbol: bool,
    /// Bypass the `OS/2` fsType restricted-license check.
    pub ignore_restrictions: bool,
    pub snap_exceptions: SnapExceptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            hinting_range_min: HINTING_RANGE_MIN,
            hinting_range_max: HINTING_RANGE_MAX,
            hinting_limit: HINTING_LIMIT,
            increase_x_height: INCREASE_X_HEIGHT,
            gray_strong_stem_width: false,
            gdi_cleartype_strong_stem_width: true,
            dw_cleartype_strong_stem_width: false,
            hint_with_components: true,
            pre_hinting: false,
            fallback_script: FallbackScript::None,
            symbol: false,
            ignore_restrictions: false,
            snap_exceptions: SnapExceptions::default(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hinting_range(mut self, min: u16, max: u16) -> Self {
        self.hinting_range_min = min;
        self.hinting_range_max = max;
        self
    }

    pub fn hinting_limit(mut self, limit: u16) -> Self {
        self.hinting_limit = limit;
        self
    }

    pub fn increase_x_height(mut self, ppem: u16) -> Self {
        self.increase_x_height = ppem;
        self
    }

    pub fn fallback_script(mut self, script: FallbackScript) -> Self {
        self.fallback_script = script;
        self
    }

    pub fn symbol(mut self, symbol: bool) -> Self {
        self.symbol = symbol;
        self
    }

    pub fn ignore_restrictions(mut self, ignore: bool) -> Self {
        self.ignore_restrictions = ignore;
        self
    }

    /// Check the numeric constraints of the option set.
    pub fn validate(&self) -> Result<()> {
        if self.hinting_range_min < 2 {
            return Err(HintError::InvalidOption(
                "hinting-range-min must be at least 2".into(),
            ));
        }
        if self.hinting_range_max < self.hinting_range_min {
            return Err(HintError::InvalidOption(
                "hinting-range-max must not be smaller than hinting-range-min".into(),
            ));
        }
        if self.hinting_limit != 0 && self.hinting_limit < self.hinting_range_max {
            return Err(HintError::InvalidOption(
                "hinting-limit must be 0 or at least hinting-range-max".into(),
            ));
        }
        if self.increase_x_height != 0 && !(6..=20).contains(&self.increase_x_height) {
            return Err(HintError::InvalidOption(
                "increase-x-height must be 0 or in the range 6-20".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Options::default().validate().is_ok());
    }

    #[test]
    fn range_constraints() {
        assert!(Options::default().hinting_range(1, 50).validate().is_err());
        assert!(Options::default().hinting_range(12, 8).validate().is_err());
        assert!(Options::default()
            .hinting_range(8, 50)
            .hinting_limit(40)
            .validate()
            .is_err());
        assert!(Options::default()
            .hinting_limit(0)
            .validate()
            .is_ok());
    }

    #[test]
    fn x_height_constraints() {
        assert!(Options::default().increase_x_height(5).validate().is_err());
        assert!(Options::default().increase_x_height(21).validate().is_err());
        assert!(Options::default().increase_x_height(0).validate().is_ok());
        assert!(Options::default().increase_x_height(20).validate().is_ok());
    }

    #[test]
    fn snap_exception_parsing() {
        let ex = SnapExceptions::parse("8, 10-12, 20,").unwrap();
        assert!(ex.contains(8));
        assert!(!ex.contains(9));
        assert!(ex.contains(11));
        assert!(ex.contains(20));
        assert!(SnapExceptions::parse("12-10").is_err());
        assert!(SnapExceptions::parse("x").is_err());
        assert!(SnapExceptions::parse("").unwrap().is_empty());
    }
}
