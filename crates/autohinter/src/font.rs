//! Font access: character maps, restrictions, table lookup.

use read_fonts::tables::cmap::{CmapSubtable, PlatformId};
use read_fonts::{FontRef, TableProvider};

use crate::error::{HintError, Result};

/// fsType bit 1: restricted license embedding.
const FSTYPE_RESTRICTED: u16 = 0x0002;

/// The character map kinds the hinter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharmapKind {
    Unicode,
    /// Microsoft symbol encoding; codepoints live at 0xF000-0xF0FF.
    Symbol,
}

/// A resolved cmap subtable.
pub struct Charmap<'a> {
    subtable: CmapSubtable<'a>,
    pub kind: CharmapKind,
}

impl Charmap<'_> {
    /// Look up the glyph for `ch`, applying the symbol-area shift for
    /// symbol character maps.
    pub fn glyph_for(&self, ch: char) -> Option<u16> {
        let code = ch as u32;
        let gid = match self.kind {
            CharmapKind::Unicode => self.map(code),
            CharmapKind::Symbol => {
                if code <= 0xFF {
                    self.map(0xF000 | code).or_else(|| self.map(code))
                } else {
                    self.map(code)
                }
            }
        };
        gid.filter(|&gid| gid != 0)
    }

    pub fn map(&self, codepoint: u32) -> Option<u16> {
        let gid = match &self.subtable {
            CmapSubtable::Format4(sub) => sub.map_codepoint(codepoint),
            CmapSubtable::Format12(sub) => sub.map_codepoint(codepoint),
            _ => None,
        }?;
        u16::try_from(gid.to_u32()).ok()
    }
}

/// A parsed font ready for hinting.
pub struct Font<'a> {
    inner: FontRef<'a>,
    units_per_em: u16,
    num_glyphs: u16,
}

impl<'a> Font<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        // subfont 0 for collections, the whole font otherwise
        let inner = FontRef::from_index(data, 0).map_err(|_| HintError::InvalidFontType)?;
        // only TrueType outlines can carry the synthesized bytecode
        if inner.glyf().is_err() || inner.loca(None).is_err() {
            return Err(HintError::InvalidFontType);
        }
        let units_per_em = inner.head()?.units_per_em();
        let num_glyphs = inner.maxp()?.num_glyphs();
        Ok(Self {
            inner,
            units_per_em,
            num_glyphs,
        })
    }

    pub fn font_ref(&self) -> &FontRef<'a> {
        &self.inner
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    pub fn num_glyphs(&self) -> u16 {
        self.num_glyphs
    }

    /// Fail unless the font may legally be modified.
    pub fn check_permissions(&self, ignore_restrictions: bool) -> Result<()> {
        if ignore_restrictions {
            return Ok(());
        }
        if let Ok(os2) = self.inner.os2() {
            if os2.fs_type() & FSTYPE_RESTRICTED != 0 {
                return Err(HintError::MissingLegalPermission);
            }
        }
        Ok(())
    }

    /// Select the character map: Unicode first, then the symbol map if
    /// the font is marked as a symbol font.
    pub fn charmap(&self, symbol: bool) -> Result<Charmap<'a>> {
        let cmap = self.inner.cmap()?;
        let mut symbol_subtable = None;
        let mut unicode_subtable = None;
        for record in cmap.encoding_records() {
            let Ok(subtable) = record.subtable(cmap.offset_data()) else {
                continue;
            };
            if !matches!(
                subtable,
                CmapSubtable::Format4(_) | CmapSubtable::Format12(_)
            ) {
                continue;
            }
            match (record.platform_id(), record.encoding_id()) {
                (PlatformId::Unicode, _) | (PlatformId::Windows, 1) | (PlatformId::Windows, 10) => {
                    if unicode_subtable.is_none() {
                        unicode_subtable = Some(subtable);
                    }
                }
                (PlatformId::Windows, 0) => {
                    if symbol_subtable.is_none() {
                        symbol_subtable = Some(subtable);
                    }
                }
                _ => {}
            }
        }
        if let Some(subtable) = unicode_subtable {
            return Ok(Charmap {
                subtable,
                kind: CharmapKind::Unicode,
            });
        }
        if symbol {
            match symbol_subtable {
                Some(subtable) => Ok(Charmap {
                    subtable,
                    kind: CharmapKind::Symbol,
                }),
                None => Err(HintError::MissingSymbolCmap),
            }
        } else {
            Err(HintError::MissingUnicodeCmap)
        }
    }
}
