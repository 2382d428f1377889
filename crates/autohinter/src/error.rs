use std::{io, result};

use read_fonts::ReadError;
use thiserror::Error;
use write_fonts::{error, BuilderError};

#[derive(Error, Debug)]
pub enum HintError {
    #[error("not a TrueType font with outlines in a 'glyf' table")]
    InvalidFontType,

    #[error("unsupported table format: {0}")]
    UnsupportedTableFormat(ReadError),

    #[error("no Unicode character map found")]
    MissingUnicodeCmap,

    #[error("no symbol character map found")]
    MissingSymbolCmap,

    #[error("no glyph for a standard character of any attempted style")]
    MissingGlyph,

    #[error("'OS/2' fsType forbids modification; rerun with ignore-restrictions if permitted")]
    MissingLegalPermission,

    #[error("a control value or stack requirement exceeds the 16-bit range")]
    HinterOverflow,

    #[error("canceled by progress callback")]
    Canceled,

    #[error("the outline library is too old for metrics extraction")]
    InvalidRasterizerVersion,

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("failed to write font: {0}")]
    WriteError(#[from] error::Error),

    #[error("failed to build font: {0}")]
    BuilderError(#[from] BuilderError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<ReadError> for HintError {
    fn from(err: ReadError) -> Self {
        HintError::UnsupportedTableFormat(err)
    }
}

pub type Result<T> = result::Result<T, HintError>;
