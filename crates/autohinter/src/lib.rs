//! Auto-hint TrueType fonts.
//!
//! Reads a font, analyzes its outlines together with per-script stem
//! and blue-zone metrics, and writes a font whose `prep`, `fpgm`,
//! `cvt `, and `glyf` tables carry freshly synthesized grid-fitting
//! bytecode. Outline geometry is never modified; only instruction
//! streams and the companion tables change.

mod action;
mod bytecode;
mod edge;
mod error;
mod font;
mod hinter;
mod metrics;
mod options;
mod outline;
mod planner;
mod script;
mod segment;
mod storage;
mod tables;

pub use bytecode::{check_structure, StreamStats};
pub use error::{HintError, Result};
pub use hinter::{hint_font, Hinter, NameRecordInfo, Progress};
pub use options::{
    FallbackScript, Options, SnapExceptions, HINTING_LIMIT, HINTING_RANGE_MAX, HINTING_RANGE_MIN,
    INCREASE_X_HEIGHT,
};
pub use tables::fpgm::FUNC_COUNT;
