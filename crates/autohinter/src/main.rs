use std::{
    fs::{read, remove_file, write},
    io,
    path::PathBuf,
    process::ExitCode,
    result::Result,
};

use clap::Parser;
use font_autohinter::{
    FallbackScript, Hinter, Options, Progress, SnapExceptions, HINTING_LIMIT, HINTING_RANGE_MAX,
    HINTING_RANGE_MIN, INCREASE_X_HEIGHT,
};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Message(String),
    #[error("read: {0}")]
    Read(#[source] io::Error),
    #[error("write: {0}")]
    Write(#[source] io::Error),
    #[error("{0}")]
    Hint(#[from] font_autohinter::HintError),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "font-autohinter", version)]
#[command(about = "Auto-hint a TrueType font")]
#[command(long_about = "Replace the prep, fpgm, cvt, and glyf tables of a TrueType font \
    with freshly generated hinting bytecode. The outlines themselves are left untouched.")]
struct Cli {
    /// Lowest PPEM value the hints are optimized for
    #[arg(short = 'l', long, default_value_t = HINTING_RANGE_MIN)]
    hinting_range_min: u16,
    /// Highest PPEM value the hints are optimized for
    #[arg(short = 'r', long, default_value_t = HINTING_RANGE_MAX)]
    hinting_range_max: u16,
    /// PPEM value above which hinting switches itself off (0: no limit)
    #[arg(short = 'G', long, default_value_t = HINTING_LIMIT)]
    hinting_limit: u16,
    /// Round up the x height for PPEMs up to this value (0: off)
    #[arg(short = 'x', long, default_value_t = INCREASE_X_HEIGHT)]
    increase_x_height: u16,
    /// PPEM values or ranges exempt from x-height snapping, e.g. '8,12-14'
    #[arg(short = 'X', long)]
    x_height_snapping_exceptions: Option<String>,
    /// Strong stem snapping per rendering target: any of 'g' (grayscale),
    /// 'G' (GDI ClearType), 'D' (DirectWrite ClearType)
    #[arg(short = 'w', long, default_value = "G")]
    strong_stem_width: String,
    /// Hint composite glyphs as a whole instead of per component
    #[arg(
        short = 'c',
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        value_name = "BOOL"
    )]
    hint_with_components: bool,
    /// Apply the font's native hints before autohinting
    #[arg(short = 'p', long)]
    pre_hinting: bool,
    /// Script to use for glyphs outside the supported coverage
    #[arg(short = 'f', long, default_value = "none")]
    fallback_script: String,
    /// Process a symbol font lacking the standard characters
    #[arg(short = 's', long)]
    symbol: bool,
    /// Override the fsType restricted-license check
    #[arg(short = 'i', long)]
    ignore_restrictions: bool,
    /// Print per-glyph progress
    #[arg(short, long)]
    verbose: bool,
    /// Print diagnostic output
    #[arg(long)]
    debug: bool,
    /// Input TrueType font
    #[arg(value_name = "INPUT", required = true)]
    input: PathBuf,
    /// Output font
    #[arg(value_name = "OUTPUT", required = true)]
    output: PathBuf,
}

impl Cli {
    fn run(&self) -> ExitCode {
        self.execute().map_or_else(
            |e| {
                eprintln!("{e}");
                ExitCode::FAILURE
            },
            |_| ExitCode::SUCCESS,
        )
    }

    fn execute(&self) -> CliResult<()> {
        let options = self.options()?;
        let data = read(&self.input).map_err(CliError::Read)?;

        let mut hinter = Hinter::new(options)?;
        if self.verbose {
            hinter = hinter.with_progress(|p: Progress| {
                eprint!("\rglyph {}/{}", p.glyph_index + 1, p.num_glyphs);
                false
            });
        }

        let result = hinter.hint(&data);
        if self.verbose {
            eprintln!();
        }
        match result {
            Ok(hinted) => {
                write(&self.output, hinted).map_err(CliError::Write)?;
                Ok(())
            }
            Err(err) => {
                // never leave a partial or stale output file behind
                let _ = remove_file(&self.output);
                Err(err.into())
            }
        }
    }

    fn options(&self) -> CliResult<Options> {
        let mut options = Options::new()
            .hinting_range(self.hinting_range_min, self.hinting_range_max)
            .hinting_limit(self.hinting_limit)
            .increase_x_height(self.increase_x_height)
            .symbol(self.symbol)
            .ignore_restrictions(self.ignore_restrictions);

        options.fallback_script = match self.fallback_script.as_str() {
            "none" => FallbackScript::None,
            "latin" => FallbackScript::Latin,
            other => {
                return Err(CliError::Message(format!(
                    "unknown fallback script '{other}' (expected 'none' or 'latin')"
                )))
            }
        };

        options.gray_strong_stem_width = self.strong_stem_width.contains('g');
        options.gdi_cleartype_strong_stem_width = self.strong_stem_width.contains('G');
        options.dw_cleartype_strong_stem_width = self.strong_stem_width.contains('D');
        if let Some(bad) = self.strong_stem_width.chars().find(|c| !"gGD".contains(*c)) {
            return Err(CliError::Message(format!(
                "unknown stem width target '{bad}' (expected a combination of g, G, D)"
            )));
        }

        options.hint_with_components = self.hint_with_components;
        options.pre_hinting = self.pre_hinting;
        if let Some(list) = &self.x_height_snapping_exceptions {
            options.snap_exceptions = SnapExceptions::parse(list)?;
        }

        options.validate()?;
        Ok(options)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_default_env()
        .filter_level(if cli.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init();
    cli.run()
}
