use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Compile a PGN game collection into a Polyglot opening book.
///
/// The book is written next to the input, with the extension replaced
/// by `.bin`.
#[derive(Parser)]
#[clap(author, version, about)]
pub struct Cli {
    /// The PGN file to process.
    pub pgn: PathBuf,
    /// Record emission mode.
    #[clap(value_enum, default_value_t = Mode::Unique)]
    pub mode: Mode,
}

#[derive(ValueEnum, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    /// Collapse repeated (position, move) observations into one record.
    Unique,
    /// Keep every observation; useful for diagnostic dumps.
    Full,
}
