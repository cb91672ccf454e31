use clap::{Args, Parser};
use std::path::PathBuf;

/// Build a server-ready DTED layout and its coverage index.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub enum Cli {
    /// Package an input DTED tree into a fresh output layout.
    Pack(Pack),

    /// Check a previously written index file.
    Validate(Validate),

    /// Print an index file's version, timestamp, and coverage rows.
    Show(Show),
}

#[derive(Debug, Clone, Args)]
pub struct Pack {
    /// Format version stamped into the index file.
    #[arg(long, default_value_t = 1)]
    pub index_version: u32,

    /// Input directory of DTED band directories.
    pub input_dir: PathBuf,

    /// Output directory; must not already exist.
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct Validate {
    /// Uncompressed index file.
    pub index: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct Show {
    /// Uncompressed index file.
    pub index: PathBuf,
}
