//! Command line interface for the `packet-assembly` demo binary.
//!
//! Provides a tiny CLI to exercise a split/reassemble round trip and to
//! drive man page generation.

use clap::Parser;

/// Command line arguments for the `packet-assembly` binary.
#[derive(Debug, Parser)]
#[command(
    name = "packet-assembly",
    version,
    about = "Split a synthetic document into fragments and reassemble it"
)]
pub struct Cli {
    /// Number of quest entries in the generated document.
    #[arg(short, long, default_value_t = 1_000)]
    pub entries: u32,

    /// Maximum bytes of compressed data per fragment.
    #[arg(short, long, default_value_t = 30_000)]
    pub cap: usize,

    /// Gzip level (0-9).
    #[arg(short, long, default_value_t = 6)]
    pub level: u32,
}
