//! Demo binary for `packet_assembly`.
//!
//! Builds a synthetic quest document, splits it into fragments, feeds them
//! back through a reassembler and logs what happened.

mod cli;

use std::{error::Error, num::NonZeroUsize, process::ExitCode};

use clap::Parser;
use packet_assembly::{
    Document,
    FragmentationConfig,
    Fragmenter,
    Reassembler,
    ReassemblyOutcome,
    Tag,
};
use tracing::{error, info};

fn build_document(entries: u32) -> Document {
    (0..entries)
        .map(|entry| {
            let mut quest = Document::new();
            quest.insert("id", Tag::Long(i64::from(entry)));
            quest.insert("name", Tag::String(format!("Quest {entry}")));
            quest.insert("complete", Tag::Byte(i8::from(entry % 3 == 0)));
            (format!("quest{entry:06}"), Tag::Compound(quest))
        })
        .collect()
}

fn run(cli: &cli::Cli) -> Result<bool, Box<dyn Error>> {
    let fragment_cap = NonZeroUsize::new(cli.cap).ok_or("--cap must be greater than zero")?;
    let config = FragmentationConfig {
        fragment_cap,
        compression_level: cli.level,
        ..FragmentationConfig::default()
    };
    let fragmenter = Fragmenter::from_config(&config);
    let reassembler = Reassembler::from_config(&config);

    let document = build_document(cli.entries);
    let batch = fragmenter.split(&document)?;
    info!(
        entries = cli.entries,
        fragments = batch.len(),
        compressed_len = batch.total_size(),
        "split document"
    );

    let mut outcome = ReassemblyOutcome::Incomplete;
    for fragment in batch {
        outcome = reassembler.accept::<Document>(None, fragment)?;
    }
    let matched = outcome.into_complete().is_some_and(|rebuilt| rebuilt == document);
    info!(matched, "reassembled document");
    Ok(matched)
}

fn main() -> ExitCode {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!(error = %err, "round trip failed");
            ExitCode::FAILURE
        }
    }
}
