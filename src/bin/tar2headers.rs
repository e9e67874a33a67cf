//! Reads a tar archive from stdin and prints one JSON record per entry to stdout.

use std::io::{stdin, stdout, BufReader};

use anyhow::{Context, Result};
use clap::Parser;

use tar2headers::{drain, stream_headers, CancellationToken, JsonLinesSink, Limits, TarDecoder};

/// tar2headers
///
/// Reads a tar archive on standard input and writes the header of every entry as one
/// line of JSON on standard output. Entry contents are skipped.
#[derive(Debug, Parser)]
#[clap(name = "tar2headers", version)]
pub struct App {}

fn main() -> Result<()> {
    env_logger::init();

    let _args = App::parse();

    // nothing cancels a command-line run; it ends with the archive or the first error
    let token = CancellationToken::new();

    let mut archive = tar::Archive::new(BufReader::new(stdin().lock()));
    let decoder = TarDecoder::new(&mut archive, Limits::default())?;
    let mut sink = JsonLinesSink::new(stdout().lock());

    let written = drain(stream_headers(decoder), &mut sink, &token)
        .context("failed to convert archive headers")?;
    log::debug!("{written} entries");

    Ok(())
}
