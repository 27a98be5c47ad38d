#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]

//! polyscribe, a PGN-to-Polyglot opening book compiler.

mod book;
mod chess;
mod cli;
mod errors;
mod pgn;
mod source;

use std::time::Instant;

use crate::{book::Builder, cli::Mode, source::Source};

fn main() -> anyhow::Result<()> {
    let cli = <cli::Cli as clap::Parser>::parse();

    let started = Instant::now();
    let input = Source::map(&cli.pgn)?;
    eprintln!("mapped {} ({} bytes)", cli.pgn.display(), input.len());

    let mut builder = Builder::with_input_size(input.len());
    eprintln!("processing...");
    let stats = pgn::parse(input.as_bytes(), |game| builder.add_game(game))?;

    eprintln!("sorting...");
    let unique_keys = builder.aggregate();

    let book_path = cli.pgn.with_extension("bin");
    eprintln!("writing {}...", book_path.display());
    let records = builder.write_book(&book_path, cli.mode == Mode::Full)?;

    let elapsed = started.elapsed().as_secs_f64().max(1e-9);
    eprintln!();
    eprintln!("games:          {}", stats.games);
    eprintln!("moves:          {}", stats.moves);
    eprintln!("bad games:      {}", builder.bad_games);
    eprintln!("unique keys:    {unique_keys}");
    eprintln!("records:        {records}");
    eprintln!("games/second:   {:.0}", stats.games as f64 / elapsed);
    eprintln!("moves/second:   {:.0}", stats.moves as f64 / elapsed);
    eprintln!(
        "MiB/second:     {:.1}",
        input.len() as f64 / (1024.0 * 1024.0) / elapsed
    );
    eprintln!("book file:      {}", book_path.display());
    eprintln!("elapsed (s):    {elapsed:.2}");

    Ok(())
}
