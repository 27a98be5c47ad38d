//! Accumulates (position, move) observations from replayed games, then
//! sorts, frequency-weights, deduplicates and writes them out as a
//! Polyglot book.

pub mod polyglot;
pub mod zobrist;

use std::{
    collections::HashMap,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::Context;

use crate::{
    book::polyglot::Entry,
    chess::board::{Board, san::SanMove},
    pgn::GameRecord,
};

/// Offsets are stored as `offset >> 3` in 30 bits, good for 8 GiB of input.
const LEARN_OFFSET_MASK: u32 = 0x3FFF_FFFF;

#[derive(Default)]
pub struct Builder {
    entries: Vec<Entry>,
    /// Games abandoned on an unresolvable move or bad seed position.
    pub bad_games: u64,
}

impl Builder {
    /// Pre-size the entry buffer from the input length. The estimate is
    /// crude: roughly one entry per eight input bytes.
    pub fn with_input_size(bytes: usize) -> Self {
        Self {
            entries: Vec::with_capacity(2 * bytes / Entry::SIZE),
            bad_games: 0,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Replay one parsed game, emitting an entry per resolved move.
    ///
    /// An unresolvable token abandons the rest of the game but keeps the
    /// entries already emitted; the prefix of a damaged game is still a
    /// valid sequence of observations.
    pub fn add_game(&mut self, game: &GameRecord<'_>) {
        let mut board = match game.fen {
            None => Board::default(),
            Some(fen) => {
                let Some(board) = std::str::from_utf8(fen)
                    .ok()
                    .and_then(|fen| Board::from_fen(fen).ok())
                else {
                    self.bad_games += 1;
                    return;
                };
                board
            }
        };

        #[allow(clippy::cast_possible_truncation)]
        let learn = ((game.result as u32) << 30)
            | ((game.offset >> 3) as u32 & LEARN_OFFSET_MASK);

        for token in game.san_tokens() {
            let resolved = std::str::from_utf8(token)
                .ok()
                .and_then(|san| board.parse_san(san).ok());
            match resolved {
                Some(SanMove::Normal(m)) => {
                    self.entries.push(Entry {
                        key: polyglot::position_key(&board),
                        mv: polyglot::encode_move(m),
                        weight: 1,
                        learn,
                    });
                    board.make_move(m);
                }
                Some(SanMove::Null) => board.make_nullmove(),
                None => {
                    self.bad_games += 1;
                    return;
                }
            }
        }
    }

    /// Sort the accumulated entries and weight them by per-position move
    /// frequency. Returns the number of distinct keys.
    ///
    /// Runs of at least three entries get frequency weights; shorter runs
    /// keep weight 1. Every run is then ordered by descending weight, then
    /// descending move, so that probers see the popular choice first.
    pub fn aggregate(&mut self) -> u64 {
        self.entries.sort_unstable_by_key(|e| e.key);

        let mut unique_keys = 0u64;
        let mut counts: HashMap<u16, u32> = HashMap::new();
        let mut start = 0;
        while start < self.entries.len() {
            let key = self.entries[start].key;
            let end = start
                + self.entries[start..]
                    .iter()
                    .take_while(|e| e.key == key)
                    .count();

            let run = &mut self.entries[start..end];
            if run.len() > 2 {
                counts.clear();
                for entry in run.iter() {
                    *counts.entry(entry.mv).or_insert(0) += 1;
                }
                for entry in run.iter_mut() {
                    #[allow(clippy::cast_possible_truncation)]
                    let weight = counts[&entry.mv].min(u32::from(u16::MAX)) as u16;
                    entry.weight = weight;
                }
            }
            run.sort_unstable_by(|a, b| b.weight.cmp(&a.weight).then(b.mv.cmp(&a.mv)));

            unique_keys += 1;
            start = end;
        }
        unique_keys
    }

    /// Write the book. Consecutive records identical in (key, move) collapse
    /// to one unless `full` is set. Returns the number of records written.
    ///
    /// Call [`Builder::aggregate`] first; the writer relies on the sort.
    pub fn write_to(&self, writer: &mut impl Write, full: bool) -> std::io::Result<u64> {
        let mut written = 0u64;
        let mut prev: Option<(u64, u16)> = None;
        for entry in &self.entries {
            if !full && prev == Some((entry.key, entry.mv)) {
                continue;
            }
            debug_assert!(entry.weight >= 1);
            writer.write_all(&entry.to_bytes())?;
            prev = Some((entry.key, entry.mv));
            written += 1;
        }
        Ok(written)
    }

    pub fn write_book(&self, path: &Path, full: bool) -> anyhow::Result<u64> {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        let written = self
            .write_to(&mut writer, full)
            .with_context(|| format!("failed to write {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("failed to flush {}", path.display()))?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pgn;

    fn build(input: &str) -> Builder {
        let mut builder = Builder::default();
        pgn::parse(input.as_bytes(), |game| builder.add_game(game)).unwrap();
        builder
    }

    fn build_aggregated(input: &str) -> Builder {
        let mut builder = build(input);
        builder.aggregate();
        builder
    }

    fn written(builder: &Builder, full: bool) -> Vec<Entry> {
        let mut bytes = Vec::new();
        builder.write_to(&mut bytes, full).unwrap();
        bytes
            .chunks_exact(Entry::SIZE)
            .map(|chunk| Entry::from_bytes(chunk.try_into().unwrap()))
            .collect()
    }

    const START_KEY: u64 = 0x463B_9618_1691_FC9C;

    #[test]
    fn scholars_mate() {
        let builder = build("[Event \"t\"]\n1. e4 e5 2. Bc4 Nc6 3. Qh5 Nf6 4. Qxf7# 1-0\n");
        let entries = builder.entries();
        assert_eq!(entries.len(), 7);
        assert_eq!(entries[0].key, START_KEY);
        assert_eq!(entries[0].mv, 0x031C);
        assert_eq!(entries[1].key, 0x823C_9B50_FD11_4196);
        // every record of the game shares the result and offset payload
        assert!(entries.iter().all(|e| e.learn == entries[0].learn));
        assert_eq!(entries[0].learn >> 30, 0); // white win
        assert_eq!(builder.bad_games, 0);
    }

    #[test]
    fn replaying_the_game_reproduces_the_emitted_keys() {
        let input = "[Event \"t\"]\n1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 4. Ba4 Nf6 5. O-O Be7 1-0\n";
        let mut keys = Vec::new();
        pgn::parse(input.as_bytes(), |game| {
            let mut board = Board::default();
            for token in game.san_tokens() {
                let san = std::str::from_utf8(token).unwrap();
                match board.parse_san(san).unwrap() {
                    SanMove::Normal(m) => {
                        keys.push(polyglot::position_key(&board));
                        board.make_move(m);
                    }
                    SanMove::Null => board.make_nullmove(),
                }
            }
        })
        .unwrap();

        let builder = build(input);
        let emitted: Vec<u64> = builder.entries().iter().map(|e| e.key).collect();
        assert_eq!(emitted, keys);
    }

    #[test]
    fn castle_move_is_king_takes_rook() {
        let builder = build("1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. O-O O-O 1/2-1/2\n");
        let castle = builder
            .entries()
            .iter()
            .find(|e| e.mv == 0x0107)
            .expect("white short castle entry");
        assert_eq!(castle.learn >> 30, 2); // draw
    }

    #[test]
    fn promotion_from_seed_fen() {
        let builder = build("[FEN \"8/P7/8/8/8/8/8/k6K w - - 0 1\"]\n1. a8=Q 1-0\n");
        let entries = builder.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mv, 0x4C38);
        assert_eq!(entries[0].weight, 1);
    }

    #[test]
    fn frequency_weighting_orders_popular_moves_first() {
        let input = "[Event \"1\"]\n1. e4 *\n[Event \"2\"]\n1. e4 *\n[Event \"3\"]\n1. d4 *\n";
        let builder = build_aggregated(input);
        let records = written(&builder, false);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].mv, 0x031C); // e4, weight 2
        assert_eq!(records[0].weight, 2);
        assert_eq!(records[1].mv, 0x02DB); // d4, weight 1
        assert_eq!(records[1].weight, 1);
    }

    #[test]
    fn short_runs_keep_weight_one_but_are_ordered() {
        let input = "[Event \"1\"]\n1. e4 *\n[Event \"2\"]\n1. d4 *\n";
        let builder = build_aggregated(input);
        let records = written(&builder, false);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].weight, 1);
        assert_eq!(records[1].weight, 1);
        // descending move order within the equal-key, equal-weight run
        assert!(records[0].mv > records[1].mv);
    }

    #[test]
    fn duplicate_games_collapse() {
        let game = "1. e4 e5 2. Nf3 Nc6 1-0\n";
        let input = format!("[Event \"1\"]\n{game}[Event \"2\"]\n{game}");
        let builder = build_aggregated(&input);
        let records = written(&builder, false);
        assert_eq!(records.len(), 4);
        // full mode keeps both observations of each pair
        let full_records = written(&builder, true);
        assert_eq!(full_records.len(), 8);
    }

    #[test]
    fn written_records_are_sorted_and_unique() {
        let input = "[Event \"1\"]\n1. e4 e5 2. Nf3 Nc6 1-0\n\
                     [Event \"2\"]\n1. e4 e5 2. Nf3 Nf6 0-1\n\
                     [Event \"3\"]\n1. d4 d5 1/2-1/2\n";
        let builder = build_aggregated(input);
        let records = written(&builder, false);
        for pair in records.windows(2) {
            assert!(pair[0].key <= pair[1].key);
            if pair[0].key == pair[1].key {
                assert!((pair[0].weight, pair[0].mv) >= (pair[1].weight, pair[1].mv));
                assert!((pair[0].key, pair[0].mv) != (pair[1].key, pair[1].mv));
            }
            assert!(pair[0].weight >= 1 && pair[1].weight >= 1);
        }
    }

    #[test]
    fn unresolvable_move_keeps_the_prefix() {
        let builder = build("[Event \"t\"]\n1. e4 e5 2. Nf9 Nc6 1-0\n");
        assert_eq!(builder.bad_games, 1);
        assert_eq!(builder.entries().len(), 2);
    }

    #[test]
    fn null_moves_emit_no_entries() {
        let builder = build("[Event \"t\"]\n1. e4 -- 2. d4 e5 1-0\n");
        // e4, d4 and e5 produce entries; the pass does not
        assert_eq!(builder.entries().len(), 3);
    }

    #[test]
    fn idempotent_output() {
        let input = "[Event \"1\"]\n1. e4 e5 2. Nf3 Nc6 1-0\n[Event \"2\"]\n1. e4 d5 0-1\n";
        let one = {
            let builder = build_aggregated(input);
            let mut bytes = Vec::new();
            builder.write_to(&mut bytes, false).unwrap();
            bytes
        };
        let two = {
            let builder = build_aggregated(input);
            let mut bytes = Vec::new();
            builder.write_to(&mut bytes, false).unwrap();
            bytes
        };
        assert_eq!(one, two);
    }

    #[test]
    fn book_roundtrip_through_a_file() {
        let input = "[Event \"1\"]\n1. e4 e5 2. Nf3 Nc6 1-0\n[Event \"2\"]\n1. e4 e5 2. Nf3 Nf6 0-1\n";
        let mut builder = build(input);
        builder.aggregate();

        let dir = std::env::temp_dir().join("polyscribe-book-roundtrip");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.bin");
        let written_count = builder.write_book(&path, false).unwrap();

        let book = polyglot::Book::open(&path).unwrap();
        assert_eq!(book.len() as u64, written_count);

        // probing the start position finds e4 as the only move; its run of
        // two observations is too short for frequency weighting
        let start = book.entries_for(START_KEY);
        assert_eq!(start.len(), 1);
        assert_eq!(start[0].mv, 0x031C);
        assert_eq!(start[0].weight, 1);

        // the position after 1. e4 e5 2. Nf3 has two replies
        let after_nf3 = Board::from_fen(
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2",
        )
        .unwrap();
        let replies = book.entries_for(polyglot::position_key(&after_nf3));
        assert_eq!(replies.len(), 2);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn empty_input_writes_an_empty_book() {
        let builder = build_aggregated("");
        let records = written(&builder, false);
        assert!(records.is_empty());
    }
}
