use std::{fs::File, io::Read, path::Path};

use anyhow::Context;

use crate::{
    book::zobrist,
    chess::{
        attacks,
        board::Board,
        chessmove::Move,
        piece::Colour,
        types::Square,
    },
};

/// One observation: a position key, an encoded move, the move's weight
/// within its position, and the opaque learn payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub key: u64,
    pub mv: u16,
    pub weight: u16,
    pub learn: u32,
}

impl Entry {
    pub const SIZE: usize = 16;

    /// Serialize as a Polyglot record: every field big-endian, key first.
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..8].copy_from_slice(&self.key.to_be_bytes());
        bytes[8..10].copy_from_slice(&self.mv.to_be_bytes());
        bytes[10..12].copy_from_slice(&self.weight.to_be_bytes());
        bytes[12..16].copy_from_slice(&self.learn.to_be_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            key: u64::from_be_bytes(bytes[0..8].try_into().unwrap()),
            mv: u16::from_be_bytes(bytes[8..10].try_into().unwrap()),
            weight: u16::from_be_bytes(bytes[10..12].try_into().unwrap()),
            learn: u32::from_be_bytes(bytes[12..16].try_into().unwrap()),
        }
    }
}

/// Encode a move in Polyglot form: destination in bits 0-5, origin in bits
/// 6-11, promotion piece in bits 12-13 (knight = 1 .. queen = 4).
///
/// Castling needs no translation: both this crate and the book format use
/// the king-captures-own-rook convention.
pub fn encode_move(m: Move) -> u16 {
    let promo = m
        .promotion_type()
        .map_or(0, |pt| u16::from(pt.inner()));
    u16::from(m.to()) | u16::from(m.from()) << 6 | promo << 12
}

const fn piece_kind(piece: crate::chess::piece::Piece) -> usize {
    piece.piece_type().index() * 2 + (matches!(piece.colour(), Colour::White) as usize)
}

/// The Polyglot Zobrist key of a position.
///
/// The en-passant file is folded in only when a pawn of the side to move
/// could actually make the capture; a bare double-push does not change
/// the key.
pub fn position_key(board: &Board) -> u64 {
    let mut key = 0u64;

    for sq in board.occupied() {
        let piece = board.piece_at(sq).unwrap();
        key ^= zobrist::RANDOM64[64 * piece_kind(piece) + sq.index()];
    }

    let rights = board.castling_rights();
    if rights.kingside(Colour::White) {
        key ^= zobrist::RANDOM64[zobrist::CASTLE];
    }
    if rights.queenside(Colour::White) {
        key ^= zobrist::RANDOM64[zobrist::CASTLE + 1];
    }
    if rights.kingside(Colour::Black) {
        key ^= zobrist::RANDOM64[zobrist::CASTLE + 2];
    }
    if rights.queenside(Colour::Black) {
        key ^= zobrist::RANDOM64[zobrist::CASTLE + 3];
    }

    if let Some(ep) = board.ep_sq() {
        if ep_capture_possible(board, ep) {
            key ^= zobrist::RANDOM64[zobrist::EN_PASSANT + ep.file().index()];
        }
    }

    if board.turn() == Colour::White {
        key ^= zobrist::RANDOM64[zobrist::TURN];
    }

    key
}

fn ep_capture_possible(board: &Board, ep: Square) -> bool {
    let us = board.turn();
    let capturers = attacks::pawn_attacks_by(ep.as_set(), !us)
        & board.pieces(us, crate::chess::piece::PieceType::Pawn);
    capturers.non_empty()
}

/// A reader over a finished book file, for probing positions the way book
/// consumers do. Records are expected in ascending key order.
pub struct Book {
    entries: Vec<Entry>,
}

impl Book {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let mut file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .with_context(|| format!("failed to read {}", path.display()))?;
        anyhow::ensure!(
            data.len() % Entry::SIZE == 0,
            "{} is not a whole number of {}-byte records",
            path.display(),
            Entry::SIZE
        );
        let entries = data
            .chunks_exact(Entry::SIZE)
            .map(|chunk| Entry::from_bytes(chunk.try_into().unwrap()))
            .collect();
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Index of the leftmost record with the given key.
    pub fn find_first(&self, key: u64) -> usize {
        self.entries.partition_point(|e| e.key < key)
    }

    /// All records for a position, in stored order.
    pub fn entries_for(&self, key: u64) -> &[Entry] {
        let start = self.find_first(key);
        let end = start
            + self.entries[start..]
                .iter()
                .take_while(|e| e.key == key)
                .count();
        &self.entries[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::piece::PieceType;

    #[test]
    fn record_layout_is_big_endian() {
        let entry = Entry {
            key: 0x0123_4567_89AB_CDEF,
            mv: 0x0123,
            weight: 0x4567,
            learn: 0x89AB_CDEF,
        };
        let bytes = entry.to_bytes();
        assert_eq!(
            bytes,
            [
                0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF, 0x01, 0x23, 0x45, 0x67, 0x89,
                0xAB, 0xCD, 0xEF
            ]
        );
        assert_eq!(Entry::from_bytes(&bytes), entry);
    }

    #[test]
    fn move_encoding() {
        // e2e4
        assert_eq!(encode_move(Move::new(Square::E2, Square::E4)), 0x031C);
        // white short castle is king takes h1 rook
        assert_eq!(
            encode_move(Move::new_with_flags(
                Square::E1,
                Square::H1,
                crate::chess::chessmove::MoveFlags::Castle
            )),
            0x0107
        );
        // a7a8=Q: from 48, to 56, promo 4
        assert_eq!(
            encode_move(Move::new_with_promo(Square::A7, Square::A8, PieceType::Queen)),
            0x4C38
        );
        assert_eq!(
            encode_move(Move::new_with_promo(Square::A7, Square::A8, PieceType::Knight)),
            0x1C38
        );
    }

    #[test]
    fn key_of_the_starting_position() {
        let board = Board::default();
        assert_eq!(position_key(&board), 0x463B_9618_1691_FC9C);
    }

    /// The key sequence published with the book format specification.
    #[test]
    fn key_test_vectors() {
        let vectors: [(&str, u64); 8] = [
            (
                "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
                0x823C_9B50_FD11_4196,
            ),
            (
                "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2",
                0x0756_B944_61C5_0FB0,
            ),
            (
                "rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR b KQkq - 0 2",
                0x662F_AFB9_65DB_29D4,
            ),
            (
                "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
                0x22A4_8B5A_8E47_FF78,
            ),
            (
                "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPPKPPP/RNBQ1BNR b kq - 0 3",
                0x652A_607C_A3F2_42C1,
            ),
            (
                "rnbq1bnr/ppp1pkpp/8/3pPp2/8/8/PPPPKPPP/RNBQ1BNR w - - 0 4",
                0x00FD_D303_C946_BDD9,
            ),
            (
                "rnbqkbnr/p1pppppp/8/8/PpP4P/8/1P1PPPP1/RNBQKBNR b KQkq c3 0 3",
                0x3C81_23EA_7B06_7637,
            ),
            (
                "rnbqkbnr/p1pppppp/8/8/P6P/R1p5/1P1PPPP1/1NBQKBNR b Kkq - 0 4",
                0x5C3F_9B82_9B27_9560,
            ),
        ];
        for (fen, want) in vectors {
            let board = Board::from_fen(fen).unwrap();
            assert_eq!(position_key(&board), want, "fen {fen}");
        }
    }

    #[test]
    fn uncapturable_ep_square_does_not_hash() {
        // after 1. e4 the ep square e3 is set, but no black pawn can take
        let mut board = Board::default();
        board.make_move(Move::new(Square::E2, Square::E4));
        assert_eq!(board.ep_sq(), Some(Square::E3));
        assert_eq!(position_key(&board), 0x823C_9B50_FD11_4196);
    }
}
