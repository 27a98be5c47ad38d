use std::ops::Deref;

use arrayvec::ArrayVec;

use crate::chess::{
    attacks,
    board::Board,
    chessmove::{Move, MoveFlags},
    piece::{Colour, Piece, PieceType},
    squareset::SquareSet,
    types::{Rank, Square},
};

pub const MAX_POSITION_MOVES: usize = 218;

#[derive(Clone, Debug, Default)]
pub struct MoveList {
    inner: ArrayVec<Move, MAX_POSITION_MOVES>,
}

impl MoveList {
    pub fn new() -> Self {
        Self {
            inner: ArrayVec::new(),
        }
    }

    fn push(&mut self, m: Move) {
        self.inner.push(m);
    }

    pub fn iter_moves(&self) -> impl Iterator<Item = &Move> {
        self.inner.iter()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

impl Deref for MoveList {
    type Target = [Move];

    fn deref(&self) -> &[Move] {
        &self.inner
    }
}

const PROMOTION_TARGETS: [PieceType; 4] = [
    PieceType::Queen,
    PieceType::Rook,
    PieceType::Bishop,
    PieceType::Knight,
];

impl Board {
    /// Generate all pseudo-legal moves for the side to move. Castling is
    /// emitted only when the king's path is empty and unattacked, so the
    /// only remaining legality concern is king safety after the move.
    pub fn generate_moves(&self, move_list: &mut MoveList) {
        let us = self.turn();
        let them = !us;
        let occupied = self.occupied();
        let ours = self.occupied_co(us);
        let theirs = self.occupied_co(them);

        self.generate_pawn_moves(move_list, us, occupied, theirs);

        for pt in [
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Rook,
            PieceType::Queen,
            PieceType::King,
        ] {
            for from in self.pieces(us, pt) {
                let targets = attacks::attacks_by_type(pt, from, occupied) & !ours;
                for to in targets {
                    move_list.push(Move::new(from, to));
                }
            }
        }

        self.generate_castling(move_list, us, occupied);
    }

    fn generate_pawn_moves(
        &self,
        move_list: &mut MoveList,
        us: Colour,
        occupied: SquareSet,
        theirs: SquareSet,
    ) {
        let promo_rank = Rank::Eight.relative_to(us);
        let double_rank = Rank::Two.relative_to(us);

        for from in self.pieces(us, PieceType::Pawn) {
            // pushes
            if let Some(to) = from.pawn_push(us) {
                if !occupied.contains_square(to) {
                    if to.rank() == promo_rank {
                        for promo in PROMOTION_TARGETS {
                            move_list.push(Move::new_with_promo(from, to, promo));
                        }
                    } else {
                        move_list.push(Move::new(from, to));
                        if from.rank() == double_rank {
                            if let Some(double_to) = to.pawn_push(us) {
                                if !occupied.contains_square(double_to) {
                                    move_list.push(Move::new(from, double_to));
                                }
                            }
                        }
                    }
                }
            }

            // captures
            let targets = attacks::pawn_attacks_by(from.as_set(), us);
            for to in targets & theirs {
                if to.rank() == promo_rank {
                    for promo in PROMOTION_TARGETS {
                        move_list.push(Move::new_with_promo(from, to, promo));
                    }
                } else {
                    move_list.push(Move::new(from, to));
                }
            }
            if let Some(ep) = self.ep_sq() {
                if targets.contains_square(ep) {
                    move_list.push(Move::new_with_flags(from, ep, MoveFlags::EnPassant));
                }
            }
        }
    }

    fn generate_castling(&self, move_list: &mut MoveList, us: Colour, occupied: SquareSet) {
        let rights = self.castling_rights();
        let them = !us;
        let (king_from, king_rook, queen_rook) = match us {
            Colour::White => (Square::E1, Square::H1, Square::A1),
            Colour::Black => (Square::E8, Square::H8, Square::A8),
        };

        // a damaged seed position may claim rights it cannot have
        if self.piece_at(king_from) != Some(Piece::new(us, PieceType::King)) {
            return;
        }
        let rook = Piece::new(us, PieceType::Rook);

        if rights.kingside(us) && self.piece_at(king_rook) == Some(rook) {
            // f and g files, which the king crosses
            let between = king_from.as_set().east_one() | king_rook.as_set().west_one();
            let king_path = king_from.as_set() | between;
            if (occupied & between).is_empty() && !self.any_attacked(king_path, them) {
                move_list.push(Move::new_with_flags(king_from, king_rook, MoveFlags::Castle));
            }
        }
        if rights.queenside(us) && self.piece_at(queen_rook) == Some(rook) {
            // b, c and d files must be clear, but the king only crosses c and d
            let king_crossed = king_from.as_set().west_one() | king_from.as_set().west_one().west_one();
            let b_file = queen_rook.as_set().east_one();
            let king_path = king_from.as_set() | king_crossed;
            if (occupied & (king_crossed | b_file)).is_empty()
                && !self.any_attacked(king_path, them)
            {
                move_list.push(Move::new_with_flags(king_from, queen_rook, MoveFlags::Castle));
            }
        }
    }

    /// All fully legal moves; convenience for tests and SAN resolution.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut list = MoveList::new();
        self.generate_moves(&mut list);
        list.iter_moves()
            .copied()
            .filter(|&m| self.is_legal(m))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perft(board: &Board, depth: usize) -> u64 {
        if depth == 0 {
            return 1;
        }
        let mut nodes = 0;
        for m in board.legal_moves() {
            let mut next = board.clone();
            next.make_move(m);
            nodes += perft(&next, depth - 1);
        }
        nodes
    }

    #[test]
    fn perft_startpos() {
        let board = Board::default();
        assert_eq!(perft(&board, 1), 20);
        assert_eq!(perft(&board, 2), 400);
        assert_eq!(perft(&board, 3), 8902);
    }

    #[test]
    fn perft_castling_and_promotions() {
        // Kiwipete: exercises castling, en passant, promotions and pins.
        let board = Board::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&board, 1), 48);
        assert_eq!(perft(&board, 2), 2039);
    }

    #[test]
    fn perft_en_passant_discoveries() {
        let board = Board::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap();
        assert_eq!(perft(&board, 1), 14);
        assert_eq!(perft(&board, 2), 191);
        assert_eq!(perft(&board, 3), 2812);
    }

    #[test]
    fn castling_requires_safe_path() {
        // black rook on f8 guards f1
        let board = Board::from_fen("5r2/8/8/8/8/8/k7/4K2R w K - 0 1").unwrap();
        let legal = board.legal_moves();
        assert!(!legal.iter().any(|m| m.is_castle()));

        let board = Board::from_fen("8/8/8/8/8/8/k7/4K2R w K - 0 1").unwrap();
        let legal = board.legal_moves();
        assert!(legal.iter().any(|m| m.is_castle()));
    }
}
