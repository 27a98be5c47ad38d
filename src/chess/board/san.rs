use crate::{
    chess::{
        board::{Board, movegen::MoveList},
        chessmove::Move,
        piece::{Piece, PieceType},
        squareset::SquareSet,
        types::{File, Rank, Square},
    },
    errors::SanError,
};

/// A resolved SAN token: either a real move, or the notational pass `--`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanMove {
    Normal(Move),
    Null,
}

impl Board {
    /// Parses a move in Standard Algebraic Notation and resolves it against
    /// the current position.
    ///
    /// Ambiguous tokens are rejected. Overspecified moves (including long
    /// algebraic notation) are accepted, as are the common syntactical
    /// variations: castling with zeros, promotion without `=`, `:` or `-` as
    /// separators, and trailing check or annotation marks.
    ///
    /// The returned move is guaranteed to be legal. The null move `--` is
    /// reported separately; it is not a legal chess move.
    pub fn parse_san(&self, san: &str) -> Result<SanMove, SanError> {
        let san = san.trim();

        if san == "--" {
            return Ok(SanMove::Null);
        }

        // Handle castling
        match san.trim_end_matches(['+', '#', '!', '?']) {
            "O-O" | "0-0" => {
                return self
                    .find_castling_move(true)
                    .map(SanMove::Normal)
                    .ok_or_else(|| SanError::IllegalMove(san.to_string()));
            }
            "O-O-O" | "0-0-0" => {
                return self
                    .find_castling_move(false)
                    .map(SanMove::Normal)
                    .ok_or_else(|| SanError::IllegalMove(san.to_string()));
            }
            _ => (),
        }

        // Strip check, mate and annotation marks for parsing
        let trim = san.trim_end_matches(['+', '#', '!', '?']);
        let bytes = trim.as_bytes();

        if bytes.is_empty() {
            return Err(SanError::InvalidSan(san.to_string()));
        }

        // Determine piece type
        let piece_type = match bytes[0] {
            b'N' => PieceType::Knight,
            b'B' => PieceType::Bishop,
            b'R' => PieceType::Rook,
            b'Q' => PieceType::Queen,
            b'K' => PieceType::King,
            _ => PieceType::Pawn,
        };

        // Pawn moves aren't prefixed, but otherwise we need to advance
        // past the piece letter.
        let idx = usize::from(piece_type != PieceType::Pawn);

        // Split off the promotion suffix, written `e8=Q` or `e8Q`.
        let mut promo_idx = bytes.len();
        let promotion = if bytes.len() >= 2 {
            let maybe_promo = bytes[bytes.len() - 1];
            let promo_piece = match maybe_promo {
                b'N' | b'n' => Some(PieceType::Knight),
                b'B' | b'b' => Some(PieceType::Bishop),
                b'R' | b'r' => Some(PieceType::Rook),
                b'Q' | b'q' => Some(PieceType::Queen),
                _ => None,
            };
            if bytes[bytes.len() - 2] == b'=' {
                if promo_piece.is_none() {
                    return Err(SanError::InvalidSan(san.to_string()));
                }
                promo_idx = bytes.len() - 2;
                promo_piece
            } else if piece_type == PieceType::Pawn
                && promo_piece.is_some()
                && matches!(bytes[bytes.len() - 2], b'1' | b'8')
            {
                promo_idx = bytes.len() - 1;
                promo_piece
            } else {
                None
            }
        } else {
            None
        };

        // Target square is the last two characters before the promotion
        if promo_idx < idx + 2 {
            return Err(SanError::InvalidSan(san.to_string()));
        }

        let to_file = match bytes[promo_idx - 2] {
            c @ b'a'..=b'h' => File::from_index(c - b'a').unwrap(),
            _ => return Err(SanError::InvalidSan(san.to_string())),
        };
        let to_rank = match bytes[promo_idx - 1] {
            c @ b'1'..=b'8' => Rank::from_index(c - b'1').unwrap(),
            _ => return Err(SanError::InvalidSan(san.to_string())),
        };
        let to_square = Square::from_rank_file(to_rank, to_file);

        // Parse disambiguation and capture markers between piece and target
        let mut from_file: Option<File> = None;
        let mut from_rank: Option<Rank> = None;
        for &ch in &bytes[idx..promo_idx - 2] {
            match ch {
                b'a'..=b'h' => from_file = File::from_index(ch - b'a'),
                b'1'..=b'8' => from_rank = Rank::from_index(ch - b'1'),
                b'x' | b':' | b'-' => (),
                _ => return Err(SanError::InvalidSan(san.to_string())),
            }
        }

        // Build the mask of candidate source squares
        let mut from_mask = SquareSet::FULL;
        if let Some(file) = from_file {
            from_mask &= SquareSet::FILES[file];
        }
        if let Some(rank) = from_rank {
            from_mask &= SquareSet::RANKS[rank];
        }

        // A pawn move without a file disambiguator stays on the target file
        if piece_type == PieceType::Pawn && from_file.is_none() {
            from_mask &= SquareSet::FILES[to_file];
        }

        let us = self.turn();
        let moved_piece = Piece::new(us, piece_type);

        let mut matched_move: Option<Move> = None;
        let mut move_buffer = MoveList::new();
        self.generate_moves(&mut move_buffer);

        for &m in move_buffer.iter_moves() {
            if m.is_castle() || m.to() != to_square {
                continue;
            }
            if !from_mask.contains_square(m.from()) {
                continue;
            }
            if self.piece_at(m.from()) != Some(moved_piece) {
                continue;
            }
            if m.promotion_type() != promotion {
                continue;
            }
            if !self.is_legal(m) {
                continue;
            }
            if matched_move.is_some() {
                return Err(SanError::AmbiguousMove(san.to_string()));
            }
            matched_move = Some(m);
        }

        // A pawn reaching the back rank must say what it becomes
        if matched_move.is_none()
            && piece_type == PieceType::Pawn
            && promotion.is_none()
            && (to_rank == Rank::One || to_rank == Rank::Eight)
        {
            return Err(SanError::MissingPromotion(san.to_string()));
        }

        matched_move
            .map(SanMove::Normal)
            .ok_or_else(|| SanError::IllegalMove(san.to_string()))
    }

    fn find_castling_move(&self, kingside: bool) -> Option<Move> {
        let mut move_buffer = MoveList::new();
        self.generate_moves(&mut move_buffer);
        let found = move_buffer
            .iter_moves()
            .copied()
            .find(|m| {
                m.is_castle() && (m.to() > m.from()) == kingside
            })
            .filter(|&m| self.is_legal(m));
        found
    }
}
