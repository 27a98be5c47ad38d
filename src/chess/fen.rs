use std::str::FromStr;

use arrayvec::ArrayVec;

use crate::{
    chess::{
        piece::{Colour, Piece, PieceType},
        types::{CastlingRights, Rank, Square},
    },
    errors::FenParseError,
};

/// A parsed FEN position description.
///
/// The halfmove clock and fullmove number are accepted but not retained;
/// nothing downstream of a seed position needs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fen {
    pub board: [Option<Piece>; 64],
    pub turn: Colour,
    pub castling: CastlingRights,
    pub ep: Option<Square>,
}

impl Fen {
    /// Parse a FEN string. Fields after the board part may be omitted and
    /// default to `w`, `-`, `-`; trailing clock fields are ignored.
    pub fn parse(fen: &str) -> Result<Self, FenParseError> {
        let mut tokens = fen.split_whitespace();

        let board_str = tokens.next().ok_or(FenParseError::MissingBoard)?;
        let board = Self::parse_board(board_str)?;

        let turn = match tokens.next() {
            Some("w") | None => Colour::White,
            Some("b") => Colour::Black,
            Some(s) => return Err(FenParseError::InvalidSide(s.to_string())),
        };

        let castling = match tokens.next() {
            Some(s) => Self::parse_castling(s)?,
            None => CastlingRights::default(),
        };

        let ep = match tokens.next() {
            Some("-") | None => None,
            Some(s) => Some(Self::parse_ep(s, turn)?),
        };

        Ok(Self {
            board,
            turn,
            castling,
            ep,
        })
    }

    fn parse_board(board_str: &str) -> Result<[Option<Piece>; 64], FenParseError> {
        let mut board = [None; 64];

        let mut ranks = ArrayVec::<&str, 8>::new();
        let mut board_parts = board_str.split('/');
        while let Some(rank) = board_parts.next() {
            if ranks.try_push(rank).is_err() {
                return Err(FenParseError::BoardSegments(8 + 1 + board_parts.count()));
            }
        }
        if ranks.len() != 8 {
            return Err(FenParseError::BoardSegments(ranks.len()));
        }

        for (rank_idx, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - rank_idx;
            let mut file = 0usize;
            for c in rank_str.chars() {
                match c {
                    '1'..='8' => {
                        file += c as usize - '0' as usize;
                    }
                    _ => {
                        let piece =
                            Piece::from_char(c).ok_or(FenParseError::UnexpectedCharacter(c))?;
                        if file >= 8 {
                            return Err(FenParseError::BadSquaresInSegment);
                        }
                        board[rank * 8 + file] = Some(piece);
                        file += 1;
                    }
                }
            }
            if file != 8 {
                return Err(FenParseError::BadSquaresInSegment);
            }
        }

        // pawns on sensible squares, exactly one king per side
        for (idx, piece) in board.iter().enumerate() {
            if let Some(p) = piece {
                if p.piece_type() == PieceType::Pawn && !(8..56).contains(&idx) {
                    return Err(FenParseError::PawnsOnBackranks);
                }
            }
        }
        for colour in Colour::all() {
            let king = Piece::new(colour, PieceType::King);
            match board.iter().filter(|&&p| p == Some(king)).count() {
                0 => return Err(FenParseError::MissingKing { colour }),
                1 => (),
                _ => return Err(FenParseError::DuplicateKings { colour }),
            }
        }

        Ok(board)
    }

    fn parse_castling(s: &str) -> Result<CastlingRights, FenParseError> {
        let mut rights = CastlingRights::default();
        if s == "-" {
            return Ok(rights);
        }
        for c in s.chars() {
            match c {
                'K' => rights.set_kingside(Colour::White),
                'Q' => rights.set_queenside(Colour::White),
                'k' => rights.set_kingside(Colour::Black),
                'q' => rights.set_queenside(Colour::Black),
                _ => return Err(FenParseError::InvalidCastling(s.to_string())),
            }
        }
        Ok(rights)
    }

    fn parse_ep(s: &str, turn: Colour) -> Result<Square, FenParseError> {
        let sq =
            Square::from_str(s).map_err(|_| FenParseError::InvalidEnPassant(s.to_string()))?;
        let expected = Rank::Six.relative_to(turn);
        if sq.rank() != expected {
            return Err(FenParseError::InvalidEnPassant(s.to_string()));
        }
        Ok(sq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_position() {
        let fen = Fen::parse("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
        assert_eq!(fen.turn, Colour::White);
        assert_eq!(fen.board[Square::E1.index()], Some(Piece::WK));
        assert_eq!(fen.board[Square::D8.index()], Some(Piece::BQ));
        assert_eq!(fen.board[Square::E4.index()], None);
        assert!(fen.castling.kingside(Colour::White));
        assert!(fen.castling.queenside(Colour::Black));
        assert_eq!(fen.ep, None);
    }

    #[test]
    fn board_only_is_accepted() {
        let fen = Fen::parse("8/P7/8/8/8/8/8/k6K").unwrap();
        assert_eq!(fen.turn, Colour::White);
        assert_eq!(fen.board[Square::A7.index()], Some(Piece::WP));
    }

    #[test]
    fn en_passant_square() {
        let fen =
            Fen::parse("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2").unwrap();
        assert_eq!(fen.ep, Some(Square::D6));
    }

    #[test]
    fn rejects_malformed_boards() {
        assert!(Fen::parse("").is_err());
        assert!(Fen::parse("8/8/8/8/8/8/8").is_err());
        assert!(Fen::parse("9/8/8/8/8/8/8/8 w - -").is_err());
        assert!(Fen::parse("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq -").is_err());
        // no kings
        assert!(Fen::parse("8/8/8/8/8/8/8/8 w - -").is_err());
        // pawn on the back rank
        assert!(Fen::parse("P7/8/8/8/8/8/8/k6K w - -").is_err());
    }
}
