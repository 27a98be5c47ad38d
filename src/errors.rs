use thiserror::Error;

use crate::chess::piece::Colour;

/// Errors that can occur when resolving SAN (Standard Algebraic Notation) moves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanError {
    #[error("invalid san: {0:?}")]
    InvalidSan(String),
    #[error("illegal san: {0:?}")]
    IllegalMove(String),
    #[error("ambiguous san: {0:?}")]
    AmbiguousMove(String),
    #[error("missing promotion piece type: {0:?}")]
    MissingPromotion(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenParseError {
    #[error("FEN string is missing board part")]
    MissingBoard,
    #[error("board part of FEN has {0} segments, expected 8")]
    BoardSegments(usize),
    #[error("wrong number of squares in board segment")]
    BadSquaresInSegment,
    #[error("unexpected character in piece placement: '{0}'")]
    UnexpectedCharacter(char),
    #[error("expected side to be 'w' or 'b', got \"{0}\"")]
    InvalidSide(String),
    #[error("invalid castling format: \"{0}\"")]
    InvalidCastling(String),
    #[error("{colour} king is missing")]
    MissingKing { colour: Colour },
    #[error("more than one {colour} king")]
    DuplicateKings { colour: Colour },
    #[error("pawns present on backranks")]
    PawnsOnBackranks,
    #[error("invalid en passant square: \"{0}\"")]
    InvalidEnPassant(String),
}

/// Fatal scanner errors. Each one cites the byte offset it was detected at;
/// transition failures also carry the parser state and a short window of the
/// offending input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PgnError {
    #[error("no transition from {state} at byte {offset}, near {window:?}")]
    Transition {
        state: &'static str,
        offset: usize,
        window: String,
    },
    #[error("comment or variation nesting too deep at byte {offset}")]
    StackOverflow { offset: usize },
    #[error("state stack underflow at byte {offset}")]
    StackUnderflow { offset: usize },
    #[error("game at byte {offset} overflows the per-game move buffer")]
    SanBufferOverflow { offset: usize },
    #[error("FEN tag at byte {offset} overflows the position buffer")]
    FenBufferOverflow { offset: usize },
}
