use crate::chess::{
    piece::{Colour, Piece, PieceType},
    squareset::SquareSet,
    types::Square,
};

/// The square-sets of all the pieces on the board.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PieceLayout {
    pub pieces: [SquareSet; 6],
    pub colours: [SquareSet; 2],
}

impl PieceLayout {
    pub fn occupied(&self) -> SquareSet {
        self.colours[Colour::White.index()] | self.colours[Colour::Black.index()]
    }

    pub fn occupied_co(&self, colour: Colour) -> SquareSet {
        self.colours[colour.index()]
    }

    pub fn of(&self, colour: Colour, piece_type: PieceType) -> SquareSet {
        self.pieces[piece_type] & self.colours[colour.index()]
    }

    pub fn pawns(&self, colour: Colour) -> SquareSet {
        self.of(colour, PieceType::Pawn)
    }

    pub fn orthos(&self, colour: Colour) -> SquareSet {
        (self.pieces[PieceType::Rook] | self.pieces[PieceType::Queen])
            & self.colours[colour.index()]
    }

    pub fn diags(&self, colour: Colour) -> SquareSet {
        (self.pieces[PieceType::Bishop] | self.pieces[PieceType::Queen])
            & self.colours[colour.index()]
    }

    pub fn king_sq(&self, colour: Colour) -> Option<Square> {
        self.of(colour, PieceType::King).first()
    }

    pub fn set_piece_at(&mut self, sq: Square, piece: Piece) {
        let sq_bb = sq.as_set();
        self.pieces[piece.piece_type()] |= sq_bb;
        self.colours[piece.colour().index()] |= sq_bb;
    }

    pub fn clear_piece_at(&mut self, sq: Square, piece: Piece) {
        let sq_bb = sq.as_set();
        self.pieces[piece.piece_type()] &= !sq_bb;
        self.colours[piece.colour().index()] &= !sq_bb;
    }

    pub fn move_piece(&mut self, from: Square, to: Square, piece: Piece) {
        let from_to_bb = from.as_set() | to.as_set();
        self.pieces[piece.piece_type()] ^= from_to_bb;
        self.colours[piece.colour().index()] ^= from_to_bb;
    }
}
