pub mod attacks;
pub mod board;
pub mod chessmove;
pub mod fen;
pub mod piece;
pub mod piecelayout;
pub mod squareset;
pub mod types;
