//! A table-driven PGN scanner.
//!
//! The hot loop walks the mapped byte range exactly once, classifying each
//! byte ([`classify`]) and dispatching on a `state x token` transition table.
//! State transitions are data, not control flow; the only lookaheads are the
//! bounded peeks that tell `0-0` castling from a `0-1` result, spot the
//! `FEN "` tag prefix, and spot an `[Event` tag inside an unclosed comment.
//!
//! Real-world corpora are full of damage the table has to absorb: byte-order
//! marks, unclosed brace comments, nested variations, numeric annotation
//! glyphs, missing results, and castling spelled with digit zeros.

pub mod classify;

use arrayvec::ArrayVec;

use crate::{
    errors::PgnError,
    pgn::classify::{TOKEN_COUNT, Token, token_of},
};

/// Nesting bound for tags, comments and variations.
pub const MAX_STACK: usize = 16;
/// Bound on the zero-terminated SAN token stream of a single game.
pub const SAN_BUFFER_SIZE: usize = 8 * 1024;
/// Bound on a seed-position FEN string.
pub const FEN_BUFFER_SIZE: usize = 256;

/// Result of a game, in Polyglot `learn`-field encoding.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum GameResult {
    WhiteWin = 0,
    BlackWin = 1,
    Draw = 2,
    Unknown = 3,
}

/// A completed game, borrowed from the parser's scratch buffers.
#[derive(Debug)]
pub struct GameRecord<'a> {
    /// Seed position, when the game carried a `[FEN "..."]` tag.
    pub fen: Option<&'a [u8]>,
    /// Zero-terminated SAN tokens in play order.
    pub sans: &'a [u8],
    pub result: GameResult,
    /// Byte offset of the game's first tag (or first move) in the input.
    pub offset: usize,
}

impl GameRecord<'_> {
    pub fn san_tokens(&self) -> impl Iterator<Item = &[u8]> {
        self.sans.split(|&b| b == 0).filter(|t| !t.is_empty())
    }
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct ParseStats {
    pub games: u64,
    pub moves: u64,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
enum State {
    Header,
    Tag,
    FenTag,
    BraceComment,
    Variation,
    Nag,
    NextMove,
    MoveNumber,
    NextSan,
    ReadSan,
    Result,
}

const STATE_COUNT: usize = 11;

impl State {
    const fn name(self) -> &'static str {
        match self {
            Self::Header => "HEADER",
            Self::Tag => "TAG",
            Self::FenTag => "FEN_TAG",
            Self::BraceComment => "BRACE_COMMENT",
            Self::Variation => "VARIATION",
            Self::Nag => "NUMERIC_ANNOTATION_GLYPH",
            Self::NextMove => "NEXT_MOVE",
            Self::MoveNumber => "MOVE_NUMBER",
            Self::NextSan => "NEXT_SAN",
            Self::ReadSan => "READ_SAN",
            Self::Result => "RESULT",
        }
    }
}

/// The primitive actions the transition table can name.
#[derive(Clone, Copy, Debug)]
enum Step {
    Continue,
    Fail,
    OpenTag,
    OpenBraceComment,
    OpenVariation,
    StartNag,
    PopState,
    ReadFen,
    CloseFenTag,
    StartMoveNumber,
    StartNextSan,
    CastleOrResult,
    StartReadSan,
    ReadMoveChar,
    EndMove,
    StartResult,
    EndGame,
    TagInBrace,
    MissingResult,
}

static TO_STEP: [[Step; TOKEN_COUNT]; STATE_COUNT] = build_transitions();

#[allow(clippy::too_many_lines)]
const fn build_transitions() -> [[Step; TOKEN_COUNT]; STATE_COUNT] {
    let mut table = [[Step::Fail; TOKEN_COUNT]; STATE_COUNT];

    // Between games: anything that is not the start of a tag, a comment or
    // movetext is skipped, which also swallows BOMs and leading junk.
    let mut header = [Step::Continue; TOKEN_COUNT];
    header[Token::Result as usize] = Step::StartResult;
    header[Token::LeftBracket as usize] = Step::OpenTag;
    header[Token::LeftBrace as usize] = Step::OpenBraceComment;
    header[Token::Zero as usize] = Step::CastleOrResult;
    header[Token::Digit as usize] = Step::StartMoveNumber;
    table[State::Header as usize] = header;

    let mut tag = [Step::Continue; TOKEN_COUNT];
    tag[Token::RightBracket as usize] = Step::PopState;
    table[State::Tag as usize] = tag;

    let mut fen_tag = [Step::ReadFen; TOKEN_COUNT];
    fen_tag[Token::Quotes as usize] = Step::CloseFenTag;
    table[State::FenTag as usize] = fen_tag;

    let mut brace = [Step::Continue; TOKEN_COUNT];
    brace[Token::LeftBrace as usize] = Step::OpenBraceComment;
    brace[Token::RightBrace as usize] = Step::PopState;
    brace[Token::LeftBracket as usize] = Step::TagInBrace;
    table[State::BraceComment as usize] = brace;

    let mut variation = [Step::Continue; TOKEN_COUNT];
    variation[Token::LeftParenthesis as usize] = Step::OpenVariation;
    variation[Token::RightParenthesis as usize] = Step::PopState;
    variation[Token::LeftBrace as usize] = Step::OpenBraceComment;
    variation[Token::LeftBracket as usize] = Step::TagInBrace;
    table[State::Variation as usize] = variation;

    // A NAG is `$` plus digits; the delimiter is handed back to the state
    // that the glyph interrupted.
    let mut nag = [Step::PopState; TOKEN_COUNT];
    nag[Token::Zero as usize] = Step::Continue;
    nag[Token::Digit as usize] = Step::Continue;
    table[State::Nag as usize] = nag;

    let mut next_move = [Step::Fail; TOKEN_COUNT];
    next_move[Token::Spaces as usize] = Step::Continue;
    next_move[Token::Result as usize] = Step::StartResult;
    next_move[Token::Minus as usize] = Step::StartReadSan;
    next_move[Token::Dot as usize] = Step::Continue;
    next_move[Token::Dollar as usize] = Step::StartNag;
    next_move[Token::LeftBracket as usize] = Step::MissingResult;
    next_move[Token::LeftBrace as usize] = Step::OpenBraceComment;
    next_move[Token::RightBrace as usize] = Step::Continue;
    next_move[Token::LeftParenthesis as usize] = Step::OpenVariation;
    next_move[Token::RightParenthesis as usize] = Step::Continue;
    next_move[Token::Zero as usize] = Step::CastleOrResult;
    next_move[Token::Digit as usize] = Step::StartMoveNumber;
    next_move[Token::MoveHead as usize] = Step::StartReadSan;
    table[State::NextMove as usize] = next_move;

    let mut move_number = [Step::Fail; TOKEN_COUNT];
    move_number[Token::Spaces as usize] = Step::Continue;
    move_number[Token::Result as usize] = Step::StartResult;
    move_number[Token::Minus as usize] = Step::StartResult;
    move_number[Token::Dot as usize] = Step::StartNextSan;
    move_number[Token::Dollar as usize] = Step::StartNag;
    move_number[Token::LeftBracket as usize] = Step::MissingResult;
    move_number[Token::LeftBrace as usize] = Step::OpenBraceComment;
    move_number[Token::LeftParenthesis as usize] = Step::OpenVariation;
    move_number[Token::Zero as usize] = Step::Continue;
    move_number[Token::Digit as usize] = Step::Continue;
    move_number[Token::MoveHead as usize] = Step::StartReadSan;
    table[State::MoveNumber as usize] = move_number;

    // NEXT_SAN also accepts a move number, so that `1. e4 1... e5` and a
    // black-to-move seed position both work without special cases.
    table[State::NextSan as usize] = table[State::NextMove as usize];

    let mut read_san = [Step::ReadMoveChar; TOKEN_COUNT];
    read_san[Token::Spaces as usize] = Step::EndMove;
    read_san[Token::Result as usize] = Step::EndMove;
    read_san[Token::Dot as usize] = Step::EndMove;
    read_san[Token::Dollar as usize] = Step::EndMove;
    read_san[Token::LeftBracket as usize] = Step::EndMove;
    read_san[Token::LeftBrace as usize] = Step::EndMove;
    read_san[Token::RightBrace as usize] = Step::EndMove;
    read_san[Token::LeftParenthesis as usize] = Step::EndMove;
    read_san[Token::RightParenthesis as usize] = Step::EndMove;
    read_san[Token::Quotes as usize] = Step::Fail;
    read_san[Token::RightBracket as usize] = Step::Fail;
    table[State::ReadSan as usize] = read_san;

    let mut result = [Step::Continue; TOKEN_COUNT];
    result[Token::Spaces as usize] = Step::EndGame;
    result[Token::LeftBracket as usize] = Step::EndGame;
    result[Token::LeftBrace as usize] = Step::EndGame;
    table[State::Result as usize] = result;

    table
}

fn result_from_window(window: &[u8]) -> GameResult {
    if window.starts_with(b"1-") {
        GameResult::WhiteWin
    } else if window.starts_with(b"0-") {
        GameResult::BlackWin
    } else if window.starts_with(b"1/") {
        GameResult::Draw
    } else {
        GameResult::Unknown
    }
}

fn error_window(data: &[u8], offset: usize) -> String {
    let end = (offset + 50).min(data.len());
    String::from_utf8_lossy(&data[offset..end]).into_owned()
}

/// Scan `data` once, invoking `on_game` for every completed game.
///
/// Games are delivered in file order. A pending game with a non-empty move
/// buffer is flushed at end of input even without a result or trailing
/// newline.
pub fn parse<F>(data: &[u8], mut on_game: F) -> Result<ParseStats, PgnError>
where
    F: FnMut(&GameRecord<'_>),
{
    Parser::new().run(data, &mut on_game)
}

struct Parser {
    state: State,
    stack: ArrayVec<State, MAX_STACK>,
    san_buf: Vec<u8>,
    fen_buf: Vec<u8>,
    /// Does the SAN token being collected belong to White?
    side_white: bool,
    /// Start offset of the token that may turn out to be the game result.
    result_start: usize,
    number_start: usize,
    game_offset: Option<usize>,
    move_count: u64,
    stats: ParseStats,
}

impl Parser {
    fn new() -> Self {
        Self {
            state: State::Header,
            stack: ArrayVec::new(),
            san_buf: Vec::with_capacity(SAN_BUFFER_SIZE),
            fen_buf: Vec::with_capacity(FEN_BUFFER_SIZE),
            side_white: true,
            result_start: 0,
            number_start: 0,
            game_offset: None,
            move_count: 0,
            stats: ParseStats::default(),
        }
    }

    #[allow(clippy::too_many_lines)]
    fn run<F>(mut self, data: &[u8], on_game: &mut F) -> Result<ParseStats, PgnError>
    where
        F: FnMut(&GameRecord<'_>),
    {
        let mut i = 0usize;
        while i < data.len() {
            let byte = data[i];
            let token = token_of(byte);
            let step = TO_STEP[self.state as usize][token as usize];

            match step {
                Step::Continue => i += 1,
                Step::Fail => {
                    return Err(PgnError::Transition {
                        state: self.state.name(),
                        offset: i,
                        window: error_window(data, i),
                    });
                }
                Step::OpenTag => {
                    i = self.open_tag(data, i)?;
                }
                Step::OpenBraceComment => {
                    self.push_state(i)?;
                    self.state = State::BraceComment;
                    i += 1;
                }
                Step::OpenVariation => {
                    self.push_state(i)?;
                    self.state = State::Variation;
                    i += 1;
                }
                Step::StartNag => {
                    self.push_state(i)?;
                    self.state = State::Nag;
                    i += 1;
                }
                Step::PopState => {
                    // a NAG's delimiter is reprocessed by the restored state
                    let reprocess = self.state == State::Nag;
                    self.state = self
                        .stack
                        .pop()
                        .ok_or(PgnError::StackUnderflow { offset: i })?;
                    if !reprocess {
                        i += 1;
                    }
                }
                Step::ReadFen => {
                    if self.fen_buf.len() >= FEN_BUFFER_SIZE {
                        return Err(PgnError::FenBufferOverflow { offset: i });
                    }
                    self.fen_buf.push(byte);
                    i += 1;
                }
                Step::CloseFenTag => {
                    self.state = State::Tag;
                    i += 1;
                }
                Step::StartMoveNumber => {
                    self.game_offset.get_or_insert(i);
                    self.number_start = i;
                    self.state = State::MoveNumber;
                    i += 1;
                }
                Step::StartNextSan => {
                    self.state = State::NextSan;
                    i += 1;
                }
                Step::CastleOrResult => {
                    // `0-0...` is castling; `0-1`, `0-0-1` and friends are
                    // results. Only the third byte tells them apart.
                    self.game_offset.get_or_insert(i);
                    let castles = data.get(i + 1) == Some(&b'-')
                        && matches!(data.get(i + 2), Some(&(b'0' | b'O')));
                    if castles {
                        self.push_san_byte(b'0', i)?;
                        self.state = State::ReadSan;
                    } else {
                        self.result_start = i;
                        self.state = State::Result;
                    }
                    i += 1;
                }
                Step::StartReadSan => {
                    self.game_offset.get_or_insert(i);
                    self.push_san_byte(byte, i)?;
                    self.state = State::ReadSan;
                    i += 1;
                }
                Step::ReadMoveChar => {
                    self.push_san_byte(byte, i)?;
                    i += 1;
                }
                Step::EndMove => {
                    // the delimiter is not consumed; the successor state
                    // decides what it means
                    self.end_token();
                }
                Step::StartResult => {
                    self.result_start = if self.state == State::MoveNumber {
                        self.number_start
                    } else {
                        i
                    };
                    self.state = State::Result;
                    i += 1;
                }
                Step::EndGame => {
                    if byte == b'\n' || byte == b'\r' {
                        let result = result_from_window(&data[self.result_start..i]);
                        self.finish_game(result, on_game);
                        i += 1;
                    } else if token == Token::Spaces {
                        i += 1;
                    } else {
                        // a tag or comment on the result line also ends the
                        // game; the byte is reprocessed from HEADER
                        let result = result_from_window(&data[self.result_start..i]);
                        self.finish_game(result, on_game);
                    }
                }
                Step::TagInBrace => {
                    // an `[Event` tag inside an unclosed comment or variation
                    // means a new game has begun
                    if data.len() >= i + 6 && &data[i + 1..i + 6] == b"Event" {
                        self.finish_game(GameResult::Unknown, on_game);
                        self.stack.clear();
                        i = self.open_tag(data, i)?;
                    } else {
                        i += 1;
                    }
                }
                Step::MissingResult => {
                    // a new tag arrived while we were still expecting moves
                    self.finish_game(GameResult::Unknown, on_game);
                    self.stack.clear();
                    i = self.open_tag(data, i)?;
                }
            }
        }

        // flush whatever the input ended in the middle of
        match self.state {
            State::Result => {
                let result = result_from_window(&data[self.result_start..]);
                self.finish_game(result, on_game);
            }
            State::ReadSan => {
                self.end_token();
                self.finish_game(GameResult::Unknown, on_game);
            }
            _ => {
                if !self.san_buf.is_empty() {
                    self.finish_game(GameResult::Unknown, on_game);
                }
            }
        }

        Ok(self.stats)
    }

    /// Enter a tag at the `[` found at `data[i]`, detecting the seed-FEN tag
    /// by its `FEN "` prefix. Returns the next byte offset to process.
    fn open_tag(&mut self, data: &[u8], i: usize) -> Result<usize, PgnError> {
        if self.stack.try_push(State::Header).is_err() {
            return Err(PgnError::StackOverflow { offset: i });
        }
        self.game_offset.get_or_insert(i);
        if data.len() >= i + 6 && &data[i + 1..i + 6] == b"FEN \"" {
            self.fen_buf.clear();
            self.state = State::FenTag;
            Ok(i + 6)
        } else {
            self.state = State::Tag;
            Ok(i + 1)
        }
    }

    fn push_state(&mut self, i: usize) -> Result<(), PgnError> {
        self.stack
            .try_push(self.state)
            .map_err(|_| PgnError::StackOverflow { offset: i })
    }

    fn push_san_byte(&mut self, byte: u8, i: usize) -> Result<(), PgnError> {
        // leave room for the terminator
        if self.san_buf.len() + 2 > SAN_BUFFER_SIZE {
            return Err(PgnError::SanBufferOverflow { offset: i });
        }
        self.san_buf.push(byte);
        Ok(())
    }

    fn end_token(&mut self) {
        self.san_buf.push(0);
        self.move_count += 1;
        self.state = if self.side_white {
            State::NextSan
        } else {
            State::NextMove
        };
        self.side_white = !self.side_white;
    }

    fn finish_game<F>(&mut self, result: GameResult, on_game: &mut F)
    where
        F: FnMut(&GameRecord<'_>),
    {
        self.stats.games += 1;
        self.stats.moves += self.move_count;
        if !self.san_buf.is_empty() {
            let record = GameRecord {
                fen: if self.fen_buf.is_empty() {
                    None
                } else {
                    Some(&self.fen_buf)
                },
                sans: &self.san_buf,
                result,
                offset: self.game_offset.unwrap_or(0),
            };
            on_game(&record);
        }
        self.san_buf.clear();
        self.fen_buf.clear();
        self.move_count = 0;
        self.side_white = true;
        self.game_offset = None;
        self.state = State::Header;
    }
}
