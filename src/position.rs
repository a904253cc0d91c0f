// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use std::convert::TryFrom;
use std::fmt::{self, Write};

use crate::movegen::{MoveGenerator, MoveVec};
use crate::moves::Move;
use crate::types::TableIndex;
use crate::types::{
    CastleStatus, Color, Direction, File, Piece, PieceKind, Rank, Square, DIRECTIONS, FILES,
    KNIGHT_OFFSETS, RANKS,
};
use crate::zobrist;

/// Possible errors that can arise when parsing a FEN string into a `Position`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FenParseError {
    UnexpectedChar(char),
    UnexpectedEnd,
    InvalidDigit,
    FileDoesNotSumToEight,
    UnknownPiece,
    InvalidSideToMove,
    InvalidCastle,
    InvalidEnPassant,
    EmptyHalfmove,
    InvalidHalfmove,
    EmptyFullmove,
    InvalidFullmove,
}

/// The facts about a position that cannot be recovered by looking at the
/// board after a move has been made. One record is pushed per made move and
/// popped per unmade move, so the stack is exactly as deep as the number of
/// moves made since the position was loaded.
#[derive(Copy, Clone, Debug)]
struct Undo {
    castle_status: CastleStatus,
    en_passant_file: Option<File>,
    halfmove_clock: u32,
}

/// A chess position: the board, whose turn it is, castling rights, the
/// en-passant file, the move clocks, the incrementally-maintained Zobrist
/// hash, and the history needed to unmake moves and detect repetitions.
///
/// A single `Position` is mutated in place for an entire game or search;
/// `make_move` and `unmake_move` are exact inverses, and the search relies
/// on strictly stack-shaped nesting of those two calls.
#[derive(Clone, Debug)]
pub struct Position {
    board: [Option<Piece>; 64],
    side_to_move: Color,
    castle_status: CastleStatus,
    en_passant_file: Option<File>,
    halfmove_clock: u32,
    fullmove_clock: u32,
    zobrist_hash: u64,
    undo_stack: Vec<Undo>,
    hash_history: Vec<u64>,
}

//
// Board state getters
//

impl Position {
    pub fn new() -> Position {
        Position {
            board: [None; 64],
            side_to_move: Color::White,
            castle_status: CastleStatus::NONE,
            en_passant_file: None,
            halfmove_clock: 0,
            fullmove_clock: 0,
            zobrist_hash: 0,
            undo_stack: Vec::new(),
            hash_history: Vec::new(),
        }
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_clock(&self) -> u32 {
        self.fullmove_clock
    }

    pub fn zobrist_hash(&self) -> u64 {
        self.zobrist_hash
    }

    pub fn en_passant_file(&self) -> Option<File> {
        self.en_passant_file
    }

    /// The square a pawn would land on by capturing en passant, if en passant
    /// is available. Only the file is stored; the rank follows from whose
    /// turn it is, since the capture happens on the rank directly behind the
    /// pawn that just double-pushed.
    pub fn en_passant_square(&self) -> Option<Square> {
        let rank = match self.side_to_move {
            Color::White => Rank::Six,
            Color::Black => Rank::Three,
        };
        self.en_passant_file.map(|file| Square::of(rank, file))
    }

    pub fn can_castle_kingside(&self, color: Color) -> bool {
        match color {
            Color::White => self.castle_status.contains(CastleStatus::WHITE_KINGSIDE),
            Color::Black => self.castle_status.contains(CastleStatus::BLACK_KINGSIDE),
        }
    }

    pub fn can_castle_queenside(&self, color: Color) -> bool {
        match color {
            Color::White => self.castle_status.contains(CastleStatus::WHITE_QUEENSIDE),
            Color::Black => self.castle_status.contains(CastleStatus::BLACK_QUEENSIDE),
        }
    }

    /// Number of moves made (and not yet unmade) since this position was
    /// loaded.
    pub fn moves_played(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.board[square.as_index()]
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        for (idx, slot) in self.board.iter().enumerate() {
            if let Some(piece) = slot {
                if piece.kind == PieceKind::King && piece.color == color {
                    return Some(Square::from_index(idx));
                }
            }
        }

        None
    }
}

//
// Board manipulation primitives. Every higher-level mutation (captures,
// castles, promotions, en passant) decomposes into these two calls, which
// also keep the Zobrist hash current.
//

impl Position {
    pub fn add_piece(&mut self, square: Square, piece: Piece) -> Result<(), ()> {
        if self.piece_at(square).is_some() {
            return Err(());
        }

        self.board[square.as_index()] = Some(piece);
        zobrist::modify_piece(&mut self.zobrist_hash, square, piece);
        Ok(())
    }

    pub fn remove_piece(&mut self, square: Square) -> Result<(), ()> {
        let existing_piece = if let Some(piece) = self.piece_at(square) {
            piece
        } else {
            return Err(());
        };

        self.board[square.as_index()] = None;
        zobrist::modify_piece(&mut self.zobrist_hash, square, existing_piece);
        Ok(())
    }

    /// Scans outward from `from` in the given direction and returns the first
    /// occupied square, or `None` if the ray exits the board first. Sliding
    /// move generation and attack detection both walk rays through this one
    /// primitive.
    pub fn first_obstacle_along_ray(&self, from: Square, dir: Direction) -> Option<Square> {
        let mut cursor = from.towards(dir);
        while let Some(square) = cursor {
            if self.piece_at(square).is_some() {
                return Some(square);
            }

            cursor = square.towards(dir);
        }

        None
    }
}

//
// Move application and reversal
//

impl Position {
    /// Applies a move to this position. The move is trusted: it must have
    /// come from the move generator or have been validated against it, and
    /// a malformed move is a programming error, not a recoverable condition.
    pub fn make_move(&mut self, mov: Move) {
        let side = self.side_to_move;
        let moving_piece = self
            .piece_at(mov.source())
            .expect("invalid move: no piece at source square");

        self.undo_stack.push(Undo {
            castle_status: self.castle_status,
            en_passant_file: self.en_passant_file,
            halfmove_clock: self.halfmove_clock,
        });

        // If this move is a capture, the captured piece comes off the board
        // before anything else moves. The victim sits on the destination
        // square, except for en passant where it sits beside it.
        if mov.is_capture() {
            let target_square = if mov.is_en_passant() {
                ep_victim_square(mov.destination(), side)
            } else {
                mov.destination()
            };

            self.remove_piece(target_square)
                .expect("invalid move: no piece at capture target");
        }

        // Castles are encoded using the king's start and stop squares, so the
        // rook relocation is handled here; the king itself moves below like
        // any other piece.
        if mov.is_castle() {
            let (post_castle_dir, pre_castle_dir, num_squares) = if mov.is_kingside_castle() {
                (Direction::West, Direction::East, 1)
            } else {
                (Direction::East, Direction::West, 2)
            };

            let new_rook_square = mov
                .destination()
                .towards(post_castle_dir)
                .expect("castle rook target off board");
            let mut rook_square = mov.destination();
            for _ in 0..num_squares {
                rook_square = rook_square
                    .towards(pre_castle_dir)
                    .expect("castle rook origin off board");
            }

            let rook = self
                .piece_at(rook_square)
                .expect("invalid move: castle without rook");
            self.remove_piece(rook_square).unwrap();
            self.add_piece(new_rook_square, rook)
                .expect("invalid move: piece at rook target square");
        }

        // Move the piece itself, swapping in the promoted kind if this move
        // is a promotion.
        let piece_to_add = if mov.is_promotion() {
            Piece::new(mov.promotion_piece(), side)
        } else {
            moving_piece
        };

        self.remove_piece(mov.source())
            .expect("invalid move: no piece at source square");
        self.add_piece(mov.destination(), piece_to_add)
            .expect("invalid move: piece at destination square");

        // Only a double pawn push grants the opponent an en-passant file;
        // every other move clears it.
        let new_ep_file = if mov.is_double_pawn_push() {
            Some(mov.source().file())
        } else {
            None
        };
        zobrist::modify_en_passant(&mut self.zobrist_hash, self.en_passant_file, new_ep_file);
        self.en_passant_file = new_ep_file;

        // Castling rights can be lost on any move, whatever its type tag: a
        // king leaving its home square, a rook leaving its home square, or a
        // rook being captured at home. All four triggers are re-checked on
        // every move.
        let mut new_rights = self.castle_status;
        if moving_piece.kind == PieceKind::King && mov.source() == king_home(side) {
            new_rights &= !castle_mask(side);
        }
        if moving_piece.kind == PieceKind::Rook {
            if mov.source() == kingside_rook_home(side) {
                new_rights &= !kingside_castle_mask(side);
            } else if mov.source() == queenside_rook_home(side) {
                new_rights &= !queenside_castle_mask(side);
            }
        }
        if mov.is_capture() {
            let enemy = side.toggle();
            if mov.destination() == kingside_rook_home(enemy) {
                new_rights &= !kingside_castle_mask(enemy);
            } else if mov.destination() == queenside_rook_home(enemy) {
                new_rights &= !queenside_castle_mask(enemy);
            }
        }
        zobrist::modify_castle_rights(&mut self.zobrist_hash, self.castle_status, new_rights);
        self.castle_status = new_rights;

        if mov.is_capture() || moving_piece.kind == PieceKind::Pawn {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        self.side_to_move = side.toggle();
        zobrist::modify_side_to_move(&mut self.zobrist_hash);
        if self.side_to_move == Color::White {
            self.fullmove_clock += 1;
        }

        self.hash_history.push(self.zobrist_hash);
    }

    /// Exactly reverses a `make_move` of the same move. Unmaking a move that
    /// was never made is a programming error and panics.
    pub fn unmake_move(&mut self, mov: Move) {
        let undo = self
            .undo_stack
            .pop()
            .expect("unmake_move without a matching make_move");
        self.hash_history
            .pop()
            .expect("unmake_move with empty hash history");

        // The side that made the move being unmade.
        let side = self.side_to_move.toggle();

        if side == Color::Black {
            self.fullmove_clock -= 1;
        }
        self.side_to_move = side;
        zobrist::modify_side_to_move(&mut self.zobrist_hash);

        // Walk the moved piece back, reverting a promotion to the pawn it
        // came from.
        let moved_piece = self
            .piece_at(mov.destination())
            .expect("invalid unmake: no piece at destination square");
        self.remove_piece(mov.destination()).unwrap();
        let original_piece = if mov.is_promotion() {
            Piece::new(PieceKind::Pawn, side)
        } else {
            moved_piece
        };
        self.add_piece(mov.source(), original_piece)
            .expect("invalid unmake: piece at source square");

        // Put the captured piece back on the square it actually occupied,
        // which for en passant is not the move's destination.
        if mov.is_capture() {
            let captured_kind = mov
                .captured_kind()
                .expect("capture move carries no captured kind");
            let target_square = if mov.is_en_passant() {
                ep_victim_square(mov.destination(), side)
            } else {
                mov.destination()
            };

            self.add_piece(target_square, Piece::new(captured_kind, side.toggle()))
                .expect("invalid unmake: capture target square occupied");
        }

        // Walk the castle rook back.
        if mov.is_castle() {
            let (post_castle_dir, pre_castle_dir, num_squares) = if mov.is_kingside_castle() {
                (Direction::West, Direction::East, 1)
            } else {
                (Direction::East, Direction::West, 2)
            };

            let rook_square = mov
                .destination()
                .towards(post_castle_dir)
                .expect("castle rook square off board");
            let mut original_rook_square = mov.destination();
            for _ in 0..num_squares {
                original_rook_square = original_rook_square
                    .towards(pre_castle_dir)
                    .expect("castle rook origin off board");
            }

            let rook = self
                .piece_at(rook_square)
                .expect("invalid unmake: castle without rook");
            self.remove_piece(rook_square).unwrap();
            self.add_piece(original_rook_square, rook)
                .expect("invalid unmake: rook origin square occupied");
        }

        // Restore the irreversible facts, applying the same symmetric-
        // difference hash updates that `make_move` applied.
        zobrist::modify_en_passant(
            &mut self.zobrist_hash,
            self.en_passant_file,
            undo.en_passant_file,
        );
        self.en_passant_file = undo.en_passant_file;
        zobrist::modify_castle_rights(
            &mut self.zobrist_hash,
            self.castle_status,
            undo.castle_status,
        );
        self.castle_status = undo.castle_status;
        self.halfmove_clock = undo.halfmove_clock;
    }
}

//
// Board analysis (attack detection, check detection, pin detection)
//

impl Position {
    /// Returns true if any piece belonging to the opponent of `defender`
    /// attacks `target`.
    ///
    /// A piece that is itself pinned to its own king does not count as an
    /// attacker, with one exception: when `treat_as_king_square` is set the
    /// pin filter is disabled, because pins are measured relative to the
    /// king and a probe of the king's own square must see every attacker.
    /// Probes of castle transit squares pass `false` here.
    pub fn is_attacked(&self, target: Square, defender: Color, treat_as_king_square: bool) -> bool {
        let attacker = defender.toggle();

        let delivers = |square: Square| treat_as_king_square || !self.is_pinned(square);

        // Knight jumps first; they are the only attacks that do not travel
        // along a ray.
        for &(file_delta, rank_delta) in KNIGHT_OFFSETS.iter() {
            if let Some(square) = target.shift(file_delta, rank_delta) {
                if let Some(piece) = self.piece_at(square) {
                    if piece.kind == PieceKind::Knight && piece.color == attacker && delivers(square)
                    {
                        return true;
                    }
                }
            }
        }

        // Everything else is found by scanning each ray out of the target
        // square and classifying the first obstacle against the ray's
        // geometry.
        for &dir in DIRECTIONS.iter() {
            let obstacle_square = match self.first_obstacle_along_ray(target, dir) {
                Some(square) => square,
                None => continue,
            };

            let piece = self
                .piece_at(obstacle_square)
                .expect("ray obstacle square is empty");
            if piece.color != attacker {
                continue;
            }

            let attacks = match piece.kind {
                PieceKind::Queen => true,
                PieceKind::Rook => !dir.is_diagonal(),
                PieceKind::Bishop => dir.is_diagonal(),
                PieceKind::Pawn => {
                    // A pawn one diagonal step away attacks the target if the
                    // target lies in the pawn's forward direction; scanning
                    // outward from the target, that means the ray points
                    // opposite to the pawn's travel.
                    let (_, rank_delta) = dir.as_vector();
                    let required_delta = match attacker {
                        Color::White => -1,
                        Color::Black => 1,
                    };
                    dir.is_diagonal()
                        && target.distance(obstacle_square) == 1
                        && rank_delta == required_delta
                }
                PieceKind::King => target.distance(obstacle_square) == 1,
                PieceKind::Knight => false,
            };

            if attacks && delivers(obstacle_square) {
                return true;
            }
        }

        false
    }

    /// Returns whether the piece at the given square is pinned against its
    /// own king along a ray: walking the two opposite directions of an axis,
    /// one side's first obstacle is the friendly king and the other side's
    /// is an enemy piece that slides along that axis. Empty squares and
    /// kings are never pinned.
    pub fn is_pinned(&self, square: Square) -> bool {
        let piece = match self.piece_at(square) {
            Some(piece) => piece,
            None => return false,
        };

        if piece.kind == PieceKind::King {
            return false;
        }

        for &dir in &[
            Direction::North,
            Direction::East,
            Direction::NorthEast,
            Direction::NorthWest,
        ] {
            let one = self.first_obstacle_along_ray(square, dir);
            let two = self.first_obstacle_along_ray(square, dir.reverse());
            if self.pins_along_axis(piece.color, one, two, dir.is_diagonal()) {
                return true;
            }
        }

        false
    }

    fn pins_along_axis(
        &self,
        color: Color,
        one: Option<Square>,
        two: Option<Square>,
        diagonal: bool,
    ) -> bool {
        let (one, two) = match (one, two) {
            (Some(one), Some(two)) => (one, two),
            _ => return false,
        };

        let first = self.piece_at(one).expect("ray obstacle square is empty");
        let second = self.piece_at(two).expect("ray obstacle square is empty");
        let is_friendly_king =
            |piece: Piece| piece.kind == PieceKind::King && piece.color == color;
        let is_enemy_slider = |piece: Piece| {
            piece.color != color
                && match piece.kind {
                    PieceKind::Queen => true,
                    PieceKind::Rook => !diagonal,
                    PieceKind::Bishop => diagonal,
                    _ => false,
                }
        };

        (is_friendly_king(first) && is_enemy_slider(second))
            || (is_friendly_king(second) && is_enemy_slider(first))
    }

    /// Returns true if the given color's king is attacked.
    pub fn is_check(&self, color: Color) -> bool {
        match self.king_square(color) {
            Some(king) => self.is_attacked(king, color, true),
            None => false,
        }
    }

    /// Returns true if the side to move could capture the opposing king right
    /// now - that is, the side that just moved has left its king attacked.
    /// This is the primitive the legality filter reduces to.
    pub fn can_capture_king(&self) -> bool {
        self.is_check(self.side_to_move.toggle())
    }

    /// Draw test for search: the fifty-move clock has run out, or this exact
    /// position (by hash) occurred earlier in the game.
    pub fn is_draw(&self) -> bool {
        self.halfmove_clock >= 50 || self.is_repetition()
    }

    /// Returns true if the current position's hash appears earlier in the
    /// hash history.
    pub fn is_repetition(&self) -> bool {
        match self.hash_history.split_last() {
            Some((&current, earlier)) => earlier.contains(&current),
            None => false,
        }
    }

    /// Move legality test. Returns true if this move is a legal move from the
    /// given position. If the move is known to be pseudo-legal,
    /// `is_legal_given_pseudolegal` is faster.
    pub fn is_legal(&mut self, mov: Move) -> bool {
        let mut mov_vec = MoveVec::default();
        let gen = MoveGenerator::new();
        gen.generate_moves(self, &mut mov_vec);
        if !mov_vec.contains(&mov) {
            return false;
        }

        self.is_legal_given_pseudolegal(mov)
    }

    /// Legality test for moves that are already known to be pseudo-legal:
    /// try the move and see whether the mover's king can be captured
    /// afterward. Pins and discovered checks depend on the whole board, so
    /// trying the move is the one correct filter.
    pub fn is_legal_given_pseudolegal(&mut self, mov: Move) -> bool {
        self.make_move(mov);
        let legal = !self.can_capture_king();
        self.unmake_move(mov);
        legal
    }
}

//
// FEN and UCI parsing and generation.
//
// The routines in this block are oriented around FEN, a simple notation for
// chess positions. Positions can be created by parsing FEN and FEN can be
// produced from particular positions.
//
// UCI move parsing is also done here. It is not necessarily straightforward
// to derive a Move representation from a UCI move string; it requires full
// knowledge of the current position to disambiguate a move.
//

impl Position {
    pub fn from_start_position() -> Position {
        Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap()
    }

    /// Constructs a new position from a FEN representation of a board
    /// position. Loading a position is a full reset: the undo stack and the
    /// repetition history restart from the loaded position.
    pub fn from_fen<S: AsRef<str>>(fen: S) -> Result<Position, FenParseError> {
        use std::iter::Peekable;
        use std::str::Chars;

        type Stream<'a> = Peekable<Chars<'a>>;

        fn eat(iter: &mut Stream<'_>, expected: char) -> Result<(), FenParseError> {
            match iter.next() {
                Some(c) if c == expected => Ok(()),
                Some(c) => Err(FenParseError::UnexpectedChar(c)),
                None => Err(FenParseError::UnexpectedEnd),
            }
        }

        fn advance(iter: &mut Stream<'_>) -> Result<(), FenParseError> {
            let _ = iter.next();
            Ok(())
        }

        fn peek(iter: &mut Stream<'_>) -> Result<char, FenParseError> {
            if let Some(c) = iter.peek() {
                Ok(*c)
            } else {
                Err(FenParseError::UnexpectedEnd)
            }
        }

        fn eat_side_to_move(iter: &mut Stream<'_>) -> Result<Color, FenParseError> {
            let side = match peek(iter)? {
                'w' => Color::White,
                'b' => Color::Black,
                _ => return Err(FenParseError::InvalidSideToMove),
            };

            advance(iter)?;
            Ok(side)
        }

        fn eat_castle_status(iter: &mut Stream<'_>) -> Result<CastleStatus, FenParseError> {
            if peek(iter)? == '-' {
                advance(iter)?;
                return Ok(CastleStatus::NONE);
            }

            let mut status = CastleStatus::NONE;
            for _ in 0..4 {
                match peek(iter)? {
                    'K' => status |= CastleStatus::WHITE_KINGSIDE,
                    'k' => status |= CastleStatus::BLACK_KINGSIDE,
                    'Q' => status |= CastleStatus::WHITE_QUEENSIDE,
                    'q' => status |= CastleStatus::BLACK_QUEENSIDE,
                    ' ' => break,
                    _ => return Err(FenParseError::InvalidCastle),
                }

                advance(iter)?;
            }

            Ok(status)
        }

        fn eat_en_passant(iter: &mut Stream<'_>) -> Result<Option<File>, FenParseError> {
            let c = peek(iter)?;
            if c == '-' {
                advance(iter)?;
                return Ok(None);
            }

            if let Ok(file) = File::try_from(c) {
                advance(iter)?;
                let rank_c = peek(iter)?;
                if Rank::try_from(rank_c).is_ok() {
                    advance(iter)?;
                    Ok(Some(file))
                } else {
                    Err(FenParseError::InvalidEnPassant)
                }
            } else {
                Err(FenParseError::InvalidEnPassant)
            }
        }

        fn eat_halfmove(iter: &mut Stream<'_>) -> Result<u32, FenParseError> {
            let mut buf = String::new();
            loop {
                let c = peek(iter)?;
                if !c.is_digit(10) {
                    break;
                }

                buf.push(c);
                advance(iter)?;
            }

            if buf.is_empty() {
                return Err(FenParseError::EmptyHalfmove);
            }

            buf.parse::<u32>()
                .map_err(|_| FenParseError::InvalidHalfmove)
        }

        fn eat_fullmove(iter: &mut Stream<'_>) -> Result<u32, FenParseError> {
            let mut buf = String::new();
            for ch in iter {
                if !ch.is_digit(10) {
                    if buf.is_empty() {
                        return Err(FenParseError::EmptyFullmove);
                    }

                    break;
                }

                buf.push(ch);
            }

            if buf.is_empty() {
                return Err(FenParseError::EmptyFullmove);
            }

            buf.parse::<u32>()
                .map_err(|_| FenParseError::InvalidFullmove)
        }

        let mut pos = Position::new();
        let str_ref = fen.as_ref();
        let iter = &mut str_ref.chars().peekable();
        for &rank in RANKS.iter().rev() {
            let mut file = File::A as usize;
            while file <= File::H as usize {
                let c = peek(iter)?;
                // digits 1 through 8 indicate empty squares.
                if c.is_digit(10) {
                    if c < '1' || c > '8' {
                        return Err(FenParseError::InvalidDigit);
                    }

                    let value = c as usize - 48;
                    file += value;
                    if file > 8 {
                        return Err(FenParseError::FileDoesNotSumToEight);
                    }

                    advance(iter)?;
                    continue;
                }

                // if it's not a digit, it represents a piece.
                let piece = if let Ok(piece) = Piece::try_from(c) {
                    piece
                } else {
                    return Err(FenParseError::UnknownPiece);
                };

                let square = Square::of(rank, File::from_index(file));
                pos.add_piece(square, piece).expect("FEN double-add piece?");
                advance(iter)?;
                file += 1;
            }

            if rank != Rank::One {
                eat(iter, '/')?;
            }
        }

        eat(iter, ' ')?;
        pos.side_to_move = eat_side_to_move(iter)?;
        eat(iter, ' ')?;
        pos.castle_status = eat_castle_status(iter)?;
        eat(iter, ' ')?;
        pos.en_passant_file = eat_en_passant(iter)?;
        eat(iter, ' ')?;
        pos.halfmove_clock = eat_halfmove(iter)?;
        eat(iter, ' ')?;
        pos.fullmove_clock = eat_fullmove(iter)?;
        pos.zobrist_hash = zobrist::hash(&pos);
        pos.hash_history.push(pos.zobrist_hash);
        Ok(pos)
    }

    /// Parses the UCI representation of a move into a Move object, suitable
    /// as an argument to `make_move`. UCI encodes only the source square, the
    /// destination square, and an optional promotion piece; the move's actual
    /// category is a function of the current position and is reconstructed
    /// here.
    pub fn move_from_uci(&self, move_str: &str) -> Option<Move> {
        let move_chrs: Vec<_> = move_str.chars().collect();
        if move_chrs.len() < 4 {
            // It's not a valid move encoding at all if it's this short.
            return None;
        }

        // A particular quirk of UCI is that null moves are encoded as 0000.
        if move_str == "0000" {
            return Some(Move::null());
        }

        let source_file = File::try_from(move_chrs[0]).ok()?;
        let source_rank = Rank::try_from(move_chrs[1]).ok()?;
        let dest_file = File::try_from(move_chrs[2]).ok()?;
        let dest_rank = Rank::try_from(move_chrs[3]).ok()?;
        let maybe_promotion_piece = if move_chrs.len() == 5 {
            Some(move_chrs[4])
        } else {
            None
        };

        let source = Square::of(source_rank, source_file);
        let dest = Square::of(dest_rank, dest_file);

        // The move string only pins down the endpoints; the category comes
        // from looking at the board:
        // 1. Is the moving piece a pawn?
        //   1.1. Is the destination two squares straight ahead from the
        //        starting rank? => DoublePawnPush
        //   1.2. Is the destination a pawn capture square?
        //     1.2.1. Is the destination on the promotion rank?
        //            => PromotionCapture
        //     1.2.2. Is the destination the en-passant square? => EnPassant
        //     1.2.3. else => Capture
        //   1.3. Is the destination on the promotion rank? => Promotion
        //   1.4. else => Quiet
        // 2. Is the moving piece a king on its home square moving to a
        //    castle destination? => Castle
        // 3. Is there a piece on the destination square? => Capture
        // 4. else => Quiet
        let dest_piece = self.piece_at(dest);
        let moving_piece = self.piece_at(source)?;

        let capture_kind = |maybe_piece: Option<Piece>| -> Option<PieceKind> {
            match maybe_piece {
                Some(piece) if piece.color != moving_piece.color => Some(piece.kind),
                _ => None,
            }
        };

        // 1. Is the moving piece a pawn?
        if moving_piece.kind == PieceKind::Pawn {
            let (forward, promo_rank, start_rank) = match self.side_to_move {
                Color::White => (1, Rank::Eight, Rank::Two),
                Color::Black => (-1, Rank::One, Rank::Seven),
            };

            // 1.1. Double pawn push.
            if source.rank() == start_rank && source.shift(0, 2 * forward) == Some(dest) {
                return Some(Move::double_pawn_push(source, dest));
            }

            // 1.2. Capture shape: one forward diagonal step.
            let is_attack_shape = (source.shift(1, forward) == Some(dest))
                || (source.shift(-1, forward) == Some(dest));
            if is_attack_shape {
                // 1.2.1. Promotion capture.
                if dest.rank() == promo_rank {
                    let kind = promotion_kind(maybe_promotion_piece?)?;
                    return Some(Move::promotion_capture(
                        source,
                        dest,
                        kind,
                        capture_kind(dest_piece)?,
                    ));
                }

                // 1.2.2. En passant.
                if Some(dest) == self.en_passant_square() {
                    return Some(Move::en_passant(source, dest));
                }

                // 1.2.3. Plain pawn capture.
                return Some(Move::capture(source, dest, capture_kind(dest_piece)?));
            }

            // 1.3. Straight promotion push.
            if dest.rank() == promo_rank {
                let kind = promotion_kind(maybe_promotion_piece?)?;
                return Some(Move::promotion(source, dest, kind));
            }

            // 1.4. Quiet pawn push.
            return Some(Move::quiet(source, dest));
        }

        // 2. Castles, encoded as the king's two-square hop.
        if moving_piece.kind == PieceKind::King && source == king_home(self.side_to_move) {
            let (kingside_target, queenside_target) = match self.side_to_move {
                Color::White => (Square::G1, Square::C1),
                Color::Black => (Square::G8, Square::C8),
            };

            if dest == kingside_target && dest_piece.is_none() {
                return Some(Move::kingside_castle(source, dest));
            }

            if dest == queenside_target && dest_piece.is_none() {
                return Some(Move::queenside_castle(source, dest));
            }
        }

        // 3. Is there a piece on the destination square?
        if dest_piece.is_some() {
            return Some(Move::capture(source, dest, capture_kind(dest_piece)?));
        }

        // 4. Else, it's a quiet move.
        Some(Move::quiet(source, dest))
    }

    pub fn as_fen(&self) -> String {
        let mut buf = String::new();
        for &rank in RANKS.iter().rev() {
            let mut empty_squares = 0;
            for &file in &FILES {
                let square = Square::of(rank, file);
                if let Some(piece) = self.piece_at(square) {
                    if empty_squares != 0 {
                        write!(&mut buf, "{}", empty_squares).unwrap();
                    }
                    write!(&mut buf, "{}", piece).unwrap();
                    empty_squares = 0;
                } else {
                    empty_squares += 1;
                }
            }

            if empty_squares != 0 {
                write!(&mut buf, "{}", empty_squares).unwrap();
            }

            if rank != Rank::One {
                buf.push('/');
            }
        }

        buf.push(' ');
        match self.side_to_move() {
            Color::White => buf.push('w'),
            Color::Black => buf.push('b'),
        }
        buf.push(' ');
        if self.castle_status == CastleStatus::NONE {
            buf.push('-');
        } else {
            if self.can_castle_kingside(Color::White) {
                buf.push('K');
            }
            if self.can_castle_queenside(Color::White) {
                buf.push('Q');
            }
            if self.can_castle_kingside(Color::Black) {
                buf.push('k');
            }
            if self.can_castle_queenside(Color::Black) {
                buf.push('q');
            }
        }
        buf.push(' ');
        if let Some(ep_square) = self.en_passant_square() {
            write!(&mut buf, "{}", ep_square).unwrap();
        } else {
            buf.push('-');
        }
        buf.push(' ');
        write!(
            &mut buf,
            "{} {}",
            self.halfmove_clock(),
            self.fullmove_clock()
        )
        .unwrap();
        buf
    }
}

//
// Trait implementations
//

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for &rank in RANKS.iter().rev() {
            for &file in &FILES {
                let sq = Square::of(rank, file);
                if let Some(piece) = self.piece_at(sq) {
                    write!(f, " {} ", piece)?;
                } else {
                    write!(f, " . ")?;
                }
            }

            writeln!(f, "| {}", rank)?;
        }

        for _ in &FILES {
            write!(f, "---")?;
        }

        writeln!(f)?;
        for &file in &FILES {
            write!(f, " {} ", file)?;
        }

        writeln!(f)?;
        Ok(())
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::new()
    }
}

//
// Helper functions
//

/// The square the en-passant victim actually sits on: one rank behind the
/// capture destination, from the mover's point of view.
fn ep_victim_square(dest: Square, mover: Color) -> Square {
    let dir = match mover {
        Color::White => Direction::South,
        Color::Black => Direction::North,
    };
    dest.towards(dir)
        .expect("en-passant victim square off board")
}

fn promotion_kind(c: char) -> Option<PieceKind> {
    let kind = match c {
        'n' => PieceKind::Knight,
        'b' => PieceKind::Bishop,
        'r' => PieceKind::Rook,
        'q' => PieceKind::Queen,
        _ => return None,
    };
    Some(kind)
}

pub(crate) fn king_home(color: Color) -> Square {
    match color {
        Color::White => Square::E1,
        Color::Black => Square::E8,
    }
}

pub(crate) fn kingside_rook_home(color: Color) -> Square {
    match color {
        Color::White => Square::H1,
        Color::Black => Square::H8,
    }
}

pub(crate) fn queenside_rook_home(color: Color) -> Square {
    match color {
        Color::White => Square::A1,
        Color::Black => Square::A8,
    }
}

fn kingside_castle_mask(color: Color) -> CastleStatus {
    match color {
        Color::White => CastleStatus::WHITE_KINGSIDE,
        Color::Black => CastleStatus::BLACK_KINGSIDE,
    }
}

fn queenside_castle_mask(color: Color) -> CastleStatus {
    match color {
        Color::White => CastleStatus::WHITE_QUEENSIDE,
        Color::Black => CastleStatus::BLACK_QUEENSIDE,
    }
}

fn castle_mask(color: Color) -> CastleStatus {
    match color {
        Color::White => CastleStatus::WHITE,
        Color::Black => CastleStatus::BLACK,
    }
}

#[cfg(test)]
mod tests {
    use crate::moves::Move;
    use crate::position::Position;
    use crate::types::{Color, Square};

    #[test]
    fn check_smoke() {
        let pos =
            Position::from_fen("r2q1rk1/pP1p2pp/Q4n2/bbp1p3/Np6/1B3NBn/pPPP1PPP/R3K2R b KQ - 0 1")
                .unwrap();
        assert!(pos.is_check(Color::Black));
    }

    #[test]
    fn adjacent_kings_attack() {
        let pos = Position::from_fen("7k/6K1/8/8/8/8/8/8 w - - 0 1").unwrap();
        assert!(pos.is_check(Color::White));
        assert!(pos.is_check(Color::Black));
    }

    #[test]
    fn pin_smoke() {
        let pos = Position::from_fen("8/8/3q4/8/8/3B4/3K4/8 w - - 0 1").unwrap();
        assert!(pos.is_pinned(Square::D3));
    }

    #[test]
    fn pin_smoke_neg() {
        let pos = Position::from_fen("8/8/3q4/8/8/3B4/2K5/8 w - - 0 1").unwrap();
        assert!(!pos.is_pinned(Square::D3));
    }

    #[test]
    fn pin_smoke_neg_2() {
        let pos = Position::from_fen("8/8/3q4/8/1K6/3B4/8/8 w - - 0 1").unwrap();
        assert!(!pos.is_pinned(Square::D3));
    }

    #[test]
    fn pinned_piece_does_not_attack_ordinary_squares() {
        // The white bishop on d3 is pinned by the queen on d6 and so cannot
        // attack e4, but a probe of the king's own square still sees every
        // attacker.
        let pos = Position::from_fen("8/8/3q4/8/8/3B4/3K4/8 b - - 0 1").unwrap();
        assert!(!pos.is_attacked(Square::E4, Color::Black, false));
        assert!(pos.is_attacked(Square::E4, Color::Black, true));
    }

    #[test]
    fn pin_legality() {
        let mut pos = Position::from_fen("8/8/8/q7/8/2B5/3K4/8 w - - 0 1").unwrap();
        assert!(pos.is_legal(Move::quiet(Square::C3, Square::B4)));
        assert!(!pos.is_legal(Move::quiet(Square::C3, Square::D4)));
    }

    #[test]
    fn first_obstacle() {
        use crate::types::Direction;
        let pos = Position::from_fen("8/8/3q4/8/8/3B4/3K4/8 w - - 0 1").unwrap();
        assert_eq!(
            Some(Square::D6),
            pos.first_obstacle_along_ray(Square::D3, Direction::North)
        );
        assert_eq!(
            Some(Square::D2),
            pos.first_obstacle_along_ray(Square::D3, Direction::South)
        );
        assert_eq!(None, pos.first_obstacle_along_ray(Square::D3, Direction::East));
    }

    #[test]
    fn ep_square_derivation() {
        let pos = Position::from_fen("8/8/8/8/4Pp2/8/8/8 b - e3 0 1").unwrap();
        assert_eq!(Some(Square::E3), pos.en_passant_square());

        let pos = Position::from_fen("8/8/8/3pP3/8/8/8/8 w - d6 0 1").unwrap();
        assert_eq!(Some(Square::D6), pos.en_passant_square());
    }

    mod make_unmake {
        use crate::moves::Move;
        use crate::position::Position;
        use crate::types::{PieceKind, Square};

        fn roundtrip(fen: &str, mov: Move) {
            let mut pos = Position::from_fen(fen).unwrap();
            let hash_before = pos.zobrist_hash();
            let depth_before = pos.moves_played();

            pos.make_move(mov);
            assert_eq!(depth_before + 1, pos.moves_played());
            pos.unmake_move(mov);

            assert_eq!(fen, pos.as_fen());
            assert_eq!(hash_before, pos.zobrist_hash());
            assert_eq!(depth_before, pos.moves_played());
        }

        #[test]
        fn quiet() {
            roundtrip(
                "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
                Move::quiet(Square::G1, Square::F3),
            );
        }

        #[test]
        fn capture() {
            roundtrip(
                "8/8/8/8/5p2/4P3/8/8 w - - 2 1",
                Move::capture(Square::E3, Square::F4, PieceKind::Pawn),
            );
        }

        #[test]
        fn double_pawn_push() {
            roundtrip(
                "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
                Move::double_pawn_push(Square::E2, Square::E4),
            );
        }

        #[test]
        fn en_passant() {
            roundtrip(
                "8/8/8/3pP3/8/8/8/8 w - d6 0 1",
                Move::en_passant(Square::E5, Square::D6),
            );
        }

        #[test]
        fn kingside_castle() {
            roundtrip(
                "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1",
                Move::kingside_castle(Square::E1, Square::G1),
            );
        }

        #[test]
        fn queenside_castle() {
            roundtrip(
                "r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1",
                Move::queenside_castle(Square::E8, Square::C8),
            );
        }

        #[test]
        fn promotion() {
            roundtrip(
                "8/4P3/8/8/8/8/8/8 w - - 0 1",
                Move::promotion(Square::E7, Square::E8, PieceKind::Queen),
            );
        }

        #[test]
        fn promotion_capture() {
            roundtrip(
                "5r2/4P3/8/8/8/8/8/8 w - - 0 1",
                Move::promotion_capture(Square::E7, Square::F8, PieceKind::Knight, PieceKind::Rook),
            );
        }

        #[test]
        fn rook_capture_clears_castle_rights() {
            let mut pos = Position::from_fen("r3k2r/8/8/8/8/6n1/8/R3K2R b KQkq - 0 1").unwrap();
            let mov = Move::capture(Square::G3, Square::H1, PieceKind::Rook);
            pos.make_move(mov);
            assert!(!pos.can_castle_kingside(crate::types::Color::White));
            assert!(pos.can_castle_queenside(crate::types::Color::White));
            pos.unmake_move(mov);
            assert!(pos.can_castle_kingside(crate::types::Color::White));
        }

        #[test]
        fn repetition_detected_and_undone() {
            let mut pos = Position::from_fen("8/8/8/8/8/4k3/8/R3K3 w - - 0 1").unwrap();
            let shuffle = [
                Move::quiet(Square::A1, Square::A2),
                Move::quiet(Square::E3, Square::D3),
                Move::quiet(Square::A2, Square::A1),
                Move::quiet(Square::D3, Square::E3),
            ];

            for &mov in &shuffle {
                assert!(!pos.is_repetition());
                pos.make_move(mov);
            }

            // Back to the starting placement with the same player to move.
            assert!(pos.is_repetition());
            pos.unmake_move(shuffle[3]);
            assert!(!pos.is_repetition());
        }
    }

    mod fen {
        use std::convert::TryFrom;

        use crate::position::{FenParseError, Position};
        use crate::types::TableIndex;
        use crate::types::{Color, File, Piece, PieceKind, Rank, Square};

        #[test]
        fn fen_smoke() {
            let pos = Position::from_fen("8/8/8/8/8/8/8/8 w - - 0 0").unwrap();

            // white's turn to move.
            assert_eq!(Color::White, pos.side_to_move());

            // no castling.
            assert!(!pos.can_castle_kingside(Color::White));
            assert!(!pos.can_castle_kingside(Color::Black));
            assert!(!pos.can_castle_queenside(Color::White));
            assert!(!pos.can_castle_queenside(Color::Black));

            // no en passant.
            assert!(pos.en_passant_file().is_none());

            // both clocks are zero.
            assert_eq!(0, pos.halfmove_clock());
            assert_eq!(0, pos.fullmove_clock());
        }

        #[test]
        fn starting_position() {
            let pos =
                Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
                    .unwrap();

            let check_square = |square: &str, piece: Piece| {
                assert!(square.len() == 2);
                let chars: Vec<_> = square.chars().collect();
                let file = File::try_from(chars[0]).unwrap();
                let rank = Rank::try_from(chars[1]).unwrap();
                let square = Square::of(rank, file);
                let piece_on_square = pos.piece_at(square).unwrap();
                assert_eq!(piece.kind, piece_on_square.kind);
                assert_eq!(piece.color, piece_on_square.color);
            };

            let check_vacant = |square: Square| {
                assert!(pos.piece_at(square).is_none());
            };

            check_square("a1", Piece::new(PieceKind::Rook, Color::White));
            check_square("b1", Piece::new(PieceKind::Knight, Color::White));
            check_square("c1", Piece::new(PieceKind::Bishop, Color::White));
            check_square("d1", Piece::new(PieceKind::Queen, Color::White));
            check_square("e1", Piece::new(PieceKind::King, Color::White));
            check_square("f1", Piece::new(PieceKind::Bishop, Color::White));
            check_square("g1", Piece::new(PieceKind::Knight, Color::White));
            check_square("h1", Piece::new(PieceKind::Rook, Color::White));
            for file in &["a", "b", "c", "d", "e", "f", "g", "h"] {
                check_square(&format!("{}2", file), Piece::new(PieceKind::Pawn, Color::White));
                check_square(&format!("{}7", file), Piece::new(PieceKind::Pawn, Color::Black));
            }

            for sq in (Square::A3 as usize)..(Square::A7 as usize) {
                check_vacant(Square::from_index(sq));
            }

            check_square("a8", Piece::new(PieceKind::Rook, Color::Black));
            check_square("b8", Piece::new(PieceKind::Knight, Color::Black));
            check_square("c8", Piece::new(PieceKind::Bishop, Color::Black));
            check_square("d8", Piece::new(PieceKind::Queen, Color::Black));
            check_square("e8", Piece::new(PieceKind::King, Color::Black));
            check_square("f8", Piece::new(PieceKind::Bishop, Color::Black));
            check_square("g8", Piece::new(PieceKind::Knight, Color::Black));
            check_square("h8", Piece::new(PieceKind::Rook, Color::Black));

            assert!(pos.can_castle_kingside(Color::White));
            assert!(pos.can_castle_kingside(Color::Black));
            assert!(pos.can_castle_queenside(Color::White));
            assert!(pos.can_castle_queenside(Color::Black));
        }

        #[test]
        fn empty() {
            let err = Position::from_fen("").unwrap_err();
            assert_eq!(FenParseError::UnexpectedEnd, err);
        }

        #[test]
        fn unknown_piece() {
            let err = Position::from_fen("z7/8/8/8/8/8/8/8 w - - 0 0").unwrap_err();
            assert_eq!(FenParseError::UnknownPiece, err);
        }

        #[test]
        fn invalid_digit() {
            let err = Position::from_fen("9/8/8/8/8/8/8/8 w - - 0 0").unwrap_err();
            assert_eq!(FenParseError::InvalidDigit, err);
        }

        #[test]
        fn not_sum_to_8() {
            let err = Position::from_fen("pppp5/8/8/8/8/8/8/8 w - - 0 0").unwrap_err();
            assert_eq!(FenParseError::FileDoesNotSumToEight, err);
        }

        #[test]
        fn bad_side_to_move() {
            let err = Position::from_fen("8/8/8/8/8/8/8/8 c - - 0 0").unwrap_err();
            assert_eq!(FenParseError::InvalidSideToMove, err);
        }

        #[test]
        fn bad_castle_status() {
            let err = Position::from_fen("8/8/8/8/8/8/8/8 w a - 0 0").unwrap_err();
            assert_eq!(FenParseError::InvalidCastle, err);
        }

        #[test]
        fn bad_en_passant() {
            let err = Position::from_fen("8/8/8/8/8/8/8/8 w - 88 0 0").unwrap_err();
            assert_eq!(FenParseError::InvalidEnPassant, err);
        }

        #[test]
        fn empty_halfmove() {
            let err = Position::from_fen("8/8/8/8/8/8/8/8 w - - q 0").unwrap_err();
            assert_eq!(FenParseError::EmptyHalfmove, err);
        }

        #[test]
        fn empty_fullmove() {
            let err = Position::from_fen("8/8/8/8/8/8/8/8 w - - 0 ").unwrap_err();
            assert_eq!(FenParseError::EmptyFullmove, err);
        }

        #[test]
        fn fen_roundtrip() {
            let fens = [
                "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
                "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
                "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
                "8/8/8/3pP3/8/8/8/8 w - d6 0 3",
            ];
            for fen in &fens {
                let pos = Position::from_fen(fen).unwrap();
                assert_eq!(*fen, pos.as_fen());
            }
        }
    }

    mod uci {
        use crate::moves::Move;
        use crate::position::Position;
        use crate::types::{PieceKind, Square};

        #[test]
        fn quiet_classification() {
            let pos = Position::from_start_position();
            assert_eq!(
                Some(Move::quiet(Square::G1, Square::F3)),
                pos.move_from_uci("g1f3")
            );
        }

        #[test]
        fn double_push_classification() {
            let pos = Position::from_start_position();
            assert_eq!(
                Some(Move::double_pawn_push(Square::E2, Square::E4)),
                pos.move_from_uci("e2e4")
            );
        }

        #[test]
        fn capture_classification() {
            let pos = Position::from_fen("8/8/8/8/5p2/4P3/8/8 w - - 0 1").unwrap();
            assert_eq!(
                Some(Move::capture(Square::E3, Square::F4, PieceKind::Pawn)),
                pos.move_from_uci("e3f4")
            );
        }

        #[test]
        fn en_passant_classification() {
            let pos = Position::from_fen("8/8/8/3pP3/8/8/8/8 w - d6 0 1").unwrap();
            assert_eq!(
                Some(Move::en_passant(Square::E5, Square::D6)),
                pos.move_from_uci("e5d6")
            );
        }

        #[test]
        fn castle_classification() {
            let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
            assert_eq!(
                Some(Move::kingside_castle(Square::E1, Square::G1)),
                pos.move_from_uci("e1g1")
            );
            assert_eq!(
                Some(Move::queenside_castle(Square::E1, Square::C1)),
                pos.move_from_uci("e1c1")
            );
        }

        #[test]
        fn promotion_classification() {
            let pos = Position::from_fen("8/4P3/8/8/8/8/8/8 w - - 0 1").unwrap();
            assert_eq!(
                Some(Move::promotion(Square::E7, Square::E8, PieceKind::Queen)),
                pos.move_from_uci("e7e8q")
            );
            // Promotion without a promotion letter is malformed.
            assert_eq!(None, pos.move_from_uci("e7e8"));
        }

        #[test]
        fn garbage_rejected() {
            let pos = Position::from_start_position();
            assert_eq!(None, pos.move_from_uci("zz"));
            assert_eq!(None, pos.move_from_uci("i9i8"));
        }
    }
}
