// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Move generation, in two phases: pseudo-legal moves are emitted per piece
//! kind while ignoring whether the mover's king ends up attacked, and the
//! legal filter then tries each candidate against the position. Whether a
//! pseudo-legal move is legal depends on the whole board (pins, discovered
//! checks, en-passant edge cases), so the filter makes the move, asks whether
//! the king could now be captured, and unmakes it.
use arrayvec::ArrayVec;

use crate::moves::Move;
use crate::position::{king_home, Position};
use crate::types::{
    Color, Direction, PieceKind, Rank, Square, DIAGONAL_DIRECTIONS, DIRECTIONS, KNIGHT_OFFSETS,
    SQUARES, STRAIGHT_DIRECTIONS,
};

/// Stack-allocated vector of moves. No legal chess position has more than 256
/// pseudo-legal moves.
pub type MoveVec = ArrayVec<[Move; 256]>;

/// King-step offsets; the same table drives king quiet moves and captures.
static KING_OFFSETS: [(i32, i32); 8] = [
    (1, 1),
    (1, 0),
    (1, -1),
    (0, 1),
    (0, -1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

pub struct MoveGenerator;

impl MoveGenerator {
    pub fn new() -> MoveGenerator {
        MoveGenerator
    }

    /// Emits every pseudo-legal move for the side to move into `moves`.
    pub fn generate_moves(&self, pos: &Position, moves: &mut MoveVec) {
        let color = pos.side_to_move();
        for &square in SQUARES.iter() {
            let piece = match pos.piece_at(square) {
                Some(piece) if piece.color == color => piece,
                _ => continue,
            };

            match piece.kind {
                PieceKind::Pawn => add_pawn_moves(pos, square, moves),
                PieceKind::Knight => add_offset_moves(pos, square, &KNIGHT_OFFSETS, moves),
                PieceKind::Bishop => add_sliding_moves(pos, square, &DIAGONAL_DIRECTIONS, moves),
                PieceKind::Rook => add_sliding_moves(pos, square, &STRAIGHT_DIRECTIONS, moves),
                PieceKind::Queen => add_sliding_moves(pos, square, &DIRECTIONS, moves),
                PieceKind::King => add_king_moves(pos, square, moves),
            }
        }
    }

    /// Emits every legal move for the side to move into `moves`.
    pub fn generate_legal_moves(&self, pos: &mut Position, moves: &mut MoveVec) {
        self.generate_moves(pos, moves);
        moves.retain(|&mut mov| pos.is_legal_given_pseudolegal(mov));
    }
}

impl Default for MoveGenerator {
    fn default() -> MoveGenerator {
        MoveGenerator::new()
    }
}

fn add_pawn_moves(pos: &Position, pawn: Square, moves: &mut MoveVec) {
    let color = pos.side_to_move();
    let (start_rank, promo_rank, forward) = match color {
        Color::White => (Rank::Two, Rank::Eight, 1),
        Color::Black => (Rank::Seven, Rank::One, -1),
    };

    let one_up = pawn
        .shift(0, forward)
        .expect("pawn on the last rank");

    // Pushes, single and double. Both transit squares of a double push must
    // be empty.
    if pos.piece_at(one_up).is_none() {
        if one_up.rank() == promo_rank {
            moves.push(Move::promotion(pawn, one_up, PieceKind::Bishop));
            moves.push(Move::promotion(pawn, one_up, PieceKind::Knight));
            moves.push(Move::promotion(pawn, one_up, PieceKind::Rook));
            moves.push(Move::promotion(pawn, one_up, PieceKind::Queen));
        } else {
            moves.push(Move::quiet(pawn, one_up));
        }

        if pawn.rank() == start_rank {
            let two_up = one_up
                .shift(0, forward)
                .expect("double push from the starting rank left the board");
            if pos.piece_at(two_up).is_none() {
                moves.push(Move::double_pawn_push(pawn, two_up));
            }
        }
    }

    // Diagonal captures, including promotion captures and en passant. The
    // en-passant target square is always empty; the victim stands beside it.
    for &file_delta in &[-1, 1] {
        let target = match pawn.shift(file_delta, forward) {
            Some(target) => target,
            None => continue,
        };

        match pos.piece_at(target) {
            Some(victim) if victim.color != color => {
                if target.rank() == promo_rank {
                    moves.push(Move::promotion_capture(
                        pawn,
                        target,
                        PieceKind::Bishop,
                        victim.kind,
                    ));
                    moves.push(Move::promotion_capture(
                        pawn,
                        target,
                        PieceKind::Knight,
                        victim.kind,
                    ));
                    moves.push(Move::promotion_capture(
                        pawn,
                        target,
                        PieceKind::Rook,
                        victim.kind,
                    ));
                    moves.push(Move::promotion_capture(
                        pawn,
                        target,
                        PieceKind::Queen,
                        victim.kind,
                    ));
                } else {
                    moves.push(Move::capture(pawn, target, victim.kind));
                }
            }
            Some(_) => {}
            None => {
                if Some(target) == pos.en_passant_square() {
                    moves.push(Move::en_passant(pawn, target));
                }
            }
        }
    }
}

fn add_offset_moves(
    pos: &Position,
    from: Square,
    offsets: &[(i32, i32)],
    moves: &mut MoveVec,
) {
    let color = pos.side_to_move();
    for &(file_delta, rank_delta) in offsets {
        let target = match from.shift(file_delta, rank_delta) {
            Some(target) => target,
            None => continue,
        };

        match pos.piece_at(target) {
            None => moves.push(Move::quiet(from, target)),
            Some(victim) if victim.color != color => {
                moves.push(Move::capture(from, target, victim.kind))
            }
            Some(_) => {}
        }
    }
}

fn add_sliding_moves(
    pos: &Position,
    from: Square,
    directions: &[Direction],
    moves: &mut MoveVec,
) {
    let color = pos.side_to_move();
    for &dir in directions {
        let obstacle = pos.first_obstacle_along_ray(from, dir);

        // Quiet moves cover every square strictly before the obstacle (or
        // the whole ray, if there is none).
        let mut cursor = from.towards(dir);
        while let Some(square) = cursor {
            if Some(square) == obstacle {
                break;
            }

            moves.push(Move::quiet(from, square));
            cursor = square.towards(dir);
        }

        if let Some(square) = obstacle {
            let victim = pos
                .piece_at(square)
                .expect("ray obstacle square is empty");
            if victim.color != color {
                moves.push(Move::capture(from, square, victim.kind));
            }
        }
    }
}

fn add_king_moves(pos: &Position, king: Square, moves: &mut MoveVec) {
    let color = pos.side_to_move();
    add_offset_moves(pos, king, &KING_OFFSETS, moves);

    if king != king_home(color) {
        return;
    }

    if pos.is_check(color) {
        // Can't castle out of check.
        return;
    }

    if pos.can_castle_kingside(color) {
        let one = king.towards(Direction::East).expect("castle path off board");
        let two = one.towards(Direction::East).expect("castle path off board");
        if pos.piece_at(one).is_none()
            && pos.piece_at(two).is_none()
            && !pos.is_attacked(one, color, false)
            && !pos.is_attacked(two, color, false)
        {
            moves.push(Move::kingside_castle(king, two));
        }
    }

    if pos.can_castle_queenside(color) {
        let one = king.towards(Direction::West).expect("castle path off board");
        let two = one.towards(Direction::West).expect("castle path off board");
        let three = two.towards(Direction::West).expect("castle path off board");
        // The third square must be empty for the rook to cross it, but the
        // king never passes through it, so it may be attacked.
        if pos.piece_at(one).is_none()
            && pos.piece_at(two).is_none()
            && pos.piece_at(three).is_none()
            && !pos.is_attacked(one, color, false)
            && !pos.is_attacked(two, color, false)
        {
            moves.push(Move::queenside_castle(king, two));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MoveGenerator, MoveVec};
    use crate::moves::Move;
    use crate::position::Position;
    use crate::types::Square;

    fn legal_moves(fen: &str) -> MoveVec {
        let mut pos = Position::from_fen(fen).unwrap();
        let mut moves = MoveVec::default();
        MoveGenerator::new().generate_legal_moves(&mut pos, &mut moves);
        moves
    }

    #[test]
    fn starting_position_has_twenty_moves() {
        let moves = legal_moves("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert_eq!(20, moves.len());
    }

    #[test]
    fn both_castles_generated() {
        let moves = legal_moves("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        assert!(moves.contains(&Move::kingside_castle(Square::E1, Square::G1)));
        assert!(moves.contains(&Move::queenside_castle(Square::E1, Square::C1)));
        assert_eq!(2, moves.iter().filter(|m| m.is_castle()).count());
    }

    #[test]
    fn no_castle_through_attacked_square() {
        // The black rook on f3 covers f1, so the white king may not pass
        // through it; the queenside path is untouched.
        let moves = legal_moves("r3k2r/8/8/8/8/5r2/8/R3K2R w KQkq - 0 1");
        assert!(!moves.contains(&Move::kingside_castle(Square::E1, Square::G1)));
        assert!(moves.contains(&Move::queenside_castle(Square::E1, Square::C1)));
    }

    #[test]
    fn no_castle_out_of_check() {
        let moves = legal_moves("r3k2r/8/8/8/8/4r3/8/R3K2R w KQkq - 0 1");
        assert!(moves.iter().all(|m| !m.is_castle()));
    }

    #[test]
    fn no_castle_through_occupied_square() {
        let moves = legal_moves("r3k2r/8/8/8/8/8/8/R3KB1R w KQkq - 0 1");
        assert!(!moves.contains(&Move::kingside_castle(Square::E1, Square::G1)));
        assert!(moves.contains(&Move::queenside_castle(Square::E1, Square::C1)));
    }

    #[test]
    fn queenside_b_file_may_be_attacked() {
        // The rook on b3 attacks b1, which the king never crosses; the
        // queenside castle stays available.
        let moves = legal_moves("r3k2r/8/8/8/8/1r6/8/R3K2R w KQkq - 0 1");
        assert!(moves.contains(&Move::queenside_castle(Square::E1, Square::C1)));
    }

    #[test]
    fn en_passant_generated() {
        let moves = legal_moves("8/8/8/3pP3/8/8/8/8 w - d6 0 1");
        assert!(moves.contains(&Move::en_passant(Square::E5, Square::D6)));
    }

    #[test]
    fn en_passant_only_on_recorded_file() {
        // The f-pawn did not just double-push; only the d-file capture is
        // generated.
        let moves = legal_moves("8/8/8/3pPp2/8/8/8/8 w - d6 0 1");
        assert!(moves.contains(&Move::en_passant(Square::E5, Square::D6)));
        assert!(!moves.contains(&Move::en_passant(Square::E5, Square::F6)));
    }

    #[test]
    fn promotions_generated_in_all_four_kinds() {
        let moves = legal_moves("8/4P3/8/8/8/8/8/8 w - - 0 1");
        assert_eq!(4, moves.len());
        assert!(moves.iter().all(|m| m.is_promotion()));
    }

    #[test]
    fn pinned_piece_moves_filtered() {
        // The bishop on c3 is pinned along a5-d2 and may only slide on that
        // diagonal.
        let moves = legal_moves("8/8/8/q7/8/2B5/3K4/8 w - - 0 1");
        assert!(moves.contains(&Move::quiet(Square::C3, Square::B4)));
        assert!(!moves.contains(&Move::quiet(Square::C3, Square::D4)));
        assert!(!moves.contains(&Move::quiet(Square::C3, Square::B2)));
    }

    #[test]
    fn kiwipete_has_forty_eight_moves() {
        let moves =
            legal_moves("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        assert_eq!(48, moves.len());
    }
}
