// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#[macro_use]
extern crate criterion;

use athena::{perft, Color, Move, MoveGenerator, MoveVec, Position, Square};
use criterion::black_box;
use criterion::Criterion;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("generate moves start", |b| {
        let pos = Position::from_start_position();
        let gen = MoveGenerator::new();
        b.iter(|| {
            let mut moves = MoveVec::default();
            gen.generate_moves(black_box(&pos), &mut moves);
            moves
        })
    });

    c.bench_function("generate moves kiwipete", |b| {
        let pos = Position::from_fen(KIWIPETE).unwrap();
        let gen = MoveGenerator::new();
        b.iter(|| {
            let mut moves = MoveVec::default();
            gen.generate_moves(black_box(&pos), &mut moves);
            moves
        })
    });

    c.bench_function("make unmake cycle", |b| {
        let mut pos = Position::from_start_position();
        let mov = Move::double_pawn_push(Square::E2, Square::E4);
        b.iter(|| {
            pos.make_move(black_box(mov));
            pos.unmake_move(black_box(mov));
        })
    });

    c.bench_function("check detection kiwipete", |b| {
        let pos = Position::from_fen(KIWIPETE).unwrap();
        b.iter(|| black_box(&pos).is_check(Color::White))
    });

    c.bench_function("perft 2 start", |b| {
        let mut pos = Position::from_start_position();
        b.iter(|| perft(black_box(&mut pos), 2))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
