// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#[macro_use]
extern crate clap;

use std::fs::File;
use std::io;
use std::process;
use std::time::Instant;

use athena::eval::MaterialEvaluator;
use athena::search::{CsvDataRecorder, NullDataRecorder, Searcher};
use athena::uci::UciServer;
use athena::{perft, Position};
use clap::{App, Arg, ArgMatches, SubCommand};

fn main() {
    env_logger::init();
    let matches = App::new(crate_name!())
        .version(crate_version!())
        .author(crate_authors!())
        .about("UCI chess engine")
        .subcommand(
            SubCommand::with_name("perft")
                .about("PERFT analysis of board positions")
                .arg(
                    Arg::with_name("FEN")
                        .help("FEN string for a board position")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::with_name("depth")
                        .help("Depth of move tree to walk")
                        .value_name("DEPTH")
                        .short("-d")
                        .long("--depth")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("evaluate")
                .about("Search a board position for its best move")
                .arg(
                    Arg::with_name("FEN")
                        .help("FEN string for a board position")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::with_name("depth")
                        .help("Depth of move tree to search")
                        .value_name("DEPTH")
                        .short("-d")
                        .long("--depth")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("data")
                        .help("File to write per-iteration search counters to, as CSV")
                        .value_name("FILE")
                        .long("--data")
                        .takes_value(true),
                ),
        )
        .get_matches();

    if let Some(matches) = matches.subcommand_matches("perft") {
        run_perft(matches);
    }

    if let Some(matches) = matches.subcommand_matches("evaluate") {
        run_evaluate(matches);
    }

    let stdin = io::stdin();
    let svr = UciServer::new();
    svr.run(stdin.lock(), io::stdout()).unwrap()
}

fn parse_position(fen: &str) -> Position {
    match Position::from_fen(fen) {
        Ok(pos) => pos,
        Err(e) => {
            println!("invalid fen: {:?}", e);
            process::exit(1);
        }
    }
}

fn run_perft(matches: &ArgMatches) -> ! {
    let fen = matches.value_of("FEN").unwrap();
    let depth = value_t_or_exit!(matches, "depth", u32);
    let mut pos = parse_position(fen);

    println!("fen:   {}", fen);
    println!("depth: {}", depth);
    println!();
    println!("{}", pos);
    println!();
    for i in 1..depth + 1 {
        let start = Instant::now();
        let results = perft(&mut pos, i);
        let duration = start.elapsed();
        println!("perft({}) = {} ({} ms)", i, results, duration.as_millis());
    }

    process::exit(0);
}

fn run_evaluate(matches: &ArgMatches) -> ! {
    let fen = matches.value_of("FEN").unwrap();
    let depth = value_t_or_exit!(matches, "depth", u32);
    let mut pos = parse_position(fen);

    println!("fen:   {}", fen);
    println!("depth: {}", depth);
    println!();
    println!("{}", pos);
    println!();

    let mut searcher: Searcher<MaterialEvaluator> = Searcher::new();
    let result = if let Some(path) = matches.value_of("data") {
        let file = match File::create(path) {
            Ok(file) => file,
            Err(e) => {
                println!("can't create data file {}: {}", path, e);
                process::exit(1);
            }
        };
        let recorder = CsvDataRecorder::new(file);
        searcher.search_recorded(&mut pos, depth, &recorder)
    } else {
        searcher.search_recorded(&mut pos, depth, &NullDataRecorder)
    };

    println!("best move: {}", result.best_move);
    println!("    score: {}", result.score);
    println!("    nodes: {}", result.nodes_searched);
    process::exit(0);
}
