// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A minimal UCI front end. The server owns the game state and the searcher
//! and speaks the handful of commands a GUI needs: `uci`, `isready`,
//! `ucinewgame`, `position`, `go`, `stop` and `quit`. Moves arriving in
//! `position` commands are replayed through the normal make-move path so the
//! repetition history reflects the whole game.
use std::io::{self, BufRead, Write};

use crate::eval::{MaterialEvaluator, Score};
use crate::position::Position;
use crate::search::Searcher;

const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
const DEFAULT_DEPTH: u32 = 4;

pub struct UciServer {
    pos: Position,
    searcher: Searcher<MaterialEvaluator>,
}

impl UciServer {
    pub fn new() -> UciServer {
        UciServer {
            pos: Position::from_start_position(),
            searcher: Searcher::new(),
        }
    }

    pub fn run<R, W>(mut self, reader: R, mut writer: W) -> io::Result<()>
    where
        R: BufRead,
        W: Write,
    {
        for maybe_line in reader.lines() {
            let line = maybe_line?;
            debug!("uci <- {}", line);
            let components: Vec<_> = line.split_whitespace().collect();
            match components.split_first().unwrap_or((&"", &[])) {
                (&"uci", []) => self.handle_uci(&mut writer)?,
                (&"isready", []) => writeln!(&mut writer, "readyok")?,
                (&"debug", ["on"]) => {}
                (&"debug", ["off"]) => {}
                (&"quit", []) => break,
                (&"ucinewgame", []) => self.pos = Position::from_start_position(),
                (&"stop", []) => self
                    .searcher
                    .cancel_flag()
                    .store(true, std::sync::atomic::Ordering::Relaxed),
                (&"go", args) => self.handle_go(&mut writer, args)?,
                (&"position", args) => self.handle_position(&mut writer, args)?,
                _ => writeln!(&mut writer, "unrecognized command")?,
            }
        }

        Ok(())
    }

    fn handle_uci<W: Write>(&mut self, w: &mut W) -> io::Result<()> {
        writeln!(
            w,
            "id name {} {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        )?;
        writeln!(w, "id author {}", env!("CARGO_PKG_AUTHORS"))?;
        writeln!(w, "uciok")
    }

    fn handle_position<W: Write>(&mut self, w: &mut W, slice: &[&str]) -> io::Result<()> {
        if slice.is_empty() {
            writeln!(w, "invalid position command")?;
            return Ok(());
        }

        let move_idx = slice
            .iter()
            .position(|&word| word == "moves")
            .unwrap_or(slice.len());
        let moves: &[&str] = if move_idx < slice.len() {
            &slice[move_idx + 1..]
        } else {
            &[]
        };

        let fen = if let Some(idx) = slice.iter().position(|&word| word == "fen") {
            slice[idx + 1..move_idx].join(" ")
        } else if slice[0] == "startpos" {
            STARTPOS_FEN.to_owned()
        } else {
            writeln!(w, "invalid position command")?;
            return Ok(());
        };

        self.pos = match Position::from_fen(&fen) {
            Ok(pos) => pos,
            Err(e) => {
                writeln!(w, "invalid fen: {:?}", e)?;
                return Ok(());
            }
        };

        for mov in moves {
            let parsed = match self.pos.move_from_uci(mov) {
                Some(parsed) => parsed,
                None => {
                    warn!("unparseable move in position command: {}", mov);
                    break;
                }
            };

            if !self.pos.is_legal(parsed) {
                warn!("illegal move in position command: {}", mov);
                break;
            }

            self.pos.make_move(parsed);
        }

        debug!("position set to {}", self.pos.as_fen());
        Ok(())
    }

    fn handle_go<W: Write>(&mut self, w: &mut W, args: &[&str]) -> io::Result<()> {
        let depth = args
            .iter()
            .position(|&word| word == "depth")
            .and_then(|idx| args.get(idx + 1))
            .and_then(|depth| depth.parse::<u32>().ok())
            .unwrap_or(DEFAULT_DEPTH);

        // A fresh search starts with the cancellation flag lowered; `stop`
        // raises it again.
        self.searcher
            .cancel_flag()
            .store(false, std::sync::atomic::Ordering::Relaxed);
        let result = self.searcher.search(&mut self.pos, depth);
        info!(
            "searched {} nodes, best {} ({})",
            result.nodes_searched, result.best_move, result.score
        );

        write!(w, "info depth {} nodes {}", depth, result.nodes_searched)?;
        match result.score {
            Score::Evaluated(score) => {
                write!(w, " score cp {}", (score * 100f32).round() as i32)?
            }
            Score::Win(plies) => write!(w, " score mate {}", (plies + 1) / 2)?,
            Score::Loss(plies) => write!(w, " score mate -{}", (plies + 1) / 2)?,
        }
        writeln!(w)?;
        writeln!(w, "bestmove {}", result.best_move)?;
        Ok(())
    }
}

impl Default for UciServer {
    fn default() -> UciServer {
        UciServer::new()
    }
}

#[cfg(test)]
mod tests {
    use super::UciServer;
    use std::io::Cursor;

    fn session(input: &str) -> String {
        let server = UciServer::new();
        let mut output = Vec::new();
        server
            .run(Cursor::new(input.as_bytes()), &mut output)
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn handshake() {
        let out = session("uci\nisready\nquit\n");
        assert!(out.contains("uciok"));
        assert!(out.contains("readyok"));
    }

    #[test]
    fn go_reports_best_move() {
        let out = session("position startpos\ngo depth 1\nquit\n");
        assert!(out.contains("bestmove "));
        assert!(out.contains("info depth 1"));
    }

    #[test]
    fn position_with_moves() {
        let out = session("position startpos moves e2e4 e7e5\ngo depth 1\nquit\n");
        assert!(out.contains("bestmove "));
    }

    #[test]
    fn mate_score_reported() {
        let out = session("position fen 6k1/8/6K1/8/8/8/8/R7 w - - 0 1\ngo depth 2\nquit\n");
        assert!(out.contains("score mate 1"));
        assert!(out.contains("bestmove a1a8"));
    }

    #[test]
    fn bad_fen_reported() {
        let out = session("position fen zzz\nquit\n");
        assert!(out.contains("invalid fen"));
    }
}
