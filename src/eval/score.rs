// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use std::cmp::Ordering;
use std::fmt;
use std::ops::Neg;

/// The value of a position as seen by the player it is measured for. Forced
/// wins and losses carry their distance in plies so the ordering prefers the
/// faster win and the slower loss over any evaluated score.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Score {
    /// A guaranteed win in the given number of plies.
    Win(u32),

    /// A guaranteed loss in the given number of plies.
    Loss(u32),

    /// Not a known forced outcome; the evaluator's number for this position.
    Evaluated(f32),
}

impl Score {
    /// Pushes a forced outcome one ply further away. Called as scores
    /// propagate up the tree, so that a mate found deeper in the tree reads
    /// as a longer mate at the root.
    pub fn step(self) -> Score {
        match self {
            Score::Win(plies) => Score::Win(plies + 1),
            Score::Loss(plies) => Score::Loss(plies + 1),
            s => s,
        }
    }

    pub fn is_mate(self) -> bool {
        match self {
            Score::Evaluated(_) => false,
            _ => true,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Score::Win(plies) => write!(f, "#{}", plies),
            Score::Loss(plies) => write!(f, "#-{}", plies),
            Score::Evaluated(score) => write!(f, "{}", score),
        }
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Score) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Score) -> Ordering {
        // Total order over outcomes:
        //   1. A nearer win beats a farther win.
        //   2. A farther loss beats a nearer loss.
        //   3. Any win beats anything else.
        //   4. Any loss loses to anything else.
        //   5. Evaluated scores compare as numbers.
        match (self, other) {
            (Score::Win(self_win), Score::Win(other_win)) => other_win.cmp(self_win),
            (Score::Loss(self_loss), Score::Loss(other_loss)) => self_loss.cmp(other_loss),
            (Score::Win(_), _) => Ordering::Greater,
            (_, Score::Win(_)) => Ordering::Less,
            (Score::Loss(_), _) => Ordering::Less,
            (_, Score::Loss(_)) => Ordering::Greater,
            (Score::Evaluated(self_score), Score::Evaluated(other_score)) => self_score
                .partial_cmp(other_score)
                .expect("NaN in score comparison"),
        }
    }
}

impl Neg for Score {
    type Output = Score;

    fn neg(self) -> Score {
        match self {
            Score::Win(plies) => Score::Loss(plies),
            Score::Loss(plies) => Score::Win(plies),
            Score::Evaluated(score) => Score::Evaluated(-score),
        }
    }
}
