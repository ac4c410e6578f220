use std::fmt;

use itertools::iproduct;
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{CantStopError, CsResult};

/// Four dice in the order they were thrown.
pub type Roll = [u8; 4];

/// Every ordered outcome of four six-sided dice (6^4 = 1,296), each equally likely.
pub static ALL_ROLLS: Lazy<Vec<Roll>> = Lazy::new(|| {
    iproduct!(1..=6u8, 1..=6u8, 1..=6u8, 1..=6u8)
        .map(|(a, b, c, d)| [a, b, c, d])
        .collect()
});

/// One way of splitting the four dice into two pairs, reduced to the two sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pairing {
    pub first: u8,
    pub second: u8,
}

impl Pairing {
    pub fn new(first: u8, second: u8) -> Self {
        Pairing { first, second }
    }

    pub fn is_double(&self) -> bool {
        self.first == self.second
    }

    pub fn contains(&self, sum: u8) -> bool {
        self.first == sum || self.second == sum
    }

    /// The distinct sums, in pairing order.
    pub fn distinct_sums(&self) -> Vec<u8> {
        if self.is_double() {
            vec![self.first]
        } else {
            vec![self.first, self.second]
        }
    }
}

impl fmt::Display for Pairing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.first, self.second)
    }
}

/// Throw four dice.
pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Roll {
    let mut dice = [0u8; 4];
    for d in &mut dice {
        *d = rng.gen_range(1..=6);
    }
    dice
}

/// The three pairings of a roll, always in the same order:
/// `(d0+d1, d2+d3)`, `(d0+d2, d1+d3)`, `(d0+d3, d1+d2)`.
pub fn pairings(dice: Roll) -> [Pairing; 3] {
    let [d0, d1, d2, d3] = dice;
    [
        Pairing::new(d0 + d1, d2 + d3),
        Pairing::new(d0 + d2, d1 + d3),
        Pairing::new(d0 + d3, d1 + d2),
    ]
}

pub fn check_roll(dice: Roll) -> CsResult<Roll> {
    for &d in &dice {
        if !(1..=6).contains(&d) {
            return Err(CantStopError::InvalidDie(d));
        }
    }
    Ok(dice)
}

// ---------------------------------------------------------------------------
// Dice sources
// ---------------------------------------------------------------------------

/// Where the engine's dice come from. Swapped for a scripted source in tests.
pub trait DiceSource {
    fn roll(&mut self) -> Roll;
}

/// Uniform dice from a seeded `StdRng`.
#[derive(Debug, Clone)]
pub struct RandomDice {
    seed: u64,
    rng: StdRng,
}

impl RandomDice {
    pub fn from_seed(seed: u64) -> Self {
        RandomDice {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl DiceSource for RandomDice {
    fn roll(&mut self) -> Roll {
        roll(&mut self.rng)
    }
}

/// Replays a fixed list of rolls, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    rolls: Vec<Roll>,
    cursor: usize,
}

impl ScriptedDice {
    pub fn new(rolls: Vec<Roll>) -> CsResult<Self> {
        if rolls.is_empty() {
            return Err(CantStopError::EmptyScript);
        }
        for &r in &rolls {
            check_roll(r)?;
        }
        Ok(ScriptedDice { rolls, cursor: 0 })
    }

    /// Number of rolls handed out so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl DiceSource for ScriptedDice {
    fn roll(&mut self) -> Roll {
        let r = self.rolls[self.cursor % self.rolls.len()];
        self.cursor += 1;
        r
    }
}
