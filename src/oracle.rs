//! Probability Oracle: success probability and expected per-roll progress for
//! an active-runner set, by full enumeration of the 1,296 four-dice outcomes.
//!
//! Results are memoised on `(active, blocked)`. The table sits behind an
//! `RwLock` so one oracle can be shared by every rayon worker in a batch.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::board::{ColumnSet, COLUMNS, RUNNER_LIMIT};
use crate::dice::{pairings, Roll, ALL_ROLLS};
use crate::rules;

const OUTCOMES: f64 = 1296.0;

/// Per-roll odds for one `(active, blocked)` state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RollOdds {
    /// P: at least one pairing is playable.
    pub success: f64,
    /// Q: mean marker-steps of the best pairing, over successful outcomes.
    pub expected_progress: f64,
    /// Some pairing lands every sum on an active, unblocked column.
    pub clean: f64,
}

impl RollOdds {
    pub fn bust(&self) -> f64 {
        1.0 - self.success
    }
}

impl fmt::Display for RollOdds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P {:.1}% | bust {:.1}% | Q {:.2} | clean {:.1}%",
            self.success * 100.0,
            self.bust() * 100.0,
            self.expected_progress,
            self.clean * 100.0,
        )
    }
}

/// One row of the three-column ranking.
#[derive(Debug, Clone, Serialize)]
pub struct CombinationOdds {
    pub columns: ColumnSet,
    pub success: f64,
    pub bust: f64,
    pub clean: f64,
    pub expected_progress: f64,
}

/// Raw enumeration, no conventions applied.
struct Tally {
    successes: u32,
    clean: u32,
    steps: u32,
}

fn tally(active: ColumnSet, blocked: ColumnSet) -> Tally {
    let open = active.difference(blocked);
    let mut t = Tally {
        successes: 0,
        clean: 0,
        steps: 0,
    };
    for &dice in ALL_ROLLS.iter() {
        let options = pairings(dice);
        let best = options
            .iter()
            .map(|&p| rules::steps(p, active, blocked))
            .max()
            .unwrap_or(0);
        if best > 0 {
            t.successes += 1;
            t.steps += best as u32;
        }
        if !open.is_empty()
            && options
                .iter()
                .any(|p| p.distinct_sums().iter().all(|&s| open.contains(s)))
        {
            t.clean += 1;
        }
    }
    t
}

/// Probability that four dice can be paired to make `sum`.
pub fn sum_probability(sum: u8) -> f64 {
    let hits = ALL_ROLLS
        .iter()
        .filter(|&&dice| can_make(dice, sum))
        .count();
    hits as f64 / OUTCOMES
}

fn can_make(dice: Roll, sum: u8) -> bool {
    pairings(dice).iter().any(|p| p.contains(sum))
}

#[derive(Debug, Default)]
pub struct ProbabilityOracle {
    cache: RwLock<HashMap<(ColumnSet, ColumnSet), RollOdds>>,
}

impl ProbabilityOracle {
    pub fn new() -> Self {
        ProbabilityOracle::default()
    }

    /// Odds for the state, with the engine's conventions:
    /// - no runners: everything is 0.0;
    /// - fewer than three runners: success is 1.0, Q is still enumerated;
    /// - three runners: plain enumeration.
    pub fn odds(&self, active: ColumnSet, blocked: ColumnSet) -> RollOdds {
        let key = (active, blocked);
        if let Ok(cache) = self.cache.read() {
            if let Some(odds) = cache.get(&key) {
                return *odds;
            }
        }
        let odds = compute(active, blocked);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key, odds);
        }
        odds
    }

    pub fn success_probability(&self, active: ColumnSet, blocked: ColumnSet) -> f64 {
        self.odds(active, blocked).success
    }

    pub fn expected_progress(&self, active: ColumnSet, blocked: ColumnSet) -> f64 {
        self.odds(active, blocked).expected_progress
    }

    pub fn clean_probability(&self, active: ColumnSet, blocked: ColumnSet) -> f64 {
        self.odds(active, blocked).clean
    }

    /// Success by enumeration only. Below three runners this can be less
    /// than 1.0 on a nearly exhausted board.
    pub fn enumerated_success(&self, active: ColumnSet, blocked: ColumnSet) -> f64 {
        tally(active, blocked).successes as f64 / OUTCOMES
    }

    /// Every three-column runner set avoiding `blocked`, best odds first.
    pub fn rank_combinations(&self, blocked: ColumnSet) -> Vec<CombinationOdds> {
        let mut rows: Vec<CombinationOdds> = COLUMNS
            .iter()
            .copied()
            .filter(|&c| !blocked.contains(c))
            .combinations(RUNNER_LIMIT)
            .map(|cols| {
                let columns: ColumnSet = cols.into_iter().collect();
                let odds = self.odds(columns, blocked);
                CombinationOdds {
                    columns,
                    success: odds.success,
                    bust: odds.bust(),
                    clean: odds.clean,
                    expected_progress: odds.expected_progress,
                }
            })
            .collect();
        rows.sort_by(|a, b| {
            b.success
                .partial_cmp(&a.success)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.columns.cmp(&b.columns))
        });
        rows
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }
}

fn compute(active: ColumnSet, blocked: ColumnSet) -> RollOdds {
    if active.is_empty() {
        return RollOdds::default();
    }
    let t = tally(active, blocked);
    let expected_progress = if t.successes == 0 {
        0.0
    } else {
        t.steps as f64 / t.successes as f64
    };
    let success = if active.len() < RUNNER_LIMIT {
        1.0
    } else {
        t.successes as f64 / OUTCOMES
    };
    RollOdds {
        success,
        expected_progress,
        clean: t.clean as f64 / OUTCOMES,
    }
}
