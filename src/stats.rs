//! Aggregation of trial results into the summaries reporting tools consume.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::Seat;
use crate::simulation::{Decision, MatchResult, SoloRun};

/// Distribution summary of one measured quantity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p10: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
}

/// Percentile of sorted data, taken at index `round(p / 100 * (n - 1))`.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

impl Summary {
    pub fn from_values(values: &[f64]) -> Summary {
        if values.is_empty() {
            return Summary::default();
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };
        Summary {
            count: n,
            mean,
            median,
            std_dev: var.sqrt(),
            min: sorted[0],
            max: sorted[n - 1],
            p10: percentile(&sorted, 10.0),
            p25: percentile(&sorted, 25.0),
            p75: percentile(&sorted, 75.0),
            p90: percentile(&sorted, 90.0),
        }
    }

    pub fn from_counts<I: IntoIterator<Item = u32>>(values: I) -> Summary {
        let v: Vec<f64> = values.into_iter().map(f64::from).collect();
        Summary::from_values(&v)
    }
}

// ---------------------------------------------------------------------------
// Single player
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoloReport {
    pub policy: String,
    pub trials: usize,
    pub target_columns: usize,
    pub reached_target: usize,
    /// Turns to own 1, 2 and 3 columns, over the runs that got there.
    pub turns_to_1: Summary,
    pub turns_to_2: Summary,
    pub turns_to_3: Summary,
    pub turns: Summary,
    pub rolls: Summary,
    pub busts: Summary,
    /// Banked commits per column, over all runs.
    pub column_usage: BTreeMap<u8, u64>,
}

impl SoloReport {
    pub fn from_runs(policy: &str, target_columns: usize, runs: &[SoloRun]) -> SoloReport {
        let turns_to = |k: usize| Summary::from_counts(runs.iter().filter_map(|r| r.turns_to(k)));
        let mut column_usage = BTreeMap::new();
        for run in runs {
            for (&c, &n) in &run.column_usage {
                *column_usage.entry(c).or_insert(0u64) += n as u64;
            }
        }
        SoloReport {
            policy: policy.to_string(),
            trials: runs.len(),
            target_columns,
            reached_target: runs.iter().filter(|r| r.reached_target).count(),
            turns_to_1: turns_to(1),
            turns_to_2: turns_to(2),
            turns_to_3: turns_to(3),
            turns: Summary::from_counts(runs.iter().map(|r| r.turns)),
            rolls: Summary::from_counts(runs.iter().map(|r| r.rolls)),
            busts: Summary::from_counts(runs.iter().map(|r| r.busts)),
            column_usage,
        }
    }
}

// ---------------------------------------------------------------------------
// Matchups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchupReport {
    pub first: String,
    pub second: String,
    pub games: usize,
    pub wins: [usize; 2],
    pub first_win_rate: f64,
    /// Games settled by the turn-cap tie-break.
    pub turn_capped: usize,
    pub turns: Summary,
    pub completed: [Summary; 2],
    pub busts: [Summary; 2],
}

impl MatchupReport {
    pub fn from_results(first: &str, second: &str, results: &[MatchResult]) -> MatchupReport {
        let mut wins = [0usize; 2];
        for r in results {
            wins[r.winner.index()] += 1;
        }
        let games = results.len();
        MatchupReport {
            first: first.to_string(),
            second: second.to_string(),
            games,
            wins,
            first_win_rate: if games == 0 {
                0.0
            } else {
                wins[Seat::First.index()] as f64 / games as f64
            },
            turn_capped: results
                .iter()
                .filter(|r| r.decided_by == Decision::TurnCap)
                .count(),
            turns: Summary::from_counts(results.iter().map(|r| r.turns)),
            completed: per_seat(results, |r, i| r.completed[i] as u32),
            busts: per_seat(results, |r, i| r.busts[i]),
        }
    }
}

fn per_seat<F: Fn(&MatchResult, usize) -> u32>(results: &[MatchResult], f: F) -> [Summary; 2] {
    [
        Summary::from_counts(results.iter().map(|r| f(r, 0))),
        Summary::from_counts(results.iter().map(|r| f(r, 1))),
    ]
}

/// `rates[i][j]`: win rate of policy `i` moving first against policy `j`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinRateMatrix {
    pub policies: Vec<String>,
    pub games: usize,
    pub rates: Vec<Vec<f64>>,
}

impl WinRateMatrix {
    pub fn rate(&self, first: usize, second: usize) -> Option<f64> {
        self.rates.get(first).and_then(|row| row.get(second)).copied()
    }

    /// Mean win rate of policy `i` over every game it played, from either seat.
    pub fn overall(&self, i: usize) -> f64 {
        let n = self.policies.len();
        if n == 0 || i >= n {
            return 0.0;
        }
        let as_first: f64 = (0..n).map(|j| self.rates[i][j]).sum();
        let as_second: f64 = (0..n).map(|j| 1.0 - self.rates[j][i]).sum();
        (as_first + as_second) / (2 * n) as f64
    }

    /// Policies by overall win rate, best first.
    pub fn ranking(&self) -> Vec<(String, f64)> {
        let mut rows: Vec<(String, f64)> = self
            .policies
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), self.overall(i)))
            .collect();
        rows.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        rows
    }
}
