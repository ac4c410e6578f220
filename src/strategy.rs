//! Decision policies.
//!
//! A [`Strategy`] sees a read-only [`GameView`] and answers three questions:
//! which pairing to play, which number to take when a pairing can only
//! advance one of its sums, and whether to bank after the move.
//!
//! The library is one parametrised [`Policy`] configured by a [`PolicySpec`]
//! (a pairing rule plus a stop rule). Specs are written as short strings:
//! `greedy`, `threshold:3`, `ev:1.0`, `standing:0.3,1,2`, `milestone:0.5` ...

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::board::{column_length, ColumnCounts, ColumnSet, RUNNER_LIMIT};
use crate::engine::{PairingOption, Seat};
use crate::error::{CantStopError, CsResult};
use crate::oracle::{ProbabilityOracle, RollOdds};
use crate::rules;

// ---------------------------------------------------------------------------
// Game view
// ---------------------------------------------------------------------------

/// What a policy may look at. Built by [`crate::engine::Game::view`].
pub struct GameView<'a> {
    pub seat: Seat,
    pub permanent: &'a ColumnCounts,
    pub own_completed: ColumnSet,
    pub opponent_permanent: &'a ColumnCounts,
    pub opponent_completed: ColumnSet,
    pub active: ColumnSet,
    pub temp: &'a ColumnCounts,
    /// Owned columns plus columns topped this turn.
    pub blocked: ColumnSet,
    pub options: &'a [PairingOption],
    pub rolls_this_turn: u32,
    pub oracle: &'a ProbabilityOracle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    Behind,
    Tied,
    Ahead,
}

impl GameView<'_> {
    pub fn valid_options(&self) -> impl Iterator<Item = &PairingOption> {
        self.options.iter().filter(|o| o.is_valid())
    }

    pub fn unsaved(&self) -> u32 {
        self.temp.total()
    }

    /// Saved plus unsaved steps on a column.
    pub fn position(&self, column: u8) -> u8 {
        self.permanent.get(column) + self.temp.get(column)
    }

    pub fn odds(&self) -> RollOdds {
        self.oracle.odds(self.active, self.blocked)
    }

    pub fn has_free_runner(&self) -> bool {
        self.active.len() < RUNNER_LIMIT
    }

    pub fn standing(&self) -> Standing {
        let mine = self.own_completed.len();
        let theirs = self.opponent_completed.len();
        match mine.cmp(&theirs) {
            std::cmp::Ordering::Less => Standing::Behind,
            std::cmp::Ordering::Equal => Standing::Tied,
            std::cmp::Ordering::Greater => Standing::Ahead,
        }
    }

    /// Columns completed plus columns that would complete on a commit now.
    pub fn columns_if_banked(&self) -> usize {
        let topped = self
            .active
            .iter()
            .filter(|&c| self.position(c) >= column_length(c))
            .count();
        self.own_completed.len() + topped
    }
}

// ---------------------------------------------------------------------------
// Strategy trait
// ---------------------------------------------------------------------------

pub trait Strategy: Send {
    fn name(&self) -> &str;

    /// Called once before the first roll of each of this player's turns.
    fn begin_turn(&mut self) {}

    /// Index (0..3) of a valid pairing in `view.options`.
    fn choose_pairing(&mut self, view: &GameView) -> usize;

    /// Only called when the chosen pairing can advance one sum but not both.
    fn choose_number(&mut self, _view: &GameView, _pairing_index: usize, candidates: &[u8]) -> u8 {
        rules::nearest_seven(candidates).unwrap_or_default()
    }

    /// Called once per roll, after the move has been applied.
    fn should_stop(&mut self, view: &GameView) -> bool;
}

// ---------------------------------------------------------------------------
// Policy spec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnProfile {
    Middle,
    Outside,
}

impl ColumnProfile {
    pub fn weight(self, column: u8) -> f64 {
        const MIDDLE: [f64; 13] = [0.0, 0.0, 0.5, 0.6, 0.8, 1.0, 1.2, 1.3, 1.2, 1.0, 0.8, 0.6, 0.5];
        const OUTSIDE: [f64; 13] = [0.0, 0.0, 1.3, 1.2, 1.0, 0.8, 0.6, 0.5, 0.6, 0.8, 1.0, 1.2, 1.3];
        let table = match self {
            ColumnProfile::Middle => &MIDDLE,
            ColumnProfile::Outside => &OUTSIDE,
        };
        table.get(column as usize).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum PairingRule {
    /// Doubles on runners, then doubles on 5-9 while a runner is free,
    /// then moves that open nothing new, then most runner hits.
    Smart,
    MostActive,
    Random,
    Prefer { profile: ColumnProfile },
    /// Take a move that tops a runner's column when one is offered.
    Finisher,
    /// Value sums by own progress, discounted where the opponent is ahead.
    Contested,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum StopRule {
    Never,
    Random { probability: f64 },
    Threshold { steps: u32 },
    /// Stop when `alpha * P(bust) * unsaved > P(success) * Q`.
    Expected { alpha: f64 },
    Standing { behind: f64, tied: f64, ahead: f64 },
    /// `alpha` picked by own completed columns (0, 1, 2+).
    Phased { alphas: [f64; 3] },
    /// Threshold `floor(base + P(success) * scale)`.
    Adaptive { base: f64, scale: f64 },
    /// Threshold as a fraction of the shortest remaining runner column.
    Proportional { fraction: f64 },
    /// Stop once any runner passes its next milestone (multiples of `fraction` of the column).
    Milestone { fraction: f64 },
    /// Stop once the turn's cumulative bust risk `1 - P^rolls` reaches `max_bust`.
    Survival { max_bust: f64 },
    /// Stop once banking would bring owned columns to `columns`.
    Rush { columns: usize },
    Weighted { profile: ColumnProfile, target: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySpec {
    pub name: String,
    pub pairing: PairingRule,
    pub stop: StopRule,
}

impl fmt::Display for PolicySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

fn parse_numbers(spec: &str, args: Option<&str>) -> CsResult<Vec<f64>> {
    let Some(args) = args else {
        return Ok(Vec::new());
    };
    args.split(',')
        .map(|a| {
            a.trim()
                .parse::<f64>()
                .map_err(|_| CantStopError::InvalidValue(format!("{}: '{}' is not a number", spec, a)))
        })
        .collect()
}

/// Pick parameters from the parsed list, falling back to defaults.
fn params<const N: usize>(spec: &str, given: &[f64], defaults: Option<[f64; N]>) -> CsResult<[f64; N]> {
    match (given.len(), defaults) {
        (0, Some(d)) => Ok(d),
        (n, _) if n == N => {
            let mut out = [0.0; N];
            out.copy_from_slice(given);
            Ok(out)
        }
        (n, _) => Err(CantStopError::InvalidValue(format!(
            "{}: expected {} parameter(s), got {}",
            spec, N, n
        ))),
    }
}

fn check_range(spec: &str, value: f64, lo: f64, hi: f64) -> CsResult<f64> {
    if value.is_finite() && value >= lo && value <= hi {
        Ok(value)
    } else {
        Err(CantStopError::InvalidValue(format!(
            "{}: {} is outside [{}, {}]",
            spec, value, lo, hi
        )))
    }
}

fn whole(spec: &str, value: f64, lo: f64, hi: f64) -> CsResult<f64> {
    let v = check_range(spec, value, lo, hi)?;
    if v.fract() != 0.0 {
        return Err(CantStopError::InvalidValue(format!("{}: {} is not a whole number", spec, v)));
    }
    Ok(v)
}

impl PolicySpec {
    /// Parse a policy spec string.
    ///
    /// | spec | pairing | stop |
    /// |------|---------|------|
    /// | `greedy` | most runner hits | never |
    /// | `random[:p]` | random | with probability p (0.3) |
    /// | `threshold:k` | smart | unsaved ≥ k |
    /// | `ev:a` | smart | expected-value test with risk factor a |
    /// | `standing:b,t,a` | smart | `ev` with a picked by behind/tied/ahead |
    /// | `contested:b,t,a` | contested | as `standing` |
    /// | `phased:a0,a1,a2` | smart | `ev` with a picked by own columns |
    /// | `adaptive[:base,scale]` | smart | threshold from success odds (1, 5) |
    /// | `proportional:f` | smart | fraction of shortest remaining column |
    /// | `milestone:f` | smart | runner crosses a milestone |
    /// | `survival:p` | smart | cumulative bust risk ≥ p |
    /// | `rush:n` | finisher | banking reaches n columns |
    /// | `middle:k` / `outside:k` | preferred profile | unsaved ≥ k |
    /// | `weighted-middle[:t]` / `weighted-outside[:t]` | preferred profile | weighted unsaved ≥ t (5) |
    pub fn parse(spec: &str) -> CsResult<PolicySpec> {
        let name = spec.trim().to_lowercase();
        let (kind, args) = match name.split_once(':') {
            Some((k, a)) => (k, Some(a)),
            None => (name.as_str(), None),
        };
        let nums = parse_numbers(&name, args)?;
        let n = nums.as_slice();

        let (pairing, stop) = match kind {
            "greedy" | "never" => {
                params::<0>(&name, n, Some([]))?;
                (PairingRule::MostActive, StopRule::Never)
            }
            "random" => {
                let [p] = params::<1>(&name, n, Some([0.3]))?;
                (
                    PairingRule::Random,
                    StopRule::Random {
                        probability: check_range(&name, p, 0.0, 1.0)?,
                    },
                )
            }
            "threshold" => {
                let [k] = params::<1>(&name, n, None)?;
                (
                    PairingRule::Smart,
                    StopRule::Threshold {
                        steps: whole(&name, k, 1.0, 100.0)? as u32,
                    },
                )
            }
            "ev" => {
                let [a] = params::<1>(&name, n, Some([1.0]))?;
                (
                    PairingRule::Smart,
                    StopRule::Expected {
                        alpha: check_range(&name, a, 0.0, 100.0)?,
                    },
                )
            }
            "standing" | "contested" => {
                let [b, t, a] = params::<3>(&name, n, None)?;
                let stop = StopRule::Standing {
                    behind: check_range(&name, b, 0.0, 100.0)?,
                    tied: check_range(&name, t, 0.0, 100.0)?,
                    ahead: check_range(&name, a, 0.0, 100.0)?,
                };
                let pairing = if kind == "contested" {
                    PairingRule::Contested
                } else {
                    PairingRule::Smart
                };
                (pairing, stop)
            }
            "phased" => {
                let alphas = params::<3>(&name, n, Some([0.5, 1.0, 1.5]))?;
                for a in alphas {
                    check_range(&name, a, 0.0, 100.0)?;
                }
                (PairingRule::Smart, StopRule::Phased { alphas })
            }
            "adaptive" => {
                let [base, scale] = params::<2>(&name, n, Some([1.0, 5.0]))?;
                (
                    PairingRule::Smart,
                    StopRule::Adaptive {
                        base: check_range(&name, base, 0.0, 100.0)?,
                        scale: check_range(&name, scale, 0.0, 100.0)?,
                    },
                )
            }
            "proportional" => {
                let [f] = params::<1>(&name, n, None)?;
                (
                    PairingRule::Smart,
                    StopRule::Proportional {
                        fraction: check_range(&name, f, 0.01, 1.0)?,
                    },
                )
            }
            "milestone" => {
                let [f] = params::<1>(&name, n, None)?;
                (
                    PairingRule::Smart,
                    StopRule::Milestone {
                        fraction: check_range(&name, f, 0.05, 1.0)?,
                    },
                )
            }
            "survival" => {
                let [p] = params::<1>(&name, n, Some([0.5]))?;
                (
                    PairingRule::Smart,
                    StopRule::Survival {
                        max_bust: check_range(&name, p, 0.0, 1.0)?,
                    },
                )
            }
            "rush" => {
                let [c] = params::<1>(&name, n, None)?;
                (
                    PairingRule::Finisher,
                    StopRule::Rush {
                        columns: whole(&name, c, 1.0, 3.0)? as usize,
                    },
                )
            }
            "middle" | "outside" => {
                let [k] = params::<1>(&name, n, Some([3.0]))?;
                let profile = profile_of(kind);
                (
                    PairingRule::Prefer { profile },
                    StopRule::Threshold {
                        steps: whole(&name, k, 1.0, 100.0)? as u32,
                    },
                )
            }
            "weighted-middle" | "weighted-outside" => {
                let [t] = params::<1>(&name, n, Some([5.0]))?;
                let profile = profile_of(kind);
                (
                    PairingRule::Prefer { profile },
                    StopRule::Weighted {
                        profile,
                        target: check_range(&name, t, 0.0, 100.0)?,
                    },
                )
            }
            _ => return Err(CantStopError::UnknownPolicy(spec.to_string())),
        };

        Ok(PolicySpec {
            name,
            pairing,
            stop,
        })
    }

    pub fn build(&self, seed: u64) -> Box<dyn Strategy> {
        Box::new(Policy::new(self.clone(), seed))
    }
}

fn profile_of(kind: &str) -> ColumnProfile {
    if kind.ends_with("outside") {
        ColumnProfile::Outside
    } else {
        ColumnProfile::Middle
    }
}

/// The default line-up used by `tournament` and `policies`.
pub const ROSTER: &[&str] = &[
    "greedy",
    "random:0.3",
    "threshold:1",
    "threshold:2",
    "threshold:3",
    "threshold:4",
    "threshold:5",
    "ev:0.3",
    "ev:0.5",
    "ev:1",
    "ev:1.5",
    "ev:2",
    "standing:0.3,1,2",
    "standing:0.5,1,2",
    "standing:0.7,1,1.5",
    "standing:2,1,0.3",
    "contested:0.5,1,2",
    "phased:0.5,1,1.5",
    "adaptive:1,5",
    "proportional:0.33",
    "proportional:0.5",
    "milestone:0.33",
    "milestone:0.5",
    "survival:0.5",
    "survival:0.2",
    "rush:1",
    "rush:3",
    "middle:3",
    "outside:3",
    "weighted-middle:5",
    "weighted-outside:5",
];

pub fn roster() -> CsResult<Vec<PolicySpec>> {
    ROSTER.iter().map(|s| PolicySpec::parse(s)).collect()
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

pub struct Policy {
    spec: PolicySpec,
    rng: StdRng,
}

impl Policy {
    pub fn new(spec: PolicySpec, seed: u64) -> Self {
        Policy {
            spec,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn spec(&self) -> &PolicySpec {
        &self.spec
    }
}

impl Strategy for Policy {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn choose_pairing(&mut self, view: &GameView) -> usize {
        match self.spec.pairing {
            PairingRule::Smart => smart_pairing(view),
            PairingRule::MostActive => most_active(view),
            PairingRule::Random => {
                let valid: Vec<usize> = view.valid_options().map(|o| o.index).collect();
                if valid.is_empty() {
                    return 0;
                }
                valid[self.rng.gen_range(0..valid.len())]
            }
            PairingRule::Prefer { profile } => best_by(view, |s| profile.weight(s)),
            PairingRule::Finisher => finishing_move(view).unwrap_or_else(|| smart_pairing(view)),
            PairingRule::Contested => best_by(view, |s| contested_value(view, s)),
        }
    }

    fn choose_number(&mut self, view: &GameView, _pairing_index: usize, candidates: &[u8]) -> u8 {
        let value = |s: u8| match self.spec.pairing {
            PairingRule::Prefer { profile } => profile.weight(s),
            PairingRule::Contested => contested_value(view, s),
            _ => -((s as f64) - 7.0).abs(),
        };
        let mut best: Option<(u8, f64)> = None;
        for &s in candidates {
            let v = value(s);
            if best.map_or(true, |(_, bv)| v > bv) {
                best = Some((s, v));
            }
        }
        best.map(|(s, _)| s).unwrap_or_default()
    }

    fn should_stop(&mut self, view: &GameView) -> bool {
        // Below three runners a roll can't bust.
        if view.has_free_runner() {
            return false;
        }
        let unsaved = view.unsaved() as f64;
        match self.spec.stop {
            StopRule::Never => false,
            StopRule::Random { probability } => self.rng.gen::<f64>() < probability,
            StopRule::Threshold { steps } => view.unsaved() >= steps,
            StopRule::Expected { alpha } => expected_loss_exceeds(view, alpha),
            StopRule::Standing {
                behind,
                tied,
                ahead,
            } => {
                let alpha = match view.standing() {
                    Standing::Behind => behind,
                    Standing::Tied => tied,
                    Standing::Ahead => ahead,
                };
                expected_loss_exceeds(view, alpha)
            }
            StopRule::Phased { alphas } => {
                let phase = view.own_completed.len().min(2);
                expected_loss_exceeds(view, alphas[phase])
            }
            StopRule::Adaptive { base, scale } => {
                let threshold = (base + view.odds().success * scale).floor();
                unsaved >= threshold
            }
            StopRule::Proportional { fraction } => {
                let shortest = view
                    .active
                    .iter()
                    .map(|c| column_length(c).saturating_sub(view.permanent.get(c)))
                    .min()
                    .unwrap_or(0);
                let threshold = (fraction * shortest as f64).floor().max(1.0);
                unsaved >= threshold
            }
            StopRule::Milestone { fraction } => view
                .active
                .iter()
                .any(|c| crossed_milestone(view, c, fraction)),
            StopRule::Survival { max_bust } => {
                let p = view.odds().success;
                1.0 - p.powi(view.rolls_this_turn as i32) >= max_bust
            }
            StopRule::Rush { columns } => view.columns_if_banked() >= columns,
            StopRule::Weighted { profile, target } => {
                let weighted: f64 = view
                    .temp
                    .iter()
                    .map(|(c, steps)| steps as f64 * profile.weight(c))
                    .sum();
                weighted >= target
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Pairing helpers
// ---------------------------------------------------------------------------

/// Runner hits of a pairing; a double counts twice.
fn active_hits(option: &PairingOption, active: ColumnSet) -> usize {
    [option.pairing.first, option.pairing.second]
        .iter()
        .filter(|&&s| active.contains(s))
        .count()
}

fn most_active(view: &GameView) -> usize {
    let mut best: Option<(usize, usize)> = None;
    for o in view.valid_options() {
        let score = active_hits(o, view.active);
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((o.index, score));
        }
    }
    best.map(|(i, _)| i).unwrap_or(0)
}

fn smart_pairing(view: &GameView) -> usize {
    let valid: Vec<&PairingOption> = view.valid_options().collect();

    if let Some(o) = valid
        .iter()
        .find(|o| o.pairing.is_double() && view.active.contains(o.pairing.first))
    {
        return o.index;
    }
    if view.has_free_runner() {
        if let Some(o) = valid
            .iter()
            .find(|o| o.pairing.is_double() && (5..=9).contains(&o.pairing.first))
        {
            return o.index;
        }
    }
    if let Some(o) = valid
        .iter()
        .find(|o| rules::opens_no_runner(o.pairing, view.active, view.blocked))
    {
        return o.index;
    }
    most_active(view)
}

/// Highest summed value over each pairing's playable sums (a double counts twice).
fn best_by<F: Fn(u8) -> f64>(view: &GameView, value: F) -> usize {
    let mut best: Option<(usize, f64)> = None;
    for o in view.valid_options() {
        let mut score = 0.0;
        if o.playability.first {
            score += value(o.pairing.first);
        }
        if o.playability.second {
            score += value(o.pairing.second);
        }
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((o.index, score));
        }
    }
    best.map(|(i, _)| i).unwrap_or(0)
}

fn finishing_move(view: &GameView) -> Option<usize> {
    view.valid_options()
        .find(|o| {
            o.candidates().iter().any(|&s| {
                view.active.contains(s) && view.position(s) + 1 >= column_length(s)
            })
        })
        .map(|o| o.index)
}

fn contested_value(view: &GameView, column: u8) -> f64 {
    let bonus = if view.active.contains(column) { 1.0 } else { 0.5 };
    let mine = view.position(column) as f64 / column_length(column) as f64;
    let theirs = view.opponent_permanent.fraction(column);
    let discount = if theirs > mine { 1.0 - theirs } else { 1.0 };
    (bonus + mine) * discount
}

// ---------------------------------------------------------------------------
// Stop helpers
// ---------------------------------------------------------------------------

fn expected_loss_exceeds(view: &GameView, alpha: f64) -> bool {
    let odds = view.odds();
    let gain = odds.success * odds.expected_progress;
    let loss = alpha * odds.bust() * view.unsaved() as f64;
    loss > gain
}

fn crossed_milestone(view: &GameView, column: u8, fraction: f64) -> bool {
    let length = column_length(column);
    let saved = view.permanent.get(column);
    let now = view.position(column);
    let marks = (1.0 / fraction).round().max(1.0) as u32;
    let next = (1..marks)
        .map(|i| (length as f64 * fraction * i as f64).floor() as u8)
        .chain(std::iter::once(length))
        .find(|&m| saved < m);
    matches!(next, Some(m) if now >= m)
}
