//! Simulation harness: single-player runs, two-player matches, and the
//! parallel batches built on them.
//!
//! A game is played strictly sequentially. Batches fan out over trials with
//! rayon, each trial deriving its own dice and policy seeds from
//! `seed.wrapping_add(trial)`, so results do not depend on thread count.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::board::{ColumnSet, COLUMNS_TO_WIN};
use crate::config::{ContractMode, SimConfig};
use crate::dice::{DiceSource, RandomDice};
use crate::engine::{CommitOutcome, Game, RollOutcome, Seat};
use crate::error::CsResult;
use crate::oracle::ProbabilityOracle;
use crate::stats::{MatchupReport, SoloReport, WinRateMatrix};
use crate::strategy::{PolicySpec, Strategy};
use crate::trace::{DecisionRecord, GameTrace, RollEvent, TraceOutcome};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One single-player run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoloRun {
    /// Turn on which the 1st, 2nd and 3rd column was claimed.
    pub turns_to_columns: [Option<u32>; 3],
    pub turns: u32,
    pub rolls: u32,
    pub busts: u32,
    /// Commits that banked progress on each column.
    pub column_usage: BTreeMap<u8, u32>,
    pub completed: ColumnSet,
    pub reached_target: bool,
}

impl SoloRun {
    pub fn turns_to(&self, columns: usize) -> Option<u32> {
        columns
            .checked_sub(1)
            .and_then(|i| self.turns_to_columns.get(i).copied().flatten())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Win,
    TurnCap,
}

/// One two-player match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub winner: Seat,
    pub decided_by: Decision,
    pub turns: u32,
    pub rolls: u32,
    pub completed: [usize; 2],
    pub busts: [u32; 2],
    /// Saved steps on the board at the end.
    pub steps: [u32; 2],
}

// ---------------------------------------------------------------------------
// Turn driver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum TurnEnd {
    Busted,
    Stopped(CommitOutcome),
    /// Banked by the harness: the commit wins, or the roll cap was hit.
    Banked(CommitOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnSummary {
    pub end: TurnEnd,
    pub rolls: u32,
}

/// Play one whole turn for the player on turn.
///
/// `goal` is the owned-column count at which the harness banks on the
/// player's behalf (3 in a match, the target in a solo run).
pub fn play_turn(
    game: &mut Game,
    strategy: &mut dyn Strategy,
    dice: &mut dyn DiceSource,
    oracle: &ProbabilityOracle,
    config: &SimConfig,
    goal: usize,
    mut records: Option<&mut Vec<DecisionRecord>>,
) -> CsResult<TurnSummary> {
    strategy.begin_turn();
    let mut rolls = 0;
    loop {
        if game.turn().rolls >= config.max_rolls_per_turn {
            warn!(
                seat = %game.current(),
                rolls = game.turn().rolls,
                "roll cap reached, forcing a commit"
            );
            if let Some(last) = records.as_deref_mut().and_then(|r| r.last_mut()) {
                last.event = RollEvent::Forced;
            }
            let end = TurnEnd::Banked(game.stop()?);
            record_commit(game, records.as_deref_mut());
            return Ok(TurnSummary { end, rolls });
        }

        let roll = dice.roll();
        rolls += 1;
        let seat = game.current();
        let turn_number = game.turn_number();
        let permanent_before = game.player(seat).permanent;

        if game.apply_roll(roll)? == RollOutcome::Busted {
            if let Some(r) = records.as_deref_mut() {
                r.push(DecisionRecord {
                    turn: turn_number,
                    seat,
                    roll,
                    options: game.options().to_vec(),
                    chosen: None,
                    number: None,
                    moves: Vec::new(),
                    active: ColumnSet::empty(),
                    temp: Default::default(),
                    permanent: permanent_before,
                    success: None,
                    event: RollEvent::Busted,
                });
            }
            return Ok(TurnSummary {
                end: TurnEnd::Busted,
                rolls,
            });
        }

        let (index, number, moves) = play_move(game, strategy, oracle, config.contract)?;

        let banking = game.pending_columns() >= goal;
        let (stop, success) = {
            let view = game.view(oracle);
            let success = view.odds().success;
            let stop = !banking && strategy.should_stop(&view);
            (stop, success)
        };

        if let Some(r) = records.as_deref_mut() {
            let turn = game.turn();
            r.push(DecisionRecord {
                turn: turn_number,
                seat,
                roll,
                options: game.options().to_vec(),
                chosen: Some(index),
                number,
                moves,
                active: turn.active,
                temp: turn.temp,
                permanent: permanent_before,
                success: Some(success),
                event: if banking {
                    RollEvent::Won
                } else if stop {
                    RollEvent::Stopped
                } else {
                    RollEvent::Continued
                },
            });
        }

        if banking {
            let end = TurnEnd::Banked(game.stop()?);
            record_commit(game, records.as_deref_mut());
            return Ok(TurnSummary { end, rolls });
        }
        if stop {
            let end = TurnEnd::Stopped(game.stop()?);
            record_commit(game, records.as_deref_mut());
            return Ok(TurnSummary { end, rolls });
        }
    }
}

/// Overwrite the last record's saved progress with the committed columns.
fn record_commit(game: &Game, records: Option<&mut Vec<DecisionRecord>>) {
    if let Some(last) = records.and_then(|r| r.last_mut()) {
        last.permanent = game.player(last.seat).permanent;
    }
}

/// Ask the policy for a move and apply it. Under [`ContractMode::Lenient`]
/// an illegal answer is replaced by the first valid pairing.
fn play_move(
    game: &mut Game,
    strategy: &mut dyn Strategy,
    oracle: &ProbabilityOracle,
    contract: ContractMode,
) -> CsResult<(usize, Option<u8>, Vec<(u8, u8)>)> {
    let (index, number) = {
        let view = game.view(oracle);
        let index = strategy.choose_pairing(&view);
        let number = match game.options().get(index) {
            Some(o) if o.playability.needs_choice => {
                Some(strategy.choose_number(&view, index, &o.candidates()))
            }
            _ => None,
        };
        (index, number)
    };

    match game.choose(index, number) {
        Ok(moves) => Ok((index, number, moves)),
        Err(err) if contract == ContractMode::Lenient => {
            let fallback = game
                .options()
                .iter()
                .find(|o| o.is_valid())
                .map(|o| o.index)
                .unwrap_or(0);
            warn!(
                policy = strategy.name(),
                %err,
                fallback,
                "policy broke the move contract, playing first valid pairing"
            );
            let moves = game.choose(fallback, None)?;
            Ok((fallback, None, moves))
        }
        Err(err) => Err(err),
    }
}

// ---------------------------------------------------------------------------
// Single player
// ---------------------------------------------------------------------------

/// Run one policy alone until it owns `config.target_columns` columns or the
/// turn cap is hit.
pub fn run_single_with(
    strategy: &mut dyn Strategy,
    dice: &mut dyn DiceSource,
    oracle: &ProbabilityOracle,
    config: &SimConfig,
    mut records: Option<&mut Vec<DecisionRecord>>,
) -> CsResult<SoloRun> {
    let mut game = Game::new_solo();
    let goal = config.target_columns;
    let mut run = SoloRun {
        turns_to_columns: [None; 3],
        turns: 0,
        rolls: 0,
        busts: 0,
        column_usage: BTreeMap::new(),
        completed: ColumnSet::empty(),
        reached_target: false,
    };

    while run.turns < config.max_turns {
        run.turns += 1;
        let turn = play_turn(
            &mut game,
            strategy,
            dice,
            oracle,
            config,
            goal,
            records.as_deref_mut(),
        )?;
        run.rolls += turn.rolls;

        match turn.end {
            TurnEnd::Busted => run.busts += 1,
            TurnEnd::Stopped(commit) | TurnEnd::Banked(commit) => {
                for c in commit.banked.iter() {
                    *run.column_usage.entry(c).or_insert(0) += 1;
                }
                let before = run.completed.len();
                run.completed = game.player(Seat::First).completed;
                for k in before..run.completed.len().min(run.turns_to_columns.len()) {
                    run.turns_to_columns[k] = Some(run.turns);
                }
            }
        }

        if run.completed.len() >= goal {
            run.reached_target = true;
            break;
        }
        if game.is_over() {
            break;
        }
        game.end_turn()?;
    }

    if !run.reached_target {
        warn!(
            policy = strategy.name(),
            turns = run.turns,
            completed = %run.completed,
            "solo run hit the turn cap"
        );
    }
    debug!(
        policy = strategy.name(),
        turns = run.turns,
        busts = run.busts,
        completed = %run.completed,
        "solo run finished"
    );
    Ok(run)
}

struct TrialSeeds {
    dice: u64,
    policies: [u64; 2],
}

fn trial_seeds(seed: u64) -> TrialSeeds {
    let mut rng = StdRng::seed_from_u64(seed);
    TrialSeeds {
        dice: rng.gen(),
        policies: [rng.gen(), rng.gen()],
    }
}

pub fn run_single(
    spec: &PolicySpec,
    config: &SimConfig,
    seed: u64,
    oracle: &ProbabilityOracle,
) -> CsResult<SoloRun> {
    let seeds = trial_seeds(seed);
    let mut dice = RandomDice::from_seed(seeds.dice);
    let mut strategy = spec.build(seeds.policies[0]);
    run_single_with(strategy.as_mut(), &mut dice, oracle, config, None)
}

pub fn simulate_single(
    spec: &PolicySpec,
    config: &SimConfig,
    oracle: &ProbabilityOracle,
) -> CsResult<SoloReport> {
    config.validate()?;
    info!(policy = %spec, trials = config.trials, "single-player batch started");
    let runs: Vec<SoloRun> = (0..config.trials as u64)
        .into_par_iter()
        .map(|i| run_single(spec, config, config.seed.wrapping_add(i), oracle))
        .collect::<CsResult<Vec<_>>>()?;
    let report = SoloReport::from_runs(&spec.name, config.target_columns, &runs);
    info!(
        policy = %spec,
        reached = report.reached_target,
        "single-player batch finished"
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Two players
// ---------------------------------------------------------------------------

/// Play `first` against `second` on one shared board.
pub fn play_match_with(
    first: &mut dyn Strategy,
    second: &mut dyn Strategy,
    dice: &mut dyn DiceSource,
    oracle: &ProbabilityOracle,
    config: &SimConfig,
    mut records: Option<&mut Vec<DecisionRecord>>,
) -> CsResult<MatchResult> {
    let mut game = Game::new_duel();
    let mut rolls = 0u32;

    while game.turn_number() <= config.max_turns {
        let strategy: &mut dyn Strategy = match game.current() {
            Seat::First => &mut *first,
            Seat::Second => &mut *second,
        };
        let turn = play_turn(
            &mut game,
            strategy,
            dice,
            oracle,
            config,
            COLUMNS_TO_WIN,
            records.as_deref_mut(),
        )?;
        rolls += turn.rolls;
        if game.is_over() {
            break;
        }
        game.end_turn()?;
    }

    let completed = [
        game.player(Seat::First).completed.len(),
        game.player(Seat::Second).completed.len(),
    ];
    let steps = [
        game.player(Seat::First).permanent.total(),
        game.player(Seat::Second).permanent.total(),
    ];
    let busts = [game.busts(Seat::First), game.busts(Seat::Second)];

    let (winner, decided_by, turns) = match game.winner() {
        Some(seat) => (seat, Decision::Win, game.turn_number()),
        None => {
            let winner = turn_cap_winner(completed, steps);
            warn!(
                first = first.name(),
                second = second.name(),
                ?completed,
                %winner,
                "match hit the turn cap"
            );
            (winner, Decision::TurnCap, config.max_turns)
        }
    };

    debug!(%winner, turns, ?completed, ?busts, "match finished");
    Ok(MatchResult {
        winner,
        decided_by,
        turns,
        rolls,
        completed,
        busts,
        steps,
    })
}

/// Most owned columns, then most saved steps; a full tie goes to the second
/// seat, which had one turn fewer.
pub fn turn_cap_winner(completed: [usize; 2], steps: [u32; 2]) -> Seat {
    match completed[0].cmp(&completed[1]).then(steps[0].cmp(&steps[1])) {
        std::cmp::Ordering::Greater => Seat::First,
        _ => Seat::Second,
    }
}

pub fn play_match(
    first: &PolicySpec,
    second: &PolicySpec,
    config: &SimConfig,
    seed: u64,
    oracle: &ProbabilityOracle,
) -> CsResult<MatchResult> {
    let seeds = trial_seeds(seed);
    let mut dice = RandomDice::from_seed(seeds.dice);
    let mut a = first.build(seeds.policies[0]);
    let mut b = second.build(seeds.policies[1]);
    play_match_with(a.as_mut(), b.as_mut(), &mut dice, oracle, config, None)
}

pub fn simulate_matchup(
    first: &PolicySpec,
    second: &PolicySpec,
    config: &SimConfig,
    oracle: &ProbabilityOracle,
) -> CsResult<MatchupReport> {
    config.validate()?;
    info!(first = %first, second = %second, games = config.trials, "matchup started");
    let results: Vec<MatchResult> = (0..config.trials as u64)
        .into_par_iter()
        .map(|i| play_match(first, second, config, config.seed.wrapping_add(i), oracle))
        .collect::<CsResult<Vec<_>>>()?;
    let report = MatchupReport::from_results(&first.name, &second.name, &results);
    info!(
        first = %first,
        second = %second,
        first_mover_rate = report.first_win_rate,
        "matchup finished"
    );
    Ok(report)
}

/// Every ordered pair of policies, self-play included.
pub fn tournament(
    specs: &[PolicySpec],
    config: &SimConfig,
    oracle: &ProbabilityOracle,
) -> CsResult<WinRateMatrix> {
    config.validate()?;
    let n = specs.len();
    info!(policies = n, games = config.trials, "tournament started");
    let mut rates = vec![vec![0.0; n]; n];
    for (i, a) in specs.iter().enumerate() {
        for (j, b) in specs.iter().enumerate() {
            rates[i][j] = simulate_matchup(a, b, config, oracle)?.first_win_rate;
        }
    }
    info!(policies = n, "tournament finished");
    Ok(WinRateMatrix {
        policies: specs.iter().map(|s| s.name.clone()).collect(),
        games: config.trials,
        rates,
    })
}

// ---------------------------------------------------------------------------
// Traces
// ---------------------------------------------------------------------------

pub fn trace_solo(
    spec: &PolicySpec,
    config: &SimConfig,
    seed: u64,
    oracle: &ProbabilityOracle,
) -> CsResult<GameTrace> {
    let seeds = trial_seeds(seed);
    let mut dice = RandomDice::from_seed(seeds.dice);
    let mut strategy = spec.build(seeds.policies[0]);
    let mut records = Vec::new();
    let run = run_single_with(strategy.as_mut(), &mut dice, oracle, config, Some(&mut records))?;
    Ok(GameTrace {
        policies: vec![spec.name.clone()],
        seed,
        records,
        outcome: TraceOutcome::Solo(run),
    })
}

pub fn trace_match(
    first: &PolicySpec,
    second: &PolicySpec,
    config: &SimConfig,
    seed: u64,
    oracle: &ProbabilityOracle,
) -> CsResult<GameTrace> {
    let seeds = trial_seeds(seed);
    let mut dice = RandomDice::from_seed(seeds.dice);
    let mut a = first.build(seeds.policies[0]);
    let mut b = second.build(seeds.policies[1]);
    let mut records = Vec::new();
    let result = play_match_with(
        a.as_mut(),
        b.as_mut(),
        &mut dice,
        oracle,
        config,
        Some(&mut records),
    )?;
    Ok(GameTrace {
        policies: vec![first.name.clone(), second.name.clone()],
        seed,
        records,
        outcome: TraceOutcome::Match(result),
    })
}
