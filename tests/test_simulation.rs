use cantstop_sim::board::column_length;
use cantstop_sim::config::{ContractMode, SimConfig};
use cantstop_sim::dice::{RandomDice, ScriptedDice};
use cantstop_sim::engine::Seat;
use cantstop_sim::error::CantStopError;
use cantstop_sim::oracle::ProbabilityOracle;
use cantstop_sim::simulation::*;
use cantstop_sim::strategy::{GameView, PolicySpec, Strategy};
use cantstop_sim::trace::{RollEvent, TraceOutcome};

/// Plays the first valid pairing and banks after every successful roll.
struct StopAtOnce;

impl Strategy for StopAtOnce {
    fn name(&self) -> &str {
        "stop-at-once"
    }

    fn choose_pairing(&mut self, view: &GameView) -> usize {
        view.valid_options().next().map(|o| o.index).unwrap_or(0)
    }

    fn should_stop(&mut self, _view: &GameView) -> bool {
        true
    }
}

/// Always names a pairing that does not exist.
struct OffTheBoard;

impl Strategy for OffTheBoard {
    fn name(&self) -> &str {
        "off-the-board"
    }

    fn choose_pairing(&mut self, _view: &GameView) -> usize {
        7
    }

    fn should_stop(&mut self, _view: &GameView) -> bool {
        true
    }
}

fn config(trials: usize) -> SimConfig {
    SimConfig {
        trials,
        ..SimConfig::default()
    }
}

#[test]
fn test_never_stop_self_play_finishes() {
    let oracle = ProbabilityOracle::new();
    let greedy = PolicySpec::parse("greedy").unwrap();
    // Room enough that no greedy game runs into the cap.
    let cfg = SimConfig {
        max_turns: 2000,
        ..config(1)
    };
    for seed in 0..10 {
        let result = play_match(&greedy, &greedy, &cfg, seed, &oracle).unwrap();
        assert_eq!(result.decided_by, Decision::Win, "seed {seed}");
        let w = result.winner.index();
        assert_eq!(result.completed[w], 3);
        assert!(result.completed[1 - w] < 3);
        assert!(result.turns <= cfg.max_turns);
    }
}

#[test]
fn test_trace_records_progress_after_commit() {
    let oracle = ProbabilityOracle::new();
    let cfg = SimConfig {
        target_columns: 1,
        ..SimConfig::default()
    };
    let mut dice = ScriptedDice::new(vec![[1, 1, 1, 1]]).unwrap();
    let mut records = Vec::new();
    run_single_with(&mut StopAtOnce, &mut dice, &oracle, &cfg, Some(&mut records)).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].event, RollEvent::Stopped);
    assert_eq!(records[0].permanent.get(2), 2);
    assert_eq!(records[1].event, RollEvent::Won);
    assert_eq!(records[1].permanent.get(2), 3);
}

#[test]
fn test_stop_at_once_scripted_solo() {
    let oracle = ProbabilityOracle::new();
    let cfg = SimConfig {
        target_columns: 1,
        ..SimConfig::default()
    };
    let mut dice = ScriptedDice::new(vec![[1, 1, 1, 1]]).unwrap();
    let run = run_single_with(&mut StopAtOnce, &mut dice, &oracle, &cfg, None).unwrap();
    assert!(run.reached_target);
    assert_eq!(run.turns_to(1), Some(2));
    assert!(run.turns_to(1).unwrap() <= column_length(2) as u32);
    assert_eq!(run.busts, 0);
    assert_eq!(run.column_usage.get(&2), Some(&2));
}

#[test]
fn test_stop_at_once_needs_more_than_one_turn() {
    let oracle = ProbabilityOracle::new();
    let cfg = SimConfig {
        target_columns: 1,
        ..SimConfig::default()
    };
    for seed in 0..20 {
        let mut dice = RandomDice::from_seed(seed);
        let run = run_single_with(&mut StopAtOnce, &mut dice, &oracle, &cfg, None).unwrap();
        assert!(run.reached_target);
        assert!(run.turns_to(1).unwrap() > 1);
    }
}

#[test]
fn test_self_play_first_mover_near_even() {
    let oracle = ProbabilityOracle::new();
    let spec = PolicySpec::parse("ev:1").unwrap();
    let report = simulate_matchup(&spec, &spec, &config(2500), &oracle).unwrap();
    assert_eq!(report.games, 2500);
    assert_eq!(report.wins[0] + report.wins[1], 2500);
    assert!(
        (report.first_win_rate - 0.5).abs() <= 0.10,
        "first mover won {:.3}",
        report.first_win_rate
    );
}

#[test]
fn test_batches_are_reproducible() {
    let oracle = ProbabilityOracle::new();
    let spec = PolicySpec::parse("ev:1").unwrap();
    let cfg = config(50);
    let a = simulate_single(&spec, &cfg, &oracle).unwrap();
    let b = simulate_single(&spec, &cfg, &oracle).unwrap();
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
    assert_eq!(a.trials, 50);
}

#[test]
fn test_solo_turns_to_columns_is_monotone() {
    let oracle = ProbabilityOracle::new();
    let spec = PolicySpec::parse("threshold:3").unwrap();
    let cfg = config(1);
    for seed in 0..20 {
        let run = run_single(&spec, &cfg, seed, &oracle).unwrap();
        if let (Some(a), Some(b), Some(c)) = (run.turns_to(1), run.turns_to(2), run.turns_to(3)) {
            assert!(a <= b && b <= c);
        }
        assert!(run.turns_to(0).is_none());
    }
}

#[test]
fn test_strict_contract_aborts() {
    let oracle = ProbabilityOracle::new();
    let cfg = config(1);
    let mut other = StopAtOnce;
    let mut dice = RandomDice::from_seed(3);
    let err = play_match_with(&mut OffTheBoard, &mut other, &mut dice, &oracle, &cfg, None);
    assert!(matches!(err, Err(CantStopError::InvalidPairing { index: 7 })));
}

#[test]
fn test_lenient_contract_substitutes_move() {
    let oracle = ProbabilityOracle::new();
    let cfg = SimConfig {
        contract: ContractMode::Lenient,
        max_turns: 30,
        ..config(1)
    };
    let mut other = StopAtOnce;
    let mut dice = RandomDice::from_seed(3);
    let result =
        play_match_with(&mut OffTheBoard, &mut other, &mut dice, &oracle, &cfg, None).unwrap();
    assert!(result.rolls > 0);
}

#[test]
fn test_roll_cap_forces_commit() {
    let oracle = ProbabilityOracle::new();
    let cfg = SimConfig {
        max_rolls_per_turn: 1,
        ..config(1)
    };
    let spec = PolicySpec::parse("greedy").unwrap();
    let trace = trace_solo(&spec, &cfg, 11, &oracle).unwrap();
    assert!(trace.records.iter().any(|r| r.event == RollEvent::Forced));
    let TraceOutcome::Solo(run) = trace.outcome else {
        panic!("expected a solo outcome");
    };
    assert!(run.rolls <= run.turns);
}

#[test]
fn test_match_trace_ends_on_winning_roll() {
    let oracle = ProbabilityOracle::new();
    let a = PolicySpec::parse("threshold:3").unwrap();
    let b = PolicySpec::parse("ev:1").unwrap();
    let trace = trace_match(&a, &b, &config(1), 5, &oracle).unwrap();
    assert_eq!(trace.policies, vec!["threshold:3", "ev:1"]);
    let TraceOutcome::Match(result) = &trace.outcome else {
        panic!("expected a match outcome");
    };
    if result.decided_by == Decision::Win {
        let last = trace.records.last().unwrap();
        assert_eq!(last.event, RollEvent::Won);
        assert_eq!(last.seat, result.winner);
    }
    assert!(!trace.to_text_report().is_empty());
}

#[test]
fn test_turn_cap_tie_break() {
    assert_eq!(turn_cap_winner([2, 1], [10, 30]), Seat::First);
    assert_eq!(turn_cap_winner([1, 1], [12, 10]), Seat::First);
    assert_eq!(turn_cap_winner([1, 1], [10, 10]), Seat::Second);
    assert_eq!(turn_cap_winner([0, 2], [40, 5]), Seat::Second);
}

#[test]
fn test_tournament_matrix_shape() {
    let oracle = ProbabilityOracle::new();
    let specs = vec![
        PolicySpec::parse("threshold:2").unwrap(),
        PolicySpec::parse("greedy").unwrap(),
    ];
    let matrix = tournament(&specs, &config(40), &oracle).unwrap();
    assert_eq!(matrix.policies, vec!["threshold:2", "greedy"]);
    assert_eq!(matrix.rates.len(), 2);
    for i in 0..2 {
        for j in 0..2 {
            let r = matrix.rate(i, j).unwrap();
            assert!((0.0..=1.0).contains(&r));
        }
    }
}
