use std::collections::BTreeMap;

use approx::assert_abs_diff_eq;
use cantstop_sim::board::ColumnSet;
use cantstop_sim::engine::Seat;
use cantstop_sim::simulation::{Decision, MatchResult, SoloRun};
use cantstop_sim::stats::*;

#[test]
fn test_summary_basic() {
    let s = Summary::from_values(&[4.0, 1.0, 3.0, 2.0]);
    assert_eq!(s.count, 4);
    assert_abs_diff_eq!(s.mean, 2.5);
    assert_abs_diff_eq!(s.median, 2.5);
    assert_abs_diff_eq!(s.std_dev, 1.25f64.sqrt(), epsilon = 1e-12);
    assert_abs_diff_eq!(s.min, 1.0);
    assert_abs_diff_eq!(s.max, 4.0);
    assert_abs_diff_eq!(s.p10, 1.0);
    assert_abs_diff_eq!(s.p25, 2.0);
    assert_abs_diff_eq!(s.p75, 3.0);
    assert_abs_diff_eq!(s.p90, 4.0);
}

#[test]
fn test_summary_percentiles_round_interpolated_index() {
    let values: Vec<f64> = (1..=10).map(f64::from).collect();
    let s = Summary::from_values(&values);
    assert_abs_diff_eq!(s.median, 5.5);
    // index round(0.10 * 9) = 1, where nearest rank would give index 0
    assert_abs_diff_eq!(s.p10, 2.0);
    assert_abs_diff_eq!(s.p25, 3.0);
    assert_abs_diff_eq!(s.p75, 8.0);
    assert_abs_diff_eq!(s.p90, 9.0);
}

#[test]
fn test_summary_odd_median() {
    let s = Summary::from_counts([7, 1, 5]);
    assert_abs_diff_eq!(s.median, 5.0);
    assert_abs_diff_eq!(s.mean, 13.0 / 3.0, epsilon = 1e-12);
}

#[test]
fn test_summary_empty() {
    let s = Summary::from_values(&[]);
    assert_eq!(s.count, 0);
    assert_abs_diff_eq!(s.mean, 0.0);
}

fn solo(turns_to: [Option<u32>; 3], turns: u32, busts: u32, usage: &[(u8, u32)]) -> SoloRun {
    SoloRun {
        turns_to_columns: turns_to,
        turns,
        rolls: turns * 3,
        busts,
        column_usage: usage.iter().copied().collect::<BTreeMap<_, _>>(),
        completed: ColumnSet::empty(),
        reached_target: turns_to[2].is_some(),
    }
}

#[test]
fn test_solo_report_skips_unreached_milestones() {
    let runs = vec![
        solo([Some(4), Some(9), Some(15)], 15, 3, &[(7, 5), (8, 2)]),
        solo([Some(6), None, None], 200, 40, &[(7, 1)]),
    ];
    let report = SoloReport::from_runs("threshold:3", 3, &runs);
    assert_eq!(report.trials, 2);
    assert_eq!(report.reached_target, 1);
    assert_eq!(report.turns_to_1.count, 2);
    assert_abs_diff_eq!(report.turns_to_1.mean, 5.0);
    assert_eq!(report.turns_to_3.count, 1);
    assert_abs_diff_eq!(report.turns_to_3.mean, 15.0);
    assert_eq!(report.column_usage.get(&7), Some(&6));
    assert_eq!(report.column_usage.get(&8), Some(&2));
}

fn result(winner: Seat, decided_by: Decision, turns: u32) -> MatchResult {
    MatchResult {
        winner,
        decided_by,
        turns,
        rolls: turns * 4,
        completed: if winner == Seat::First { [3, 1] } else { [1, 3] },
        busts: [2, 5],
        steps: [20, 18],
    }
}

#[test]
fn test_matchup_report_counts() {
    let results = vec![
        result(Seat::First, Decision::Win, 30),
        result(Seat::First, Decision::Win, 40),
        result(Seat::Second, Decision::TurnCap, 200),
        result(Seat::Second, Decision::Win, 50),
    ];
    let report = MatchupReport::from_results("ev:1", "greedy", &results);
    assert_eq!(report.games, 4);
    assert_eq!(report.wins, [2, 2]);
    assert_abs_diff_eq!(report.first_win_rate, 0.5);
    assert_eq!(report.turn_capped, 1);
    assert_abs_diff_eq!(report.completed[0].mean, 2.0);
    assert_abs_diff_eq!(report.busts[1].mean, 5.0);
}

#[test]
fn test_win_rate_matrix_overall() {
    let matrix = WinRateMatrix {
        policies: vec!["a".into(), "b".into()],
        games: 100,
        rates: vec![vec![0.5, 0.7], vec![0.4, 0.5]],
    };
    assert_abs_diff_eq!(matrix.overall(0), 0.575, epsilon = 1e-12);
    assert_abs_diff_eq!(matrix.overall(1), 0.425, epsilon = 1e-12);
    assert_eq!(matrix.rate(2, 0), None);
    let ranking = matrix.ranking();
    assert_eq!(ranking[0].0, "a");
    assert_eq!(ranking[1].0, "b");
}
