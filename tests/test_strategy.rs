use cantstop_sim::board::ColumnSet;
use cantstop_sim::dice::ScriptedDice;
use cantstop_sim::engine::{Game, Seat};
use cantstop_sim::oracle::ProbabilityOracle;
use cantstop_sim::strategy::*;

fn set(cols: &[u8]) -> ColumnSet {
    cols.iter().copied().collect()
}

/// Solo game with runners on 2, 4 and 6 (four unsaved steps).
fn three_runner_game() -> Game {
    let mut game = Game::new_solo();
    let mut dice = ScriptedDice::new(vec![[1, 1, 2, 2], [3, 3, 3, 3]]).unwrap();
    for _ in 0..2 {
        game.roll_with(&mut dice).unwrap();
        game.choose(0, None).unwrap();
    }
    assert_eq!(game.turn().active, set(&[2, 4, 6]));
    game
}

fn policy(spec: &str) -> Policy {
    Policy::new(PolicySpec::parse(spec).unwrap(), 7)
}

#[test]
fn test_parse_threshold() {
    let spec = PolicySpec::parse("threshold:3").unwrap();
    assert_eq!(spec.name, "threshold:3");
    assert_eq!(spec.pairing, PairingRule::Smart);
    assert_eq!(spec.stop, StopRule::Threshold { steps: 3 });
    assert_eq!(spec.to_string(), "threshold:3");
}

#[test]
fn test_parse_contested_uses_contested_pairing() {
    let spec = PolicySpec::parse("contested:0.5,1,2").unwrap();
    assert_eq!(spec.pairing, PairingRule::Contested);
    assert_eq!(
        spec.stop,
        StopRule::Standing {
            behind: 0.5,
            tied: 1.0,
            ahead: 2.0
        }
    );
}

#[test]
fn test_parse_weighted_profile() {
    let spec = PolicySpec::parse("weighted-outside").unwrap();
    assert_eq!(
        spec.pairing,
        PairingRule::Prefer {
            profile: ColumnProfile::Outside
        }
    );
    assert_eq!(
        spec.stop,
        StopRule::Weighted {
            profile: ColumnProfile::Outside,
            target: 5.0
        }
    );
}

#[test]
fn test_spec_serializes_tagged() {
    let spec = PolicySpec::parse("ev:1.5").unwrap();
    let json = serde_json::to_value(&spec).unwrap();
    assert_eq!(json["stop"]["rule"], "expected");
    assert_eq!(json["stop"]["alpha"], 1.5);
    assert_eq!(json["pairing"]["rule"], "smart");
}

#[test]
fn test_never_stops_with_free_runner() {
    let oracle = ProbabilityOracle::new();
    let mut game = Game::new_solo();
    game.apply_roll([1, 1, 2, 2]).unwrap();
    game.choose(0, None).unwrap();
    let view = game.view(&oracle);
    assert_eq!(view.unsaved(), 2);
    assert!(view.has_free_runner());

    for spec in ["threshold:1", "ev:0", "survival:0", "milestone:0.05"] {
        assert!(!policy(spec).should_stop(&view), "{}", spec);
    }
}

#[test]
fn test_threshold_stops_at_k() {
    let oracle = ProbabilityOracle::new();
    let game = three_runner_game();
    let view = game.view(&oracle);
    assert_eq!(view.unsaved(), 4);
    assert!(policy("threshold:4").should_stop(&view));
    assert!(!policy("threshold:5").should_stop(&view));
}

#[test]
fn test_greedy_never_stops() {
    let oracle = ProbabilityOracle::new();
    let game = three_runner_game();
    let view = game.view(&oracle);
    assert!(!policy("greedy").should_stop(&view));
}

#[test]
fn test_ev_risk_factor_orders_decisions() {
    let oracle = ProbabilityOracle::new();
    let game = three_runner_game();
    let view = game.view(&oracle);
    // Four steps at stake against a 24% bust chance.
    assert!(policy("ev:2").should_stop(&view));
    assert!(!policy("ev:0").should_stop(&view));
}

#[test]
fn test_smart_pairing_takes_double_on_runner() {
    let oracle = ProbabilityOracle::new();
    let mut game = three_runner_game();
    game.apply_roll([1, 1, 3, 3]).unwrap();
    // (2, 6), (4, 4), (4, 4)
    let view = game.view(&oracle);
    assert_eq!(policy("threshold:3").choose_pairing(&view), 1);
}

#[test]
fn test_profile_preference_picks_number() {
    let oracle = ProbabilityOracle::new();
    let mut game = Game::new_solo();
    let mut dice = ScriptedDice::new(vec![[1, 1, 2, 2], [3, 3, 3, 3]]).unwrap();
    game.roll_with(&mut dice).unwrap();
    game.choose(0, None).unwrap();
    game.roll_with(&mut dice).unwrap();
    let view = game.view(&oracle);
    let mut middle = policy("middle:3");
    let mut outside = policy("outside:3");
    assert_eq!(middle.choose_number(&view, 0, &[3, 7]), 7);
    assert_eq!(outside.choose_number(&view, 0, &[3, 7]), 3);
}

#[test]
fn test_rush_stops_when_banking_reaches_target() {
    let oracle = ProbabilityOracle::new();
    let mut game = Game::new_solo();
    let mut dice = ScriptedDice::new(vec![[1, 1, 1, 1], [1, 1, 2, 2], [3, 3, 3, 3]]).unwrap();
    for _ in 0..3 {
        game.roll_with(&mut dice).unwrap();
        let index = game.options().iter().find(|o| o.is_valid()).unwrap().index;
        game.choose(index, None).unwrap();
    }
    // Column 2 topped this turn, runners on 2, 4 and 6.
    let view = game.view(&oracle);
    assert_eq!(view.columns_if_banked(), 1);
    assert!(policy("rush:1").should_stop(&view));
    assert!(!policy("rush:3").should_stop(&view));
}

#[test]
fn test_standing_reads_completed_columns() {
    let oracle = ProbabilityOracle::new();
    let game = Game::new_duel();
    let view = game.view(&oracle);
    assert_eq!(view.seat, Seat::First);
    assert_eq!(view.standing(), Standing::Tied);
}

#[test]
fn test_random_policy_is_seeded() {
    let oracle = ProbabilityOracle::new();
    let game = three_runner_game();
    let view = game.view(&oracle);
    let spec = PolicySpec::parse("random:0.5").unwrap();
    let mut a = Policy::new(spec.clone(), 99);
    let mut b = Policy::new(spec, 99);
    for _ in 0..20 {
        assert_eq!(a.should_stop(&view), b.should_stop(&view));
    }
}

#[test]
fn test_build_boxes_named_policy() {
    let spec = PolicySpec::parse("milestone:0.5").unwrap();
    let strategy = spec.build(1);
    assert_eq!(strategy.name(), "milestone:0.5");
}
