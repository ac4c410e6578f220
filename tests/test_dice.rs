use cantstop_sim::dice::*;
use cantstop_sim::error::CantStopError;

#[test]
fn test_pairings_partition_the_dice() {
    for &dice in ALL_ROLLS.iter() {
        let total: u32 = dice.iter().map(|&d| d as u32).sum();
        for p in pairings(dice) {
            assert_eq!((p.first + p.second) as u32, total);
            assert!((2..=12).contains(&p.first));
            assert!((2..=12).contains(&p.second));
        }
    }
}

#[test]
fn test_each_die_used_once_per_pairing() {
    let dice = [1, 2, 4, 6];
    let expected = [(3, 10), (5, 8), (7, 6)];
    for (p, (a, b)) in pairings(dice).iter().zip(expected) {
        assert_eq!((p.first, p.second), (a, b));
    }
}

#[test]
fn test_double_pairing() {
    let p = pairings([3, 3, 3, 3])[0];
    assert!(p.is_double());
    assert_eq!(p.distinct_sums(), vec![6]);
    assert_eq!(p.to_string(), "(6, 6)");
}

#[test]
fn test_random_dice_reproducible() {
    let mut a = RandomDice::from_seed(42);
    let mut b = RandomDice::from_seed(42);
    for _ in 0..50 {
        let r = a.roll();
        assert_eq!(r, b.roll());
        assert!(r.iter().all(|&d| (1..=6).contains(&d)));
    }
    assert_eq!(a.seed(), 42);
}

#[test]
fn test_scripted_dice_replays_in_order() {
    let mut dice = ScriptedDice::new(vec![[1, 2, 3, 4], [6, 6, 5, 5]]).unwrap();
    assert_eq!(dice.roll(), [1, 2, 3, 4]);
    assert_eq!(dice.roll(), [6, 6, 5, 5]);
    assert_eq!(dice.consumed(), 2);
}

#[test]
fn test_scripted_dice_rejects_empty() {
    assert!(matches!(ScriptedDice::new(vec![]), Err(CantStopError::EmptyScript)));
}

#[test]
fn test_check_roll_rejects_seven() {
    assert!(matches!(check_roll([1, 7, 2, 3]), Err(CantStopError::InvalidDie(7))));
    assert!(check_roll([1, 6, 2, 3]).is_ok());
}
