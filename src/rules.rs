//! Pure legality rules shared by the turn engine and the probability oracle.
//!
//! A sum is *playable* when its column is not blocked and either already
//! carries a runner or a runner slot is still free. "Blocked" is decided by
//! the caller: owned columns plus columns that reached the top this turn.

use serde::{Deserialize, Serialize};

use crate::board::{is_column, ColumnSet, RUNNER_LIMIT};
use crate::dice::Pairing;
use crate::error::{CantStopError, CsResult};

pub fn is_playable(sum: u8, active: ColumnSet, blocked: ColumnSet) -> bool {
    is_column(sum)
        && !blocked.contains(sum)
        && (active.contains(sum) || active.len() < RUNNER_LIMIT)
}

/// How a single pairing can be used under the current runner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playability {
    pub first: bool,
    pub second: bool,
    /// Both distinct sums can advance together without exceeding the runner limit
    /// (for a double: the column can advance).
    pub both_fit: bool,
    /// Both sums are individually playable but only one runner slot is left.
    pub needs_choice: bool,
}

impl Playability {
    pub fn is_valid(&self) -> bool {
        self.first || self.second
    }
}

pub fn playability(pairing: Pairing, active: ColumnSet, blocked: ColumnSet) -> Playability {
    let first = is_playable(pairing.first, active, blocked);
    if pairing.is_double() {
        return Playability {
            first,
            second: first,
            both_fit: first,
            needs_choice: false,
        };
    }
    let second = is_playable(pairing.second, active, blocked);
    let both_fit = first && second && {
        let new_runners = [pairing.first, pairing.second]
            .iter()
            .filter(|&&s| !active.contains(s))
            .count();
        active.len() + new_runners <= RUNNER_LIMIT
    };
    Playability {
        first,
        second,
        both_fit,
        needs_choice: first && second && !both_fit,
    }
}

/// Playable distinct sums of a pairing, in pairing order.
pub fn candidates(pairing: Pairing, play: &Playability) -> Vec<u8> {
    if pairing.is_double() {
        return if play.first { vec![pairing.first] } else { vec![] };
    }
    let mut out = Vec::with_capacity(2);
    if play.first {
        out.push(pairing.first);
    }
    if play.second {
        out.push(pairing.second);
    }
    out
}

/// Column nearest 7; ties go to the earlier candidate.
pub fn nearest_seven(candidates: &[u8]) -> Option<u8> {
    candidates
        .iter()
        .copied()
        .min_by_key(|&n| (n as i16 - 7).abs())
}

/// Marker steps the pairing yields when played to the full: 2 for a playable
/// double or two fitting sums, 1 for a single playable sum, 0 otherwise.
pub fn steps(pairing: Pairing, active: ColumnSet, blocked: ColumnSet) -> u8 {
    let play = playability(pairing, active, blocked);
    if play.both_fit {
        2
    } else if play.is_valid() {
        1
    } else {
        0
    }
}

/// A valid pairing whose playable sums all already carry runners.
pub fn opens_no_runner(pairing: Pairing, active: ColumnSet, blocked: ColumnSet) -> bool {
    let play = playability(pairing, active, blocked);
    play.is_valid()
        && candidates(pairing, &play)
            .iter()
            .all(|&s| active.contains(s))
}

/// Work out which columns advance, and by how much, when `pairing` (offered
/// at `index`) is played with an optional caller-chosen number.
pub fn resolve(
    index: usize,
    pairing: Pairing,
    active: ColumnSet,
    blocked: ColumnSet,
    chosen: Option<u8>,
) -> CsResult<Vec<(u8, u8)>> {
    let play = playability(pairing, active, blocked);
    if !play.is_valid() {
        return Err(CantStopError::InvalidPairing { index });
    }
    let options = candidates(pairing, &play);

    if let Some(number) = chosen {
        if !options.contains(&number) {
            return Err(CantStopError::InvalidNumber { index, number });
        }
        let step = if pairing.is_double() { 2 } else { 1 };
        return Ok(vec![(number, step)]);
    }

    if pairing.is_double() {
        return Ok(vec![(pairing.first, 2)]);
    }
    if play.both_fit {
        return Ok(vec![(pairing.first, 1), (pairing.second, 1)]);
    }
    match nearest_seven(&options) {
        Some(n) => Ok(vec![(n, 1)]),
        None => Err(CantStopError::InvalidPairing { index }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playable_with_free_slot() {
        let active = ColumnSet::from([6, 7]);
        assert!(is_playable(2, active, ColumnSet::empty()));
        assert!(!is_playable(2, active, ColumnSet::from([2])));
    }

    #[test]
    fn test_playable_with_full_runners() {
        let active = ColumnSet::from([6, 7, 8]);
        assert!(is_playable(7, active, ColumnSet::empty()));
        assert!(!is_playable(5, active, ColumnSet::empty()));
        assert!(!is_playable(7, active, ColumnSet::from([7])));
    }

    #[test]
    fn test_needs_choice_with_one_slot() {
        let active = ColumnSet::from([6, 7]);
        let play = playability(Pairing::new(4, 10), active, ColumnSet::empty());
        assert!(play.first && play.second);
        assert!(!play.both_fit);
        assert!(play.needs_choice);
    }

    #[test]
    fn test_both_fit_when_one_is_active() {
        let active = ColumnSet::from([6, 7]);
        let play = playability(Pairing::new(7, 10), active, ColumnSet::empty());
        assert!(play.both_fit);
        assert!(!play.needs_choice);
    }

    #[test]
    fn test_nearest_seven_tie_goes_first() {
        assert_eq!(nearest_seven(&[4, 10]), Some(4));
        assert_eq!(nearest_seven(&[10, 4]), Some(10));
        assert_eq!(nearest_seven(&[2, 8]), Some(8));
        assert_eq!(nearest_seven(&[]), None);
    }

    #[test]
    fn test_resolve_double_moves_two() {
        let moves = resolve(0, Pairing::new(7, 7), ColumnSet::empty(), ColumnSet::empty(), None).unwrap();
        assert_eq!(moves, vec![(7, 2)]);
    }

    #[test]
    fn test_resolve_rejects_unoffered_number() {
        let active = ColumnSet::from([6, 7]);
        let err = resolve(1, Pairing::new(4, 10), active, ColumnSet::empty(), Some(9));
        assert!(matches!(err, Err(CantStopError::InvalidNumber { index: 1, number: 9 })));
        let ok = resolve(1, Pairing::new(4, 10), active, ColumnSet::empty(), Some(10)).unwrap();
        assert_eq!(ok, vec![(10, 1)]);
    }

    #[test]
    fn test_steps() {
        let active = ColumnSet::from([6, 7, 8]);
        assert_eq!(steps(Pairing::new(7, 7), active, ColumnSet::empty()), 2);
        assert_eq!(steps(Pairing::new(6, 8), active, ColumnSet::empty()), 2);
        assert_eq!(steps(Pairing::new(6, 2), active, ColumnSet::empty()), 1);
        assert_eq!(steps(Pairing::new(2, 12), active, ColumnSet::empty()), 0);
    }
}
