//! The turn state machine.
//!
//! ```text
//! AwaitingRoll ──roll──▶ PairingsOffered ──choose──▶ AwaitingStopDecision
//!      ▲            └──▶ Busted                         │       │
//!      │                   │                          roll    stop
//!      └──── end_turn ─────┴──────── Committed ◀────────────────┘
//! ```
//!
//! A [`Game`] holds everything that survives between calls: there is no
//! hidden state, so [`Game::snapshot`] / [`Game::restore`] round-trip a game
//! exactly.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::board::{
    check_column, column_length, ColumnCounts, ColumnSet, COLUMNS, COLUMNS_TO_WIN, RUNNER_LIMIT,
};
use crate::dice::{check_roll, pairings, DiceSource, Pairing, Roll};
use crate::error::{CantStopError, CsResult};
use crate::oracle::ProbabilityOracle;
use crate::rules::{self, Playability};
use crate::strategy::GameView;

// ---------------------------------------------------------------------------
// Players and ownership
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    pub const ALL: [Seat; 2] = [Seat::First, Seat::Second];

    pub fn other(self) -> Seat {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seat::First => write!(f, "player 1"),
            Seat::Second => write!(f, "player 2"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Solo,
    Duel,
}

/// Saved progress of one player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProgress {
    pub permanent: ColumnCounts,
    pub completed: ColumnSet,
}

/// Board-wide column ownership. A column is claimed at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRegistry {
    owners: [Option<Seat>; 13],
}

impl ColumnRegistry {
    pub fn new() -> Self {
        ColumnRegistry::default()
    }

    pub fn owner(&self, column: u8) -> Option<Seat> {
        if (column as usize) < self.owners.len() {
            self.owners[column as usize]
        } else {
            None
        }
    }

    pub fn claim(&mut self, column: u8, seat: Seat) -> CsResult<()> {
        let column = check_column(column)?;
        if let Some(owner) = self.owner(column) {
            return Err(CantStopError::ColumnTaken { column, owner });
        }
        self.owners[column as usize] = Some(seat);
        Ok(())
    }

    pub fn owned_by(&self, seat: Seat) -> ColumnSet {
        COLUMNS
            .iter()
            .copied()
            .filter(|&c| self.owner(c) == Some(seat))
            .collect()
    }

    /// Columns owned by anyone.
    pub fn claimed(&self) -> ColumnSet {
        COLUMNS
            .iter()
            .copied()
            .filter(|&c| self.owner(c).is_some())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Turn state
// ---------------------------------------------------------------------------

/// Unsaved progress of the player on turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    pub active: ColumnSet,
    pub temp: ColumnCounts,
    pub rolls: u32,
}

impl TurnState {
    /// Move the runner on `column` up by `steps`, never past the top.
    /// Returns the steps actually gained.
    pub fn advance(&mut self, column: u8, steps: u8, permanent: u8) -> CsResult<u8> {
        let column = check_column(column)?;
        if !self.active.contains(column) && self.active.len() >= RUNNER_LIMIT {
            return Err(CantStopError::RunnerLimit {
                column,
                active: self.active.len(),
            });
        }
        let room = column_length(column)
            .saturating_sub(permanent)
            .saturating_sub(self.temp.get(column));
        let gained = steps.min(room);
        self.active.insert(column);
        self.temp.add(column, gained);
        Ok(gained)
    }

    /// Active columns whose runner has reached the top.
    pub fn at_top(&self, permanent: &ColumnCounts) -> ColumnSet {
        self.active
            .iter()
            .filter(|&c| permanent.get(c) + self.temp.get(c) >= column_length(c))
            .collect()
    }

    pub fn unsaved(&self) -> u32 {
        self.temp.total()
    }

    fn clear(&mut self) {
        *self = TurnState::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    AwaitingRoll,
    PairingsOffered,
    AwaitingStopDecision,
    Busted,
    Committed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::AwaitingRoll => "awaiting a roll",
            Phase::PairingsOffered => "pairings are offered",
            Phase::AwaitingStopDecision => "awaiting a stop decision",
            Phase::Busted => "busted",
            Phase::Committed => "committed",
        };
        write!(f, "{}", s)
    }
}

/// One of the three pairings of the current roll, with its legality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingOption {
    pub index: usize,
    pub pairing: Pairing,
    pub playability: Playability,
}

impl PairingOption {
    pub fn is_valid(&self) -> bool {
        self.playability.is_valid()
    }

    pub fn candidates(&self) -> Vec<u8> {
        rules::candidates(self.pairing, &self.playability)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollOutcome {
    Offered,
    Busted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub saved: u32,
    /// Columns that had unsaved progress.
    pub banked: ColumnSet,
    pub newly_completed: ColumnSet,
    pub won: bool,
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    mode: Mode,
    players: [PlayerProgress; 2],
    registry: ColumnRegistry,
    current: Seat,
    turn: TurnState,
    phase: Phase,
    last_roll: Option<Roll>,
    options: Vec<PairingOption>,
    winner: Option<Seat>,
    turn_number: u32,
    busts: [u32; 2],
}

impl Game {
    fn new(mode: Mode) -> Self {
        Game {
            mode,
            players: Default::default(),
            registry: ColumnRegistry::new(),
            current: Seat::First,
            turn: TurnState::default(),
            phase: Phase::AwaitingRoll,
            last_roll: None,
            options: Vec::new(),
            winner: None,
            turn_number: 1,
            busts: [0; 2],
        }
    }

    pub fn new_solo() -> Self {
        Game::new(Mode::Solo)
    }

    pub fn new_duel() -> Self {
        Game::new(Mode::Duel)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current(&self) -> Seat {
        self.current
    }

    pub fn player(&self, seat: Seat) -> &PlayerProgress {
        &self.players[seat.index()]
    }

    pub fn registry(&self) -> &ColumnRegistry {
        &self.registry
    }

    pub fn turn(&self) -> &TurnState {
        &self.turn
    }

    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    pub fn busts(&self, seat: Seat) -> u32 {
        self.busts[seat.index()]
    }

    pub fn last_roll(&self) -> Option<Roll> {
        self.last_roll
    }

    pub fn options(&self) -> &[PairingOption] {
        &self.options
    }

    pub fn winner(&self) -> Option<Seat> {
        self.winner
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    /// Columns the player on turn may not advance: owned by anyone, or topped this turn.
    pub fn blocked(&self) -> ColumnSet {
        let permanent = &self.players[self.current.index()].permanent;
        self.registry.claimed().union(self.turn.at_top(permanent))
    }

    /// Columns the player on turn would own after committing now. Never more
    /// than [`COLUMNS_TO_WIN`]: a commit stops claiming at the winning column.
    pub fn pending_columns(&self) -> usize {
        let me = &self.players[self.current.index()];
        let topped = self
            .turn
            .at_top(&me.permanent)
            .difference(self.registry.claimed());
        (me.completed.len() + topped.len()).min(COLUMNS_TO_WIN)
    }

    /// Committing now would give the player on turn their third column.
    pub fn pending_win(&self) -> bool {
        self.pending_columns() >= COLUMNS_TO_WIN
    }

    fn ensure(&self, action: &'static str, allowed: &[Phase]) -> CsResult<()> {
        if self.winner.is_some() {
            return Err(CantStopError::GameOver);
        }
        if !allowed.contains(&self.phase) {
            return Err(CantStopError::IllegalTransition {
                action,
                phase: self.phase,
            });
        }
        Ok(())
    }

    pub fn roll_with(&mut self, dice: &mut dyn DiceSource) -> CsResult<RollOutcome> {
        let r = dice.roll();
        self.apply_roll(r)
    }

    /// Take a roll (from any source), offer its pairings, or bust.
    pub fn apply_roll(&mut self, dice: Roll) -> CsResult<RollOutcome> {
        self.ensure("roll", &[Phase::AwaitingRoll, Phase::AwaitingStopDecision])?;
        let dice = check_roll(dice)?;
        let blocked = self.blocked();
        let active = self.turn.active;

        self.turn.rolls += 1;
        self.last_roll = Some(dice);
        self.options = pairings(dice)
            .iter()
            .enumerate()
            .map(|(index, &pairing)| PairingOption {
                index,
                pairing,
                playability: rules::playability(pairing, active, blocked),
            })
            .collect();

        if self.options.iter().any(|o| o.is_valid()) {
            trace!(seat = %self.current, ?dice, active = %active, "roll offered");
            self.phase = Phase::PairingsOffered;
            Ok(RollOutcome::Offered)
        } else {
            trace!(seat = %self.current, ?dice, active = %active, lost = self.turn.unsaved(), "bust");
            self.busts[self.current.index()] += 1;
            self.turn.clear();
            self.phase = Phase::Busted;
            Ok(RollOutcome::Busted)
        }
    }

    /// Play pairing `index`, optionally naming which of its sums advances.
    /// Returns the `(column, steps gained)` moves made.
    pub fn choose(&mut self, index: usize, chosen: Option<u8>) -> CsResult<Vec<(u8, u8)>> {
        self.ensure("choose a pairing", &[Phase::PairingsOffered])?;
        let option = self
            .options
            .get(index)
            .copied()
            .ok_or(CantStopError::InvalidPairing { index })?;
        let moves = rules::resolve(
            index,
            option.pairing,
            self.turn.active,
            self.blocked(),
            chosen,
        )?;

        let permanent = self.players[self.current.index()].permanent;
        let mut applied = Vec::with_capacity(moves.len());
        for (column, steps) in moves {
            let gained = self.turn.advance(column, steps, permanent.get(column))?;
            applied.push((column, gained));
        }
        trace!(seat = %self.current, pairing = %option.pairing, ?applied, active = %self.turn.active, "apply");
        self.phase = Phase::AwaitingStopDecision;
        Ok(applied)
    }

    /// Bank the turn's progress.
    pub fn stop(&mut self) -> CsResult<CommitOutcome> {
        self.ensure("stop", &[Phase::AwaitingStopDecision])?;
        let seat = self.current;
        let saved = self.turn.unsaved();
        let banked = self.turn.temp.keys();
        let mut newly_completed = ColumnSet::empty();
        let mut won = false;

        let temp = self.turn.temp;
        for (column, steps) in temp.iter() {
            let me = &mut self.players[seat.index()];
            me.permanent.add(column, steps);
            if won || me.permanent.get(column) < column_length(column) {
                continue;
            }
            self.registry.claim(column, seat)?;
            me.completed.insert(column);
            newly_completed.insert(column);
            won = me.completed.len() >= COLUMNS_TO_WIN;
        }

        trace!(seat = %seat, saved, completed = %newly_completed, won, "commit");
        self.turn.clear();
        self.phase = Phase::Committed;
        if won {
            self.winner = Some(seat);
        }
        Ok(CommitOutcome {
            saved,
            banked,
            newly_completed,
            won,
        })
    }

    /// Hand over after a bust or a commit.
    pub fn end_turn(&mut self) -> CsResult<()> {
        self.ensure("end the turn", &[Phase::Busted, Phase::Committed])?;
        if self.mode == Mode::Duel {
            self.current = self.current.other();
        }
        self.turn.clear();
        self.options.clear();
        self.last_roll = None;
        self.turn_number += 1;
        self.phase = Phase::AwaitingRoll;
        Ok(())
    }

    /// Read-only snapshot handed to a policy.
    pub fn view<'a>(&'a self, oracle: &'a ProbabilityOracle) -> GameView<'a> {
        let me = &self.players[self.current.index()];
        let them = &self.players[self.current.other().index()];
        GameView {
            seat: self.current,
            permanent: &me.permanent,
            own_completed: me.completed,
            opponent_permanent: &them.permanent,
            opponent_completed: them.completed,
            active: self.turn.active,
            temp: &self.turn.temp,
            blocked: self.blocked(),
            options: &self.options,
            rolls_this_turn: self.turn.rolls,
            oracle,
        }
    }

    pub fn snapshot(&self) -> CsResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn restore(json: &str) -> CsResult<Game> {
        let game: Game = serde_json::from_str(json)?;
        game.check_invariants()?;
        Ok(game)
    }

    pub fn check_invariants(&self) -> CsResult<()> {
        let fail = |msg: String| Err(CantStopError::InvariantViolation(msg));
        if self.turn.active.len() > RUNNER_LIMIT {
            return fail(format!("{} active runners", self.turn.active.len()));
        }
        if !self.turn.temp.keys().is_subset(&self.turn.active) {
            return fail(format!(
                "temp progress on {} outside active {}",
                self.turn.temp.keys(),
                self.turn.active
            ));
        }
        for seat in Seat::ALL {
            let p = &self.players[seat.index()];
            if p.completed != self.registry.owned_by(seat) {
                return fail(format!("{} completed set disagrees with registry", seat));
            }
            for &c in COLUMNS.iter() {
                let temp = if seat == self.current {
                    self.turn.temp.get(c)
                } else {
                    0
                };
                if p.permanent.get(c) + temp > column_length(c) {
                    return fail(format!("{} overshoots column {}", seat, c));
                }
                if temp > 0 && self.registry.owner(c).is_some() {
                    return fail(format!("progress recorded on owned column {}", c));
                }
            }
        }
        if self.mode == Mode::Solo && self.current != Seat::First {
            return fail("solo game handed to the second seat".to_string());
        }
        Ok(())
    }
}
