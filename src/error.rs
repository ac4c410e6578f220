use thiserror::Error;

use crate::engine::{Phase, Seat};

#[derive(Error, Debug)]
pub enum CantStopError {
    #[error("Invalid column: {0} (columns run from 2 to 12)")]
    InvalidColumn(u8),

    #[error("Invalid column list: {0}")]
    InvalidColumnList(String),

    #[error("Invalid die face: {0}")]
    InvalidDie(u8),

    #[error("Dice script must contain at least one roll")]
    EmptyScript,

    #[error("Cannot open runner on column {column}: {active} runners already active")]
    RunnerLimit { column: u8, active: usize },

    #[error("Pairing {index} is not a legal choice for this roll")]
    InvalidPairing { index: usize },

    #[error("Number {number} is not a playable choice for pairing {index}")]
    InvalidNumber { index: usize, number: u8 },

    #[error("Cannot {action} while {phase}")]
    IllegalTransition { action: &'static str, phase: Phase },

    #[error("Game is over")]
    GameOver,

    #[error("Column {column} is already owned by {owner}")]
    ColumnTaken { column: u8, owner: Seat },

    #[error("State invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Unknown policy: {0}")]
    UnknownPolicy(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("No game with id {0}")]
    GameNotFound(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type CsResult<T> = Result<T, CantStopError>;
