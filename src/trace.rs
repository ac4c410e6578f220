//! Per-roll decision records, emitted on request for replay tooling.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::board::{ColumnCounts, ColumnSet};
use crate::dice::Roll;
use crate::engine::{PairingOption, Seat};
use crate::simulation::{MatchResult, SoloRun};

/// How a roll ended for the player on turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollEvent {
    Continued,
    Stopped,
    Busted,
    /// Banked automatically because the commit wins (or reaches the solo target).
    Won,
    /// Banked because the per-turn roll cap was hit.
    Forced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub turn: u32,
    pub seat: Seat,
    pub roll: Roll,
    pub options: Vec<PairingOption>,
    pub chosen: Option<usize>,
    pub number: Option<u8>,
    pub moves: Vec<(u8, u8)>,
    pub active: ColumnSet,
    pub temp: ColumnCounts,
    /// Saved progress once the roll is resolved; after the commit when the
    /// turn ends on this roll.
    pub permanent: ColumnCounts,
    /// Success odds of the state the policy decided from.
    pub success: Option<f64>,
    pub event: RollEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceOutcome {
    Solo(SoloRun),
    Match(MatchResult),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameTrace {
    pub policies: Vec<String>,
    pub seed: u64,
    pub records: Vec<DecisionRecord>,
    pub outcome: TraceOutcome,
}

impl GameTrace {
    pub fn to_text_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "policies: {}  seed: {}", self.policies.join(" vs "), self.seed);
        for r in &self.records {
            let offered: Vec<String> = r
                .options
                .iter()
                .map(|o| {
                    if o.is_valid() {
                        o.pairing.to_string()
                    } else {
                        format!("{}x", o.pairing)
                    }
                })
                .collect();
            let _ = write!(
                out,
                "t{:<3} {} {:?} [{}]",
                r.turn,
                r.seat,
                r.roll,
                offered.join(" ")
            );
            if let Some(i) = r.chosen {
                let _ = write!(out, " -> #{}", i);
            }
            if let Some(n) = r.number {
                let _ = write!(out, " ({})", n);
            }
            let _ = write!(out, " active {} unsaved {}", r.active, r.temp.total());
            if let Some(p) = r.success {
                let _ = write!(out, " P={:.3}", p);
            }
            let _ = writeln!(out, " {:?}", r.event);
        }
        match &self.outcome {
            TraceOutcome::Solo(run) => {
                let _ = writeln!(
                    out,
                    "solo: {} turns, {} busts, completed {}",
                    run.turns, run.busts, run.completed
                );
            }
            TraceOutcome::Match(m) => {
                let _ = writeln!(
                    out,
                    "{} wins after {} turns ({:?})",
                    m.winner, m.turns, m.decided_by
                );
            }
        }
        out
    }
}
