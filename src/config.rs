use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::board::COLUMNS_TO_WIN;
use crate::error::{CantStopError, CsResult};

/// What the harness does when a policy answers with an illegal move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContractMode {
    /// Abort the run with the policy's error.
    #[default]
    Strict,
    /// Log a warning and play the first valid pairing instead.
    Lenient,
}

/// Settings shared by every simulation entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub trials: usize,
    pub seed: u64,
    pub max_turns: u32,
    pub max_rolls_per_turn: u32,
    /// Owned columns that end a solo run.
    pub target_columns: usize,
    pub contract: ContractMode,
    pub record_trace: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            trials: 2500,
            seed: 0xC0FFEE,
            max_turns: 200,
            max_rolls_per_turn: 100,
            target_columns: COLUMNS_TO_WIN,
            contract: ContractMode::Strict,
            record_trace: false,
        }
    }
}

impl SimConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> CsResult<SimConfig> {
        let text = fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CsResult<()> {
        if self.trials == 0 {
            return Err(CantStopError::InvalidValue("trials must be at least 1".into()));
        }
        if self.max_turns == 0 || self.max_rolls_per_turn == 0 {
            return Err(CantStopError::InvalidValue(
                "turn and roll caps must be at least 1".into(),
            ));
        }
        if !(1..=COLUMNS_TO_WIN).contains(&self.target_columns) {
            return Err(CantStopError::InvalidValue(format!(
                "target_columns must be between 1 and {}",
                COLUMNS_TO_WIN
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: SimConfig = serde_json::from_str(r#"{"trials": 10, "contract": "lenient"}"#).unwrap();
        assert_eq!(cfg.trials, 10);
        assert_eq!(cfg.contract, ContractMode::Lenient);
        assert_eq!(cfg.max_turns, 200);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_target() {
        let cfg = SimConfig {
            target_columns: 4,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = SimConfig {
            trials: 0,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
