use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::board::ColumnSet;
use crate::config::{ContractMode, SimConfig};
use crate::display::{
    combos_table, matchup_table, matrix_table, odds_table, policies_table, print_error,
    print_section, solo_table, sums_table,
};
use crate::error::CsResult;
use crate::oracle::{sum_probability, ProbabilityOracle};
use crate::simulation::{simulate_matchup, simulate_single, tournament, trace_match, trace_solo};
use crate::strategy::{roster, PolicySpec};

#[derive(Parser)]
#[command(
    name = "cantstop",
    version = "1.0.0",
    about = "Can't Stop toolkit: roll odds, strategy simulations and tournaments."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file (CLI flags take precedence)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base seed for the dice
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Number of trials / games
    #[arg(short = 'n', long, global = true)]
    trials: Option<usize>,

    /// Turn cap per game
    #[arg(long, global = true)]
    max_turns: Option<u32>,

    /// Replace illegal policy moves instead of aborting
    #[arg(long, global = true)]
    lenient: bool,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// More logging (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Success odds and expected progress for a set of runners
    Odds {
        /// Active columns (e.g., 6,7,8)
        columns: String,
        /// Columns that can't be advanced
        #[arg(short, long, default_value = "")]
        blocked: String,
    },
    /// Rank every three-column runner set by success odds
    Combos {
        /// Rows to show
        #[arg(short, long, default_value = "20")]
        top: usize,
        /// Columns that can't be advanced
        #[arg(short, long, default_value = "")]
        blocked: String,
    },
    /// Probability of each column sum appearing on a roll
    Sums,
    /// List the built-in policy roster
    Policies,
    /// Single-player runs for one policy
    Solo {
        /// Policy spec (e.g., threshold:3, ev:1.0)
        policy: String,
        /// Owned columns that end a run (1-3)
        #[arg(long)]
        target: Option<usize>,
    },
    /// Head-to-head games, first policy moves first
    Duel { first: String, second: String },
    /// Every ordered pairing of policies (default: full roster)
    Tournament { policies: Vec<String> },
    /// Play one game and print every decision
    Replay {
        first: String,
        /// Opponent; omit for a solo run
        second: Option<String>,
    },
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // A subscriber is already installed when `run_with_args` runs more than
    // once in the same process; keep the first one.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .try_init();
}

pub fn run() {
    let cli = Cli::parse();
    dispatch(cli);
}

pub fn run_with_args(args: Vec<String>) {
    let cli = Cli::parse_from(args);
    dispatch(cli);
}

fn dispatch(cli: Cli) {
    init_tracing(cli.verbose);
    if let Err(e) = execute(cli) {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}

fn build_config(cli: &Cli) -> CsResult<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(trials) = cli.trials {
        config.trials = trials;
    }
    if let Some(max_turns) = cli.max_turns {
        config.max_turns = max_turns;
    }
    if cli.lenient {
        config.contract = ContractMode::Lenient;
    }
    config.validate()?;
    Ok(config)
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> CsResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

fn execute(cli: Cli) -> CsResult<()> {
    let mut config = build_config(&cli)?;
    let oracle = ProbabilityOracle::new();
    let json = cli.json;

    match cli.command {
        Commands::Odds { columns, blocked } => {
            let active: ColumnSet = columns.parse()?;
            let blocked: ColumnSet = blocked.parse()?;
            let odds = oracle.odds(active, blocked);
            let enumerated = oracle.enumerated_success(active, blocked);
            emit(json, &odds, || {
                format!(
                    "\n  Runners {}\n{}",
                    active,
                    odds_table(active, blocked, &odds, enumerated)
                )
            })
        }
        Commands::Combos { top, blocked } => {
            let blocked: ColumnSet = blocked.parse()?;
            let rows = oracle.rank_combinations(blocked);
            let shown: Vec<_> = rows.iter().take(top).cloned().collect();
            emit(json, &shown, || {
                format!(
                    "\n  {} runner sets, best {} by success\n{}",
                    rows.len(),
                    shown.len(),
                    combos_table(&rows, top)
                )
            })
        }
        Commands::Sums => {
            let probs: Vec<(u8, f64)> = crate::board::COLUMNS
                .iter()
                .map(|&c| (c, sum_probability(c)))
                .collect();
            emit(json, &probs, sums_table)
        }
        Commands::Policies => {
            let specs = roster()?;
            emit(json, &specs, || policies_table(&specs))
        }
        Commands::Solo { policy, target } => {
            if let Some(t) = target {
                config.target_columns = t;
                config.validate()?;
            }
            let spec = PolicySpec::parse(&policy)?;
            let report = simulate_single(&spec, &config, &oracle)?;
            emit(json, &report, || solo_table(&report))?;
            if config.record_trace && !json {
                let trace = trace_solo(&spec, &config, config.seed, &oracle)?;
                print_section("Trace of trial 0", &trace.to_text_report());
            }
            Ok(())
        }
        Commands::Duel { first, second } => {
            let a = PolicySpec::parse(&first)?;
            let b = PolicySpec::parse(&second)?;
            let report = simulate_matchup(&a, &b, &config, &oracle)?;
            emit(json, &report, || matchup_table(&report))?;
            if config.record_trace && !json {
                let trace = trace_match(&a, &b, &config, config.seed, &oracle)?;
                print_section("Trace of game 0", &trace.to_text_report());
            }
            Ok(())
        }
        Commands::Tournament { policies } => {
            let specs = if policies.is_empty() {
                roster()?
            } else {
                policies
                    .iter()
                    .map(|p| PolicySpec::parse(p))
                    .collect::<CsResult<Vec<_>>>()?
            };
            let matrix = tournament(&specs, &config, &oracle)?;
            emit(json, &matrix, || matrix_table(&matrix))
        }
        Commands::Replay { first, second } => {
            let a = PolicySpec::parse(&first)?;
            let trace = match second {
                Some(second) => {
                    let b = PolicySpec::parse(&second)?;
                    trace_match(&a, &b, &config, config.seed, &oracle)?
                }
                None => trace_solo(&a, &config, config.seed, &oracle)?,
            };
            emit(json, &trace, || trace.to_text_report())
        }
    }
}
