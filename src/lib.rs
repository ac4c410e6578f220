pub mod board;
pub mod cli;
pub mod config;
pub mod dice;
pub mod display;
pub mod engine;
pub mod error;
pub mod oracle;
pub mod rules;
pub mod simulation;
pub mod stats;
pub mod store;
pub mod strategy;
pub mod trace;
