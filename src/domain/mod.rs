//! Core engine types and logic.

pub mod prices;
pub mod series;
pub mod cache;
pub mod schedule;
pub mod selector;
pub mod weighting;
pub mod rebalance;
pub mod strategy;
pub mod runner;
pub mod orchestrator;
pub mod metrics;
pub mod error;
