pub mod provider;
pub mod db_init;

pub mod market_clock;
pub mod data_cache;
pub mod rate_limiter;
pub mod indicators;
pub mod condition_evaluator;
pub mod alert_runner;

pub mod alerts_repo;
pub mod signals_repo;
pub mod notifier;

pub mod signal_generator;
pub mod outcome_tracker;
