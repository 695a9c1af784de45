//! Batch risk scoring for bank transactions.
//!
//! Raw rows flow through five stages: validation, feature building, risk scoring, flagging and
//! report assembly. [`pipeline::run`] executes them in one call; [`engine::Workflow`] runs them
//! step by step for a loaded batch and keeps the latest outputs as immutable snapshots.

pub mod config;
pub mod engine;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod types;
