//! Infogen: notebook-generated infographics with crash-resilient state
//!
//! Drives a notebook service's batch RPC protocol to turn a source URL into a
//! generated infographic, for one URL at a time or an ordered queue, with every
//! transition persisted so an interrupted run is recovered on the next start.

pub mod classify;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod notify;
pub mod orchestrator;
pub mod protocol;
pub mod state;
