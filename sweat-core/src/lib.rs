//! Core library for the sweat workout tracker.
//!
//! Templates (exercises, sessions, programs) live in SQLite behind the
//! `db` module. A live attempt at a session is driven by [`runner::Runner`],
//! which multiplexes the four timing modes over a one-second tick loop and
//! persists workout history as it goes. [`summary`] rebuilds per-exercise
//! totals from the durable rows alone.

pub mod db;
pub mod error;
pub mod notify;
pub mod plan;
pub mod runner;
pub mod summary;

pub use error::{Error, Result};
