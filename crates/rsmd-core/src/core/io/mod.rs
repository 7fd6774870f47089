//! Reading and writing the files the reactive-step engine consumes and produces.
//!
//! Reaction templates are read from their line-oriented text format, topologies can be
//! stored as TOML snapshots, and per-cycle statistics are written as a tab-separated table.
//! The traits in [`traits`] describe the collaborators that handle the external MD engine's
//! native formats.

pub mod reaction;
pub mod snapshot;
pub mod statistics;
pub mod traits;
