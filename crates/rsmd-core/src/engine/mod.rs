//! # Engine Module
//!
//! The stateful logic of the reactive-step engine.
//!
//! ## Overview
//!
//! A reactive step searches the committed structure for reaction candidates, transforms the
//! chosen reactants into products, hands the result to the external engine for relaxation and
//! then commits or rolls back. This module holds everything those steps share:
//!
//! - **Universe** ([`universe`]) - The old, new and relaxed topologies together with the
//!   reaction templates; candidate search, reaction and movement checks
//! - **Randomness** ([`random`]) - The explicit, seedable random context
//! - **Configuration** ([`config`], [`units`]) - Simulation parameters and the unit system
//! - **State Tracking** ([`transaction`], [`state`]) - The reactive-step state machine, restart
//!   checkpoints and run summaries
//! - **External Engine** ([`md`]) - The trait through which MD runs and relaxations are requested
//! - **Control** ([`shutdown`], [`progress`]) - Signal-driven shutdown and progress reporting
//! - **Error Handling** ([`error`]) - Engine-specific error types and error propagation

pub mod config;
pub mod error;
pub mod md;
pub mod progress;
pub mod random;
pub mod shutdown;
pub mod state;
pub mod transaction;
pub mod units;
pub mod universe;
