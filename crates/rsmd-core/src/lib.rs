//! # rs@md Core Library
//!
//! The reactive-step engine of a hybrid Monte-Carlo / molecular-dynamics simulation, in which
//! chemical reactions are interleaved with ordinary MD propagation performed by an external engine.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture to keep concerns separated:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Atom`, `Molecule`, `Topology`),
//!   the periodic-boundary geometry kernel, the reaction-template model with its text parser,
//!   and the I/O seams through which the external engine's files are read and written.
//!
//! - **[`engine`]: The Logic Core.** The stateful `Universe` that owns the topology snapshots
//!   and performs candidate search, reactant→product transformation and movement checks,
//!   together with the explicit random context, configuration, errors and the reactive-step
//!   state machine.
//!
//! - **[`workflows`]: The Public API.** The two acceptance policies (Metropolis and rate based)
//!   and the cycle loop that alternates reactive steps with MD propagation.

pub mod core;
pub mod engine;
pub mod workflows;
