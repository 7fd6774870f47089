//! # Core Module
//!
//! The stateless foundation of the reactive-step engine.
//!
//! ## Overview
//!
//! - **Molecular Representation** ([`models`]) - Atoms, molecules and the periodic topology,
//!   including renumbering and reaction records
//! - **Geometry** ([`utils`]) - Minimum-image vectors, distances, angles and dihedrals
//! - **Reaction Templates** ([`reaction`]) - Templates, criteria and bound candidates
//! - **File I/O** ([`io`]) - Reaction files, topology snapshots, statistics and the
//!   collaborator seams to the external engine

pub mod io;
pub mod models;
pub mod reaction;
pub mod utils;
