//! # Core Models Module
//!
//! Data structures representing the simulated system: atoms, molecules and the periodic
//! topology that owns them.
//!
//! ## Key Components
//!
//! - [`atom`] - A single atom with id, label, position and velocity
//! - [`molecule`] - An ordered atom sequence with a runtime id and a type name
//! - [`topology`] - Molecules in an orthorhombic box, renumbering and reaction records
//! - [`ids`] - Runtime ids and the structural indices used by reaction templates
//!
//! ## Usage
//!
//! ```
//! use nalgebra::{Point3, Vector3};
//! use rsmd::core::models::atom::Atom;
//! use rsmd::core::models::ids::{AtomId, MoleculeId};
//! use rsmd::core::models::molecule::Molecule;
//! use rsmd::core::models::topology::Topology;
//!
//! let mut topology = Topology::new(Vector3::new(3.0, 3.0, 3.0));
//! let mut water = Molecule::new(MoleculeId(5), "SOL");
//! water.push_atom(Atom::new(AtomId(17), "OW", Point3::new(1.0, 1.0, 1.0)));
//! topology.push_molecule(water);
//!
//! topology.sort();
//! assert_eq!(topology.molecules()[0].id(), MoleculeId(1));
//! assert_eq!(topology.molecules()[0].atoms()[0].id, AtomId(1));
//! ```

pub mod atom;
pub mod ids;
pub mod molecule;
pub mod topology;
