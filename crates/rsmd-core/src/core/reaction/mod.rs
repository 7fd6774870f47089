//! # Reaction Templates
//!
//! The description of a reaction as loaded from a reaction file ([`template`]), the geometric
//! conditions a set of reactant molecules must satisfy ([`criterion`]) and the per-attempt
//! binding of a template to concrete molecules ([`candidate`]).

pub mod candidate;
pub mod criterion;
pub mod template;
