use super::criterion::{Criterion, CriterionError};
use super::template::{ReactionTemplate, Transition, Translation};
use crate::core::models::atom::Atom;
use crate::core::models::ids::{AtomIndex, MoleculeId, ProductAtom, ReactantAtom, ReactantIndex};
use crate::core::models::molecule::Molecule;
use nalgebra::Vector3;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CandidateError {
    #[error("Reactant slot {} does not exist in reaction '{reaction}'", .slot.one_based())]
    UnknownSlot {
        reaction: String,
        slot: ReactantIndex,
    },
    #[error("Molecule {name} {molecule} has no atom at position {} required by its template", .position.one_based())]
    MissingAtom {
        name: String,
        molecule: MoleculeId,
        position: AtomIndex,
    },
    #[error("Template atom of molecule {molecule} carries no placeholder id")]
    UnnumberedAtom { molecule: MoleculeId },
    #[error("Reactant atom {0} referenced by a transition does not exist")]
    UnresolvedReactantAtom(ReactantAtom),
    #[error("Product atom {0} referenced by a transition or translation does not exist")]
    UnresolvedProductAtom(ProductAtom),
    #[error(transparent)]
    Criterion(#[from] CriterionError),
}

/// A reaction template bound to concrete molecules of a topology.
///
/// A candidate starts as a copy of its template; binding a reactant slot overwrites the
/// template atoms' ids and kinematics with those of the real molecule. Committing the
/// candidate then moves that state onto the product molecules.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionCandidate {
    reaction: ReactionTemplate,
}

impl From<ReactionTemplate> for ReactionCandidate {
    fn from(reaction: ReactionTemplate) -> Self {
        Self { reaction }
    }
}

impl ReactionCandidate {
    pub fn from_template(template: &ReactionTemplate) -> Self {
        Self {
            reaction: template.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.reaction.name
    }

    pub fn reactants(&self) -> &[Molecule] {
        &self.reaction.reactants
    }

    pub fn products(&self) -> &[Molecule] {
        &self.reaction.products
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.reaction.criteria
    }

    pub fn reaction_energy(&self) -> f64 {
        self.reaction.reaction_energy
    }

    pub fn activation_energy(&self) -> f64 {
        self.reaction.activation_energy
    }

    pub fn template(&self) -> &ReactionTemplate {
        &self.reaction
    }

    pub fn reactant_ids(&self) -> impl Iterator<Item = MoleculeId> + '_ {
        self.reaction.reactants.iter().map(Molecule::id)
    }

    /// Binds a real molecule to a reactant slot.
    ///
    /// Template atom with placeholder id `k` takes over the id, position and velocity of the
    /// real molecule's atom at position `k - 1`; the slot then takes over the molecule's id.
    /// Atoms of template and real molecule are assumed to be listed in the same order.
    pub fn update_reactant(
        &mut self,
        slot: ReactantIndex,
        molecule: &Molecule,
    ) -> Result<(), CandidateError> {
        let reactant = self.reaction.reactants.get_mut(slot.0).ok_or_else(|| {
            CandidateError::UnknownSlot {
                reaction: self.reaction.name.clone(),
                slot,
            }
        })?;

        for atom in reactant.atoms_mut() {
            let position = atom
                .id
                .position_in_molecule()
                .ok_or(CandidateError::UnnumberedAtom {
                    molecule: molecule.id(),
                })?;
            let real = molecule
                .atom(position)
                .ok_or_else(|| CandidateError::MissingAtom {
                    name: molecule.name().to_string(),
                    molecule: molecule.id(),
                    position,
                })?;
            atom.take_state_from(real);
        }
        reactant.set_id(molecule.id());

        debug!(slot = slot.one_based(), molecule = %molecule.id(), "Bound reactant molecule.");
        Ok(())
    }

    /// Evaluates every criterion in declared order, stopping at the first one that fails.
    pub fn is_valid(&mut self, dimensions: &Vector3<f64>) -> Result<bool, CandidateError> {
        let reactants = &self.reaction.reactants;
        for criterion in &mut self.reaction.criteria {
            if !criterion.check(reactants, dimensions)? {
                debug!(
                    criterion = %criterion,
                    value = criterion.latest(),
                    "Criterion not fulfilled, skipping any further criteria."
                );
                return Ok(false);
            }
            debug!(criterion = %criterion, value = criterion.latest(), "Criterion fulfilled.");
        }
        Ok(true)
    }

    /// The latest value of the first criterion, which is always a distance.
    pub fn current_distance(&self) -> f64 {
        self.reaction
            .criteria
            .first()
            .map_or(f64::NAN, Criterion::latest)
    }

    /// The reaction rate at the current distance, or `None` if the template has no rates.
    pub fn current_rate(&self) -> Option<f64> {
        self.reaction.rate.rate_at(self.current_distance())
    }

    /// Copies id, position and velocity of every mapped reactant atom onto its product atom.
    ///
    /// Product atoms without a transition keep their template state.
    pub fn apply_transitions(&mut self) -> Result<(), CandidateError> {
        let ReactionTemplate {
            reactants,
            products,
            transitions,
            ..
        } = &mut self.reaction;

        for &Transition { from, to } in transitions.iter() {
            let source = reactants
                .get(from.molecule.0)
                .and_then(|molecule| molecule.atom(from.atom))
                .ok_or(CandidateError::UnresolvedReactantAtom(from))?;
            let target = products
                .get_mut(to.molecule.0)
                .and_then(|molecule| molecule.atom_mut(to.atom))
                .ok_or(CandidateError::UnresolvedProductAtom(to))?;
            target.take_state_from(source);
        }
        Ok(())
    }

    /// Displaces product atoms along the connection to a partner atom, in declared order.
    ///
    /// No periodic correction is applied; product positions are expected to be contiguous.
    /// A translation whose two atoms coincide has no direction and is skipped with a warning.
    pub fn apply_translations(&mut self) -> Result<(), CandidateError> {
        let ReactionTemplate {
            products,
            translations,
            ..
        } = &mut self.reaction;

        for &Translation {
            atom,
            towards,
            value,
        } in translations.iter()
        {
            let partner = product_atom(products, towards)?.position;
            let moving = product_atom(products, atom)?;
            let connection = partner - moving.position;

            let Some(direction) = connection.try_normalize(0.0) else {
                warn!(
                    atom = %atom,
                    towards = %towards,
                    "Translation atoms coincide, cannot determine a direction."
                );
                continue;
            };

            let before = connection.norm();
            let name = moving.name.clone();
            let target = product_atom_mut(products, atom)?;
            target.position += direction * value;
            let after = (partner - target.position).norm();
            debug!(atom = %name, before, after, "Translated product atom.");
        }
        Ok(())
    }

    /// Wraps every product molecule into the periodic image of its first atom.
    pub fn make_products_whole(&mut self, dimensions: &Vector3<f64>) {
        for product in &mut self.reaction.products {
            product.make_whole(dimensions);
        }
    }

    pub(crate) fn products_mut(&mut self) -> &mut [Molecule] {
        &mut self.reaction.products
    }

    /// A one-line description naming the reaction and the bound molecules.
    pub fn short_info(&self) -> String {
        let list = |molecules: &[Molecule]| {
            molecules
                .iter()
                .map(|m| format!("{} {}", m.id(), m.name()))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "<Reaction {}, reactants: {}, products: {}>",
            self.reaction.name,
            list(&self.reaction.reactants),
            list(&self.reaction.products)
        )
    }
}

fn product_atom(
    products: &[Molecule],
    reference: ProductAtom,
) -> Result<&Atom, CandidateError> {
    products
        .get(reference.molecule.0)
        .and_then(|molecule| molecule.atom(reference.atom))
        .ok_or(CandidateError::UnresolvedProductAtom(reference))
}

fn product_atom_mut(
    products: &mut [Molecule],
    reference: ProductAtom,
) -> Result<&mut Atom, CandidateError> {
    products
        .get_mut(reference.molecule.0)
        .and_then(|molecule| molecule.atom_mut(reference.atom))
        .ok_or(CandidateError::UnresolvedProductAtom(reference))
}

impl fmt::Display for ReactionCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_info())
    }
}
