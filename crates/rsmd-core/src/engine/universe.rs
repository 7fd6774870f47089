use super::config::Acceptance;
use super::error::EngineError;
use super::random::RandomContext;
use super::units::UnitSystem;
use crate::core::io::reaction::ReactionParser;
use crate::core::io::traits::TopologyIo;
use crate::core::models::ids::{MoleculeId, ReactantIndex};
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::Topology;
use crate::core::reaction::candidate::ReactionCandidate;
use crate::core::reaction::template::{MAX_REACTANTS, ReactionTemplate, TemplateError};
use crate::core::utils::geometry::{characteristic_spacing, distance};
use nalgebra::Vector3;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// How far the atoms of the checked products moved during a relaxation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovementReport {
    /// The characteristic spacing `L` the displacements are compared against.
    pub typical_distance: f64,
    pub checked_atoms: usize,
    /// Atoms that moved more than `2 L` but at most `3 L`.
    pub above_twice: usize,
    /// Atoms that moved more than `3 L`.
    pub above_thrice: usize,
    pub max_displacement: f64,
}

impl MovementReport {
    pub fn is_suspicious(&self) -> bool {
        self.above_twice + self.above_thrice > 0
    }

    fn merge(&mut self, other: MovementReport) {
        self.typical_distance = other.typical_distance;
        self.checked_atoms += other.checked_atoms;
        self.above_twice += other.above_twice;
        self.above_thrice += other.above_thrice;
        self.max_displacement = self.max_displacement.max(other.max_displacement);
    }
}

/// The three topology snapshots of a reactive step together with the reaction templates.
///
/// - `old` is the committed structure the candidate search runs on,
/// - `new` receives the committed reactions and is handed to the relaxation,
/// - `relaxed` is the structure read back after the relaxation.
#[derive(Debug, Clone)]
pub struct Universe {
    old: Topology,
    new: Topology,
    relaxed: Topology,
    templates: Vec<ReactionTemplate>,
    units: UnitSystem,
}

impl Universe {
    /// Creates a universe with empty topologies.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Template`] if a template has no reactants and
    /// [`EngineError::TooManyReactants`] if it combines more reactants than the candidate
    /// search can enumerate.
    pub fn new(templates: Vec<ReactionTemplate>, units: UnitSystem) -> Result<Self, EngineError> {
        if let Some(template) = templates.iter().find(|template| template.reactants.is_empty()) {
            return Err(TemplateError::NoReactants(template.name.clone()).into());
        }
        if let Some(template) = templates
            .iter()
            .find(|template| template.reactants.len() > MAX_REACTANTS)
        {
            return Err(EngineError::TooManyReactants {
                name: template.name.clone(),
                count: template.reactants.len(),
            });
        }
        Ok(Self {
            old: Topology::default(),
            new: Topology::default(),
            relaxed: Topology::default(),
            templates,
            units,
        })
    }

    /// Reads, validates and checks reaction templates for the chosen acceptance criterion.
    ///
    /// # Arguments
    ///
    /// * `paths` - The reaction files, one template each.
    /// * `acceptance` - The acceptance criterion the templates will be used with.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::TemplateFile`] if a file cannot be read or is inconsistent, and
    /// [`EngineError::Template`] if a template lacks the rate table the rate criterion needs.
    pub fn load_templates(
        paths: &[PathBuf],
        acceptance: &Acceptance,
    ) -> Result<Vec<ReactionTemplate>, EngineError> {
        info!("Reading reaction templates.");
        let mut templates = Vec::with_capacity(paths.len());
        for path in paths {
            let template =
                ReactionParser::read_from_path(path).map_err(|source| EngineError::TemplateFile {
                    path: path.clone(),
                    source,
                })?;
            info!(file = %path.display(), "Read reaction template:\n{template}");

            match acceptance {
                Acceptance::Metropolis { .. } if template.reaction_energy == 0.0 => {
                    warn!(
                        reaction = %template.name,
                        "Reaction energy is 0, are you sure that is correct?"
                    );
                }
                Acceptance::Rate { .. } if template.rate.is_empty() => {
                    return Err(TemplateError::EmptyRateTable(template.name.clone()).into());
                }
                _ => {}
            }
            templates.push(template);
        }
        Ok(templates)
    }

    pub fn templates(&self) -> &[ReactionTemplate] {
        &self.templates
    }

    pub fn units(&self) -> &UnitSystem {
        &self.units
    }

    pub fn old(&self) -> &Topology {
        &self.old
    }

    pub fn new_topology(&self) -> &Topology {
        &self.new
    }

    pub fn relaxed(&self) -> &Topology {
        &self.relaxed
    }

    /// Installs `topology` as the committed structure and resets the other snapshots.
    pub fn load(&mut self, mut topology: Topology) {
        topology.clear_reaction_records();
        self.relaxed.clear();
        self.new = topology.clone();
        self.old = topology;
    }

    /// Reads the committed structure of `baseline` as the starting point of a reactive step.
    #[instrument(level = "debug", skip_all, fields(baseline = baseline))]
    pub fn update(&mut self, io: &mut dyn TopologyIo, baseline: usize) -> Result<(), EngineError> {
        let mut topology = Topology::default();
        io.read(&mut topology, baseline)?;
        self.load(topology);
        debug!(topology = %self.old, "Updated universe.");
        Ok(())
    }

    /// Sorts the reacted structure and writes it as the relaxation input of `cycle`.
    pub fn write(&mut self, io: &mut dyn TopologyIo, cycle: usize) -> Result<(), EngineError> {
        self.new.sort();
        io.write(&self.new, cycle)?;
        Ok(())
    }

    pub fn read_relaxed(&mut self, io: &mut dyn TopologyIo, cycle: usize) -> Result<(), EngineError> {
        self.relaxed.clear();
        io.read_relaxed(&mut self.relaxed, cycle)?;
        Ok(())
    }

    /// Finds every binding of template reactants to molecules of the committed structure that
    /// fulfils all criteria, and returns them in random order.
    ///
    /// Reactant slots with equal molecule names are only filled in ascending id order for the
    /// slot pairs (1, 2) and (2, 3), so no unordered combination is reported twice there. No
    /// molecule is bound to two slots of the same candidate.
    ///
    /// # Errors
    ///
    /// Returns an error if the box is degenerate, a template combines more than three
    /// reactants, or a molecule is too short for its template.
    #[instrument(level = "info", skip_all)]
    pub fn search_candidates(
        &self,
        random: &mut RandomContext,
    ) -> Result<Vec<ReactionCandidate>, EngineError> {
        let dimensions = self.old.checked_dimensions()?;
        let mut candidates = Vec::new();
        for template in &self.templates {
            let found = self.search_template(template, &dimensions)?;
            info!(reaction = %template.name, count = found.len(), "Found reaction candidates.");
            candidates.extend(found);
        }
        random.shuffle(&mut candidates);
        Ok(candidates)
    }

    fn search_template(
        &self,
        template: &ReactionTemplate,
        dimensions: &Vector3<f64>,
    ) -> Result<Vec<ReactionCandidate>, EngineError> {
        let names: Vec<&str> = template.reactants.iter().map(Molecule::name).collect();
        let mut found = Vec::new();

        match names.as_slice() {
            [] => return Err(TemplateError::NoReactants(template.name.clone()).into()),
            [first] => {
                for m1 in self.old.molecules_named(first) {
                    found.extend(bind_candidate(template, &[m1], dimensions)?);
                }
            }
            [first, second] => {
                for m1 in self.old.molecules_named(first) {
                    for m2 in self.old.molecules_named(second) {
                        if !in_canonical_order(m1, m2) {
                            continue;
                        }
                        found.extend(bind_candidate(template, &[m1, m2], dimensions)?);
                    }
                }
            }
            [first, second, third] => {
                for m1 in self.old.molecules_named(first) {
                    for m2 in self.old.molecules_named(second) {
                        if !in_canonical_order(m1, m2) {
                            continue;
                        }
                        for m3 in self.old.molecules_named(third) {
                            if same_molecule(m1, m3) || !in_canonical_order(m2, m3) {
                                continue;
                            }
                            found.extend(bind_candidate(template, &[m1, m2, m3], dimensions)?);
                        }
                    }
                }
            }
            _ => {
                return Err(EngineError::TooManyReactants {
                    name: template.name.clone(),
                    count: names.len(),
                });
            }
        }
        Ok(found)
    }

    /// Checks whether every reactant of the candidate is still present in the reacted
    /// structure, i.e. was not consumed by an earlier reaction of the same step.
    pub fn is_available(&self, candidate: &ReactionCandidate) -> bool {
        match candidate
            .reactants()
            .iter()
            .find(|reactant| !self.new.contains(reactant))
        {
            Some(missing) => {
                debug!(
                    molecule = missing.name(),
                    id = %missing.id(),
                    "Reactant molecule no longer available."
                );
                false
            }
            None => true,
        }
    }

    /// Transforms the candidate's reactants into its products inside the reacted structure.
    ///
    /// Transitions and translations are applied to the products, which are then wrapped into
    /// the periodic image of their first atom. The reactants are removed and the products are
    /// inserted with fresh ids following the highest id present, each registered in the
    /// reaction record.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Lookup`] if a reactant is missing from the reacted structure;
    /// the structure is left untouched in that case.
    #[instrument(level = "debug", skip_all, fields(reaction = candidate.name()))]
    pub fn react(&mut self, candidate: &mut ReactionCandidate) -> Result<(), EngineError> {
        debug!(candidate = %candidate.short_info(), "Performing reaction.");
        let dimensions = self.new.checked_dimensions()?;

        let reactant_ids: Vec<MoleculeId> = candidate.reactant_ids().collect();
        for &id in &reactant_ids {
            self.new.molecule(id)?;
        }

        candidate.apply_transitions()?;
        candidate.apply_translations()?;
        candidate.make_products_whole(&dimensions);

        let mut highest = self.new.max_molecule_id();
        for id in reactant_ids {
            self.new.remove_molecule(id);
        }
        for product in candidate.products_mut() {
            highest = MoleculeId(highest.0 + 1);
            product.set_id(highest);
            self.new.push_molecule(product.clone());
            self.new.add_reaction_record(highest);
            debug!(molecule = product.name(), id = %highest, "Inserted product molecule.");
        }
        Ok(())
    }

    /// Compares the candidate's products before and after the relaxation.
    ///
    /// Each product is found in the relaxed structure through the reaction record, and its
    /// atoms are compared in sequence. Displacements above twice or three times the
    /// characteristic spacing of the reacted structure are reported as warnings; they never
    /// block the simulation.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Lookup`] if a product has no reaction record or its relaxed
    /// counterpart is missing.
    pub fn check_movement(&self, candidate: &ReactionCandidate) -> Result<MovementReport, EngineError> {
        let dimensions = self.new.checked_dimensions()?;
        let typical = characteristic_spacing(self.new.volume(), self.new.atom_count());
        let length = self.units.length;

        let mut report = MovementReport {
            typical_distance: typical,
            ..MovementReport::default()
        };

        for product in candidate.products() {
            let relaxed_id = self.new.reaction_record(product.id())?;
            let relaxed = self.relaxed.molecule(relaxed_id)?;
            if relaxed.len() != product.len() {
                warn!(
                    molecule = relaxed.name(),
                    id = %relaxed_id,
                    before = product.len(),
                    after = relaxed.len(),
                    "Relaxed molecule differs in atom count, comparing common atoms only."
                );
            }

            for (before, after) in product.atoms().iter().zip(relaxed.atoms()) {
                let moved = distance(&before.position, &after.position, &dimensions);
                report.checked_atoms += 1;
                report.max_displacement = report.max_displacement.max(moved);

                if moved > 3.0 * typical {
                    report.above_thrice += 1;
                    warn!(
                        atom = %after.name,
                        atom_id = %after.id,
                        molecule = relaxed.name(),
                        molecule_id = %relaxed_id,
                        "Atom moved more than three times the typical distance: {moved:.3} {length} (> 3 * {typical:.3} {length})"
                    );
                } else if moved > 2.0 * typical {
                    report.above_twice += 1;
                    warn!(
                        atom = %after.name,
                        atom_id = %after.id,
                        molecule = relaxed.name(),
                        molecule_id = %relaxed_id,
                        "Atom moved more than twice the typical distance: {moved:.3} {length} (> 2 * {typical:.3} {length})"
                    );
                } else {
                    debug!(
                        atom = %after.name,
                        atom_id = %after.id,
                        molecule = relaxed.name(),
                        molecule_id = %relaxed_id,
                        "Atom moved {moved:.3} {length}."
                    );
                }
            }
        }
        Ok(report)
    }

    /// Runs [`Universe::check_movement`] for several candidates and merges the reports.
    pub fn check_movements<'c>(
        &self,
        candidates: impl IntoIterator<Item = &'c ReactionCandidate>,
    ) -> Result<MovementReport, EngineError> {
        let mut total = MovementReport::default();
        for candidate in candidates {
            total.merge(self.check_movement(candidate)?);
        }
        Ok(total)
    }
}

fn same_molecule(a: &Molecule, b: &Molecule) -> bool {
    a.id() == b.id() && a.name() == b.name()
}

/// Accepts a pair for two consecutive reactant slots.
fn in_canonical_order(first: &Molecule, second: &Molecule) -> bool {
    if same_molecule(first, second) {
        return false;
    }
    first.name() != second.name() || first.id() <= second.id()
}

fn bind_candidate(
    template: &ReactionTemplate,
    molecules: &[&Molecule],
    dimensions: &Vector3<f64>,
) -> Result<Option<ReactionCandidate>, EngineError> {
    let mut candidate = ReactionCandidate::from_template(template);
    for (slot, molecule) in molecules.iter().enumerate() {
        candidate.update_reactant(ReactantIndex(slot), molecule)?;
    }
    debug!(candidate = %candidate.short_info(), "Checking reaction candidate.");
    Ok(candidate.is_valid(dimensions)?.then_some(candidate))
}
