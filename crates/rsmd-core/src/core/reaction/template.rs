use super::criterion::{Criterion, CriterionKind};
use crate::core::models::ids::{AtomId, MoleculeId, ProductAtom, ReactantAtom};
use crate::core::models::molecule::Molecule;
use std::fmt;
use thiserror::Error;

/// The largest number of reactant molecules a template may combine.
pub const MAX_REACTANTS: usize = 3;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TemplateError {
    #[error("Reaction '{0}' lists no reactant molecule")]
    NoReactants(String),
    #[error("Reaction '{0}' lists no product molecule")]
    NoProducts(String),
    #[error("Reaction '{name}' combines {count} reactants, at most 3 are supported")]
    TooManyReactants { name: String, count: usize },
    #[error("The first criterion of reaction '{name}' must be a distance, found {found}")]
    FirstCriterionNotDistance { name: String, found: CriterionKind },
    #[error("Reaction '{0}' lists no criteria, the first criterion must be a distance")]
    NoCriteria(String),
    #[error("[{directive}]: given atom {atom} doesn't exist in reactants")]
    DanglingReactantAtom {
        directive: &'static str,
        atom: ReactantAtom,
    },
    #[error("[{directive}]: given atom {atom} doesn't exist in products")]
    DanglingProductAtom {
        directive: &'static str,
        atom: ProductAtom,
    },
    #[error("[criteria]: minimum {min} is not below maximum {max} in criterion {index}, are they interchanged?")]
    InvertedThresholds { index: usize, min: f64, max: f64 },
    #[error("{side} molecules are not numbered consecutively from 1, found {found} at position {position}")]
    NonConsecutiveMolecules {
        side: &'static str,
        position: usize,
        found: MoleculeId,
    },
    #[error("Atoms of {side} molecule {molecule} are not numbered consecutively from 1")]
    NonConsecutiveAtoms { side: &'static str, molecule: usize },
    #[error("Reaction '{0}' has no [rate] entries, which the rate-based algorithm requires")]
    EmptyRateTable(String),
}

/// Copies the live state of a reactant atom onto a product atom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub from: ReactantAtom,
    pub to: ProductAtom,
}

/// Moves product atom `atom` by `value` along the unit vector pointing to `towards`.
///
/// A positive value moves the atom closer, a negative one further away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Translation {
    pub atom: ProductAtom,
    pub towards: ProductAtom,
    pub value: f64,
}

/// Distance-dependent reaction rates, kept sorted ascending by distance threshold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    entries: Vec<(f64, f64)>,
}

impl RateTable {
    /// Builds a table from `(distance threshold, rate)` pairs.
    ///
    /// The pairs are stably sorted by threshold, so duplicated thresholds keep their input order.
    pub fn new(mut entries: Vec<(f64, f64)>) -> Self {
        entries.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { entries }
    }

    pub fn entries(&self) -> &[(f64, f64)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the rate for a distance.
    ///
    /// Returns the rate of the last entry whose threshold does not exceed `distance`, or the
    /// first entry's rate if `distance` lies below every threshold. Returns `None` for an
    /// empty table.
    pub fn rate_at(&self, distance: f64) -> Option<f64> {
        let first = self.entries.first()?.1;
        Some(
            self.entries
                .iter()
                .take_while(|(threshold, _)| *threshold <= distance)
                .last()
                .map_or(first, |(_, rate)| *rate),
        )
    }
}

/// A reaction template as loaded from a reaction file.
///
/// Reactant and product molecules carry their 1-based numbers from the file as molecule ids
/// and sequential placeholder ids (starting at 1) on their atoms. All table entries address
/// atoms through 0-based structural indices into `reactants` and `products`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReactionTemplate {
    pub name: String,
    pub reactants: Vec<Molecule>,
    pub products: Vec<Molecule>,
    pub transitions: Vec<Transition>,
    pub translations: Vec<Translation>,
    pub criteria: Vec<Criterion>,
    pub reaction_energy: f64,
    pub activation_energy: f64,
    pub rate: RateTable,
}

impl ReactionTemplate {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn reactant_atom_exists(&self, atom: ReactantAtom) -> bool {
        self.reactants
            .get(atom.molecule.0)
            .is_some_and(|molecule| molecule.atom(atom.atom).is_some())
    }

    pub fn product_atom_exists(&self, atom: ProductAtom) -> bool {
        self.products
            .get(atom.molecule.0)
            .is_some_and(|molecule| molecule.atom(atom.atom).is_some())
    }

    /// Checks the internal consistency of the template.
    ///
    /// # Errors
    ///
    /// Fails if reactants or products are missing, more than [`MAX_REACTANTS`] reactants are
    /// combined, the first criterion is not a distance, any table references an atom that
    /// does not exist, a criterion's minimum is not below its maximum, or molecules and atoms
    /// are not numbered consecutively from 1.
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.reactants.is_empty() {
            return Err(TemplateError::NoReactants(self.name.clone()));
        }
        if self.products.is_empty() {
            return Err(TemplateError::NoProducts(self.name.clone()));
        }
        if self.reactants.len() > MAX_REACTANTS {
            return Err(TemplateError::TooManyReactants {
                name: self.name.clone(),
                count: self.reactants.len(),
            });
        }

        match self.criteria.first() {
            None => return Err(TemplateError::NoCriteria(self.name.clone())),
            Some(first) if first.kind() != CriterionKind::Distance => {
                return Err(TemplateError::FirstCriterionNotDistance {
                    name: self.name.clone(),
                    found: first.kind(),
                });
            }
            Some(_) => {}
        }

        for (side, molecules) in [("reactant", &self.reactants), ("product", &self.products)] {
            for (index, molecule) in molecules.iter().enumerate() {
                if molecule.id() != MoleculeId(index + 1) {
                    return Err(TemplateError::NonConsecutiveMolecules {
                        side,
                        position: index + 1,
                        found: molecule.id(),
                    });
                }
                let consecutive = molecule
                    .atoms()
                    .iter()
                    .enumerate()
                    .all(|(position, atom)| atom.id == AtomId(position + 1));
                if !consecutive {
                    return Err(TemplateError::NonConsecutiveAtoms {
                        side,
                        molecule: index + 1,
                    });
                }
            }
        }

        for transition in &self.transitions {
            if !self.reactant_atom_exists(transition.from) {
                return Err(TemplateError::DanglingReactantAtom {
                    directive: "products",
                    atom: transition.from,
                });
            }
            if !self.product_atom_exists(transition.to) {
                return Err(TemplateError::DanglingProductAtom {
                    directive: "products",
                    atom: transition.to,
                });
            }
        }

        for translation in &self.translations {
            for atom in [translation.atom, translation.towards] {
                if !self.product_atom_exists(atom) {
                    return Err(TemplateError::DanglingProductAtom {
                        directive: "translations",
                        atom,
                    });
                }
            }
        }

        for (index, criterion) in self.criteria.iter().enumerate() {
            if let Some(&atom) = criterion
                .atoms()
                .iter()
                .find(|&&atom| !self.reactant_atom_exists(atom))
            {
                return Err(TemplateError::DanglingReactantAtom {
                    directive: "criteria",
                    atom,
                });
            }
            if criterion.min() >= criterion.max() {
                return Err(TemplateError::InvertedThresholds {
                    index: index + 1,
                    min: criterion.min(),
                    max: criterion.max(),
                });
            }
        }

        Ok(())
    }
}

impl fmt::Display for ReactionTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<Reaction '{}'", self.name)?;

        let list = |molecules: &[Molecule]| {
            molecules
                .iter()
                .map(|m| format!("{} {}", m.id(), m.name()))
                .collect::<Vec<_>>()
                .join(", ")
        };
        writeln!(f, "  reactants: {}", list(&self.reactants))?;
        writeln!(f, "  products: {}", list(&self.products))?;

        write!(f, "  transitions reactant -> product:")?;
        for transition in &self.transitions {
            write!(f, "\n    {} -> {}", transition.from, transition.to)?;
        }
        writeln!(f)?;

        write!(f, "  translations:")?;
        for translation in &self.translations {
            write!(
                f,
                "\n    {} {} {}",
                translation.atom, translation.towards, translation.value
            )?;
        }
        writeln!(f)?;

        write!(f, "  criteria:")?;
        for criterion in &self.criteria {
            write!(f, "\n    {criterion}")?;
        }
        writeln!(f)?;

        writeln!(f, "  reaction energy: {}", self.reaction_energy)?;
        writeln!(f, "  activation energy: {}", self.activation_energy)?;

        write!(f, "  rate:")?;
        for (threshold, rate) in self.rate.entries() {
            write!(f, "\n    {threshold} {rate}")?;
        }
        write!(f, ">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::ids::{AtomIndex, ProductIndex, ReactantIndex};
    use nalgebra::Point3;

    fn template_molecule(number: usize, name: &str, atom_names: &[&str]) -> Molecule {
        let atoms = atom_names
            .iter()
            .enumerate()
            .map(|(i, n)| Atom::new(AtomId(i + 1), n, Point3::origin()))
            .collect();
        Molecule::with_atoms(MoleculeId(number), name, atoms)
    }

    fn ra(molecule: usize, atom: usize) -> ReactantAtom {
        ReactantAtom::new(ReactantIndex(molecule), AtomIndex(atom))
    }

    fn pa(molecule: usize, atom: usize) -> ProductAtom {
        ProductAtom::new(ProductIndex(molecule), AtomIndex(atom))
    }

    fn dimerization() -> ReactionTemplate {
        let mut template = ReactionTemplate::new("dimerization");
        template.reactants = vec![
            template_molecule(1, "MOL", &["C1", "C2"]),
            template_molecule(2, "MOL", &["C1", "C2"]),
        ];
        template.products = vec![template_molecule(1, "NEW", &["C1", "C2", "C3", "C4"])];
        template.transitions = vec![
            Transition { from: ra(0, 0), to: pa(0, 0) },
            Transition { from: ra(0, 1), to: pa(0, 1) },
            Transition { from: ra(1, 0), to: pa(0, 2) },
            Transition { from: ra(1, 1), to: pa(0, 3) },
        ];
        template.translations = vec![Translation {
            atom: pa(0, 0),
            towards: pa(0, 2),
            value: 1.0,
        }];
        template.criteria = vec![
            Criterion::new(CriterionKind::Distance, vec![ra(0, 0), ra(1, 0)], 0.0, 4.0).unwrap(),
        ];
        template.reaction_energy = -66.0;
        template.activation_energy = 10.0;
        template.rate = RateTable::new(vec![(0.35, 0.2), (0.40, 0.06), (0.50, 0.04)]);
        template
    }

    #[test]
    fn consistent_template_validates() {
        assert_eq!(dimerization().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_missing_reactants_and_products() {
        let mut template = dimerization();
        template.products.clear();
        assert!(matches!(template.validate(), Err(TemplateError::NoProducts(_))));

        template.reactants.clear();
        assert!(matches!(template.validate(), Err(TemplateError::NoReactants(_))));
    }

    #[test]
    fn validate_rejects_more_than_three_reactants() {
        let mut template = dimerization();
        for number in 3..=4 {
            template.reactants.push(template_molecule(number, "MOL", &["C1"]));
        }
        assert!(matches!(
            template.validate(),
            Err(TemplateError::TooManyReactants { count: 4, .. })
        ));
    }

    #[test]
    fn validate_requires_a_leading_distance_criterion() {
        let mut template = dimerization();
        template.criteria.clear();
        assert!(matches!(template.validate(), Err(TemplateError::NoCriteria(_))));

        template.criteria.push(
            Criterion::new(
                CriterionKind::Angle,
                vec![ra(0, 1), ra(0, 0), ra(1, 0)],
                90.0,
                180.0,
            )
            .unwrap(),
        );
        assert!(matches!(
            template.validate(),
            Err(TemplateError::FirstCriterionNotDistance {
                found: CriterionKind::Angle,
                ..
            })
        ));
    }

    #[test]
    fn validate_detects_dangling_references() {
        let mut template = dimerization();
        template.transitions.push(Transition { from: ra(2, 0), to: pa(0, 0) });
        assert_eq!(
            template.validate(),
            Err(TemplateError::DanglingReactantAtom {
                directive: "products",
                atom: ra(2, 0)
            })
        );

        let mut template = dimerization();
        template.translations[0].towards = pa(0, 9);
        assert_eq!(
            template.validate(),
            Err(TemplateError::DanglingProductAtom {
                directive: "translations",
                atom: pa(0, 9)
            })
        );

        let mut template = dimerization();
        template
            .criteria
            .push(Criterion::new(CriterionKind::Distance, vec![ra(0, 0), ra(1, 5)], 0.0, 1.0).unwrap());
        assert_eq!(
            template.validate(),
            Err(TemplateError::DanglingReactantAtom {
                directive: "criteria",
                atom: ra(1, 5)
            })
        );
    }

    #[test]
    fn validate_detects_inverted_thresholds() {
        let mut template = dimerization();
        template.criteria[0] =
            Criterion::new(CriterionKind::Distance, vec![ra(0, 0), ra(1, 0)], 4.0, 0.0).unwrap();
        assert!(matches!(
            template.validate(),
            Err(TemplateError::InvertedThresholds { index: 1, .. })
        ));
    }

    #[test]
    fn validate_detects_non_consecutive_atom_numbers() {
        let mut template = dimerization();
        template.products[0].atoms_mut()[2].id = AtomId(7);
        assert_eq!(
            template.validate(),
            Err(TemplateError::NonConsecutiveAtoms {
                side: "product",
                molecule: 1
            })
        );
    }

    #[test]
    fn validate_detects_non_consecutive_molecule_numbers() {
        let mut template = dimerization();
        template.reactants[1].set_id(MoleculeId(3));
        assert_eq!(
            template.validate(),
            Err(TemplateError::NonConsecutiveMolecules {
                side: "reactant",
                position: 2,
                found: MoleculeId(3)
            })
        );
    }

    #[test]
    fn rate_lookup_takes_last_threshold_not_above_distance() {
        let table = RateTable::new(vec![(0.35, 0.2), (0.40, 0.06), (0.50, 0.04)]);
        assert_eq!(table.rate_at(0.30), Some(0.2));
        assert_eq!(table.rate_at(0.35), Some(0.2));
        assert_eq!(table.rate_at(0.42), Some(0.06));
        assert_eq!(table.rate_at(0.60), Some(0.04));
        assert_eq!(RateTable::default().rate_at(0.5), None);
    }

    #[test]
    fn rate_table_is_sorted_stably_on_construction() {
        let table = RateTable::new(vec![(0.5, 1.0), (0.1, 2.0), (0.5, 3.0)]);
        assert_eq!(table.entries(), &[(0.1, 2.0), (0.5, 1.0), (0.5, 3.0)]);
        assert_eq!(table.rate_at(0.7), Some(3.0));
    }

    #[test]
    fn display_lists_tables_in_file_numbering() {
        let text = dimerization().to_string();
        assert!(text.starts_with("<Reaction 'dimerization'"));
        assert!(text.contains("reactants: 1 MOL, 2 MOL"));
        assert!(text.contains("(2, 1) -> (1, 3)"));
        assert!(text.contains("dist (1, 1) (2, 1) [0, 4]"));
        assert!(text.contains("0.35 0.2"));
        assert!(text.ends_with('>'));
    }
}
