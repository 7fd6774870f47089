use crate::core::models::ids::ReactantAtom;
use crate::core::models::molecule::Molecule;
use crate::core::utils::geometry;
use nalgebra::{Point3, Vector3};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The geometric quantity a criterion measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CriterionKind {
    /// Minimum-image distance between two atoms.
    Distance,
    /// Angle in degrees spanned by three atoms.
    Angle,
    /// Dihedral angle in degrees over four atoms.
    Dihedral,
}

impl CriterionKind {
    /// The number of atoms a criterion of this kind involves.
    pub fn arity(self) -> usize {
        match self {
            Self::Distance => 2,
            Self::Angle => 3,
            Self::Dihedral => 4,
        }
    }

    /// The keyword used for this kind in reaction files.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Distance => "dist",
            Self::Angle => "ang",
            Self::Dihedral => "dih",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown criterion type '{0}', expected one of: dist, ang, dih")]
pub struct ParseCriterionKindError(String);

impl FromStr for CriterionKind {
    type Err = ParseCriterionKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dist" | "distance" => Ok(Self::Distance),
            "ang" | "angle" => Ok(Self::Angle),
            "dih" | "dihedral" => Ok(Self::Dihedral),
            _ => Err(ParseCriterionKindError(s.to_string())),
        }
    }
}

impl fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Distance => "distance",
            Self::Angle => "angle",
            Self::Dihedral => "dihedral",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CriterionError {
    #[error("A {kind} criterion needs {} atoms, got {found}", .kind.arity())]
    Arity { kind: CriterionKind, found: usize },
    #[error("Criterion references atom {0} which does not exist in the reactants")]
    UnresolvedAtom(ReactantAtom),
}

/// A geometric condition on a tuple of reactant atoms with an inclusive `[min, max]` window.
///
/// The value computed by the most recent [`Criterion::check`] is kept in `latest`; for the
/// first (distance) criterion of a candidate it drives the rate lookup of the rate-based
/// acceptance policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    kind: CriterionKind,
    atoms: Vec<ReactantAtom>,
    min: f64,
    max: f64,
    latest: f64,
}

impl Criterion {
    /// Creates a criterion, checking that the atom count fits the kind.
    pub fn new(
        kind: CriterionKind,
        atoms: Vec<ReactantAtom>,
        min: f64,
        max: f64,
    ) -> Result<Self, CriterionError> {
        if atoms.len() != kind.arity() {
            return Err(CriterionError::Arity {
                kind,
                found: atoms.len(),
            });
        }
        Ok(Self {
            kind,
            atoms,
            min,
            max,
            latest: 0.0,
        })
    }

    pub fn kind(&self) -> CriterionKind {
        self.kind
    }

    pub fn atoms(&self) -> &[ReactantAtom] {
        &self.atoms
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn latest(&self) -> f64 {
        self.latest
    }

    /// Computes the criterion's value on a set of bound reactant molecules.
    pub fn evaluate(
        &self,
        reactants: &[Molecule],
        dimensions: &Vector3<f64>,
    ) -> Result<f64, CriterionError> {
        let p = self
            .atoms
            .iter()
            .map(|reference| resolve(reactants, *reference))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(match self.kind {
            CriterionKind::Distance => geometry::distance(p[0], p[1], dimensions),
            CriterionKind::Angle => geometry::angle(p[0], p[1], p[2], dimensions),
            CriterionKind::Dihedral => geometry::dihedral(p[0], p[1], p[2], p[3], dimensions),
        })
    }

    /// Evaluates the criterion, stores the value as the latest one and reports whether it lies
    /// within `[min, max]`.
    pub fn check(
        &mut self,
        reactants: &[Molecule],
        dimensions: &Vector3<f64>,
    ) -> Result<bool, CriterionError> {
        self.latest = self.evaluate(reactants, dimensions)?;
        Ok(self.contains(self.latest))
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

fn resolve(reactants: &[Molecule], reference: ReactantAtom) -> Result<&Point3<f64>, CriterionError> {
    reactants
        .get(reference.molecule.0)
        .and_then(|molecule| molecule.atom(reference.atom))
        .map(|atom| &atom.position)
        .ok_or(CriterionError::UnresolvedAtom(reference))
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.keyword())?;
        for atom in &self.atoms {
            write!(f, " {atom}")?;
        }
        write!(f, " [{}, {}]", self.min, self.max)
    }
}
