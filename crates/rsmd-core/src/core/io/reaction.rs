use crate::core::models::atom::Atom;
use crate::core::models::ids::{
    AtomId, AtomIndex, MoleculeId, ProductAtom, ProductIndex, ReactantAtom, ReactantIndex,
};
use crate::core::models::molecule::Molecule;
use crate::core::reaction::criterion::{Criterion, CriterionError, CriterionKind};
use crate::core::reaction::template::{
    RateTable, ReactionTemplate, TemplateError, Transition, Translation,
};
use nalgebra::Point3;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::SplitWhitespace;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReactionFileError {
    #[error("Failed to read reaction file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: ReactionParseErrorKind,
    },
    #[error("Inconsistent reaction input: {0}")]
    Validation(#[from] TemplateError),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReactionParseErrorKind {
    #[error("Missing closing ']' in directive header")]
    UnterminatedDirective,
    #[error("Unknown directive '[{0}]'")]
    UnknownDirective(String),
    #[error("Content found before the first directive")]
    OutsideDirective,
    #[error("Missing field '{field}'")]
    MissingField { field: &'static str },
    #[error("Invalid integer for '{field}' (value: '{value}')")]
    InvalidInt { field: &'static str, value: String },
    #[error("Invalid number for '{field}' (value: '{value}')")]
    InvalidFloat { field: &'static str, value: String },
    #[error("'{field}' is numbered from 1, found 0")]
    ZeroNumber { field: &'static str },
    #[error("Origin must name both molecule and atom or be '0 0', found '{molecule} {atom}'")]
    PartialOrigin { molecule: usize, atom: usize },
    #[error("Unknown criterion type '{0}', expected one of: dist, ang, dih")]
    UnknownCriterion(String),
    #[error(transparent)]
    InvalidCriterion(CriterionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Name,
    Reactants,
    Products,
    Criteria,
    Translations,
    Energy,
    Activation,
    Rate,
}

impl Directive {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "name" => Some(Self::Name),
            "reactants" => Some(Self::Reactants),
            "products" => Some(Self::Products),
            "criteria" | "criterions" => Some(Self::Criteria),
            "translations" => Some(Self::Translations),
            "energy" => Some(Self::Energy),
            "activation" => Some(Self::Activation),
            "rate" => Some(Self::Rate),
            _ => None,
        }
    }
}

/// Whitespace-separated fields of one content line.
struct Fields<'a> {
    tokens: SplitWhitespace<'a>,
    line: usize,
}

impl<'a> Fields<'a> {
    fn new(content: &'a str, line: usize) -> Self {
        Self {
            tokens: content.split_whitespace(),
            line,
        }
    }

    fn error(&self, kind: ReactionParseErrorKind) -> ReactionFileError {
        ReactionFileError::Parse {
            line: self.line,
            kind,
        }
    }

    fn text(&mut self, field: &'static str) -> Result<&'a str, ReactionFileError> {
        match self.tokens.next() {
            Some(token) => Ok(token),
            None => Err(self.error(ReactionParseErrorKind::MissingField { field })),
        }
    }

    fn integer(&mut self, field: &'static str) -> Result<usize, ReactionFileError> {
        let value = self.text(field)?;
        value.parse().map_err(|_| {
            self.error(ReactionParseErrorKind::InvalidInt {
                field,
                value: value.to_string(),
            })
        })
    }

    /// A 1-based number that must not be zero.
    fn number(&mut self, field: &'static str) -> Result<usize, ReactionFileError> {
        match self.integer(field)? {
            0 => Err(self.error(ReactionParseErrorKind::ZeroNumber { field })),
            number => Ok(number),
        }
    }

    fn real(&mut self, field: &'static str) -> Result<f64, ReactionFileError> {
        let value = self.text(field)?;
        value.parse().map_err(|_| {
            self.error(ReactionParseErrorKind::InvalidFloat {
                field,
                value: value.to_string(),
            })
        })
    }

    fn reactant_atom(&mut self) -> Result<ReactantAtom, ReactionFileError> {
        let molecule = self.number("molNr")?;
        let atom = self.number("atomNr")?;
        Ok(ReactantAtom::new(
            ReactantIndex(molecule - 1),
            AtomIndex(atom - 1),
        ))
    }

    fn product_atom(&mut self) -> Result<ProductAtom, ReactionFileError> {
        let molecule = self.number("molNr")?;
        let atom = self.number("atomNr")?;
        Ok(ProductAtom::new(ProductIndex(molecule - 1), AtomIndex(atom - 1)))
    }
}

/// Finds the template molecule with the given number, appending it if it is new.
fn molecule_entry<'m>(molecules: &'m mut Vec<Molecule>, number: usize, name: &str) -> &'m mut Molecule {
    let id = MoleculeId(number);
    match molecules.iter().position(|m| m.id() == id) {
        Some(index) => &mut molecules[index],
        None => {
            molecules.push(Molecule::new(id, name));
            let last = molecules.len() - 1;
            &mut molecules[last]
        }
    }
}

/// Reader for the directive-based reaction file format.
///
/// A reaction file is split into directives (`[name]`, `[reactants]`, `[products]`,
/// `[criteria]`, `[translations]`, `[energy]`, `[activation]`, `[rate]`). Columns are
/// separated by whitespace, `#` starts a comment and blank lines are ignored. Molecule and
/// atom numbers are 1-based in the file and converted to 0-based structural indices.
pub struct ReactionParser;

impl ReactionParser {
    /// Reads and validates a reaction template from a file.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the reaction file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a line cannot be parsed, or the resulting
    /// template is inconsistent.
    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<ReactionTemplate, ReactionFileError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ReactionFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Reads and validates a reaction template from a buffered reader.
    pub fn read_from(reader: &mut impl BufRead) -> Result<ReactionTemplate, ReactionFileError> {
        let mut template = ReactionTemplate::default();
        let mut rates = Vec::new();
        let mut directive: Option<Directive> = None;

        for (line_num, line_res) in reader.lines().enumerate() {
            let raw = line_res?;
            let line_num = line_num + 1;

            let content = match raw.find('#') {
                Some(position) => &raw[..position],
                None => raw.as_str(),
            };
            let content = content.trim();
            if content.is_empty() {
                continue;
            }

            if let Some(header) = content.strip_prefix('[') {
                let Some(end) = header.find(']') else {
                    return Err(ReactionFileError::Parse {
                        line: line_num,
                        kind: ReactionParseErrorKind::UnterminatedDirective,
                    });
                };
                let name = header[..end].trim();
                directive = Some(Directive::parse(name).ok_or_else(|| ReactionFileError::Parse {
                    line: line_num,
                    kind: ReactionParseErrorKind::UnknownDirective(name.to_string()),
                })?);
                continue;
            }

            let Some(current) = directive else {
                return Err(ReactionFileError::Parse {
                    line: line_num,
                    kind: ReactionParseErrorKind::OutsideDirective,
                });
            };

            let mut fields = Fields::new(content, line_num);
            match current {
                Directive::Name => template.name = content.to_string(),
                Directive::Reactants => {
                    let molecule = fields.number("molNr")?;
                    let molecule_name = fields.text("molName")?;
                    let atom_name = fields.text("atomName")?;
                    let atom = fields.number("atomNr")?;
                    molecule_entry(&mut template.reactants, molecule, molecule_name)
                        .push_atom(Atom::new(AtomId(atom), atom_name, Point3::origin()));
                }
                Directive::Products => {
                    let molecule = fields.number("molNr")?;
                    let molecule_name = fields.text("molName")?;
                    let atom_name = fields.text("atomName")?;
                    let atom = fields.number("atomNr")?;
                    let origin_molecule = fields.integer("origin molNr")?;
                    let origin_atom = fields.integer("origin atomNr")?;

                    molecule_entry(&mut template.products, molecule, molecule_name)
                        .push_atom(Atom::new(AtomId(atom), atom_name, Point3::origin()));

                    match (origin_molecule, origin_atom) {
                        (0, 0) => {}
                        (0, _) | (_, 0) => {
                            return Err(fields.error(ReactionParseErrorKind::PartialOrigin {
                                molecule: origin_molecule,
                                atom: origin_atom,
                            }));
                        }
                        (m, a) => template.transitions.push(Transition {
                            from: ReactantAtom::new(ReactantIndex(m - 1), AtomIndex(a - 1)),
                            to: ProductAtom::new(ProductIndex(molecule - 1), AtomIndex(atom - 1)),
                        }),
                    }
                }
                Directive::Criteria => {
                    let keyword = fields.text("type")?;
                    let kind: CriterionKind = keyword.parse().map_err(|_| {
                        fields.error(ReactionParseErrorKind::UnknownCriterion(keyword.to_string()))
                    })?;
                    let atoms = (0..kind.arity())
                        .map(|_| fields.reactant_atom())
                        .collect::<Result<Vec<_>, _>>()?;
                    let min = fields.real("minValue")?;
                    let max = fields.real("maxValue")?;
                    let criterion = Criterion::new(kind, atoms, min, max)
                        .map_err(|e| fields.error(ReactionParseErrorKind::InvalidCriterion(e)))?;
                    template.criteria.push(criterion);
                }
                Directive::Translations => {
                    let atom = fields.product_atom()?;
                    let towards = fields.product_atom()?;
                    let value = fields.real("value")?;
                    template.translations.push(Translation {
                        atom,
                        towards,
                        value,
                    });
                }
                Directive::Energy => template.reaction_energy = fields.real("value")?,
                Directive::Activation => template.activation_energy = fields.real("value")?,
                Directive::Rate => {
                    let distance = fields.real("distance")?;
                    let rate = fields.real("rate")?;
                    rates.push((distance, rate));
                }
            }
        }

        template.rate = RateTable::new(rates);
        template.validate()?;
        Ok(template)
    }

    /// Returns a documented example reaction file.
    pub fn example() -> String {
        EXAMPLE.to_string()
    }
}

const EXAMPLE: &str = "\
[name]
example reaction

[reactants]
# at least one reactant molecule is required
# molNr     molName     atomName    atomNr
  1         MOL         CM          1
  1         MOL         HM          2
  1         MOL         HM          3
  1         MOL         HM          4

  2         MOL         CM          1
  2         MOL         HM          2
  2         MOL         HM          3
  2         MOL         HM          4

[products]
# at least one product molecule is required
# the origin names the reactant atom this product atom is created from,
# '0 0' marks an atom without origin which must be placed by a translation
# molNr     molName     atomName    atomNr    origin molNr    origin atomNr
  1         NEW         CE          1         1               1
  1         NEW         HE          2         1               2
  1         NEW         HE          3         1               3
  1         NEW         HE          4         1               4
  1         NEW         CE          5         2               1
  1         NEW         HE          6         2               2
  1         NEW         HE          7         2               3
  1         NEW         HE          8         2               4

[criteria]
# the first criterion must be a distance, one criterion per line
# atoms refer to the reactant molecules
# dist   molNr  atomNr  molNr  atomNr  min  max
  dist   1      1       2      1       0.0  4.0
# ang    molNr  atomNr  molNr  atomNr  molNr  atomNr  min  max
  ang    1      2       1      1       2      1       110  150
# dih    molNr  atomNr  molNr  atomNr  molNr  atomNr  molNr  atomNr  min  max
  dih    1      2       1      1       2      1       2      2       -20  20

[translations]
# optional, applied in the given order after the transitions
# a positive value moves the first atom towards the second one, a negative value away from it
# atoms refer to the product molecules
# molNr  atomNr  molNr  atomNr  value
  1      1       1      5       1.0

[energy]
# reaction energy correction, used by the Metropolis acceptance
  -66.0

[activation]
# activation energy, weights the candidate choice of the Metropolis acceptance
  10.0

[rate]
# distance-dependent rates, used by the rate-based acceptance
# the distance is the value of the first criterion
# distance   rate
  0.35       0.2
  0.40       0.06
  0.50       0.04

# notes:
# - '#' starts a comment, blank lines are ignored
# - columns are separated by whitespace
# - all values use the units of the md engine
# - atoms of [reactants] and [products] must be numbered consecutively from 1,
#   in the same order as in the topology files of the md engine
";
