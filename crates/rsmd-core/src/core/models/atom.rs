use super::ids::AtomId;
use nalgebra::{Point3, Vector3};

/// Represents a single atom of a molecule with its kinematic state.
///
/// Atoms are identified by their [`AtomId`] and name for all structural operations
/// (removal, lookup, candidate binding); their position inside the parent molecule's
/// sequence is significant because reaction templates address atoms positionally.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Atom {
    /// The runtime identifier of the atom, dense within the topology after renumbering.
    pub id: AtomId,
    /// The label of the atom (e.g., "C1", "OW").
    pub name: String,
    /// The Cartesian position of the atom.
    pub position: Point3<f64>,
    /// The velocity of the atom.
    pub velocity: Vector3<f64>,
}

impl Atom {
    /// Creates a new `Atom` at rest.
    ///
    /// # Arguments
    ///
    /// * `id` - The runtime identifier of the atom.
    /// * `name` - The label of the atom.
    /// * `position` - The Cartesian position of the atom.
    pub fn new(id: AtomId, name: &str, position: Point3<f64>) -> Self {
        Self {
            id,
            name: name.to_string(),
            position,
            velocity: Vector3::zeros(),
        }
    }

    /// Returns a copy of this atom with the given velocity.
    pub fn with_velocity(mut self, velocity: Vector3<f64>) -> Self {
        self.velocity = velocity;
        self
    }

    /// Copies the live state (`id`, `position`, `velocity`) of another atom into this one.
    ///
    /// The name is left untouched, so a template atom keeps its own label while taking over
    /// the identity and kinematics of the real atom it is bound to.
    pub fn take_state_from(&mut self, other: &Atom) {
        self.id = other.id;
        self.position = other.position;
        self.velocity = other.velocity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_is_at_rest() {
        let atom = Atom::new(AtomId(3), "C1", Point3::new(1.0, 2.0, 3.0));

        assert_eq!(atom.id, AtomId(3));
        assert_eq!(atom.name, "C1");
        assert_eq!(atom.position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(atom.velocity, Vector3::zeros());
    }

    #[test]
    fn default_atom_has_unset_id_and_zero_vectors() {
        let atom = Atom::default();
        assert_eq!(atom.id, AtomId(0));
        assert_eq!(atom.position, Point3::origin());
        assert_eq!(atom.velocity, Vector3::zeros());
    }

    #[test]
    fn take_state_from_keeps_own_name() {
        let real = Atom::new(AtomId(42), "CX", Point3::new(4.0, 5.0, 6.0))
            .with_velocity(Vector3::new(0.1, 0.2, 0.3));
        let mut template = Atom::new(AtomId(1), "C1", Point3::origin());

        template.take_state_from(&real);

        assert_eq!(template.name, "C1");
        assert_eq!(template.id, AtomId(42));
        assert_eq!(template.position, real.position);
        assert_eq!(template.velocity, real.velocity);
    }
}
