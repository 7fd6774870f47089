use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;

/// Minimum-image displacement from `a` to `b` in an orthorhombic periodic box.
///
/// Per axis: `d_i = Δ_i - box_i · round(Δ_i / box_i)`. The box edges must be non-zero.
pub fn distance_vector(a: &Point3<f64>, b: &Point3<f64>, dimensions: &Vector3<f64>) -> Vector3<f64> {
    let delta = b - a;
    delta.zip_map(dimensions, |d, edge| d - edge * (d / edge).round())
}

pub fn distance(a: &Point3<f64>, b: &Point3<f64>, dimensions: &Vector3<f64>) -> f64 {
    distance_vector(a, b, dimensions).norm()
}

/// Unit normal of the plane spanned by `a` and `b`, or the zero vector when they are parallel.
pub fn normal_vector(a: &Vector3<f64>, b: &Vector3<f64>) -> Vector3<f64> {
    a.cross(b).try_normalize(0.0).unwrap_or_else(Vector3::zeros)
}

/// Angle between two vectors in degrees.
///
/// Produces NaN when either vector has zero length.
pub fn vector_angle(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let cosine = (a.dot(b) / (a.norm() * b.norm())).clamp(-1.0, 1.0);
    cosine.acos().to_degrees()
}

/// Angle in degrees between the minimum-image bond vectors `p1→p2` and `p2→p3`.
pub fn angle(
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    p3: &Point3<f64>,
    dimensions: &Vector3<f64>,
) -> f64 {
    let b1 = distance_vector(p1, p2, dimensions);
    let b2 = distance_vector(p2, p3, dimensions);
    vector_angle(&b1, &b2)
}

/// Dihedral angle in degrees over the bonds `p1→p2`, `p2→p3`, `p3→p4`, in (-180, 180].
pub fn dihedral(
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    p3: &Point3<f64>,
    p4: &Point3<f64>,
    dimensions: &Vector3<f64>,
) -> f64 {
    let b1 = distance_vector(p1, p2, dimensions);
    let b2 = distance_vector(p2, p3, dimensions);
    let b3 = distance_vector(p3, p4, dimensions);

    let n1 = normal_vector(&b1, &b2);
    let n2 = normal_vector(&b2, &b3);

    let x = n1.cross(&n2).dot(&b2) / b2.norm();
    let y = n1.dot(&n2);
    x.atan2(y).to_degrees()
}

/// Moves `position` into the same periodic image as `reference`.
///
/// Per axis: `x_i -= box_i · trunc(Δ_i / (0.5 · box_i))`, where `Δ` is the raw displacement
/// from the reference. This keeps the atom within the half-box window around the reference;
/// it is not a minimum-image correction.
pub fn wrap_into_reference_image(
    reference: &Point3<f64>,
    position: &Point3<f64>,
    dimensions: &Vector3<f64>,
) -> Point3<f64> {
    let delta = position - reference;
    let shift = delta.zip_map(dimensions, |d, edge| edge * (d / (0.5 * edge)).trunc());
    position - shift
}

/// Radius of the sphere occupied on average by one of `atom_count` atoms in `volume`.
///
/// `L = cbrt(3V / (4πN))`.
pub fn characteristic_spacing(volume: f64, atom_count: usize) -> f64 {
    (3.0 * volume / (4.0 * PI * atom_count as f64)).cbrt()
}
