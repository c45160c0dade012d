use nalgebra::{Point3, Rotation3, Unit, Vector3};

const TETRAHEDRAL_ANGLE_DEGREES: f64 = 109.47;
const PLANARITY_TOLERANCE: f64 = 1e-3;

pub fn rotation_to_align(from: &Vector3<f64>, to: &Vector3<f64>) -> Option<Rotation3<f64>> {
    Rotation3::rotation_between(from, to)
}

pub fn rotation_from_axis_angle(axis: &Vector3<f64>, angle_degrees: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Unit::new_normalize(*axis), angle_degrees.to_radians())
}

/// Rotates `point` by `angle_degrees` about the axis through `origin` along `axis`
/// (right-hand rule).
pub fn rotate_about_axis(
    point: &Point3<f64>,
    origin: &Point3<f64>,
    axis: &Vector3<f64>,
    angle_degrees: f64,
) -> Point3<f64> {
    let rotation = rotation_from_axis_angle(axis, angle_degrees);
    origin + rotation * (point - origin)
}

/// Dihedral angle `a-b-c-d` in degrees, IUPAC sign convention, in `(-180, 180]`.
///
/// Returns `None` when three consecutive points are collinear.
pub fn dihedral_degrees(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    d: &Point3<f64>,
) -> Option<f64> {
    let b0 = a - b;
    let b1 = c - b;
    let b2 = d - c;

    let b1_norm = b1.norm();
    if b1_norm < 1e-9 {
        return None;
    }
    let axis = b1 / b1_norm;

    let v = b0 - axis * b0.dot(&axis);
    let w = b2 - axis * b2.dot(&axis);
    if v.norm() < 1e-9 || w.norm() < 1e-9 {
        return None;
    }

    let x = v.dot(&w);
    let y = axis.cross(&v).dot(&w);
    let angle = y.atan2(x).to_degrees();
    Some(if angle <= -180.0 { angle + 360.0 } else { angle })
}

/// Wraps an angle in degrees into `(-180, 180]`.
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = (angle + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 { wrapped + 360.0 } else { wrapped }
}

/// Ideal hydrogen positions around a tetrahedral center with 1, 2 or 3 heavy neighbors.
///
/// Returns `None` for any other neighbor count.
pub fn generate_sp3_hydrogens(
    base_pos: &Point3<f64>,
    neighbors: &[Point3<f64>],
    bond_length: f64,
) -> Option<Vec<Point3<f64>>> {
    let neighbor_vecs: Vec<Vector3<f64>> = neighbors
        .iter()
        .map(|p| (p - base_pos).normalize())
        .collect();

    match neighbor_vecs.len() {
        1 => {
            let n1 = neighbor_vecs[0];
            let mut temp_vec = if n1.x.abs() < 0.9 {
                Vector3::x()
            } else {
                Vector3::y()
            };
            temp_vec = (temp_vec - n1 * n1.dot(&temp_vec)).normalize();

            let rot_axis = Unit::new_normalize(n1);
            let rot = Rotation3::from_axis_angle(&rot_axis, 120.0f64.to_radians());

            let h1_dir = Rotation3::from_axis_angle(
                &Unit::new_normalize(n1.cross(&temp_vec)),
                TETRAHEDRAL_ANGLE_DEGREES.to_radians(),
            ) * n1;
            let h1 = base_pos + h1_dir.normalize() * bond_length;
            let h2 = base_pos + (rot * (h1 - base_pos));
            let h3 = base_pos + (rot * (h2 - base_pos));
            Some(vec![h1, h2, h3])
        }
        2 => {
            let n1 = neighbor_vecs[0];
            let n2 = neighbor_vecs[1];
            let bisector = -(n1 + n2).normalize();
            let normal = n1.cross(&n2).normalize();
            let half = (TETRAHEDRAL_ANGLE_DEGREES / 2.0).to_radians();

            let h1_dir = bisector * half.cos() + normal * half.sin();
            let h2_dir = bisector * half.cos() - normal * half.sin();
            Some(vec![
                base_pos + h1_dir * bond_length,
                base_pos + h2_dir * bond_length,
            ])
        }
        3 => {
            let n1 = neighbor_vecs[0];
            let n2 = neighbor_vecs[1];
            let n3 = neighbor_vecs[2];
            let h_dir = -(n1 + n2 + n3).normalize();
            Some(vec![base_pos + h_dir * bond_length])
        }
        _ => None,
    }
}

/// Unit direction in which an atom can accept one more covalent partner.
///
/// A trigonal-planar center opens along its plane normal. Otherwise the first ideal tetrahedral
/// position is used for 1-3 neighbors, the opposite of the summed neighbor directions for more,
/// and `+x` for an isolated atom.
pub fn open_valence_direction(base_pos: &Point3<f64>, neighbors: &[Point3<f64>]) -> Vector3<f64> {
    if neighbors.is_empty() {
        return Vector3::x();
    }
    let unit_vecs: Vec<Vector3<f64>> = neighbors.iter().map(|p| (p - base_pos).normalize()).collect();
    if let [a, b, c] = unit_vecs.as_slice() {
        if a.dot(&b.cross(c)).abs() < PLANARITY_TOLERANCE {
            if let Some(normal) = plane_normal(&unit_vecs) {
                return normal;
            }
        }
    }
    if let Some(sites) = generate_sp3_hydrogens(base_pos, neighbors, 1.0) {
        if let Some(site) = sites.first() {
            let dir = site - base_pos;
            if dir.norm() > 1e-9 && dir.iter().all(|c| c.is_finite()) {
                return dir.normalize();
            }
        }
    }
    let sum: Vector3<f64> = unit_vecs.iter().sum();
    if sum.norm() > PLANARITY_TOLERANCE {
        return -sum.normalize();
    }
    plane_normal(&unit_vecs).unwrap_or_else(Vector3::x)
}

/// Normal of the plane spanned by the best-conditioned pair of `vectors`, if any pair spans one.
fn plane_normal(vectors: &[Vector3<f64>]) -> Option<Vector3<f64>> {
    let mut best: Option<Vector3<f64>> = None;
    for (i, a) in vectors.iter().enumerate() {
        for b in &vectors[i + 1..] {
            let cross = a.cross(b);
            if best.is_none_or(|current| cross.norm() > current.norm()) {
                best = Some(cross);
            }
        }
    }
    best.filter(|normal| normal.norm() > 1e-9).map(|normal| normal.normalize())
}

/// Distance between the two outer atoms of an `a-b-c` angle with the given bond lengths.
pub fn one_three_distance(bond_ab: f64, bond_bc: f64, angle_degrees: f64) -> f64 {
    let theta = angle_degrees.to_radians();
    (bond_ab * bond_ab + bond_bc * bond_bc - 2.0 * bond_ab * bond_bc * theta.cos()).sqrt()
}

pub fn tetrahedral_one_three_distance(bond_ab: f64, bond_bc: f64) -> f64 {
    one_three_distance(bond_ab, bond_bc, TETRAHEDRAL_ANGLE_DEGREES)
}

pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}
