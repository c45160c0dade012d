#[inline]
pub fn harmonic(dist: f64, ideal_dist: f64, force_constant: f64) -> f64 {
    let delta = dist - ideal_dist;
    force_constant * delta * delta
}

/// `dE/dr` of [`harmonic`].
#[inline]
pub fn harmonic_derivative(dist: f64, ideal_dist: f64, force_constant: f64) -> f64 {
    2.0 * force_constant * (dist - ideal_dist)
}

#[inline]
pub fn lennard_jones_12_6(dist: f64, r_min: f64, well_depth: f64) -> f64 {
    if dist < 1e-6 {
        return 1e10;
    }
    let rho = r_min / dist;
    let rho6 = rho.powi(6);
    let rho12 = rho6 * rho6;
    well_depth * (rho12 - 2.0 * rho6)
}

/// `dE/dr` of [`lennard_jones_12_6`]; a large negative value (repulsive) at near-zero distance.
#[inline]
pub fn lennard_jones_12_6_derivative(dist: f64, r_min: f64, well_depth: f64) -> f64 {
    if dist < 1e-6 {
        return -1e10;
    }
    let rho = r_min / dist;
    let rho6 = rho.powi(6);
    let rho12 = rho6 * rho6;
    12.0 * well_depth * (rho6 - rho12) / dist
}
