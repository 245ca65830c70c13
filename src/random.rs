//! Random sampling for photon tracing.
//!
//! All sampling routines take the generator explicitly so that a batch can
//! hand each worker its own deterministically seeded ChaCha20 stream. There
//! is no global or thread-local generator.

use glam::DVec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Derive the ChaCha20 stream for one worker from the master seed.
///
/// Reproducibility holds for a fixed (seed, worker count) pair: worker `w`
/// always receives the same stream and traces the same slice of rays.
pub fn worker_rng(master_seed: u64, worker_index: u64) -> ChaCha20Rng {
    let stream = master_seed ^ worker_index.wrapping_mul(0x9e37_79b9_7f4a_7c15);
    ChaCha20Rng::seed_from_u64(stream)
}

/// Uniform direction on the unit sphere.
pub fn isotropic_direction(rng: &mut impl Rng) -> DVec3 {
    let theta = 2.0 * std::f64::consts::PI * rng.random::<f64>();
    // Uniform cos(phi) in [-1, 1] for a proper sphere distribution
    let cos_phi = 2.0 * rng.random::<f64>() - 1.0;
    let sin_phi = (1.0 - cos_phi * cos_phi).sqrt();
    DVec3::new(sin_phi * theta.cos(), sin_phi * theta.sin(), cos_phi)
}

/// Uniform direction within a cone of half-angle `phi_max` around +z.
pub fn cone_direction(rng: &mut impl Rng, phi_max: f64) -> DVec3 {
    let theta = 2.0 * std::f64::consts::PI * rng.random::<f64>();
    let cos_phi = rng.random_range(phi_max.cos()..=1.0);
    let sin_phi = (1.0 - cos_phi * cos_phi).sqrt();
    DVec3::new(sin_phi * theta.cos(), sin_phi * theta.sin(), cos_phi)
}

/// Cosine-weighted direction in the +z hemisphere (Lambertian emitter).
pub fn lambertian_direction(rng: &mut impl Rng) -> DVec3 {
    let theta = 2.0 * std::f64::consts::PI * rng.random::<f64>();
    let cos_phi = rng.random::<f64>().sqrt();
    let sin_phi = (1.0 - cos_phi * cos_phi).sqrt();
    DVec3::new(sin_phi * theta.cos(), sin_phi * theta.sin(), cos_phi)
}

/// Henyey-Greenstein direction with asymmetry `g`, scattered relative to the
/// incoming direction. `g = 0` reduces to the isotropic case.
pub fn henyey_greenstein_direction(rng: &mut impl Rng, g: f64, incoming: DVec3) -> DVec3 {
    if g.abs() < 1e-6 {
        return isotropic_direction(rng);
    }
    let s = 2.0 * rng.random::<f64>() - 1.0;
    let frac = (1.0 - g * g) / (1.0 + g * s);
    let cos_theta = ((1.0 + g * g - frac * frac) / (2.0 * g)).clamp(-1.0, 1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
    let phi = 2.0 * std::f64::consts::PI * rng.random::<f64>();

    let (u, v) = orthonormal_basis(incoming);
    (sin_theta * phi.cos() * u + sin_theta * phi.sin() * v + cos_theta * incoming).normalize()
}

/// Uniform point on a centred a x b rectangle in the local xy-plane.
pub fn square_mask(rng: &mut impl Rng, a: f64, b: f64) -> DVec3 {
    DVec3::new(
        rng.random_range(-0.5 * a..=0.5 * a),
        rng.random_range(-0.5 * b..=0.5 * b),
        0.0,
    )
}

/// Uniform point on a centred disk of the given radius in the xy-plane.
pub fn circular_mask(rng: &mut impl Rng, radius: f64) -> DVec3 {
    let phi = 2.0 * std::f64::consts::PI * rng.random::<f64>();
    let r = rng.random::<f64>().sqrt() * radius;
    DVec3::new(r * phi.cos(), r * phi.sin(), 0.0)
}

/// Two unit vectors completing `w` to a right-handed orthonormal basis.
fn orthonormal_basis(w: DVec3) -> (DVec3, DVec3) {
    let helper = if w.x.abs() > 0.9 { DVec3::Y } else { DVec3::X };
    let u = w.cross(helper).normalize();
    let v = w.cross(u);
    (u, v)
}
