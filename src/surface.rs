//! Surface delegates: what happens when a ray meets a boundary.
//!
//! The default delegate implements unpolarised Fresnel reflection and
//! Snell refraction between two dielectrics, including total internal
//! reflection. Custom delegates can model reflectance tables or absorbing
//! coatings.

use glam::DVec3;
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use std::fmt;

use crate::ray::Ray;
use crate::spectrum::Spectrum;

/// Optical context at a boundary crossing.
#[derive(Debug, Clone, Copy)]
pub struct Boundary {
    /// Outward unit normal of the hit geometry at the crossing point, in
    /// world coordinates.
    pub normal: DVec3,
    /// Refractive index of the container (departure side) at the ray's
    /// wavelength.
    pub n1: f64,
    /// Refractive index of the adjacent medium (arrival side).
    pub n2: f64,
}

/// What the delegate decided to do with the ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceDecision {
    /// Bounce back into the container with the given direction.
    Reflect(DVec3),
    /// Cross into the adjacent medium with the given direction.
    Transmit(DVec3),
    /// Terminate at the surface.
    Absorb,
}

/// Stateless decision maker for boundary crossings.
pub trait Surface: fmt::Debug + Send + Sync {
    /// Decide between reflection, transmission and absorption.
    fn decide(&self, ray: &Ray, boundary: &Boundary, rng: &mut ChaCha20Rng) -> SurfaceDecision;
}

/// Mirror reflection of `direction` about a normal opposing it.
pub fn reflect(direction: DVec3, normal: DVec3) -> DVec3 {
    direction - 2.0 * direction.dot(normal) * normal
}

/// Unpolarised Fresnel reflectance for the incidence cosine and index pair,
/// 1.0 past the critical angle.
pub fn fresnel_reflectance(cos_i: f64, n1: f64, n2: f64) -> f64 {
    let sin_i = (1.0 - cos_i * cos_i).sqrt();
    let sin_t = n1 / n2 * sin_i;
    if sin_t >= 1.0 {
        return 1.0;
    }
    let cos_t = (1.0 - sin_t * sin_t).sqrt();
    let r_s = ((n1 * cos_i - n2 * cos_t) / (n1 * cos_i + n2 * cos_t)).powi(2);
    let r_p = ((n1 * cos_t - n2 * cos_i) / (n1 * cos_t + n2 * cos_i)).powi(2);
    0.5 * (r_s + r_p)
}

/// Default dielectric boundary: Monte Carlo draw against the Fresnel
/// reflectance, refracting by Snell's law on transmission.
#[derive(Debug, Default, Clone, Copy)]
pub struct FresnelSurface;

impl Surface for FresnelSurface {
    fn decide(&self, ray: &Ray, boundary: &Boundary, rng: &mut ChaCha20Rng) -> SurfaceDecision {
        let d = ray.direction;
        // Work with the normal opposing the ray
        let mut n = boundary.normal;
        let mut cos_i = -d.dot(n);
        if cos_i < 0.0 {
            n = -n;
            cos_i = -cos_i;
        }
        let cos_i = cos_i.min(1.0);

        let mu = boundary.n1 / boundary.n2;
        let sin_t = mu * (1.0 - cos_i * cos_i).sqrt();
        if sin_t >= 1.0 {
            // Total internal reflection
            return SurfaceDecision::Reflect(reflect(d, n));
        }

        let reflectance = fresnel_reflectance(cos_i, boundary.n1, boundary.n2);
        if rng.random::<f64>() < reflectance {
            return SurfaceDecision::Reflect(reflect(d, n));
        }

        let cos_t = (1.0 - sin_t * sin_t).sqrt();
        let transmitted = (mu * d + (mu * cos_i - cos_t) * n).normalize();
        SurfaceDecision::Transmit(transmitted)
    }
}

/// Coating with a wavelength-dependent reflectivity that absorbs whatever it
/// does not reflect. Models mirrors and lossy back-surface coatings.
#[derive(Debug, Clone)]
pub struct CoatedSurface {
    reflectivity: Spectrum,
}

impl CoatedSurface {
    /// Coating reflecting with the given spectrum, absorbing the rest.
    pub fn new(reflectivity: Spectrum) -> Self {
        Self { reflectivity }
    }

    /// Perfect mirror.
    pub fn mirror() -> Self {
        Self::new(Spectrum::Constant(1.0))
    }
}

impl Surface for CoatedSurface {
    fn decide(&self, ray: &Ray, boundary: &Boundary, rng: &mut ChaCha20Rng) -> SurfaceDecision {
        let reflectivity = self.reflectivity.value(ray.wavelength).clamp(0.0, 1.0);
        if rng.random::<f64>() < reflectivity {
            let mut n = boundary.normal;
            if -ray.direction.dot(n) < 0.0 {
                n = -n;
            }
            SurfaceDecision::Reflect(reflect(ray.direction, n))
        } else {
            SurfaceDecision::Absorb
        }
    }
}
