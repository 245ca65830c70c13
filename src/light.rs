//! Light sources.
//!
//! A light emits rays in its node's local frame, along +z from the xy-plane.
//! Three independent delegates shape the distribution: a wavelength sampler,
//! a position mask and a divergence. The engine applies the emitting node's
//! world transform afterwards.

use glam::DVec3;
use rand::Rng;
use rand_chacha::ChaCha20Rng;

use crate::random;
use crate::spectrum::Distribution;

/// Wavelength delegate.
#[derive(Debug, Clone)]
pub enum WavelengthSampler {
    /// Monochromatic emission.
    Constant(f64),
    /// Draw from a tabulated emission spectrum.
    Spectrum(Distribution),
}

/// Position delegate over the local xy-plane.
#[derive(Debug, Clone, Copy)]
pub enum PositionMask {
    /// Every ray starts at the local origin.
    Point,
    /// Uniform over a centred a x b rectangle.
    Square {
        /// Extent along local x.
        a: f64,
        /// Extent along local y.
        b: f64,
    },
    /// Uniform over a centred disk.
    Circle {
        /// Disk radius.
        radius: f64,
    },
}

/// Divergence delegate about the local +z axis.
#[derive(Debug, Clone, Copy)]
pub enum Divergence {
    /// Perfectly collimated along +z.
    Collimated,
    /// Uniform within a cone of the given half-angle (radians).
    Cone {
        /// Cone half-angle in radians.
        half_angle: f64,
    },
    /// Cosine-weighted hemisphere.
    Lambertian,
}

/// A light source built from the three delegates.
#[derive(Debug, Clone)]
pub struct Light {
    wavelength: WavelengthSampler,
    position: PositionMask,
    divergence: Divergence,
}

impl Default for Light {
    /// Monochromatic 555 nm point source collimated along +z.
    fn default() -> Self {
        Self {
            wavelength: WavelengthSampler::Constant(555.0),
            position: PositionMask::Point,
            divergence: Divergence::Collimated,
        }
    }
}

impl Light {
    /// The default source; customise with the `with_*` methods.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the wavelength delegate.
    pub fn with_wavelength(mut self, sampler: WavelengthSampler) -> Self {
        self.wavelength = sampler;
        self
    }

    /// Replace the position mask.
    pub fn with_position(mut self, mask: PositionMask) -> Self {
        self.position = mask;
        self
    }

    /// Replace the divergence delegate.
    pub fn with_divergence(mut self, divergence: Divergence) -> Self {
        self.divergence = divergence;
        self
    }

    /// Sample one emission in the local frame: (position, direction,
    /// wavelength).
    pub fn sample(&self, rng: &mut ChaCha20Rng) -> (DVec3, DVec3, f64) {
        let wavelength = match &self.wavelength {
            WavelengthSampler::Constant(nm) => *nm,
            WavelengthSampler::Spectrum(dist) => dist.sample(rng.random()),
        };
        let position = match self.position {
            PositionMask::Point => DVec3::ZERO,
            PositionMask::Square { a, b } => random::square_mask(rng, a, b),
            PositionMask::Circle { radius } => random::circular_mask(rng, radius),
        };
        let direction = match self.divergence {
            Divergence::Collimated => DVec3::Z,
            Divergence::Cone { half_angle } => random::cone_direction(rng, half_angle),
            Divergence::Lambertian => random::lambertian_direction(rng),
        };
        (position, direction, wavelength)
    }
}
