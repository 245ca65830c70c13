//! Ray representation for photon tracing.
//!
//! A ray carries the full state of one photon between events: where it is,
//! where it is heading, its wavelength and how far it has travelled. Rays are
//! immutable records; every event produces a new one.

use glam::DVec3;
use std::sync::Arc;

/// Speed of light in scene units (metres) per second.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Photon state between two events.
///
/// Immutable: the builder-style `with_*` and `propagated` methods return a
/// new ray and never mutate in place.
#[derive(Debug, Clone)]
pub struct Ray {
    /// Position in world coordinates.
    pub position: DVec3,

    /// Unit direction of travel in world coordinates.
    pub direction: DVec3,

    /// Wavelength in nanometers.
    pub wavelength: f64,

    /// Name of the node or component that emitted this ray.
    pub source: Arc<str>,

    /// Cumulative distance travelled across all segments, in scene units.
    pub travelled: f64,

    /// Cumulative elapsed time in seconds.
    ///
    /// Advances by `distance * n / c0` for a segment inside a medium with
    /// refractive index `n`, with scene units taken as metres.
    pub duration: f64,

    /// False once a terminal event has consumed the ray.
    pub alive: bool,
}

impl Ray {
    /// Create a live ray at the start of its history.
    pub fn new(
        position: DVec3,
        direction: DVec3,
        wavelength: f64,
        source: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            position,
            direction,
            wavelength,
            source: source.into(),
            travelled: 0.0,
            duration: 0.0,
            alive: true,
        }
    }

    /// Point at parameter `t` along the ray.
    pub fn at(&self, t: f64) -> DVec3 {
        self.position + t * self.direction
    }

    /// Move the ray forward by `distance` through a medium of refractive
    /// index `n`, accumulating travelled distance and elapsed time.
    pub fn propagated(&self, distance: f64, n: f64) -> Self {
        Self {
            position: self.at(distance),
            travelled: self.travelled + distance,
            duration: self.duration + distance * n / SPEED_OF_LIGHT,
            ..self.clone()
        }
    }

    /// Same position and bookkeeping, new direction.
    pub fn with_direction(&self, direction: DVec3) -> Self {
        Self {
            direction,
            ..self.clone()
        }
    }

    /// Same position and bookkeeping, new wavelength, direction and source.
    ///
    /// Used for re-emission: the new segment starts at the absorption point.
    pub fn re_emitted(
        &self,
        wavelength: f64,
        direction: DVec3,
        source: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            wavelength,
            direction,
            source: source.into(),
            ..self.clone()
        }
    }

    /// Shift the origin by `eps` along the direction of travel without
    /// counting the shift as travelled distance. Prevents an emerging ray
    /// from immediately re-intersecting the surface it just left.
    pub fn nudged(&self, eps: f64) -> Self {
        Self {
            position: self.position + eps * self.direction,
            ..self.clone()
        }
    }

    /// Mark the ray as consumed by a terminal event.
    pub fn killed(&self) -> Self {
        Self {
            alive: false,
            ..self.clone()
        }
    }

    /// True when position, direction and wavelength are all finite and the
    /// direction has sensible length.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.direction.is_finite()
            && self.wavelength.is_finite()
            && self.direction.length_squared() > 1e-12
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn propagated_accumulates_distance_and_time() {
        let ray = Ray::new(DVec3::ZERO, DVec3::Z, 555.0, "laser");
        let moved = ray.propagated(2.0, 1.5);
        assert_eq!(moved.position, DVec3::new(0.0, 0.0, 2.0));
        assert_eq!(moved.travelled, 2.0);
        assert!((moved.duration - 2.0 * 1.5 / SPEED_OF_LIGHT).abs() < 1e-24);
        assert!(moved.alive);
    }

    #[test]
    fn nudge_does_not_count_as_travel() {
        let ray = Ray::new(DVec3::ZERO, DVec3::X, 555.0, "laser");
        let nudged = ray.nudged(1e-9);
        assert_eq!(nudged.travelled, 0.0);
        assert!(nudged.position.x > 0.0);
    }

    #[test]
    fn non_finite_state_is_detected() {
        let ray = Ray::new(DVec3::ZERO, DVec3::ZERO, 555.0, "laser");
        assert!(!ray.is_finite());
        let ray = Ray::new(DVec3::ZERO, DVec3::X, f64::NAN, "laser");
        assert!(!ray.is_finite());
    }
}
