//! Sphere primitive.
//!
//! Centred on the local origin; intersections use the half-b form of the
//! quadratic formula.

use glam::DVec3;
use smallvec::smallvec;

use crate::error::GeometryError;
use crate::geometry::{Facet, Location, SurfaceHit, SurfaceHits, EPS};

/// Sphere of a given radius centred on the local origin.
#[derive(Debug, Clone)]
pub struct Sphere {
    /// Radius in scene units, strictly positive.
    pub radius: f64,
}

impl Sphere {
    /// Create a sphere, rejecting non-positive radii.
    pub fn new(radius: f64) -> Result<Self, GeometryError> {
        if radius <= 0.0 {
            return Err(GeometryError::NonPositive {
                what: "sphere radius",
                value: radius,
            });
        }
        Ok(Self { radius })
    }

    /// Positive quadratic roots where the ray crosses the surface.
    pub fn intersections(&self, origin: DVec3, direction: DVec3) -> SurfaceHits {
        let oc = -origin;
        let a = direction.length_squared();
        let h = direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return smallvec![];
        }
        let sqrtd = discriminant.sqrt();

        let mut hits: SurfaceHits = smallvec![];
        for root in [(h - sqrtd) / a, (h + sqrtd) / a] {
            if root > EPS {
                hits.push(SurfaceHit {
                    t: root,
                    facet: Facet::Whole,
                });
            }
        }
        hits
    }

    /// Classify a point by its distance from the centre.
    pub fn locate(&self, point: DVec3) -> Location {
        let d = point.length() - self.radius;
        if d.abs() <= EPS {
            Location::Surface
        } else if d < 0.0 {
            Location::Inside
        } else {
            Location::Outside
        }
    }

    /// Radial outward normal.
    pub fn normal(&self, point: DVec3) -> DVec3 {
        point / self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_radius() {
        assert!(Sphere::new(0.0).is_err());
        assert!(Sphere::new(-1.0).is_err());
    }

    #[test]
    fn ray_through_centre_has_two_roots() {
        let s = Sphere::new(1.0).unwrap();
        let hits = s.intersections(DVec3::new(-2.0, 0.0, 0.0), DVec3::X);
        assert_eq!(hits.len(), 2);
        assert!((hits[0].t - 1.0).abs() < 1e-12);
        assert!((hits[1].t - 3.0).abs() < 1e-12);
    }

    #[test]
    fn ray_from_inside_has_one_root() {
        let s = Sphere::new(1.0).unwrap();
        let hits = s.intersections(DVec3::ZERO, DVec3::Z);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].t - 1.0).abs() < 1e-12);
    }

    #[test]
    fn root_at_origin_is_dropped() {
        // A ray starting exactly on the surface must not re-intersect it
        let s = Sphere::new(1.0).unwrap();
        let hits = s.intersections(DVec3::new(-1.0, 0.0, 0.0), DVec3::X);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].t - 2.0).abs() < 1e-12);
    }

    #[test]
    fn grazing_miss() {
        let s = Sphere::new(1.0).unwrap();
        let hits = s.intersections(DVec3::new(-2.0, 0.0, 1.1), DVec3::X);
        assert!(hits.is_empty());
    }

    #[test]
    fn locate_and_normal() {
        let s = Sphere::new(2.0).unwrap();
        assert_eq!(s.locate(DVec3::ZERO), Location::Inside);
        assert_eq!(s.locate(DVec3::new(2.0, 0.0, 0.0)), Location::Surface);
        assert_eq!(s.locate(DVec3::new(3.0, 0.0, 0.0)), Location::Outside);
        assert_eq!(s.normal(DVec3::new(0.0, 2.0, 0.0)), DVec3::Y);
    }
}
