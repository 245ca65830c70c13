//! Finite capped cylinder primitive.
//!
//! The axis runs along local z with the volume centred on the origin: the
//! curved surface is a quadratic in x and y, the caps are disks at z = ±L/2.

use glam::DVec3;
use smallvec::smallvec;

use crate::error::GeometryError;
use crate::geometry::{Facet, Location, SurfaceHit, SurfaceHits, EPS};

/// Capped cylinder along the local z axis.
#[derive(Debug, Clone)]
pub struct Cylinder {
    /// Radius of the curved surface, strictly positive.
    pub radius: f64,
    /// Full length along z, strictly positive.
    pub length: f64,
}

impl Cylinder {
    /// Create a cylinder, rejecting non-positive dimensions.
    pub fn new(radius: f64, length: f64) -> Result<Self, GeometryError> {
        if radius <= 0.0 {
            return Err(GeometryError::NonPositive {
                what: "cylinder radius",
                value: radius,
            });
        }
        if length <= 0.0 {
            return Err(GeometryError::NonPositive {
                what: "cylinder length",
                value: length,
            });
        }
        Ok(Self { radius, length })
    }

    fn half_length(&self) -> f64 {
        0.5 * self.length
    }

    /// Crossings of the curved surface and both caps with t > [`EPS`].
    pub fn intersections(&self, origin: DVec3, direction: DVec3) -> SurfaceHits {
        let mut hits: SurfaceHits = smallvec![];
        let h = self.half_length();

        // Curved surface: quadratic in the xy-plane, clipped to |z| <= L/2
        let a = direction.x * direction.x + direction.y * direction.y;
        if a > 1e-300 {
            let b = 2.0 * (origin.x * direction.x + origin.y * direction.y);
            let c = origin.x * origin.x + origin.y * origin.y - self.radius * self.radius;
            let discriminant = b * b - 4.0 * a * c;
            if discriminant >= 0.0 {
                let sqrtd = discriminant.sqrt();
                for t in [(-b - sqrtd) / (2.0 * a), (-b + sqrtd) / (2.0 * a)] {
                    if t > EPS && (origin.z + t * direction.z).abs() <= h {
                        hits.push(SurfaceHit {
                            t,
                            facet: Facet::Face("side"),
                        });
                    }
                }
            }
        }

        // End caps: plane crossings inside the cap radius
        if direction.z.abs() > 1e-300 {
            for (cap_z, name) in [(h, "+z"), (-h, "-z")] {
                let t = (cap_z - origin.z) / direction.z;
                if t > EPS {
                    let p = origin + t * direction;
                    if p.x * p.x + p.y * p.y <= self.radius * self.radius {
                        hits.push(SurfaceHit {
                            t,
                            facet: Facet::Face(name),
                        });
                    }
                }
            }
        }

        // A rim hit satisfies both tests; keep a single crossing
        hits.sort_unstable_by(|a, b| a.t.partial_cmp(&b.t).expect("finite roots"));
        hits.dedup_by(|a, b| (a.t - b.t).abs() <= EPS);
        hits
    }

    /// Classify a point against the curved surface and caps.
    pub fn locate(&self, point: DVec3) -> Location {
        let radial = (point.x * point.x + point.y * point.y).sqrt() - self.radius;
        let axial = point.z.abs() - self.half_length();
        let excess = radial.max(axial);
        if excess.abs() <= EPS {
            Location::Surface
        } else if excess < 0.0 {
            Location::Inside
        } else {
            Location::Outside
        }
    }

    /// Outward normal: radial on the curved surface, ±z on the caps.
    pub fn normal(&self, point: DVec3, facet: Facet) -> DVec3 {
        match facet {
            Facet::Face("+z") => DVec3::Z,
            Facet::Face("-z") => DVec3::NEG_Z,
            Facet::Face("side") => DVec3::new(point.x, point.y, 0.0).normalize(),
            _ => {
                // No facet tag: pick whichever surface the point is nearest
                let radial = (point.x * point.x + point.y * point.y).sqrt() - self.radius;
                let axial = point.z.abs() - self.half_length();
                if radial.abs() <= axial.abs() {
                    DVec3::new(point.x, point.y, 0.0).normalize()
                } else if point.z > 0.0 {
                    DVec3::Z
                } else {
                    DVec3::NEG_Z
                }
            }
        }
    }
}
