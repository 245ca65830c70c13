//! Axis-aligned box primitive.
//!
//! Centred on the local origin; rotated boxes are expressed through the
//! transform of the enclosing scene node. Intersections use the slab method.

use glam::DVec3;
use smallvec::smallvec;

use crate::error::GeometryError;
use crate::geometry::{Facet, Location, SurfaceHit, SurfaceHits, EPS};

/// Face names in +x, -x, +y, -y, +z, -z order.
const FACES: [[&str; 2]; 3] = [["+x", "-x"], ["+y", "-y"], ["+z", "-z"]];

/// Axis-aligned box centred on the local origin.
#[derive(Debug, Clone)]
pub struct Cuboid {
    half: DVec3,
}

impl Cuboid {
    /// Create from full edge lengths, rejecting non-positive edges.
    pub fn new(size: DVec3) -> Result<Self, GeometryError> {
        for edge in size.to_array() {
            if edge <= 0.0 {
                return Err(GeometryError::NonPositive {
                    what: "box edge",
                    value: edge,
                });
            }
        }
        Ok(Self { half: 0.5 * size })
    }

    /// Full edge lengths.
    pub fn size(&self) -> DVec3 {
        2.0 * self.half
    }

    /// Slab-method crossings with t > [`EPS`].
    pub fn intersections(&self, origin: DVec3, direction: DVec3) -> SurfaceHits {
        let mut t_near = f64::NEG_INFINITY;
        let mut t_far = f64::INFINITY;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            let h = self.half[axis];
            if d.abs() < 1e-300 {
                // Parallel to the slab: either always between the planes or never
                if o.abs() > h {
                    return smallvec![];
                }
                continue;
            }
            let inv = 1.0 / d;
            let (t0, t1) = {
                let a = (-h - o) * inv;
                let b = (h - o) * inv;
                if a < b {
                    (a, b)
                } else {
                    (b, a)
                }
            };
            t_near = t_near.max(t0);
            t_far = t_far.min(t1);
            if t_near > t_far {
                return smallvec![];
            }
        }

        let mut hits: SurfaceHits = smallvec![];
        for t in [t_near, t_far] {
            if t > EPS {
                let facet = self.facet_at(origin + t * direction);
                hits.push(SurfaceHit { t, facet });
            }
        }
        hits
    }

    /// Classify a point against the six slabs.
    pub fn locate(&self, point: DVec3) -> Location {
        let excess = point.abs() - self.half;
        let max_excess = excess.max_element();
        if max_excess.abs() <= EPS {
            Location::Surface
        } else if max_excess < 0.0 {
            Location::Inside
        } else {
            Location::Outside
        }
    }

    /// Outward normal of the face closest to the point.
    pub fn normal(&self, point: DVec3) -> DVec3 {
        let (axis, sign) = self.closest_face(point);
        let mut n = DVec3::ZERO;
        n[axis] = sign;
        n
    }

    fn facet_at(&self, point: DVec3) -> Facet {
        let (axis, sign) = self.closest_face(point);
        Facet::Face(FACES[axis][if sign > 0.0 { 0 } else { 1 }])
    }

    /// Axis and sign of the slab face with the smallest distance to `point`.
    fn closest_face(&self, point: DVec3) -> (usize, f64) {
        let mut best = (0usize, 1.0f64);
        let mut best_dist = f64::INFINITY;
        for axis in 0..3 {
            let dist = (point[axis].abs() - self.half[axis]).abs();
            if dist < best_dist {
                best_dist = dist;
                best = (axis, point[axis].signum());
            }
        }
        best
    }
}
