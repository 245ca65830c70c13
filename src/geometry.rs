//! Closed-surface geometry capability.
//!
//! Every primitive answers three questions about its own local coordinate
//! system: where does a ray cross the surface, is a point inside, and what is
//! the outward normal at a surface point. The set of primitives is closed, so
//! a tagged enum is used rather than trait objects.

use glam::DVec3;
use smallvec::SmallVec;
use std::fmt;

use crate::cuboid::Cuboid;
use crate::cylinder::Cylinder;
use crate::mesh::Mesh;
use crate::sphere::Sphere;

/// Numerical tolerance in scene units.
///
/// Intersection roots closer than this to the ray origin are dropped so that
/// a ray which just left a surface does not immediately re-intersect it, and
/// points within this distance of a surface count as on it.
pub const EPS: f64 = 1e-9;

/// Classification of a point against a closed surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Strictly inside the enclosed volume.
    Inside,
    /// On the surface within [`EPS`].
    Surface,
    /// Strictly outside.
    Outside,
}

/// Identifies which part of a geometry's surface a hit landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    /// The geometry has a single undivided surface.
    Whole,
    /// A named face: box faces and cylinder caps.
    Face(&'static str),
    /// A mesh triangle by index.
    Triangle(u32),
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facet::Whole => write!(f, ""),
            Facet::Face(name) => write!(f, "{name}"),
            Facet::Triangle(i) => write!(f, "{i}"),
        }
    }
}

/// One surface crossing in the geometry's local frame.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceHit {
    /// Ray parameter of the crossing, strictly greater than [`EPS`].
    pub t: f64,
    /// Which part of the surface was crossed.
    pub facet: Facet,
}

/// Intersection roots for one geometry, ordered ascending in t.
pub type SurfaceHits = SmallVec<[SurfaceHit; 4]>;

/// A closed surface enclosing a volume.
#[derive(Debug, Clone)]
pub enum Geometry {
    /// Sphere centred on the local origin.
    Sphere(Sphere),
    /// Axis-aligned box centred on the local origin.
    Cuboid(Cuboid),
    /// Finite capped cylinder along the local z axis.
    Cylinder(Cylinder),
    /// Closed triangle mesh.
    Mesh(Mesh),
}

impl Geometry {
    /// All crossings of the surface by the local-space ray `(origin,
    /// direction)` with t > [`EPS`], ordered ascending.
    pub fn intersections(&self, origin: DVec3, direction: DVec3) -> SurfaceHits {
        let mut hits = match self {
            Geometry::Sphere(g) => g.intersections(origin, direction),
            Geometry::Cuboid(g) => g.intersections(origin, direction),
            Geometry::Cylinder(g) => g.intersections(origin, direction),
            Geometry::Mesh(g) => g.intersections(origin, direction),
        };
        hits.sort_unstable_by(|a, b| a.t.partial_cmp(&b.t).expect("finite roots"));
        hits
    }

    /// Classify a local-space point against the surface.
    pub fn locate(&self, point: DVec3) -> Location {
        match self {
            Geometry::Sphere(g) => g.locate(point),
            Geometry::Cuboid(g) => g.locate(point),
            Geometry::Cylinder(g) => g.locate(point),
            Geometry::Mesh(g) => g.locate(point),
        }
    }

    /// Outward unit normal at a local-space surface point.
    pub fn normal(&self, point: DVec3, facet: Facet) -> DVec3 {
        match self {
            Geometry::Sphere(g) => g.normal(point),
            Geometry::Cuboid(g) => g.normal(point),
            Geometry::Cylinder(g) => g.normal(point, facet),
            Geometry::Mesh(g) => g.normal(facet),
        }
    }
}
