//! Closed triangle-mesh primitive.
//!
//! Vertices are stored in single precision, which bounds how small a feature
//! can be resolved in a spatially large scene; queries widen to f64. The mesh
//! must be closed (every edge shared by exactly two triangles) so that the
//! parity containment test is meaningful. Triangles are wound
//! counter-clockwise seen from outside.

use glam::DVec3;
use smallvec::smallvec;
use std::collections::HashMap;
use std::path::Path;

use crate::error::GeometryError;
use crate::geometry::{Facet, Location, SurfaceHit, SurfaceHits, EPS};

/// Fixed direction for the parity containment test; chosen off-axis so rays
/// rarely graze mesh edges.
const PARITY_DIRECTION: DVec3 = DVec3::new(0.579_277, 0.548_327, 0.603_135);

/// Closed triangle mesh.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<[f32; 3]>,
    triangles: Vec<[u32; 3]>,
}

impl Mesh {
    /// Build a mesh from shared vertices and triangle indices.
    ///
    /// Fails if the mesh cannot enclose a volume: fewer than four faces, a
    /// degenerate triangle, or an edge not shared by exactly two faces.
    pub fn new(vertices: Vec<[f32; 3]>, triangles: Vec<[u32; 3]>) -> Result<Self, GeometryError> {
        if triangles.len() < 4 {
            return Err(GeometryError::OpenMesh(triangles.len()));
        }

        let mesh = Self {
            vertices,
            triangles,
        };

        let mut edges: HashMap<(u32, u32), u32> = HashMap::new();
        for (i, tri) in mesh.triangles.iter().enumerate() {
            let [a, b, c] = mesh.corners(i);
            if (b - a).cross(c - a).length_squared() < 1e-24 {
                return Err(GeometryError::DegenerateTriangle(i));
            }
            for (p, q) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                *edges.entry((p.min(q), p.max(q))).or_insert(0) += 1;
            }
        }
        if edges.values().any(|&count| count != 2) {
            return Err(GeometryError::OpenMesh(mesh.triangles.len()));
        }
        Ok(mesh)
    }

    /// Load an ASCII STL file. Vertices are deduplicated exactly, so the
    /// facets of a watertight export knit back into a closed mesh.
    pub fn from_stl(path: &Path) -> Result<Self, GeometryError> {
        let text = std::fs::read_to_string(path).map_err(|e| GeometryError::BadMeshFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let bad = |reason: &str| GeometryError::BadMeshFile {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let mut vertices: Vec<[f32; 3]> = Vec::new();
        let mut index: HashMap<[u32; 3], u32> = HashMap::new();
        let mut triangles: Vec<[u32; 3]> = Vec::new();
        let mut pending: Vec<u32> = Vec::new();

        for line in text.lines() {
            let mut words = line.split_whitespace();
            if words.next() != Some("vertex") {
                continue;
            }
            let mut v = [0.0f32; 3];
            for slot in &mut v {
                *slot = words
                    .next()
                    .and_then(|w| w.parse::<f32>().ok())
                    .ok_or_else(|| bad("malformed vertex line"))?;
            }
            let key = [v[0].to_bits(), v[1].to_bits(), v[2].to_bits()];
            let id = *index.entry(key).or_insert_with(|| {
                vertices.push(v);
                (vertices.len() - 1) as u32
            });
            pending.push(id);
            if pending.len() == 3 {
                triangles.push([pending[0], pending[1], pending[2]]);
                pending.clear();
            }
        }
        if !pending.is_empty() {
            return Err(bad("facet with fewer than three vertices"));
        }
        Self::new(vertices, triangles)
    }

    fn vertex(&self, i: u32) -> DVec3 {
        let [x, y, z] = self.vertices[i as usize];
        DVec3::new(x as f64, y as f64, z as f64)
    }

    fn corners(&self, triangle: usize) -> [DVec3; 3] {
        let [a, b, c] = self.triangles[triangle];
        [self.vertex(a), self.vertex(b), self.vertex(c)]
    }

    /// Moeller-Trumbore over every triangle; t > [`EPS`], unsorted.
    pub fn intersections(&self, origin: DVec3, direction: DVec3) -> SurfaceHits {
        let mut hits: SurfaceHits = smallvec![];
        for i in 0..self.triangles.len() {
            if let Some(t) = self.intersect_triangle(i, origin, direction) {
                hits.push(SurfaceHit {
                    t,
                    facet: Facet::Triangle(i as u32),
                });
            }
        }
        hits
    }

    fn intersect_triangle(&self, triangle: usize, origin: DVec3, direction: DVec3) -> Option<f64> {
        let [v0, v1, v2] = self.corners(triangle);
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let p = direction.cross(e2);
        let det = e1.dot(p);
        if det.abs() < 1e-15 {
            return None;
        }
        let inv = 1.0 / det;
        let s = origin - v0;
        let u = s.dot(p) * inv;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(e1);
        let v = direction.dot(q) * inv;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(q) * inv;
        (t > EPS).then_some(t)
    }

    /// Parity containment: count surface crossings along a fixed direction.
    pub fn locate(&self, point: DVec3) -> Location {
        if self.distance_to_surface(point) <= EPS {
            return Location::Surface;
        }
        let crossings = self.intersections(point, PARITY_DIRECTION).len();
        if crossings % 2 == 1 {
            Location::Inside
        } else {
            Location::Outside
        }
    }

    /// Face normal of the hit triangle, from the stored winding.
    pub fn normal(&self, facet: Facet) -> DVec3 {
        let triangle = match facet {
            Facet::Triangle(i) => i as usize,
            _ => 0,
        };
        let [v0, v1, v2] = self.corners(triangle);
        (v1 - v0).cross(v2 - v0).normalize()
    }

    fn distance_to_surface(&self, point: DVec3) -> f64 {
        (0..self.triangles.len())
            .map(|i| {
                let [a, b, c] = self.corners(i);
                point_triangle_distance(point, a, b, c)
            })
            .fold(f64::INFINITY, f64::min)
    }
}

/// Euclidean distance from a point to a triangle, clamping the projection to
/// the triangle's edges.
fn point_triangle_distance(p: DVec3, a: DVec3, b: DVec3, c: DVec3) -> f64 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return ap.length();
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return bp.length();
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return (ap - v * ab).length();
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return cp.length();
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return (ap - w * ac).length();
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (bp - w * (c - b)).length();
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    (ap - v * ab - w * ac).length()
}
