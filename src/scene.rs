//! Scene: the node graph plus the world-space query services the tracing
//! engine depends on.
//!
//! The scene aggregates every node intersection along a world ray into one
//! globally ordered list, resolves which node contains a point, and
//! classifies the next boundary crossing (leaving the container, entering a
//! child, or crossing a touching interface into a sibling).

use glam::DVec3;
use rand_chacha::ChaCha20Rng;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::geometry::{Facet, Location, EPS};
use crate::material::Material;
use crate::node::{Graph, Node, NodeId};
use crate::ray::Ray;
use crate::transform::Transform;

/// One world-space surface crossing, tagged with its node.
#[derive(Debug, Clone)]
pub struct Intersection {
    /// Node whose geometry was crossed.
    pub node: NodeId,
    /// Ray parameter of the crossing (world units).
    pub t: f64,
    /// Crossing point in world coordinates.
    pub point: DVec3,
    /// Which part of the geometry's surface was crossed.
    pub facet: Facet,
    /// Outward unit normal of the crossed geometry, world frame.
    pub normal: DVec3,
}

/// Classification of the next boundary along a ray.
#[derive(Debug, Clone)]
pub struct RayStatus {
    /// The first crossing along the ray.
    pub hit: Intersection,
    /// Node on the far side of the crossing; `None` when the crossing is
    /// the outer world boundary (the ray is about to exit).
    pub adjacent: Option<NodeId>,
}

/// Immutable scene: node graph plus derived caches.
#[derive(Debug)]
pub struct Scene {
    graph: Graph,
    world: Vec<Transform>,
    inverse: Vec<Transform>,
    by_name: HashMap<String, NodeId>,
    names: Vec<Arc<str>>,
    default_material: Material,
}

impl Scene {
    /// Freeze a graph into a scene, validating the invariants the engine
    /// relies on: a rooted tree with unique clean names, a root geometry,
    /// and every child node placed inside it.
    pub fn new(graph: Graph) -> Result<Self, ConfigError> {
        if graph.is_empty() {
            return Err(ConfigError::MissingWorld);
        }
        let root = NodeId(0);
        if graph.node(root).geometry.is_none() {
            return Err(ConfigError::MissingWorld);
        }

        let mut by_name = HashMap::new();
        for id in graph.ids() {
            let name = &graph.node(id).name;
            if name.contains(',') || name.contains('\n') {
                return Err(ConfigError::ReservedCharacter(name.clone()));
            }
            if by_name.insert(name.clone(), id).is_some() {
                return Err(ConfigError::DuplicateNode(name.clone()));
            }
        }

        let world = graph.world_transforms();
        let inverse: Vec<Transform> = world.iter().map(Transform::inverse).collect();
        let names = graph
            .ids()
            .map(|id| Arc::from(graph.node(id).name.as_str()))
            .collect();

        let scene = Self {
            graph,
            world,
            inverse,
            by_name,
            names,
            default_material: Material::air(),
        };

        // The world must enclose everything; checking each node's origin
        // catches the common misconfigurations cheaply.
        for id in scene.graph.ids().skip(1) {
            let origin = scene.world[id.0 as usize].point(DVec3::ZERO);
            if scene.locate_in(scene.root(), origin) != Location::Inside {
                return Err(ConfigError::WorldTooSmall(scene.graph.node(id).name.clone()));
            }
        }
        Ok(scene)
    }

    /// The root ("world") node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The underlying node graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Node data behind an id.
    pub fn node(&self, id: NodeId) -> &Node {
        self.graph.node(id)
    }

    /// Name of a node.
    pub fn name(&self, id: NodeId) -> &str {
        &self.graph.node(id).name
    }

    /// Shared handle to a node's name, for event records.
    pub fn name_arc(&self, id: NodeId) -> Arc<str> {
        self.names[id.0 as usize].clone()
    }

    /// Look a node up by name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// World pose of a node.
    pub fn world_transform(&self, id: NodeId) -> &Transform {
        &self.world[id.0 as usize]
    }

    /// The material filling a node's geometry; nodes without an explicit
    /// material behave as air.
    pub fn material_of(&self, id: NodeId) -> &Material {
        self.graph
            .node(id)
            .material
            .as_ref()
            .unwrap_or(&self.default_material)
    }

    /// Ids of all nodes carrying a light.
    pub fn lights(&self) -> Vec<NodeId> {
        self.graph
            .ids()
            .filter(|&id| self.graph.node(id).light.is_some())
            .collect()
    }

    /// Classify a world point against one node's geometry.
    fn locate_in(&self, id: NodeId, point: DVec3) -> Location {
        match &self.graph.node(id).geometry {
            Some(geometry) => geometry.locate(self.inverse[id.0 as usize].point(point)),
            None => Location::Outside,
        }
    }

    /// The deepest node whose geometry strictly contains the point, or
    /// `None` when the point is outside the world.
    pub fn container(&self, point: DVec3) -> Option<NodeId> {
        if self.locate_in(self.root(), point) != Location::Inside {
            return None;
        }
        let mut deepest = self.root();
        for id in self.graph.depth_first() {
            if self.graph.node(id).geometry.is_none() {
                continue;
            }
            if self.graph.depth(id) > self.graph.depth(deepest)
                && self.locate_in(id, point) == Location::Inside
            {
                deepest = id;
            }
        }
        Some(deepest)
    }

    /// Every surface crossing along the world ray with t > [`EPS`], ordered
    /// ascending in t. Crossings within [`EPS`] of each other are ordered
    /// exits first, then by nesting depth (outer first among exits, inner
    /// first among entries), then by node name.
    pub fn intersections(&self, origin: DVec3, direction: DVec3) -> Vec<Intersection> {
        let mut all = Vec::new();
        for id in self.graph.ids() {
            let Some(geometry) = &self.graph.node(id).geometry else {
                continue;
            };
            let inv = &self.inverse[id.0 as usize];
            let local_origin = inv.point(origin);
            let local_direction = inv.vector(direction);
            for hit in geometry.intersections(local_origin, local_direction) {
                let local_point = local_origin + hit.t * local_direction;
                let normal = self.world[id.0 as usize]
                    .vector(geometry.normal(local_point, hit.facet));
                all.push(Intersection {
                    node: id,
                    t: hit.t,
                    point: origin + hit.t * direction,
                    facet: hit.facet,
                    normal,
                });
            }
        }
        all.sort_by(|a, b| self.order(a, b, direction));
        all
    }

    fn order(&self, a: &Intersection, b: &Intersection, direction: DVec3) -> Ordering {
        if (a.t - b.t).abs() > EPS {
            return a.t.partial_cmp(&b.t).expect("finite t");
        }
        // Tied crossings: the surface being exited comes before the one
        // being entered, so the engine leaves the container first. Within
        // one group the depth ordering flips: leaving resolves the outer
        // surface first, entering resolves the inner one first, so the ray
        // lands directly in the deepest region it has crossed into.
        let a_exit = direction.dot(a.normal) > 0.0;
        let b_exit = direction.dot(b.normal) > 0.0;
        let a_depth = self.graph.depth(a.node);
        let b_depth = self.graph.depth(b.node);
        b_exit
            .cmp(&a_exit)
            .then_with(|| {
                if a_exit {
                    a_depth.cmp(&b_depth)
                } else {
                    b_depth.cmp(&a_depth)
                }
            })
            .then_with(|| self.name(a.node).cmp(self.name(b.node)))
    }

    /// Classify the first crossing of an intersection list for a ray whose
    /// container is known.
    ///
    /// Leaving the container through a face that coincides with a
    /// neighbour's face crosses directly into the neighbour; otherwise a
    /// departure surfaces into the container's parent. Hitting any other
    /// node's surface means entering it.
    pub fn ray_status(&self, container: NodeId, intersections: &[Intersection]) -> Option<RayStatus> {
        let hit = intersections.first()?.clone();
        let adjacent = if hit.node == container {
            if container == self.root() {
                None
            } else {
                match intersections.get(1) {
                    Some(second)
                        if second.node != container && (second.t - hit.t).abs() <= EPS =>
                    {
                        Some(second.node)
                    }
                    _ => self.graph.parent(container),
                }
            }
        } else {
            Some(hit.node)
        };
        Some(RayStatus { hit, adjacent })
    }

    /// Lazy, finite sequence of world-space rays from a light-carrying node.
    pub fn emit<'a>(
        &'a self,
        node: NodeId,
        rng: &'a mut ChaCha20Rng,
        count: usize,
    ) -> Result<Emission<'a>, ConfigError> {
        if self.graph.node(node).light.is_none() {
            return Err(ConfigError::NoLight(self.name(node).to_string()));
        }
        Ok(Emission {
            scene: self,
            node,
            source: self.name_arc(node),
            rng,
            remaining: count,
        })
    }
}

/// Iterator over rays emitted by one light node. Non-restartable; seed the
/// generator to reproduce a sequence.
pub struct Emission<'a> {
    scene: &'a Scene,
    node: NodeId,
    source: Arc<str>,
    rng: &'a mut ChaCha20Rng,
    remaining: usize,
}

impl Iterator for Emission<'_> {
    type Item = Ray;

    fn next(&mut self) -> Option<Ray> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let light = self.scene.node(self.node).light.as_ref()?;
        let (position, direction, wavelength) = light.sample(self.rng);
        let world = self.scene.world_transform(self.node);
        Some(Ray::new(
            world.point(position),
            world.vector(direction),
            wavelength,
            self.source.clone(),
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cuboid::Cuboid;
    use crate::geometry::Geometry;
    use crate::light::Light;
    use crate::sphere::Sphere;
    use rand::SeedableRng;

    fn sphere(radius: f64) -> Geometry {
        Geometry::Sphere(Sphere::new(radius).unwrap())
    }

    fn cube() -> Geometry {
        Geometry::Cuboid(Cuboid::new(DVec3::ONE).unwrap())
    }

    /// Glass cube embedded in an air world.
    fn embedded() -> (Scene, NodeId, NodeId) {
        let mut graph = Graph::new();
        let world = graph.add(
            Node::new("world")
                .with_geometry(sphere(10.0))
                .with_material(Material::air()),
            None,
        );
        let cube_id = graph.add(
            Node::new("box")
                .with_geometry(cube())
                .with_material(Material::dielectric(1.5)),
            Some(world),
        );
        (Scene::new(graph).unwrap(), world, cube_id)
    }

    /// Three glass cubes stacked face to face along z.
    fn touching() -> (Scene, NodeId, [NodeId; 3]) {
        let mut graph = Graph::new();
        let world = graph.add(
            Node::new("world")
                .with_geometry(sphere(10.0))
                .with_material(Material::air()),
            None,
        );
        let mut boxes = Vec::new();
        for (i, z) in [0.0, 1.0, 2.0].iter().enumerate() {
            boxes.push(graph.add(
                Node::new(format!("box{}", i + 1))
                    .with_geometry(cube())
                    .with_material(Material::dielectric(1.5))
                    .with_transform(Transform::from_translation(DVec3::new(0.0, 0.0, *z))),
                Some(world),
            ));
        }
        (
            Scene::new(graph).unwrap(),
            world,
            [boxes[0], boxes[1], boxes[2]],
        )
    }

    #[test]
    fn scene_requires_world_geometry() {
        let mut graph = Graph::new();
        graph.add(Node::new("world"), None);
        assert!(matches!(
            Scene::new(graph),
            Err(ConfigError::MissingWorld)
        ));
    }

    #[test]
    fn scene_rejects_children_outside_world() {
        let mut graph = Graph::new();
        let world = graph.add(Node::new("world").with_geometry(sphere(1.0)), None);
        graph.add(
            Node::new("far")
                .with_geometry(cube())
                .with_transform(Transform::from_translation(DVec3::new(5.0, 0.0, 0.0))),
            Some(world),
        );
        assert!(matches!(
            Scene::new(graph),
            Err(ConfigError::WorldTooSmall(name)) if name == "far"
        ));
    }

    #[test]
    fn scene_rejects_duplicate_names() {
        let mut graph = Graph::new();
        let world = graph.add(Node::new("world").with_geometry(sphere(10.0)), None);
        graph.add(Node::new("a").with_geometry(cube()), Some(world));
        graph.add(Node::new("a").with_geometry(cube()), Some(world));
        assert!(matches!(
            Scene::new(graph),
            Err(ConfigError::DuplicateNode(name)) if name == "a"
        ));
    }

    #[test]
    fn container_resolution_embedded() {
        let (scene, world, cube_id) = embedded();
        assert_eq!(scene.container(DVec3::new(0.0, 0.0, -1.0)), Some(world));
        assert_eq!(scene.container(DVec3::new(0.0, 0.0, -0.4)), Some(cube_id));
        assert_eq!(scene.container(DVec3::new(0.0, 0.0, 0.6)), Some(world));
        assert_eq!(scene.container(DVec3::new(0.0, 0.0, 20.0)), None);
    }

    #[test]
    fn container_resolution_touching() {
        let (scene, world, [b1, b2, b3]) = touching();
        assert_eq!(scene.container(DVec3::new(0.0, 0.0, -1.0)), Some(world));
        assert_eq!(scene.container(DVec3::new(0.0, 0.0, -0.4)), Some(b1));
        assert_eq!(scene.container(DVec3::new(0.0, 0.0, 0.6)), Some(b2));
        assert_eq!(scene.container(DVec3::new(0.0, 0.0, 1.6)), Some(b3));
        assert_eq!(scene.container(DVec3::new(0.0, 0.0, 2.6)), Some(world));
    }

    #[test]
    fn intersections_are_globally_ordered() {
        let (scene, world, [b1, b2, b3]) = touching();
        let hits = scene.intersections(DVec3::new(0.0, 0.0, -1.0), DVec3::Z);
        let nodes: Vec<NodeId> = hits.iter().map(|h| h.node).collect();
        assert_eq!(nodes, vec![b1, b1, b2, b2, b3, b3, world]);
        assert!(hits.windows(2).all(|w| w[0].t <= w[1].t + EPS));
    }

    #[test]
    fn entry_ties_resolve_inner_surface_first() {
        // Inner cube flush with the outer cube's -z face: a ray from below
        // crosses both entry surfaces at the same t and must land in the
        // deepest region straight away
        let mut graph = Graph::new();
        let world = graph.add(
            Node::new("world")
                .with_geometry(sphere(10.0))
                .with_material(Material::air()),
            None,
        );
        let outer = graph.add(
            Node::new("outer")
                .with_geometry(Geometry::Cuboid(Cuboid::new(DVec3::splat(2.0)).unwrap()))
                .with_material(Material::dielectric(1.5)),
            Some(world),
        );
        let inner = graph.add(
            Node::new("inner")
                .with_geometry(cube())
                .with_material(Material::dielectric(1.5))
                .with_transform(Transform::from_translation(DVec3::new(0.0, 0.0, -0.5))),
            Some(outer),
        );
        let scene = Scene::new(graph).unwrap();

        let hits = scene.intersections(DVec3::new(0.0, 0.0, -2.0), DVec3::Z);
        assert!((hits[0].t - hits[1].t).abs() <= EPS);
        assert_eq!(hits[0].node, inner);
        assert_eq!(hits[1].node, outer);

        let status = scene.ray_status(world, &hits).unwrap();
        assert_eq!(status.hit.node, inner);
        assert_eq!(status.adjacent, Some(inner));

        // Leaving through the shared face flips the depth ordering: among
        // tied exits the outer surface resolves first
        let hits = scene.intersections(DVec3::new(0.0, 0.0, -0.6), DVec3::NEG_Z);
        assert!((hits[0].t - hits[1].t).abs() <= EPS);
        assert_eq!(hits[0].node, outer);
        assert_eq!(hits[1].node, inner);
    }

    #[test]
    fn ray_inside_world_always_intersects() {
        let (scene, _, _) = embedded();
        let hits = scene.intersections(DVec3::new(3.0, -2.0, 1.0), DVec3::new(0.3, 0.9, -0.1).normalize());
        assert!(!hits.is_empty());
    }

    #[test]
    fn ray_status_embedded() {
        let (scene, world, cube_id) = embedded();

        // Outside the cube, heading at it: entering
        let hits = scene.intersections(DVec3::new(0.0, 0.0, -1.0), DVec3::Z);
        let status = scene.ray_status(world, &hits).unwrap();
        assert_eq!(status.hit.node, cube_id);
        assert_eq!(status.adjacent, Some(cube_id));

        // Inside the cube: leaving into the parent
        let hits = scene.intersections(DVec3::new(0.0, 0.0, -0.4), DVec3::Z);
        let status = scene.ray_status(cube_id, &hits).unwrap();
        assert_eq!(status.hit.node, cube_id);
        assert_eq!(status.adjacent, Some(world));

        // Past the cube: next stop is the world boundary
        let hits = scene.intersections(DVec3::new(0.0, 0.0, 0.6), DVec3::Z);
        let status = scene.ray_status(world, &hits).unwrap();
        assert_eq!(status.hit.node, world);
        assert_eq!(status.adjacent, None);
    }

    #[test]
    fn ray_status_touching() {
        let (scene, world, [b1, b2, b3]) = touching();

        let hits = scene.intersections(DVec3::new(0.0, 0.0, -0.4), DVec3::Z);
        let status = scene.ray_status(b1, &hits).unwrap();
        assert_eq!(status.hit.node, b1);
        assert_eq!(status.adjacent, Some(b2));

        let hits = scene.intersections(DVec3::new(0.0, 0.0, 0.6), DVec3::Z);
        let status = scene.ray_status(b2, &hits).unwrap();
        assert_eq!(status.adjacent, Some(b3));

        let hits = scene.intersections(DVec3::new(0.0, 0.0, 1.6), DVec3::Z);
        let status = scene.ray_status(b3, &hits).unwrap();
        assert_eq!(status.adjacent, Some(world));

        let hits = scene.intersections(DVec3::new(0.0, 0.0, 2.6), DVec3::Z);
        let status = scene.ray_status(world, &hits).unwrap();
        assert_eq!(status.adjacent, None);
    }

    #[test]
    fn emission_transforms_to_world_frame() {
        let mut graph = Graph::new();
        let world = graph.add(
            Node::new("world")
                .with_geometry(sphere(10.0))
                .with_material(Material::air()),
            None,
        );
        let lamp = graph.add(
            Node::new("lamp")
                .with_light(Light::new())
                .with_transform(Transform::new(
                    DVec3::new(0.0, 0.0, 2.0),
                    DVec3::X,
                    std::f64::consts::PI,
                )),
            Some(world),
        );
        let scene = Scene::new(graph).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let rays: Vec<Ray> = scene.emit(lamp, &mut rng, 3).unwrap().collect();
        assert_eq!(rays.len(), 3);
        for ray in &rays {
            // Flipped to point along -z from z = 2
            assert!((ray.position - DVec3::new(0.0, 0.0, 2.0)).length() < 1e-12);
            assert!((ray.direction - DVec3::NEG_Z).length() < 1e-9);
            assert_eq!(&*ray.source, "lamp");
        }
    }

    #[test]
    fn emit_requires_a_light() {
        let (scene, world, _) = embedded();
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        assert!(scene.emit(world, &mut rng, 1).is_err());
    }
}
