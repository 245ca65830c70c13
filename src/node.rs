//! Scene-graph nodes.
//!
//! Nodes live in an arena and refer to each other by index, so the tree can
//! hold parent links without ownership cycles. Each node owns a local pose
//! relative to its parent plus optional geometry, material and light
//! attachments. The graph is only mutated while the scene is being built.

use std::sync::Arc;

use crate::geometry::Geometry;
use crate::light::Light;
use crate::material::Material;
use crate::surface::Surface;
use crate::transform::Transform;

/// Arena index of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

/// One coordinate system in the scene.
#[derive(Debug)]
pub struct Node {
    /// Unique name, used in event records.
    pub name: String,
    /// Pose relative to the parent node.
    pub transform: Transform,
    /// Closed surface attached to this node, if any.
    pub geometry: Option<Geometry>,
    /// Volume material filling the geometry, if any.
    pub material: Option<Material>,
    /// Light source emitting in this node's frame, if any.
    pub light: Option<Light>,
    /// Boundary behaviour of this node's surface; Fresnel when absent.
    pub surface: Option<Arc<dyn Surface>>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) depth: u32,
}

impl Node {
    /// A bare node with an identity pose and no attachments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            geometry: None,
            material: None,
            light: None,
            surface: None,
            parent: None,
            children: Vec::new(),
            depth: 0,
        }
    }

    /// Set the local pose.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Attach a geometry.
    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Attach a volume material.
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    /// Attach a light source.
    pub fn with_light(mut self, light: Light) -> Self {
        self.light = Some(light);
        self
    }

    /// Override the default Fresnel surface behaviour.
    pub fn with_surface(mut self, surface: Arc<dyn Surface>) -> Self {
        self.surface = Some(surface);
        self
    }
}

/// Arena of nodes forming a tree rooted at index 0.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node under `parent` (`None` only for the first, root node)
    /// and return its id.
    pub fn add(&mut self, mut node: Node, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        node.parent = parent;
        node.depth = match parent {
            Some(p) => {
                self.nodes[p.0 as usize].children.push(id);
                self.nodes[p.0 as usize].depth + 1
            }
            None => 0,
        };
        self.nodes.push(node);
        id
    }

    /// The node behind an id.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    /// Parent of a node, `None` at the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Nesting depth, zero at the root.
    pub fn depth(&self, id: NodeId) -> u32 {
        self.node(id).depth
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no node has been added yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(|i| NodeId(i as u32))
    }

    /// Ids of nodes in depth-first order starting at the root.
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        if self.nodes.is_empty() {
            return order;
        }
        let mut stack = vec![NodeId(0)];
        while let Some(id) = stack.pop() {
            order.push(id);
            // Reverse keeps sibling visitation in insertion order
            for &child in self.node(id).children.iter().rev() {
                stack.push(child);
            }
        }
        order
    }

    /// World pose of every node, indexed like the arena. The product of each
    /// node's ancestors' local poses, recomputed whenever the graph changes.
    pub fn world_transforms(&self) -> Vec<Transform> {
        let mut world = vec![Transform::IDENTITY; self.nodes.len()];
        for id in self.depth_first() {
            let node = self.node(id);
            world[id.0 as usize] = match node.parent {
                Some(p) => world[p.0 as usize].then(&node.transform),
                None => node.transform,
            };
        }
        world
    }
}
