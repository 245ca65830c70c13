//! Error taxonomy for scene construction and tracing.
//!
//! Configuration and geometry errors are reported before any ray is traced.
//! Trace errors are contained to the offending ray; sink errors abort the
//! batch so the caller never receives silently truncated data.

use std::path::PathBuf;

/// Errors raised while interpreting a scene document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document version is missing or not understood.
    #[error("unsupported scene version {0:?}")]
    UnsupportedVersion(String),

    /// A node references a material component that was never declared.
    #[error("node {node:?} references undefined component {component:?}")]
    UndefinedComponent {
        /// Referencing node name.
        node: String,
        /// Missing component name.
        component: String,
    },

    /// A node references a parent that was never declared.
    #[error("node {node:?} references undefined parent {parent:?}")]
    UndefinedParent {
        /// Referencing node name.
        node: String,
        /// Missing parent name.
        parent: String,
    },

    /// Two nodes share the same name.
    #[error("duplicate node name {0:?}")]
    DuplicateNode(String),

    /// The parent graph contains a cycle.
    #[error("cycle in parent graph involving node {0:?}")]
    ParentCycle(String),

    /// No node named `world` without a parent exists.
    #[error("scene has no root node named \"world\"")]
    MissingWorld,

    /// A node descriptor has no geometry and no light.
    #[error("node {0:?} carries neither geometry nor light")]
    EmptyNode(String),

    /// The world geometry does not enclose one of its nodes.
    #[error("world geometry does not contain node {0:?}")]
    WorldTooSmall(String),

    /// Ray emission was requested from a node without a light.
    #[error("node {0:?} has no light attached")]
    NoLight(String),

    /// A component descriptor is internally inconsistent.
    #[error("component {name:?}: {reason}")]
    BadComponent {
        /// Component name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A node descriptor is internally inconsistent.
    #[error("node {node:?}: {reason}")]
    BadNode {
        /// Node name.
        node: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A spectrum file could not be read or parsed.
    #[error("spectrum file {path:?}: {reason}")]
    BadSpectrum {
        /// Offending file.
        path: PathBuf,
        /// Parse or I/O failure description.
        reason: String,
    },

    /// Built-in spectra are provided by an external catalogue, not the core.
    #[error("built-in spectrum {0:?} is not available")]
    UnknownSpectrum(String),

    /// Node names end up in CSV logs, so the delimiter is reserved.
    #[error("name {0:?} contains a reserved character")]
    ReservedCharacter(String),

    /// The YAML document itself failed to parse.
    #[error("scene document: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The scene file could not be read.
    #[error("scene file {path:?}: {source}")]
    Io {
        /// Offending file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors raised while validating geometry primitives.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// Sphere or cylinder radius, or box edge, must be strictly positive.
    #[error("{what} must be strictly positive, got {value}")]
    NonPositive {
        /// Offending parameter.
        what: &'static str,
        /// Its value.
        value: f64,
    },

    /// A mesh needs at least four faces to close a volume.
    #[error("mesh has {0} faces, too few to enclose a volume")]
    OpenMesh(usize),

    /// A triangle with zero area cannot carry a normal.
    #[error("degenerate triangle at index {0}")]
    DegenerateTriangle(usize),

    /// An STL file could not be read or parsed.
    #[error("mesh file {path:?}: {reason}")]
    BadMeshFile {
        /// Offending file.
        path: PathBuf,
        /// Parse or I/O failure description.
        reason: String,
    },
}

/// Per-ray numerical failures. These are contained: the offending ray is
/// terminated with an error event and the batch continues.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TraceError {
    /// Position, direction or wavelength became non-finite.
    #[error("non-finite ray state: {0}")]
    NonFinite(&'static str),

    /// The direction vector collapsed to zero length.
    #[error("zero-length direction")]
    ZeroDirection,

    /// A ray strictly inside the world produced no intersections.
    #[error("no intersections while inside {0:?}")]
    NoIntersections(String),

    /// Container resolution failed to name any node.
    #[error("container resolution failed at {0:?}")]
    NoContainer(String),

    /// An attenuating material failed to name an interaction component.
    #[error("component selection failed in {0:?}")]
    NoComponent(String),
}

/// Event-log write failure. Aborts the batch.
#[derive(Debug, thiserror::Error)]
#[error("event sink: {0}")]
pub struct SinkError(#[from] pub std::io::Error);

/// Top-level error for library entry points.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Scene document problem; reported before tracing starts.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Invalid primitive parameters; reported at scene construction.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    /// Event-log write failure.
    #[error(transparent)]
    Sink(#[from] SinkError),
}
