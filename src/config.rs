//! Declarative scene documents.
//!
//! A YAML document enumerates nodes, geometries, materials, components and
//! light sources; this module validates it and builds the runtime scene.
//! Spectra are loaded from two-column CSV files resolved relative to the
//! document.

use glam::{DMat3, DVec3};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cuboid::Cuboid;
use crate::cylinder::Cylinder;
use crate::error::{ConfigError, Error};
use crate::geometry::Geometry;
use crate::light::{Divergence, Light, PositionMask, WavelengthSampler};
use crate::material::{
    Absorber, Component, Luminophore, Material, PhaseFunction, Reactor, Scatterer,
};
use crate::mesh::Mesh;
use crate::node::{Graph, Node};
use crate::scene::Scene;
use crate::spectrum::{linspace, Distribution, Spectrum};
use crate::sphere::Sphere;
use crate::transform::Transform;

/// Supported document version.
const VERSION: &str = "1.0";

/// Top-level scene document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneDoc {
    /// Schema version; must be `"1.0"`.
    pub version: String,
    /// Node name to descriptor.
    pub nodes: HashMap<String, NodeDoc>,
    /// Component name to descriptor.
    #[serde(default)]
    pub components: HashMap<String, ComponentDoc>,
}

/// One node of the scene graph.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeDoc {
    /// Translation relative to the parent.
    #[serde(default)]
    pub location: Option<[f64; 3]>,
    /// Rotation relative to the parent.
    #[serde(default)]
    pub rotation: Option<RotationDoc>,
    /// Parent node name; defaults to `world`.
    #[serde(default)]
    pub parent: Option<String>,
    /// Sphere geometry.
    #[serde(default)]
    pub sphere: Option<SphereDoc>,
    /// Box geometry.
    #[serde(default, rename = "box")]
    pub cuboid: Option<BoxDoc>,
    /// Cylinder geometry.
    #[serde(default)]
    pub cylinder: Option<CylinderDoc>,
    /// Triangle-mesh geometry.
    #[serde(default)]
    pub mesh: Option<MeshDoc>,
    /// Attached light source.
    #[serde(default)]
    pub light: Option<LightDoc>,
}

/// Axis-angle (degrees) or explicit matrix rotation.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RotationDoc {
    /// Rotate about `axis` by `angle` degrees.
    AxisAngle {
        /// Rotation axis, not necessarily normalised.
        axis: [f64; 3],
        /// Angle in degrees.
        angle: f64,
    },
    /// Row-major 3x3 rotation matrix.
    Matrix {
        /// The matrix rows.
        matrix: [[f64; 3]; 3],
    },
}

/// Sphere descriptor.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SphereDoc {
    /// Radius in scene units.
    pub radius: f64,
    /// Volume material.
    pub material: MaterialDoc,
}

/// Box descriptor.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoxDoc {
    /// Full edge lengths.
    pub size: [f64; 3],
    /// Volume material.
    pub material: MaterialDoc,
}

/// Cylinder descriptor.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CylinderDoc {
    /// Radius of the curved surface.
    pub radius: f64,
    /// Full length along the local z axis.
    pub length: f64,
    /// Volume material.
    pub material: MaterialDoc,
}

/// Mesh descriptor.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeshDoc {
    /// ASCII STL file, relative to the document.
    pub file: PathBuf,
    /// Volume material.
    pub material: MaterialDoc,
}

/// Material descriptor.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialDoc {
    /// Scalar index or a tabulated spectrum.
    #[serde(rename = "refractive-index")]
    pub refractive_index: IndexDoc,
    /// Names of components mixed into the volume.
    #[serde(default)]
    pub components: Vec<String>,
}

/// Refractive index: scalar or spectrum reference.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IndexDoc {
    /// Constant index.
    Scalar(f64),
    /// Wavelength-dependent index.
    Spectrum(SpectrumRef),
}

/// Reference to a tabulated spectrum.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpectrumRef {
    /// Name in an external catalogue (not provided by the core).
    #[serde(default)]
    pub name: Option<String>,
    /// Two-column CSV file, relative to the document.
    #[serde(default)]
    pub csv: Option<PathBuf>,
}

/// Component descriptor.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentDoc {
    /// One of `absorber`, `scatterer`, `luminophore`, `reactor`.
    pub kind: ComponentKindDoc,
    /// Absorption channel.
    #[serde(default)]
    pub absorption: Option<AbsorptionDoc>,
    /// Emission channel (luminophores and scatterers).
    #[serde(default)]
    pub emission: Option<EmissionDoc>,
}

/// Component families recognised by the document.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKindDoc {
    /// Pure absorber.
    Absorber,
    /// Elastic scatterer.
    Scatterer,
    /// Absorbing re-emitter.
    Luminophore,
    /// Photochemical absorber.
    Reactor,
}

/// Absorption half of a component.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AbsorptionDoc {
    /// Peak coefficient in inverse scene units.
    #[serde(default)]
    pub coefficient: Option<f64>,
    /// Spectrum shape.
    #[serde(default)]
    pub spectrum: Option<SpectrumRef>,
    /// Resampling grid `[lo, hi, step]` in nanometers.
    #[serde(default)]
    pub range: Option<[f64; 3]>,
    /// Treat the spectrum as a step histogram.
    #[serde(default)]
    pub hist: bool,
}

/// Emission half of a component.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmissionDoc {
    /// Probability of re-emission per absorption.
    #[serde(default, rename = "quantum-yield")]
    pub quantum_yield: Option<f64>,
    /// Angular distribution of re-emission.
    #[serde(default, rename = "phase-function")]
    pub phase_function: Option<PhaseDoc>,
    /// Emission spectrum shape.
    #[serde(default)]
    pub spectrum: Option<SpectrumRef>,
    /// Resampling grid `[lo, hi, step]` in nanometers.
    #[serde(default)]
    pub range: Option<[f64; 3]>,
    /// Treat the spectrum as a step histogram.
    #[serde(default)]
    pub hist: bool,
}

/// Phase-function descriptor.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseDoc {
    /// Uniform over the sphere.
    Isotropic,
    /// Henyey-Greenstein with asymmetry `g`.
    HenyeyGreenstein {
        /// Mean scattering cosine.
        g: f64,
    },
}

/// Light descriptor.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LightDoc {
    /// Monochromatic wavelength in nanometers.
    #[serde(default)]
    pub wavelength: Option<f64>,
    /// Emission spectrum to sample wavelengths from.
    #[serde(default)]
    pub spectrum: Option<SpectrumRef>,
    /// Position and direction masks.
    #[serde(default)]
    pub mask: Option<MaskDoc>,
}

/// The two spatial masks of a light source.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaskDoc {
    /// Position over the local xy-plane.
    #[serde(default)]
    pub position: Option<PositionDoc>,
    /// Direction about the local +z axis.
    #[serde(default)]
    pub direction: Option<DirectionDoc>,
}

/// Position mask descriptor.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionDoc {
    /// Uniform over a centred a x b rectangle.
    Square([f64; 2]),
    /// Uniform over a centred disk.
    Circle(f64),
}

/// Direction mask descriptor.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionDoc {
    /// Collimated along +z.
    Collimated,
    /// Uniform cone.
    Cone {
        /// Half-angle in degrees.
        #[serde(rename = "half-angle")]
        half_angle: f64,
    },
    /// Cosine-weighted hemisphere.
    Lambertian,
}

/// Load and build a scene from a YAML file.
pub fn load(path: &Path) -> Result<Scene, Error> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: SceneDoc = serde_yaml::from_str(&text).map_err(ConfigError::Parse)?;
    let base = path.parent().unwrap_or(Path::new("."));
    build(doc, base)
}

/// Build a scene from a parsed document. `base` anchors relative paths.
pub fn build(doc: SceneDoc, base: &Path) -> Result<Scene, Error> {
    if doc.version != VERSION {
        return Err(ConfigError::UnsupportedVersion(doc.version).into());
    }

    let mut components: HashMap<String, Arc<dyn Component>> = HashMap::new();
    for (name, spec) in &doc.components {
        // Component names reach the CSV log verbatim, both as the event
        // component and as the source of re-emitted rays
        if name.contains(',') || name.contains('\n') {
            return Err(ConfigError::ReservedCharacter(name.clone()).into());
        }
        components.insert(name.clone(), build_component(name, spec, base)?);
    }

    if !doc.nodes.contains_key("world") {
        return Err(ConfigError::MissingWorld.into());
    }

    // Build every node first so descriptor problems surface before any
    // topology diagnostics.
    let mut built: HashMap<String, Node> = HashMap::new();
    let mut names: Vec<&String> = doc.nodes.keys().collect();
    names.sort();
    for name in &names {
        built.insert(
            (*name).clone(),
            build_node(name, &doc.nodes[*name], &components, base)?,
        );
    }

    // Insert parents before children; the root goes first because only the
    // world has no parent.
    let mut graph = Graph::new();
    let mut inserted: HashMap<String, crate::node::NodeId> = HashMap::new();
    let mut remaining = names;
    while !remaining.is_empty() {
        let before = remaining.len();
        remaining.retain(|name| {
            let spec = &doc.nodes[*name];
            let parent = if *name == "world" {
                None
            } else {
                let parent_name = spec.parent.as_deref().unwrap_or("world");
                match inserted.get(parent_name) {
                    Some(&id) => Some(id),
                    None => return true, // parent not inserted yet
                }
            };
            let node = built.remove(*name).expect("built above");
            inserted.insert((*name).clone(), graph.add(node, parent));
            false
        });
        if remaining.len() == before {
            let stuck = remaining[0];
            let parent = doc.nodes[stuck]
                .parent
                .clone()
                .unwrap_or_else(|| "world".to_string());
            if doc.nodes.contains_key(&parent) {
                return Err(ConfigError::ParentCycle(stuck.clone()).into());
            }
            return Err(ConfigError::UndefinedParent {
                node: stuck.clone(),
                parent,
            }
            .into());
        }
    }

    Ok(Scene::new(graph)?)
}

fn build_node(
    name: &str,
    spec: &NodeDoc,
    components: &HashMap<String, Arc<dyn Component>>,
    base: &Path,
) -> Result<Node, Error> {
    let mut node = Node::new(name);

    let translation = spec
        .location
        .map(DVec3::from_array)
        .unwrap_or(DVec3::ZERO);
    node.transform = match &spec.rotation {
        None => Transform::from_translation(translation),
        Some(RotationDoc::AxisAngle { axis, angle }) => Transform::new(
            translation,
            DVec3::from_array(*axis),
            angle.to_radians(),
        ),
        Some(RotationDoc::Matrix { matrix }) => {
            let m = DMat3::from_cols(
                DVec3::new(matrix[0][0], matrix[1][0], matrix[2][0]),
                DVec3::new(matrix[0][1], matrix[1][1], matrix[2][1]),
                DVec3::new(matrix[0][2], matrix[1][2], matrix[2][2]),
            );
            Transform::from_matrix(translation, m)
        }
    };

    let mut geometries = 0;
    if let Some(sphere) = &spec.sphere {
        node.geometry = Some(Geometry::Sphere(Sphere::new(sphere.radius)?));
        node.material = Some(build_material(name, &sphere.material, components, base)?);
        geometries += 1;
    }
    if let Some(cuboid) = &spec.cuboid {
        node.geometry = Some(Geometry::Cuboid(Cuboid::new(DVec3::from_array(
            cuboid.size,
        ))?));
        node.material = Some(build_material(name, &cuboid.material, components, base)?);
        geometries += 1;
    }
    if let Some(cylinder) = &spec.cylinder {
        node.geometry = Some(Geometry::Cylinder(Cylinder::new(
            cylinder.radius,
            cylinder.length,
        )?));
        node.material = Some(build_material(name, &cylinder.material, components, base)?);
        geometries += 1;
    }
    if let Some(mesh) = &spec.mesh {
        node.geometry = Some(Geometry::Mesh(Mesh::from_stl(&base.join(&mesh.file))?));
        node.material = Some(build_material(name, &mesh.material, components, base)?);
        geometries += 1;
    }
    if geometries > 1 {
        return Err(ConfigError::BadNode {
            node: name.to_string(),
            reason: "declares more than one geometry".to_string(),
        }
        .into());
    }

    if let Some(light) = &spec.light {
        node.light = Some(build_light(name, light, base)?);
    }

    if node.geometry.is_none() && node.light.is_none() {
        return Err(ConfigError::EmptyNode(name.to_string()).into());
    }
    Ok(node)
}

fn build_material(
    node: &str,
    spec: &MaterialDoc,
    components: &HashMap<String, Arc<dyn Component>>,
    base: &Path,
) -> Result<Material, Error> {
    let index = match &spec.refractive_index {
        IndexDoc::Scalar(n) => Spectrum::Constant(*n),
        IndexDoc::Spectrum(reference) => load_spectrum(reference, None, base)?,
    };
    let mut resolved = Vec::with_capacity(spec.components.len());
    for name in &spec.components {
        let component = components
            .get(name)
            .ok_or_else(|| ConfigError::UndefinedComponent {
                node: node.to_string(),
                component: name.clone(),
            })?;
        resolved.push(component.clone());
    }
    Ok(Material::new(index, resolved))
}

fn build_component(
    name: &str,
    spec: &ComponentDoc,
    base: &Path,
) -> Result<Arc<dyn Component>, Error> {
    let bad = |reason: &str| ConfigError::BadComponent {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let absorption = spec
        .absorption
        .as_ref()
        .ok_or_else(|| bad("missing absorption section"))?;
    let coefficient = build_absorption(absorption, base)?;

    match spec.kind {
        ComponentKindDoc::Absorber => Ok(Arc::new(Absorber::new(name, coefficient))),
        ComponentKindDoc::Reactor => Ok(Arc::new(Reactor::new(name, coefficient))),
        ComponentKindDoc::Scatterer => {
            let mut scatterer = Scatterer::new(name, coefficient);
            if let Some(emission) = &spec.emission {
                if let Some(qy) = emission.quantum_yield {
                    scatterer = scatterer.with_quantum_yield(qy);
                }
                if let Some(phase) = &emission.phase_function {
                    scatterer = scatterer.with_phase(build_phase(phase));
                }
            }
            Ok(Arc::new(scatterer))
        }
        ComponentKindDoc::Luminophore => {
            let emission = spec
                .emission
                .as_ref()
                .ok_or_else(|| bad("luminophore needs an emission section"))?;
            let reference = emission
                .spectrum
                .as_ref()
                .ok_or_else(|| bad("luminophore needs an emission spectrum"))?;
            let shape = load_spectrum(reference, emission.range, base)?;
            let Spectrum::Table { x, y } = shape else {
                return Err(bad("emission spectrum must be tabulated").into());
            };
            let distribution = Distribution::new(x, y, emission.hist)
                .map_err(|e| bad(&e.to_string()))?;
            let qy = emission.quantum_yield.unwrap_or(1.0);
            let mut luminophore = Luminophore::new(name, coefficient, distribution, qy);
            if let Some(phase) = &emission.phase_function {
                luminophore = luminophore.with_phase(build_phase(phase));
            }
            Ok(Arc::new(luminophore))
        }
    }
}

fn build_absorption(spec: &AbsorptionDoc, base: &Path) -> Result<Spectrum, Error> {
    match (&spec.coefficient, &spec.spectrum) {
        (Some(coefficient), Some(reference)) => {
            let shape = load_spectrum(reference, spec.range, base)?;
            Ok(shape.scaled_to_peak(*coefficient))
        }
        (None, Some(reference)) => load_spectrum(reference, spec.range, base),
        (Some(coefficient), None) => Ok(Spectrum::Constant(*coefficient)),
        (None, None) => Err(ConfigError::BadComponent {
            name: String::new(),
            reason: "absorption needs a coefficient or a spectrum".to_string(),
        }
        .into()),
    }
}

fn build_phase(spec: &PhaseDoc) -> PhaseFunction {
    match spec {
        PhaseDoc::Isotropic => PhaseFunction::Isotropic,
        PhaseDoc::HenyeyGreenstein { g } => PhaseFunction::HenyeyGreenstein { g: *g },
    }
}

fn build_light(name: &str, spec: &LightDoc, base: &Path) -> Result<Light, Error> {
    let mut light = Light::new();

    match (&spec.wavelength, &spec.spectrum) {
        (Some(nm), None) => {
            light = light.with_wavelength(WavelengthSampler::Constant(*nm));
        }
        (None, Some(reference)) => {
            let shape = load_spectrum(reference, None, base)?;
            let Spectrum::Table { x, y } = shape else {
                return Err(ConfigError::BadNode {
                    node: name.to_string(),
                    reason: "light spectrum must be tabulated".to_string(),
                }
                .into());
            };
            let distribution =
                Distribution::new(x, y, false).map_err(|e| ConfigError::BadNode {
                    node: name.to_string(),
                    reason: e.to_string(),
                })?;
            light = light.with_wavelength(WavelengthSampler::Spectrum(distribution));
        }
        (None, None) => {}
        (Some(_), Some(_)) => {
            return Err(ConfigError::BadNode {
                node: name.to_string(),
                reason: "light declares both a wavelength and a spectrum".to_string(),
            }
            .into());
        }
    }

    if let Some(mask) = &spec.mask {
        if let Some(position) = &mask.position {
            light = light.with_position(match position {
                PositionDoc::Square([a, b]) => PositionMask::Square { a: *a, b: *b },
                PositionDoc::Circle(radius) => PositionMask::Circle { radius: *radius },
            });
        }
        if let Some(direction) = &mask.direction {
            light = light.with_divergence(match direction {
                DirectionDoc::Collimated => Divergence::Collimated,
                DirectionDoc::Cone { half_angle } => Divergence::Cone {
                    half_angle: half_angle.to_radians(),
                },
                DirectionDoc::Lambertian => Divergence::Lambertian,
            });
        }
    }
    Ok(light)
}

fn load_spectrum(
    reference: &SpectrumRef,
    range: Option<[f64; 3]>,
    base: &Path,
) -> Result<Spectrum, Error> {
    if let Some(name) = &reference.name {
        // The built-in catalogue is an external collaborator
        return Err(ConfigError::UnknownSpectrum(name.clone()).into());
    }
    let Some(csv) = &reference.csv else {
        return Err(ConfigError::BadComponent {
            name: String::new(),
            reason: "spectrum needs a name or a csv path".to_string(),
        }
        .into());
    };
    let path = base.join(csv);
    let spectrum = read_csv_spectrum(&path)?;
    match range {
        None => Ok(spectrum),
        Some([lo, hi, step]) => {
            let grid = linspace(lo, hi, step);
            let values = grid.iter().map(|&nm| spectrum.value(nm)).collect();
            Ok(Spectrum::tabulated(grid, values).map_err(|e| ConfigError::BadSpectrum {
                path,
                reason: e.to_string(),
            })?)
        }
    }
}

/// Parse a two-column wavelength,value CSV, skipping non-numeric header
/// lines.
fn read_csv_spectrum(path: &Path) -> Result<Spectrum, Error> {
    let bad = |reason: String| ConfigError::BadSpectrum {
        path: path.to_path_buf(),
        reason,
    };
    let text = std::fs::read_to_string(path).map_err(|e| bad(e.to_string()))?;
    let mut x = Vec::new();
    let mut y = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split(',');
        let (Some(a), Some(b)) = (fields.next(), fields.next()) else {
            return Err(bad(format!("expected two columns, got {line:?}")).into());
        };
        let (Ok(nm), Ok(value)) = (a.trim().parse::<f64>(), b.trim().parse::<f64>()) else {
            if x.is_empty() {
                continue; // header line
            }
            return Err(bad(format!("non-numeric data line {line:?}")).into());
        };
        x.push(nm);
        y.push(value);
    }
    Ok(Spectrum::tabulated(x, y).map_err(|e| bad(e.to_string()))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    const MINIMAL: &str = r#"
version: "1.0"
nodes:
  world:
    sphere:
      radius: 10.0
      material:
        refractive-index: 1.0
  lamp:
    location: [0.0, 0.0, 5.0]
    rotation: { axis: [1.0, 0.0, 0.0], angle: 180.0 }
    light:
      wavelength: 555.0
"#;

    #[test]
    fn minimal_document_builds() {
        let doc: SceneDoc = serde_yaml::from_str(MINIMAL).unwrap();
        let scene = build(doc, Path::new(".")).unwrap();
        assert!(scene.find("world").is_some());
        assert_eq!(scene.lights().len(), 1);
    }

    #[test]
    fn version_is_checked() {
        let doc: SceneDoc =
            serde_yaml::from_str(&MINIMAL.replace("\"1.0\"", "\"2.0\"")).unwrap();
        assert!(matches!(
            build(doc, Path::new(".")),
            Err(Error::Config(ConfigError::UnsupportedVersion(_)))
        ));
    }

    #[test]
    fn missing_world_is_rejected() {
        let text = r#"
version: "1.0"
nodes:
  lamp:
    light:
      wavelength: 555.0
"#;
        let doc: SceneDoc = serde_yaml::from_str(text).unwrap();
        assert!(matches!(
            build(doc, Path::new(".")),
            Err(Error::Config(ConfigError::MissingWorld))
        ));
    }

    #[test]
    fn undefined_component_is_rejected() {
        let text = r#"
version: "1.0"
nodes:
  world:
    sphere:
      radius: 10.0
      material:
        refractive-index: 1.0
        components: [missing]
"#;
        let doc: SceneDoc = serde_yaml::from_str(text).unwrap();
        assert!(matches!(
            build(doc, Path::new(".")),
            Err(Error::Config(ConfigError::UndefinedComponent { .. }))
        ));
    }

    #[test]
    fn parent_cycle_is_rejected() {
        let text = r#"
version: "1.0"
nodes:
  world:
    sphere:
      radius: 10.0
      material:
        refractive-index: 1.0
  a:
    parent: b
    sphere: { radius: 1.0, material: { refractive-index: 1.5 } }
  b:
    parent: a
    sphere: { radius: 1.0, material: { refractive-index: 1.5 } }
"#;
        let doc: SceneDoc = serde_yaml::from_str(text).unwrap();
        assert!(matches!(
            build(doc, Path::new(".")),
            Err(Error::Config(ConfigError::ParentCycle(_)))
        ));
    }

    #[test]
    fn lsc_document_with_components_builds() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "abs.csv",
            "wavelength,coefficient\n400,1.0\n550,5.0\n700,0.1\n",
        );
        write_file(
            dir.path(),
            "ems.csv",
            "wavelength,intensity\n550,0.0\n620,1.0\n750,0.0\n",
        );
        let text = r#"
version: "1.0"
components:
  dye:
    kind: luminophore
    absorption:
      coefficient: 5.0
      spectrum: { csv: abs.csv }
    emission:
      quantum-yield: 0.98
      spectrum: { csv: ems.csv }
  haze:
    kind: scatterer
    absorption:
      coefficient: 0.2
    emission:
      phase-function: { henyey-greenstein: { g: 0.7 } }
nodes:
  world:
    sphere:
      radius: 20.0
      material:
        refractive-index: 1.0
  slab:
    box:
      size: [5.0, 5.0, 1.0]
      material:
        refractive-index: 1.5
        components: [dye, haze]
  sun:
    location: [0.0, 0.0, 2.0]
    rotation: { axis: [1.0, 0.0, 0.0], angle: 180.0 }
    light:
      wavelength: 555.0
      mask:
        position: { square: [4.0, 4.0] }
        direction: { cone: { half-angle: 5.0 } }
"#;
        let doc: SceneDoc = serde_yaml::from_str(text).unwrap();
        let scene = build(doc, dir.path()).unwrap();
        let slab = scene.find("slab").unwrap();
        let material = scene.material_of(slab);
        assert_eq!(material.components().len(), 2);
        // Peak of the absorption shape is rescaled to the coefficient
        assert!((material.total_attenuation(550.0) - 5.2).abs() < 1e-9);
        assert_eq!(scene.lights().len(), 1);
    }

    #[test]
    fn component_names_with_reserved_characters_are_rejected() {
        let text = r#"
version: "1.0"
components:
  "dye, primary":
    kind: absorber
    absorption:
      coefficient: 5.0
nodes:
  world:
    sphere:
      radius: 10.0
      material:
        refractive-index: 1.0
        components: ["dye, primary"]
"#;
        let doc: SceneDoc = serde_yaml::from_str(text).unwrap();
        assert!(matches!(
            build(doc, Path::new(".")),
            Err(Error::Config(ConfigError::ReservedCharacter(name))) if name == "dye, primary"
        ));
    }

    #[test]
    fn builtin_spectrum_names_are_not_available() {
        let text = r#"
version: "1.0"
components:
  dye:
    kind: absorber
    absorption:
      spectrum: { name: rhodamine-b }
nodes:
  world:
    sphere:
      radius: 10.0
      material:
        refractive-index: 1.0
        components: [dye]
"#;
        let doc: SceneDoc = serde_yaml::from_str(text).unwrap();
        assert!(matches!(
            build(doc, Path::new(".")),
            Err(Error::Config(ConfigError::UnknownSpectrum(_)))
        ));
    }
}
