//! The photon-tracing engine.
//!
//! One ray at a time: advance to whichever comes first of the next surface
//! or the next sampled volume interaction, record an event, update the ray,
//! repeat until the ray exits the world, is absorbed, or trips a safety
//! threshold. The engine owns no randomness and no sink; both are passed in.

use log::{debug, warn};
use rand_chacha::ChaCha20Rng;

use crate::error::TraceError;
use crate::event::{Event, EventKind, Step};
use crate::geometry::EPS;
use crate::material::ComponentKind;
use crate::ray::Ray;
use crate::scene::Scene;
use crate::surface::{Boundary, FresnelSurface, Surface, SurfaceDecision};

/// Safety thresholds that bound a single ray's trace.
///
/// A ray that trips either threshold is recorded with a `Kill` event; a
/// batch with a noticeable killed fraction is biased and is reported as a
/// diagnostic, not silently accepted.
#[derive(Debug, Clone, Copy)]
pub struct TraceLimits {
    /// Maximum number of events in one ray's history.
    pub max_events: usize,
    /// Maximum cumulative travelled distance in scene units.
    pub max_distance: f64,
}

impl Default for TraceLimits {
    fn default() -> Self {
        Self {
            max_events: 1000,
            max_distance: f64::INFINITY,
        }
    }
}

/// Traces photons through a shared, read-only scene.
#[derive(Debug)]
pub struct PhotonTracer<'a> {
    scene: &'a Scene,
    limits: TraceLimits,
    default_surface: FresnelSurface,
}

impl<'a> PhotonTracer<'a> {
    /// Tracer with default safety limits.
    pub fn new(scene: &'a Scene) -> Self {
        Self {
            scene,
            limits: TraceLimits::default(),
            default_surface: FresnelSurface,
        }
    }

    /// Override the safety limits.
    pub fn with_limits(mut self, limits: TraceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Follow one ray to termination, returning its full ordered history.
    ///
    /// The history always starts with `Generate` and ends with exactly one
    /// terminal event. Numerical impossibilities terminate the ray with an
    /// `Error` event so the rest of a batch can proceed.
    pub fn follow(&self, ray: Ray, rng: &mut ChaCha20Rng) -> Vec<Step> {
        let scene = self.scene;
        let mut history: Vec<Step> = Vec::new();

        if !ray.is_finite() {
            let err = TraceError::NonFinite("at generation");
            return vec![self.error_step(ray, scene.name_arc(scene.root()), err)];
        }

        let Some(mut container) = scene.container(ray.position) else {
            let err = TraceError::NoContainer(format!("{:?}", ray.position));
            return vec![self.error_step(ray, scene.name_arc(scene.root()), err)];
        };

        history.push(Step {
            ray: ray.clone(),
            event: Event::new(EventKind::Generate, scene.name_arc(container)),
        });

        let mut ray = ray;
        loop {
            if history.len() >= self.limits.max_events || ray.travelled >= self.limits.max_distance
            {
                debug!(
                    "ray killed after {} events, {:.3} travelled",
                    history.len(),
                    ray.travelled
                );
                ray = ray.killed();
                history.push(Step {
                    ray: ray.clone(),
                    event: Event::new(EventKind::Kill, scene.name_arc(container)),
                });
                break;
            }

            let intersections = scene.intersections(ray.position, ray.direction);
            let Some(status) = scene.ray_status(container, &intersections) else {
                let err = TraceError::NoIntersections(scene.name(container).to_string());
                history.push(self.error_step(ray, scene.name_arc(container), err));
                break;
            };

            let material = scene.material_of(container);
            let n1 = material.refractive_index(ray.wavelength);
            let path_length = material.penetration_depth(ray.wavelength, rng);

            if path_length < status.hit.t {
                // Volume interaction before the boundary
                ray = ray.propagated(path_length, n1);
                let Some(component) = material.select_component(ray.wavelength, rng) else {
                    let err = TraceError::NoComponent(scene.name(container).to_string());
                    history.push(self.error_step(ray, scene.name_arc(container), err));
                    break;
                };
                let component_name: std::sync::Arc<str> = component.name().into();

                if component.is_radiative(rng) {
                    let (wavelength, direction) =
                        component.emit(rng, ray.wavelength, ray.direction);
                    ray = ray.re_emitted(wavelength, direction, component_name.clone());
                    let kind = match component.kind() {
                        ComponentKind::Scatterer => EventKind::Scatter,
                        _ => EventKind::Emit,
                    };
                    let mut event = Event::new(kind, scene.name_arc(container));
                    event.component = Some(component_name);
                    history.push(Step {
                        ray: ray.clone(),
                        event,
                    });
                    ray = ray.nudged(EPS);
                } else {
                    ray = ray.killed();
                    let mut event = Event::new(EventKind::Absorb, scene.name_arc(container));
                    event.component = Some(component_name);
                    history.push(Step {
                        ray: ray.clone(),
                        event,
                    });
                    break;
                }
                // Re-emission keeps the same container
                continue;
            }

            // Boundary event
            ray = ray.propagated(status.hit.t, n1);
            if !ray.is_finite() {
                history.push(self.error_step(
                    ray.clone(),
                    scene.name_arc(container),
                    TraceError::NonFinite("after propagation"),
                ));
                break;
            }

            let Some(adjacent) = status.adjacent else {
                // Outer world boundary: the ray leaves the scene
                ray = ray.killed();
                let mut event = Event::new(EventKind::Exit, scene.name_arc(container));
                event.hit = Some(scene.name_arc(status.hit.node));
                event.facet = Some(status.hit.facet.to_string());
                event.normal = Some(status.hit.normal);
                history.push(Step {
                    ray: ray.clone(),
                    event,
                });
                break;
            };

            let mut hit_event = Event::new(EventKind::Hit, scene.name_arc(container));
            hit_event.hit = Some(scene.name_arc(status.hit.node));
            hit_event.adjacent = Some(scene.name_arc(adjacent));
            hit_event.facet = Some(status.hit.facet.to_string());
            hit_event.normal = Some(status.hit.normal);
            history.push(Step {
                ray: ray.clone(),
                event: hit_event.clone(),
            });

            let n2 = scene.material_of(adjacent).refractive_index(ray.wavelength);
            let boundary = Boundary {
                normal: status.hit.normal,
                n1,
                n2,
            };
            let delegate: &dyn Surface = scene
                .node(status.hit.node)
                .surface
                .as_deref()
                .unwrap_or(&self.default_surface);

            match delegate.decide(&ray, &boundary, rng) {
                SurfaceDecision::Reflect(direction) => {
                    ray = ray.with_direction(direction);
                    let mut event = hit_event;
                    event.kind = EventKind::Reflect;
                    // Bounced back: the far side was not crossed
                    event.adjacent = None;
                    history.push(Step {
                        ray: ray.clone(),
                        event,
                    });
                    ray = ray.nudged(EPS);
                }
                SurfaceDecision::Transmit(direction) => {
                    ray = ray.with_direction(direction);
                    let mut event = hit_event;
                    event.kind = EventKind::Transmit;
                    history.push(Step {
                        ray: ray.clone(),
                        event,
                    });
                    container = adjacent;
                    ray = ray.nudged(EPS);
                }
                SurfaceDecision::Absorb => {
                    ray = ray.killed();
                    let mut event = hit_event;
                    event.kind = EventKind::Absorb;
                    event.adjacent = None;
                    history.push(Step {
                        ray: ray.clone(),
                        event,
                    });
                    break;
                }
            }
        }
        history
    }

    fn error_step(&self, ray: Ray, container: std::sync::Arc<str>, err: TraceError) -> Step {
        warn!("trace aborted: {err}");
        Step {
            ray: ray.killed(),
            event: Event::new(EventKind::Error, container),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use crate::material::Material;
    use crate::node::{Graph, Node};
    use crate::sphere::Sphere;
    use glam::DVec3;
    use rand::SeedableRng;

    fn empty_world() -> Scene {
        let mut graph = Graph::new();
        graph.add(
            Node::new("world")
                .with_geometry(Geometry::Sphere(Sphere::new(10.0).unwrap()))
                .with_material(Material::air()),
            None,
        );
        Scene::new(graph).unwrap()
    }

    fn kinds(history: &[Step]) -> Vec<EventKind> {
        history.iter().map(|s| s.event.kind).collect()
    }

    #[test]
    fn empty_world_generates_then_exits() {
        let scene = empty_world();
        let tracer = PhotonTracer::new(&scene);
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let ray = Ray::new(DVec3::new(-1.0, 0.0, 1.1), DVec3::X, 555.0, "test");
        let history = tracer.follow(ray, &mut rng);
        assert_eq!(kinds(&history), vec![EventKind::Generate, EventKind::Exit]);
        let exit = &history[1].ray;
        let expected = DVec3::new((100.0f64 - 1.21).sqrt(), 0.0, 1.1);
        assert!((exit.position - expected).length() < 1e-9);
        assert!(!exit.alive);
    }

    #[test]
    fn ray_outside_world_errors() {
        let scene = empty_world();
        let tracer = PhotonTracer::new(&scene);
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let ray = Ray::new(DVec3::new(0.0, 0.0, 50.0), DVec3::Z, 555.0, "test");
        let history = tracer.follow(ray, &mut rng);
        assert_eq!(kinds(&history), vec![EventKind::Error]);
    }

    #[test]
    fn degenerate_direction_errors() {
        let scene = empty_world();
        let tracer = PhotonTracer::new(&scene);
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let ray = Ray::new(DVec3::ZERO, DVec3::ZERO, 555.0, "test");
        let history = tracer.follow(ray, &mut rng);
        assert_eq!(kinds(&history), vec![EventKind::Error]);
    }

    #[test]
    fn event_budget_kills_trapped_ray() {
        // A mirror shell traps the ray forever; the event budget must end it
        use crate::surface::CoatedSurface;
        use std::sync::Arc;

        let mut graph = Graph::new();
        let world = graph.add(
            Node::new("world")
                .with_geometry(Geometry::Sphere(Sphere::new(10.0).unwrap()))
                .with_material(Material::air()),
            None,
        );
        graph.add(
            Node::new("shell")
                .with_geometry(Geometry::Sphere(Sphere::new(1.0).unwrap()))
                .with_material(Material::air())
                .with_surface(Arc::new(CoatedSurface::mirror())),
            Some(world),
        );
        let scene = Scene::new(graph).unwrap();
        let tracer = PhotonTracer::new(&scene).with_limits(TraceLimits {
            max_events: 32,
            max_distance: f64::INFINITY,
        });
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let ray = Ray::new(DVec3::ZERO, DVec3::Z, 555.0, "test");
        let history = tracer.follow(ray, &mut rng);
        assert_eq!(history.last().unwrap().event.kind, EventKind::Kill);
        // Generate plus hit/reflect pairs, then the kill itself
        assert!(history.len() <= 34);
    }

    #[test]
    fn distance_budget_kills_wandering_ray() {
        use crate::material::Scatterer;
        use crate::spectrum::Spectrum;
        use std::sync::Arc;

        let mut graph = Graph::new();
        graph.add(
            Node::new("world")
                .with_geometry(Geometry::Sphere(Sphere::new(10.0).unwrap()))
                .with_material(Material::new(
                    Spectrum::Constant(1.0),
                    vec![Arc::new(Scatterer::new("haze", Spectrum::Constant(10.0)))
                        as Arc<dyn crate::material::Component>],
                )),
            None,
        );
        let scene = Scene::new(graph).unwrap();
        let tracer = PhotonTracer::new(&scene).with_limits(TraceLimits {
            max_events: 1000,
            max_distance: 0.5,
        });
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let ray = Ray::new(DVec3::ZERO, DVec3::Z, 555.0, "test");
        let history = tracer.follow(ray, &mut rng);
        assert_eq!(history.last().unwrap().event.kind, EventKind::Kill);
        assert!(history.last().unwrap().ray.travelled >= 0.5);
    }

    #[test]
    fn travelled_distance_is_monotonic() {
        let scene = empty_world();
        let tracer = PhotonTracer::new(&scene);
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let ray = Ray::new(DVec3::new(0.3, -0.2, 0.0), DVec3::new(0.1, 0.9, 0.4).normalize(), 555.0, "test");
        let history = tracer.follow(ray, &mut rng);
        let mut last = 0.0;
        for step in &history {
            assert!(step.ray.travelled >= last);
            last = step.ray.travelled;
        }
    }
}
