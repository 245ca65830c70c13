//! Volume materials and their interaction components.
//!
//! A material is a refractive index plus an ordered list of components, each
//! an independent interaction channel (absorption, scattering, luminescent
//! re-emission, photochemistry). The set of channels is open-ended, so
//! components are trait objects rather than a closed enum.

use glam::DVec3;
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use std::fmt;
use std::sync::Arc;

use crate::random;
use crate::spectrum::{Distribution, Spectrum};

/// Classification of an interaction channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// Absorbs and terminates the ray.
    Absorber,
    /// Redirects the ray without changing its wavelength.
    Scatterer,
    /// Absorbs and re-emits at a longer wavelength with some quantum yield.
    Luminophore,
    /// Absorbs to drive a photochemical reaction; terminates the ray.
    Reactor,
}

/// Angular distribution for re-emitted and scattered directions.
#[derive(Debug, Clone, Copy)]
pub enum PhaseFunction {
    /// Uniform over the full sphere.
    Isotropic,
    /// Henyey-Greenstein with asymmetry parameter `g` in (-1, 1).
    HenyeyGreenstein {
        /// Mean scattering cosine; 0 is isotropic, positive is forward.
        g: f64,
    },
}

impl PhaseFunction {
    /// Draw an outgoing direction given the incoming one.
    pub fn sample(&self, rng: &mut ChaCha20Rng, incoming: DVec3) -> DVec3 {
        match self {
            PhaseFunction::Isotropic => random::isotropic_direction(rng),
            PhaseFunction::HenyeyGreenstein { g } => {
                random::henyey_greenstein_direction(rng, *g, incoming)
            }
        }
    }
}

/// One interaction channel within a material.
pub trait Component: fmt::Debug + Send + Sync {
    /// Name recorded in event histories.
    fn name(&self) -> &str;

    /// Which channel family this is.
    fn kind(&self) -> ComponentKind;

    /// Absorption coefficient in inverse scene units at wavelength λ.
    fn absorption_coefficient(&self, nanometers: f64) -> f64;

    /// Probability that an absorption re-emits instead of terminating.
    fn quantum_yield(&self) -> f64;

    /// Roll the quantum yield.
    fn is_radiative(&self, rng: &mut ChaCha20Rng) -> bool {
        rng.random::<f64>() < self.quantum_yield()
    }

    /// New (wavelength, direction) for a re-emission at the absorption
    /// point. Only called after a radiative roll succeeds.
    fn emit(&self, rng: &mut ChaCha20Rng, wavelength: f64, incoming: DVec3) -> (f64, DVec3);
}

/// Pure absorber: every interaction terminates the ray.
#[derive(Debug)]
pub struct Absorber {
    name: String,
    coefficient: Spectrum,
}

impl Absorber {
    /// Absorber with the given coefficient spectrum.
    pub fn new(name: impl Into<String>, coefficient: Spectrum) -> Self {
        Self {
            name: name.into(),
            coefficient,
        }
    }
}

impl Component for Absorber {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Absorber
    }

    fn absorption_coefficient(&self, nanometers: f64) -> f64 {
        self.coefficient.value(nanometers)
    }

    fn quantum_yield(&self) -> f64 {
        0.0
    }

    fn emit(&self, rng: &mut ChaCha20Rng, wavelength: f64, _incoming: DVec3) -> (f64, DVec3) {
        // Unreachable with qy = 0; keep a sane answer anyway
        (wavelength, random::isotropic_direction(rng))
    }
}

/// Elastic scatterer: redirects the ray, wavelength unchanged.
#[derive(Debug)]
pub struct Scatterer {
    name: String,
    coefficient: Spectrum,
    quantum_yield: f64,
    phase: PhaseFunction,
}

impl Scatterer {
    /// Scatterer with unit quantum yield and an isotropic phase function.
    pub fn new(name: impl Into<String>, coefficient: Spectrum) -> Self {
        Self {
            name: name.into(),
            coefficient,
            quantum_yield: 1.0,
            phase: PhaseFunction::Isotropic,
        }
    }

    /// Override the phase function.
    pub fn with_phase(mut self, phase: PhaseFunction) -> Self {
        self.phase = phase;
        self
    }

    /// Override the quantum yield (a lossy scatterer).
    pub fn with_quantum_yield(mut self, quantum_yield: f64) -> Self {
        self.quantum_yield = quantum_yield;
        self
    }
}

impl Component for Scatterer {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Scatterer
    }

    fn absorption_coefficient(&self, nanometers: f64) -> f64 {
        self.coefficient.value(nanometers)
    }

    fn quantum_yield(&self) -> f64 {
        self.quantum_yield
    }

    fn emit(&self, rng: &mut ChaCha20Rng, wavelength: f64, incoming: DVec3) -> (f64, DVec3) {
        (wavelength, self.phase.sample(rng, incoming))
    }
}

/// Luminophore: absorbs and re-emits with a Stokes shift.
#[derive(Debug)]
pub struct Luminophore {
    name: String,
    absorption: Spectrum,
    emission: Distribution,
    quantum_yield: f64,
    phase: PhaseFunction,
}

impl Luminophore {
    /// Luminophore with an isotropic emission phase function.
    pub fn new(
        name: impl Into<String>,
        absorption: Spectrum,
        emission: Distribution,
        quantum_yield: f64,
    ) -> Self {
        Self {
            name: name.into(),
            absorption,
            emission,
            quantum_yield,
            phase: PhaseFunction::Isotropic,
        }
    }

    /// Override the phase function.
    pub fn with_phase(mut self, phase: PhaseFunction) -> Self {
        self.phase = phase;
        self
    }
}

impl Component for Luminophore {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Luminophore
    }

    fn absorption_coefficient(&self, nanometers: f64) -> f64 {
        self.absorption.value(nanometers)
    }

    fn quantum_yield(&self) -> f64 {
        self.quantum_yield
    }

    fn emit(&self, rng: &mut ChaCha20Rng, wavelength: f64, incoming: DVec3) -> (f64, DVec3) {
        let new_wavelength = self.emission.draw_redshifted(rng, wavelength);
        (new_wavelength, self.phase.sample(rng, incoming))
    }
}

/// Reactor: absorbs photons to drive a reaction. Terminates the ray like an
/// absorber but is tagged separately so yields can be queried per reactor.
#[derive(Debug)]
pub struct Reactor {
    name: String,
    coefficient: Spectrum,
}

impl Reactor {
    /// Reactor with the given absorption spectrum.
    pub fn new(name: impl Into<String>, coefficient: Spectrum) -> Self {
        Self {
            name: name.into(),
            coefficient,
        }
    }
}

impl Component for Reactor {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Reactor
    }

    fn absorption_coefficient(&self, nanometers: f64) -> f64 {
        self.coefficient.value(nanometers)
    }

    fn quantum_yield(&self) -> f64 {
        0.0
    }

    fn emit(&self, rng: &mut ChaCha20Rng, wavelength: f64, _incoming: DVec3) -> (f64, DVec3) {
        (wavelength, random::isotropic_direction(rng))
    }
}

/// Homogeneous volume: a refractive index and the interaction channels.
#[derive(Debug, Clone)]
pub struct Material {
    refractive_index: Spectrum,
    components: Vec<Arc<dyn Component>>,
}

impl Material {
    /// Material with interaction channels.
    pub fn new(refractive_index: Spectrum, components: Vec<Arc<dyn Component>>) -> Self {
        Self {
            refractive_index,
            components,
        }
    }

    /// Pure dielectric: a constant refractive index and no channels.
    pub fn dielectric(refractive_index: f64) -> Self {
        Self::new(Spectrum::Constant(refractive_index), Vec::new())
    }

    /// Air at unit refractive index.
    pub fn air() -> Self {
        Self::dielectric(1.0)
    }

    /// Refractive index at wavelength λ.
    pub fn refractive_index(&self, nanometers: f64) -> f64 {
        self.refractive_index.value(nanometers)
    }

    /// The interaction channels in declaration order.
    pub fn components(&self) -> &[Arc<dyn Component>] {
        &self.components
    }

    /// Total extinction coefficient: the sum over channels at λ.
    pub fn total_attenuation(&self, nanometers: f64) -> f64 {
        self.components
            .iter()
            .map(|c| c.absorption_coefficient(nanometers))
            .sum()
    }

    /// Sample the free path before the next volume interaction. Infinite in
    /// a non-attenuating medium.
    pub fn penetration_depth(&self, nanometers: f64, rng: &mut ChaCha20Rng) -> f64 {
        let alpha = self.total_attenuation(nanometers);
        if alpha <= 0.0 {
            return f64::INFINITY;
        }
        -(1.0 - rng.random::<f64>()).ln() / alpha
    }

    /// Categorical draw of the channel that caused an interaction, weighted
    /// by each channel's share of the extinction at λ.
    pub fn select_component(
        &self,
        nanometers: f64,
        rng: &mut ChaCha20Rng,
    ) -> Option<&Arc<dyn Component>> {
        let total = self.total_attenuation(nanometers);
        if total <= 0.0 || self.components.is_empty() {
            return None;
        }
        let mut threshold = rng.random::<f64>() * total;
        for component in &self.components {
            threshold -= component.absorption_coefficient(nanometers);
            if threshold <= 0.0 {
                return Some(component);
            }
        }
        self.components.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(7)
    }

    fn flat_luminophore(alpha: f64, qy: f64) -> Arc<dyn Component> {
        let emission = Distribution::new(
            vec![600.0, 620.0, 640.0],
            vec![0.0, 1.0, 0.0],
            false,
        )
        .unwrap();
        Arc::new(Luminophore::new(
            "lumo",
            Spectrum::Constant(alpha),
            emission,
            qy,
        ))
    }

    #[test]
    fn dielectric_has_infinite_penetration_depth() {
        let mut rng = rng();
        let air = Material::air();
        assert_eq!(air.total_attenuation(555.0), 0.0);
        assert!(air.penetration_depth(555.0, &mut rng).is_infinite());
        assert!(air.select_component(555.0, &mut rng).is_none());
    }

    #[test]
    fn penetration_depth_matches_beer_lambert() {
        let mut rng = rng();
        let material = Material::new(
            Spectrum::Constant(1.5),
            vec![Arc::new(Absorber::new("dye", Spectrum::Constant(5.0))) as Arc<dyn Component>],
        );
        let n = 20_000;
        let mean: f64 = (0..n)
            .map(|_| material.penetration_depth(555.0, &mut rng))
            .sum::<f64>()
            / n as f64;
        // Exponential with rate alpha has mean 1/alpha
        assert!((mean - 0.2).abs() < 0.01);
    }

    #[test]
    fn component_selection_follows_extinction_shares() {
        let mut rng = rng();
        let material = Material::new(
            Spectrum::Constant(1.5),
            vec![
                Arc::new(Absorber::new("weak", Spectrum::Constant(1.0))) as Arc<dyn Component>,
                Arc::new(Absorber::new("strong", Spectrum::Constant(3.0))) as Arc<dyn Component>,
            ],
        );
        let n = 10_000;
        let strong = (0..n)
            .filter(|_| {
                material
                    .select_component(555.0, &mut rng)
                    .map(|c| c.name() == "strong")
                    .unwrap_or(false)
            })
            .count();
        let share = strong as f64 / n as f64;
        assert!((share - 0.75).abs() < 0.02);
    }

    #[test]
    fn luminophore_emits_redshifted() {
        let mut rng = rng();
        let lumo = flat_luminophore(5.0, 0.98);
        for _ in 0..500 {
            let (nm, dir) = lumo.emit(&mut rng, 555.0, DVec3::Z);
            assert!(nm >= 600.0 && nm <= 640.0);
            assert!((dir.length() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn scatterer_preserves_wavelength() {
        let mut rng = rng();
        let scatterer = Scatterer::new("haze", Spectrum::Constant(2.0));
        let (nm, _) = scatterer.emit(&mut rng, 532.0, DVec3::Z);
        assert_eq!(nm, 532.0);
        assert_eq!(scatterer.quantum_yield(), 1.0);
    }

    #[test]
    fn reactor_always_terminates() {
        let mut rng = rng();
        let reactor = Reactor::new("cell", Spectrum::Constant(3.0));
        assert_eq!(reactor.kind(), ComponentKind::Reactor);
        assert_eq!(reactor.quantum_yield(), 0.0);
        for _ in 0..100 {
            assert!(!reactor.is_radiative(&mut rng));
        }
    }

    #[test]
    fn quantum_yield_roll_statistics() {
        let mut rng = rng();
        let lumo = flat_luminophore(5.0, 0.7);
        let n = 10_000;
        let radiative = (0..n).filter(|_| lumo.is_radiative(&mut rng)).count();
        let share = radiative as f64 / n as f64;
        assert!((share - 0.7).abs() < 0.02);
    }
}
