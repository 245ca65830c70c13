//! Tabulated spectra and Monte Carlo sampling distributions.
//!
//! A [`Spectrum`] answers "what is this optical property at wavelength λ"
//! (refractive index, absorption coefficient). A [`Distribution`] wraps a
//! spectrum shape with its cumulative integral so emission wavelengths can be
//! drawn by inverse transform sampling.

use rand::Rng;

/// Errors raised when building a spectrum from tabulated data.
#[derive(Debug, thiserror::Error)]
pub enum SpectrumError {
    /// Wavelength column must be strictly ascending.
    #[error("wavelengths must be strictly ascending")]
    NotAscending,

    /// At least two samples are required to interpolate.
    #[error("need at least two samples, got {0}")]
    TooShort(usize),

    /// Values must be finite and non-negative.
    #[error("values must be finite and non-negative")]
    BadValues,

    /// A distribution needs some probability mass to sample from.
    #[error("distribution integrates to zero")]
    ZeroMass,
}

/// Wavelength-dependent scalar property.
#[derive(Debug, Clone)]
pub enum Spectrum {
    /// The same value at every wavelength.
    Constant(f64),
    /// Linear interpolation over (wavelength, value) samples, clamped to the
    /// end values outside the tabulated range.
    Table {
        /// Wavelengths in nanometers, strictly ascending.
        x: Vec<f64>,
        /// Property values at each wavelength.
        y: Vec<f64>,
    },
}

impl Spectrum {
    /// Build a tabulated spectrum, validating the sample grid.
    pub fn tabulated(x: Vec<f64>, y: Vec<f64>) -> Result<Self, SpectrumError> {
        check_grid(&x, &y)?;
        Ok(Self::Table { x, y })
    }

    /// Property value at the given wavelength in nanometers.
    pub fn value(&self, nanometers: f64) -> f64 {
        match self {
            Self::Constant(v) => *v,
            Self::Table { x, y } => interp(nanometers, x, y),
        }
    }

    /// Largest value over the tabulated grid (the constant for constants).
    pub fn peak(&self) -> f64 {
        match self {
            Self::Constant(v) => *v,
            Self::Table { y, .. } => y.iter().cloned().fold(0.0, f64::max),
        }
    }

    /// Rescale so the peak equals `coefficient`. Used when a component
    /// declares both a spectrum shape and a peak coefficient.
    pub fn scaled_to_peak(self, coefficient: f64) -> Self {
        match self {
            Self::Constant(_) => Self::Constant(coefficient),
            Self::Table { x, y } => {
                let peak = y.iter().cloned().fold(0.0, f64::max);
                let scale = if peak > 0.0 { coefficient / peak } else { 0.0 };
                Self::Table {
                    x,
                    y: y.into_iter().map(|v| v * scale).collect(),
                }
            }
        }
    }
}

/// Probability distribution over wavelength, sampled by inverting the
/// cumulative integral of a tabulated spectrum shape.
#[derive(Debug, Clone)]
pub struct Distribution {
    x: Vec<f64>,
    cdf: Vec<f64>,
}

impl Distribution {
    /// Build from (wavelength, density) samples.
    ///
    /// With `hist` false the density is treated as piecewise linear between
    /// samples (trapezoid integration); with `hist` true each sample is the
    /// constant height of the bin starting at its wavelength.
    pub fn new(x: Vec<f64>, y: Vec<f64>, hist: bool) -> Result<Self, SpectrumError> {
        check_grid(&x, &y)?;
        let mut cdf = Vec::with_capacity(x.len());
        cdf.push(0.0);
        for i in 1..x.len() {
            let dx = x[i] - x[i - 1];
            let mass = if hist {
                y[i - 1] * dx
            } else {
                0.5 * (y[i - 1] + y[i]) * dx
            };
            cdf.push(cdf[i - 1] + mass);
        }
        let total = *cdf.last().expect("cdf is non-empty");
        if total <= 0.0 {
            return Err(SpectrumError::ZeroMass);
        }
        for v in &mut cdf {
            *v /= total;
        }
        Ok(Self { x, cdf })
    }

    /// Cumulative probability below the given wavelength, clamped to [0, 1]
    /// outside the tabulated range.
    pub fn lookup(&self, nanometers: f64) -> f64 {
        interp(nanometers, &self.x, &self.cdf)
    }

    /// Wavelength at the given cumulative probability.
    pub fn sample(&self, p: f64) -> f64 {
        interp(p.clamp(0.0, 1.0), &self.cdf, &self.x)
    }

    /// Draw a wavelength from the whole distribution.
    pub fn draw(&self, rng: &mut impl Rng) -> f64 {
        self.sample(rng.random())
    }

    /// Draw a wavelength no shorter than `nanometers` by truncating the
    /// cumulative distribution below the incident wavelength. This is the
    /// Stokes-shift rule for luminescent re-emission.
    pub fn draw_redshifted(&self, rng: &mut impl Rng, nanometers: f64) -> f64 {
        let floor = self.lookup(nanometers);
        self.sample(rng.random_range(floor..=1.0))
    }
}

fn check_grid(x: &[f64], y: &[f64]) -> Result<(), SpectrumError> {
    if x.len() < 2 || x.len() != y.len() {
        return Err(SpectrumError::TooShort(x.len().min(y.len())));
    }
    if !x.windows(2).all(|w| w[1] > w[0]) {
        return Err(SpectrumError::NotAscending);
    }
    if !y.iter().all(|v| v.is_finite() && *v >= 0.0) {
        return Err(SpectrumError::BadValues);
    }
    Ok(())
}

/// Piecewise-linear interpolation of `(xs, ys)` at `x`, clamped at the ends.
/// `xs` must be non-decreasing.
fn interp(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[xs.len() - 1] {
        return ys[ys.len() - 1];
    }
    let i = match xs.binary_search_by(|v| v.partial_cmp(&x).expect("finite grid")) {
        Ok(i) => return ys[i],
        Err(i) => i,
    };
    let frac = (x - xs[i - 1]) / (xs[i] - xs[i - 1]);
    ys[i - 1] + frac * (ys[i] - ys[i - 1])
}

/// Evenly spaced grid from `lo` to `hi` inclusive with the given step.
pub fn linspace(lo: f64, hi: f64, step: f64) -> Vec<f64> {
    let mut out = Vec::new();
    let mut v = lo;
    let mut i = 0u64;
    while v < hi - 1e-12 {
        out.push(v);
        i += 1;
        v = lo + step * i as f64;
    }
    out.push(hi);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn constant_spectrum_ignores_wavelength() {
        let s = Spectrum::Constant(1.5);
        assert_eq!(s.value(400.0), 1.5);
        assert_eq!(s.value(800.0), 1.5);
    }

    #[test]
    fn table_interpolates_and_clamps() {
        let s = Spectrum::tabulated(vec![400.0, 600.0], vec![1.0, 3.0]).unwrap();
        assert!((s.value(500.0) - 2.0).abs() < 1e-12);
        assert_eq!(s.value(300.0), 1.0);
        assert_eq!(s.value(700.0), 3.0);
    }

    #[test]
    fn peak_scaling() {
        let s = Spectrum::tabulated(vec![400.0, 500.0, 600.0], vec![1.0, 4.0, 2.0])
            .unwrap()
            .scaled_to_peak(10.0);
        assert!((s.value(500.0) - 10.0).abs() < 1e-12);
        assert!((s.value(400.0) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_bad_grids() {
        assert!(Spectrum::tabulated(vec![500.0, 400.0], vec![1.0, 1.0]).is_err());
        assert!(Spectrum::tabulated(vec![400.0], vec![1.0]).is_err());
        assert!(Distribution::new(vec![400.0, 500.0], vec![0.0, 0.0], false).is_err());
    }

    #[test]
    fn sampling_inverts_lookup() {
        let d = Distribution::new(
            vec![500.0, 550.0, 600.0, 650.0],
            vec![0.0, 1.0, 1.0, 0.0],
            false,
        )
        .unwrap();
        for nm in [510.0, 575.0, 640.0] {
            let p = d.lookup(nm);
            assert!((d.sample(p) - nm).abs() < 1e-9);
        }
    }

    #[test]
    fn redshift_never_shortens_wavelength() {
        let d = Distribution::new(
            vec![550.0, 600.0, 620.0, 640.0, 700.0],
            vec![0.0, 0.5, 1.0, 0.5, 0.0],
            false,
        )
        .unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        for _ in 0..2000 {
            let nm = d.draw_redshifted(&mut rng, 610.0);
            assert!(nm >= 610.0 - 1e-9);
        }
    }

    #[test]
    fn histogram_mode_uses_left_bin_heights() {
        // All mass in the first bin: samples stay in [400, 500]
        let d = Distribution::new(vec![400.0, 500.0, 600.0], vec![1.0, 0.0, 0.0], true).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        for _ in 0..500 {
            let nm = d.draw(&mut rng);
            assert!((400.0..=500.0).contains(&nm));
        }
    }

    #[test]
    fn linspace_hits_both_ends() {
        let g = linspace(400.0, 500.0, 25.0);
        assert_eq!(g, vec![400.0, 425.0, 450.0, 475.0, 500.0]);
    }
}
