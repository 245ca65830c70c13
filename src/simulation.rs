//! Batch simulation: many rays over a shared, read-only scene.
//!
//! One ray is one independent computation. A batch of N rays is split into
//! one contiguous chunk per worker; each worker owns a ChaCha20 stream
//! derived from the master seed and its index, so a run is reproducible for
//! a fixed (seed, worker count) pair regardless of how rayon schedules the
//! chunks. Histories are recorded to the sink in throw order after the
//! workers join.

use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{ConfigError, Error};
use crate::event::{EventKind, Step};
use crate::random;
use crate::scene::Scene;
use crate::sink::EventSink;
use crate::tracer::{PhotonTracer, TraceLimits};

/// Terminal-event tally for one batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    /// Rays emitted.
    pub emitted: usize,
    /// Rays that crossed the outer world boundary.
    pub exited: usize,
    /// Rays terminated by volume or surface absorption.
    pub absorbed: usize,
    /// Rays terminated by a safety threshold.
    pub killed: usize,
    /// Rays aborted on a numerical impossibility.
    pub errored: usize,
}

impl RunSummary {
    /// Share of emitted rays that were killed. A noticeable fraction means
    /// the batch is biased and the thresholds need revisiting.
    pub fn killed_fraction(&self) -> f64 {
        if self.emitted == 0 {
            return 0.0;
        }
        self.killed as f64 / self.emitted as f64
    }

    fn absorb(&mut self, history: &[Step]) {
        self.emitted += 1;
        if let Some(last) = history.last() {
            match last.event.kind {
                EventKind::Exit => self.exited += 1,
                EventKind::Absorb => self.absorbed += 1,
                EventKind::Kill => self.killed += 1,
                EventKind::Error => self.errored += 1,
                _ => {}
            }
        }
    }
}

/// Configured batch runner.
#[derive(Debug)]
pub struct Simulation<'a> {
    scene: &'a Scene,
    limits: TraceLimits,
    seed: u64,
    workers: usize,
    progress: bool,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> Simulation<'a> {
    /// Runner with default limits, seed 0 and one worker per CPU core.
    pub fn new(scene: &'a Scene) -> Self {
        Self {
            scene,
            limits: TraceLimits::default(),
            seed: 0,
            workers: rayon::current_num_threads().max(1),
            progress: false,
            cancel: None,
        }
    }

    /// Set the master seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the worker count. Determinism of the event log requires keeping
    /// this fixed between runs.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Override per-ray safety limits.
    pub fn with_limits(mut self, limits: TraceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Show a progress bar while tracing.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Install a cancellation flag, checked between rays. A ray in flight
    /// is never interrupted.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Trace `rays` rays and stream every event to the sink.
    ///
    /// Rays are assigned round-robin over the scene's light nodes and
    /// numbered by a monotonically increasing throw id; the sink receives
    /// histories sorted by throw id.
    pub fn run(&self, rays: usize, sink: &mut dyn EventSink) -> Result<RunSummary, Error> {
        let lights = self.scene.lights();
        if lights.is_empty() {
            return Err(ConfigError::NoLight("scene".to_string()).into());
        }

        info!(
            "tracing {} rays over {} workers (seed {})",
            rays, self.workers, self.seed
        );
        let started = std::time::Instant::now();

        let bar = if self.progress {
            let bar = ProgressBar::new(rays as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{bar:40} {pos}/{len} ETA: {eta}")
                    .expect("static template"),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        let chunk_size = rays.div_ceil(self.workers);
        let chunks: Vec<Vec<(u64, Vec<Step>)>> = (0..self.workers)
            .into_par_iter()
            .map(|worker| {
                let mut rng = random::worker_rng(self.seed, worker as u64);
                let tracer = PhotonTracer::new(self.scene).with_limits(self.limits);
                let start = worker * chunk_size;
                let end = (start + chunk_size).min(rays);
                let mut out = Vec::with_capacity(end.saturating_sub(start));
                for throw in start..end {
                    if let Some(cancel) = &self.cancel {
                        if cancel.load(Ordering::Relaxed) {
                            break;
                        }
                    }
                    let light = lights[throw % lights.len()];
                    let ray = match self.scene.emit(light, &mut rng, 1) {
                        Ok(mut emission) => emission.next(),
                        Err(_) => None,
                    };
                    let Some(ray) = ray else {
                        continue;
                    };
                    let history = tracer.follow(ray, &mut rng);
                    bar.inc(1);
                    out.push((throw as u64, history));
                }
                out
            })
            .collect();
        bar.finish_and_clear();

        let mut summary = RunSummary::default();
        for chunk in &chunks {
            for (throw, history) in chunk {
                summary.absorb(history);
                for step in history {
                    sink.record(*throw, step).map_err(Error::Sink)?;
                }
            }
        }
        sink.flush().map_err(Error::Sink)?;

        info!(
            "traced {} rays in {:.2?}: {} exited, {} absorbed, {} killed, {} errored",
            summary.emitted,
            started.elapsed(),
            summary.exited,
            summary.absorbed,
            summary.killed,
            summary.errored
        );
        if summary.killed > 0 {
            warn!(
                "{} rays ({:.1}%) were killed by safety thresholds; results may be biased",
                summary.killed,
                100.0 * summary.killed_fraction()
            );
        }
        Ok(summary)
    }
}
