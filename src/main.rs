use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use lumitrace::cli::{Args, Command};
use lumitrace::config;
use lumitrace::error::Error;
use lumitrace::report::{self, Constraint, Stream};
use lumitrace::simulation::Simulation;
use lumitrace::sink::CsvSink;
use lumitrace::tracer::TraceLimits;

/// Exit statuses promised to callers: 0 success, 1 configuration error,
/// 2 runtime error, 3 killed fraction above threshold.
const EXIT_CONFIG: i32 = 1;
const EXIT_RUNTIME: i32 = 2;
const EXIT_BIASED: i32 = 3;

fn main() {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(args.debug_level.clone().into())
        .init();

    info!(
        "lumitrace - Git Version {} ({})",
        env!("GIT_HASH"),
        env!("GIT_DATE")
    );

    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            error!("{err:#}");
            std::process::exit(classify(&err));
        }
    }
}

fn classify(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<Error>() {
        Some(Error::Config(_)) | Some(Error::Geometry(_)) => EXIT_CONFIG,
        _ => EXIT_RUNTIME,
    }
}

fn run(args: Args) -> Result<i32> {
    match args.command {
        Command::Simulate {
            scene,
            rays,
            seed,
            workers,
            output,
            max_events,
            max_distance,
            kill_threshold,
        } => {
            let scene = config::load(&scene)?;
            let mut sink = CsvSink::create(&output)
                .map_err(Error::Sink)
                .with_context(|| format!("creating log in {output:?}"))?;

            let limits = TraceLimits {
                max_events,
                max_distance: max_distance.unwrap_or(f64::INFINITY),
            };
            let mut simulation = Simulation::new(&scene)
                .with_seed(seed)
                .with_limits(limits)
                .with_progress(true);
            if let Some(workers) = workers {
                simulation = simulation.with_workers(workers);
            }

            let summary = simulation.run(rays, &mut sink)?;
            println!(
                "{} rays: {} exited, {} absorbed, {} killed, {} errored",
                summary.emitted, summary.exited, summary.absorbed, summary.killed, summary.errored
            );
            if summary.killed_fraction() > kill_threshold {
                error!(
                    "killed fraction {:.1}% exceeds threshold {:.1}%",
                    100.0 * summary.killed_fraction(),
                    100.0 * kill_threshold
                );
                return Ok(EXIT_BIASED);
            }
            Ok(0)
        }

        Command::Count {
            stream,
            node,
            db,
            source,
            nx,
            ny,
            nz,
        } => {
            let stream: Stream = stream.parse().map_err(anyhow::Error::msg)?;
            let constraint = Constraint {
                source,
                normal: normal_constraint(nx, ny, nz),
            };
            let rows = report::read_log(&db)?;
            println!("{}", report::count(&rows, stream, &node, &constraint));
            Ok(0)
        }

        Command::Spectrum {
            stream,
            node,
            db,
            source,
            bins,
        } => {
            let stream: Stream = stream.parse().map_err(anyhow::Error::msg)?;
            let constraint = Constraint {
                source,
                normal: None,
            };
            let rows = report::read_log(&db)?;
            for (lo, hi, count) in
                report::wavelength_histogram(&rows, stream, &node, &constraint, bins)
            {
                println!("{lo:.1} {hi:.1} {count}");
            }
            Ok(0)
        }
    }
}

fn normal_constraint(nx: Option<f64>, ny: Option<f64>, nz: Option<f64>) -> Option<(usize, f64)> {
    if let Some(value) = nx {
        return Some((0, value));
    }
    if let Some(value) = ny {
        return Some((1, value));
    }
    nz.map(|value| (2, value))
}
