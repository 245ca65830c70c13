//! Count and spectrum queries over a written event log.
//!
//! These read back the two-table CSV log and aggregate events by kind,
//! node and optional source / facet-normal constraints. They answer the
//! questions an LSC study actually asks: how many rays reflected off the
//! slab, entered it, escaped it, were killed, or were lost inside it.

use anyhow::{bail, Context, Result};
use glam::DVec3;
use std::path::Path;
use std::str::FromStr;

use crate::event::EventKind;

/// Named event streams exposed by the query surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    /// Rays that bounced off the outside of the node.
    Reflected,
    /// Rays that crossed into the node.
    Entering,
    /// Rays that left through the node's own surface.
    Escaping,
    /// Rays killed by a safety threshold inside the node.
    Killed,
    /// Rays absorbed non-radiatively inside the node.
    Lost,
}

impl FromStr for Stream {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reflected" => Ok(Stream::Reflected),
            "entering" => Ok(Stream::Entering),
            "escaping" => Ok(Stream::Escaping),
            "killed" => Ok(Stream::Killed),
            "lost" => Ok(Stream::Lost),
            other => Err(format!("unknown stream {other:?}")),
        }
    }
}

/// Optional constraints narrowing a query.
#[derive(Debug, Clone, Default)]
pub struct Constraint {
    /// Only rays emitted by this source.
    pub source: Option<String>,
    /// Only events whose surface normal has this component value:
    /// (axis index, value), within a small tolerance.
    pub normal: Option<(usize, f64)>,
}

/// One joined row of the two log tables.
#[derive(Debug, Clone)]
pub struct LogRow {
    /// Ray identity within the batch.
    pub throw_id: u64,
    /// Event tag.
    pub kind: EventKind,
    /// Component that caused a volume interaction.
    pub component: Option<String>,
    /// Hit node name.
    pub hit: Option<String>,
    /// Container at the event.
    pub container: String,
    /// Far-side node of a crossing.
    pub adjacent: Option<String>,
    /// Surface part identifier.
    pub facet: Option<String>,
    /// Surface normal at the event.
    pub normal: DVec3,
    /// Wavelength of the ray after the event.
    pub wavelength: f64,
    /// Emitting source of the ray.
    pub source: String,
}

/// Read `ray.csv` and `event.csv` from a log directory and join them row by
/// row.
pub fn read_log(dir: &Path) -> Result<Vec<LogRow>> {
    let rays = std::fs::read_to_string(dir.join("ray.csv"))
        .with_context(|| format!("reading {:?}", dir.join("ray.csv")))?;
    let events = std::fs::read_to_string(dir.join("event.csv"))
        .with_context(|| format!("reading {:?}", dir.join("event.csv")))?;

    let mut rows = Vec::new();
    for (line_no, (ray_line, event_line)) in
        rays.lines().skip(1).zip(events.lines().skip(1)).enumerate()
    {
        let ray: Vec<&str> = ray_line.split(',').collect();
        let event: Vec<&str> = event_line.split(',').collect();
        if ray.len() != 11 || event.len() != 10 {
            bail!("malformed log row {}", line_no + 2);
        }
        let field = |s: &str| -> Option<String> {
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        };
        rows.push(LogRow {
            throw_id: ray[0].parse().context("throw_id")?,
            kind: event[1]
                .parse::<EventKind>()
                .map_err(anyhow::Error::msg)
                .context("event kind")?,
            component: field(event[2]),
            hit: field(event[3]),
            container: event[4].to_string(),
            adjacent: field(event[5]),
            facet: field(event[6]),
            normal: DVec3::new(
                event[7].parse().context("ni")?,
                event[8].parse().context("nj")?,
                event[9].parse().context("nk")?,
            ),
            wavelength: ray[7].parse().context("wavelength")?,
            source: ray[8].to_string(),
        });
    }
    Ok(rows)
}

/// True when a row belongs to the stream at the node and satisfies the
/// constraints.
pub fn matches(row: &LogRow, stream: Stream, node: &str, constraint: &Constraint) -> bool {
    let stream_match = match stream {
        Stream::Reflected => {
            row.kind == EventKind::Reflect
                && row.hit.as_deref() == Some(node)
                && row.container != node
        }
        Stream::Entering => {
            row.kind == EventKind::Transmit && row.adjacent.as_deref() == Some(node)
        }
        Stream::Escaping => {
            (row.kind == EventKind::Transmit
                && row.hit.as_deref() == Some(node)
                && row.container == node)
                || (row.kind == EventKind::Exit && row.container == node)
        }
        Stream::Killed => row.kind == EventKind::Kill && row.container == node,
        Stream::Lost => row.kind == EventKind::Absorb && row.container == node,
    };
    if !stream_match {
        return false;
    }
    if let Some(source) = &constraint.source {
        if &row.source != source {
            return false;
        }
    }
    if let Some((axis, value)) = constraint.normal {
        if (row.normal[axis] - value).abs() > 1e-6 {
            return false;
        }
    }
    true
}

/// Count the rows of a stream at a node.
pub fn count(rows: &[LogRow], stream: Stream, node: &str, constraint: &Constraint) -> usize {
    rows.iter()
        .filter(|row| matches(row, stream, node, constraint))
        .count()
}

/// Histogram the wavelengths of a stream at a node into `bins` equal-width
/// bins. Returns (bin low edge, bin high edge, count) triples; empty when
/// nothing matched.
pub fn wavelength_histogram(
    rows: &[LogRow],
    stream: Stream,
    node: &str,
    constraint: &Constraint,
    bins: usize,
) -> Vec<(f64, f64, usize)> {
    let wavelengths: Vec<f64> = rows
        .iter()
        .filter(|row| matches(row, stream, node, constraint))
        .map(|row| row.wavelength)
        .collect();
    if wavelengths.is_empty() || bins == 0 {
        return Vec::new();
    }
    let lo = wavelengths.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = wavelengths.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let width = ((hi - lo) / bins as f64).max(1e-9);
    let mut histogram = vec![0usize; bins];
    for nm in &wavelengths {
        let bin = (((nm - lo) / width) as usize).min(bins - 1);
        histogram[bin] += 1;
    }
    histogram
        .into_iter()
        .enumerate()
        .map(|(i, count)| (lo + i as f64 * width, lo + (i + 1) as f64 * width, count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, Step};
    use crate::ray::Ray;
    use crate::sink::{CsvSink, EventSink};

    fn write_log(dir: &Path) {
        let mut sink = CsvSink::create(dir).unwrap();
        let ray = Ray::new(DVec3::ZERO, DVec3::Z, 555.0, "sun");

        let mut generate = Event::new(EventKind::Generate, "world".into());
        generate.normal = None;
        sink.record(0, &Step { ray: ray.clone(), event: generate }).unwrap();

        let mut transmit = Event::new(EventKind::Transmit, "world".into());
        transmit.hit = Some("slab".into());
        transmit.adjacent = Some("slab".into());
        transmit.normal = Some(DVec3::Z);
        sink.record(0, &Step { ray: ray.clone(), event: transmit }).unwrap();

        let mut reflect = Event::new(EventKind::Reflect, "world".into());
        reflect.hit = Some("slab".into());
        reflect.normal = Some(DVec3::Z);
        sink.record(1, &Step { ray: ray.clone(), event: reflect }).unwrap();

        let mut absorb = Event::new(EventKind::Absorb, "slab".into());
        absorb.component = Some("dye".into());
        sink.record(2, &Step { ray, event: absorb }).unwrap();

        sink.flush().unwrap();
    }

    #[test]
    fn counts_by_stream_and_node() {
        let dir = tempfile::tempdir().unwrap();
        write_log(dir.path());
        let rows = read_log(dir.path()).unwrap();
        assert_eq!(rows.len(), 4);

        let none = Constraint::default();
        assert_eq!(count(&rows, Stream::Entering, "slab", &none), 1);
        assert_eq!(count(&rows, Stream::Reflected, "slab", &none), 1);
        assert_eq!(count(&rows, Stream::Lost, "slab", &none), 1);
        assert_eq!(count(&rows, Stream::Killed, "slab", &none), 0);
    }

    #[test]
    fn source_and_normal_constraints_filter() {
        let dir = tempfile::tempdir().unwrap();
        write_log(dir.path());
        let rows = read_log(dir.path()).unwrap();

        let wrong_source = Constraint {
            source: Some("moon".to_string()),
            ..Default::default()
        };
        assert_eq!(count(&rows, Stream::Entering, "slab", &wrong_source), 0);

        let top_face = Constraint {
            normal: Some((2, 1.0)),
            ..Default::default()
        };
        assert_eq!(count(&rows, Stream::Entering, "slab", &top_face), 1);
        let side_face = Constraint {
            normal: Some((0, 1.0)),
            ..Default::default()
        };
        assert_eq!(count(&rows, Stream::Entering, "slab", &side_face), 0);
    }

    #[test]
    fn histogram_covers_matched_wavelengths() {
        let dir = tempfile::tempdir().unwrap();
        write_log(dir.path());
        let rows = read_log(dir.path()).unwrap();
        let hist = wavelength_histogram(&rows, Stream::Entering, "slab", &Constraint::default(), 4);
        assert_eq!(hist.len(), 4);
        let total: usize = hist.iter().map(|(_, _, c)| c).sum();
        assert_eq!(total, 1);
    }
}
