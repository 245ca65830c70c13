//! Event sinks: where ray histories go.
//!
//! The engine does not own its sink; a batch hands every step to whatever
//! implements [`EventSink`]. Tests use the in-memory sink, the CLI writes
//! the two-table tabular log described in the external interface: a `ray`
//! table with one row per post-event ray state and an `event` table with one
//! row per event, joined by row index.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::SinkError;
use crate::event::Step;

/// Receiver for the ordered event stream of a batch.
pub trait EventSink {
    /// Record one step of the ray identified by `throw_id`.
    fn record(&mut self, throw_id: u64, step: &Step) -> Result<(), SinkError>;

    /// Flush buffered rows to durable storage.
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps every step in memory. Used by tests and the count queries.
#[derive(Debug, Default)]
pub struct MemorySink {
    steps: Vec<(u64, Step)>,
}

impl MemorySink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded steps with their throw ids, in insertion order.
    pub fn steps(&self) -> &[(u64, Step)] {
        &self.steps
    }

    /// Group the steps back into per-ray histories, ordered by throw id.
    pub fn histories(&self) -> Vec<Vec<&Step>> {
        let mut histories: Vec<Vec<&Step>> = Vec::new();
        let mut last_throw = None;
        for (throw, step) in &self.steps {
            if last_throw != Some(*throw) {
                histories.push(Vec::new());
                last_throw = Some(*throw);
            }
            histories
                .last_mut()
                .expect("pushed above")
                .push(step);
        }
        histories
    }
}

impl EventSink for MemorySink {
    fn record(&mut self, throw_id: u64, step: &Step) -> Result<(), SinkError> {
        self.steps.push((throw_id, step.clone()));
        Ok(())
    }
}

/// Writes `ray.csv` and `event.csv` into a log directory.
#[derive(Debug)]
pub struct CsvSink {
    rays: BufWriter<File>,
    events: BufWriter<File>,
    next_row: u64,
}

/// Header of the ray table.
pub const RAY_HEADER: &str = "throw_id,x,y,z,i,j,k,wavelength,source,travelled,duration";
/// Header of the event table.
pub const EVENT_HEADER: &str = "ray_id,kind,component,hit,container,adjacent,facet,ni,nj,nk";

impl CsvSink {
    /// Create (or truncate) the two table files inside `dir`.
    pub fn create(dir: &Path) -> Result<Self, SinkError> {
        std::fs::create_dir_all(dir)?;
        let mut rays = BufWriter::new(File::create(dir.join("ray.csv"))?);
        let mut events = BufWriter::new(File::create(dir.join("event.csv"))?);
        writeln!(rays, "{RAY_HEADER}")?;
        writeln!(events, "{EVENT_HEADER}")?;
        Ok(Self {
            rays,
            events,
            next_row: 1,
        })
    }
}

impl EventSink for CsvSink {
    fn record(&mut self, throw_id: u64, step: &Step) -> Result<(), SinkError> {
        let ray = &step.ray;
        writeln!(
            self.rays,
            "{},{},{},{},{},{},{},{},{},{},{}",
            throw_id,
            ray.position.x,
            ray.position.y,
            ray.position.z,
            ray.direction.x,
            ray.direction.y,
            ray.direction.z,
            ray.wavelength,
            ray.source,
            ray.travelled,
            ray.duration,
        )?;

        let event = &step.event;
        let normal = event.normal.unwrap_or_default();
        writeln!(
            self.events,
            "{},{},{},{},{},{},{},{},{},{}",
            self.next_row,
            event.kind,
            event.component.as_deref().unwrap_or(""),
            event.hit.as_deref().unwrap_or(""),
            event.container,
            event.adjacent.as_deref().unwrap_or(""),
            event.facet.as_deref().unwrap_or(""),
            normal.x,
            normal.y,
            normal.z,
        )?;
        self.next_row += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.rays.flush()?;
        self.events.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, EventKind};
    use crate::ray::Ray;
    use glam::DVec3;

    fn step(kind: EventKind) -> Step {
        Step {
            ray: Ray::new(DVec3::ZERO, DVec3::Z, 555.0, "lamp"),
            event: Event::new(kind, "world".into()),
        }
    }

    #[test]
    fn memory_sink_groups_histories() {
        let mut sink = MemorySink::new();
        sink.record(0, &step(EventKind::Generate)).unwrap();
        sink.record(0, &step(EventKind::Exit)).unwrap();
        sink.record(1, &step(EventKind::Generate)).unwrap();
        sink.record(1, &step(EventKind::Absorb)).unwrap();
        let histories = sink.histories();
        assert_eq!(histories.len(), 2);
        assert_eq!(histories[0].len(), 2);
        assert_eq!(histories[1][1].event.kind, EventKind::Absorb);
    }

    #[test]
    fn csv_sink_writes_paired_tables() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::create(dir.path()).unwrap();
        sink.record(0, &step(EventKind::Generate)).unwrap();
        sink.record(0, &step(EventKind::Exit)).unwrap();
        sink.flush().unwrap();

        let rays = std::fs::read_to_string(dir.path().join("ray.csv")).unwrap();
        let events = std::fs::read_to_string(dir.path().join("event.csv")).unwrap();
        let ray_lines: Vec<&str> = rays.lines().collect();
        let event_lines: Vec<&str> = events.lines().collect();
        assert_eq!(ray_lines[0], RAY_HEADER);
        assert_eq!(event_lines[0], EVENT_HEADER);
        assert_eq!(ray_lines.len(), 3);
        assert_eq!(event_lines.len(), 3);
        assert!(ray_lines[1].starts_with("0,"));
        assert!(event_lines[1].starts_with("1,GENERATE"));
        assert!(event_lines[2].starts_with("2,EXIT"));
    }
}
