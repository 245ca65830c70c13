//! Event records: the causal history of a ray.
//!
//! The engine emits one event per state transition. A `Step` pairs the event
//! with the ray state *after* it, so a ray's history is an ordered list of
//! steps beginning with `Generate` and ending with exactly one terminal
//! event.

use glam::DVec3;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::ray::Ray;

/// What happened at one point of a ray's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The ray left its light source.
    Generate,
    /// The ray reached a surface; a decision event follows.
    Hit,
    /// Bounced back into its container at a surface.
    Reflect,
    /// Crossed a surface into the adjacent medium.
    Transmit,
    /// Re-emitted by a luminophore at the absorption point.
    Emit,
    /// Redirected by a scatterer, wavelength unchanged.
    Scatter,
    /// Terminated by absorption (volume or surface).
    Absorb,
    /// Crossed the outer world boundary.
    Exit,
    /// Terminated by a safety threshold, not by physics.
    Kill,
    /// Terminated because the trace hit a numerical impossibility.
    Error,
}

impl EventKind {
    /// Text tag used in the persisted event log.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Generate => "GENERATE",
            EventKind::Hit => "HIT",
            EventKind::Reflect => "REFLECT",
            EventKind::Transmit => "TRANSMIT",
            EventKind::Emit => "EMIT",
            EventKind::Scatter => "SCATTER",
            EventKind::Absorb => "ABSORB",
            EventKind::Exit => "EXIT",
            EventKind::Kill => "KILL",
            EventKind::Error => "ERROR",
        }
    }

    /// True for events that end a ray's history.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventKind::Absorb | EventKind::Exit | EventKind::Kill | EventKind::Error
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GENERATE" => Ok(EventKind::Generate),
            "HIT" => Ok(EventKind::Hit),
            "REFLECT" => Ok(EventKind::Reflect),
            "TRANSMIT" => Ok(EventKind::Transmit),
            "EMIT" => Ok(EventKind::Emit),
            "SCATTER" => Ok(EventKind::Scatter),
            "ABSORB" => Ok(EventKind::Absorb),
            "EXIT" => Ok(EventKind::Exit),
            "KILL" => Ok(EventKind::Kill),
            "ERROR" => Ok(EventKind::Error),
            other => Err(format!("unknown event kind {other:?}")),
        }
    }
}

/// One event of a ray's history.
#[derive(Debug, Clone)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// Component that caused a volume interaction, if any.
    pub component: Option<Arc<str>>,
    /// Node whose surface was involved, if any.
    pub hit: Option<Arc<str>>,
    /// Container node at the moment of the event.
    pub container: Arc<str>,
    /// Node on the far side after a boundary crossing.
    pub adjacent: Option<Arc<str>>,
    /// Which part of the hit surface: box face, cylinder cap, triangle index.
    pub facet: Option<String>,
    /// Outward surface normal at the event, if the event happened on a
    /// surface.
    pub normal: Option<DVec3>,
}

impl Event {
    /// An event with only a kind and a container; the remaining fields are
    /// filled in by the engine where they apply.
    pub fn new(kind: EventKind, container: Arc<str>) -> Self {
        Self {
            kind,
            component: None,
            hit: None,
            container,
            adjacent: None,
            facet: None,
            normal: None,
        }
    }
}

/// Ray state after an event, paired with the event itself.
#[derive(Debug, Clone)]
pub struct Step {
    /// The ray as the event left it.
    pub ray: Ray,
    /// What happened.
    pub event: Event,
}
