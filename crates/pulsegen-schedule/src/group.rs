use serde::{Deserialize, Serialize};

use crate::domain::Domain;

/// Per-domain values for one field role of a group.
///
/// Either domain may be absent; the compiler decides which one governs
/// based on the operator's preference and the data present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainValues {
    pub time: Option<f64>,
    pub position: Option<f64>,
}

impl DomainValues {
    pub fn time(value: f64) -> Self {
        Self {
            time: Some(value),
            position: None,
        }
    }

    pub fn position(value: f64) -> Self {
        Self {
            time: None,
            position: Some(value),
        }
    }

    pub fn both(time: f64, position: f64) -> Self {
        Self {
            time: Some(time),
            position: Some(position),
        }
    }

    pub fn get(&self, domain: Domain) -> Option<f64> {
        match domain {
            Domain::Time => self.time,
            Domain::Position => self.position,
        }
    }
}

/// One repeated-pulse specification.
///
/// A configuration is an ordered list of groups; generated offsets
/// accumulate within each group, and each group restarts its cursors
/// from its own `initial` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Starting offset per domain. A missing time value is derived from
    /// `delay` at compile time.
    pub initial: DomainValues,
    /// Initial offset relative to the run's start time; injected into
    /// `initial`'s time value when that is absent.
    pub delay: DomainValues,
    /// Active-phase width, measured on the resolved passive domain.
    pub active: DomainValues,
    /// Period between successive repeats; its sign in the resolved
    /// active domain fixes the schedule's direction.
    pub total: DomainValues,
    /// Number of pulses generated by this group.
    pub repeats: u64,
}
