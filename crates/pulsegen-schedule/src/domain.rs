use serde::{Deserialize, Serialize};

/// A resolved physical domain a scheduled value is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    Time,
    Position,
}

/// Operator preference for which domain should govern an edge.
///
/// `Default` means "infer from the data present in the group":
/// the compiler picks whichever domain the relevant field carries a
/// value for, with a fixed tie-break order per edge type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DomainPreference {
    #[default]
    Default,
    Time,
    Position,
}

impl DomainPreference {
    /// The explicitly requested domain, if any.
    pub fn explicit(self) -> Option<Domain> {
        match self {
            DomainPreference::Default => None,
            DomainPreference::Time => Some(Domain::Time),
            DomainPreference::Position => Some(Domain::Position),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("direction can be -1 or 1 (negative or positive), got {0}")]
pub struct DirectionError(pub i8);

/// Whether the governing domain is expected to increase or decrease
/// over the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    /// Build a direction from its numeric sign.
    pub fn from_sign(sign: i8) -> Result<Self, DirectionError> {
        match sign {
            1 => Ok(Direction::Positive),
            -1 => Ok(Direction::Negative),
            other => Err(DirectionError(other)),
        }
    }

    /// Direction implied by a period value: a negative total runs the
    /// schedule backward.
    pub fn of_total(total: f64) -> Self {
        if total < 0.0 {
            Direction::Negative
        } else {
            Direction::Positive
        }
    }

    pub fn sign(self) -> i8 {
        match self {
            Direction::Positive => 1,
            Direction::Negative => -1,
        }
    }

    /// The firing condition: the observed value has reached the
    /// candidate when moving in this direction.
    pub fn satisfied(self, observed: f64, candidate: f64) -> bool {
        match self {
            Direction::Positive => observed >= candidate,
            Direction::Negative => observed <= candidate,
        }
    }
}
