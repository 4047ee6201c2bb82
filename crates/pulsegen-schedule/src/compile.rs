//! Configuration compiler: expands pulse groups into concrete
//! per-domain event sequences.

use log::debug;

use crate::domain::{Direction, Domain, DomainPreference};
use crate::group::{DomainValues, Group};

/// A fully materialized event schedule.
///
/// `passive_events[i]` is the falling edge paired with
/// `active_events[i]`. Values are expressed in the domain resolved for
/// that edge type.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub active_events: Vec<f64>,
    pub passive_events: Vec<f64>,
    pub active_domain: Domain,
    pub passive_domain: Domain,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("no initial value in group {group}")]
    MissingInitial { group: usize },

    #[error("no active value in group {group}")]
    MissingActive { group: usize },

    #[error("no total value in the {domain:?} domain in group {group}")]
    MissingTotal { group: usize, domain: Domain },

    #[error("total values indicate contradictory directions in group {group}")]
    ContradictoryDirection { group: usize },
}

/// Compile a configuration into an event schedule.
///
/// Pure function: on error nothing is committed, and compiling the same
/// input twice yields bit-identical sequences. An empty configuration
/// compiles to an empty schedule (time domains, positive direction).
pub fn compile(
    configuration: &[Group],
    active_preference: DomainPreference,
    passive_preference: DomainPreference,
) -> Result<Schedule, CompileError> {
    let mut active_events = Vec::new();
    let mut passive_events = Vec::new();
    let mut active_domain = None;
    let mut passive_domain = None;
    let mut direction: Option<Direction> = None;

    for (index, group) in configuration.iter().enumerate() {
        // A delay acts as an initial time offset relative to the run's
        // start. Injected into a working copy; the caller's groups are
        // left untouched.
        let mut initial = group.initial;
        if initial.time.is_none() {
            initial.time = group.delay.time;
        }

        let active_in_use = resolve_active_domain(&initial, active_preference)
            .ok_or(CompileError::MissingInitial { group: index })?;
        let passive_in_use = resolve_passive_domain(&group.active, passive_preference)
            .ok_or(CompileError::MissingActive { group: index })?;

        let active_width = group
            .active
            .get(passive_in_use)
            .ok_or(CompileError::MissingActive { group: index })?;
        let initial_active = initial
            .get(active_in_use)
            .ok_or(CompileError::MissingInitial { group: index })?;
        let initial_passive = initial
            .get(passive_in_use)
            .ok_or(CompileError::MissingInitial { group: index })?;
        let total_active = group.total.get(active_in_use).ok_or(CompileError::MissingTotal {
            group: index,
            domain: active_in_use,
        })?;
        let total_passive = group.total.get(passive_in_use).ok_or(CompileError::MissingTotal {
            group: index,
            domain: passive_in_use,
        })?;

        let mut cursor_active = initial_active;
        let mut cursor_passive = initial_passive;
        for _ in 0..group.repeats {
            active_events.push(cursor_active);
            passive_events.push(cursor_passive + active_width);
            cursor_active += total_active;
            cursor_passive += total_passive;
        }

        let group_direction = Direction::of_total(total_active);
        match direction {
            None => direction = Some(group_direction),
            Some(d) if d != group_direction => {
                return Err(CompileError::ContradictoryDirection { group: index });
            }
            Some(_) => {}
        }

        // Later groups may resolve different domains; the last
        // resolution wins. Only direction is checked cross-group.
        active_domain = Some(active_in_use);
        passive_domain = Some(passive_in_use);
    }

    let schedule = Schedule {
        active_events,
        passive_events,
        active_domain: active_domain.unwrap_or(Domain::Time),
        passive_domain: passive_domain.unwrap_or(Domain::Time),
        direction: direction.unwrap_or(Direction::Positive),
    };
    debug!(
        "compiled {} group(s) into {} pulse(s): active domain {:?}, passive domain {:?}, direction {:?}",
        configuration.len(),
        schedule.active_events.len(),
        schedule.active_domain,
        schedule.passive_domain,
        schedule.direction,
    );
    Ok(schedule)
}

/// The domain governing active edges, taken from the data available in
/// the group's initial values. `Default` prefers Position over Time.
fn resolve_active_domain(initial: &DomainValues, preference: DomainPreference) -> Option<Domain> {
    match preference.explicit() {
        Some(domain) => initial.get(domain).map(|_| domain),
        None => {
            if initial.position.is_some() {
                Some(Domain::Position)
            } else if initial.time.is_some() {
                Some(Domain::Time)
            } else {
                None
            }
        }
    }
}

/// The domain governing passive edges, taken from the data available in
/// the group's active width. `Default` prefers Time over Position.
fn resolve_passive_domain(active: &DomainValues, preference: DomainPreference) -> Option<Domain> {
    match preference.explicit() {
        Some(domain) => active.get(domain).map(|_| domain),
        None => {
            if active.time.is_some() {
                Some(Domain::Time)
            } else if active.position.is_some() {
                Some(Domain::Position)
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_domain_default_prefers_position() {
        let initial = DomainValues::both(1.0, 2.0);
        assert_eq!(
            resolve_active_domain(&initial, DomainPreference::Default),
            Some(Domain::Position)
        );
    }

    #[test]
    fn test_active_domain_default_falls_back_to_time() {
        let initial = DomainValues::time(1.0);
        assert_eq!(
            resolve_active_domain(&initial, DomainPreference::Default),
            Some(Domain::Time)
        );
    }

    #[test]
    fn test_active_domain_explicit_requires_value() {
        let initial = DomainValues::time(1.0);
        assert_eq!(
            resolve_active_domain(&initial, DomainPreference::Position),
            None
        );
        assert_eq!(
            resolve_active_domain(&initial, DomainPreference::Time),
            Some(Domain::Time)
        );
    }

    #[test]
    fn test_passive_domain_default_prefers_time() {
        let active = DomainValues::both(1.0, 2.0);
        assert_eq!(
            resolve_passive_domain(&active, DomainPreference::Default),
            Some(Domain::Time)
        );
    }

    #[test]
    fn test_passive_domain_default_falls_back_to_position() {
        let active = DomainValues::position(1.0);
        assert_eq!(
            resolve_passive_domain(&active, DomainPreference::Default),
            Some(Domain::Position)
        );
    }

    #[test]
    fn test_empty_configuration_compiles_empty() {
        let schedule = compile(&[], DomainPreference::Default, DomainPreference::Default).unwrap();
        assert!(schedule.active_events.is_empty());
        assert!(schedule.passive_events.is_empty());
    }

    #[test]
    fn test_missing_total_is_reported() {
        let group = Group {
            initial: DomainValues::time(0.0),
            active: DomainValues::time(1.0),
            repeats: 1,
            ..Group::default()
        };
        let err = compile(
            &[group],
            DomainPreference::Default,
            DomainPreference::Default,
        )
        .unwrap_err();
        assert_eq!(
            err,
            CompileError::MissingTotal {
                group: 0,
                domain: Domain::Time
            }
        );
    }
}
