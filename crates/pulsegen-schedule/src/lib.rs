pub mod compile;
pub mod domain;
pub mod group;

pub use compile::{compile, CompileError, Schedule};
pub use domain::{Direction, DirectionError, Domain, DomainPreference};
pub use group::{DomainValues, Group};
