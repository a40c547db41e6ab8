//! Core types and utilities

pub mod pools;
pub mod units;

pub use pools::{CarbonPools, StandState, Trajectory};
pub use units::{Fraction, HalfLife};
