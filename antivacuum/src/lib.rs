//! Anti-Vacuum - lazy-region warmer
//!
//! Forces a lazily materializing world to load its contents by reading every
//! cell of a region (and, in aggressive mode, its eight neighbors) in a fixed
//! set of access patterns. Reads run in the background, are triggered from
//! key bindings or commands, and report progress back to the triggering actor.
//!
//! # Layout
//!
//! - [`coord`] - region addresses, world extent and cell coordinates
//! - [`source`] - the lazy `CellSource` abstraction and a simulated backend
//! - [`probe`] - single-cell reads that never fail
//! - [`pattern`] - the four access patterns
//! - [`neighbor`] - Moore-neighborhood expansion
//! - [`scheduler`] - runs pattern passes over regions
//! - [`gate`] - turns triggers into background warms with feedback
//! - [`config`], [`logging`] - INI configuration and tracing setup

pub mod config;
pub mod coord;
pub mod gate;
pub mod logging;
pub mod neighbor;
pub mod pattern;
pub mod probe;
pub mod scheduler;
pub mod source;

pub use coord::{CellCoordinate, RegionAddress, WorldExtent};
pub use gate::{EventGate, FeedbackMessage, GateConfig, Trigger};
pub use pattern::AccessPattern;
pub use probe::CellProbe;
pub use scheduler::{RegionWarmer, SchedulerConfig, WarmMode, WarmResult, WarmScheduler};
pub use source::{CellSource, CellState, SimulatedSource};
