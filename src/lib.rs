#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(deprecated)]

//!
//! Wellmixed-Core is a stochastic simulation kernel for well-mixed
//! reaction networks.
//!
//! A `Model` declares species and reaction sets; a `Geometry` places those
//! sets in compartments (volumes) and on patches (surfaces between
//! compartments). Compiling the two yields one kinetic process per
//! (reaction × region), a dependency graph between the processes, and a
//! direct-method `Scheduler` that advances molecule counts one exact
//! reaction event at a time.

// Shared index types, physical constants and id validation.
pub mod types;

// Error taxonomy for model construction and the kernel.
pub mod error;

// Reaction-network definition: species, reaction sets, reactions.
pub mod model;

// Compartments and patches.
pub mod geom;

// Per-replicate molecule counts and region sizes.
pub mod state;

// Kinetic processes (volume and surface reactions).
pub mod kproc;

// Process-to-process update dependencies.
pub mod deps;

// Scheduler configuration.
pub mod config;

// Direct-method scheduler and its random source.
pub mod kernel;

// Compilation of model + geometry, and the id-addressed simulation facade.
pub mod solver;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::SchedulerConfig;
pub use error::{KernelError, ModelError};
pub use geom::Geometry;
pub use kernel::{FiredEvent, RandomSource, RunSummary, Scheduler, SchedulerStatus, StepOutcome};
pub use model::{Model, Reaction, ReactionSet, ReactionSetKind, SpeciesRef, Stoichiometry};
pub use solver::{compile, Simulation};
pub use types::{Orientation, Region};
