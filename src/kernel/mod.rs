pub mod core;
pub mod runtime;

#[cfg(test)]
mod tests;

// Re-export the primary types so callers can use `crate::kernel::*` paths.
pub use self::core::{FiredEvent, RunSummary, Scheduler, SchedulerStatus, StepOutcome};
pub use self::runtime::{seeded_rng, DefaultRng, RandomSource};
