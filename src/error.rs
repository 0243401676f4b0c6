//!
//! Defines error types for model construction and for the simulation kernel.

/// Invalid-argument conditions raised while building or mutating a model.
///
/// These are reported synchronously at the call site and never retried; the
/// model is left exactly as it was before the rejected call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// A rate constant below zero was supplied.
    #[error("Reaction constant can't be negative (got {0})")]
    NegativeRateConstant(f64),
    /// The owning reaction set does not exist (no container to register with).
    #[error("No reaction set '{0}' to own the reaction")]
    UnknownReactionSet(String),
    /// A species handle was created by a different model.
    #[error("Species '{0}' belongs to a different model")]
    ForeignSpecies(String),
    /// The species handle does not resolve in this model (e.g. stale index).
    #[error("Unknown species '{0}'")]
    UnknownSpecies(String),
    /// No reaction with this id exists in the given set.
    #[error("Unknown reaction '{reaction}' in set '{set}'")]
    UnknownReaction { set: String, reaction: String },
    /// Identifier is not of the form `[A-Za-z][A-Za-z0-9_]*`.
    #[error("'{0}' is not a valid id")]
    InvalidId(String),
    /// Identifier is already taken within its container.
    #[error("'{0}' is already in use")]
    DuplicateId(String),
    /// A volume reaction was given surface reactants, surface products or outer products.
    #[error("Volume reaction '{0}' cannot reference surface or outer terms")]
    SurfaceTermInVolumeReaction(String),
    /// The reaction has been torn down and no longer accepts mutation.
    #[error("Reaction '{0}' has been removed from its set")]
    Detached(String),
    /// Geometry description is inconsistent (non-positive size, unknown reference).
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    /// A surface reaction needs an outer compartment the patch does not have.
    #[error("Surface reaction '{reaction}' needs an outer compartment on patch '{patch}'")]
    MissingOuterCompartment { reaction: String, patch: String },
}

/// Represents errors that can occur while initializing or running the kernel.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KernelError {
    /// `step()` or a run method was called before `initialize()`.
    #[error("Scheduler has not been initialized")]
    NotInitialized,
    /// `initialize()` was called on a scheduler that already holds a process set.
    #[error("Scheduler is already initialized")]
    AlreadyInitialized,
    /// The scheduler hit an invariant violation earlier and refuses to continue.
    #[error("Scheduler is faulted and must be rebuilt")]
    Faulted,
    /// An invariant was violated while firing (negative count, corrupt propensity).
    #[error("Kernel invariant violation: {0}")]
    InvariantViolation(String),
    /// The dependency graph does not cover the process list it was handed with.
    #[error("Dependency graph mismatch: {0}")]
    GraphMismatch(String),
    /// A region or process index outside the compiled system.
    #[error("Unknown {kind} '{id}'")]
    Unknown { kind: &'static str, id: String },
    /// A model-level validation error surfaced during compilation.
    #[error(transparent)]
    Model(#[from] ModelError),
    /// Configuration could not be parsed or is out of range.
    #[error("Configuration error: {0}")]
    Config(String),
    /// A control call received an argument it cannot act on.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl KernelError {
    /// Whether this error is fatal for the replicate.
    pub fn is_fatal(&self) -> bool {
        matches!(self, KernelError::InvariantViolation(_) | KernelError::Faulted)
    }
}
