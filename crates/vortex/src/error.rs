//! Result and Error types for musrtools-vortex

// internal modules
use crate::lattice::VortexLattice;

/// Type alias for Result<T, vortex::Error>
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `musrtools-vortex` crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{name} must be non-zero for a vortex lattice calculation")]
    ZeroParameter { name: &'static str },

    #[error("grid needs at least {min} steps, found {found}")]
    TooFewSteps { min: usize, found: usize },

    #[error("film calculations need a thickness")]
    MissingThickness,

    #[error("film calculations need the number of steps along z")]
    MissingDepthSteps,

    #[error("grid of {steps}x{steps} steps can't hold {length} values")]
    GridShape { steps: usize, length: usize },

    #[error("{0:?} has no two-dimensional bulk solver")]
    NotABulkLattice(VortexLattice),

    #[error("{0:?} has no closed form solution")]
    NotAnalytic(VortexLattice),
}
