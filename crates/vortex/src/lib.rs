//! Field distribution of superconducting vortex lattices
//!
//! Every solver computes B(x, y) over one unit cell of the vortex lattice
//! on a square grid of `steps` x `steps` points, with a vortex core at grid
//! index 0. Film solvers add a third axis across the film thickness.
//!
//! | Lattice                              | Solver                | Model                                   |
//! | ------------------------------------ | --------------------- | --------------------------------------- |
//! | [VortexLattice::BulkTriangular]      | [AnalyticFieldCalc]   | London, triangular                      |
//! | [VortexLattice::BulkSquare]          | [AnalyticFieldCalc]   | London, square                          |
//! | [VortexLattice::BulkModifiedLondon]  | [AnalyticFieldCalc]   | London with (1 - b) rescaled lengths    |
//! | [VortexLattice::BulkAnalyticGl]      | [AnalyticFieldCalc]   | analytical Ginzburg-Landau              |
//! | [VortexLattice::BulkNonlinearGl]     | [NglFieldCalc]        | iterative nonlinear Ginzburg-Landau     |
//! | [VortexLattice::FilmNonlinearGl]     | [FilmNglFieldCalc]    | iterative nonlinear Ginzburg-Landau, 3D |
//!
//! All of them implement [VortexFieldCalc], which caches the grid until the
//! parameters change.
//!
//! # Quickstart example
//!
//! ```rust
//! # use musrtools_vortex::*;
//! let params = VortexParameters::new(1000.0, 200.0, 20.0, 64);
//! let mut solver = AnalyticFieldCalc::new(VortexLattice::BulkTriangular, params)?;
//!
//! let grid = solver.grid();
//! assert_eq!(grid.steps(), 64);
//!
//! // the mean field of the cell is the applied field
//! assert!((grid.mean() - 1000.0).abs() < 1e-6);
//! # Ok::<(), musrtools_vortex::Error>(())
//! ```
#![doc = include_str!("../readme.md")]

mod analytic;
mod bessel;
mod constants;
mod error;
mod fft;
mod film;
mod grid;
mod lattice;
mod ngl;
mod params;

// flatten public API and inline the documentation
#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use lattice::{BulkFieldCalc, GridExtrema, VortexFieldCalc, VortexLattice};

#[doc(inline)]
pub use params::VortexParameters;

#[doc(inline)]
pub use grid::{FieldGrid, FilmFieldGrid};

#[doc(inline)]
pub use analytic::{london_field_at, AnalyticFieldCalc};

#[doc(inline)]
pub use ngl::NglFieldCalc;

#[doc(inline)]
pub use film::FilmNglFieldCalc;

#[doc(inline)]
pub use fft::FftPlans;

#[doc(inline)]
pub use bessel::{bessel_i1, bessel_k1};

#[doc(inline)]
pub use constants::{
    upper_critical_field, FILM_FORCED_CONVERGENCE, FLUX_QUANTUM, MAX_BULK_ITERATIONS,
    MAX_FILM_ITERATIONS, PI_4SQRT3,
};
