//! Magnetic field distributions of vortex lattices
//!
//! - [PofB::from_lattice] - histogram of a solved vortex lattice
//! - [PofB::skewed_gaussian] - analytic two sided Gaussian
//! - [PofB::add_background] - blend in a Gaussian background
//! - [PofB::convolve_gss] - Gaussian broadening through the Fourier domain
//!
//! # Quickstart example
//!
//! ```rust
//! # use musrtools_pofb::*;
//! # use musrtools_vortex::{VortexLattice, VortexParameters};
//! let params = VortexParameters::new(500.0, 150.0, 4.0, 64);
//! let mut solver = VortexLattice::BulkAnalyticGl.bulk_solver(params)?;
//!
//! let background = Background { field: 500.0, width: 0.2, weight: 0.1 };
//! let mut pofb = PofB::from_lattice(0.01, 0.2, solver.as_mut(), &Weighting::Uniform, Some(&background))?;
//! pofb.convolve_gss(1.0);
//!
//! let total: f64 = pofb.pb().iter().sum::<f64>() * pofb.db();
//! assert!((total - 1.0).abs() < 1e-9);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#![doc = include_str!("../readme.md")]

mod convolve;
mod distribution;
mod error;
mod lattice;
mod skewed;

// flatten public API and inline the documentation
#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use distribution::{Background, PofB, GAMMA_BAR};

#[doc(inline)]
pub use lattice::Weighting;
