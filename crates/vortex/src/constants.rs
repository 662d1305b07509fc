//! Physical and numerical constants of the vortex solvers

// standard library
use std::f64::consts::PI;

/// Magnetic flux quantum in G nm^2
pub const FLUX_QUANTUM: f64 = 2.067833667e7;

/// pi / (4 sqrt 3), exponent scale of the Abrikosov order parameter
pub const PI_4SQRT3: f64 = 0.45344984105855446;

/// Iteration cap of the bulk nonlinear Ginzburg-Landau solver
pub const MAX_BULK_ITERATIONS: usize = 1000;

/// Iteration cap of the film nonlinear Ginzburg-Landau solver
pub const MAX_FILM_ITERATIONS: usize = 50;

/// Film pass after which both coefficient sets count as converged
pub const FILM_FORCED_CONVERGENCE: usize = 5;

/// Upper critical field Hc2 (G) for a coherence length `xi` (nm)
pub fn upper_critical_field(xi: f64) -> f64 {
    FLUX_QUANTUM / (2.0 * PI * xi * xi)
}
