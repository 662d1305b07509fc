// standard library
use std::f64::consts::SQRT_2;

// internal modules
use crate::constants::{upper_critical_field, FLUX_QUANTUM};
use crate::error::{Error, Result};
use crate::lattice::VortexLattice;

// external crates
use serde::{Deserialize, Serialize};

/// Physical parameters and grid size of a vortex lattice calculation
///
/// Lengths are in nm and fields in G. Signs are ignored, only magnitudes
/// enter the solvers.
///
/// ```rust
/// # use musrtools_vortex::VortexParameters;
/// let params = VortexParameters::new(1000.0, 200.0, 5.0, 128);
/// assert!(!params.is_degenerate());
///
/// // above Hc2 there is no vortex lattice
/// let params = VortexParameters::new(1.0e6, 200.0, 5.0, 128);
/// assert!(params.is_degenerate());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VortexParameters {
    /// Applied field (G)
    pub field: f64,
    /// Magnetic penetration depth (nm)
    pub lambda: f64,
    /// Ginzburg-Landau coherence length (nm)
    pub xi: f64,
    /// Film thickness (nm), only used by film solvers
    #[serde(default)]
    pub thickness: Option<f64>,
    /// Grid points along each in-plane axis of the unit cell
    pub steps: usize,
    /// Grid points across the film thickness, only used by film solvers
    #[serde(default)]
    pub steps_z: Option<usize>,
}

impl VortexParameters {
    /// Bulk parameters without any film geometry
    pub fn new(field: f64, lambda: f64, xi: f64, steps: usize) -> Self {
        Self {
            field,
            lambda,
            xi,
            thickness: None,
            steps,
            steps_z: None,
        }
    }

    /// Add a film geometry of `thickness` nm sampled by `steps_z` points
    pub fn with_film(mut self, thickness: f64, steps_z: usize) -> Self {
        self.thickness = Some(thickness);
        self.steps_z = Some(steps_z);
        self
    }

    /// Upper critical field Hc2 = Phi0 / (2 pi xi^2)
    pub fn upper_critical_field(&self) -> f64 {
        upper_critical_field(self.xi.abs())
    }

    /// Ginzburg-Landau parameter lambda / xi
    pub fn kappa(&self) -> f64 {
        self.lambda.abs() / self.xi.abs()
    }

    /// Distance between neighbouring vortices (nm)
    ///
    /// The rectangular unit cell of a triangular lattice spans
    /// `sqrt(3) a` along the grid columns and `a` along the rows.
    pub fn lattice_constant(&self, lattice: VortexLattice) -> f64 {
        let field = self.field.abs();
        if lattice.is_triangular() {
            (2.0 * FLUX_QUANTUM / (field * 3.0_f64.sqrt())).sqrt()
        } else {
            (FLUX_QUANTUM / field).sqrt()
        }
    }

    /// True when no vortex lattice forms
    ///
    /// This is either a field at or above Hc2, or a type-I superconductor
    /// with lambda < xi / sqrt(2).
    pub fn is_degenerate(&self) -> bool {
        self.field.abs() >= self.upper_critical_field()
            || self.lambda.abs() < self.xi.abs() / SQRT_2
    }

    /// Magnitudes of all parameters, rejecting zero values
    pub(crate) fn validated(&self) -> Result<Self> {
        for (name, value) in [("field", self.field), ("lambda", self.lambda), ("xi", self.xi)] {
            if value == 0.0 {
                return Err(Error::ZeroParameter { name });
            }
        }

        if self.steps < 2 {
            return Err(Error::TooFewSteps {
                min: 2,
                found: self.steps,
            });
        }

        Ok(Self {
            field: self.field.abs(),
            lambda: self.lambda.abs(),
            xi: self.xi.abs(),
            thickness: self.thickness.map(f64::abs),
            ..*self
        })
    }

    /// Film thickness and z steps, both required
    pub(crate) fn film_geometry(&self) -> Result<(f64, usize)> {
        let thickness = self.thickness.ok_or(Error::MissingThickness)?;
        if thickness == 0.0 {
            return Err(Error::ZeroParameter { name: "thickness" });
        }
        let steps_z = self.steps_z.ok_or(Error::MissingDepthSteps)?;
        if steps_z < 2 {
            return Err(Error::TooFewSteps {
                min: 2,
                found: steps_z,
            });
        }
        Ok((thickness.abs(), steps_z))
    }
}

/// Round an odd number of steps up to the next even number
pub(crate) fn even_steps(steps: usize) -> usize {
    steps + steps % 2
}

/// Round a number of steps up to the next multiple of four
pub(crate) fn quad_steps(steps: usize) -> usize {
    match steps % 4 {
        0 => steps,
        r => steps + 4 - r,
    }
}
