// internal modules
use crate::analytic::AnalyticFieldCalc;
use crate::error::{Error, Result};
use crate::grid::{FieldGrid, FilmFieldGrid};
use crate::ngl::NglFieldCalc;
use crate::params::VortexParameters;

// external crates
use serde::{Deserialize, Serialize};

/// Vortex lattice models with a field solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VortexLattice {
    /// London model, triangular lattice
    BulkTriangular,
    /// London model, square lattice
    BulkSquare,
    /// Modified London model with (1 - b) rescaled lengths
    BulkModifiedLondon,
    /// Analytical Ginzburg-Landau model with Bessel function cores
    BulkAnalyticGl,
    /// Iterative solution of the nonlinear Ginzburg-Landau equations
    BulkNonlinearGl,
    /// Nonlinear Ginzburg-Landau solution for a thin film, all components
    FilmNonlinearGl,
}

impl VortexLattice {
    pub fn is_triangular(&self) -> bool {
        !matches!(self, Self::BulkSquare)
    }

    pub fn is_film(&self) -> bool {
        matches!(self, Self::FilmNonlinearGl)
    }

    /// Solver for any of the planar bulk lattices
    ///
    /// ```rust
    /// # use musrtools_vortex::{VortexFieldCalc, VortexLattice, VortexParameters};
    /// let params = VortexParameters::new(500.0, 150.0, 4.0, 64);
    /// let mut solver = VortexLattice::BulkTriangular.bulk_solver(params)?;
    ///
    /// // the field of the vortex core is the largest in the cell
    /// assert!(solver.b_max() > solver.b_min());
    /// # Ok::<(), musrtools_vortex::Error>(())
    /// ```
    pub fn bulk_solver(&self, params: VortexParameters) -> Result<Box<dyn BulkFieldCalc>> {
        match self {
            Self::BulkNonlinearGl => Ok(Box::new(NglFieldCalc::new(params)?)),
            Self::FilmNonlinearGl => Err(Error::NotABulkLattice(*self)),
            _ => Ok(Box::new(AnalyticFieldCalc::new(*self, params)?)),
        }
    }
}

/// Field extrema of a solver grid
pub trait GridExtrema {
    fn b_min(&self) -> f64;
    fn b_max(&self) -> f64;
}

impl GridExtrema for FieldGrid {
    fn b_min(&self) -> f64 {
        FieldGrid::b_min(self)
    }

    fn b_max(&self) -> f64 {
        FieldGrid::b_max(self)
    }
}

impl GridExtrema for FilmFieldGrid {
    fn b_min(&self) -> f64 {
        FilmFieldGrid::b_min(self)
    }

    fn b_max(&self) -> f64 {
        FilmFieldGrid::b_max(self)
    }
}

/// Common interface of all vortex lattice field solvers
///
/// Grids are cached. Changing the parameters drops the cached grid and the
/// next call to [VortexFieldCalc::grid] solves again.
pub trait VortexFieldCalc {
    type Grid: GridExtrema;

    /// Solve for the field grid, replacing any cached grid
    fn calculate_grid(&mut self) -> &Self::Grid;

    /// Cached grid, solved on first use
    fn grid(&mut self) -> &Self::Grid;

    /// Whether a solved grid is cached
    fn grid_exists(&self) -> bool;

    fn parameters(&self) -> &VortexParameters;

    /// Replace the parameters and drop the cached grid
    fn set_parameters(&mut self, params: VortexParameters) -> Result<()>;

    fn lattice(&self) -> VortexLattice;

    /// Grid points along each in-plane axis, after rounding
    fn steps(&self) -> usize {
        self.parameters().steps
    }

    fn is_triangular(&self) -> bool {
        self.lattice().is_triangular()
    }

    fn b_min(&mut self) -> f64 {
        self.grid().b_min()
    }

    fn b_max(&mut self) -> f64 {
        self.grid().b_max()
    }
}

/// Object safe alias for the planar bulk solvers
pub trait BulkFieldCalc: VortexFieldCalc<Grid = FieldGrid> + Send {}

impl<T: VortexFieldCalc<Grid = FieldGrid> + Send> BulkFieldCalc for T {}

#[cfg(test)]
mod lattice_tests {
    use super::*;

    #[test]
    fn film_has_no_bulk_solver() {
        let params = VortexParameters::new(500.0, 150.0, 4.0, 64);
        assert!(matches!(
            VortexLattice::FilmNonlinearGl.bulk_solver(params),
            Err(Error::NotABulkLattice(VortexLattice::FilmNonlinearGl))
        ));
    }

    #[test]
    fn names_in_config_files() {
        let lattice: VortexLattice = serde_json::from_str("\"bulk_analytic_gl\"").unwrap();
        assert_eq!(lattice, VortexLattice::BulkAnalyticGl);
        assert!(!VortexLattice::BulkSquare.is_triangular());
    }

    #[test]
    fn cache_is_dropped_with_new_parameters() {
        let params = VortexParameters::new(500.0, 150.0, 4.0, 32);
        let mut solver = VortexLattice::BulkSquare.bulk_solver(params).unwrap();
        assert!(!solver.grid_exists());
        solver.grid();
        assert!(solver.grid_exists());

        solver
            .set_parameters(VortexParameters::new(800.0, 150.0, 4.0, 32))
            .unwrap();
        assert!(!solver.grid_exists());
        assert_eq!(solver.parameters().field, 800.0);
    }
}
