//! Field grids of the vortex solvers

// internal modules
use crate::error::{Error, Result};

/// Field values B(x, y) in G over one vortex lattice unit cell
///
/// Values are stored row major, `values[col + steps * row]`. Grid index 0
/// holds a vortex core, so the largest field of the cell.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldGrid {
    steps: usize,
    values: Vec<f64>,
}

impl FieldGrid {
    /// Wrap `steps * steps` field values
    pub fn new(steps: usize, values: Vec<f64>) -> Result<Self> {
        if values.len() != steps * steps {
            return Err(Error::GridShape {
                steps,
                length: values.len(),
            });
        }
        Ok(Self { steps, values })
    }

    pub(crate) fn from_values(steps: usize, values: Vec<f64>) -> Self {
        Self { steps, values }
    }

    /// Grid with the same field everywhere
    pub fn uniform(steps: usize, field: f64) -> Self {
        Self {
            steps,
            values: vec![field; steps * steps],
        }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Field at grid row `row` and column `col`
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.steps || col >= self.steps {
            return None;
        }
        self.values.get(col + self.steps * row).copied()
    }

    /// Mean field over the cell
    pub fn mean(&self) -> f64 {
        self.values.iter().sum::<f64>() / self.values.len().max(1) as f64
    }

    /// Field at the vortex core, index 0
    pub fn b_max(&self) -> f64 {
        self.values.first().copied().unwrap_or_default()
    }

    /// Smallest field of the first quadrant
    ///
    /// Any value <= 0 marks an unphysical grid and gives 0.
    pub fn b_min(&self) -> f64 {
        let half = self.steps / 2;
        let mut b_min = f64::INFINITY;
        for row in 0..half {
            for &value in &self.values[self.steps * row..self.steps * row + half] {
                if value <= 0.0 {
                    return 0.0;
                }
                b_min = b_min.min(value);
            }
        }

        if b_min.is_finite() {
            b_min
        } else {
            self.b_max()
        }
    }
}

/// Field components Bx, By, Bz in G of a film unit cell
///
/// Values are stored with z as the fastest axis, `k + steps_z * (col +
/// steps * row)`. Depth index 0 is the film centre and `steps_z / 2` the
/// surface.
#[derive(Debug, Clone, PartialEq)]
pub struct FilmFieldGrid {
    steps: usize,
    steps_z: usize,
    bx: Vec<f64>,
    by: Vec<f64>,
    bz: Vec<f64>,
}

impl FilmFieldGrid {
    pub(crate) fn new(steps: usize, steps_z: usize, bx: Vec<f64>, by: Vec<f64>, bz: Vec<f64>) -> Self {
        Self {
            steps,
            steps_z,
            bx,
            by,
            bz,
        }
    }

    /// Field along z everywhere, no in-plane components
    pub fn uniform(steps: usize, steps_z: usize, field: f64) -> Self {
        let len = steps * steps * steps_z;
        Self::new(steps, steps_z, vec![0.0; len], vec![0.0; len], vec![field; len])
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn steps_z(&self) -> usize {
        self.steps_z
    }

    pub fn bx(&self) -> &[f64] {
        &self.bx
    }

    pub fn by(&self) -> &[f64] {
        &self.by
    }

    pub fn bz(&self) -> &[f64] {
        &self.bz
    }

    fn index(&self, row: usize, col: usize, depth: usize) -> usize {
        depth + self.steps_z * (col + self.steps * row)
    }

    /// Squared field magnitude at a flat index
    fn magnitude_sq(&self, index: usize) -> f64 {
        self.bx[index].powi(2) + self.by[index].powi(2) + self.bz[index].powi(2)
    }

    /// Bz at the vortex core of the film centre
    pub fn b_max(&self) -> f64 {
        self.bz.first().copied().unwrap_or_default()
    }

    /// Smallest field magnitude of the first quadrant over all depths
    pub fn b_min(&self) -> f64 {
        let half = self.steps / 2;
        let mut min_sq = f64::INFINITY;
        for row in 0..half {
            for col in 0..half {
                for depth in 0..self.steps_z {
                    min_sq = min_sq.min(self.magnitude_sq(self.index(row, col, depth)));
                }
            }
        }

        if min_sq.is_finite() {
            min_sq.sqrt()
        } else {
            self.b_max()
        }
    }

    /// Field magnitudes |B| of one depth slice as a planar grid
    pub fn magnitude_slice(&self, depth: usize) -> Option<FieldGrid> {
        if depth >= self.steps_z {
            return None;
        }
        let values = (0..self.steps * self.steps)
            .map(|ij| self.magnitude_sq(depth + self.steps_z * ij).sqrt())
            .collect();
        Some(FieldGrid {
            steps: self.steps,
            values,
        })
    }
}

#[cfg(test)]
mod grid_tests {
    use super::*;

    #[test]
    fn shape_is_checked() {
        assert!(matches!(
            FieldGrid::new(4, vec![1.0; 15]),
            Err(Error::GridShape { steps: 4, length: 15 })
        ));
    }

    #[test]
    fn extrema_of_first_quadrant() {
        let mut values = vec![5.0; 16];
        values[0] = 9.0;
        values[5] = 2.0; // row 1, col 1
        values[15] = 1.0; // outside of the first quadrant
        let grid = FieldGrid::new(4, values).unwrap();
        assert_eq!(grid.b_max(), 9.0);
        assert_eq!(grid.b_min(), 2.0);
    }

    #[test]
    fn negative_field_gives_zero_minimum() {
        let mut values = vec![5.0; 16];
        values[1] = -0.1;
        let grid = FieldGrid::new(4, values).unwrap();
        assert_eq!(grid.b_min(), 0.0);
    }

    #[test]
    fn film_slices() {
        let grid = FilmFieldGrid::uniform(4, 2, 30.0);
        assert_eq!(grid.b_max(), 30.0);
        assert_eq!(grid.b_min(), 30.0);

        let slice = grid.magnitude_slice(1).unwrap();
        assert_eq!(slice.values(), &[30.0; 16]);
        assert!(grid.magnitude_slice(2).is_none());
    }
}
