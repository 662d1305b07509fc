use crate::error::{Error, Result};

/// Extends functionality for slices of float arrays
pub trait SliceExt<T> {
    /// Find the minimum value in float arrays
    ///
    /// Only provides the minimum value from a collection of valid numbers. Any
    /// NAN values, infinite values, or empty slices will return an error.
    ///
    /// ```rust
    /// # use musrtools_utils::SliceExt;
    /// # use musrtools_utils::Error;
    /// // Successful cases
    /// assert_eq!([1.1, 0.5, 2.2].try_min(), Ok(0.5));
    /// assert_eq!([1.1, f64::MIN, 2.2].try_min(), Ok(f64::MIN));
    ///
    /// // Error cases
    /// assert_eq!([1.1, f64::NAN, 2.2].try_min(), Err(Error::SliceContainsUndefinedValues));
    /// assert_eq!(Vec::<f64>::new().try_min(), Err(Error::SliceContainsNoValues));
    /// ```
    ///
    /// Uses `total_cmp` so that an ordering always exists for the remaining
    /// finite values.
    fn try_min(&self) -> Result<T>;

    /// Find the maximum value in float arrays
    ///
    /// Only provides the maximum value from a collection of valid numbers. Any
    /// NAN values, infinite values, or empty slices will return an error.
    ///
    /// ```rust
    /// # use musrtools_utils::SliceExt;
    /// # use musrtools_utils::Error;
    /// assert_eq!([1.1, 0.5, 2.2].try_max(), Ok(2.2));
    /// assert_eq!([1.1, f64::INFINITY].try_max(), Err(Error::SliceContainsUndefinedValues));
    /// ```
    fn try_max(&self) -> Result<T>;

    /// Borrow the inclusive window `[start, end]` of the slice
    ///
    /// Histogram windows such as background ranges are given as inclusive
    /// bin pairs, so this checks both ends against the slice length.
    ///
    /// ```rust
    /// # use musrtools_utils::SliceExt;
    /// let counts = [1.0, 2.0, 3.0, 4.0];
    /// assert_eq!(counts.try_window(1, 2).unwrap(), &[2.0, 3.0]);
    /// assert!(counts.try_window(2, 4).is_err());
    /// ```
    fn try_window(&self, start: usize, end: usize) -> Result<&[T]>;
}

impl SliceExt<f64> for [f64] {
    fn try_min(&self) -> Result<f64> {
        if self.iter().any(|v| !v.is_finite()) {
            return Err(Error::SliceContainsUndefinedValues);
        };

        self.iter()
            .min_by(|a, b| a.total_cmp(b))
            .copied()
            .ok_or(Error::SliceContainsNoValues)
    }

    fn try_max(&self) -> Result<f64> {
        if self.iter().any(|v| !v.is_finite()) {
            return Err(Error::SliceContainsUndefinedValues);
        };

        self.iter()
            .max_by(|a, b| a.total_cmp(b))
            .copied()
            .ok_or(Error::SliceContainsNoValues)
    }

    fn try_window(&self, start: usize, end: usize) -> Result<&[f64]> {
        if start > end || end >= self.len() {
            return Err(Error::WindowOutOfBounds {
                start,
                end,
                length: self.len(),
            });
        }
        Ok(&self[start..=end])
    }
}

#[cfg(test)]
mod slice_tests {
    use super::*;

    #[test]
    fn window_bounds() {
        let v = [0.0, 1.0, 2.0];
        assert_eq!(v.try_window(0, 2).unwrap().len(), 3);
        assert_eq!(v.try_window(1, 1).unwrap(), &[1.0]);
        assert_eq!(
            v.try_window(2, 1),
            Err(Error::WindowOutOfBounds {
                start: 2,
                end: 1,
                length: 3
            })
        );
    }

    #[test]
    fn extrema_of_negative_values() {
        let v = [-3.0, -1.0, -2.0];
        assert_eq!(v.try_min(), Ok(-3.0));
        assert_eq!(v.try_max(), Ok(-1.0));
    }
}
