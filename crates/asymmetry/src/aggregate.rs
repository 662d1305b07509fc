//! Add-run accumulation and detector grouping

/// Index `j + to - from`, if it lies inside `0..length`
///
/// Both add-runs and grouped detectors are read at an index shifted by the
/// difference of their t0 to the t0 of the base histogram. The t0 values are
/// truncated to whole bins before taking the difference.
///
/// ```rust
/// # use musrtools_asymmetry::shifted_index;
/// assert_eq!(shifted_index(5, 12.7, 10.0, 100), Some(7));
/// assert_eq!(shifted_index(1, 10.0, 12.0, 100), None);
/// assert_eq!(shifted_index(99, 11.0, 10.0, 100), None);
/// ```
pub fn shifted_index(j: usize, to: f64, from: f64, length: usize) -> Option<usize> {
    let index = j as i64 + to as i64 - from as i64;
    (index >= 0 && (index as usize) < length).then_some(index as usize)
}

/// Add every bin of `add` into `primary`, shifted by the t0 difference
///
/// Contributions that fall outside of the add-run histogram are dropped.
pub fn add_run(primary: &mut [f64], add: &[f64], primary_t0: f64, add_t0: f64) {
    for (j, value) in primary.iter_mut().enumerate() {
        if let Some(k) = shifted_index(j, add_t0, primary_t0, add.len()) {
            *value += add[k];
        }
    }
}

/// Sum several detector histograms into one logical channel
///
/// Channel 0 is the base. Channel `i` contributes `channel_i[j + t0_i - t0_0]`
/// to bin `j` wherever that index exists.
///
/// ```rust
/// # use musrtools_asymmetry::group_channels;
/// let a = vec![1.0, 2.0, 3.0, 4.0];
/// let b = vec![0.0, 10.0, 20.0, 30.0];
/// // b has its t0 one bin later than a
/// let sum = group_channels(&[a, b], &[1.0, 2.0]);
/// assert_eq!(sum, vec![11.0, 22.0, 33.0, 4.0]);
/// ```
pub fn group_channels(channels: &[Vec<f64>], t0: &[f64]) -> Vec<f64> {
    let Some((base, others)) = channels.split_first() else {
        return Vec::new();
    };

    let mut summed = base.clone();
    for (channel, channel_t0) in others.iter().zip(t0.iter().skip(1)) {
        add_run(&mut summed, channel, t0[0], *channel_t0);
    }
    summed
}

#[cfg(test)]
mod aggregate_tests {
    use super::*;

    #[test]
    fn add_run_drops_out_of_range() {
        let mut primary = vec![1.0; 5];
        let add = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        // add-run t0 two bins earlier, so the first two bins have no partner
        add_run(&mut primary, &add, 10.0, 8.0);
        assert_eq!(primary, vec![1.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn add_run_later_t0() {
        let mut primary = vec![0.0; 4];
        add_run(&mut primary, &[1.0, 2.0, 3.0, 4.0], 0.0, 1.0);
        assert_eq!(primary, vec![2.0, 3.0, 4.0, 0.0]);
    }

    #[test]
    fn group_single_channel() {
        let a = vec![3.0, 4.0];
        assert_eq!(group_channels(&[a.clone()], &[0.0]), a);
        assert!(group_channels(&[], &[]).is_empty());
    }
}
