//! Rebinning of channels and series by an integer packing factor
//!
//! Two flush conventions are in use. Histogram channels are flushed when
//! `(i - start) % packing == 0 && i != start`, before the bin is added, so
//! every packed bin holds exactly `packing` source bins and a trailing
//! partial block is dropped. Rotating frame series are flushed when
//! `(i + 1) % packing == 0`, also before the bin is added, so the first block
//! only holds `packing - 1` source bins. Both are kept as they are.

// internal modules
use crate::background::Channel;

/// Pack `channel` over the bins `start..end`
///
/// Every packed value is the mean of `packing` source bins with error
/// `sqrt(sum err^2) / packing`, or 1 for a zero value. A packing of 1 copies
/// the range unchanged.
///
/// ```rust
/// # use musrtools_asymmetry::{pack_channel, Channel};
/// let channel = Channel {
///     values: vec![10.0, 20.0, 30.0, 40.0],
///     errors: vec![1.0, 1.0, 2.0, 2.0],
/// };
/// let packed = pack_channel(&channel, 0, 4, 2);
/// assert_eq!(packed.values, vec![15.0, 35.0]);
/// assert_eq!(packed.errors, vec![2.0_f64.sqrt() / 2.0, 8.0_f64.sqrt() / 2.0]);
/// ```
pub fn pack_channel(channel: &Channel, start: usize, end: usize, packing: usize) -> Channel {
    let end = end.min(channel.len());
    if start >= end {
        return Channel::default();
    }

    if packing <= 1 {
        return Channel {
            values: channel.values[start..end].to_vec(),
            errors: channel.errors[start..end].to_vec(),
        };
    }

    let capacity = (end - start) / packing;
    let mut packed = Channel {
        values: Vec::with_capacity(capacity),
        errors: Vec::with_capacity(capacity),
    };

    let p = packing as f64;
    let mut value = 0.0;
    let mut error: f64 = 0.0;
    for i in start..end {
        if (i - start) % packing == 0 && i != start {
            packed.values.push(value / p);
            packed.errors.push(if value == 0.0 {
                1.0
            } else {
                error.sqrt() / p
            });
            value = 0.0;
            error = 0.0;
        }
        value += channel.values[i];
        error += channel.errors[i] * channel.errors[i];
    }

    // the last block is complete if the range divides evenly
    if (end - start) % packing == 0 {
        packed.values.push(value / p);
        packed.errors.push(if value == 0.0 {
            1.0
        } else {
            error.sqrt() / p
        });
    }

    packed
}

/// Time of the first packed bin (us)
///
/// Packed bins are centred, so the start is
/// `dt ((start - 0.5) + packing / 2 - t0)`.
pub fn packed_time_start(time_resolution: f64, start: i64, t0: f64, packing: usize) -> f64 {
    time_resolution * (start as f64 - t0 + (packing as f64 - 1.0) / 2.0)
}

/// Pack a rotating frame series of values and errors
///
/// Values are averaged over the block and errors become
/// `sqrt(2 sum err^2) / packing`, the factor two compensating for the
/// carrier amplitude.
///
/// ```rust
/// # use musrtools_asymmetry::pack_rrf;
/// let (values, _) = pack_rrf(&[1.0, 2.0, 3.0, 4.0, 5.0], &[0.0; 5], 2);
/// assert_eq!(values, vec![0.5, 2.5]);
/// ```
pub fn pack_rrf(values: &[f64], errors: &[f64], packing: usize) -> (Vec<f64>, Vec<f64>) {
    let packing = packing.max(1);
    let p = packing as f64;
    let mut packed_values = Vec::with_capacity(values.len() / packing);
    let mut packed_errors = Vec::with_capacity(values.len() / packing);

    let mut value = 0.0;
    let mut error: f64 = 0.0;
    for (i, (v, e)) in values.iter().zip(errors.iter()).enumerate() {
        if (i + 1) % packing == 0 {
            packed_values.push(value / p);
            packed_errors.push((2.0 * error).sqrt() / p);
            value = 0.0;
            error = 0.0;
        }
        value += v;
        error += e * e;
    }

    (packed_values, packed_errors)
}

/// Block average with the rotating frame flush rule, values only
pub(crate) fn block_average(values: &[f64], packing: usize) -> Vec<f64> {
    let packing = packing.max(1);
    if packing == 1 {
        return values.to_vec();
    }

    let p = packing as f64;
    let mut averaged = Vec::with_capacity(values.len() / packing);
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        if (i + 1) % packing == 0 {
            averaged.push(sum / p);
            sum = 0.0;
        }
        sum += v;
    }
    averaged
}

#[cfg(test)]
mod pack_tests {
    use super::*;

    fn channel(values: Vec<f64>) -> Channel {
        Channel {
            errors: values.iter().map(|v: &f64| v.sqrt()).collect(),
            values,
        }
    }

    #[test]
    fn packing_of_one_copies_range() {
        let c = channel(vec![1.0, 2.0, 3.0, 4.0]);
        let packed = pack_channel(&c, 1, 3, 1);
        assert_eq!(packed.values, vec![2.0, 3.0]);
        assert_eq!(packed.errors, vec![2.0_f64.sqrt(), 3.0_f64.sqrt()]);
    }

    #[test]
    fn trailing_partial_block_dropped() {
        let c = channel(vec![1.0; 10]);
        assert_eq!(pack_channel(&c, 0, 10, 3).len(), 3);
        assert_eq!(pack_channel(&c, 1, 10, 3).len(), 3);
    }

    #[test]
    fn packed_sum_matches_source() {
        let c = channel((0..24).map(|v| v as f64).collect());
        let packed = pack_channel(&c, 4, 24, 5);
        let total: f64 = packed.values.iter().map(|v| v * 5.0).sum();
        assert_eq!(total, (4..24).sum::<i32>() as f64);
    }

    #[test]
    fn zero_block_has_unit_error() {
        let c = channel(vec![0.0; 4]);
        assert_eq!(pack_channel(&c, 0, 4, 2).errors, vec![1.0, 1.0]);
    }

    #[test]
    fn centred_time_start() {
        // packing 4 starting at t0: centre of the first block is 1.5 bins in
        assert_eq!(packed_time_start(0.1, 100, 100.0, 4), 0.1 * 1.5);
        assert_eq!(packed_time_start(0.1, 110, 100.0, 1), 0.1 * 10.0);
    }

    #[test]
    fn rrf_first_block_is_short() {
        let (values, errors) = pack_rrf(&[2.0; 7], &[1.0; 7], 3);
        // flushes at i = 2 (bins 0, 1) and i = 5 (bins 2, 3, 4)
        assert_eq!(values, vec![4.0 / 3.0, 2.0]);
        assert_eq!(errors, vec![4.0_f64.sqrt() / 3.0, 6.0_f64.sqrt() / 3.0]);
    }

    #[test]
    fn block_average_matches_rrf_values() {
        let series: Vec<f64> = (0..12).map(|v| (v as f64).sin()).collect();
        let (values, _) = pack_rrf(&series, &[0.0; 12], 4);
        assert_eq!(block_average(&series, 4), values);
    }
}
