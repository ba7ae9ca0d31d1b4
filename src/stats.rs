// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Simple statistics over sample buffers. Accumulation is done in double
//! precision regardless of the buffer type.

/// Mean of `data`. Returns 0 for an empty slice.
pub fn mean(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let sum: f64 = data.iter().map(|&x| f64::from(x)).sum();
    (sum / data.len() as f64) as f32
}

/// Mean and (population) standard deviation of `data`, two-pass.
pub fn mean_and_std(data: &[f32]) -> (f32, f32) {
    if data.is_empty() {
        return (0.0, 0.0);
    }
    let n = data.len() as f64;
    let sum: f64 = data.iter().map(|&x| f64::from(x)).sum();
    let mean = sum / n;
    let var: f64 = data
        .iter()
        .map(|&x| {
            let d = f64::from(x) - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean as f32, var.sqrt() as f32)
}

/// In-place `(x - mean) / std`.
pub fn normalise(data: &mut [f32], mean: f32, std: f32) {
    let scale = 1.0 / std;
    for x in data.iter_mut() {
        *x = (*x - mean) * scale;
    }
}

/// Largest power of two not exceeding `n`. `n` must be nonzero.
pub fn prev_power_of_two(n: usize) -> usize {
    assert!(n > 0, "prev_power_of_two(0)");
    1 << (usize::BITS - 1 - n.leading_zeros())
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_mean_and_std() {
        let data = [1.0, 2.0, 3.0, 4.0];
        let (mean, std) = mean_and_std(&data);
        assert_abs_diff_eq!(mean, 2.5);
        assert_abs_diff_eq!(std, 1.2, epsilon = 0.01);
    }

    #[test]
    fn test_normalise_centres_and_scales() {
        let mut data = [1.0, 2.0, 3.0, 4.0];
        let (mean, std) = mean_and_std(&data);
        normalise(&mut data, mean, std);
        let (mean, std) = mean_and_std(&data);
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(std, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_prev_power_of_two() {
        assert_eq!(prev_power_of_two(1), 1);
        assert_eq!(prev_power_of_two(2), 2);
        assert_eq!(prev_power_of_two(3), 2);
        assert_eq!(prev_power_of_two(4096), 4096);
        assert_eq!(prev_power_of_two(4097), 4096);
        assert_eq!(prev_power_of_two(usize::MAX), 1 << (usize::BITS - 1));
    }

    #[test]
    #[should_panic]
    fn test_prev_power_of_two_zero_panics() {
        prev_power_of_two(0);
    }
}
