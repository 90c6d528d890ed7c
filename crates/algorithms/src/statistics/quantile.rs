//! Empirical quantiles

/// `p`-th quantile of pre-sorted data, linear interpolation between order
/// statistics (Hyndman & Fan type 7, the R default).
///
/// Returns `None` if `sorted` is empty or `p` lies outside `[0, 1]`.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 || !(0.0..=1.0).contains(&p) {
        return None;
    }
    if n == 1 {
        return Some(sorted[0]);
    }

    let h = (n - 1) as f64 * p;
    let j = h.floor() as usize;
    let g = h - h.floor();

    if j + 1 >= n {
        Some(sorted[n - 1])
    } else {
        Some((1.0 - g) * sorted[j] + g * sorted[j + 1])
    }
}

/// `p`-th quantile of unsorted data; NaNs are ignored.
pub fn quantile(data: &[f64], p: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = data.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_unstable_by(f64::total_cmp);
    quantile_sorted(&sorted, p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_extremes_and_median() {
        let data = [5.0, 1.0, 3.0, 2.0, 4.0];
        assert_eq!(quantile(&data, 0.0), Some(1.0));
        assert_eq!(quantile(&data, 1.0), Some(5.0));
        assert_eq!(quantile(&data, 0.5), Some(3.0));
    }

    #[test]
    fn test_interpolation() {
        let sorted = [0.0, 10.0];
        assert_relative_eq!(quantile_sorted(&sorted, 0.25).unwrap(), 2.5);
        assert_relative_eq!(quantile_sorted(&[1.0, 2.0, 3.0, 4.0], 0.975).unwrap(), 3.925, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&[1.0], 1.5), None);
        assert_eq!(quantile(&[7.0], 0.3), Some(7.0));
        assert_eq!(quantile(&[f64::NAN, 2.0], 0.5), Some(2.0));
    }
}
