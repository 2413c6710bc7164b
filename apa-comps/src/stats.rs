use statrs::distribution::{Discrete, Hypergeometric};

use crate::errors::CompsError;

/// Relative tolerance when comparing table probabilities to the observed one.
const RELATIVE_TOLERANCE: f64 = 1e-7;

///
/// Two-tailed Fisher exact test of the 2x2 table `[[a, b], [c, d]]`.
///
/// Sums the hypergeometric probabilities of every table with the same
/// margins that is no more likely than the observed one. Tables with an
/// empty row or column give 1.
///
/// The top-left cell follows `Hypergeometric(N = a+b+c+d, K = a+b, n = a+c)`.
///
pub fn fisher_exact(a: u64, b: u64, c: u64, d: u64) -> Result<f64, CompsError> {
    let n = a + b + c + d;
    let row1 = a + b;
    let col1 = a + c;
    if row1 == 0 || col1 == 0 || row1 == n || col1 == n {
        return Ok(1.0);
    }

    let dist = Hypergeometric::new(n, row1, col1)?;

    let low = (row1 + col1).saturating_sub(n);
    let high = row1.min(col1);
    let cutoff = dist.ln_pmf(a) + (1.0 + RELATIVE_TOLERANCE).ln();

    let p: f64 = (low..=high)
        .map(|x| dist.ln_pmf(x))
        .filter(|&lp| lp <= cutoff)
        .map(f64::exp)
        .sum();
    Ok(p.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() < tolerance,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[rstest]
    #[case((3, 1, 1, 3), 34.0 / 70.0)]
    #[case((10, 0, 0, 10), 2.0 / 184756.0)]
    #[case((3, 3, 1, 1), 1.0)]
    #[case((0, 0, 0, 0), 1.0)]
    #[case((5, 0, 0, 0), 1.0)]
    #[case((0, 4, 0, 7), 1.0)]
    fn test_fisher_exact(#[case] table: (u64, u64, u64, u64), #[case] expected: f64) {
        let (a, b, c, d) = table;
        assert_close(fisher_exact(a, b, c, d).unwrap(), expected, 1e-9);
    }

    #[rstest]
    fn test_fisher_exact_is_symmetric() {
        let p = fisher_exact(12, 5, 3, 9).unwrap();
        assert_close(fisher_exact(5, 12, 9, 3).unwrap(), p, 1e-9);
        assert_close(fisher_exact(3, 9, 12, 5).unwrap(), p, 1e-9);
        assert!(p > 0.0 && p < 0.05);
    }

    #[rstest]
    #[case(300_000, 300_100)]
    #[case(50_000, 49_000)]
    fn test_fisher_exact_large_counts(#[case] a: u64, #[case] b: u64) {
        let p = fisher_exact(a, b, b, a).unwrap();
        assert!((0.0..=1.0).contains(&p));
        assert_close(fisher_exact(b, a, a, b).unwrap(), p, 1e-6);
    }
}
