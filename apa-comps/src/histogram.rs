use std::io::Write;

use crate::pairs::PairResult;

/// Pairs farther apart than this are left out of the histogram.
pub const MAX_DISTANCE: u32 = 10_000;
pub const BINS: usize = 20;

#[derive(Clone, Debug, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

///
/// Equal width histogram of `values` over their range. The last bin is
/// closed on the right. A single distinct value gets the range
/// `[v - 0.5, v + 0.5]`.
///
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: lo + i as f64 * width,
            end: lo + (i + 1) as f64 * width,
            count,
        })
        .collect()
}

/// Histogram of proximal to distal distances of the pairs.
pub fn distance_histogram(results: &[PairResult]) -> Vec<HistogramBin> {
    let distances: Vec<f64> = results
        .iter()
        .map(|r| r.distance())
        .filter(|&d| d < MAX_DISTANCE)
        .map(f64::from)
        .collect();
    histogram(&distances, BINS)
}

pub fn write_histogram<W: Write>(bins: &[HistogramBin], writer: &mut W) -> std::io::Result<()> {
    writeln!(writer, "bin_start\tbin_end\tpairs")?;
    for bin in bins {
        writeln!(writer, "{:.1}\t{:.1}\t{}", bin.start, bin.end, bin.count)?;
    }
    Ok(())
}
