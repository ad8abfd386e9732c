//! Exact remapping of original timestamps onto the benchmark window.

use crate::core::{Bounds, TimestampBucket};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Map `old` from `dataset` onto `[benchmark_min, benchmark_max]`.
///
/// Integer arithmetic only, widened to 128 bits so long benchmark windows
/// never overflow. A degenerate dataset range maps everything onto
/// `benchmark_min`.
pub fn rescale(old: i64, dataset: Bounds, benchmark_min: i64, benchmark_max: i64) -> i64 {
    let span = i128::from(dataset.span());
    if span <= 0 {
        return benchmark_min;
    }
    let offset = i128::from(old) - i128::from(dataset.min);
    let window = i128::from(benchmark_max) - i128::from(benchmark_min);
    (offset * window / span + i128::from(benchmark_min)) as i64
}

/// Rescale every bucket into `[0, duration]`. Buckets collapsing onto one
/// benchmark timestamp are merged, earliest original timestamp first.
pub fn rescale_buckets(
    buckets: &BTreeMap<i64, TimestampBucket>,
    bounds: Bounds,
    duration: i64,
) -> Result<BTreeMap<i64, Vec<PathBuf>>> {
    let mut rescaled: BTreeMap<i64, Vec<PathBuf>> = BTreeMap::new();
    for (original, bucket) in buckets {
        let target = rescale(*original, bounds, 0, duration);
        rescaled.entry(target).or_default().extend(bucket.files.iter().cloned());
    }

    if rescaled.is_empty() {
        return Err(Error::EmptyTimeline(format!(
            "no timestamps left after rescaling [{}, {}] onto [0, {}]",
            bounds.min, bounds.max, duration
        )));
    }
    log::info!(
        "Rescaled {} original timestamp(s) onto {} benchmark timestamp(s)",
        buckets.len(),
        rescaled.len()
    );
    Ok(rescaled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(timestamp: i64) -> TimestampBucket {
        TimestampBucket {
            timestamp,
            lexical: timestamp.to_string(),
            files: vec![PathBuf::from(format!("{}.ttl", timestamp))],
        }
    }

    #[test]
    fn test_endpoints() {
        let bounds = Bounds::new(50, 1000);
        assert_eq!(rescale(50, bounds, 0, 600_000), 0);
        assert_eq!(rescale(1000, bounds, 0, 600_000), 600_000);
    }

    #[test]
    fn test_monotonic() {
        let bounds = Bounds::new(1_451_606_400_000, 1_451_692_800_000);
        let mut previous = i64::MIN;
        for step in 0..=1000 {
            let t = bounds.min + step * 86_400;
            let now = rescale(t, bounds, 0, 600_000);
            assert!(now >= previous, "{} mapped to {} after {}", t, now, previous);
            previous = now;
        }
        assert_eq!(previous, 600_000);
    }

    #[test]
    fn test_no_overflow_on_large_ranges() {
        let bounds = Bounds::new(0, i64::MAX / 2);
        assert_eq!(rescale(i64::MAX / 2, bounds, 0, i64::MAX / 2), i64::MAX / 2);
    }

    #[test]
    fn test_collapsed_buckets_merge() {
        let buckets: BTreeMap<i64, TimestampBucket> =
            [1000, 1001, 2000].into_iter().map(|t| (t, bucket(t))).collect();
        let rescaled = rescale_buckets(&buckets, Bounds::new(1000, 2000), 10).unwrap();
        assert_eq!(rescaled.len(), 2);
        assert_eq!(rescaled[&0].len(), 2);
        assert_eq!(rescaled[&10].len(), 1);
    }

    #[test]
    fn test_empty_timeline() {
        let result = rescale_buckets(&BTreeMap::new(), Bounds::new(0, 1), 10);
        assert!(matches!(result, Err(Error::EmptyTimeline(_))));
    }
}
