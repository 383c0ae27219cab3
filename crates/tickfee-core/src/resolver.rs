//! Nearest-timestamp price resolution over a single day's tick series.

use crate::loader::{Tick, TickSeries};

/// Find the tick whose timestamp is closest to `target_ms`.
///
/// Linear scan: each query runs against a freshly loaded single-day series,
/// so no index is amortized. Ties keep the first tick in the series'
/// stored order, which follows the archive's file ordering rather than
/// chronological order. Returns `None` only for an empty series.
pub fn nearest_tick(series: &TickSeries, target_ms: i64) -> Option<&Tick> {
    let mut best: Option<(&Tick, u64)> = None;
    for tick in series.iter() {
        let distance = tick.timestamp_ms.abs_diff(target_ms);
        let closer = match best {
            Some((_, best_distance)) => distance < best_distance,
            None => true,
        };
        if closer {
            best = Some((tick, distance));
        }
    }
    best.map(|(tick, _)| tick)
}
