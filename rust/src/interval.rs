//! Merging of timestamps and intervals into maximal disjoint runs.

use crate::models::{Time, TimeInterval};

/// Merge a set of timestamps into sorted, disjoint, non-adjacent intervals.
pub fn merge_timestamps<I>(timestamps: I) -> Vec<TimeInterval>
where
    I: IntoIterator<Item = Time>,
{
    let mut sorted: Vec<Time> = timestamps.into_iter().collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut merged: Vec<TimeInterval> = Vec::new();
    for t in sorted {
        match merged.last_mut() {
            Some(last) if last.end + 1 == t => last.end = t,
            _ => merged.push(TimeInterval::new(t, t)),
        }
    }
    merged
}

/// Merge possibly overlapping intervals.
///
/// Intervals that overlap or touch (`next.start <= current.end + 1`) collapse into one.
pub fn merge_time_intervals(mut intervals: Vec<TimeInterval>) -> Vec<TimeInterval> {
    if intervals.is_empty() {
        return Vec::new();
    }

    intervals.sort();
    let mut merged: Vec<TimeInterval> = Vec::with_capacity(intervals.len());
    merged.push(intervals[0]);

    for interval in intervals.into_iter().skip(1) {
        let last = merged.len() - 1;
        if interval.start <= merged[last].end + 1 {
            merged[last].end = merged[last].end.max(interval.end);
        } else {
            merged.push(interval);
        }
    }

    merged
}

/// Total number of timestamps covered by disjoint intervals.
pub fn covered_time(intervals: &[TimeInterval]) -> Time {
    intervals.iter().map(TimeInterval::duration).sum()
}
