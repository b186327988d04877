//! Pure computations over a source's retained forecast samples.
//!
//! Every function expects samples sorted ascending by timestamp, which
//! [`trim_to_horizon`] guarantees for anything stored by a reader.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use tracing::debug;

use crate::{
    error::{Metric, MetricError},
    model::{DayBucket, ForecastSample, RainInterval},
};

/// Sort samples chronologically and drop everything dated `days` or more calendar days after
/// the first sample's date.
pub fn trim_to_horizon(mut samples: Vec<ForecastSample>, days: u8) -> Vec<ForecastSample> {
    samples.sort_by_key(|s| s.timestamp);

    let Some(first) = samples.first() else {
        return samples;
    };

    if let Some(last_day) = first.timestamp.date().checked_add_days(Days::new(u64::from(days))) {
        let horizon = midnight(last_day);
        samples.retain(|s| s.timestamp < horizon);
    }

    samples
}

pub fn average_pressure(samples: &[ForecastSample]) -> Result<f64, MetricError> {
    mean(samples.iter().map(|s| s.pressure)).ok_or(MetricError::EmptyInput(Metric::Pressure))
}

/// Average temperature per calendar day for `days` days starting at the first sample's date.
///
/// Days without samples are skipped rather than zero-filled. The slice is consumed in a single
/// forward pass, one contiguous window per day.
pub fn daily_average_temperatures(
    samples: &[ForecastSample],
    days: u8,
) -> Result<Vec<DayBucket>, MetricError> {
    let first = samples
        .first()
        .ok_or(MetricError::EmptyInput(Metric::Temperature))?;

    let mut buckets = Vec::with_capacity(usize::from(days));
    let mut date = first.timestamp.date();
    let mut rest = samples;

    for _ in 0..days {
        let Some(next) = date.succ_opt() else {
            break;
        };
        let window_end = midnight(next);

        // Earlier windows already consumed everything before `date`.
        let split = rest.partition_point(|s| s.timestamp < window_end);
        let (window, tail) = rest.split_at(split);
        rest = tail;

        if let Some(average_temperature) = mean(window.iter().map(|s| s.temperature)) {
            buckets.push(DayBucket { date, average_temperature });
        } else {
            debug!(%date, "no forecast samples for day, skipping bucket");
        }

        date = next;
    }

    Ok(buckets)
}

/// Collapse per-sample rain flags into midnight-clipped intervals.
///
/// An interval closes at the first dry sample after a wet one. A spell still open at the end of
/// the data closes `sampling_period` after the last sample.
pub fn rain_intervals(samples: &[ForecastSample], sampling_period: TimeDelta) -> Vec<RainInterval> {
    let mut raw = Vec::new();
    let mut open: Option<NaiveDateTime> = None;

    for sample in samples {
        match (open, sample.is_raining) {
            (None, true) => open = Some(sample.timestamp),
            (Some(start), false) => {
                raw.push(RainInterval { start, end: sample.timestamp });
                open = None;
            }
            _ => {}
        }
    }

    if let (Some(start), Some(last)) = (open, samples.last()) {
        raw.push(RainInterval { start, end: last.timestamp + sampling_period });
    }

    split_at_midnight(raw)
}

/// Split every interval at each midnight it crosses. An interval ending exactly at midnight
/// already ends on a day boundary and is left whole.
pub fn split_at_midnight(intervals: impl IntoIterator<Item = RainInterval>) -> Vec<RainInterval> {
    let mut out = Vec::new();

    for RainInterval { mut start, end } in intervals {
        while start < end {
            let boundary = start.date().succ_opt().map(midnight);
            match boundary {
                Some(boundary) if end > boundary => {
                    out.push(RainInterval { start, end: boundary });
                    start = boundary;
                }
                _ => {
                    out.push(RainInterval { start, end });
                    break;
                }
            }
        }
    }

    out
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}
