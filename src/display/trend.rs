// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! SOC trend graph
//!
//! Samples of the last ten minutes are averaged into at most
//! [`TREND_COLUMNS`] buckets and drawn against [`TREND_ROWS`] threshold rows:
//! a cell is filled when the bucket average reaches the row threshold.

use std::time::Duration;

use chrono::{DateTime, Local};

use crate::soc::SocSample;

pub const TREND_COLUMNS: usize = 50;
pub const TREND_ROWS: usize = 10;
/// Span of the graph
pub const TREND_WINDOW: Duration = Duration::from_secs(600);
/// Narrowest vertical range, in percent
const MIN_RANGE: f64 = 5.0;

const FILLED: char = '█';

/// Render the SOC trend ending at `now`.
pub fn render_trend(samples: &[SocSample], now: DateTime<Local>) -> String {
    if samples.is_empty() {
        return "SOC Trend: No data available".to_string();
    }

    let window = chrono::Duration::from_std(TREND_WINDOW).unwrap_or(chrono::Duration::zero());
    let window_start = now - window;
    let relevant: Vec<f64> = samples
        .iter()
        .filter(|sample| sample.timestamp >= window_start)
        .map(|sample| sample.percent)
        .collect();
    if relevant.is_empty() {
        return "SOC Trend: No recent data".to_string();
    }

    let (min_soc, max_soc) = value_range(&relevant);
    let columns = bucket_averages(&relevant, TREND_COLUMNS);

    let mut lines = vec!["SOC Trend (Last 10 minutes):".to_string()];
    for row in (0..=TREND_ROWS).rev() {
        let threshold = min_soc + (max_soc - min_soc) * (row as f64 / TREND_ROWS as f64);
        let cells: String = columns
            .iter()
            .map(|&average| if average >= threshold { FILLED } else { ' ' })
            .collect();
        lines.push(format!("{threshold:5.1}% | {cells}"));
    }
    lines.push(format!("      +{}", "-".repeat(TREND_COLUMNS)));
    let ticks: String = (0..TREND_COLUMNS)
        .map(|i| {
            if i % 5 == 0 {
                char::from_digit(((i / 5) % 10) as u32, 10).unwrap_or(' ')
            } else {
                ' '
            }
        })
        .collect();
    lines.push(format!("       {ticks}"));
    lines.join("\n")
}

/// Min and max of the values, widened around the midpoint when too narrow
fn value_range(values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max - min < MIN_RANGE {
        let mid = (max + min) / 2.0;
        (mid - MIN_RANGE / 2.0, mid + MIN_RANGE / 2.0)
    } else {
        (min, max)
    }
}

/// Average consecutive values into at most `columns` buckets
fn bucket_averages(values: &[f64], columns: usize) -> Vec<f64> {
    let chunk_size = (values.len() / columns).max(1);
    values
        .chunks(chunk_size)
        .map(|chunk| chunk.iter().sum::<f64>() / chunk.len() as f64)
        .take(columns)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn samples(values: &[f64], now: DateTime<Local>) -> Vec<SocSample> {
        let n = values.len() as i64;
        values
            .iter()
            .enumerate()
            .map(|(i, &percent)| SocSample {
                timestamp: now - chrono::Duration::seconds(n - i as i64),
                percent,
            })
            .collect()
    }

    #[test]
    fn empty_history() {
        assert_eq!(render_trend(&[], Local::now()), "SOC Trend: No data available");
    }

    #[test]
    fn stale_history() {
        let now = Local::now();
        let old = samples(&[50.0], now - chrono::Duration::seconds(3600));
        assert_eq!(render_trend(&old, now), "SOC Trend: No recent data");
    }

    #[test]
    fn narrow_range_is_widened() {
        let (min, max) = value_range(&[80.0, 81.0]);
        assert_relative_eq!(min, 78.0);
        assert_relative_eq!(max, 83.0);
        assert_eq!(value_range(&[10.0, 90.0]), (10.0, 90.0));
    }

    #[test]
    fn buckets_never_exceed_columns() {
        let values: Vec<f64> = (0..600).map(|i| i as f64).collect();
        let buckets = bucket_averages(&values, TREND_COLUMNS);
        assert_eq!(buckets.len(), TREND_COLUMNS);
        assert_relative_eq!(buckets[0], 5.5);
        assert_eq!(bucket_averages(&[1.0, 2.0, 3.0], TREND_COLUMNS).len(), 3);
    }

    #[test]
    fn graph_has_header_rows_and_axis() {
        let now = Local::now();
        let graph = render_trend(&samples(&[20.0, 40.0, 60.0, 80.0], now), now);
        let lines: Vec<&str> = graph.lines().collect();
        assert_eq!(lines.len(), 1 + TREND_ROWS + 1 + 2);
        assert_eq!(lines[1], " 80.0% |    █");
        assert_eq!(lines[TREND_ROWS + 1], " 20.0% | ████");
        assert!(lines[TREND_ROWS + 2].starts_with("      +---"));
    }
}
