use crate::models::{MetricCounts, Trend, TrendDirection};
use serde::{Deserialize, Serialize};

/// Change of `current` relative to `previous`, or `None` when there is nothing
/// to compare against or the value did not move.
pub fn trend(current: usize, previous: Option<usize>) -> Option<Trend> {
    let previous = previous?;
    if current == previous {
        return None;
    }

    let direction = if current > previous {
        TrendDirection::Up
    } else {
        TrendDirection::Down
    };
    let magnitude = if previous == 0 {
        100
    } else {
        let delta = current.abs_diff(previous) as f64;
        (delta / previous as f64 * 100.0).round() as u64
    };

    Some(Trend { direction, magnitude })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetricTrends {
    pub total_leads: Option<Trend>,
    pub hot: Option<Trend>,
    pub warm: Option<Trend>,
    pub cold: Option<Trend>,
    pub appointments_count: Option<Trend>,
}

impl MetricTrends {
    pub fn between(current: MetricCounts, previous: Option<MetricCounts>) -> Self {
        Self {
            total_leads: trend(current.total_leads, previous.map(|p| p.total_leads)),
            hot: trend(current.hot, previous.map(|p| p.hot)),
            warm: trend(current.warm, previous.map(|p| p.warm)),
            cold: trend(current.cold, previous.map(|p| p.cold)),
            appointments_count: trend(
                current.appointments_count,
                previous.map(|p| p.appointments_count),
            ),
        }
    }
}
