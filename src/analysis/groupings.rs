/// Grouping of fetched measurements into chart-ready time series.
///
/// `group` takes the successful fetch tasks from the collector and builds
/// one `TimeSeries` per `GroupKey`: per pollutant across all stations, or
/// per (station, pollutant), depending on the `AggregationMode`.
///
/// Output order is deterministic (pollutant, then station id) regardless of
/// the order in which fetch tasks finished. Within a series, points are
/// sorted ascending by instant with a stable sort, so readings sharing a
/// timestamp keep their arrival order. Duplicates are never collapsed.

use std::collections::BTreeMap;

use crate::collector::TaskSuccess;
use crate::model::{AggregationMode, GroupKey, TimeSeries};

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Groups task results by the key `mode` selects and sorts every group.
///
/// Groups that end up with no points are dropped rather than emitted as
/// empty charts.
pub fn group(successes: Vec<TaskSuccess>, mode: AggregationMode) -> Vec<TimeSeries> {
    let mut grouped: BTreeMap<GroupKey, TimeSeries> = BTreeMap::new();

    for success in successes {
        if success.measurements.is_empty() {
            continue;
        }

        let (station, station_name) = match mode {
            AggregationMode::PerPollutantAcrossAllStations => (None, None),
            AggregationMode::PerStationPerPollutant => {
                (Some(success.station.id.clone()), Some(success.station.name.clone()))
            }
        };
        let key = GroupKey {
            pollutant: success.pollutant,
            station,
        };

        let series = grouped.entry(key.clone()).or_insert_with(|| TimeSeries {
            key,
            station_name,
            points: Vec::new(),
        });

        series.points.extend(
            success
                .measurements
                .into_iter()
                .filter(|m| m.pollutant == success.pollutant)
                .map(|m| (m.timestamp, m.value)),
        );
    }

    grouped
        .into_values()
        .filter(|series| !series.points.is_empty())
        .map(|mut series| {
            // `sort_by` is stable: equal instants keep arrival order.
            series.points.sort_by(|a, b| a.0.cmp(&b.0));
            series
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
