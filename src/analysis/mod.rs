/// Post-fetch analysis of collected measurements.
///
/// Submodules:
/// - `groupings` — partitions task results into sorted per-chart time series.

pub mod groupings;
