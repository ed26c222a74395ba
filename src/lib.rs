/// pm_charts: PM10 / PM2.5 concentration charts from Dutch air-quality APIs.
///
/// # Module structure
///
/// ```text
/// pm_charts
/// ├── model       — shared data types (Station, Pollutant, Measurement, TimeSeries, RenderJob, …)
/// ├── error       — error taxonomy (FetchFailed, MalformedRecord, RenderFailed, ConfigError, …)
/// ├── config      — pipeline configuration loader (pm_charts.toml + environment overrides)
/// ├── transport   — blocking HTTP GET seam, reqwest implementation
/// ├── ingest
/// │   ├── luchtmeetnet — /stations + /measurements: URL construction + JSON parsing
/// │   ├── sensorthings — /Things + /Observations: URL construction + JSON parsing
/// │   └── fixtures (test only) — representative API response payloads
/// ├── stations    — station directory client and station selection
/// ├── measurements — per (station, pollutant) measurement client
/// ├── collector   — bounded parallel fetch with a fan-in barrier
/// ├── analysis
/// │   └── groupings — partitions readings into sorted per-chart time series
/// ├── output      — chart output paths and directory preparation
/// ├── render      — chart labels, plotters PNG backend, render failure handling
/// ├── report      — failure reporter capability and run summary
/// └── pipeline    — end-to-end run wiring all of the above
/// ```

/// Public modules
pub mod analysis;
pub mod collector;
pub mod config;
pub mod error;
pub mod ingest;
pub mod measurements;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod stations;
pub mod transport;
