//! Error taxonomy for the pipeline.
//!
//! Everything except `ConfigError` is recoverable: it is reported, counted
//! and the run continues with the remaining stations and charts.

use thiserror::Error;

use crate::model::{GroupKey, Pollutant, StationId};

/// Failure of the underlying HTTP primitive itself (no status received).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Request(String),
}

/// Why a single upstream fetch did not produce a usable response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchCause {
    #[error("upstream returned HTTP {0}")]
    Status(u16),
    #[error("{0}")]
    Transport(String),
    #[error("malformed response body: {0}")]
    Body(String),
    #[error("timed out")]
    Timeout,
    #[error("worker stopped before reporting a result")]
    WorkerLost,
}

impl From<TransportError> for FetchCause {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => FetchCause::Timeout,
            TransportError::Request(msg) => FetchCause::Transport(msg),
        }
    }
}

/// The station directory could not be read; the run proceeds with zero
/// stations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("station directory unavailable: {cause}")]
pub struct UpstreamUnavailable {
    pub cause: FetchCause,
}

/// One (station, pollutant) fetch task failed. Isolated to that task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fetch failed for station {station_id} ({pollutant}): {cause}")]
pub struct FetchFailed {
    pub station_id: StationId,
    pub pollutant: Pollutant,
    pub cause: FetchCause,
}

/// A single record inside an otherwise valid response was unusable and
/// has been dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("dropped record from station {station_id}: {reason}")]
pub struct MalformedRecord {
    pub station_id: StationId,
    pub reason: String,
}

/// Writing one chart failed; the remaining charts are still attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not render chart for {group_key}: {cause}")]
pub struct RenderFailed {
    pub group_key: GroupKey,
    pub cause: String,
}

/// Configuration or command-line input that prevents a run from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_timeout_maps_to_fetch_timeout() {
        assert_eq!(FetchCause::from(TransportError::Timeout), FetchCause::Timeout);
        assert_eq!(
            FetchCause::from(TransportError::Request("connection refused".into())),
            FetchCause::Transport("connection refused".into())
        );
    }

    #[test]
    fn test_fetch_failed_message_names_station_and_pollutant() {
        let failure = FetchFailed {
            station_id: StationId::from("NL01485"),
            pollutant: Pollutant::Pm25,
            cause: FetchCause::Status(500),
        };
        let msg = failure.to_string();
        assert!(msg.contains("NL01485"), "got: {}", msg);
        assert!(msg.contains("PM2.5"), "got: {}", msg);
        assert!(msg.contains("HTTP 500"), "got: {}", msg);
    }
}
