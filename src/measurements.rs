/// Measurement retrieval for one station, one pollutant, one date range.
///
/// Both upstream shapes normalize into `Measurement`. Transport, status and
/// envelope failures fail the whole fetch as `FetchFailed`; individual bad
/// records are dropped and returned alongside as `MalformedRecord`s.

use std::sync::Arc;

use crate::config::{Provider, Upstream};
use crate::error::{FetchCause, FetchFailed, MalformedRecord};
use crate::ingest::{MAX_PAGES, luchtmeetnet, sensorthings};
use crate::model::{DateRange, Measurement, Pollutant, StationId};
use crate::transport::{Transport, get_success_body};

/// Readings of one fetch task plus the records dropped along the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedMeasurements {
    pub measurements: Vec<Measurement>,
    pub malformed: Vec<MalformedRecord>,
}

/// Anything that can run a single (station, pollutant) fetch. The
/// collector's worker threads share one instance.
pub trait MeasurementSource: Send + Sync {
    fn fetch(
        &self,
        station: &StationId,
        pollutant: Pollutant,
        range: &DateRange,
    ) -> Result<FetchedMeasurements, FetchFailed>;
}

pub struct MeasurementClient {
    transport: Arc<dyn Transport>,
    upstream: Upstream,
}

impl MeasurementClient {
    pub fn new(transport: Arc<dyn Transport>, upstream: Upstream) -> Self {
        Self { transport, upstream }
    }

    /// Fetches the readings for one station and pollutant, following every
    /// page the upstream reports.
    pub fn fetch_measurements(
        &self,
        station: &StationId,
        pollutant: Pollutant,
        range: &DateRange,
    ) -> Result<FetchedMeasurements, FetchFailed> {
        let result = match self.upstream.provider {
            Provider::Luchtmeetnet => self.fetch_luchtmeetnet(station, pollutant, range),
            Provider::Sensorthings => self.fetch_sensorthings(station, pollutant, range),
        };

        result.map_err(|cause| FetchFailed {
            station_id: station.clone(),
            pollutant,
            cause,
        })
    }

    fn fetch_luchtmeetnet(
        &self,
        station: &StationId,
        pollutant: Pollutant,
        range: &DateRange,
    ) -> Result<FetchedMeasurements, FetchCause> {
        let url = luchtmeetnet::measurements_url(&self.upstream.base_url);
        let mut fetched = FetchedMeasurements::default();
        let mut page = 1;

        loop {
            let params = luchtmeetnet::measurement_params(station, pollutant, range, page);
            let body = get_success_body(self.transport.as_ref(), &url, &params)?;
            let mut parsed = luchtmeetnet::parse_measurements(&body, station)?;

            // The formula parameter narrows the response server-side, but
            // only the requested pollutant's bucket is kept regardless.
            fetched.measurements.extend(parsed.partition.take(pollutant));
            fetched.malformed.extend(parsed.partition.malformed);

            if page >= parsed.last_page {
                break;
            }
            if page >= MAX_PAGES {
                tracing::warn!(
                    %station,
                    %pollutant,
                    last_page = parsed.last_page,
                    max_pages = MAX_PAGES,
                    "measurement pages truncated"
                );
                break;
            }
            page += 1;
        }

        Ok(fetched)
    }

    fn fetch_sensorthings(
        &self,
        station: &StationId,
        pollutant: Pollutant,
        range: &DateRange,
    ) -> Result<FetchedMeasurements, FetchCause> {
        let mut url = sensorthings::observations_url(&self.upstream.base_url, station, pollutant);
        let mut fetched = FetchedMeasurements::default();
        let mut pages = 0;

        loop {
            let body = get_success_body(self.transport.as_ref(), &url, &[])?;
            let parsed = sensorthings::parse_observations(&body, station, pollutant, range)?;
            fetched.measurements.extend(parsed.measurements);
            fetched.malformed.extend(parsed.malformed);
            pages += 1;

            let Some(next) = parsed.next_link else { break };
            if pages >= MAX_PAGES {
                tracing::warn!(%station, %pollutant, max_pages = MAX_PAGES, next = %next, "observation pages truncated");
                break;
            }
            url = next;
        }

        Ok(fetched)
    }
}

impl MeasurementSource for MeasurementClient {
    fn fetch(
        &self,
        station: &StationId,
        pollutant: Pollutant,
        range: &DateRange,
    ) -> Result<FetchedMeasurements, FetchFailed> {
        self.fetch_measurements(station, pollutant, range)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
