/// Luchtmeetnet open API client.
///
/// Handles URL construction and JSON response parsing for the
/// station-centric API:
///   https://api.luchtmeetnet.nl/open_api/
///
/// Both endpoints used here are paginated: every response carries a
/// `pagination` object whose `last_page` tells the caller how many further
/// `page=N` requests to issue. See `fixtures.rs` for example payloads.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{FetchCause, MalformedRecord};
use crate::ingest::{parse_timestamp_value, parse_value, raw_text};
use crate::model::{DateRange, Measurement, Pollutant, Station, StationId};

pub const DEFAULT_BASE_URL: &str = "https://api.luchtmeetnet.nl/open_api";

// ---------------------------------------------------------------------------
// Serde structures
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct Pagination {
    last_page: u32,
}

#[derive(Deserialize)]
struct StationsResponse {
    data: Vec<StationEntry>,
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct StationEntry {
    number: StationId,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Deserialize)]
struct MeasurementsResponse {
    data: Vec<MeasurementEntry>,
    pagination: Option<Pagination>,
}

/// Fields stay loosely typed so that one bad record cannot fail the whole
/// page.
#[derive(Deserialize)]
struct MeasurementEntry {
    #[serde(default)]
    formula: Option<Value>,
    #[serde(default)]
    timestamp_measured: Option<Value>,
    #[serde(default)]
    value: Option<Value>,
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

pub fn stations_url(base_url: &str) -> String {
    format!("{}/stations", base_url.trim_end_matches('/'))
}

pub fn measurements_url(base_url: &str) -> String {
    format!("{}/measurements", base_url.trim_end_matches('/'))
}

/// Query parameters for one page of the station list. The first page is
/// requested without a `page` parameter.
pub fn station_params(page: u32) -> Vec<(&'static str, String)> {
    if page > 1 {
        vec![("page", page.to_string())]
    } else {
        Vec::new()
    }
}

/// Query parameters for one page of measurements of one station and
/// pollutant over a closed date range.
pub fn measurement_params(
    station: &StationId,
    pollutant: Pollutant,
    range: &DateRange,
    page: u32,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("station_number", station.to_string()),
        ("formula", pollutant.upstream_name().to_string()),
        ("start_date", range.start().format("%Y-%m-%d").to_string()),
        ("end_date", range.end().format("%Y-%m-%d").to_string()),
    ];
    if page > 1 {
        params.push(("page", page.to_string()));
    }
    params
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// One parsed page of the station list.
#[derive(Debug)]
pub struct StationPage {
    pub stations: Vec<Station>,
    pub last_page: u32,
}

/// Parses a `/stations` page. The `location` field doubles as the station
/// name and its raw location description.
pub fn parse_stations(json: &str) -> Result<StationPage, FetchCause> {
    let response: StationsResponse = serde_json::from_str(json)
        .map_err(|e| FetchCause::Body(format!("JSON deserialization failed: {}", e)))?;

    let stations = response
        .data
        .into_iter()
        .map(|entry| {
            let location = entry.location.unwrap_or_default();
            Station {
                name: if location.is_empty() { entry.number.to_string() } else { location.clone() },
                id: entry.number,
                raw_location_description: location,
            }
        })
        .collect();

    Ok(StationPage {
        stations,
        last_page: response.pagination.map(|p| p.last_page).unwrap_or(1),
    })
}

/// Records of one measurements page, partitioned by pollutant.
///
/// Every record lands in exactly one place: one of the two pollutant
/// buckets, `unrecognized` (formula is not PM10/PM2.5), or `malformed`
/// (recognized formula but unusable timestamp or value).
#[derive(Debug, Default)]
pub struct PollutantPartition {
    pub pm10: Vec<Measurement>,
    pub pm25: Vec<Measurement>,
    pub unrecognized: usize,
    pub malformed: Vec<MalformedRecord>,
}

impl PollutantPartition {
    /// Moves out the bucket for one pollutant.
    pub fn take(&mut self, pollutant: Pollutant) -> Vec<Measurement> {
        match pollutant {
            Pollutant::Pm10 => std::mem::take(&mut self.pm10),
            Pollutant::Pm25 => std::mem::take(&mut self.pm25),
        }
    }

    pub fn total(&self) -> usize {
        self.pm10.len() + self.pm25.len() + self.unrecognized + self.malformed.len()
    }
}

#[derive(Debug)]
pub struct MeasurementPage {
    pub partition: PollutantPartition,
    pub last_page: u32,
}

/// Parses a `/measurements` page for `station`, normalizing formula
/// strings into `Pollutant` and dropping unusable records individually.
///
/// # Errors
/// `FetchCause::Body` when the envelope itself is not valid JSON of the
/// expected shape.
pub fn parse_measurements(json: &str, station: &StationId) -> Result<MeasurementPage, FetchCause> {
    let response: MeasurementsResponse = serde_json::from_str(json)
        .map_err(|e| FetchCause::Body(format!("JSON deserialization failed: {}", e)))?;

    let mut partition = PollutantPartition::default();

    for entry in response.data {
        let Some(pollutant) = entry
            .formula
            .as_ref()
            .and_then(Value::as_str)
            .and_then(Pollutant::from_upstream)
        else {
            partition.unrecognized += 1;
            continue;
        };

        let raw_time = raw_text(entry.timestamp_measured.as_ref());
        let Some(timestamp) = parse_timestamp_value(entry.timestamp_measured.as_ref()) else {
            partition.malformed.push(MalformedRecord {
                station_id: station.clone(),
                reason: format!("unparseable timestamp '{}'", raw_time),
            });
            continue;
        };

        let Some(value) = parse_value(entry.value.as_ref()) else {
            partition.malformed.push(MalformedRecord {
                station_id: station.clone(),
                reason: format!("missing or non-numeric value at {}", raw_time),
            });
            continue;
        };

        let measurement = Measurement {
            station_id: station.clone(),
            pollutant,
            timestamp,
            value,
        };
        match pollutant {
            Pollutant::Pm10 => partition.pm10.push(measurement),
            Pollutant::Pm25 => partition.pm25.push(measurement),
        }
    }

    Ok(MeasurementPage {
        partition,
        last_page: response.pagination.map(|p| p.last_page).unwrap_or(1),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
