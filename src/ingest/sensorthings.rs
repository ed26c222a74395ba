/// OGC SensorThings API client (RIVM "Samen Meten").
///
/// Stations are `Things`; readings are the `Observations` of a Thing,
/// filtered server-side by observed property name:
///   {base}/Things({id})/Observations?$filter=ObservedProperty/name eq 'PM10'
///
/// Collections are paged through `@iot.nextLink`, an absolute URL for the
/// next page. The endpoint takes no date parameters, so observations are
/// narrowed to the requested range while parsing.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{FetchCause, MalformedRecord};
use crate::ingest::{parse_timestamp_value, parse_value, raw_text};
use crate::model::{DateRange, Measurement, Pollutant, Station, StationId};

pub const DEFAULT_BASE_URL: &str = "https://api-samenmeten.rivm.nl/v1.0";

// ---------------------------------------------------------------------------
// Serde structures
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ThingsResponse {
    value: Vec<ThingEntry>,
    #[serde(rename = "@iot.nextLink")]
    next_link: Option<String>,
}

#[derive(Deserialize)]
struct ThingEntry {
    #[serde(rename = "@iot.id")]
    id: StationId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct ObservationsResponse {
    value: Vec<ObservationEntry>,
    #[serde(rename = "@iot.nextLink")]
    next_link: Option<String>,
}

#[derive(Deserialize)]
struct ObservationEntry {
    #[serde(rename = "phenomenonTime", default)]
    phenomenon_time: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

pub fn things_url(base_url: &str) -> String {
    format!("{}/Things", base_url.trim_end_matches('/'))
}

/// Observations of one Thing for one pollutant. The `$filter` expression
/// is percent-encoded into the URL, so no extra query parameters are sent.
pub fn observations_url(base_url: &str, station: &StationId, pollutant: Pollutant) -> String {
    let filter = format!("ObservedProperty/name eq '{}'", pollutant.upstream_name());
    format!(
        "{}/Things({})/Observations?$filter={}",
        base_url.trim_end_matches('/'),
        station,
        urlencoding::encode(&filter)
    )
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ThingsPage {
    pub stations: Vec<Station>,
    pub next_link: Option<String>,
}

/// Parses a `Things` collection page. The Thing's `description` is kept as
/// the raw location description; it names the province the sensor is in.
pub fn parse_things(json: &str) -> Result<ThingsPage, FetchCause> {
    let response: ThingsResponse = serde_json::from_str(json)
        .map_err(|e| FetchCause::Body(format!("JSON deserialization failed: {}", e)))?;

    let stations = response
        .value
        .into_iter()
        .map(|thing| Station {
            name: thing.name.unwrap_or_else(|| thing.id.to_string()),
            id: thing.id,
            raw_location_description: thing.description.unwrap_or_default(),
        })
        .collect();

    Ok(ThingsPage {
        stations,
        next_link: response.next_link,
    })
}

#[derive(Debug, Default)]
pub struct ObservationPage {
    pub measurements: Vec<Measurement>,
    pub malformed: Vec<MalformedRecord>,
    /// Valid observations outside the requested date range.
    pub out_of_range: usize,
    pub next_link: Option<String>,
}

/// Parses an `Observations` page for one station and pollutant.
///
/// The server already filtered by pollutant, so every observation is
/// attributed to `pollutant`. Unparseable `phenomenonTime` or `result`
/// values drop that observation only.
pub fn parse_observations(
    json: &str,
    station: &StationId,
    pollutant: Pollutant,
    range: &DateRange,
) -> Result<ObservationPage, FetchCause> {
    let response: ObservationsResponse = serde_json::from_str(json)
        .map_err(|e| FetchCause::Body(format!("JSON deserialization failed: {}", e)))?;

    let mut page = ObservationPage {
        next_link: response.next_link,
        ..ObservationPage::default()
    };

    for entry in response.value {
        let raw_time = raw_text(entry.phenomenon_time.as_ref());
        let Some(timestamp) = parse_timestamp_value(entry.phenomenon_time.as_ref()) else {
            page.malformed.push(MalformedRecord {
                station_id: station.clone(),
                reason: format!("unparseable phenomenonTime '{}'", raw_time),
            });
            continue;
        };

        let Some(value) = parse_value(entry.result.as_ref()) else {
            page.malformed.push(MalformedRecord {
                station_id: station.clone(),
                reason: format!("missing or non-numeric result at {}", raw_time),
            });
            continue;
        };

        if !range.contains(&timestamp) {
            page.out_of_range += 1;
            continue;
        }

        page.measurements.push(Measurement {
            station_id: station.clone(),
            pollutant,
            timestamp,
            value,
        });
    }

    Ok(page)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
