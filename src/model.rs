/// Shared data types for the fetch → aggregate → render pipeline.
///
/// Every value here is created once and handed along by value; nothing is
/// mutated after construction. Upstream strings (formula names, station
/// numbers) are normalized into these types at ingestion.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::PathBuf;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Stations
// ---------------------------------------------------------------------------

/// Upstream station identifier.
///
/// Luchtmeetnet uses alphanumeric station numbers (`"NL10131"`), the
/// SensorThings API uses integer `@iot.id`s. Both are kept as text so the
/// identifier can be echoed back into request URLs unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StationId(String);

impl StationId {
    pub fn new(id: impl Into<String>) -> Self {
        StationId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for StationId {
    fn from(id: i64) -> Self {
        StationId(id.to_string())
    }
}

impl From<&str> for StationId {
    fn from(id: &str) -> Self {
        StationId(id.to_string())
    }
}

impl<'de> Deserialize<'de> for StationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => StationId::from(n),
            RawId::Text(s) => StationId(s),
        })
    }
}

/// A monitoring station as listed by the station directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    pub id: StationId,
    /// Display name, used in chart titles and output file names.
    pub name: String,
    /// Free-text location as published upstream; station selection
    /// filters match against this.
    pub raw_location_description: String,
}

// ---------------------------------------------------------------------------
// Pollutants
// ---------------------------------------------------------------------------

/// Particulate-matter classes charted by this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum Pollutant {
    #[serde(rename = "PM10")]
    Pm10,
    #[serde(rename = "PM2.5")]
    Pm25,
}

impl Pollutant {
    pub const ALL: [Pollutant; 2] = [Pollutant::Pm10, Pollutant::Pm25];

    /// Name used by both upstream APIs: the `formula` field of Luchtmeetnet
    /// records and the `ObservedProperty/name` of SensorThings.
    pub fn upstream_name(self) -> &'static str {
        match self {
            Pollutant::Pm10 => "PM10",
            Pollutant::Pm25 => "PM2.5",
        }
    }

    /// Human-readable label for chart titles and legends.
    pub fn label(self) -> &'static str {
        self.upstream_name()
    }

    /// Tag used in output file names (no dots).
    pub fn file_tag(self) -> &'static str {
        match self {
            Pollutant::Pm10 => "PM10",
            Pollutant::Pm25 => "PM25",
        }
    }

    /// Subdirectory name for the per-station-per-pollutant layout.
    pub fn dir_name(self) -> &'static str {
        match self {
            Pollutant::Pm10 => "10",
            Pollutant::Pm25 => "2.5",
        }
    }

    /// Normalizes an upstream formula string. Only exact upstream names are
    /// recognized; `"PM25"` is not an upstream spelling and yields `None`.
    pub fn from_upstream(raw: &str) -> Option<Pollutant> {
        match raw.trim() {
            "PM10" => Some(Pollutant::Pm10),
            "PM2.5" => Some(Pollutant::Pm25),
            _ => None,
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Measurements
// ---------------------------------------------------------------------------

/// One reading from one station for one pollutant.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub station_id: StationId,
    pub pollutant: Pollutant,
    /// Instant of the reading, keeping the offset the upstream reported.
    pub timestamp: DateTime<FixedOffset>,
    /// Concentration in µg/m³.
    pub value: f64,
}

/// Closed calendar-day range `[start, end]` requested from upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::Invalid(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(DateRange { start, end })
    }

    /// Parses two `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, ConfigError> {
        let parse = |raw: &str| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
                ConfigError::Invalid(format!("invalid date '{}' (expected YYYY-MM-DD): {}", raw, e))
            })
        };
        DateRange::new(parse(start)?, parse(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// True when the reading's calendar day (in its own offset) falls inside
    /// the range.
    pub fn contains(&self, timestamp: &DateTime<FixedOffset>) -> bool {
        let day = timestamp.date_naive();
        day >= self.start && day <= self.end
    }
}

// ---------------------------------------------------------------------------
// Grouping and rendering
// ---------------------------------------------------------------------------

/// How fetched measurements are partitioned into charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum AggregationMode {
    /// One chart per pollutant, all stations merged.
    #[default]
    #[serde(rename = "per_pollutant")]
    PerPollutantAcrossAllStations,
    /// One chart per (station, pollutant).
    #[serde(rename = "per_station")]
    PerStationPerPollutant,
}

/// Output directory convention for rendered charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// `{pollutant}_concentratie.png`
    #[default]
    Flat,
    /// `Grafieken/{pollutant}_{station}.png`
    PerStation,
    /// `Grafieken/{10|2.5}/{pollutant}_{station}.png`
    PerStationPerPollutant,
}

/// Identity of one chart: a pollutant, optionally scoped to one station.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub pollutant: Pollutant,
    pub station: Option<StationId>,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.station {
            Some(station) => write!(f, "{} @ station {}", self.pollutant, station),
            None => write!(f, "{} @ all stations", self.pollutant),
        }
    }
}

/// Chronologically ordered readings sharing one `GroupKey`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub key: GroupKey,
    /// Set when the key is station-scoped.
    pub station_name: Option<String>,
    /// Ascending by timestamp; equal timestamps keep arrival order.
    pub points: Vec<(DateTime<FixedOffset>, f64)>,
}

/// A chart to draw: one series and where its image goes.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderJob {
    pub key: GroupKey,
    pub output_path: PathBuf,
    pub series: TimeSeries,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
