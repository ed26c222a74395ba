/// Test fixtures: representative JSON payloads from both upstream APIs.
///
/// Structurally complete but truncated to the minimum needed to exercise
/// the parsers.
///
/// Luchtmeetnet shape:
///   { pagination: { last_page, current_page, ... },
///     data: [ { number, location } ] }                        /stations
///   { pagination: {...},
///     data: [ { station_number, formula, value,
///               timestamp_measured } ] }                      /measurements
///
/// SensorThings shape:
///   { value: [ { "@iot.id", name, description } ], "@iot.nextLink"? }
///   { value: [ { phenomenonTime, result } ], "@iot.nextLink"? }
///
/// Note: Luchtmeetnet timestamps carry an explicit offset; SensorThings
/// uses `Z`. Both must parse to the same instants.

/// Page 1 of 2 of the station list.
pub(crate) fn fixture_stations_page_1_json() -> &'static str {
    r#"{
      "pagination": { "last_page": 2, "current_page": 1, "first_page": 1, "page_list": [1, 2] },
      "data": [
        { "number": "NL49014", "location": "Amsterdam-Vondelpark" },
        { "number": "NL10131", "location": "Vredepeel-Vredeweg" }
      ]
    }"#
}

/// Page 2 of 2 of the station list.
pub(crate) fn fixture_stations_page_2_json() -> &'static str {
    r#"{
      "pagination": { "last_page": 2, "current_page": 2, "first_page": 1, "page_list": [1, 2] },
      "data": [
        { "number": "NL01485", "location": "Hellendoorn-Luttenbergerweg" }
      ]
    }"#
}

/// Mixed formulas for one station: two PM10, one PM2.5, one NO2 and one
/// record spelled "PM25" (not an upstream spelling, so unrecognized).
pub(crate) fn fixture_mixed_measurements_json() -> &'static str {
    r#"{
      "pagination": { "last_page": 1, "current_page": 1 },
      "data": [
        { "station_number": "NL49014", "formula": "PM10",  "value": 21.4, "timestamp_measured": "2023-05-01T02:00:00+02:00" },
        { "station_number": "NL49014", "formula": "PM2.5", "value": 11.7, "timestamp_measured": "2023-05-01T02:00:00+02:00" },
        { "station_number": "NL49014", "formula": "NO2",   "value": 30.2, "timestamp_measured": "2023-05-01T02:00:00+02:00" },
        { "station_number": "NL49014", "formula": "PM25",  "value": 12.0, "timestamp_measured": "2023-05-01T02:00:00+02:00" },
        { "station_number": "NL49014", "formula": "PM10",  "value": 18.0, "timestamp_measured": "2023-05-01T03:00:00+02:00" }
      ]
    }"#
}

/// Three PM10 records, the middle one with an unparseable timestamp.
pub(crate) fn fixture_one_bad_timestamp_json() -> &'static str {
    r#"{
      "pagination": { "last_page": 1, "current_page": 1 },
      "data": [
        { "station_number": "NL49014", "formula": "PM10", "value": 20.0, "timestamp_measured": "2023-05-01T00:00:00+00:00" },
        { "station_number": "NL49014", "formula": "PM10", "value": 22.0, "timestamp_measured": "01-05-2023 01:00" },
        { "station_number": "NL49014", "formula": "PM10", "value": 24.0, "timestamp_measured": "2023-05-01T02:00:00+00:00" }
      ]
    }"#
}

/// Page 1 of 2 of PM10 measurements.
pub(crate) fn fixture_measurements_page_1_of_2_json() -> &'static str {
    r#"{
      "pagination": { "last_page": 2, "current_page": 1 },
      "data": [
        { "station_number": "NL49014", "formula": "PM10", "value": 15.0, "timestamp_measured": "2023-05-01T00:00:00+00:00" }
      ]
    }"#
}

/// Page 2 of 2 of PM10 measurements.
pub(crate) fn fixture_measurements_page_2_of_2_json() -> &'static str {
    r#"{
      "pagination": { "last_page": 2, "current_page": 2 },
      "data": [
        { "station_number": "NL49014", "formula": "PM10", "value": 16.0, "timestamp_measured": "2023-05-01T01:00:00+00:00" }
      ]
    }"#
}

/// Three Things: two in Gelderland, one in Utrecht.
pub(crate) fn fixture_things_json() -> &'static str {
    r#"{
      "value": [
        { "@iot.id": 101, "name": "GLD_Arnhem_01", "description": "Sensor kit Arnhem, Gelderland" },
        { "@iot.id": 102, "name": "UTR_Zeist_04", "description": "Sensor kit Zeist, Utrecht" },
        { "@iot.id": 103, "name": "GLD_Ede_02", "description": "Sensor kit Ede, Gelderland" }
      ]
    }"#
}

/// Observations on 2023-05-01, 2023-05-02 and 2023-05-03; the second
/// reports its result as a numeric string.
pub(crate) fn fixture_observations_json() -> &'static str {
    r#"{
      "value": [
        { "phenomenonTime": "2023-05-01T10:00:00.000Z", "result": 12.5 },
        { "phenomenonTime": "2023-05-02T10:00:00.000Z", "result": "14.2" },
        { "phenomenonTime": "2023-05-03T10:00:00.000Z", "result": 9.8 }
      ]
    }"#
}
