/// Station directory: the list of monitoring stations known upstream.
///
/// Unlike a static registry, the station list is fetched fresh on every
/// run. A failed listing is not fatal; callers treat it as "zero stations"
/// and the run ends without fetch tasks or charts.

use std::sync::Arc;

use crate::config::{Provider, Upstream};
use crate::error::{FetchCause, UpstreamUnavailable};
use crate::ingest::{MAX_PAGES, luchtmeetnet, sensorthings};
use crate::model::Station;
use crate::transport::{Transport, get_success_body};

pub struct StationDirectoryClient {
    transport: Arc<dyn Transport>,
    upstream: Upstream,
}

impl StationDirectoryClient {
    pub fn new(transport: Arc<dyn Transport>, upstream: Upstream) -> Self {
        Self { transport, upstream }
    }

    /// Fetches every page of the station list.
    ///
    /// # Errors
    /// `UpstreamUnavailable` when any page fails (non-success status,
    /// transport failure, or an unreadable body).
    pub fn list_stations(&self) -> Result<Vec<Station>, UpstreamUnavailable> {
        let result = match self.upstream.provider {
            Provider::Luchtmeetnet => self.list_luchtmeetnet(),
            Provider::Sensorthings => self.list_sensorthings(),
        };

        match result {
            Ok(stations) => {
                tracing::info!(count = stations.len(), "station directory listed");
                Ok(stations)
            }
            Err(cause) => Err(UpstreamUnavailable { cause }),
        }
    }

    fn list_luchtmeetnet(&self) -> Result<Vec<Station>, FetchCause> {
        let url = luchtmeetnet::stations_url(&self.upstream.base_url);
        let mut stations = Vec::new();
        let mut page = 1;

        loop {
            let body = get_success_body(self.transport.as_ref(), &url, &luchtmeetnet::station_params(page))?;
            let parsed = luchtmeetnet::parse_stations(&body)?;
            stations.extend(parsed.stations);

            if page >= parsed.last_page {
                break;
            }
            if page >= MAX_PAGES {
                tracing::warn!(last_page = parsed.last_page, max_pages = MAX_PAGES, "station pages truncated");
                break;
            }
            page += 1;
        }

        Ok(stations)
    }

    fn list_sensorthings(&self) -> Result<Vec<Station>, FetchCause> {
        let mut url = sensorthings::things_url(&self.upstream.base_url);
        let mut stations = Vec::new();
        let mut pages = 0;

        loop {
            let body = get_success_body(self.transport.as_ref(), &url, &[])?;
            let parsed = sensorthings::parse_things(&body)?;
            stations.extend(parsed.stations);
            pages += 1;

            let Some(next) = parsed.next_link else { break };
            if pages >= MAX_PAGES {
                tracing::warn!(max_pages = MAX_PAGES, next = %next, "thing pages truncated");
                break;
            }
            url = next;
        }

        Ok(stations)
    }
}

/// Keeps stations whose raw location description contains `filter`
/// (case-insensitive). `None` keeps every station.
pub fn select_stations(stations: Vec<Station>, filter: Option<&str>) -> Vec<Station> {
    let Some(needle) = filter.map(str::to_lowercase).filter(|n| !n.is_empty()) else {
        return stations;
    };

    stations
        .into_iter()
        .filter(|s| s.raw_location_description.to_lowercase().contains(&needle))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::*;
    use crate::transport::testing::*;

    fn luchtmeetnet_upstream() -> Upstream {
        Upstream {
            provider: Provider::Luchtmeetnet,
            base_url: "http://lmn.test/open_api".to_string(),
        }
    }

    fn sensorthings_upstream() -> Upstream {
        Upstream {
            provider: Provider::Sensorthings,
            base_url: "http://sta.test/v1.0".to_string(),
        }
    }

    #[test]
    fn test_list_stations_follows_pagination() {
        let transport = Arc::new(StubTransport::new(|_, params| match param(params, "page") {
            None => ok(fixture_stations_page_1_json()),
            Some("2") => ok(fixture_stations_page_2_json()),
            Some(other) => panic!("unexpected page {}", other),
        }));
        let client = StationDirectoryClient::new(transport.clone(), luchtmeetnet_upstream());

        let stations = client.list_stations().expect("both pages should load");
        let ids: Vec<&str> = stations.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["NL49014", "NL10131", "NL01485"]);
        assert_eq!(transport.requests().len(), 2, "one request per page");
    }

    #[test]
    fn test_non_success_status_is_upstream_unavailable() {
        let transport = Arc::new(StubTransport::new(|_, _| status(502)));
        let client = StationDirectoryClient::new(transport, luchtmeetnet_upstream());

        let result = client.list_stations();
        assert_eq!(
            result,
            Err(UpstreamUnavailable { cause: FetchCause::Status(502) })
        );
    }

    #[test]
    fn test_failing_second_page_fails_the_listing() {
        let transport = Arc::new(StubTransport::new(|_, params| match param(params, "page") {
            None => ok(fixture_stations_page_1_json()),
            _ => status(500),
        }));
        let client = StationDirectoryClient::new(transport, luchtmeetnet_upstream());
        assert!(client.list_stations().is_err());
    }

    #[test]
    fn test_zero_length_station_list_is_ok() {
        let transport = Arc::new(StubTransport::new(|_, _| ok(r#"{ "data": [] }"#)));
        let client = StationDirectoryClient::new(transport, luchtmeetnet_upstream());
        let stations = client.list_stations().expect("empty list is not an error");
        assert!(stations.is_empty());
    }

    #[test]
    fn test_sensorthings_follows_next_link() {
        let transport = Arc::new(StubTransport::new(|url, _| {
            if url == "http://sta.test/v1.0/Things" {
                ok(r#"{ "value": [ { "@iot.id": 1, "name": "A", "description": "Gelderland" } ],
                        "@iot.nextLink": "http://sta.test/v1.0/Things?$skip=1" }"#)
            } else if url == "http://sta.test/v1.0/Things?$skip=1" {
                ok(r#"{ "value": [ { "@iot.id": 2, "name": "B", "description": "Utrecht" } ] }"#)
            } else {
                status(404)
            }
        }));
        let client = StationDirectoryClient::new(transport, sensorthings_upstream());

        let stations = client.list_stations().expect("both pages should load");
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[1].name, "B");
    }

    #[test]
    fn test_sensorthings_endless_next_links_stop_at_page_cap() {
        let transport = Arc::new(StubTransport::new(|_, _| {
            ok(r#"{ "value": [ { "@iot.id": 1, "name": "A", "description": "Gelderland" } ],
                    "@iot.nextLink": "http://sta.test/v1.0/Things?$skip=1" }"#)
        }));
        let client = StationDirectoryClient::new(transport.clone(), sensorthings_upstream());

        let stations = client.list_stations().expect("a capped listing still succeeds");
        assert_eq!(transport.requests().len(), MAX_PAGES as usize);
        assert_eq!(stations.len(), MAX_PAGES as usize);
    }

    #[test]
    fn test_luchtmeetnet_last_page_beyond_cap_is_truncated() {
        let transport = Arc::new(StubTransport::new(|_, _| {
            ok(r#"{ "pagination": { "last_page": 1000 }, "data": [] }"#)
        }));
        let client = StationDirectoryClient::new(transport.clone(), luchtmeetnet_upstream());

        client.list_stations().expect("a capped listing still succeeds");
        assert_eq!(transport.requests().len(), MAX_PAGES as usize, "pages past the cap are not requested");
    }

    #[test]
    fn test_select_stations_matches_description_substring() {
        let page = sensorthings::parse_things(fixture_things_json()).unwrap();
        let selected = select_stations(page.stations, Some("gelderland"));
        let names: Vec<&str> = selected.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["GLD_Arnhem_01", "GLD_Ede_02"]);
    }

    #[test]
    fn test_select_stations_without_filter_keeps_all() {
        let page = sensorthings::parse_things(fixture_things_json()).unwrap();
        assert_eq!(select_stations(page.stations.clone(), None).len(), 3);
        assert_eq!(select_stations(page.stations, Some("")).len(), 3);
    }
}
