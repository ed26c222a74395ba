/// HTTP GET primitive used by the station and measurement clients.
///
/// Clients only ever need `GET(url, params) -> (status, body)`, so that is
/// the whole seam. `HttpTransport` is the production implementation on top
/// of `reqwest::blocking`; tests substitute canned responses.

use reqwest::blocking::Client;
use std::time::Duration;

use crate::error::{FetchCause, TransportError};

/// Status code and raw body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking GET. Implementations are shared across fetch worker threads.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str, params: &[(&str, String)]) -> Result<HttpResponse, TransportError>;
}

/// `reqwest`-backed transport with a per-request timeout.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::Request(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, params: &[(&str, String)]) -> Result<HttpResponse, TransportError> {
        tracing::debug!(url, ?params, "GET");

        let response = self
            .client
            .get(url)
            .query(params)
            .header("Accept", "application/json")
            .send()
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let body = response.text().map_err(map_reqwest_error)?;

        Ok(HttpResponse { status, body })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Request(err.to_string())
    }
}

/// Issues a GET and returns the body of a 2xx response; anything else
/// becomes a `FetchCause`.
pub fn get_success_body(
    transport: &dyn Transport,
    url: &str,
    params: &[(&str, String)],
) -> Result<String, FetchCause> {
    let response = transport.get(url, params)?;
    if !response.is_success() {
        return Err(FetchCause::Status(response.status));
    }
    Ok(response.body)
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------
