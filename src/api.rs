//! Synchronous client for the **BEA data API** (`GetData` method).
//!
//! One call to [`Fetch::fetch`] is one HTTP GET. The response envelope
//! `BEAAPI.Results.Data` is decoded into a [`ResultTable`] of typed
//! [`Observation`]s.
//!
//! ### Notes
//! - There is no retry: any transport, status, or decoding failure is returned
//!   to the caller as a [`FetchError`].
//! - The API reports bad requests (unknown table, missing parameter, invalid key)
//!   as an `Error` object in place of `Data`, often with HTTP 200. That payload is
//!   surfaced as [`FetchError::Api`].
//! - Network timeouts use a sane default (30s) and can be adjusted by editing the client builder.
//!
//! Typical usage:
//! ```no_run
//! # use bea_rs::{Client, Fetch, config};
//! let (mut spec, _vars) = config::load("cainc1.yaml", "MY-KEY")?;
//! spec.set_line_code(1);
//! let table = Client::default().fetch(&spec)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::config::RequestSpec;
use crate::error::FetchError;
use crate::models::{ApiErrorPayload, Observation, ResultTable};
use log::debug;
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Public endpoint of the BEA data API.
pub const BASE_URL: &str = "https://apps.bea.gov/api/data";

/// Source of per-statistic result tables.
pub trait Fetch {
    fn fetch(&self, params: &RequestSpec) -> Result<ResultTable, FetchError>;
}

#[derive(Debug, Clone)]
pub struct Client {
    pub base_url: String,
    http: HttpClient,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(BASE_URL)
    }
}

impl Client {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30)) // total request timeout
            .connect_timeout(Duration::from_secs(10)) // connect timeout
            .redirect(Policy::limited(5)) // cap redirects
            .user_agent(concat!("bea_rs/", env!("CARGO_PKG_VERSION"))) // set user agent
            .build()
            .expect("reqwest client build");
        Self {
            base_url: base_url.into(),
            http,
        }
    }
}

impl Fetch for Client {
    fn fetch(&self, params: &RequestSpec) -> Result<ResultTable, FetchError> {
        debug!("GET {} {:?}", self.base_url, params);

        // The query carries the credential, so URLs are stripped from transport errors.
        let http_err = |source: reqwest::Error| FetchError::Http {
            url: self.base_url.clone(),
            source: source.without_url(),
        };

        let resp = self
            .http
            .get(&self.base_url)
            .query(params.params())
            .send()
            .map_err(http_err)?;
        let status = resp.status();
        let body = resp.text().map_err(http_err)?;

        if !status.is_success() {
            // Prefer the API's own message when the error body carries one.
            if let Err(e @ FetchError::Api { .. }) = parse_response(&body) {
                return Err(e);
            }
            return Err(FetchError::Status { status });
        }
        parse_response(&body)
    }
}

/// Decode a response body into a [`ResultTable`].
///
/// ### Errors
/// - body is not JSON
/// - API-level error payload
/// - `BEAAPI`, `Results`, or `Data` is absent
/// - a record lacks `GeoFips`, `GeoName`, `TimePeriod`, or `DataValue`
pub fn parse_response(body: &str) -> Result<ResultTable, FetchError> {
    let v: Value = serde_json::from_str(body)?;

    let root = v.get("BEAAPI").ok_or(FetchError::Envelope("BEAAPI"))?;
    if let Some(e) = api_error(root.get("Error")) {
        return Err(e);
    }
    let results = root
        .get("Results")
        .ok_or(FetchError::Envelope("BEAAPI.Results"))?;
    if let Some(e) = api_error(results.get("Error")) {
        return Err(e);
    }
    let data = results
        .get("Data")
        .and_then(Value::as_array)
        .ok_or(FetchError::Envelope("BEAAPI.Results.Data"))?;

    let rows = data
        .iter()
        .enumerate()
        .map(|(index, record)| {
            Observation::deserialize(record).map_err(|source| FetchError::Record { index, source })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ResultTable::from(rows))
}

fn api_error(v: Option<&Value>) -> Option<FetchError> {
    let v = v?;
    // Some datasets wrap the error object in a one-element array.
    let v = v.as_array().and_then(|a| a.first()).unwrap_or(v);
    let payload = ApiErrorPayload::deserialize(v).ok();
    let code = payload
        .as_ref()
        .and_then(|p| p.code.clone())
        .unwrap_or_else(|| "?".into());
    let description = payload
        .and_then(|p| p.description)
        .unwrap_or_else(|| v.to_string());
    Some(FetchError::Api { code, description })
}
