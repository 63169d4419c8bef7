//! Error kinds for each stage of the pipeline.
//!
//! Every error is fatal to a run: nothing here is retried or recovered locally.
//! The umbrella [`Error`] lets callers propagate any stage's failure with `?`.

use std::path::PathBuf;
use thiserror::Error;

/// Malformed or incomplete configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config yaml")]
    Yaml(#[from] serde_yaml::Error),
    #[error("config must be a mapping at the top level")]
    NotAMapping,
    #[error("config is missing required field `{0}`")]
    Missing(&'static str),
    #[error("config field `Year` must list at least one year")]
    EmptyYear,
    #[error("config field `{field}` has a value that cannot be sent as a query parameter")]
    NotScalar { field: String },
    #[error("config field `{0}` must be a string key")]
    BadFieldName(String),
    #[error("config field `LineCode` must map statistic ids to column names")]
    LineCodeShape,
    #[error("LineCode key {0} is not an integer statistic id")]
    BadLineCode(String),
    #[error("LineCode {id} must map to a non-empty column name")]
    BadColumnName { id: i64 },
    #[error("column name `{0}` is used more than once or clashes with a key column")]
    DuplicateColumn(String),
}

/// Network failure, non-JSON response, or missing response structure.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request failed with HTTP {status}")]
    Status { status: reqwest::StatusCode },
    #[error("decode json")]
    Json(#[from] serde_json::Error),
    #[error("bea api error {code}: {description}")]
    Api { code: String, description: String },
    #[error("unexpected response shape: missing `{0}`")]
    Envelope(&'static str),
    #[error("parse record {index}")]
    Record {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Join cardinality violation.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error(
        "duplicate key for `{column}`: GeoFips={geo_fips} TimePeriod={time_period} appears more than once"
    )]
    DuplicateKey {
        column: String,
        geo_fips: String,
        time_period: String,
    },
    #[error("column `{0}` is already present in the merged table")]
    DuplicateColumn(String),
}

/// Failure while writing the merged table.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("write csv")]
    Csv(#[from] csv::Error),
    #[error("write json")]
    Json(#[from] serde_json::Error),
    #[error("write output")]
    Io(#[from] std::io::Error),
}

/// Any failure of a pipeline run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("fetch LineCode {line_code}")]
    Fetch {
        line_code: i64,
        #[source]
        source: FetchError,
    },
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
