//! bea_rs
//!
//! A small Rust library for retrieving regional statistics from the
//! U.S. Bureau of Economic Analysis (BEA) data API and merging them into one
//! wide table. Pairs with the `bea` CLI.
//!
//! ### Features
//! - Declarative YAML request: table, geography, years, and the statistics to pull
//! - One request per statistic, each renamed to its own column
//! - One-to-one outer join on (GeoFips, GeoName, TimePeriod); duplicate keys abort the run
//! - Save as CSV or JSON
//!
//! ### Example
//! ```no_run
//! let table = bea_rs::merge::run("cainc1.yaml", "MY-BEA-KEY")?;
//! bea_rs::storage::save_csv(&table, "cainc1.csv")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod merge;
pub mod models;
pub mod storage;

pub use api::{Client, Fetch};
pub use config::{RequestSpec, VariableMap};
pub use error::{ConfigError, Error, FetchError, MergeError, OutputError};
pub use merge::MergedTable;
pub use models::{Key, Observation, ResultTable};
