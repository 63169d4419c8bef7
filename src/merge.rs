//! Fetch every requested statistic and outer-join the results into one wide table.

use crate::api::{Client, Fetch};
use crate::config::{self, RequestSpec, VariableMap};
use crate::error::{Error, MergeError, Result};
use crate::models::{KEY_COLUMNS, Key, ResultTable};
use log::{info, warn};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Key columns plus one value column per joined statistic.
///
/// Rows are kept ordered by [`Key`]. A cell is `None` when the statistic had no
/// observation for that key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedTable {
    columns: Vec<String>,
    rows: BTreeMap<Key, Vec<Option<String>>>,
}

impl MergedTable {
    /// An empty table with only the three key columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Full header: key columns first, then value columns in join order.
    pub fn header(&self) -> impl Iterator<Item = &str> {
        KEY_COLUMNS
            .iter()
            .copied()
            .chain(self.columns.iter().map(String::as_str))
    }

    /// Value columns in join order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&Key, &[Option<String>])> {
        self.rows.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Cell lookup; `None` for an unknown key or column as well as for a null.
    pub fn get(&self, key: &Key, column: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(key)?.get(idx)?.as_deref()
    }

    /// Outer-join `table` on the key columns, with its `DataValue` renamed to `column`.
    ///
    /// Both sides must be unique on the key. The accumulated side is unique by
    /// construction; `table` is checked on (GeoFips, TimePeriod) before anything
    /// is modified, so a failed join leaves `self` untouched.
    pub fn join(&mut self, column: &str, table: &ResultTable) -> Result<(), MergeError> {
        if KEY_COLUMNS.contains(&column) || self.columns.iter().any(|c| c == column) {
            return Err(MergeError::DuplicateColumn(column.to_owned()));
        }

        let mut seen = HashSet::with_capacity(table.len());
        for o in table.iter() {
            if !seen.insert((o.geo_fips.as_str(), o.time_period.as_str())) {
                return Err(MergeError::DuplicateKey {
                    column: column.to_owned(),
                    geo_fips: o.geo_fips.clone(),
                    time_period: o.time_period.clone(),
                });
            }
        }

        self.columns.push(column.to_owned());
        let width = self.columns.len();
        for values in self.rows.values_mut() {
            values.resize(width, None);
        }
        for o in table.iter() {
            let values = self
                .rows
                .entry(Key::from(o))
                .or_insert_with(|| vec![None; width]);
            values[width - 1] = Some(o.data_value.clone());
        }
        Ok(())
    }
}

/// Fetch each statistic of `vars` in order and join it into one table.
///
/// `spec` is the shared request; its `LineCode` is overwritten before every call.
pub fn collect<F: Fetch + ?Sized>(
    fetcher: &F,
    mut spec: RequestSpec,
    vars: &VariableMap,
) -> Result<MergedTable> {
    if vars.is_empty() {
        warn!("LineCode is empty; output will carry only the key columns");
    }

    let mut merged = MergedTable::new();
    for (id, column) in vars.iter() {
        spec.set_line_code(id);
        let table = fetcher
            .fetch(&spec)
            .map_err(|source| Error::Fetch { line_code: id, source })?;
        if table.is_empty() {
            warn!("LineCode {id} ({column}) returned no observations");
        }
        info!("LineCode {id} -> {column}: {} rows", table.len());
        merged.join(column, &table)?;
    }

    info!(
        "merged {} statistics into {} rows",
        merged.columns().len(),
        merged.len()
    );
    Ok(merged)
}

/// Load `config` and run the pipeline against `fetcher`.
pub fn run_with<F: Fetch + ?Sized, P: AsRef<Path>>(
    fetcher: &F,
    config: P,
    credential: &str,
) -> Result<MergedTable> {
    let (spec, vars) = config::load(config, credential)?;
    collect(fetcher, spec, &vars)
}

/// Load `config` and run the pipeline against the public BEA endpoint.
pub fn run<P: AsRef<Path>>(config: P, credential: &str) -> Result<MergedTable> {
    let (spec, vars) = config::load(config, credential)?;
    collect(&Client::default(), spec, &vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Observation;

    fn obs(fips: &str, name: &str, period: &str, value: &str) -> Observation {
        Observation {
            code: None,
            geo_fips: fips.into(),
            geo_name: name.into(),
            time_period: period.into(),
            cl_unit: None,
            unit_mult: None,
            data_value: value.into(),
            note_ref: None,
        }
    }

    #[test]
    fn empty_table_has_key_header_only() {
        let t = MergedTable::new();
        assert_eq!(
            t.header().collect::<Vec<_>>(),
            vec!["GeoFips", "GeoName", "TimePeriod"]
        );
        assert!(t.is_empty());
    }

    #[test]
    fn join_fills_nulls_for_missing_keys() {
        let mut t = MergedTable::new();
        t.join("a", &vec![obs("1", "X", "2020", "10")].into())
            .unwrap();
        t.join("b", &vec![obs("2", "Y", "2020", "20")].into())
            .unwrap();

        assert_eq!(t.len(), 2);
        let x = Key::new("1", "X", "2020");
        let y = Key::new("2", "Y", "2020");
        assert_eq!(t.get(&x, "a"), Some("10"));
        assert_eq!(t.get(&x, "b"), None);
        assert_eq!(t.get(&y, "a"), None);
        assert_eq!(t.get(&y, "b"), Some("20"));
        for (_, values) in t.rows() {
            assert_eq!(values.len(), 2);
        }
    }

    #[test]
    fn duplicate_key_fails_and_leaves_table_untouched() {
        let mut t = MergedTable::new();
        t.join("a", &vec![obs("1", "X", "2020", "10")].into())
            .unwrap();
        let dup: ResultTable = vec![
            obs("1", "X", "2020", "1"),
            obs("1", "X (alt)", "2020", "2"),
        ]
        .into();
        let err = t.join("b", &dup).unwrap_err();
        assert!(matches!(err, MergeError::DuplicateKey { ref column, .. } if column == "b"));
        assert_eq!(t.columns(), &["a".to_string()]);
    }

    #[test]
    fn column_cannot_be_joined_twice() {
        let mut t = MergedTable::new();
        t.join("a", &ResultTable::default()).unwrap();
        assert!(matches!(
            t.join("a", &ResultTable::default()),
            Err(MergeError::DuplicateColumn(_))
        ));
        assert!(matches!(
            t.join("GeoFips", &ResultTable::default()),
            Err(MergeError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn rows_come_out_sorted_by_key() {
        let mut t = MergedTable::new();
        t.join(
            "a",
            &vec![
                obs("02000", "Alaska", "2020", "3"),
                obs("01000", "Alabama", "2021", "2"),
                obs("01000", "Alabama", "2020", "1"),
            ]
            .into(),
        )
        .unwrap();
        let values: Vec<_> = t
            .rows()
            .map(|(_, v)| v[0].as_deref().unwrap_or_default().to_string())
            .collect();
        assert_eq!(values, vec!["1", "2", "3"]);
    }
}
