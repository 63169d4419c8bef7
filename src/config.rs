//! Request configuration read from a YAML file.
//!
//! The file is a mapping of BEA request fields (`DatasetName`, `TableName`,
//! `GeoFips`, ...) plus two special entries:
//!
//! - `Year`: a list of years, sent to the API as one comma-joined string.
//! - `LineCode`: statistic id → output column name. Not a request field itself;
//!   one request is made per entry.
//!
//! ```yaml
//! DatasetName: Regional
//! TableName: CAINC1
//! GeoFips: STATE
//! Year: [2019, 2020]
//! LineCode:
//!   1: personal_income
//!   2: population
//! ```

use crate::error::ConfigError;
use crate::models::KEY_COLUMNS;
use serde_yaml::Value;
use std::fmt;
use std::path::Path;

/// Value of the `method` request field.
pub const METHOD: &str = "GetData";

/// Query parameters shared by every request of a run.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RequestSpec {
    params: Vec<(String, String)>,
}

impl RequestSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set `name`, replacing an existing value in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => self.params.push((name, value)),
        }
    }

    pub fn set_line_code(&mut self, id: i64) {
        self.set("LineCode", id.to_string());
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

impl fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut m = f.debug_map();
        for (k, v) in &self.params {
            if k == "UserID" {
                m.entry(k, &"<redacted>");
            } else {
                m.entry(k, v);
            }
        }
        m.finish()
    }
}

/// Statistic ids and their output column names, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableMap {
    entries: Vec<(i64, String)>,
}

impl VariableMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Column names must be unique and must not shadow a key column.
    pub fn push(&mut self, id: i64, column: impl Into<String>) -> Result<(), ConfigError> {
        let column = column.into();
        if column.trim().is_empty() {
            return Err(ConfigError::BadColumnName { id });
        }
        if KEY_COLUMNS.contains(&column.as_str()) || self.entries.iter().any(|(_, c)| *c == column)
        {
            return Err(ConfigError::DuplicateColumn(column));
        }
        self.entries.push((id, column));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.entries.iter().map(|(id, c)| (*id, c.as_str()))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, c)| c.as_str())
    }
}

/// Read `path` and build the request parameters and the variable list.
pub fn load<P: AsRef<Path>>(
    path: P,
    credential: &str,
) -> Result<(RequestSpec, VariableMap), ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text, credential)
}

/// Same as [`load`], from YAML text.
pub fn parse(text: &str, credential: &str) -> Result<(RequestSpec, VariableMap), ConfigError> {
    let doc: Value = serde_yaml::from_str(text)?;
    let Value::Mapping(mapping) = doc else {
        return Err(ConfigError::NotAMapping);
    };

    let mut spec = RequestSpec::new();
    let mut vars = None;
    let mut saw_year = false;

    for (k, v) in mapping {
        let name = match k {
            Value::String(s) => s,
            other => return Err(ConfigError::BadFieldName(scalar_text(&other).unwrap_or_default())),
        };
        if name == "Year" {
            spec.set("Year", join_years(v)?);
            saw_year = true;
        } else if name == "LineCode" {
            vars = Some(variable_map(v)?);
        } else if !v.is_null() {
            // Null fields are left out of the query altogether.
            let value = scalar_text(&v).ok_or_else(|| ConfigError::NotScalar {
                field: name.clone(),
            })?;
            spec.set(name, value);
        }
    }

    if !saw_year {
        return Err(ConfigError::Missing("Year"));
    }
    let vars = vars.ok_or(ConfigError::Missing("LineCode"))?;

    spec.set("UserID", credential);
    spec.set("method", METHOD);
    Ok((spec, vars))
}

fn join_years(v: Value) -> Result<String, ConfigError> {
    match v {
        Value::Null => Err(ConfigError::Missing("Year")),
        Value::Sequence(years) => {
            if years.is_empty() {
                return Err(ConfigError::EmptyYear);
            }
            let parts = years
                .iter()
                .map(|y| {
                    scalar_text(y).ok_or_else(|| ConfigError::NotScalar {
                        field: "Year".into(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(parts.join(","))
        }
        // `ALL`, `LAST5`, or a single year.
        other => scalar_text(&other).ok_or_else(|| ConfigError::NotScalar {
            field: "Year".into(),
        }),
    }
}

fn variable_map(v: Value) -> Result<VariableMap, ConfigError> {
    let Value::Mapping(m) = v else {
        return Err(ConfigError::LineCodeShape);
    };
    let mut vars = VariableMap::new();
    for (k, col) in m {
        let id = match &k {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
        .ok_or_else(|| ConfigError::BadLineCode(scalar_text(&k).unwrap_or_default()))?;
        let Value::String(column) = col else {
            return Err(ConfigError::BadColumnName { id });
        };
        vars.push(id, column)?;
    }
    Ok(vars)
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
