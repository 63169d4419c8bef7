use serde::{Deserialize, Serialize};

/// Identifying columns of every table, in output order.
pub const KEY_COLUMNS: [&str; 3] = ["GeoFips", "GeoName", "TimePeriod"];

/// One record of `BEAAPI.Results.Data`.
///
/// Required fields are validated when the record is decoded; a record missing
/// any of them is rejected rather than carried forward half-filled.
/// `DataValue` stays textual whether the API sends it as a string or a number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Observation {
    #[serde(rename = "Code", default)]
    pub code: Option<String>,
    #[serde(rename = "GeoFips", deserialize_with = "de_string_from_string_or_number")]
    pub geo_fips: String,
    #[serde(rename = "GeoName")]
    pub geo_name: String,
    #[serde(
        rename = "TimePeriod",
        deserialize_with = "de_string_from_string_or_number"
    )]
    pub time_period: String,
    #[serde(rename = "CL_UNIT", default)]
    pub cl_unit: Option<String>,
    #[serde(
        rename = "UNIT_MULT",
        default,
        deserialize_with = "de_opt_string_from_string_or_number"
    )]
    pub unit_mult: Option<String>,
    #[serde(
        rename = "DataValue",
        deserialize_with = "de_string_from_string_or_number"
    )]
    pub data_value: String,
    #[serde(rename = "NoteRef", default)]
    pub note_ref: Option<String>,
}

/// Observations returned by a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    pub rows: Vec<Observation>,
}

impl ResultTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.rows.iter()
    }
}

impl From<Vec<Observation>> for ResultTable {
    fn from(rows: Vec<Observation>) -> Self {
        Self { rows }
    }
}

/// Join key: (geography code, geography name, time period).
///
/// Field order gives the lexicographic row order of a merged table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    pub geo_fips: String,
    pub geo_name: String,
    pub time_period: String,
}

impl Key {
    pub fn new(
        geo_fips: impl Into<String>,
        geo_name: impl Into<String>,
        time_period: impl Into<String>,
    ) -> Self {
        Self {
            geo_fips: geo_fips.into(),
            geo_name: geo_name.into(),
            time_period: time_period.into(),
        }
    }
}

impl From<&Observation> for Key {
    fn from(o: &Observation) -> Self {
        Self {
            geo_fips: o.geo_fips.clone(),
            geo_name: o.geo_name.clone(),
            time_period: o.time_period.clone(),
        }
    }
}

/// Error object the API sends in place of `Data`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorPayload {
    #[serde(
        rename = "APIErrorCode",
        default,
        deserialize_with = "de_opt_string_from_string_or_number"
    )]
    pub code: Option<String>,
    #[serde(rename = "APIErrorDescription", default)]
    pub description: Option<String>,
}

/// Serde helper: keep a JSON string or number as its textual form.
fn de_string_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    struct TextVisitor;

    impl<'de> Visitor<'de> for TextVisitor {
        type Value = String;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a string or a number")
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.to_string())
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.to_string())
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.to_string())
        }

        fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(s.to_owned())
        }

        fn visit_string<E>(self, s: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(s)
        }
    }

    deserializer.deserialize_any(TextVisitor)
}

fn de_opt_string_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Text(#[serde(deserialize_with = "de_string_from_string_or_number")] String);

    Ok(Option::<Text>::deserialize(deserializer)?.map(|Text(s)| s))
}
