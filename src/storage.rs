use crate::error::OutputError;
use crate::merge::MergedTable;
use csv::WriterBuilder;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write the table as CSV with header. Nulls become empty cells.
pub fn write_csv<W: Write>(table: &MergedTable, writer: W) -> Result<(), OutputError> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(table.header())?;
    for (key, values) in table.rows() {
        let mut record = vec![
            key.geo_fips.as_str(),
            key.geo_name.as_str(),
            key.time_period.as_str(),
        ];
        record.extend(values.iter().map(|v| v.as_deref().unwrap_or("")));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the table as a pretty JSON array of objects, keys in header order.
pub fn write_json<W: Write>(table: &MergedTable, writer: W) -> Result<(), OutputError> {
    let header: Vec<&str> = table.header().collect();
    let rows: Vec<Row<'_>> = table
        .rows()
        .map(|(key, values)| Row {
            header: &header,
            cells: [
                Some(key.geo_fips.as_str()),
                Some(key.geo_name.as_str()),
                Some(key.time_period.as_str()),
            ]
            .into_iter()
            .chain(values.iter().map(|v| v.as_deref()))
            .collect(),
        })
        .collect();
    serde_json::to_writer_pretty(writer, &rows)?;
    Ok(())
}

/// Save as CSV. The file only appears once it has been written completely.
pub fn save_csv<P: AsRef<Path>>(table: &MergedTable, path: P) -> Result<(), OutputError> {
    save_with(path.as_ref(), |f| write_csv(table, f))
}

/// Save as pretty JSON. The file only appears once it has been written completely.
pub fn save_json<P: AsRef<Path>>(table: &MergedTable, path: P) -> Result<(), OutputError> {
    save_with(path.as_ref(), |f| write_json(table, f))
}

fn save_with<F>(path: &Path, write: F) -> Result<(), OutputError>
where
    F: FnOnce(&mut NamedTempFile) -> Result<(), OutputError>,
{
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    write(&mut tmp)?;
    // Temp files are created owner-only; saved output gets the usual file mode.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

struct Row<'a> {
    header: &'a [&'a str],
    cells: Vec<Option<&'a str>>,
}

impl Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.header.len()))?;
        for (name, cell) in self.header.iter().zip(&self.cells) {
            map.serialize_entry(name, cell)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Observation, ResultTable};
    use tempfile::tempdir;

    fn table() -> MergedTable {
        let o = |fips: &str, name: &str, value: &str| Observation {
            code: None,
            geo_fips: fips.into(),
            geo_name: name.into(),
            time_period: "2020".into(),
            cl_unit: None,
            unit_mult: None,
            data_value: value.into(),
            note_ref: None,
        };
        let mut t = MergedTable::new();
        let a: ResultTable = vec![o("01000", "Alabama", "1,234")].into();
        let b: ResultTable = vec![o("02000", "Alaska", "(NA)")].into();
        t.join("income", &a).unwrap();
        t.join("population", &b).unwrap();
        t
    }

    #[test]
    fn csv_quotes_and_leaves_nulls_empty() {
        let mut buf = Vec::new();
        write_csv(&table(), &mut buf).unwrap();
        let txt = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines[0], "GeoFips,GeoName,TimePeriod,income,population");
        assert_eq!(lines[1], "01000,Alabama,2020,\"1,234\",");
        assert_eq!(lines[2], "02000,Alaska,2020,,(NA)");
    }

    #[test]
    fn json_keeps_header_order_and_nulls() {
        let mut buf = Vec::new();
        write_json(&table(), &mut buf).unwrap();
        let txt = String::from_utf8(buf).unwrap();
        let first_keys: Vec<usize> = ["GeoFips", "GeoName", "TimePeriod", "income", "population"]
            .iter()
            .map(|k| txt.find(&format!("\"{k}\"")).unwrap())
            .collect();
        assert!(first_keys.windows(2).all(|w| w[0] < w[1]));

        let v: serde_json::Value = serde_json::from_str(&txt).unwrap();
        assert_eq!(v[0]["population"], serde_json::Value::Null);
        assert_eq!(v[1]["population"], "(NA)");
    }

    #[test]
    fn save_csv_and_json() {
        let dir = tempdir().unwrap();
        let csvp = dir.path().join("x.csv");
        let jsonp = dir.path().join("x.json");
        save_csv(&table(), &csvp).unwrap();
        save_json(&table(), &jsonp).unwrap();
        assert!(csvp.exists());
        assert!(jsonp.exists());
        // Only the two persisted files; no staging leftovers.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn saved_files_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let csvp = dir.path().join("r.csv");
        save_csv(&table(), &csvp).unwrap();
        let mode = std::fs::metadata(&csvp).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
