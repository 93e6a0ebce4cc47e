//! Code for reading datasets from disk.
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub mod balance;
pub mod demand;
pub mod feedin;
pub mod population;
pub mod powerplant;
pub mod region;
pub mod weather;

/// Context message for file read errors
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a series of records from a CSV file.
///
/// The file must be present and contain at least one record.
pub fn read_csv<T: DeserializeOwned>(file_path: &Path) -> Result<impl Iterator<Item = T>> {
    let records = read_csv_internal(file_path)?;
    anyhow::ensure!(
        !records.is_empty(),
        "CSV file {} cannot be empty",
        file_path.display()
    );

    Ok(records.into_iter())
}

/// Read a series of records from a CSV file which may be missing or empty
pub fn read_csv_optional<T: DeserializeOwned>(
    file_path: &Path,
) -> Result<impl Iterator<Item = T>> {
    let records = if file_path.is_file() {
        read_csv_internal(file_path)?
    } else {
        Vec::new()
    };

    Ok(records.into_iter())
}

/// Read and deserialise every record of a CSV file
fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(file_path).with_context(|| input_err_msg(file_path))?;
    reader
        .deserialize()
        .collect::<Result<_, _>>()
        .with_context(|| input_err_msg(file_path))
}

/// Parse a TOML file into the given type
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Record {
        id: String,
        value: f64,
    }

    #[test]
    fn test_read_csv() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("records.csv");
        writeln!(
            File::create(&file_path).unwrap(),
            "id,value\na,1.0\nb,2.5"
        )
        .unwrap();

        let records: Vec<Record> = read_csv(&file_path).unwrap().collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id, "b");
    }

    #[test]
    fn test_read_csv_empty_file_fails() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("records.csv");
        writeln!(File::create(&file_path).unwrap(), "id,value").unwrap();
        assert!(read_csv::<Record>(&file_path).is_err());
    }

    #[test]
    fn test_read_csv_optional_missing_file() {
        let dir = tempdir().unwrap();
        let records: Vec<Record> = read_csv_optional(&dir.path().join("missing.csv"))
            .unwrap()
            .collect();
        assert!(records.is_empty());
    }

    #[test]
    fn test_read_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.toml");
        writeln!(File::create(&file_path).unwrap(), "id = \"a\"\nvalue = 1.0").unwrap();

        let record: Record = read_toml(&file_path).unwrap();
        assert_eq!(record, Record { id: "a".into(), value: 1.0 });
    }
}
