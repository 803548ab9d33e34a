//! NDJSON (Newline Delimited JSON) file operations

use eyre::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Read NDJSON from a file
pub struct NdjsonReader {
    path: PathBuf,
}

impl NdjsonReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read all lines, treating a missing file as empty
    pub fn read<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read NDJSON file: {}", self.path.display()))?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .with_context(|| format!("Failed to parse JSON line: {}", line))
            })
            .collect()
    }

    /// Count non-empty lines without parsing them
    pub fn count(&self) -> Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read NDJSON file: {}", self.path.display()))?;

        Ok(content.lines().filter(|line| !line.trim().is_empty()).count())
    }
}

/// Append-only NDJSON writer
pub struct NdjsonWriter {
    path: PathBuf,
}

impl NdjsonWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Append items in a single write, creating the file and its parent
    /// directory when needed
    pub fn append<T: Serialize>(&self, items: &[T]) -> Result<()> {
        let mut buffer = String::new();
        for item in items {
            buffer.push_str(&serde_json::to_string(item)?);
            buffer.push('\n');
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open NDJSON file: {}", self.path.display()))?;

        file.write_all(buffer.as_bytes())
            .with_context(|| format!("Failed to append to NDJSON file: {}", self.path.display()))?;

        Ok(())
    }

    /// Create an empty file if none exists
    pub fn touch(&self) -> Result<()> {
        self.append::<serde_json::Value>(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    #[test]
    fn test_append_and_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("raw/sample_data.ndjson");
        let writer = NdjsonWriter::new(&path);

        writer.append(&[json!({"a": 1})]).unwrap();
        writer.append(&[json!({"b": 2}), json!({"c": 3})]).unwrap();

        let reader = NdjsonReader::new(&path);
        let data: Vec<Value> = reader.read().unwrap();

        assert_eq!(data, vec![json!({"a": 1}), json!({"b": 2}), json!({"c": 3})]);
        assert_eq!(reader.count().unwrap(), 3);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let reader = NdjsonReader::new(temp.path().join("nothing.ndjson"));

        let data: Vec<Value> = reader.read().unwrap();
        assert!(data.is_empty());
        assert_eq!(reader.count().unwrap(), 0);
    }

    #[test]
    fn test_touch() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mart/aggregated_data.ndjson");

        NdjsonWriter::new(&path).touch().unwrap();
        assert!(path.exists());
        assert_eq!(NdjsonReader::new(&path).count().unwrap(), 0);
    }
}
