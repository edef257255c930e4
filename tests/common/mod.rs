#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use sales_dashboard::{
    data::Cell,
    dataset::{Dataset, Grid},
    schema::{AliasTable, ResolvedSchema},
};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("write temp file");
        path
    }
}

/// Builds a grid from string rows; empty strings become empty cells.
pub fn grid(rows: &[&[&str]]) -> Grid {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|value| {
                    if value.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::from(*value)
                    }
                })
                .collect()
        })
        .collect()
}

pub fn dataset(rows: &[&[&str]]) -> Dataset {
    Dataset::from_grid("Sheet1", grid(rows)).expect("dataset from grid")
}

pub fn schema(dataset: &Dataset) -> ResolvedSchema {
    ResolvedSchema::resolve(dataset.headers(), &AliasTable::default())
}
