//! Error types for workbook loading, configuration, and view rendering.
//!
//! Loading and configuration failures stop a command. View failures are
//! scoped to the view that produced them and are carried inside the
//! rendered dashboard next to the views that succeeded.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::schema::Field;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read file {path:?}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode spreadsheet: {0}")]
    Decode(#[from] calamine::Error),

    #[error("Sheet '{preferred}' was not found and the workbook declares no other sheet")]
    SheetNotFound { preferred: String },

    #[error("Sheet '{sheet}' {reason}")]
    EmptyData { sheet: String, reason: EmptyReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    HeadersOnly,
    NoDataRows,
}

impl std::fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmptyReason::HeadersOnly => write!(f, "is empty or contains only headers"),
            EmptyReason::NoDataRows => write!(f, "has no non-blank rows after the header"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to parse config: {0}")]
    Syntax(#[source] serde_yaml::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("Failed to write config {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Why a single view produced no chart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("No spreadsheet has been loaded yet")]
    NoDataLoaded,

    #[error("No rows match the selected filters for '{view}'")]
    NoMatchingRows { view: String },

    #[error("Column for {field} not found for '{view}' (accepted headers: {})", aliases.join(", "))]
    MissingColumn {
        view: String,
        field: Field,
        aliases: Vec<String>,
    },

    #[error("No usable values to display for '{view}' with the current filters")]
    EmptyAggregate { view: String },
}

/// The four states a consumer renders differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewState {
    NoData,
    EmptyAfterFilter,
    SchemaError,
    EmptyAfterProcessing,
}

impl ViewState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewState::NoData => "no-data",
            ViewState::EmptyAfterFilter => "empty-after-filter",
            ViewState::SchemaError => "schema-error",
            ViewState::EmptyAfterProcessing => "empty-after-processing",
        }
    }
}

impl std::fmt::Display for ViewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ViewError {
    pub fn state(&self) -> ViewState {
        match self {
            ViewError::NoDataLoaded => ViewState::NoData,
            ViewError::NoMatchingRows { .. } => ViewState::EmptyAfterFilter,
            ViewError::MissingColumn { .. } => ViewState::SchemaError,
            ViewError::EmptyAggregate { .. } => ViewState::EmptyAfterProcessing,
        }
    }
}
