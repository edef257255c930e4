//! Header-keyed records built from a decoded sheet grid.

use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, info};

use crate::{
    data::Cell,
    error::{EmptyReason, LoadError},
};

/// A decoded sheet: row 0 holds the headers.
pub type Grid = Vec<Vec<Cell>>;

static EMPTY_CELL: Cell = Cell::Empty;

/// One data row keyed by header, in header declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(IndexMap<String, Cell>);

impl Record {
    /// Returns the cell under `header`, or an empty cell when the header is unknown.
    pub fn get(&self, header: &str) -> &Cell {
        self.0.get(header).unwrap_or(&EMPTY_CELL)
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.0.values()
    }

    pub fn is_blank(&self) -> bool {
        self.0.values().all(Cell::is_blank)
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Cell>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Record(
            iter.into_iter()
                .map(|(header, cell)| (header.into(), cell.into()))
                .collect(),
        )
    }
}

/// The rows of one loaded sheet. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    sheet: String,
    headers: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    /// Builds records from `grid`, dropping blank rows.
    ///
    /// Headers are stringified and trimmed. When two columns share a header
    /// name the record keeps the first column's position and the last
    /// column's value.
    pub fn from_grid(sheet: &str, grid: Grid) -> Result<Self, LoadError> {
        let mut rows = grid
            .into_iter()
            .filter(|row| row.iter().any(|cell| *cell != Cell::Empty))
            .collect::<Vec<_>>()
            .into_iter();

        let Some(header_row) = rows.next() else {
            return Err(empty(sheet, EmptyReason::HeadersOnly));
        };
        if rows.len() == 0 {
            return Err(empty(sheet, EmptyReason::HeadersOnly));
        }

        let headers = header_row
            .iter()
            .map(|cell| cell.as_display().trim().to_string())
            .collect::<Vec<_>>();
        let unique_headers = headers.iter().unique().cloned().collect::<Vec<_>>();
        if unique_headers.len() != headers.len() {
            debug!(
                "Sheet '{sheet}' repeats {} header name(s); later columns overwrite earlier ones",
                headers.len() - unique_headers.len()
            );
        }

        let data_rows = rows.len();
        let records = rows
            .map(|row| {
                headers
                    .iter()
                    .enumerate()
                    .map(|(idx, header)| (header.clone(), row.get(idx).cloned().unwrap_or_default()))
                    .collect::<Record>()
            })
            .filter(|record| !record.is_blank())
            .collect::<Vec<_>>();

        if records.is_empty() {
            return Err(empty(sheet, EmptyReason::NoDataRows));
        }
        info!(
            "Loaded {} record(s) from sheet '{sheet}' ({} blank row(s) dropped)",
            records.len(),
            data_rows - records.len()
        );
        Ok(Dataset {
            sheet: sheet.to_string(),
            headers: unique_headers,
            records,
        })
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet
    }

    /// Distinct header names in first-occurrence order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn empty(sheet: &str, reason: EmptyReason) -> LoadError {
    LoadError::EmptyData {
        sheet: sheet.to_string(),
        reason,
    }
}
