//! Spreadsheet decoding and sheet selection.
//!
//! Decoding is delegated to `calamine`, which auto-detects xlsx, xls, xlsb and
//! ods content. Date-formatted cells are kept as their numeric serial so the
//! coercion layer sees the same values a raw sheet export would produce.

use std::{fs, io::Cursor, path::Path};

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use log::{debug, info};

use crate::{
    data::Cell,
    dataset::{Dataset, Grid},
    error::LoadError,
};

pub const DEFAULT_SHEET: &str = "Sheet1";

/// Named sheets of a decoded workbook, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<(String, Grid)>,
}

impl Workbook {
    pub fn open(path: &Path, preferred: &str) -> Result<Self, LoadError> {
        let bytes = fs::read(path).map_err(|source| LoadError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Read {} byte(s) from {:?}", bytes.len(), path);
        Self::from_bytes(bytes, preferred)
    }

    /// Decodes only the sheet that [`Workbook::into_dataset`] will use, so
    /// unreadable sheets elsewhere in the file do not fail the load.
    pub fn from_bytes(bytes: Vec<u8>, preferred: &str) -> Result<Self, LoadError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        let names = workbook.sheet_names();
        let Some(name) = pick_sheet(&names, preferred).map(str::to_string) else {
            return Ok(Workbook::default());
        };
        let range = workbook.worksheet_range(&name)?;
        let grid = range
            .rows()
            .map(|row| row.iter().map(cell_from_data).collect::<Vec<_>>())
            .collect::<Grid>();
        debug!(
            "Decoded sheet '{name}' with {} row(s); {} sheet(s) in workbook",
            grid.len(),
            names.len()
        );
        Ok(Workbook {
            sheets: vec![(name, grid)],
        })
    }

    pub fn from_sheets(sheets: Vec<(String, Grid)>) -> Self {
        Workbook { sheets }
    }

    /// Takes `preferred` when present, otherwise the first declared sheet.
    pub fn into_dataset(mut self, preferred: &str) -> Result<Dataset, LoadError> {
        let index = self
            .sheet_index(preferred)
            .ok_or_else(|| LoadError::SheetNotFound {
                preferred: preferred.to_string(),
            })?;
        let (name, grid) = self.sheets.swap_remove(index);
        if name != preferred {
            info!("Sheet '{preferred}' not found; using first sheet '{name}'");
        }
        Dataset::from_grid(&name, grid)
    }

    fn sheet_index(&self, preferred: &str) -> Option<usize> {
        let names = self.sheets.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>();
        let picked = pick_sheet(&names, preferred)?;
        names.iter().position(|name| *name == picked)
    }
}

fn pick_sheet<'a, S: AsRef<str>>(names: &'a [S], preferred: &str) -> Option<&'a str> {
    names
        .iter()
        .map(AsRef::<str>::as_ref)
        .find(|name| *name == preferred)
        .or_else(|| names.first().map(AsRef::<str>::as_ref))
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Float(value) => Cell::Number(*value),
        Data::Bool(value) => Cell::Bool(*value),
        Data::DateTime(value) => Cell::Number(value.as_f64()),
        Data::String(value) | Data::DateTimeIso(value) | Data::DurationIso(value) => {
            Cell::Text(value.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmptyReason;

    fn sheet(name: &str, rows: &[&[&str]]) -> (String, Grid) {
        let grid = rows
            .iter()
            .map(|row| row.iter().map(|value| Cell::from(*value)).collect())
            .collect();
        (name.to_string(), grid)
    }

    #[test]
    fn prefers_sheet1_over_earlier_sheets() {
        let workbook = Workbook::from_sheets(vec![
            sheet("Resumo", &[&["x"], &["1"]]),
            sheet("Sheet1", &[&["UF"], &["SP"]]),
        ]);
        let dataset = workbook.into_dataset(DEFAULT_SHEET).unwrap();
        assert_eq!(dataset.sheet_name(), "Sheet1");
    }

    #[test]
    fn falls_back_to_first_sheet() {
        let workbook = Workbook::from_sheets(vec![
            sheet("Vendas", &[&["UF"], &["SP"]]),
            sheet("Outra", &[&["UF"], &["RJ"]]),
        ]);
        let dataset = workbook.into_dataset(DEFAULT_SHEET).unwrap();
        assert_eq!(dataset.sheet_name(), "Vendas");
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn workbook_without_sheets_reports_missing_sheet() {
        let err = Workbook::default().into_dataset(DEFAULT_SHEET).unwrap_err();
        assert!(matches!(err, LoadError::SheetNotFound { .. }));
        assert!(err.to_string().contains("Sheet1"));
    }

    #[test]
    fn selected_sheet_with_only_headers_is_empty() {
        let workbook = Workbook::from_sheets(vec![sheet("Sheet1", &[&["UF", "Loja"]])]);
        let err = workbook.into_dataset(DEFAULT_SHEET).unwrap_err();
        assert!(matches!(
            err,
            LoadError::EmptyData {
                reason: EmptyReason::HeadersOnly,
                ..
            }
        ));
    }

    #[test]
    fn into_dataset_takes_the_selected_grid() {
        let workbook = Workbook::from_sheets(vec![
            sheet("Resumo", &[&["x"], &["1"]]),
            sheet("Sheet1", &[&["UF"], &["SP"], &["RJ"]]),
        ]);
        let dataset = workbook.into_dataset(DEFAULT_SHEET).unwrap();
        assert_eq!(dataset.sheet_name(), "Sheet1");
        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn pick_sheet_prefers_exact_name_then_first() {
        let names = ["Resumo".to_string(), "Sheet1".to_string()];
        assert_eq!(pick_sheet(&names, "Sheet1"), Some("Sheet1"));
        assert_eq!(pick_sheet(&names, "sheet1"), Some("Resumo"));
        let empty: [String; 0] = [];
        assert_eq!(pick_sheet(&empty, "Sheet1"), None);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = Workbook::from_bytes(b"not a spreadsheet".to_vec(), DEFAULT_SHEET).unwrap_err();
        assert!(matches!(err, LoadError::Decode(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = Workbook::open(Path::new("/definitely/not/here.xlsx"), DEFAULT_SHEET).unwrap_err();
        assert!(matches!(err, LoadError::FileRead { .. }));
    }

    #[test]
    fn calamine_cells_map_to_loose_cells() {
        assert_eq!(cell_from_data(&Data::Int(3)), Cell::Number(3.0));
        assert_eq!(cell_from_data(&Data::Float(2.5)), Cell::Number(2.5));
        assert_eq!(cell_from_data(&Data::Empty), Cell::Empty);
        assert_eq!(
            cell_from_data(&Data::String("SP".to_string())),
            Cell::from("SP")
        );
        assert_eq!(
            cell_from_data(&Data::DateTimeIso("2024-01-15".to_string())),
            Cell::from("2024-01-15")
        );
    }
}
