//! The filter-then-render pipeline over every configured view.
//!
//! [`render`] is a pure function of the loaded dataset, its resolved schema,
//! the current filter selections and the configuration. [`Session`] keeps
//! that state between calls for callers that load a workbook once and then
//! adjust filters repeatedly.

use std::{collections::BTreeMap, path::Path};

use log::{info, warn};
use serde::{Serialize, Serializer, ser::SerializeStruct};

use crate::{
    config::DashboardConfig,
    dataset::Dataset,
    error::{LoadError, ViewError},
    filter::{Dimension, Selections, apply_filters, filter_options},
    schema::ResolvedSchema,
    views::{Chart, render_view},
    workbook::Workbook,
};

/// One view's result: a chart, or the reason there is none.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewOutcome {
    pub id: String,
    pub title: String,
    pub result: Result<Chart, ViewError>,
}

impl Serialize for ViewOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ViewOutcome", 4)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("title", &self.title)?;
        match &self.result {
            Ok(chart) => {
                state.serialize_field("status", "ok")?;
                state.serialize_field("chart", chart)?;
            }
            Err(err) => {
                state.serialize_field("status", &err.state())?;
                state.serialize_field("message", &err.to_string())?;
            }
        }
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub sheet: Option<String>,
    pub loaded_rows: usize,
    pub matching_rows: usize,
    pub selections: Selections,
    pub views: Vec<ViewOutcome>,
}

impl Dashboard {
    /// True when data is loaded but the filters exclude every row.
    pub fn no_matches(&self) -> bool {
        self.sheet.is_some() && self.matching_rows == 0
    }

    pub fn charts(&self) -> impl Iterator<Item = &Chart> {
        self.views.iter().filter_map(|view| view.result.as_ref().ok())
    }
}

/// Filters once and evaluates every configured view against the survivors.
pub fn render(
    dataset: Option<&Dataset>,
    schema: &ResolvedSchema,
    selections: &Selections,
    config: &DashboardConfig,
) -> Dashboard {
    let filtered = dataset.map(|data| apply_filters(data.records(), schema, selections));
    let rows = filtered.as_deref();
    if let Some(data) = dataset {
        info!(
            "{} of {} record(s) match the current filters",
            rows.map_or(0, <[_]>::len),
            data.len()
        );
    }

    let views = config
        .views
        .iter()
        .map(|spec| {
            let result = render_view(spec, &config.aliases, schema, rows);
            if let Err(err) = &result {
                warn!("View '{}': {err}", spec.id);
            }
            ViewOutcome {
                id: spec.id.clone(),
                title: spec.layout.title.clone(),
                result,
            }
        })
        .collect();

    Dashboard {
        sheet: dataset.map(|data| data.sheet_name().to_string()),
        loaded_rows: dataset.map_or(0, Dataset::len),
        matching_rows: rows.map_or(0, <[_]>::len),
        selections: selections.clone(),
        views,
    }
}

/// Loaded data, its schema and the active filters.
#[derive(Debug, Clone, Default)]
pub struct Session {
    config: DashboardConfig,
    dataset: Option<Dataset>,
    schema: ResolvedSchema,
    selections: Selections,
}

impl Session {
    pub fn new(config: DashboardConfig) -> Self {
        Session {
            config,
            ..Session::default()
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn schema(&self) -> &ResolvedSchema {
        &self.schema
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    /// Replaces the loaded data. Selections are reset either way; on failure
    /// the session is left without data.
    pub fn load_workbook(&mut self, workbook: Workbook) -> Result<&Dataset, LoadError> {
        self.clear();
        let dataset = workbook.into_dataset(&self.config.preferred_sheet)?;
        self.schema = ResolvedSchema::resolve(dataset.headers(), &self.config.aliases);
        Ok(self.dataset.insert(dataset))
    }

    pub fn load_path(&mut self, path: &Path) -> Result<&Dataset, LoadError> {
        match Workbook::open(path, &self.config.preferred_sheet) {
            Ok(workbook) => self.load_workbook(workbook),
            Err(err) => {
                self.clear();
                Err(err)
            }
        }
    }

    pub fn clear(&mut self) {
        self.dataset = None;
        self.schema = ResolvedSchema::default();
        self.selections.clear();
    }

    pub fn select<I, S>(&mut self, dimension: Dimension, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections.select(dimension, values);
    }

    pub fn clear_filters(&mut self) {
        self.selections.clear();
    }

    pub fn filter_options(&self) -> Option<BTreeMap<Dimension, Vec<String>>> {
        self.dataset
            .as_ref()
            .map(|dataset| filter_options(dataset, &self.schema))
    }

    pub fn render(&self) -> Dashboard {
        render(
            self.dataset.as_ref(),
            &self.schema,
            &self.selections,
            &self.config,
        )
    }
}
