//! YAML dashboard configuration.
//!
//! A config file may override the preferred sheet name, any field's header
//! aliases, and the list of views. Keys left out fall back to the built-in
//! defaults, so `init-config` output can be trimmed down to just the parts a
//! user wants to change.

use std::{
    collections::HashSet,
    fs::File,
    io::{Read, Write},
    path::Path,
};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    schema::{AliasTable, Field},
    views::{Aggregation, ChartKind, ViewSpec, default_views},
    workbook::DEFAULT_SHEET,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub preferred_sheet: String,
    pub aliases: AliasTable,
    pub views: Vec<ViewSpec>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            preferred_sheet: DEFAULT_SHEET.to_string(),
            aliases: AliasTable::default(),
            views: default_views(),
        }
    }
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = read_to_string(path)?;
        let parsed: DashboardConfig =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let config = parsed.finish()?;
        info!(
            "Loaded config {:?} with {} view(s)",
            path,
            config.views.len()
        );
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str::<DashboardConfig>(raw)
            .map_err(ConfigError::Syntax)?
            .finish()
    }

    fn finish(mut self) -> Result<Self, ConfigError> {
        self.aliases = self.aliases.with_defaults();
        self.validate()?;
        Ok(self)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let serialized = self.to_yaml_string()?;
        write_string(path, &serialized)?;
        debug!("Wrote config to {path:?}");
        Ok(())
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preferred_sheet.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "preferred_sheet must not be empty".to_string(),
            ));
        }
        for field in Field::ALL {
            if self.aliases.aliases(field).is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Field '{field}' needs at least one header alias"
                )));
            }
        }
        if self.views.is_empty() {
            return Err(ConfigError::Invalid("At least one view is required".to_string()));
        }
        let mut seen = HashSet::new();
        for view in &self.views {
            if !seen.insert(view.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "View id '{}' is declared more than once",
                    view.id
                )));
            }
            validate_view(view)?;
        }
        Ok(())
    }

    /// Views whose id is in `ids`, in config order. An empty `ids` keeps all.
    pub fn select_views(&self, ids: &[String]) -> Result<Vec<ViewSpec>, ConfigError> {
        if ids.is_empty() {
            return Ok(self.views.clone());
        }
        if let Some(unknown) = ids
            .iter()
            .find(|id| !self.views.iter().any(|view| &view.id == *id))
        {
            return Err(ConfigError::Invalid(format!("Unknown view '{unknown}'")));
        }
        Ok(self
            .views
            .iter()
            .filter(|view| ids.contains(&view.id))
            .cloned()
            .collect())
    }
}

fn validate_view(view: &ViewSpec) -> Result<(), ConfigError> {
    let is_scatter = matches!(view.aggregation, Aggregation::Scatter { .. });
    if is_scatter != (view.chart == ChartKind::Scatter) {
        return Err(ConfigError::Invalid(format!(
            "View '{}' cannot draw its aggregation as a {} chart",
            view.id, view.chart
        )));
    }
    if let Some((field, _)) = view.aliases.iter().find(|(_, aliases)| aliases.is_empty()) {
        return Err(ConfigError::Invalid(format!(
            "View '{}' overrides field '{field}' with no header aliases",
            view.id
        )));
    }
    if let Aggregation::GroupedSum {
        top_n: Some(0), ..
    } = view.aggregation
    {
        return Err(ConfigError::Invalid(format!(
            "View '{}' has top_n 0; omit it to keep every group",
            view.id
        )));
    }
    Ok(())
}

fn read_to_string(path: &Path) -> Result<String, ConfigError> {
    let read_error = |source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(read_error)?;
    let mut buf = String::new();
    file.read_to_string(&mut buf).map_err(read_error)?;
    Ok(buf)
}

fn write_string(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let write_error = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::create(path).map_err(write_error)?;
    file.write_all(contents.as_bytes()).map_err(write_error)?;
    file.flush().map_err(write_error)?;
    Ok(())
}
