//! Dashboard document persistence.
//!
//! The persisted layout is an opaque JSON document (widgets, theme, pages,
//! saved metrics) with the dashboard-wide filter pool stored as a sibling
//! JSON array. The storage service itself is external; this module only
//! honors the document shape and loads/saves local JSON files.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use glob::glob;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BoardflowError, Result};
use crate::models::{Filter, SavedMetric, Widget};
use crate::store::DashboardStore;

/// One dashboard page; round-tripped, not interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub widget_ids: Vec<String>,
}

/// The persisted dashboard layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardDocument {
    pub widgets: Vec<Widget>,
    pub theme: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<Page>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_page_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_metrics: Option<Vec<SavedMetric>>,
}

impl DashboardDocument {
    pub fn from_store(store: &DashboardStore, theme: Value) -> Self {
        Self {
            widgets: store.widgets().to_vec(),
            theme,
            pages: None,
            active_page_id: None,
            saved_metrics: if store.saved_metrics.is_empty() {
                None
            } else {
                Some(store.saved_metrics.clone())
            },
        }
    }

    /// Build a live store from this document. Widgets are re-added in grid
    /// order, which also re-establishes the contiguous order invariant for
    /// documents written by older versions.
    pub fn hydrate(self, global_filters: Vec<Filter>) -> Result<(DashboardStore, Value)> {
        let DashboardDocument {
            mut widgets,
            theme,
            saved_metrics,
            ..
        } = self;
        widgets.sort_by_key(|w| w.grid_order);

        let mut store = DashboardStore::new();
        store.global_filters = global_filters;
        store.saved_metrics = saved_metrics.unwrap_or_default();
        for widget in widgets {
            store.add(widget)?;
        }
        Ok((store, theme))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

/// Read the sibling global-filters array.
pub fn load_global_filters<P: AsRef<Path>>(path: P) -> Result<Vec<Filter>> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Write the sibling global-filters array.
pub fn save_global_filters<P: AsRef<Path>>(path: P, filters: &[Filter]) -> Result<()> {
    let contents = serde_json::to_string_pretty(filters)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Dashboards loaded from a directory, keyed by file stem.
#[derive(Debug, Default, Clone)]
pub struct DashboardLibrary {
    pub dashboards: HashMap<String, DashboardDocument>,
}

impl DashboardLibrary {
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Err(BoardflowError::Validation(format!(
                "dashboard directory not found: {}",
                dir.display()
            )));
        }
        let mut library = Self::default();
        for entry in glob(&format!("{}/*.json", dir.display()))
            .map_err(|e| BoardflowError::Other(e.into()))?
            .flatten()
        {
            let name = entry
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let document = DashboardDocument::load_from_file(&entry)?;
            library.dashboards.insert(name, document);
        }
        Ok(library)
    }

    pub fn get(&self, name: &str) -> Option<&DashboardDocument> {
        self.dashboards.get(name)
    }
}
