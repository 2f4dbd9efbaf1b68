//! Widget/layout store.
//!
//! An ordered collection of widget records plus the dashboard-wide filter
//! pool and saved metric templates. Owns the structural invariants (unique
//! ids, contiguous grid order, valid spans) and the transient fetch state;
//! aggregation semantics live in the request/result modules.

use serde_json::{Map, Value};

use crate::error::{BoardflowError, Result};
use crate::metrics::rewrite_placeholders;
use crate::models::{Filter, MetricSpec, SavedMetric, Widget};
use crate::results::WidgetSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(Debug, Default, Clone)]
pub struct DashboardStore {
    widgets: Vec<Widget>,
    pub global_filters: Vec<Filter>,
    pub saved_metrics: Vec<SavedMetric>,
}

impl DashboardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Widgets in grid order.
    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    pub fn get(&self, id: &str) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.id == id)
    }

    pub fn widget_ids(&self) -> Vec<String> {
        self.widgets.iter().map(|w| w.id.clone()).collect()
    }

    /// Append a widget at the end of the grid.
    pub fn add(&mut self, mut widget: Widget) -> Result<&Widget> {
        if self.widgets.iter().any(|w| w.id == widget.id) {
            return Err(BoardflowError::Validation(format!(
                "duplicate widget id {}",
                widget.id
            )));
        }
        if ![1, 2, 4].contains(&widget.grid_span) {
            return Err(BoardflowError::Validation(format!(
                "invalid grid span {} (expected 1, 2 or 4)",
                widget.grid_span
            )));
        }
        widget.grid_order = self.widgets.len();
        self.widgets.push(widget);
        Ok(self.widgets.last().unwrap())
    }

    /// Remove a widget and close the gap in the grid order. Returns the
    /// removed widget so the caller can release associated resources
    /// (uploaded images live outside this store).
    pub fn remove(&mut self, id: &str) -> Option<Widget> {
        let index = self.widgets.iter().position(|w| w.id == id)?;
        let removed = self.widgets.remove(index);
        self.reindex();
        Some(removed)
    }

    /// Swap a widget with its adjacent sibling. A move past either end is a
    /// no-op.
    pub fn reorder(&mut self, id: &str, direction: MoveDirection) -> Result<()> {
        let index = self
            .widgets
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| BoardflowError::Validation(format!("unknown widget {id}")))?;
        let target = match direction {
            MoveDirection::Up if index > 0 => index - 1,
            MoveDirection::Down if index + 1 < self.widgets.len() => index + 1,
            _ => return Ok(()),
        };
        self.widgets.swap(index, target);
        self.reindex();
        Ok(())
    }

    /// Mutate one widget in place. Returns false when the id is unknown.
    pub fn update(&mut self, id: &str, mutate: impl FnOnce(&mut Widget)) -> bool {
        match self.widgets.iter_mut().find(|w| w.id == id) {
            Some(widget) => {
                mutate(widget);
                true
            }
            None => false,
        }
    }

    fn reindex(&mut self) {
        for (i, widget) in self.widgets.iter_mut().enumerate() {
            widget.grid_order = i;
        }
    }

    // ------------------------------------------------------------------
    // Fetch state. Each widget carries a generation the fetch cycle bumps
    // on start; a response is applied only while its generation is still
    // current, so late responses after a reconfiguration are discarded.
    // ------------------------------------------------------------------

    /// Mark a widget as loading and return the generation token its fetch
    /// must present to apply results.
    pub fn begin_fetch(&mut self, id: &str) -> Option<u64> {
        let widget = self.widgets.iter_mut().find(|w| w.id == id)?;
        widget.generation += 1;
        widget.is_loading = true;
        Some(widget.generation)
    }

    /// Apply fetched data if the widget still exists and the generation is
    /// current. Returns whether the data was applied.
    pub fn apply_fetch(
        &mut self,
        id: &str,
        generation: u64,
        rows: Vec<Map<String, Value>>,
        series: WidgetSeries,
    ) -> bool {
        let Some(widget) = self.widgets.iter_mut().find(|w| w.id == id) else {
            tracing::debug!(widget = id, "discarding response for removed widget");
            return false;
        };
        if widget.generation != generation {
            tracing::debug!(widget = id, generation, current = widget.generation, "discarding stale response");
            return false;
        }
        widget.rows = Some(rows);
        widget.series = Some(series);
        widget.is_loading = false;
        true
    }

    /// Clear the loading flag after a failed fetch, preserving the
    /// last-known-good data.
    pub fn fail_fetch(&mut self, id: &str, generation: u64) {
        if let Some(widget) = self.widgets.iter_mut().find(|w| w.id == id) {
            if widget.generation == generation {
                widget.is_loading = false;
            }
        }
    }

    // ------------------------------------------------------------------
    // Metric maintenance. Formulas reference metrics by position, so any
    // reorder or removal rewrites `metric_<n>` placeholders.
    // ------------------------------------------------------------------

    /// Move a metric within a widget's metrics list, rewriting formula
    /// placeholders to follow the new positions.
    pub fn move_metric(&mut self, widget_id: &str, from: usize, to: usize) -> Result<()> {
        let metrics = self.metrics_mut(widget_id)?;
        if from >= metrics.len() || to >= metrics.len() {
            return Err(BoardflowError::Validation(format!(
                "metric index out of range ({from} -> {to}, len {})",
                metrics.len()
            )));
        }
        if from == to {
            return Ok(());
        }
        let metric = metrics.remove(from);
        metrics.insert(to, metric);

        let (lo, hi) = (from.min(to), from.max(to));
        let shift_up = from < to;
        rewrite_formulas(metrics, |old| {
            Some(if old == from {
                to
            } else if old < lo || old > hi {
                old
            } else if shift_up {
                old - 1
            } else {
                old + 1
            })
        });
        Ok(())
    }

    /// Remove a metric, shifting later placeholder indices down. References
    /// to the removed metric are left dangling and warned about rather than
    /// silently rewritten.
    pub fn remove_metric(&mut self, widget_id: &str, index: usize) -> Result<MetricSpec> {
        let metrics = self.metrics_mut(widget_id)?;
        if index >= metrics.len() {
            return Err(BoardflowError::Validation(format!(
                "metric index {index} out of range (len {})",
                metrics.len()
            )));
        }
        let removed = metrics.remove(index);
        rewrite_formulas(metrics, |old| {
            if old < index {
                Some(old)
            } else if old == index {
                None
            } else {
                Some(old - 1)
            }
        });
        Ok(removed)
    }

    fn metrics_mut(&mut self, widget_id: &str) -> Result<&mut Vec<MetricSpec>> {
        let widget = self
            .widgets
            .iter_mut()
            .find(|w| w.id == widget_id)
            .ok_or_else(|| BoardflowError::Validation(format!("unknown widget {widget_id}")))?;
        let config = widget.aggregation_config.as_mut().ok_or_else(|| {
            BoardflowError::Validation(format!("widget {widget_id} has no aggregation config"))
        })?;
        Ok(&mut config.metrics)
    }

    // ------------------------------------------------------------------
    // Saved metrics.
    // ------------------------------------------------------------------

    pub fn add_saved_metric(&mut self, saved: SavedMetric) {
        self.saved_metrics.push(saved);
    }

    /// Append a saved metric template to a widget's metrics list, cloning
    /// it with a fresh id.
    pub fn apply_saved_metric(&mut self, widget_id: &str, saved_id: &str) -> Result<()> {
        let metric = self
            .saved_metrics
            .iter()
            .find(|s| s.id == saved_id)
            .map(SavedMetric::instantiate)
            .ok_or_else(|| BoardflowError::Validation(format!("unknown saved metric {saved_id}")))?;
        self.metrics_mut(widget_id)?.push(metric);
        Ok(())
    }
}

fn rewrite_formulas(metrics: &mut [MetricSpec], remap: impl Fn(usize) -> Option<usize>) {
    for metric in metrics.iter_mut() {
        if let Some(formula) = &metric.formula {
            let (rewritten, dangling) = rewrite_placeholders(formula, &remap);
            if !dangling.is_empty() {
                tracing::warn!(
                    metric = %metric.wire_alias(),
                    refs = ?dangling,
                    "formula references a removed metric"
                );
            }
            metric.formula = Some(rewritten);
        }
    }
}
