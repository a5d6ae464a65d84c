//! Plot items that react to the viewport and to the active resolution.

use charter_core::{Bounds, Resolution};
use serde::{Deserialize, Serialize};

use crate::chart::Chart;
use crate::error::{ChartError, Result};
use crate::tasks::ChartEvent;

/// Viewport hooks a plot item may implement. Every hook defaults to a no-op,
/// so items implement only what applies to them.
pub trait TimeframeAware {
    /// Re-cut the item's data if `interval` left what is materialized.
    fn maybe_cut_to_interval(&mut self, _interval: Bounds) -> Result<()> {
        Ok(())
    }

    /// Adjust resolution by at most one step for a pan or zoom.
    fn resample_to_interval(&mut self, _interval: Bounds) -> Result<()> {
        Ok(())
    }

    /// Jump to the right resolution for a brand-new interval.
    fn resample_to_interval_abrupt(&mut self, _interval: Bounds) -> Result<()> {
        Ok(())
    }

    /// Show or hide the item for the plot's active resolution.
    fn hide_wrong_tfs(&mut self, _active: Resolution) {}
}

impl TimeframeAware for Chart {
    fn maybe_cut_to_interval(&mut self, interval: Bounds) -> Result<()> {
        Chart::maybe_cut_to_interval(self, interval)
    }

    fn resample_to_interval(&mut self, interval: Bounds) -> Result<()> {
        if self.auto_resample() {
            Chart::resample_to_interval(self, interval)
        } else {
            Ok(())
        }
    }

    fn resample_to_interval_abrupt(&mut self, interval: Bounds) -> Result<()> {
        Chart::resample_to_interval_abrupt(self, interval)
    }
}

/// A user drawing tied to the resolution it was drawn at.
///
/// It stays visible at that resolution and finer ones, and hides when the
/// plot shows coarser candles than it was drawn on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub label: String,
    pub resolution: Resolution,
    #[serde(skip, default = "visible_by_default")]
    visible: bool,
}

fn visible_by_default() -> bool {
    true
}

impl Annotation {
    pub fn new(label: impl Into<String>, resolution: Resolution) -> Self {
        Self {
            label: label.into(),
            resolution,
            visible: true,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

impl TimeframeAware for Annotation {
    fn hide_wrong_tfs(&mut self, active: Resolution) {
        self.visible = active.duration_seconds() <= self.resolution.duration_seconds();
    }
}

/// Charts and annotations sharing one time axis.
#[derive(Debug, Default)]
pub struct PlotArea {
    charts: Vec<Chart>,
    annotations: Vec<Annotation>,
}

impl PlotArea {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chart(&mut self, chart: Chart) {
        self.charts.push(chart);
    }

    pub fn charts(&self) -> &[Chart] {
        &self.charts
    }

    pub fn chart_mut(&mut self, label: &str) -> Result<&mut Chart> {
        self.charts
            .iter_mut()
            .find(|chart| chart.label() == label)
            .ok_or_else(|| ChartError::UnknownChart(label.to_string()))
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Adds an annotation tagged with the current resolution.
    pub fn annotate(&mut self, label: impl Into<String>) -> Option<&Annotation> {
        let resolution = self.current_resolution()?;
        self.annotations.push(Annotation::new(label, resolution));
        self.annotations.last()
    }

    pub fn add_annotation(&mut self, mut annotation: Annotation) {
        if let Some(active) = self.current_resolution() {
            annotation.hide_wrong_tfs(active);
        }
        self.annotations.push(annotation);
    }

    /// Resolution of the first chart.
    pub fn current_resolution(&self) -> Option<Resolution> {
        self.charts.first().map(Chart::active_resolution)
    }

    fn items_mut(&mut self) -> impl Iterator<Item = &mut dyn TimeframeAware> {
        let charts = self.charts.iter_mut().map(|c| c as &mut dyn TimeframeAware);
        let annotations = self
            .annotations
            .iter_mut()
            .map(|a| a as &mut dyn TimeframeAware);
        charts.chain(annotations)
    }

    /// Continuous pan or zoom: cut everything first, then re-target.
    pub fn on_viewport_changed(&mut self, interval: Bounds) -> Result<()> {
        for item in self.items_mut() {
            item.maybe_cut_to_interval(interval)?;
        }
        for item in self.items_mut() {
            item.resample_to_interval(interval)?;
        }
        self.hide_wrong_tfs();
        Ok(())
    }

    /// Sudden viewport jump.
    pub fn on_viewport_abrupt(&mut self, interval: Bounds) -> Result<()> {
        for item in self.items_mut() {
            item.maybe_cut_to_interval(interval)?;
        }
        for item in self.items_mut() {
            item.resample_to_interval_abrupt(interval)?;
        }
        self.hide_wrong_tfs();
        Ok(())
    }

    /// Manual resolution choice for every chart; turns auto-resampling off.
    pub fn set_resolution(&mut self, resolution: Resolution) -> Result<()> {
        for chart in &mut self.charts {
            chart.set_resolution(resolution)?;
        }
        self.hide_wrong_tfs();
        Ok(())
    }

    pub fn set_auto_resample(&mut self, enabled: bool) {
        for chart in &mut self.charts {
            chart.set_auto_resample(enabled);
        }
    }

    /// Drains task events of every chart, tagged with the chart label.
    pub fn poll_events(&mut self) -> Vec<(String, ChartEvent)> {
        let mut events = Vec::new();
        for chart in &mut self.charts {
            let label = chart.label().to_string();
            events.extend(chart.poll_events().into_iter().map(|e| (label.clone(), e)));
        }
        events
    }

    fn hide_wrong_tfs(&mut self) {
        if let Some(active) = self.current_resolution() {
            for item in self.items_mut() {
                item.hide_wrong_tfs(active);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_visibility() {
        let mut note = Annotation::new("support", Resolution::hours(1));
        note.hide_wrong_tfs(Resolution::minutes(15));
        assert!(note.is_visible());
        note.hide_wrong_tfs(Resolution::minutes(60));
        assert!(note.is_visible());
        note.hide_wrong_tfs(Resolution::hours(4));
        assert!(!note.is_visible());
        note.hide_wrong_tfs(Resolution::hours(1));
        assert!(note.is_visible());
    }

    #[test]
    fn test_annotation_serde_defaults_visible() {
        let note: Annotation =
            serde_json::from_str(r#"{"label":"trend","resolution":"1d"}"#).unwrap();
        assert!(note.is_visible());
        assert_eq!(note.resolution, Resolution::days(1));
    }

    #[test]
    fn test_empty_plot_area() {
        let mut area = PlotArea::new();
        assert_eq!(area.current_resolution(), None);
        assert!(area.annotate("x").is_none());
        assert!(area.on_viewport_changed(Bounds::new(0, 100)).is_ok());
        assert!(matches!(
            area.chart_mut("missing"),
            Err(ChartError::UnknownChart(_))
        ));
    }
}
