//! Viewport-driven level of detail for candlestick charts.
//!
//! A [`Chart`] keeps its raw candles at native resolution, memoizes
//! resampled series per resolution, and hands the renderer only the candles
//! near the viewport, at a resolution chosen from the viewport width.

pub mod cache;
pub mod chart;
pub mod cutter;
pub mod data;
pub mod descriptor;
pub mod error;
pub mod lod;
pub mod overlay;
pub mod settings;
pub mod tasks;

pub use cache::{ResampleCache, ResampledPair};
pub use chart::{Chart, DisplayState, RenderSlice, ScaleMode};
pub use cutter::{Window, WindowCutter};
pub use data::{ChartData, SharedData};
pub use descriptor::{ChartDescriptor, SourceRef};
pub use error::{ChartError, Result};
pub use lod::{LodController, LodThresholds};
pub use overlay::{Annotation, PlotArea, TimeframeAware};
pub use settings::ChartSettings;
pub use tasks::{update_once, ChartEvent, ChartTasks};
