//! Wire-format scene graph
//!
//! This module defines the serialized form of an exported figure: the
//! JSON payload a client reconstructs without any knowledge of the
//! host plotting library. Top-level keys are
//! `width, height, axes, data, plugins, id`; every drawable entity
//! carries at minimum `id, zorder, coordinates, alpha`.
//!
//! Geometry referenced through [`DataRef`] lives in the shared
//! `data` table so identical columns are stored once.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::PathSpec;

/// Scale kind of one axis of an Axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleKind {
    #[default]
    Linear,
    Log,
    Date,
}

/// Coordinate system an element's geometry is expressed in.
///
/// Only `data` coordinates participate in zooming; the other systems
/// are anchored to the axes box, the figure, or raw pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coordinates {
    #[default]
    Data,
    Axes,
    Figure,
    Display,
}

/// Whether a collection item's offset translation applies before or
/// after its path transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetOrder {
    #[default]
    Before,
    After,
}

/// Reference into the figure's shared data table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataRef {
    /// Key into [`SceneFigure::data`] (`"data01"`, `"data02"`, ...)
    pub data: String,
    /// Column index of the x values
    pub xindex: usize,
    /// Column index of the y values
    pub yindex: usize,
}

/// The exported figure: one complete, self-contained scene graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneFigure {
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
    pub axes: Vec<SceneAxes>,
    /// Shared, deduplicated columnar payloads (row-major tables)
    pub data: BTreeMap<String, Vec<Vec<f64>>>,
    pub plugins: Vec<PluginSpec>,
    /// Fresh per export; everything else is deterministic
    pub id: String,
}

impl SceneFigure {
    /// Resolve a data reference to `(x, y)` pairs.
    pub fn resolve(&self, r: &DataRef) -> Option<Vec<[f64; 2]>> {
        let table = self.data.get(&r.data)?;
        let mut out = Vec::with_capacity(table.len());
        for row in table {
            out.push([*row.get(r.xindex)?, *row.get(r.yindex)?]);
        }
        Some(out)
    }
}

/// One coordinate panel of the figure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneAxes {
    pub id: String,
    /// `[x0, y0, width, height]` in figure-fraction units
    pub bbox: [f64; 4],
    /// Display limits
    pub xlim: [f64; 2],
    pub ylim: [f64; 2],
    /// Data-domain limits; differ from the lims only under the date
    /// scale, where they are epoch milliseconds
    pub xdomain: [f64; 2],
    pub ydomain: [f64; 2],
    pub xscale: ScaleKind,
    pub yscale: ScaleKind,
    /// Tick/spine/grid descriptions, bottom and left
    pub axes: Vec<SceneAxis>,
    pub axesbg: String,
    pub axesbgalpha: f64,
    pub zoomable: bool,
    /// Ids of axes linked for x pan/zoom
    #[serde(default)]
    pub sharex: Vec<String>,
    /// Ids of axes linked for y pan/zoom
    #[serde(default)]
    pub sharey: Vec<String>,
    #[serde(default)]
    pub lines: Vec<SceneLine>,
    #[serde(default)]
    pub paths: Vec<ScenePath>,
    #[serde(default)]
    pub markers: Vec<SceneMarkers>,
    #[serde(default)]
    pub texts: Vec<SceneText>,
    #[serde(default)]
    pub collections: Vec<SceneCollection>,
    #[serde(default)]
    pub images: Vec<SceneImage>,
}

/// Tick and grid description for one side of an Axes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneAxis {
    /// `"bottom"` or `"left"`
    pub position: String,
    pub nticks: usize,
    /// Explicit tick locations, `None` for automatic
    pub tickvalues: Option<Vec<f64>>,
    /// Explicit tick labels, `None` for automatic formatting
    pub tickformat: Option<Vec<String>>,
    pub fontsize: f64,
    pub grid: SceneGrid,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneGrid {
    #[serde(rename = "gridOn")]
    pub grid_on: bool,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub dasharray: Option<String>,
    #[serde(default)]
    pub alpha: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneLine {
    pub id: String,
    #[serde(flatten)]
    pub data: DataRef,
    pub coordinates: Coordinates,
    pub color: String,
    pub linewidth: f64,
    pub dasharray: String,
    pub alpha: f64,
    pub zorder: f64,
    /// Step interpolation hint (`"steps-pre"` etc.), straight lines
    /// when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawstyle: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneMarkers {
    pub id: String,
    #[serde(flatten)]
    pub data: DataRef,
    pub coordinates: Coordinates,
    pub marker: String,
    pub markersize: f64,
    /// Explicit marker outline, overriding `marker` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markerpath: Option<PathSpec>,
    pub facecolor: String,
    pub edgecolor: String,
    pub edgewidth: f64,
    pub alpha: f64,
    pub zorder: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenePath {
    pub id: String,
    #[serde(flatten)]
    pub data: DataRef,
    pub coordinates: Coordinates,
    /// Single-letter opcodes matching the referenced vertices
    pub pathcodes: Vec<String>,
    pub facecolor: String,
    pub edgecolor: String,
    pub edgewidth: f64,
    pub dasharray: String,
    pub alpha: f64,
    pub zorder: f64,
    /// Paint-time offset, with its own coordinate system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offsetcoordinates: Option<Coordinates>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneText {
    pub id: String,
    pub text: String,
    pub position: [f64; 2],
    pub coordinates: Coordinates,
    /// SVG text-anchor: `start`, `middle`, or `end`
    pub h_anchor: String,
    /// SVG dominant-baseline: `auto`, `central`, or `hanging`
    pub v_baseline: String,
    /// Degrees, clockwise-positive in screen space
    pub rotation: f64,
    pub fontsize: f64,
    pub color: String,
    pub alpha: f64,
    pub zorder: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneImage {
    pub id: String,
    /// Pre-encoded image payload (base64 data, encoded by the host)
    pub data: String,
    /// `[x0, x1, y0, y1]` in the element's coordinate system
    pub extent: [f64; 4],
    pub coordinates: Coordinates,
    pub alpha: f64,
    pub zorder: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneCollection {
    pub id: String,
    /// Offset positions, shared through the data table
    #[serde(flatten)]
    pub offsets: DataRef,
    /// Coordinate system of the item paths
    pub coordinates: Coordinates,
    pub offsetcoordinates: Coordinates,
    #[serde(default)]
    pub offsetorder: OffsetOrder,
    pub paths: Vec<PathSpec>,
    /// Flattened per-path affines `[a, b, c, d, tx, ty]`
    pub pathtransforms: Vec<[f64; 6]>,
    /// Per-item style records (only keys that genuinely vary)
    pub records: Vec<BTreeMap<String, Value>>,
    /// Shared style defaults, each encoded once
    pub defaults: BTreeMap<String, Value>,
    pub alpha: f64,
    pub zorder: f64,
}

/// A declarative behavior attachment, resolved entirely client-side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    /// Type tag the client resolves through its factory registry
    #[serde(rename = "type")]
    pub kind: String,
    /// Ids of the elements this plugin attaches to
    #[serde(default)]
    pub targets: Vec<String>,
    /// JSON-safe property bag
    #[serde(flatten)]
    pub props: BTreeMap<String, Value>,
    /// Free-form behavior snippet resolved by the client, carried
    /// beside the payload rather than interpreted by the exporter
    #[serde(skip)]
    pub behavior: Option<String>,
    /// Free-form CSS carried beside the payload
    #[serde(skip)]
    pub css: Option<String>,
}

impl PluginSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            targets: Vec::new(),
            props: BTreeMap::new(),
            behavior: None,
            css: None,
        }
    }

    /// Attach this plugin to an element id
    pub fn target(mut self, id: impl Into<String>) -> Self {
        self.targets.push(id.into());
        self
    }

    /// Set a property in the bag
    pub fn prop(mut self, key: impl Into<String>, value: Value) -> Self {
        self.props.insert(key.into(), value);
        self
    }

    /// Attach a client-resolved behavior snippet
    pub fn behavior(mut self, code: impl Into<String>) -> Self {
        self.behavior = Some(code.into());
        self
    }

    /// Attach companion CSS
    pub fn css(mut self, css: impl Into<String>) -> Self {
        self.css = Some(css.into());
        self
    }
}
