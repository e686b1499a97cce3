//! Host-side figure description
//!
//! The input to the exporter: a plain, walkable tree describing one
//! figure. Hosts populate this model through explicit, fully-typed
//! configuration structs; there is no dynamic attribute bag, so
//! unknown style keys are unrepresentable by construction.
//!
//! Element ids are assigned eagerly when an element is inserted, from
//! a per-figure counter. That makes ids deterministic across repeated
//! exports and lets plugins reference elements before any export has
//! happened.

use chrono::{DateTime, Utc};
use nalgebra::Matrix3;

use crate::path::HostCode;
use crate::scene::{Coordinates, OffsetOrder, PluginSpec, ScaleKind};
use crate::style::{Color, DashSpec};

/// Handle to an Axes owned by a [`Figure`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxesId(pub(crate) usize);

/// Top-level container for one exported plot.
///
/// Owns its Axes exclusively; built once per export call and not
/// mutated afterward.
#[derive(Clone, Debug)]
pub struct Figure {
    /// Width in inches
    pub width: f64,
    /// Height in inches
    pub height: f64,
    pub dpi: f64,
    pub background: Color,
    axes: Vec<Axes>,
    plugins: Vec<PluginSpec>,
    next_element: u32,
}

impl Figure {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            dpi: 100.0,
            background: Color::Named("white".to_string()),
            axes: Vec::new(),
            plugins: Vec::new(),
            next_element: 0,
        }
    }

    pub fn with_dpi(mut self, dpi: f64) -> Self {
        self.dpi = dpi;
        self
    }

    fn next_id(&mut self) -> String {
        self.next_element += 1;
        format!("el{}", self.next_element)
    }

    /// Add an Axes with the given figure-fraction bounding box
    /// `[x0, y0, width, height]`.
    pub fn add_axes(&mut self, bbox: [f64; 4]) -> AxesId {
        let id = self.next_id();
        self.axes.push(Axes::new(id, bbox));
        AxesId(self.axes.len() - 1)
    }

    pub fn axes(&self) -> &[Axes] {
        &self.axes
    }

    pub fn axes_ref(&self, id: AxesId) -> &Axes {
        &self.axes[id.0]
    }

    pub fn axes_mut(&mut self, id: AxesId) -> &mut Axes {
        &mut self.axes[id.0]
    }

    /// Link two Axes so x pan/zoom propagates between them.
    pub fn share_x(&mut self, a: AxesId, b: AxesId) {
        let (ida, idb) = (self.axes[a.0].id.clone(), self.axes[b.0].id.clone());
        self.axes[a.0].sharex.push(idb);
        self.axes[b.0].sharex.push(ida);
    }

    /// Link two Axes so y pan/zoom propagates between them.
    pub fn share_y(&mut self, a: AxesId, b: AxesId) {
        let (ida, idb) = (self.axes[a.0].id.clone(), self.axes[b.0].id.clone());
        self.axes[a.0].sharey.push(idb);
        self.axes[b.0].sharey.push(ida);
    }

    pub fn add_line(&mut self, ax: AxesId, mut line: Line) -> String {
        line.id = self.next_id();
        let id = line.id.clone();
        self.axes[ax.0].lines.push(line);
        id
    }

    pub fn add_markers(&mut self, ax: AxesId, mut markers: Markers) -> String {
        markers.id = self.next_id();
        let id = markers.id.clone();
        self.axes[ax.0].markers.push(markers);
        id
    }

    pub fn add_path(&mut self, ax: AxesId, mut path: PathItem) -> String {
        path.id = self.next_id();
        let id = path.id.clone();
        self.axes[ax.0].paths.push(path);
        id
    }

    pub fn add_text(&mut self, ax: AxesId, mut text: Text) -> String {
        text.id = self.next_id();
        let id = text.id.clone();
        self.axes[ax.0].texts.push(text);
        id
    }

    pub fn add_image(&mut self, ax: AxesId, mut image: Image) -> String {
        image.id = self.next_id();
        let id = image.id.clone();
        self.axes[ax.0].images.push(image);
        id
    }

    pub fn add_collection(&mut self, ax: AxesId, mut collection: Collection) -> String {
        collection.id = self.next_id();
        let id = collection.id.clone();
        self.axes[ax.0].collections.push(collection);
        id
    }

    /// Set an axis label or title; these are drawn after element texts.
    pub fn set_xlabel(&mut self, ax: AxesId, text: Text) {
        let mut text = text.anchored([0.5, -0.08], VAlign::Top, 0.0);
        text.id = self.next_id();
        self.axes[ax.0].xlabel = Some(text);
    }

    pub fn set_ylabel(&mut self, ax: AxesId, text: Text) {
        let mut text = text.anchored([-0.1, 0.5], VAlign::Baseline, 90.0);
        text.id = self.next_id();
        self.axes[ax.0].ylabel = Some(text);
    }

    pub fn set_title(&mut self, ax: AxesId, text: Text) {
        let mut text = text.anchored([0.5, 1.02], VAlign::Bottom, 0.0);
        text.id = self.next_id();
        self.axes[ax.0].title = Some(text);
    }

    pub fn plugins(&self) -> &[PluginSpec] {
        &self.plugins
    }

    pub(crate) fn plugins_mut(&mut self) -> &mut Vec<PluginSpec> {
        &mut self.plugins
    }
}

/// One coordinate panel within a figure.
#[derive(Clone, Debug)]
pub struct Axes {
    pub(crate) id: String,
    /// `[x0, y0, width, height]` in figure-fraction units
    pub bbox: [f64; 4],
    /// Display limits
    pub xlim: [f64; 2],
    pub ylim: [f64; 2],
    pub xscale: ScaleKind,
    pub yscale: ScaleKind,
    /// Data-domain limits for date-scaled axes; ignored otherwise
    pub xdate: Option<[DateTime<Utc>; 2]>,
    pub ydate: Option<[DateTime<Utc>; 2]>,
    pub zoomable: bool,
    pub background: Color,
    pub background_alpha: f64,
    pub xaxis: AxisProps,
    pub yaxis: AxisProps,
    /// Ids of x-linked partner Axes
    pub sharex: Vec<String>,
    /// Ids of y-linked partner Axes
    pub sharey: Vec<String>,
    /// Legend state; exported only as an unsupported-feature warning
    pub legend: Option<Legend>,
    /// Host feature categories the exporter has no callback for
    /// (3D projections, colorbars, custom artists)
    pub unsupported: Vec<String>,
    pub(crate) lines: Vec<Line>,
    pub(crate) markers: Vec<Markers>,
    pub(crate) paths: Vec<PathItem>,
    pub(crate) texts: Vec<Text>,
    pub(crate) images: Vec<Image>,
    pub(crate) collections: Vec<Collection>,
    pub(crate) xlabel: Option<Text>,
    pub(crate) ylabel: Option<Text>,
    pub(crate) title: Option<Text>,
}

impl Axes {
    fn new(id: String, bbox: [f64; 4]) -> Self {
        Self {
            id,
            bbox,
            xlim: [0.0, 1.0],
            ylim: [0.0, 1.0],
            xscale: ScaleKind::Linear,
            yscale: ScaleKind::Linear,
            xdate: None,
            ydate: None,
            zoomable: true,
            background: Color::Named("white".to_string()),
            background_alpha: 1.0,
            xaxis: AxisProps::default(),
            yaxis: AxisProps::default(),
            sharex: Vec::new(),
            sharey: Vec::new(),
            legend: None,
            unsupported: Vec::new(),
            lines: Vec::new(),
            markers: Vec::new(),
            paths: Vec::new(),
            texts: Vec::new(),
            images: Vec::new(),
            collections: Vec::new(),
            xlabel: None,
            ylabel: None,
            title: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_xlim(&mut self, lim: [f64; 2]) -> &mut Self {
        self.xlim = lim;
        self
    }

    pub fn set_ylim(&mut self, lim: [f64; 2]) -> &mut Self {
        self.ylim = lim;
        self
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn markers(&self) -> &[Markers] {
        &self.markers
    }

    pub fn paths(&self) -> &[PathItem] {
        &self.paths
    }

    pub fn texts(&self) -> &[Text] {
        &self.texts
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }
}

/// Tick configuration for one axis of an Axes.
#[derive(Clone, Debug)]
pub struct AxisProps {
    pub nticks: usize,
    /// Explicit tick locations, `None` for automatic
    pub tickvalues: Option<Vec<f64>>,
    /// Explicit tick labels, `None` for automatic formatting
    pub tickformat: Option<Vec<String>>,
    pub fontsize: f64,
    /// Grid lines drawn at the ticks, `None` for no grid
    pub grid: Option<GridStyle>,
    pub visible: bool,
}

impl Default for AxisProps {
    fn default() -> Self {
        Self {
            nticks: 10,
            tickvalues: None,
            tickformat: None,
            fontsize: 10.0,
            grid: None,
            visible: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GridStyle {
    pub color: Color,
    pub dash: DashSpec,
    pub alpha: f64,
}

impl Default for GridStyle {
    fn default() -> Self {
        Self {
            color: Color::Named("gray".to_string()),
            dash: DashSpec::Named("dashed".to_string()),
            alpha: 0.5,
        }
    }
}

/// Legend state captured from the host. The exporter has no legend
/// callback, so its presence degrades to a collected warning.
#[derive(Clone, Debug, Default)]
pub struct Legend {
    pub entries: Vec<String>,
}

/// A connected line through data points.
#[derive(Clone, Debug)]
pub struct Line {
    pub(crate) id: String,
    pub data: Vec<[f64; 2]>,
    pub coordinates: Coordinates,
    pub style: LineStyle,
    pub label: Option<String>,
    pub zorder: f64,
}

impl Line {
    pub fn new(data: Vec<[f64; 2]>) -> Self {
        Self {
            id: String::new(),
            data,
            coordinates: Coordinates::Data,
            style: LineStyle::default(),
            label: None,
            zorder: 2.0,
        }
    }

    pub fn with_style(mut self, style: LineStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = coordinates;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_zorder(mut self, zorder: f64) -> Self {
        self.zorder = zorder;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Debug)]
pub struct LineStyle {
    pub color: Color,
    pub alpha: f64,
    pub linewidth: f64,
    pub dash: DashSpec,
    /// Step interpolation hint passed through to the client
    pub drawstyle: Option<String>,
    /// When set, a markers pass is drawn over the same data
    pub marker: Option<MarkerStyle>,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: Color::Named("#1f77b4".to_string()),
            alpha: 1.0,
            linewidth: 1.0,
            dash: DashSpec::solid(),
            drawstyle: None,
            marker: None,
        }
    }
}

impl LineStyle {
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_linewidth(mut self, linewidth: f64) -> Self {
        self.linewidth = linewidth;
        self
    }

    pub fn with_dash(mut self, dash: DashSpec) -> Self {
        self.dash = dash;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_marker(mut self, marker: MarkerStyle) -> Self {
        self.marker = Some(marker);
        self
    }
}

/// Unconnected point markers over data positions.
#[derive(Clone, Debug)]
pub struct Markers {
    pub(crate) id: String,
    pub data: Vec<[f64; 2]>,
    pub coordinates: Coordinates,
    pub style: MarkerStyle,
    pub label: Option<String>,
    pub zorder: f64,
}

impl Markers {
    pub fn new(data: Vec<[f64; 2]>) -> Self {
        Self {
            id: String::new(),
            data,
            coordinates: Coordinates::Data,
            style: MarkerStyle::default(),
            label: None,
            zorder: 2.0,
        }
    }

    pub fn with_style(mut self, style: MarkerStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_zorder(mut self, zorder: f64) -> Self {
        self.zorder = zorder;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Debug)]
pub struct MarkerStyle {
    /// Host symbol (`"o"`, `"s"`, `"^"`, ...), normalized at export
    pub symbol: String,
    pub size: f64,
    pub facecolor: Color,
    pub edgecolor: Color,
    pub edgewidth: f64,
    pub alpha: f64,
    /// Explicit outline for custom symbols
    pub path: Option<(Vec<[f64; 2]>, Vec<HostCode>)>,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            symbol: "o".to_string(),
            size: 6.0,
            facecolor: Color::Named("#1f77b4".to_string()),
            edgecolor: Color::Named("black".to_string()),
            edgewidth: 1.0,
            alpha: 1.0,
            path: None,
        }
    }
}

impl MarkerStyle {
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_facecolor(mut self, color: Color) -> Self {
        self.facecolor = color;
        self
    }
}

/// An arbitrary vector shape (patch).
#[derive(Clone, Debug)]
pub struct PathItem {
    pub(crate) id: String,
    pub vertices: Vec<[f64; 2]>,
    /// One host code per vertex slot; `None` means a plain polyline
    pub codes: Option<Vec<HostCode>>,
    /// Shape-local affine, e.g. for patches defined in unit space
    pub pretransform: Option<Matrix3<f64>>,
    pub coordinates: Coordinates,
    pub style: PathStyle,
    /// Paint-time offset with its own coordinate system
    pub offset: Option<([f64; 2], Coordinates)>,
    pub zorder: f64,
}

impl PathItem {
    pub fn new(vertices: Vec<[f64; 2]>) -> Self {
        Self {
            id: String::new(),
            vertices,
            codes: None,
            pretransform: None,
            coordinates: Coordinates::Data,
            style: PathStyle::default(),
            offset: None,
            zorder: 1.0,
        }
    }

    pub fn with_codes(mut self, codes: Vec<HostCode>) -> Self {
        self.codes = Some(codes);
        self
    }

    pub fn with_pretransform(mut self, m: Matrix3<f64>) -> Self {
        self.pretransform = Some(m);
        self
    }

    pub fn with_style(mut self, style: PathStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = coordinates;
        self
    }

    pub fn with_offset(mut self, offset: [f64; 2], coordinates: Coordinates) -> Self {
        self.offset = Some((offset, coordinates));
        self
    }

    pub fn with_zorder(mut self, zorder: f64) -> Self {
        self.zorder = zorder;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Debug)]
pub struct PathStyle {
    pub facecolor: Color,
    pub edgecolor: Color,
    pub edgewidth: f64,
    pub dash: DashSpec,
    pub alpha: f64,
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            facecolor: Color::Named("#1f77b4".to_string()),
            edgecolor: Color::Named("black".to_string()),
            edgewidth: 1.0,
            dash: DashSpec::solid(),
            alpha: 1.0,
        }
    }
}

impl PathStyle {
    pub fn with_facecolor(mut self, color: Color) -> Self {
        self.facecolor = color;
        self
    }

    pub fn with_edgecolor(mut self, color: Color) -> Self {
        self.edgecolor = color;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
}

/// Horizontal text alignment as the host reports it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

/// Vertical text alignment as the host reports it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VAlign {
    Bottom,
    Baseline,
    Center,
    Top,
}

/// A text element.
#[derive(Clone, Debug)]
pub struct Text {
    pub(crate) id: String,
    pub text: String,
    pub position: [f64; 2],
    pub coordinates: Coordinates,
    pub style: TextStyle,
    pub zorder: f64,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            text: text.into(),
            position: [0.0, 0.0],
            coordinates: Coordinates::Data,
            style: TextStyle::default(),
            zorder: 3.0,
        }
    }

    pub fn at(mut self, position: [f64; 2]) -> Self {
        self.position = position;
        self
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = coordinates;
        self
    }

    pub fn with_style(mut self, style: TextStyle) -> Self {
        self.style = style;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Pin to a canonical axes-fraction anchor (labels and titles).
    fn anchored(mut self, position: [f64; 2], valign: VAlign, rotation: f64) -> Self {
        self.position = position;
        self.coordinates = Coordinates::Axes;
        self.style.halign = HAlign::Center;
        self.style.valign = valign;
        self.style.rotation = rotation;
        self
    }
}

#[derive(Clone, Debug)]
pub struct TextStyle {
    pub color: Color,
    pub fontsize: f64,
    pub alpha: f64,
    /// Degrees, counterclockwise-positive in the host convention
    pub rotation: f64,
    pub halign: HAlign,
    pub valign: VAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            color: Color::Named("black".to_string()),
            fontsize: 10.0,
            alpha: 1.0,
            rotation: 0.0,
            halign: HAlign::Left,
            valign: VAlign::Baseline,
        }
    }
}

impl TextStyle {
    pub fn with_fontsize(mut self, fontsize: f64) -> Self {
        self.fontsize = fontsize;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }
}

/// A raster image anchored to an extent.
#[derive(Clone, Debug)]
pub struct Image {
    pub(crate) id: String,
    /// Pre-encoded payload (base64), produced by the host
    pub data: String,
    /// `[x0, x1, y0, y1]`
    pub extent: [f64; 4],
    pub coordinates: Coordinates,
    pub alpha: f64,
    pub zorder: f64,
}

impl Image {
    pub fn new(data: impl Into<String>, extent: [f64; 4]) -> Self {
        Self {
            id: String::new(),
            data: data.into(),
            extent,
            coordinates: Coordinates::Data,
            alpha: 1.0,
            zorder: 0.0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// A batched collection of shapes sharing most of their styling.
#[derive(Clone, Debug)]
pub struct Collection {
    pub(crate) id: String,
    /// Item outlines, each in its own path coordinate system
    pub paths: Vec<(Vec<[f64; 2]>, Option<Vec<HostCode>>)>,
    pub path_coordinates: Coordinates,
    /// Per-path affines; empty means identity for every item
    pub path_transforms: Vec<Matrix3<f64>>,
    pub offsets: Vec<[f64; 2]>,
    pub offset_coordinates: Coordinates,
    pub offset_order: OffsetOrder,
    pub style: CollectionStyle,
    pub zorder: f64,
}

impl Collection {
    pub fn new(
        paths: Vec<(Vec<[f64; 2]>, Option<Vec<HostCode>>)>,
        offsets: Vec<[f64; 2]>,
    ) -> Self {
        Self {
            id: String::new(),
            paths,
            path_coordinates: Coordinates::Display,
            path_transforms: Vec::new(),
            offsets,
            offset_coordinates: Coordinates::Data,
            offset_order: OffsetOrder::Before,
            style: CollectionStyle::default(),
            zorder: 1.0,
        }
    }

    pub fn with_style(mut self, style: CollectionStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_offset_order(mut self, order: OffsetOrder) -> Self {
        self.offset_order = order;
        self
    }

    pub fn with_path_transforms(mut self, transforms: Vec<Matrix3<f64>>) -> Self {
        self.path_transforms = transforms;
        self
    }

    pub fn with_zorder(mut self, zorder: f64) -> Self {
        self.zorder = zorder;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Per-item style arrays for a collection. Each array may hold zero,
/// one, or one-per-item values; the renderer folds them (§ fold).
#[derive(Clone, Debug, Default)]
pub struct CollectionStyle {
    pub facecolors: Vec<Color>,
    pub edgecolors: Vec<Color>,
    pub edgewidths: Vec<f64>,
    pub alphas: Vec<f64>,
}

impl CollectionStyle {
    pub fn with_facecolors(mut self, colors: Vec<Color>) -> Self {
        self.facecolors = colors;
        self
    }

    pub fn with_edgecolors(mut self, colors: Vec<Color>) -> Self {
        self.edgecolors = colors;
        self
    }

    pub fn with_edgewidths(mut self, widths: Vec<f64>) -> Self {
        self.edgewidths = widths;
        self
    }

    pub fn with_alphas(mut self, alphas: Vec<f64>) -> Self {
        self.alphas = alphas;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_ids_are_sequential_within_a_figure() {
        let mut fig = Figure::new(6.0, 4.0);
        let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
        let l1 = fig.add_line(ax, Line::new(vec![[0.0, 0.0], [1.0, 1.0]]));
        let l2 = fig.add_line(ax, Line::new(vec![[0.0, 1.0], [1.0, 0.0]]));

        assert_eq!(fig.axes_ref(ax).id(), "el1");
        assert_eq!(l1, "el2");
        assert_eq!(l2, "el3");
    }

    #[test]
    fn test_ids_do_not_leak_across_figures() {
        let mut a = Figure::new(6.0, 4.0);
        let mut b = Figure::new(6.0, 4.0);
        let axa = a.add_axes([0.1, 0.1, 0.8, 0.8]);
        let axb = b.add_axes([0.1, 0.1, 0.8, 0.8]);
        assert_eq!(a.axes_ref(axa).id(), b.axes_ref(axb).id());
    }

    #[test]
    fn test_share_x_links_both_directions() {
        let mut fig = Figure::new(8.0, 4.0);
        let a = fig.add_axes([0.1, 0.1, 0.35, 0.8]);
        let b = fig.add_axes([0.55, 0.1, 0.35, 0.8]);
        fig.share_x(a, b);

        assert_eq!(fig.axes_ref(a).sharex, vec!["el2".to_string()]);
        assert_eq!(fig.axes_ref(b).sharex, vec!["el1".to_string()]);
    }

    #[test]
    fn test_labels_are_anchored_in_axes_fractions() {
        let mut fig = Figure::new(6.0, 4.0);
        let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
        fig.set_ylabel(ax, Text::new("flux"));

        let label = fig.axes_ref(ax).ylabel.as_ref().unwrap();
        assert_eq!(label.coordinates, Coordinates::Axes);
        assert_eq!(label.style.rotation, 90.0);
        assert!(!label.id.is_empty());
    }
}
