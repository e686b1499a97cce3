//! JSON scene-graph renderer
//!
//! [`SceneRenderer`] implements the [`Renderer`](crate::export::Renderer)
//! callbacks by normalizing style values, encoding geometry, folding
//! batched properties, and accumulating the resulting entities into
//! [`SceneFigure`] wire structs. All state is scoped to the renderer
//! instance, so concurrent exports in one process cannot interfere.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{ExportError, ExportResult, Warning, Warnings};
use crate::export::Renderer;
use crate::figure::{Axes, Collection, Figure, Image, LineStyle, MarkerStyle, PathItem, Text};
use crate::fold::{fold, PropValue};
use crate::path;
use crate::scene::{
    Coordinates, DataRef, SceneAxes, SceneAxis, SceneCollection, SceneFigure, SceneGrid,
    SceneImage, SceneLine, SceneMarkers, ScenePath, SceneText,
};
use crate::style::{Color, MarkerShape};

/// Everything one export produces: the scene graph plus the free-form
/// CSS and behavior blocks contributed by plugins, and the warnings
/// recorded along the way.
#[derive(Clone, Debug)]
pub struct ExportOutput {
    pub figure: SceneFigure,
    pub css: String,
    pub behavior: String,
    pub warnings: Vec<Warning>,
}

/// Builds [`SceneFigure`]s from renderer callbacks.
#[derive(Debug, Default)]
pub struct SceneRenderer {
    figure: Option<SceneFigure>,
    axes: Option<SceneAxes>,
    /// Row-major dedup tables backing the figure's `data` map
    datasets: Vec<Vec<Vec<f64>>>,
    warnings: Warnings,
    finished: Vec<(SceneFigure, String, String)>,
}

impl SceneRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn datalabel(i: usize) -> String {
        format!("data{:02}", i)
    }

    /// Add an `[N, 2]` dataset, reusing columns that already exist.
    ///
    /// If either column matches a column of a previously added dataset
    /// of the same length, the new columns join that dataset and the
    /// returned reference points at the shared table.
    fn add_data(&mut self, points: &[[f64; 2]]) -> DataRef {
        let xcol: Vec<f64> = points.iter().map(|p| p[0]).collect();
        let ycol: Vec<f64> = points.iter().map(|p| p[1]).collect();

        if !points.is_empty() {
            for (i, table) in self.datasets.iter_mut().enumerate() {
                if table.len() != points.len() {
                    continue;
                }
                let ncols = table.first().map(|row| row.len()).unwrap_or(0);
                let matches = |col: &[f64]| {
                    (0..ncols).find(|&j| table.iter().zip(col).all(|(row, v)| row[j] == *v))
                };
                let (mx, my) = (matches(&xcol), matches(&ycol));
                if mx.is_none() && my.is_none() {
                    continue;
                }

                let xindex = match mx {
                    Some(j) => j,
                    None => {
                        for (row, v) in table.iter_mut().zip(&xcol) {
                            row.push(*v);
                        }
                        ncols
                    }
                };
                let ncols = table.first().map(|row| row.len()).unwrap_or(0);
                let yindex = match my {
                    Some(j) => j,
                    None => {
                        for (row, v) in table.iter_mut().zip(&ycol) {
                            row.push(*v);
                        }
                        ncols
                    }
                };
                return DataRef {
                    data: Self::datalabel(i + 1),
                    xindex,
                    yindex,
                };
            }
        }

        self.datasets
            .push(points.iter().map(|p| vec![p[0], p[1]]).collect());
        DataRef {
            data: Self::datalabel(self.datasets.len()),
            xindex: 0,
            yindex: 1,
        }
    }

    fn current_axes(&mut self) -> ExportResult<&mut SceneAxes> {
        self.axes
            .as_mut()
            .ok_or_else(|| ExportError::InvalidFigure("draw call outside open_axes".to_string()))
    }

    fn hex(&mut self, color: &Color) -> String {
        color.to_hex(&mut self.warnings)
    }

    /// Finished exports, in completion order.
    pub fn into_outputs(mut self) -> Vec<ExportOutput> {
        let warnings = self.warnings.into_vec();
        self.finished
            .drain(..)
            .map(|(figure, css, behavior)| ExportOutput {
                figure,
                css,
                behavior,
                warnings: warnings.clone(),
            })
            .collect()
    }
}

/// Axes-fraction domain limits, as epoch milliseconds for date scales.
fn domain(
    scale: crate::scene::ScaleKind,
    lim: [f64; 2],
    date: &Option<[chrono::DateTime<chrono::Utc>; 2]>,
) -> [f64; 2] {
    match (scale, date) {
        (crate::scene::ScaleKind::Date, Some([a, b])) => {
            [a.timestamp_millis() as f64, b.timestamp_millis() as f64]
        }
        _ => lim,
    }
}

fn axis_descriptor(position: &str, props: &crate::figure::AxisProps, warnings: &mut Warnings) -> SceneAxis {
    let grid = match &props.grid {
        None => SceneGrid {
            grid_on: false,
            color: None,
            dasharray: None,
            alpha: None,
        },
        Some(style) => SceneGrid {
            grid_on: true,
            color: Some(style.color.to_hex(warnings)),
            dasharray: Some(style.dash.to_dasharray(warnings)),
            alpha: Some(style.alpha),
        },
    };
    SceneAxis {
        position: position.to_string(),
        nticks: props.nticks,
        tickvalues: props.tickvalues.clone(),
        tickformat: props.tickformat.clone(),
        fontsize: props.fontsize,
        grid,
    }
}

impl Renderer for SceneRenderer {
    fn open_figure(&mut self, figure: &Figure) -> ExportResult<()> {
        if self.figure.is_some() {
            return Err(ExportError::InvalidFigure(
                "open_figure while a figure is already open".to_string(),
            ));
        }
        self.datasets.clear();
        self.figure = Some(SceneFigure {
            width: figure.width * figure.dpi,
            height: figure.height * figure.dpi,
            axes: Vec::new(),
            data: BTreeMap::new(),
            plugins: Vec::new(),
            id: format!("fig{}", Uuid::new_v4().simple()),
        });
        Ok(())
    }

    fn close_figure(&mut self, figure: &Figure) -> ExportResult<()> {
        let mut scene = self
            .figure
            .take()
            .ok_or_else(|| ExportError::InvalidFigure("close_figure without open".to_string()))?;

        for (i, dataset) in self.datasets.drain(..).enumerate() {
            scene.data.insert(Self::datalabel(i + 1), dataset);
        }

        let mut css = String::new();
        let mut behavior = String::new();
        for plugin in figure.plugins() {
            if let Some(block) = &plugin.css {
                css.push_str(block);
            }
            if let Some(block) = &plugin.behavior {
                behavior.push_str(block);
            }
            scene.plugins.push(plugin.clone());
        }

        self.finished.push((scene, css, behavior));
        Ok(())
    }

    fn open_axes(&mut self, axes: &Axes) -> ExportResult<()> {
        let axesbg = self.hex(&axes.background);
        let mut descriptors = Vec::new();
        if axes.xaxis.visible {
            descriptors.push(axis_descriptor("bottom", &axes.xaxis, &mut self.warnings));
        }
        if axes.yaxis.visible {
            descriptors.push(axis_descriptor("left", &axes.yaxis, &mut self.warnings));
        }

        self.axes = Some(SceneAxes {
            id: axes.id().to_string(),
            bbox: axes.bbox,
            xlim: axes.xlim,
            ylim: axes.ylim,
            xdomain: domain(axes.xscale, axes.xlim, &axes.xdate),
            ydomain: domain(axes.yscale, axes.ylim, &axes.ydate),
            xscale: axes.xscale,
            yscale: axes.yscale,
            axes: descriptors,
            axesbg,
            axesbgalpha: axes.background_alpha,
            zoomable: axes.zoomable,
            sharex: axes.sharex.clone(),
            sharey: axes.sharey.clone(),
            lines: Vec::new(),
            paths: Vec::new(),
            markers: Vec::new(),
            texts: Vec::new(),
            collections: Vec::new(),
            images: Vec::new(),
        });
        Ok(())
    }

    fn close_axes(&mut self, _axes: &Axes) -> ExportResult<()> {
        let axes = self
            .axes
            .take()
            .ok_or_else(|| ExportError::InvalidFigure("close_axes without open".to_string()))?;
        let figure = self
            .figure
            .as_mut()
            .ok_or_else(|| ExportError::InvalidFigure("close_axes outside figure".to_string()))?;
        figure.axes.push(axes);
        Ok(())
    }

    fn draw_line(
        &mut self,
        id: &str,
        data: &[[f64; 2]],
        coordinates: Coordinates,
        style: &LineStyle,
        zorder: f64,
        _label: Option<&str>,
    ) -> ExportResult<()> {
        let data_ref = self.add_data(data);
        let color = self.hex(&style.color);
        let dasharray = style.dash.to_dasharray(&mut self.warnings);
        let line = SceneLine {
            id: id.to_string(),
            data: data_ref,
            coordinates,
            color,
            linewidth: style.linewidth,
            dasharray,
            alpha: style.alpha,
            zorder,
            drawstyle: style.drawstyle.clone(),
        };
        self.current_axes()?.lines.push(line);
        Ok(())
    }

    fn draw_markers(
        &mut self,
        id: &str,
        data: &[[f64; 2]],
        coordinates: Coordinates,
        style: &MarkerStyle,
        zorder: f64,
        _label: Option<&str>,
    ) -> ExportResult<()> {
        let data_ref = self.add_data(data);
        let shape = MarkerShape::from_symbol(&style.symbol, &mut self.warnings)
            .unwrap_or(MarkerShape::Circle);
        let markerpath = match &style.path {
            None => None,
            Some((vertices, codes)) => Some(path::encode(vertices, Some(codes.as_slice()), None)?),
        };
        let facecolor = self.hex(&style.facecolor);
        let edgecolor = self.hex(&style.edgecolor);
        let markers = SceneMarkers {
            id: id.to_string(),
            data: data_ref,
            coordinates,
            marker: shape.name().to_string(),
            markersize: style.size,
            markerpath,
            facecolor,
            edgecolor,
            edgewidth: style.edgewidth,
            alpha: style.alpha,
            zorder,
        };
        self.current_axes()?.markers.push(markers);
        Ok(())
    }

    fn draw_path(&mut self, item: &PathItem) -> ExportResult<()> {
        let spec = path::encode(
            &item.vertices,
            item.codes.as_deref(),
            item.pretransform.as_ref(),
        )?;
        let data_ref = self.add_data(&spec.vertices);
        let facecolor = self.hex(&item.style.facecolor);
        let edgecolor = self.hex(&item.style.edgecolor);
        let dasharray = item.style.dash.to_dasharray(&mut self.warnings);
        let (offset, offsetcoordinates) = match item.offset {
            None => (None, None),
            Some((offset, coords)) => (Some(offset), Some(coords)),
        };
        let entity = ScenePath {
            id: item.id().to_string(),
            data: data_ref,
            coordinates: item.coordinates,
            pathcodes: spec.code_letters(),
            facecolor,
            edgecolor,
            edgewidth: item.style.edgewidth,
            dasharray,
            alpha: item.style.alpha,
            zorder: item.zorder,
            offset,
            offsetcoordinates,
        };
        self.current_axes()?.paths.push(entity);
        Ok(())
    }

    fn draw_image(&mut self, image: &Image) -> ExportResult<()> {
        let entity = SceneImage {
            id: image.id().to_string(),
            data: image.data.clone(),
            extent: image.extent,
            coordinates: image.coordinates,
            alpha: image.alpha,
            zorder: image.zorder,
        };
        self.current_axes()?.images.push(entity);
        Ok(())
    }

    fn draw_path_collection(&mut self, collection: &Collection) -> ExportResult<()> {
        // an empty collection draws nothing
        if collection.paths.is_empty() {
            return Ok(());
        }

        let item_count = if collection.offsets.is_empty() {
            collection.paths.len()
        } else {
            collection.offsets.len()
        };

        let mut paths = Vec::with_capacity(collection.paths.len());
        for (vertices, codes) in &collection.paths {
            paths.push(path::encode(vertices, codes.as_deref(), None)?);
        }
        let pathtransforms: Vec<[f64; 6]> = collection
            .path_transforms
            .iter()
            .map(path::affine_to_rows)
            .collect();

        let facecolors: Vec<Value> = collection
            .style
            .facecolors
            .iter()
            .map(|c| Value::String(c.to_hex(&mut self.warnings)))
            .collect();
        let edgecolors: Vec<Value> = collection
            .style
            .edgecolors
            .iter()
            .map(|c| Value::String(c.to_hex(&mut self.warnings)))
            .collect();
        let edgewidths: Vec<Value> = collection.style.edgewidths.iter().map(|w| json!(w)).collect();
        let alphas: Vec<Value> = collection.style.alphas.iter().map(|a| json!(a)).collect();

        let mut properties = BTreeMap::new();
        properties.insert("facecolor".to_string(), prop_value(facecolors, item_count));
        properties.insert("edgecolor".to_string(), prop_value(edgecolors, item_count));
        properties.insert("edgewidth".to_string(), prop_value(edgewidths, item_count));
        properties.insert("alpha".to_string(), prop_value(alphas, item_count));

        let defaults: BTreeMap<String, Value> = [
            ("facecolor".to_string(), json!("#0000ff")),
            ("edgecolor".to_string(), json!("#000000")),
            ("edgewidth".to_string(), json!(1.0)),
            ("alpha".to_string(), json!(1.0)),
        ]
        .into();

        let folded = fold(&properties, &defaults).map_err(ExportError::Fold)?;
        let alpha = folded
            .defaults
            .get("alpha")
            .and_then(Value::as_f64)
            .unwrap_or(1.0);

        let offsets = self.add_data(&collection.offsets);
        let entity = SceneCollection {
            id: collection.id().to_string(),
            offsets,
            coordinates: collection.path_coordinates,
            offsetcoordinates: collection.offset_coordinates,
            offsetorder: collection.offset_order,
            paths,
            pathtransforms,
            records: folded.records,
            defaults: folded.defaults,
            alpha,
            zorder: collection.zorder,
        };
        self.current_axes()?.collections.push(entity);
        Ok(())
    }

    fn draw_text(&mut self, text: &Text) -> ExportResult<()> {
        let color = self.hex(&text.style.color);
        let entity = SceneText {
            id: text.id().to_string(),
            text: text.text.clone(),
            position: text.position,
            coordinates: text.coordinates,
            h_anchor: h_anchor(text.style.halign).to_string(),
            v_baseline: v_baseline(text.style.valign).to_string(),
            rotation: -text.style.rotation,
            fontsize: text.style.fontsize,
            color,
            alpha: text.style.alpha,
            zorder: text.zorder,
        };
        self.current_axes()?.texts.push(entity);
        Ok(())
    }
}

/// Classify a style array against the collection's item count.
///
/// A one-value array on a multi-item collection is a broadcast; a
/// one-value array on a one-item collection is genuine per-item data.
fn prop_value(values: Vec<Value>, item_count: usize) -> PropValue {
    match values.len() {
        0 => PropValue::Missing,
        1 if item_count != 1 => PropValue::Scalar(values.into_iter().next().unwrap_or(Value::Null)),
        _ => PropValue::Items(values),
    }
}

fn h_anchor(halign: crate::figure::HAlign) -> &'static str {
    match halign {
        crate::figure::HAlign::Left => "start",
        crate::figure::HAlign::Center => "middle",
        crate::figure::HAlign::Right => "end",
    }
}

fn v_baseline(valign: crate::figure::VAlign) -> &'static str {
    match valign {
        crate::figure::VAlign::Bottom | crate::figure::VAlign::Baseline => "auto",
        crate::figure::VAlign::Center => "central",
        crate::figure::VAlign::Top => "hanging",
    }
}

/// Export a figure into its scene-graph payload.
///
/// Convenience wrapper running the [`Exporter`](crate::export::Exporter)
/// over a fresh [`SceneRenderer`] and merging the warnings of both.
pub fn export_figure(figure: &Figure) -> ExportResult<ExportOutput> {
    let mut renderer = SceneRenderer::new();
    let mut exporter = crate::export::Exporter::new();
    exporter.export(figure, &mut renderer)?;

    let mut outputs = renderer.into_outputs();
    let mut output = outputs
        .pop()
        .ok_or_else(|| ExportError::InvalidFigure("export produced no figure".to_string()))?;
    output
        .warnings
        .extend(exporter.into_warnings().into_vec());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::{CollectionStyle, Line, LineStyle};

    fn simple_figure() -> Figure {
        let mut fig = Figure::new(6.0, 4.0);
        let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
        fig.axes_mut(ax).set_xlim([0.0, 2.0]).set_ylim([0.0, 1.0]);
        fig.add_line(
            ax,
            Line::new(vec![[0.0, 0.0], [1.0, 1.0], [2.0, 0.0]]),
        );
        fig
    }

    #[test]
    fn test_three_point_line_scenario() {
        let output = export_figure(&simple_figure()).unwrap();
        let scene = &output.figure;

        assert_eq!(scene.axes.len(), 1);
        let line = &scene.axes[0].lines[0];
        assert_eq!(line.dasharray, "10,0");
        assert_eq!(line.linewidth, 1.0);
        let points = scene.resolve(&line.data).unwrap();
        assert_eq!(points, vec![[0.0, 0.0], [1.0, 1.0], [2.0, 0.0]]);
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_payload_top_level_keys() {
        let output = export_figure(&simple_figure()).unwrap();
        let value = serde_json::to_value(&output.figure).unwrap();
        for key in ["width", "height", "axes", "data", "plugins", "id"] {
            assert!(value.get(key).is_some(), "missing top-level key {key}");
        }
        assert_eq!(value["width"], json!(600.0));
        assert_eq!(value["height"], json!(400.0));
    }

    #[test]
    fn test_export_is_deterministic_except_figure_id() {
        let fig = simple_figure();
        let mut a = serde_json::to_value(&export_figure(&fig).unwrap().figure).unwrap();
        let mut b = serde_json::to_value(&export_figure(&fig).unwrap().figure).unwrap();

        assert_ne!(a["id"], b["id"]);
        a["id"] = json!("");
        b["id"] = json!("");
        assert_eq!(a, b);
    }

    #[test]
    fn test_dataset_dedup_shares_columns() {
        let mut fig = Figure::new(6.0, 4.0);
        let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
        let x = [0.0, 1.0, 2.0];
        fig.add_line(ax, Line::new(x.iter().map(|&v| [v, v * v]).collect()));
        fig.add_line(ax, Line::new(x.iter().map(|&v| [v, 3.0 * v]).collect()));

        let output = export_figure(&fig).unwrap();
        let scene = &output.figure;

        // one shared table with three columns: x, y1, y2
        assert_eq!(scene.data.len(), 1);
        let table = scene.data.values().next().unwrap();
        assert_eq!(table[0].len(), 3);

        let l0 = &scene.axes[0].lines[0];
        let l1 = &scene.axes[0].lines[1];
        assert_eq!(l0.data.data, l1.data.data);
        assert_eq!(l0.data.xindex, l1.data.xindex);
        assert_ne!(l0.data.yindex, l1.data.yindex);
    }

    #[test]
    fn test_scalar_facecolor_collection_scenario() {
        let mut fig = Figure::new(6.0, 4.0);
        let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
        let square = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let offsets: Vec<[f64; 2]> = (0..5).map(|i| [i as f64, 0.0]).collect();
        let style = CollectionStyle::default().with_facecolors(vec![Color::Rgb(1.0, 0.0, 0.0)]);
        fig.add_collection(
            ax,
            Collection::new(vec![(square, None)], offsets).with_style(style),
        );

        let output = export_figure(&fig).unwrap();
        let collection = &output.figure.axes[0].collections[0];

        for record in &collection.records {
            assert!(!record.contains_key("facecolor"));
        }
        assert_eq!(collection.defaults["facecolor"], json!("#ff0000"));
    }

    #[test]
    fn test_collection_length_mismatch_aborts() {
        let mut fig = Figure::new(6.0, 4.0);
        let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
        let square = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]];
        let offsets: Vec<[f64; 2]> = (0..5).map(|i| [i as f64, 0.0]).collect();
        let style = CollectionStyle::default()
            .with_facecolors(vec![Color::Rgb(0.0, 0.0, 0.0); 3]);
        fig.add_collection(
            ax,
            Collection::new(vec![(square, None)], offsets).with_style(style),
        );

        let err = export_figure(&fig).unwrap_err();
        assert!(matches!(err, ExportError::Fold(_)));
    }

    #[test]
    fn test_unknown_dash_records_single_warning() {
        let mut fig = Figure::new(6.0, 4.0);
        let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
        let style = LineStyle::default().with_dash(crate::style::DashSpec::Named("wavy".into()));
        fig.add_line(ax, Line::new(vec![[0.0, 0.0], [1.0, 1.0]]).with_style(style));

        let output = export_figure(&fig).unwrap();
        let line = &output.figure.axes[0].lines[0];
        assert_eq!(line.dasharray, "10,0");
        assert_eq!(output.warnings.len(), 1);
    }

    #[test]
    fn test_text_alignment_mapping() {
        let mut fig = Figure::new(6.0, 4.0);
        let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
        fig.set_title(ax, Text::new("hello"));

        let output = export_figure(&fig).unwrap();
        let text = &output.figure.axes[0].texts[0];
        assert_eq!(text.h_anchor, "middle");
        assert_eq!(text.v_baseline, "auto");
        assert_eq!(text.text, "hello");
    }

    #[test]
    fn test_date_domain_in_epoch_millis() {
        use chrono::TimeZone;
        let mut fig = Figure::new(6.0, 4.0);
        let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
        let start = chrono::Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
        {
            let axes = fig.axes_mut(ax);
            axes.xscale = crate::scene::ScaleKind::Date;
            axes.xdate = Some([start, end]);
            axes.set_xlim([0.0, 1.0]);
        }

        let output = export_figure(&fig).unwrap();
        let axes = &output.figure.axes[0];
        assert_eq!(axes.xdomain[0], start.timestamp_millis() as f64);
        assert_eq!(axes.xdomain[1] - axes.xdomain[0], 86_400_000.0);
        // display limits carry no device pixels and stay as given
        assert_eq!(axes.xlim, [0.0, 1.0]);
    }
}
