//! Exporter: fixed-order traversal of a figure description
//!
//! The exporter walks the figure tree in a fixed, documented order so
//! that repeated exports are reproducible, invoking one callback of
//! the [`Renderer`] trait per node. The trait is the sole coupling
//! point to any output format: a new target renderer plugs in with
//! zero exporter changes.
//!
//! Per axes the order is: images, collections, paths, lines, markers,
//! texts (element texts, then x-label, y-label, title), grids (carried
//! on the axes properties), legend. Unsupported host feature
//! categories degrade to a collected warning, never an aborted export.

use crate::error::{ExportResult, Warnings};
use crate::figure::{Axes, Collection, Figure, Image, LineStyle, MarkerStyle, PathItem, Text};
use crate::scene::Coordinates;

/// Output-format callbacks invoked by the exporter.
pub trait Renderer {
    fn open_figure(&mut self, figure: &Figure) -> ExportResult<()>;
    fn close_figure(&mut self, figure: &Figure) -> ExportResult<()>;
    fn open_axes(&mut self, axes: &Axes) -> ExportResult<()>;
    fn close_axes(&mut self, axes: &Axes) -> ExportResult<()>;

    /// Draw a connected line through `data`.
    ///
    /// If a renderer has no native line primitive it can delegate to
    /// [`Renderer::draw_path`]; the default implementation does so.
    fn draw_line(
        &mut self,
        id: &str,
        data: &[[f64; 2]],
        coordinates: Coordinates,
        style: &LineStyle,
        zorder: f64,
        label: Option<&str>,
    ) -> ExportResult<()> {
        let _ = label;
        let mut path = PathItem::new(data.to_vec()).with_coordinates(coordinates);
        path.style.facecolor = crate::style::Color::None;
        path.style.edgecolor = style.color.clone();
        path.style.edgewidth = style.linewidth;
        path.style.dash = style.dash.clone();
        path.style.alpha = style.alpha;
        path.zorder = zorder;
        path.id = id.to_string();
        self.draw_path(&path)
    }

    fn draw_markers(
        &mut self,
        id: &str,
        data: &[[f64; 2]],
        coordinates: Coordinates,
        style: &MarkerStyle,
        zorder: f64,
        label: Option<&str>,
    ) -> ExportResult<()>;

    fn draw_path(&mut self, path: &PathItem) -> ExportResult<()>;

    fn draw_image(&mut self, image: &Image) -> ExportResult<()>;

    fn draw_path_collection(&mut self, collection: &Collection) -> ExportResult<()>;

    fn draw_text(&mut self, text: &Text) -> ExportResult<()>;
}

/// Walks a [`Figure`] and feeds a [`Renderer`].
#[derive(Debug, Default)]
pub struct Exporter {
    warnings: Warnings,
}

impl Exporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export the figure through the given renderer.
    pub fn export<R: Renderer>(&mut self, figure: &Figure, renderer: &mut R) -> ExportResult<()> {
        renderer.open_figure(figure)?;
        for axes in figure.axes() {
            renderer.open_axes(axes)?;
            self.crawl_axes(axes, renderer)?;
            renderer.close_axes(axes)?;
        }
        renderer.close_figure(figure)?;
        Ok(())
    }

    /// Warnings collected while walking (skipped features).
    pub fn warnings(&self) -> &Warnings {
        &self.warnings
    }

    pub fn into_warnings(self) -> Warnings {
        self.warnings
    }

    fn crawl_axes<R: Renderer>(&mut self, axes: &Axes, renderer: &mut R) -> ExportResult<()> {
        for image in axes.images() {
            renderer.draw_image(image)?;
        }

        for collection in axes.collections() {
            renderer.draw_path_collection(collection)?;
        }

        for path in axes.paths() {
            renderer.draw_path(path)?;
        }

        for line in axes.lines() {
            self.draw_line_element(line, renderer)?;
        }

        for markers in axes.markers() {
            renderer.draw_markers(
                markers.id(),
                &markers.data,
                markers.coordinates,
                &markers.style,
                markers.zorder,
                markers.label.as_deref(),
            )?;
        }

        for text in axes.texts() {
            renderer.draw_text(text)?;
        }
        for label in [&axes.xlabel, &axes.ylabel, &axes.title].into_iter().flatten() {
            renderer.draw_text(label)?;
        }

        // Grid descriptions travel on the axes properties emitted at
        // open_axes; there is no separate draw callback for them.

        if axes.legend.is_some() {
            self.warnings
                .unsupported(format!("legend on axes {} not exported", axes.id()));
        }
        for feature in &axes.unsupported {
            self.warnings
                .unsupported(format!("{feature} on axes {} not exported", axes.id()));
        }

        Ok(())
    }

    /// A host line draws its stroke and, when a marker symbol is set,
    /// a separate markers pass over the same data. A line whose dash
    /// style is "none" draws only the markers.
    fn draw_line_element<R: Renderer>(
        &mut self,
        line: &crate::figure::Line,
        renderer: &mut R,
    ) -> ExportResult<()> {
        if !line.style.dash.is_none() {
            renderer.draw_line(
                line.id(),
                &line.data,
                line.coordinates,
                &line.style,
                line.zorder,
                line.label.as_deref(),
            )?;
        }
        if let Some(marker) = &line.style.marker {
            let markers_id = format!("{}pts", line.id());
            renderer.draw_markers(
                &markers_id,
                &line.data,
                line.coordinates,
                marker,
                line.zorder,
                line.label.as_deref(),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::Line;
    use crate::style::DashSpec;

    /// Records the callback sequence, nothing else.
    #[derive(Default)]
    struct TraceRenderer {
        calls: Vec<String>,
    }

    impl Renderer for TraceRenderer {
        fn open_figure(&mut self, _: &Figure) -> ExportResult<()> {
            self.calls.push("open_figure".into());
            Ok(())
        }
        fn close_figure(&mut self, _: &Figure) -> ExportResult<()> {
            self.calls.push("close_figure".into());
            Ok(())
        }
        fn open_axes(&mut self, _: &Axes) -> ExportResult<()> {
            self.calls.push("open_axes".into());
            Ok(())
        }
        fn close_axes(&mut self, _: &Axes) -> ExportResult<()> {
            self.calls.push("close_axes".into());
            Ok(())
        }
        fn draw_line(
            &mut self,
            id: &str,
            _: &[[f64; 2]],
            _: Coordinates,
            _: &LineStyle,
            _: f64,
            _: Option<&str>,
        ) -> ExportResult<()> {
            self.calls.push(format!("line:{id}"));
            Ok(())
        }
        fn draw_markers(
            &mut self,
            id: &str,
            _: &[[f64; 2]],
            _: Coordinates,
            _: &MarkerStyle,
            _: f64,
            _: Option<&str>,
        ) -> ExportResult<()> {
            self.calls.push(format!("markers:{id}"));
            Ok(())
        }
        fn draw_path(&mut self, path: &PathItem) -> ExportResult<()> {
            self.calls.push(format!("path:{}", path.id()));
            Ok(())
        }
        fn draw_image(&mut self, image: &Image) -> ExportResult<()> {
            self.calls.push(format!("image:{}", image.id()));
            Ok(())
        }
        fn draw_path_collection(&mut self, collection: &Collection) -> ExportResult<()> {
            self.calls.push(format!("collection:{}", collection.id()));
            Ok(())
        }
        fn draw_text(&mut self, text: &Text) -> ExportResult<()> {
            self.calls.push(format!("text:{}", text.text));
            Ok(())
        }
    }

    #[test]
    fn test_traversal_order_is_fixed() {
        let mut fig = Figure::new(6.0, 4.0);
        let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);

        // insert in an order unrelated to the traversal order
        fig.add_line(ax, Line::new(vec![[0.0, 0.0], [1.0, 1.0]]));
        fig.add_text(ax, Text::new("note").at([0.5, 0.5]));
        fig.add_path(ax, PathItem::new(vec![[0.0, 0.0], [1.0, 0.0]]));
        fig.add_image(ax, Image::new("abc", [0.0, 1.0, 0.0, 1.0]));
        fig.set_title(ax, Text::new("title"));
        fig.set_xlabel(ax, Text::new("x"));

        let mut renderer = TraceRenderer::default();
        Exporter::new().export(&fig, &mut renderer).unwrap();

        let kinds: Vec<&str> = renderer
            .calls
            .iter()
            .map(|c| c.split(':').next().unwrap())
            .collect();
        assert_eq!(
            kinds,
            vec![
                "open_figure",
                "open_axes",
                "image",
                "path",
                "line",
                "text", // element text
                "text", // xlabel
                "text", // title
                "close_axes",
                "close_figure",
            ]
        );
        // labels come after element texts, in x, y, title order
        assert_eq!(renderer.calls[5], "text:note");
        assert_eq!(renderer.calls[6], "text:x");
        assert_eq!(renderer.calls[7], "text:title");
    }

    #[test]
    fn test_line_with_marker_emits_two_passes() {
        let mut fig = Figure::new(6.0, 4.0);
        let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
        let style = LineStyle::default().with_marker(MarkerStyle::default());
        let id = fig.add_line(ax, Line::new(vec![[0.0, 0.0], [1.0, 1.0]]).with_style(style));

        let mut renderer = TraceRenderer::default();
        Exporter::new().export(&fig, &mut renderer).unwrap();

        assert!(renderer.calls.contains(&format!("line:{id}")));
        assert!(renderer.calls.contains(&format!("markers:{id}pts")));
    }

    #[test]
    fn test_marker_only_line_skips_stroke() {
        let mut fig = Figure::new(6.0, 4.0);
        let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
        let style = LineStyle::default()
            .with_dash(DashSpec::Named("none".into()))
            .with_marker(MarkerStyle::default());
        fig.add_line(ax, Line::new(vec![[0.0, 0.0], [1.0, 1.0]]).with_style(style));

        let mut renderer = TraceRenderer::default();
        Exporter::new().export(&fig, &mut renderer).unwrap();

        assert!(!renderer.calls.iter().any(|c| c.starts_with("line:")));
        assert!(renderer.calls.iter().any(|c| c.starts_with("markers:")));
    }

    #[test]
    fn test_legend_degrades_to_warning() {
        let mut fig = Figure::new(6.0, 4.0);
        let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
        fig.axes_mut(ax).legend = Some(crate::figure::Legend::default());

        let mut renderer = TraceRenderer::default();
        let mut exporter = Exporter::new();
        exporter.export(&fig, &mut renderer).unwrap();

        assert_eq!(exporter.warnings().len(), 1);
        assert!(renderer.calls.contains(&"close_figure".to_string()));
    }
}
