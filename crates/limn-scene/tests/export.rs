//! End-to-end export tests: figure description in, scene graph out.

use limn_scene::figure::{
    Collection, CollectionStyle, Figure, Line, LineStyle, Markers, MarkerStyle, PathItem,
    PathStyle, Text,
};
use limn_scene::path::HostCode;
use limn_scene::plugin::{builtin, clear, connect};
use limn_scene::render::export_figure;
use limn_scene::scene::{ScaleKind, SceneFigure};
use limn_scene::style::{Color, DashSpec};
use limn_scene::WarningKind;
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn two_panel_figure() -> Figure {
    let mut fig = Figure::new(8.0, 4.0);
    let a = fig.add_axes([0.05, 0.1, 0.4, 0.8]);
    let b = fig.add_axes([0.55, 0.1, 0.4, 0.8]);
    for ax in [a, b] {
        fig.axes_mut(ax).set_xlim([0.0, 10.0]).set_ylim([-1.0, 1.0]);
    }
    fig.share_x(a, b);

    fig.add_line(
        a,
        Line::new((0..=10).map(|i| [i as f64, (i as f64 / 3.0).sin()]).collect()),
    );
    fig.add_markers(
        b,
        Markers::new(vec![[1.0, 0.5], [5.0, -0.5], [9.0, 0.0]])
            .with_style(MarkerStyle::default().with_symbol("s")),
    );
    fig.set_xlabel(a, Text::new("time"));
    fig.set_title(b, Text::new("response"));
    fig
}

#[test]
fn payload_round_trips_through_json() {
    let output = export_figure(&two_panel_figure()).unwrap();
    let text = serde_json::to_string(&output.figure).unwrap();
    let back: SceneFigure = serde_json::from_str(&text).unwrap();
    assert_eq!(back, output.figure);
}

#[test]
fn axes_entities_carry_the_documented_keys() {
    let output = export_figure(&two_panel_figure()).unwrap();
    let value = serde_json::to_value(&output.figure).unwrap();

    let axes = &value["axes"][0];
    for key in [
        "bbox", "xlim", "ylim", "xdomain", "ydomain", "xscale", "yscale", "zoomable", "sharex",
        "sharey", "lines", "markers", "paths", "texts", "images", "collections", "axesbg",
        "axesbgalpha", "id",
    ] {
        assert!(axes.get(key).is_some(), "axes missing key {key}");
    }

    // every element carries at minimum id, zorder, coordinates, alpha
    for entity in [&axes["lines"][0], &value["axes"][1]["markers"][0]] {
        for key in ["id", "zorder", "coordinates", "alpha"] {
            assert!(entity.get(key).is_some(), "element missing key {key}");
        }
    }
}

#[test]
fn shared_axes_reference_each_other_by_id() {
    let output = export_figure(&two_panel_figure()).unwrap();
    let [a, b] = &output.figure.axes[..] else {
        panic!("expected two axes");
    };
    assert_eq!(a.sharex, vec![b.id.clone()]);
    assert_eq!(b.sharex, vec![a.id.clone()]);
    assert!(a.sharey.is_empty());
}

#[test]
fn repeated_export_is_identical_except_figure_id() {
    let fig = two_panel_figure();
    let first = export_figure(&fig).unwrap().figure;
    let second = export_figure(&fig).unwrap().figure;

    assert_ne!(first.id, second.id);
    let mut a = serde_json::to_value(&first).unwrap();
    let mut b = serde_json::to_value(&second).unwrap();
    a["id"] = json!(null);
    b["id"] = json!(null);
    assert_eq!(a, b);
}

#[test]
fn stop_code_truncates_exported_path() {
    let mut fig = Figure::new(4.0, 4.0);
    let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
    let vertices = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [9.0, 9.0]];
    let codes = vec![
        HostCode::MoveTo,
        HostCode::LineTo,
        HostCode::LineTo,
        HostCode::Stop,
    ];
    fig.add_path(ax, PathItem::new(vertices).with_codes(codes));

    let output = export_figure(&fig).unwrap();
    let path = &output.figure.axes[0].paths[0];
    assert_eq!(path.pathcodes, vec!["M", "L", "L"]);

    // the garbage vertex after the stop never reaches the data table
    let points = output.figure.resolve(&path.data).unwrap();
    assert_eq!(points.len(), 3);
    assert!(!points.contains(&[9.0, 9.0]));
}

#[test]
fn closed_polygon_terminates_in_closepoly() {
    let mut fig = Figure::new(4.0, 4.0);
    let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
    let vertices = vec![[0.0, 0.0], [1.0, 0.0], [0.5, 1.0], [0.0, 0.0]];
    let codes = vec![
        HostCode::MoveTo,
        HostCode::LineTo,
        HostCode::LineTo,
        HostCode::ClosePoly,
    ];
    fig.add_path(
        ax,
        PathItem::new(vertices)
            .with_codes(codes)
            .with_style(PathStyle::default().with_facecolor(Color::Named("green".into()))),
    );

    let output = export_figure(&fig).unwrap();
    let path = &output.figure.axes[0].paths[0];
    assert_eq!(path.pathcodes.last().map(String::as_str), Some("Z"));
    assert_eq!(path.facecolor, "#008000");
}

#[test]
fn per_item_facecolors_produce_full_records() {
    let mut fig = Figure::new(4.0, 4.0);
    let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
    let triangle = vec![[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]];
    let offsets: Vec<[f64; 2]> = (0..4).map(|i| [i as f64, i as f64]).collect();
    let facecolors: Vec<Color> = (0..4)
        .map(|i| Color::Rgb(i as f64 / 4.0, 0.0, 0.0))
        .collect();
    fig.add_collection(
        ax,
        Collection::new(vec![(triangle, None)], offsets)
            .with_style(CollectionStyle::default().with_facecolors(facecolors)),
    );

    let output = export_figure(&fig).unwrap();
    let collection = &output.figure.axes[0].collections[0];
    assert_eq!(collection.records.len(), 4);
    for record in &collection.records {
        assert!(record.contains_key("facecolor"));
        assert!(!record.contains_key("edgecolor"));
    }
    assert_eq!(collection.defaults["edgecolor"], json!("#000000"));
}

#[test]
fn unknown_marker_symbol_warns_and_falls_back() {
    init_tracing();
    let mut fig = Figure::new(4.0, 4.0);
    let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
    fig.add_markers(
        ax,
        Markers::new(vec![[0.0, 0.0]]).with_style(MarkerStyle::default().with_symbol("pentagram")),
    );

    let output = export_figure(&fig).unwrap();
    assert_eq!(output.figure.axes[0].markers[0].marker, "circle");
    let fallbacks: Vec<_> = output
        .warnings
        .iter()
        .filter(|w| w.kind == WarningKind::StyleFallback)
        .collect();
    assert_eq!(fallbacks.len(), 1);
}

#[test]
fn cleared_plugins_override_defaults() {
    let mut fig = Figure::new(4.0, 4.0);
    let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
    let line = fig.add_line(ax, Line::new(vec![[0.0, 0.0], [1.0, 1.0]]));

    connect(&mut fig, [builtin::reset(), builtin::zoom(true, None)]);
    clear(&mut fig);
    connect(
        &mut fig,
        [builtin::tooltip(&line, Some(vec!["p0".into(), "p1".into()]), "mouse", 0.0, 10.0)],
    );

    let output = export_figure(&fig).unwrap();
    assert_eq!(output.figure.plugins.len(), 1);
    assert_eq!(output.figure.plugins[0].kind, "tooltip");
}

#[test]
fn log_scale_and_drawstyle_survive_export() {
    let mut fig = Figure::new(4.0, 4.0);
    let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
    {
        let axes = fig.axes_mut(ax);
        axes.xscale = ScaleKind::Log;
        axes.set_xlim([1.0, 1000.0]).set_ylim([0.0, 1.0]);
    }
    let mut style = LineStyle::default().with_dash(DashSpec::Named("dashed".into()));
    style.drawstyle = Some("steps-pre".to_string());
    fig.add_line(
        ax,
        Line::new(vec![[1.0, 0.1], [10.0, 0.5], [100.0, 0.9]]).with_style(style),
    );

    let output = export_figure(&fig).unwrap();
    let axes = &output.figure.axes[0];
    assert_eq!(axes.xscale, ScaleKind::Log);
    assert_eq!(axes.xdomain, [1.0, 1000.0]);
    assert_eq!(axes.lines[0].dasharray, "6,6");
    assert_eq!(axes.lines[0].drawstyle.as_deref(), Some("steps-pre"));
}

#[test]
fn grid_style_travels_on_the_axis_descriptor() {
    let mut fig = Figure::new(4.0, 4.0);
    let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
    fig.axes_mut(ax).xaxis.grid = Some(limn_scene::figure::GridStyle::default());

    let output = export_figure(&fig).unwrap();
    let descriptors = &output.figure.axes[0].axes;
    assert_eq!(descriptors.len(), 2);
    let bottom = &descriptors[0];
    assert_eq!(bottom.position, "bottom");
    assert!(bottom.grid.grid_on);
    assert_eq!(bottom.grid.dasharray.as_deref(), Some("6,6"));
    let left = &descriptors[1];
    assert_eq!(left.position, "left");
    assert!(!left.grid.grid_on);
}
