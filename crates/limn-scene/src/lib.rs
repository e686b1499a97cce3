//! limn-scene - figure export to a portable scene graph
//!
//! This crate converts an in-memory figure description into a
//! renderer-agnostic JSON scene graph that an interactive client can
//! reconstruct without the original plotting library.
//!
//! # Key Components
//!
//! - **figure**: the walkable host-side figure description
//! - **style**: canonicalization of colors, dashes, and markers
//! - **path**: opcode + vertex encoding of vector shapes
//! - **fold**: per-item/default compression for batched collections
//! - **export**: fixed-order tree traversal over a `Renderer` trait
//! - **render**: the JSON scene-graph renderer
//! - **plugin**: declarative behavior attachments
//! - **scene**: the wire-format types shared with the client
//!
//! # Example
//!
//! ```
//! use limn_scene::figure::{Figure, Line};
//! use limn_scene::render::export_figure;
//!
//! let mut fig = Figure::new(6.0, 4.0);
//! let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
//! fig.axes_mut(ax).set_xlim([0.0, 2.0]).set_ylim([0.0, 1.0]);
//! fig.add_line(ax, Line::new(vec![[0.0, 0.0], [1.0, 1.0], [2.0, 0.0]]));
//!
//! let output = export_figure(&fig).unwrap();
//! assert_eq!(output.figure.axes.len(), 1);
//! ```

pub mod error;
pub mod export;
pub mod figure;
pub mod fold;
pub mod path;
pub mod plugin;
pub mod render;
pub mod scene;
pub mod style;

pub use error::{ExportError, FoldError, PathError, Warning, WarningKind, Warnings};
pub use export::{Exporter, Renderer};
pub use figure::{Axes, AxesId, Figure};
pub use render::{export_figure, ExportOutput, SceneRenderer};
pub use scene::{Coordinates, PluginSpec, ScaleKind, SceneFigure};
