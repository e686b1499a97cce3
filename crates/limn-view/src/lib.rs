//! limn-view - interactive client engine for limn scene graphs
//!
//! Reconstructs an exported scene graph as a live, mutable view and
//! keeps it consistent under interactive pan, zoom, linked-axes
//! propagation, and animated resets, without any knowledge of the
//! plotting library that produced the payload.
//!
//! # Key Components
//!
//! - **Engine**: mount registry and entry point (idempotent per target)
//! - **View**: one mounted figure with its event dispatch
//! - **AxesView**: per-axes scales, zoom transform, and projection
//! - **PluginRegistry**: tag-to-factory resolution of behaviors
//!
//! # Example
//!
//! ```
//! use limn_scene::figure::{Figure, Line};
//! use limn_scene::render::export_figure;
//! use limn_view::Engine;
//!
//! let mut fig = Figure::new(6.0, 4.0);
//! let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
//! fig.axes_mut(ax).set_xlim([0.0, 2.0]).set_ylim([0.0, 1.0]);
//! fig.add_line(ax, Line::new(vec![[0.0, 0.0], [1.0, 1.0], [2.0, 0.0]]));
//! let output = export_figure(&fig).unwrap();
//!
//! let mut engine = Engine::new();
//! let view = engine
//!     .mount("chart", output.figure, &output.css, &output.behavior)
//!     .unwrap();
//! view.pan(0, 10.0, 0.0);
//! ```

pub mod axes_view;
pub mod engine;
pub mod error;
pub mod plugins;
pub mod scale;
pub mod transform;

pub use axes_view::{AxesView, DisplayGeometry, ElementKind, ElementView, InteractionState};
pub use engine::{Engine, InputEvent, SceneRef, View};
pub use error::{ViewError, ViewResult};
pub use plugins::{Behavior, Overlay, PluginRegistry, Selection, ViewCtx};
pub use scale::{LinearMap, Scale};
pub use transform::Affine1;
