//! Client-side plugin resolution
//!
//! Plugin descriptors arrive in the payload as `(type tag, property
//! bag, target ids)`. A [`PluginRegistry`] maps tags to factory
//! functions and is consulted exactly once, when a figure is mounted;
//! the resulting [`Behavior`] objects hook into the view's event
//! dispatch. Unknown tags are skipped with a warning, the same way
//! the reference client ignores unrecognized plugins; a plugin whose
//! target element does not exist is an error, because silently
//! dropping it would render a view that looks complete but is not.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use limn_scene::scene::{PluginSpec, SceneFigure};

use crate::axes_view::{AxesView, ElementView};
use crate::error::{ViewError, ViewResult};

/// Read-only view context handed to behaviors.
pub struct ViewCtx<'a> {
    pub axes: &'a [AxesView],
    pub figure: &'a SceneFigure,
}

impl<'a> ViewCtx<'a> {
    /// Find an element anywhere in the figure.
    pub fn element(&self, id: &str) -> Option<(usize, &'a ElementView)> {
        self.axes
            .iter()
            .enumerate()
            .find_map(|(i, ax)| ax.element(id).map(|e| (i, e)))
    }
}

/// Overlay output produced by behaviors in response to input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Overlay {
    /// Hover tooltip at a figure position
    Tooltip { text: String, position: [f64; 2] },
    /// Cursor position readout
    PositionReadout { text: String },
}

/// A brush selection over one shared dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Data table key the selection applies to
    pub data: String,
    /// Selected row indices
    pub indices: Vec<usize>,
}

/// A resolved, live plugin behavior attached to a mounted view.
pub trait Behavior: std::fmt::Debug {
    fn kind(&self) -> &str;

    /// Called once after the axes views are built. Behaviors resolve
    /// and validate their element targets here.
    fn on_mount(&mut self, _ctx: &ViewCtx<'_>) -> ViewResult<()> {
        Ok(())
    }

    /// Toolbar buttons contributed by this behavior.
    fn buttons(&self) -> Vec<String> {
        Vec::new()
    }

    /// Forced initial pan/zoom state, if this behavior has an opinion.
    fn initial_zoom(&self) -> Option<bool> {
        None
    }

    fn on_hover(&mut self, _ctx: &ViewCtx<'_>, _axes: usize, _px: [f64; 2]) -> Option<Overlay> {
        None
    }

    fn on_brush(
        &mut self,
        _ctx: &ViewCtx<'_>,
        _axes: usize,
        _rect: [[f64; 2]; 2],
    ) -> Option<Selection> {
        None
    }
}

/// Factory resolving one descriptor into a live behavior.
pub type BehaviorFactory = fn(&PluginSpec) -> ViewResult<Box<dyn Behavior>>;

/// Tag-to-factory registry, consulted once per mount.
pub struct PluginRegistry {
    factories: HashMap<String, BehaviorFactory>,
}

impl PluginRegistry {
    /// An empty registry with no tags at all.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with every built-in behavior registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("reset", |_| Ok(Box::new(ResetBehavior)));
        registry.register("zoom", |spec| Ok(Box::new(ZoomBehavior::from_spec(spec))));
        registry.register("boxzoom", |spec| {
            Ok(Box::new(BoxZoomBehavior::from_spec(spec)))
        });
        registry.register("tooltip", |spec| {
            Ok(Box::new(TooltipBehavior::from_spec(spec)?))
        });
        registry.register("mouseposition", |spec| {
            Ok(Box::new(MousePositionBehavior::from_spec(spec)))
        });
        registry.register("linkedbrush", |spec| {
            Ok(Box::new(LinkedBrushBehavior::from_spec(spec)?))
        });
        registry
    }

    pub fn register(&mut self, tag: impl Into<String>, factory: BehaviorFactory) {
        self.factories.insert(tag.into(), factory);
    }

    /// Resolve one descriptor. `None` means the tag is unknown and
    /// the plugin should be skipped with a warning.
    pub fn resolve(&self, spec: &PluginSpec) -> Option<ViewResult<Box<dyn Behavior>>> {
        self.factories.get(&spec.kind).map(|factory| factory(spec))
    }

    /// Implicit plugins injected when a payload declares none.
    pub fn default_specs() -> Vec<PluginSpec> {
        vec![
            PluginSpec::new("reset"),
            PluginSpec::new("zoom"),
            PluginSpec::new("boxzoom"),
        ]
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

// ----- property-bag helpers ---------------------------------------------

fn prop_bool(spec: &PluginSpec, key: &str) -> Option<bool> {
    spec.props.get(key).and_then(Value::as_bool)
}

fn prop_f64(spec: &PluginSpec, key: &str, default: f64) -> f64 {
    spec.props
        .get(key)
        .and_then(Value::as_f64)
        .unwrap_or(default)
}

fn prop_str<'a>(spec: &'a PluginSpec, key: &str, default: &'a str) -> &'a str {
    spec.props
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
}

fn single_target(spec: &PluginSpec) -> ViewResult<String> {
    spec.targets
        .first()
        .cloned()
        .ok_or_else(|| ViewError::Payload(format!("plugin '{}' has no target element", spec.kind)))
}

// ----- built-in behaviors -----------------------------------------------

/// Toolbar reset button.
#[derive(Debug)]
pub struct ResetBehavior;

impl Behavior for ResetBehavior {
    fn kind(&self) -> &str {
        "reset"
    }

    fn buttons(&self) -> Vec<String> {
        vec!["reset".to_string()]
    }
}

/// Scroll/drag pan-zoom toggle.
#[derive(Debug)]
pub struct ZoomBehavior {
    button: bool,
    enabled: bool,
}

impl ZoomBehavior {
    fn from_spec(spec: &PluginSpec) -> Self {
        let button = prop_bool(spec, "button").unwrap_or(true);
        let enabled = prop_bool(spec, "enabled").unwrap_or(!button);
        Self { button, enabled }
    }
}

impl Behavior for ZoomBehavior {
    fn kind(&self) -> &str {
        "zoom"
    }

    fn buttons(&self) -> Vec<String> {
        if self.button {
            vec!["zoom".to_string()]
        } else {
            Vec::new()
        }
    }

    fn initial_zoom(&self) -> Option<bool> {
        Some(self.enabled)
    }
}

/// Drag-a-rectangle zoom toggle.
#[derive(Debug)]
pub struct BoxZoomBehavior {
    button: bool,
    enabled: bool,
}

impl BoxZoomBehavior {
    fn from_spec(spec: &PluginSpec) -> Self {
        let button = prop_bool(spec, "button").unwrap_or(true);
        let enabled = prop_bool(spec, "enabled").unwrap_or(!button);
        Self { button, enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

impl Behavior for BoxZoomBehavior {
    fn kind(&self) -> &str {
        "boxzoom"
    }

    fn buttons(&self) -> Vec<String> {
        if self.button {
            vec!["boxzoom".to_string()]
        } else {
            Vec::new()
        }
    }
}

/// Where a tooltip anchors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TooltipLocation {
    Mouse,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl TooltipLocation {
    fn parse(s: &str) -> Self {
        match s {
            "top left" => TooltipLocation::TopLeft,
            "top right" => TooltipLocation::TopRight,
            "bottom left" => TooltipLocation::BottomLeft,
            "bottom right" => TooltipLocation::BottomRight,
            _ => TooltipLocation::Mouse,
        }
    }
}

/// Hover tooltip over the points of one element.
#[derive(Debug)]
pub struct TooltipBehavior {
    target: String,
    labels: Option<Vec<String>>,
    location: TooltipLocation,
    hoffset: f64,
    voffset: f64,
    /// Hit radius in pixels
    radius: f64,
}

impl TooltipBehavior {
    fn from_spec(spec: &PluginSpec) -> ViewResult<Self> {
        let labels = match spec.props.get("labels") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            Some(other) => {
                return Err(ViewError::Payload(format!(
                    "tooltip labels must be an array, got {other}"
                )))
            }
        };
        Ok(Self {
            target: single_target(spec)?,
            labels,
            location: TooltipLocation::parse(prop_str(spec, "location", "mouse")),
            hoffset: prop_f64(spec, "hoffset", 0.0),
            voffset: prop_f64(spec, "voffset", 10.0),
            radius: 10.0,
        })
    }
}

impl Behavior for TooltipBehavior {
    fn kind(&self) -> &str {
        "tooltip"
    }

    fn on_mount(&mut self, ctx: &ViewCtx<'_>) -> ViewResult<()> {
        if ctx.element(&self.target).is_none() {
            return Err(ViewError::MissingElement {
                kind: "tooltip".to_string(),
                id: self.target.clone(),
            });
        }
        Ok(())
    }

    fn on_hover(&mut self, ctx: &ViewCtx<'_>, axes: usize, px: [f64; 2]) -> Option<Overlay> {
        let (owner, element) = ctx.element(&self.target)?;
        if owner != axes {
            return None;
        }
        let view = &ctx.axes[axes];
        let (index, point) = view.nearest_point(&self.target, px, self.radius)?;

        let text = match &self.labels {
            Some(labels) => labels.get(index % labels.len().max(1))?.clone(),
            None => {
                let d = element.data().get(index)?;
                format!("({}, {})", d[0], d[1])
            }
        };
        let position = match self.location {
            TooltipLocation::Mouse => [point[0] + self.hoffset, point[1] - self.voffset],
            TooltipLocation::TopLeft => [self.hoffset, self.voffset],
            TooltipLocation::TopRight => [view.width() - self.hoffset, self.voffset],
            TooltipLocation::BottomLeft => [self.hoffset, view.height() - self.voffset],
            TooltipLocation::BottomRight => {
                [view.width() - self.hoffset, view.height() - self.voffset]
            }
        };
        Some(Overlay::Tooltip { text, position })
    }
}

/// Live readout of the cursor position in data coordinates.
#[derive(Debug)]
pub struct MousePositionBehavior {
    digits: usize,
}

impl MousePositionBehavior {
    fn from_spec(spec: &PluginSpec) -> Self {
        // fmt strings look like ".3g"; the digit count is all we use
        let fmt = prop_str(spec, "fmt", ".3g");
        let digits = fmt
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse()
            .unwrap_or(3);
        Self { digits }
    }
}

impl Behavior for MousePositionBehavior {
    fn kind(&self) -> &str {
        "mouseposition"
    }

    fn on_hover(&mut self, ctx: &ViewCtx<'_>, axes: usize, px: [f64; 2]) -> Option<Overlay> {
        let view = ctx.axes.get(axes)?;
        let data = view.unproject(px);
        Some(Overlay::PositionReadout {
            text: format!(
                "({:.prec$}, {:.prec$})",
                data[0],
                data[1],
                prec = self.digits
            ),
        })
    }
}

/// Brush selection shared across every element drawing from the
/// brushed element's dataset.
#[derive(Debug)]
pub struct LinkedBrushBehavior {
    target: String,
    /// Data table key resolved at mount
    data_key: Option<String>,
}

impl LinkedBrushBehavior {
    fn from_spec(spec: &PluginSpec) -> ViewResult<Self> {
        Ok(Self {
            target: single_target(spec)?,
            data_key: None,
        })
    }
}

impl Behavior for LinkedBrushBehavior {
    fn kind(&self) -> &str {
        "linkedbrush"
    }

    fn on_mount(&mut self, ctx: &ViewCtx<'_>) -> ViewResult<()> {
        let (_, element) = ctx.element(&self.target).ok_or(ViewError::MissingElement {
            kind: "linkedbrush".to_string(),
            id: self.target.clone(),
        })?;
        self.data_key = element.kind().dataset().map(|r| r.data.clone());
        if self.data_key.is_none() {
            return Err(ViewError::Payload(format!(
                "linkedbrush target '{}' has no dataset",
                self.target
            )));
        }
        Ok(())
    }

    fn on_brush(
        &mut self,
        ctx: &ViewCtx<'_>,
        axes: usize,
        rect: [[f64; 2]; 2],
    ) -> Option<Selection> {
        let data_key = self.data_key.as_ref()?;
        let (owner, element) = ctx.element(&self.target)?;
        if owner != axes {
            return None;
        }
        let view = &ctx.axes[axes];
        let a = view.unproject(rect[0]);
        let b = view.unproject(rect[1]);
        let (x0, x1) = (a[0].min(b[0]), a[0].max(b[0]));
        let (y0, y1) = (a[1].min(b[1]), a[1].max(b[1]));

        let indices = element
            .data()
            .iter()
            .enumerate()
            .filter(|(_, p)| p[0] >= x0 && p[0] <= x1 && p[1] >= y0 && p[1] <= y1)
            .map(|(i, _)| i)
            .collect();
        Some(Selection {
            data: data_key.clone(),
            indices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_resolves_builtins() {
        let registry = PluginRegistry::with_builtins();
        for tag in ["reset", "zoom", "boxzoom", "mouseposition"] {
            let spec = PluginSpec::new(tag);
            assert!(registry.resolve(&spec).is_some(), "missing builtin {tag}");
        }
    }

    #[test]
    fn test_unknown_tag_resolves_to_none() {
        let registry = PluginRegistry::with_builtins();
        assert!(registry.resolve(&PluginSpec::new("sparkle")).is_none());
    }

    #[test]
    fn test_custom_factory_registration() {
        #[derive(Debug)]
        struct Noop;
        impl Behavior for Noop {
            fn kind(&self) -> &str {
                "noop"
            }
        }

        let mut registry = PluginRegistry::with_builtins();
        registry.register("noop", |_| Ok(Box::new(Noop)));
        assert!(registry.resolve(&PluginSpec::new("noop")).is_some());
    }

    #[test]
    fn test_zoom_enabled_defaults_to_opposite_of_button() {
        let with_button = ZoomBehavior::from_spec(&PluginSpec::new("zoom").prop("button", json!(true)));
        assert!(!with_button.enabled);

        let without_button =
            ZoomBehavior::from_spec(&PluginSpec::new("zoom").prop("button", json!(false)));
        assert!(without_button.enabled);

        let forced = ZoomBehavior::from_spec(
            &PluginSpec::new("zoom")
                .prop("button", json!(true))
                .prop("enabled", json!(true)),
        );
        assert!(forced.enabled);
    }

    #[test]
    fn test_tooltip_requires_a_target() {
        let err = TooltipBehavior::from_spec(&PluginSpec::new("tooltip")).unwrap_err();
        assert!(err.to_string().contains("no target"));
    }

    #[test]
    fn test_tooltip_location_parse() {
        assert_eq!(TooltipLocation::parse("mouse"), TooltipLocation::Mouse);
        assert_eq!(TooltipLocation::parse("top left"), TooltipLocation::TopLeft);
        assert_eq!(
            TooltipLocation::parse("anything else"),
            TooltipLocation::Mouse
        );
    }

    #[test]
    fn test_mouseposition_digit_parsing() {
        let b = MousePositionBehavior::from_spec(
            &PluginSpec::new("mouseposition").prop("fmt", json!(".5g")),
        );
        assert_eq!(b.digits, 5);

        let default = MousePositionBehavior::from_spec(&PluginSpec::new("mouseposition"));
        assert_eq!(default.digits, 3);
    }
}
