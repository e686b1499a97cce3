//! Mounting and event dispatch
//!
//! [`Engine`] is the client entry point: given a mount target, a
//! parsed scene graph, and the companion CSS/behavior text, it
//! produces an interactive [`View`]. Mounting is idempotent per
//! target; mounting twice replaces the prior view instead of
//! duplicating it.
//!
//! All interaction is single-threaded and event-driven: input events
//! and animation ticks are the only entry points, and propagation to
//! linked axes completes synchronously inside the triggering call, so
//! every linked view is consistent before the next paint.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use limn_scene::scene::SceneFigure;

use crate::axes_view::{AxesView, ElementView, InteractionState, RESET_DURATION_MS};
use crate::error::{ViewError, ViewResult};
use crate::plugins::{Behavior, Overlay, PluginRegistry, Selection, ViewCtx};

/// Input events routed to a mounted view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    DragStart { axes: usize },
    Drag { axes: usize, dx: f64, dy: f64 },
    DragEnd { axes: usize },
    Wheel { axes: usize, factor: f64, center: [f64; 2] },
    BoxZoom { axes: usize, rect: [[f64; 2]; 2] },
    Hover { axes: usize, position: [f64; 2] },
    Reset,
}

/// Reference to a scene object found by id.
#[derive(Debug)]
pub enum SceneRef<'a> {
    Figure,
    Axes(&'a AxesView),
    Element(&'a ElementView),
}

/// The client engine: a registry of mounted views plus the plugin
/// factory registry consulted at mount time.
pub struct Engine {
    registry: PluginRegistry,
    views: BTreeMap<String, View>,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            registry: PluginRegistry::with_builtins(),
            views: BTreeMap::new(),
        }
    }

    /// Register custom plugin factories before mounting.
    pub fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    /// Mount a figure at a target, replacing any prior view there.
    pub fn mount(
        &mut self,
        target: impl Into<String>,
        figure: SceneFigure,
        css: &str,
        behavior: &str,
    ) -> ViewResult<&mut View> {
        let target = target.into();
        let view = View::build(figure, &self.registry, css, behavior)?;
        match self.views.entry(target) {
            Entry::Occupied(mut slot) => {
                slot.insert(view);
                Ok(slot.into_mut())
            }
            Entry::Vacant(slot) => Ok(slot.insert(view)),
        }
    }

    /// Mount from raw payload text.
    pub fn mount_json(
        &mut self,
        target: impl Into<String>,
        payload: &str,
        css: &str,
        behavior: &str,
    ) -> ViewResult<&mut View> {
        let figure: SceneFigure = serde_json::from_str(payload)?;
        self.mount(target, figure, css, behavior)
    }

    pub fn view(&self, target: &str) -> Option<&View> {
        self.views.get(target)
    }

    pub fn view_mut(&mut self, target: &str) -> Option<&mut View> {
        self.views.get_mut(target)
    }

    pub fn unmount(&mut self, target: &str) -> bool {
        self.views.remove(target).is_some()
    }

    pub fn mounted_targets(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }

    /// Advance every in-flight animation. Returns `true` if any view
    /// changed and needs a repaint.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        let mut changed = false;
        for view in self.views.values_mut() {
            changed |= view.tick(now_ms);
        }
        changed
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// One mounted, interactive figure.
#[derive(Debug)]
pub struct View {
    figure: SceneFigure,
    width: f64,
    height: f64,
    axes: Vec<AxesView>,
    behaviors: Vec<Box<dyn Behavior>>,
    buttons: Vec<String>,
    zoom_enabled: bool,
    css: String,
    behavior_src: String,
}

impl View {
    fn build(
        figure: SceneFigure,
        registry: &PluginRegistry,
        css: &str,
        behavior: &str,
    ) -> ViewResult<Self> {
        let width = figure.width;
        let height = figure.height;

        let mut axes = Vec::with_capacity(figure.axes.len());
        for scene_axes in &figure.axes {
            axes.push(AxesView::build(scene_axes, &figure, width, height)?);
        }

        // resolve share partners to indices; a dangling id is a
        // payload error, not a silently unlinked axes
        let ids: Vec<String> = axes.iter().map(|ax| ax.id().to_string()).collect();
        let index_of = |id: &str| ids.iter().position(|known| known == id);
        for i in 0..axes.len() {
            let mut sharex = Vec::new();
            for id in axes[i].sharex_ids().to_vec() {
                sharex.push(index_of(&id).ok_or_else(|| {
                    ViewError::Payload(format!("sharex references unknown axes '{id}'"))
                })?);
            }
            let mut sharey = Vec::new();
            for id in axes[i].sharey_ids().to_vec() {
                sharey.push(index_of(&id).ok_or_else(|| {
                    ViewError::Payload(format!("sharey references unknown axes '{id}'"))
                })?);
            }
            axes[i].sharex = sharex;
            axes[i].sharey = sharey;
        }

        // resolve plugins once, injecting the implicit defaults when
        // the payload declares none
        let specs = if figure.plugins.is_empty() {
            PluginRegistry::default_specs()
        } else {
            figure.plugins.clone()
        };
        let mut behaviors: Vec<Box<dyn Behavior>> = Vec::new();
        for spec in &specs {
            match registry.resolve(spec) {
                None => {
                    tracing::warn!(target: "limn_view", "skipping unrecognized plugin '{}'", spec.kind);
                }
                Some(resolved) => behaviors.push(resolved?),
            }
        }

        let ctx = ViewCtx {
            axes: &axes,
            figure: &figure,
        };
        let mut buttons = Vec::new();
        let mut zoom_enabled = true;
        for b in &mut behaviors {
            b.on_mount(&ctx)?;
        }
        for b in &behaviors {
            buttons.extend(b.buttons());
            if let Some(enabled) = b.initial_zoom() {
                zoom_enabled = enabled;
            }
        }
        drop(ctx);

        Ok(Self {
            figure,
            width,
            height,
            axes,
            behaviors,
            buttons,
            zoom_enabled,
            css: css.to_string(),
            behavior_src: behavior.to_string(),
        })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn figure(&self) -> &SceneFigure {
        &self.figure
    }

    pub fn axes(&self) -> &[AxesView] {
        &self.axes
    }

    pub fn buttons(&self) -> &[String] {
        &self.buttons
    }

    pub fn css(&self) -> &str {
        &self.css
    }

    pub fn behavior_src(&self) -> &str {
        &self.behavior_src
    }

    pub fn zoom_enabled(&self) -> bool {
        self.zoom_enabled
    }

    pub fn enable_zoom(&mut self) {
        self.zoom_enabled = true;
    }

    pub fn disable_zoom(&mut self) {
        self.zoom_enabled = false;
    }

    pub fn toggle_zoom(&mut self) {
        self.zoom_enabled = !self.zoom_enabled;
    }

    /// Look up the figure, an axes, or an element by id.
    pub fn get_element(&self, id: &str) -> Option<SceneRef<'_>> {
        if self.figure.id == id {
            return Some(SceneRef::Figure);
        }
        for ax in &self.axes {
            if ax.id() == id {
                return Some(SceneRef::Axes(ax));
            }
            if let Some(element) = ax.element(id) {
                return Some(SceneRef::Element(element));
            }
        }
        None
    }

    /// Route one input event. Hover events may produce overlays; all
    /// others return an empty list.
    pub fn handle(&mut self, event: InputEvent) -> ViewResult<Vec<Overlay>> {
        match event {
            InputEvent::DragStart { axes } => {
                self.check_axes(axes)?;
                if self.pannable(axes) {
                    self.axes[axes].begin_interaction();
                    self.axes[axes].set_state(InteractionState::Transforming);
                }
                Ok(Vec::new())
            }
            InputEvent::Drag { axes, dx, dy } => {
                self.check_axes(axes)?;
                if self.pannable(axes)
                    && self.axes[axes].state() == InteractionState::Transforming
                {
                    self.pan(axes, dx, dy);
                }
                Ok(Vec::new())
            }
            InputEvent::DragEnd { axes } => {
                self.check_axes(axes)?;
                self.axes[axes].set_state(InteractionState::Idle);
                Ok(Vec::new())
            }
            InputEvent::Wheel {
                axes,
                factor,
                center,
            } => {
                self.check_axes(axes)?;
                if self.pannable(axes) && factor > 0.0 {
                    self.wheel_zoom(axes, factor, center);
                }
                Ok(Vec::new())
            }
            InputEvent::BoxZoom { axes, rect } => {
                self.check_axes(axes)?;
                self.box_zoom(axes, rect);
                Ok(Vec::new())
            }
            InputEvent::Hover { axes, position } => {
                self.check_axes(axes)?;
                Ok(self.hover(axes, position))
            }
            InputEvent::Reset => {
                self.reset(RESET_DURATION_MS);
                Ok(Vec::new())
            }
        }
    }

    fn check_axes(&self, i: usize) -> ViewResult<()> {
        if i < self.axes.len() {
            Ok(())
        } else {
            Err(ViewError::NoSuchAxes(i.to_string()))
        }
    }

    fn pannable(&self, i: usize) -> bool {
        self.zoom_enabled && self.axes[i].zoomable()
    }

    /// Pan one axes and propagate the resulting domains to its share
    /// partners. Propagation overwrites the partner domain directly
    /// and never recurses, so its depth is exactly one.
    pub fn pan(&mut self, i: usize, dx: f64, dy: f64) {
        self.axes[i].begin_interaction();
        self.axes[i].apply_pan(dx, dy);
        self.propagate(i);
    }

    /// Zoom one axes about a pixel center and propagate.
    pub fn wheel_zoom(&mut self, i: usize, factor: f64, center: [f64; 2]) {
        self.axes[i].begin_interaction();
        self.axes[i].apply_zoom(factor, center);
        self.propagate(i);
    }

    fn propagate(&mut self, i: usize) {
        let xdomain = self.axes[i].xdomain();
        for j in self.axes[i].sharex.clone() {
            if j != i {
                self.axes[j].begin_interaction();
                self.axes[j].set_domains(Some(xdomain), None);
            }
        }
        let ydomain = self.axes[i].ydomain();
        for j in self.axes[i].sharey.clone() {
            if j != i {
                self.axes[j].begin_interaction();
                self.axes[j].set_domains(None, Some(ydomain));
            }
        }
    }

    /// Animate one axes to new limits, propagating to share partners
    /// (each partner runs its own transition; none propagates
    /// further).
    pub fn set_axlim(
        &mut self,
        i: usize,
        xlim: [f64; 2],
        ylim: [f64; 2],
        duration: f64,
        propagate: bool,
    ) {
        self.axes[i].begin_transition(xlim, ylim, duration);
        if propagate {
            for j in self.axes[i].sharex.clone() {
                if j != i {
                    let ydomain = self.axes[j].ydomain();
                    self.axes[j].begin_transition(xlim, ydomain, duration);
                }
            }
            for j in self.axes[i].sharey.clone() {
                if j != i {
                    let xdomain = self.axes[j].xdomain();
                    self.axes[j].begin_transition(xdomain, ylim, duration);
                }
            }
        }
    }

    /// Animate every axes back to its exported domains.
    pub fn reset(&mut self, duration: f64) {
        for i in 0..self.axes.len() {
            let (x, y) = self.axes[i].base_domains();
            self.axes[i].begin_transition(x, y, duration);
        }
    }

    /// Zoom one axes to a dragged pixel rectangle.
    ///
    /// The target is a centered zoom: the rectangle's center moves to
    /// the viewport center, scaled so the rectangle covers 0.9 of the
    /// viewport, with the scale clamped to 1..=8.
    pub fn box_zoom(&mut self, i: usize, rect: [[f64; 2]; 2]) {
        let w = self.axes[i].width();
        let h = self.axes[i].height();
        let dx = (rect[1][0] - rect[0][0]).abs();
        let dy = (rect[1][1] - rect[0][1]).abs();
        if dx == 0.0 || dy == 0.0 {
            return;
        }
        let cx = (rect[0][0] + rect[1][0]) / 2.0;
        let cy = (rect[0][1] + rect[1][1]) / 2.0;
        let k = (0.9 / (dx / w).max(dy / h)).clamp(1.0, 8.0);

        // visible pixel window after the centered zoom, pulled back
        // into domain space through the current transform
        let a = self.axes[i].domain_at([cx - w / (2.0 * k), cy - h / (2.0 * k)]);
        let b = self.axes[i].domain_at([cx + w / (2.0 * k), cy + h / (2.0 * k)]);
        let xlim = [a[0].min(b[0]), a[0].max(b[0])];
        let ylim = [a[1].min(b[1]), a[1].max(b[1])];
        self.set_axlim(i, xlim, ylim, RESET_DURATION_MS, true);
    }

    /// Advance in-flight transitions. Returns `true` on any change.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        let mut changed = false;
        for ax in &mut self.axes {
            changed |= ax.tick(now_ms);
        }
        changed
    }

    /// Dispatch a hover position to the behaviors.
    pub fn hover(&mut self, axes: usize, px: [f64; 2]) -> Vec<Overlay> {
        let ctx = ViewCtx {
            axes: &self.axes,
            figure: &self.figure,
        };
        let mut overlays = Vec::new();
        for b in &mut self.behaviors {
            if let Some(overlay) = b.on_hover(&ctx, axes, px) {
                overlays.push(overlay);
            }
        }
        overlays
    }

    /// Dispatch a brush rectangle to the behaviors.
    pub fn brush(&mut self, axes: usize, rect: [[f64; 2]; 2]) -> Vec<Selection> {
        let ctx = ViewCtx {
            axes: &self.axes,
            figure: &self.figure,
        };
        let mut selections = Vec::new();
        for b in &mut self.behaviors {
            if let Some(selection) = b.on_brush(&ctx, axes, rect) {
                selections.push(selection);
            }
        }
        selections
    }

    /// Activate a toolbar button by name.
    pub fn activate_button(&mut self, name: &str) {
        match name {
            "reset" => self.reset(RESET_DURATION_MS),
            "zoom" | "boxzoom" => self.toggle_zoom(),
            other => tracing::warn!(target: "limn_view", "unknown toolbar button '{other}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use limn_scene::figure::{Figure, Line};
    use limn_scene::plugin::{builtin, connect};
    use limn_scene::render::export_figure;

    fn linked_pair() -> SceneFigure {
        let mut fig = Figure::new(8.0, 4.0);
        let a = fig.add_axes([0.05, 0.1, 0.4, 0.8]);
        let b = fig.add_axes([0.55, 0.1, 0.4, 0.8]);
        for ax in [a, b] {
            fig.axes_mut(ax).set_xlim([0.0, 10.0]).set_ylim([0.0, 10.0]);
        }
        fig.add_line(a, Line::new(vec![[0.0, 0.0], [10.0, 10.0]]));
        fig.add_line(b, Line::new(vec![[0.0, 10.0], [10.0, 0.0]]));
        fig.share_x(a, b);
        export_figure(&fig).unwrap().figure
    }

    #[test]
    fn test_mount_is_idempotent_per_target() {
        let mut engine = Engine::new();
        engine.mount("chart", linked_pair(), "", "").unwrap();
        engine.mount("chart", linked_pair(), "", "").unwrap();

        assert_eq!(engine.mounted_targets().count(), 1);
    }

    #[test]
    fn test_pan_propagates_exact_domain_once() {
        let mut engine = Engine::new();
        let view = engine.mount("chart", linked_pair(), "", "").unwrap();

        view.pan(0, 32.0, 0.0);

        let a = view.axes()[0].xdomain();
        let b = view.axes()[1].xdomain();
        assert_eq!(a, b);
        // panning moved the domain off its export value
        assert!(a[0] < 0.0);
        // y domains are not linked
        assert_eq!(view.axes()[1].ydomain(), [0.0, 10.0]);
    }

    #[test]
    fn test_propagation_depth_is_one() {
        let mut engine = Engine::new();
        let view = engine.mount("chart", linked_pair(), "", "").unwrap();

        // both axes list each other; propagation must not bounce back
        let before = view.axes()[0].interactions();
        view.pan(0, 10.0, 0.0);
        // exactly one interaction on the source axes: the pan itself
        assert_eq!(view.axes()[0].interactions(), before + 1);
    }

    #[test]
    fn test_default_plugins_injected_when_payload_has_none() {
        let mut engine = Engine::new();
        let view = engine.mount("chart", linked_pair(), "", "").unwrap();
        assert_eq!(
            view.buttons(),
            &["reset".to_string(), "zoom".to_string(), "boxzoom".to_string()]
        );
        // the zoom default carries button=true, so pan starts disabled
        assert!(!view.zoom_enabled());
    }

    #[test]
    fn test_plugin_with_missing_target_fails_loudly() {
        let mut fig = Figure::new(4.0, 4.0);
        let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
        fig.add_line(ax, Line::new(vec![[0.0, 0.0], [1.0, 1.0]]));
        connect(&mut fig, [builtin::tooltip("el99", None, "mouse", 0.0, 10.0)]);
        let figure = export_figure(&fig).unwrap().figure;

        let mut engine = Engine::new();
        let err = engine.mount("chart", figure, "", "").unwrap_err();
        assert!(matches!(err, ViewError::MissingElement { .. }));
        assert!(engine.view("chart").is_none());
    }

    #[test]
    fn test_unknown_plugin_tag_is_skipped() {
        let mut fig = Figure::new(4.0, 4.0);
        fig.add_axes([0.1, 0.1, 0.8, 0.8]);
        connect(&mut fig, [limn_scene::PluginSpec::new("sparkle")]);
        let figure = export_figure(&fig).unwrap().figure;

        let mut engine = Engine::new();
        let view = engine.mount("chart", figure, "", "").unwrap();
        assert!(view.buttons().is_empty());
    }

    #[test]
    fn test_malformed_payload_is_rejected() {
        let mut engine = Engine::new();
        let err = engine.mount_json("chart", "{\"width\": 1}", "", "").unwrap_err();
        assert!(matches!(err, ViewError::Json(_)));
    }

    #[test]
    fn test_get_element_finds_figure_axes_and_elements() {
        let figure = linked_pair();
        let figure_id = figure.id.clone();
        let axes_id = figure.axes[0].id.clone();
        let line_id = figure.axes[0].lines[0].id.clone();

        let mut engine = Engine::new();
        let view = engine.mount("chart", figure, "", "").unwrap();

        assert!(matches!(view.get_element(&figure_id), Some(SceneRef::Figure)));
        assert!(matches!(view.get_element(&axes_id), Some(SceneRef::Axes(_))));
        assert!(matches!(view.get_element(&line_id), Some(SceneRef::Element(_))));
        assert!(view.get_element("el999").is_none());
    }

    #[test]
    fn test_reset_animates_back_to_export_domains() {
        let mut engine = Engine::new();
        let view = engine.mount("chart", linked_pair(), "", "").unwrap();

        view.pan(0, 50.0, 20.0);
        assert_ne!(view.axes()[0].xdomain(), [0.0, 10.0]);

        view.reset(100.0);
        view.tick(0.0);
        view.tick(100.0);

        let xd = view.axes()[0].xdomain();
        assert!((xd[0] - 0.0).abs() < 1e-9);
        assert!((xd[1] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_drag_state_machine_gates_panning() {
        let mut engine = Engine::new();
        let view = engine.mount("chart", linked_pair(), "", "").unwrap();
        view.enable_zoom();

        // a drag delta with no preceding drag-start does nothing
        view.handle(InputEvent::Drag {
            axes: 0,
            dx: 25.0,
            dy: 0.0,
        })
        .unwrap();
        assert_eq!(view.axes()[0].xdomain(), [0.0, 10.0]);

        view.handle(InputEvent::DragStart { axes: 0 }).unwrap();
        assert_eq!(view.axes()[0].state(), InteractionState::Transforming);
        view.handle(InputEvent::Drag {
            axes: 0,
            dx: 25.0,
            dy: 0.0,
        })
        .unwrap();
        view.handle(InputEvent::DragEnd { axes: 0 }).unwrap();

        assert_eq!(view.axes()[0].state(), InteractionState::Idle);
        assert_ne!(view.axes()[0].xdomain(), [0.0, 10.0]);
    }

    #[test]
    fn test_box_zoom_narrows_domain() {
        let mut engine = Engine::new();
        let view = engine.mount("chart", linked_pair(), "", "").unwrap();

        let w = view.axes()[0].width();
        let h = view.axes()[0].height();
        view.box_zoom(0, [[0.25 * w, 0.25 * h], [0.75 * w, 0.75 * h]]);
        view.tick(0.0);
        view.tick(RESET_DURATION_MS);

        // a half-viewport box zooms by 0.9 / 0.5 = 1.8 about its center
        let xd = view.axes()[0].xdomain();
        assert!((xd[0] + xd[1] - 10.0).abs() < 1e-9);
        assert!((xd[1] - xd[0] - 10.0 / 1.8).abs() < 1e-9);
        // the linked partner followed the x zoom
        let partner = view.axes()[1].xdomain();
        assert!((partner[0] - xd[0]).abs() < 1e-9);
    }

    #[test]
    fn test_tiny_box_zoom_scale_is_clamped() {
        let mut engine = Engine::new();
        let view = engine.mount("chart", linked_pair(), "", "").unwrap();

        view.box_zoom(0, [[159.0, 159.0], [161.0, 161.0]]);
        view.tick(0.0);
        view.tick(RESET_DURATION_MS);

        // scale clamps at 8, so a 10-unit domain narrows to 10/8
        let xd = view.axes()[0].xdomain();
        assert!((xd[1] - xd[0] - 10.0 / 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_nonzoomable_axes_ignores_input() {
        let mut fig = Figure::new(4.0, 4.0);
        let ax = fig.add_axes([0.1, 0.1, 0.8, 0.8]);
        fig.axes_mut(ax).zoomable = false;
        fig.add_line(ax, Line::new(vec![[0.0, 0.0], [1.0, 1.0]]));
        let figure = export_figure(&fig).unwrap().figure;

        let mut engine = Engine::new();
        let view = engine.mount("chart", figure, "", "").unwrap();
        view.enable_zoom();
        let before = view.axes()[0].xdomain();

        view.handle(InputEvent::DragStart { axes: 0 }).unwrap();
        view.handle(InputEvent::Drag {
            axes: 0,
            dx: 50.0,
            dy: 0.0,
        })
        .unwrap();
        assert_eq!(view.axes()[0].xdomain(), before);
    }

    #[test]
    fn test_css_and_behavior_blocks_are_retained() {
        let mut engine = Engine::new();
        let view = engine
            .mount("chart", linked_pair(), ".limn { color: red; }", "hook()")
            .unwrap();
        assert!(view.css().contains("color: red"));
        assert_eq!(view.behavior_src(), "hook()");
    }
}
