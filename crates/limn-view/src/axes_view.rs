//! Per-axes view state
//!
//! Each [`AxesView`] reconstructs one scene-graph axes: the fixed
//! domain-to-viewport scales set at draw time, the user zoom affine
//! layered on top, the owned elements with their projected display
//! geometry, and the interaction bookkeeping (state machine,
//! monotonically increasing interaction counter, in-flight reset
//! transition).
//!
//! Three coordinate systems feed projection: element data runs
//! through the scales and the zoom transform; axes- and
//! figure-fraction geometry is anchored to the boxes and ignores
//! zoom; display geometry is raw pixels.

use limn_scene::scene::{
    Coordinates, SceneAxes, SceneCollection, SceneFigure, SceneImage, SceneLine, SceneMarkers,
    ScenePath, SceneText,
};
use limn_scene::ScaleKind;

use crate::error::{ViewError, ViewResult};
use crate::scale::{LinearMap, Scale};
use crate::transform::Affine1;

/// Default reset-animation duration in milliseconds.
pub const RESET_DURATION_MS: f64 = 750.0;

/// One reconstructed scene element.
#[derive(Clone, Debug)]
pub enum ElementKind {
    Line(SceneLine),
    Markers(SceneMarkers),
    Path(ScenePath),
    Text(SceneText),
    Image(SceneImage),
    Collection(SceneCollection),
}

impl ElementKind {
    pub fn id(&self) -> &str {
        match self {
            ElementKind::Line(e) => &e.id,
            ElementKind::Markers(e) => &e.id,
            ElementKind::Path(e) => &e.id,
            ElementKind::Text(e) => &e.id,
            ElementKind::Image(e) => &e.id,
            ElementKind::Collection(e) => &e.id,
        }
    }

    pub fn zorder(&self) -> f64 {
        match self {
            ElementKind::Line(e) => e.zorder,
            ElementKind::Markers(e) => e.zorder,
            ElementKind::Path(e) => e.zorder,
            ElementKind::Text(e) => e.zorder,
            ElementKind::Image(e) => e.zorder,
            ElementKind::Collection(e) => e.zorder,
        }
    }

    /// The shared-data-table reference backing this element, if any.
    pub fn dataset(&self) -> Option<&limn_scene::scene::DataRef> {
        match self {
            ElementKind::Line(e) => Some(&e.data),
            ElementKind::Markers(e) => Some(&e.data),
            ElementKind::Path(e) => Some(&e.data),
            ElementKind::Collection(e) => Some(&e.offsets),
            ElementKind::Text(_) | ElementKind::Image(_) => None,
        }
    }

    fn coordinates(&self) -> Coordinates {
        match self {
            ElementKind::Line(e) => e.coordinates,
            ElementKind::Markers(e) => e.coordinates,
            ElementKind::Path(e) => e.coordinates,
            ElementKind::Text(e) => e.coordinates,
            ElementKind::Image(e) => e.coordinates,
            ElementKind::Collection(e) => e.offsetcoordinates,
        }
    }
}

/// Projected display-space output for one element, retained between
/// transform changes so a drawing backend can diff it.
#[derive(Clone, Debug, PartialEq)]
pub enum DisplayGeometry {
    Polyline(Vec<[f64; 2]>),
    Points(Vec<[f64; 2]>),
    Path {
        vertices: Vec<[f64; 2]>,
        codes: Vec<String>,
        offset: Option<[f64; 2]>,
    },
    Text {
        position: [f64; 2],
    },
    Image {
        /// `[x0, y0, x1, y1]` in pixels
        bounds: [f64; 4],
    },
    Collection {
        offsets: Vec<[f64; 2]>,
    },
    Empty,
}

/// A scene element plus its resolved source data and current
/// projection.
#[derive(Clone, Debug)]
pub struct ElementView {
    kind: ElementKind,
    /// Geometry source resolved out of the shared data table
    data: Vec<[f64; 2]>,
    geometry: DisplayGeometry,
}

impl ElementView {
    pub fn id(&self) -> &str {
        self.kind.id()
    }

    pub fn zorder(&self) -> f64 {
        self.kind.zorder()
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn data(&self) -> &[[f64; 2]] {
        &self.data
    }

    pub fn geometry(&self) -> &DisplayGeometry {
        &self.geometry
    }
}

/// Interaction state of one axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InteractionState {
    #[default]
    Idle,
    Transforming,
}

/// An in-flight animated limit change.
#[derive(Clone, Debug)]
struct Transition {
    /// Interaction counter value this transition belongs to; a tick
    /// observing a newer counter treats the transition as stale
    counter: u64,
    start: Option<f64>,
    duration: f64,
    from_x: [f64; 2],
    to_x: [f64; 2],
    from_y: [f64; 2],
    to_y: [f64; 2],
}

/// Live view state for one axes of a mounted figure.
#[derive(Clone, Debug)]
pub struct AxesView {
    id: String,
    /// Top-left corner in figure pixels
    position: [f64; 2],
    width: f64,
    height: f64,
    fig_width: f64,
    fig_height: f64,
    xdom: Scale,
    ydom: Scale,
    /// Display-limit to domain maps, present only for date scales
    xmap: Option<LinearMap>,
    ymap: Option<LinearMap>,
    /// Exported domains, the reset target
    base_xdomain: [f64; 2],
    base_ydomain: [f64; 2],
    pub(crate) zoom_x: Affine1,
    pub(crate) zoom_y: Affine1,
    zoomable: bool,
    sharex_ids: Vec<String>,
    sharey_ids: Vec<String>,
    /// Partner indices resolved at mount
    pub(crate) sharex: Vec<usize>,
    pub(crate) sharey: Vec<usize>,
    elements: Vec<ElementView>,
    state: InteractionState,
    interactions: u64,
    transition: Option<Transition>,
}

impl AxesView {
    pub(crate) fn build(
        axes: &SceneAxes,
        figure: &SceneFigure,
        fig_width: f64,
        fig_height: f64,
    ) -> ViewResult<Self> {
        let bbox = axes.bbox;
        let position = [
            bbox[0] * fig_width,
            (1.0 - bbox[1] - bbox[3]) * fig_height,
        ];
        let width = bbox[2] * fig_width;
        let height = bbox[3] * fig_height;

        let xdom = Scale::new(axes.xscale, axes.xdomain, [0.0, width])?;
        let ydom = Scale::new(axes.yscale, axes.ydomain, [height, 0.0])?;
        let xmap = matches!(axes.xscale, ScaleKind::Date)
            .then(|| LinearMap::new(axes.xlim, axes.xdomain));
        let ymap = matches!(axes.yscale, ScaleKind::Date)
            .then(|| LinearMap::new(axes.ylim, axes.ydomain));

        let mut elements = Vec::new();
        let mut push = |kind: ElementKind, data: Vec<[f64; 2]>| {
            elements.push(ElementView {
                kind,
                data,
                geometry: DisplayGeometry::Empty,
            });
        };

        for line in &axes.lines {
            let data = resolve(figure, &line.id, &line.data)?;
            push(ElementKind::Line(line.clone()), data);
        }
        for markers in &axes.markers {
            let data = resolve(figure, &markers.id, &markers.data)?;
            push(ElementKind::Markers(markers.clone()), data);
        }
        for path in &axes.paths {
            let data = resolve(figure, &path.id, &path.data)?;
            push(ElementKind::Path(path.clone()), data);
        }
        for text in &axes.texts {
            push(ElementKind::Text(text.clone()), Vec::new());
        }
        for image in &axes.images {
            push(ElementKind::Image(image.clone()), Vec::new());
        }
        for collection in &axes.collections {
            let data = resolve(figure, &collection.id, &collection.offsets)?;
            push(ElementKind::Collection(collection.clone()), data);
        }

        // zorder ordering with stable ties by insertion order
        elements.sort_by(|a, b| {
            a.zorder()
                .partial_cmp(&b.zorder())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut view = Self {
            id: axes.id.clone(),
            position,
            width,
            height,
            fig_width,
            fig_height,
            xdom,
            ydom,
            xmap,
            ymap,
            base_xdomain: axes.xdomain,
            base_ydomain: axes.ydomain,
            zoom_x: Affine1::identity(),
            zoom_y: Affine1::identity(),
            zoomable: axes.zoomable,
            sharex_ids: axes.sharex.clone(),
            sharey_ids: axes.sharey.clone(),
            sharex: Vec::new(),
            sharey: Vec::new(),
            elements,
            state: InteractionState::Idle,
            interactions: 0,
            transition: None,
        };
        view.reproject();
        Ok(view)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> [f64; 2] {
        self.position
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn zoomable(&self) -> bool {
        self.zoomable
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn elements(&self) -> &[ElementView] {
        &self.elements
    }

    pub fn element(&self, id: &str) -> Option<&ElementView> {
        self.elements.iter().find(|e| e.id() == id)
    }

    pub(crate) fn sharex_ids(&self) -> &[String] {
        &self.sharex_ids
    }

    pub(crate) fn sharey_ids(&self) -> &[String] {
        &self.sharey_ids
    }

    /// Interaction counter; increases on every new user interaction.
    pub fn interactions(&self) -> u64 {
        self.interactions
    }

    /// Whether a reset/limit transition is currently in flight.
    pub fn transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// The currently visible x domain, with the zoom transform
    /// applied.
    pub fn xdomain(&self) -> [f64; 2] {
        let r = self.xdom.range();
        let d = self.domain_at([r[0], 0.0]);
        let e = self.domain_at([r[1], 0.0]);
        [d[0], e[0]]
    }

    /// The currently visible y domain.
    pub fn ydomain(&self) -> [f64; 2] {
        let r = self.ydom.range();
        let d = self.domain_at([0.0, r[0]]);
        let e = self.domain_at([0.0, r[1]]);
        [d[1], e[1]]
    }

    /// Domain-space position of an axes pixel. Unlike
    /// [`AxesView::unproject`] this stops at the domain, without
    /// mapping date values back into display-limit units.
    pub(crate) fn domain_at(&self, px: [f64; 2]) -> [f64; 2] {
        [
            self.xdom.invert(self.zoom_x.invert(px[0])),
            self.ydom.invert(self.zoom_y.invert(px[1])),
        ]
    }

    /// The domains the axes was exported with (the reset target).
    pub fn base_domains(&self) -> ([f64; 2], [f64; 2]) {
        (self.base_xdomain, self.base_ydomain)
    }

    // ----- projection ---------------------------------------------------

    fn data_x(&self, v: f64) -> f64 {
        let d = self.xmap.map_or(v, |m| m.apply(v));
        self.zoom_x.apply(self.xdom.apply(d))
    }

    fn data_y(&self, v: f64) -> f64 {
        let d = self.ymap.map_or(v, |m| m.apply(v));
        self.zoom_y.apply(self.ydom.apply(d))
    }

    /// Project one point of the given coordinate system into axes
    /// pixels. Only data coordinates are subject to zoom.
    pub fn project(&self, coordinates: Coordinates, p: [f64; 2]) -> [f64; 2] {
        match coordinates {
            Coordinates::Data => [self.data_x(p[0]), self.data_y(p[1])],
            Coordinates::Axes => [p[0] * self.width, (1.0 - p[1]) * self.height],
            Coordinates::Figure => [
                p[0] * self.fig_width - self.position[0],
                (1.0 - p[1]) * self.fig_height - self.position[1],
            ],
            Coordinates::Display => p,
        }
    }

    /// Invert an axes-pixel position back into data coordinates.
    pub fn unproject(&self, px: [f64; 2]) -> [f64; 2] {
        let x = self.xdom.invert(self.zoom_x.invert(px[0]));
        let y = self.ydom.invert(self.zoom_y.invert(px[1]));
        [
            self.xmap.map_or(x, |m| m.invert(x)),
            self.ymap.map_or(y, |m| m.invert(y)),
        ]
    }

    /// Recompute the display geometry of every owned element.
    pub(crate) fn reproject(&mut self) {
        // split borrow: projection only reads the transform fields
        let mut geometries = Vec::with_capacity(self.elements.len());
        for element in &self.elements {
            let coords = element.kind.coordinates();
            let geometry = match &element.kind {
                ElementKind::Line(_) => DisplayGeometry::Polyline(
                    element.data.iter().map(|p| self.project(coords, *p)).collect(),
                ),
                ElementKind::Markers(_) => DisplayGeometry::Points(
                    element.data.iter().map(|p| self.project(coords, *p)).collect(),
                ),
                ElementKind::Path(path) => DisplayGeometry::Path {
                    vertices: element
                        .data
                        .iter()
                        .map(|p| self.project(coords, *p))
                        .collect(),
                    codes: path.pathcodes.clone(),
                    offset: path.offset.map(|o| {
                        self.project(path.offsetcoordinates.unwrap_or(Coordinates::Data), o)
                    }),
                },
                ElementKind::Text(text) => DisplayGeometry::Text {
                    position: self.project(coords, text.position),
                },
                ElementKind::Image(image) => {
                    let p0 = self.project(coords, [image.extent[0], image.extent[2]]);
                    let p1 = self.project(coords, [image.extent[1], image.extent[3]]);
                    DisplayGeometry::Image {
                        bounds: [p0[0], p0[1], p1[0], p1[1]],
                    }
                }
                ElementKind::Collection(_) => DisplayGeometry::Collection {
                    offsets: element
                        .data
                        .iter()
                        .map(|p| self.project(coords, *p))
                        .collect(),
                },
            };
            geometries.push(geometry);
        }
        for (element, geometry) in self.elements.iter_mut().zip(geometries) {
            element.geometry = geometry;
        }
    }

    // ----- interaction --------------------------------------------------

    /// Register a new user interaction: bump the counter and drop any
    /// in-flight transition (last writer wins).
    pub(crate) fn begin_interaction(&mut self) -> u64 {
        self.interactions += 1;
        self.transition = None;
        self.interactions
    }

    pub(crate) fn set_state(&mut self, state: InteractionState) {
        self.state = state;
    }

    /// Apply a pan delta in screen pixels.
    pub(crate) fn apply_pan(&mut self, dx: f64, dy: f64) {
        self.zoom_x.pan(dx);
        self.zoom_y.pan(dy);
        self.reproject();
    }

    /// Apply a zoom factor about a screen-pixel center.
    pub(crate) fn apply_zoom(&mut self, factor: f64, center: [f64; 2]) {
        self.zoom_x.zoom_at(factor, center[0]);
        self.zoom_y.zoom_at(factor, center[1]);
        self.reproject();
    }

    /// Overwrite one or both domains immediately, snapping the zoom
    /// transform to identity. Used by propagation from linked axes
    /// and by completed transitions.
    pub(crate) fn set_domains(&mut self, x: Option<[f64; 2]>, y: Option<[f64; 2]>) {
        if let Some(x) = x {
            self.xdom.set_domain(x);
            self.zoom_x.reset();
        }
        if let Some(y) = y {
            self.ydom.set_domain(y);
            self.zoom_y.reset();
        }
        self.reproject();
    }

    /// Begin an animated limit change toward the given domains.
    ///
    /// The transition runs over `duration` milliseconds of subsequent
    /// [`AxesView::tick`] calls; a zero duration applies immediately.
    pub(crate) fn begin_transition(
        &mut self,
        to_x: [f64; 2],
        to_y: [f64; 2],
        duration: f64,
    ) {
        let counter = self.begin_interaction();
        if duration <= 0.0 {
            self.set_domains(Some(to_x), Some(to_y));
            return;
        }
        let from_x = self.xdomain();
        let from_y = self.ydomain();
        // the zoom transform folds into the interpolated domains
        self.set_domains(Some(from_x), Some(from_y));
        self.transition = Some(Transition {
            counter,
            start: None,
            duration,
            from_x,
            to_x,
            from_y,
            to_y,
        });
    }

    /// Advance the in-flight transition. Returns `true` if the view
    /// changed. A tick that observes a newer interaction counter is a
    /// stale no-op.
    pub(crate) fn tick(&mut self, now_ms: f64) -> bool {
        let Some(transition) = self.transition.as_mut() else {
            return false;
        };
        if transition.counter != self.interactions {
            self.transition = None;
            return false;
        }
        let start = *transition.start.get_or_insert(now_ms);
        let t = ((now_ms - start) / transition.duration).clamp(0.0, 1.0);

        let x = self
            .xdom
            .interpolate_domain(transition.from_x, transition.to_x, t);
        let y = self
            .ydom
            .interpolate_domain(transition.from_y, transition.to_y, t);
        if t >= 1.0 {
            self.transition = None;
        }
        self.set_domains(Some(x), Some(y));
        true
    }

    /// Nearest projected point of an element within `radius` pixels.
    pub fn nearest_point(
        &self,
        element_id: &str,
        px: [f64; 2],
        radius: f64,
    ) -> Option<(usize, [f64; 2])> {
        let element = self.element(element_id)?;
        let points: &[[f64; 2]] = match element.geometry() {
            DisplayGeometry::Polyline(points) => points,
            DisplayGeometry::Points(points) => points,
            DisplayGeometry::Collection { offsets } => offsets,
            _ => return None,
        };
        let mut best: Option<(usize, f64)> = None;
        for (i, p) in points.iter().enumerate() {
            let d2 = (p[0] - px[0]).powi(2) + (p[1] - px[1]).powi(2);
            if d2 <= radius * radius && best.map_or(true, |(_, bd)| d2 < bd) {
                best = Some((i, d2));
            }
        }
        best.map(|(i, _)| (i, points[i]))
    }
}

fn resolve(
    figure: &SceneFigure,
    element: &str,
    data_ref: &limn_scene::scene::DataRef,
) -> ViewResult<Vec<[f64; 2]>> {
    figure
        .resolve(data_ref)
        .ok_or_else(|| ViewError::MissingData {
            element: element.to_string(),
            data: data_ref.data.clone(),
        })
}
