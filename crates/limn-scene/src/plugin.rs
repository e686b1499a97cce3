//! Plugin attachment on the export side
//!
//! A plugin is a declarative behavior description: a type tag, a
//! JSON-safe property bag, an optional client-resolved behavior
//! snippet, and the element ids it attaches to. Plugins are collected
//! in declaration order as a side list on the figure; they never alter
//! the axes or element lists, and tag resolution happens entirely on
//! the client.
//!
//! When the list is empty the client injects its implicit defaults
//! (reset, zoom, boxzoom); [`clear`] followed by [`connect`] is how a
//! host overrides them.

use serde_json::json;

use crate::figure::Figure;
use crate::scene::PluginSpec;

/// Append plugins to the figure, in declaration order.
///
/// Duplicate element references across plugins are fine; the client
/// resolves each independently.
pub fn connect<I>(figure: &mut Figure, plugins: I)
where
    I: IntoIterator<Item = PluginSpec>,
{
    figure.plugins_mut().extend(plugins);
}

/// Remove every plugin from the figure.
///
/// Lets a later [`connect`] call override the implicit client-side
/// defaults.
pub fn clear(figure: &mut Figure) {
    figure.plugins_mut().clear();
}

/// Built-in plugin descriptors matching the client's built-in set.
pub mod builtin {
    use super::*;

    /// Toolbar reset button: animates every axes back to its exported
    /// domain.
    pub fn reset() -> PluginSpec {
        PluginSpec::new("reset")
    }

    /// Scroll/drag pan-zoom. `button` adds a toolbar toggle; `enabled`
    /// forces the initial state (defaults to the opposite of `button`).
    pub fn zoom(button: bool, enabled: Option<bool>) -> PluginSpec {
        PluginSpec::new("zoom")
            .prop("button", json!(button))
            .prop("enabled", json!(enabled))
    }

    /// Drag-a-rectangle zoom.
    pub fn box_zoom(button: bool, enabled: Option<bool>) -> PluginSpec {
        PluginSpec::new("boxzoom")
            .prop("button", json!(button))
            .prop("enabled", json!(enabled))
    }

    /// Hover tooltip over the points of one element.
    ///
    /// `labels` supplies one string per point; without it the client
    /// shows the point coordinates. `location` is one of
    /// `"mouse"`, `"top left"`, `"top right"`, `"bottom left"`,
    /// `"bottom right"`.
    pub fn tooltip(
        element: impl Into<String>,
        labels: Option<Vec<String>>,
        location: &str,
        hoffset: f64,
        voffset: f64,
    ) -> PluginSpec {
        PluginSpec::new("tooltip")
            .target(element)
            .prop("labels", json!(labels))
            .prop("location", json!(location))
            .prop("hoffset", json!(hoffset))
            .prop("voffset", json!(voffset))
    }

    /// Live cursor-position readout with a fixed number of decimals.
    pub fn mouse_position(fontsize: f64, fmt: &str) -> PluginSpec {
        PluginSpec::new("mouseposition")
            .prop("fontsize", json!(fontsize))
            .prop("fmt", json!(fmt))
    }

    /// Brush selection linked across every element sharing the
    /// brushed element's dataset.
    pub fn linked_brush(element: impl Into<String>) -> PluginSpec {
        PluginSpec::new("linkedbrush").target(element)
    }
}
