//! Axis scales
//!
//! Forward and inverse mappings between data-domain values and
//! viewport pixels for the linear, log, and date scale kinds. The
//! date scale is linear over epoch milliseconds; what makes it
//! special is the companion [`LinearMap`] from display limits to the
//! millisecond domain, composed in front of the pixel mapping
//! (element data on a date axis is expressed in display-limit units).
//!
//! Scales also expose their own transform space, which is what reset
//! animations interpolate through: interpolating log domains in log
//! space keeps intermediate frames sensible where naive linear
//! interpolation of the raw values would not.

use limn_scene::ScaleKind;

use crate::error::{ViewError, ViewResult};

/// A plain linear map between two intervals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearMap {
    pub from: [f64; 2],
    pub to: [f64; 2],
}

impl LinearMap {
    pub fn new(from: [f64; 2], to: [f64; 2]) -> Self {
        Self { from, to }
    }

    pub fn apply(&self, v: f64) -> f64 {
        let t = (v - self.from[0]) / (self.from[1] - self.from[0]);
        self.to[0] + t * (self.to[1] - self.to[0])
    }

    pub fn invert(&self, v: f64) -> f64 {
        let t = (v - self.to[0]) / (self.to[1] - self.to[0]);
        self.from[0] + t * (self.from[1] - self.from[0])
    }
}

/// Domain-to-pixel mapping for one axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Scale {
    kind: ScaleKind,
    domain: [f64; 2],
    range: [f64; 2],
}

impl Scale {
    pub fn new(kind: ScaleKind, domain: [f64; 2], range: [f64; 2]) -> ViewResult<Self> {
        if matches!(kind, ScaleKind::Log) && (domain[0] <= 0.0 || domain[1] <= 0.0) {
            return Err(ViewError::InvalidDomain {
                scale: "log",
                lo: domain[0],
                hi: domain[1],
            });
        }
        if !domain[0].is_finite() || !domain[1].is_finite() || domain[0] == domain[1] {
            return Err(ViewError::InvalidDomain {
                scale: kind_name(kind),
                lo: domain[0],
                hi: domain[1],
            });
        }
        Ok(Self {
            kind,
            domain,
            range,
        })
    }

    pub fn kind(&self) -> ScaleKind {
        self.kind
    }

    pub fn domain(&self) -> [f64; 2] {
        self.domain
    }

    pub fn range(&self) -> [f64; 2] {
        self.range
    }

    pub fn set_domain(&mut self, domain: [f64; 2]) {
        self.domain = domain;
    }

    /// Domain value to pixel.
    pub fn apply(&self, v: f64) -> f64 {
        let s0 = self.to_transform_space(self.domain[0]);
        let s1 = self.to_transform_space(self.domain[1]);
        let t = (self.to_transform_space(v) - s0) / (s1 - s0);
        self.range[0] + t * (self.range[1] - self.range[0])
    }

    /// Pixel back to domain value.
    pub fn invert(&self, px: f64) -> f64 {
        let t = (px - self.range[0]) / (self.range[1] - self.range[0]);
        let s0 = self.to_transform_space(self.domain[0]);
        let s1 = self.to_transform_space(self.domain[1]);
        self.from_transform_space(s0 + t * (s1 - s0))
    }

    /// Map a domain value into the scale's own transform space.
    pub fn to_transform_space(&self, v: f64) -> f64 {
        match self.kind {
            ScaleKind::Linear | ScaleKind::Date => v,
            ScaleKind::Log => v.log10(),
        }
    }

    /// Map back out of transform space.
    pub fn from_transform_space(&self, s: f64) -> f64 {
        match self.kind {
            ScaleKind::Linear | ScaleKind::Date => s,
            ScaleKind::Log => 10.0_f64.powf(s),
        }
    }

    /// Interpolate between two domains through transform space.
    ///
    /// `t` runs 0..=1; at the endpoints the result equals `from` and
    /// `to` exactly.
    pub fn interpolate_domain(&self, from: [f64; 2], to: [f64; 2], t: f64) -> [f64; 2] {
        if t >= 1.0 {
            return to;
        }
        let lerp = |a: f64, b: f64| {
            let sa = self.to_transform_space(a);
            let sb = self.to_transform_space(b);
            self.from_transform_space(sa + t * (sb - sa))
        };
        [lerp(from[0], to[0]), lerp(from[1], to[1])]
    }
}

fn kind_name(kind: ScaleKind) -> &'static str {
    match kind {
        ScaleKind::Linear => "linear",
        ScaleKind::Log => "log",
        ScaleKind::Date => "date",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_round_trip() {
        let scale = Scale::new(ScaleKind::Linear, [0.0, 10.0], [0.0, 400.0]).unwrap();
        assert_eq!(scale.apply(5.0), 200.0);
        assert_eq!(scale.invert(200.0), 5.0);
    }

    #[test]
    fn test_inverted_pixel_range() {
        // y ranges run top-down: domain low maps to the bottom pixel
        let scale = Scale::new(ScaleKind::Linear, [0.0, 1.0], [300.0, 0.0]).unwrap();
        assert_eq!(scale.apply(0.0), 300.0);
        assert_eq!(scale.apply(1.0), 0.0);
    }

    #[test]
    fn test_log_scale() {
        let scale = Scale::new(ScaleKind::Log, [1.0, 1000.0], [0.0, 300.0]).unwrap();
        assert!((scale.apply(10.0) - 100.0).abs() < 1e-9);
        assert!((scale.invert(200.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_log_rejects_nonpositive_domain() {
        let err = Scale::new(ScaleKind::Log, [0.0, 10.0], [0.0, 1.0]).unwrap_err();
        assert!(matches!(err, ViewError::InvalidDomain { scale: "log", .. }));
    }

    #[test]
    fn test_degenerate_domain_rejected() {
        assert!(Scale::new(ScaleKind::Linear, [2.0, 2.0], [0.0, 1.0]).is_err());
        assert!(Scale::new(ScaleKind::Linear, [f64::NAN, 2.0], [0.0, 1.0]).is_err());
    }

    #[test]
    fn test_log_interpolation_stays_in_log_space() {
        let scale = Scale::new(ScaleKind::Log, [1.0, 10.0], [0.0, 1.0]).unwrap();
        let mid = scale.interpolate_domain([1.0, 10.0], [1.0, 1000.0], 0.5);
        // halfway in log space: upper limit is 10^2, not (10+1000)/2
        assert!((mid[1] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_interpolation_endpoints_exact() {
        let scale = Scale::new(ScaleKind::Linear, [0.0, 1.0], [0.0, 1.0]).unwrap();
        assert_eq!(scale.interpolate_domain([0.0, 1.0], [3.0, 7.0], 0.0), [0.0, 1.0]);
        assert_eq!(scale.interpolate_domain([0.0, 1.0], [3.0, 7.0], 1.0), [3.0, 7.0]);
    }

    #[test]
    fn test_linear_map_round_trip() {
        let map = LinearMap::new([0.0, 1.0], [1_000.0, 87_400.0]);
        let v = map.apply(0.25);
        assert!((map.invert(v) - 0.25).abs() < 1e-12);
    }
}
