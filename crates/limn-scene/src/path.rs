//! Path encoding
//!
//! Converts a host vertex/opcode stream into the canonical
//! [`PathSpec`] form: ordered single-letter opcodes plus the vertices
//! each consumes. Vertices stay in the element's own coordinate
//! system; the only transform ever applied here is an optional
//! shape-local affine (e.g. a patch defined in unit-circle space).
//! Device scaling is the client's job, which is what lets it
//! re-render under a new zoom without refetching data.

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::error::{PathError, PathResult};

/// Opcodes as supplied by the host, one per vertex slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostCode {
    /// Begin a subpath (1 vertex)
    MoveTo,
    /// Straight segment (1 vertex)
    LineTo,
    /// Quadratic Bezier (2 vertices: control, end)
    Curve3,
    /// Cubic Bezier (3 vertices: control, control, end)
    Curve4,
    /// Close the current subpath (its vertex slot is a placeholder)
    ClosePoly,
    /// Truncation marker: everything after it is garbage
    Stop,
}

/// Canonical path opcodes carried on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathCode {
    #[serde(rename = "M")]
    MoveTo,
    #[serde(rename = "L")]
    LineTo,
    #[serde(rename = "Q")]
    Curve3,
    #[serde(rename = "C")]
    Curve4,
    #[serde(rename = "Z")]
    ClosePoly,
}

impl PathCode {
    /// Number of vertices this opcode consumes on the wire
    pub fn vertex_count(&self) -> usize {
        match self {
            PathCode::MoveTo | PathCode::LineTo => 1,
            PathCode::Curve3 => 2,
            PathCode::Curve4 => 3,
            PathCode::ClosePoly => 0,
        }
    }

    /// Single-letter wire form
    pub fn letter(&self) -> &'static str {
        match self {
            PathCode::MoveTo => "M",
            PathCode::LineTo => "L",
            PathCode::Curve3 => "Q",
            PathCode::Curve4 => "C",
            PathCode::ClosePoly => "Z",
        }
    }
}

/// A canonical opcode + vertex encoding of one vector shape.
///
/// `vertices` holds, in order, exactly the vertices consumed by
/// `codes`; a closed shape always terminates in [`PathCode::ClosePoly`]
/// and a host [`HostCode::Stop`] is never represented.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PathSpec {
    pub vertices: Vec<[f64; 2]>,
    pub codes: Vec<PathCode>,
}

impl PathSpec {
    /// Number of encoded segments
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Wire form of the opcode list (`["M", "L", ...]`)
    pub fn code_letters(&self) -> Vec<String> {
        self.codes.iter().map(|c| c.letter().to_string()).collect()
    }
}

/// Encode a host vertex/opcode stream.
///
/// The host supplies one code per vertex slot; multi-vertex segments
/// repeat their code for every slot they occupy. A `Stop` code
/// terminates encoding without emission. When `codes` is `None` the
/// stream is a plain polyline: one `MoveTo` followed by `LineTo`s.
///
/// `transform` is the shape-local affine applied to every emitted
/// vertex.
pub fn encode(
    vertices: &[[f64; 2]],
    codes: Option<&[HostCode]>,
    transform: Option<&Matrix3<f64>>,
) -> PathResult<PathSpec> {
    let mut spec = PathSpec::default();

    match codes {
        None => {
            for (i, v) in vertices.iter().enumerate() {
                spec.codes.push(if i == 0 {
                    PathCode::MoveTo
                } else {
                    PathCode::LineTo
                });
                spec.vertices.push(apply(transform, *v));
            }
        }
        Some(codes) => {
            let mut i = 0;
            while i < codes.len() {
                let (code, consumed) = match codes[i] {
                    HostCode::Stop => break,
                    HostCode::MoveTo => (PathCode::MoveTo, 1),
                    HostCode::LineTo => (PathCode::LineTo, 1),
                    HostCode::Curve3 => (PathCode::Curve3, 2),
                    HostCode::Curve4 => (PathCode::Curve4, 3),
                    HostCode::ClosePoly => {
                        // placeholder vertex slot, nothing emitted
                        spec.codes.push(PathCode::ClosePoly);
                        i += 1;
                        continue;
                    }
                };

                if i + consumed > vertices.len() || i + consumed > codes.len() {
                    return Err(PathError::VertexUnderrun {
                        opcode: code.letter(),
                        index: i,
                        needed: consumed,
                        available: vertices.len().saturating_sub(i),
                    });
                }
                // multi-vertex segments must repeat their host code
                for k in 1..consumed {
                    if codes[i + k] != codes[i] {
                        return Err(PathError::BrokenOpcodeRun {
                            opcode: code.letter(),
                            index: i + k,
                        });
                    }
                }

                spec.codes.push(code);
                for k in 0..consumed {
                    spec.vertices.push(apply(transform, vertices[i + k]));
                }
                i += consumed;
            }
        }
    }

    Ok(spec)
}

fn apply(transform: Option<&Matrix3<f64>>, v: [f64; 2]) -> [f64; 2] {
    match transform {
        None => v,
        Some(m) => {
            let p = m * nalgebra::Vector3::new(v[0], v[1], 1.0);
            [p.x, p.y]
        }
    }
}

/// Build a shape-local affine from a flattened
/// `[a, b, c, d, tx, ty]` row pair (the top two rows of the 3x3).
pub fn affine_from_rows(rows: [f64; 6]) -> Matrix3<f64> {
    Matrix3::new(
        rows[0], rows[1], rows[4], //
        rows[2], rows[3], rows[5], //
        0.0, 0.0, 1.0,
    )
}

/// Flatten an affine back to `[a, b, c, d, tx, ty]` for the wire.
pub fn affine_to_rows(m: &Matrix3<f64>) -> [f64; 6] {
    [
        m[(0, 0)],
        m[(0, 1)],
        m[(1, 0)],
        m[(1, 1)],
        m[(0, 2)],
        m[(1, 2)],
    ]
}
