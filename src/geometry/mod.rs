//! Geometry utilities for soa-mesh.
//!
//! This module provides the [`Vector3`](vector::Vector3) value type and the
//! small tetrahedron/triangle kernels used to derive side and corner
//! quantities from point coordinates.

pub mod metrics;
pub mod vector;

pub use vector::{Vec3, Vector3, crossprod, dotprod, normalize};

/// Coordinate system of a mesh. Fixed for the mesh's lifetime.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum GeometryType {
    #[default]
    Cartesian,
    Cylindrical,
    Spherical,
}

impl GeometryType {
    /// Stable wire code.
    pub fn code(self) -> u8 {
        match self {
            GeometryType::Cartesian => 0,
            GeometryType::Cylindrical => 1,
            GeometryType::Spherical => 2,
        }
    }

    /// Decode a wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(GeometryType::Cartesian),
            1 => Some(GeometryType::Cylindrical),
            2 => Some(GeometryType::Spherical),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GeometryType::Cartesian => "CARTESIAN",
            GeometryType::Cylindrical => "CYLINDRICAL",
            GeometryType::Spherical => "SPHERICAL",
        }
    }
}

impl std::fmt::Display for GeometryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
