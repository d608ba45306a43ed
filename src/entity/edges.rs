//! Edges: segments connecting two points.

use super::{Entity, EntityCore, EntityKind, FieldSpec, Reference};
use crate::data::field::{FieldType, Idx};
use crate::mesh_error::MeshError;

/// First endpoint.
pub const P1: &str = "p1";
/// Second endpoint.
pub const P2: &str = "p2";

/// SoA representation of mesh edges.
#[derive(Debug, PartialEq)]
pub struct Edges {
    core: EntityCore,
}

impl Entity for Edges {
    const KIND: EntityKind = EntityKind::Edges;
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::new(P1, FieldType::Index),
        FieldSpec::new(P2, FieldType::Index),
    ];
    const REFERENCES: &'static [Reference] = &[
        Reference::new(P1, EntityKind::Points),
        Reference::new(P2, EntityKind::Points),
    ];

    fn from_core(core: EntityCore) -> Self {
        Self { core }
    }

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }
}

impl Edges {
    /// Endpoints of edge `e`.
    pub fn endpoints(&self, e: usize) -> Result<(Idx, Idx), MeshError> {
        Ok((self.value(P1, e)?, self.value(P2, e)?))
    }

    /// Set the endpoints of edge `e`.
    pub fn set_endpoints(&self, e: usize, a: Idx, b: Idx) -> Result<(), MeshError> {
        self.set_value(P1, e, a)?;
        self.set_value(P2, e, b)
    }
}
