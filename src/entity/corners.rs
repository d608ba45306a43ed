//! Corners: the part of a zone attached to one of its points.

use std::cell::Ref;

use super::{Entity, EntityCore, EntityKind, FieldSpec, Reference};
use crate::data::field::{FieldType, Idx};
use crate::mesh_error::MeshError;

pub const ZONE: &str = "zone";
pub const POINT: &str = "point";
/// Sides touching this corner.
pub const SIDES: &str = "sides";
/// Zone edges meeting at the corner's point.
pub const EDGES: &str = "edges";
/// Zone faces meeting at the corner's point.
pub const FACES: &str = "faces";
/// Corner volume (derived).
pub const VOLUME: &str = "volume";

/// SoA representation of mesh corners.
#[derive(Debug, PartialEq)]
pub struct Corners {
    core: EntityCore,
}

impl Entity for Corners {
    const KIND: EntityKind = EntityKind::Corners;
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::new(ZONE, FieldType::Index),
        FieldSpec::new(POINT, FieldType::Index),
        FieldSpec::new(SIDES, FieldType::IndexList),
        FieldSpec::new(EDGES, FieldType::IndexList),
        FieldSpec::new(FACES, FieldType::IndexList),
        FieldSpec::new(VOLUME, FieldType::Real),
    ];
    const REFERENCES: &'static [Reference] = &[
        Reference::new(ZONE, EntityKind::Zones),
        Reference::new(POINT, EntityKind::Points),
        Reference::new(SIDES, EntityKind::Sides),
        Reference::new(EDGES, EntityKind::Edges),
        Reference::new(FACES, EntityKind::Faces),
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

impl Corners {
    /// Zone and point of corner `c`.
    pub fn anchor(&self, c: usize) -> Result<(Idx, Idx), MeshError> {
        Ok((self.value(ZONE, c)?, self.value(POINT, c)?))
    }

    pub fn set_anchor(&self, c: usize, zone: Idx, point: Idx) -> Result<(), MeshError> {
        self.set_value(ZONE, c, zone)?;
        self.set_value(POINT, c, point)
    }

    /// Set the side list of corner `c`.
    pub fn set_sides(&self, c: usize, sides: &[Idx]) -> Result<(), MeshError> {
        self.field_mut::<Vec<Idx>>(SIDES)?.set(c, sides)
    }

    /// Set the edge list of corner `c`.
    pub fn set_edges(&self, c: usize, edges: &[Idx]) -> Result<(), MeshError> {
        self.field_mut::<Vec<Idx>>(EDGES)?.set(c, edges)
    }

    /// Set the face list of corner `c`.
    pub fn set_faces(&self, c: usize, faces: &[Idx]) -> Result<(), MeshError> {
        self.field_mut::<Vec<Idx>>(FACES)?.set(c, faces)
    }

    pub fn volumes(&self) -> Result<Ref<'_, [f64]>, MeshError> {
        self.field::<f64>(VOLUME)
    }
}
