//! Sides: the tetrahedral sub-zone spanned by a zone centroid, a face
//! centroid and one edge of that face.
//!
//! Each side knows its zone, face and edge, the edge's two endpoints, the
//! two corners it touches, its neighbour across the edge within the same
//! zone (`s2`) and its mirror across the face in the neighbour zone (`s4`).

use std::cell::Ref;

use super::{Entity, EntityCore, EntityKind, FieldSpec, Reference};
use crate::data::field::{FieldType, Idx};
use crate::geometry::Vec3;
use crate::mesh_error::MeshError;

pub const ZONE: &str = "zone";
pub const FACE: &str = "face";
pub const EDGE: &str = "edge";
pub const P1: &str = "p1";
pub const P2: &str = "p2";
/// Corner at `p1`.
pub const C1: &str = "c1";
/// Corner at `p2`.
pub const C2: &str = "c2";
/// Side of the same zone on the other face through this edge.
pub const S2: &str = "s2";
/// Side of the neighbour zone on the same face and edge; [`Idx::NONE`] on a
/// boundary face.
pub const S4: &str = "s4";
/// Side volume (derived).
pub const VOLUME: &str = "volume";
/// Unit outward normal of the side's face triangle (derived).
pub const NORMAL: &str = "normal";

const LINKS: [&str; 9] = [ZONE, FACE, EDGE, P1, P2, C1, C2, S2, S4];

/// Index fields of one side, in a single value.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SideLinks {
    pub zone: Idx,
    pub face: Idx,
    pub edge: Idx,
    pub p1: Idx,
    pub p2: Idx,
    pub c1: Idx,
    pub c2: Idx,
    pub s2: Idx,
    pub s4: Idx,
}

impl SideLinks {
    fn to_array(self) -> [Idx; 9] {
        [
            self.zone, self.face, self.edge, self.p1, self.p2, self.c1, self.c2, self.s2, self.s4,
        ]
    }

    fn from_array(a: [Idx; 9]) -> Self {
        let [zone, face, edge, p1, p2, c1, c2, s2, s4] = a;
        Self {
            zone,
            face,
            edge,
            p1,
            p2,
            c1,
            c2,
            s2,
            s4,
        }
    }
}

/// SoA representation of mesh sides.
#[derive(Debug, PartialEq)]
pub struct Sides {
    core: EntityCore,
}

impl Entity for Sides {
    const KIND: EntityKind = EntityKind::Sides;
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::new(ZONE, FieldType::Index),
        FieldSpec::new(FACE, FieldType::Index),
        FieldSpec::new(EDGE, FieldType::Index),
        FieldSpec::new(P1, FieldType::Index),
        FieldSpec::new(P2, FieldType::Index),
        FieldSpec::new(C1, FieldType::Index),
        FieldSpec::new(C2, FieldType::Index),
        FieldSpec::new(S2, FieldType::Index),
        FieldSpec::new(S4, FieldType::Index),
        FieldSpec::new(VOLUME, FieldType::Real),
        FieldSpec::new(NORMAL, FieldType::Vec3),
    ];
    const REFERENCES: &'static [Reference] = &[
        Reference::new(ZONE, EntityKind::Zones),
        Reference::new(FACE, EntityKind::Faces),
        Reference::new(EDGE, EntityKind::Edges),
        Reference::new(P1, EntityKind::Points),
        Reference::new(P2, EntityKind::Points),
        Reference::new(C1, EntityKind::Corners),
        Reference::new(C2, EntityKind::Corners),
        Reference::new(S2, EntityKind::Sides),
        Reference::new(S4, EntityKind::Sides),
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

impl Sides {
    /// All index fields of side `s`.
    pub fn links(&self, s: usize) -> Result<SideLinks, MeshError> {
        let mut out = [Idx::NONE; 9];
        for (slot, name) in out.iter_mut().zip(LINKS) {
            *slot = self.value(name, s)?;
        }
        Ok(SideLinks::from_array(out))
    }

    /// Overwrite all index fields of side `s`.
    pub fn set_links(&self, s: usize, links: SideLinks) -> Result<(), MeshError> {
        // Columns of one store share a length, so checking one covers all.
        self.value::<Idx>(ZONE, s)?;
        for (value, name) in links.to_array().into_iter().zip(LINKS) {
            self.set_value(name, s, value)?;
        }
        Ok(())
    }

    pub fn volumes(&self) -> Result<Ref<'_, [f64]>, MeshError> {
        self.field::<f64>(VOLUME)
    }

    pub fn normals(&self) -> Result<Ref<'_, [Vec3]>, MeshError> {
        self.field::<Vec3>(NORMAL)
    }
}
