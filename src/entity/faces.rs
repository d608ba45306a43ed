//! Faces: polygons separating two zones (or bounding one).

use std::cell::Ref;

use super::{Entity, EntityCore, EntityKind, FieldSpec, Reference};
use crate::data::field::{FieldType, Idx};
use crate::geometry::Vec3;
use crate::mesh_error::MeshError;

/// Bounding points, ordered around the face.
pub const POINTS: &str = "points";
/// Bounding edges, in the same cyclic order as `points`.
pub const EDGES: &str = "edges";
/// Zone on the inner side of the face.
pub const Z1: &str = "z1";
/// Zone on the outer side; [`Idx::NONE`] on a mesh boundary.
pub const Z2: &str = "z2";
/// Face centroid (derived).
pub const CENTROID: &str = "centroid";

/// SoA representation of mesh faces.
#[derive(Debug, PartialEq)]
pub struct Faces {
    core: EntityCore,
}

impl Entity for Faces {
    const KIND: EntityKind = EntityKind::Faces;
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::new(POINTS, FieldType::IndexList),
        FieldSpec::new(EDGES, FieldType::IndexList),
        FieldSpec::new(Z1, FieldType::Index),
        FieldSpec::new(Z2, FieldType::Index),
        FieldSpec::new(CENTROID, FieldType::Vec3),
    ];
    const REFERENCES: &'static [Reference] = &[
        Reference::new(POINTS, EntityKind::Points),
        Reference::new(EDGES, EntityKind::Edges),
        Reference::new(Z1, EntityKind::Zones),
        Reference::new(Z2, EntityKind::Zones),
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

impl Faces {
    /// Set the bounding point and edge lists of face `f`.
    pub fn set_boundary(&self, f: usize, points: &[Idx], edges: &[Idx]) -> Result<(), MeshError> {
        self.field_mut::<Vec<Idx>>(POINTS)?.set(f, points)?;
        self.field_mut::<Vec<Idx>>(EDGES)?.set(f, edges)
    }

    /// Bounding points of face `f`.
    pub fn points_of(&self, f: usize) -> Result<Vec<Idx>, MeshError> {
        let lists = self.field::<Vec<Idx>>(POINTS)?;
        lists
            .get(f)
            .map(<[Idx]>::to_vec)
            .ok_or_else(|| MeshError::IndexOutOfRange {
                name: POINTS.into(),
                index: f,
                len: lists.len(),
            })
    }

    /// Set the two zones adjacent to face `f`.
    pub fn set_zones(&self, f: usize, z1: Idx, z2: Idx) -> Result<(), MeshError> {
        self.set_value(Z1, f, z1)?;
        self.set_value(Z2, f, z2)
    }

    /// True if face `f` has no zone on its outer side.
    pub fn is_boundary(&self, f: usize) -> Result<bool, MeshError> {
        Ok(self.value::<Idx>(Z2, f)?.is_none())
    }

    pub fn centroids(&self) -> Result<Ref<'_, [Vec3]>, MeshError> {
        self.field::<Vec3>(CENTROID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[i32]) -> Vec<Idx> {
        v.iter().copied().map(Idx::from_raw).collect()
    }

    #[test]
    fn boundary_lists_and_zones() {
        let mut f = Faces::standalone().unwrap();
        f.resize(2, 2, 0).unwrap();
        f.set_boundary(1, &ids(&[0, 1, 3, 2]), &ids(&[0, 1, 2, 3]))
            .unwrap();
        assert_eq!(f.points_of(1).unwrap(), ids(&[0, 1, 3, 2]));
        assert!(f.points_of(0).unwrap().is_empty());
        f.set_zones(0, Idx::from_raw(0), Idx::from_raw(1)).unwrap();
        f.set_zones(1, Idx::from_raw(0), Idx::NONE).unwrap();
        assert!(!f.is_boundary(0).unwrap());
        assert!(f.is_boundary(1).unwrap());
        assert!(f.is_boundary(2).is_err());
    }
}
