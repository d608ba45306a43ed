//! Points: mesh vertices and their coordinates.

use std::cell::{Ref, RefMut};

use super::{Entity, EntityCore, EntityKind, FieldSpec, Reference};
use crate::data::field::FieldType;
use crate::geometry::Vec3;
use crate::mesh_error::MeshError;

/// Point coordinates.
pub const COORD: &str = "coord";

/// Struct-of-arrays representation of mesh points.
#[derive(Debug, PartialEq)]
pub struct Points {
    core: EntityCore,
}

impl Entity for Points {
    const KIND: EntityKind = EntityKind::Points;
    const SCHEMA: &'static [FieldSpec] = &[FieldSpec::new(COORD, FieldType::Vec3)];
    const REFERENCES: &'static [Reference] = &[];

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

impl Points {
    pub fn coords(&self) -> Result<Ref<'_, [Vec3]>, MeshError> {
        self.field::<Vec3>(COORD)
    }

    pub fn coords_mut(&self) -> Result<RefMut<'_, [Vec3]>, MeshError> {
        self.field_mut::<Vec3>(COORD)
    }

    /// Axis-aligned bounding box `(min, max)` of the local points, or
    /// `None` when there are none.
    pub fn bounding_box(&self) -> Result<Option<(Vec3, Vec3)>, MeshError> {
        let local = self.checked_partition()?.local();
        let coords = self.coords()?;
        let local = coords.get(..local).ok_or_else(|| MeshError::IndexOutOfRange {
            name: COORD.into(),
            index: local,
            len: coords.len(),
        })?;
        let Some(first) = local.first() else {
            return Ok(None);
        };
        let (mut lo, mut hi) = (*first, *first);
        for p in &local[1..] {
            for d in 0..3 {
                lo[d] = lo[d].min(p[d]);
                hi[d] = hi[d].max(p[d]);
            }
        }
        Ok(Some((lo, hi)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_ignores_ghosts() {
        let mut p = Points::standalone().unwrap();
        assert_eq!(p.bounding_box().unwrap(), None);
        p.resize(2, 3, 1).unwrap();
        {
            let mut c = p.coords_mut().unwrap();
            c[0] = Vec3::new(0.0, 1.0, -1.0);
            c[1] = Vec3::new(2.0, -3.0, 4.0);
            c[2] = Vec3::splat(100.0);
        }
        assert_eq!(
            p.bounding_box().unwrap(),
            Some((Vec3::new(0.0, -3.0, -1.0), Vec3::new(2.0, 1.0, 4.0)))
        );
    }
}
