//! Zones: the control volumes (cells) of the mesh.

use std::cell::Ref;

use super::{Entity, EntityCore, EntityKind, FieldSpec, Reference};
use crate::data::field::{FieldType, Idx};
use crate::geometry::Vec3;
use crate::mesh_error::MeshError;

/// Zone centroid.
pub const CENTROID: &str = "centroid";
/// Zone volume.
pub const VOLUME: &str = "volume";
/// Bounding faces.
pub const FACES: &str = "faces";

/// SoA representation of mesh zones.
#[derive(Debug, PartialEq)]
pub struct Zones {
    core: EntityCore,
}

impl Entity for Zones {
    const KIND: EntityKind = EntityKind::Zones;
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::new(CENTROID, FieldType::Vec3),
        FieldSpec::new(VOLUME, FieldType::Real),
        FieldSpec::new(FACES, FieldType::IndexList),
    ];
    const REFERENCES: &'static [Reference] = &[Reference::new(FACES, EntityKind::Faces)];

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

impl Zones {
    pub fn centroids(&self) -> Result<Ref<'_, [Vec3]>, MeshError> {
        self.field::<Vec3>(CENTROID)
    }

    pub fn volumes(&self) -> Result<Ref<'_, [f64]>, MeshError> {
        self.field::<f64>(VOLUME)
    }

    /// Set the bounding faces of zone `z`.
    pub fn set_faces(&self, z: usize, faces: &[Idx]) -> Result<(), MeshError> {
        self.field_mut::<Vec<Idx>>(FACES)?.set(z, faces)
    }

    /// Sum of the volumes of the locally owned zones.
    pub fn local_volume(&self) -> Result<f64, MeshError> {
        let local = self.checked_partition()?.local();
        let volumes = self.volumes()?;
        volumes
            .get(..local)
            .map(|v| v.iter().sum::<f64>())
            .ok_or_else(|| MeshError::IndexOutOfRange {
                name: VOLUME.into(),
                index: local,
                len: volumes.len(),
            })
    }
}
