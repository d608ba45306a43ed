//! The mesh aggregate: one instance of each entity kind plus the mesh-wide
//! identity (coordinate system and rank within a decomposition).
//!
//! The mesh owns a root [`DsHandle`]; every entity is bound to a dedicated
//! child store registered there under the entity's name, so field names
//! only need to be unique within one entity.

use std::fmt;
use std::io::{Read, Write};

use itertools::izip;
use serde::{Deserialize, Serialize};

use crate::data::datastore::DsHandle;
use crate::data::field::Idx;
use crate::debug_invariants::{DebugInvariants, ensure};
use crate::entity::{
    Corners, Edges, Entity, EntityCore, EntityKind, Faces, Points, Sides, Zones, corners, faces,
    sides, zones,
};
use crate::geometry::metrics::{centroid, side_geometry};
use crate::geometry::{GeometryType, Vec3};
use crate::io::wire;
use crate::mesh_error::MeshError;

/// Spatial dimension of every mesh.
pub const NDIMS: usize = 3;

/// Mesh-wide identity fixed at construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshConfig {
    pub geometry: GeometryType,
    /// This process's rank in the decomposition.
    pub rank: usize,
    pub num_ranks: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            geometry: GeometryType::Cartesian,
            rank: 0,
            num_ranks: 1,
        }
    }
}

impl MeshConfig {
    /// # Errors
    /// [`MeshError::InvalidRank`] unless `rank < num_ranks`.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.rank >= self.num_ranks {
            return Err(MeshError::InvalidRank {
                rank: self.rank,
                num_ranks: self.num_ranks,
            });
        }
        Ok(())
    }
}

/// Counts of one entity kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStats {
    pub kind: EntityKind,
    pub local: usize,
    pub ghost: usize,
    pub total: usize,
}

/// Diagnostic summary of a mesh. Not part of mesh equality.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshStats {
    pub config: MeshConfig,
    /// One entry per kind, in serialization order.
    pub entities: Vec<EntityStats>,
    /// Bounding box of the local points.
    pub bounds: Option<(Vec3, Vec3)>,
    /// Sum of the local zone volumes.
    pub zone_volume: f64,
}

impl MeshStats {
    /// Counts for `kind`.
    pub fn entity(&self, kind: EntityKind) -> Option<&EntityStats> {
        self.entities.iter().find(|e| e.kind == kind)
    }
}

impl fmt::Display for MeshStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "mesh: geometry={} rank={}/{} ndims={NDIMS}",
            self.config.geometry, self.config.rank, self.config.num_ranks
        )?;
        for e in &self.entities {
            writeln!(
                f,
                "  {:<8} local={} ghost={} total={}",
                e.kind.name(),
                e.local,
                e.ghost,
                e.total
            )?;
        }
        match self.bounds {
            Some((lo, hi)) => writeln!(f, "  bounds   {lo} .. {hi}")?,
            None => writeln!(f, "  bounds   (no local points)")?,
        }
        writeln!(f, "  zone volume {:e}", self.zone_volume)
    }
}

/// A complete 3D mesh for one rank.
#[derive(Debug)]
pub struct Mesh {
    config: MeshConfig,
    ds: DsHandle,
    pub points: Points,
    pub edges: Edges,
    pub faces: Faces,
    pub zones: Zones,
    pub sides: Sides,
    pub corners: Corners,
}

fn bind<E: Entity>(root: &DsHandle) -> Result<E, MeshError> {
    let child = root.borrow_mut().make_child(E::KIND.name())?;
    E::new(child)
}

impl Mesh {
    /// Empty single-rank Cartesian mesh.
    pub fn new() -> Result<Self, MeshError> {
        Self::with_config(MeshConfig::default())
    }

    /// Empty mesh with the given identity.
    ///
    /// # Errors
    /// [`MeshError::InvalidRank`] if `config.rank >= config.num_ranks`.
    pub fn with_config(config: MeshConfig) -> Result<Self, MeshError> {
        config.validate()?;
        let ds = DsHandle::default();
        let mesh = Self {
            config,
            points: bind(&ds)?,
            edges: bind(&ds)?,
            faces: bind(&ds)?,
            zones: bind(&ds)?,
            sides: bind(&ds)?,
            corners: bind(&ds)?,
            ds,
        };
        log::debug!(
            "created {} mesh, rank {}/{}",
            config.geometry,
            config.rank,
            config.num_ranks
        );
        Ok(mesh)
    }

    pub fn config(&self) -> MeshConfig {
        self.config
    }

    pub fn geometry(&self) -> GeometryType {
        self.config.geometry
    }

    pub fn rank(&self) -> usize {
        self.config.rank
    }

    pub fn num_ranks(&self) -> usize {
        self.config.num_ranks
    }

    pub fn ndims(&self) -> usize {
        NDIMS
    }

    /// Root store; each entity's store is a child named after its kind.
    pub fn datastore(&self) -> &DsHandle {
        &self.ds
    }

    pub fn entity_core(&self, kind: EntityKind) -> &EntityCore {
        match kind {
            EntityKind::Points => self.points.core(),
            EntityKind::Edges => self.edges.core(),
            EntityKind::Faces => self.faces.core(),
            EntityKind::Zones => self.zones.core(),
            EntityKind::Sides => self.sides.core(),
            EntityKind::Corners => self.corners.core(),
        }
    }

    fn entity_core_mut(&mut self, kind: EntityKind) -> &mut EntityCore {
        match kind {
            EntityKind::Points => self.points.core_mut(),
            EntityKind::Edges => self.edges.core_mut(),
            EntityKind::Faces => self.faces.core_mut(),
            EntityKind::Zones => self.zones.core_mut(),
            EntityKind::Sides => self.sides.core_mut(),
            EntityKind::Corners => self.corners.core_mut(),
        }
    }

    /// Total element count of `kind`.
    pub fn total(&self, kind: EntityKind) -> usize {
        self.entity_core(kind).partition().total()
    }

    /// Write `[geometry u8][rank u32][num_ranks u32]` followed by every
    /// entity in [`EntityKind::ALL`] order.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<(), MeshError> {
        wire::write_u8(w, self.config.geometry.code())?;
        wire::write_count(w, self.config.rank)?;
        wire::write_count(w, self.config.num_ranks)?;
        for kind in EntityKind::ALL {
            self.entity_core(kind).write(w)?;
        }
        log::debug!("wrote mesh rank {}/{}", self.config.rank, self.config.num_ranks);
        Ok(())
    }

    /// Read a stream produced by [`write`](Self::write).
    ///
    /// All six entities are decoded before any is replaced, so a failure
    /// anywhere in the stream leaves the mesh unchanged.
    pub fn read<R: Read>(&mut self, r: &mut R) -> Result<(), MeshError> {
        let code = wire::read_u8(r, "mesh")?;
        let geometry = GeometryType::from_code(code)
            .ok_or_else(|| MeshError::format("mesh", format!("unknown geometry code {code}")))?;
        let config = MeshConfig {
            geometry,
            rank: wire::read_u32(r, "mesh")? as usize,
            num_ranks: wire::read_u32(r, "mesh")? as usize,
        };
        config
            .validate()
            .map_err(|e| MeshError::format("mesh", e.to_string()))?;
        let staged = EntityKind::ALL
            .into_iter()
            .map(|kind| self.entity_core(kind).decode(r))
            .collect::<Result<Vec<_>, _>>()?;
        for entity in staged {
            self.entity_core_mut(entity.kind()).commit(entity)?;
        }
        self.config = config;
        log::debug!("read mesh rank {}/{}", config.rank, config.num_ranks);
        crate::debug_invariants!(self.validate_invariants(), "Mesh::read");
        Ok(())
    }

    /// Counts, bounds and local zone volume.
    pub fn stats(&self) -> Result<MeshStats, MeshError> {
        let entities = EntityKind::ALL
            .into_iter()
            .map(|kind| -> Result<_, MeshError> {
                let p = self.entity_core(kind).checked_partition()?;
                Ok(EntityStats {
                    kind,
                    local: p.local(),
                    ghost: p.ghost(),
                    total: p.total(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MeshStats {
            config: self.config,
            entities,
            bounds: self.points.bounding_box()?,
            zone_volume: self.zones.local_volume()?,
        })
    }

    /// Print [`stats`](Self::stats) to `w` and log a one-line summary.
    pub fn print_stats<W: Write>(&self, w: &mut W) -> Result<(), MeshError> {
        let stats = self.stats()?;
        write!(w, "{stats}").map_err(|e| MeshError::Io(e.to_string()))?;
        log::info!(
            "mesh rank {}/{}: {} points, {} zones, {} sides, zone volume {:e}",
            self.config.rank,
            self.config.num_ranks,
            self.points.total(),
            self.zones.total(),
            self.sides.total(),
            stats.zone_volume
        );
        Ok(())
    }

    /// Check every index field against the size of the entity it points into.
    ///
    /// Fails first if any entity's counts disagree with its store length.
    pub fn validate_adjacency(&self) -> Result<(), MeshError> {
        for kind in EntityKind::ALL {
            self.entity_core(kind).checked_partition()?;
        }
        let totals = |kind| self.total(kind);
        self.points.check_references(totals)?;
        self.edges.check_references(totals)?;
        self.faces.check_references(totals)?;
        self.zones.check_references(totals)?;
        self.sides.check_references(totals)?;
        self.corners.check_references(totals)
    }

    /// Recompute the derived geometry from point coordinates and
    /// connectivity: face and zone centroids, side volumes and outward
    /// normals, zone volumes, and corner volumes (half of each side to each
    /// of its two corners).
    ///
    /// Sides missing a zone, face or endpoint get zero volume and normal.
    pub fn update_side_geometry(&mut self) -> Result<(), MeshError> {
        self.validate_adjacency()?;

        let face_centroids: Vec<Vec3> = {
            let coords = self.points.coords()?;
            let lists = self.faces.field::<Vec<Idx>>(faces::POINTS)?;
            lists
                .iter()
                .map(|l| centroid(l.iter().filter_map(|p| p.get()).map(|p| coords[p])))
                .collect()
        };
        self.faces
            .field_mut::<Vec3>(faces::CENTROID)?
            .copy_from_slice(&face_centroids);

        let zone_centroids: Vec<Vec3> = {
            let lists = self.zones.field::<Vec<Idx>>(zones::FACES)?;
            lists
                .iter()
                .map(|l| centroid(l.iter().filter_map(|f| f.get()).map(|f| face_centroids[f])))
                .collect()
        };
        self.zones
            .field_mut::<Vec3>(zones::CENTROID)?
            .copy_from_slice(&zone_centroids);

        let n_sides = self.sides.total();
        let mut side_vol = vec![0.0; n_sides];
        let mut side_normal = vec![Vec3::splat(0.0); n_sides];
        let mut zone_vol = vec![0.0; self.zones.total()];
        let mut corner_vol = vec![0.0; self.corners.total()];
        {
            let coords = self.points.coords()?;
            let zone = self.sides.field::<Idx>(sides::ZONE)?;
            let face = self.sides.field::<Idx>(sides::FACE)?;
            let p1 = self.sides.field::<Idx>(sides::P1)?;
            let p2 = self.sides.field::<Idx>(sides::P2)?;
            let c1 = self.sides.field::<Idx>(sides::C1)?;
            let c2 = self.sides.field::<Idx>(sides::C2)?;
            for (s, (z, f, a, b, ca, cb)) in
                izip!(&*zone, &*face, &*p1, &*p2, &*c1, &*c2).enumerate()
            {
                let (Some(z), Some(f), Some(a), Some(b)) = (z.get(), f.get(), a.get(), b.get())
                else {
                    continue;
                };
                let (vol, normal) =
                    side_geometry(zone_centroids[z], face_centroids[f], coords[a], coords[b]);
                side_vol[s] = vol;
                side_normal[s] = normal;
                zone_vol[z] += vol;
                for c in [ca, cb].into_iter().filter_map(|c| c.get()) {
                    corner_vol[c] += 0.5 * vol;
                }
            }
        }
        self.sides
            .field_mut::<f64>(sides::VOLUME)?
            .copy_from_slice(&side_vol);
        self.sides
            .field_mut::<Vec3>(sides::NORMAL)?
            .copy_from_slice(&side_normal);
        self.zones
            .field_mut::<f64>(zones::VOLUME)?
            .copy_from_slice(&zone_vol);
        self.corners
            .field_mut::<f64>(corners::VOLUME)?
            .copy_from_slice(&corner_vol);
        log::debug!(
            "updated geometry of {} sides over {} zones",
            n_sides,
            zone_vol.len()
        );
        Ok(())
    }
}

/// Equal when the identity matches and all six entities are equal.
impl PartialEq for Mesh {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config
            && self.points == other.points
            && self.edges == other.edges
            && self.faces == other.faces
            && self.zones == other.zones
            && self.sides == other.sides
            && self.corners == other.corners
    }
}

impl DebugInvariants for Mesh {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "Mesh");
    }

    fn validate_invariants(&self) -> Result<(), MeshError> {
        ensure(self.config.rank < self.config.num_ranks, || {
            format!("rank {} of {}", self.config.rank, self.config.num_ranks)
        })?;
        for kind in EntityKind::ALL {
            let core = self.entity_core(kind);
            ensure(self.ds.borrow().child(kind.name())?.ptr_eq(core.ds()), || {
                format!("{kind} is not bound to its child store")
            })?;
            core.validate_invariants()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::edges;
    use crate::entity::sides::SideLinks;
    use hashbrown::HashMap;
    use std::io::Cursor;

    const CUBE_FACES: [[u32; 4]; 6] = [
        [0, 4, 6, 2],
        [1, 3, 7, 5],
        [0, 1, 5, 4],
        [2, 6, 7, 3],
        [0, 2, 3, 1],
        [4, 5, 7, 6],
    ];

    fn ids(v: impl IntoIterator<Item = u32>) -> Vec<Idx> {
        v.into_iter().map(Idx::from).collect()
    }

    /// One unit-cube zone with full side/corner connectivity.
    fn unit_cube() -> Mesh {
        let mut m = Mesh::new().unwrap();
        m.points.resize(8, 8, 0).unwrap();
        {
            let mut c = m.points.coords_mut().unwrap();
            for (i, p) in c.iter_mut().enumerate() {
                *p = Vec3::new((i & 1) as f64, ((i >> 1) & 1) as f64, ((i >> 2) & 1) as f64);
            }
        }

        let mut edge_of: HashMap<(u32, u32), u32> = HashMap::new();
        for face in CUBE_FACES {
            for k in 0..4 {
                let (a, b) = (face[k], face[(k + 1) % 4]);
                let n = edge_of.len() as u32;
                edge_of.entry((a.min(b), a.max(b))).or_insert(n);
            }
        }
        m.edges.resize(12, 12, 0).unwrap();
        for (&(a, b), &e) in &edge_of {
            m.edges
                .set_endpoints(e as usize, Idx::from(a), Idx::from(b))
                .unwrap();
        }

        m.faces.resize(6, 6, 0).unwrap();
        m.zones.resize(1, 1, 0).unwrap();
        m.sides.resize(24, 24, 0).unwrap();
        m.corners.resize(8, 8, 0).unwrap();
        m.zones.set_faces(0, &ids(0..6)).unwrap();
        let edge_at = |f: usize, k: usize| {
            let face = CUBE_FACES[f];
            let (a, b) = (face[k], face[(k + 1) % 4]);
            edge_of[&(a.min(b), a.max(b))]
        };
        // Every cube edge is shared by exactly two sides of the zone.
        let mut sides_of_edge: HashMap<u32, Vec<u32>> = HashMap::new();
        for f in 0..6 {
            for k in 0..4 {
                sides_of_edge
                    .entry(edge_at(f, k))
                    .or_default()
                    .push((f * 4 + k) as u32);
            }
        }
        let mut corner_sides: Vec<Vec<u32>> = vec![Vec::new(); 8];
        for (f, face) in CUBE_FACES.iter().enumerate() {
            let edge = |k: usize| edge_at(f, k);
            m.faces
                .set_boundary(f, &ids(*face), &ids((0..4).map(edge)))
                .unwrap();
            m.faces.set_zones(f, Idx::from(0), Idx::NONE).unwrap();
            for k in 0..4 {
                let s = (f * 4 + k) as u32;
                let (a, b) = (face[k], face[(k + 1) % 4]);
                corner_sides[a as usize].push(s);
                corner_sides[b as usize].push(s);
                let links = SideLinks {
                    zone: Idx::from(0),
                    face: Idx::from(f as u32),
                    edge: Idx::from(edge(k)),
                    p1: Idx::from(a),
                    p2: Idx::from(b),
                    c1: Idx::from(a),
                    c2: Idx::from(b),
                    s2: Idx::from(
                        sides_of_edge[&edge(k)]
                            .iter()
                            .copied()
                            .find(|&o| o != s)
                            .unwrap(),
                    ),
                    s4: Idx::NONE,
                };
                m.sides.set_links(s as usize, links).unwrap();
            }
        }
        for (c, list) in corner_sides.into_iter().enumerate() {
            m.corners
                .set_anchor(c, Idx::from(0), Idx::from(c as u32))
                .unwrap();
            m.corners.set_sides(c, &ids(list)).unwrap();
        }
        m
    }

    #[test]
    fn default_identity() {
        let m = Mesh::new().unwrap();
        assert_eq!(m.geometry(), GeometryType::Cartesian);
        assert_eq!((m.rank(), m.num_ranks()), (0, 1));
        assert_eq!(m.ndims(), 3);
        assert_eq!(m.datastore().borrow().children().count(), 6);
        m.validate_invariants().unwrap();
    }

    #[test]
    fn rejects_invalid_rank() {
        let cfg = MeshConfig {
            rank: 4,
            num_ranks: 4,
            ..MeshConfig::default()
        };
        assert_eq!(
            Mesh::with_config(cfg).unwrap_err(),
            MeshError::InvalidRank {
                rank: 4,
                num_ranks: 4
            }
        );
    }

    #[test]
    fn checkpoint_round_trip_and_stats() {
        let cfg = MeshConfig {
            geometry: GeometryType::Cartesian,
            rank: 0,
            num_ranks: 4,
        };
        let mut m = Mesh::with_config(cfg).unwrap();
        m.points.resize(8, 10, 2).unwrap();
        m.edges.resize(8, 10, 2).unwrap();
        m.faces.resize(8, 10, 2).unwrap();
        m.zones.resize(8, 10, 2).unwrap();
        m.sides.resize(8, 10, 2).unwrap();
        m.corners.resize(8, 10, 2).unwrap();
        m.points.coords_mut().unwrap()[3] = Vec3::new(1.0, -2.0, 0.5);

        let mut buf = Vec::new();
        m.write(&mut buf).unwrap();
        let mut back = Mesh::new().unwrap();
        back.read(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(back, m);
        assert_eq!(back.num_ranks(), 4);

        let mut out = Vec::new();
        back.print_stats(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("total=10").count(), 6);
        assert!(text.contains("CARTESIAN"));
    }

    #[test]
    fn single_value_difference_breaks_equality() {
        let mut a = Mesh::new().unwrap();
        a.edges.resize(2, 2, 0).unwrap();
        let mut buf = Vec::new();
        a.write(&mut buf).unwrap();
        let mut b = Mesh::new().unwrap();
        b.read(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(a, b);
        b.edges.field_mut::<Idx>(edges::P2).unwrap()[1] = Idx::from(7);
        assert_ne!(a, b);
        assert_ne!(b, a);
    }

    #[test]
    fn read_rejects_bad_rank_header() {
        let mut buf = Vec::new();
        Mesh::new().unwrap().write(&mut buf).unwrap();
        buf[1] = 9;
        let err = Mesh::new().unwrap().read(&mut Cursor::new(&buf)).unwrap_err();
        assert!(matches!(err, MeshError::Format { ref context, .. } if context == "mesh"));
    }

    #[test]
    fn unit_cube_geometry() {
        let mut m = unit_cube();
        m.validate_adjacency().unwrap();
        m.update_side_geometry().unwrap();

        let zc = m.zones.centroids().unwrap()[0];
        assert!(zc.bit_eq(&Vec3::splat(0.5)));
        let zone_vol = m.zones.volumes().unwrap()[0];
        assert!((zone_vol - 1.0).abs() < 1e-12);
        for &v in m.sides.volumes().unwrap().iter() {
            assert!((v - 1.0 / 24.0).abs() < 1e-14);
        }
        for &v in m.corners.volumes().unwrap().iter() {
            assert!((v - 0.125).abs() < 1e-14);
        }
        // Face 1 is the x = 1 face.
        for n in &m.sides.normals().unwrap()[4..8] {
            assert!((*n - Vec3::new(1.0, 0.0, 0.0)).magnitude() < 1e-14);
        }
        let stats = m.stats().unwrap();
        assert_eq!(stats.bounds, Some((Vec3::splat(0.0), Vec3::splat(1.0))));
        assert!((stats.zone_volume - 1.0).abs() < 1e-12);
    }

    #[test]
    fn stale_store_is_reported_not_panicked_on() {
        let mut m = Mesh::new().unwrap();
        m.points.resize(4, 4, 0).unwrap();
        m.zones.resize(2, 2, 0).unwrap();
        let points = m.datastore().borrow().child(EntityKind::Points.name()).unwrap();
        points.borrow_mut().resize(1).unwrap();

        let mut out = Vec::new();
        assert!(matches!(m.print_stats(&mut out), Err(MeshError::InvariantViolation(_))));
        assert!(out.is_empty());
        let mut buf = Vec::new();
        assert!(matches!(m.write(&mut buf), Err(MeshError::InvariantViolation(_))));
        assert!(matches!(m.validate_adjacency(), Err(MeshError::InvariantViolation(_))));
        assert!(matches!(
            m.update_side_geometry(),
            Err(MeshError::InvariantViolation(_))
        ));

        let zones = m.datastore().borrow().child(EntityKind::Zones.name()).unwrap();
        zones.borrow_mut().resize(5).unwrap();
        m.points.resize(4, 4, 0).unwrap();
        assert!(matches!(m.stats(), Err(MeshError::InvariantViolation(_))));
    }

    #[test]
    fn failed_read_leaves_mesh_unchanged() {
        let mut m = unit_cube();
        m.update_side_geometry().unwrap();
        let mut before = Vec::new();
        m.write(&mut before).unwrap();

        let mut other = Mesh::with_config(MeshConfig {
            rank: 1,
            num_ranks: 2,
            ..MeshConfig::default()
        })
        .unwrap();
        other.points.resize(3, 5, 2).unwrap();
        other.zones.resize(7, 7, 0).unwrap();
        other.sides.resize(2, 2, 0).unwrap();
        let mut buf = Vec::new();
        other.write(&mut buf).unwrap();
        // Every entity but the last decodes before the stream runs out.
        buf.truncate(buf.len() - 40);

        assert!(matches!(
            m.read(&mut Cursor::new(&buf)),
            Err(MeshError::Format { .. })
        ));
        let mut expected = Mesh::new().unwrap();
        expected.read(&mut Cursor::new(&before)).unwrap();
        assert_eq!(m, expected);
        assert_eq!(m.points.total(), 8);
        assert_eq!(m.rank(), 0);
    }

    #[test]
    fn dangling_reference_blocks_geometry_update() {
        let mut m = unit_cube();
        m.sides.field_mut::<Idx>(sides::C1).unwrap()[0] = Idx::from(8);
        assert!(matches!(
            m.update_side_geometry(),
            Err(MeshError::InvariantViolation(_))
        ));
    }
}
