//! Mesh entities: the uniform lifecycle contract and the six collections.
//!
//! Every entity kind is a fixed field schema over its own [`Datastore`]
//! (reached through a shared [`DsHandle`]) plus the local/ghost/total split
//! of the current decomposition. The behaviour shared by all kinds (resize,
//! serialization, equality, reference checking) lives in [`EntityCore`] and
//! the provided methods of [`Entity`]; the concrete types only declare their
//! schema and add typed accessors.
//!
//! Connectivity is stored as [`Idx`] fields: non-owning positions into the
//! target entity's arrays. Resize only appends or truncates at the end, so
//! surviving indices stay valid as long as their targets survive.

pub mod corners;
pub mod edges;
pub mod faces;
pub mod points;
pub mod sides;
pub mod zones;

pub use corners::Corners;
pub use edges::Edges;
pub use faces::Faces;
pub use points::Points;
pub use sides::Sides;
pub use zones::Zones;

use std::cell::{Ref, RefMut};
use std::fmt;
use std::io::{Read, Write};
use std::ops::Range;

use crate::data::datastore::{Datastore, DsHandle};
use crate::data::field::{FieldElement, FieldType, Idx};
use crate::debug_invariants::{DebugInvariants, ensure};
use crate::io::wire;
use crate::mesh_error::MeshError;

/// The six geometric mesh-part kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EntityKind {
    Points,
    Edges,
    Faces,
    Zones,
    Sides,
    Corners,
}

impl EntityKind {
    /// All kinds in mesh serialization order.
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Corners,
        EntityKind::Edges,
        EntityKind::Faces,
        EntityKind::Points,
        EntityKind::Sides,
        EntityKind::Zones,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Points => "points",
            EntityKind::Edges => "edges",
            EntityKind::Faces => "faces",
            EntityKind::Zones => "zones",
            EntityKind::Sides => "sides",
            EntityKind::Corners => "corners",
        }
    }

    /// One-byte wire code.
    pub fn code(self) -> u8 {
        match self {
            EntityKind::Points => 1,
            EntityKind::Edges => 2,
            EntityKind::Faces => 3,
            EntityKind::Zones => 4,
            EntityKind::Sides => 5,
            EntityKind::Corners => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        EntityKind::ALL.into_iter().find(|k| k.code() == code)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Local/ghost/total element counts of one rank's share of an entity.
///
/// Elements `[0, local)` are owned by this rank, `[local, total)` are ghost
/// mirrors of elements owned elsewhere.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Partition {
    local: usize,
    ghost: usize,
    total: usize,
}

impl Partition {
    /// Validate and build a partition.
    ///
    /// # Errors
    /// [`MeshError::InvalidPartition`] unless `total == local + ghost`.
    pub fn new(local: usize, total: usize, ghost: usize) -> Result<Self, MeshError> {
        if local.checked_add(ghost) != Some(total) {
            return Err(MeshError::InvalidPartition {
                local,
                total,
                ghost,
            });
        }
        Ok(Self {
            local,
            ghost,
            total,
        })
    }

    /// All elements owned, no ghosts.
    pub fn owned(n: usize) -> Self {
        Self {
            local: n,
            ghost: 0,
            total: n,
        }
    }

    #[inline]
    pub fn local(&self) -> usize {
        self.local
    }

    #[inline]
    pub fn ghost(&self) -> usize {
        self.ghost
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn local_range(&self) -> Range<usize> {
        0..self.local
    }

    pub fn ghost_range(&self) -> Range<usize> {
        self.local..self.total
    }

    /// True if element `i` is a ghost mirror on this rank.
    pub fn is_ghost(&self, i: usize) -> bool {
        self.ghost_range().contains(&i)
    }
}

/// Communication classification stored in every entity's `comm_type` field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum CommType {
    /// Owned and not seen by any other rank.
    Internal = 0,
    /// Owned, and mirrored as a ghost on some neighbor rank.
    Boundary = 1,
    /// Mirror of an element owned by another rank.
    Ghost = 2,
}

/// Name and type of one schema field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
}

impl FieldSpec {
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self { name, ty }
    }
}

/// An index field and the entity kind its values point into.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub target: EntityKind,
}

impl Reference {
    pub const fn new(field: &'static str, target: EntityKind) -> Self {
        Self { field, target }
    }
}

/// 1 for an active element, 0 for one masked out of computation.
pub const MASK: &str = "mask";
/// [`CommType`] of each element.
pub const COMM_TYPE: &str = "comm_type";

/// Fields declared on every entity ahead of its own schema.
pub const COMMON_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(MASK, FieldType::Int),
    FieldSpec::new(COMM_TYPE, FieldType::Int),
];

/// State shared by every entity kind: its store and its partition.
pub struct EntityCore {
    kind: EntityKind,
    ds: DsHandle,
    partition: Partition,
}

impl EntityCore {
    /// Bind `kind` to `ds` and declare the common fields followed by `schema`.
    ///
    /// Every name is checked before any is declared, so a failed bind
    /// leaves `ds` untouched.
    ///
    /// # Errors
    /// [`MeshError::NameConflict`] if `ds` already declares one of the names
    /// or `schema` repeats one.
    pub fn new(kind: EntityKind, ds: DsHandle, schema: &[FieldSpec]) -> Result<Self, MeshError> {
        let len = {
            let mut store = ds.borrow_mut();
            let specs: Vec<&FieldSpec> = COMMON_FIELDS.iter().chain(schema).collect();
            let clash = specs.iter().enumerate().find(|&(i, spec)| {
                store.contains(spec.name) || specs[..i].iter().any(|o| o.name == spec.name)
            });
            if let Some((_, spec)) = clash {
                return Err(MeshError::NameConflict {
                    name: spec.name.into(),
                });
            }
            for spec in specs {
                store.declare(spec.name, spec.ty)?;
            }
            store.len()
        };
        Ok(Self {
            kind,
            ds,
            partition: Partition::owned(len),
        })
    }

    #[inline]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    #[inline]
    pub fn ds(&self) -> &DsHandle {
        &self.ds
    }

    #[inline]
    pub fn partition(&self) -> Partition {
        self.partition
    }

    /// The partition, after confirming the store still holds `total`
    /// elements. The store can be resized directly through its handle,
    /// which leaves the counts stale until the next [`resize`](Self::resize).
    ///
    /// # Errors
    /// [`MeshError::InvariantViolation`] when the lengths disagree.
    pub fn checked_partition(&self) -> Result<Partition, MeshError> {
        let len = self.ds.borrow().len();
        if len != self.partition.total {
            log::warn!(
                "{} store holds {len} elements but the entity expects {}",
                self.kind,
                self.partition.total
            );
            return Err(MeshError::InvariantViolation(format!(
                "{}: store holds {len} elements, total is {}",
                self.kind, self.partition.total
            )));
        }
        Ok(self.partition)
    }

    /// Resize the store to `total` and record the local/ghost split.
    ///
    /// Existing values are untouched. Elements created by the resize start
    /// active (`mask = 1`) and classified [`CommType::Ghost`] when they fall
    /// in the ghost range. The store's own length decides which elements
    /// are new, so a resize also brings stale counts back in step.
    pub fn resize(&mut self, local: usize, total: usize, ghost: usize) -> Result<(), MeshError> {
        let partition = Partition::new(local, total, ghost)?;
        {
            let mut ds = self.ds.borrow_mut();
            let old_len = ds.len();
            ds.resize(total)?;
            if total > old_len {
                ds.field_mut::<i32>(MASK)?[old_len..].fill(1);
                let comm = ds.field_mut::<i32>(COMM_TYPE)?;
                for (i, c) in comm.iter_mut().enumerate().skip(old_len) {
                    *c = if partition.is_ghost(i) {
                        CommType::Ghost as i32
                    } else {
                        CommType::Internal as i32
                    };
                }
            }
        }
        log::debug!("resize {}: local={local} ghost={ghost} total={total}", self.kind);
        self.partition = partition;
        crate::debug_invariants!(self.validate_invariants(), "EntityCore::resize");
        Ok(())
    }

    /// Write `[kind u8][local u64][ghost u64][total u64]` then the store.
    ///
    /// # Errors
    /// [`MeshError::InvariantViolation`] if the store length no longer
    /// matches the partition; nothing is written then.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<(), MeshError> {
        let partition = self.checked_partition()?;
        log::trace!("write {} ({} elements)", self.kind, partition.total);
        wire::write_u8(w, self.kind.code())?;
        wire::write_u64(w, partition.local as u64)?;
        wire::write_u64(w, partition.ghost as u64)?;
        wire::write_u64(w, partition.total as u64)?;
        self.ds.borrow().write(w).map_err(|e| e.within(self.kind.name()))
    }

    /// Read data produced by [`write`](Self::write) for the same schema.
    ///
    /// On error the entity is unchanged.
    pub fn read<R: Read>(&mut self, r: &mut R) -> Result<(), MeshError> {
        let staged = self.decode(r)?;
        self.commit(staged)
    }

    /// First half of [`read`](Self::read): decode a stream into a scratch
    /// store with this entity's schema, leaving the entity untouched.
    pub fn decode<R: Read>(&self, r: &mut R) -> Result<StagedEntity, MeshError> {
        let ctx = self.kind.name();
        let code = wire::read_u8(r, ctx)?;
        if code != self.kind.code() {
            let found = EntityKind::from_code(code)
                .map(EntityKind::name)
                .unwrap_or("unknown");
            return Err(MeshError::format(
                ctx,
                format!("stream holds {found} (code {code})"),
            ));
        }
        let local = wire::read_len(r, ctx)?;
        let ghost = wire::read_len(r, ctx)?;
        let total = wire::read_len(r, ctx)?;
        let partition = Partition::new(local, total, ghost)
            .map_err(|e| MeshError::format(ctx, e.to_string()))?;
        let mut store = self.ds.borrow().clone_schema();
        store
            .read_expecting(r, Some(total))
            .map_err(|e| e.within(ctx))?;
        log::debug!("decoded {ctx}: local={local} ghost={ghost} total={total}");
        Ok(StagedEntity {
            kind: self.kind,
            partition,
            store,
        })
    }

    /// Second half of [`read`](Self::read): install a decoded stream.
    ///
    /// # Errors
    /// [`MeshError::InvariantViolation`] if `staged` was decoded for another
    /// kind or another schema; the entity is unchanged then.
    pub fn commit(&mut self, staged: StagedEntity) -> Result<(), MeshError> {
        ensure(staged.kind == self.kind, || {
            format!("{} cannot commit a staged {} stream", self.kind, staged.kind)
        })?;
        ensure(staged.store.schema() == self.ds.borrow().schema(), || {
            format!("{}: staged schema differs from the store", self.kind)
        })?;
        self.ds.borrow_mut().replace_columns(staged.store);
        self.partition = staged.partition;
        crate::debug_invariants!(self.validate_invariants(), "EntityCore::commit");
        Ok(())
    }

    /// Check that every reference in `refs` points below its target's total
    /// (or is [`Idx::NONE`]).
    pub fn check_references<F>(&self, refs: &[Reference], target_total: F) -> Result<(), MeshError>
    where
        F: Fn(EntityKind) -> usize,
    {
        let ds = self.ds.borrow();
        for reference in refs {
            let limit = target_total(reference.target);
            let bad = match ds.field_type(reference.field) {
                Some(FieldType::Index) => first_bad(ds.field::<Idx>(reference.field)?, limit),
                Some(FieldType::IndexList) => {
                    first_bad(ds.field::<Vec<Idx>>(reference.field)?.values(), limit)
                }
                Some(found) => {
                    return Err(MeshError::TypeMismatch {
                        name: reference.field.into(),
                        expected: FieldType::Index,
                        found,
                    });
                }
                None => {
                    return Err(MeshError::NotFound {
                        name: reference.field.into(),
                    });
                }
            };
            if let Some((pos, idx)) = bad {
                log::warn!(
                    "{}.{} entry {pos} references {} {:?} but only {limit} exist",
                    self.kind,
                    reference.field,
                    reference.target,
                    idx
                );
                return Err(MeshError::InvariantViolation(format!(
                    "{}.{}[{pos}] = {} is outside {} (total {limit})",
                    self.kind,
                    reference.field,
                    idx.raw(),
                    reference.target
                )));
            }
        }
        Ok(())
    }
}

/// A decoded entity stream waiting to be committed.
#[derive(Debug)]
pub struct StagedEntity {
    kind: EntityKind,
    partition: Partition,
    store: Datastore,
}

impl StagedEntity {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }
}

fn first_bad(values: &[Idx], limit: usize) -> Option<(usize, Idx)> {
    values
        .iter()
        .copied()
        .enumerate()
        .find(|(_, v)| v.raw() < -1 || v.get().is_some_and(|i| i >= limit))
}

impl PartialEq for EntityCore {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.partition == other.partition
            && (self.ds.ptr_eq(&other.ds) || *self.ds.borrow() == *other.ds.borrow())
    }
}

impl fmt::Debug for EntityCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCore")
            .field("kind", &self.kind)
            .field("partition", &self.partition)
            .field("ds", &self.ds)
            .finish()
    }
}

impl DebugInvariants for EntityCore {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "EntityCore");
    }

    fn validate_invariants(&self) -> Result<(), MeshError> {
        let p = self.partition;
        ensure(p.local + p.ghost == p.total, || {
            format!(
                "{}: local {} + ghost {} != total {}",
                self.kind, p.local, p.ghost, p.total
            )
        })?;
        let ds = self.ds.borrow();
        ensure(ds.len() == p.total, || {
            format!("{}: store holds {} elements, total is {}", self.kind, ds.len(), p.total)
        })?;
        ds.validate_invariants()
    }
}

/// Uniform contract implemented by every mesh-part collection.
pub trait Entity {
    /// Which of the six kinds this is.
    const KIND: EntityKind;
    /// Kind-specific fields, declared after [`COMMON_FIELDS`].
    const SCHEMA: &'static [FieldSpec];
    /// Index fields and the kinds they point into.
    const REFERENCES: &'static [Reference];

    /// Wrap an already-declared core.
    fn from_core(core: EntityCore) -> Self
    where
        Self: Sized;

    fn core(&self) -> &EntityCore;

    fn core_mut(&mut self) -> &mut EntityCore;

    /// Bind a new entity to `ds`, declaring its schema there.
    fn new(ds: DsHandle) -> Result<Self, MeshError>
    where
        Self: Sized,
    {
        EntityCore::new(Self::KIND, ds, Self::SCHEMA).map(Self::from_core)
    }

    /// A new entity on its own fresh store.
    fn standalone() -> Result<Self, MeshError>
    where
        Self: Sized,
    {
        Self::new(DsHandle::default())
    }

    fn ds(&self) -> &DsHandle {
        self.core().ds()
    }

    fn partition(&self) -> Partition {
        self.core().partition()
    }

    /// [`partition`](Entity::partition), verified against the store length.
    fn checked_partition(&self) -> Result<Partition, MeshError> {
        self.core().checked_partition()
    }

    fn local(&self) -> usize {
        self.partition().local()
    }

    fn ghost(&self) -> usize {
        self.partition().ghost()
    }

    fn total(&self) -> usize {
        self.partition().total()
    }

    /// Resize every field to `total` elements, `[0, local)` owned and
    /// `[local, total)` ghosts.
    ///
    /// # Errors
    /// [`MeshError::InvalidPartition`] unless `total == local + ghost`.
    fn resize(&mut self, local: usize, total: usize, ghost: usize) -> Result<(), MeshError> {
        self.core_mut().resize(local, total, ghost)
    }

    /// Serialize the partition and every declared field.
    fn write<W: Write>(&self, w: &mut W) -> Result<(), MeshError> {
        self.core().write(w)
    }

    /// Deserialize a stream written by [`write`](Entity::write) for the same schema.
    fn read<R: Read>(&mut self, r: &mut R) -> Result<(), MeshError> {
        self.core_mut().read(r)
    }

    /// Typed view of one of this entity's fields.
    fn field<T: FieldElement>(&self, name: &str) -> Result<Ref<'_, T::View>, MeshError> {
        self.ds().field::<T>(name)
    }

    /// Typed mutable view of one of this entity's fields.
    fn field_mut<T: FieldElement>(&self, name: &str) -> Result<RefMut<'_, T::View>, MeshError> {
        self.ds().field_mut::<T>(name)
    }

    /// Element `i` of a flat field.
    ///
    /// # Errors
    /// [`MeshError::IndexOutOfRange`] past the end of the field, plus the
    /// errors of [`field`](Entity::field).
    fn value<T>(&self, name: &str, i: usize) -> Result<T, MeshError>
    where
        T: FieldElement<View = [T]> + Copy,
    {
        let col = self.field::<T>(name)?;
        col.get(i).copied().ok_or_else(|| MeshError::IndexOutOfRange {
            name: name.into(),
            index: i,
            len: col.len(),
        })
    }

    /// Overwrite element `i` of a flat field.
    fn set_value<T>(&self, name: &str, i: usize, value: T) -> Result<(), MeshError>
    where
        T: FieldElement<View = [T]>,
    {
        let mut col = self.field_mut::<T>(name)?;
        let len = col.len();
        let slot = col.get_mut(i).ok_or_else(|| MeshError::IndexOutOfRange {
            name: name.into(),
            index: i,
            len,
        })?;
        *slot = value;
        Ok(())
    }

    /// Check every entry of [`REFERENCES`](Entity::REFERENCES) against
    /// the totals reported by `target_total`.
    fn check_references<F>(&self, target_total: F) -> Result<(), MeshError>
    where
        F: Fn(EntityKind) -> usize,
    {
        self.core().check_references(Self::REFERENCES, target_total)
    }
}
