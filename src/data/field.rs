//! Closed field-type set and the tagged column representation.
//!
//! A [`Datastore`](super::datastore::Datastore) keeps every field as a
//! [`Column`], a tagged union over the five supported element kinds. Type
//! safety is restored at the access boundary through [`FieldElement`],
//! which maps a Rust element type to its tag and to the typed view of the
//! column.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::collections::TryReserveError;
use std::fmt;
use std::io::{Read, Write};

use crate::data::storage::{Storage, VecStorage};
use crate::geometry::Vec3;
use crate::io::wire;
use crate::mesh_error::MeshError;

/// Element kind of a datastore field.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// `i32` per element.
    Int,
    /// `f64` per element.
    Real,
    /// [`Vec3`] per element.
    Vec3,
    /// [`Idx`] reference into another entity per element.
    Index,
    /// Variable-length list of [`Idx`] per element.
    IndexList,
}

impl FieldType {
    /// Every member of the closed set, in wire-code order.
    pub const ALL: [FieldType; 5] = [
        FieldType::Int,
        FieldType::Real,
        FieldType::Vec3,
        FieldType::Index,
        FieldType::IndexList,
    ];

    /// Returns a stable string label for the field type.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Int => "int",
            FieldType::Real => "real",
            FieldType::Vec3 => "vec3",
            FieldType::Index => "index",
            FieldType::IndexList => "index_list",
        }
    }

    /// Parse a field type from a string label.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "int" => Some(FieldType::Int),
            "real" => Some(FieldType::Real),
            "vec3" => Some(FieldType::Vec3),
            "index" => Some(FieldType::Index),
            "index_list" => Some(FieldType::IndexList),
            _ => None,
        }
    }

    /// One-byte wire code.
    pub fn code(self) -> u8 {
        match self {
            FieldType::Int => 1,
            FieldType::Real => 2,
            FieldType::Vec3 => 3,
            FieldType::Index => 4,
            FieldType::IndexList => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        FieldType::ALL.into_iter().find(|t| t.code() == code)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-owning reference to an element of another entity.
///
/// Stored as `i32` with `-1` meaning "no element" (e.g. the outer zone of a
/// boundary face). Fresh index fields default to [`Idx::NONE`].
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct Idx(i32);

impl Idx {
    pub const NONE: Idx = Idx(-1);

    /// Reference to element `i`, or `None` if `i` does not fit the wire type.
    #[inline]
    pub fn new(i: usize) -> Option<Self> {
        i32::try_from(i).ok().map(Idx)
    }

    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Idx(raw)
    }

    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// The referenced element, or `None` for a negative (absent) reference.
    #[inline]
    pub fn get(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 < 0
    }
}

impl Default for Idx {
    fn default() -> Self {
        Idx::NONE
    }
}

impl fmt::Debug for Idx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(i) => write!(f, "Idx({i})"),
            None => f.write_str("Idx(NONE)"),
        }
    }
}

impl From<u32> for Idx {
    fn from(i: u32) -> Self {
        Idx(i as i32)
    }
}

/// Ragged per-element index lists stored contiguously (CSR layout).
///
/// `offsets` always holds `len() + 1` entries starting at zero; list `i`
/// is `values[offsets[i]..offsets[i + 1]]`. Only the owning datastore can
/// change the number of lists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdxLists {
    offsets: Vec<usize>,
    values: Vec<Idx>,
}

impl Default for IdxLists {
    fn default() -> Self {
        Self {
            offsets: vec![0],
            values: Vec::new(),
        }
    }
}

impl IdxLists {
    /// `len` is the element count of an existing store, which was
    /// reserved through [`try_reserve_len`](Self::try_reserve_len).
    pub(crate) fn with_len(len: usize) -> Self {
        Self {
            offsets: vec![0; len + 1],
            values: Vec::new(),
        }
    }

    /// Number of lists (the field's element count).
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The list for element `i`.
    pub fn get(&self, i: usize) -> Option<&[Idx]> {
        let start = *self.offsets.get(i)?;
        let end = *self.offsets.get(i + 1)?;
        self.values.get(start..end)
    }

    /// Mutable access to the entries of list `i` (its length stays fixed).
    pub fn get_mut(&mut self, i: usize) -> Option<&mut [Idx]> {
        let start = *self.offsets.get(i)?;
        let end = *self.offsets.get(i + 1)?;
        self.values.get_mut(start..end)
    }

    /// Replace list `i` with `list`, shifting the lists after it.
    pub fn set(&mut self, i: usize, list: &[Idx]) -> Result<(), MeshError> {
        if i >= self.len() {
            return Err(MeshError::IndexOutOfRange {
                name: "index_list".into(),
                index: i,
                len: self.len(),
            });
        }
        let (start, end) = (self.offsets[i], self.offsets[i + 1]);
        self.values.splice(start..end, list.iter().copied());
        let old_len = end - start;
        for off in &mut self.offsets[i + 1..] {
            *off = *off - old_len + list.len();
        }
        Ok(())
    }

    /// Iterate over all lists in element order.
    pub fn iter(&self) -> impl Iterator<Item = &[Idx]> + '_ {
        self.offsets
            .windows(2)
            .map(move |w| &self.values[w[0]..w[1]])
    }

    /// Flat value buffer shared by all lists.
    pub fn values(&self) -> &[Idx] {
        &self.values
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    fn try_reserve_len(&mut self, new_len: usize) -> Result<(), TryReserveError> {
        match new_len.checked_add(1) {
            Some(n_offsets) => self
                .offsets
                .try_reserve(n_offsets.saturating_sub(self.offsets.len())),
            // `offsets` is never empty, so this reports a capacity overflow.
            None => self.offsets.try_reserve(usize::MAX),
        }
    }

    /// Callers reserve with [`try_reserve_len`](Self::try_reserve_len)
    /// first, so `new_len + 1` fits.
    fn resize(&mut self, new_len: usize) {
        if new_len < self.len() {
            self.offsets.truncate(new_len + 1);
            self.values.truncate(self.offsets[new_len]);
        } else {
            let end = self.values.len();
            self.offsets.resize(new_len + 1, end);
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.offsets.first() != Some(&0) {
            return Err("offsets must start at 0".into());
        }
        if self.offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err("offsets must be non-decreasing".into());
        }
        if self.offsets.last() != Some(&self.values.len()) {
            return Err(format!(
                "last offset {:?} != value count {}",
                self.offsets.last(),
                self.values.len()
            ));
        }
        Ok(())
    }
}

/// Tagged, type-erased column storage.
#[derive(Clone, Debug)]
pub enum Column {
    Int(VecStorage<i32>),
    Real(VecStorage<f64>),
    Vec3(VecStorage<Vec3>),
    Index(VecStorage<Idx>),
    IndexList(IdxLists),
}

impl Column {
    /// A default-initialized column of `len` elements.
    pub fn new(ty: FieldType, len: usize) -> Self {
        match ty {
            FieldType::Int => Column::Int(VecStorage::with_len(len, 0)),
            FieldType::Real => Column::Real(VecStorage::with_len(len, 0.0)),
            FieldType::Vec3 => Column::Vec3(VecStorage::with_len(len, Vec3::splat(0.0))),
            FieldType::Index => Column::Index(VecStorage::with_len(len, Idx::NONE)),
            FieldType::IndexList => Column::IndexList(IdxLists::with_len(len)),
        }
    }

    /// Return the type tag for this column.
    pub fn field_type(&self) -> FieldType {
        match self {
            Column::Int(_) => FieldType::Int,
            Column::Real(_) => FieldType::Real,
            Column::Vec3(_) => FieldType::Vec3,
            Column::Index(_) => FieldType::Index,
            Column::IndexList(_) => FieldType::IndexList,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Int(s) => s.len(),
            Column::Real(s) => s.len(),
            Column::Vec3(s) => s.len(),
            Column::Index(s) => s.len(),
            Column::IndexList(l) => l.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn try_reserve_len(&mut self, new_len: usize) -> Result<(), TryReserveError> {
        match self {
            Column::Int(s) => s.try_reserve_len(new_len),
            Column::Real(s) => s.try_reserve_len(new_len),
            Column::Vec3(s) => s.try_reserve_len(new_len),
            Column::Index(s) => s.try_reserve_len(new_len),
            Column::IndexList(l) => l.try_reserve_len(new_len),
        }
    }

    pub(crate) fn resize(&mut self, new_len: usize) {
        match self {
            Column::Int(s) => s.resize(new_len, 0),
            Column::Real(s) => s.resize(new_len, 0.0),
            Column::Vec3(s) => s.resize(new_len, Vec3::splat(0.0)),
            Column::Index(s) => s.resize(new_len, Idx::NONE),
            Column::IndexList(l) => l.resize(new_len),
        }
    }

    /// Raw contiguous bytes of the column in native layout. For an index-list
    /// column this is the flat value buffer.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Column::Int(s) => bytemuck::cast_slice(s.as_slice()),
            Column::Real(s) => bytemuck::cast_slice(s.as_slice()),
            Column::Vec3(s) => bytemuck::cast_slice(s.as_slice()),
            Column::Index(s) => bytemuck::cast_slice(s.as_slice()),
            Column::IndexList(l) => bytemuck::cast_slice(l.values()),
        }
    }

    /// Exact equality: same type, same length, and bit-identical elements.
    pub fn bit_eq(&self, other: &Column) -> bool {
        match (self, other) {
            (Column::Int(a), Column::Int(b)) => a == b,
            (Column::Real(a), Column::Real(b)) => {
                a.len() == b.len()
                    && a.as_slice()
                        .iter()
                        .zip(b.as_slice())
                        .all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (Column::Vec3(a), Column::Vec3(b)) => {
                a.len() == b.len()
                    && a.as_slice()
                        .iter()
                        .zip(b.as_slice())
                        .all(|(x, y)| x.bit_eq(y))
            }
            (Column::Index(a), Column::Index(b)) => a == b,
            (Column::IndexList(a), Column::IndexList(b)) => a == b,
            _ => false,
        }
    }

    pub(crate) fn validate(&self, expected_len: usize) -> Result<(), String> {
        if self.len() != expected_len {
            return Err(format!(
                "column length {} != store length {expected_len}",
                self.len()
            ));
        }
        if let Column::IndexList(l) = self {
            l.validate()?;
        }
        Ok(())
    }

    /// Write the column payload (without type or length header).
    pub(crate) fn write_payload<W: Write>(&self, w: &mut W) -> Result<(), MeshError> {
        match self {
            Column::Int(s) => wire::write_elems(w, s.as_slice()),
            Column::Real(s) => wire::write_elems(w, s.as_slice()),
            Column::Vec3(s) => wire::write_elems(w, s.as_slice()),
            Column::Index(s) => wire::write_elems(w, s.as_slice()),
            Column::IndexList(l) => {
                wire::write_u64(w, l.values.len() as u64)?;
                let offsets: Vec<u64> = l.offsets.iter().map(|&o| o as u64).collect();
                wire::write_elems(w, &offsets)?;
                wire::write_elems(w, &l.values)
            }
        }
    }

    /// Read a payload of `len` elements of type `ty` written by [`write_payload`](Self::write_payload).
    pub(crate) fn read_payload<R: Read>(
        r: &mut R,
        ty: FieldType,
        len: usize,
        ctx: &str,
    ) -> Result<Self, MeshError> {
        Ok(match ty {
            FieldType::Int => Column::Int(wire::read_elems(r, len, ctx)?.into()),
            FieldType::Real => Column::Real(wire::read_elems(r, len, ctx)?.into()),
            FieldType::Vec3 => Column::Vec3(wire::read_elems(r, len, ctx)?.into()),
            FieldType::Index => Column::Index(wire::read_elems(r, len, ctx)?.into()),
            FieldType::IndexList => {
                let nvalues = wire::read_len(r, ctx)?;
                let n_offsets = len
                    .checked_add(1)
                    .ok_or_else(|| MeshError::format(ctx, "list count overflows"))?;
                let raw: Vec<u64> = wire::read_elems(r, n_offsets, ctx)?;
                let offsets = raw
                    .into_iter()
                    .map(usize::try_from)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| MeshError::format(ctx, "list offset exceeds usize"))?;
                let values = wire::read_elems(r, nvalues, ctx)?;
                let lists = IdxLists { offsets, values };
                lists
                    .validate()
                    .map_err(|reason| MeshError::format(ctx, reason))?;
                Column::IndexList(lists)
            }
        })
    }
}

/// Maps a Rust element type to its [`FieldType`] tag and typed column view.
pub trait FieldElement: 'static {
    /// Type tag for this element type.
    const FIELD_TYPE: FieldType;
    /// What a typed accessor hands out: a slice for flat columns.
    type View: ?Sized;

    /// Borrow the typed view if the tag matches.
    fn view(col: &Column) -> Option<&Self::View>;
    /// Mutably borrow the typed view if the tag matches.
    fn view_mut(col: &mut Column) -> Option<&mut Self::View>;
}

macro_rules! flat_element {
    ($t:ty, $variant:ident) => {
        impl FieldElement for $t {
            const FIELD_TYPE: FieldType = FieldType::$variant;
            type View = [$t];

            fn view(col: &Column) -> Option<&[$t]> {
                if let Column::$variant(s) = col {
                    Some(s.as_slice())
                } else {
                    None
                }
            }

            fn view_mut(col: &mut Column) -> Option<&mut [$t]> {
                if let Column::$variant(s) = col {
                    Some(s.as_mut_slice())
                } else {
                    None
                }
            }
        }
    };
}

flat_element!(i32, Int);
flat_element!(f64, Real);
flat_element!(Vec3, Vec3);
flat_element!(Idx, Index);

/// An index-list field: each element is a `Vec<Idx>`, viewed as [`IdxLists`].
impl FieldElement for Vec<Idx> {
    const FIELD_TYPE: FieldType = FieldType::IndexList;
    type View = IdxLists;

    fn view(col: &Column) -> Option<&IdxLists> {
        if let Column::IndexList(l) = col {
            Some(l)
        } else {
            None
        }
    }

    fn view_mut(col: &mut Column) -> Option<&mut IdxLists> {
        if let Column::IndexList(l) = col {
            Some(l)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(v: &[i32]) -> Vec<Idx> {
        v.iter().copied().map(Idx::from_raw).collect()
    }

    #[test]
    fn tags_round_trip() {
        for ty in FieldType::ALL {
            assert_eq!(FieldType::parse(ty.as_str()), Some(ty));
            assert_eq!(FieldType::from_code(ty.code()), Some(ty));
        }
        assert_eq!(FieldType::parse("f32"), None);
        assert_eq!(FieldType::from_code(0), None);
    }

    #[test]
    fn idx_none_and_conversion() {
        assert!(Idx::default().is_none());
        assert_eq!(Idx::default().get(), None);
        assert_eq!(Idx::new(7).and_then(Idx::get), Some(7));
        assert_eq!(Idx::new(usize::MAX), None);
        assert_eq!(format!("{:?}", Idx::NONE), "Idx(NONE)");
    }

    #[test]
    fn lists_set_shifts_following() {
        let mut l = IdxLists::with_len(3);
        l.set(0, &idx(&[1, 2])).unwrap();
        l.set(2, &idx(&[5])).unwrap();
        l.set(1, &idx(&[3, 4, 9])).unwrap();
        assert_eq!(l.get(0), Some(&idx(&[1, 2])[..]));
        assert_eq!(l.get(1), Some(&idx(&[3, 4, 9])[..]));
        assert_eq!(l.get(2), Some(&idx(&[5])[..]));
        l.set(1, &[]).unwrap();
        assert_eq!(l.offsets(), &[0, 2, 2, 3]);
        assert!(l.set(3, &[]).is_err());
        assert!(l.validate().is_ok());
    }

    #[test]
    fn lists_resize_keeps_prefix() {
        let mut l = IdxLists::with_len(3);
        l.set(0, &idx(&[1])).unwrap();
        l.set(1, &idx(&[2, 3])).unwrap();
        l.set(2, &idx(&[4])).unwrap();
        l.resize(2);
        assert_eq!(l.values(), &idx(&[1, 2, 3])[..]);
        l.resize(4);
        assert_eq!(l.len(), 4);
        assert_eq!(l.get(3), Some(&[][..]));
        assert!(l.validate().is_ok());
    }

    #[test]
    fn column_defaults() {
        let c = Column::new(FieldType::Index, 2);
        assert_eq!(<Idx as FieldElement>::view(&c), Some(&[Idx::NONE, Idx::NONE][..]));
        assert!(<f64 as FieldElement>::view(&c).is_none());
        assert_eq!(Column::new(FieldType::Vec3, 4).as_bytes().len(), 4 * 24);
    }

    #[test]
    fn bit_eq_is_exact_for_reals() {
        let mut a = Column::new(FieldType::Real, 1);
        let mut b = Column::new(FieldType::Real, 1);
        f64::view_mut(&mut a).unwrap()[0] = -0.0;
        assert!(!a.bit_eq(&b));
        f64::view_mut(&mut b).unwrap()[0] = -0.0;
        assert!(a.bit_eq(&b));
        assert!(!a.bit_eq(&Column::new(FieldType::Int, 1)));
    }
}
