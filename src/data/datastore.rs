//! Datastore: named, type-erased, lock-step resizable columns.
//!
//! A `Datastore` maps field names to [`Column`]s that all share one element
//! count. Fields are declared at runtime with a [`FieldType`] and accessed
//! through typed views that fail fast on a type mismatch. Declaration order
//! is preserved and defines the serialization order.
//!
//! Stores are shared through [`DsHandle`], a reference-counted handle with
//! runtime borrow checking. There is no locking: callers keep to
//! single-writer phases and must not resize a store while a view of it is
//! alive (the borrow flag turns such misuse into a panic instead of a
//! dangling view).

use hashbrown::HashMap;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::io::{Read, Write};
use std::rc::Rc;

use crate::data::field::{Column, FieldElement, FieldType};
use crate::debug_invariants::{DebugInvariants, ensure};
use crate::io::wire;
use crate::mesh_error::MeshError;

/// Generic named-field columnar storage.
#[derive(Default)]
pub struct Datastore {
    /// Logical element count shared by every column.
    len: usize,
    /// Columns in declaration order.
    fields: Vec<(String, Column)>,
    /// Name -> position in `fields`.
    index: HashMap<String, usize>,
    /// Named dedicated child stores registered with this store.
    children: Vec<(String, DsHandle)>,
}

impl Datastore {
    /// Create an empty store with no fields and zero elements.
    pub fn new() -> Self {
        Self::default()
    }

    /// Element count of every field.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of declared fields.
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Declared type of `name`, if present.
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.index.get(name).map(|&i| self.fields[i].1.field_type())
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// `(name, type)` pairs in declaration order.
    pub fn schema(&self) -> Vec<(String, FieldType)> {
        self.fields
            .iter()
            .map(|(n, c)| (n.clone(), c.field_type()))
            .collect()
    }

    /// Register a new field, sized to the current element count and
    /// default-initialized.
    ///
    /// # Errors
    /// [`MeshError::NameConflict`] if `name` is already declared.
    pub fn declare(&mut self, name: &str, ty: FieldType) -> Result<(), MeshError> {
        if self.index.contains_key(name) {
            return Err(MeshError::NameConflict { name: name.into() });
        }
        log::debug!("declare field `{name}` ({ty}) with {} elements", self.len);
        self.index.insert(name.to_owned(), self.fields.len());
        self.fields.push((name.to_owned(), Column::new(ty, self.len)));
        Ok(())
    }

    /// Register a new field from a string type tag.
    ///
    /// # Errors
    /// [`MeshError::UnsupportedType`] if `tag` is not in the closed type set,
    /// otherwise as [`declare`](Self::declare).
    pub fn declare_tagged(&mut self, name: &str, tag: &str) -> Result<(), MeshError> {
        let ty = FieldType::parse(tag).ok_or_else(|| MeshError::UnsupportedType {
            tag: tag.to_owned(),
        })?;
        self.declare(name, ty)
    }

    /// Untyped column access.
    pub fn column(&self, name: &str) -> Result<&Column, MeshError> {
        self.index
            .get(name)
            .map(|&i| &self.fields[i].1)
            .ok_or_else(|| MeshError::NotFound { name: name.into() })
    }

    fn column_mut(&mut self, name: &str) -> Result<&mut Column, MeshError> {
        match self.index.get(name) {
            Some(&i) => Ok(&mut self.fields[i].1),
            None => Err(MeshError::NotFound { name: name.into() }),
        }
    }

    /// Typed read-only view of field `name`.
    ///
    /// # Errors
    /// [`MeshError::NotFound`] if absent, [`MeshError::TypeMismatch`] if `T`
    /// is not the declared element type.
    pub fn field<T: FieldElement>(&self, name: &str) -> Result<&T::View, MeshError> {
        let col = self.column(name)?;
        T::view(col).ok_or_else(|| MeshError::TypeMismatch {
            name: name.into(),
            expected: T::FIELD_TYPE,
            found: col.field_type(),
        })
    }

    /// Typed mutable view of field `name`. The view cannot change the
    /// element count; use [`resize`](Self::resize) for that.
    pub fn field_mut<T: FieldElement>(&mut self, name: &str) -> Result<&mut T::View, MeshError> {
        let col = self.column_mut(name)?;
        let found = col.field_type();
        T::view_mut(col).ok_or_else(|| MeshError::TypeMismatch {
            name: name.into(),
            expected: T::FIELD_TYPE,
            found,
        })
    }

    /// Raw contiguous bytes of field `name` for an external dispatch layer.
    pub fn field_bytes(&self, name: &str) -> Result<&[u8], MeshError> {
        Ok(self.column(name)?.as_bytes())
    }

    /// Apply `f(i, &mut x)` to every element of a flat field in parallel.
    #[cfg(feature = "rayon")]
    pub fn par_for_each_mut<T, F>(&mut self, name: &str, f: F) -> Result<(), MeshError>
    where
        T: FieldElement<View = [T]> + Send,
        F: Fn(usize, &mut T) + Sync + Send,
    {
        use rayon::prelude::*;
        let view = self.field_mut::<T>(name)?;
        view.par_iter_mut().enumerate().for_each(|(i, x)| f(i, x));
        Ok(())
    }

    /// Change the element count of every field to `n` in lock-step.
    ///
    /// Values at indices `< min(old, n)` are preserved and new indices are
    /// default-initialized. Storage for all columns is reserved before any
    /// column is touched, so on error the store is unchanged.
    ///
    /// # Errors
    /// [`MeshError::ResizeFailed`] if memory cannot be reserved.
    pub fn resize(&mut self, n: usize) -> Result<(), MeshError> {
        for (_, col) in &mut self.fields {
            col.try_reserve_len(n)
                .map_err(|_| MeshError::ResizeFailed { len: n })?;
        }
        log::debug!(
            "resize datastore {} -> {n} ({} fields)",
            self.len,
            self.fields.len()
        );
        for (_, col) in &mut self.fields {
            col.resize(n);
        }
        self.len = n;
        crate::debug_invariants!(self.validate_invariants(), "Datastore::resize");
        Ok(())
    }

    /// Create a dedicated child store registered under `name`.
    ///
    /// # Errors
    /// [`MeshError::NameConflict`] if a child with that name exists.
    pub fn make_child(&mut self, name: &str) -> Result<DsHandle, MeshError> {
        if self.children.iter().any(|(n, _)| n == name) {
            return Err(MeshError::NameConflict { name: name.into() });
        }
        let child = DsHandle::default();
        self.children.push((name.to_owned(), child.clone()));
        Ok(child)
    }

    /// Look up a child store by name.
    pub fn child(&self, name: &str) -> Result<DsHandle, MeshError> {
        self.children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, h)| h.clone())
            .ok_or_else(|| MeshError::NotFound { name: name.into() })
    }

    /// Child stores in registration order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &DsHandle)> + '_ {
        self.children.iter().map(|(n, h)| (n.as_str(), h))
    }

    /// An empty store declaring the same fields in the same order. Child
    /// stores are not carried over.
    pub fn clone_schema(&self) -> Datastore {
        let mut out = Datastore::new();
        for (name, col) in &self.fields {
            out.index.insert(name.clone(), out.fields.len());
            out.fields.push((name.clone(), Column::new(col.field_type(), 0)));
        }
        out
    }

    /// Take over the element count and columns of `staged`, a store built
    /// by [`clone_schema`](Self::clone_schema) from this one. Child stores
    /// stay registered.
    pub(crate) fn replace_columns(&mut self, staged: Datastore) {
        self.len = staged.len;
        self.fields = staged.fields;
        self.index = staged.index;
        crate::debug_invariants!(self.validate_invariants(), "Datastore::replace_columns");
    }

    /// Serialize the element count and every field in declaration order.
    ///
    /// Layout: `[len u64][field_count u32]` then per field
    /// `[name][type u8][payload]`. Child stores are not included.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<(), MeshError> {
        wire::write_u64(w, self.len as u64)?;
        wire::write_count(w, self.fields.len())?;
        for (name, col) in &self.fields {
            log::trace!("write field `{name}` ({}, {} elements)", col.field_type(), col.len());
            wire::write_str(w, name)?;
            wire::write_u8(w, col.field_type().code())?;
            col.write_payload(w)?;
        }
        Ok(())
    }

    /// Deserialize data written by [`write`](Self::write) into this store.
    ///
    /// The stream must carry exactly the declared schema: same field count,
    /// and at each position the same name and type. Every column is decoded
    /// before anything is replaced, so on error the store is unchanged.
    ///
    /// # Errors
    /// [`MeshError::Format`] on schema mismatch or truncated input.
    pub fn read<R: Read>(&mut self, r: &mut R) -> Result<(), MeshError> {
        self.read_expecting(r, None)
    }

    /// As [`read`](Self::read), additionally requiring the stream's element
    /// count to equal `expected_len` when given.
    pub(crate) fn read_expecting<R: Read>(
        &mut self,
        r: &mut R,
        expected_len: Option<usize>,
    ) -> Result<(), MeshError> {
        let len = wire::read_len(r, "datastore")?;
        if let Some(expected) = expected_len.filter(|&e| e != len) {
            return Err(MeshError::format(
                "datastore",
                format!("stream holds {len} elements, expected {expected}"),
            ));
        }
        let count = wire::read_u32(r, "datastore")? as usize;
        if count != self.fields.len() {
            return Err(MeshError::format(
                "datastore",
                format!("stream has {count} fields, schema declares {}", self.fields.len()),
            ));
        }
        let mut decoded = Vec::with_capacity(count);
        for (name, col) in &self.fields {
            let got = wire::read_str(r, name)?;
            if &got != name {
                return Err(MeshError::format(
                    name.as_str(),
                    format!("expected field `{name}`, stream has `{got}`"),
                ));
            }
            let code = wire::read_u8(r, name)?;
            let ty = FieldType::from_code(code)
                .ok_or_else(|| MeshError::format(name.as_str(), format!("unknown type code {code}")))?;
            if ty != col.field_type() {
                return Err(MeshError::format(
                    name.as_str(),
                    format!("declared {}, stream has {ty}", col.field_type()),
                ));
            }
            log::trace!("read field `{name}` ({ty}, {len} elements)");
            decoded.push(Column::read_payload(r, ty, len, name)?);
        }
        for ((_, col), new) in self.fields.iter_mut().zip(decoded) {
            *col = new;
        }
        self.len = len;
        crate::debug_invariants!(self.validate_invariants(), "Datastore::read");
        Ok(())
    }
}

/// Two stores are equal when they hold the same field names with the same
/// types and bit-identical elements (declaration order is irrelevant), and
/// their child stores compare equal by name.
impl PartialEq for Datastore {
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len
            || self.fields.len() != other.fields.len()
            || self.children.len() != other.children.len()
        {
            return false;
        }
        let fields_eq = self.fields.iter().all(|(name, col)| {
            other
                .column(name)
                .map(|o| col.bit_eq(o))
                .unwrap_or(false)
        });
        fields_eq
            && self.children.iter().all(|(name, h)| {
                other
                    .child(name)
                    .map(|o| h.ptr_eq(&o) || *h.borrow() == *o.borrow())
                    .unwrap_or(false)
            })
    }
}

impl fmt::Debug for Datastore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Datastore")
            .field("len", &self.len)
            .field("fields", &self.schema())
            .field(
                "children",
                &self.children.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl DebugInvariants for Datastore {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "Datastore");
    }

    fn validate_invariants(&self) -> Result<(), MeshError> {
        ensure(self.index.len() == self.fields.len(), || {
            format!(
                "index has {} names, {} fields stored",
                self.index.len(),
                self.fields.len()
            )
        })?;
        for (pos, (name, col)) in self.fields.iter().enumerate() {
            ensure(self.index.get(name) == Some(&pos), || {
                format!("field `{name}` not indexed at position {pos}")
            })?;
            col.validate(self.len)
                .map_err(|msg| MeshError::InvariantViolation(format!("field `{name}`: {msg}")))?;
        }
        Ok(())
    }
}

/// Shared, reference-counted handle to a [`Datastore`].
#[derive(Clone, Default)]
pub struct DsHandle(Rc<RefCell<Datastore>>);

impl DsHandle {
    pub fn new(ds: Datastore) -> Self {
        DsHandle(Rc::new(RefCell::new(ds)))
    }

    /// Immutably borrow the store.
    ///
    /// # Panics
    /// Panics if the store is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, Datastore> {
        self.0.borrow()
    }

    /// Mutably borrow the store.
    ///
    /// # Panics
    /// Panics if any other borrow of the store is alive.
    pub fn borrow_mut(&self) -> RefMut<'_, Datastore> {
        self.0.borrow_mut()
    }

    /// Typed read-only view that keeps the store borrowed while alive.
    pub fn field<T: FieldElement>(&self, name: &str) -> Result<Ref<'_, T::View>, MeshError> {
        let ds = self.borrow();
        if let Err(e) = ds.field::<T>(name) {
            return Err(e);
        }
        Ref::filter_map(ds, |d| d.field::<T>(name).ok())
            .map_err(|_| MeshError::NotFound { name: name.into() })
    }

    /// Typed mutable view that keeps the store mutably borrowed while alive.
    pub fn field_mut<T: FieldElement>(&self, name: &str) -> Result<RefMut<'_, T::View>, MeshError> {
        let mut ds = self.borrow_mut();
        if let Err(e) = ds.field_mut::<T>(name) {
            return Err(e);
        }
        RefMut::filter_map(ds, |d| d.field_mut::<T>(name).ok())
            .map_err(|_| MeshError::NotFound { name: name.into() })
    }

    /// True if both handles refer to the same store.
    pub fn ptr_eq(&self, other: &DsHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of live handles to this store.
    pub fn holders(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl fmt::Debug for DsHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(ds) => fmt::Debug::fmt(&*ds, f),
            Err(_) => f.write_str("DsHandle(<borrowed>)"),
        }
    }
}
