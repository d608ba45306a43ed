//! Fixed little-endian wire encoding for checkpoint streams.
//!
//! Every multi-byte integer and every float bit pattern is written
//! little-endian. Element runs are cast to bytes with `bytemuck`; on
//! big-endian targets they are byte-swapped into a staging buffer first.

use bytemuck::Pod;
use std::io::{self, Read, Write};

use crate::data::field::Idx;
use crate::geometry::Vec3;
use crate::mesh_error::MeshError;

/// An element that can be carried on the wire as a run of plain bytes.
pub trait WireElem: Pod {
    /// Convert between native and little-endian representation (an involution).
    fn swap_le(self) -> Self;
}

impl WireElem for i32 {
    #[inline]
    fn swap_le(self) -> Self {
        self.to_le()
    }
}

impl WireElem for u64 {
    #[inline]
    fn swap_le(self) -> Self {
        self.to_le()
    }
}

impl WireElem for f64 {
    #[inline]
    fn swap_le(self) -> Self {
        f64::from_bits(self.to_bits().to_le())
    }
}

impl WireElem for Idx {
    #[inline]
    fn swap_le(self) -> Self {
        Idx::from_raw(self.raw().to_le())
    }
}

impl WireElem for Vec3 {
    #[inline]
    fn swap_le(self) -> Self {
        Vec3::new(self[0].swap_le(), self[1].swap_le(), self[2].swap_le())
    }
}

fn io_err(e: io::Error) -> MeshError {
    MeshError::Io(e.to_string())
}

fn read_err(e: io::Error, ctx: &str) -> MeshError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        MeshError::format(ctx, "truncated stream")
    } else {
        MeshError::Io(e.to_string())
    }
}

pub fn write_u8<W: Write>(w: &mut W, v: u8) -> Result<(), MeshError> {
    w.write_all(&[v]).map_err(io_err)
}

pub fn write_u32<W: Write>(w: &mut W, v: u32) -> Result<(), MeshError> {
    w.write_all(&v.to_le_bytes()).map_err(io_err)
}

pub fn write_u64<W: Write>(w: &mut W, v: u64) -> Result<(), MeshError> {
    w.write_all(&v.to_le_bytes()).map_err(io_err)
}

/// Write a count that must fit the `u32` wire slot.
pub fn write_count<W: Write>(w: &mut W, n: usize) -> Result<(), MeshError> {
    let n = u32::try_from(n).map_err(|_| MeshError::Io(format!("count {n} exceeds u32")))?;
    write_u32(w, n)
}

/// Length-prefixed UTF-8 string.
pub fn write_str<W: Write>(w: &mut W, s: &str) -> Result<(), MeshError> {
    write_count(w, s.len())?;
    w.write_all(s.as_bytes()).map_err(io_err)
}

/// Write a run of elements without a length prefix.
pub fn write_elems<W: Write, T: WireElem>(w: &mut W, items: &[T]) -> Result<(), MeshError> {
    if cfg!(target_endian = "little") {
        w.write_all(bytemuck::cast_slice(items)).map_err(io_err)
    } else {
        let staged: Vec<T> = items.iter().map(|v| v.swap_le()).collect();
        w.write_all(bytemuck::cast_slice(&staged)).map_err(io_err)
    }
}

pub fn read_u8<R: Read>(r: &mut R, ctx: &str) -> Result<u8, MeshError> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b).map_err(|e| read_err(e, ctx))?;
    Ok(b[0])
}

pub fn read_u32<R: Read>(r: &mut R, ctx: &str) -> Result<u32, MeshError> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b).map_err(|e| read_err(e, ctx))?;
    Ok(u32::from_le_bytes(b))
}

pub fn read_u64<R: Read>(r: &mut R, ctx: &str) -> Result<u64, MeshError> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b).map_err(|e| read_err(e, ctx))?;
    Ok(u64::from_le_bytes(b))
}

/// Read a `u64` that has to fit in `usize` on this target.
pub fn read_len<R: Read>(r: &mut R, ctx: &str) -> Result<usize, MeshError> {
    let n = read_u64(r, ctx)?;
    usize::try_from(n).map_err(|_| MeshError::format(ctx, format!("length {n} exceeds usize")))
}

/// Read exactly `n` bytes. The buffer grows with the data actually
/// received, so a corrupt length cannot trigger a huge up-front allocation.
pub fn read_bytes<R: Read>(r: &mut R, n: usize, ctx: &str) -> Result<Vec<u8>, MeshError> {
    let mut buf = Vec::new();
    r.by_ref()
        .take(n as u64)
        .read_to_end(&mut buf)
        .map_err(|e| read_err(e, ctx))?;
    if buf.len() != n {
        return Err(MeshError::format(
            ctx,
            format!("truncated stream: expected {n} bytes, got {}", buf.len()),
        ));
    }
    Ok(buf)
}

pub fn read_str<R: Read>(r: &mut R, ctx: &str) -> Result<String, MeshError> {
    let n = read_u32(r, ctx)? as usize;
    let bytes = read_bytes(r, n, ctx)?;
    String::from_utf8(bytes).map_err(|_| MeshError::format(ctx, "field name is not valid UTF-8"))
}

/// Read a run of `n` elements written by [`write_elems`].
pub fn read_elems<R: Read, T: WireElem>(
    r: &mut R,
    n: usize,
    ctx: &str,
) -> Result<Vec<T>, MeshError> {
    let width = size_of::<T>();
    let nbytes = n
        .checked_mul(width)
        .ok_or_else(|| MeshError::format(ctx, format!("element count {n} overflows")))?;
    let bytes = read_bytes(r, nbytes, ctx)?;
    Ok(bytes
        .chunks_exact(width)
        .map(|chunk| bytemuck::pod_read_unaligned::<T>(chunk).swap_le())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn scalars_are_little_endian() {
        let mut buf = Vec::new();
        write_u32(&mut buf, 0x0102_0304).unwrap();
        write_u64(&mut buf, 1).unwrap();
        assert_eq!(&buf[..4], &[4, 3, 2, 1]);
        assert_eq!(&buf[4..], &[1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn float_bits_survive() {
        let vals = [f64::NAN, -0.0, f64::MIN_POSITIVE, 1.0 / 3.0];
        let mut buf = Vec::new();
        write_elems(&mut buf, &vals).unwrap();
        let back: Vec<f64> = read_elems(&mut Cursor::new(buf), vals.len(), "t").unwrap();
        for (a, b) in vals.iter().zip(&back) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn truncated_input_is_a_format_error() {
        let mut buf = Vec::new();
        write_elems(&mut buf, &[1i32, 2, 3]).unwrap();
        buf.pop();
        let err = read_elems::<_, i32>(&mut Cursor::new(buf), 3, "ctx").unwrap_err();
        assert!(matches!(err, MeshError::Format { ref context, .. } if context == "ctx"));

        let err = read_u64(&mut Cursor::new(vec![1u8, 2]), "hdr").unwrap_err();
        assert!(matches!(err, MeshError::Format { .. }));
    }

    #[test]
    fn huge_declared_length_does_not_allocate() {
        let err = read_bytes(&mut Cursor::new(vec![0u8; 8]), usize::MAX / 2, "big").unwrap_err();
        assert!(matches!(err, MeshError::Format { .. }));
    }
}
