use crate::err::CopyFault;

// User buffer boundary.
//
// Read and write handlers never touch caller memory directly; they go
// through these traits, which can fault the same way a copy to or from a
// bad user pointer would. A fault aborts the call without advancing the
// cursor.

/// Source side of a write-style transfer (caller memory -> window).
pub trait UserSlice {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the first `dst.len()` bytes of the buffer into `dst`.
    /// `dst` is never longer than `self.len()`.
    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), CopyFault>;
}

/// Destination side of a read-style transfer (window -> caller memory).
pub trait UserSliceMut {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `src` into the front of the buffer. `src` is never longer
    /// than `self.len()`.
    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), CopyFault>;
}

impl UserSlice for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), CopyFault> {
        dst.copy_from_slice(&self[..dst.len()]);
        Ok(())
    }
}

impl UserSliceMut for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), CopyFault> {
        self[..src.len()].copy_from_slice(src);
        Ok(())
    }
}

impl UserSlice for Vec<u8> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), CopyFault> {
        self.as_slice().copy_from_user(dst)
    }
}

impl UserSliceMut for Vec<u8> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), CopyFault> {
        self.as_mut_slice().copy_to_user(src)
    }
}

/// A user pointer that faults on every access, with a claimed length.
///
/// Stands in for a null or otherwise unreadable caller buffer: a
/// zero-length one short-circuits to a zero-byte transfer before any copy
/// happens, a nonzero-length one faults the call.
#[derive(Debug, Clone, Copy)]
pub struct NullBuf {
    pub len: usize,
}

impl NullBuf {
    pub fn new(len: usize) -> Self {
        Self { len }
    }
}

impl UserSlice for NullBuf {
    fn len(&self) -> usize {
        self.len
    }

    fn copy_from_user(&self, _dst: &mut [u8]) -> Result<(), CopyFault> {
        Err(CopyFault)
    }
}

impl UserSliceMut for NullBuf {
    fn len(&self) -> usize {
        self.len
    }

    fn copy_to_user(&mut self, _src: &[u8]) -> Result<(), CopyFault> {
        Err(CopyFault)
    }
}
