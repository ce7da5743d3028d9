use std::sync::{Arc, Mutex};

use crate::err::AccessError;
use crate::uaccess::{UserSlice, UserSliceMut};

/// Origin of a seek, `lseek` style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// Absolute offset.
    Set,
    /// Relative to the current cursor.
    Cur,
    /// Relative to the end of the device.
    End,
}

/// A byte-addressable device behind a named endpoint.
///
/// Handlers are positional and stateless; the per-handle cursor lives in
/// [`OpenFile`]. A return of `Ok(0)` means "nothing left" or "nothing
/// requested", never an error.
pub trait CharDevice: Send + Sync {
    fn size(&self) -> u64;
    fn read_at(&self, pos: u64, buf: &mut dyn UserSliceMut) -> Result<usize, AccessError>;
    fn write_at(&self, pos: u64, buf: &dyn UserSlice) -> Result<usize, AccessError>;
}

/// One open handle on a device: a shared cursor over positional handlers.
///
/// The cursor is the only mutable per-handle state. Seeks and the advance
/// after a transfer mutate it under the handle lock, so concurrent calls
/// on one handle serialize; separate handles stay independent.
pub struct OpenFile {
    dev: Arc<dyn CharDevice>,
    pos: Mutex<u64>,
}

impl OpenFile {
    pub fn new(dev: Arc<dyn CharDevice>) -> Self {
        Self {
            dev,
            pos: Mutex::new(0),
        }
    }

    /// Move the cursor. Seeking past the end is legal (later transfers
    /// just come back empty); a negative or overflowing result is
    /// rejected without touching the cursor.
    pub fn seek(&self, offset: i64, whence: Whence) -> Result<u64, AccessError> {
        let mut pos = self.pos.lock().unwrap();

        // The cursor never exceeds i64::MAX: seeks store checked i64
        // results and transfers advance at most to the device size.
        let base = match whence {
            Whence::Set => 0,
            Whence::Cur => *pos as i64,
            Whence::End => self.dev.size() as i64,
        };

        let new = match base.checked_add(offset) {
            Some(n) if n >= 0 => n as u64,
            _ => return Err(AccessError::InvalidOffset(offset)),
        };

        *pos = new;
        Ok(new)
    }

    /// Read at the cursor, advancing it by the transferred count.
    pub fn read(&self, buf: &mut dyn UserSliceMut) -> Result<usize, AccessError> {
        let mut pos = self.pos.lock().unwrap();
        let count = self.dev.read_at(*pos, buf)?;
        *pos += count as u64;
        Ok(count)
    }

    /// Write at the cursor, advancing it by the transferred count.
    pub fn write(&self, buf: &dyn UserSlice) -> Result<usize, AccessError> {
        let mut pos = self.pos.lock().unwrap();
        let count = self.dev.write_at(*pos, buf)?;
        *pos += count as u64;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::err::CopyFault;

    /// Fixed-size device that transfers up to 8 bytes per call and can be
    /// switched into a faulting mode.
    struct StubDevice {
        size: u64,
        fault: bool,
    }

    impl CharDevice for StubDevice {
        fn size(&self) -> u64 {
            self.size
        }

        fn read_at(&self, pos: u64, buf: &mut dyn UserSliceMut) -> Result<usize, AccessError> {
            if self.fault {
                return Err(AccessError::Fault(CopyFault));
            }
            if pos >= self.size || buf.is_empty() {
                return Ok(0);
            }
            Ok(buf.len().min(8))
        }

        fn write_at(&self, pos: u64, buf: &dyn UserSlice) -> Result<usize, AccessError> {
            if self.fault {
                return Err(AccessError::Fault(CopyFault));
            }
            if pos >= self.size || buf.is_empty() {
                return Ok(0);
            }
            Ok(buf.len().min(8))
        }
    }

    fn open(size: u64, fault: bool) -> OpenFile {
        OpenFile::new(Arc::new(StubDevice { size, fault }))
    }

    #[test]
    fn test_seek_whence_arithmetic() {
        let file = open(100, false);

        assert_eq!(file.seek(40, Whence::Set).unwrap(), 40);
        assert_eq!(file.seek(0, Whence::Cur).unwrap(), 40);
        assert_eq!(file.seek(-15, Whence::Cur).unwrap(), 25);
        assert_eq!(file.seek(0, Whence::End).unwrap(), 100);
        assert_eq!(file.seek(-100, Whence::End).unwrap(), 0);

        // Past the end is fine at seek time.
        assert_eq!(file.seek(1000, Whence::Set).unwrap(), 1000);
    }

    #[test]
    fn test_negative_seek_leaves_cursor_alone() {
        let file = open(100, false);
        file.seek(30, Whence::Set).unwrap();

        assert_eq!(
            file.seek(-1, Whence::Set),
            Err(AccessError::InvalidOffset(-1))
        );
        assert_eq!(
            file.seek(-31, Whence::Cur),
            Err(AccessError::InvalidOffset(-31))
        );
        assert_eq!(
            file.seek(-101, Whence::End),
            Err(AccessError::InvalidOffset(-101))
        );
        assert_eq!(file.seek(0, Whence::Cur).unwrap(), 30);
    }

    #[test]
    fn test_seek_overflow_rejected() {
        let file = open(100, false);
        file.seek(i64::MAX, Whence::Set).unwrap();
        assert!(file.seek(i64::MAX, Whence::Cur).is_err());
        assert_eq!(file.seek(0, Whence::Cur).unwrap(), i64::MAX as u64);
    }

    #[test]
    fn test_transfers_advance_cursor() {
        let file = open(100, false);
        let mut buf = vec![0u8; 8];

        assert_eq!(file.read(&mut buf).unwrap(), 8);
        assert_eq!(file.seek(0, Whence::Cur).unwrap(), 8);

        assert_eq!(file.write(&buf).unwrap(), 8);
        assert_eq!(file.seek(0, Whence::Cur).unwrap(), 16);
    }

    #[test]
    fn test_fault_leaves_cursor_alone() {
        let file = open(100, true);
        let mut buf = vec![0u8; 8];

        assert!(file.read(&mut buf).is_err());
        assert!(file.write(&buf).is_err());
        assert_eq!(file.seek(0, Whence::Cur).unwrap(), 0);
    }
}
