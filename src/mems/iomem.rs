use std::fs::OpenOptions;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use crate::hv::LparAddr;
use crate::mems::window::{BusMapper, MappedBus};

// Physical remap stage over /dev/mem.
//
// The userland analog of an uncached kernel remap: the lpar address is
// mmap'ed page-aligned and every access goes through a volatile per-byte
// copy, so register touches are neither elided, widened nor merged.
// The privileged grant itself must already be in place; this stage only
// establishes the accessible view.

/// Remaps granted ranges by mmap'ing a memory device node.
pub struct PhysMapper {
    node: PathBuf,
}

impl PhysMapper {
    /// Mapper over `/dev/mem`.
    pub fn devmem() -> Self {
        Self {
            node: PathBuf::from("/dev/mem"),
        }
    }

    pub fn with_node(node: impl Into<PathBuf>) -> Self {
        Self { node: node.into() }
    }
}

impl BusMapper for PhysMapper {
    fn remap_uncached(&self, lpar: LparAddr, size: u64) -> Option<Box<dyn MappedBus>> {
        match PhysMapping::map_node(&self.node, lpar.0, size as usize) {
            Ok(mapping) => Some(Box::new(mapping)),
            Err(e) => {
                log::debug!("mmap of {} at 0x{:016x} failed: {e}", self.node.display(), lpar.0);
                None
            }
        }
    }
}

/// One live mmap'ed view of a physical range.
pub struct PhysMapping {
    ptr: *mut u8,
    size: usize,
    page_offset: usize,
}

// PhysMapping only exposes &self methods built on volatile accesses into
// device memory that is not shared with other host threads.
unsafe impl Send for PhysMapping {}
unsafe impl Sync for PhysMapping {}

impl PhysMapping {
    /// Map `[phys, phys + size)` out of the given device node. The start
    /// is aligned down to a page boundary for the mmap call and the
    /// returned pointer adjusted back up.
    pub fn map_node(node: &Path, phys: u64, size: usize) -> io::Result<Self> {
        let fd = OpenOptions::new().read(true).write(true).open(node)?;

        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize };
        let page_offset = (phys as usize) % page_size;
        let map_base = phys - page_offset as u64;
        let map_size = size + page_offset;

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                map_size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd.as_raw_fd(),
                map_base as libc::off_t,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            ptr: unsafe { (ptr as *mut u8).add(page_offset) },
            size,
            page_offset,
        })
    }

    /// Anonymous mapping, for exercising the volatile access path without
    /// a device node.
    pub fn map_anon(size: usize) -> io::Result<Self> {
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            ptr: ptr as *mut u8,
            size,
            page_offset: 0,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl MappedBus for PhysMapping {
    fn read_at(&self, offset: u64, dst: &mut [u8]) {
        assert!(offset as usize + dst.len() <= self.size);
        // Per-byte volatile loads; device reads have side effects.
        let base = unsafe { self.ptr.add(offset as usize) };
        for (i, byte) in dst.iter_mut().enumerate() {
            *byte = unsafe { std::ptr::read_volatile(base.add(i)) };
        }
    }

    fn write_at(&self, offset: u64, src: &[u8]) {
        assert!(offset as usize + src.len() <= self.size);
        let base = unsafe { self.ptr.add(offset as usize) };
        for (i, byte) in src.iter().enumerate() {
            unsafe { std::ptr::write_volatile(base.add(i), *byte) };
        }
    }
}

impl Drop for PhysMapping {
    fn drop(&mut self) {
        let map_ptr = unsafe { self.ptr.sub(self.page_offset) };
        let map_size = self.size + self.page_offset;

        unsafe {
            libc::munmap(map_ptr as *mut libc::c_void, map_size);
        }
    }
}
