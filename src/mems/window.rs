use std::sync::Arc;

use crate::err::MapError;
use crate::hv::{Hypervisor, LparAddr};

/// Kernel-side view of a remapped lpar range.
///
/// Accesses must behave like device memory: no caching, no combining, no
/// speculative touches. Offsets are pre-clamped by the caller, so both
/// methods always transfer the whole slice. Dropping the mapping undoes
/// the remap.
pub trait MappedBus: Send + Sync {
    fn read_at(&self, offset: u64, dst: &mut [u8]);
    fn write_at(&self, offset: u64, src: &[u8]);
}

/// The remap stage of acquisition: turn a granted lpar range into an
/// accessible [`MappedBus`]. Returns `None` when the remap cannot be
/// established.
pub trait BusMapper {
    fn remap_uncached(&self, lpar: LparAddr, size: u64) -> Option<Box<dyn MappedBus>>;
}

/// Holds a live hypervisor grant and releases it exactly once on drop.
struct LparMapping {
    hv: Arc<dyn Hypervisor>,
    addr: LparAddr,
}

impl LparMapping {
    fn addr(&self) -> LparAddr {
        self.addr
    }
}

impl Drop for LparMapping {
    fn drop(&mut self) {
        if let Err(e) = self.hv.unmap_bus_window(self.addr) {
            log::warn!("releasing lpar grant 0x{:016x} failed: {e}", self.addr.0);
        }
    }
}

/// A live, fully acquired MMIO window over the bus.
///
/// Acquisition is two privileged stages; each stage arms its own undo, so
/// a failure anywhere after it unwinds in exact reverse order. The same
/// order governs the final teardown: field order drops `mapped` (the
/// remap) before `lpar` (the grant).
pub struct MmioWindow {
    mapped: Box<dyn MappedBus>,
    lpar: LparMapping,
    size: u64,
}

impl MmioWindow {
    /// Grant + remap. On success the window owns both resources; on any
    /// failure nothing stays acquired.
    pub fn acquire(
        hv: Arc<dyn Hypervisor>,
        mapper: &dyn BusMapper,
        base: u64,
        page_shift: u32,
        size: u64,
    ) -> Result<Self, MapError> {
        let addr = hv
            .map_bus_window(base, page_shift, size)
            .map_err(MapError::MappingDenied)?;
        let lpar = LparMapping { hv, addr };
        log::debug!("bus window granted, lpar 0x{:016x}", addr.0);

        // If the remap fails, `lpar` goes out of scope here and the grant
        // is released before the error propagates.
        let mapped = mapper
            .remap_uncached(lpar.addr(), size)
            .ok_or(MapError::RemapFailed { lpar: addr.0, size })?;
        log::debug!("bus window remapped uncached, size 0x{size:x}");

        Ok(Self { mapped, lpar, size })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn lpar_addr(&self) -> LparAddr {
        self.lpar.addr()
    }

    /// Raw window read. `offset + dst.len()` must stay inside the window.
    pub fn read_at(&self, offset: u64, dst: &mut [u8]) {
        debug_assert!(offset.checked_add(dst.len() as u64).is_some_and(|end| end <= self.size));
        self.mapped.read_at(offset, dst);
    }

    /// Raw window write. `offset + src.len()` must stay inside the window.
    pub fn write_at(&self, offset: u64, src: &[u8]) {
        debug_assert!(offset.checked_add(src.len() as u64).is_some_and(|end| end <= self.size));
        self.mapped.write_at(offset, src);
    }
}
