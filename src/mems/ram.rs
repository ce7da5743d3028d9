use std::sync::{Arc, Mutex};

use crate::err::HvError;
use crate::hv::{Hypervisor, LparAddr};
use crate::mems::window::{BusMapper, MappedBus};

// Software-backed bus.
//
// Plays both privileged roles at once: it grants lpar views of its own
// heap-backed region and remaps them into plain shared memory. Grants are
// identity-mapped, so the lpar token is just the bus address. This is
// what the demo binary and the test suite run the driver against.

/// Heap-backed stand-in for the physical bus region.
pub struct RamBus {
    base: u64,
    memory: Arc<Mutex<Box<[u8]>>>,
}

impl RamBus {
    pub fn new(base: u64, size: usize) -> Self {
        Self {
            base,
            memory: Arc::new(Mutex::new(vec![0; size].into_boxed_slice())),
        }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn size(&self) -> u64 {
        self.memory.lock().unwrap().len() as u64
    }

    fn covers(&self, base: u64, size: u64) -> bool {
        base == self.base && size <= self.size()
    }
}

impl Hypervisor for RamBus {
    fn map_bus_window(&self, base: u64, _page_shift: u32, size: u64) -> Result<LparAddr, HvError> {
        if !self.covers(base, size) {
            log::debug!(
                "grant refused: requested 0x{base:016x}+0x{size:x}, bus is 0x{:016x}+0x{:x}",
                self.base,
                self.size()
            );
            return Err(HvError::status(-17));
        }
        Ok(LparAddr(base))
    }

    fn unmap_bus_window(&self, lpar: LparAddr) -> Result<(), HvError> {
        if lpar.0 != self.base {
            return Err(HvError::status(-17));
        }
        Ok(())
    }
}

impl BusMapper for RamBus {
    fn remap_uncached(&self, lpar: LparAddr, size: u64) -> Option<Box<dyn MappedBus>> {
        if !self.covers(lpar.0, size) {
            return None;
        }
        Some(Box::new(RamMapping {
            memory: self.memory.clone(),
        }))
    }
}

struct RamMapping {
    memory: Arc<Mutex<Box<[u8]>>>,
}

impl MappedBus for RamMapping {
    fn read_at(&self, offset: u64, dst: &mut [u8]) {
        let mem = self.memory.lock().unwrap();
        let offset = offset as usize;
        dst.copy_from_slice(&mem[offset..offset + dst.len()]);
    }

    fn write_at(&self, offset: u64, src: &[u8]) {
        let mut mem = self.memory.lock().unwrap();
        let offset = offset as usize;
        mem[offset..offset + src.len()].copy_from_slice(src);
    }
}
