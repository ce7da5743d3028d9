use std::sync::Arc;

use crate::devices::chardev::CharDevice;
use crate::devices::misc::MiscRegistry;
use crate::err::{AccessError, MapError};
use crate::hv::Hypervisor;
use crate::mems::window::{BusMapper, MmioWindow};
use crate::uaccess::{UserSlice, UserSliceMut};

pub const DEVICE_NAME: &str = "sbmmio";

// System bus register region. Fixed by the platform's bus layout, not
// discovered at runtime.
pub const BUS_WINDOW_BASE: u64 = 0x240_0000_0000;
pub const BUS_WINDOW_SIZE: u64 = 0x8_0000_0000;
pub const BUS_PAGE_SHIFT: u32 = 12;

/// The bus window as a byte-stream device.
///
/// Transfers near the end of the window truncate silently to what is left,
/// short-read style; positions at or past the end transfer nothing. The
/// bytes themselves are never interpreted — whatever user space writes
/// reaches the bus registers as-is.
pub struct BusWindowDevice {
    window: MmioWindow,
}

impl BusWindowDevice {
    pub fn new(window: MmioWindow) -> Self {
        Self { window }
    }

    fn clamp(&self, pos: u64, requested: usize) -> usize {
        let left = self.window.size() - pos;
        if requested as u64 > left {
            log::debug!("truncating count from {requested} to {left}");
            left as usize
        } else {
            requested
        }
    }
}

impl CharDevice for BusWindowDevice {
    fn size(&self) -> u64 {
        self.window.size()
    }

    fn read_at(&self, pos: u64, buf: &mut dyn UserSliceMut) -> Result<usize, AccessError> {
        let requested = buf.len();
        log::debug!("reading {requested} bytes at position {pos}");

        if pos >= self.window.size() || requested == 0 {
            return Ok(0);
        }
        let count = self.clamp(pos, requested);

        let mut bounce = vec![0u8; count];
        self.window.read_at(pos, &mut bounce);
        buf.copy_to_user(&bounce)?;

        Ok(count)
    }

    fn write_at(&self, pos: u64, buf: &dyn UserSlice) -> Result<usize, AccessError> {
        let requested = buf.len();
        log::debug!("writing {requested} bytes at position {pos}");

        if pos >= self.window.size() || requested == 0 {
            return Ok(0);
        }
        let count = self.clamp(pos, requested);

        let mut bounce = vec![0u8; count];
        buf.copy_from_user(&mut bounce)?;
        self.window.write_at(pos, &bounce);

        Ok(count)
    }
}

/// Module lifecycle: acquire the window, publish the endpoint, and mirror
/// every acquisition step in reverse on the way out.
pub struct SbmmioDriver {
    name: &'static str,
}

impl SbmmioDriver {
    /// Load against the platform bus window.
    pub fn load(
        registry: &mut MiscRegistry,
        hv: Arc<dyn Hypervisor>,
        mapper: &dyn BusMapper,
    ) -> Result<Self, MapError> {
        Self::load_with_window(
            registry,
            hv,
            mapper,
            BUS_WINDOW_BASE,
            BUS_PAGE_SHIFT,
            BUS_WINDOW_SIZE,
        )
    }

    /// Load against an explicit window, for stand-in buses.
    pub fn load_with_window(
        registry: &mut MiscRegistry,
        hv: Arc<dyn Hypervisor>,
        mapper: &dyn BusMapper,
        base: u64,
        page_shift: u32,
        size: u64,
    ) -> Result<Self, MapError> {
        let window = MmioWindow::acquire(hv, mapper, base, page_shift, size)?;
        let device = Arc::new(BusWindowDevice::new(window));

        // A registration failure drops `device` on the way out, which
        // undoes the remap and then the grant, in that order.
        registry
            .register(DEVICE_NAME, device)
            .map_err(MapError::RegistrationFailed)?;

        log::info!("registered {DEVICE_NAME} endpoint, window size 0x{size:x}");
        Ok(Self { name: DEVICE_NAME })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Unload: the endpoint disappears first, then the window tears down
    /// once the registry's reference (and any remaining handles) go away.
    pub fn unload(self, registry: &mut MiscRegistry) {
        match registry.deregister(self.name) {
            Ok(_) => log::info!("deregistered {} endpoint", self.name),
            Err(e) => log::warn!("deregistering {} failed: {e}", self.name),
        }
    }
}
