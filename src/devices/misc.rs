use std::collections::BTreeMap;
use std::sync::Arc;

use crate::devices::chardev::{CharDevice, OpenFile};
use crate::err::DeviceError;

/// Named character-device endpoints.
///
/// The host-facing face of the driver: a device registers under a name at
/// load time, user code opens the name to get an independent handle, and
/// deregistration makes the name unresolvable again. The registry holds
/// its own reference; a device is dropped once the registry and every
/// open handle let go of it.
#[derive(Default)]
pub struct MiscRegistry {
    devices: BTreeMap<String, Arc<dyn CharDevice>>,
}

impl MiscRegistry {
    pub fn register(&mut self, name: &str, dev: Arc<dyn CharDevice>) -> Result<(), DeviceError> {
        if self.devices.contains_key(name) {
            return Err(DeviceError::NameInUse(name.to_string()));
        }
        self.devices.insert(name.to_string(), dev);
        Ok(())
    }

    pub fn deregister(&mut self, name: &str) -> Result<Arc<dyn CharDevice>, DeviceError> {
        self.devices
            .remove(name)
            .ok_or_else(|| DeviceError::NotFound(name.to_string()))
    }

    /// Open a fresh handle with its own cursor.
    pub fn open(&self, name: &str) -> Result<OpenFile, DeviceError> {
        let dev = self
            .devices
            .get(name)
            .ok_or_else(|| DeviceError::NotFound(name.to_string()))?;
        Ok(OpenFile::new(dev.clone()))
    }
}
