use thiserror::Error;

#[derive(Error, Debug)]
pub enum SbmmioError {
    #[error("Hypervisor error: {0}")]
    Hv(#[from] HvError),

    #[error("Mapping error: {0}")]
    Map(#[from] MapError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    #[error("General error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// A privileged hypervisor call came back with a nonzero status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("hypervisor call failed with status {status}")]
pub struct HvError {
    pub status: i64,
}

impl HvError {
    pub fn status(status: i64) -> Self {
        Self { status }
    }
}

/// Failures while bringing the bus window up. All of these abort the
/// driver load; the window unwinds whatever it had already acquired.
#[derive(Error, Debug)]
pub enum MapError {
    #[error("hypervisor refused the bus window grant: {0}")]
    MappingDenied(#[source] HvError),

    #[error("uncached remap of lpar range 0x{lpar:016x} (size 0x{size:x}) failed")]
    RemapFailed { lpar: u64, size: u64 },

    #[error("endpoint registration failed: {0}")]
    RegistrationFailed(#[source] DeviceError),
}

/// Per-call failures on an open handle. The window stays healthy and the
/// cursor is left exactly where it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("seek by {0} would move the cursor out of range")]
    InvalidOffset(i64),

    #[error("user buffer fault: {0}")]
    Fault(#[from] CopyFault),
}

/// The bulk user-copy primitive faulted mid transfer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("fault while copying through a user buffer")]
pub struct CopyFault;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device name '{0}' is already registered")]
    NameInUse(String),

    #[error("no device registered under the name '{0}'")]
    NotFound(String),
}
