pub mod devices;
pub mod err;
pub mod hv;
pub mod mems;
pub mod uaccess;

pub use devices::*;
pub use err::*;
pub use hv::*;
pub use mems::*;
pub use uaccess::*;
