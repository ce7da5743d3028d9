pub mod iomem;
pub mod ram;
pub mod window;

pub use ram::*;
pub use window::*;
