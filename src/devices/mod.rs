pub mod buswin;
pub mod chardev;
pub mod misc;

pub use buswin::*;
pub use chardev::*;
pub use misc::*;
