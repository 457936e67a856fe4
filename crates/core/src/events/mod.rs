mod events;
mod handle;

pub use events::*;
pub use handle::*;
