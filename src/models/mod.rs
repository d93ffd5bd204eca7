pub mod item;
pub mod result;
pub mod wire;

pub use item::*;
pub use result::*;
