pub mod log;
pub use log::*;

mod shape;
pub use shape::*;

mod vec2;
pub use vec2::*;
