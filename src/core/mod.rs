pub mod address;
pub mod types;

pub use address::*;
pub use types::*;
