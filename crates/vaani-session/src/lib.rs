pub mod config;
pub mod error;
pub mod memory;
pub mod registry;

pub use config::*;
pub use error::*;
pub use memory::*;
pub use registry::*;
