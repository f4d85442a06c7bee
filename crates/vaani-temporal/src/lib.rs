pub mod clock;
pub mod delay;
pub mod error;
pub mod parser;
pub mod reminder;

pub use clock::*;
pub use delay::*;
pub use error::*;
pub use parser::*;
pub use reminder::*;
