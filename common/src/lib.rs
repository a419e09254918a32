pub use logger::*;
pub use utils::*;

pub mod logger;
pub mod utils;
