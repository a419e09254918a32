pub mod feed;
pub mod oracle;

pub use feed::*;
pub use oracle::*;
