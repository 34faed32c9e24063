mod book;
mod recognition;

pub use book::*;
pub use recognition::*;
