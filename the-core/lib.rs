//! Character level primitives shared by the layout crates.

pub mod breaks;
pub mod chars;
