//! Upload archive creation

pub mod frontend;
