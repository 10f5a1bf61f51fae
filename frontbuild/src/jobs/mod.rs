//! Job lifecycle: storage, launching and status queries

pub mod launcher;
pub mod reporter;
pub mod store;
