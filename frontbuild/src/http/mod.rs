//! Remote build service client

pub mod builds;
pub mod client;
