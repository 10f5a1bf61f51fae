//! Remote build service models
//!
//! Request and response bodies exchanged with the remote build service.

pub mod models;
