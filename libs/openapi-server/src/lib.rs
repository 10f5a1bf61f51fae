//! Launch and status API models
//!
//! The status record defined here is also the on-disk format of a job's
//! `status.json`.

pub mod models;
