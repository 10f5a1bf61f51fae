//! Persistent configuration and job layout

pub mod layout;
pub mod settings;
