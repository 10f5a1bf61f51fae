//! HTTP surface for launching jobs and reading their status

pub mod handlers;
pub mod serve;
pub mod state;
