//! Deployment module

pub mod artifact;
