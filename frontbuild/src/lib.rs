//! frontbuild library
//!
//! Archives a frontend project, builds it on a remote build service and
//! deploys the returned artifact, tracking every job on disk.

pub mod app;
pub mod archive;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod jobs;
pub mod logs;
pub mod server;
pub mod storage;
pub mod utils;
pub mod workers;
